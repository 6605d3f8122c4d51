pub mod erpnext_crm;
