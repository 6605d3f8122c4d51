pub mod encryption_service;
pub mod erpnext;
pub mod erpnext_crm_service;

pub use encryption_service::EncryptionService;
pub use erpnext_crm_service::{ErpNextCrmService, IntegrationError};
