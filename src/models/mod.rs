pub mod customization;
pub mod deal;
pub mod erpnext;
pub mod settings;

pub use customization::{CrmFormScript, CustomField, FormScriptQuery, PropertySetter};
pub use deal::{get_contacts, CrmDeal, CrmDealContact, DealContact, UpdateDealRequest};
pub use erpnext::{CustomerPayload, ErrorLog, ProspectPayload};
pub use settings::{ErpNextCrmSettings, SettingsResponse, UpdateSettingsRequest};
