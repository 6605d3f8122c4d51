//! Storage seams for the integration.
//!
//! Every store is a trait so the service can run against Postgres in
//! production and against [`InMemoryRepository`] in tests.

use async_trait::async_trait;
use std::sync::Arc;

use crate::middleware::error_handling::Result;
use crate::models::{CrmDeal, CrmFormScript, ErpNextCrmSettings, ErrorLog, PropertySetter};
use crate::services::erpnext::ErpNextApi;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;

/// Singleton settings record. `api_secret` is stored as given (ciphertext).
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Returns default (disabled) settings when nothing has been saved yet.
    async fn load(&self) -> Result<ErpNextCrmSettings>;

    async fn save(&self, settings: &ErpNextCrmSettings) -> Result<()>;
}

#[async_trait]
pub trait DealStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<CrmDeal>>;

    /// Returns the updated deal, or `None` when no deal has that name.
    async fn update_status(&self, name: &str, status: &str) -> Result<Option<CrmDeal>>;
}

/// Property setters and form scripts, both looked up by exact name only.
#[async_trait]
pub trait CustomizationStore: Send + Sync {
    async fn property_setter_exists(&self, name: &str) -> Result<bool>;

    async fn insert_property_setter(&self, setter: &PropertySetter) -> Result<()>;

    async fn form_script_exists(&self, name: &str) -> Result<bool>;

    async fn insert_form_script(&self, script: &CrmFormScript) -> Result<()>;

    async fn enabled_form_scripts(&self, dt: &str, view: &str) -> Result<Vec<CrmFormScript>>;
}

#[async_trait]
pub trait ErrorLogStore: Send + Sync {
    async fn insert(&self, method: &str, error: &str) -> Result<ErrorLog>;

    async fn recent(&self, limit: i64) -> Result<Vec<ErrorLog>>;
}

#[async_trait]
pub trait SiteStore: Send + Sync {
    async fn installed_apps(&self) -> Result<Vec<String>>;
}

/// The stores a service instance works against.
#[derive(Clone)]
pub struct Repositories {
    pub settings: Arc<dyn SettingsStore>,
    pub deals: Arc<dyn DealStore>,
    pub customizations: Arc<dyn CustomizationStore>,
    pub error_logs: Arc<dyn ErrorLogStore>,
    pub site: Arc<dyn SiteStore>,
    /// ERPNext on the CRM site, used when co-located.
    pub erpnext: Arc<dyn ErpNextApi>,
}

impl Repositories {
    /// Wires every store to one backing implementation.
    pub fn from_shared<R>(repo: Arc<R>) -> Self
    where
        R: SettingsStore
            + DealStore
            + CustomizationStore
            + ErrorLogStore
            + SiteStore
            + ErpNextApi
            + 'static,
    {
        Self {
            settings: repo.clone(),
            deals: repo.clone(),
            customizations: repo.clone(),
            error_logs: repo.clone(),
            site: repo.clone(),
            erpnext: repo,
        }
    }
}
