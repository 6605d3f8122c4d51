//! In-memory stores, including an in-process ERPNext stand-in.
//!
//! Used by the test suites; each instance is an isolated site.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CustomizationStore, DealStore, ErrorLogStore, SettingsStore, SiteStore};
use crate::middleware::error_handling::Result;
use crate::models::customization::frappe_crm_custom_fields;
use crate::models::{
    CrmDeal, CrmFormScript, CustomField, CustomerPayload, ErpNextCrmSettings, ErrorLog,
    PropertySetter,
};
use crate::services::erpnext::{client, ErpNextApi};

#[derive(Debug, Default)]
struct SiteState {
    settings: Option<ErpNextCrmSettings>,
    deals: BTreeMap<String, CrmDeal>,
    property_setters: Vec<PropertySetter>,
    form_scripts: Vec<CrmFormScript>,
    error_logs: Vec<ErrorLog>,
    installed_apps: Vec<String>,
    custom_fields: BTreeMap<String, CustomField>,
    customers: Vec<CustomerPayload>,
    erpnext_calls: usize,
}

#[derive(Debug)]
pub struct InMemoryRepository {
    state: RwLock<SiteState>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::with_apps(&["frappe", "crm"])
    }
}

impl InMemoryRepository {
    pub fn with_apps(apps: &[&str]) -> Self {
        Self {
            state: RwLock::new(SiteState {
                installed_apps: apps.iter().map(|a| a.to_string()).collect(),
                ..Default::default()
            }),
        }
    }

    pub async fn insert_deal(&self, deal: CrmDeal) {
        self.state.write().await.deals.insert(deal.name.clone(), deal);
    }

    pub async fn stored_settings(&self) -> Option<ErpNextCrmSettings> {
        self.state.read().await.settings.clone()
    }

    pub async fn property_setters(&self) -> Vec<PropertySetter> {
        self.state.read().await.property_setters.clone()
    }

    pub async fn form_scripts(&self) -> Vec<CrmFormScript> {
        self.state.read().await.form_scripts.clone()
    }

    pub async fn error_logs(&self) -> Vec<ErrorLog> {
        self.state.read().await.error_logs.clone()
    }

    pub async fn custom_fields(&self) -> Vec<CustomField> {
        self.state.read().await.custom_fields.values().cloned().collect()
    }

    pub async fn customers(&self) -> Vec<CustomerPayload> {
        self.state.read().await.customers.clone()
    }

    /// Number of calls that reached the in-process ERPNext API.
    pub async fn erpnext_calls(&self) -> usize {
        self.state.read().await.erpnext_calls
    }
}

#[async_trait]
impl SettingsStore for InMemoryRepository {
    async fn load(&self) -> Result<ErpNextCrmSettings> {
        Ok(self.state.read().await.settings.clone().unwrap_or_default())
    }

    async fn save(&self, settings: &ErpNextCrmSettings) -> Result<()> {
        self.state.write().await.settings = Some(settings.clone());
        Ok(())
    }
}

#[async_trait]
impl DealStore for InMemoryRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<CrmDeal>> {
        Ok(self.state.read().await.deals.get(name).cloned())
    }

    async fn update_status(&self, name: &str, status: &str) -> Result<Option<CrmDeal>> {
        let mut state = self.state.write().await;
        Ok(state.deals.get_mut(name).map(|deal| {
            deal.status = status.to_string();
            deal.clone()
        }))
    }
}

#[async_trait]
impl CustomizationStore for InMemoryRepository {
    async fn property_setter_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.read().await.property_setters.iter().any(|p| p.name == name))
    }

    async fn insert_property_setter(&self, setter: &PropertySetter) -> Result<()> {
        self.state.write().await.property_setters.push(setter.clone());
        Ok(())
    }

    async fn form_script_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.read().await.form_scripts.iter().any(|s| s.name == name))
    }

    async fn insert_form_script(&self, script: &CrmFormScript) -> Result<()> {
        self.state.write().await.form_scripts.push(script.clone());
        Ok(())
    }

    async fn enabled_form_scripts(&self, dt: &str, view: &str) -> Result<Vec<CrmFormScript>> {
        Ok(self
            .state
            .read()
            .await
            .form_scripts
            .iter()
            .filter(|s| s.enabled && s.dt == dt && s.view == view)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ErrorLogStore for InMemoryRepository {
    async fn insert(&self, method: &str, error: &str) -> Result<ErrorLog> {
        let log = ErrorLog {
            id: Uuid::new_v4(),
            method: method.to_string(),
            error: error.to_string(),
            creation: Utc::now(),
        };
        self.state.write().await.error_logs.push(log.clone());
        Ok(log)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<ErrorLog>> {
        let state = self.state.read().await;
        let limit = usize::try_from(limit.clamp(1, 100)).unwrap_or(100);
        Ok(state.error_logs.iter().rev().take(limit).cloned().collect())
    }
}

#[async_trait]
impl SiteStore for InMemoryRepository {
    async fn installed_apps(&self) -> Result<Vec<String>> {
        Ok(self.state.read().await.installed_apps.clone())
    }
}

#[async_trait]
impl ErpNextApi for InMemoryRepository {
    async fn create_custom_fields_for_frappe_crm(&self) -> client::Result<()> {
        let mut state = self.state.write().await;
        state.erpnext_calls += 1;
        for field in frappe_crm_custom_fields() {
            state.custom_fields.entry(field.name()).or_insert(field);
        }
        Ok(())
    }

    async fn create_customer(&self, payload: &CustomerPayload) -> client::Result<()> {
        let mut state = self.state.write().await;
        state.erpnext_calls += 1;
        if state.customers.iter().any(|c| c.crm_deal == payload.crm_deal) {
            return Ok(());
        }

        let name = payload.document_name();
        if let Some(other) = state.customers.iter().find(|c| c.document_name() == name) {
            return Err(client::ErpNextError::DuplicateEntry(format!(
                "Customer {} already exists for CRM Deal {}",
                name, other.crm_deal
            )));
        }
        state.customers.push(payload.clone());
        Ok(())
    }
}
