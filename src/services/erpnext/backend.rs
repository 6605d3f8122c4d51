// ERPNext Backends
// Custom field and customer creation, reached either in-process (ERPNext installed on
// the CRM site) or over HTTP (separate ERPNext site).

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::client::{ErpNextClient, ErpNextConfig, Result};
use crate::models::{CustomerPayload, ErpNextCrmSettings, ProspectPayload};

/// In-process ERPNext API, available when ERPNext shares the CRM site.
#[async_trait]
pub trait ErpNextApi: Send + Sync {
    async fn create_custom_fields_for_frappe_crm(&self) -> Result<()>;

    async fn create_customer(&self, payload: &CustomerPayload) -> Result<()>;
}

/// Where integration calls go for one operation.
#[async_trait]
pub trait ErpNextBackend: Send + Sync {
    async fn create_custom_fields(&self) -> Result<()>;

    async fn create_customer(&self, payload: &CustomerPayload) -> Result<()>;
}

pub struct LocalBackend {
    api: Arc<dyn ErpNextApi>,
}

impl LocalBackend {
    pub fn new(api: Arc<dyn ErpNextApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ErpNextBackend for LocalBackend {
    async fn create_custom_fields(&self) -> Result<()> {
        self.api.create_custom_fields_for_frappe_crm().await
    }

    async fn create_customer(&self, payload: &CustomerPayload) -> Result<()> {
        self.api.create_customer(payload).await
    }
}

pub struct RemoteBackend {
    client: ErpNextClient,
}

impl RemoteBackend {
    /// Builds a fresh client from the settings' site URL and credentials.
    pub fn from_settings(settings: &ErpNextCrmSettings, timeout: Duration) -> Result<Self> {
        let config = ErpNextConfig::from_settings(settings, timeout)?;
        Ok(Self {
            client: ErpNextClient::new(config)?,
        })
    }

    /// Prospects only exist on a separate site; a co-located quotation is
    /// addressed to the CRM Deal itself.
    pub async fn create_prospect(&self, payload: &ProspectPayload) -> Result<String> {
        self.client.create_prospect_against_crm_deal(payload).await
    }
}

#[async_trait]
impl ErpNextBackend for RemoteBackend {
    async fn create_custom_fields(&self) -> Result<()> {
        self.client.create_custom_fields_for_frappe_crm().await
    }

    async fn create_customer(&self, payload: &CustomerPayload) -> Result<()> {
        self.client.create_customer(payload).await
    }
}

/// Picks the backend for one operation from the co-location flag.
pub fn select_backend(
    settings: &ErpNextCrmSettings,
    local_api: &Arc<dyn ErpNextApi>,
    timeout: Duration,
) -> Result<Box<dyn ErpNextBackend>> {
    if settings.is_erpnext_in_the_current_site {
        Ok(Box::new(LocalBackend::new(local_api.clone())))
    } else {
        Ok(Box::new(RemoteBackend::from_settings(settings, timeout)?))
    }
}
