// ERPNext CRM Service
// Settings provisioning, quotation hand-off and customer creation between the
// CRM and an ERPNext site (co-located or remote).

use std::time::Duration;
use thiserror::Error;
use validator::Validate;

use crate::middleware::error_handling::AppError;
use crate::models::{
    CrmDeal, CrmFormScript, CustomerPayload, ErpNextCrmSettings, ErrorLog, PropertySetter,
    ProspectPayload, UpdateSettingsRequest,
};
use crate::repositories::Repositories;
use crate::services::encryption_service::EncryptionService;
use crate::services::erpnext::{select_backend, ErpNextBackend, ErpNextError, RemoteBackend};

pub const ERPNEXT_APP: &str = "erpnext";
pub const CRM_DEAL_DOCTYPE: &str = "CRM Deal";
pub const CRM_FORM_SCRIPT_NAME: &str = "Create Quotation from CRM Deal";
pub const QUOTATION_LINK_FILTERS: &str =
    r#"[["DocType","name","in", ["Customer", "Lead", "Prospect", "CRM Deal"]]]"#;

const CUSTOM_FIELD_ERROR: &str =
    "Error while creating custom field in ERPNext, check error log for more details";
const PROSPECT_ERROR: &str =
    "Error while creating prospect in ERPNext, check error log for more details";
const CUSTOMER_ERROR: &str =
    "Error while creating customer in ERPNext, check error log for more details";

/// Adds a "Create Quotation" action to open deals.
pub const CRM_FORM_SCRIPT: &str = r#"
function setupForm({ doc, call, $dialog, updateField, createToast }) {
	let actions = [];
	if (!["Lost", "Won"].includes(doc?.status)) {
		actions.push({
			label: __("Create Quotation"),
			onClick: async () => {
				let quotation_url = await call(
					"erpnext_crm_sync.get_quotation_url",
					{
						crm_deal: doc.name,
						organization: doc.organization
					}
				);

				if (quotation_url) {
					window.open(quotation_url, '_blank');
				}
			}
		})
	}

	return {
		actions: actions,
	};
}
"#;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("ERPNext is not integrated with the CRM")]
    NotIntegrated,

    #[error("ERPNext is not installed in the current site")]
    ErpNextNotInstalled,

    /// User-facing message; the cause lives in the error log only.
    #[error("{0}")]
    ErpNext(&'static str),

    #[error("CRM Deal {0} not found")]
    DealNotFound(String),

    #[error(transparent)]
    Storage(#[from] AppError),
}

pub type Result<T> = std::result::Result<T, IntegrationError>;

// ============================================================================
// Service
// ============================================================================

pub struct ErpNextCrmService {
    repos: Repositories,
    encryption: EncryptionService,
    crm_site_url: String,
    request_timeout: Duration,
}

impl ErpNextCrmService {
    pub fn new(
        repos: Repositories,
        encryption: EncryptionService,
        crm_site_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            repos,
            encryption,
            crm_site_url: crm_site_url.into(),
            request_timeout,
        }
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Loads the settings with the API secret decrypted. Callers load once
    /// per request and pass the result to each operation.
    pub async fn load_settings(&self) -> Result<ErpNextCrmSettings> {
        let mut settings = self.repos.settings.load().await?;
        settings.api_secret = self
            .encryption
            .decrypt_optional(settings.api_secret.as_deref())
            .map_err(AppError::from)?;
        Ok(settings)
    }

    /// Validates and provisions, then persists. Nothing is saved when
    /// validation fails.
    pub async fn save_settings(&self, request: UpdateSettingsRequest) -> Result<ErpNextCrmSettings> {
        request.validate().map_err(AppError::from)?;

        let current = self.load_settings().await?;
        let settings = request.apply_to(&current);

        self.validate_settings(&settings).await?;

        let mut stored = settings.clone();
        stored.api_secret = self
            .encryption
            .encrypt_optional(settings.api_secret.as_deref())
            .map_err(AppError::from)?;
        self.repos.settings.save(&stored).await?;

        tracing::info!(
            enabled = settings.enabled,
            co_located = settings.is_erpnext_in_the_current_site,
            "ERPNext CRM settings saved"
        );

        Ok(settings)
    }

    /// Provisioning run on every save of enabled settings.
    pub async fn validate_settings(&self, settings: &ErpNextCrmSettings) -> Result<()> {
        if !settings.enabled {
            return Ok(());
        }

        self.validate_if_erpnext_installed(settings).await?;
        self.add_quotation_to_option(settings).await?;
        self.create_custom_fields(settings).await?;
        self.create_crm_form_script().await?;
        Ok(())
    }

    async fn validate_if_erpnext_installed(&self, settings: &ErpNextCrmSettings) -> Result<()> {
        if !settings.is_erpnext_in_the_current_site {
            return Ok(());
        }

        let apps = self.repos.site.installed_apps().await?;
        if !apps.iter().any(|app| app == ERPNEXT_APP) {
            return Err(IntegrationError::ErpNextNotInstalled);
        }
        Ok(())
    }

    /// Lets a quotation be addressed to a CRM Deal. Created once; an existing
    /// setter is left as is even if its value differs.
    async fn add_quotation_to_option(&self, settings: &ErpNextCrmSettings) -> Result<()> {
        if !settings.is_erpnext_in_the_current_site {
            return Ok(());
        }

        let name = PropertySetter::name_for("Quotation", "quotation_to", "link_filters");
        if self.repos.customizations.property_setter_exists(&name).await? {
            return Ok(());
        }

        let setter = PropertySetter::new(
            "Quotation",
            "quotation_to",
            "link_filters",
            "JSON",
            QUOTATION_LINK_FILTERS,
        );
        self.repos.customizations.insert_property_setter(&setter).await?;
        tracing::info!(property_setter = %setter.name, "Created property setter");
        Ok(())
    }

    async fn create_custom_fields(&self, settings: &ErpNextCrmSettings) -> Result<()> {
        let outcome: std::result::Result<(), ErpNextError> = async {
            let backend = self.backend(settings)?;
            backend.create_custom_fields().await
        }
        .await;

        if let Err(err) = outcome {
            return Err(self
                .erpnext_failure(settings, "creating custom field", err.into(), CUSTOM_FIELD_ERROR)
                .await);
        }
        Ok(())
    }

    /// Name-keyed: once a script with this name exists its body is never
    /// updated from [`CRM_FORM_SCRIPT`].
    async fn create_crm_form_script(&self) -> Result<()> {
        if self.repos.customizations.form_script_exists(CRM_FORM_SCRIPT_NAME).await? {
            return Ok(());
        }

        let script = CrmFormScript {
            name: CRM_FORM_SCRIPT_NAME.to_string(),
            dt: CRM_DEAL_DOCTYPE.to_string(),
            view: "Form".to_string(),
            script: CRM_FORM_SCRIPT.to_string(),
            enabled: true,
            is_standard: true,
        };
        self.repos.customizations.insert_form_script(&script).await?;
        tracing::info!(form_script = CRM_FORM_SCRIPT_NAME, "Created CRM form script");
        Ok(())
    }

    // ========================================================================
    // Quotation
    // ========================================================================

    /// URL of a new quotation for the deal. With a remote site this creates
    /// the prospect the quotation is addressed to.
    pub async fn get_quotation_url(
        &self,
        settings: &ErpNextCrmSettings,
        crm_deal: &str,
        organization: Option<&str>,
    ) -> Result<String> {
        if !settings.enabled {
            return Err(IntegrationError::NotIntegrated);
        }

        tracing::info!(crm_deal, organization, "Building quotation URL");

        if settings.is_erpnext_in_the_current_site {
            let quotation_url = format!("{}/app/quotation", self.crm_site_url.trim_end_matches('/'));
            return Ok(format!(
                "{}/new?quotation_to=CRM Deal&crm_deal={}&party_name={}",
                quotation_url, crm_deal, crm_deal
            ));
        }

        let site_url = settings
            .erpnext_site_url
            .as_deref()
            .unwrap_or_default()
            .trim_end_matches('/');
        let quotation_url = format!("{}/app/quotation", site_url);

        let prospect = self.create_prospect_in_remote_site(settings, crm_deal).await?;
        Ok(format!(
            "{}/new?quotation_to=Prospect&crm_deal={}&party_name={}",
            quotation_url, crm_deal, prospect
        ))
    }

    pub async fn create_prospect_in_remote_site(
        &self,
        settings: &ErpNextCrmSettings,
        crm_deal: &str,
    ) -> Result<String> {
        let outcome: anyhow::Result<String> = async {
            let deal = self
                .repos
                .deals
                .find_by_name(crm_deal)
                .await
                .map_err(|e| anyhow::anyhow!("failed to load CRM Deal {}: {}", crm_deal, e))?
                .ok_or_else(|| anyhow::anyhow!("CRM Deal {} not found", crm_deal))?;

            let payload = ProspectPayload::from_deal(&deal, settings.erpnext_company.as_deref())?;
            let backend = RemoteBackend::from_settings(settings, self.request_timeout)?;
            Ok(backend.create_prospect(&payload).await?)
        }
        .await;

        match outcome {
            Ok(prospect) => {
                tracing::info!(crm_deal, prospect = %prospect, "Prospect created in ERPNext");
                Ok(prospect)
            }
            Err(err) => Err(self
                .erpnext_failure(settings, "creating prospect", err, PROSPECT_ERROR)
                .await),
        }
    }

    // ========================================================================
    // Customer
    // ========================================================================

    /// Deal update hook: creates the ERPNext customer for a won deal.
    pub async fn create_customer_in_erpnext(
        &self,
        settings: &ErpNextCrmSettings,
        deal: &CrmDeal,
    ) -> Result<()> {
        if !settings.enabled || !deal.is_won() {
            return Ok(());
        }

        let outcome: anyhow::Result<()> = async {
            let payload = CustomerPayload::from_deal(deal)?;
            let backend = self.backend(settings)?;
            backend.create_customer(&payload).await?;
            Ok(())
        }
        .await;

        match outcome {
            Ok(()) => {
                tracing::info!(crm_deal = %deal.name, "Customer created in ERPNext");
                Ok(())
            }
            Err(err) => Err(self
                .erpnext_failure(settings, "creating customer", err, CUSTOMER_ERROR)
                .await),
        }
    }

    /// Runs the customer hook against the updated deal and persists the new
    /// status only once the hook succeeds. A failed hook leaves the deal as it
    /// was.
    pub async fn update_deal_status(
        &self,
        settings: &ErpNextCrmSettings,
        name: &str,
        status: &str,
    ) -> Result<CrmDeal> {
        let mut deal = self
            .repos
            .deals
            .find_by_name(name)
            .await?
            .ok_or_else(|| IntegrationError::DealNotFound(name.to_string()))?;
        deal.status = status.to_string();

        self.create_customer_in_erpnext(settings, &deal).await?;

        self.repos
            .deals
            .update_status(name, status)
            .await?
            .ok_or_else(|| IntegrationError::DealNotFound(name.to_string()))
    }

    // ========================================================================
    // UI and diagnostics
    // ========================================================================

    pub async fn form_scripts(&self, dt: &str, view: &str) -> Result<Vec<CrmFormScript>> {
        Ok(self.repos.customizations.enabled_form_scripts(dt, view).await?)
    }

    pub async fn recent_error_logs(&self, limit: i64) -> Result<Vec<ErrorLog>> {
        Ok(self.repos.error_logs.recent(limit).await?)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn backend(&self, settings: &ErpNextCrmSettings) -> std::result::Result<Box<dyn ErpNextBackend>, ErpNextError> {
        select_backend(settings, &self.repos.erpnext, self.request_timeout)
    }

    /// Logs the full cause tagged with the target site and returns the
    /// generic user-facing error.
    async fn erpnext_failure(
        &self,
        settings: &ErpNextCrmSettings,
        action: &str,
        err: anyhow::Error,
        user_message: &'static str,
    ) -> IntegrationError {
        let site = settings.site_label();
        let title = format!("Error while {} in ERPNext site: {}", action, site);
        let detail = format!("{:?}", err);

        tracing::error!(site_url = %site, error = %detail, "{}", title);

        if let Err(log_err) = self.repos.error_logs.insert(&title, &detail).await {
            tracing::warn!("Failed to persist error log: {}", log_err);
        }

        IntegrationError::ErpNext(user_message)
    }
}

// ============================================================================
// Tests
// ============================================================================
