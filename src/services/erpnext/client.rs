// ERPNext RPC Client
// Calls whitelisted methods on a remote ERPNext site with token authentication.
// One request per call; no retries.

use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::models::{CustomerPayload, ErpNextCrmSettings, ProspectPayload};

pub const METHOD_CREATE_CUSTOM_FIELDS: &str =
    "erpnext.crm.frappe_crm_api.create_custom_fields_for_frappe_crm";
pub const METHOD_CREATE_PROSPECT: &str =
    "erpnext.crm.frappe_crm_api.create_prospect_against_crm_deal";
pub const METHOD_CREATE_CUSTOMER: &str = "erpnext.crm.frappe_crm_api.create_customer";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum ErpNextError {
    #[error("ERPNext API error ({status}): {exc_type}: {message}")]
    ApiError {
        status: StatusCode,
        exc_type: String,
        message: String,
    },

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unexpected response from {method}: {detail}")]
    UnexpectedResponse { method: String, detail: String },

    /// A document with this name exists but belongs to another CRM Deal.
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Site database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, ErpNextError>;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct ErpNextConfig {
    pub site_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout: Duration,
}

impl ErpNextConfig {
    pub fn from_settings(settings: &ErpNextCrmSettings, timeout: Duration) -> Result<Self> {
        let config = Self {
            site_url: settings.erpnext_site_url.clone().unwrap_or_default(),
            api_key: settings.api_key.clone().unwrap_or_default(),
            api_secret: settings.api_secret.clone().unwrap_or_default(),
            timeout,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.site_url.is_empty() {
            return Err(ErpNextError::ConfigError("erpnext_site_url is required".to_string()));
        }
        Url::parse(&self.site_url).map_err(|e| {
            ErpNextError::ConfigError(format!("invalid erpnext_site_url {}: {}", self.site_url, e))
        })?;
        if self.api_key.is_empty() {
            return Err(ErpNextError::ConfigError("api_key is required".to_string()));
        }
        if self.api_secret.is_empty() {
            return Err(ErpNextError::ConfigError("api_secret is required".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Response envelope
// ============================================================================

/// `/api/method/*` wraps return values in `{"message": ...}`; methods that
/// return nothing omit the key.
#[derive(Debug, Deserialize)]
struct MethodResponse<T> {
    message: Option<T>,
}

/// Error body produced by a failing whitelisted method.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    exc_type: Option<String>,
    exception: Option<String>,
    #[serde(rename = "_server_messages")]
    server_messages: Option<String>,
}

impl ErrorBody {
    fn message(&self, raw: &str) -> String {
        self.exception
            .clone()
            .or_else(|| self.server_messages.clone())
            .unwrap_or_else(|| raw.to_string())
    }
}

// ============================================================================
// ERPNext Client
// ============================================================================

pub struct ErpNextClient {
    config: ErpNextConfig,
    http_client: Client,
}

impl ErpNextClient {
    pub fn new(config: ErpNextConfig) -> Result<Self> {
        config.validate()?;

        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ErpNextError::NetworkError)?;

        Ok(Self { config, http_client })
    }

    // ========================================================================
    // Whitelisted methods
    // ========================================================================

    pub async fn create_custom_fields_for_frappe_crm(&self) -> Result<()> {
        self.post_api::<serde_json::Value, _>(METHOD_CREATE_CUSTOM_FIELDS, &serde_json::json!({}))
            .await?;
        Ok(())
    }

    /// Returns the name of the prospect created (or reused) for the deal.
    pub async fn create_prospect_against_crm_deal(&self, payload: &ProspectPayload) -> Result<String> {
        self.post_api::<String, _>(METHOD_CREATE_PROSPECT, payload)
            .await?
            .ok_or_else(|| ErpNextError::UnexpectedResponse {
                method: METHOD_CREATE_PROSPECT.to_string(),
                detail: "response carried no prospect name".to_string(),
            })
    }

    pub async fn create_customer(&self, payload: &CustomerPayload) -> Result<()> {
        self.post_api::<serde_json::Value, _>(METHOD_CREATE_CUSTOMER, payload).await?;
        Ok(())
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// POST `{site}/api/method/{method}` with a JSON body.
    pub async fn post_api<T, B>(&self, method: &str, body: &B) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.method_url(method);
        tracing::debug!(site_url = %self.config.site_url, method, "Calling ERPNext method");

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        let envelope: MethodResponse<T> = self.parse_response(method, response).await?;
        Ok(envelope.message)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/api/method/{}", self.config.site_url.trim_end_matches('/'), method)
    }

    fn auth_header(&self) -> String {
        format!("token {}:{}", self.config.api_key, self.config.api_secret)
    }

    async fn parse_response<T: DeserializeOwned>(&self, method: &str, response: Response) -> Result<T> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
            return match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    Err(ErpNextError::AuthError(body.message(&text)))
                }
                _ => Err(ErpNextError::ApiError {
                    status,
                    exc_type: body.exc_type.clone().unwrap_or_else(|| "Error".to_string()),
                    message: body.message(&text),
                }),
            };
        }

        serde_json::from_str(&text).map_err(|e| ErpNextError::UnexpectedResponse {
            method: method.to_string(),
            detail: e.to_string(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
