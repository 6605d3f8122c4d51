use serde::{Deserialize, Serialize};
use validator::Validate;

/// Singleton record controlling the ERPNext integration.
///
/// `api_secret` holds plaintext only while in memory; the settings service
/// encrypts it before handing the record to a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErpNextCrmSettings {
    pub enabled: bool,
    pub is_erpnext_in_the_current_site: bool,
    pub erpnext_site_url: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub erpnext_company: Option<String>,
}

impl ErpNextCrmSettings {
    /// Site URL used to tag log entries for failed ERPNext calls.
    pub fn site_label(&self) -> &str {
        if self.is_erpnext_in_the_current_site {
            "current site"
        } else {
            self.erpnext_site_url.as_deref().unwrap_or("<no site url>")
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    pub enabled: bool,
    #[serde(default)]
    pub is_erpnext_in_the_current_site: bool,
    #[validate(url(message = "ERPNext site URL must be a valid URL"))]
    pub erpnext_site_url: Option<String>,
    pub api_key: Option<String>,
    /// `None` keeps the stored secret, unless the site URL changes.
    pub api_secret: Option<String>,
    pub erpnext_company: Option<String>,
}

impl UpdateSettingsRequest {
    /// The stored secret is only ever sent to the site it was entered for, so
    /// a new site URL needs the secret entered again.
    pub fn apply_to(self, current: &ErpNextCrmSettings) -> ErpNextCrmSettings {
        let same_site = self.erpnext_site_url == current.erpnext_site_url;
        let api_secret = match self.api_secret {
            Some(secret) => Some(secret),
            None if same_site => current.api_secret.clone(),
            None => None,
        };

        ErpNextCrmSettings {
            enabled: self.enabled,
            is_erpnext_in_the_current_site: self.is_erpnext_in_the_current_site,
            erpnext_site_url: self.erpnext_site_url,
            api_key: self.api_key,
            api_secret,
            erpnext_company: self.erpnext_company,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub enabled: bool,
    pub is_erpnext_in_the_current_site: bool,
    pub erpnext_site_url: Option<String>,
    pub api_key: Option<String>,
    pub api_secret_set: bool,
    pub erpnext_company: Option<String>,
}

impl From<&ErpNextCrmSettings> for SettingsResponse {
    fn from(settings: &ErpNextCrmSettings) -> Self {
        Self {
            enabled: settings.enabled,
            is_erpnext_in_the_current_site: settings.is_erpnext_in_the_current_site,
            erpnext_site_url: settings.erpnext_site_url.clone(),
            api_key: settings.api_key.clone(),
            api_secret_set: settings.api_secret.as_deref().is_some_and(|s| !s.is_empty()),
            erpnext_company: settings.erpnext_company.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_secret_keeps_stored_one() {
        let current = ErpNextCrmSettings {
            erpnext_site_url: Some("https://erp.example.com".to_string()),
            api_secret: Some("stored".to_string()),
            ..Default::default()
        };
        let request = UpdateSettingsRequest {
            enabled: true,
            is_erpnext_in_the_current_site: false,
            erpnext_site_url: Some("https://erp.example.com".to_string()),
            api_key: Some("key".to_string()),
            api_secret: None,
            erpnext_company: None,
        };

        let updated = request.apply_to(&current);
        assert_eq!(updated.api_secret.as_deref(), Some("stored"));
        assert!(updated.enabled);
    }

    #[test]
    fn test_new_site_url_drops_stored_secret() {
        let current = ErpNextCrmSettings {
            erpnext_site_url: Some("https://erp.example.com".to_string()),
            api_secret: Some("stored".to_string()),
            ..Default::default()
        };
        let request = UpdateSettingsRequest {
            enabled: true,
            is_erpnext_in_the_current_site: false,
            erpnext_site_url: Some("https://other.example.net".to_string()),
            api_key: Some("key".to_string()),
            api_secret: None,
            erpnext_company: None,
        };

        assert_eq!(request.apply_to(&current).api_secret, None);
    }

    #[test]
    fn test_invalid_site_url_rejected() {
        let request = UpdateSettingsRequest {
            enabled: true,
            is_erpnext_in_the_current_site: false,
            erpnext_site_url: Some("not a url".to_string()),
            api_key: None,
            api_secret: None,
            erpnext_company: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_response_redacts_secret() {
        let settings = ErpNextCrmSettings {
            api_secret: Some("s3cret".to_string()),
            ..Default::default()
        };
        let response = SettingsResponse::from(&settings);
        let body = serde_json::to_string(&response).unwrap();
        assert!(!body.contains("s3cret"));
        assert!(response.api_secret_set);
    }
}
