use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, PgPool, Row};
use uuid::Uuid;

use super::{CustomizationStore, DealStore, ErrorLogStore, SettingsStore, SiteStore};
use crate::middleware::error_handling::Result;
use crate::models::customization::frappe_crm_custom_fields;
use crate::models::{
    CrmDeal, CrmDealContact, CrmFormScript, CustomerPayload, ErpNextCrmSettings, ErrorLog,
    PropertySetter,
};
use crate::services::erpnext::{client, ErpNextApi};

pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn deal_contacts(&self, deal: &str) -> Result<Vec<CrmDealContact>> {
        let rows = query(
            "SELECT contact, full_name, email, mobile_no, gender, is_primary
             FROM crm_deal_contacts WHERE deal = $1 ORDER BY idx",
        )
        .bind(deal)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<CrmDealContact> {
                Ok(CrmDealContact {
                    contact: row.try_get("contact")?,
                    full_name: row.try_get("full_name")?,
                    email: row.try_get("email")?,
                    mobile_no: row.try_get("mobile_no")?,
                    gender: row.try_get("gender")?,
                    is_primary: row.try_get("is_primary")?,
                })
            })
            .collect()
    }
}

// ============================================================================
// Settings
// ============================================================================

#[async_trait]
impl SettingsStore for PgRepository {
    async fn load(&self) -> Result<ErpNextCrmSettings> {
        let row = query(
            "SELECT enabled, is_erpnext_in_the_current_site, erpnext_site_url, api_key,
                    api_secret_encrypted, erpnext_company
             FROM erpnext_crm_settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(ErpNextCrmSettings {
                enabled: row.try_get("enabled")?,
                is_erpnext_in_the_current_site: row.try_get("is_erpnext_in_the_current_site")?,
                erpnext_site_url: row.try_get("erpnext_site_url")?,
                api_key: row.try_get("api_key")?,
                api_secret: row.try_get("api_secret_encrypted")?,
                erpnext_company: row.try_get("erpnext_company")?,
            }),
            None => Ok(ErpNextCrmSettings::default()),
        }
    }

    async fn save(&self, settings: &ErpNextCrmSettings) -> Result<()> {
        query(
            r#"
            INSERT INTO erpnext_crm_settings
                (id, enabled, is_erpnext_in_the_current_site, erpnext_site_url, api_key,
                 api_secret_encrypted, erpnext_company, modified)
            VALUES (1, $1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                is_erpnext_in_the_current_site = EXCLUDED.is_erpnext_in_the_current_site,
                erpnext_site_url = EXCLUDED.erpnext_site_url,
                api_key = EXCLUDED.api_key,
                api_secret_encrypted = EXCLUDED.api_secret_encrypted,
                erpnext_company = EXCLUDED.erpnext_company,
                modified = EXCLUDED.modified
            "#,
        )
        .bind(settings.enabled)
        .bind(settings.is_erpnext_in_the_current_site)
        .bind(&settings.erpnext_site_url)
        .bind(&settings.api_key)
        .bind(&settings.api_secret)
        .bind(&settings.erpnext_company)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Deals
// ============================================================================

#[async_trait]
impl DealStore for PgRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<CrmDeal>> {
        let row = query(
            "SELECT name, organization, lead_name, no_of_employees, deal_owner, territory,
                    industry, website, annual_revenue, currency, status
             FROM crm_deals WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let deal = CrmDeal {
            contacts: self.deal_contacts(name).await?,
            name: row.try_get("name")?,
            organization: row.try_get("organization")?,
            lead_name: row.try_get("lead_name")?,
            no_of_employees: row.try_get("no_of_employees")?,
            deal_owner: row.try_get("deal_owner")?,
            territory: row.try_get("territory")?,
            industry: row.try_get("industry")?,
            website: row.try_get("website")?,
            annual_revenue: row.try_get("annual_revenue")?,
            currency: row.try_get("currency")?,
            status: row.try_get("status")?,
        };

        Ok(Some(deal))
    }

    async fn update_status(&self, name: &str, status: &str) -> Result<Option<CrmDeal>> {
        let result = query("UPDATE crm_deals SET status = $1, modified = $2 WHERE name = $3")
            .bind(status)
            .bind(Utc::now())
            .bind(name)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_name(name).await
    }
}

// ============================================================================
// Customizations
// ============================================================================

#[async_trait]
impl CustomizationStore for PgRepository {
    async fn property_setter_exists(&self, name: &str) -> Result<bool> {
        let row = query("SELECT 1 AS found FROM property_setters WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn insert_property_setter(&self, setter: &PropertySetter) -> Result<()> {
        query(
            "INSERT INTO property_setters (name, doc_type, field_name, property, property_type, value, creation)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&setter.name)
        .bind(&setter.doc_type)
        .bind(&setter.field_name)
        .bind(&setter.property)
        .bind(&setter.property_type)
        .bind(&setter.value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn form_script_exists(&self, name: &str) -> Result<bool> {
        let row = query("SELECT 1 AS found FROM crm_form_scripts WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn insert_form_script(&self, script: &CrmFormScript) -> Result<()> {
        query(
            "INSERT INTO crm_form_scripts (name, dt, view, script, enabled, is_standard, creation)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&script.name)
        .bind(&script.dt)
        .bind(&script.view)
        .bind(&script.script)
        .bind(script.enabled)
        .bind(script.is_standard)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn enabled_form_scripts(&self, dt: &str, view: &str) -> Result<Vec<CrmFormScript>> {
        let rows = query(
            "SELECT name, dt, view, script, enabled, is_standard FROM crm_form_scripts
             WHERE dt = $1 AND view = $2 AND enabled ORDER BY creation",
        )
        .bind(dt)
        .bind(view)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<CrmFormScript> {
                Ok(CrmFormScript {
                    name: row.try_get("name")?,
                    dt: row.try_get("dt")?,
                    view: row.try_get("view")?,
                    script: row.try_get("script")?,
                    enabled: row.try_get("enabled")?,
                    is_standard: row.try_get("is_standard")?,
                })
            })
            .collect()
    }
}

// ============================================================================
// Error log and site
// ============================================================================

#[async_trait]
impl ErrorLogStore for PgRepository {
    async fn insert(&self, method: &str, error: &str) -> Result<ErrorLog> {
        let log = ErrorLog {
            id: Uuid::new_v4(),
            method: method.to_string(),
            error: error.to_string(),
            creation: Utc::now(),
        };

        query("INSERT INTO error_logs (id, method, error, creation) VALUES ($1, $2, $3, $4)")
            .bind(log.id)
            .bind(&log.method)
            .bind(&log.error)
            .bind(log.creation)
            .execute(&self.pool)
            .await?;

        Ok(log)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<ErrorLog>> {
        let rows = query(
            "SELECT id, method, error, creation FROM error_logs ORDER BY creation DESC LIMIT $1",
        )
        .bind(limit.clamp(1, 100))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<ErrorLog> {
                Ok(ErrorLog {
                    id: row.try_get("id")?,
                    method: row.try_get("method")?,
                    error: row.try_get("error")?,
                    creation: row.try_get("creation")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SiteStore for PgRepository {
    async fn installed_apps(&self) -> Result<Vec<String>> {
        let rows = query("SELECT app_name FROM installed_apps ORDER BY idx")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| row.try_get::<String, _>("app_name").map_err(Into::into))
            .collect()
    }
}

// ============================================================================
// Co-located ERPNext
// ============================================================================

#[async_trait]
impl ErpNextApi for PgRepository {
    async fn create_custom_fields_for_frappe_crm(&self) -> client::Result<()> {
        for field in frappe_crm_custom_fields() {
            query(
                "INSERT INTO custom_fields (name, dt, fieldname, fieldtype, label, insert_after)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (name) DO NOTHING",
            )
            .bind(field.name())
            .bind(&field.dt)
            .bind(&field.fieldname)
            .bind(&field.fieldtype)
            .bind(&field.label)
            .bind(&field.insert_after)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn create_customer(&self, payload: &CustomerPayload) -> client::Result<()> {
        let existing = query("SELECT 1 AS found FROM customers WHERE crm_deal = $1")
            .bind(&payload.crm_deal)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Ok(());
        }

        let name = payload.document_name();
        let result = query(
            r#"
            INSERT INTO customers
                (name, customer_name, customer_group, customer_type, territory, default_currency,
                 industry, website, crm_deal, contacts, creation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(&name)
        .bind(&payload.customer_name)
        .bind(&payload.customer_group)
        .bind(&payload.customer_type)
        .bind(&payload.territory)
        .bind(&payload.default_currency)
        .bind(&payload.industry)
        .bind(&payload.website)
        .bind(&payload.crm_deal)
        .bind(&payload.contacts)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(client::ErpNextError::DuplicateEntry(format!(
                "Customer {} already exists for another CRM Deal",
                name
            )));
        }
        Ok(())
    }
}
