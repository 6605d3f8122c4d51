use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::deal::{get_contacts, CrmDeal};

pub const DEFAULT_CUSTOMER_GROUP: &str = "All Customer Groups";
pub const DEFAULT_CUSTOMER_TYPE: &str = "Company";

/// Body of `create_prospect_against_crm_deal`.
///
/// `contacts` is a JSON-encoded array, which is the shape the ERPNext
/// endpoint parses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProspectPayload {
    pub organization: Option<String>,
    pub lead_name: Option<String>,
    pub no_of_employees: Option<String>,
    pub deal_owner: Option<String>,
    pub crm_deal: String,
    pub territory: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub annual_revenue: Option<Decimal>,
    pub contacts: String,
    pub erpnext_company: Option<String>,
}

impl ProspectPayload {
    pub fn from_deal(deal: &CrmDeal, erpnext_company: Option<&str>) -> serde_json::Result<Self> {
        Ok(Self {
            organization: deal.organization.clone(),
            lead_name: deal.lead_name.clone(),
            no_of_employees: deal.no_of_employees.clone(),
            deal_owner: deal.deal_owner.clone(),
            crm_deal: deal.name.clone(),
            territory: deal.territory.clone(),
            industry: deal.industry.clone(),
            website: deal.website.clone(),
            annual_revenue: deal.annual_revenue,
            contacts: serde_json::to_string(&get_contacts(deal))?,
            erpnext_company: erpnext_company.map(str::to_string),
        })
    }
}

/// Body of `create_customer`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerPayload {
    pub customer_name: Option<String>,
    pub customer_group: String,
    pub customer_type: String,
    pub territory: Option<String>,
    pub default_currency: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub crm_deal: String,
    pub contacts: String,
}

impl CustomerPayload {
    /// ERPNext names customers after the organization, falling back to the deal.
    pub fn document_name(&self) -> String {
        self.customer_name.clone().unwrap_or_else(|| self.crm_deal.clone())
    }

    pub fn from_deal(deal: &CrmDeal) -> serde_json::Result<Self> {
        Ok(Self {
            customer_name: deal.organization.clone(),
            customer_group: DEFAULT_CUSTOMER_GROUP.to_string(),
            customer_type: DEFAULT_CUSTOMER_TYPE.to_string(),
            territory: deal.territory.clone(),
            default_currency: deal.currency.clone(),
            industry: deal.industry.clone(),
            website: deal.website.clone(),
            crm_deal: deal.name.clone(),
            contacts: serde_json::to_string(&get_contacts(deal))?,
        })
    }
}

/// Persisted record of a failed ERPNext call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLog {
    pub id: Uuid,
    pub method: String,
    pub error: String,
    pub creation: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::deal::CrmDealContact;

    fn won_deal() -> CrmDeal {
        CrmDeal {
            name: "CRM-DEAL-2024-00007".to_string(),
            organization: Some("Acme".to_string()),
            lead_name: Some("Jane Doe".to_string()),
            no_of_employees: Some("11-50".to_string()),
            deal_owner: Some("sales@example.com".to_string()),
            territory: Some("India".to_string()),
            industry: Some("Manufacturing".to_string()),
            website: Some("https://acme.example".to_string()),
            annual_revenue: Some(Decimal::new(1_500_000, 0)),
            currency: Some("INR".to_string()),
            status: "Won".to_string(),
            contacts: vec![CrmDealContact {
                contact: "Jane Doe-Acme".to_string(),
                full_name: Some("Jane Doe".to_string()),
                email: Some("jane@acme.example".to_string()),
                mobile_no: Some("+91 99999 00000".to_string()),
                gender: None,
                is_primary: true,
            }],
        }
    }

    #[test]
    fn test_customer_payload_fixed_fields() {
        let payload = CustomerPayload::from_deal(&won_deal()).unwrap();
        assert_eq!(payload.customer_name.as_deref(), Some("Acme"));
        assert_eq!(payload.customer_group, "All Customer Groups");
        assert_eq!(payload.customer_type, "Company");
        assert_eq!(payload.default_currency.as_deref(), Some("INR"));
        assert_eq!(payload.crm_deal, "CRM-DEAL-2024-00007");
    }

    #[test]
    fn test_contacts_are_json_encoded_string() {
        let payload = ProspectPayload::from_deal(&won_deal(), Some("Acme Holdings")).unwrap();
        let contacts: serde_json::Value = serde_json::from_str(&payload.contacts).unwrap();
        assert_eq!(contacts[0]["contact"], "Jane Doe-Acme");
        assert_eq!(contacts[0]["mobile_no"], "+91 99999 00000");
        assert_eq!(contacts[0]["is_primary"], true);
        assert_eq!(payload.erpnext_company.as_deref(), Some("Acme Holdings"));
        assert_eq!(payload.annual_revenue, Some(Decimal::new(1_500_000, 0)));

        let body = serde_json::to_value(&payload).unwrap();
        assert!(body["contacts"].is_string());
    }

    #[test]
    fn test_annual_revenue_keeps_exact_amount() {
        let deal = CrmDeal {
            annual_revenue: Some(Decimal::new(123_456_789, 2)),
            ..won_deal()
        };
        let payload = ProspectPayload::from_deal(&deal, None).unwrap();
        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(body["annual_revenue"], "1234567.89");
    }
}
