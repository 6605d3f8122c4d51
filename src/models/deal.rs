use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEAL_STATUS_WON: &str = "Won";
pub const DEAL_STATUS_LOST: &str = "Lost";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CrmDeal {
    pub name: String,
    pub organization: Option<String>,
    pub lead_name: Option<String>,
    pub no_of_employees: Option<String>,
    pub deal_owner: Option<String>,
    pub territory: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub annual_revenue: Option<Decimal>,
    pub currency: Option<String>,
    pub status: String,
    #[serde(default)]
    pub contacts: Vec<CrmDealContact>,
}

impl CrmDeal {
    /// Exact, case-sensitive match: "won" or "WON" do not count.
    pub fn is_won(&self) -> bool {
        self.status == DEAL_STATUS_WON
    }
}

/// Contact row attached to a deal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CrmDealContact {
    pub contact: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub mobile_no: Option<String>,
    pub gender: Option<String>,
    pub is_primary: bool,
}

/// Projection of a deal contact sent to ERPNext.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DealContact {
    pub contact: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub mobile_no: Option<String>,
    pub gender: Option<String>,
    pub is_primary: bool,
}

impl From<&CrmDealContact> for DealContact {
    fn from(c: &CrmDealContact) -> Self {
        Self {
            contact: c.contact.clone(),
            full_name: c.full_name.clone(),
            email: c.email.clone(),
            mobile_no: c.mobile_no.clone(),
            gender: c.gender.clone(),
            is_primary: c.is_primary,
        }
    }
}

/// Projects a deal's contacts in source order.
pub fn get_contacts(deal: &CrmDeal) -> Vec<DealContact> {
    deal.contacts.iter().map(DealContact::from).collect()
}

#[derive(Debug, Deserialize)]
pub struct UpdateDealRequest {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(id: &str, primary: bool) -> CrmDealContact {
        CrmDealContact {
            contact: id.to_string(),
            full_name: Some(format!("{} Person", id)),
            email: Some(format!("{}@example.com", id.to_lowercase())),
            mobile_no: None,
            gender: Some("Female".to_string()),
            is_primary: primary,
        }
    }

    #[test]
    fn test_get_contacts_preserves_order() {
        let deal = CrmDeal {
            name: "CRM-DEAL-0001".to_string(),
            contacts: vec![contact("B", false), contact("A", true), contact("C", false)],
            ..Default::default()
        };

        let projected = get_contacts(&deal);
        let ids: Vec<_> = projected.iter().map(|c| c.contact.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
        assert!(projected[1].is_primary);
        assert_eq!(projected[0].email.as_deref(), Some("b@example.com"));
    }

    #[test]
    fn test_get_contacts_empty() {
        assert!(get_contacts(&CrmDeal::default()).is_empty());
    }

    #[test]
    fn test_is_won_is_case_sensitive() {
        let mut deal = CrmDeal::default();
        for status in ["Open", "Lost", "won", "WON", ""] {
            deal.status = status.to_string();
            assert!(!deal.is_won(), "{} should not count as won", status);
        }
        deal.status = "Won".to_string();
        assert!(deal.is_won());
    }
}
