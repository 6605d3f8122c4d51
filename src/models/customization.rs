use serde::{Deserialize, Serialize};

/// Declarative override of a field property, keyed by doctype, field and property.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertySetter {
    pub name: String,
    pub doc_type: String,
    pub field_name: String,
    pub property: String,
    pub property_type: String,
    pub value: String,
}

impl PropertySetter {
    pub fn new(doc_type: &str, field_name: &str, property: &str, property_type: &str, value: &str) -> Self {
        Self {
            name: Self::name_for(doc_type, field_name, property),
            doc_type: doc_type.to_string(),
            field_name: field_name.to_string(),
            property: property.to_string(),
            property_type: property_type.to_string(),
            value: value.to_string(),
        }
    }

    pub fn name_for(doc_type: &str, field_name: &str, property: &str) -> String {
        format!("{}-{}-{}", doc_type, field_name, property)
    }
}

/// Client-side script injected into a CRM form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrmFormScript {
    pub name: String,
    pub dt: String,
    pub view: String,
    pub script: String,
    pub enabled: bool,
    pub is_standard: bool,
}

#[derive(Debug, Deserialize)]
pub struct FormScriptQuery {
    pub dt: String,
    #[serde(default = "default_view")]
    pub view: String,
}

fn default_view() -> String {
    "Form".to_string()
}

/// Custom field provisioned on an ERPNext doctype.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomField {
    pub dt: String,
    pub fieldname: String,
    pub fieldtype: String,
    pub label: String,
    pub insert_after: Option<String>,
}

impl CustomField {
    pub fn name(&self) -> String {
        format!("{}-{}", self.dt, self.fieldname)
    }
}

/// Fields ERPNext needs to link its documents back to a CRM deal.
pub fn frappe_crm_custom_fields() -> Vec<CustomField> {
    ["Quotation", "Customer", "Prospect"]
        .into_iter()
        .map(|dt| CustomField {
            dt: dt.to_string(),
            fieldname: "crm_deal".to_string(),
            fieldtype: "Data".to_string(),
            label: "CRM Deal".to_string(),
            insert_after: Some(
                match dt {
                    "Quotation" => "party_name",
                    "Customer" => "prospect_name",
                    _ => "company_name",
                }
                .to_string(),
            ),
        })
        .collect()
}
