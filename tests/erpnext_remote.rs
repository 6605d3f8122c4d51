// Remote ERPNext flows against a mock ERPNext site.
// Run with: cargo test --test erpnext_remote

mod common;

use std::sync::Arc;

use common::{build_service, remote_settings, sample_deal, start_mock_erpnext, API_SECRET};
use erpnext_crm_sync::models::ErpNextCrmSettings;
use erpnext_crm_sync::repositories::InMemoryRepository;

#[tokio::test]
async fn test_quotation_url_creates_one_prospect() {
    let (site_url, state) = start_mock_erpnext().await;
    let repo = Arc::new(InMemoryRepository::default());
    repo.insert_deal(sample_deal("DEAL-001", "Negotiation")).await;
    let service = build_service(&repo);

    let url = service
        .get_quotation_url(&remote_settings(&site_url), "DEAL-001", Some("Acme"))
        .await
        .unwrap();

    assert_eq!(
        url,
        format!(
            "{}/app/quotation/new?quotation_to=Prospect&crm_deal=DEAL-001&party_name=Acme",
            site_url
        )
    );

    let state = state.read().await;
    assert_eq!(state.calls.len(), 1);
    let call = &state.calls[0];
    assert_eq!(call.method, "erpnext.crm.frappe_crm_api.create_prospect_against_crm_deal");
    assert_eq!(call.body["crm_deal"], "DEAL-001");
    assert_eq!(call.body["no_of_employees"], "51-200");
    assert_eq!(call.body["deal_owner"], "owner@crm.example.com");
    assert_eq!(call.body["erpnext_company"], "Acme Holdings");

    let contacts: serde_json::Value =
        serde_json::from_str(call.body["contacts"].as_str().unwrap()).unwrap();
    assert_eq!(contacts.as_array().unwrap().len(), 2);
    assert_eq!(contacts[0]["contact"], "Jane Doe");
    assert_eq!(contacts[1]["contact"], "John Roe");

    // Nothing is written to the CRM site itself.
    assert_eq!(repo.erpnext_calls().await, 0);
}

#[tokio::test]
async fn test_remote_validation_provisions_custom_fields() {
    let (site_url, state) = start_mock_erpnext().await;
    let repo = Arc::new(InMemoryRepository::default());
    let service = build_service(&repo);

    service.validate_settings(&remote_settings(&site_url)).await.unwrap();

    let state = state.read().await;
    assert_eq!(state.calls.len(), 1);
    assert_eq!(
        state.calls[0].method,
        "erpnext.crm.frappe_crm_api.create_custom_fields_for_frappe_crm"
    );
    assert!(repo.property_setters().await.is_empty());
    assert_eq!(repo.form_scripts().await.len(), 1);
    assert!(repo.custom_fields().await.is_empty());
}

#[tokio::test]
async fn test_won_deal_creates_remote_customer() {
    let (site_url, state) = start_mock_erpnext().await;
    let repo = Arc::new(InMemoryRepository::default());
    let service = build_service(&repo);
    let settings = remote_settings(&site_url);

    for status in ["Open", "Lost", "won"] {
        service
            .create_customer_in_erpnext(&settings, &sample_deal("DEAL-002", status))
            .await
            .unwrap();
    }
    assert!(state.read().await.calls.is_empty());

    service
        .create_customer_in_erpnext(&settings, &sample_deal("DEAL-002", "Won"))
        .await
        .unwrap();

    let state = state.read().await;
    assert_eq!(state.calls.len(), 1);
    let body = &state.calls[0].body;
    assert_eq!(state.calls[0].method, "erpnext.crm.frappe_crm_api.create_customer");
    assert_eq!(body["customer_name"], "Acme");
    assert_eq!(body["customer_group"], "All Customer Groups");
    assert_eq!(body["customer_type"], "Company");
    assert_eq!(body["default_currency"], "USD");
    assert_eq!(body["crm_deal"], "DEAL-002");
    assert!(body["contacts"].is_string());
}

#[tokio::test]
async fn test_remote_failure_detail_only_in_error_log() {
    let (site_url, state) = start_mock_erpnext().await;
    state.write().await.fail_with =
        Some("frappe.exceptions.ValidationError: Territory Atlantis not found".to_string());

    let repo = Arc::new(InMemoryRepository::default());
    repo.insert_deal(sample_deal("DEAL-003", "Proposal")).await;
    let service = build_service(&repo);
    let settings = remote_settings(&site_url);

    let prospect_err = service
        .get_quotation_url(&settings, "DEAL-003", Some("Acme"))
        .await
        .unwrap_err();
    let customer_err = service
        .create_customer_in_erpnext(&settings, &sample_deal("DEAL-003", "Won"))
        .await
        .unwrap_err();

    for err in [&prospect_err, &customer_err] {
        let message = err.to_string();
        assert!(message.ends_with("check error log for more details"));
        assert!(!message.contains("Atlantis"));
    }

    let logs = repo.error_logs().await;
    assert_eq!(logs.len(), 2);
    for log in &logs {
        assert!(log.error.contains("Territory Atlantis not found"));
        assert!(log.method.contains(&site_url));
    }
}

#[tokio::test]
async fn test_rejected_credentials_are_logged() {
    let (site_url, _state) = start_mock_erpnext().await;
    let repo = Arc::new(InMemoryRepository::default());
    let service = build_service(&repo);
    let settings = ErpNextCrmSettings {
        api_secret: Some("wrong".to_string()),
        ..remote_settings(&site_url)
    };

    let err = service.validate_settings(&settings).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Error while creating custom field in ERPNext, check error log for more details"
    );
    let logs = repo.error_logs().await;
    assert_eq!(logs.len(), 1);
    assert!(logs[0].error.contains("Invalid API key or secret"));
    assert!(!logs[0].error.contains(API_SECRET));
    // Provisioning stops before the form script.
    assert!(repo.form_scripts().await.is_empty());
}
