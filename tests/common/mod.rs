// Shared test fixtures: an in-memory CRM site and a mock remote ERPNext site.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use erpnext_crm_sync::middleware::{auth::SYSTEM_MANAGER_ROLE, JwtService};
use erpnext_crm_sync::models::{CrmDeal, CrmDealContact, ErpNextCrmSettings};
use erpnext_crm_sync::repositories::{InMemoryRepository, Repositories};
use erpnext_crm_sync::services::{EncryptionService, ErpNextCrmService};

pub const CRM_SITE_URL: &str = "https://crm.example.com";
pub const API_KEY: &str = "remote-key";
pub const API_SECRET: &str = "remote-secret";
pub const JWT_SECRET: &str = "integration-test-jwt-secret";

// ============================================================================
// Mock ERPNext site
// ============================================================================

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Default)]
pub struct MockErpNextState {
    pub calls: Vec<RecordedCall>,
    /// When set, every method fails with this exception text.
    pub fail_with: Option<String>,
}

pub type SharedState = Arc<RwLock<MockErpNextState>>;

async fn call_method(
    State(state): State<SharedState>,
    Path(method): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut state = state.write().await;
    state.calls.push(RecordedCall {
        method: method.clone(),
        authorization: authorization.clone(),
        body: body.clone(),
    });

    let expected = format!("token {}:{}", API_KEY, API_SECRET);
    if authorization.as_deref() != Some(expected.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "exc_type": "AuthenticationError", "exception": "Invalid API key or secret" })),
        );
    }

    if let Some(exception) = &state.fail_with {
        return (
            StatusCode::EXPECTATION_FAILED,
            Json(json!({ "exc_type": "ValidationError", "exception": exception })),
        );
    }

    match method.as_str() {
        "erpnext.crm.frappe_crm_api.create_prospect_against_crm_deal" => {
            let name = body["organization"].as_str().unwrap_or("PROS-0001").to_string();
            (StatusCode::OK, Json(json!({ "message": name })))
        }
        "erpnext.crm.frappe_crm_api.create_custom_fields_for_frappe_crm"
        | "erpnext.crm.frappe_crm_api.create_customer" => (StatusCode::OK, Json(json!({}))),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "exc_type": "DoesNotExistError", "exception": format!("No method {}", method) })),
        ),
    }
}

pub fn create_erpnext_mock_server(state: SharedState) -> Router {
    Router::new()
        .route("/api/method/:method", post(call_method))
        .with_state(state)
}

/// Starts the mock on a random local port and returns its base URL.
pub async fn start_mock_erpnext() -> (String, SharedState) {
    let state: SharedState = Arc::new(RwLock::new(MockErpNextState::default()));
    let app = create_erpnext_mock_server(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

// ============================================================================
// CRM site
// ============================================================================

pub fn build_service(repo: &Arc<InMemoryRepository>) -> ErpNextCrmService {
    let encryption = EncryptionService::new(&EncryptionService::generate_key()).unwrap();
    ErpNextCrmService::new(
        Repositories::from_shared(repo.clone()),
        encryption,
        CRM_SITE_URL,
        Duration::from_secs(5),
    )
}

pub fn jwt_service() -> JwtService {
    JwtService::new(JWT_SECRET)
}

/// `Authorization` header value for a site user with the given roles.
pub fn bearer(user: &str, roles: &[&str]) -> HeaderValue {
    let token = jwt_service().generate_token(user, roles).unwrap();
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

pub fn system_manager() -> HeaderValue {
    bearer("admin@crm.example.com", &[SYSTEM_MANAGER_ROLE])
}

pub fn sales_user() -> HeaderValue {
    bearer("sales@crm.example.com", &["Sales User"])
}

pub fn remote_settings(site_url: &str) -> ErpNextCrmSettings {
    ErpNextCrmSettings {
        enabled: true,
        is_erpnext_in_the_current_site: false,
        erpnext_site_url: Some(site_url.to_string()),
        api_key: Some(API_KEY.to_string()),
        api_secret: Some(API_SECRET.to_string()),
        erpnext_company: Some("Acme Holdings".to_string()),
    }
}

pub fn sample_deal(name: &str, status: &str) -> CrmDeal {
    CrmDeal {
        name: name.to_string(),
        organization: Some("Acme".to_string()),
        lead_name: Some("Jane Doe".to_string()),
        no_of_employees: Some("51-200".to_string()),
        deal_owner: Some("owner@crm.example.com".to_string()),
        territory: Some("United States".to_string()),
        industry: Some("Technology".to_string()),
        website: Some("https://acme.example".to_string()),
        annual_revenue: Some(Decimal::new(2_000_000, 0)),
        currency: Some("USD".to_string()),
        status: status.to_string(),
        contacts: vec![
            CrmDealContact {
                contact: "Jane Doe".to_string(),
                full_name: Some("Jane Doe".to_string()),
                email: Some("jane@acme.example".to_string()),
                mobile_no: Some("+1 555 0100".to_string()),
                gender: Some("Female".to_string()),
                is_primary: true,
            },
            CrmDealContact {
                contact: "John Roe".to_string(),
                full_name: Some("John Roe".to_string()),
                email: Some("john@acme.example".to_string()),
                mobile_no: None,
                gender: None,
                is_primary: false,
            },
        ],
    }
}
