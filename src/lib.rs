pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::erpnext_crm::{
    get_quotation_url, get_settings, list_error_logs, list_form_scripts, post_quotation_url,
    update_deal, update_settings,
};
use crate::middleware::{auth_middleware, system_manager_middleware, JwtService};
use crate::services::ErpNextCrmService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ErpNextCrmService>,
    pub jwt: Arc<JwtService>,
}

impl AppState {
    pub fn new(service: ErpNextCrmService, jwt: JwtService) -> Self {
        Self {
            service: Arc::new(service),
            jwt: Arc::new(jwt),
        }
    }
}

pub fn create_app(state: AppState, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    // Settings hold the ERPNext credentials; the error log holds raw ERPNext
    // responses. Both are System Manager only.
    let system_manager_routes = Router::new()
        .route(
            "/api/erpnext-crm-settings",
            get(get_settings).put(update_settings),
        )
        .route("/api/error-logs", get(list_error_logs))
        .layer(axum::middleware::from_fn(system_manager_middleware))
        .layer(axum::middleware::from_fn_with_state(state.jwt.clone(), auth_middleware));

    let user_routes = Router::new()
        .route(
            "/api/method/erpnext_crm_sync.get_quotation_url",
            get(get_quotation_url).post(post_quotation_url),
        )
        .route("/api/crm-deals/:name", put(update_deal))
        .route("/api/crm-form-scripts", get(list_form_scripts))
        .layer(axum::middleware::from_fn_with_state(state.jwt.clone(), auth_middleware));

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({ "status": "ok" })) }))
        .merge(system_manager_routes)
        .merge(user_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(middleware::request_log_middleware))
}
