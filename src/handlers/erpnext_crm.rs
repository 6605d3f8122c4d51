// ERPNext CRM API Handlers
// Settings, quotation hand-off, deal updates and form scripts. Settings are
// loaded once per request and passed down to the service.

use axum::{
    extract::{Extension, Path, Query, State},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};

use crate::middleware::error_handling::Result;
use crate::middleware::Claims;
use crate::models::{
    CrmDeal, CrmFormScript, ErrorLog, FormScriptQuery, SettingsResponse, UpdateDealRequest,
    UpdateSettingsRequest,
};
use crate::AppState;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct QuotationUrlParams {
    pub crm_deal: String,
    pub organization: Option<String>,
}

/// Whitelisted-method envelope expected by form scripts' `call()`.
#[derive(Debug, Serialize)]
pub struct MethodResponse<T> {
    pub message: T,
}

#[derive(Debug, Deserialize)]
pub struct ErrorLogQuery {
    pub limit: Option<i64>,
}

// ============================================================================
// Settings
// ============================================================================

/// GET /api/erpnext-crm-settings
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<SettingsResponse>> {
    let settings = state.service.load_settings().await?;
    Ok(Json(SettingsResponse::from(&settings)))
}

/// PUT /api/erpnext-crm-settings
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>> {
    tracing::info!(user = %claims.sub, "Updating ERPNext CRM settings");
    let settings = state.service.save_settings(request).await?;
    Ok(Json(SettingsResponse::from(&settings)))
}

// ============================================================================
// Quotation
// ============================================================================

/// GET /api/method/erpnext_crm_sync.get_quotation_url
pub async fn get_quotation_url(
    State(state): State<AppState>,
    Query(params): Query<QuotationUrlParams>,
) -> Result<impl IntoResponse> {
    quotation_url(state, params).await
}

/// POST /api/method/erpnext_crm_sync.get_quotation_url
pub async fn post_quotation_url(
    State(state): State<AppState>,
    Json(params): Json<QuotationUrlParams>,
) -> Result<impl IntoResponse> {
    quotation_url(state, params).await
}

async fn quotation_url(state: AppState, params: QuotationUrlParams) -> Result<Json<MethodResponse<String>>> {
    let settings = state.service.load_settings().await?;
    let url = state
        .service
        .get_quotation_url(&settings, &params.crm_deal, params.organization.as_deref())
        .await?;
    Ok(Json(MethodResponse { message: url }))
}

// ============================================================================
// Deals
// ============================================================================

/// PUT /api/crm-deals/:name
pub async fn update_deal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(name): Path<String>,
    Json(request): Json<UpdateDealRequest>,
) -> Result<Json<CrmDeal>> {
    tracing::info!(user = %claims.sub, crm_deal = %name, status = %request.status, "Updating CRM Deal");
    let settings = state.service.load_settings().await?;
    let deal = state
        .service
        .update_deal_status(&settings, &name, &request.status)
        .await?;
    Ok(Json(deal))
}

// ============================================================================
// Form scripts and error log
// ============================================================================

/// GET /api/crm-form-scripts?dt=CRM%20Deal&view=Form
pub async fn list_form_scripts(
    State(state): State<AppState>,
    Query(query): Query<FormScriptQuery>,
) -> Result<Json<Vec<CrmFormScript>>> {
    Ok(Json(state.service.form_scripts(&query.dt, &query.view).await?))
}

/// GET /api/error-logs
pub async fn list_error_logs(
    State(state): State<AppState>,
    Query(query): Query<ErrorLogQuery>,
) -> Result<Json<Vec<ErrorLog>>> {
    let limit = query.limit.unwrap_or(20);
    Ok(Json(state.service.recent_error_logs(limit).await?))
}
