// ============================================================================
// Authentication - bearer JWTs and role checks
// ============================================================================
//
// Usage:
//   .layer(middleware::from_fn(system_manager_middleware))          // role check
//   .layer(middleware::from_fn_with_state(jwt, auth_middleware))   // runs first
//
// ============================================================================

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Role allowed to manage the integration settings and read the error log.
pub const SYSTEM_MANAGER_ROLE: &str = "System Manager";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Site user, usually an email address.
    pub sub: String,
    pub roles: Vec<String>,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_system_manager(&self) -> bool {
        self.has_role(SYSTEM_MANAGER_ROLE)
    }
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
        }
    }

    pub fn generate_token(&self, user: &str, roles: &[&str]) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp().max(0) as usize;

        // System managers get 2 hours, everyone else 24.
        let ttl = if roles.contains(&SYSTEM_MANAGER_ROLE) {
            2 * 60 * 60
        } else {
            24 * 60 * 60
        };

        let claims = Claims {
            sub: user.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: now + ttl,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
    }

    pub fn extract_token_from_header(auth_header: &str) -> Option<&str> {
        auth_header.strip_prefix("Bearer ")
    }
}

/// Rejects requests without a valid bearer token and stores the [`Claims`]
/// in the request extensions.
pub async fn auth_middleware(
    State(jwt): State<Arc<JwtService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(JwtService::extract_token_from_header)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = jwt.validate_token(token).map_err(|e| {
        tracing::warn!("Rejected bearer token: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Must be layered inside [`auth_middleware`].
pub async fn system_manager_middleware(request: Request, next: Next) -> Result<Response, StatusCode> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !claims.is_system_manager() {
        tracing::warn!(user = %claims.sub, uri = %request.uri(), "System Manager access denied");
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}
