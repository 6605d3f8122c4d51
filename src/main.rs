use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use erpnext_crm_sync::config::AppConfig;
use erpnext_crm_sync::middleware::JwtService;
use erpnext_crm_sync::repositories::{PgRepository, Repositories};
use erpnext_crm_sync::services::{EncryptionService, ErpNextCrmService};
use erpnext_crm_sync::{create_app, AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to INFO; override with RUST_LOG.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "erpnext_crm_sync=info,tower_http=info,sqlx=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let pool = config
        .database
        .connect()
        .await
        .context("Failed to connect to the site database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("✅ Database migrations applied");

    let encryption = EncryptionService::new(&config.encryption_key)
        .context("ENCRYPTION_KEY must be a base64-encoded 32-byte key")?;

    let service = ErpNextCrmService::new(
        Repositories::from_shared(Arc::new(PgRepository::new(pool))),
        encryption,
        config.crm_site_url.clone(),
        config.erpnext_request_timeout,
    );

    let jwt = JwtService::new(&config.jwt_secret);
    let app = create_app(AppState::new(service, jwt), &config.cors_origins);

    let addr = config.server_address();
    tracing::info!("🚀 ERPNext CRM sync listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
