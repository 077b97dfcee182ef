//! API server entry point

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use domain_fulfillment::adapters::{
    HttpPaymentGateway, LocalDocumentStore, PaymentConfig, TracingNotifier,
};
use domain_fulfillment::PolicyLifecycle;
use domain_underwriting::{HttpUnderwritingClient, UnderwritingConfig};
use infra_db::{
    create_pool, run_migrations, DatabaseConfig, PgAccountDirectory, PgEventStore,
    PgPolicyRepository,
};
use interface_api::config::ApiConfig;
use interface_api::create_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().unwrap_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let pool = create_pool(DatabaseConfig::new(&config.database_url))
        .await
        .context("database pool")?;
    run_migrations(&pool).await.context("migrations")?;

    let underwriting = HttpUnderwritingClient::new(UnderwritingConfig {
        base_url: config.underwriting_url.clone(),
        api_key: config.underwriting_api_key.clone(),
        ..Default::default()
    })
    .context("underwriting client")?;

    let payments = HttpPaymentGateway::new(PaymentConfig {
        base_url: config.payment_url.clone(),
        secret_key: config.payment_secret_key.clone(),
        ..Default::default()
    })
    .context("payment gateway client")?;

    let lifecycle = Arc::new(PolicyLifecycle::new(
        Arc::new(PgAccountDirectory::new(pool.clone())),
        Arc::new(PgPolicyRepository::new(pool.clone())),
        Arc::new(PgEventStore::new(pool.clone())),
        Arc::new(payments),
        Arc::new(underwriting),
        Arc::new(LocalDocumentStore::new(&config.documents_dir)),
        Arc::new(TracingNotifier),
    ));

    let app = create_router(lifecycle);
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "server listening");

    axum::serve(listener, app).await.context("server")?;
    Ok(())
}
