mod booklet;
mod config;
mod db;
mod errors;
mod generation;
mod llm_client;
mod models;
mod pool;
mod quota;
mod routes;
mod state;
mod store;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::booklet::{RoundRobinAssignment, S3BundleSink};
use crate::config::Config;
use crate::db::create_pool;
use crate::generation::llm_generator::LlmContentGenerator;
use crate::generation::GenerationOrchestrator;
use crate::llm_client::LlmClient;
use crate::models::QuestionTypeCatalog;
use crate::pool::ContentPool;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgContractStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Examset API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url, config.db_max_connections).await?;
    let store = Arc::new(PgContractStore::new(db));

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let bundles = Arc::new(S3BundleSink::new(s3, config.s3_bucket.clone()));
    info!("S3 bundle sink initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM-backed generator
    let catalog = QuestionTypeCatalog::default();
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.generation_timeout,
        config.llm_rate_limit_retries,
    )?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let generator = LlmContentGenerator::new(
        llm,
        catalog.clone(),
        config.llm_batch_size,
        config.generation_timeout.as_secs(),
    );

    // Content pool and generation state live for the process lifetime
    let orchestrator = Arc::new(GenerationOrchestrator::new(
        Arc::new(generator),
        ContentPool::new(),
        config.generation_timeout,
    ));
    info!(
        "Generation orchestrator ready (timeout: {}s, batch size: {})",
        config.generation_timeout.as_secs(),
        config.llm_batch_size
    );

    let state = AppState {
        store,
        orchestrator,
        bundles,
        assignment: Arc::new(RoundRobinAssignment),
        catalog,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the admin UI host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "examset-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
