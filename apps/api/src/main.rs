mod auth;
mod classification;
mod config;
mod errors;
mod extract;
mod llm_client;
mod lookup;
mod results;
mod routes;
mod state;
mod vector_store;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::JwtVerifier;
use crate::classification::models::Flavour;
use crate::classification::rephrase::{RephraseCatalog, RephraseTable};
use crate::config::{Config, ResultStoreKind};
use crate::llm_client::{LlmBackend, LlmClient};
use crate::lookup::sic_lookup::SicLookup;
use crate::results::store::{MemoryResultStore, ResultStore, S3ResultStore};
use crate::routes::build_router;
use crate::state::AppState;
use crate::vector_store::VectorStoreClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Survey Assist API v{}", env!("CARGO_PKG_VERSION"));

    // Reference data
    let sic_lookup = SicLookup::load(
        &config.sic_lookup_data_path,
        config.sic_structure_data_path.as_deref().map(Path::new),
    )?;
    let rephrase = RephraseCatalog {
        sic: Some(RephraseTable::load(Flavour::Sic, &config.sic_rephrase_data_path)?),
        soc: config
            .soc_rephrase_data_path
            .as_deref()
            .map(|path| RephraseTable::load(Flavour::Soc, path))
            .transpose()?,
    };

    // Vector stores
    let sic_vector_store = VectorStoreClient::new(
        Flavour::Sic,
        &config.sic_vector_store_url,
        config.vector_store_auth_token.clone(),
    )?;
    let soc_vector_store = VectorStoreClient::new(
        Flavour::Soc,
        &config.soc_vector_store_url,
        config.vector_store_auth_token.clone(),
    )?;
    info!(
        "Vector stores: SIC at {}, SOC at {}",
        config.sic_vector_store_url, config.soc_vector_store_url
    );

    // Initialize LLM client
    let llm = LlmClient::new(config.gemini.clone(), config.openai.clone())?;
    for backend in [LlmBackend::Gemini, LlmBackend::ChatGpt] {
        match llm.model_name(backend) {
            Some(model) => info!("LLM backend {backend} initialized (model: {model})"),
            None => warn!("LLM backend {backend} not configured; requests for it will fail"),
        }
    }

    // Result storage
    let results: Arc<dyn ResultStore> = match config.result_store {
        ResultStoreKind::S3 => {
            let s3 = build_s3_client(&config).await;
            Arc::new(S3ResultStore::new(s3, &config.bucket_name))
        }
        ResultStoreKind::Memory => Arc::new(MemoryResultStore::new()),
    };
    info!(
        "Result store: {} (bucket: {})",
        results.backend(),
        config.bucket_name
    );

    let auth = config
        .jwt_secret
        .as_deref()
        .map(|secret| JwtVerifier::new(secret, config.jwt_audience.as_deref()));
    if auth.is_none() {
        info!("JWT_SECRET not set; authentication is left to the API gateway");
    }

    // Build app state
    let state = AppState {
        config: config.clone(),
        llm,
        sic_vector_store,
        soc_vector_store,
        sic_lookup: Arc::new(sic_lookup),
        rephrase: Arc::new(rephrase),
        results,
        auth,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port)
        .parse()
        .context("Invalid listen address")?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client for the result bucket. Static HMAC keys are used when
/// configured (GCS interoperability, MinIO); otherwise the default AWS chain.
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.storage_region.clone()))
        .endpoint_url(&config.storage_endpoint);

    if let (Some(key_id), Some(secret)) = (
        &config.storage_access_key_id,
        &config.storage_secret_access_key,
    ) {
        loader = loader.credentials_provider(Credentials::new(
            key_id,
            secret,
            None,
            None,
            "survey-assist-static",
        ));
    }

    let shared = loader.load().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
