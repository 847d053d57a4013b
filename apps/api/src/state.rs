use std::sync::Arc;

use crate::auth::JwtVerifier;
use crate::classification::models::Flavour;
use crate::classification::rephrase::RephraseCatalog;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::lookup::sic_lookup::SicLookup;
use crate::results::store::ResultStore;
use crate::vector_store::VectorStoreClient;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub llm: LlmClient,
    pub sic_vector_store: VectorStoreClient,
    pub soc_vector_store: VectorStoreClient,
    pub sic_lookup: Arc<SicLookup>,
    pub rephrase: Arc<RephraseCatalog>,
    /// Pluggable result store. Object storage in deployment, memory in tests.
    pub results: Arc<dyn ResultStore>,
    /// `None` when authentication is left to the API gateway.
    pub auth: Option<JwtVerifier>,
}

impl AppState {
    pub fn vector_store(&self, flavour: Flavour) -> &VectorStoreClient {
        match flavour {
            Flavour::Sic => &self.sic_vector_store,
            Flavour::Soc => &self.soc_vector_store,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State with every upstream at `upstream_url`, an in-memory store and no auth.
    pub fn for_tests(
        upstream_url: &str,
        results: Arc<crate::results::store::MemoryResultStore>,
    ) -> Self {
        let config = Config::for_tests(upstream_url);
        let llm = LlmClient::new(config.gemini.clone(), config.openai.clone())
            .unwrap()
            .with_retry_policy(1, std::time::Duration::from_millis(1));
        AppState {
            sic_vector_store: VectorStoreClient::new(Flavour::Sic, upstream_url, None).unwrap(),
            soc_vector_store: VectorStoreClient::new(Flavour::Soc, upstream_url, None).unwrap(),
            llm,
            sic_lookup: Arc::new(SicLookup::default()),
            rephrase: Arc::new(RephraseCatalog::default()),
            results,
            auth: None,
            config,
        }
    }
}
