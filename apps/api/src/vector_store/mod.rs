//! Vector store client: similarity search over SIC / SOC code embeddings.
//!
//! The two stores expose the same API under different path prefixes
//! (`/v1/sic-vector-store/...`, `/v1/soc-vector-store/...`).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::classification::models::Flavour;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("{service} unavailable: {message}")]
    Unavailable {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned an unexpected payload: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },
}

/// A single nearest-neighbour hit returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub code: String,
    pub title: String,
    pub distance: f64,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    industry_descr: Option<&'a str>,
    job_title: &'a str,
    job_description: &'a str,
}

/// Stores answer either `{"results": [...]}` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchPayload {
    Wrapped { results: Vec<SearchResult> },
    Bare(Vec<SearchResult>),
}

#[derive(Clone)]
pub struct VectorStoreClient {
    flavour: Flavour,
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl VectorStoreClient {
    pub fn new(
        flavour: Flavour,
        base_url: &str,
        auth_token: Option<String>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            flavour,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
            client: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
        })
    }

    pub fn service_name(&self) -> &'static str {
        match self.flavour {
            Flavour::Sic => "SIC vector store",
            Flavour::Soc => "SOC vector store",
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/v1/{}-vector-store/{endpoint}",
            self.base_url,
            self.flavour.as_str()
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn unavailable(&self, message: impl ToString) -> VectorStoreError {
        VectorStoreError::Unavailable {
            service: self.service_name(),
            message: message.to_string(),
        }
    }

    /// Reports whether the embeddings are loaded. The payload is passed through untouched.
    pub async fn status(&self) -> Result<serde_json::Value, VectorStoreError> {
        let url = self.url("status");
        info!("Checking {} status at {url}", self.service_name());

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        let status = response.status();
        debug!("{} status response: {status}", self.service_name());
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.unavailable(format!("status {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| VectorStoreError::InvalidResponse {
                service: self.service_name(),
                message: e.to_string(),
            })
    }

    /// Returns the nearest codes for a survey response, closest first.
    pub async fn search(
        &self,
        industry_descr: Option<&str>,
        job_title: &str,
        job_description: &str,
    ) -> Result<Vec<SearchResult>, VectorStoreError> {
        let url = self.url("search-index");
        info!("Searching {} at {url}", self.service_name());

        let response = self
            .authorize(self.client.post(&url))
            .json(&SearchRequest {
                industry_descr,
                job_title,
                job_description,
            })
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.unavailable(format!("status {status}: {body}")));
        }

        let payload: SearchPayload =
            response
                .json()
                .await
                .map_err(|e| VectorStoreError::InvalidResponse {
                    service: self.service_name(),
                    message: e.to_string(),
                })?;

        let results = match payload {
            SearchPayload::Wrapped { results } => results,
            SearchPayload::Bare(results) => results,
        };
        debug!("{} returned {} results", self.service_name(), results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_search_accepts_wrapped_results() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/sic-vector-store/search-index")
            .match_body(Matcher::PartialJson(json!({
                "industry_descr": "Construction company",
                "job_title": "Electrician"
            })))
            .with_status(200)
            .with_body(
                json!({"results": [{"code": "43210", "title": "Electrical installation", "distance": 0.05}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = VectorStoreClient::new(Flavour::Sic, &server.url(), None).unwrap();
        let results = client
            .search(Some("Construction company"), "Electrician", "Wiring houses")
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].code, "43210");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_accepts_bare_array_and_sends_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/soc-vector-store/search-index")
            .match_header("authorization", "Bearer id-token")
            .with_status(200)
            .with_body(
                json!([
                    {"code": "5241", "title": "Electricians and electrical fitters", "distance": 0.123},
                    {"code": "5242", "title": "Telecommunications engineers", "distance": 0.456}
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let client =
            VectorStoreClient::new(Flavour::Soc, &server.url(), Some("id-token".into())).unwrap();
        let results = client.search(None, "Electrician", "Wiring").await.unwrap();
        assert_eq!(results.len(), 2);
        assert!((results[1].distance - 0.456).abs() < f64::EPSILON);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_passes_payload_through() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/sic-vector-store/status")
            .with_status(200)
            .with_body(json!({"status": "ready", "embedding_model": "all-MiniLM-L6-v2"}).to_string())
            .create_async()
            .await;

        let client = VectorStoreClient::new(Flavour::Sic, &server.url(), None).unwrap();
        let status = client.status().await.unwrap();
        assert_eq!(status["status"], "ready");
    }

    #[tokio::test]
    async fn test_upstream_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/sic-vector-store/status")
            .with_status(500)
            .create_async()
            .await;

        let client = VectorStoreClient::new(Flavour::Sic, &server.url(), None).unwrap();
        let err = client.status().await.unwrap_err();
        assert!(matches!(err, VectorStoreError::Unavailable { .. }));
        assert!(err.to_string().contains("SIC vector store"));
    }

    #[tokio::test]
    async fn test_connection_failure_is_unavailable() {
        // Nothing listens on port 9 (discard) in the test environment.
        let client = VectorStoreClient::new(Flavour::Sic, "http://127.0.0.1:9", None).unwrap();
        let err = client.search(None, "a", "b").await.unwrap_err();
        assert!(matches!(err, VectorStoreError::Unavailable { .. }));
    }
}
