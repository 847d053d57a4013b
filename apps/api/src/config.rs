use anyhow::{Context, Result};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Credentials and model name for one LLM backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// Where survey results and feedback are written.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultStoreKind {
    S3,
    Memory,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,

    pub sic_vector_store_url: String,
    pub soc_vector_store_url: String,
    pub vector_store_auth_token: Option<String>,

    pub gemini: Option<LlmBackendConfig>,
    pub openai: Option<LlmBackendConfig>,

    pub sic_lookup_data_path: String,
    pub sic_structure_data_path: Option<String>,
    pub sic_rephrase_data_path: String,
    pub soc_rephrase_data_path: Option<String>,

    pub result_store: ResultStoreKind,
    pub bucket_name: String,
    pub storage_endpoint: String,
    pub storage_region: String,
    pub storage_access_key_id: Option<String>,
    pub storage_secret_access_key: Option<String>,

    pub jwt_secret: Option<String>,
    pub jwt_audience: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let gemini = optional_env("GEMINI_API_KEY").map(|api_key| LlmBackendConfig {
            api_key,
            model: env_or("GEMINI_MODEL", "gemini-1.5-flash"),
            base_url: env_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
        });
        let openai = optional_env("OPENAI_API_KEY").map(|api_key| LlmBackendConfig {
            api_key,
            model: env_or("OPENAI_MODEL", "gpt-4o-mini"),
            base_url: env_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
        });

        let result_store = match env_or("RESULT_STORE", "s3").to_lowercase().as_str() {
            "s3" | "gcs" => ResultStoreKind::S3,
            "memory" => ResultStoreKind::Memory,
            other => anyhow::bail!("RESULT_STORE must be 's3' or 'memory', got '{other}'"),
        };

        Ok(Config {
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            sic_vector_store_url: env_or("SIC_VECTOR_STORE_URL", "http://localhost:8088"),
            soc_vector_store_url: env_or("SOC_VECTOR_STORE_URL", "http://localhost:8089"),
            vector_store_auth_token: optional_env("VECTOR_STORE_AUTH_TOKEN"),
            gemini,
            openai,
            sic_lookup_data_path: env_or("SIC_LOOKUP_DATA_PATH", "data/sic_lookup_data.csv"),
            sic_structure_data_path: optional_env("SIC_STRUCTURE_DATA_PATH"),
            sic_rephrase_data_path: env_or(
                "SIC_REPHRASE_DATA_PATH",
                "data/sic_rephrased_descriptions.csv",
            ),
            soc_rephrase_data_path: optional_env("SOC_REPHRASE_DATA_PATH"),
            result_store,
            bucket_name: env_or("GCP_BUCKET_NAME", "sandbox-survey-assist"),
            storage_endpoint: env_or("STORAGE_ENDPOINT", "https://storage.googleapis.com"),
            storage_region: env_or("STORAGE_REGION", "auto"),
            storage_access_key_id: optional_env("STORAGE_ACCESS_KEY_ID"),
            storage_secret_access_key: optional_env("STORAGE_SECRET_ACCESS_KEY"),
            jwt_secret: optional_env("JWT_SECRET"),
            jwt_audience: optional_env("JWT_AUDIENCE"),
        })
    }

    /// Name of the model used when describing the service in `/config`.
    /// Gemini is the primary backend; ChatGPT is reported only when it is the sole one.
    pub fn primary_llm_model(&self) -> &str {
        self.gemini
            .as_ref()
            .or(self.openai.as_ref())
            .map(|b| b.model.as_str())
            .unwrap_or("unconfigured")
    }

    pub fn data_store_name(&self) -> &'static str {
        match self.result_store {
            ResultStoreKind::S3 => "object_storage",
            ResultStoreKind::Memory => "memory",
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
impl Config {
    /// Configuration pointing every upstream at the given base URL.
    pub fn for_tests(upstream_url: &str) -> Self {
        let backend = |model: &str| LlmBackendConfig {
            api_key: "test-key".to_string(),
            model: model.to_string(),
            base_url: upstream_url.to_string(),
        };
        Config {
            port: 0,
            rust_log: "debug".to_string(),
            sic_vector_store_url: upstream_url.to_string(),
            soc_vector_store_url: upstream_url.to_string(),
            vector_store_auth_token: None,
            gemini: Some(backend("gemini-1.5-flash")),
            openai: Some(backend("gpt-4o-mini")),
            sic_lookup_data_path: String::new(),
            sic_structure_data_path: None,
            sic_rephrase_data_path: String::new(),
            soc_rephrase_data_path: None,
            result_store: ResultStoreKind::Memory,
            bucket_name: "test-bucket".to_string(),
            storage_endpoint: String::new(),
            storage_region: "auto".to_string(),
            storage_access_key_id: None,
            storage_secret_access_key: None,
            jwt_secret: None,
            jwt_audience: None,
        }
    }
}
