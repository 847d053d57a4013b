use serde::{Deserialize, Serialize};

use crate::llm_client::LlmBackend;

/// Classification requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationType {
    Sic,
    Soc,
    SicSoc,
}

impl ClassificationType {
    /// The individual classifications this request expands to, in response order.
    pub fn flavours(self) -> &'static [Flavour] {
        match self {
            ClassificationType::Sic => &[Flavour::Sic],
            ClassificationType::Soc => &[Flavour::Soc],
            ClassificationType::SicSoc => &[Flavour::Sic, Flavour::Soc],
        }
    }
}

/// A single code system: industry (SIC) or occupation (SOC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavour {
    Sic,
    Soc,
}

impl Flavour {
    pub fn as_str(self) -> &'static str {
        match self {
            Flavour::Sic => "sic",
            Flavour::Soc => "soc",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlavourOptions {
    #[serde(default = "default_rephrased")]
    pub rephrased: bool,
}

impl Default for FlavourOptions {
    fn default() -> Self {
        Self { rephrased: true }
    }
}

fn default_rephrased() -> bool {
    true
}

/// Per-flavour switches. A missing entry means the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationOptions {
    #[serde(default)]
    pub sic: Option<FlavourOptions>,
    #[serde(default)]
    pub soc: Option<FlavourOptions>,
}

impl ClassificationOptions {
    pub fn rephrased(&self, flavour: Flavour) -> bool {
        let options = match flavour {
            Flavour::Sic => &self.sic,
            Flavour::Soc => &self.soc,
        };
        options.as_ref().map(|o| o.rephrased).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassificationRequest {
    pub llm: LlmBackend,
    #[serde(rename = "type")]
    pub classification_type: ClassificationType,
    pub job_title: String,
    pub job_description: String,
    #[serde(default)]
    pub org_description: Option<String>,
    #[serde(default)]
    pub options: ClassificationOptions,
}

impl ClassificationRequest {
    /// Organisation description with blank input treated as absent.
    pub fn org_description(&self) -> Option<&str> {
        self.org_description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub code: String,
    pub descriptive: String,
    pub likelihood: f64,
}

/// One classification outcome in the generic envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(rename = "type")]
    pub flavour: Flavour,
    pub classified: bool,
    pub followup: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub candidates: Vec<Candidate>,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResponse {
    pub requested_type: ClassificationType,
    pub results: Vec<ClassificationResult>,
}
