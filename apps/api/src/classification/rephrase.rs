//! Rephrasing: swaps official code descriptions for reviewed, respondent-friendly ones.
//!
//! Tables are CSV files with a `<flavour>_code` column and a `reviewed_description`
//! column, loaded once at startup.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::classification::models::{ClassificationResult, Flavour};

const DESCRIPTION_COLUMN: &str = "reviewed_description";

#[derive(Debug, Clone)]
pub struct RephraseTable {
    flavour: Flavour,
    descriptions: HashMap<String, String>,
}

impl RephraseTable {
    pub fn load(flavour: Flavour, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Rephrase data file not found: {}", path.display()))?;
        let table = Self::from_reader(flavour, file)
            .with_context(|| format!("Error loading rephrase data from {}", path.display()))?;
        info!(
            "Loaded {} rephrased {} descriptions from {}",
            table.len(),
            flavour.as_str().to_uppercase(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(flavour: Flavour, reader: R) -> Result<Self> {
        let code_column = format!("{}_code", flavour.as_str());
        let mut csv = csv::Reader::from_reader(reader);

        let headers = csv.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .with_context(|| format!("CSV file must contain columns: [{code_column}, {DESCRIPTION_COLUMN}]"))
        };
        let code_idx = column(&code_column)?;
        let description_idx = column(DESCRIPTION_COLUMN)?;

        let mut descriptions = HashMap::new();
        for record in csv.records() {
            let record = record?;
            let code = record.get(code_idx).unwrap_or_default().trim();
            let description = record.get(description_idx).unwrap_or_default().trim();
            if !code.is_empty() && !description.is_empty() {
                descriptions.insert(code.to_string(), description.to_string());
            }
        }

        Ok(Self {
            flavour,
            descriptions,
        })
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    /// Reviewed description for a code. SIC codes from the 0x sections arrive as
    /// four digits and are retried zero-padded.
    pub fn get(&self, code: &str) -> Option<&str> {
        let code = code.trim();
        if let Some(description) = self.descriptions.get(code) {
            return Some(description.as_str());
        }
        if self.flavour == Flavour::Sic && code.len() == 4 {
            return self.descriptions.get(&format!("0{code}")).map(String::as_str);
        }
        None
    }

    /// Rewrites the main description and every candidate description in place.
    /// Codes without a reviewed description keep the model's wording.
    pub fn apply(&self, result: &mut ClassificationResult) -> usize {
        let mut replaced = 0;
        if let Some(code) = result.code.as_deref() {
            if let Some(description) = self.get(code) {
                result.description = Some(description.to_string());
                replaced += 1;
            }
        }
        for candidate in &mut result.candidates {
            if let Some(description) = self.get(&candidate.code) {
                candidate.descriptive = description.to_string();
                replaced += 1;
            }
        }
        replaced
    }
}

/// Rephrase tables by flavour. SOC rephrasing is optional.
#[derive(Debug, Clone, Default)]
pub struct RephraseCatalog {
    pub sic: Option<RephraseTable>,
    pub soc: Option<RephraseTable>,
}

impl RephraseCatalog {
    pub fn table(&self, flavour: Flavour) -> Option<&RephraseTable> {
        match flavour {
            Flavour::Sic => self.sic.as_ref(),
            Flavour::Soc => self.soc.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::models::Candidate;
    use std::io::Write;

    const SIC_CSV: &str = "sic_code,reviewed_description\n\
        01110,\"Growing cereals, leguminous crops and oil seeds\"\n\
        43210,Electrical installation work\n\
        86900,\n";

    fn sic_table() -> RephraseTable {
        RephraseTable::from_reader(Flavour::Sic, SIC_CSV.as_bytes()).unwrap()
    }

    fn result_with(code: &str, candidates: &[&str]) -> ClassificationResult {
        ClassificationResult {
            flavour: Flavour::Sic,
            classified: true,
            followup: None,
            code: Some(code.to_string()),
            description: Some("official".to_string()),
            candidates: candidates
                .iter()
                .map(|c| Candidate {
                    code: c.to_string(),
                    descriptive: "official".to_string(),
                    likelihood: 0.5,
                })
                .collect(),
            reasoning: String::new(),
        }
    }

    #[test]
    fn test_blank_descriptions_are_skipped() {
        let table = sic_table();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("86900"), None);
    }

    #[test]
    fn test_four_digit_sic_code_is_padded() {
        let table = sic_table();
        assert_eq!(
            table.get("1110"),
            Some("Growing cereals, leguminous crops and oil seeds")
        );
        assert_eq!(table.get(" 43210 "), Some("Electrical installation work"));
    }

    #[test]
    fn test_soc_codes_are_not_padded() {
        let table = RephraseTable::from_reader(
            Flavour::Soc,
            "soc_code,reviewed_description\n05241,Electricians\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(table.get("5241"), None);
    }

    #[test]
    fn test_apply_rewrites_main_and_candidates() {
        let table = sic_table();
        let mut result = result_with("43210", &["43210", "99999"]);
        let replaced = table.apply(&mut result);
        assert_eq!(replaced, 2);
        assert_eq!(result.description.as_deref(), Some("Electrical installation work"));
        assert_eq!(result.candidates[0].descriptive, "Electrical installation work");
        assert_eq!(result.candidates[1].descriptive, "official");
    }

    #[test]
    fn test_missing_columns_is_an_error() {
        let err = RephraseTable::from_reader(Flavour::Sic, "code,description\n1,a\n".as_bytes())
            .unwrap_err();
        assert!(err.to_string().contains("sic_code"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SIC_CSV.as_bytes()).unwrap();
        let table = RephraseTable::load(Flavour::Sic, file.path()).unwrap();
        assert_eq!(table.len(), 2);

        assert!(RephraseTable::load(Flavour::Sic, "/nonexistent/rephrase.csv").is_err());
    }

    #[test]
    fn test_bundled_sic_table_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/sic_rephrased_descriptions.csv");
        let table = RephraseTable::load(Flavour::Sic, path).unwrap();
        assert_eq!(table.get("1110"), Some("Growing cereals, pulses and oil seed crops"));
    }
}
