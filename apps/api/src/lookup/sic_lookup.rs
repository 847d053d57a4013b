//! In-memory SIC knowledge base: description → code, with optional code metadata.
//!
//! The lookup table is a CSV with `description,label` columns. The optional
//! structure file (`code,title,detail`) supplies titles for codes and divisions.

use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeMeta {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivisionMatch {
    pub code: String,
    pub meta: Option<CodeMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PotentialMatches {
    pub descriptions_count: usize,
    pub descriptions: Vec<String>,
    pub codes_count: usize,
    pub codes: Vec<String>,
    pub divisions_count: usize,
    pub divisions: Vec<DivisionMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    pub description: String,
    pub code: Option<String>,
    pub code_meta: Option<CodeMeta>,
    pub code_division: Option<String>,
    pub code_division_meta: Option<CodeMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potential_matches: Option<PotentialMatches>,
}

impl LookupResult {
    /// Nothing to report: no exact code and no similar codes.
    pub fn is_empty(&self) -> bool {
        self.code.is_none()
            && self
                .potential_matches
                .as_ref()
                .map_or(true, |m| m.codes.is_empty())
    }
}

#[derive(Debug, Clone)]
struct Row {
    description: String,
    label: String,
}

#[derive(Debug, Clone, Default)]
pub struct SicLookup {
    rows: Vec<Row>,
    exact: HashMap<String, String>,
    meta: HashMap<String, CodeMeta>,
}

/// Codes from the 0x sections lose their leading zero in some sources.
pub fn normalise_label(label: &str) -> String {
    let label = label.trim();
    if label.len() == 4 {
        format!("0{label}")
    } else {
        label.to_string()
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .with_context(|| format!("CSV file is missing the '{name}' column"))
}

impl SicLookup {
    pub fn load(lookup_path: impl AsRef<Path>, structure_path: Option<&Path>) -> Result<Self> {
        let lookup_path = lookup_path.as_ref();
        let file = std::fs::File::open(lookup_path)
            .with_context(|| format!("SIC lookup data not found: {}", lookup_path.display()))?;
        let mut lookup = Self::from_reader(file)
            .with_context(|| format!("Error loading SIC lookup data from {}", lookup_path.display()))?;

        if let Some(path) = structure_path {
            let file = std::fs::File::open(path)
                .with_context(|| format!("SIC structure data not found: {}", path.display()))?;
            lookup = lookup
                .with_structure(file)
                .with_context(|| format!("Error loading SIC structure from {}", path.display()))?;
        }

        info!(
            "Loaded {} SIC lookup rows ({} codes with metadata) from {}",
            lookup.len(),
            lookup.meta.len(),
            lookup_path.display()
        );
        Ok(lookup)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::Reader::from_reader(reader);
        let headers = csv.headers()?.clone();
        let description_idx = column_index(&headers, "description")?;
        let label_idx = column_index(&headers, "label")?;

        let mut rows = Vec::new();
        let mut exact = HashMap::new();
        for record in csv.records() {
            let record = record?;
            let description = record
                .get(description_idx)
                .unwrap_or_default()
                .trim()
                .to_lowercase();
            let label = normalise_label(record.get(label_idx).unwrap_or_default());
            if description.is_empty() || label.is_empty() {
                continue;
            }
            // Later rows win, as with a keyed index.
            exact.insert(description.clone(), label.clone());
            rows.push(Row { description, label });
        }

        Ok(Self {
            rows,
            exact,
            meta: HashMap::new(),
        })
    }

    /// Attaches code titles from a `code,title,detail` CSV.
    pub fn with_structure<R: Read>(mut self, reader: R) -> Result<Self> {
        let mut csv = csv::Reader::from_reader(reader);
        let headers = csv.headers()?.clone();
        let code_idx = column_index(&headers, "code")?;
        let title_idx = column_index(&headers, "title")?;
        let detail_idx = column_index(&headers, "detail").ok();

        for record in csv.records() {
            let record = record?;
            let code = record.get(code_idx).unwrap_or_default().trim();
            if code.is_empty() {
                continue;
            }
            let detail = detail_idx
                .and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from);
            self.meta.insert(
                code.to_string(),
                CodeMeta {
                    title: record.get(title_idx).unwrap_or_default().trim().to_string(),
                    detail,
                },
            );
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn meta(&self, code: &str) -> Option<CodeMeta> {
        self.meta.get(code).cloned()
    }

    /// Exact lookup, plus rows containing the query when `similarity` is set.
    pub fn lookup(&self, description: &str, similarity: bool) -> LookupResult {
        let description = description.trim().to_lowercase();
        let code = self.exact.get(&description).cloned();
        let code_division = code.as_ref().map(|c| c.chars().take(2).collect::<String>());

        let potential_matches = similarity.then(|| self.potential_matches(&description, code.as_deref()));

        LookupResult {
            code_meta: code.as_deref().and_then(|c| self.meta(c)),
            code_division_meta: code_division.as_deref().and_then(|d| self.meta(d)),
            description,
            code,
            code_division,
            potential_matches,
        }
    }

    fn potential_matches(&self, description: &str, exact_code: Option<&str>) -> PotentialMatches {
        let matches: Vec<&Row> = self
            .rows
            .iter()
            .filter(|r| r.description.contains(description))
            .collect();

        let mut codes: Vec<String> = Vec::new();
        let mut descriptions: Vec<String> = Vec::new();
        for row in &matches {
            if !codes.contains(&row.label) {
                codes.push(row.label.clone());
            }
            if !descriptions.contains(&row.description) {
                descriptions.push(row.description.clone());
            }
        }

        if codes.len() == 1 && exact_code == Some(codes[0].as_str()) {
            return PotentialMatches::default();
        }

        let divisions: Vec<DivisionMatch> = codes
            .iter()
            .map(|c| c.chars().take(2).collect::<String>())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|code| DivisionMatch {
                meta: self.meta(&code),
                code,
            })
            .collect();

        PotentialMatches {
            descriptions_count: matches.len(),
            descriptions,
            codes_count: codes.len(),
            codes,
            divisions_count: divisions.len(),
            divisions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LOOKUP_CSV: &str = "description,label\n\
        Electrical installation,43210\n\
        Electrical contractor,43210\n\
        Electrical goods wholesale,46430\n\
        Barley growing,1110\n\
        Electrician,43210\n";

    const STRUCTURE_CSV: &str = "code,title,detail\n\
        43210,Electrical installation,Installation of electrical systems\n\
        43,Specialised construction activities,\n\
        46,Wholesale trade,\n";

    fn lookup() -> SicLookup {
        SicLookup::from_reader(LOOKUP_CSV.as_bytes())
            .unwrap()
            .with_structure(STRUCTURE_CSV.as_bytes())
            .unwrap()
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let result = lookup().lookup("ELECTRICAL Installation", false);
        assert_eq!(result.description, "electrical installation");
        assert_eq!(result.code.as_deref(), Some("43210"));
        assert_eq!(result.code_division.as_deref(), Some("43"));
        assert_eq!(
            result.code_meta.unwrap().detail.as_deref(),
            Some("Installation of electrical systems")
        );
        assert_eq!(
            result.code_division_meta.unwrap().title,
            "Specialised construction activities"
        );
        assert!(result.potential_matches.is_none());
    }

    #[test]
    fn test_four_digit_labels_are_padded() {
        let result = lookup().lookup("barley growing", false);
        assert_eq!(result.code.as_deref(), Some("01110"));
        assert_eq!(result.code_division.as_deref(), Some("01"));
        assert_eq!(result.code_meta, None);
    }

    #[test]
    fn test_similarity_collects_containing_rows() {
        let result = lookup().lookup("electrical", true);
        assert_eq!(result.code, None);
        let matches = result.potential_matches.unwrap();
        assert_eq!(matches.descriptions_count, 3);
        assert_eq!(matches.codes, vec!["43210", "46430"]);
        assert_eq!(matches.codes_count, 2);
        assert_eq!(matches.divisions_count, 2);
        assert_eq!(matches.divisions[0].code, "43");
        assert_eq!(matches.divisions[1].meta.as_ref().unwrap().title, "Wholesale trade");
    }

    #[test]
    fn test_similarity_only_exact_code_empties_lists() {
        let result = lookup().lookup("electrician", true);
        assert_eq!(result.code.as_deref(), Some("43210"));
        assert_eq!(result.potential_matches, Some(PotentialMatches::default()));
        assert!(!result.is_empty());
    }

    #[test]
    fn test_unknown_description_is_empty() {
        assert!(lookup().lookup("astronaut", true).is_empty());
        assert!(lookup().lookup("astronaut", false).is_empty());
    }

    #[test]
    fn test_missing_columns_is_an_error() {
        assert!(SicLookup::from_reader("text,code\na,1\n".as_bytes()).is_err());
    }

    #[test]
    fn test_load_from_files() {
        let mut lookup_file = tempfile::NamedTempFile::new().unwrap();
        lookup_file.write_all(LOOKUP_CSV.as_bytes()).unwrap();
        let mut structure_file = tempfile::NamedTempFile::new().unwrap();
        structure_file.write_all(STRUCTURE_CSV.as_bytes()).unwrap();

        let lookup = SicLookup::load(lookup_file.path(), Some(structure_file.path())).unwrap();
        assert_eq!(lookup.len(), 5);
        assert!(lookup.meta("46").is_some());

        assert!(SicLookup::load("/nonexistent/lookup.csv", None).is_err());
    }

    #[test]
    fn test_bundled_data_loads() {
        let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
        let lookup = SicLookup::load(
            data.join("sic_lookup_data.csv"),
            Some(data.join("sic_structure_data.csv").as_path()),
        )
        .unwrap();

        let result = lookup.lookup("Electrician", true);
        assert_eq!(result.code.as_deref(), Some("43210"));
        assert_eq!(result.code_division_meta.unwrap().title, "Specialised construction activities");
    }
}
