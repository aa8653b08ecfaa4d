//! Emissions Factor Table
//!
//! Loads the static emissions dataset once at startup and exposes typed,
//! read-only access to the factors the calculator needs.
//!
//! The parsed JSON document is kept alongside the typed view so that
//! `/emissions-data` can serve it back unchanged.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Number, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Dataset location used when no path is configured
pub const DEFAULT_DATASET_PATH: &str = "data/emissions_dataset.json";

/// Diet entry used when the requested diet is not in the table
pub const FALLBACK_DIET: &str = "omnivore";

/// Configuration errors raised while building the table. All are fatal at startup.
#[derive(Debug, Error)]
pub enum FactorTableError {
    #[error("emissions dataset not found (tried: {})", display_paths(.tried))]
    NotFound { tried: Vec<PathBuf> },

    #[error("failed to read emissions dataset {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse emissions dataset: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("emissions dataset is missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("emission factor '{0}' is not a number")]
    NotANumber(String),

    #[error("emission factor '{key}' must be a non-negative number, got {value}")]
    InvalidFactor { key: String, value: f64 },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A dataset figure: its numeric value plus the number as written.
///
/// Serializes as written, so `1000` in the dataset stays `1000` in responses.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    value: f64,
    written: Number,
}

impl Figure {
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn written(&self) -> &Number {
        &self.written
    }
}

impl From<f64> for Figure {
    fn from(value: f64) -> Self {
        Self {
            value,
            written: Number::from_f64(value).unwrap_or_else(|| Number::from(0)),
        }
    }
}

impl Default for Figure {
    fn default() -> Self {
        Self::from(0.0)
    }
}

impl Serialize for Figure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.written.serialize(serializer)
    }
}

// Shape of the JSON document. Transport and electricity entries stay untyped
// so extra modes or tariffs without a factor don't block loading; every diet
// can be requested, so each one must carry `co2_per_year`.
#[derive(Debug, Deserialize)]
struct FactorDocument {
    transport: FxHashMap<String, Value>,
    diet: FxHashMap<String, PerYear>,
    electricity: FxHashMap<String, Value>,
    #[serde(default)]
    national_averages: FxHashMap<String, Number>,
}

#[derive(Debug, Deserialize)]
struct PerYear {
    co2_per_year: Number,
}

/// Per-mile factors for the three supported transport modes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportFactors {
    pub car: f64,
    pub flight: f64,
    pub public_transit: f64,
}

/// Immutable emissions factor table
#[derive(Debug, Clone)]
pub struct FactorTable {
    transport: TransportFactors,
    /// Diet name → kg CO2e per year
    diet: FxHashMap<String, Figure>,
    fallback_diet: Figure,
    /// kg CO2e per kWh for the default grid
    electricity_per_kwh: f64,
    /// Country → annual average, kept as written in the dataset
    national_averages: FxHashMap<String, Number>,
    raw: Value,
}

impl FactorTable {
    /// Load the dataset from `path`.
    ///
    /// `path` is tried as given (relative to the working directory) and then
    /// relative to the crate root, so the server runs both from a deployment
    /// directory and from a source checkout.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FactorTableError> {
        load_candidates(&candidate_paths(path.as_ref()))
    }

    /// Build the table from an already-parsed JSON document
    pub fn from_value(raw: Value) -> Result<Self, FactorTableError> {
        let doc: FactorDocument = serde_json::from_value(raw.clone())?;

        let transport = TransportFactors {
            car: required_factor(&doc.transport, "car", "co2_per_mile", "transport.car.co2_per_mile")?,
            flight: required_factor(&doc.transport, "flight", "co2_per_mile", "transport.flight.co2_per_mile")?,
            public_transit: required_factor(
                &doc.transport,
                "public_transit",
                "co2_per_mile",
                "transport.public_transit.co2_per_mile",
            )?,
        };

        let electricity_per_kwh = required_factor(
            &doc.electricity,
            "default",
            "co2_per_kwh",
            "electricity.default.co2_per_kwh",
        )?;

        let mut diet = FxHashMap::default();
        for (name, entry) in doc.diet {
            let figure = figure(&format!("diet.{}", name), entry.co2_per_year)?;
            diet.insert(name, figure);
        }
        let fallback_diet = diet
            .get(FALLBACK_DIET)
            .cloned()
            .ok_or(FactorTableError::MissingKey("diet.omnivore"))?;

        tracing::info!(
            "Emissions dataset loaded: {} diets, {} national averages",
            diet.len(),
            doc.national_averages.len()
        );

        Ok(Self {
            transport,
            diet,
            fallback_diet,
            electricity_per_kwh,
            national_averages: doc.national_averages,
            raw,
        })
    }

    pub fn transport(&self) -> TransportFactors {
        self.transport
    }

    /// Exact-key lookup; callers lowercase user input first
    pub fn diet(&self, name: &str) -> Option<&Figure> {
        self.diet.get(name)
    }

    pub fn fallback_diet(&self) -> &Figure {
        &self.fallback_diet
    }

    pub fn electricity_per_kwh(&self) -> f64 {
        self.electricity_per_kwh
    }

    pub fn national_average(&self, country: &str) -> Option<&Number> {
        self.national_averages.get(country)
    }

    /// The dataset as it was read
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

fn candidate_paths(path: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![path.to_path_buf()];
    if path.is_relative() {
        candidates.push(Path::new(env!("CARGO_MANIFEST_DIR")).join(path));
    }
    candidates
}

/// Read the first candidate that exists. Only a missing file moves on to the
/// next one; any other I/O failure ends the search.
fn load_candidates(candidates: &[PathBuf]) -> Result<FactorTable, FactorTableError> {
    for candidate in candidates {
        match fs::read_to_string(candidate) {
            Ok(contents) => {
                tracing::info!("Loading emissions dataset from {}", candidate.display());
                let raw: Value = serde_json::from_str(&contents)?;
                return FactorTable::from_value(raw);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("Emissions dataset not at {}", candidate.display());
            }
            Err(source) => {
                return Err(FactorTableError::Io {
                    path: candidate.clone(),
                    source,
                });
            }
        }
    }

    Err(FactorTableError::NotFound {
        tried: candidates.to_vec(),
    })
}

fn required_factor(
    section: &FxHashMap<String, Value>,
    entry: &str,
    field: &str,
    key: &'static str,
) -> Result<f64, FactorTableError> {
    let value = section
        .get(entry)
        .and_then(|e| e.get(field))
        .ok_or(FactorTableError::MissingKey(key))?;
    let factor = value
        .as_f64()
        .ok_or_else(|| FactorTableError::NotANumber(key.to_string()))?;
    check_factor(key, factor)
}

fn figure(key: &str, written: Number) -> Result<Figure, FactorTableError> {
    let value = written
        .as_f64()
        .ok_or_else(|| FactorTableError::NotANumber(key.to_string()))?;
    let value = check_factor(key, value)?;
    Ok(Figure { value, written })
}

fn check_factor(key: &str, value: f64) -> Result<f64, FactorTableError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(FactorTableError::InvalidFactor {
            key: key.to_string(),
            value,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Factor values used across the crate's unit tests
    pub(crate) fn sample_document() -> Value {
        json!({
            "transport": {
                "car": { "co2_per_mile": 0.4 },
                "flight": { "co2_per_mile": 0.24 },
                "public_transit": { "co2_per_mile": 0.15 }
            },
            "diet": {
                "omnivore": { "co2_per_year": 2500 },
                "vegetarian": { "co2_per_year": 1500 },
                "vegan": { "co2_per_year": 1000 }
            },
            "electricity": {
                "default": { "co2_per_kwh": 0.85 }
            },
            "national_averages": {
                "USA": 16000,
                "India": 1900
            }
        })
    }

    pub(crate) fn sample_table() -> FactorTable {
        FactorTable::from_value(sample_document()).unwrap()
    }

    fn bundled_dataset() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_DATASET_PATH)
    }

    #[test]
    fn test_from_value_reads_factors() {
        let table = sample_table();
        assert_eq!(
            table.transport(),
            TransportFactors { car: 0.4, flight: 0.24, public_transit: 0.15 }
        );
        assert_eq!(table.diet("vegan").map(Figure::value), Some(1000.0));
        assert!(table.diet("Vegan").is_none());
        assert_eq!(table.fallback_diet().value(), 2500.0);
        assert_eq!(table.electricity_per_kwh(), 0.85);
        assert_eq!(table.national_average("USA"), Some(&Number::from(16000)));
        assert!(table.national_average("Atlantis").is_none());
    }

    #[test]
    fn test_diet_figures_keep_written_form() {
        let table = sample_table();
        let vegan = table.diet("vegan").unwrap();
        assert_eq!(vegan.written(), &Number::from(1000));
        assert_eq!(serde_json::to_string(vegan).unwrap(), "1000");

        let mut doc = sample_document();
        doc["diet"]["vegan"]["co2_per_year"] = json!(1000.5);
        let table = FactorTable::from_value(doc).unwrap();
        assert_eq!(serde_json::to_string(table.diet("vegan").unwrap()).unwrap(), "1000.5");
    }

    #[test]
    fn test_raw_document_is_kept() {
        let table = sample_table();
        assert_eq!(table.raw(), &sample_document());
    }

    #[test]
    fn test_national_averages_optional() {
        let mut doc = sample_document();
        doc.as_object_mut().unwrap().remove("national_averages");
        let table = FactorTable::from_value(doc).unwrap();
        assert!(table.national_average("USA").is_none());
    }

    #[test]
    fn test_extra_entries_without_factors_are_ignored() {
        let mut doc = sample_document();
        doc["transport"]["bike"] = json!({ "unit": "kg CO2e per mile" });
        doc["electricity"]["solar"] = json!({ "source": "rooftop" });
        let table = FactorTable::from_value(doc).unwrap();
        assert_eq!(table.transport().car, 0.4);
        assert_eq!(table.electricity_per_kwh(), 0.85);
    }

    #[test]
    fn test_missing_transport_mode() {
        let mut doc = sample_document();
        doc["transport"].as_object_mut().unwrap().remove("flight");
        let err = FactorTable::from_value(doc).unwrap_err();
        assert!(matches!(err, FactorTableError::MissingKey("transport.flight.co2_per_mile")));
    }

    #[test]
    fn test_required_mode_without_factor() {
        let mut doc = sample_document();
        doc["transport"]["car"] = json!({ "unit": "kg CO2e per mile" });
        let err = FactorTable::from_value(doc).unwrap_err();
        assert!(matches!(err, FactorTableError::MissingKey("transport.car.co2_per_mile")));
    }

    #[test]
    fn test_non_numeric_factor() {
        let mut doc = sample_document();
        doc["transport"]["public_transit"]["co2_per_mile"] = json!("low");
        let err = FactorTable::from_value(doc).unwrap_err();
        match err {
            FactorTableError::NotANumber(key) => assert_eq!(key, "transport.public_transit.co2_per_mile"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_omnivore() {
        let mut doc = sample_document();
        doc["diet"].as_object_mut().unwrap().remove("omnivore");
        let err = FactorTable::from_value(doc).unwrap_err();
        assert!(matches!(err, FactorTableError::MissingKey("diet.omnivore")));
    }

    #[test]
    fn test_missing_electricity_default() {
        let mut doc = sample_document();
        doc["electricity"] = json!({ "solar": { "co2_per_kwh": 0.05 } });
        let err = FactorTable::from_value(doc).unwrap_err();
        assert!(matches!(err, FactorTableError::MissingKey("electricity.default.co2_per_kwh")));
    }

    #[test]
    fn test_missing_section_is_parse_error() {
        let mut doc = sample_document();
        doc.as_object_mut().unwrap().remove("diet");
        let err = FactorTable::from_value(doc).unwrap_err();
        assert!(matches!(err, FactorTableError::Parse(_)));
    }

    #[test]
    fn test_negative_factor_rejected() {
        let mut doc = sample_document();
        doc["electricity"]["default"]["co2_per_kwh"] = json!(-0.1);
        let err = FactorTable::from_value(doc).unwrap_err();
        match err {
            FactorTableError::InvalidFactor { key, .. } => {
                assert_eq!(key, "electricity.default.co2_per_kwh")
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_negative_diet_rejected() {
        let mut doc = sample_document();
        doc["diet"]["vegan"]["co2_per_year"] = json!(-5);
        let err = FactorTable::from_value(doc).unwrap_err();
        assert!(matches!(err, FactorTableError::InvalidFactor { .. }));
    }

    #[test]
    fn test_load_bundled_dataset() {
        let table = FactorTable::load(DEFAULT_DATASET_PATH).unwrap();
        assert_eq!(table.national_average("USA"), Some(&Number::from(16000)));
        assert_eq!(table.national_average("India"), Some(&Number::from(1900)));
    }

    #[test]
    fn test_relative_path_falls_back_to_crate_root() {
        let candidates = candidate_paths(Path::new(DEFAULT_DATASET_PATH));
        assert_eq!(candidates, vec![PathBuf::from(DEFAULT_DATASET_PATH), bundled_dataset()]);

        // Absolute paths are tried once
        let absolute = std::env::temp_dir().join("emissions.json");
        assert_eq!(candidate_paths(&absolute), vec![absolute]);
    }

    #[test]
    fn test_load_uses_second_candidate_when_first_missing() {
        let candidates = [PathBuf::from("no/such/emissions_dataset.json"), bundled_dataset()];
        let table = load_candidates(&candidates).unwrap();
        assert_eq!(table.national_average("India"), Some(&Number::from(1900)));
    }

    #[test]
    fn test_load_stops_on_read_error() {
        // A directory exists but cannot be read as a file; the valid dataset
        // listed after it must not be reached
        let candidates = [std::env::temp_dir(), bundled_dataset()];
        let err = load_candidates(&candidates).unwrap_err();
        match err {
            FactorTableError::Io { path, .. } => assert_eq!(path, std::env::temp_dir()),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_load_missing_file_lists_candidates() {
        let err = FactorTable::load("no/such/dataset.json").unwrap_err();
        match err {
            FactorTableError::NotFound { tried } => {
                assert_eq!(
                    tried,
                    vec![
                        PathBuf::from("no/such/dataset.json"),
                        Path::new(env!("CARGO_MANIFEST_DIR")).join("no/such/dataset.json"),
                    ]
                );
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_load_malformed_file() {
        let path = std::env::temp_dir().join(format!(
            "carbon_estimator_malformed_{}.json",
            std::process::id()
        ));
        fs::write(&path, "{ not json").unwrap();
        let err = FactorTable::load(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, FactorTableError::Parse(_)));
    }
}
