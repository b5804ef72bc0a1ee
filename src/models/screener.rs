use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::business_logic::config::parse_symbols;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    #[default]
    HeadAndShoulders,
    InverseHeadAndShoulders,
}

impl PatternKind {
    pub fn is_inverse(self) -> bool {
        matches!(self, PatternKind::InverseHeadAndShoulders)
    }

    pub fn label(self) -> &'static str {
        match self {
            PatternKind::HeadAndShoulders => "Head & Shoulders",
            PatternKind::InverseHeadAndShoulders => "Inverse H&S",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema, IntoParams)]
pub struct ScreenQuery {
    /// head_and_shoulders or inverse_head_and_shoulders
    #[serde(default)]
    #[param(inline)]
    pub pattern: PatternKind,
    /// Minimum confidence (%) for a reported match; defaults to the configured threshold
    #[validate(custom(function = "validate_confidence"))]
    #[param(example = 70.0, minimum = 0.0, maximum = 100.0)]
    pub min_confidence: Option<f64>,
    /// Comma-separated symbols; defaults to the configured universe
    #[validate(custom(function = "validate_symbols"))]
    #[param(example = "BTC,ETH")]
    pub symbols: Option<String>,
}

impl ScreenQuery {
    pub fn symbol_list(&self) -> Option<Vec<String>> {
        self.symbols.as_deref().map(parse_symbols)
    }
}

/// Finite and within 0..=100; a plain range check lets NaN through
pub fn validate_confidence(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        return Ok(());
    }

    let mut error = ValidationError::new("invalid_confidence");
    error.message = Some("min_confidence must be a number between 0 and 100".into());
    Err(error)
}

pub fn validate_symbols(value: &str) -> Result<(), ValidationError> {
    let symbols = parse_symbols(value);
    if !symbols.is_empty() && symbols.len() <= 200 && symbols.iter().all(|s| s.len() <= 24) {
        return Ok(());
    }

    let mut error = ValidationError::new("invalid_symbols");
    error.message = Some("symbols must list 1 to 200 names of at most 24 characters".into());
    Err(error)
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScreenRow {
    pub symbol: String,
    /// Confidence rounded to two decimals
    pub confidence: f64,
    pub pattern: String,
    pub landmarks: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScreenReport {
    pub as_of_ms: u64,
    pub pattern: String,
    pub min_confidence: f64,
    /// Symbols with a full window that were scanned
    pub scanned: usize,
    /// Symbols skipped for fetch errors or short history
    pub skipped: usize,
    pub matches: Vec<ScreenRow>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchLogResponse {
    /// Local CSV file the matches were appended to
    pub log_path: String,
    /// Rows appended by this run
    pub logged: usize,
    pub report: ScreenReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_kind_parses_snake_case() {
        let kind: PatternKind = serde_json::from_str(r#""inverse_head_and_shoulders""#).unwrap();
        assert!(kind.is_inverse());
        assert_eq!(kind.label(), "Inverse H&S");
        assert_eq!(PatternKind::default().label(), "Head & Shoulders");
    }

    #[test]
    fn screen_query_bounds_confidence() {
        let mut query = ScreenQuery {
            min_confidence: Some(101.0),
            ..ScreenQuery::default()
        };
        assert!(query.validate().is_err());

        query.min_confidence = Some(-0.5);
        assert!(query.validate().is_err());

        query.min_confidence = Some(70.0);
        assert!(query.validate().is_ok());

        query.min_confidence = Some(100.0);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn screen_query_rejects_non_finite_confidence() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let query = ScreenQuery {
                min_confidence: Some(bad),
                ..ScreenQuery::default()
            };
            let error = query.validate().unwrap_err();
            assert!(error.to_string().contains("min_confidence"));
        }
    }

    #[test]
    fn nan_confidence_query_string_is_rejected() {
        let uri: axum::http::Uri = "/patterns/screen?min_confidence=NaN".parse().unwrap();
        let axum::extract::Query(query) = axum::extract::Query::<ScreenQuery>::try_from_uri(&uri).unwrap();

        assert!(query.min_confidence.is_some_and(f64::is_nan));
        assert!(query.validate().is_err());
    }

    #[test]
    fn screen_query_rejects_empty_symbol_list() {
        let mut query = ScreenQuery {
            symbols: Some(" , ".to_string()),
            ..ScreenQuery::default()
        };
        let error = query.validate().unwrap_err();
        assert!(error.to_string().contains("symbols"));

        query.symbols = Some("btc, eth".to_string());
        assert!(query.validate().is_ok());
        assert_eq!(query.symbol_list(), Some(vec!["BTC".to_string(), "ETH".to_string()]));
    }
}
