use std::str::FromStr;

use thiserror::Error;

/// How the matcher picks among several valid head-and-shoulders triples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Return the first valid triple scanning left to right
    #[default]
    FirstMatch,
    /// Score every valid triple and return the highest confidence
    BestOfAll,
}

/// Relative weights of the three confidence sub-scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub symmetry: f64,
    pub height_ratio: f64,
    pub slope: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            symmetry: 0.4,
            height_ratio: 0.3,
            slope: 0.3,
        }
    }
}

/// Configuration parameters for head-and-shoulders detection
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Minimum index distance between two retained extrema
    pub min_separation: usize,
    /// Max relative difference between shoulder heights
    pub shoulder_tolerance: f64,
    /// Confidence sub-score weights
    pub weights: ScoreWeights,
    /// Added to the neckline slope denominator
    pub slope_epsilon: f64,
    pub selection: SelectionPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_separation: 5,
            shoulder_tolerance: 0.15,
            weights: ScoreWeights::default(),
            slope_epsilon: 1e-9,
            selection: SelectionPolicy::FirstMatch,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("{key} must be within {min}..={max}, got {value}")]
    OutOfRange {
        key: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Configuration for the batch screener and HTTP service
#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    /// Socket address the HTTP server binds to
    pub bind_addr: String,
    /// Symbol universe scanned by default
    pub symbols: Vec<String>,
    /// Daily closes scanned per symbol
    pub window: usize,
    /// Days of history requested from the data source
    pub lookback_days: usize,
    /// Default minimum confidence for a reported match
    pub min_confidence: f64,
    /// Symbols fetched and scanned at once
    pub max_concurrency: usize,
    /// Directory for the rolling log file, if any
    pub log_dir: Option<String>,
    /// Append-only CSV receiving timestamped matches from `/patterns/screen/log`
    pub match_log: String,
    pub detector: DetectorConfig,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            symbols: ["BTC", "ETH", "SOL", "BNB", "XRP", "DOGE", "AVAX", "LINK", "LTC", "ADA"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            window: 90,
            lookback_days: 120,
            min_confidence: 70.0,
            max_concurrency: 8,
            log_dir: None,
            match_log: "match_log.csv".to_string(),
            detector: DetectorConfig::default(),
        }
    }
}

impl ScreenerConfig {
    /// Build from `HNS_*` environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("HNS_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(raw) = lookup("HNS_SYMBOLS") {
            let symbols = parse_symbols(&raw);
            if symbols.is_empty() {
                return Err(ConfigError::Invalid {
                    key: "HNS_SYMBOLS",
                    value: raw,
                });
            }
            config.symbols = symbols;
        }
        if let Some(raw) = lookup("HNS_WINDOW") {
            config.window = parse_positive("HNS_WINDOW", &raw)?;
        }
        if let Some(raw) = lookup("HNS_LOOKBACK_DAYS") {
            config.lookback_days = parse_positive("HNS_LOOKBACK_DAYS", &raw)?;
        }
        if let Some(raw) = lookup("HNS_MIN_CONFIDENCE") {
            let value = parse::<f64>("HNS_MIN_CONFIDENCE", &raw)?;
            if !(50.0..=100.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    key: "HNS_MIN_CONFIDENCE",
                    value,
                    min: 50.0,
                    max: 100.0,
                });
            }
            config.min_confidence = value;
        }
        if let Some(raw) = lookup("HNS_MAX_CONCURRENCY") {
            config.max_concurrency = parse_positive("HNS_MAX_CONCURRENCY", &raw)?;
        }
        config.log_dir = lookup("HNS_LOG_DIR").filter(|dir| !dir.trim().is_empty());
        if let Some(path) = lookup("HNS_MATCH_LOG").filter(|path| !path.trim().is_empty()) {
            config.match_log = path;
        }

        if config.lookback_days < config.window {
            return Err(ConfigError::Invalid {
                key: "HNS_LOOKBACK_DAYS",
                value: config.lookback_days.to_string(),
            });
        }

        Ok(config)
    }
}

/// Split a comma-separated symbol list, upper-casing and dropping blanks
pub fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn parse_positive(key: &'static str, raw: &str) -> Result<usize, ConfigError> {
    match parse::<usize>(key, raw)? {
        0 => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
        }),
        value => Ok(value),
    }
}
