use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use crate::business_logic::config::ScreenerConfig;
use crate::business_logic::head_and_shoulders::{HeadShouldersDetector, PatternResult};
use crate::models::screener::{PatternKind, ScreenReport, ScreenRow};
use crate::services::hyperliquid::PriceSource;

/// One batch screening run
#[derive(Debug, Clone)]
pub struct ScreenRequest {
    pub pattern: PatternKind,
    pub min_confidence: f64,
    pub symbols: Vec<String>,
}

/// Result of scanning a single symbol
#[derive(Debug, Clone)]
pub enum SymbolOutcome {
    Scanned { symbol: String, result: PatternResult },
    Skipped { symbol: String, reason: String },
}

/// Screens a symbol universe for (inverse) head and shoulders shapes
pub struct ScreenerService<S> {
    source: Arc<S>,
    detector: HeadShouldersDetector,
    window: usize,
    lookback_days: usize,
    max_concurrency: usize,
}

impl<S: PriceSource> ScreenerService<S> {
    pub fn new(source: Arc<S>, config: &ScreenerConfig) -> Self {
        Self {
            source,
            detector: HeadShouldersDetector::new(config.detector.clone()),
            window: config.window,
            lookback_days: config.lookback_days,
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    pub fn with_detector(mut self, detector: HeadShouldersDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Scan every symbol with bounded concurrency; outcomes arrive as they finish
    pub fn spawn_scan(&self, request: &ScreenRequest) -> mpsc::Receiver<SymbolOutcome> {
        let (tx, rx) = mpsc::channel(request.symbols.len().max(1));
        let permits = Arc::new(Semaphore::new(self.max_concurrency));

        for symbol in request.symbols.iter().cloned() {
            let tx = tx.clone();
            let permits = permits.clone();
            let source = self.source.clone();
            let detector = self.detector.clone();
            let (window, lookback_days) = (self.window, self.lookback_days);
            let inverse = request.pattern.is_inverse();

            tokio::spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };

                let outcome = match source.daily_closes(&symbol, lookback_days).await {
                    Ok(closes) => match window_closes(&closes, window) {
                        Ok(series) => SymbolOutcome::Scanned {
                            result: detector.detect(&series, inverse),
                            symbol,
                        },
                        Err(usable) => SymbolOutcome::Skipped {
                            reason: format!("only {usable} usable closes, need {window}"),
                            symbol,
                        },
                    },
                    Err(error) => SymbolOutcome::Skipped {
                        reason: format!("{error:#}"),
                        symbol,
                    },
                };

                let _ = tx.send(outcome).await;
            });
        }

        rx
    }

    /// Scan all symbols and collect matches at or above the threshold
    pub async fn screen(&self, request: &ScreenRequest) -> ScreenReport {
        let mut rx = self.spawn_scan(request);
        let mut report = ReportBuilder::new(request);

        while let Some(outcome) = rx.recv().await {
            report.push(outcome);
        }

        report.finish()
    }
}

/// Accumulates symbol outcomes into a `ScreenReport`
#[derive(Debug)]
pub struct ReportBuilder {
    pattern: PatternKind,
    min_confidence: f64,
    scanned: usize,
    skipped: usize,
    matches: Vec<ScreenRow>,
}

impl ReportBuilder {
    pub fn new(request: &ScreenRequest) -> Self {
        Self {
            pattern: request.pattern,
            min_confidence: request.min_confidence,
            scanned: 0,
            skipped: 0,
            matches: Vec::new(),
        }
    }

    /// Record an outcome, returning the row if it qualifies as a match
    pub fn push(&mut self, outcome: SymbolOutcome) -> Option<ScreenRow> {
        match outcome {
            SymbolOutcome::Skipped { symbol, reason } => {
                tracing::warn!("Skipping {}: {}", symbol, reason);
                self.skipped += 1;
                None
            }
            SymbolOutcome::Scanned { symbol, result } => {
                self.scanned += 1;
                if !result.matched || result.confidence < self.min_confidence {
                    return None;
                }

                let row = ScreenRow {
                    symbol,
                    confidence: round2(result.confidence),
                    pattern: self.pattern.label().to_string(),
                    landmarks: result
                        .landmark_map()
                        .into_iter()
                        .map(|(name, index)| (name.to_string(), index))
                        .collect(),
                };
                self.matches.push(row.clone());
                Some(row)
            }
        }
    }

    pub fn finish(mut self) -> ScreenReport {
        self.matches.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });

        tracing::info!(
            "Screened {} symbols for {}: {} matches, {} skipped",
            self.scanned,
            self.pattern.label(),
            self.matches.len(),
            self.skipped
        );

        ScreenReport {
            as_of_ms: chrono::Utc::now().timestamp_millis() as u64,
            pattern: self.pattern.label().to_string(),
            min_confidence: self.min_confidence,
            scanned: self.scanned,
            skipped: self.skipped,
            matches: self.matches,
        }
    }
}

/// Last `window` finite closes; on short history the error is the finite count
fn window_closes(closes: &[f64], window: usize) -> Result<Vec<f64>, usize> {
    let clean: Vec<f64> = closes.iter().copied().filter(|c| c.is_finite()).collect();
    if clean.len() < window {
        return Err(clean.len());
    }
    Ok(clean[clean.len() - window..].to_vec())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
