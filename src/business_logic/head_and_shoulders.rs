use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::business_logic::config::{DetectorConfig, SelectionPolicy};
use crate::business_logic::extrema::{find_peaks, find_troughs};
use crate::business_logic::score::{score_candidate, ScoreBreakdown};
use crate::business_logic::shape::{Evaluation, PatternCandidate, Rejection, ShapeMatcher};

/// Outcome of a detection run. `landmarks` and `scores` are only set on a match.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternResult {
    pub matched: bool,
    pub confidence: f64,
    pub landmarks: Option<PatternCandidate>,
    pub scores: Option<ScoreBreakdown>,
}

impl PatternResult {
    pub fn no_match() -> Self {
        Self {
            matched: false,
            confidence: 0.0,
            landmarks: None,
            scores: None,
        }
    }

    fn matched(candidate: PatternCandidate, scores: ScoreBreakdown) -> Self {
        Self {
            matched: true,
            confidence: scores.confidence,
            landmarks: Some(candidate),
            scores: Some(scores),
        }
    }

    /// Landmark name to index; empty when nothing matched
    pub fn landmark_map(&self) -> BTreeMap<&'static str, usize> {
        let mut map = BTreeMap::new();
        if let Some(c) = &self.landmarks {
            map.insert("leftShoulder", c.left_shoulder);
            map.insert("head", c.head);
            map.insert("rightShoulder", c.right_shoulder);
            map.insert("trough1", c.trough1);
            map.insert("trough2", c.trough2);
        }
        map
    }
}

/// Diagnostics emitted while detecting
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionEvent {
    /// Empty or all-NaN input
    DegenerateInput { len: usize },
    InsufficientExtrema { peaks: usize, troughs: usize },
    CandidateRejected { head: usize, reason: Rejection },
    Matched {
        candidate: PatternCandidate,
        confidence: f64,
    },
    NoMatch { candidates: usize },
}

/// Receives detection diagnostics; never affects the returned result
pub trait DetectionSink: Send + Sync {
    fn record(&self, event: &DetectionEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DetectionSink for TracingSink {
    fn record(&self, event: &DetectionEvent) {
        match event {
            DetectionEvent::DegenerateInput { len } => {
                tracing::debug!(len, "degenerate input, skipping detection");
            }
            DetectionEvent::InsufficientExtrema { peaks, troughs } => {
                tracing::debug!(peaks, troughs, "not enough extrema for a head and shoulders");
            }
            DetectionEvent::CandidateRejected { head, reason } => {
                tracing::debug!(head, %reason, "candidate rejected");
            }
            DetectionEvent::Matched {
                candidate,
                confidence,
            } => {
                tracing::info!(
                    left_shoulder = candidate.left_shoulder,
                    head = candidate.head,
                    right_shoulder = candidate.right_shoulder,
                    confidence = format_args!("{:.2}", confidence),
                    "head and shoulders matched"
                );
            }
            DetectionEvent::NoMatch { candidates } => {
                tracing::debug!(candidates, "no head and shoulders found");
            }
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DetectionSink for NullSink {
    fn record(&self, _event: &DetectionEvent) {}
}

/// Head-and-shoulders detector over a static close series
#[derive(Clone)]
pub struct HeadShouldersDetector {
    config: DetectorConfig,
    sink: Arc<dyn DetectionSink>,
}

impl std::fmt::Debug for HeadShouldersDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadShouldersDetector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for HeadShouldersDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl HeadShouldersDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    pub fn with_sink(config: DetectorConfig, sink: Arc<dyn DetectionSink>) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Scan `series` for a head and shoulders, or for the inverse shape when
    /// `inverse` is set (the series is negated first). Never fails.
    pub fn detect(&self, series: &[f64], inverse: bool) -> PatternResult {
        let prices: Cow<'_, [f64]> = if inverse {
            Cow::Owned(series.iter().map(|v| -v).collect())
        } else {
            Cow::Borrowed(series)
        };

        if prices.is_empty() || prices.iter().all(|p| p.is_nan()) {
            self.sink.record(&DetectionEvent::DegenerateInput { len: prices.len() });
            return PatternResult::no_match();
        }

        let peaks = find_peaks(&prices, self.config.min_separation);
        let troughs = find_troughs(&prices, self.config.min_separation);

        if peaks.len() < 3 || troughs.len() < 2 {
            self.sink.record(&DetectionEvent::InsufficientExtrema {
                peaks: peaks.len(),
                troughs: troughs.len(),
            });
            return PatternResult::no_match();
        }

        let matcher = ShapeMatcher::new(&prices, &peaks, &troughs, self.config.shoulder_tolerance);
        let mut best: Option<(PatternCandidate, ScoreBreakdown)> = None;
        let mut examined = 0;

        for (head, evaluation) in matcher.evaluations() {
            examined += 1;

            let (candidate, scores) = match self.assess(&prices, evaluation) {
                Ok(scored) => scored,
                Err(reason) => {
                    self.sink.record(&DetectionEvent::CandidateRejected { head, reason });
                    continue;
                }
            };

            match self.config.selection {
                SelectionPolicy::FirstMatch => {
                    best = Some((candidate, scores));
                    break;
                }
                SelectionPolicy::BestOfAll => {
                    let better = best
                        .as_ref()
                        .map_or(true, |(_, current)| scores.confidence > current.confidence);
                    if better {
                        best = Some((candidate, scores));
                    }
                }
            }
        }

        match best {
            Some((candidate, scores)) => {
                self.sink.record(&DetectionEvent::Matched {
                    candidate,
                    confidence: scores.confidence,
                });
                PatternResult::matched(candidate, scores)
            }
            None => {
                self.sink.record(&DetectionEvent::NoMatch { candidates: examined });
                PatternResult::no_match()
            }
        }
    }

    fn assess(
        &self,
        prices: &[f64],
        evaluation: Evaluation,
    ) -> Result<(PatternCandidate, ScoreBreakdown), Rejection> {
        let candidate = match evaluation {
            Evaluation::Accepted(candidate) => candidate,
            Evaluation::Rejected(reason) => return Err(reason),
        };

        let scores = score_candidate(
            prices,
            &candidate,
            &self.config.weights,
            self.config.slope_epsilon,
        )
        .ok_or(Rejection::ComputationFault)?;

        Ok((candidate, scores))
    }
}

/// Detect with the default configuration, logging through `tracing`
pub fn detect(series: &[f64], inverse: bool) -> PatternResult {
    HeadShouldersDetector::default().detect(series, inverse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<DetectionEvent>>,
    }

    impl DetectionSink for RecordingSink {
        fn record(&self, event: &DetectionEvent) {
            self.events.lock().unwrap().push(*event);
        }
    }

    impl RecordingSink {
        fn rejections(&self) -> Vec<Rejection> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|event| match event {
                    DetectionEvent::CandidateRejected { reason, .. } => Some(*reason),
                    _ => None,
                })
                .collect()
        }
    }

    fn make_series(len: usize, base: f64, points: &[(usize, f64)]) -> Vec<f64> {
        let mut series = vec![base; len];
        for &(idx, value) in points {
            series[idx] = value;
        }
        series
    }

    /// Shoulders 100 at 10 and 70, head 150 at 40, troughs 80 at 25 and 55
    fn classic_series() -> Vec<f64> {
        make_series(
            90,
            90.0,
            &[(10, 100.0), (25, 80.0), (40, 150.0), (55, 80.0), (70, 100.0)],
        )
    }

    fn recording_detector(config: DetectorConfig) -> (HeadShouldersDetector, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (HeadShouldersDetector::with_sink(config, sink.clone()), sink)
    }

    #[test]
    fn test_classic_pattern_matches() {
        let result = detect(&classic_series(), false);

        assert!(result.matched);
        assert!((result.confidence - 90.0).abs() < 1e-9);

        let scores = result.scores.unwrap();
        assert!((scores.symmetry - 1.0).abs() < 1e-12);
        assert!((scores.height_ratio - 100.0 / 150.0).abs() < 1e-12);
        assert!((scores.slope - 1.0).abs() < 1e-12);

        let landmarks = result.landmark_map();
        assert_eq!(landmarks.len(), 5);
        assert_eq!(landmarks["leftShoulder"], 10);
        assert_eq!(landmarks["head"], 40);
        assert_eq!(landmarks["rightShoulder"], 70);
        assert_eq!(landmarks["trough1"], 25);
        assert_eq!(landmarks["trough2"], 55);
    }

    #[test]
    fn test_degenerate_inputs_do_not_match() {
        for series in [vec![], vec![f64::NAN; 90], vec![42.0], vec![1.0; 90]] {
            let result = detect(&series, false);
            assert_eq!(result, PatternResult::no_match());
            assert!(result.landmark_map().is_empty());
        }
    }

    #[test]
    fn test_insufficient_extrema_do_not_match() {
        // Two peaks only
        let series = make_series(90, 90.0, &[(10, 100.0), (25, 80.0), (40, 150.0), (55, 80.0)]);
        let (detector, sink) = recording_detector(DetectorConfig::default());

        assert_eq!(detector.detect(&series, false), PatternResult::no_match());
        assert_eq!(
            sink.events.lock().unwrap().as_slice(),
            &[DetectionEvent::InsufficientExtrema { peaks: 2, troughs: 2 }]
        );
    }

    #[test]
    fn test_single_trough_does_not_match() {
        let series = make_series(90, 90.0, &[(10, 100.0), (25, 80.0), (40, 150.0), (70, 100.0)]);
        let (detector, sink) = recording_detector(DetectorConfig::default());

        assert_eq!(detector.detect(&series, false), PatternResult::no_match());
        assert_eq!(
            sink.events.lock().unwrap().as_slice(),
            &[DetectionEvent::InsufficientExtrema { peaks: 3, troughs: 1 }]
        );
    }

    #[test]
    fn test_inverse_of_negated_series_is_identical() {
        let series = classic_series();
        let negated: Vec<f64> = series.iter().map(|v| -v).collect();

        let direct = detect(&series, false);
        let inverse = detect(&negated, true);

        assert_eq!(direct, inverse);
        assert_eq!(direct.landmark_map(), inverse.landmark_map());
    }

    #[test]
    fn test_inverse_finds_trough_shape() {
        let upside_down: Vec<f64> = classic_series().iter().map(|v| -v).collect();
        assert!(!detect(&upside_down, false).matched);
        assert!(detect(&upside_down, true).matched);
    }

    #[test]
    fn test_inverse_matches_positive_mirrored_closes() {
        // Baseline 150, shoulders 140, head 90, neckline highs 160
        let mirrored: Vec<f64> = classic_series().iter().map(|v| 240.0 - v).collect();
        assert!(mirrored.iter().all(|&v| v > 0.0));
        assert!(!detect(&mirrored, false).matched);

        let result = detect(&mirrored, true);
        assert!(result.matched);

        let landmarks = result.landmark_map();
        assert_eq!(landmarks["leftShoulder"], 10);
        assert_eq!(landmarks["head"], 40);
        assert_eq!(landmarks["rightShoulder"], 70);
        assert_eq!(landmarks["trough1"], 25);
        assert_eq!(landmarks["trough2"], 55);

        // Negated head is -90, so the height ratio is 140 / 90 and confidence passes 100
        let expected = 100.0 * (0.4 + 0.3 * (140.0 / 90.0) + 0.3);
        assert!((result.confidence - expected).abs() < 1e-9);
        assert!(result.confidence > 100.0);
    }

    #[test]
    fn test_detect_is_idempotent() {
        let series = classic_series();
        assert_eq!(detect(&series, false), detect(&series, false));
        assert_eq!(detect(&series, true), detect(&series, true));
    }

    #[test]
    fn test_shoulder_tolerance_boundary() {
        let with_right_shoulder = |value: f64| {
            make_series(
                90,
                60.0,
                &[(10, 100.0), (25, 50.0), (40, 150.0), (55, 50.0), (70, value)],
            )
        };

        let exact = detect(&with_right_shoulder(85.0), false);
        assert!(exact.matched);
        assert!((exact.scores.unwrap().symmetry - 0.9).abs() < 1e-12);

        assert!(detect(&with_right_shoulder(85.1), false).matched);

        let (detector, sink) = recording_detector(DetectorConfig::default());
        assert!(!detector.detect(&with_right_shoulder(84.9), false).matched);
        assert_eq!(sink.rejections(), vec![Rejection::ShouldersDissimilar]);
    }

    #[test]
    fn test_nearest_trough_outside_left_half_is_rejected() {
        // No trough between the left shoulder and the head
        let series = make_series(
            90,
            90.0,
            &[(10, 100.0), (40, 150.0), (45, 80.0), (60, 80.0), (70, 100.0)],
        );
        let (detector, sink) = recording_detector(DetectorConfig::default());

        assert_eq!(detector.detect(&series, false), PatternResult::no_match());
        assert_eq!(
            sink.rejections(),
            vec![Rejection::TroughOutOfOrder {
                trough1: 45,
                trough2: 60
            }]
        );
    }

    #[test]
    fn test_steep_neckline_confidence_is_not_clamped() {
        // Neckline climbs 75 over 6 samples
        let series = make_series(
            90,
            90.0,
            &[(10, 100.0), (37, 10.0), (40, 150.0), (43, 85.0), (70, 100.0)],
        );
        let result = detect(&series, false);

        assert!(result.matched);
        let scores = result.scores.unwrap();
        assert!(scores.neckline_slope.abs() > 1.0);
        assert!(result.confidence < 0.0);
        assert!((result.confidence - -285.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_score_rejects_only_that_candidate() {
        let series = make_series(
            90,
            90.0,
            &[
                (10, 100.0),
                (25, f64::NEG_INFINITY),
                (40, 150.0),
                (55, 80.0),
                (70, 100.0),
            ],
        );
        let (detector, sink) = recording_detector(DetectorConfig::default());

        assert_eq!(detector.detect(&series, false), PatternResult::no_match());
        assert_eq!(sink.rejections(), vec![Rejection::ComputationFault]);
    }

    fn two_pattern_series() -> Vec<f64> {
        // (10, 25, 40) scores 90; (40, 55, 70) scores 95
        make_series(
            90,
            90.0,
            &[
                (10, 100.0),
                (17, 80.0),
                (25, 150.0),
                (32, 80.0),
                (40, 100.0),
                (47, 80.0),
                (55, 120.0),
                (62, 80.0),
                (70, 100.0),
            ],
        )
    }

    #[test]
    fn test_first_match_policy_keeps_leftmost() {
        let result = detect(&two_pattern_series(), false);
        assert_eq!(result.landmarks.map(|c| c.head), Some(25));
        assert!((result.confidence - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_best_of_all_policy_keeps_highest_confidence() {
        let config = DetectorConfig {
            selection: SelectionPolicy::BestOfAll,
            ..DetectorConfig::default()
        };
        let (detector, sink) = recording_detector(config);
        let result = detector.detect(&two_pattern_series(), false);

        assert_eq!(result.landmarks.map(|c| c.head), Some(55));
        assert!((result.confidence - 95.0).abs() < 1e-9);
        assert_eq!(sink.rejections(), vec![Rejection::HeadNotHighest]);
    }

    #[test]
    fn test_sink_does_not_change_result() {
        let series = classic_series();
        let silent = HeadShouldersDetector::with_sink(DetectorConfig::default(), Arc::new(NullSink));
        let (recording, sink) = recording_detector(DetectorConfig::default());

        assert_eq!(silent.detect(&series, false), recording.detect(&series, false));
        assert!(matches!(
            sink.events.lock().unwrap().last(),
            Some(DetectionEvent::Matched { .. })
        ));
    }
}
