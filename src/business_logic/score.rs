use crate::business_logic::config::ScoreWeights;
use crate::business_logic::shape::PatternCandidate;

/// Confidence and the sub-scores it is built from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub neckline_slope: f64,
    pub symmetry: f64,
    pub height_ratio: f64,
    pub slope: f64,
    pub confidence: f64,
}

/// Score a validated candidate.
///
/// Returns `None` when the result is not finite (e.g. a zero head price).
/// Finite scores are returned as-is, so confidence may leave the 0..=100 range.
pub fn score_candidate(
    prices: &[f64],
    candidate: &PatternCandidate,
    weights: &ScoreWeights,
    slope_epsilon: f64,
) -> Option<ScoreBreakdown> {
    let lhs = *prices.get(candidate.left_shoulder)?;
    let head = *prices.get(candidate.head)?;
    let rhs = *prices.get(candidate.right_shoulder)?;
    let t1 = *prices.get(candidate.trough1)?;
    let t2 = *prices.get(candidate.trough2)?;

    let run = candidate.trough2 as f64 - candidate.trough1 as f64 + slope_epsilon;
    let neckline_slope = (t2 - t1) / run;

    let symmetry = 1.0 - (lhs - rhs).abs() / head;
    let height_ratio = lhs.min(rhs) / head;
    let slope = 1.0 - neckline_slope.abs();

    let confidence = 100.0
        * (weights.symmetry * symmetry + weights.height_ratio * height_ratio + weights.slope * slope);

    if !confidence.is_finite() {
        return None;
    }

    Some(ScoreBreakdown {
        neckline_slope,
        symmetry,
        height_ratio,
        slope,
        confidence,
    })
}
