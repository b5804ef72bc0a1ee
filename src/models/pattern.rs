use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::business_logic::extrema::extrema_at;
use crate::business_logic::head_and_shoulders::PatternResult;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DetectRequest {
    /// Daily closes, oldest first
    #[validate(length(min = 1, max = 5000))]
    pub closes: Vec<f64>,
    /// Look for the inverse (trough) shape
    #[serde(default)]
    pub inverse: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScoreView {
    pub neckline_slope: f64,
    pub symmetry: f64,
    pub height_ratio: f64,
    pub slope: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LandmarkPoint {
    pub name: String,
    pub index: usize,
    pub close: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PatternResponse {
    pub matched: bool,
    pub confidence: f64,
    /// Landmark name to index; empty when nothing matched
    pub landmarks: BTreeMap<String, usize>,
    /// Landmarks with their closes, ordered by index
    pub points: Vec<LandmarkPoint>,
    pub scores: Option<ScoreView>,
}

impl PatternResponse {
    /// Build a response, reading landmark closes from the un-negated series
    pub fn from_result(result: &PatternResult, closes: &[f64]) -> Self {
        let landmarks: BTreeMap<String, usize> = result
            .landmark_map()
            .into_iter()
            .map(|(name, index)| (name.to_string(), index))
            .collect();

        let mut named: Vec<(&String, usize)> = landmarks.iter().map(|(n, &i)| (n, i)).collect();
        named.sort_by_key(|&(_, index)| index);
        let indices: Vec<usize> = named.iter().map(|&(_, index)| index).collect();
        let points = named
            .iter()
            .zip(extrema_at(closes, &indices))
            .map(|((name, _), extremum)| LandmarkPoint {
                name: name.to_string(),
                index: extremum.index,
                close: extremum.value,
            })
            .collect();

        Self {
            matched: result.matched,
            confidence: result.confidence,
            landmarks,
            points,
            scores: result.scores.map(|s| ScoreView {
                neckline_slope: s.neckline_slope,
                symmetry: s.symmetry,
                height_ratio: s.height_ratio,
                slope: s.slope,
            }),
        }
    }
}
