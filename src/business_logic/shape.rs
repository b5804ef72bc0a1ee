use std::fmt;

use crate::business_logic::similarity::is_similar;

/// Landmark indices of a structurally valid head-and-shoulders shape.
///
/// Always satisfies `left_shoulder < trough1 < head < trough2 < right_shoulder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternCandidate {
    pub left_shoulder: usize,
    pub head: usize,
    pub right_shoulder: usize,
    pub trough1: usize,
    pub trough2: usize,
}

/// Why a peak triple was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Peaks are not strictly increasing in index
    PeaksOutOfOrder,
    /// Head is not taller than both shoulders
    HeadNotHighest,
    /// Shoulder heights differ by more than the tolerance
    ShouldersDissimilar,
    /// Fewer than two troughs between the shoulders
    TooFewTroughs { found: usize },
    /// Nearest-midpoint trough landed on the wrong side of the head
    TroughOutOfOrder { trough1: usize, trough2: usize },
    /// Scoring produced a non-finite value
    ComputationFault,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::PeaksOutOfOrder => write!(f, "peaks out of order"),
            Rejection::HeadNotHighest => write!(f, "head not above both shoulders"),
            Rejection::ShouldersDissimilar => write!(f, "shoulders not similar"),
            Rejection::TooFewTroughs { found } => {
                write!(f, "{found} trough(s) between shoulders, need 2")
            }
            Rejection::TroughOutOfOrder { trough1, trough2 } => {
                write!(f, "troughs {trough1}/{trough2} not on either side of head")
            }
            Rejection::ComputationFault => write!(f, "non-finite score"),
        }
    }
}

/// Outcome of checking one peak triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Accepted(PatternCandidate),
    Rejected(Rejection),
}

/// Enumerates consecutive peak triples and validates them against the troughs
#[derive(Debug, Clone, Copy)]
pub struct ShapeMatcher<'a> {
    prices: &'a [f64],
    peaks: &'a [usize],
    troughs: &'a [usize],
    tolerance: f64,
}

impl<'a> ShapeMatcher<'a> {
    pub fn new(prices: &'a [f64], peaks: &'a [usize], troughs: &'a [usize], tolerance: f64) -> Self {
        Self {
            prices,
            peaks,
            troughs,
            tolerance,
        }
    }

    /// Evaluate every triple left to right, yielding `(head index, evaluation)`
    pub fn evaluations(self) -> impl Iterator<Item = (usize, Evaluation)> + 'a {
        self.peaks.windows(3).map(move |triple| {
            let (ls, head, rs) = (triple[0], triple[1], triple[2]);
            (head, self.evaluate(ls, head, rs))
        })
    }

    /// First triple passing every structural check
    pub fn first_match(&self) -> Option<PatternCandidate> {
        self.evaluations().find_map(|(_, evaluation)| match evaluation {
            Evaluation::Accepted(candidate) => Some(candidate),
            Evaluation::Rejected(_) => None,
        })
    }

    /// Check a single `(left shoulder, head, right shoulder)` triple
    pub fn evaluate(&self, ls: usize, head: usize, rs: usize) -> Evaluation {
        if !(ls < head && head < rs) {
            return Evaluation::Rejected(Rejection::PeaksOutOfOrder);
        }

        let (Some(&lhs), Some(&hd), Some(&rhs)) =
            (self.prices.get(ls), self.prices.get(head), self.prices.get(rs))
        else {
            return Evaluation::Rejected(Rejection::ComputationFault);
        };

        if !(hd > lhs && hd > rhs) {
            return Evaluation::Rejected(Rejection::HeadNotHighest);
        }

        if !is_similar(lhs, rhs, self.tolerance) {
            return Evaluation::Rejected(Rejection::ShouldersDissimilar);
        }

        let between: Vec<usize> = self
            .troughs
            .iter()
            .copied()
            .filter(|&t| ls < t && t < rs)
            .collect();
        if between.len() < 2 {
            return Evaluation::Rejected(Rejection::TooFewTroughs {
                found: between.len(),
            });
        }

        let (Some(trough1), Some(trough2)) = (
            nearest(&between, (ls + head) / 2),
            nearest(&between, (head + rs) / 2),
        ) else {
            return Evaluation::Rejected(Rejection::TooFewTroughs { found: 0 });
        };

        if !(ls < trough1 && trough1 < head && head < trough2 && trough2 < rs) {
            return Evaluation::Rejected(Rejection::TroughOutOfOrder { trough1, trough2 });
        }

        Evaluation::Accepted(PatternCandidate {
            left_shoulder: ls,
            head,
            right_shoulder: rs,
            trough1,
            trough2,
        })
    }
}

/// Closest index to `target`; ties keep the earlier index
fn nearest(indices: &[usize], target: usize) -> Option<usize> {
    indices.iter().copied().min_by_key(|&t| t.abs_diff(target))
}

/// Peak/trough based matcher returning the first valid candidate
pub fn match_shape(
    prices: &[f64],
    peaks: &[usize],
    troughs: &[usize],
    tolerance: f64,
) -> Option<PatternCandidate> {
    ShapeMatcher::new(prices, peaks, troughs, tolerance).first_match()
}
