/// A local peak or trough of a price series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    pub index: usize,
    pub value: f64,
}

/// Strict local maxima: `series[i-1] < series[i] > series[i+1]`
fn local_maxima(series: &[f64]) -> Vec<Extremum> {
    if series.len() < 3 {
        return Vec::new();
    }

    (1..series.len() - 1)
        .filter(|&i| series[i - 1] < series[i] && series[i] > series[i + 1])
        .map(|i| Extremum {
            index: i,
            value: series[i],
        })
        .collect()
}

/// Find peak indices at least `min_separation` samples apart, in ascending order.
///
/// Candidates are taken tallest first; a candidate closer than `min_separation`
/// to an already accepted peak is discarded. Equal heights are resolved in
/// favour of the later index.
pub fn find_peaks(series: &[f64], min_separation: usize) -> Vec<usize> {
    let mut candidates = local_maxima(series);
    if min_separation <= 1 {
        return candidates.into_iter().map(|e| e.index).collect();
    }

    candidates.sort_by(|a, b| b.value.total_cmp(&a.value).then(b.index.cmp(&a.index)));

    let mut accepted: Vec<usize> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let crowded = accepted
            .iter()
            .any(|&peak| peak.abs_diff(candidate.index) < min_separation);
        if !crowded {
            accepted.push(candidate.index);
        }
    }

    accepted.sort_unstable();
    accepted
}

/// Troughs are the peaks of the negated series
pub fn find_troughs(series: &[f64], min_separation: usize) -> Vec<usize> {
    let negated: Vec<f64> = series.iter().map(|v| -v).collect();
    find_peaks(&negated, min_separation)
}

/// Pair each index with its value in `series`
pub fn extrema_at(series: &[f64], indices: &[usize]) -> Vec<Extremum> {
    indices
        .iter()
        .filter_map(|&index| series.get(index).map(|&value| Extremum { index, value }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_series(len: usize, base: f64, points: &[(usize, f64)]) -> Vec<f64> {
        let mut series = vec![base; len];
        for &(idx, value) in points {
            series[idx] = value;
        }
        series
    }

    #[test]
    fn test_degenerate_series_has_no_extrema() {
        assert!(find_peaks(&[], 5).is_empty());
        assert!(find_peaks(&[1.0], 5).is_empty());
        assert!(find_peaks(&[1.0, 2.0], 5).is_empty());
        assert!(find_peaks(&[f64::NAN; 10], 5).is_empty());
        assert!(find_troughs(&[f64::NAN; 10], 5).is_empty());

        let rising: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert!(find_peaks(&rising, 5).is_empty());
        assert!(find_troughs(&rising, 5).is_empty());
    }

    #[test]
    fn test_flat_runs_are_not_extrema() {
        let series = make_series(20, 10.0, &[(5, 12.0), (6, 12.0)]);
        assert!(find_peaks(&series, 1).is_empty());
    }

    #[test]
    fn test_peaks_are_ascending() {
        let series = make_series(40, 0.0, &[(30, 3.0), (5, 1.0), (18, 2.0)]);
        assert_eq!(find_peaks(&series, 5), vec![5, 18, 30]);
    }

    #[test]
    fn test_separation_keeps_taller_peak() {
        // 10 and 13 are 3 apart; the taller one at 13 survives
        let series = make_series(30, 0.0, &[(10, 4.0), (13, 6.0), (25, 5.0)]);
        assert_eq!(find_peaks(&series, 5), vec![13, 25]);
        assert_eq!(find_peaks(&series, 1), vec![10, 13, 25]);
    }

    #[test]
    fn test_separation_boundary_is_exclusive() {
        let series = make_series(30, 0.0, &[(10, 4.0), (15, 6.0)]);
        assert_eq!(find_peaks(&series, 5), vec![10, 15]);

        let series = make_series(30, 0.0, &[(10, 4.0), (14, 6.0)]);
        assert_eq!(find_peaks(&series, 5), vec![14]);
    }

    #[test]
    fn test_equal_heights_prefer_later_index() {
        let series = make_series(30, 0.0, &[(10, 5.0), (12, 5.0)]);
        assert_eq!(find_peaks(&series, 5), vec![12]);
    }

    #[test]
    fn test_troughs_mirror_peaks() {
        let series = make_series(40, 10.0, &[(8, 4.0), (20, 2.0), (33, 7.0)]);
        assert_eq!(find_troughs(&series, 5), vec![8, 20, 33]);

        let negated: Vec<f64> = series.iter().map(|v| -v).collect();
        assert_eq!(find_peaks(&negated, 5), find_troughs(&series, 5));
    }

    #[test]
    fn test_nan_neighbours_block_candidates() {
        let series = vec![0.0, 1.0, f64::NAN, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0];
        assert_eq!(find_peaks(&series, 5), vec![9]);
    }

    #[test]
    fn test_extrema_at_pairs_values() {
        let series = vec![1.0, 5.0, 2.0];
        let extrema = extrema_at(&series, &[1, 7]);
        assert_eq!(extrema, vec![Extremum { index: 1, value: 5.0 }]);
    }
}
