/// `|a - b| / max(|a|, |b|) <= tolerance`
///
/// Magnitudes are compared so the negated series used for inverse shapes
/// behaves like the upright one. Non-finite inputs, or both values zero,
/// are never similar.
pub fn is_similar(a: f64, b: f64, tolerance: f64) -> bool {
    if !a.is_finite() || !b.is_finite() {
        return false;
    }

    let larger = a.abs().max(b.abs());
    if larger == 0.0 {
        return false;
    }

    (a - b).abs() / larger <= tolerance
}
