//! Series derived from the mass spectrum for display.
//!
//! The degeneracy model is a simplified placeholder: level 0 is non-degenerate
//! and level `i` carries `i * 2^min(i, 3)` states. It is only used to drive the
//! secondary chart and is recomputed for every spectrum that arrives.

/// Highest power of two applied by the degeneracy model.
const MAX_DEGENERACY_EXPONENT: usize = 3;

/// Degeneracy of each level of `spectrum`.
///
/// Only the length of `spectrum` matters; the output always has the same
/// length, and is empty for an empty spectrum.
pub fn degeneracy(spectrum: &[f64]) -> Vec<f64> {
    (0..spectrum.len()).map(level_degeneracy).collect()
}

/// Degeneracy of a single level.
pub fn level_degeneracy(level: usize) -> f64 {
    if level == 0 {
        return 1.0;
    }
    let exponent = level.min(MAX_DEGENERACY_EXPONENT) as i32;
    level as f64 * 2f64.powi(exponent)
}

/// Pair each value with its level index, ready for plotting.
pub fn indexed_points(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect()
}
