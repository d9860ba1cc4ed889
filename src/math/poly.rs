//! Polynomial evaluation on the unit-mapped domain.

/// Evaluate `Σ c_i t^i` with Horner's scheme.
pub fn horner(coeffs: &[f64], t: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * t + c)
}

/// Evaluate `Σ_j Σ_i c_ij x^i y^j`.
///
/// `coeffs` is row-major with `y` outer and `x` inner, so
/// `coeffs[j * (x_order + 1) + i] = c_ij`. `None` if `coeffs.len()` is
/// not a multiple of `x_order + 1`.
pub fn poly2d(coeffs: &[f64], x_order: usize, x: f64, y: f64) -> Option<f64> {
    let row = x_order + 1;
    if coeffs.len() % row != 0 {
        return None;
    }
    let rows: Vec<f64> = coeffs.chunks(row).map(|r| horner(r, x)).collect();
    Some(horner(&rows, y))
}
