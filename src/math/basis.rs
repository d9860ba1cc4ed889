//! Chebyshev product basis on the unit square.
//!
//! Inputs live on `[0, 1]` (the mapped bin centers) and are stretched to
//! `u = 2t - 1 ∈ [-1, 1]`, where every `T_n(u)` is bounded by 1.
//!
//! The 2D basis is `B_ij(x, y) = T_i(u_x) · T_j(u_y)` for
//! `0 <= i <= x_order`, `0 <= j <= y_order`, excluding the constant `B_00`
//! (the transfer function supplies its own offset). Terms are enumerated
//! with `j` outer and `i` inner.

/// Chebyshev polynomial of the first kind, `T_n(u)`, by recurrence.
pub fn chebyshev(n: usize, u: f64) -> f64 {
    match n {
        0 => 1.0,
        1 => u,
        _ => {
            let (mut prev, mut cur) = (1.0, u);
            for _ in 1..n {
                let next = 2.0 * u * cur - prev;
                prev = cur;
                cur = next;
            }
            cur
        }
    }
}

/// `(i, j)` orders of every non-constant basis term, in basis-index order.
pub fn basis_terms(x_order: usize, y_order: usize) -> Vec<(usize, usize)> {
    (0..=y_order)
        .flat_map(|j| (0..=x_order).map(move |i| (i, j)))
        .filter(|&(i, j)| i != 0 || j != 0)
        .collect()
}

/// Values of every basis term at the mapped point `(x, y)`.
pub fn basis_values(x_order: usize, y_order: usize, x: f64, y: f64) -> Vec<f64> {
    let ux = 2.0 * x - 1.0;
    let uy = 2.0 * y - 1.0;
    basis_terms(x_order, y_order)
        .into_iter()
        .map(|(i, j)| chebyshev(i, ux) * chebyshev(j, uy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chebyshev_closed_forms() {
        for &u in &[-1.0, -0.3, 0.0, 0.6, 1.0] {
            assert!((chebyshev(2, u) - (2.0 * u * u - 1.0)).abs() < 1e-12);
            assert!((chebyshev(3, u) - (4.0 * u * u * u - 3.0 * u)).abs() < 1e-12);
            let theta = f64::acos(u);
            assert!((chebyshev(5, u) - (5.0 * theta).cos()).abs() < 1e-9);
        }
    }

    #[test]
    fn terms_skip_constant_and_run_x_inner() {
        assert_eq!(basis_terms(1, 1), vec![(1, 0), (0, 1), (1, 1)]);
        assert_eq!(basis_terms(2, 0), vec![(1, 0), (2, 0)]);
        assert!(basis_terms(0, 0).is_empty());
    }

    #[test]
    fn values_bounded_on_unit_square() {
        for &x in &[0.0, 0.13, 0.5, 0.99, 1.0] {
            for &y in &[0.0, 0.4, 1.0] {
                for v in basis_values(4, 3, x, y) {
                    assert!(v.abs() <= 1.0 + 1e-12);
                }
            }
        }
    }
}
