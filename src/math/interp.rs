//! Smooth asymmetric interpolation for shape systematics.
//!
//! For a nuisance value `a`:
//!
//! ```text
//! s(a)     = a (a² (3a² - 10) + 15) / 8      |a| <= 1
//!          = sign(a)                         |a| >  1
//! alpha(a) = (a / 2) [(up - down) + (up + down - 2 nominal) s(a)] / nominal
//! value(a) = nominal (1 + alpha(a))
//! ```
//!
//! `s` has matching first and second derivatives at `|a| = 1`, so the
//! interpolation is twice differentiable across the splice points. At
//! `a = ±1` the value reproduces the up/down templates exactly.

/// Odd polynomial blend, clamped to `±1` outside `[-1, 1]`.
pub fn smooth_step(a: f64) -> f64 {
    if a.abs() > 1.0 {
        return a.signum();
    }
    0.125 * a * (a * a * (3.0 * a * a - 10.0) + 15.0)
}

/// Relative shift `alpha(a)`. `nominal` must be non-zero.
pub fn morph_alpha(a: f64, nominal: f64, up: f64, down: f64) -> f64 {
    0.5 * a * ((up - down) + (up + down - 2.0 * nominal) * smooth_step(a)) / nominal
}

/// Morphed value `nominal · (1 + alpha(a))`.
pub fn morph_value(a: f64, nominal: f64, up: f64, down: f64) -> f64 {
    nominal * (1.0 + morph_alpha(a, nominal, up, down))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smooth_step_hits_endpoints() {
        assert_eq!(smooth_step(0.0), 0.0);
        assert!((smooth_step(1.0) - 1.0).abs() < 1e-15);
        assert!((smooth_step(-1.0) + 1.0).abs() < 1e-15);
        assert_eq!(smooth_step(2.5), 1.0);
        assert_eq!(smooth_step(-7.0), -1.0);
    }

    #[test]
    fn smooth_step_derivatives_continuous_at_one() {
        // s'(1) = (15/8)(a⁴ - 2a² + 1) = 0 and s''(1) = (15/2)(a³ - a) = 0.
        let h = 1e-5;
        let d1 = (smooth_step(1.0) - smooth_step(1.0 - h)) / h;
        assert!(d1.abs() < 1e-4, "first derivative at 1: {d1}");
        let d2 = (smooth_step(1.0) - 2.0 * smooth_step(1.0 - h) + smooth_step(1.0 - 2.0 * h)) / (h * h);
        assert!(d2.abs() < 1e-3, "second derivative at 1: {d2}");
    }

    #[test]
    fn morph_reproduces_templates() {
        let (nom, up, down) = (10.0, 13.0, 8.5);
        assert_eq!(morph_value(0.0, nom, up, down), nom);
        assert!((morph_value(1.0, nom, up, down) - up).abs() < 1e-12);
        assert!((morph_value(-1.0, nom, up, down) - down).abs() < 1e-12);
        assert!((morph_alpha(1.0, nom, up, down) - 0.3).abs() < 1e-12);
        assert!((morph_alpha(-1.0, nom, up, down) + 0.15).abs() < 1e-12);
    }

    #[test]
    fn morph_extrapolates_linearly() {
        let (nom, up, down) = (4.0, 5.0, 2.0);
        let a2 = morph_value(2.0, nom, up, down);
        let a3 = morph_value(3.0, nom, up, down);
        let a4 = morph_value(4.0, nom, up, down);
        assert!(((a3 - a2) - (a4 - a3)).abs() < 1e-12);
    }
}
