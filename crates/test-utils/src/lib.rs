//! Test support shared by the raster-zonal crates.
//!
//! - [`fixtures`]: the 4x4 reference scenario (grid, zones, layer)
//! - [`generators`]: synthetic grids, layers and block zones
//! - approximate-equality assertions for reduced values
//!
//! Used only as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// Assert two numbers are within `epsilon` of each other.
///
/// ```ignore
/// assert_approx_eq!(means[0].unwrap(), 2.5, 1e-12);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        let diff = (left - right).abs();
        assert!(
            diff <= epsilon,
            "assertion failed: {} != {} (diff {} > {})",
            left,
            right,
            diff,
            epsilon
        );
    }};
}

/// Approximate equality of two sequences of optional values.
///
/// Missing entries must be missing on both sides; present entries are
/// compared with [`assert_approx_eq!`].
#[macro_export]
macro_rules! assert_values_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: &[Option<f64>] = &$left;
        let right: &[Option<f64>] = &$right;
        assert_eq!(left.len(), right.len(), "value sequences differ in length");
        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            match (l, r) {
                (Some(l), Some(r)) => $crate::assert_approx_eq!(*l, *r, $epsilon),
                (None, None) => {}
                _ => panic!("value {} differs: {:?} vs {:?}", i, l, r),
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(2.5000001, 2.5, 1e-6);
        assert_approx_eq!(-6.5, -6.5, 0.0);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(2.6, 2.5, 0.001);
    }

    #[test]
    fn test_assert_values_approx_eq() {
        assert_values_approx_eq!(vec![Some(1.0), None], vec![Some(1.0 + 1e-12), None], 1e-9);
    }

    #[test]
    #[should_panic(expected = "differs")]
    fn test_assert_values_missing_mismatch() {
        assert_values_approx_eq!(vec![Some(1.0)], vec![None], 1e-9);
    }
}
