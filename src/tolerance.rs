//! Numerical tolerances shared by every stage of a boolean operation.

use kurbo::Rect;

/// The fuzziness that every stage of a boolean operation agrees on.
///
/// One value gets threaded through the overlay, the half-edge topology and the
/// arc classification, so that they never disagree about whether two things
/// touch.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tolerances {
    /// Spatial distance below which intersection searches stop refining, curves
    /// count as flat, and output rings count as slivers.
    pub spatial: f64,
    /// Two split parameters on the same curve that are closer than this get
    /// merged into one.
    pub parametric: f64,
    /// Distance below which a point counts as lying on a curve. This decides
    /// on-edge classification and whether two curves are the same curve.
    pub coincidence: f64,
}

const DEFAULT_SPATIAL: f64 = 1e-9;
const DEFAULT_PARAMETRIC: f64 = 1e-6;
const DEFAULT_COINCIDENCE: f64 = 1e-6;

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            spatial: DEFAULT_SPATIAL,
            parametric: DEFAULT_PARAMETRIC,
            coincidence: DEFAULT_COINCIDENCE,
        }
    }
}

impl Tolerances {
    /// Tolerances suitable for inputs living inside `bounds`.
    ///
    /// Coordinates far from the origin have less absolute precision, so the
    /// spatial tolerances grow with the spacing of floats at the largest
    /// coordinate magnitude (not with the magnitude itself: a unit square at
    /// `1e6` is still a unit square). They never go below the defaults.
    pub fn for_bounds(bounds: Rect) -> Self {
        let min = bounds.min_x().min(bounds.min_y());
        let max = bounds.max_x().max(bounds.max_y());
        let m = min.abs().max(max.abs());
        if !m.is_finite() {
            return Tolerances::default();
        }

        let eps = m * (f64::EPSILON * 64.0);
        Tolerances {
            spatial: eps.max(DEFAULT_SPATIAL),
            parametric: DEFAULT_PARAMETRIC,
            coincidence: (eps * 1e3).max(DEFAULT_COINCIDENCE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_inputs_use_defaults() {
        let tol = Tolerances::for_bounds(Rect::new(-1.0, -1.0, 1.0, 1.0));
        assert_eq!(tol, Tolerances::default());
    }

    #[test]
    fn large_inputs_scale_with_precision() {
        let tol = Tolerances::for_bounds(Rect::new(0.0, 0.0, 1e6, 10.0));
        let eps = 1e6 * f64::EPSILON * 64.0;
        assert_eq!(tol.spatial, eps);
        assert_eq!(tol.coincidence, eps * 1e3);
        // Still far smaller than a unit-sized feature out there.
        assert!(tol.coincidence < 1e-4);
        assert_eq!(tol.parametric, DEFAULT_PARAMETRIC);

        let huge = Tolerances::for_bounds(Rect::new(-1e12, 0.0, 0.0, 1.0));
        assert!(huge.spatial > DEFAULT_SPATIAL);
        assert!(huge.coincidence > DEFAULT_COINCIDENCE);
    }
}
