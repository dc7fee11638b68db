#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

#[macro_use]
mod typed_vec;

mod classify;
mod clip;
pub mod curve;
mod geom;
mod graph;
mod num;
mod overlay;
pub mod region;
pub mod ring;
mod snap;
pub mod sweep;
pub mod tolerance;
pub mod topology;

#[cfg(any(test, feature = "generators"))]
pub mod generators;

pub use curve::Curve;
pub use geom::Vertex;
pub use region::Region;
pub use ring::{EdgeHit, Location, Ring};
pub use tolerance::Tolerances;
pub use topology::Flags;

use overlay::Overlay;

/// Binary operations between regions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BinaryOp {
    /// A point is in the union of two regions if it is in either one.
    Union,
    /// A point is in the intersection of two regions if it is in both.
    Intersection,
    /// A point is in the difference of two regions if it is in the first but not the second.
    Difference,
}

/// Something was wrong with the input, or the topology fell apart.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// At least one of the inputs was infinite.
    #[error("one of the inputs was infinite")]
    Infinity,
    /// At least one of the inputs was not a number.
    #[error("one of the inputs had a NaN")]
    NaN,
    /// A ring had no curves in it.
    #[error("a ring must have at least one curve")]
    EmptyRing,
    /// A curve in a ring started and ended at the same point.
    #[error("curve {curve} of the ring has zero length")]
    ZeroLengthCurve {
        /// The index of the curve within its ring.
        curve: usize,
    },
    /// A ring's curves didn't join up.
    #[error("curve {curve} of the ring ends {gap} away from where the next one starts")]
    NonClosedRing {
        /// The index of the curve that doesn't reach the next one.
        curve: usize,
        /// How far apart they are.
        gap: f64,
    },
    /// A path had a subpath that wasn't closed.
    #[error("one of the inputs had a non-closed path")]
    NonClosedPath,
    /// The half-edge structure became inconsistent.
    #[error("topology error at ({}, {}): {reason}", .vertex.x, .vertex.y)]
    Topology {
        /// Where it happened.
        vertex: kurbo::Point,
        /// What went wrong.
        reason: &'static str,
    },
}

/// Everything in either region.
pub fn union(a: &Region, b: &Region) -> Result<Region, Error> {
    binary_op(a, b, BinaryOp::Union)
}

/// Everything in both regions.
pub fn intersection(a: &Region, b: &Region) -> Result<Region, Error> {
    binary_op(a, b, BinaryOp::Intersection)
}

/// Everything in `a` but not in `b`.
pub fn difference(a: &Region, b: &Region) -> Result<Region, Error> {
    binary_op(a, b, BinaryOp::Difference)
}

/// Computes a boolean operation between two regions.
///
/// The tolerances are scaled to the size of the inputs; see
/// [`Tolerances::for_bounds`].
pub fn binary_op(a: &Region, b: &Region, op: BinaryOp) -> Result<Region, Error> {
    let bounds = combined_bounds(a, b);
    let min = bounds.min_x().min(bounds.min_y());
    let max = bounds.max_x().max(bounds.max_y());
    if min.is_nan() || max.is_nan() {
        return Err(Error::NaN);
    }
    if min.is_infinite() || max.is_infinite() {
        return Err(Error::Infinity);
    }
    binary_op_with_tolerances(a, b, op, Tolerances::for_bounds(bounds))
}

/// Computes a boolean operation between two regions, with explicit
/// tolerances.
pub fn binary_op_with_tolerances(
    a: &Region,
    b: &Region,
    op: BinaryOp,
    tol: Tolerances,
) -> Result<Region, Error> {
    tracing::debug!(
        ?op,
        rings_a = a.rings().len(),
        rings_b = b.rings().len(),
        "boolean operation"
    );
    clip::boolean(a, b, op, tol)
}

/// A face of the subdivision made by two overlaid regions.
#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    /// The boundary of the face, with the face on its left.
    ///
    /// Bounded faces are counter-clockwise. The unbounded face (and the
    /// outside of any separate piece of the subdivision) is clockwise.
    pub ring: Ring,
    /// Which side of each region the face is on.
    pub flags: Flags,
}

/// Overlays two regions, returning every face of the resulting subdivision.
///
/// A face whose flags contain [`Flags::IN_A`] and [`Flags::IN_B`] is in both
/// regions, and so on.
pub fn overlay(a: &Region, b: &Region) -> Result<Vec<Face>, Error> {
    let tol = Tolerances::for_bounds(combined_bounds(a, b));
    let mut overlay = Overlay::new(a.rings(), b.rings(), tol)?;
    Ok(overlay
        .edges
        .face_rings()?
        .into_iter()
        .map(|(ring, flags)| Face { ring, flags })
        .collect())
}

fn combined_bounds(a: &Region, b: &Region) -> kurbo::Rect {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.bounds(),
        (_, true) => a.bounds(),
        _ => a.bounds().union(b.bounds()),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use kurbo::{Point, Rect};

    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Region {
        Ring::rectangle(Rect::new(x0, y0, x0 + size, y0 + size))
            .unwrap()
            .into()
    }

    #[test]
    fn two_squares() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(0.5, 0.5, 1.0);

        let u = union(&a, &b).unwrap();
        assert_eq!(u.rings().len(), 1);
        assert!((u.area() - 1.75).abs() < 1e-9);

        let i = intersection(&a, &b).unwrap();
        assert_eq!(i.rings().len(), 1);
        assert!((i.area() - 0.25).abs() < 1e-9);
        assert_eq!(i.test(Point::new(0.75, 0.75)), Location::Inside);

        let d = difference(&a, &b).unwrap();
        assert_eq!(d.rings().len(), 1);
        assert!((d.area() - 0.75).abs() < 1e-9);
        assert_eq!(d.test(Point::new(0.75, 0.75)), Location::Outside);
        assert_eq!(d.test(Point::new(0.25, 0.25)), Location::Inside);
    }

    #[test]
    fn with_an_empty_region() {
        let a = square(0.0, 0.0, 1.0);
        let empty = Region::empty();
        assert_eq!(union(&a, &empty).unwrap(), a);
        assert_eq!(union(&empty, &a).unwrap(), a);
        assert!(intersection(&a, &empty).unwrap().is_empty());
        assert_eq!(difference(&a, &empty).unwrap(), a);
        assert!(difference(&empty, &a).unwrap().is_empty());
        assert!(union(&empty, &empty).unwrap().is_empty());
    }

    #[test]
    fn overlay_faces() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(0.5, 0.5, 1.0);
        let faces = overlay(&a, &b).unwrap();
        assert_eq!(faces.len(), 4);

        let area_with = |flags: Flags| -> f64 {
            faces
                .iter()
                .filter(|f| f.flags.contains(flags))
                .map(|f| f.ring.signed_area())
                .filter(|&a| a > 0.0)
                .sum()
        };
        assert!((area_with(Flags::IN_A | Flags::IN_B) - 0.25).abs() < 1e-9);
        assert!((area_with(Flags::IN_A | Flags::OUT_B) - 0.75).abs() < 1e-9);
        assert!((area_with(Flags::OUT_A | Flags::IN_B) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn bad_input() {
        let path = kurbo::BezPath::from_svg("M0,0 L1,0 L1,1").unwrap();
        assert_matches!(Region::from_bez_path(&path), Err(Error::NonClosedPath));
        assert_matches!(
            Ring::from_points([(0.0, 0.0), (f64::NAN, 0.0), (1.0, 1.0)]),
            Err(Error::NaN)
        );
        assert_matches!(
            Ring::from_points([(0.0, 0.0), (f64::INFINITY, 0.0), (1.0, 1.0)]),
            Err(Error::Infinity)
        );
    }

    #[test]
    fn error_messages() {
        let err = Error::NonClosedRing { curve: 2, gap: 0.5 };
        assert_eq!(
            err.to_string(),
            "curve 2 of the ring ends 0.5 away from where the next one starts"
        );
        let err = Error::Topology {
            vertex: Point::new(1.0, 2.0),
            reason: "face cycle does not close",
        };
        assert_eq!(err.to_string(), "topology error at (1, 2): face cycle does not close");
    }
}
