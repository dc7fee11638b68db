//! Closed loops of curves.

use kurbo::{Affine, BezPath, PathSeg, Point, Rect, Shape, Vec2};

use crate::{curve::Curve, Error};

/// Where a point is relative to a ring or a region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Location {
    /// Strictly inside.
    Inside,
    /// Strictly outside.
    Outside,
    /// On (or within tolerance of) the boundary.
    Edge(EdgeHit),
}

/// The boundary curve that a point was found on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeHit {
    /// The index of the curve within its ring.
    pub curve: usize,
    /// The parameter of the closest point on that curve.
    pub t: f64,
    /// The direction the boundary is traveling at that point.
    pub tangent: Vec2,
}

/// How far from a boundary a point can be while still being "on" it, when no
/// tolerance is given explicitly.
pub const DEFAULT_EDGE_TOLERANCE: f64 = 1e-6;

/// Gaps between consecutive curves smaller than this (relative to the size of
/// the coordinates) are closed up when building a ring.
const CLOSURE_TOLERANCE: f64 = 1e-9;

// Control point distance for approximating a quarter circle with a cubic.
const CIRCLE_K: f64 = 0.551915024494;

/// A closed loop of curves.
///
/// Each curve ends exactly where the next one starts, and the last one ends
/// exactly where the first one starts. The area to the left of the curves is
/// the inside, so counter-clockwise rings (with `y` pointing up) enclose
/// their interior and clockwise rings describe holes.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Ring {
    curves: Vec<Curve>,
    #[serde(skip)]
    path: BezPath,
    #[serde(skip)]
    bounds: Rect,
    #[serde(skip)]
    signed_area: f64,
}

impl PartialEq for Ring {
    fn eq(&self, other: &Self) -> bool {
        self.curves == other.curves
    }
}

fn check_finite(p: Point) -> Result<(), Error> {
    if p.x.is_nan() || p.y.is_nan() {
        Err(Error::NaN)
    } else if p.x.is_infinite() || p.y.is_infinite() {
        Err(Error::Infinity)
    } else {
        Ok(())
    }
}

impl Ring {
    /// Builds a ring from a closed sequence of curves.
    ///
    /// Tiny gaps between consecutive curves are closed by moving the start of
    /// the later curve. Fails if the curves don't form a closed loop, if any
    /// coordinate is not finite, or if some curve begins where it ends.
    pub fn new(curves: impl IntoIterator<Item = Curve>) -> Result<Ring, Error> {
        let mut curves: Vec<Curve> = curves.into_iter().collect();
        if curves.is_empty() {
            return Err(Error::EmptyRing);
        }

        let mut scale = 1.0f64;
        for c in &curves {
            for p in c.control_points() {
                check_finite(p)?;
                scale = scale.max(p.x.abs()).max(p.y.abs());
            }
        }
        for (i, c) in curves.iter().enumerate() {
            if c.start() == c.end() {
                return Err(Error::ZeroLengthCurve { curve: i });
            }
        }

        let n = curves.len();
        for i in 0..n {
            let end = curves[i].end();
            let j = (i + 1) % n;
            let next = curves[j];
            let gap = (next.start() - end).hypot();
            if gap > CLOSURE_TOLERANCE * scale {
                return Err(Error::NonClosedRing { curve: i, gap });
            }
            if gap > 0.0 {
                let fixed = next.with_endpoints(end, next.end());
                if fixed.start() == fixed.end() {
                    return Err(Error::ZeroLengthCurve { curve: j });
                }
                curves[j] = fixed;
            }
        }

        Ok(Ring::assemble(curves))
    }

    /// Builds a ring from curves that are already known to form a closed loop.
    pub(crate) fn assemble(curves: Vec<Curve>) -> Ring {
        debug_assert!(!curves.is_empty());
        let mut path = BezPath::new();
        let mut bounds: Option<Rect> = None;
        let mut signed_area = 0.0;
        if let Some(first) = curves.first() {
            path.move_to(first.start());
        }
        for c in &curves {
            match c.seg() {
                PathSeg::Line(l) => path.line_to(l.p1),
                PathSeg::Quad(q) => path.quad_to(q.p1, q.p2),
                PathSeg::Cubic(cb) => path.curve_to(cb.p1, cb.p2, cb.p3),
            }
            let bbox = c.bounding_box();
            bounds = Some(bounds.map_or(bbox, |b| b.union(bbox)));
            signed_area += c.signed_area();
        }
        path.close_path();

        Ring {
            curves,
            path,
            bounds: bounds.unwrap_or(Rect::ZERO),
            signed_area,
        }
    }

    /// A closed polygon through the given points.
    ///
    /// The closing edge is implied: don't repeat the first point at the end
    /// (if you do, the repeat is ignored).
    pub fn from_points<P: Into<Point>>(points: impl IntoIterator<Item = P>) -> Result<Ring, Error> {
        let mut points: Vec<Point> = points.into_iter().map(Into::into).collect();
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        let n = points.len();
        if n == 0 {
            return Err(Error::EmptyRing);
        }
        Ring::new((0..n).map(|i| Curve::line(points[i], points[(i + 1) % n])))
    }

    /// A counter-clockwise rectangle.
    pub fn rectangle(rect: Rect) -> Result<Ring, Error> {
        let rect = rect.abs();
        Ring::from_points([
            (rect.x0, rect.y0),
            (rect.x1, rect.y0),
            (rect.x1, rect.y1),
            (rect.x0, rect.y1),
        ])
    }

    /// The unit square `[0, 1] x [0, 1]`, counter-clockwise.
    pub fn square() -> Ring {
        let pts = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        Ring::assemble((0..4).map(|i| Curve::line(pts[i], pts[(i + 1) % 4])).collect())
    }

    /// A counter-clockwise circle, made of four cubic Béziers.
    pub fn circle(center: impl Into<Point>, radius: f64) -> Result<Ring, Error> {
        let c = center.into().to_vec2();
        let r = radius;
        let k = CIRCLE_K * r;
        let p = |x: f64, y: f64| Point::new(x, y) + c;
        Ring::new([
            Curve::cubic(p(r, 0.0), p(r, k), p(k, r), p(0.0, r)),
            Curve::cubic(p(0.0, r), p(-k, r), p(-r, k), p(-r, 0.0)),
            Curve::cubic(p(-r, 0.0), p(-r, -k), p(-k, -r), p(0.0, -r)),
            Curve::cubic(p(0.0, -r), p(k, -r), p(r, -k), p(r, 0.0)),
        ])
    }

    /// The curves, in order.
    pub fn curves(&self) -> &[Curve] {
        &self.curves
    }

    /// The number of curves.
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// Rings are never empty, but clippy likes to see this.
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// The enclosed area: positive for counter-clockwise rings, negative for
    /// clockwise ones.
    pub fn signed_area(&self) -> f64 {
        self.signed_area
    }

    /// The enclosed area, ignoring orientation.
    pub fn area(&self) -> f64 {
        self.signed_area.abs()
    }

    /// Does this ring run clockwise (and so describe a hole)?
    pub fn is_clockwise(&self) -> bool {
        self.signed_area < 0.0
    }

    /// The bounding box.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// The same loop, traversed the other way.
    pub fn reverse(&self) -> Ring {
        Ring::assemble(self.curves.iter().rev().map(Curve::reverse).collect())
    }

    /// Applies an affine transformation to every curve.
    pub fn transform(&self, affine: Affine) -> Ring {
        Ring::assemble(self.curves.iter().map(|c| c.transform(affine)).collect())
    }

    /// This ring as a closed `kurbo` path.
    pub fn to_bez_path(&self) -> BezPath {
        self.path.clone()
    }

    /// Classifies a point, treating anything within
    /// [`DEFAULT_EDGE_TOLERANCE`] of the boundary as on it.
    pub fn test(&self, p: Point) -> Location {
        self.test_within(p, DEFAULT_EDGE_TOLERANCE)
    }

    /// Classifies a point, treating anything within `eps` of the boundary as
    /// on it.
    pub fn test_within(&self, p: Point, eps: f64) -> Location {
        if !self.bounds.inflate(eps, eps).contains(p) {
            return Location::Outside;
        }

        let mut best: Option<(f64, EdgeHit)> = None;
        for (i, c) in self.curves.iter().enumerate() {
            if !c.bounding_box().inflate(eps, eps).contains(p) {
                continue;
            }
            let (t, dist) = c.nearest(p, eps * 1e-3);
            if dist <= eps && best.map_or(true, |(d, _)| dist < d) {
                let hit = EdgeHit {
                    curve: i,
                    t,
                    tangent: c.direction(t),
                };
                best = Some((dist, hit));
            }
        }
        if let Some((_, hit)) = best {
            return Location::Edge(hit);
        }

        if self.path.winding(p) != 0 {
            Location::Inside
        } else {
            Location::Outside
        }
    }

    /// Is the point inside the ring or on its boundary?
    pub fn contains(&self, p: Point) -> bool {
        self.test(p) != Location::Outside
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn square_basics() {
        let sq = Ring::square();
        assert_eq!(sq.len(), 4);
        assert!((sq.signed_area() - 1.0).abs() < 1e-12);
        assert!(!sq.is_clockwise());
        assert!(sq.reverse().is_clockwise());
        assert_eq!(sq.bounds(), Rect::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn circle_area() {
        let c = Ring::circle((1.0, 2.0), 3.0).unwrap();
        let expected = std::f64::consts::PI * 9.0;
        assert!((c.area() - expected).abs() / expected < 1e-3);
        assert!(!c.is_clockwise());
        assert_matches!(c.test(Point::new(1.0, 2.0)), Location::Inside);
        assert_matches!(c.test(Point::new(4.0, 2.0)), Location::Edge(_));
        assert_matches!(c.test(Point::new(5.0, 2.0)), Location::Outside);
    }

    #[test]
    fn point_classification() {
        let sq = Ring::square();
        assert_eq!(sq.test(Point::new(0.5, 0.5)), Location::Inside);
        assert_eq!(sq.test(Point::new(1.5, 0.5)), Location::Outside);
        assert_matches!(
            sq.test(Point::new(1.0, 0.5)),
            Location::Edge(EdgeHit { curve: 1, tangent, .. }) => {
                assert!(tangent.y > 0.0);
            }
        );
        // Still "inside" for a clockwise ring: winding is nonzero either way.
        assert_eq!(sq.reverse().test(Point::new(0.5, 0.5)), Location::Inside);
    }

    #[test]
    fn closure_is_enforced() {
        let open = Ring::new([
            Curve::line((0.0, 0.0), (1.0, 0.0)),
            Curve::line((1.0, 0.0), (1.0, 1.0)),
        ]);
        assert_matches!(open, Err(Error::NonClosedRing { curve: 1, .. }));

        assert_matches!(Ring::new(Vec::<Curve>::new()), Err(Error::EmptyRing));

        let degenerate = Ring::from_points([(0.0, 0.0), (0.0, 0.0), (1.0, 1.0)]);
        assert_matches!(degenerate, Err(Error::ZeroLengthCurve { curve: 0 }));

        let nan = Ring::from_points([(0.0, 0.0), (f64::NAN, 0.0), (1.0, 1.0)]);
        assert_matches!(nan, Err(Error::NaN));
    }

    #[test]
    fn tiny_gaps_are_closed() {
        let ring = Ring::new([
            Curve::line((0.0, 0.0), (1.0, 0.0)),
            Curve::line((1.0, 1e-12), (0.0, 1.0)),
            Curve::line((0.0, 1.0), (0.0, 0.0)),
        ])
        .unwrap();
        assert_eq!(ring.curves()[1].start(), Point::new(1.0, 0.0));
    }

    #[test]
    fn from_points_ignores_repeated_start() {
        let a = Ring::from_points([(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]).unwrap();
        let b = Ring::from_points([(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)]).unwrap();
        assert_eq!(a, b);
    }
}
