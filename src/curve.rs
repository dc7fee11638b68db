//! The curves that ring boundaries are made of.
//!
//! A [`Curve`] is a thin wrapper around a [`kurbo::PathSeg`]: a line, a
//! quadratic or a cubic Bézier, parametrized over `[0, 1]`. On top of what
//! `kurbo` offers, it knows how to find its intersections with another curve,
//! how to split itself so that the two halves share an exact point, and how to
//! be dragged onto new endpoints (which is how we glue curves onto canonical
//! vertices).

use arrayvec::ArrayVec;
use kurbo::{
    Affine, CubicBez, Line, ParamCurve, ParamCurveArea, ParamCurveDeriv, ParamCurveExtrema,
    ParamCurveNearest, PathSeg, Point, QuadBez, Rect, Vec2,
};

use crate::tolerance::Tolerances;

mod intersect;

/// A parametric curve segment.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Curve {
    seg: PathSeg,
}

impl From<PathSeg> for Curve {
    fn from(seg: PathSeg) -> Self {
        Curve { seg }
    }
}

impl Curve {
    /// A straight line from `p0` to `p1`.
    pub fn line(p0: impl Into<Point>, p1: impl Into<Point>) -> Self {
        let (p0, p1): (Point, Point) = (p0.into(), p1.into());
        PathSeg::Line(Line::new(p0, p1)).into()
    }

    /// A quadratic Bézier.
    pub fn quad(p0: impl Into<Point>, p1: impl Into<Point>, p2: impl Into<Point>) -> Self {
        let (p0, p1, p2): (Point, Point, Point) = (p0.into(), p1.into(), p2.into());
        PathSeg::Quad(QuadBez::new(p0, p1, p2)).into()
    }

    /// A cubic Bézier.
    pub fn cubic(
        p0: impl Into<Point>,
        p1: impl Into<Point>,
        p2: impl Into<Point>,
        p3: impl Into<Point>,
    ) -> Self {
        let (p0, p1, p2, p3): (Point, Point, Point, Point) =
            (p0.into(), p1.into(), p2.into(), p3.into());
        PathSeg::Cubic(CubicBez::new(p0, p1, p2, p3)).into()
    }

    /// The underlying `kurbo` segment.
    pub fn seg(&self) -> PathSeg {
        self.seg
    }

    /// The point at `t = 0`.
    pub fn start(&self) -> Point {
        self.seg.start()
    }

    /// The point at `t = 1`.
    pub fn end(&self) -> Point {
        self.seg.end()
    }

    /// The point at parameter `t`.
    ///
    /// The endpoints are returned exactly, with no rounding.
    pub fn position(&self, t: f64) -> Point {
        if t <= 0.0 {
            self.start()
        } else if t >= 1.0 {
            self.end()
        } else {
            self.seg.eval(t)
        }
    }

    /// The (unnormalized) tangent vector at `t`.
    ///
    /// Where the derivative vanishes (for example because a control point
    /// coincides with an endpoint), this falls back to the direction of the
    /// nearest distinct control point, so the result is non-zero for any curve
    /// that isn't a single point.
    pub fn direction(&self, t: f64) -> Vec2 {
        let t = t.clamp(0.0, 1.0);
        let d = match self.seg {
            PathSeg::Line(l) => l.p1 - l.p0,
            PathSeg::Quad(q) => q.deriv().eval(t).to_vec2(),
            PathSeg::Cubic(c) => c.deriv().eval(t).to_vec2(),
        };
        let pts = self.control_points();
        let scale = pts
            .iter()
            .map(|p| p.to_vec2().hypot())
            .fold(1.0f64, f64::max);
        if d.hypot() > scale * 1e-12 {
            return d;
        }

        if t < 0.5 {
            let p0 = pts[0];
            pts.iter()
                .skip(1)
                .map(|p| *p - p0)
                .find(|v| v.hypot() > 0.0)
                .unwrap_or(d)
        } else {
            let p1 = pts[pts.len() - 1];
            pts.iter()
                .rev()
                .skip(1)
                .map(|p| p1 - *p)
                .find(|v| v.hypot() > 0.0)
                .unwrap_or(d)
        }
    }

    /// The control points, including both endpoints.
    pub fn control_points(&self) -> ArrayVec<Point, 4> {
        let mut ret = ArrayVec::new();
        match self.seg {
            PathSeg::Line(l) => ret.extend([l.p0, l.p1]),
            PathSeg::Quad(q) => ret.extend([q.p0, q.p1, q.p2]),
            PathSeg::Cubic(c) => ret.extend([c.p0, c.p1, c.p2, c.p3]),
        }
        ret
    }

    /// Is this a straight line segment?
    pub fn is_line(&self) -> bool {
        matches!(self.seg, PathSeg::Line(_))
    }

    /// The part of this curve between two parameters.
    pub fn subsegment(&self, range: std::ops::Range<f64>) -> Curve {
        if range.start == 0.0 && range.end == 1.0 {
            return *self;
        }
        self.seg.subsegment(range).into()
    }

    /// Splits this curve in two at `t`.
    ///
    /// The end of the first half and the start of the second are the same point.
    pub fn split(&self, t: f64) -> (Curve, Curve) {
        let p = self.position(t);
        let first = self.subsegment(0.0..t).with_endpoints(self.start(), p);
        let second = self.subsegment(t..1.0).with_endpoints(p, self.end());
        (first, second)
    }

    /// Cuts this curve at a sorted list of parameters, returning one more piece
    /// than there were parameters.
    ///
    /// Consecutive pieces share their endpoints exactly.
    pub fn subdivide(&self, ts: &[f64]) -> Vec<Curve> {
        debug_assert!(ts.windows(2).all(|w| w[0] <= w[1]));
        let mut ret = Vec::with_capacity(ts.len() + 1);
        let mut prev_t = 0.0;
        let mut prev_p = self.start();
        for &t in ts {
            let p = self.position(t);
            ret.push(self.subsegment(prev_t..t).with_endpoints(prev_p, p));
            prev_t = t;
            prev_p = p;
        }
        ret.push(self.subsegment(prev_t..1.0).with_endpoints(prev_p, self.end()));
        ret
    }

    /// Moves the endpoints of this curve, dragging the adjacent control points
    /// along with them.
    pub fn with_endpoints(&self, p0: Point, p1: Point) -> Curve {
        match self.seg {
            PathSeg::Line(_) => Curve::line(p0, p1),
            PathSeg::Quad(q) => {
                let d = ((p0 - q.p0) + (p1 - q.p2)) * 0.5;
                Curve::quad(p0, q.p1 + d, p1)
            }
            PathSeg::Cubic(c) => Curve::cubic(p0, c.p1 + (p0 - c.p0), c.p2 + (p1 - c.p3), p1),
        }
    }

    /// The same curve, traversed in the opposite direction.
    pub fn reverse(&self) -> Curve {
        self.seg.reverse().into()
    }

    /// The signed area between this curve and the origin.
    ///
    /// Summed over a closed ring, this is the ring's area: positive for
    /// counter-clockwise rings (with `y` pointing up).
    pub fn signed_area(&self) -> f64 {
        self.seg.signed_area()
    }

    /// The tight bounding box of this curve.
    pub fn bounding_box(&self) -> Rect {
        ParamCurveExtrema::bounding_box(&self.seg)
    }

    /// The parameter of the point on this curve closest to `p`, and its distance.
    pub fn nearest(&self, p: Point, accuracy: f64) -> (f64, f64) {
        let n = self.seg.nearest(p, accuracy);
        (n.t, n.distance_sq.sqrt())
    }

    /// The distance between the endpoints.
    pub fn chord_length(&self) -> f64 {
        (self.end() - self.start()).hypot()
    }

    /// Is every control point within `eps` of the chord, and between its ends?
    pub fn is_flat(&self, eps: f64) -> bool {
        let pts = self.control_points();
        let p0 = pts[0];
        let chord = pts[pts.len() - 1] - p0;
        let len = chord.hypot();
        let inner = &pts[1..pts.len() - 1];
        if len <= eps {
            return inner.iter().all(|p| (*p - p0).hypot() <= eps);
        }
        inner.iter().all(|p| {
            let v = *p - p0;
            let along = v.dot(chord) / len;
            v.cross(chord).abs() / len <= eps && along >= -eps && along <= len + eps
        })
    }

    /// Applies an affine transformation.
    pub fn transform(&self, affine: Affine) -> Curve {
        (affine * self.seg).into()
    }

    /// All the places where this curve meets `other`, as `(t_self, t_other)`
    /// pairs sorted by `t_self`.
    ///
    /// Crossings and tangencies are reported once each. If the two curves
    /// overlap along a stretch, the ends of the stretch are reported instead.
    /// Parameters within the parametric tolerance of an endpoint are snapped
    /// to exactly `0.0` or `1.0`.
    pub fn intersections(&self, other: &Curve, tol: &Tolerances) -> Vec<(f64, f64)> {
        intersect::intersections(self, other, tol)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn bump() -> Curve {
        Curve::cubic((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0))
    }

    #[test]
    fn split_shares_the_midpoint() {
        let c = bump();
        let (a, b) = c.split(0.3);
        assert_eq!(a.end(), b.start());
        assert_eq!(a.start(), c.start());
        assert_eq!(b.end(), c.end());
        assert!((a.end() - c.position(0.3)).hypot() < 1e-12);
    }

    #[test]
    fn subdivide_pieces_are_contiguous() {
        let c = bump();
        let pieces = c.subdivide(&[0.25, 0.5, 0.75]);
        assert_eq!(pieces.len(), 4);
        for w in pieces.windows(2) {
            assert_eq!(w[0].end(), w[1].start());
        }
        let area: f64 = pieces.iter().map(Curve::signed_area).sum();
        assert!((area - c.signed_area()).abs() < 1e-9);
    }

    #[test]
    fn degenerate_tangent() {
        // The first control point sits on top of the start point.
        let c = Curve::cubic((0.0, 0.0), (0.0, 0.0), (1.0, 1.0), (2.0, 0.0));
        let d = c.direction(0.0);
        assert!(d.hypot() > 0.0);
        assert!((d.normalize() - Vec2::new(1.0, 1.0).normalize()).hypot() < 1e-12);
    }

    #[test]
    fn with_endpoints_drags_controls() {
        let c = bump().with_endpoints(Point::new(0.0, 0.5), Point::new(1.0, 0.0));
        assert_matches!(c.seg(), PathSeg::Cubic(cb) => {
            assert_eq!(cb.p1, Point::new(0.0, 1.5));
            assert_eq!(cb.p2, Point::new(1.0, 1.0));
        });
    }

    #[test]
    fn reverse_negates_area() {
        let c = bump();
        assert!((c.signed_area() + c.reverse().signed_area()).abs() < 1e-12);
        assert_eq!(c.reverse().start(), c.end());
    }

    #[test]
    fn constructors_take_tuples_or_points() {
        let q = Curve::quad((0.0, 0.0), Point::new(1.0, 2.0), (2.0, 0.0));
        assert_eq!(q.start(), Point::ORIGIN);
        assert_eq!(q.end(), Point::new(2.0, 0.0));
        assert_eq!(q.position(0.5), Point::new(1.0, 1.0));
        assert_eq!(bump(), Curve::cubic(Point::ORIGIN, (0.0, 1.0), Point::new(1.0, 1.0), (1.0, 0.0)));
    }

    #[test]
    fn flatness() {
        assert!(Curve::line((0.0, 0.0), (1.0, 1.0)).is_flat(0.0));
        assert!(!bump().is_flat(0.1));
        // Collinear, but doubling back on itself.
        let c = Curve::cubic((0.0, 0.0), (2.0, 0.0), (-1.0, 0.0), (1.0, 0.0));
        assert!(!c.is_flat(1e-9));
    }
}
