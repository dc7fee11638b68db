//! Regions: sets of rings describing an area of the plane.

use kurbo::{Affine, BezPath, PathEl, Point, Rect};

use crate::{
    curve::Curve,
    ring::{Location, Ring, DEFAULT_EDGE_TOLERANCE},
    BinaryOp, Error,
};

/// An area of the plane, bounded by rings.
///
/// Counter-clockwise rings enclose area and clockwise rings cut holes out of
/// it; which ring sits inside which is worked out from containment, smallest
/// first. Rings are stored sorted by their absolute area, smallest first.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct Region {
    rings: Vec<Ring>,
}

impl Region {
    /// Collects some rings into a region.
    pub fn new(rings: impl IntoIterator<Item = Ring>) -> Region {
        let mut rings: Vec<Ring> = rings.into_iter().collect();
        rings.sort_by(|a, b| a.area().total_cmp(&b.area()));
        Region { rings }
    }

    /// The region with nothing in it.
    pub fn empty() -> Region {
        Region::default()
    }

    /// Reads a region from a `kurbo` path, one ring per subpath.
    ///
    /// Every subpath must be closed, either explicitly or by ending where it
    /// started. Segments that don't go anywhere are skipped.
    pub fn from_bez_path(path: &BezPath) -> Result<Region, Error> {
        let mut rings = Vec::new();
        let mut curves: Vec<Curve> = Vec::new();
        let mut start = Point::ZERO;
        let mut cur = Point::ZERO;

        let mut finish = |curves: &mut Vec<Curve>, start: Point, cur: Point, closed: bool| {
            if curves.is_empty() {
                return Ok(());
            }
            if cur != start {
                if !closed {
                    return Err(Error::NonClosedPath);
                }
                curves.push(Curve::line(cur, start));
            }
            rings.push(Ring::new(std::mem::take(curves))?);
            Ok(())
        };

        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => {
                    finish(&mut curves, start, cur, false)?;
                    start = p;
                    cur = p;
                }
                PathEl::LineTo(p) => {
                    if p != cur {
                        curves.push(Curve::line(cur, p));
                    }
                    cur = p;
                }
                PathEl::QuadTo(p1, p2) => {
                    if p2 != cur || p1 != cur {
                        curves.push(Curve::quad(cur, p1, p2));
                    }
                    cur = p2;
                }
                PathEl::CurveTo(p1, p2, p3) => {
                    if p3 != cur || p1 != cur || p2 != cur {
                        curves.push(Curve::cubic(cur, p1, p2, p3));
                    }
                    cur = p3;
                }
                PathEl::ClosePath => {
                    finish(&mut curves, start, cur, true)?;
                    cur = start;
                }
            }
        }
        finish(&mut curves, start, cur, false)?;

        Ok(Region::new(rings))
    }

    /// All the rings as one `kurbo` path.
    pub fn to_bez_path(&self) -> BezPath {
        let mut ret = BezPath::new();
        for ring in &self.rings {
            ret.extend(ring.to_bez_path());
        }
        ret
    }

    /// The rings, smallest first.
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    /// Is there nothing here?
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// The net area: the area of the outer rings minus the area of the holes.
    pub fn area(&self) -> f64 {
        self.rings.iter().map(Ring::signed_area).sum()
    }

    /// The bounding box of all the rings, or `Rect::ZERO` if there are none.
    pub fn bounds(&self) -> Rect {
        self.rings
            .iter()
            .map(Ring::bounds)
            .reduce(|a, b| a.union(b))
            .unwrap_or(Rect::ZERO)
    }

    /// Applies an affine transformation to every ring.
    pub fn transform(&self, affine: Affine) -> Region {
        Region::new(self.rings.iter().map(|r| r.transform(affine)))
    }

    /// Classifies a point, treating anything within
    /// [`DEFAULT_EDGE_TOLERANCE`] of a boundary as on it.
    pub fn test(&self, p: Point) -> Location {
        self.test_within(p, DEFAULT_EDGE_TOLERANCE)
    }

    /// Classifies a point, treating anything within `eps` of a boundary as on
    /// it.
    ///
    /// The smallest ring containing the point decides: the point is inside if
    /// that ring is counter-clockwise and outside (in a hole) if it's
    /// clockwise.
    pub fn test_within(&self, p: Point, eps: f64) -> Location {
        for ring in &self.rings {
            match ring.test_within(p, eps) {
                Location::Outside => {}
                Location::Inside if ring.is_clockwise() => return Location::Outside,
                loc => return loc,
            }
        }
        Location::Outside
    }

    /// Is the point inside this region, or on its boundary?
    pub fn contains(&self, p: Point) -> bool {
        self.test(p) != Location::Outside
    }

    /// Everything in either region.
    pub fn union(&self, other: &Region) -> Result<Region, Error> {
        crate::binary_op(self, other, BinaryOp::Union)
    }

    /// Everything in both regions.
    pub fn intersection(&self, other: &Region) -> Result<Region, Error> {
        crate::binary_op(self, other, BinaryOp::Intersection)
    }

    /// Everything in this region but not in `other`.
    pub fn difference(&self, other: &Region) -> Result<Region, Error> {
        crate::binary_op(self, other, BinaryOp::Difference)
    }
}

impl From<Ring> for Region {
    fn from(ring: Ring) -> Region {
        Region { rings: vec![ring] }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Ring {
        Ring::rectangle(Rect::new(x0, y0, x0 + size, y0 + size)).unwrap()
    }

    #[test]
    fn holes() {
        let region = Region::new([square(0.0, 0.0, 4.0), square(1.0, 1.0, 2.0).reverse()]);
        assert!((region.area() - 12.0).abs() < 1e-12);
        assert_eq!(region.test(Point::new(0.5, 0.5)), Location::Inside);
        assert_eq!(region.test(Point::new(2.0, 2.0)), Location::Outside);
        assert_eq!(region.test(Point::new(5.0, 2.0)), Location::Outside);
        assert_matches!(region.test(Point::new(1.0, 2.0)), Location::Edge(_));
        assert!(region.contains(Point::new(1.0, 2.0)));
        assert!(!region.contains(Point::new(2.0, 2.0)));
        assert_eq!(region.bounds(), Rect::new(0.0, 0.0, 4.0, 4.0));
        // Smallest first.
        assert!(region.rings()[0].is_clockwise());
    }

    #[test]
    fn bez_path_round_trip() {
        let path = BezPath::from_svg("M0,0 L4,0 L4,4 L0,4 Z M1,1 L1,3 L3,3 L3,1 Z").unwrap();
        let region = Region::from_bez_path(&path).unwrap();
        assert_eq!(region.rings().len(), 2);
        assert!((region.area() - 12.0).abs() < 1e-12);

        let again = Region::from_bez_path(&region.to_bez_path()).unwrap();
        assert_eq!(again, region);
    }

    #[test]
    fn open_paths_are_rejected() {
        let path = BezPath::from_svg("M0,0 L4,0 L4,4").unwrap();
        assert_matches!(Region::from_bez_path(&path), Err(Error::NonClosedPath));

        // Ending where it started counts as closed.
        let path = BezPath::from_svg("M0,0 L4,0 L4,4 L0,0").unwrap();
        assert_eq!(Region::from_bez_path(&path).unwrap().rings().len(), 1);
    }

    #[test]
    fn transform() {
        let region = Region::from(square(0.0, 0.0, 1.0));
        let moved = region.transform(Affine::translate((2.0, 3.0)) * Affine::scale(2.0));
        assert_eq!(moved.bounds(), Rect::new(2.0, 3.0, 4.0, 5.0));
        assert!((moved.area() - 4.0).abs() < 1e-12);
    }
}
