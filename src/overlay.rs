//! Merging the boundaries of two regions into one planar subdivision.
//!
//! Every curve of one region is intersected with every curve of the other
//! region that it might touch (found by sweeping over the curves'
//! x-extents). The curves are cut at the intersections, the cut points are
//! snapped together so that pieces that should meet really do, and the pieces
//! go into an [`EdgeList`].

use std::collections::BTreeSet;

use kurbo::Point;

use crate::{
    curve::Curve,
    geom::Vertex,
    num::CheapOrderedFloat,
    ring::Ring,
    snap::PointSnap,
    sweep::SweepQueue,
    tolerance::Tolerances,
    topology::{EdgeList, Flags},
    Error,
};

/// Which of the two input regions something came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Side {
    A,
    B,
}

impl Side {
    pub fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// The flag for the inside of this side's region.
    pub fn inside(self) -> Flags {
        match self {
            Side::A => Flags::IN_A,
            Side::B => Flags::IN_B,
        }
    }

    /// The flag for the outside of this side's region.
    pub fn outside(self) -> Flags {
        match self {
            Side::A => Flags::OUT_A,
            Side::B => Flags::OUT_B,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct CurveId {
    ring: usize,
    idx: usize,
}

/// A ring that has been cut wherever it meets the other region.
///
/// Consecutive curves still meet end to start, and the last one ends where the
/// first one starts.
pub(crate) type SplitRing = Vec<Curve>;

/// Two regions, merged.
#[derive(Debug)]
pub(crate) struct Overlay {
    /// The merged subdivision.
    pub edges: EdgeList,
    /// The input rings after cutting, indexed by [`Side::index`].
    pub rings: [Vec<SplitRing>; 2],
    /// The vertices where arcs begin and end: every intersection point, and
    /// every vertex where more than two curves meet.
    pub split_vertices: BTreeSet<Vertex>,
}

// Cut parameters for every curve of every ring on one side.
type Cuts = Vec<Vec<Vec<(f64, Point)>>>;

impl Overlay {
    /// Merges two sets of rings.
    pub fn new(a: &[Ring], b: &[Ring], tol: Tolerances) -> Result<Overlay, Error> {
        let inputs = [a, b];
        let mut queues = [SweepQueue::new(), SweepQueue::new()];
        for (side, rings) in inputs.iter().enumerate() {
            for (ring, r) in rings.iter().enumerate() {
                for (idx, c) in r.curves().iter().enumerate() {
                    let bbox = c.bounding_box();
                    queues[side].add(
                        CurveId { ring, idx },
                        bbox.x0 - tol.spatial,
                        bbox.x1 + tol.spatial,
                    );
                }
            }
        }

        let mut cuts: [Cuts; 2] =
            inputs.map(|rings| rings.iter().map(|r| vec![Vec::new(); r.len()]).collect());
        let mut snap = PointSnap::new();
        let mut hits = Vec::new();
        let mut pairs = 0usize;

        while let Some(side) = SweepQueue::next(&mut queues) {
            let Some(id) = queues[side].take() else {
                break;
            };
            let other = 1 - side;
            let curve = &inputs[side][id.ring].curves()[id.idx];
            let partners: Vec<CurveId> = queues[other].active().copied().collect();
            for o in partners {
                let other_curve = &inputs[other][o.ring].curves()[o.idx];
                pairs += 1;
                for (t, u) in curve.intersections(other_curve, &tol) {
                    let p = curve.position(t);
                    let q = other_curve.position(u);
                    snap.union(p, q);
                    hits.push(p);
                    if is_interior(t, &tol) {
                        cuts[side][id.ring][id.idx].push((t, p));
                    }
                    if is_interior(u, &tol) {
                        cuts[other][o.ring][o.idx].push((u, q));
                    }
                }
            }
        }
        tracing::debug!(pairs, intersections = hits.len(), "swept curve pairs");

        // Cuts that are too close together to tell apart become one cut, at
        // one place.
        for side in &mut cuts {
            for ring in side {
                for ts in ring {
                    ts.sort_by_key(|&(t, _)| CheapOrderedFloat::from(t));
                    let mut merged: Vec<(f64, Point)> = Vec::with_capacity(ts.len());
                    for &(t, p) in ts.iter() {
                        match merged.last() {
                            Some(&(prev_t, prev_p)) if t - prev_t <= tol.parametric => {
                                snap.union(prev_p, p);
                            }
                            _ => merged.push((t, p)),
                        }
                    }
                    *ts = merged;
                }
            }
        }

        let mut edges = EdgeList::new(tol);
        let mut rings: [Vec<SplitRing>; 2] = Default::default();
        for side in [Side::A, Side::B] {
            for (ring, r) in inputs[side.index()].iter().enumerate() {
                let mut split = SplitRing::new();
                for (idx, c) in r.curves().iter().enumerate() {
                    let ts = &cuts[side.index()][ring][idx];
                    let mut prev = (0.0, c.start());
                    for &(t, p) in ts.iter().chain(std::iter::once(&(1.0, c.end()))) {
                        let p0 = snap.find(prev.1);
                        let p1 = snap.find(p);
                        if p0 != p1 {
                            let piece = c
                                .subsegment(prev.0..t)
                                .with_endpoints(p0.to_kurbo(), p1.to_kurbo());
                            edges.add(piece, side.inside(), side.outside())?;
                            split.push(piece);
                        }
                        prev = (t, p);
                    }
                }
                if !split.is_empty() {
                    rings[side.index()].push(split);
                }
            }
        }

        let mut split_vertices: BTreeSet<Vertex> = hits.into_iter().map(|p| snap.find(p)).collect();
        let junctions: Vec<Vertex> = edges.vertices().filter(|&v| edges.degree(v) > 2).collect();
        split_vertices.extend(junctions);

        tracing::debug!(
            half_edges = edges.len(),
            split_vertices = split_vertices.len(),
            "built overlay"
        );

        Ok(Overlay {
            edges,
            rings,
            split_vertices,
        })
    }

    /// The cut-up rings of one side.
    pub fn split_rings(&self, side: Side) -> &[SplitRing] {
        &self.rings[side.index()]
    }
}

fn is_interior(t: f64, tol: &Tolerances) -> bool {
    t > tol.parametric && t < 1.0 - tol.parametric
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Ring {
        Ring::rectangle(Rect::new(x0, y0, x0 + size, y0 + size)).unwrap()
    }

    fn check_closed(ring: &SplitRing) {
        for (i, c) in ring.iter().enumerate() {
            assert_eq!(c.end(), ring[(i + 1) % ring.len()].start());
        }
    }

    #[test]
    fn overlapping_squares() {
        let a = [square(0.0, 0.0, 1.0)];
        let b = [square(0.5, 0.5, 1.0)];
        let mut overlay = Overlay::new(&a, &b, Tolerances::default()).unwrap();

        let splits: Vec<Point> = overlay.split_vertices.iter().map(|v| v.to_kurbo()).collect();
        assert_eq!(splits.len(), 2);
        assert!((splits[0] - Point::new(0.5, 1.0)).hypot() < 1e-12);
        assert!((splits[1] - Point::new(1.0, 0.5)).hypot() < 1e-12);
        assert_eq!(overlay.split_rings(Side::A)[0].len(), 6);
        assert_eq!(overlay.split_rings(Side::B)[0].len(), 6);
        overlay.rings.iter().flatten().for_each(check_closed);

        // Outside, A only, B only, and both.
        let faces = overlay.edges.face_rings().unwrap();
        assert_eq!(faces.len(), 4);
        let both: Vec<_> = faces
            .iter()
            .filter(|(_, f)| f.contains(Flags::IN_A) && f.contains(Flags::IN_B))
            .collect();
        assert_eq!(both.len(), 1);
        assert!((both[0].0.signed_area() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn disjoint_squares() {
        let a = [square(0.0, 0.0, 1.0)];
        let b = [square(3.0, 0.0, 1.0)];
        let overlay = Overlay::new(&a, &b, Tolerances::default()).unwrap();
        assert!(overlay.split_vertices.is_empty());
        assert_eq!(overlay.split_rings(Side::A)[0].len(), 4);
        assert_eq!(overlay.edges.len(), 16);
    }

    #[test]
    fn shared_edges_merge() {
        let a = [square(0.0, 0.0, 1.0)];
        let b = [square(1.0, 0.0, 1.0)];
        let overlay = Overlay::new(&a, &b, Tolerances::default()).unwrap();
        // Seven distinct curves: the shared one only appears once.
        assert_eq!(overlay.edges.len(), 14);
        assert!(overlay.split_vertices.contains(&Vertex::new(1.0, 0.0)));
        assert!(overlay.split_vertices.contains(&Vertex::new(1.0, 1.0)));
    }

    #[test]
    fn empty_side() {
        let a = [square(0.0, 0.0, 1.0)];
        let overlay = Overlay::new(&a, &[], Tolerances::default()).unwrap();
        assert!(overlay.split_rings(Side::B).is_empty());
        assert_eq!(overlay.split_rings(Side::A).len(), 1);
    }
}
