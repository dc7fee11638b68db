//! Cutting rings into arcs and deciding which arcs to keep.
//!
//! After the overlay, every ring is cut at the split vertices into arcs. Each
//! arc lies either inside the other region, outside it, or along its boundary,
//! and the boolean operation decides which of these it keeps. Classification
//! is done with tolerances, so it occasionally goes wrong near
//! nearly-coincident curves; that shows up as a vertex with an odd number of
//! kept arcs, which [`repair_parity`] fixes by flipping the cheapest path of
//! arcs between odd vertices.

use std::collections::BTreeSet;

use kurbo::{Point, Vec2};

use crate::{
    curve::Curve,
    geom::Vertex,
    graph::ArcGraph,
    overlay::{Overlay, Side},
    region::Region,
    ring::{Location, Ring},
    tolerance::Tolerances,
    BinaryOp,
};

typed_vec!(
    /// An arc, within the arcs of one boolean operation.
    pub(crate) ArcIdx,
    ArcVec,
    "arc"
);

/// A run of curves between two split vertices, with none in between.
#[derive(Clone, Debug)]
pub(crate) struct Arc {
    pub curves: Vec<Curve>,
    pub side: Side,
}

impl Arc {
    /// The vertex the arc starts at.
    pub fn head(&self) -> Vertex {
        self.curves
            .first()
            .map_or(Vertex::new(0.0, 0.0), |c| c.start().into())
    }

    /// The vertex the arc ends at.
    pub fn tail(&self) -> Vertex {
        self.curves
            .last()
            .map_or(Vertex::new(0.0, 0.0), |c| c.end().into())
    }

    /// The total chord length of the curves, which is what arcs are
    /// parametrized by.
    pub fn length(&self) -> f64 {
        self.curves.iter().map(Curve::chord_length).sum()
    }

    pub fn signed_area(&self) -> f64 {
        self.curves.iter().map(Curve::signed_area).sum()
    }

    pub fn reverse(&self) -> Arc {
        Arc {
            curves: self.curves.iter().rev().map(Curve::reverse).collect(),
            side: self.side,
        }
    }

    /// The point at parameter `t` in `[0, 1]`, and the direction of travel
    /// there.
    pub fn position(&self, t: f64) -> (Point, Vec2) {
        let mut remaining = t.clamp(0.0, 1.0) * self.length();
        for (i, c) in self.curves.iter().enumerate() {
            let len = c.chord_length();
            if remaining <= len || i + 1 == self.curves.len() {
                let local = if len > 0.0 {
                    (remaining / len).clamp(0.0, 1.0)
                } else {
                    0.5
                };
                return (c.position(local), c.direction(local));
            }
            remaining -= len;
        }
        (Point::ZERO, Vec2::ZERO)
    }
}

/// Where an arc lies relative to the other region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Class {
    Outside,
    Inside,
    /// Along the other region's boundary, going the same way.
    SameEdge,
    /// Along the other region's boundary, going the opposite way.
    DiffEdge,
}

/// Cuts a ring into arcs at the split vertices.
///
/// If no curve starts at a split vertex, the whole ring is one arc.
pub(crate) fn partition(ring: &[Curve], splits: &BTreeSet<Vertex>) -> Vec<Vec<Curve>> {
    let is_split = |p: Point| splits.contains(&Vertex::from(p));
    let Some(first) = ring.iter().position(|c| is_split(c.start())) else {
        return if ring.is_empty() {
            Vec::new()
        } else {
            vec![ring.to_vec()]
        };
    };

    let mut arcs = Vec::new();
    let mut cur = Vec::new();
    for i in 0..ring.len() {
        let c = ring[(first + i) % ring.len()];
        cur.push(c);
        if is_split(c.end()) {
            arcs.push(std::mem::take(&mut cur));
        }
    }
    arcs
}

/// Classifies an arc by where its midpoint is.
pub(crate) fn classify(arc: &Arc, other: &Region, tol: &Tolerances) -> Class {
    let (mid, dir) = arc.position(0.5);
    match other.test_within(mid, tol.coincidence) {
        Location::Outside => Class::Outside,
        Location::Inside => Class::Inside,
        Location::Edge(hit) if hit.tangent.dot(dir) > 0.0 => Class::SameEdge,
        Location::Edge(_) => Class::DiffEdge,
    }
}

/// Does `op` keep an arc from `side` with class `class`?
///
/// Boundaries shared by both regions are only ever kept from `A`, so that
/// they don't get kept twice. For differences, `B`'s arcs have already been
/// reversed.
pub(crate) fn keeps(op: BinaryOp, side: Side, class: Class) -> bool {
    use Class::*;
    match (op, side) {
        (BinaryOp::Union, Side::A) => matches!(class, Outside | SameEdge),
        (BinaryOp::Union, Side::B) => class == Outside,
        (BinaryOp::Intersection, Side::A) => matches!(class, Inside | SameEdge),
        (BinaryOp::Intersection, Side::B) => class == Inside,
        (BinaryOp::Difference, Side::A) => matches!(class, Outside | DiffEdge),
        (BinaryOp::Difference, Side::B) => class == Inside,
    }
}

/// All the arcs of a boolean operation, and which of them are kept.
#[derive(Clone, Debug)]
pub(crate) struct Selection {
    pub arcs: ArcVec<Arc>,
    pub kept: ArcVec<bool>,
}

impl Selection {
    /// Cuts both sides of an overlay into arcs and classifies them.
    pub fn new(overlay: &Overlay, op: BinaryOp, tol: &Tolerances) -> Selection {
        let mut arcs = ArcVec::default();
        let mut kept = ArcVec::default();

        for side in [Side::A, Side::B] {
            let other = Region::new(
                overlay
                    .split_rings(side.other())
                    .iter()
                    .map(|r| Ring::assemble(r.clone())),
            );
            for ring in overlay.split_rings(side) {
                for curves in partition(ring, &overlay.split_vertices) {
                    let mut arc = Arc { curves, side };
                    if op == BinaryOp::Difference && side == Side::B {
                        arc = arc.reverse();
                    }
                    let class = classify(&arc, &other, tol);
                    tracing::trace!(?side, ?class, head = ?arc.head(), tail = ?arc.tail(), "classified arc");
                    kept.push(keeps(op, side, class));
                    arcs.push(arc);
                }
            }
        }

        tracing::debug!(
            arcs = arcs.len(),
            kept = kept.iter().filter(|(_, k)| **k).count(),
            "classified arcs"
        );
        Selection { arcs, kept }
    }

    /// The vertices touched by an odd number of kept arcs.
    pub fn odd_vertices(&self) -> BTreeSet<Vertex> {
        let mut odd = BTreeSet::new();
        for (i, arc) in self.arcs.iter() {
            if self.kept[i] {
                for v in [arc.head(), arc.tail()] {
                    if !odd.remove(&v) {
                        odd.insert(v);
                    }
                }
            }
        }
        odd
    }

    /// The indices of the kept arcs.
    pub fn kept_arcs(&self) -> impl Iterator<Item = ArcIdx> + '_ {
        self.arcs.indices().filter(|&i| self.kept[i])
    }
}

/// Makes every vertex have an even number of kept arcs.
///
/// Odd vertices are paired up greedily, closest pair first, where distance is
/// measured along arcs (kept or not, following their direction if possible).
/// Every arc on the path between a pair gets flipped between kept and not
/// kept, which fixes the parity of the two ends and leaves every other vertex
/// alone.
pub(crate) fn repair_parity(sel: &mut Selection) {
    let mut odd = sel.odd_vertices();
    if odd.is_empty() {
        return;
    }
    tracing::debug!(count = odd.len(), "repairing odd vertices");

    let graph = ArcGraph::new(
        sel.arcs
            .iter()
            .map(|(i, arc)| (i, arc.head(), arc.tail(), arc.length())),
    );

    let rounds = odd.len();
    for _ in 0..rounds {
        if odd.is_empty() {
            break;
        }
        let Some(path) = closest_pair(&graph, &odd, true).or_else(|| closest_pair(&graph, &odd, false))
        else {
            tracing::warn!(?odd, "odd vertices with no path between them");
            return;
        };
        for i in path {
            sel.kept[i] = !sel.kept[i];
            tracing::trace!(arc = ?i, kept = sel.kept[i], "toggled arc");
        }
        odd = sel.odd_vertices();
    }

    if !odd.is_empty() {
        tracing::warn!(?odd, "gave up repairing odd vertices");
    }
}

fn closest_pair(graph: &ArcGraph, odd: &BTreeSet<Vertex>, directed: bool) -> Option<Vec<ArcIdx>> {
    let mut best: Option<(f64, Vec<ArcIdx>)> = None;
    for &v in odd {
        if let Some((d, _, path)) = graph.shortest_path(v, odd, directed) {
            if best.as_ref().map_or(true, |(best_d, _)| d < *best_d) {
                best = Some((d, path));
            }
        }
    }
    best.map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use super::*;

    fn square_curves(x0: f64, y0: f64, size: f64) -> Vec<Curve> {
        Ring::rectangle(Rect::new(x0, y0, x0 + size, y0 + size))
            .unwrap()
            .curves()
            .to_vec()
    }

    fn arc(points: &[(f64, f64)], side: Side) -> Arc {
        Arc {
            curves: points.windows(2).map(|w| Curve::line(w[0], w[1])).collect(),
            side,
        }
    }

    #[test]
    fn partition_at_splits() {
        let ring = square_curves(0.0, 0.0, 1.0);
        let splits: BTreeSet<_> = [Vertex::new(1.0, 0.0), Vertex::new(0.0, 1.0)]
            .into_iter()
            .collect();
        let arcs = partition(&ring, &splits);
        assert_eq!(arcs.len(), 2);
        assert_eq!(arcs[0].len(), 2);
        assert_eq!(arcs[0][0].start(), Point::new(1.0, 0.0));
        assert_eq!(arcs[1].last().unwrap().end(), Point::new(1.0, 0.0));

        let whole = partition(&ring, &BTreeSet::new());
        assert_eq!(whole.len(), 1);
        assert_eq!(whole[0].len(), 4);
    }

    #[test]
    fn arc_midpoint() {
        let a = arc(&[(0.0, 0.0), (1.0, 0.0), (1.0, 3.0)], Side::A);
        assert_eq!(a.length(), 4.0);
        let (p, d) = a.position(0.5);
        assert!((p - Point::new(1.0, 1.0)).hypot() < 1e-12);
        assert!(d.x.abs() < 1e-12 && d.y > 0.0);

        let r = a.reverse();
        assert_eq!(r.head(), a.tail());
        assert_eq!(r.tail(), a.head());
        assert!((r.signed_area() + a.signed_area()).abs() < 1e-12);
    }

    #[test]
    fn classification() {
        let other = Region::from(Ring::square());
        let tol = Tolerances::default();
        let inside = arc(&[(0.25, 0.25), (0.75, 0.75)], Side::A);
        let outside = arc(&[(2.0, 0.0), (3.0, 0.0)], Side::A);
        let same = arc(&[(0.0, 0.0), (1.0, 0.0)], Side::A);
        let diff = same.reverse();
        assert_eq!(classify(&inside, &other, &tol), Class::Inside);
        assert_eq!(classify(&outside, &other, &tol), Class::Outside);
        assert_eq!(classify(&same, &other, &tol), Class::SameEdge);
        assert_eq!(classify(&diff, &other, &tol), Class::DiffEdge);
    }

    #[test]
    fn keep_rules() {
        use BinaryOp::*;
        assert!(keeps(Union, Side::A, Class::SameEdge));
        assert!(!keeps(Union, Side::B, Class::SameEdge));
        assert!(keeps(Intersection, Side::B, Class::Inside));
        assert!(!keeps(Intersection, Side::A, Class::DiffEdge));
        assert!(keeps(Difference, Side::A, Class::DiffEdge));
        assert!(!keeps(Difference, Side::B, Class::Outside));
    }

    #[test]
    fn parity_repair_flips_the_short_way() {
        // A square split into four arcs at its corners. One arc was wrongly
        // dropped, leaving its two ends odd.
        let pts = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let arcs: ArcVec<Arc> = (0..4)
            .map(|i| arc(&[pts[i], pts[(i + 1) % 4]], Side::A))
            .collect();
        let kept: ArcVec<bool> = [true, false, true, true].into_iter().collect();
        let mut sel = Selection { arcs, kept };
        assert_eq!(sel.odd_vertices().len(), 2);

        repair_parity(&mut sel);
        assert!(sel.odd_vertices().is_empty());
        assert_eq!(sel.kept_arcs().count(), 4);
    }

    #[test]
    fn parity_repair_goes_backwards_if_it_has_to() {
        // Two arcs into the same vertex: the only path between their other
        // ends runs against one of them.
        let arcs: ArcVec<Arc> = [
            arc(&[(0.0, 0.0), (1.0, 0.0)], Side::A),
            arc(&[(2.0, 0.0), (1.0, 0.0)], Side::B),
        ]
        .into_iter()
        .collect();
        let kept: ArcVec<bool> = [true, true].into_iter().collect();
        let mut sel = Selection { arcs, kept };
        assert_eq!(sel.odd_vertices().len(), 2);

        repair_parity(&mut sel);
        assert!(sel.odd_vertices().is_empty());
        assert_eq!(sel.kept_arcs().count(), 0);
    }
}
