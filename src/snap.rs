//! Merging nearly-coincident points into canonical vertices.
//!
//! Whenever the overlay decides that two points are "the same" (because they
//! are the two halves of an intersection, or because two split parameters were
//! too close to tell apart) it unions them here. Afterwards every point maps to
//! one canonical representative, so that curves that are supposed to meet
//! really do share an endpoint.

use std::collections::HashMap;

use crate::geom::Vertex;

/// A union-find over points, with path compression and union by rank.
///
/// The representative of each class is its smallest member (in `x`-then-`y`
/// order), which makes the result independent of the order of the unions.
#[derive(Clone, Debug, Default)]
pub struct PointSnap {
    index: HashMap<Vertex, usize>,
    points: Vec<Vertex>,
    parent: Vec<usize>,
    rank: Vec<u8>,
    // Only meaningful at roots: the smallest point in the class.
    least: Vec<Vertex>,
}

impl PointSnap {
    /// Creates an empty union-find.
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, p: Vertex) -> usize {
        if let Some(&i) = self.index.get(&p) {
            return i;
        }
        let i = self.points.len();
        self.index.insert(p, i);
        self.points.push(p);
        self.parent.push(i);
        self.rank.push(0);
        self.least.push(p);
        i
    }

    fn root(&mut self, mut i: usize) -> usize {
        let mut r = i;
        while self.parent[r] != r {
            r = self.parent[r];
        }
        while self.parent[i] != r {
            let next = self.parent[i];
            self.parent[i] = r;
            i = next;
        }
        r
    }

    /// Declares two points to be the same vertex.
    pub fn union(&mut self, a: impl Into<Vertex>, b: impl Into<Vertex>) {
        let a = self.intern(a.into());
        let b = self.intern(b.into());
        let ra = self.root(a);
        let rb = self.root(b);
        if ra == rb {
            return;
        }

        let least = self.least[ra].min(self.least[rb]);
        let root = match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => {
                self.parent[ra] = rb;
                rb
            }
            std::cmp::Ordering::Greater => {
                self.parent[rb] = ra;
                ra
            }
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
                ra
            }
        };
        self.least[root] = least;
    }

    /// The canonical vertex for a point.
    ///
    /// Points that were never unioned with anything are their own canonical
    /// vertex.
    pub fn find(&mut self, p: impl Into<Vertex>) -> Vertex {
        let p = p.into();
        match self.index.get(&p) {
            Some(&i) => {
                let r = self.root(i);
                self.least[r]
            }
            None => p,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smallest_point_wins() {
        let mut snap = PointSnap::new();
        snap.union((2.0, 0.0), (1.0, 5.0));
        snap.union((3.0, 3.0), (2.0, 0.0));
        for p in [(2.0, 0.0), (1.0, 5.0), (3.0, 3.0)] {
            assert_eq!(snap.find(p), Vertex::new(1.0, 5.0));
        }
        assert_eq!(snap.find((7.0, 7.0)), Vertex::new(7.0, 7.0));
    }

    #[test]
    fn order_independent() {
        let pairs = [
            ((0.5, 0.5), (0.5, 0.500001)),
            ((0.1, 0.0), (0.0, 0.1)),
            ((0.5, 0.500001), (0.0, 0.1)),
        ];
        let mut fwd = PointSnap::new();
        for (a, b) in pairs {
            fwd.union(a, b);
        }
        let mut rev = PointSnap::new();
        for (a, b) in pairs.iter().rev() {
            rev.union(*b, *a);
        }
        for (a, b) in pairs {
            assert_eq!(fwd.find(a), rev.find(a));
            assert_eq!(fwd.find(b), rev.find(b));
        }
        assert_eq!(fwd.find((0.5, 0.5)), Vertex::new(0.0, 0.1));
    }
}
