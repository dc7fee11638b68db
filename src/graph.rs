//! A directed multigraph whose edges are arcs.
//!
//! Vertices are canonical points, numbered in sorted order so that every walk
//! over the graph visits them in the same order from run to run. Arcs with the
//! same endpoints (in the same direction) are grouped, keeping the order they
//! were added in.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::{classify::ArcIdx, geom::Vertex, num::CheapOrderedFloat};

typed_vec!(
    /// A vertex of an [`ArcGraph`].
    pub(crate) NodeIdx,
    NodeVec,
    "node"
);

#[derive(Clone, Copy, Debug)]
struct Link {
    to: NodeIdx,
    arc: ArcIdx,
    weight: f64,
}

/// Arcs, grouped by their endpoints.
#[derive(Clone, Debug)]
pub(crate) struct ArcGraph {
    nodes: NodeVec<Vertex>,
    index: BTreeMap<Vertex, NodeIdx>,
    groups: BTreeMap<(NodeIdx, NodeIdx), Vec<(ArcIdx, f64)>>,
    loops: Vec<ArcIdx>,
    // The lightest arc from each node to each of its successors, and to each
    // of its predecessors.
    out: NodeVec<Vec<Link>>,
    inc: NodeVec<Vec<Link>>,
}

impl ArcGraph {
    /// Builds a graph from `(arc, start, end, weight)` tuples.
    pub fn new(arcs: impl IntoIterator<Item = (ArcIdx, Vertex, Vertex, f64)>) -> ArcGraph {
        let arcs: Vec<_> = arcs.into_iter().collect();
        let vertices: BTreeSet<Vertex> = arcs.iter().flat_map(|&(_, s, e, _)| [s, e]).collect();
        let nodes: NodeVec<Vertex> = vertices.into_iter().collect();
        let index: BTreeMap<Vertex, NodeIdx> = nodes.iter().map(|(i, &v)| (v, i)).collect();

        let mut groups: BTreeMap<(NodeIdx, NodeIdx), Vec<(ArcIdx, f64)>> = BTreeMap::new();
        let mut loops = Vec::new();
        for &(arc, start, end, weight) in &arcs {
            let (u, v) = (index[&start], index[&end]);
            if u == v {
                loops.push(arc);
            } else {
                groups.entry((u, v)).or_default().push((arc, weight));
            }
        }

        let mut out: NodeVec<Vec<Link>> = nodes.indices().map(|_| Vec::new()).collect();
        let mut inc: NodeVec<Vec<Link>> = nodes.indices().map(|_| Vec::new()).collect();
        for (&(u, v), group) in &groups {
            let mut best = group[0];
            for &(arc, weight) in &group[1..] {
                if weight < best.1 {
                    best = (arc, weight);
                }
            }
            let (arc, weight) = best;
            out[u].push(Link { to: v, arc, weight });
            inc[v].push(Link { to: u, arc, weight });
        }

        ArcGraph {
            nodes,
            index,
            groups,
            loops,
            out,
            inc,
        }
    }

    /// Arcs that start and end at the same vertex.
    pub fn self_loops(&self) -> &[ArcIdx] {
        &self.loops
    }

    /// The arcs running from `u` to `v`, in the order they were added.
    pub fn parallel(&self, u: NodeIdx, v: NodeIdx) -> Vec<ArcIdx> {
        self.groups
            .get(&(u, v))
            .map(|g| g.iter().map(|&(arc, _)| arc).collect())
            .unwrap_or_default()
    }

    /// The shortest path from `from` to the nearest vertex in `targets`
    /// (other than `from` itself).
    ///
    /// Only the lightest arc between each pair of vertices is used. If
    /// `directed` is false, arcs may be walked backwards. Returns the length of
    /// the path, the target it reaches, and the arcs along it.
    pub fn shortest_path(
        &self,
        from: Vertex,
        targets: &BTreeSet<Vertex>,
        directed: bool,
    ) -> Option<(f64, Vertex, Vec<ArcIdx>)> {
        let &start = self.index.get(&from)?;
        let mut dist: NodeVec<f64> = self.nodes.indices().map(|_| f64::INFINITY).collect();
        let mut prev: NodeVec<Option<(NodeIdx, ArcIdx)>> =
            self.nodes.indices().map(|_| None).collect();
        let mut heap = BinaryHeap::new();
        dist[start] = 0.0;
        heap.push(Reverse((CheapOrderedFloat::from(0.0), start)));

        while let Some(Reverse((d, u))) = heap.pop() {
            let d = d.into_inner();
            if d > dist[u] {
                continue;
            }
            if u != start && targets.contains(&self.nodes[u]) {
                let mut path = Vec::new();
                let mut cur = u;
                while let Some((p, arc)) = prev[cur] {
                    path.push(arc);
                    cur = p;
                }
                path.reverse();
                return Some((d, self.nodes[u], path));
            }

            let backwards = if directed { &[][..] } else { &self.inc[u][..] };
            for link in self.out[u].iter().chain(backwards) {
                let nd = d + link.weight;
                if nd < dist[link.to] {
                    dist[link.to] = nd;
                    prev[link.to] = Some((u, link.arc));
                    heap.push(Reverse((CheapOrderedFloat::from(nd), link.to)));
                }
            }
        }
        None
    }

    /// The elementary cycles of the graph, ignoring self-loops, as lists of
    /// vertices.
    ///
    /// This is Johnson's algorithm: for each vertex `s` in order, it finds the
    /// cycles whose smallest vertex is `s`, searching only the strongly
    /// connected component of `s` among the vertices not smaller than it.
    /// Stops after finding `cap` cycles.
    pub fn elementary_cycles(&self, cap: usize) -> Vec<Vec<NodeIdx>> {
        let mut cycles = Vec::new();
        for s in self.nodes.indices() {
            let component = self.component(s);
            if component.iter().filter(|&&x| x).count() < 2 {
                continue;
            }
            let mut search = CycleSearch {
                graph: self,
                start: s,
                component,
                blocked: vec![false; self.nodes.len()],
                blocked_by: vec![BTreeSet::new(); self.nodes.len()],
                stack: Vec::new(),
                cycles: &mut cycles,
                cap,
            };
            search.circuit(s);
            if cycles.len() >= cap {
                tracing::warn!(cap, "too many cycles; ignoring the rest");
                break;
            }
        }
        cycles
    }

    /// The strongly connected component containing `s` in the subgraph of
    /// vertices at least `s`, as a membership mask.
    fn component(&self, s: NodeIdx) -> Vec<bool> {
        let forward = self.reachable(s, |u| &self.out[u][..]);
        let backward = self.reachable(s, |u| &self.inc[u][..]);
        forward.iter().zip(&backward).map(|(&f, &b)| f && b).collect()
    }

    fn reachable<'a>(&'a self, s: NodeIdx, links: impl Fn(NodeIdx) -> &'a [Link]) -> Vec<bool> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![s];
        seen[s.0] = true;
        while let Some(u) = stack.pop() {
            for link in links(u) {
                if link.to >= s && !seen[link.to.0] {
                    seen[link.to.0] = true;
                    stack.push(link.to);
                }
            }
        }
        seen
    }
}

struct CycleSearch<'a> {
    graph: &'a ArcGraph,
    start: NodeIdx,
    component: Vec<bool>,
    blocked: Vec<bool>,
    blocked_by: Vec<BTreeSet<usize>>,
    stack: Vec<NodeIdx>,
    cycles: &'a mut Vec<Vec<NodeIdx>>,
    cap: usize,
}

impl CycleSearch<'_> {
    fn circuit(&mut self, v: NodeIdx) -> bool {
        let graph = self.graph;
        let mut found = false;
        self.stack.push(v);
        self.blocked[v.0] = true;

        for link in &graph.out[v] {
            let w = link.to;
            if !self.component[w.0] {
                continue;
            }
            if w == self.start {
                self.cycles.push(self.stack.clone());
                found = true;
            } else if !self.blocked[w.0] && self.circuit(w) {
                found = true;
            }
            if self.cycles.len() >= self.cap {
                break;
            }
        }

        if found {
            self.unblock(v.0);
        } else {
            for link in &graph.out[v] {
                if self.component[link.to.0] {
                    self.blocked_by[link.to.0].insert(v.0);
                }
            }
        }
        self.stack.pop();
        found
    }

    fn unblock(&mut self, u: usize) {
        self.blocked[u] = false;
        for w in std::mem::take(&mut self.blocked_by[u]) {
            if self.blocked[w] {
                self.unblock(w);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64) -> Vertex {
        Vertex::new(x, 0.0)
    }

    fn graph(edges: &[(f64, f64, f64)]) -> ArcGraph {
        ArcGraph::new(
            edges
                .iter()
                .enumerate()
                .map(|(i, &(s, e, w))| (ArcIdx(i), v(s), v(e), w)),
        )
    }

    #[test]
    fn triangle_with_chord() {
        // 0 -> 1 -> 2 -> 0, plus 1 -> 0.
        let g = graph(&[(0.0, 1.0, 1.0), (1.0, 2.0, 1.0), (2.0, 0.0, 1.0), (1.0, 0.0, 1.0)]);
        let cycles = g.elementary_cycles(100);
        let as_usize: Vec<Vec<usize>> = cycles
            .iter()
            .map(|c| c.iter().map(|n| n.0).collect())
            .collect();
        assert_eq!(as_usize, vec![vec![0, 1], vec![0, 1, 2]]);
    }

    #[test]
    fn self_loops_are_separate() {
        let g = graph(&[(0.0, 0.0, 1.0), (0.0, 1.0, 1.0), (1.0, 0.0, 1.0)]);
        assert_eq!(g.self_loops(), &[ArcIdx(0)]);
        assert_eq!(g.elementary_cycles(100).len(), 1);
    }

    #[test]
    fn parallel_arcs_keep_their_order() {
        let g = graph(&[(0.0, 1.0, 3.0), (0.0, 1.0, 1.0), (1.0, 0.0, 1.0)]);
        assert_eq!(g.parallel(NodeIdx(0), NodeIdx(1)), vec![ArcIdx(0), ArcIdx(1)]);
        assert!(g.parallel(NodeIdx(1), NodeIdx(1)).is_empty());
        assert_eq!(g.elementary_cycles(100).len(), 1);
    }

    #[test]
    fn cycle_cap() {
        // Two disjoint 2-cycles.
        let g = graph(&[(0.0, 1.0, 1.0), (1.0, 0.0, 1.0), (2.0, 3.0, 1.0), (3.0, 2.0, 1.0)]);
        assert_eq!(g.elementary_cycles(100).len(), 2);
        assert_eq!(g.elementary_cycles(1).len(), 1);
    }

    #[test]
    fn shortest_paths() {
        // 0 -> 1 -> 2 is shorter than 0 -> 2, and the cheap parallel arc wins.
        let g = graph(&[
            (0.0, 2.0, 5.0),
            (0.0, 1.0, 3.0),
            (0.0, 1.0, 1.0),
            (1.0, 2.0, 1.0),
        ]);
        let targets: BTreeSet<_> = [v(0.0), v(2.0)].into_iter().collect();
        let (d, to, path) = g.shortest_path(v(0.0), &targets, true).unwrap();
        assert_eq!(d, 2.0);
        assert_eq!(to, v(2.0));
        assert_eq!(path, vec![ArcIdx(2), ArcIdx(3)]);

        // Nothing leaves 2, unless we can go backwards.
        assert!(g.shortest_path(v(2.0), &targets, true).is_none());
        let (d, to, path) = g.shortest_path(v(2.0), &targets, false).unwrap();
        assert_eq!(d, 2.0);
        assert_eq!(to, v(0.0));
        assert_eq!(path, vec![ArcIdx(3), ArcIdx(2)]);
    }
}
