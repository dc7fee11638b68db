//! Putting kept arcs back together into rings.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::{
    classify::{repair_parity, ArcIdx, ArcVec, Selection},
    curve::Curve,
    geom::Vertex,
    graph::{ArcGraph, NodeIdx},
    num::CheapOrderedFloat,
    overlay::Overlay,
    region::Region,
    ring::Ring,
    tolerance::Tolerances,
    topology::{cmp_cw_keys, cw_key},
    BinaryOp, Error,
};

/// Stop enumerating cycles after this many.
const MAX_CYCLES: usize = 1 << 14;

/// Stop expanding the parallel-arc choices of one cycle after this many.
const MAX_PERMUTATIONS: usize = 1 << 10;

/// Runs a boolean operation from start to finish.
pub(crate) fn boolean(a: &Region, b: &Region, op: BinaryOp, tol: Tolerances) -> Result<Region, Error> {
    let overlay = Overlay::new(a.rings(), b.rings(), tol)?;
    let mut selection = Selection::new(&overlay, op, &tol);
    repair_parity(&mut selection);
    Ok(reconstruct(&selection, &tol))
}

/// Assembles kept arcs into rings.
///
/// First, wherever a vertex has as many kept arcs coming in as going out,
/// each incoming arc is joined to the outgoing arc that turns furthest right
/// from it, which keeps the region on the left and stops rings that only touch
/// at a corner from running into each other. Joined arcs that close up are
/// rings already. The rest become chains between unbalanced vertices, and
/// every closed loop of chains is a candidate ring. Where several chains run
/// between the same two vertices, each choice among them makes a different
/// candidate. Candidates are taken biggest first (by the absolute value of
/// their area), skipping any that reuse an arc that's already been taken.
/// This is a heuristic: with many coincident arcs there may be better
/// choices.
pub(crate) fn reconstruct(sel: &Selection, tol: &Tolerances) -> Region {
    let (mut candidates, open) = join_arcs(sel);
    let closed = candidates.len();

    // Open chains are named after their first arc.
    let chains: BTreeMap<ArcIdx, Vec<ArcIdx>> = open.into_iter().map(|c| (c[0], c)).collect();
    let graph = ArcGraph::new(chains.iter().map(|(&first, chain)| {
        let head = sel.arcs[first].head();
        let tail = chain.last().map_or(head, |&i| sel.arcs[i].tail());
        let length = chain.iter().map(|&i| sel.arcs[i].length()).sum();
        (first, head, tail, length)
    }));
    let unchain = |names: &[ArcIdx]| -> Vec<ArcIdx> {
        names
            .iter()
            .flat_map(|name| chains.get(name).into_iter().flatten().copied())
            .collect()
    };

    candidates.extend(graph.self_loops().iter().map(|&l| unchain(&[l])));
    let cycles = graph.elementary_cycles(MAX_CYCLES);
    let mut expanded = Vec::new();
    for cycle in &cycles {
        expand(&graph, cycle, &mut expanded);
    }
    candidates.extend(expanded.iter().map(|names| unchain(names)));

    let mut scored: Vec<(f64, f64, Vec<ArcIdx>)> = candidates
        .into_iter()
        .map(|c| {
            let area: f64 = c.iter().map(|&i| sel.arcs[i].signed_area()).sum();
            let length: f64 = c.iter().map(|&i| sel.arcs[i].length()).sum();
            (area.abs(), length, c)
        })
        .collect();
    scored.sort_by_key(|(area, _, _)| std::cmp::Reverse(CheapOrderedFloat::from(*area)));

    let mut claimed: ArcVec<bool> = sel.arcs.indices().map(|_| false).collect();
    let mut rings = Vec::new();
    for (area, length, cand) in scored {
        // A ring whose average width is below the spatial tolerance is a
        // sliver.
        if area <= tol.spatial * length {
            tracing::trace!(area, length, "dropping sliver");
            continue;
        }
        if cand.iter().any(|&i| claimed[i]) {
            continue;
        }
        for &i in &cand {
            claimed[i] = true;
        }
        tracing::trace!(area, arcs = ?cand, "accepted cycle");
        let curves = cand
            .iter()
            .flat_map(|&i| sel.arcs[i].curves.iter().copied())
            .collect();
        rings.push(Ring::assemble(curves));
    }

    tracing::debug!(
        closed,
        chains = chains.len(),
        cycles = cycles.len(),
        rings = rings.len(),
        "reconstructed rings"
    );
    Region::new(rings)
}

/// Joins kept arcs end to start at every vertex where that's unambiguous.
///
/// Returns the joined runs that close up, and the ones that don't.
fn join_arcs(sel: &Selection) -> (Vec<Vec<ArcIdx>>, Vec<Vec<ArcIdx>>) {
    let mut at: BTreeMap<Vertex, (Vec<ArcIdx>, Vec<ArcIdx>)> = BTreeMap::new();
    for i in sel.kept_arcs() {
        at.entry(sel.arcs[i].tail()).or_default().0.push(i);
        at.entry(sel.arcs[i].head()).or_default().1.push(i);
    }

    let mut next: ArcVec<Option<ArcIdx>> = sel.arcs.indices().map(|_| None).collect();
    let mut joined: ArcVec<bool> = sel.arcs.indices().map(|_| false).collect();
    for (incoming, outgoing) in at.values() {
        if incoming.len() != outgoing.len() {
            continue;
        }
        let mut free = outgoing.clone();
        for &i in incoming {
            let Some(back) = sel.arcs[i].curves.last().map(Curve::reverse) else {
                continue;
            };
            let key = |o: &ArcIdx| {
                sel.arcs[*o]
                    .curves
                    .first()
                    .map_or((f64::INFINITY, 0.0), |c| cw_key(&back, c))
            };
            // The first outgoing arc clockwise from where we came in; ties go
            // to the earlier arc.
            let best = (0..free.len()).reduce(|best, j| {
                if cmp_cw_keys(key(&free[j]), key(&free[best])) == Ordering::Less {
                    j
                } else {
                    best
                }
            });
            if let Some(j) = best {
                let o = free.remove(j);
                next[i] = Some(o);
                joined[o] = true;
            }
        }
    }

    let mut seen: ArcVec<bool> = sel.arcs.indices().map(|_| false).collect();
    let mut closed = Vec::new();
    let mut open = Vec::new();
    let kept: Vec<ArcIdx> = sel.kept_arcs().collect();
    for &i in kept.iter().filter(|&&i| !joined[i]) {
        open.push(follow(i, &next, &mut seen).0);
    }
    for &i in &kept {
        if !seen[i] {
            match follow(i, &next, &mut seen) {
                (run, true) => closed.push(run),
                (run, false) => open.push(run),
            }
        }
    }
    (closed, open)
}

/// Walks joined arcs from `start`, and reports whether they came back to it.
fn follow(start: ArcIdx, next: &ArcVec<Option<ArcIdx>>, seen: &mut ArcVec<bool>) -> (Vec<ArcIdx>, bool) {
    let mut run = vec![start];
    seen[start] = true;
    let mut cur = start;
    while let Some(n) = next[cur] {
        if n == start {
            return (run, true);
        }
        if seen[n] {
            break;
        }
        seen[n] = true;
        run.push(n);
        cur = n;
    }
    (run, false)
}

/// Turns a cycle of vertices into cycles of arcs, one for each way of choosing
/// among parallel arcs.
fn expand(graph: &ArcGraph, cycle: &[NodeIdx], out: &mut Vec<Vec<ArcIdx>>) {
    let n = cycle.len();
    let groups: Vec<Vec<ArcIdx>> = (0..n)
        .map(|i| graph.parallel(cycle[i], cycle[(i + 1) % n]))
        .collect();
    if groups.iter().any(Vec::is_empty) {
        return;
    }

    let mut choice = vec![0usize; n];
    for count in 0.. {
        if count == MAX_PERMUTATIONS {
            tracing::warn!(cap = MAX_PERMUTATIONS, "too many parallel arc choices in a cycle");
            return;
        }
        out.push(choice.iter().zip(&groups).map(|(&c, g)| g[c]).collect());

        // Odometer-style increment, last group fastest.
        let mut i = n;
        loop {
            if i == 0 {
                return;
            }
            i -= 1;
            choice[i] += 1;
            if choice[i] < groups[i].len() {
                break;
            }
            choice[i] = 0;
        }
    }
}
