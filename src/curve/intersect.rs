//! Finding the places where two curves meet.
//!
//! We bisect both curves, throwing away pairs of pieces whose bounding boxes
//! don't touch, until the pieces are flat enough to be compared as line
//! segments. The hits get polished with a few Newton steps and then
//! coalesced, because a single crossing (and especially a tangency) is
//! usually found by several neighboring pairs of pieces.
//!
//! Curves that run along each other are detected up front, since bisection
//! would never finish on them.

use arrayvec::ArrayVec;
use kurbo::{Point, Rect};

use super::Curve;
use crate::{num::CheapOrderedFloat, tolerance::Tolerances};

/// Bisection depth at which we stop and compare chords regardless of flatness.
const MAX_DEPTH: u32 = 52;

/// Upper bound on the number of pairs of pieces we'll ever look at for one
/// pair of curves.
const MAX_VISITS: usize = 1 << 16;

const NEWTON_STEPS: usize = 8;

pub(super) fn intersections(a: &Curve, b: &Curve, tol: &Tolerances) -> Vec<(f64, f64)> {
    if !boxes_touch(a.bounding_box(), b.bounding_box(), tol.coincidence) {
        return Vec::new();
    }

    if let Some(hits) = overlap(a, b, tol) {
        return hits;
    }

    let mut raw = Vec::new();
    let mut visits = 0;
    intersect_rec(a, b, (0.0, 1.0), (0.0, 1.0), 0, tol, &mut visits, &mut raw);
    if visits >= MAX_VISITS {
        tracing::warn!(?a, ?b, "gave up refining curve intersections");
    }

    let hits = raw
        .into_iter()
        .map(|(ta, tb)| refine(a, b, ta, tb, tol))
        .map(|(ta, tb)| (snap(a, ta, tol), snap(b, tb, tol)))
        .collect();
    coalesce(a, b, hits, tol)
}

fn boxes_touch(r0: Rect, r1: Rect, eps: f64) -> bool {
    r0.min_x() <= r1.max_x() + eps
        && r1.min_x() <= r0.max_x() + eps
        && r0.min_y() <= r1.max_y() + eps
        && r1.min_y() <= r0.max_y() + eps
}

fn lerp((t0, t1): (f64, f64), s: f64) -> f64 {
    t0 + (t1 - t0) * s
}

#[allow(clippy::too_many_arguments)]
fn intersect_rec(
    a: &Curve,
    b: &Curve,
    range_a: (f64, f64),
    range_b: (f64, f64),
    depth: u32,
    tol: &Tolerances,
    visits: &mut usize,
    out: &mut Vec<(f64, f64)>,
) {
    *visits += 1;
    let sub_a = a.subsegment(range_a.0..range_a.1);
    let sub_b = b.subsegment(range_b.0..range_b.1);
    if !boxes_touch(sub_a.bounding_box(), sub_b.bounding_box(), tol.spatial) {
        return;
    }

    let flat_a = sub_a.is_flat(tol.spatial);
    let flat_b = sub_b.is_flat(tol.spatial);
    if (flat_a && flat_b) || depth >= MAX_DEPTH || *visits >= MAX_VISITS {
        // Each piece is within `spatial` of its chord, so chords that come
        // within three times that might belong to curves that touch.
        if let Some((s, u)) = chord_hit(
            sub_a.start(),
            sub_a.end(),
            sub_b.start(),
            sub_b.end(),
            3.0 * tol.spatial,
        ) {
            out.push((lerp(range_a, s), lerp(range_b, u)));
        }
        return;
    }

    let halves = |flat: bool, (t0, t1): (f64, f64)| -> ArrayVec<(f64, f64), 2> {
        let mut ret = ArrayVec::new();
        if flat {
            ret.push((t0, t1));
        } else {
            let mid = 0.5 * (t0 + t1);
            ret.push((t0, mid));
            ret.push((mid, t1));
        }
        ret
    };

    for ra in halves(flat_a, range_a) {
        for rb in halves(flat_b, range_b) {
            intersect_rec(a, b, ra, rb, depth + 1, tol, visits, out);
        }
    }
}

/// Intersects the segments `p0 p1` and `q0 q1`, returning the parameters along
/// each.
///
/// Segments that don't properly cross but come within `eps` of one another
/// (which is what tangencies look like after flattening) report their point of
/// closest approach.
fn chord_hit(p0: Point, p1: Point, q0: Point, q1: Point, eps: f64) -> Option<(f64, f64)> {
    let d1 = p1 - p0;
    let d2 = q1 - q0;
    let l1 = d1.hypot();
    let l2 = d2.hypot();
    let w = q0 - p0;
    let denom = d1.cross(d2);

    if l1 > 0.0 && l2 > 0.0 && denom.abs() > 1e-12 * l1 * l2 {
        let s = w.cross(d2) / denom;
        let u = w.cross(d1) / denom;
        let slack_s = eps / l1;
        let slack_u = eps / l2;
        if (-slack_s..=1.0 + slack_s).contains(&s) && (-slack_u..=1.0 + slack_u).contains(&u) {
            return Some((s.clamp(0.0, 1.0), u.clamp(0.0, 1.0)));
        }
    }

    // Closest approach between two segments is always attained at an endpoint
    // of one of them (unless they cross, which we ruled out above).
    let project = |x: Point, origin: Point, dir: kurbo::Vec2, len: f64| -> (f64, f64) {
        if len == 0.0 {
            return (0.0, (x - origin).hypot());
        }
        let t = ((x - origin).dot(dir) / (len * len)).clamp(0.0, 1.0);
        (t, (x - (origin + dir * t)).hypot())
    };

    let mut best: Option<(f64, f64, f64)> = None;
    let mut consider = |s: f64, u: f64, dist: f64| {
        if dist <= eps && best.map_or(true, |(_, _, d)| dist < d) {
            best = Some((s, u, dist));
        }
    };

    let (u, d) = project(p0, q0, d2, l2);
    consider(0.0, u, d);
    let (u, d) = project(p1, q0, d2, l2);
    consider(1.0, u, d);
    let (s, d) = project(q0, p0, d1, l1);
    consider(s, 0.0, d);
    let (s, d) = project(q1, p0, d1, l1);
    consider(s, 1.0, d);

    best.map(|(s, u, _)| (s, u))
}

/// Polishes an approximate intersection with Newton's method.
///
/// Tangencies make the Jacobian singular; then we just keep what we had.
fn refine(a: &Curve, b: &Curve, ta: f64, tb: f64, tol: &Tolerances) -> (f64, f64) {
    let dist = |s: f64, u: f64| (a.position(s) - b.position(u)).hypot();

    let mut best = (ta, tb, dist(ta, tb));
    let (mut s, mut u) = (ta, tb);
    for _ in 0..NEWTON_STEPS {
        if best.2 <= tol.spatial * 1e-3 {
            break;
        }
        let f = a.position(s) - b.position(u);
        let da = a.direction(s);
        let db = -b.direction(u);
        let det = da.cross(db);
        if det.abs() <= 1e-9 * da.hypot() * db.hypot() {
            break;
        }
        let ds = (-f).cross(db) / det;
        let du = da.cross(-f) / det;
        s = (s + ds).clamp(0.0, 1.0);
        u = (u + du).clamp(0.0, 1.0);

        // Don't let Newton wander off to some other intersection.
        if (s - ta).abs() > 1e-3 || (u - tb).abs() > 1e-3 {
            break;
        }
        let d = dist(s, u);
        if d < best.2 {
            best = (s, u, d);
        }
    }
    (best.0, best.1)
}

fn snap(c: &Curve, t: f64, tol: &Tolerances) -> f64 {
    if t <= tol.parametric || (c.position(t) - c.start()).hypot() <= tol.spatial {
        0.0
    } else if t >= 1.0 - tol.parametric || (c.position(t) - c.end()).hypot() <= tol.spatial {
        1.0
    } else {
        t
    }
}

fn is_endpoint_hit((ta, tb): (f64, f64)) -> bool {
    ta == 0.0 || ta == 1.0 || tb == 0.0 || tb == 1.0
}

/// Merges hits that describe the same place.
///
/// Two hits are the same if their parameters agree to within the parametric
/// tolerance, or if the curves never separate by more than the coincidence
/// tolerance between them. The second rule swallows the little clusters that
/// tangencies produce.
fn coalesce(a: &Curve, b: &Curve, mut hits: Vec<(f64, f64)>, tol: &Tolerances) -> Vec<(f64, f64)> {
    hits.sort_by_key(|&(ta, tb)| (CheapOrderedFloat::from(ta), CheapOrderedFloat::from(tb)));

    let gap = |(ta, tb): (f64, f64)| (a.position(ta) - b.position(tb)).hypot();
    let same_place = |h0: (f64, f64), h1: (f64, f64)| {
        if (h1.0 - h0.0).abs() <= tol.parametric && (h1.1 - h0.1).abs() <= tol.parametric {
            return true;
        }
        let mid = (0.5 * (h0.0 + h1.0), 0.5 * (h0.1 + h1.1));
        gap(mid) <= tol.coincidence
            && (a.position(h0.0) - a.position(h1.0)).hypot() <= tol.coincidence.sqrt()
    };

    let mut ret: Vec<(f64, f64)> = Vec::with_capacity(hits.len());
    for hit in hits {
        match ret.last_mut() {
            Some(last) if same_place(*last, hit) => {
                // Prefer hits at endpoints, since those are exact. Otherwise
                // keep whichever is closer to being a real intersection.
                let better = match (is_endpoint_hit(*last), is_endpoint_hit(hit)) {
                    (true, _) => false,
                    (false, true) => true,
                    (false, false) => gap(hit) < gap(*last),
                };
                if better {
                    *last = hit;
                }
            }
            _ => ret.push(hit),
        }
    }
    ret
}

/// Detects curves that run along each other for a while.
///
/// The ends of a shared stretch are always endpoints of one of the two
/// curves, so we look for endpoints of each curve lying on the other and check
/// that the curves stay together between them. If they do, the endpoint hits
/// are all the intersections we report.
fn overlap(a: &Curve, b: &Curve, tol: &Tolerances) -> Option<Vec<(f64, f64)>> {
    let mut hits: ArrayVec<(f64, f64), 4> = ArrayVec::new();
    for ta in [0.0, 1.0] {
        let (tb, d) = b.nearest(a.position(ta), tol.spatial);
        if d <= tol.coincidence {
            hits.push((ta, snap(b, tb, tol)));
        }
    }
    for tb in [0.0, 1.0] {
        let (ta, d) = a.nearest(b.position(tb), tol.spatial);
        if d <= tol.coincidence {
            hits.push((snap(a, ta, tol), tb));
        }
    }
    if hits.len() < 2 {
        return None;
    }

    hits.sort_by_key(|&(ta, tb)| (CheapOrderedFloat::from(ta), CheapOrderedFloat::from(tb)));
    let mut shared = false;
    for w in hits.windows(2) {
        let (h0, h1) = (w[0], w[1]);
        if h1.0 - h0.0 <= tol.parametric {
            continue;
        }
        let together = [0.25, 0.5, 0.75].iter().all(|&s| {
            let p = a.position(h0.0 + (h1.0 - h0.0) * s);
            b.nearest(p, tol.spatial).1 <= tol.coincidence
        });
        if together {
            shared = true;
            break;
        }
    }
    if !shared {
        return None;
    }

    let mut ret: Vec<(f64, f64)> = Vec::with_capacity(hits.len());
    for hit in hits {
        let dup = ret.iter().any(|h| {
            (h.0 - hit.0).abs() <= tol.parametric && (h.1 - hit.1).abs() <= tol.parametric
        });
        if !dup {
            ret.push(hit);
        }
    }
    Some(ret)
}
