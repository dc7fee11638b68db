//! A half-edge representation of the planar subdivision made by two regions.
//!
//! Every curve is stored as a pair of twinned half-edges, one for each
//! direction of travel. Following `next` pointers walks around a face with the
//! face on the left; following `twin` and then `next` rotates clockwise around
//! a vertex. Each half-edge carries [`Flags`] saying which side (inside or
//! outside) of which input region lies to its left, and a face's flags are
//! the union of the flags of the half-edges around it.
//!
//! Half-edges live in a [`slotmap`] arena, so handles to removed half-edges
//! go stale instead of silently pointing at something else.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

use slotmap::{new_key_type, SecondaryMap, SlotMap};

use crate::{curve::Curve, geom::Vertex, ring::Ring, tolerance::Tolerances, Error};

new_key_type! {
    /// A handle to a half-edge in an [`EdgeList`].
    pub struct HalfEdgeKey;
}

/// Which side of which input region lies to the left of a half-edge (or
/// inside a face).
///
/// This is a bit set; coincident curves from both regions end up carrying
/// several bits at once.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct Flags(u8);

impl Flags {
    /// No flags at all.
    pub const NONE: Flags = Flags(0);
    /// Outside the first region.
    pub const OUT_A: Flags = Flags(1);
    /// Inside the first region.
    pub const IN_A: Flags = Flags(2);
    /// Outside the second region.
    pub const OUT_B: Flags = Flags(4);
    /// Inside the second region.
    pub const IN_B: Flags = Flags(8);

    /// Are all of `other`'s flags set in `self`?
    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// The raw bits.
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

impl std::fmt::Debug for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = [
            (Flags::OUT_A, "out_a"),
            (Flags::IN_A, "in_a"),
            (Flags::OUT_B, "out_b"),
            (Flags::IN_B, "in_b"),
        ];
        let set: Vec<_> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "[{}]", set.join("|"))
    }
}

/// One direction of travel along a curve.
#[derive(Clone, Debug)]
pub struct HalfEdge {
    /// The curve, oriented in this half-edge's direction of travel.
    pub curve: Curve,
    /// The same curve, traveling the other way.
    pub twin: HalfEdgeKey,
    /// The next half-edge around our face.
    pub next: HalfEdgeKey,
    /// The previous half-edge around our face.
    pub prev: HalfEdgeKey,
    /// What lies to our left.
    pub flag: Flags,
}

impl HalfEdge {
    /// The vertex this half-edge leaves from.
    pub fn origin(&self) -> Vertex {
        self.curve.start().into()
    }

    /// The vertex this half-edge arrives at.
    pub fn destination(&self) -> Vertex {
        self.curve.end().into()
    }
}

#[derive(Clone, Debug)]
struct Face {
    edges: Vec<HalfEdgeKey>,
    flag: Flags,
}

/// A doubly-connected edge list.
///
/// Face cycles are computed lazily: mutations mark the faces they disturb as
/// stale, and the next query re-walks only those.
#[derive(Clone, Debug)]
pub struct EdgeList {
    edges: SlotMap<HalfEdgeKey, HalfEdge>,
    // One outgoing half-edge per vertex.
    vertices: BTreeMap<Vertex, HalfEdgeKey>,
    // Faces, keyed by the half-edge their walk started from.
    faces: BTreeMap<HalfEdgeKey, Face>,
    face_of: SecondaryMap<HalfEdgeKey, HalfEdgeKey>,
    stale_faces: BTreeSet<HalfEdgeKey>,
    dirty: BTreeSet<HalfEdgeKey>,
    tol: Tolerances,
}

/// Tangent directions closer than this (in radians) are considered tied.
const ANGLE_EPS: f64 = 1e-9;

fn bearing(c: &Curve) -> f64 {
    let d = c.direction(0.0);
    d.y.atan2(d.x).rem_euclid(TAU)
}

/// How sharply a curve turns left as it leaves its start point.
///
/// This is the signed curvature at the start, unless the curve starts with a
/// degenerate derivative, in which case we use the side of the tangent line
/// that the curve's midpoint is on.
fn bend(c: &Curve) -> f64 {
    let pts = c.control_points();
    if pts.len() == 2 {
        return 0.0;
    }
    let second_diff = (pts[2] - pts[1]) - (pts[1] - pts[0]);
    let (d1, d2) = if pts.len() == 3 {
        ((pts[1] - pts[0]) * 2.0, second_diff * 2.0)
    } else {
        ((pts[1] - pts[0]) * 3.0, second_diff * 6.0)
    };
    let len = d1.hypot();
    if len > 1e-12 {
        d1.cross(d2) / (len * len * len)
    } else {
        let d = c.direction(0.0).normalize();
        let chord = c.position(0.5) - c.start();
        if chord.hypot() == 0.0 {
            0.0
        } else {
            d.cross(chord.normalize())
        }
    }
}

/// A sort key for the clockwise rotation from `base` to `other`, both leaving
/// the same vertex.
///
/// Curves with tied tangents are ordered by how much they bend, left-bending
/// ones first. Ties with `base` itself split around it: one that bends right
/// of `base` comes immediately after it, one that bends left comes at the
/// very end of the rotation. Compare keys with [`cmp_cw_keys`].
pub(crate) fn cw_key(base: &Curve, other: &Curve) -> (f64, f64) {
    let raw = (bearing(base) - bearing(other)).rem_euclid(TAU);
    let b = bend(other);
    if raw < ANGLE_EPS || raw > TAU - ANGLE_EPS {
        if b < bend(base) {
            (0.0, -b)
        } else {
            (TAU, -b)
        }
    } else {
        (raw, -b)
    }
}

/// Orders two [`cw_key`]s. Angles within [`ANGLE_EPS`] of each other count as
/// the same tangent, and fall back on curvature.
pub(crate) fn cmp_cw_keys(a: (f64, f64), b: (f64, f64)) -> Ordering {
    let by = |x: f64, y: f64| x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    if (a.0 - b.0).abs() <= ANGLE_EPS {
        by(a.1, b.1)
    } else {
        by(a.0, b.0)
    }
}

impl EdgeList {
    /// Creates an empty edge list.
    pub fn new(tol: Tolerances) -> Self {
        EdgeList {
            edges: SlotMap::with_key(),
            vertices: BTreeMap::new(),
            faces: BTreeMap::new(),
            face_of: SecondaryMap::new(),
            stale_faces: BTreeSet::new(),
            dirty: BTreeSet::new(),
            tol,
        }
    }

    /// The number of half-edges (twice the number of curves).
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Are there no edges at all?
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Looks up a half-edge.
    ///
    /// Returns `None` if it has been removed.
    pub fn half_edge(&self, key: HalfEdgeKey) -> Option<&HalfEdge> {
        self.edges.get(key)
    }

    /// All the vertices, in sorted order.
    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.vertices.keys().copied()
    }

    /// The half-edges leaving `v`, in clockwise order.
    pub fn outgoing(&self, v: Vertex) -> Vec<HalfEdgeKey> {
        let mut ret = Vec::new();
        let Some(&first) = self.vertices.get(&v) else {
            return ret;
        };
        let mut e = first;
        loop {
            ret.push(e);
            e = self.edges[self.edges[e].twin].next;
            if e == first || ret.len() > self.edges.len() {
                break;
            }
        }
        ret
    }

    /// The number of curves meeting at `v`.
    pub fn degree(&self, v: Vertex) -> usize {
        self.outgoing(v).len()
    }

    fn touch(&mut self, h: HalfEdgeKey) {
        if let Some(&rep) = self.face_of.get(h) {
            self.stale_faces.insert(rep);
        }
        self.dirty.insert(h);
    }

    fn link(&mut self, a: HalfEdgeKey, b: HalfEdgeKey) {
        self.edges[a].next = b;
        self.edges[b].prev = a;
        self.touch(a);
        self.touch(b);
    }

    fn same_curve(&self, a: &Curve, b: &Curve) -> bool {
        let da = a.direction(0.0).normalize();
        let db = b.direction(0.0).normalize();
        if da.dot(db) <= 0.0 || da.cross(db).abs() > self.tol.coincidence {
            return false;
        }
        [0.25, 0.5, 0.75]
            .iter()
            .all(|&t| b.nearest(a.position(t), self.tol.spatial).1 <= self.tol.coincidence)
    }

    fn find_coincident(&self, curve: &Curve) -> Option<HalfEdgeKey> {
        let end = Vertex::from(curve.end());
        if !self.vertices.contains_key(&end) {
            return None;
        }
        self.outgoing(curve.start().into()).into_iter().find(|&e| {
            let other = &self.edges[e].curve;
            Vertex::from(other.end()) == end && self.same_curve(other, curve)
        })
    }

    /// Inserts a curve, returning the half-edge that runs along it.
    ///
    /// `left` and `right` say what lies on either side of the curve. If the
    /// curve coincides with one that's already here (in either direction),
    /// no new edge is made; the flags are merged into the existing one.
    pub fn add(&mut self, curve: Curve, left: Flags, right: Flags) -> Result<HalfEdgeKey, Error> {
        let v0 = Vertex::from(curve.start());
        let v1 = Vertex::from(curve.end());
        if v0 == v1 {
            return Err(Error::Topology {
                vertex: curve.start(),
                reason: "curve starts and ends at the same vertex",
            });
        }

        if let Some(e) = self.find_coincident(&curve) {
            let twin = self.edges[e].twin;
            self.edges[e].flag |= left;
            self.edges[twin].flag |= right;
            self.touch(e);
            self.touch(twin);
            return Ok(e);
        }

        let placeholder = HalfEdgeKey::default();
        let a = self.edges.insert(HalfEdge {
            curve,
            twin: placeholder,
            next: placeholder,
            prev: placeholder,
            flag: left,
        });
        let b = self.edges.insert(HalfEdge {
            curve: curve.reverse(),
            twin: a,
            next: a,
            prev: a,
            flag: right,
        });
        self.edges[a].twin = b;
        self.edges[a].next = b;
        self.edges[a].prev = b;
        self.touch(a);
        self.touch(b);

        self.splice(a, v0)?;
        self.splice(b, v1)?;
        Ok(a)
    }

    /// Hooks the half-edge `x` (which leaves `v`, and whose twin currently
    /// turns straight around into it) into the rotation around `v`.
    fn splice(&mut self, x: HalfEdgeKey, v: Vertex) -> Result<(), Error> {
        let Some(&first) = self.vertices.get(&v) else {
            self.vertices.insert(v, x);
            return Ok(());
        };

        let x_curve = self.edges[x].curve;
        let mut e = first;
        for _ in 0..=self.edges.len() {
            let e_cw = self.edges[self.edges[e].twin].next;
            let fits = e == e_cw || {
                let base = &self.edges[e].curve;
                cmp_cw_keys(cw_key(base, &x_curve), cw_key(base, &self.edges[e_cw].curve))
                    != Ordering::Greater
            };
            if fits {
                let into_v = self.edges[e].twin;
                let x_twin = self.edges[x].twin;
                self.link(into_v, x);
                self.link(x_twin, e_cw);
                return Ok(());
            }
            e = e_cw;
            if e == first {
                break;
            }
        }

        Err(Error::Topology {
            vertex: v.to_kurbo(),
            reason: "no angular slot for a new edge",
        })
    }

    /// Splits a half-edge (and its twin) at parameter `t`, returning the
    /// half-edge that starts at the new vertex.
    ///
    /// Parameters within the parametric tolerance of either end don't split
    /// anything: they return `h` itself, or the half-edge after it.
    pub fn split(&mut self, h: HalfEdgeKey, t: f64) -> HalfEdgeKey {
        if t <= self.tol.parametric {
            return h;
        }
        if t >= 1.0 - self.tol.parametric {
            return self.edges[h].next;
        }

        let tw = self.edges[h].twin;
        let (first, second) = self.edges[h].curve.split(t);
        let h_next = self.edges[h].next;
        let tw_next = self.edges[tw].next;
        let h_flag = self.edges[h].flag;
        let tw_flag = self.edges[tw].flag;

        let placeholder = HalfEdgeKey::default();
        let h2 = self.edges.insert(HalfEdge {
            curve: second,
            twin: tw,
            next: placeholder,
            prev: h,
            flag: h_flag,
        });
        let tw2 = self.edges.insert(HalfEdge {
            curve: first.reverse(),
            twin: h,
            next: placeholder,
            prev: tw,
            flag: tw_flag,
        });
        self.edges[h].curve = first;
        self.edges[h].twin = tw2;
        self.edges[tw].curve = second.reverse();
        self.edges[tw].twin = h2;

        // If an end was dangling, the turnaround now happens on the new half.
        self.link(h2, h_next);
        self.link(h, h2);
        self.link(tw2, tw_next);
        self.link(tw, tw2);

        self.vertices.insert(first.end().into(), h2);
        h2
    }

    /// Removes a curve (both of its half-edges).
    ///
    /// Vertices left with nothing attached are forgotten.
    pub fn remove(&mut self, h: HalfEdgeKey) {
        let tw = self.edges[h].twin;
        let v0 = self.edges[h].origin();
        let v1 = self.edges[tw].origin();
        let h_prev = self.edges[h].prev;
        let h_next = self.edges[h].next;
        let tw_prev = self.edges[tw].prev;
        let tw_next = self.edges[tw].next;
        self.touch(h);
        self.touch(tw);

        if tw_next == h {
            self.vertices.remove(&v0);
        } else {
            self.link(h_prev, tw_next);
            if self.vertices.get(&v0) == Some(&h) {
                self.vertices.insert(v0, tw_next);
            }
        }
        if h_next == tw {
            self.vertices.remove(&v1);
        } else {
            self.link(tw_prev, h_next);
            if self.vertices.get(&v1) == Some(&tw) {
                self.vertices.insert(v1, h_next);
            }
        }

        for k in [h, tw] {
            self.edges.remove(k);
            self.face_of.remove(k);
            self.dirty.remove(&k);
        }
    }

    fn refresh_faces(&mut self) -> Result<(), Error> {
        for rep in std::mem::take(&mut self.stale_faces) {
            if let Some(face) = self.faces.remove(&rep) {
                for h in face.edges {
                    self.face_of.remove(h);
                    if self.edges.contains_key(h) {
                        self.dirty.insert(h);
                    }
                }
            }
        }

        for h in std::mem::take(&mut self.dirty) {
            if !self.edges.contains_key(h) || self.face_of.contains_key(h) {
                continue;
            }

            let mut edges = Vec::new();
            let mut flag = Flags::NONE;
            let mut cur = h;
            loop {
                edges.push(cur);
                flag |= self.edges[cur].flag;
                cur = self.edges[cur].next;
                if cur == h {
                    break;
                }
                if edges.len() > self.edges.len() {
                    return Err(Error::Topology {
                        vertex: self.edges[h].curve.start(),
                        reason: "face cycle does not close",
                    });
                }
            }
            for &e in &edges {
                self.face_of.insert(e, h);
            }
            self.faces.insert(h, Face { edges, flag });
        }
        Ok(())
    }

    /// One representative half-edge for each face.
    pub fn faces(&mut self) -> Result<Vec<HalfEdgeKey>, Error> {
        self.refresh_faces()?;
        Ok(self.faces.keys().copied().collect())
    }

    /// The flags of the face to the left of `h`.
    pub fn face_flag(&mut self, h: HalfEdgeKey) -> Result<Flags, Error> {
        self.refresh_faces()?;
        Ok(self
            .face_of
            .get(h)
            .and_then(|rep| self.faces.get(rep))
            .map_or(Flags::NONE, |face| face.flag))
    }

    /// The boundary rings of every face whose flags satisfy `predicate`.
    ///
    /// Each ring has its face on the left, so bounded faces come out
    /// counter-clockwise and the unbounded face comes out clockwise.
    pub fn boundaries(&mut self, predicate: impl Fn(Flags) -> bool) -> Result<Vec<Ring>, Error> {
        self.refresh_faces()?;
        Ok(self
            .faces
            .values()
            .filter(|face| predicate(face.flag))
            .map(|face| Ring::assemble(face.edges.iter().map(|&e| self.edges[e].curve).collect()))
            .collect())
    }

    /// Every face's boundary ring along with its flags.
    pub fn face_rings(&mut self) -> Result<Vec<(Ring, Flags)>, Error> {
        self.refresh_faces()?;
        Ok(self
            .faces
            .values()
            .map(|face| {
                let curves = face.edges.iter().map(|&e| self.edges[e].curve).collect();
                (Ring::assemble(curves), face.flag)
            })
            .collect())
    }
}
