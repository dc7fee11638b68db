//! Totally-ordered points, used as vertex identities.

use crate::num::CheapOrderedFloat;

/// A two-dimensional point that can be compared, sorted and hashed.
///
/// Vertices are sorted by `x` and then by `y`, matching the direction of the
/// overlay sweep. Two vertices are the same vertex exactly when their
/// coordinates are equal; all the fuzziness is dealt with before points get
/// turned into vertices.
#[derive(Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vertex {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Vertex {
    /// Create a new vertex.
    pub fn new(x: f64, y: f64) -> Self {
        debug_assert!(x.is_finite());
        debug_assert!(y.is_finite());
        // Adding zero turns -0.0 into 0.0, which keeps `Hash` consistent with `Eq`.
        Vertex {
            x: x + 0.0,
            y: y + 0.0,
        }
    }

    /// Converts back into a `kurbo` point.
    pub fn to_kurbo(self) -> kurbo::Point {
        kurbo::Point::new(self.x, self.y)
    }

    fn key(&self) -> (CheapOrderedFloat, CheapOrderedFloat) {
        (
            CheapOrderedFloat::from(self.x),
            CheapOrderedFloat::from(self.y),
        )
    }
}

impl Ord for Vertex {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Vertex {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for Vertex {}

impl std::hash::Hash for Vertex {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state)
    }
}

impl std::fmt::Debug for Vertex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?}, {:?})", self.x, self.y)
    }
}

impl From<kurbo::Point> for Vertex {
    fn from(p: kurbo::Point) -> Self {
        Vertex::new(p.x, p.y)
    }
}

impl From<(f64, f64)> for Vertex {
    fn from((x, y): (f64, f64)) -> Self {
        Vertex::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_x_then_y() {
        let mut vs = vec![
            Vertex::new(1.0, 0.0),
            Vertex::new(0.0, 2.0),
            Vertex::new(0.0, -1.0),
        ];
        vs.sort();
        assert_eq!(
            vs,
            vec![
                Vertex::new(0.0, -1.0),
                Vertex::new(0.0, 2.0),
                Vertex::new(1.0, 0.0)
            ]
        );
    }

    #[test]
    fn negative_zero() {
        let v = Vertex::new(-0.0, 0.0);
        assert!(v.x.is_sign_positive());
        assert_eq!(v, Vertex::new(0.0, -0.0));
    }
}
