//! Polygon intersection by pairwise edge tests.
//!
//! Polygons are point slices treated as closed: the last point connects back
//! to the first. Edges are compared with the orientation method, so concave
//! and self-intersecting shapes are fine. One polygon sitting entirely inside
//! the other, with no edge contact, does not count as intersecting.

use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Collinear,
    Clockwise,
    CounterClockwise,
}

/// Edge-pair collision test with a configurable collinearity tolerance.
///
/// The default tolerance is zero: a cross product counts as collinear only
/// when it is exactly `0.0`. That is fragile for computed coordinates, so
/// callers that need slack set it explicitly with [`PolygonCollider::with_epsilon`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PolygonCollider {
    epsilon: f64,
}

impl PolygonCollider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-finite values fall back to exact comparison.
    pub fn with_epsilon(epsilon: f64) -> Self {
        let epsilon = if epsilon.is_finite() { epsilon.abs() } else { 0.0 };
        Self { epsilon }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Orientation of the ordered triplet `(p, q, r)`.
    pub fn orientation(&self, p: Point, q: Point, r: Point) -> Orientation {
        let val = (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y);

        if val.abs() <= self.epsilon {
            Orientation::Collinear
        } else if val > 0.0 {
            Orientation::Clockwise
        } else {
            Orientation::CounterClockwise
        }
    }

    /// Whether segment `p1q1` touches segment `p2q2`.
    pub fn segments_intersect(&self, p1: Point, q1: Point, p2: Point, q2: Point) -> bool {
        let o1 = self.orientation(p1, q1, p2);
        let o2 = self.orientation(p1, q1, q2);
        let o3 = self.orientation(p2, q2, p1);
        let o4 = self.orientation(p2, q2, q1);

        if o1 != o2 && o3 != o4 {
            return true;
        }

        (o1 == Orientation::Collinear && on_segment(p1, p2, q1))
            || (o2 == Orientation::Collinear && on_segment(p1, q2, q1))
            || (o3 == Orientation::Collinear && on_segment(p2, p1, q2))
            || (o4 == Orientation::Collinear && on_segment(p2, q1, q2))
    }

    pub fn are_intersecting(&self, a: &[Point], b: &[Point]) -> bool {
        if a.len() < 2 || b.len() < 2 {
            return false;
        }

        edges(a).any(|(p1, q1)| edges(b).any(|(p2, q2)| self.segments_intersect(p1, q1, p2, q2)))
    }
}

/// Exact-comparison intersection test; see [`PolygonCollider`].
pub fn are_intersecting(a: &[Point], b: &[Point]) -> bool {
    PolygonCollider::default().are_intersecting(a, b)
}

/// For collinear `p, q, r`: does `q` lie on segment `pr`.
pub fn on_segment(p: Point, q: Point, r: Point) -> bool {
    q.x <= p.x.max(r.x) && q.x >= p.x.min(r.x) && q.y <= p.y.max(r.y) && q.y >= p.y.min(r.y)
}

fn edges(poly: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    let n = poly.len();
    (0..n).map(move |i| (poly[i], poly[(i + 1) % n]))
}
