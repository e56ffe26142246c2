//! Quadratic and cubic Bézier evaluation and a quadratic least-squares fit.

use crate::geometry::tolerance::{linspace, EPS_DENOM};
use crate::model::{Handle, Vec2};

/// A curve between two nodes, built from the endpoints and the edge handle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Curve {
    Quadratic { p0: Vec2, p1: Vec2, p2: Vec2 },
    Cubic { p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2 },
}

impl Curve {
    pub fn new(start: Vec2, handle: Handle, end: Vec2) -> Self {
        match handle {
            Handle::Quadratic(c) => Curve::Quadratic { p0: start, p1: c, p2: end },
            Handle::Cubic(c1, c2) => Curve::Cubic { p0: start, p1: c1, p2: c2, p3: end },
        }
    }

    pub fn start(&self) -> Vec2 {
        match *self {
            Curve::Quadratic { p0, .. } | Curve::Cubic { p0, .. } => p0,
        }
    }

    pub fn end(&self) -> Vec2 {
        match *self {
            Curve::Quadratic { p2, .. } => p2,
            Curve::Cubic { p3, .. } => p3,
        }
    }

    /// Evaluate the curve at parameter t ∈ [0, 1].
    pub fn eval(&self, t: f64) -> Vec2 {
        let mt = 1.0 - t;
        match *self {
            Curve::Quadratic { p0, p1, p2 } => {
                let b0 = mt * mt;
                let b1 = 2.0 * mt * t;
                let b2 = t * t;
                Vec2 {
                    x: b0 * p0.x + b1 * p1.x + b2 * p2.x,
                    y: b0 * p0.y + b1 * p1.y + b2 * p2.y,
                }
            }
            Curve::Cubic { p0, p1, p2, p3 } => {
                let t2 = t * t;
                let t3 = t2 * t;
                let mt2 = mt * mt;
                let mt3 = mt2 * mt;
                Vec2 {
                    x: mt3 * p0.x + 3.0 * mt2 * t * p1.x + 3.0 * mt * t2 * p2.x + t3 * p3.x,
                    y: mt3 * p0.y + 3.0 * mt2 * t * p1.y + 3.0 * mt * t2 * p2.y + t3 * p3.y,
                }
            }
        }
    }

    /// Handle that rebuilds this curve between the same endpoints.
    pub fn handle(&self) -> Handle {
        match *self {
            Curve::Quadratic { p1, .. } => Handle::Quadratic(p1),
            Curve::Cubic { p1, p2, .. } => Handle::Cubic(p1, p2),
        }
    }

    /// All control points coincide.
    pub fn is_point(&self) -> bool {
        match *self {
            Curve::Quadratic { p0, p1, p2 } => p0 == p1 && p1 == p2,
            Curve::Cubic { p0, p1, p2, p3 } => p0 == p1 && p1 == p2 && p2 == p3,
        }
    }

    /// `n` points at evenly spaced parameters, both endpoints included.
    /// A curve collapsed to a point gives `n` copies of it.
    pub fn sample(&self, n: usize) -> Vec<Vec2> {
        if self.is_point() {
            return vec![self.start(); n];
        }
        linspace(0.0, 1.0, n).into_iter().map(|t| self.eval(t)).collect()
    }
}

/// Least-squares control point of the quadratic that starts at the first
/// point, ends at the last one and passes closest to the ones between, each
/// point taken at its parameter in `params` (same length, within [0, 1]).
/// Points sampled from a quadratic at their true parameters give back its
/// control point.
///
/// Under-determined inputs (fewer than three points, or no interior
/// parameter) get the chord midpoint.
pub fn fit_quadratic_control(points: &[Vec2], params: &[f64]) -> Vec2 {
    let (start, end) = match (points.first(), points.last()) {
        (Some(&s), Some(&e)) => (s, e),
        _ => return Vec2::ZERO,
    };
    let mut denom = 0.0;
    let mut nx = 0.0;
    let mut ny = 0.0;
    for (p, &t) in points.iter().zip(params) {
        let mt = 1.0 - t;
        let b0 = mt * mt;
        let b1 = 2.0 * mt * t;
        let b2 = t * t;
        let rx = p.x - b0 * start.x - b2 * end.x;
        let ry = p.y - b0 * start.y - b2 * end.y;
        denom += b1 * b1;
        nx += b1 * rx;
        ny += b1 * ry;
    }
    if denom <= EPS_DENOM {
        return start.midpoint(end);
    }
    Vec2 { x: nx / denom, y: ny / denom }
}
