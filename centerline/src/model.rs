use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }
    #[inline]
    pub fn add(self, o: Vec2) -> Vec2 {
        Vec2 { x: self.x + o.x, y: self.y + o.y }
    }
    #[inline]
    pub fn sub(self, o: Vec2) -> Vec2 {
        Vec2 { x: self.x - o.x, y: self.y - o.y }
    }
    #[inline]
    pub fn scale(self, k: f64) -> Vec2 {
        Vec2 { x: self.x * k, y: self.y * k }
    }
    #[inline]
    pub fn dot(self, o: Vec2) -> f64 {
        self.x * o.x + self.y * o.y
    }
    #[inline]
    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
    #[inline]
    pub fn distance(self, o: Vec2) -> f64 {
        self.sub(o).length()
    }
    #[inline]
    pub fn lerp(self, o: Vec2, t: f64) -> Vec2 {
        Vec2 {
            x: self.x + t * (o.x - self.x),
            y: self.y + t * (o.y - self.y),
        }
    }
    #[inline]
    pub fn midpoint(self, o: Vec2) -> Vec2 {
        Vec2 { x: 0.5 * (self.x + o.x), y: 0.5 * (self.y + o.y) }
    }
    /// Bit pattern of the coordinate, with `-0.0` folded into `0.0`.
    #[inline]
    pub fn bits(self) -> (u64, u64) {
        ((self.x + 0.0).to_bits(), (self.y + 0.0).to_bits())
    }
}

/// Control points of the curve between two nodes, in absolute coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Handle {
    Quadratic(Vec2),
    Cubic(Vec2, Vec2),
}

impl Handle {
    pub fn centroid(&self) -> Vec2 {
        match *self {
            Handle::Quadratic(p) => p,
            Handle::Cubic(p1, p2) => p1.midpoint(p2),
        }
    }

    /// Componentwise average used when two curves are collapsed into one.
    /// Mixed arities fall back to a quadratic through the two centroids.
    pub fn average(&self, other: &Handle) -> Handle {
        match (*self, *other) {
            (Handle::Quadratic(a), Handle::Quadratic(b)) => Handle::Quadratic(a.midpoint(b)),
            (Handle::Cubic(a1, a2), Handle::Cubic(b1, b2)) => {
                Handle::Cubic(a1.midpoint(b1), a2.midpoint(b2))
            }
            _ => Handle::Quadratic(self.centroid().midpoint(other.centroid())),
        }
    }

    pub fn is_finite(&self) -> bool {
        match *self {
            Handle::Quadratic(p) => p.x.is_finite() && p.y.is_finite(),
            Handle::Cubic(p1, p2) => {
                p1.x.is_finite() && p1.y.is_finite() && p2.x.is_finite() && p2.y.is_finite()
            }
        }
    }
}

/// One side of a directed edge: the neighbor and the curve handle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub node: u32,
    pub handle: Handle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub index: u32,
    pub coord: Vec2,
    pub parents: Vec<Link>,
    pub childs: Vec<Link>,
}

impl Node {
    pub fn new(index: u32, coord: Vec2) -> Self {
        Node { index, coord, parents: Vec::new(), childs: Vec::new() }
    }

    pub fn facts(&self) -> NodeFacts {
        NodeFacts::from_degrees(self.parents.len(), self.childs.len())
    }
}

/// Structural role of a node, derived from its degrees.
/// A node can be several of these at once (a root that forks, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFacts {
    pub is_root: bool,
    pub is_sink: bool,
    pub is_merge: bool,
    pub is_fork: bool,
    pub is_pass_through: bool,
}

impl NodeFacts {
    pub fn from_degrees(parents: usize, childs: usize) -> Self {
        NodeFacts {
            is_root: parents == 0,
            is_sink: childs == 0,
            is_merge: parents > 1,
            is_fork: childs > 1,
            is_pass_through: parents == 1 && childs == 1,
        }
    }
}
