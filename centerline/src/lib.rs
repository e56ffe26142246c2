//! Directed graphs of curved centerline segments decoded from model token
//! sequences, plus a direction-aware chain distance for evaluating them.
//!
//! The graph is an arena of optional node slots addressed by index. Edges are
//! stored twice, once in the parent's `childs` and once in the child's
//! `parents`, and every mutation goes through the methods on [`Graph`] that
//! keep both sides in step.

pub mod config;
pub mod error;
pub mod model;
pub mod geometry {
    pub mod bezier;
    pub mod polyline;
    pub mod tolerance;
}
pub mod algorithms {
    pub mod assignment;
    pub mod chains;
    pub mod decode;
    pub mod lines;
    pub mod metric;
    pub mod resample;
    pub mod resegment;
    pub mod simplify;
    pub mod typed;
}
mod json;

pub use algorithms::chains::{enumerate_chains, enumerate_chains_up_to, Chain, ChainPath};
pub use algorithms::decode::decode;
pub use algorithms::lines::{decode_lines, LineGraph};
pub use algorithms::metric::{chain_distance, graph_distance, line_graph_distance, DepthDistances};
pub use algorithms::resegment::resegment;
pub use algorithms::simplify::simplify_junctions;
pub use algorithms::typed::{decode_typed, TypedConfig};
pub use config::{Arity, DecoderConfig, Rescale, Rounding, SampleConfig};
pub use error::{Error, Result};
pub use model::{Handle, Link, Node, NodeFacts, Vec2};

use geometry::bezier::Curve;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    pub(crate) nodes: Vec<Option<Node>>, // index is slot
}

impl Graph {
    pub fn new() -> Self {
        Graph { nodes: Vec::new() }
    }

    /// Graph with `slots` empty slots, indices `0..slots`.
    pub fn with_slots(slots: usize) -> Self {
        Graph { nodes: vec![None; slots] }
    }

    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    // Nodes
    pub fn add_node(&mut self, coord: Vec2) -> u32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(Some(Node::new(id, coord)));
        id
    }

    /// Place a node at `index`, growing the arena if needed. A node already
    /// in that slot is detached from its neighbors and replaced.
    pub fn insert_node(&mut self, index: u32, coord: Vec2) {
        let i = index as usize;
        if i >= self.nodes.len() {
            self.nodes.resize(i + 1, None);
        }
        if self.nodes[i].is_some() {
            self.detach_node(index);
        }
        self.nodes[i] = Some(Node::new(index, coord));
    }

    pub fn contains(&self, index: u32) -> bool {
        self.node(index).is_some()
    }

    pub fn node(&self, index: u32) -> Option<&Node> {
        self.nodes.get(index as usize).and_then(|n| n.as_ref())
    }

    pub fn get_node(&self, index: u32) -> Option<Vec2> {
        self.node(index).map(|n| n.coord)
    }

    /// Populated nodes in index order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter_map(|n| n.as_ref())
    }

    pub fn node_indices(&self) -> Vec<u32> {
        self.nodes().map(|n| n.index).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn facts(&self, index: u32) -> Option<NodeFacts> {
        self.node(index).map(|n| n.facts())
    }

    pub fn roots(&self) -> Vec<u32> {
        self.nodes().filter(|n| n.parents.is_empty()).map(|n| n.index).collect()
    }

    pub fn sinks(&self) -> Vec<u32> {
        self.nodes().filter(|n| n.childs.is_empty()).map(|n| n.index).collect()
    }

    /// Detach all edges of `index` and retire its slot.
    pub fn remove_node(&mut self, index: u32) -> Option<Node> {
        if !self.contains(index) {
            return None;
        }
        self.detach_node(index);
        self.nodes.get_mut(index as usize).and_then(|slot| slot.take())
    }

    // Edges
    /// Add the edge `parent -> child` on both sides. Self-loops, missing
    /// endpoints, non-finite handles and exact duplicates are refused.
    pub fn link(&mut self, parent: u32, child: u32, handle: Handle) -> bool {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            return false;
        }
        if !handle.is_finite() {
            return false;
        }
        let dup = self
            .node(parent)
            .map_or(false, |p| p.childs.iter().any(|l| l.node == child && l.handle == handle));
        if dup {
            return false;
        }
        self.push_edge(parent, child, handle);
        true
    }

    // Caller guarantees both endpoints exist and differ.
    pub(crate) fn push_edge(&mut self, parent: u32, child: u32, handle: Handle) {
        if let Some(Some(p)) = self.nodes.get_mut(parent as usize) {
            p.childs.push(Link { node: child, handle });
        }
        if let Some(Some(c)) = self.nodes.get_mut(child as usize) {
            c.parents.push(Link { node: parent, handle });
        }
    }

    /// Remove every `parent -> child` edge from both sides.
    pub fn unlink_all(&mut self, parent: u32, child: u32) -> usize {
        let mut removed = 0;
        if let Some(Some(p)) = self.nodes.get_mut(parent as usize) {
            let before = p.childs.len();
            p.childs.retain(|l| l.node != child);
            removed = before - p.childs.len();
        }
        if let Some(Some(c)) = self.nodes.get_mut(child as usize) {
            c.parents.retain(|l| l.node != parent);
        }
        removed
    }

    /// Remove every edge touching `index`, keeping the node itself.
    pub fn detach_node(&mut self, index: u32) {
        let (parents, childs) = match self.node(index) {
            Some(n) => (
                n.parents.iter().map(|l| l.node).collect::<Vec<_>>(),
                n.childs.iter().map(|l| l.node).collect::<Vec<_>>(),
            ),
            None => return,
        };
        for p in parents {
            self.unlink_all(p, index);
        }
        for c in childs {
            self.unlink_all(index, c);
        }
    }

    /// Move every edge of `from` onto `into` and retire `from`. Edges that
    /// would become self-loops on `into` are dropped.
    pub fn merge_node_into(&mut self, from: u32, into: u32) -> bool {
        if from == into || !self.contains(from) || !self.contains(into) {
            return false;
        }
        let (parents, childs) = match self.node(from) {
            Some(n) => (n.parents.clone(), n.childs.clone()),
            None => return false,
        };
        self.detach_node(from);
        for l in parents {
            let p = if l.node == from { into } else { l.node };
            self.link(p, into, l.handle);
        }
        for l in childs {
            let c = if l.node == from { into } else { l.node };
            self.link(into, c, l.handle);
        }
        if let Some(slot) = self.nodes.get_mut(from as usize) {
            *slot = None;
        }
        true
    }

    /// All edges as `(parent, handle, child)`, in parent index order.
    pub fn edges(&self) -> Vec<(u32, Handle, u32)> {
        let mut out = Vec::new();
        for n in self.nodes() {
            for l in &n.childs {
                out.push((n.index, l.handle, l.node));
            }
        }
        out
    }

    pub fn edge_count(&self) -> usize {
        self.nodes().map(|n| n.childs.len()).sum()
    }

    /// Curve of the edge `parent -> link.node`.
    pub fn edge_curve(&self, parent: u32, link: &Link) -> Option<Curve> {
        let a = self.get_node(parent)?;
        let b = self.get_node(link.node)?;
        Some(Curve::new(a, link.handle, b))
    }

    /// Every child entry has exactly as many mirrored parent entries (same
    /// endpoints, same handle) and vice versa, and no link is dangling.
    pub fn is_consistent(&self) -> bool {
        for n in self.nodes() {
            for l in &n.childs {
                let Some(c) = self.node(l.node) else { return false };
                let fwd = n.childs.iter().filter(|x| **x == *l).count();
                let back = c
                    .parents
                    .iter()
                    .filter(|x| x.node == n.index && x.handle == l.handle)
                    .count();
                if fwd != back {
                    return false;
                }
            }
            for l in &n.parents {
                let Some(p) = self.node(l.node) else { return false };
                let back = n.parents.iter().filter(|x| **x == *l).count();
                let fwd = p
                    .childs
                    .iter()
                    .filter(|x| x.node == n.index && x.handle == l.handle)
                    .count();
                if fwd != back {
                    return false;
                }
            }
        }
        true
    }

    /// Evenly spaced points along every edge, `step` apart in arc length.
    pub fn edge_pixels(&self, step: f64, dense: usize) -> Vec<Vec2> {
        let mut out = Vec::new();
        for n in self.nodes() {
            for l in &n.childs {
                if let Some(curve) = self.edge_curve(n.index, l) {
                    out.extend(algorithms::resample::pixels_along(&curve, step, dense));
                }
            }
        }
        out
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        json::to_json_impl(self)
    }

    pub fn from_json_value(v: serde_json::Value) -> Result<Graph> {
        json::from_json_impl(v)
    }
}
