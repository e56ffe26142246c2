//! Graphs whose edges are polylines instead of Bézier curves.
//!
//! Connection records carry a run of midline points in place of control
//! points, and each record is closed by `line_separator`:
//!
//! ```text
//! x y index [neighbor x y x y .. line_sep]* connect_separator [neighbor x y .. line_sep]*
//! ```
//!
//! The topology lives in an ordinary [`Graph`] whose edge handles are the
//! quadratic through the halfway point of each midline, so the structural
//! queries and chain enumeration work unchanged. The midlines are kept
//! alongside and drive chain sampling.

use std::collections::HashMap;

use log::debug;

use crate::algorithms::chains::{enumerate_chains, path_coords, step_handle, Chain, ChainPath};
use crate::algorithms::decode::{slot_index, split_blocks, strip_preamble};
use crate::config::{DecoderConfig, SampleConfig};
use crate::error::{Error, Result};
use crate::geometry::polyline::{cumulative_lengths, point_at_length, unit_tangents};
use crate::geometry::tolerance::linspace;
use crate::model::{Handle, Link, Vec2};
use crate::Graph;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineGraph {
    graph: Graph,
    lines: HashMap<(u32, u32), Vec<(Handle, Vec<Vec2>)>>,
}

impl LineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slots(slots: usize) -> Self {
        LineGraph { graph: Graph::with_slots(slots), lines: HashMap::new() }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn add_node(&mut self, coord: Vec2) -> u32 {
        self.graph.add_node(coord)
    }

    /// Place a node at `index`; a node already there loses its edges and
    /// their midlines.
    pub fn insert_node(&mut self, index: u32, coord: Vec2) {
        if self.graph.contains(index) {
            self.lines.retain(|&(a, b), _| a != index && b != index);
        }
        self.graph.insert_node(index, coord);
    }

    /// Add the edge `parent -> child` drawn through `midline`. Refused under
    /// the same rules as [`Graph::link`], or when a midline point is not
    /// finite.
    pub fn link(&mut self, parent: u32, child: u32, midline: Vec<Vec2>) -> bool {
        if midline.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return false;
        }
        let (Some(a), Some(b)) = (self.graph.get_node(parent), self.graph.get_node(child)) else {
            return false;
        };
        let handle = through_halfway(a, &midline, b);
        if !self.graph.link(parent, child, handle) {
            return false;
        }
        self.lines.entry((parent, child)).or_default().push((handle, midline));
        true
    }

    /// Midline of the edge `parent -> link.node`.
    pub fn midline(&self, parent: u32, link: &Link) -> Option<&[Vec2]> {
        self.lines
            .get(&(parent, link.node))?
            .iter()
            .find(|(h, _)| *h == link.handle)
            .map(|(_, m)| m.as_slice())
    }

    /// The full polyline of an edge, both nodes included.
    pub fn edge_polyline(&self, parent: u32, link: &Link) -> Option<Vec<Vec2>> {
        let a = self.graph.get_node(parent)?;
        let b = self.graph.get_node(link.node)?;
        let mid = self.midline(parent, link)?;
        let mut out = Vec::with_capacity(mid.len() + 2);
        out.push(a);
        out.extend_from_slice(mid);
        out.push(b);
        Some(out)
    }

    /// Keypoints of a walk: per edge, `dense` points evenly spaced by arc
    /// length along the polyline, of which `K` are kept at rounded, evenly
    /// spread indices.
    pub fn chain(&self, path: &ChainPath, cfg: &SampleConfig) -> Result<Chain> {
        cfg.validate()?;
        let coords = path_coords(&self.graph, path)?;
        match coords.len() {
            0 => Err(Error::InvalidGraph("empty chain".into())),
            1 => Ok(Chain::singleton(path, coords[0])),
            n => {
                let k = cfg.keypoints_per_edge;
                let dense = cfg.dense_samples.max(k);
                let picks = rounded_indices(dense, k);
                let mut keypoints = Vec::with_capacity(k * (n - 1));
                let mut tangents = Vec::with_capacity(k * (n - 1));
                for i in 1..n {
                    let (node, handle) = path.steps[i];
                    let link = Link { node, handle: step_handle(node, handle)? };
                    let parent = path.steps[i - 1].0;
                    let poly = self.edge_polyline(parent, &link).ok_or_else(|| {
                        Error::InvalidGraph(format!("no midline for edge {} -> {}", parent, node))
                    })?;
                    let samples = resample_polyline(&poly, dense);
                    let dirs = unit_tangents(&samples);
                    for &j in &picks {
                        keypoints.push(samples[j]);
                        tangents.push(dirs[j]);
                    }
                }
                Ok(Chain { path: path.clone(), keypoints, tangents })
            }
        }
    }

    /// Chains of every walk of exactly `length` nodes.
    pub fn chains(&self, length: usize, cfg: &SampleConfig) -> Result<Vec<Chain>> {
        enumerate_chains(&self.graph, length).iter().map(|p| self.chain(p, cfg)).collect()
    }
}

/// Quadratic handle whose curve passes through the arc-length halfway point
/// of the midline, or through the chord midpoint when there is none.
fn through_halfway(start: Vec2, midline: &[Vec2], end: Vec2) -> Handle {
    let half = match midline {
        [] => start.midpoint(end),
        [p] => *p,
        _ => {
            let cum = cumulative_lengths(midline);
            let total = cum.last().copied().unwrap_or(0.0);
            point_at_length(midline, &cum, total / 2.0)
        }
    };
    // B(1/2) = (start + 2c + end) / 4
    Handle::Quadratic(half.scale(2.0).sub(start.midpoint(end)))
}

/// `n` points evenly spaced by arc length, both ends included.
fn resample_polyline(points: &[Vec2], n: usize) -> Vec<Vec2> {
    let cum = cumulative_lengths(points);
    let total = cum.last().copied().unwrap_or(0.0);
    linspace(0.0, total, n).into_iter().map(|s| point_at_length(points, &cum, s)).collect()
}

/// `k` indices into `n` samples, rounded from an even spread (ties to even).
fn rounded_indices(n: usize, k: usize) -> Vec<usize> {
    let hi = n.saturating_sub(1) as f64;
    linspace(0.0, hi, k).into_iter().map(|v| v.round_ties_even() as usize).collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Side {
    Parent,
    Child,
}

/// Decode a sequence whose connection records carry midline points. The
/// block layout, offsets and rescaling follow [`DecoderConfig`]; the arity is
/// ignored, and so are the simplify and re-segment options.
pub fn decode_lines(tokens: &[i64], cfg: &DecoderConfig) -> Result<LineGraph> {
    cfg.validate()?;
    if cfg.junction_only || cfg.resegment_distance.is_some() {
        debug!("polyline edges are neither simplified nor re-segmented");
    }
    let body = strip_preamble(tokens, cfg.preamble_separator);
    let blocks = split_blocks(body, cfg.node_separator);
    let slots = blocks.len();
    let mut lg = LineGraph::with_slots(slots);

    for (bi, block) in blocks.iter().enumerate() {
        if block.len() < 3 {
            debug!("block {}: {} tokens, header needs 3; skipped", bi, block.len());
            continue;
        }
        let coord = Vec2::new(block[0] as f64, block[1] as f64);
        let Some(index) = slot_index(block[2], cfg.index_offset, slots) else {
            debug!("block {}: index token {} outside 0..{}; skipped", bi, block[2], slots);
            continue;
        };

        let rest = &block[3..];
        let (parents, childs) = match rest.iter().position(|&t| t == cfg.connect_separator) {
            Some(p) => (&rest[..p], &rest[p + 1..]),
            None => (rest, &rest[..0]),
        };

        let mut edges = Vec::new();
        for (side, records) in [(Side::Parent, parents), (Side::Child, childs)] {
            // an unterminated last record is not a record
            for rec in split_blocks(records, cfg.line_separator) {
                let Some((&head, points)) = rec.split_first() else { continue };
                if points.is_empty() {
                    debug!("node {}: record for {} has no points; dropped", index, head);
                    continue;
                }
                let Some(other) = slot_index(head, cfg.index_offset, slots) else {
                    debug!("node {}: neighbor token {} out of range; dropped", index, head);
                    continue;
                };
                if other == index || !lg.graph.contains(other) {
                    debug!("node {}: neighbor {} unusable; dropped", index, other);
                    continue;
                }
                let midline: Vec<Vec2> = points
                    .chunks_exact(2)
                    .map(|c| cfg.rescale.apply(c[0], c[1], cfg.coeff_offset))
                    .collect();
                edges.push((side, other, midline));
            }
        }

        if lg.graph.contains(index) {
            debug!("block {}: slot {} already decoded; replaced", bi, index);
        }
        lg.insert_node(index, coord);
        for (side, other, midline) in edges {
            let linked = match side {
                Side::Parent => lg.link(other, index, midline),
                Side::Child => lg.link(index, other, midline),
            };
            if !linked {
                debug!("node {}: edge with {} refused", index, other);
            }
        }
    }
    Ok(lg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64) -> Vec2 {
        Vec2::new(x, y)
    }

    #[test]
    fn parent_record_carries_midline() {
        let toks = [0, 0, 0, 572, 10, 0, 1, 0, 3, 2, 7, 2, 569, 572];
        let lg = decode_lines(&toks, &DecoderConfig::default()).unwrap();
        let g = lg.graph();
        assert_eq!(g.node_count(), 2);
        let edges = g.edges();
        assert_eq!(edges.len(), 1);
        let (a, h, b) = edges[0];
        assert_eq!((a, b), (0, 1));
        // halfway point (5, 2) lies on the handle's quadratic
        assert_eq!(h, Handle::Quadratic(v(5.0, 4.0)));
        let link = g.node(0).unwrap().childs[0];
        assert_eq!(lg.midline(0, &link), Some(&[v(3.0, 2.0), v(7.0, 2.0)][..]));
        assert_eq!(
            lg.edge_polyline(0, &link),
            Some(vec![v(0.0, 0.0), v(3.0, 2.0), v(7.0, 2.0), v(10.0, 0.0)])
        );
    }

    #[test]
    fn child_records_and_malformed_ones() {
        // child record to 0; a bare index; an odd trailing token; an
        // unterminated last record
        let toks = [
            0, 0, 0, 572, //
            20, 0, 1, 571, 0, 10, 5, 569, 0, 569, 0, 12, 6, 9, 569, 0, 1, 1, 572,
        ];
        let lg = decode_lines(&toks, &DecoderConfig::default()).unwrap();
        let g = lg.graph();
        assert_eq!(g.edge_count(), 2);
        let childs = &g.node(1).unwrap().childs;
        assert_eq!(lg.midline(1, &childs[0]), Some(&[v(10.0, 5.0)][..]));
        assert_eq!(lg.midline(1, &childs[1]), Some(&[v(12.0, 6.0)][..]));
        assert!(g.is_consistent());
    }

    #[test]
    fn replaced_slot_drops_its_midlines() {
        let toks = [0, 0, 0, 572, 5, 0, 1, 0, 2, 2, 569, 572, 7, 7, 1, 572];
        let lg = decode_lines(&toks, &DecoderConfig::default()).unwrap();
        assert_eq!(lg.graph().edge_count(), 0);
        assert!(lg.lines.is_empty());
    }

    #[test]
    fn straight_polyline_keypoints() {
        let mut lg = LineGraph::new();
        let a = lg.add_node(v(0.0, 0.0));
        let b = lg.add_node(v(10.0, 0.0));
        assert!(lg.link(a, b, vec![v(5.0, 0.0)]));
        let path = &enumerate_chains(lg.graph(), 2)[0];
        let chain = lg.chain(path, &SampleConfig::new(4, 50)).unwrap();
        assert_eq!(chain.keypoints.len(), 4);
        assert_eq!(chain.keypoints[0], v(0.0, 0.0));
        assert_eq!(chain.keypoints[3], v(10.0, 0.0));
        // indices 0, 16, 33, 49 of 50
        assert!((chain.keypoints[1].x - 10.0 * 16.0 / 49.0).abs() < 1e-9);
        assert!((chain.keypoints[2].x - 10.0 * 33.0 / 49.0).abs() < 1e-9);
        for t in &chain.tangents {
            assert!((t.x - 1.0).abs() < 1e-12 && t.y == 0.0, "{:?}", t);
        }
    }

    #[test]
    fn corner_keypoints_follow_the_polyline() {
        let mut lg = LineGraph::new();
        let a = lg.add_node(v(0.0, 0.0));
        let b = lg.add_node(v(10.0, 10.0));
        lg.link(a, b, vec![v(10.0, 0.0)]);
        let path = &enumerate_chains(lg.graph(), 2)[0];
        let chain = lg.chain(path, &SampleConfig::new(3, 21)).unwrap();
        assert_eq!(chain.keypoints, vec![v(0.0, 0.0), v(10.0, 0.0), v(10.0, 10.0)]);
        assert_eq!(chain.tangents[0], v(1.0, 0.0));
        assert_eq!(chain.tangents[2], v(0.0, 1.0));
    }

    #[test]
    fn singleton_and_missing_midline() {
        let mut lg = LineGraph::new();
        let a = lg.add_node(v(1.0, 2.0));
        let b = lg.add_node(v(4.0, 2.0));
        lg.link(a, b, Vec::new());
        let one = lg.chains(1, &SampleConfig::default()).unwrap();
        assert_eq!(one[0].keypoints, vec![v(1.0, 2.0)]);
        let bogus = ChainPath { steps: vec![(0, None), (1, Some(Handle::Quadratic(v(9.0, 9.0))))] };
        assert!(lg.chain(&bogus, &SampleConfig::default()).is_err());
    }

    #[test]
    fn link_rules_follow_the_graph() {
        let mut lg = LineGraph::new();
        let a = lg.add_node(v(0.0, 0.0));
        let b = lg.add_node(v(4.0, 0.0));
        assert!(!lg.link(a, a, vec![v(1.0, 1.0)]));
        assert!(!lg.link(a, 7, vec![v(1.0, 1.0)]));
        assert!(!lg.link(a, b, vec![v(f64::NAN, 1.0)]));
        assert!(lg.link(a, b, vec![v(2.0, 1.0)]));
        assert!(!lg.link(a, b, vec![v(2.0, 1.0)]));
        assert_eq!(lg.graph().edge_count(), 1);
    }
}
