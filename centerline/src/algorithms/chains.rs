use std::collections::VecDeque;

use crate::algorithms::resample::even_indices;
use crate::config::SampleConfig;
use crate::error::{Error, Result};
use crate::geometry::bezier::Curve;
use crate::geometry::polyline::unit_tangents;
use crate::model::{Handle, Vec2};
use crate::Graph;

/// Tangent given to the single keypoint of a one-node chain.
pub const SINGLETON_TANGENT: Vec2 = Vec2 {
    x: std::f64::consts::FRAC_1_SQRT_2,
    y: std::f64::consts::FRAC_1_SQRT_2,
};

/// A directed walk along child edges. Each step names the node reached and
/// the handle of the edge used to reach it; the first step has none.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainPath {
    pub steps: Vec<(u32, Option<Handle>)>,
}

impl ChainPath {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn nodes(&self) -> Vec<u32> {
        self.steps.iter().map(|s| s.0).collect()
    }
}

/// Every walk of exactly `length` nodes, starting from each node in index
/// order and expanded breadth first. Branches that hit a sink before
/// reaching `length` produce nothing.
///
/// The count grows with fan-out to the power of `length`; callers bound both.
pub fn enumerate_chains(g: &Graph, length: usize) -> Vec<ChainPath> {
    let mut out = Vec::new();
    if length == 0 {
        return out;
    }
    for start in g.nodes() {
        let mut queue: VecDeque<Vec<(u32, Option<Handle>)>> = VecDeque::new();
        queue.push_back(vec![(start.index, None)]);
        while let Some(path) = queue.pop_front() {
            if path.len() == length {
                out.push(ChainPath { steps: path });
                continue;
            }
            let Some(&(last, _)) = path.last() else { continue };
            let Some(node) = g.node(last) else { continue };
            for l in &node.childs {
                let mut next = path.clone();
                next.push((l.node, Some(l.handle)));
                queue.push_back(next);
            }
        }
    }
    out
}

/// Chains of every length in `1..=max_length`, shortest first.
pub fn enumerate_chains_up_to(g: &Graph, max_length: usize) -> Vec<ChainPath> {
    (1..=max_length).flat_map(|len| enumerate_chains(g, len)).collect()
}

/// A walk resampled into evenly spaced keypoints with unit tangents.
#[derive(Clone, Debug, PartialEq)]
pub struct Chain {
    pub path: ChainPath,
    pub keypoints: Vec<Vec2>,
    pub tangents: Vec<Vec2>,
}

impl Chain {
    /// `K` keypoints per edge (`K = keypoints_per_edge`), so a walk of `L`
    /// nodes gets `K * (L - 1)` of them. A one-node walk gets the node itself
    /// with a fixed diagonal tangent.
    pub fn build(g: &Graph, path: &ChainPath, cfg: &SampleConfig) -> Result<Chain> {
        cfg.validate()?;
        let coords = path_coords(g, path)?;

        match coords.len() {
            0 => Err(Error::InvalidGraph("empty chain".into())),
            1 => Ok(Chain::singleton(path, coords[0])),
            n => {
                let k = cfg.keypoints_per_edge;
                let dense = cfg.dense_samples.max(k);
                let mut keypoints = Vec::with_capacity(k * (n - 1));
                let mut tangents = Vec::with_capacity(k * (n - 1));
                for i in 1..n {
                    let (node, handle) = path.steps[i];
                    let handle = step_handle(node, handle)?;
                    let samples = Curve::new(coords[i - 1], handle, coords[i]).sample(dense);
                    let dirs = unit_tangents(&samples);
                    for j in even_indices(&samples, k) {
                        keypoints.push(samples[j]);
                        tangents.push(dirs[j]);
                    }
                }
                Ok(Chain { path: path.clone(), keypoints, tangents })
            }
        }
    }

    pub(crate) fn singleton(path: &ChainPath, coord: Vec2) -> Chain {
        Chain { path: path.clone(), keypoints: vec![coord], tangents: vec![SINGLETON_TANGENT] }
    }
}

/// Coordinates of every node a path visits.
pub(crate) fn path_coords(g: &Graph, path: &ChainPath) -> Result<Vec<Vec2>> {
    path.steps
        .iter()
        .map(|&(n, _)| {
            g.get_node(n)
                .ok_or_else(|| Error::InvalidGraph(format!("chain names missing node {}", n)))
        })
        .collect()
}

pub(crate) fn step_handle(node: u32, handle: Option<Handle>) -> Result<Handle> {
    handle.ok_or_else(|| Error::InvalidGraph(format!("chain step to {} has no handle", node)))
}
