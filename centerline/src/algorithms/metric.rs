//! Direction-aware chamfer distance between chains, and its per-depth
//! aggregate over two whole graphs.
//!
//! Every keypoint pair is weighted by `tan(-c) + tan(1) + 1`, where `c` is the
//! dot product of the two unit tangents. Aligned tangents weigh 1, opposite
//! ones about 4.1, so overlapping chains that run the opposite way score far
//! apart.

use std::fmt;
use std::ops::{Add, Div, DivAssign};

use serde::{Deserialize, Serialize};

use crate::algorithms::chains::{enumerate_chains, Chain};
use crate::algorithms::lines::LineGraph;
use crate::config::SampleConfig;
use crate::error::{Error, Result};
use crate::Graph;

#[inline]
fn alignment_penalty(c: f64) -> f64 {
    (-c).tan() + 1f64.tan() + 1.0
}

/// Mean of row minima and mean of column minima of a dense row-major matrix,
/// averaged. NaN when either dimension is zero.
fn symmetric_chamfer(m: &[f64], rows: usize, cols: usize) -> f64 {
    if rows == 0 || cols == 0 {
        return f64::NAN;
    }
    let mut row_min = vec![f64::INFINITY; rows];
    let mut col_min = vec![f64::INFINITY; cols];
    for i in 0..rows {
        for j in 0..cols {
            let v = m[i * cols + j];
            row_min[i] = row_min[i].min(v);
            col_min[j] = col_min[j].min(v);
        }
    }
    let a = row_min.iter().sum::<f64>() / rows as f64;
    let b = col_min.iter().sum::<f64>() / cols as f64;
    (a + b) / 2.0
}

/// Symmetric, non-negative distance between two chains; 0 for a chain and
/// its copy.
pub fn chain_distance(a: &Chain, b: &Chain) -> f64 {
    let (n, m) = (a.keypoints.len(), b.keypoints.len());
    let mut d = Vec::with_capacity(n * m);
    for (p, t) in a.keypoints.iter().zip(&a.tangents) {
        for (q, u) in b.keypoints.iter().zip(&b.tangents) {
            d.push(p.distance(*q) * alignment_penalty(t.dot(*u)));
        }
    }
    symmetric_chamfer(&d, n, m)
}

/// For each depth `1..=max_depth`, the symmetric chamfer of chain distances
/// between the chains of that length in `a` and in `b`. A depth at which
/// either graph has no chain is NaN.
pub fn graph_distance(
    a: &Graph,
    b: &Graph,
    max_depth: usize,
    cfg: &SampleConfig,
) -> Result<DepthDistances> {
    cfg.validate()?;
    by_depth(max_depth, |depth| Ok((build_all(a, depth, cfg)?, build_all(b, depth, cfg)?)))
}

/// [`graph_distance`] for graphs with polyline edges.
pub fn line_graph_distance(
    a: &LineGraph,
    b: &LineGraph,
    max_depth: usize,
    cfg: &SampleConfig,
) -> Result<DepthDistances> {
    cfg.validate()?;
    by_depth(max_depth, |depth| Ok((a.chains(depth, cfg)?, b.chains(depth, cfg)?)))
}

fn by_depth<F>(max_depth: usize, mut chains_at: F) -> Result<DepthDistances>
where
    F: FnMut(usize) -> Result<(Vec<Chain>, Vec<Chain>)>,
{
    let mut values = Vec::with_capacity(max_depth);
    for depth in 1..=max_depth {
        let (ca, cb) = chains_at(depth)?;
        let mut d = Vec::with_capacity(ca.len() * cb.len());
        for x in &ca {
            for y in &cb {
                d.push(chain_distance(x, y));
            }
        }
        values.push(symmetric_chamfer(&d, ca.len(), cb.len()));
    }
    Ok(DepthDistances { values })
}

fn build_all(g: &Graph, depth: usize, cfg: &SampleConfig) -> Result<Vec<Chain>> {
    enumerate_chains(g, depth)
        .iter()
        .map(|p| Chain::build(g, p, cfg))
        .collect()
}

/// Per-depth distances, summable across graph pairs and divisible for
/// averaging. Entry `i` belongs to chains of `i + 1` nodes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthDistances {
    pub values: Vec<f64>,
}

impl DepthDistances {
    pub fn zeros(depths: usize) -> Self {
        DepthDistances { values: vec![0.0; depths] }
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        DepthDistances { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Elementwise sum; a NaN on either side contributes 0.
    pub fn try_add(&self, other: &DepthDistances) -> Result<DepthDistances> {
        let mut out = self.clone();
        out.try_add_assign(other)?;
        Ok(out)
    }

    pub fn try_add_assign(&mut self, other: &DepthDistances) -> Result<()> {
        if self.len() != other.len() {
            return Err(Error::ShapeMismatch { left: self.len(), right: other.len() });
        }
        for (a, b) in self.values.iter_mut().zip(&other.values) {
            *a = nan_to_zero(*a) + nan_to_zero(*b);
        }
        Ok(())
    }
}

#[inline]
fn nan_to_zero(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v }
}

impl Add for DepthDistances {
    type Output = Result<DepthDistances>;

    fn add(self, rhs: DepthDistances) -> Self::Output {
        self.try_add(&rhs)
    }
}

impl Div<f64> for DepthDistances {
    type Output = DepthDistances;

    fn div(mut self, rhs: f64) -> Self::Output {
        self /= rhs;
        self
    }
}

impl DivAssign<f64> for DepthDistances {
    fn div_assign(&mut self, rhs: f64) {
        for v in &mut self.values {
            *v /= rhs;
        }
    }
}

impl fmt::Display for DepthDistances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.values.iter().enumerate() {
            write!(f, "dpt {}: {:.3} ", i, v)?;
        }
        Ok(())
    }
}
