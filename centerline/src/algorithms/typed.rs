//! Decoder for the older fixed-width record format.
//!
//! Every record is `[x, y, label, ref, control...]` and describes one step of
//! a walk that grows the graph: `start` opens a new root, `continue` extends
//! the previous node, `fork` branches off node `ref`, and `merge` joins the
//! current node into node `ref`. Node numbers are 1-based in the stream.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Handle, Vec2};
use crate::Graph;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypedConfig {
    /// Control points per curve counting both endpoints: 3 or 4.
    pub n_control: usize,
    /// A fork whose coordinate is within this squared distance of the
    /// previous record branches from an existing node instead of a new one.
    pub fork_epsilon: f64,
}

impl Default for TypedConfig {
    fn default() -> Self {
        TypedConfig { n_control: 3, fork_epsilon: 2.0 }
    }
}

impl TypedConfig {
    pub fn record_width(&self) -> usize {
        4 + 2 * self.n_control.saturating_sub(2)
    }

    pub fn validate(&self) -> Result<()> {
        if !(3..=4).contains(&self.n_control) {
            return Err(Error::InvalidConfig(format!(
                "n_control must be 3 or 4, got {}",
                self.n_control
            )));
        }
        if !self.fork_epsilon.is_finite() || self.fork_epsilon < 0.0 {
            return Err(Error::InvalidConfig("fork_epsilon must be finite and >= 0".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Label {
    Start,
    Continue,
    Fork,
    Merge,
}

impl Label {
    fn from_token(t: i64) -> Self {
        match t {
            0 => Label::Start,
            2 => Label::Fork,
            3 => Label::Merge,
            _ => Label::Continue,
        }
    }
}

pub fn decode_typed(tokens: &[i64], cfg: &TypedConfig) -> Result<Graph> {
    cfg.validate()?;
    let width = cfg.record_width();
    let mut g = Graph::new();
    let mut number: i64 = 0;
    let mut prev: Option<Vec2> = None;

    for (ri, rec) in tokens.chunks_exact(width).enumerate() {
        let coord = Vec2::new(rec[0] as f64, rec[1] as f64);
        let label = Label::from_token(rec[2]);
        let reference = rec[3].saturating_sub(1);
        let handle = handle_of(&rec[4..]);

        match label {
            Label::Start | Label::Continue => number += 1,
            Label::Fork => {
                let close = prev.map_or(false, |p| {
                    let d = coord.sub(p);
                    d.dot(d) < cfg.fork_epsilon
                });
                if !close {
                    number += 1;
                }
            }
            Label::Merge => {}
        }
        prev = Some(coord);

        let index = number - 1;
        if index < 0 || index > u32::MAX as i64 {
            debug!("record {}: {:?} before any node; dropped", ri, label);
            continue;
        }
        let index = index as u32;

        match label {
            Label::Start => g.insert_node(index, coord),
            Label::Continue => {
                g.insert_node(index, coord);
                if index == 0 || !g.link(index - 1, index, handle) {
                    debug!("record {}: continue without a previous node", ri);
                }
            }
            Label::Fork => {
                if !g.contains(index) {
                    g.insert_node(index, coord);
                }
                if in_range(reference, index) {
                    g.link(reference as u32, index, handle);
                } else {
                    debug!("record {}: fork source {} not before {}", ri, reference, index);
                }
            }
            Label::Merge => {
                if !g.contains(index) {
                    g.insert_node(index, coord);
                }
                if in_range(reference, index) {
                    g.link(index, reference as u32, handle);
                } else {
                    debug!("record {}: merge target {} not before {}", ri, reference, index);
                }
            }
        }
    }
    let tail = tokens.len() % width;
    if tail != 0 {
        debug!("{} trailing tokens ignored", tail);
    }
    Ok(g)
}

fn in_range(reference: i64, index: u32) -> bool {
    reference >= 0 && reference < index as i64
}

fn handle_of(controls: &[i64]) -> Handle {
    let p = |i: usize| Vec2::new(controls[i] as f64, controls[i + 1] as f64);
    if controls.len() >= 4 {
        Handle::Cubic(p(0), p(2))
    } else {
        Handle::Quadratic(p(0))
    }
}
