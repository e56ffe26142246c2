//! Token sequence to graph.
//!
//! Layout of one node block, terminated by `node_separator`:
//!
//! ```text
//! x y index [parent records] connect_separator [child records]
//! ```
//!
//! Each record is a neighbor index followed by the control point components
//! of the curve between the two nodes. Records may only reference nodes that
//! were decoded earlier in the sequence.

use log::debug;

use crate::algorithms::resegment::resegment;
use crate::algorithms::simplify::simplify_junctions;
use crate::config::{Arity, DecoderConfig};
use crate::error::Result;
use crate::model::{Handle, Vec2};
use crate::Graph;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Side {
    Parent,
    Child,
}

pub fn decode(tokens: &[i64], cfg: &DecoderConfig) -> Result<Graph> {
    cfg.validate()?;
    let body = strip_preamble(tokens, cfg.preamble_separator);
    let blocks = split_blocks(body, cfg.node_separator);
    let slots = blocks.len();
    let mut g = Graph::with_slots(slots);

    for (bi, block) in blocks.iter().enumerate() {
        if block.len() < 3 {
            debug!("block {}: {} tokens, header needs 3; skipped", bi, block.len());
            continue;
        }
        let coord = Vec2::new(block[0] as f64, block[1] as f64);
        let index = match slot_index(block[2], cfg.index_offset, slots) {
            Some(i) => i,
            None => {
                debug!("block {}: index token {} outside 0..{}; skipped", bi, block[2], slots);
                continue;
            }
        };

        let rest = &block[3..];
        let (parents, childs) = match rest.iter().position(|&t| t == cfg.connect_separator) {
            Some(p) => (&rest[..p], &rest[p + 1..]),
            None => (rest, &rest[..0]),
        };

        let mut edges = Vec::new();
        for (side, records) in [(Side::Parent, parents), (Side::Child, childs)] {
            for rec in records.chunks_exact(cfg.arity.record_width()) {
                let Some(other) = slot_index(rec[0], cfg.index_offset, slots) else {
                    debug!("node {}: neighbor token {} out of range; dropped", index, rec[0]);
                    continue;
                };
                if other == index {
                    debug!("node {}: self reference dropped", index);
                    continue;
                }
                if !g.contains(other) {
                    debug!("node {}: neighbor {} not decoded yet; dropped", index, other);
                    continue;
                }
                edges.push((side, other, handle_of(rec, cfg)));
            }
            let tail = records.len() % cfg.arity.record_width();
            if tail != 0 {
                debug!("node {}: {} trailing tokens ignored", index, tail);
            }
        }

        if g.contains(index) {
            debug!("block {}: slot {} already decoded; replaced", bi, index);
        }
        g.insert_node(index, coord);
        for (side, other, handle) in edges {
            match side {
                Side::Parent => g.link(other, index, handle),
                Side::Child => g.link(index, other, handle),
            };
        }
    }

    if cfg.junction_only {
        simplify_junctions(&mut g);
    }
    if let Some(distance) = cfg.resegment_distance {
        g = resegment(&g, distance, cfg.resegment_samples)?;
    }
    Ok(g)
}

pub(crate) fn strip_preamble(tokens: &[i64], sep: Option<i64>) -> &[i64] {
    match sep.and_then(|s| tokens.iter().position(|&t| t == s)) {
        Some(p) => &tokens[p + 1..],
        None => tokens,
    }
}

/// Blocks closed by a separator; an unterminated tail is not a block.
pub(crate) fn split_blocks(tokens: &[i64], sep: i64) -> Vec<&[i64]> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, &t) in tokens.iter().enumerate() {
        if t == sep {
            out.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    out
}

pub(crate) fn slot_index(token: i64, offset: i64, slots: usize) -> Option<u32> {
    let v = token.checked_sub(offset)?;
    if v >= 0 && (v as u64) < slots as u64 {
        Some(v as u32)
    } else {
        None
    }
}

fn handle_of(rec: &[i64], cfg: &DecoderConfig) -> Handle {
    let r = &cfg.rescale;
    match cfg.arity {
        Arity::Quadratic => Handle::Quadratic(r.apply(rec[1], rec[2], cfg.coeff_offset)),
        Arity::Cubic => Handle::Cubic(
            r.apply(rec[1], rec[2], cfg.coeff_offset),
            r.apply(rec[3], rec[4], cfg.coeff_offset),
        ),
    }
}
