use std::collections::{HashMap, HashSet};

use log::trace;

use crate::error::{Error, Result};
use crate::geometry::bezier::{fit_quadratic_control, Curve};
use crate::geometry::polyline::{cumulative_lengths, point_at_length};
use crate::geometry::tolerance::{clamp01, linspace, EPS_ARC, EPS_DENOM, EPS_LEN};
use crate::model::{Handle, Vec2};
use crate::Graph;

/// Builds a fresh arena while remembering which new node stands for which
/// node of the source graph.
#[derive(Debug, Default)]
pub(crate) struct GraphBuilder {
    graph: Graph,
    map: HashMap<u32, u32>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// New node for `old`, created on first request.
    pub fn node_for(&mut self, old: u32, coord: Vec2) -> u32 {
        if let Some(&id) = self.map.get(&old) {
            return id;
        }
        let id = self.graph.add_node(coord);
        self.map.insert(old, id);
        id
    }

    /// Node with no counterpart in the source graph.
    pub fn fresh(&mut self, coord: Vec2) -> u32 {
        self.graph.add_node(coord)
    }

    pub fn link(&mut self, parent: u32, child: u32, handle: Handle) -> bool {
        self.graph.link(parent, child, handle)
    }

    pub fn finish(self) -> Graph {
        self.graph
    }
}

/// One maximal path through pass-through nodes.
struct Run {
    start: u32,
    end: u32,
    curves: Vec<Curve>,
}

/// Re-cut every run of the graph into pieces of arc length `distance`,
/// fitting one quadratic per piece. Nodes that are not pass-through are kept;
/// pass-through nodes disappear into the runs. Nodes that end up at the same
/// coordinate are unified afterwards.
///
/// A run made of a single edge that needs no cut keeps its handle. A closed
/// run shorter than `distance` is cut once at half its length so it keeps
/// two edges.
pub fn resegment(g: &Graph, distance: f64, samples: usize) -> Result<Graph> {
    if !(distance.is_finite() && distance > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "resegment distance must be positive, got {}",
            distance
        )));
    }
    if samples < 2 {
        return Err(Error::InvalidConfig("resegment samples must be at least 2".into()));
    }

    let mut b = GraphBuilder::new();
    for n in g.nodes() {
        if !n.facts().is_pass_through {
            b.node_for(n.index, n.coord);
        }
    }

    let mut visited: HashSet<u32> = HashSet::new();
    let mut runs = Vec::new();
    for n in g.nodes() {
        if !n.facts().is_pass_through {
            runs.extend(runs_from(g, n.index, &mut visited));
        }
    }
    // closed loops made only of pass-through nodes
    for n in g.nodes() {
        if n.facts().is_pass_through && !visited.contains(&n.index) {
            visited.insert(n.index);
            b.node_for(n.index, n.coord);
            runs.extend(runs_from(g, n.index, &mut visited));
        }
    }

    for run in &runs {
        cut_run(g, run, distance, samples, &mut b);
    }

    let mut out = b.finish();
    let merged = unify_coincident(&mut out);
    if merged > 0 {
        trace!("unified {} coincident nodes", merged);
    }
    Ok(out)
}

fn runs_from(g: &Graph, start: u32, visited: &mut HashSet<u32>) -> Vec<Run> {
    let mut runs = Vec::new();
    let Some(node) = g.node(start) else { return runs };
    for first in &node.childs {
        let mut curves = Vec::new();
        let mut from = start;
        let mut link = *first;
        loop {
            let Some(curve) = g.edge_curve(from, &link) else { break };
            curves.push(curve);
            let cur = link.node;
            let next = match g.node(cur) {
                Some(n) if n.facts().is_pass_through && !visited.contains(&cur) => n.childs[0],
                _ => break,
            };
            visited.insert(cur);
            from = cur;
            link = next;
        }
        let end = link.node;
        if !curves.is_empty() {
            runs.push(Run { start, end, curves });
        }
    }
    runs
}

/// Dense points along the run, each with its run parameter: curve index plus
/// the Bézier parameter on that curve.
fn flatten(curves: &[Curve], samples: usize) -> (Vec<Vec2>, Vec<f64>) {
    let ts = linspace(0.0, 1.0, samples);
    let mut pts: Vec<Vec2> = Vec::with_capacity(curves.len() * samples);
    let mut params: Vec<f64> = Vec::with_capacity(curves.len() * samples);
    for (i, c) in curves.iter().enumerate() {
        let skip = if i == 0 { 0 } else { 1 };
        for (p, t) in c.sample(samples).into_iter().zip(&ts).skip(skip) {
            pts.push(p);
            params.push(i as f64 + t);
        }
    }
    (pts, params)
}

/// Run parameter at arc length `s`, interpolated between dense samples.
fn param_at_length(cum: &[f64], params: &[f64], s: f64) -> f64 {
    let hi = cum.partition_point(|&c| c < s);
    if hi == 0 {
        return params.first().copied().unwrap_or(0.0);
    }
    if hi >= cum.len() {
        return params.last().copied().unwrap_or(0.0);
    }
    let seg = cum[hi] - cum[hi - 1];
    if seg <= EPS_LEN {
        return params[hi];
    }
    let t = clamp01((s - cum[hi - 1]) / seg);
    params[hi - 1] + t * (params[hi] - params[hi - 1])
}

/// Multiples of `distance` strictly inside the run, then its total length.
fn cut_lengths(total: f64, distance: f64) -> Vec<f64> {
    let mut cuts = Vec::new();
    let mut k = 1usize;
    loop {
        let s = distance * k as f64;
        if s >= total - EPS_ARC {
            break;
        }
        cuts.push(s);
        k += 1;
    }
    cuts.push(total);
    cuts
}

fn cut_run(g: &Graph, run: &Run, distance: f64, samples: usize, b: &mut GraphBuilder) {
    let (Some(start_coord), Some(end_coord)) = (g.get_node(run.start), g.get_node(run.end)) else {
        return;
    };
    let (pts, params) = flatten(&run.curves, samples);
    let cum = cumulative_lengths(&pts);
    let total = cum.last().copied().unwrap_or(0.0);
    let mut cuts = cut_lengths(total, distance);
    if run.start == run.end && cuts.len() == 1 {
        // closed run: an interior node keeps its edges from being self-loops
        cuts.insert(0, total / 2.0);
    }
    trace!(
        "run {} -> {}: {} curves, length {:.3}, {} pieces",
        run.start,
        run.end,
        run.curves.len(),
        total,
        cuts.len()
    );

    let first = b.node_for(run.start, start_coord);
    if let ([curve], [_]) = (run.curves.as_slice(), cuts.as_slice()) {
        let last = b.node_for(run.end, end_coord);
        b.link(first, last, curve.handle());
        return;
    }

    let mut prev_id = first;
    let mut prev_pt = start_coord;
    let mut prev_s = 0.0;
    let mut prev_tau = 0.0;
    let last = cuts.len() - 1;
    for (ci, &s) in cuts.iter().enumerate() {
        let (id, pt, tau) = if ci == last {
            let tau = params.last().copied().unwrap_or(0.0);
            (b.node_for(run.end, end_coord), end_coord, tau)
        } else {
            let p = point_at_length(&pts, &cum, s);
            (b.fresh(p), p, param_at_length(&cum, &params, s))
        };
        let mut piece = vec![prev_pt];
        let mut taus = vec![prev_tau];
        for ((p, &c), &t) in pts.iter().zip(&cum).zip(&params) {
            if c > prev_s && c < s {
                piece.push(*p);
                taus.push(t);
            }
        }
        piece.push(pt);
        taus.push(tau);
        let span = tau - prev_tau;
        let local: Vec<f64> = taus
            .iter()
            .map(|t| if span > EPS_DENOM { clamp01((t - prev_tau) / span) } else { 0.0 })
            .collect();
        let control = fit_quadratic_control(&piece, &local);
        if !b.link(prev_id, id, Handle::Quadratic(control)) {
            trace!("run {} -> {}: piece {} not linked", run.start, run.end, ci);
        }
        prev_id = id;
        prev_pt = pt;
        prev_s = s;
        prev_tau = tau;
    }
}

/// Merge nodes with bit-identical coordinates into the lowest index holding
/// that coordinate. Returns the number of retired nodes.
fn unify_coincident(g: &mut Graph) -> usize {
    let mut first: HashMap<(u64, u64), u32> = HashMap::new();
    let mut merged = 0;
    for index in g.node_indices() {
        let Some(coord) = g.get_node(index) else { continue };
        match first.get(&coord.bits()) {
            Some(&keep) => {
                if g.merge_node_into(index, keep) {
                    merged += 1;
                }
            }
            None => {
                first.insert(coord.bits(), index);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::decode::decode;
    use crate::config::DecoderConfig;

    fn q(x: f64, y: f64) -> Handle {
        Handle::Quadratic(Vec2::new(x, y))
    }

    fn straight(points: &[(f64, f64)]) -> Graph {
        let mut g = Graph::new();
        for &(x, y) in points {
            g.add_node(Vec2::new(x, y));
        }
        for i in 1..points.len() as u32 {
            let a = g.get_node(i - 1).unwrap();
            let b = g.get_node(i).unwrap();
            let m = a.midpoint(b);
            g.link(i - 1, i, q(m.x, m.y));
        }
        g
    }

    #[test]
    fn cut_lengths_skip_exact_end() {
        assert_eq!(cut_lengths(10.0, 2.5), vec![2.5, 5.0, 7.5, 10.0]);
        assert_eq!(cut_lengths(10.0, 3.0), vec![3.0, 6.0, 9.0, 10.0]);
        assert_eq!(cut_lengths(1.0, 5.0), vec![1.0]);
    }

    #[test]
    fn long_distance_keeps_single_edge() {
        let g = decode(&[5, 5, 0, 572, 10, 10, 1, 571, 0, 7, 7, 572], &DecoderConfig::default())
            .unwrap();
        let r = resegment(&g, 1000.0, 50).unwrap();
        assert_eq!(r.node_count(), 2);
        let edges = r.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges, g.edges());
        assert_eq!(edges[0].1, q(7.0, 7.0));
        assert_eq!(r.get_node(1), Some(Vec2::new(10.0, 10.0)));
        assert_eq!(r.get_node(0), Some(Vec2::new(5.0, 5.0)));
        assert!(r.is_consistent());
    }

    #[test]
    fn uncut_curved_edges_keep_their_handles() {
        let mut g = Graph::new();
        let a = g.add_node(Vec2::new(0.0, 0.0));
        let b = g.add_node(Vec2::new(10.0, 0.0));
        let c = g.add_node(Vec2::new(20.0, 0.0));
        let d = g.add_node(Vec2::new(20.0, 10.0));
        let cubic = Handle::Cubic(Vec2::new(3.0, 6.0), Vec2::new(7.0, -2.0));
        g.link(a, b, q(5.0, 8.0));
        g.link(b, c, cubic);
        g.link(b, d, q(15.0, 9.0));
        let r = resegment(&g, 1000.0, 50).unwrap();
        assert_eq!(r.edges(), g.edges());
    }

    #[test]
    fn merged_run_follows_both_curves() {
        // two arcs through a pass-through node, fitted as one quadratic
        let mut g = Graph::new();
        let a = g.add_node(Vec2::new(0.0, 0.0));
        let b = g.add_node(Vec2::new(5.0, 4.0));
        let c = g.add_node(Vec2::new(10.0, 0.0));
        g.link(a, b, q(1.0, 3.0));
        g.link(b, c, q(9.0, 3.0));
        let r = resegment(&g, 1000.0, 50).unwrap();
        let edges = r.edges();
        assert_eq!(edges.len(), 1);
        let ctrl = edges[0].1.centroid();
        assert!((ctrl.x - 5.0).abs() < 1e-9, "control {:?}", ctrl);
        assert!(ctrl.y > 4.0 && ctrl.y < 9.0, "control {:?}", ctrl);
    }

    #[test]
    fn cut_pieces_stay_on_the_curve() {
        let mut g = Graph::new();
        let a = g.add_node(Vec2::new(0.0, 0.0));
        let b = g.add_node(Vec2::new(10.0, 0.0));
        g.link(a, b, q(5.0, 8.0));
        let source = Curve::new(Vec2::new(0.0, 0.0), q(5.0, 8.0), Vec2::new(10.0, 0.0));
        let dense = source.sample(2000);
        let r = resegment(&g, 4.0, 50).unwrap();
        assert!(r.edge_count() >= 3);
        for n in r.nodes() {
            for l in &n.childs {
                let piece = r.edge_curve(n.index, l).unwrap();
                for p in piece.sample(9) {
                    let off = dense.iter().map(|d| d.distance(p)).fold(f64::INFINITY, f64::min);
                    assert!(off < 0.05, "{:?} is {} off the curve", p, off);
                }
            }
        }
    }

    #[test]
    fn straight_edge_is_cut_evenly() {
        let g = straight(&[(0.0, 0.0), (10.0, 0.0)]);
        let r = resegment(&g, 2.5, 50).unwrap();
        assert_eq!(r.node_count(), 5);
        assert_eq!(r.edge_count(), 4);
        let xs: Vec<f64> = r.nodes().map(|n| n.coord.x).collect();
        // kept nodes first, then the interior cuts
        assert_eq!(xs[0], 0.0);
        assert_eq!(xs[1], 10.0);
        for (got, want) in xs[2..].iter().zip([2.5, 5.0, 7.5]) {
            assert!((got - want).abs() < 1e-9, "{} vs {}", got, want);
        }
        assert!(r.is_consistent());
    }

    #[test]
    fn pass_through_nodes_are_absorbed() {
        let g = straight(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let r = resegment(&g, 5.0, 50).unwrap();
        assert_eq!(r.node_count(), 5);
        assert_eq!(r.edge_count(), 4);
        assert_eq!(r.roots().len(), 1);
        assert_eq!(r.sinks().len(), 1);
        assert!(r.is_consistent());
    }

    #[test]
    fn coincident_run_ends_are_unified() {
        let mut g = straight(&[(0.0, 0.0), (10.0, 0.0)]);
        let c = g.add_node(Vec2::new(10.0, 0.0));
        let d = g.add_node(Vec2::new(20.0, 0.0));
        g.link(c, d, q(15.0, 0.0));
        let r = resegment(&g, 100.0, 20).unwrap();
        assert_eq!(r.node_count(), 3);
        assert_eq!(r.edge_count(), 2);
        let mid: Vec<_> = r.nodes().filter(|n| n.coord == Vec2::new(10.0, 0.0)).collect();
        assert_eq!(mid.len(), 1);
        assert_eq!(mid[0].parents.len(), 1);
        assert_eq!(mid[0].childs.len(), 1);
        assert!(r.is_consistent());
    }

    #[test]
    fn closed_loop_of_pass_through_nodes_survives() {
        let mut g = Graph::new();
        let a = g.add_node(Vec2::new(0.0, 0.0));
        let b = g.add_node(Vec2::new(10.0, 0.0));
        let c = g.add_node(Vec2::new(5.0, 8.0));
        g.link(a, b, q(5.0, -1.0));
        g.link(b, c, q(8.0, 4.0));
        g.link(c, a, q(2.0, 4.0));
        let r = resegment(&g, 4.0, 50).unwrap();
        assert!(r.node_count() > 3);
        assert_eq!(r.node_count(), r.edge_count());
        assert!(r.is_consistent());
    }

    #[test]
    fn short_closed_loop_keeps_two_edges() {
        let mut g = Graph::new();
        let a = g.add_node(Vec2::new(0.0, 0.0));
        let b = g.add_node(Vec2::new(10.0, 0.0));
        let c = g.add_node(Vec2::new(5.0, 8.0));
        g.link(a, b, q(5.0, -1.0));
        g.link(b, c, q(8.0, 4.0));
        g.link(c, a, q(2.0, 4.0));
        let r = resegment(&g, 100.0, 50).unwrap();
        assert_eq!(r.node_count(), 2);
        assert_eq!(r.edge_count(), 2);
        assert_eq!(r.get_node(0), Some(Vec2::new(0.0, 0.0)));
        for n in r.nodes() {
            assert_eq!(n.parents.len(), 1);
            assert_eq!(n.childs.len(), 1);
        }
        assert!(r.is_consistent());
    }

    #[test]
    fn param_at_length_interpolates() {
        let cum = [0.0, 1.0, 1.0, 3.0];
        let params = [0.0, 0.5, 1.0, 2.0];
        assert_eq!(param_at_length(&cum, &params, -1.0), 0.0);
        assert_eq!(param_at_length(&cum, &params, 0.5), 0.25);
        assert_eq!(param_at_length(&cum, &params, 2.0), 1.5);
        assert_eq!(param_at_length(&cum, &params, 9.0), 2.0);
    }

    #[test]
    fn isolated_nodes_are_kept() {
        let mut g = Graph::new();
        g.add_node(Vec2::new(3.0, 4.0));
        let r = resegment(&g, 1.0, 50).unwrap();
        assert_eq!(r.node_indices(), vec![0]);
        assert_eq!(r.edge_count(), 0);
    }

    #[test]
    fn bad_distance_is_rejected() {
        let g = Graph::new();
        assert!(resegment(&g, 0.0, 50).is_err());
        assert!(resegment(&g, f64::NAN, 50).is_err());
        assert!(resegment(&g, 1.0, 1).is_err());
    }
}
