use log::trace;

use crate::model::Link;
use crate::Graph;

/// Collapse every pass-through node (one parent, one child) into a direct
/// parent -> child edge whose handle is the average of the two handles.
///
/// Nodes are visited in index order against the current edge lists. A node
/// is left in place when its parent and child are the same node, or when the
/// parent already has the averaged edge to the child. Degrees of every other
/// node are unchanged, so a second run finds nothing left to do.
///
/// Returns the number of removed nodes.
pub fn simplify_junctions(g: &mut Graph) -> usize {
    let mut removed = 0;
    for index in g.node_indices() {
        let (inc, out) = match g.node(index) {
            Some(n) if n.facts().is_pass_through => (n.parents[0], n.childs[0]),
            _ => continue,
        };
        let (parent, child) = (inc.node, out.node);
        if parent == child {
            continue;
        }
        let merged = Link { node: child, handle: inc.handle.average(&out.handle) };
        let exists = g.node(parent).map_or(true, |p| p.childs.contains(&merged));
        if exists {
            continue;
        }
        g.unlink_all(parent, index);
        g.unlink_all(index, child);
        g.link(parent, child, merged.handle);
        g.remove_node(index);
        trace!("collapsed pass-through node {} into {} -> {}", index, parent, child);
        removed += 1;
    }
    removed
}
