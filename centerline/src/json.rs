use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{Handle, Vec2};
use crate::Graph;

const VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct NodeSer {
    id: u32,
    x: f64,
    y: f64,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum EdgeSerKind {
    Quadratic { c1: Vec2 },
    Cubic { c1: Vec2, c2: Vec2 },
}

#[derive(Serialize, Deserialize)]
struct EdgeSer {
    a: u32,
    b: u32,
    #[serde(flatten)]
    kind: EdgeSerKind,
}

#[derive(Serialize)]
struct Doc {
    version: u32,
    nodes: Vec<NodeSer>,
    edges: Vec<EdgeSer>,
}

#[derive(Deserialize)]
struct DocDe {
    version: Option<u32>,
    #[serde(default)]
    nodes: Vec<NodeSer>,
    #[serde(default)]
    edges: Vec<EdgeSer>,
}

pub fn to_json_impl(g: &Graph) -> Value {
    let nodes = g
        .nodes()
        .map(|n| NodeSer { id: n.index, x: n.coord.x, y: n.coord.y })
        .collect();
    let edges = g
        .edges()
        .into_iter()
        .map(|(a, h, b)| EdgeSer {
            a,
            b,
            kind: match h {
                Handle::Quadratic(c1) => EdgeSerKind::Quadratic { c1 },
                Handle::Cubic(c1, c2) => EdgeSerKind::Cubic { c1, c2 },
            },
        })
        .collect();
    serde_json::to_value(Doc { version: VERSION, nodes, edges }).unwrap_or(Value::Null)
}

/// Nodes keep their ids as slot indices. Edges go through [`Graph::link`], so
/// self-loops and edges to unknown ids are skipped.
pub fn from_json_impl(v: Value) -> Result<Graph> {
    let doc: DocDe = serde_json::from_value(v)?;
    let version = doc.version.unwrap_or(VERSION);
    if version != VERSION {
        return Err(Error::InvalidGraph(format!("unsupported version {}", version)));
    }
    let mut g = Graph::new();
    for n in doc.nodes {
        g.insert_node(n.id, Vec2::new(n.x, n.y));
    }
    for e in doc.edges {
        let handle = match e.kind {
            EdgeSerKind::Quadratic { c1 } => Handle::Quadratic(c1),
            EdgeSerKind::Cubic { c1, c2 } => Handle::Cubic(c1, c2),
        };
        if !g.link(e.a, e.b, handle) {
            debug!("edge {} -> {} skipped", e.a, e.b);
        }
    }
    Ok(g)
}
