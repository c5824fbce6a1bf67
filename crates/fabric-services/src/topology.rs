//! Topology and router: node registry, links, and hop-count routing.
//!
//! Routing ignores bandwidth: the route is the path with the fewest hops.
//! Among equal-length paths, neighbors are explored in id order, so the
//! lexicographically smallest route wins.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use dashmap::DashMap;

use crate::node::StorageNode;

/// Undirected adjacency, neighbors sorted by id.
pub type Adjacency = BTreeMap<String, BTreeSet<String>>;

/// The node registry. Shared between the orchestrator, the driver, and the API.
#[derive(Default)]
pub struct Topology {
    nodes: DashMap<String, Arc<StorageNode>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. A node with the same id is replaced.
    pub fn add_node(&self, node: StorageNode) -> Arc<StorageNode> {
        let node = Arc::new(node);
        if self
            .nodes
            .insert(node.id().to_string(), node.clone())
            .is_some()
        {
            tracing::warn!(node = %node.id(), "replaced existing node with the same id");
        }
        node
    }

    pub fn node(&self, id: &str) -> Option<Arc<StorageNode>> {
        self.nodes.get(id).map(|n| n.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// All nodes, sorted by id.
    pub fn nodes(&self) -> Vec<Arc<StorageNode>> {
        let mut nodes: Vec<Arc<StorageNode>> =
            self.nodes.iter().map(|e| e.value().clone()).collect();
        nodes.sort_by(|a, b| a.id().cmp(b.id()));
        nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Link `a` and `b`, recording `bandwidth_bps` on both ends.
    ///
    /// Returns false, changing nothing, unless both nodes are registered.
    pub async fn connect_nodes(&self, a: &str, b: &str, bandwidth_bps: u64) -> bool {
        let (Some(node_a), Some(node_b)) = (self.node(a), self.node(b)) else {
            tracing::warn!(a, b, "cannot link unknown node");
            return false;
        };
        node_a.add_connection(b, bandwidth_bps).await;
        node_b.add_connection(a, bandwidth_bps).await;
        true
    }

    /// Fewest-hop route from `source` to `target`, both ends included.
    pub async fn route(&self, source: &str, target: &str) -> Option<Vec<String>> {
        if !self.contains(source) || !self.contains(target) {
            return None;
        }

        let adjacency = self.adjacency().await;
        match shortest_path(&adjacency, source, target) {
            Some(path) => {
                tracing::debug!(route = %path.join(" → "), "route computed");
                Some(path)
            }
            None => {
                tracing::warn!(source, target, "no route");
                None
            }
        }
    }

    /// Undirected graph over registered nodes. A link recorded on either
    /// end is an edge; links to unregistered ids are ignored.
    pub async fn adjacency(&self) -> Adjacency {
        let nodes = self.nodes();
        let mut adjacency: Adjacency = nodes
            .iter()
            .map(|n| (n.id().to_string(), BTreeSet::new()))
            .collect();

        for node in &nodes {
            for neighbor in node.connections().await {
                if neighbor == node.id() || !adjacency.contains_key(&neighbor) {
                    continue;
                }
                adjacency
                    .entry(node.id().to_string())
                    .or_default()
                    .insert(neighbor.clone());
                adjacency
                    .entry(neighbor)
                    .or_default()
                    .insert(node.id().to_string());
            }
        }
        adjacency
    }
}

/// Breadth-first search over `adjacency`.
pub fn shortest_path(adjacency: &Adjacency, source: &str, target: &str) -> Option<Vec<String>> {
    if !adjacency.contains_key(source) || !adjacency.contains_key(target) {
        return None;
    }
    if source == target {
        return Some(vec![source.to_string()]);
    }

    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::from([source]);
    parent.insert(source, source);

    while let Some(current) = queue.pop_front() {
        let Some(neighbors) = adjacency.get(current) else {
            continue;
        };
        for next in neighbors {
            if parent.contains_key(next.as_str()) {
                continue;
            }
            parent.insert(next, current);
            if next == target {
                let mut path = vec![target.to_string()];
                let mut cursor = target;
                while cursor != source {
                    cursor = parent[cursor];
                    path.push(cursor.to_string());
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }
    None
}
