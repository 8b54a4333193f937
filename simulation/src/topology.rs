//! Mesh topology graph and builders
//!
//! [`TopologyGraph`] mirrors the twin's node and link maps:
//! - vertices are the registered node ids
//! - arcs are the directed link records, weighted by latency
//!
//! Neighbor, path and component queries treat arcs as undirected, and may
//! pass through link endpoints that were never registered as nodes.
//!
//! [`MeshBuilder`] produces ready-made [`Topology`] values (line, ring,
//! star, full mesh) for scenarios and tests.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

use crate::types::{TwinLink, TwinNode};

/// Adjacency graph backing the twin
#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    vertices: BTreeSet<String>,
    /// source -> target -> weight
    outgoing: BTreeMap<String, BTreeMap<String, f64>>,
    /// target -> sources
    incoming: BTreeMap<String, BTreeSet<String>>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: &str) {
        self.vertices.insert(id.to_string());
    }

    /// Remove a vertex and every arc touching it
    pub fn remove_node(&mut self, id: &str) {
        self.vertices.remove(id);

        if let Some(targets) = self.outgoing.remove(id) {
            for target in targets.keys() {
                if let Some(sources) = self.incoming.get_mut(target) {
                    sources.remove(id);
                    if sources.is_empty() {
                        self.incoming.remove(target);
                    }
                }
            }
        }

        if let Some(sources) = self.incoming.remove(id) {
            for source in &sources {
                if let Some(targets) = self.outgoing.get_mut(source) {
                    targets.remove(id);
                    if targets.is_empty() {
                        self.outgoing.remove(source);
                    }
                }
            }
        }
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.vertices.contains(id)
    }

    /// Registered vertex or endpoint of some arc
    pub fn contains(&self, id: &str) -> bool {
        self.vertices.contains(id) || self.outgoing.contains_key(id) || self.incoming.contains_key(id)
    }

    /// Insert or re-weight the arc `source -> target`
    pub fn add_edge(&mut self, source: &str, target: &str, weight: f64) {
        self.outgoing
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string(), weight);
        self.incoming
            .entry(target.to_string())
            .or_default()
            .insert(source.to_string());
    }

    /// Remove the arc `source -> target`; returns whether it existed
    pub fn remove_edge(&mut self, source: &str, target: &str) -> bool {
        let removed = match self.outgoing.get_mut(source) {
            Some(targets) => {
                let removed = targets.remove(target).is_some();
                if targets.is_empty() {
                    self.outgoing.remove(source);
                }
                removed
            }
            None => false,
        };

        if removed && let Some(sources) = self.incoming.get_mut(target) {
            sources.remove(source);
            if sources.is_empty() {
                self.incoming.remove(target);
            }
        }
        removed
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.outgoing
            .get(source)
            .is_some_and(|targets| targets.contains_key(target))
    }

    pub fn node_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(BTreeMap::len).sum()
    }

    /// Undirected neighbors, sorted, excluding `id` itself
    pub fn neighbors(&self, id: &str) -> BTreeSet<String> {
        let mut neighbors = BTreeSet::new();
        if let Some(targets) = self.outgoing.get(id) {
            neighbors.extend(targets.keys().cloned());
        }
        if let Some(sources) = self.incoming.get(id) {
            neighbors.extend(sources.iter().cloned());
        }
        neighbors.remove(id);
        neighbors
    }

    /// Cheapest arc weight between two vertices in either direction
    fn undirected_weight(&self, a: &str, b: &str) -> Option<f64> {
        let forward = self.outgoing.get(a).and_then(|t| t.get(b)).copied();
        let backward = self.outgoing.get(b).and_then(|t| t.get(a)).copied();
        match (forward, backward) {
            (Some(f), Some(r)) => Some(f.min(r)),
            (w, None) | (None, w) => w,
        }
    }

    /// Copy of the graph with one vertex removed
    pub fn without(&self, id: &str) -> TopologyGraph {
        let mut reduced = self.clone();
        reduced.remove_node(id);
        reduced
    }

    /// Fewest-hops path (BFS), inclusive of both ends
    pub fn shortest_path(&self, source: &str, target: &str) -> Option<Vec<String>> {
        if !self.contains(source) || !self.contains(target) {
            return None;
        }
        if source == target {
            return Some(vec![source.to_string()]);
        }

        let mut parents: BTreeMap<String, String> = BTreeMap::new();
        let mut queue = VecDeque::from([source.to_string()]);
        let mut seen = BTreeSet::from([source.to_string()]);

        while let Some(current) = queue.pop_front() {
            for next in self.neighbors(&current) {
                if !seen.insert(next.clone()) {
                    continue;
                }
                parents.insert(next.clone(), current.clone());
                if next == target {
                    return Some(unwind(&parents, source, target));
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// Lowest total weight path (Dijkstra over latency), with its cost
    pub fn weighted_shortest_path(&self, source: &str, target: &str) -> Option<(Vec<String>, f64)> {
        if !self.contains(source) || !self.contains(target) {
            return None;
        }

        let mut best: BTreeMap<String, f64> = BTreeMap::from([(source.to_string(), 0.0)]);
        let mut parents: BTreeMap<String, String> = BTreeMap::new();
        let mut heap = BinaryHeap::from([Frontier {
            cost: 0.0,
            vertex: source.to_string(),
        }]);

        while let Some(Frontier { cost, vertex }) = heap.pop() {
            if vertex == target {
                return Some((unwind(&parents, source, target), cost));
            }
            if best.get(&vertex).is_some_and(|&known| cost > known) {
                continue;
            }
            for next in self.neighbors(&vertex) {
                let Some(weight) = self.undirected_weight(&vertex, &next) else {
                    continue;
                };
                let candidate = cost + weight.max(0.0);
                if best.get(&next).is_none_or(|&known| candidate < known) {
                    best.insert(next.clone(), candidate);
                    parents.insert(next.clone(), vertex.clone());
                    heap.push(Frontier {
                        cost: candidate,
                        vertex: next,
                    });
                }
            }
        }
        None
    }

    pub fn has_path(&self, source: &str, target: &str) -> bool {
        self.shortest_path(source, target).is_some()
    }

    /// Connected components over every known vertex, largest first
    pub fn connected_components(&self) -> Vec<BTreeSet<String>> {
        let mut all: BTreeSet<&String> = self.vertices.iter().collect();
        all.extend(self.outgoing.keys());
        all.extend(self.incoming.keys());

        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut components = Vec::new();

        for start in all {
            if seen.contains(start) {
                continue;
            }
            let mut component = BTreeSet::new();
            let mut queue = VecDeque::from([start.clone()]);
            seen.insert(start.clone());
            while let Some(current) = queue.pop_front() {
                for next in self.neighbors(&current) {
                    if seen.insert(next.clone()) {
                        queue.push_back(next);
                    }
                }
                component.insert(current);
            }
            components.push(component);
        }

        components.sort_by(|a, b| b.len().cmp(&a.len()));
        components
    }
}

fn unwind(parents: &BTreeMap<String, String>, source: &str, target: &str) -> Vec<String> {
    let mut path = vec![target.to_string()];
    let mut current = target;
    while current != source {
        match parents.get(current) {
            Some(parent) => {
                path.push(parent.clone());
                current = parent;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Min-heap entry for Dijkstra
#[derive(Debug, PartialEq)]
struct Frontier {
    cost: f64,
    vertex: String,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A batch of nodes and links ready to load into a twin
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub nodes: Vec<TwinNode>,
    pub links: Vec<TwinLink>,
}

impl Topology {
    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.node_id.clone()).collect()
    }
}

/// Builder for common mesh shapes
pub struct MeshBuilder {
    ids: Vec<String>,
}

impl MeshBuilder {
    /// `count` nodes named `node-0`, `node-1`, ...
    pub fn new(count: usize) -> Self {
        Self {
            ids: (0..count).map(|i| format!("node-{i}")).collect(),
        }
    }

    /// Nodes with explicit ids, in order
    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    fn nodes(&self) -> Vec<TwinNode> {
        self.ids.iter().map(TwinNode::new).collect()
    }

    /// A - B - C - D - ...
    pub fn line(self) -> Topology {
        let links = self
            .ids
            .windows(2)
            .map(|pair| TwinLink::new(&pair[0], &pair[1]))
            .collect();
        Topology {
            nodes: self.nodes(),
            links,
        }
    }

    /// A - B - ... - Z - A
    pub fn ring(self) -> Topology {
        let mut topology = Self::with_ids(self.ids.clone()).line();
        if self.ids.len() > 2
            && let (Some(first), Some(last)) = (self.ids.first(), self.ids.last())
        {
            topology.links.push(TwinLink::new(last, first));
        }
        topology
    }

    /// First id in the center, linked to every other
    pub fn star(self) -> Topology {
        let links = match self.ids.split_first() {
            Some((center, leaves)) => leaves.iter().map(|leaf| TwinLink::new(center, leaf)).collect(),
            None => Vec::new(),
        };
        Topology {
            nodes: self.nodes(),
            links,
        }
    }

    /// Every pair linked once (lower index -> higher index)
    pub fn full_mesh(self) -> Topology {
        let mut links = Vec::new();
        for (i, source) in self.ids.iter().enumerate() {
            for target in &self.ids[i + 1..] {
                links.push(TwinLink::new(source, target));
            }
        }
        Topology {
            nodes: self.nodes(),
            links,
        }
    }
}

/// Create a custom topology from an edge list; nodes are created for every endpoint
pub fn from_edges(edges: &[(&str, &str)]) -> Topology {
    let mut ids: Vec<String> = Vec::new();
    for (a, b) in edges {
        for id in [a, b] {
            if !ids.iter().any(|known| known == id) {
                ids.push(id.to_string());
            }
        }
    }
    Topology {
        nodes: ids.iter().map(TwinNode::new).collect(),
        links: edges.iter().map(|(a, b)| TwinLink::new(*a, *b)).collect(),
    }
}
