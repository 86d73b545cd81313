use crate::graph::identity::resolve_id;
use crate::graph::traversal::containment_path;
use crate::types::{BuildStats, Edge, ModelObject, ObjectId};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Wrapper around petgraph DiGraph for a built object graph.
///
/// Node index equals object index; each edge weight is the position of the
/// edge in [`ObjectGraph::edges`].
#[derive(Debug, Clone)]
pub struct ObjectGraph {
    graph: DiGraph<ObjectId, usize>,
    objects: Vec<ModelObject>,
    edges: Vec<Edge>,
    local_ids: HashMap<String, ObjectId>,
    resolved_ids: HashMap<String, ObjectId>,
    stats: BuildStats,
}

/// One edge touching an object, seen from that object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incident {
    pub edge: usize,
    pub neighbor: ObjectId,
    /// True when the edge points away from the object
    pub outgoing: bool,
}

impl ObjectGraph {
    pub(crate) fn new(objects: Vec<ModelObject>, edges: Vec<Edge>, stats: BuildStats) -> Self {
        let mut graph = DiGraph::with_capacity(objects.len(), edges.len());
        for object in &objects {
            graph.add_node(object.index);
        }
        for (position, edge) in edges.iter().enumerate() {
            graph.add_edge(
                NodeIndex::new(edge.source.index()),
                NodeIndex::new(edge.target.index()),
                position,
            );
        }

        let local_ids = objects
            .iter()
            .map(|o| (o.local_id.clone(), o.index))
            .collect();

        // First object wins, like the xmi identity map
        let mut resolved_ids = HashMap::new();
        for object in &objects {
            resolved_ids
                .entry(resolve_id(object).to_string())
                .or_insert(object.index);
        }

        Self {
            graph,
            objects,
            edges,
            local_ids,
            resolved_ids,
            stats,
        }
    }

    /// Get the number of objects in the graph
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of edges in the graph
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All objects in preorder
    pub fn objects(&self) -> &[ModelObject] {
        &self.objects
    }

    /// All edges in creation order: containment edges first, then references
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Object for an id produced by this graph
    pub fn object(&self, id: ObjectId) -> &ModelObject {
        &self.objects[id.index()]
    }

    pub fn get(&self, id: ObjectId) -> Option<&ModelObject> {
        self.objects.get(id.index())
    }

    pub fn roots(&self) -> impl Iterator<Item = &ModelObject> + '_ {
        self.objects.iter().filter(|o| o.is_root())
    }

    pub fn find_by_local_id(&self, local_id: &str) -> Option<ObjectId> {
        self.local_ids.get(local_id).copied()
    }

    /// Lookup by `resolve_id`
    pub fn find_by_id(&self, id: &str) -> Option<ObjectId> {
        self.resolved_ids.get(id).copied()
    }

    /// Every edge touching `id`, in both directions, in edge-creation order
    pub fn incident_edges(&self, id: ObjectId) -> Vec<Incident> {
        let node = NodeIndex::new(id.index());
        let mut incident: Vec<Incident> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| Incident {
                edge: *e.weight(),
                neighbor: self.graph[e.target()],
                outgoing: true,
            })
            .chain(
                self.graph
                    .edges_directed(node, Direction::Incoming)
                    .map(|e| Incident {
                        edge: *e.weight(),
                        neighbor: self.graph[e.source()],
                        outgoing: false,
                    }),
            )
            .collect();

        // petgraph lists adjacency newest first; a self-loop shows up twice
        incident.sort_by_key(|i| (i.edge, !i.outgoing));
        incident.dedup_by_key(|i| i.edge);
        incident
    }

    /// Containment ancestors of an object, nearest first
    pub fn ancestors(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut chain = Vec::new();
        let mut current = self.object(id).parent();
        while let Some(parent) = current {
            chain.push(parent);
            current = self.object(parent).parent();
        }
        chain
    }

    /// SHA-256 digest over object identity, paths and edges, in preorder
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for object in &self.objects {
            hasher.update(object.local_id.as_bytes());
            hasher.update([0u8]);
            hasher.update(object.eclass.as_bytes());
            hasher.update([0u8]);
            hasher.update(object.xmi_id.as_deref().unwrap_or("").as_bytes());
            hasher.update([0u8]);
            hasher.update(containment_path(self, object.index).as_bytes());
            hasher.update([b'\n']);
        }
        for edge in &self.edges {
            let line = format!(
                "{}\t{}\t{}\t{}\n",
                edge.source.index(),
                edge.feature,
                edge.target.index(),
                edge.containment
            );
            hasher.update(line.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Get graph statistics
    pub fn get_statistics(&self) -> GraphStatistics {
        let total_nodes = self.node_count();
        let total_edges = self.edge_count();
        let root_nodes = self.roots().count();
        let leaf_nodes = self
            .objects
            .iter()
            .filter(|o| o.containment_children.is_empty())
            .count();

        let average_degree = if total_nodes > 0 {
            (2 * total_edges) as f64 / total_nodes as f64
        } else {
            0.0
        };

        GraphStatistics {
            total_nodes,
            total_edges,
            leaf_nodes,
            root_nodes,
            average_degree,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub leaf_nodes: usize,
    pub root_nodes: usize,
    pub average_degree: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{oid, sample_graph};

    #[test]
    fn test_lookup_by_local_and_resolved_id() {
        let (_, graph) = sample_graph();

        assert_eq!(graph.find_by_local_id("o3"), graph.find_by_id("_bc_account"));
        assert_eq!(graph.find_by_id("o2"), Some(ObjectId(1)));
        assert_eq!(graph.find_by_local_id("o11"), None);
        assert_eq!(graph.roots().count(), 1);
    }

    #[test]
    fn test_incident_edges_in_creation_order() {
        let (_, graph) = sample_graph();
        let account = oid(&graph, "o3");
        let incident = graph.incident_edges(account);

        let positions: Vec<usize> = incident.iter().map(|i| i.edge).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);

        // Containment from o2, two children, then the inbound type reference from o7
        let neighbors: Vec<(ObjectId, bool)> = incident.iter().map(|i| (i.neighbor, i.outgoing)).collect();
        assert_eq!(
            neighbors,
            vec![
                (oid(&graph, "o2"), false),
                (oid(&graph, "o4"), true),
                (oid(&graph, "o5"), true),
                (oid(&graph, "o7"), false),
            ]
        );
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let (_, graph) = sample_graph();
        assert_eq!(
            graph.ancestors(oid(&graph, "o5")),
            vec![oid(&graph, "o3"), oid(&graph, "o2"), oid(&graph, "o1")]
        );
        assert!(graph.ancestors(oid(&graph, "o1")).is_empty());
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let (_, graph) = sample_graph();
        let fingerprint = graph.fingerprint();
        assert_eq!(fingerprint.len(), 64);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_get_statistics() {
        let (_, graph) = sample_graph();
        let stats = graph.get_statistics();

        assert_eq!(stats.total_nodes, 10);
        assert_eq!(stats.total_edges, 15);
        assert_eq!(stats.root_nodes, 1);
        assert_eq!(stats.leaf_nodes, 6);
        assert!((stats.average_degree - 3.0).abs() < f64::EPSILON);
    }
}
