use crate::graph::identity::resolve_id;
use crate::graph::object_graph::ObjectGraph;
use crate::types::{ModelObject, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

/// Name-keyed containment path, e.g. `/Repository[0]/dataDictionary[0]`
pub fn containment_path(graph: &ObjectGraph, id: ObjectId) -> String {
    let mut segments = Vec::new();
    let mut current = graph.object(id);
    loop {
        match &current.container {
            Some(container) => {
                segments.push(format!("/{}[{}]", container.feature, container.index));
                current = graph.object(container.parent);
            }
            None => {
                segments.push(format!("/{}[{}]", current.eclass, current.root_position.unwrap_or(0)));
                break;
            }
        }
    }
    segments.reverse();
    segments.concat()
}

/// Id-keyed containment path: `resolve_id` of each object from the root down
pub fn containment_id_path(graph: &ObjectGraph, id: ObjectId) -> String {
    let mut chain = vec![id];
    chain.extend(graph.ancestors(id));
    chain
        .iter()
        .rev()
        .map(|object| format!("/{}", resolve_id(graph.object(*object))))
        .collect()
}

/// Which way the underlying edge points, relative to the hop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HopDirection {
    /// The edge runs from the predecessor to the admitted object
    Forward,
    /// The edge runs from the admitted object back to the predecessor
    Backward,
}

/// BFS predecessor link of an admitted object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    pub from: ObjectId,
    pub to: ObjectId,
    pub feature: String,
    pub containment: bool,
    pub direction: HopDirection,
    pub edge: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionMetrics {
    pub start_nodes: usize,
    pub nodes_seen: usize,
    pub edges_traversed: usize,
    pub loops_detected: usize,
    pub blocked_by_class: usize,
    pub max_depth: usize,
}

/// Result of a neighborhood expansion
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    seeds: Vec<ObjectId>,
    order: Vec<ObjectId>,
    depths: HashMap<ObjectId, usize>,
    predecessors: HashMap<ObjectId, Hop>,
    metrics: ExpansionMetrics,
}

impl Expansion {
    pub fn seeds(&self) -> &[ObjectId] {
        &self.seeds
    }

    /// Admitted objects in admission order
    pub fn admitted(&self) -> &[ObjectId] {
        &self.order
    }

    /// Admitted objects in preorder
    pub fn admitted_set(&self) -> BTreeSet<ObjectId> {
        self.order.iter().copied().collect()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.depths.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn depth_of(&self, id: ObjectId) -> Option<usize> {
        self.depths.get(&id).copied()
    }

    pub fn predecessor(&self, id: ObjectId) -> Option<&Hop> {
        self.predecessors.get(&id)
    }

    pub fn metrics(&self) -> &ExpansionMetrics {
        &self.metrics
    }

    /// Hops from the nearest seed down to `id`; empty for a seed
    pub fn path_to(&self, id: ObjectId) -> Option<Vec<&Hop>> {
        if !self.contains(id) {
            return None;
        }
        let mut hops = Vec::new();
        let mut current = id;
        while let Some(hop) = self.predecessors.get(&current) {
            hops.push(hop);
            current = hop.from;
        }
        hops.reverse();
        Some(hops)
    }

    /// `Class[id] -feature-> Class[id] <-feature- Class[id]`
    pub fn render_path(&self, graph: &ObjectGraph, id: ObjectId) -> Option<String> {
        let hops = self.path_to(id)?;
        let start = hops.first().map(|hop| hop.from).unwrap_or(id);

        let mut rendered = label(graph.object(start));
        for hop in hops {
            let arrow = match hop.direction {
                HopDirection::Forward => format!(" -{}-> ", hop.feature),
                HopDirection::Backward => format!(" <-{}- ", hop.feature),
            };
            rendered.push_str(&arrow);
            rendered.push_str(&label(graph.object(hop.to)));
        }
        Some(rendered)
    }

    /// `id/id/id`
    pub fn render_id_path(&self, graph: &ObjectGraph, id: ObjectId) -> Option<String> {
        let hops = self.path_to(id)?;
        let start = hops.first().map(|hop| hop.from).unwrap_or(id);

        let ids: Vec<&str> = std::iter::once(start)
            .chain(hops.iter().map(|hop| hop.to))
            .map(|object| resolve_id(graph.object(object)))
            .collect();
        Some(ids.join("/"))
    }
}

fn label(object: &ModelObject) -> String {
    format!("{}[{}]", object.eclass, resolve_id(object))
}

/// Undirected BFS over containment and reference edges.
///
/// `max_depth < 0` is unbounded. When `allowed_classes` is given, hops into
/// objects of other classes are blocked; seeds are always admitted.
pub fn expand(
    graph: &ObjectGraph,
    seeds: &[ObjectId],
    max_depth: i64,
    allowed_classes: Option<&BTreeSet<String>>,
) -> Expansion {
    let mut expansion = Expansion::default();

    for &seed in seeds {
        if !expansion.depths.contains_key(&seed) {
            expansion.depths.insert(seed, 0);
            expansion.order.push(seed);
            expansion.seeds.push(seed);
        }
    }
    expansion.metrics.start_nodes = expansion.seeds.len();

    let mut frontier = expansion.seeds.clone();
    let mut level = 0usize;

    while !frontier.is_empty() && (max_depth < 0 || (level as i64) < max_depth) {
        let mut next = Vec::new();

        for current in frontier {
            let arrival = expansion.predecessors.get(&current).map(|hop| hop.edge);

            for incident in graph.incident_edges(current) {
                if Some(incident.edge) == arrival {
                    continue;
                }
                expansion.metrics.edges_traversed += 1;

                let neighbor = incident.neighbor;
                if expansion.depths.contains_key(&neighbor) {
                    expansion.metrics.loops_detected += 1;
                    continue;
                }

                let class = &graph.object(neighbor).eclass;
                if let Some(allowed) = allowed_classes {
                    if !allowed.contains(class) {
                        debug!("Expansion blocked at {} ({})", graph.object(neighbor).local_id, class);
                        expansion.metrics.blocked_by_class += 1;
                        continue;
                    }
                }

                let edge = &graph.edges()[incident.edge];
                expansion.depths.insert(neighbor, level + 1);
                expansion.order.push(neighbor);
                expansion.predecessors.insert(
                    neighbor,
                    Hop {
                        from: current,
                        to: neighbor,
                        feature: edge.feature.clone(),
                        containment: edge.containment,
                        direction: if incident.outgoing {
                            HopDirection::Forward
                        } else {
                            HopDirection::Backward
                        },
                        edge: incident.edge,
                    },
                );
                next.push(neighbor);
            }
        }

        level += 1;
        if !next.is_empty() {
            expansion.metrics.max_depth = level;
        }
        frontier = next;
    }

    expansion.metrics.nodes_seen = expansion.order.len();

    info!(
        "Expansion: start_nodes={} nodes_seen={} edges_traversed={} loops_detected={} blocked_by_class={} max_depth={}",
        expansion.metrics.start_nodes,
        expansion.metrics.nodes_seen,
        expansion.metrics.edges_traversed,
        expansion.metrics.loops_detected,
        expansion.metrics.blocked_by_class,
        expansion.metrics.max_depth
    );

    expansion
}

/// Expand from every object satisfying `is_seed`, in preorder
pub fn expand_matching<F>(
    graph: &ObjectGraph,
    is_seed: F,
    max_depth: i64,
    allowed_classes: Option<&BTreeSet<String>>,
) -> Expansion
where
    F: Fn(&ModelObject) -> bool,
{
    let seeds: Vec<ObjectId> = graph
        .objects()
        .iter()
        .filter(|object| is_seed(object))
        .map(|object| object.index)
        .collect();
    expand(graph, &seeds, max_depth, allowed_classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::InstanceDocument;
    use crate::fixtures::{oid, sample_graph, sample_metamodel};
    use crate::graph::build_object_graph;

    fn local_ids(graph: &ObjectGraph, ids: &[ObjectId]) -> Vec<String> {
        ids.iter().map(|id| graph.object(*id).local_id.clone()).collect()
    }

    fn classes(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_containment_paths() {
        let (_, graph) = sample_graph();
        let person = oid(&graph, "o8");

        assert_eq!(
            containment_path(&graph, person),
            "/Repository[0]/dataDictionary[0]/topLevelDictionaryEntry[2]"
        );
        assert_eq!(containment_id_path(&graph, person), "/_repo/o2/_bc_person");
        assert_eq!(containment_path(&graph, oid(&graph, "o1")), "/Repository[0]");
        assert_eq!(
            containment_path(&graph, oid(&graph, "o7")),
            "/Repository[0]/dataDictionary[0]/topLevelDictionaryEntry[1]/element[0]"
        );
    }

    #[test]
    fn test_depth_zero_returns_seeds() {
        let (_, graph) = sample_graph();
        let seeds = [oid(&graph, "o3"), oid(&graph, "o8")];
        let expansion = expand(&graph, &seeds, 0, None);

        assert_eq!(expansion.admitted(), &seeds);
        assert_eq!(expansion.metrics().edges_traversed, 0);
        assert_eq!(expansion.metrics().max_depth, 0);
    }

    #[test]
    fn test_depth_one_treats_edges_as_undirected() {
        let (_, graph) = sample_graph();
        let expansion = expand(&graph, &[oid(&graph, "o3")], 1, None);

        assert_eq!(local_ids(&graph, expansion.admitted()), vec!["o3", "o2", "o4", "o5", "o7"]);
        assert_eq!(expansion.depth_of(oid(&graph, "o7")), Some(1));

        let hop = expansion.predecessor(oid(&graph, "o7")).unwrap();
        assert_eq!(hop.direction, HopDirection::Backward);
        assert_eq!(hop.feature, "businessElementType");
    }

    #[test]
    fn test_inbound_reference_makes_a_neighbor() {
        let (_, graph) = sample_graph();
        let expansion = expand(&graph, &[oid(&graph, "o10")], 1, None);

        assert_eq!(local_ids(&graph, expansion.admitted()), vec!["o10", "o2", "o4"]);
    }

    #[test]
    fn test_unbounded_depth_reaches_component() {
        let (_, graph) = sample_graph();
        let expansion = expand(&graph, &[oid(&graph, "o3")], -1, None);

        assert_eq!(expansion.len(), 10);
        assert_eq!(expansion.metrics().nodes_seen, 10);
        // 15 edges, 9 of them used as arrival edges, each traversed from both ends otherwise
        assert_eq!(expansion.metrics().edges_traversed, 15 * 2 - 9);
        assert_eq!(expansion.metrics().loops_detected, 15 * 2 - 9 - 9);
    }

    #[test]
    fn test_deeper_expansion_only_grows_until_component() {
        let (_, graph) = sample_graph();

        for object in graph.objects() {
            let seed = [object.index];
            let component = expand(&graph, &seed, -1, None).admitted_set();
            let mut previous = expand(&graph, &seed, 0, None).admitted_set();
            assert_eq!(previous, BTreeSet::from([object.index]));

            for depth in 1..=graph.node_count() as i64 {
                let current = expand(&graph, &seed, depth, None).admitted_set();
                assert!(previous.is_subset(&current), "{} at depth {}", object.local_id, depth);
                previous = current;
            }
            assert_eq!(previous, component, "{}", object.local_id);
        }
    }

    #[test]
    fn test_unbounded_expansion_stays_in_its_component() {
        let metamodel = sample_metamodel();
        let instance: InstanceDocument = serde_json::from_value(serde_json::json!({
            "roots": [
                {
                    "eClass": "DataDictionary",
                    "contents": {
                        "topLevelDictionaryEntry": [{"eClass": "DataType", "xmi:id": "_dt_a"}]
                    }
                },
                {
                    "eClass": "DataDictionary",
                    "contents": {
                        "topLevelDictionaryEntry": [{
                            "eClass": "BusinessComponent",
                            "xmi:id": "_bc_b",
                            "contents": {"element": [{"eClass": "BusinessAttribute"}]}
                        }]
                    }
                },
                {"eClass": "DataType", "xmi:id": "_dt_c"}
            ]
        }))
        .unwrap();
        let graph = build_object_graph(&metamodel, &instance.roots);
        assert_eq!(graph.roots().count(), 3);

        let expansion = expand(&graph, &[oid(&graph, "o4")], -1, None);
        let admitted: BTreeSet<String> = local_ids(&graph, expansion.admitted()).into_iter().collect();
        assert_eq!(admitted, classes(&["o3", "o4", "o5"]));

        let lone = expand(&graph, &[oid(&graph, "o6")], -1, None);
        assert_eq!(local_ids(&graph, lone.admitted()), vec!["o6"]);
    }

    #[test]
    fn test_allowed_classes_block_hops_but_not_seeds() {
        let (_, graph) = sample_graph();
        let allowed = classes(&["BusinessComponent", "BusinessAttribute", "BusinessAssociationEnd"]);
        let expansion = expand(&graph, &[oid(&graph, "o3"), oid(&graph, "o10")], -1, Some(&allowed));

        assert!(expansion.contains(oid(&graph, "o10")));
        for id in expansion.admitted() {
            let object = graph.object(*id);
            assert!(allowed.contains(&object.eclass) || expansion.seeds().contains(id));
        }

        let admitted: BTreeSet<String> = local_ids(&graph, expansion.admitted()).into_iter().collect();
        let expected: BTreeSet<String> = ["o3", "o4", "o5", "o6", "o7", "o8", "o10"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(admitted, expected);
        assert!(expansion.metrics().blocked_by_class > 0);
    }

    #[test]
    fn test_rendered_bfs_paths() {
        let (_, graph) = sample_graph();
        let allowed = classes(&["BusinessComponent", "BusinessAttribute", "BusinessAssociationEnd"]);
        let expansion = expand(&graph, &[oid(&graph, "o3")], -1, Some(&allowed));
        let party = oid(&graph, "o6");

        assert_eq!(
            expansion.render_path(&graph, party).unwrap(),
            "BusinessComponent[_bc_account] -element-> BusinessAssociationEnd[_bae_owner] \
             -businessElementType-> BusinessComponent[_bc_party]"
        );
        assert_eq!(
            expansion.render_id_path(&graph, party).unwrap(),
            "_bc_account/_bae_owner/_bc_party"
        );

        let person = oid(&graph, "o8");
        assert!(expansion
            .render_path(&graph, person)
            .unwrap()
            .ends_with("BusinessComponent[_bc_party] <-superType- BusinessComponent[_bc_person]"));

        let seed = oid(&graph, "o3");
        assert_eq!(expansion.render_id_path(&graph, seed).unwrap(), "_bc_account");
        assert!(expansion.render_path(&graph, oid(&graph, "o1")).is_none());
    }

    #[test]
    fn test_expand_matching_uses_predicate_seeds() {
        let (_, graph) = sample_graph();
        let expansion = expand_matching(&graph, |o| o.eclass == "DataType", 0, None);

        assert_eq!(local_ids(&graph, expansion.seeds()), vec!["o10"]);
    }
}
