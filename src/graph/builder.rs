use crate::artifacts::InstanceNode;
use crate::graph::identity::local_id_for;
use crate::graph::object_graph::ObjectGraph;
use crate::metamodel::{MetamodelIndex, OwnedReference};
use crate::types::{BuildStats, Container, Edge, ModelObject, ObjectId, Value};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Build the object graph for the given document roots.
pub fn build_object_graph(metamodel: &MetamodelIndex, roots: &[InstanceNode]) -> ObjectGraph {
    GraphBuilder::new(metamodel).build(roots)
}

/// Walks loaded roots into a canonical object + edge graph in two passes
pub struct GraphBuilder<'m> {
    metamodel: &'m MetamodelIndex,
}

struct Pending<'d> {
    node: &'d InstanceNode,
    container: Option<Container>,
    root_position: Option<usize>,
}

impl<'m> GraphBuilder<'m> {
    pub fn new(metamodel: &'m MetamodelIndex) -> Self {
        Self { metamodel }
    }

    pub fn build(&self, roots: &[InstanceNode]) -> ObjectGraph {
        let mut objects: Vec<ModelObject> = Vec::new();
        let mut nodes: Vec<&InstanceNode> = Vec::new();
        let mut edges = Vec::new();
        let mut stats = BuildStats::default();
        let mut identity: HashMap<&str, ObjectId> = HashMap::new();
        let mut unknown_classes = BTreeSet::new();

        // First pass: preorder containment walk assigning local ids
        info!("Building object graph - containment pass over {} roots", roots.len());
        let mut stack: Vec<Pending> = roots
            .iter()
            .enumerate()
            .rev()
            .map(|(position, node)| Pending {
                node,
                container: None,
                root_position: Some(position),
            })
            .collect();

        while let Some(pending) = stack.pop() {
            let id = ObjectId(objects.len());
            let node = pending.node;

            if let Some(container) = &pending.container {
                edges.push(Edge {
                    source: container.parent,
                    feature: container.feature.clone(),
                    target: id,
                    containment: true,
                });
                objects[container.parent.index()].containment_children.push(id);
                stats.containment_edges += 1;
            }

            if let Some(xmi_id) = node.xmi_id.as_deref().filter(|x| !x.is_empty()) {
                match identity.entry(xmi_id) {
                    Entry::Occupied(existing) => {
                        warn!(
                            "Duplicate xmi:id {} on {}; references resolve to {}",
                            xmi_id,
                            local_id_for(id.index()),
                            local_id_for(existing.get().index())
                        );
                        stats.duplicate_ids += 1;
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(id);
                    }
                }
            }

            // Children are pushed in reverse so they pop in document order
            for (feature, children) in self.containment_order(node).into_iter().rev() {
                for (index, child) in children.iter().enumerate().rev() {
                    stack.push(Pending {
                        node: child,
                        container: Some(Container {
                            parent: id,
                            feature: feature.to_string(),
                            index,
                        }),
                        root_position: None,
                    });
                }
            }

            objects.push(self.make_object(id, node, pending.container, pending.root_position, &mut unknown_classes));
            nodes.push(node);
        }

        for class in &unknown_classes {
            warn!("Class {} is not declared in the metamodel", class);
        }

        // Second pass: resolve cross references through the identity map
        info!("Building object graph - reference pass");
        for (position, node) in nodes.iter().enumerate() {
            let source = ObjectId(position);
            for (feature, targets) in self.reference_order(node) {
                let resolved = objects[position].references.entry(feature.to_string()).or_default();
                for target_id in targets {
                    match identity.get(target_id.as_str()) {
                        Some(&target) => {
                            resolved.push(target);
                            edges.push(Edge {
                                source,
                                feature: feature.to_string(),
                                target,
                                containment: false,
                            });
                            stats.reference_edges += 1;
                        }
                        None => {
                            debug!(
                                "Unresolved reference {}.{} -> {}",
                                local_id_for(position),
                                feature,
                                target_id
                            );
                            stats.unresolved_references += 1;
                        }
                    }
                }
            }
        }

        if stats.unresolved_references > 0 {
            warn!("{} reference targets could not be resolved", stats.unresolved_references);
        }

        stats.objects = objects.len();
        let graph = ObjectGraph::new(objects, edges, stats);

        info!(
            "Object graph built successfully with {} objects and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        graph
    }

    fn make_object(
        &self,
        id: ObjectId,
        node: &InstanceNode,
        container: Option<Container>,
        root_position: Option<usize>,
        unknown_classes: &mut BTreeSet<String>,
    ) -> ModelObject {
        if !self.metamodel.contains(&node.eclass) {
            unknown_classes.insert(node.eclass.clone());
        }

        let mut attributes = BTreeMap::new();
        for attribute in self.metamodel.all_attributes(&node.eclass) {
            let value = match node.attributes.get(&attribute.name).map(Value::from) {
                None => attribute.unset_value(),
                Some(Value::Null) if attribute.many => Value::List(Vec::new()),
                Some(Value::List(items)) => Value::List(items),
                Some(value) if attribute.many => Value::List(vec![value]),
                Some(value) => value,
            };
            attributes.insert(attribute.name.clone(), value);
        }
        for (name, raw) in &node.attributes {
            if !attributes.contains_key(name) {
                debug!("Attribute {} is not declared by {}", name, node.eclass);
                attributes.insert(name.clone(), Value::from(raw));
            }
        }

        let references = self
            .metamodel
            .cross_reference_features(&node.eclass)
            .into_iter()
            .map(|r| (r.reference.name.clone(), Vec::new()))
            .collect();

        ModelObject {
            index: id,
            eclass: node.eclass.clone(),
            nsuri: self.metamodel.ns_uri(&node.eclass).map(str::to_string),
            local_id: local_id_for(id.index()),
            xmi_id: node.xmi_id.clone(),
            attributes,
            containment_children: Vec::new(),
            references,
            container,
            root_position,
        }
    }

    /// Containment features of a node in declared order, then undeclared ones
    fn containment_order<'d>(&self, node: &'d InstanceNode) -> Vec<(&'d str, &'d [InstanceNode])> {
        let declared = self.metamodel.containment_features(&node.eclass);
        order_features(&node.eclass, &declared, &node.contents)
            .into_iter()
            .map(|(name, children)| (name, children.as_slice()))
            .collect()
    }

    /// Reference features of a node in declared order, then undeclared ones
    fn reference_order<'d>(&self, node: &'d InstanceNode) -> Vec<(&'d str, &'d Vec<String>)> {
        let declared = self.metamodel.cross_reference_features(&node.eclass);
        order_features(&node.eclass, &declared, &node.references)
    }
}

fn order_features<'d, T>(
    class: &str,
    declared: &[OwnedReference<'_>],
    values: &'d BTreeMap<String, T>,
) -> Vec<(&'d str, &'d T)> {
    let mut ordered = Vec::with_capacity(values.len());
    for feature in declared {
        if let Some((name, value)) = values.get_key_value(feature.reference.name.as_str()) {
            ordered.push((name.as_str(), value));
        }
    }
    for (name, value) in values {
        if !declared.iter().any(|f| f.reference.name == *name) {
            debug!("Feature {} is not declared for {} in this role", name, class);
            ordered.push((name.as_str(), value));
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::InstanceDocument;
    use crate::fixtures::{oid, sample_graph, sample_instance, sample_metamodel};
    use crate::graph::traversal::containment_path;

    #[test]
    fn test_local_ids_follow_document_preorder() {
        let (_, graph) = sample_graph();
        let classes: Vec<(&str, &str)> = graph
            .objects()
            .iter()
            .map(|o| (o.local_id.as_str(), o.eclass.as_str()))
            .collect();

        assert_eq!(
            classes,
            vec![
                ("o1", "Repository"),
                ("o2", "DataDictionary"),
                ("o3", "BusinessComponent"),
                ("o4", "BusinessAttribute"),
                ("o5", "BusinessAssociationEnd"),
                ("o6", "BusinessComponent"),
                ("o7", "BusinessAssociationEnd"),
                ("o8", "BusinessComponent"),
                ("o9", "SpecialisedBusinessComponent"),
                ("o10", "DataType"),
            ]
        );
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let metamodel = sample_metamodel();
        let instance = sample_instance();

        let first = build_object_graph(&metamodel, &instance.roots);
        let second = build_object_graph(&metamodel, &instance.roots);

        let ids = |g: &ObjectGraph| -> Vec<(String, Option<String>)> {
            g.objects().iter().map(|o| (o.local_id.clone(), o.xmi_id.clone())).collect()
        };
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(first.edges(), second.edges());
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_containment_edges_form_a_forest() {
        let (_, graph) = sample_graph();
        let mut inbound = vec![0usize; graph.node_count()];
        for edge in graph.edges().iter().filter(|e| e.containment) {
            inbound[edge.target.index()] += 1;
        }

        for object in graph.objects() {
            let expected = if object.is_root() { 0 } else { 1 };
            assert_eq!(inbound[object.index.index()], expected, "{}", object.local_id);
        }
        assert_eq!(graph.stats().containment_edges, 9);
    }

    #[test]
    fn test_forward_references_resolve_in_second_pass() {
        let (_, graph) = sample_graph();
        let number = graph.object(oid(&graph, "o4"));

        // o4 points forward to the DataType o10, visited later in preorder
        assert_eq!(number.references["businessElementType"], vec![oid(&graph, "o10")]);
        assert_eq!(graph.stats().reference_edges, 6);
        assert_eq!(graph.stats().unresolved_references, 0);
    }

    #[test]
    fn test_declared_cross_references_start_empty() {
        let (_, graph) = sample_graph();
        let account = graph.object(oid(&graph, "o3"));

        assert_eq!(account.references.get("superType"), Some(&Vec::new()));
        assert_eq!(account.references.get("subType"), Some(&Vec::new()));
        assert_eq!(account.containment_children, vec![oid(&graph, "o4"), oid(&graph, "o5")]);
    }

    #[test]
    fn test_attributes_fall_back_to_defaults_and_keep_order() {
        let (_, graph) = sample_graph();
        let account = graph.object(oid(&graph, "o3"));
        assert_eq!(
            account.attributes["examples"],
            Value::List(vec![Value::Str("ACC-1".into()), Value::Str("ACC-2".into())])
        );
        assert_eq!(account.attributes["definition"], Value::Null);

        let number = graph.object(oid(&graph, "o4"));
        assert_eq!(number.attributes["isDerived"], Value::Bool(false));
        assert_eq!(
            number.attributes["registrationStatus"],
            Value::Str("Provisionally Registered".into())
        );
        assert_eq!(number.attributes["examples"], Value::List(vec![]));
    }

    #[test]
    fn test_unresolved_and_duplicate_ids_are_counted() {
        let metamodel = sample_metamodel();
        let instance: InstanceDocument = serde_json::from_value(serde_json::json!({
            "roots": [
                {"eClass": "DataType", "xmi:id": "_dup", "attributes": {"name": "A"}},
                {"eClass": "DataType", "xmi:id": "_dup", "attributes": {"name": "B"}},
                {
                    "eClass": "BusinessAttribute",
                    "references": {"businessElementType": ["_dup", "_missing"]}
                }
            ]
        }))
        .unwrap();

        let graph = build_object_graph(&metamodel, &instance.roots);
        assert_eq!(graph.stats().duplicate_ids, 1);
        assert_eq!(graph.stats().unresolved_references, 1);

        let attribute = graph.object(oid(&graph, "o3"));
        assert_eq!(attribute.references["businessElementType"], vec![oid(&graph, "o1")]);
        assert_eq!(containment_path(&graph, oid(&graph, "o2")), "/DataType[1]");
    }

    #[test]
    fn test_multi_valued_scalar_is_wrapped() {
        let metamodel = sample_metamodel();
        let instance: InstanceDocument = serde_json::from_value(serde_json::json!({
            "roots": [{"eClass": "DataType", "attributes": {"examples": "single"}}]
        }))
        .unwrap();

        let graph = build_object_graph(&metamodel, &instance.roots);
        assert_eq!(
            graph.objects()[0].attributes["examples"],
            Value::List(vec![Value::Str("single".into())])
        );
    }
}
