use crate::graph::identity::resolve_id;
use crate::graph::ObjectGraph;
use crate::metamodel::MetamodelIndex;
use crate::prune::selection::select_classes;
use crate::types::{ModelObject, ObjectId, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Options for [`export_instance`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    pub preserve_containment_chain: bool,
    pub strip_refs: bool,
    pub force_defaults: bool,
    pub debug_trace: bool,
    pub include_supertypes: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            preserve_containment_chain: true,
            strip_refs: false,
            force_defaults: false,
            debug_trace: false,
            include_supertypes: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredObject {
    pub id: String,
    pub local_id: String,
    #[serde(rename = "eClass")]
    pub eclass: String,
    #[serde(rename = "nsURI")]
    pub nsuri: Option<String>,
    pub attributes: BTreeMap<String, Value>,
    pub contents: Vec<FilteredContainment>,
    pub references: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredContainment {
    pub feature: String,
    pub objects: Vec<FilteredObject>,
}

/// A reference from a retained object to a pruned one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrunedReference {
    pub source: String,
    pub feature: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultTraceEntry {
    pub id: String,
    #[serde(rename = "eClass")]
    pub eclass: String,
    pub attribute: String,
    pub default: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportStats {
    pub selected: usize,
    pub roots: usize,
    pub preserved_ancestors: usize,
    pub stripped_references: usize,
    pub dangling_references: usize,
    pub forced_defaults: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilteredInstance {
    pub roots: Vec<FilteredObject>,
    pub stats: ExportStats,
    /// Ids of ancestors kept only to hold a retained descendant
    pub preserved_ancestors: Vec<String>,
    pub stripped_references: Vec<PrunedReference>,
    pub dangling_references: Vec<PrunedReference>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub default_trace: Vec<DefaultTraceEntry>,
}

/// Stage 1: objects whose class is selected
pub fn class_filter_pass(graph: &ObjectGraph, selected_classes: &BTreeSet<String>) -> Vec<bool> {
    graph
        .objects()
        .iter()
        .map(|object| selected_classes.contains(&object.eclass))
        .collect()
}

/// Classes of instance objects that the metamodel does not declare
pub fn undeclared_classes(graph: &ObjectGraph, metamodel: &MetamodelIndex) -> BTreeSet<String> {
    graph
        .objects()
        .iter()
        .filter(|object| !metamodel.contains(&object.eclass))
        .map(|object| object.eclass.clone())
        .collect()
}

/// Stage 2: retain every containment ancestor of a retained object.
///
/// Returns the ancestors that were added, in preorder.
pub fn ancestor_closure_pass(graph: &ObjectGraph, retained: &mut [bool]) -> Vec<ObjectId> {
    let mut added = Vec::new();
    for object in graph.objects() {
        if !retained[object.index.index()] {
            continue;
        }
        let mut current = object.parent();
        while let Some(parent) = current {
            if retained[parent.index()] {
                break;
            }
            retained[parent.index()] = true;
            added.push(parent);
            current = graph.object(parent).parent();
        }
    }
    added.sort();
    added
}

/// Apply a class selection to the instances of a graph and build the
/// filtered containment tree.
pub fn export_instance(
    graph: &ObjectGraph,
    metamodel: &MetamodelIndex,
    include_classes: &BTreeSet<String>,
    exclude_classes: &BTreeSet<String>,
    options: &ExportOptions,
) -> FilteredInstance {
    let selected_classes = select_classes(metamodel, include_classes, exclude_classes, options.include_supertypes);

    let undeclared = undeclared_classes(graph, metamodel);
    if !undeclared.is_empty() {
        warn!(
            "Objects of classes missing from the metamodel are pruned: {}",
            undeclared.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
        );
    }

    let mut retained = class_filter_pass(graph, &selected_classes);
    let preserved = if options.preserve_containment_chain {
        ancestor_closure_pass(graph, &mut retained)
    } else {
        Vec::new()
    };

    let mut result = FilteredInstance {
        preserved_ancestors: preserved
            .iter()
            .map(|id| resolve_id(graph.object(*id)).to_string())
            .collect(),
        ..FilteredInstance::default()
    };

    // Children come after their parent in preorder, so walking backwards
    // builds every subtree before its container needs it.
    let mut built: Vec<Option<FilteredObject>> = vec![None; graph.node_count()];
    for object in graph.objects().iter().rev() {
        if !retained[object.index.index()] {
            continue;
        }
        let mut filtered = FilteredObject {
            id: resolve_id(object).to_string(),
            local_id: object.local_id.clone(),
            eclass: object.eclass.clone(),
            nsuri: object.nsuri.clone(),
            attributes: export_attributes(metamodel, object, options, &mut result),
            contents: Vec::new(),
            references: export_references(graph, object, &retained, options, &mut result),
        };

        for child in &object.containment_children {
            let Some(child_object) = built[child.index()].take() else {
                continue;
            };
            let feature = graph
                .object(*child)
                .container
                .as_ref()
                .map(|c| c.feature.as_str())
                .unwrap_or_default();
            match filtered.contents.last_mut() {
                Some(group) if group.feature == feature => group.objects.push(child_object),
                _ => filtered.contents.push(FilteredContainment {
                    feature: feature.to_string(),
                    objects: vec![child_object],
                }),
            }
        }

        built[object.index.index()] = Some(filtered);
    }

    // Whatever was not claimed by a retained container is a root
    result.roots = built.into_iter().flatten().collect();

    // Per-object passes above ran in reverse; report in preorder
    result.stripped_references.reverse();
    result.dangling_references.reverse();
    result.default_trace.reverse();

    result.stats.selected = retained.iter().filter(|r| **r).count();
    result.stats.roots = result.roots.len();
    result.stats.preserved_ancestors = preserved.len();
    result.stats.stripped_references = result.stripped_references.len();
    result.stats.dangling_references = result.dangling_references.len();

    info!(
        "Instance export: selected={} roots={} preserved_ancestors={} stripped_references={} dangling_references={} forced_defaults={}",
        result.stats.selected,
        result.stats.roots,
        result.stats.preserved_ancestors,
        result.stats.stripped_references,
        result.stats.dangling_references,
        result.stats.forced_defaults
    );

    result
}

fn export_attributes(
    metamodel: &MetamodelIndex,
    object: &ModelObject,
    options: &ExportOptions,
    result: &mut FilteredInstance,
) -> BTreeMap<String, Value> {
    let defaults: BTreeMap<&str, Value> = metamodel
        .all_attributes(&object.eclass)
        .into_iter()
        .filter_map(|a| a.effective_default().map(|d| (a.name.as_str(), d)))
        .collect();

    let mut attributes = BTreeMap::new();
    // Collected per object, then reversed so the final list reads in preorder
    let mut trace = Vec::new();

    for (name, value) in &object.attributes {
        let default = defaults.get(name.as_str());
        let at_default = value.is_unset() || default.map_or(false, |d| value.loosely_equals(d));

        if !at_default {
            attributes.insert(name.clone(), value.clone());
            continue;
        }

        if let (true, Some(default)) = (options.force_defaults, default) {
            attributes.insert(name.clone(), default.clone());
            result.stats.forced_defaults += 1;
            if options.debug_trace {
                debug!(
                    "Forced default {}.{} = {} on {}",
                    object.eclass,
                    name,
                    default,
                    resolve_id(object)
                );
                trace.push(DefaultTraceEntry {
                    id: resolve_id(object).to_string(),
                    eclass: object.eclass.clone(),
                    attribute: name.clone(),
                    default: default.clone(),
                });
            }
        }
    }

    result.default_trace.extend(trace.into_iter().rev());
    attributes
}

fn export_references(
    graph: &ObjectGraph,
    object: &ModelObject,
    retained: &[bool],
    options: &ExportOptions,
    result: &mut FilteredInstance,
) -> BTreeMap<String, Vec<String>> {
    let mut references = BTreeMap::new();
    let mut stripped = Vec::new();
    let mut dangling = Vec::new();

    for (feature, targets) in &object.references {
        let mut kept = Vec::new();
        for target in targets {
            let target_id = resolve_id(graph.object(*target)).to_string();
            if retained[target.index()] {
                kept.push(target_id);
                continue;
            }
            let record = PrunedReference {
                source: resolve_id(object).to_string(),
                feature: feature.clone(),
                target: target_id.clone(),
            };
            if options.strip_refs {
                stripped.push(record);
            } else {
                dangling.push(record);
                kept.push(target_id);
            }
        }
        if !kept.is_empty() {
            references.insert(feature.clone(), kept);
        }
    }

    result.stripped_references.extend(stripped.into_iter().rev());
    result.dangling_references.extend(dangling.into_iter().rev());
    references
}
