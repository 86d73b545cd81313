use crate::graph::identity::resolve_id;
use crate::graph::traversal::containment_path;
use crate::graph::ObjectGraph;
use crate::query::Selection;
use crate::types::{ModelObject, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Exported view of one selected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: String,
    #[serde(rename = "ID")]
    pub id_alias: String,
    pub local_id: String,
    #[serde(rename = "eClass")]
    pub eclass: String,
    #[serde(rename = "nsURI")]
    pub nsuri: Option<String>,
    pub attributes: BTreeMap<String, Value>,
    /// Ids of selected containment children, in order
    pub containment: Vec<String>,
    pub references: BTreeMap<String, Vec<String>>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expansion_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expansion_id_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub src_id: String,
    pub src_class: String,
    pub feature: String,
    pub dst_id: String,
    pub dst_class: String,
    pub containment: bool,
}

impl EdgeRecord {
    pub const COLUMNS: [&'static str; 6] = ["src_id", "src_class", "feature", "dst_id", "dst_class", "containment"];
}

/// Record for one object. References to objects outside `selection` are
/// dropped when `strip_refs` is set.
pub fn object_record(graph: &ObjectGraph, object: &ModelObject, selection: &Selection, strip_refs: bool) -> ObjectRecord {
    let id = resolve_id(object).to_string();

    let containment = object
        .containment_children
        .iter()
        .filter(|child| selection.contains(**child))
        .map(|child| resolve_id(graph.object(*child)).to_string())
        .collect();

    let references = object
        .references
        .iter()
        .map(|(feature, targets)| {
            let ids = targets
                .iter()
                .filter(|target| !strip_refs || selection.contains(**target))
                .map(|target| resolve_id(graph.object(*target)).to_string())
                .collect();
            (feature.clone(), ids)
        })
        .collect();

    let (expansion_path, expansion_id_path) = match &selection.expansion {
        Some(expansion) => (
            expansion.render_path(graph, object.index),
            expansion.render_id_path(graph, object.index),
        ),
        None => (None, None),
    };

    ObjectRecord {
        id_alias: id.clone(),
        id,
        local_id: object.local_id.clone(),
        eclass: object.eclass.clone(),
        nsuri: object.nsuri.clone(),
        attributes: object.attributes.clone(),
        containment,
        references,
        path: containment_path(graph, object.index),
        expansion_path,
        expansion_id_path,
    }
}

/// Records for every selected object, in preorder
pub fn object_records(graph: &ObjectGraph, selection: &Selection, strip_refs: bool) -> Vec<ObjectRecord> {
    selection
        .objects
        .iter()
        .map(|id| object_record(graph, graph.object(*id), selection, strip_refs))
        .collect()
}

/// Records for every edge between two selected objects, in creation order
pub fn edge_records(graph: &ObjectGraph, selection: &Selection) -> Vec<EdgeRecord> {
    selection
        .edges(graph)
        .into_iter()
        .map(|edge| {
            let source = graph.object(edge.source);
            let target = graph.object(edge.target);
            EdgeRecord {
                src_id: resolve_id(source).to_string(),
                src_class: source.eclass.clone(),
                feature: edge.feature.clone(),
                dst_id: resolve_id(target).to_string(),
                dst_class: target.eclass.clone(),
                containment: edge.containment,
            }
        })
        .collect()
}

/// `{id}\t{containment_path}\t{expansion_path}` per selected object.
///
/// Objects the expansion did not reach are skipped; `None` without an expansion.
pub fn path_rows(graph: &ObjectGraph, selection: &Selection) -> Option<Vec<String>> {
    let expansion = selection.expansion.as_ref()?;
    Some(
        selection
            .objects
            .iter()
            .filter_map(|id| {
                let object = graph.object(*id);
                expansion.render_path(graph, *id).map(|bfs| {
                    format!("{}\t{}\t{}", resolve_id(object), containment_path(graph, *id), bfs)
                })
            })
            .collect(),
    )
}

/// `{id}\t{expansion_id_path}` per selected object
pub fn path_id_rows(graph: &ObjectGraph, selection: &Selection) -> Option<Vec<String>> {
    let expansion = selection.expansion.as_ref()?;
    Some(
        selection
            .objects
            .iter()
            .filter_map(|id| {
                expansion
                    .render_id_path(graph, *id)
                    .map(|bfs| format!("{}\t{}", resolve_id(graph.object(*id)), bfs))
            })
            .collect(),
    )
}
