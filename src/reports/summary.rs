use crate::filter::FilterError;
use crate::graph::ObjectGraph;
use crate::metamodel::{MetamodelIndex, PackageDescriptor};
use crate::query::SelectionQuery;
use crate::reports::records::{object_records, ObjectRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetamodelStats {
    pub packages: usize,
    pub classes: usize,
    /// Inherited attributes counted on every class
    pub attributes: usize,
    pub references: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetamodelDump {
    pub packages: Vec<PackageDump>,
    pub total_classes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDump {
    pub name: String,
    #[serde(rename = "nsURI")]
    pub ns_uri: Option<String>,
    pub classes: Vec<ClassDump>,
    pub subpackages: Vec<PackageDump>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDump {
    pub name: String,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    pub supertypes: Vec<String>,
    pub attributes: Vec<AttributeDump>,
    pub references: Vec<ReferenceDump>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDump {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: Option<String>,
    pub many: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDump {
    pub name: String,
    #[serde(rename = "type")]
    pub target: String,
    pub many: bool,
    pub containment: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStats {
    pub roots: usize,
    pub objects: usize,
}

/// Every package, subpackages included, in document order
fn all_packages(metamodel: &MetamodelIndex) -> Vec<&PackageDescriptor> {
    let mut ordered = Vec::new();
    let mut stack: Vec<&PackageDescriptor> = metamodel.packages().iter().rev().collect();
    while let Some(package) = stack.pop() {
        ordered.push(package);
        stack.extend(package.subpackages.iter().rev());
    }
    ordered
}

pub fn metamodel_stats(metamodel: &MetamodelIndex) -> MetamodelStats {
    let mut stats = MetamodelStats::default();
    for package in all_packages(metamodel) {
        stats.packages += 1;
        for class in &package.classes {
            stats.classes += 1;
            stats.attributes += metamodel.all_attributes(&class.name).len();
            stats.references += metamodel.all_references(&class.name).len();
        }
    }
    stats
}

/// Text listing of packages and classes with their inherited features
pub fn summarize_metamodel(metamodel: &MetamodelIndex) -> String {
    let mut lines = Vec::new();
    let mut total_classes = 0;

    for package in all_packages(metamodel) {
        lines.push(format!(
            "Package: {} nsURI={}",
            package.name,
            package.ns_uri.as_deref().unwrap_or("None")
        ));
        for class in &package.classes {
            total_classes += 1;
            let attributes: Vec<&str> = metamodel
                .all_attributes(&class.name)
                .iter()
                .map(|a| a.name.as_str())
                .collect();
            let references: Vec<&str> = metamodel
                .all_references(&class.name)
                .iter()
                .map(|r| r.reference.name.as_str())
                .collect();
            lines.push(format!(
                "  Class: {} attrs={} refs={}",
                class.name,
                attributes.len(),
                references.len()
            ));
            if !attributes.is_empty() {
                lines.push(format!("    Attributes: {}", attributes.join(", ")));
            }
            if !references.is_empty() {
                lines.push(format!("    References: {}", references.join(", ")));
            }
        }
    }

    lines.push(format!("Total classes: {}", total_classes));
    lines.join("\n")
}

pub fn metamodel_dump(metamodel: &MetamodelIndex) -> MetamodelDump {
    MetamodelDump {
        packages: metamodel
            .packages()
            .iter()
            .map(|package| dump_package(metamodel, package))
            .collect(),
        total_classes: all_packages(metamodel).iter().map(|p| p.classes.len()).sum(),
    }
}

fn dump_package(metamodel: &MetamodelIndex, package: &PackageDescriptor) -> PackageDump {
    PackageDump {
        name: package.name.clone(),
        ns_uri: package.ns_uri.clone(),
        classes: package
            .classes
            .iter()
            .map(|class| ClassDump {
                name: class.name.clone(),
                is_abstract: class.is_abstract,
                supertypes: class.supertypes.clone(),
                attributes: metamodel
                    .all_attributes(&class.name)
                    .into_iter()
                    .map(|a| AttributeDump {
                        name: a.name.clone(),
                        data_type: a.data_type.clone(),
                        many: a.many,
                    })
                    .collect(),
                references: metamodel
                    .all_references(&class.name)
                    .into_iter()
                    .map(|r| ReferenceDump {
                        name: r.reference.name.clone(),
                        target: r.reference.target.clone(),
                        many: r.reference.many,
                        containment: r.reference.containment,
                    })
                    .collect(),
            })
            .collect(),
        subpackages: package
            .subpackages
            .iter()
            .map(|sub| dump_package(metamodel, sub))
            .collect(),
    }
}

pub fn instance_stats(graph: &ObjectGraph) -> InstanceStats {
    InstanceStats {
        roots: graph.roots().count(),
        objects: graph.node_count(),
    }
}

/// Root listing: `Root objects: N` then `  [i] Class` per root
pub fn summarize_instances(graph: &ObjectGraph) -> String {
    let mut lines = vec![format!("Root objects: {}", graph.roots().count())];
    for (position, root) in graph.roots().enumerate() {
        lines.push(format!("  [{}] {}", position, root.eclass));
    }
    lines.join("\n")
}

/// Instance count per class
pub fn model_summary(graph: &ObjectGraph) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for object in graph.objects() {
        *counts.entry(object.eclass.clone()).or_insert(0) += 1;
    }
    counts
}

pub fn summarize_model(graph: &ObjectGraph) -> String {
    let counts = model_summary(graph);
    let mut lines = vec![format!("Objects: {} in {} classes", graph.node_count(), counts.len())];
    for (class, count) in counts {
        lines.push(format!("  {}: {}", class, count));
    }
    lines.join("\n")
}

/// Object records grouped by class, optionally narrowed by a filter
pub fn instances_by_class(
    graph: &ObjectGraph,
    metamodel: &MetamodelIndex,
    filter: Option<&str>,
) -> Result<BTreeMap<String, Vec<ObjectRecord>>, FilterError> {
    let mut query = SelectionQuery::new();
    query.filter_expr = filter.map(str::to_string);
    let selection = query.run(graph, metamodel)?;

    let mut grouped: BTreeMap<String, Vec<ObjectRecord>> = BTreeMap::new();
    for record in object_records(graph, &selection, false) {
        grouped.entry(record.eclass.clone()).or_default().push(record);
    }
    Ok(grouped)
}

/// Cap every class group at `limit` records, 0 for no limit.
///
/// Returns how many records were dropped.
pub fn truncate_groups(grouped: &mut BTreeMap<String, Vec<ObjectRecord>>, limit: usize) -> usize {
    if limit == 0 {
        return 0;
    }
    let mut dropped = 0;
    for (class, records) in grouped.iter_mut() {
        if records.len() > limit {
            warn!("Showing {} of {} {} records", limit, records.len(), class);
            dropped += records.len() - limit;
            records.truncate(limit);
        }
    }
    dropped
}
