use crate::metamodel::MetamodelIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Dry-run result of a class-based pruning
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    pub selected_classes: Vec<String>,
    pub pruned_classes: Vec<String>,
    pub pruned_containment_features: Vec<String>,
    pub pruned_reference_features: Vec<String>,
}

/// Resolve include/exclude lists into the selected class set.
///
/// An empty include list makes every class a candidate. Exclusion wins over
/// inclusion. Names the metamodel does not know are warned about and dropped.
pub fn select_classes(
    metamodel: &MetamodelIndex,
    include_classes: &BTreeSet<String>,
    exclude_classes: &BTreeSet<String>,
    include_supertypes: bool,
) -> BTreeSet<String> {
    for name in include_classes.iter().chain(exclude_classes) {
        if !metamodel.contains(name) {
            warn!("Class {} is not in the metamodel", name);
        }
    }

    let mut candidates: BTreeSet<String> = if include_classes.is_empty() {
        metamodel.class_names().map(str::to_string).collect()
    } else {
        include_classes
            .iter()
            .filter(|name| metamodel.contains(name))
            .cloned()
            .collect()
    };

    if include_supertypes && !include_classes.is_empty() {
        let supertypes: Vec<String> = candidates
            .iter()
            .flat_map(|name| metamodel.supertype_closure(name))
            .collect();
        candidates.extend(supertypes);
    }

    for name in exclude_classes {
        if include_classes.contains(name) {
            warn!("Class {} is both included and excluded; excluding", name);
        }
        candidates.remove(name);
    }

    candidates
}

/// Report which classes and features a selection would prune, from the
/// metamodel alone.
pub fn preview_prune(
    metamodel: &MetamodelIndex,
    include_classes: &BTreeSet<String>,
    exclude_classes: &BTreeSet<String>,
    include_supertypes: bool,
) -> PruneReport {
    let selected = select_classes(metamodel, include_classes, exclude_classes, include_supertypes);

    let pruned_classes: Vec<String> = metamodel
        .class_names()
        .filter(|name| !selected.contains(*name))
        .map(str::to_string)
        .collect();

    let mut containment = BTreeSet::new();
    let mut references = BTreeSet::new();
    for class in &selected {
        for feature in metamodel.all_references(class) {
            let target_kept = selected
                .iter()
                .any(|candidate| metamodel.is_kind_of(candidate, &feature.reference.target));
            if target_kept {
                continue;
            }
            if feature.reference.containment {
                containment.insert(feature.qualified_name());
            } else {
                references.insert(feature.qualified_name());
            }
        }
    }

    info!(
        "Prune preview: {} classes selected, {} pruned, {} containment and {} reference features cut",
        selected.len(),
        pruned_classes.len(),
        containment.len(),
        references.len()
    );

    PruneReport {
        selected_classes: selected.into_iter().collect(),
        pruned_classes,
        pruned_containment_features: containment.into_iter().collect(),
        pruned_reference_features: references.into_iter().collect(),
    }
}
