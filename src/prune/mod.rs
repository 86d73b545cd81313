pub mod export;
pub mod selection;

pub use export::{
    ancestor_closure_pass, class_filter_pass, export_instance, undeclared_classes, DefaultTraceEntry, ExportOptions,
    ExportStats, FilteredContainment, FilteredInstance, FilteredObject, PrunedReference,
};
pub use selection::{preview_prune, select_classes, PruneReport};
