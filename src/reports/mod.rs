pub mod formatters;
pub mod generator;
pub mod records;
pub mod summary;

pub use formatters::{CsvFormatter, JsonFormatter, PathFormatter, PathIdFormatter, SelectionFormatter};
pub use generator::ReportGenerator;
pub use records::{edge_records, object_records, path_id_rows, path_rows, EdgeRecord, ObjectRecord};
pub use summary::{
    instance_stats, instances_by_class, metamodel_dump, metamodel_stats, model_summary, summarize_instances,
    summarize_metamodel, summarize_model, truncate_groups, InstanceStats, MetamodelDump, MetamodelStats,
};
