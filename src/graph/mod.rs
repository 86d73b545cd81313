pub mod builder;
pub mod identity;
pub mod object_graph;
pub mod traversal;

pub use builder::{build_object_graph, GraphBuilder};
pub use identity::{resolve_ID, resolve_id};
pub use object_graph::{GraphStatistics, Incident, ObjectGraph};
pub use traversal::{
    containment_id_path, containment_path, expand, expand_matching, Expansion, ExpansionMetrics, Hop,
    HopDirection,
};
