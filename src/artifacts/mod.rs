pub mod instance;
pub mod loader;

pub use instance::{InstanceDocument, InstanceNode};
pub use loader::ArtifactLoader;
