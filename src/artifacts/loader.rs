use crate::artifacts::instance::InstanceDocument;
use crate::metamodel::{MetamodelDocument, MetamodelIndex};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// JSON model loader: reads the metamodel once and instance documents on demand
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    metamodel_path: PathBuf,
    metamodel_cache: Option<MetamodelIndex>,
}

impl ArtifactLoader {
    pub fn new<P: AsRef<Path>>(metamodel_path: P) -> Self {
        Self {
            metamodel_path: metamodel_path.as_ref().to_path_buf(),
            metamodel_cache: None,
        }
    }

    pub fn metamodel_path(&self) -> &Path {
        &self.metamodel_path
    }

    /// Load and cache the metamodel document
    pub fn load_metamodel(&mut self) -> Result<&MetamodelIndex> {
        let index = match self.metamodel_cache.take() {
            Some(index) => index,
            None => {
                info!("Loading metamodel: {:?}", self.metamodel_path);

                let content = fs::read_to_string(&self.metamodel_path)
                    .with_context(|| format!("Failed to read metamodel from {:?}", self.metamodel_path))?;

                let document: MetamodelDocument = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse metamodel {:?}", self.metamodel_path))?;

                if document.packages.is_empty() {
                    anyhow::bail!("No package found in metamodel: {:?}", self.metamodel_path);
                }

                let index = MetamodelIndex::new(document);
                debug!("Metamodel indexed with {} classes", index.class_count());
                index
            }
        };

        Ok(self.metamodel_cache.insert(index))
    }

    /// Load an instance document
    pub fn load_instance<P: AsRef<Path>>(&self, instance_path: P) -> Result<InstanceDocument> {
        let instance_path = instance_path.as_ref();
        info!("Loading instance: {:?}", instance_path);

        let content = fs::read_to_string(instance_path)
            .with_context(|| format!("Failed to read instance from {:?}", instance_path))?;

        let document: InstanceDocument = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse instance {:?}", instance_path))?;

        info!("Loaded instance with {} roots ({} objects)", document.roots.len(), document.node_count());
        Ok(document)
    }
}
