use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON representation of an instance document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceDocument {
    #[serde(default)]
    pub roots: Vec<InstanceNode>,
}

/// One object as written in the instance document.
///
/// Containment children are nested under `contents`; non-containment
/// references name their targets by `xmi:id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceNode {
    #[serde(rename = "eClass")]
    pub eclass: String,
    #[serde(rename = "xmi:id", alias = "xmiId", default, skip_serializing_if = "Option::is_none")]
    pub xmi_id: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub contents: BTreeMap<String, Vec<InstanceNode>>,
    #[serde(default)]
    pub references: BTreeMap<String, Vec<String>>,
}

impl InstanceDocument {
    /// Total number of nodes, counted without recursion
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&InstanceNode> = self.roots.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.contents.values().flatten());
        }
        count
    }
}
