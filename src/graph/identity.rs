use crate::types::ModelObject;

/// Process-local id for the object at the given preorder position.
pub fn local_id_for(position: usize) -> String {
    format!("o{}", position + 1)
}

/// Preferred identifier of an object: its `xmi:id` when present and
/// non-empty, otherwise its local id.
pub fn resolve_id(object: &ModelObject) -> &str {
    object
        .xmi_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .unwrap_or(&object.local_id)
}

/// Alias of [`resolve_id`], matching the `ID` filter variable.
#[allow(non_snake_case)]
pub fn resolve_ID(object: &ModelObject) -> &str {
    resolve_id(object)
}
