use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Dense index of an object inside one [`crate::graph::ObjectGraph`].
///
/// Indices follow containment preorder, so `ObjectId(0)` is the first root.
/// They are only meaningful for the graph that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub usize);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Attribute value as delivered by the model loader.
///
/// Enumeration literals are carried as their literal name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Loose equality used by filters and default detection: integers and
    /// floats compare numerically, lists compare element-wise.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
            }
            _ => self == other,
        }
    }

    /// Truthiness of a value used directly as a boolean.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
        }
    }

    /// True for values the serializer treats as "unset": null or an empty list.
    pub fn is_unset(&self) -> bool {
        match self {
            Value::Null => true,
            Value::List(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from).collect()),
            // Nested objects have no scalar meaning; keep their JSON text
            serde_json::Value::Object(_) => Value::Str(value.to_string()),
        }
    }
}

/// Position of an object inside its container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub parent: ObjectId,
    pub feature: String,
    pub index: usize,
}

/// One instance node of the object graph. Immutable once the graph is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelObject {
    pub index: ObjectId,
    pub eclass: String,
    pub nsuri: Option<String>,
    pub local_id: String,
    pub xmi_id: Option<String>,
    pub attributes: BTreeMap<String, Value>,
    pub containment_children: Vec<ObjectId>,
    pub references: BTreeMap<String, Vec<ObjectId>>,
    pub container: Option<Container>,
    /// Position among the document roots; `None` for contained objects.
    pub root_position: Option<usize>,
}

impl ModelObject {
    pub fn is_root(&self) -> bool {
        self.container.is_none()
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.container.as_ref().map(|c| c.parent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: ObjectId,
    pub feature: String,
    pub target: ObjectId,
    pub containment: bool,
}

/// Counters collected while building an object graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub objects: usize,
    pub containment_edges: usize,
    pub reference_edges: usize,
    pub unresolved_references: usize,
    pub duplicate_ids: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_equality_crosses_numeric_types() {
        assert!(Value::Int(3).loosely_equals(&Value::Float(3.0)));
        assert!(!Value::Int(3).loosely_equals(&Value::Str("3".to_string())));
        assert!(Value::List(vec![Value::Int(1), Value::Float(2.0)])
            .loosely_equals(&Value::List(vec![Value::Float(1.0), Value::Int(2)])));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Str("x".to_string()).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::Bool(true).is_truthy());
    }

    #[test]
    fn test_value_deserializes_untagged() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 4, 2.5, "a", ["b"]]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Int(4),
                Value::Float(2.5),
                Value::Str("a".to_string()),
                Value::List(vec![Value::Str("b".to_string())]),
            ]
        );
    }
}
