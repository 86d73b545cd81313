use crate::graph::identity::resolve_id;
use crate::graph::traversal::containment_path;
use crate::graph::ObjectGraph;
use crate::metamodel::MetamodelIndex;
use crate::types::{ModelObject, Value};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Names every object context exposes besides its class attributes
pub const BUILTIN_NAMES: [&str; 7] = ["eclass", "nsuri", "id", "ID", "local_id", "path", "attrs"];

/// Per-class binding table: attribute names and the class's kind set
#[derive(Debug, Clone, Default)]
pub struct ClassBinding {
    pub attributes: HashSet<String>,
    /// The class itself and every transitive supertype
    pub kinds: HashSet<String>,
}

impl ClassBinding {
    fn new(metamodel: &MetamodelIndex, class: &str) -> Self {
        let attributes = metamodel
            .all_attributes(class)
            .into_iter()
            .map(|a| a.name.clone())
            .collect();
        let mut kinds: HashSet<String> = metamodel.supertype_closure(class).into_iter().collect();
        kinds.insert(class.to_string());
        Self { attributes, kinds }
    }
}

/// Binding tables for every class present in a graph, built once
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    classes: HashMap<String, ClassBinding>,
}

impl Bindings {
    pub fn new(graph: &ObjectGraph, metamodel: &MetamodelIndex) -> Self {
        let mut classes = HashMap::new();
        for object in graph.objects() {
            if !classes.contains_key(&object.eclass) {
                classes.insert(object.eclass.clone(), ClassBinding::new(metamodel, &object.eclass));
            }
        }
        Self { classes }
    }

    pub fn class(&self, name: &str) -> Option<&ClassBinding> {
        self.classes.get(name)
    }

    /// Whether any bound class declares `name` as an attribute
    pub fn declares(&self, name: &str) -> bool {
        self.classes.values().any(|binding| binding.attributes.contains(name))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// What a name evaluates to for one object
#[derive(Debug, Clone)]
pub enum Operand<'a> {
    Absent,
    Value(Cow<'a, Value>),
    Attrs(&'a BTreeMap<String, Value>),
}

/// Evaluation context of a single object
pub struct ObjectContext<'a> {
    pub graph: &'a ObjectGraph,
    pub object: &'a ModelObject,
    pub binding: Option<&'a ClassBinding>,
}

impl<'a> ObjectContext<'a> {
    /// Resolve a variable. Class attributes shadow built-in names; anything
    /// unknown is absent.
    pub fn lookup(&self, name: &str) -> Operand<'a> {
        let object = self.object;

        if self.binding.map_or(false, |b| b.attributes.contains(name)) {
            return match object.attributes.get(name) {
                Some(value) => Operand::Value(Cow::Borrowed(value)),
                None => Operand::Absent,
            };
        }

        match name {
            "eclass" => Operand::Value(Cow::Owned(Value::Str(object.eclass.clone()))),
            "nsuri" => Operand::Value(Cow::Owned(
                object.nsuri.clone().map(Value::Str).unwrap_or(Value::Null),
            )),
            "id" | "ID" => Operand::Value(Cow::Owned(Value::Str(resolve_id(object).to_string()))),
            "local_id" => Operand::Value(Cow::Owned(Value::Str(object.local_id.clone()))),
            "path" => Operand::Value(Cow::Owned(Value::Str(containment_path(self.graph, object.index)))),
            "attrs" => Operand::Attrs(&object.attributes),
            _ => Operand::Absent,
        }
    }

    pub fn is_kind_of(&self, class: &str) -> bool {
        self.object.eclass == class || self.binding.map_or(false, |b| b.kinds.contains(class))
    }
}
