use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

/// Class and feature descriptors supplied by the model loader
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetamodelDocument {
    #[serde(default)]
    pub packages: Vec<PackageDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub name: String,
    #[serde(rename = "nsURI", default)]
    pub ns_uri: Option<String>,
    #[serde(default)]
    pub classes: Vec<ClassDescriptor>,
    #[serde(default)]
    pub subpackages: Vec<PackageDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDescriptor {
    pub name: String,
    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDescriptor>,
    #[serde(default)]
    pub references: Vec<ReferenceDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub many: bool,
    #[serde(default)]
    pub default: Option<Value>,
    /// Enumeration literals, in declaration order. Empty for non-enum types.
    #[serde(default)]
    pub literals: Vec<String>,
}

impl AttributeDescriptor {
    /// Default a serializer would treat as "unset": the declared default, or
    /// the first literal for enumerations.
    pub fn effective_default(&self) -> Option<Value> {
        if let Some(default) = self.default.as_ref().filter(|d| !d.is_null()) {
            return Some(default.clone());
        }
        if self.many {
            return None;
        }
        self.literals.first().map(|literal| Value::Str(literal.clone()))
    }

    /// Value an unset attribute reads as.
    pub fn unset_value(&self) -> Value {
        if self.many {
            Value::List(Vec::new())
        } else {
            self.effective_default().unwrap_or(Value::Null)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub target: String,
    #[serde(default)]
    pub many: bool,
    #[serde(default)]
    pub containment: bool,
}

/// Reference feature together with the class that declares it
#[derive(Debug, Clone, Copy)]
pub struct OwnedReference<'a> {
    pub owner: &'a str,
    pub reference: &'a ReferenceDescriptor,
}

impl OwnedReference<'_> {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.owner, self.reference.name)
    }
}

#[derive(Debug, Clone)]
struct IndexedClass {
    descriptor: ClassDescriptor,
    ns_uri: Option<String>,
}

/// Name-keyed view over a metamodel document with inheritance queries
#[derive(Debug, Clone)]
pub struct MetamodelIndex {
    packages: Vec<PackageDescriptor>,
    classes: BTreeMap<String, IndexedClass>,
}

impl MetamodelIndex {
    pub fn new(document: MetamodelDocument) -> Self {
        let mut classes = BTreeMap::new();
        let mut stack: Vec<&PackageDescriptor> = document.packages.iter().rev().collect();

        while let Some(package) = stack.pop() {
            for class in &package.classes {
                if classes.contains_key(&class.name) {
                    warn!("Duplicate class name {} in package {}; keeping the first", class.name, package.name);
                    continue;
                }
                classes.insert(
                    class.name.clone(),
                    IndexedClass {
                        descriptor: class.clone(),
                        ns_uri: package.ns_uri.clone(),
                    },
                );
            }
            stack.extend(package.subpackages.iter().rev());
        }

        debug!("Indexed {} classes from {} packages", classes.len(), document.packages.len());

        Self {
            packages: document.packages,
            classes,
        }
    }

    pub fn packages(&self) -> &[PackageDescriptor] {
        &self.packages
    }

    pub fn class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(name).map(|c| &c.descriptor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn ns_uri(&self, name: &str) -> Option<&str> {
        self.classes.get(name).and_then(|c| c.ns_uri.as_deref())
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Class followed by its supertypes, supertypes first, each listed once.
    ///
    /// Walks with an explicit stack so inheritance cycles terminate.
    fn linearize<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<(&'a str, bool)> = vec![(name, false)];

        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current);
                continue;
            }
            if !visited.insert(current) {
                continue;
            }
            stack.push((current, true));
            if let Some(class) = self.classes.get(current) {
                for supertype in class.descriptor.supertypes.iter().rev() {
                    if !visited.contains(supertype.as_str()) {
                        stack.push((supertype.as_str(), false));
                    }
                }
            }
        }

        order
    }

    /// Transitive supertypes of a class, excluding the class itself
    pub fn supertype_closure(&self, name: &str) -> BTreeSet<String> {
        self.linearize(name)
            .into_iter()
            .filter(|class| *class != name)
            .map(str::to_string)
            .collect()
    }

    /// Reflexive, transitive subtype test
    pub fn is_kind_of(&self, class: &str, name: &str) -> bool {
        class == name || self.linearize(class).contains(&name)
    }

    /// Attributes declared by the class and all its supertypes, supertypes first
    pub fn all_attributes(&self, name: &str) -> Vec<&AttributeDescriptor> {
        let mut seen = HashSet::new();
        let mut attributes = Vec::new();
        for class_name in self.linearize(name) {
            if let Some(class) = self.classes.get(class_name) {
                for attribute in &class.descriptor.attributes {
                    if seen.insert(attribute.name.as_str()) {
                        attributes.push(attribute);
                    }
                }
            }
        }
        attributes
    }

    /// References declared by the class and all its supertypes, supertypes first
    pub fn all_references(&self, name: &str) -> Vec<OwnedReference<'_>> {
        let mut seen = HashSet::new();
        let mut references = Vec::new();
        for class_name in self.linearize(name) {
            if let Some((owner, class)) = self.classes.get_key_value(class_name) {
                for reference in &class.descriptor.references {
                    if seen.insert(reference.name.as_str()) {
                        references.push(OwnedReference {
                            owner: owner.as_str(),
                            reference,
                        });
                    }
                }
            }
        }
        references
    }

    pub fn containment_features(&self, name: &str) -> Vec<OwnedReference<'_>> {
        self.all_references(name)
            .into_iter()
            .filter(|r| r.reference.containment)
            .collect()
    }

    pub fn cross_reference_features(&self, name: &str) -> Vec<OwnedReference<'_>> {
        self.all_references(name)
            .into_iter()
            .filter(|r| !r.reference.containment)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_metamodel;

    #[test]
    fn test_supertype_closure_is_transitive() {
        let index = sample_metamodel();
        let closure = index.supertype_closure("SpecialisedBusinessComponent");

        assert!(closure.contains("BusinessComponent"));
        assert!(closure.contains("TopLevelDictionaryEntry"));
        assert!(closure.contains("RepositoryConcept"));
        assert!(!closure.contains("SpecialisedBusinessComponent"));
    }

    #[test]
    fn test_is_kind_of_reflexive_and_transitive() {
        let index = sample_metamodel();

        assert!(index.is_kind_of("BusinessComponent", "BusinessComponent"));
        assert!(index.is_kind_of("SpecialisedBusinessComponent", "RepositoryConcept"));
        assert!(!index.is_kind_of("BusinessComponent", "SpecialisedBusinessComponent"));
        assert!(!index.is_kind_of("DataDictionary", "RepositoryConcept"));
    }

    #[test]
    fn test_inherited_features_listed_supertypes_first() {
        let index = sample_metamodel();
        let attributes: Vec<&str> = index
            .all_attributes("BusinessAssociationEnd")
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(attributes, vec!["name", "definition", "registrationStatus", "examples", "isDerived"]);

        let references: Vec<String> = index
            .all_references("BusinessAssociationEnd")
            .iter()
            .map(|r| r.qualified_name())
            .collect();
        assert_eq!(
            references,
            vec!["BusinessElement.businessElementType", "BusinessAssociationEnd.opposite"]
        );
    }

    #[test]
    fn test_inheritance_cycle_terminates() {
        let document: MetamodelDocument = serde_json::from_value(serde_json::json!({
            "packages": [{
                "name": "loop",
                "classes": [
                    {"name": "A", "supertypes": ["B"]},
                    {"name": "B", "supertypes": ["A"]}
                ]
            }]
        }))
        .unwrap();
        let index = MetamodelIndex::new(document);

        assert_eq!(index.supertype_closure("A").into_iter().collect::<Vec<_>>(), vec!["B"]);
        assert!(index.is_kind_of("B", "A"));
    }

    #[test]
    fn test_subpackage_classes_carry_their_namespace() {
        let index = sample_metamodel();
        assert_eq!(index.ns_uri("Repository"), Some("urn:iso:std:iso:20022:2013:ecore"));
        assert_eq!(index.ns_uri("MessageDefinition"), Some("urn:iso:std:iso:20022:2013:ecore:message"));
    }

    #[test]
    fn test_effective_default_for_enumerations() {
        let index = sample_metamodel();
        let status = index
            .all_attributes("BusinessComponent")
            .into_iter()
            .find(|a| a.name == "registrationStatus")
            .unwrap();
        assert_eq!(
            status.effective_default(),
            Some(Value::Str("Provisionally Registered".to_string()))
        );
    }
}
