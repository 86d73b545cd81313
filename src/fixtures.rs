//! Shared test fixtures: a small ISO 20022 flavoured metamodel and repository.
//!
//! Preorder local ids of the sample instance:
//!
//! ```text
//! o1  Repository                     _repo
//! o2    DataDictionary               (no xmi id)
//! o3      BusinessComponent          _bc_account   "Account"
//! o4        BusinessAttribute        (no xmi id)   "Number"  -> o10
//! o5        BusinessAssociationEnd   _bae_owner    "Owner"   -> o6, opposite o7
//! o6      BusinessComponent          _bc_party     "Party"
//! o7        BusinessAssociationEnd   _bae_accounts "Accounts" -> o3, opposite o5
//! o8      BusinessComponent          _bc_person    "Person"  superType -> o6
//! o9      SpecialisedBusinessComponent _bc_agent   "Agent"
//! o10     DataType                   _dt_text      "Max35Text"
//! ```

use crate::artifacts::InstanceDocument;
use crate::graph::{build_object_graph, ObjectGraph};
use crate::metamodel::{MetamodelDocument, MetamodelIndex};
use serde_json::json;

pub(crate) fn sample_metamodel_json() -> serde_json::Value {
    json!({
        "packages": [{
            "name": "iso20022",
            "nsURI": "urn:iso:std:iso:20022:2013:ecore",
            "classes": [
                {
                    "name": "RepositoryConcept",
                    "abstract": true,
                    "attributes": [
                        {"name": "name", "type": "EString"},
                        {"name": "definition", "type": "EString"},
                        {
                            "name": "registrationStatus",
                            "type": "RegistrationStatus",
                            "literals": ["Provisionally Registered", "Registered", "Obsolete"]
                        },
                        {"name": "examples", "type": "EString", "many": true}
                    ]
                },
                {"name": "TopLevelDictionaryEntry", "abstract": true, "supertypes": ["RepositoryConcept"]},
                {
                    "name": "BusinessComponent",
                    "supertypes": ["TopLevelDictionaryEntry"],
                    "references": [
                        {"name": "element", "type": "BusinessElement", "many": true, "containment": true},
                        {"name": "superType", "type": "BusinessComponent"},
                        {"name": "subType", "type": "BusinessComponent", "many": true}
                    ]
                },
                {"name": "SpecialisedBusinessComponent", "supertypes": ["BusinessComponent"]},
                {
                    "name": "BusinessElement",
                    "abstract": true,
                    "supertypes": ["RepositoryConcept"],
                    "attributes": [
                        {"name": "isDerived", "type": "EBoolean", "default": false}
                    ],
                    "references": [
                        {"name": "businessElementType", "type": "TopLevelDictionaryEntry"}
                    ]
                },
                {"name": "BusinessAttribute", "supertypes": ["BusinessElement"]},
                {
                    "name": "BusinessAssociationEnd",
                    "supertypes": ["BusinessElement"],
                    "references": [
                        {"name": "opposite", "type": "BusinessAssociationEnd"}
                    ]
                },
                {"name": "DataType", "supertypes": ["TopLevelDictionaryEntry"]},
                {
                    "name": "Repository",
                    "attributes": [{"name": "name", "type": "EString"}],
                    "references": [
                        {"name": "dataDictionary", "type": "DataDictionary", "containment": true}
                    ]
                },
                {
                    "name": "DataDictionary",
                    "references": [
                        {
                            "name": "topLevelDictionaryEntry",
                            "type": "TopLevelDictionaryEntry",
                            "many": true,
                            "containment": true
                        }
                    ]
                }
            ],
            "subpackages": [{
                "name": "message",
                "nsURI": "urn:iso:std:iso:20022:2013:ecore:message",
                "classes": [
                    {
                        "name": "MessageDefinition",
                        "supertypes": ["RepositoryConcept"],
                        "references": [
                            {"name": "trace", "type": "BusinessComponent", "many": true}
                        ]
                    }
                ]
            }]
        }]
    })
}

pub(crate) fn sample_instance_json() -> serde_json::Value {
    json!({
        "roots": [{
            "eClass": "Repository",
            "xmi:id": "_repo",
            "attributes": {"name": "Repo"},
            "contents": {
                "dataDictionary": [{
                    "eClass": "DataDictionary",
                    "contents": {
                        "topLevelDictionaryEntry": [
                            {
                                "eClass": "BusinessComponent",
                                "xmi:id": "_bc_account",
                                "attributes": {
                                    "name": "Account",
                                    "registrationStatus": "Registered",
                                    "examples": ["ACC-1", "ACC-2"]
                                },
                                "contents": {
                                    "element": [
                                        {
                                            "eClass": "BusinessAttribute",
                                            "attributes": {"name": "Number"},
                                            "references": {"businessElementType": ["_dt_text"]}
                                        },
                                        {
                                            "eClass": "BusinessAssociationEnd",
                                            "xmi:id": "_bae_owner",
                                            "attributes": {"name": "Owner"},
                                            "references": {
                                                "businessElementType": ["_bc_party"],
                                                "opposite": ["_bae_accounts"]
                                            }
                                        }
                                    ]
                                }
                            },
                            {
                                "eClass": "BusinessComponent",
                                "xmi:id": "_bc_party",
                                "attributes": {"name": "Party", "registrationStatus": "Registered"},
                                "contents": {
                                    "element": [{
                                        "eClass": "BusinessAssociationEnd",
                                        "xmi:id": "_bae_accounts",
                                        "attributes": {"name": "Accounts", "isDerived": false},
                                        "references": {
                                            "businessElementType": ["_bc_account"],
                                            "opposite": ["_bae_owner"]
                                        }
                                    }]
                                }
                            },
                            {
                                "eClass": "BusinessComponent",
                                "xmi:id": "_bc_person",
                                "attributes": {"name": "Person"},
                                "references": {"superType": ["_bc_party"]}
                            },
                            {
                                "eClass": "SpecialisedBusinessComponent",
                                "xmi:id": "_bc_agent",
                                "attributes": {"name": "Agent"}
                            },
                            {
                                "eClass": "DataType",
                                "xmi:id": "_dt_text",
                                "attributes": {"name": "Max35Text"}
                            }
                        ]
                    }
                }]
            }
        }]
    })
}

pub(crate) fn sample_metamodel() -> MetamodelIndex {
    let document: MetamodelDocument =
        serde_json::from_value(sample_metamodel_json()).expect("fixture metamodel");
    MetamodelIndex::new(document)
}

pub(crate) fn sample_instance() -> InstanceDocument {
    serde_json::from_value(sample_instance_json()).expect("fixture instance")
}

pub(crate) fn sample_graph() -> (MetamodelIndex, ObjectGraph) {
    let metamodel = sample_metamodel();
    let instance = sample_instance();
    let graph = build_object_graph(&metamodel, &instance.roots);
    (metamodel, graph)
}

/// Object id for a preorder local id such as `"o3"`.
pub(crate) fn oid(graph: &ObjectGraph, local_id: &str) -> crate::types::ObjectId {
    graph
        .find_by_local_id(local_id)
        .unwrap_or_else(|| panic!("no object {}", local_id))
}
