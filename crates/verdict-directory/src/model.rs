//! Relation lookup request and response types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use verdict_core::Subject;

/// Parameters of a single relation lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRequest {
    /// Type of the object the relation starts from, e.g. `identity`.
    pub object_type: String,
    /// Key of that object, e.g. the raw identity string.
    pub object_key: String,
    /// Relation name, e.g. `identifier`.
    pub relation: String,
    /// Type of the related subject, e.g. `user`.
    pub subject_type: String,
    /// Whether the response should hydrate related objects.
    pub with_objects: bool,
}

/// Reference to a directory object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectRef {
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub key: String,
}

impl ObjectRef {
    /// Reference an object by type and key.
    pub fn keyed(object_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            key: key.into(),
            ..Self::default()
        }
    }

    /// Reference an object by type and id.
    pub fn with_id(object_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            id: id.into(),
            ..Self::default()
        }
    }
}

/// One `object --relation--> subject` edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTuple {
    pub object: ObjectRef,
    pub relation: String,
    pub subject: ObjectRef,
}

/// A hydrated directory object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DirectoryObject {
    pub id: String,
    #[serde(rename = "type", default)]
    pub object_type: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl From<DirectoryObject> for Subject {
    fn from(obj: DirectoryObject) -> Self {
        let email = obj
            .properties
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Subject {
            id: obj.id,
            display_name: obj.display_name,
            email,
            properties: obj.properties,
        }
    }
}

/// Result of a relation lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationResponse {
    #[serde(default)]
    pub results: Vec<RelationTuple>,
    /// Hydrated objects keyed by object id.
    #[serde(default)]
    pub objects: HashMap<String, DirectoryObject>,
}
