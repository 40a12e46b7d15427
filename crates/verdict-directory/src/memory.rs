//! # In-Memory Directory
//!
//! A seedable directory that keeps objects and relation tuples in process
//! memory. Lookups answer exactly like a remote directory would: an object
//! with no matching relation is reported as not found.
//!
//! Seed format (JSON):
//!
//! ```json
//! {
//!   "users": [
//!     {
//!       "id": "u1",
//!       "display_name": "Alice",
//!       "properties": {"email": "alice@example.com"},
//!       "identities": ["alice@example.com", "alice"]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::DirectoryError;
use crate::identity::{IDENTIFIER_RELATION, IDENTITY_OBJECT_TYPE, USER_OBJECT_TYPE};
use crate::model::{DirectoryObject, ObjectRef, RelationRequest, RelationResponse, RelationTuple};
use crate::Directory;

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<String, DirectoryObject>,
    relations: Vec<RelationTuple>,
}

/// In-process directory.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    inner: RwLock<Inner>,
}

#[derive(Deserialize)]
struct Seed {
    #[serde(default)]
    users: Vec<SeedUser>,
}

#[derive(Deserialize)]
struct SeedUser {
    id: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default)]
    identities: Vec<String>,
}

impl MemoryDirectory {
    /// An empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from a JSON seed document.
    pub fn from_json(seed: Value) -> Result<Self, DirectoryError> {
        let seed: Seed = serde_json::from_value(seed)?;
        let dir = Self::new();
        for user in seed.users {
            let object = DirectoryObject {
                key: user.id.clone(),
                id: user.id,
                object_type: USER_OBJECT_TYPE.to_string(),
                display_name: user.display_name,
                properties: user.properties,
            };
            dir.add_user(object, user.identities);
        }
        Ok(dir)
    }

    /// Insert or replace an object.
    pub fn add_object(&self, object: DirectoryObject) {
        self.inner.write().objects.insert(object.id.clone(), object);
    }

    /// Add a relation tuple. The subject object need not exist.
    pub fn add_relation(&self, tuple: RelationTuple) {
        self.inner.write().relations.push(tuple);
    }

    /// Insert a user and bind each identity string to it.
    pub fn add_user<I, S>(&self, user: DirectoryObject, identities: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let user_id = user.id.clone();
        let mut inner = self.inner.write();
        inner.objects.insert(user_id.clone(), user);
        for identity in identities {
            inner.relations.push(RelationTuple {
                object: ObjectRef::keyed(IDENTITY_OBJECT_TYPE, identity),
                relation: IDENTIFIER_RELATION.to_string(),
                subject: ObjectRef::with_id(USER_OBJECT_TYPE, user_id.clone()),
            });
        }
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn get_relation(
        &self,
        request: &RelationRequest,
    ) -> Result<RelationResponse, DirectoryError> {
        let inner = self.inner.read();
        let results: Vec<RelationTuple> = inner
            .relations
            .iter()
            .filter(|t| {
                t.object.object_type == request.object_type
                    && t.object.key == request.object_key
                    && t.relation == request.relation
                    && t.subject.object_type == request.subject_type
            })
            .cloned()
            .collect();

        if results.is_empty() {
            return Err(DirectoryError::NotFound {
                object_type: request.object_type.clone(),
                object_key: request.object_key.clone(),
            });
        }

        let mut objects = HashMap::new();
        if request.with_objects {
            for tuple in &results {
                if let Some(obj) = inner.objects.get(&tuple.subject.id) {
                    objects.insert(obj.id.clone(), obj.clone());
                }
            }
        }

        Ok(RelationResponse { results, objects })
    }
}
