//! # verdict-directory -- Directory collaborator for the verdict authorizer
//!
//! The authorizer never stores identities itself. It asks a directory for
//! the relation `identity --identifier--> user` and hydrates the user object.
//!
//! - [`Directory`] is the collaborator seam: one `get_relation` call.
//! - [`lookup_identity`] performs the identity walk and folds every
//!   "nothing there" outcome into [`IdentityLookupError::NotFound`].
//! - [`HttpDirectory`] talks to a directory REST gateway.
//! - [`MemoryDirectory`] is an in-process directory for tests and demos.
//!
//! No client in this crate retries. Retry policy belongs to the caller.

pub mod error;
pub mod http;
pub mod identity;
pub mod memory;
pub mod model;

pub use error::{DirectoryError, IdentityLookupError};
pub use http::{DirectoryConfig, HttpDirectory};
pub use identity::lookup_identity;
pub use memory::MemoryDirectory;
pub use model::{DirectoryObject, ObjectRef, RelationRequest, RelationResponse, RelationTuple};

use async_trait::async_trait;

/// A directory that can answer relation lookups.
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// via `Arc` across request tasks.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Look up relations from an object to subjects of a given type.
    ///
    /// Returns [`DirectoryError::NotFound`] when the directory reports the
    /// object or relation does not exist.
    async fn get_relation(&self, request: &RelationRequest)
        -> Result<RelationResponse, DirectoryError>;
}
