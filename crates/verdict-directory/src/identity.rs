//! Identity to user resolution.

use crate::error::{DirectoryError, IdentityLookupError};
use crate::model::{DirectoryObject, RelationRequest};
use crate::Directory;

/// Object type of identity records.
pub const IDENTITY_OBJECT_TYPE: &str = "identity";
/// Relation binding an identity to its user.
pub const IDENTIFIER_RELATION: &str = "identifier";
/// Object type of user records.
pub const USER_OBJECT_TYPE: &str = "user";

/// Resolve `identity` to the hydrated user object bound to it.
///
/// Issues exactly one relation lookup. A not-found report, an empty result
/// set, and a missing hydrated object all yield
/// [`IdentityLookupError::NotFound`].
pub async fn lookup_identity(
    directory: &dyn Directory,
    identity: &str,
) -> Result<DirectoryObject, IdentityLookupError> {
    let request = RelationRequest {
        object_type: IDENTITY_OBJECT_TYPE.to_string(),
        object_key: identity.to_string(),
        relation: IDENTIFIER_RELATION.to_string(),
        subject_type: USER_OBJECT_TYPE.to_string(),
        with_objects: true,
    };

    let not_found = |reason: &str| IdentityLookupError::NotFound {
        identity: identity.to_string(),
        reason: reason.to_string(),
    };

    let mut response = match directory.get_relation(&request).await {
        Ok(resp) => resp,
        Err(DirectoryError::NotFound { .. }) => return Err(not_found("no such identity")),
        Err(e) => return Err(IdentityLookupError::Directory(e)),
    };

    let subject_id = match response.results.first() {
        Some(tuple) => tuple.subject.id.clone(),
        None => return Err(not_found("no relation results")),
    };

    if response.objects.is_empty() {
        return Err(not_found("no objects found in relation"));
    }

    response
        .objects
        .remove(&subject_id)
        .ok_or_else(|| not_found("related user was not hydrated"))
}
