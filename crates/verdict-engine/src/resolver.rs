//! # Identity Resolver
//!
//! Turns an [`IdentityContext`] into a [`Subject`]:
//!
//! - `UNKNOWN` fails with [`ResolveError::InvalidArgument`] before any lookup.
//! - `NONE` yields the anonymous subject without a lookup.
//! - Every other type issues exactly one directory relation lookup. A
//!   missing identity, an empty relation, and an unhydrated user all yield
//!   [`ResolveError::UserNotFound`].

use std::sync::Arc;

use verdict_core::{DecisionError, IdentityContext, IdentityType, Subject};
use verdict_directory::{lookup_identity, Directory, IdentityLookupError};

use crate::scope::CallScope;

/// Failure to resolve an identity context.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The identity context is malformed.
    #[error("invalid identity context: {0}")]
    InvalidArgument(String),
    /// No user is bound to the identity.
    #[error("user not found: {0}")]
    UserNotFound(String),
    /// The directory could not be consulted.
    #[error("directory lookup failed: {0}")]
    Directory(String),
    /// The request scope ended before the lookup completed.
    #[error(transparent)]
    Interrupted(DecisionError),
}

/// Resolves identity claims through an optional directory.
///
/// Without a directory every non-anonymous identity is reported as not
/// found.
#[derive(Clone, Default)]
pub struct IdentityResolver {
    directory: Option<Arc<dyn Directory>>,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("has_directory", &self.directory.is_some())
            .finish()
    }
}

impl IdentityResolver {
    /// Resolver backed by `directory`.
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            directory: Some(directory),
        }
    }

    /// Resolver with no directory.
    pub fn without_directory() -> Self {
        Self::default()
    }

    /// Resolve `ctx` within `scope`.
    pub async fn resolve(
        &self,
        scope: &CallScope,
        ctx: &IdentityContext,
    ) -> Result<Subject, ResolveError> {
        match ctx.identity_type {
            IdentityType::Unknown => {
                return Err(ResolveError::InvalidArgument("identity type UNKNOWN".into()))
            }
            IdentityType::None => return Ok(Subject::anonymous()),
            IdentityType::Sub | IdentityType::Jwt | IdentityType::Manual => {}
        }

        let directory = self
            .directory
            .as_ref()
            .ok_or_else(|| ResolveError::UserNotFound("no directory configured".into()))?;

        let lookup = scope
            .run(lookup_identity(directory.as_ref(), &ctx.identity))
            .await
            .map_err(ResolveError::Interrupted)?;

        match lookup {
            Ok(object) => Ok(Subject::from(object)),
            Err(e @ IdentityLookupError::NotFound { .. }) => {
                Err(ResolveError::UserNotFound(e.to_string()))
            }
            Err(IdentityLookupError::Directory(e)) => Err(ResolveError::Directory(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdict_directory::{DirectoryObject, MemoryDirectory};

    fn resolver() -> IdentityResolver {
        let dir = MemoryDirectory::new();
        let mut properties = serde_json::Map::new();
        properties.insert("email".into(), "alice@example.com".into());
        dir.add_user(
            DirectoryObject {
                id: "u1".into(),
                object_type: "user".into(),
                properties,
                ..DirectoryObject::default()
            },
            ["alice@example.com"],
        );
        IdentityResolver::new(Arc::new(dir))
    }

    #[tokio::test]
    async fn resolves_known_identity() {
        let ctx = IdentityContext::new(IdentityType::Sub, "alice@example.com");
        let subject = resolver()
            .resolve(&CallScope::unbounded(), &ctx)
            .await
            .unwrap();
        assert_eq!(subject.id, "u1");
        assert_eq!(subject.email, "alice@example.com");
    }

    #[tokio::test]
    async fn none_is_anonymous_without_lookup() {
        let ctx = IdentityContext::new(IdentityType::None, "ignored");
        let subject = IdentityResolver::without_directory()
            .resolve(&CallScope::unbounded(), &ctx)
            .await
            .unwrap();
        assert_eq!(subject, Subject::anonymous());
    }

    #[tokio::test]
    async fn unknown_type_is_invalid_argument() {
        let ctx = IdentityContext::new(IdentityType::Unknown, "alice@example.com");
        let err = resolver()
            .resolve(&CallScope::unbounded(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn missing_identity_is_user_not_found_for_every_lookup_type() {
        let resolver = resolver();
        for ty in [IdentityType::Sub, IdentityType::Jwt, IdentityType::Manual] {
            let ctx = IdentityContext::new(ty, "mallory@example.com");
            let err = resolver
                .resolve(&CallScope::unbounded(), &ctx)
                .await
                .unwrap_err();
            assert!(matches!(err, ResolveError::UserNotFound(_)), "{ty}: {err}");
        }
    }

    #[tokio::test]
    async fn no_directory_means_user_not_found() {
        let ctx = IdentityContext::new(IdentityType::Sub, "alice@example.com");
        let err = IdentityResolver::without_directory()
            .resolve(&CallScope::unbounded(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn cancelled_scope_interrupts_lookup() {
        let (scope, handle) = CallScope::cancellable();
        handle.cancel();
        let ctx = IdentityContext::new(IdentityType::Sub, "alice@example.com");
        let err = resolver().resolve(&scope, &ctx).await.unwrap_err();
        assert!(matches!(err, ResolveError::Interrupted(DecisionError::Cancelled)));
    }
}
