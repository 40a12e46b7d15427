//! # Package Paths, Separators, and Decision Filters
//!
//! Compiled packages are always named internally with `.` between segments.
//! Callers address them either with dots (`app.GET.users`) or slashes
//! (`app/GET/users`); [`PathSeparator`] selects the external form. Translation
//! is a lossless bijection for well-formed paths, i.e. paths whose segments
//! contain neither separator.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const INTERNAL_SEPARATOR: char = '.';

/// Failure to translate a path between external and internal form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The separator mode is unset or unrecognized.
    #[error("unknown path separator mode")]
    UnknownSeparator,
}

/// External path separator mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PathSeparator {
    /// `app.GET.users`
    #[default]
    #[serde(rename = "PATH_SEPARATOR_DOT", alias = "dot")]
    Dot,
    /// `app/GET/users`
    #[serde(rename = "PATH_SEPARATOR_SLASH", alias = "slash")]
    Slash,
    /// Unset or unrecognized. Rejected before evaluation.
    #[serde(rename = "PATH_SEPARATOR_UNKNOWN", alias = "unknown", other)]
    Unknown,
}

impl PathSeparator {
    /// The separator character, or `None` for [`PathSeparator::Unknown`].
    pub fn as_char(&self) -> Option<char> {
        match self {
            Self::Unknown => None,
            Self::Dot => Some('.'),
            Self::Slash => Some('/'),
        }
    }

    /// Convert an external path in this mode to the internal package name.
    pub fn to_internal(&self, external: &str) -> Result<String, PathError> {
        let sep = self.as_char().ok_or(PathError::UnknownSeparator)?;
        Ok(external.replace(sep, &INTERNAL_SEPARATOR.to_string()))
    }

    /// Convert an internal package name to an external path in this mode.
    pub fn to_external(&self, internal: &str) -> Result<String, PathError> {
        let sep = self.as_char().ok_or(PathError::UnknownSeparator)?;
        Ok(internal.replace(INTERNAL_SEPARATOR, &sep.to_string()))
    }
}

/// Rewrite `path` so every `.` or `/` becomes the separator of `target`.
pub fn translate(target: PathSeparator, path: &str) -> Result<String, PathError> {
    let sep = target.as_char().ok_or(PathError::UnknownSeparator)?;
    Ok(path
        .chars()
        .map(|c| if c == '.' || c == '/' { sep } else { c })
        .collect())
}

/// One compiled rule package as surfaced to callers.
///
/// The internal name is kept private; serialization only emits the external
/// path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDescriptor {
    #[serde(skip)]
    package_name: String,
    /// Externally addressed path in the caller's separator mode.
    pub path: String,
}

impl PackageDescriptor {
    /// Describe `package_name` for a caller using separator mode `sep`.
    pub fn new(package_name: impl Into<String>, sep: PathSeparator) -> Result<Self, PathError> {
        let package_name = package_name.into();
        let path = sep.to_external(&package_name)?;
        Ok(Self { package_name, path })
    }

    /// Internal package name, used only to build evaluation queries.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }
}

/// Every package whose external path starts with `external_prefix`.
///
/// Preserves the order of `package_names`. An empty prefix matches all.
pub fn packages_under<I, S>(
    package_names: I,
    sep: PathSeparator,
    external_prefix: &str,
) -> Result<Vec<PackageDescriptor>, PathError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out = Vec::new();
    for name in package_names {
        let descriptor = PackageDescriptor::new(name, sep)?;
        if descriptor.path.starts_with(external_prefix) {
            out.push(descriptor);
        }
    }
    Ok(out)
}

/// Predicate over decision names built from a requested decision set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionFilter {
    /// The request was exactly `["*"]`.
    Any,
    /// Accept names present in the set.
    Only(HashSet<String>),
}

impl DecisionFilter {
    /// Build a filter from requested decision names.
    pub fn new(decisions: &[String]) -> Self {
        if decisions.len() == 1 && decisions[0] == "*" {
            return Self::Any;
        }
        Self::Only(decisions.iter().cloned().collect())
    }

    /// Whether `name` passes the filter.
    pub fn accepts(&self, name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(names) => names.contains(name),
        }
    }
}
