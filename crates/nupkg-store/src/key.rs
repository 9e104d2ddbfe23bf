//! Package identity.

use std::path::{Component, Path};

use serde::Serialize;

use crate::error::{Result, StoreError};

/// The (id, version) pair identifying a package.
///
/// The version is an opaque token: `1.0` and `1.0.0` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PackageKey {
    id: String,
    version: String,
}

impl PackageKey {
    /// Create a key, rejecting an id or version that is blank or is not a
    /// single relative path segment.
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let version = version.into();
        check_id(&id)?;
        check_version(&version)?;
        Ok(PackageKey { id, version })
    }

    /// The package id as supplied.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The package version as supplied.
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl std::fmt::Display for PackageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

pub(crate) fn check_id(id: &str) -> Result<()> {
    check_segment("id", id)
}

pub(crate) fn check_version(version: &str) -> Result<()> {
    check_segment("version", version)
}

/// Ids and versions become single path segments under the root.
fn check_segment(what: &str, value: &str) -> Result<()> {
    let invalid = |reason: &str| StoreError::InvalidPackageKey {
        detail: format!("package {what} '{value}' {reason}"),
    };
    if value.trim().is_empty() {
        return Err(StoreError::InvalidPackageKey {
            detail: format!("package {what} must not be empty"),
        });
    }
    if value == "." || value == ".." {
        return Err(invalid("is not a valid path segment"));
    }
    if value.contains(['/', '\\']) {
        return Err(invalid("must not contain a path separator"));
    }
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid("must be a single relative path segment")),
    }
}
