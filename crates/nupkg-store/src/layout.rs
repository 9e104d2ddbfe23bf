//! Deterministic on-disk layout for cached packages.
//!
//! The default layout keeps every version of a package under one
//! version-list directory:
//!
//! ```text
//! <root>/
//!   <id>/
//!     <id>.packagedownload.marker
//!     <version>/
//!       <id>.<version>.nupkg
//!       <id>.nuspec
//!       <id>.<version>.nupkg.sha512
//! ```
//!
//! Segments are lowercased when the resolver folds case. The directory and
//! archive naming can be swapped out through [`LayoutStrategy`]; the hash
//! file and download marker names are fixed.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::constants::{
    HASH_FILE_EXTENSION, NUPKG_EXTENSION, NUSPEC_EXTENSION, PACKAGE_DOWNLOAD_MARKER_FILE_EXTENSION,
};
use crate::error::Result;
use crate::key::{check_id, check_version, PackageKey};

/// Naming rules for package directories and files.
///
/// Every method receives segments that are already normalized by the
/// resolver. Default bodies implement the version-folder layout.
pub trait LayoutStrategy: fmt::Debug + Send + Sync {
    /// Directory, relative to the root, holding all versions of a package.
    fn version_list_directory(&self, id: &str) -> PathBuf {
        PathBuf::from(id)
    }

    /// Directory, relative to the root, holding one package version.
    fn package_directory(&self, id: &str, version: &str) -> PathBuf {
        self.version_list_directory(id).join(version)
    }

    /// Absolute (or root-relative) install directory of one package version.
    fn install_path(&self, root: &Path, id: &str, version: &str) -> PathBuf {
        root.join(self.package_directory(id, version))
    }

    /// File name of the package archive.
    fn package_file_name(&self, id: &str, version: &str) -> String {
        format!("{id}.{version}{NUPKG_EXTENSION}")
    }

    /// File name of the package manifest. Never embeds the version.
    fn manifest_file_name(&self, id: &str, _version: &str) -> String {
        format!("{id}{NUSPEC_EXTENSION}")
    }

    /// Version named by an entry of the version-list directory of `id`, or
    /// `None` if the entry is not an install directory of that package.
    fn version_from_entry(&self, _id: &str, entry: &str, is_dir: bool) -> Option<String> {
        is_dir.then(|| entry.to_string())
    }

    /// Package id named by an entry of the root directory, if any.
    fn id_from_entry(&self, entry: &str, is_dir: bool) -> Option<String> {
        is_dir.then(|| entry.to_string())
    }
}

/// `<root>/<id>/<version>/`, the global package folder layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionFolderLayout;

impl LayoutStrategy for VersionFolderLayout {}

/// `<root>/<id>.<version>/`, one directory per package version.
///
/// The root itself is the version-list directory, so download markers sit
/// directly under it and package ids are listed from those markers. A
/// directory `<id>.<rest>` counts as a version of `id` only when `<rest>`
/// starts with a digit.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatLayout;

impl LayoutStrategy for FlatLayout {
    fn version_list_directory(&self, _id: &str) -> PathBuf {
        PathBuf::new()
    }

    fn package_directory(&self, id: &str, version: &str) -> PathBuf {
        PathBuf::from(format!("{id}.{version}"))
    }

    fn version_from_entry(&self, id: &str, entry: &str, is_dir: bool) -> Option<String> {
        if !is_dir {
            return None;
        }
        let version = entry.strip_prefix(id)?.strip_prefix('.')?;
        version
            .starts_with(|c: char| c.is_ascii_digit())
            .then(|| version.to_string())
    }

    fn id_from_entry(&self, entry: &str, is_dir: bool) -> Option<String> {
        if is_dir {
            return None;
        }
        entry
            .strip_suffix(PACKAGE_DOWNLOAD_MARKER_FILE_EXTENSION)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

/// Every path the cache needs for one package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPaths {
    /// Root-joined version-list directory.
    pub version_list_path: PathBuf,
    /// Install directory of this version.
    pub install_path: PathBuf,
    /// Package archive path.
    pub package_file_path: PathBuf,
    /// Manifest path.
    pub manifest_file_path: PathBuf,
    /// Hash sidecar path.
    pub hash_path: PathBuf,
    /// Download marker path.
    pub download_marker_path: PathBuf,
}

/// Maps package keys to paths under a root directory.
///
/// Pure: no operation touches the filesystem.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    lowercase: bool,
    layout: Arc<dyn LayoutStrategy>,
}

impl PathResolver {
    /// Resolver with the version-folder layout, lowercasing ids and versions.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PathResolver::with_case(root, true)
    }

    /// Resolver with the version-folder layout and explicit case folding.
    pub fn with_case(root: impl Into<PathBuf>, lowercase: bool) -> Self {
        PathResolver::with_layout(root, lowercase, Arc::new(VersionFolderLayout))
    }

    /// Resolver with a custom layout strategy.
    pub fn with_layout(
        root: impl Into<PathBuf>,
        lowercase: bool,
        layout: Arc<dyn LayoutStrategy>,
    ) -> Self {
        PathResolver {
            root: root.into(),
            lowercase,
            layout,
        }
    }

    /// The packages root directory, as supplied.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether ids and versions are lowercased.
    pub fn is_lowercase(&self) -> bool {
        self.lowercase
    }

    /// Normalize a package id.
    pub fn normalize_id(&self, id: &str) -> String {
        self.fold(id)
    }

    /// Normalize a version token. The version is not parsed.
    pub fn normalize_version(&self, version: &str) -> String {
        self.fold(version)
    }

    /// Directory, relative to the root, holding all versions of a package.
    pub fn version_list_directory(&self, id: &str) -> Result<PathBuf> {
        check_id(id)?;
        Ok(self.layout.version_list_directory(&self.normalize_id(id)))
    }

    /// Root-joined version-list directory.
    pub fn version_list_path(&self, id: &str) -> Result<PathBuf> {
        let dir = self.version_list_directory(id)?;
        if dir.as_os_str().is_empty() {
            return Ok(self.root.clone());
        }
        Ok(self.root.join(dir))
    }

    /// Version named by an entry of the version-list directory of `id`.
    pub fn version_from_entry(&self, id: &str, entry: &str, is_dir: bool) -> Result<Option<String>> {
        check_id(id)?;
        Ok(self
            .layout
            .version_from_entry(&self.normalize_id(id), entry, is_dir))
    }

    /// Package id named by an entry of the root directory.
    pub fn id_from_entry(&self, entry: &str, is_dir: bool) -> Option<String> {
        self.layout.id_from_entry(entry, is_dir)
    }

    /// Directory, relative to the root, holding one package version.
    pub fn package_directory(&self, id: &str, version: &str) -> Result<PathBuf> {
        let (id, version) = self.normalize_pair(id, version)?;
        Ok(self.layout.package_directory(&id, &version))
    }

    /// Install directory of one package version.
    pub fn install_path(&self, id: &str, version: &str) -> Result<PathBuf> {
        let (id, version) = self.normalize_pair(id, version)?;
        Ok(self.layout.install_path(&self.root, &id, &version))
    }

    /// `{id}.{version}.nupkg` under the default layout.
    pub fn package_file_name(&self, id: &str, version: &str) -> Result<String> {
        let (id, version) = self.normalize_pair(id, version)?;
        Ok(self.layout.package_file_name(&id, &version))
    }

    /// Path of the package archive.
    pub fn package_file_path(&self, id: &str, version: &str) -> Result<PathBuf> {
        Ok(self
            .install_path(id, version)?
            .join(self.package_file_name(id, version)?))
    }

    /// `{id}.nuspec` under the default layout.
    pub fn manifest_file_name(&self, id: &str, version: &str) -> Result<String> {
        let (id, version) = self.normalize_pair(id, version)?;
        Ok(self.layout.manifest_file_name(&id, &version))
    }

    /// Path of the package manifest.
    pub fn manifest_file_path(&self, id: &str, version: &str) -> Result<PathBuf> {
        Ok(self
            .install_path(id, version)?
            .join(self.manifest_file_name(id, version)?))
    }

    /// `{id}.{version}.nupkg.sha512`, whatever the hash algorithm.
    pub fn hash_file_name(&self, id: &str, version: &str) -> Result<String> {
        let (id, version) = self.normalize_pair(id, version)?;
        Ok(format!("{id}.{version}{HASH_FILE_EXTENSION}"))
    }

    /// Path of the hash sidecar.
    pub fn hash_path(&self, id: &str, version: &str) -> Result<PathBuf> {
        Ok(self
            .install_path(id, version)?
            .join(self.hash_file_name(id, version)?))
    }

    /// `{id}.packagedownload.marker`.
    pub fn package_download_marker_file_name(&self, id: &str) -> Result<String> {
        check_id(id)?;
        Ok(format!(
            "{}{PACKAGE_DOWNLOAD_MARKER_FILE_EXTENSION}",
            self.normalize_id(id)
        ))
    }

    /// Download marker, placed in the version-list directory.
    pub fn package_download_marker_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self
            .version_list_path(id)?
            .join(self.package_download_marker_file_name(id)?))
    }

    /// Compute every path for a package key.
    pub fn resolve(&self, key: &PackageKey) -> Result<ResolvedPaths> {
        let (id, version) = (key.id(), key.version());
        let paths = ResolvedPaths {
            version_list_path: self.version_list_path(id)?,
            install_path: self.install_path(id, version)?,
            package_file_path: self.package_file_path(id, version)?,
            manifest_file_path: self.manifest_file_path(id, version)?,
            hash_path: self.hash_path(id, version)?,
            download_marker_path: self.package_download_marker_path(id)?,
        };
        tracing::debug!(package = %key, install = %paths.install_path.display(), "resolved package paths");
        Ok(paths)
    }

    fn normalize_pair(&self, id: &str, version: &str) -> Result<(String, String)> {
        check_id(id)?;
        check_version(version)?;
        Ok((self.normalize_id(id), self.normalize_version(version)))
    }

    fn fold(&self, s: &str) -> String {
        if self.lowercase {
            s.to_lowercase()
        } else {
            s.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use proptest::prelude::*;

    fn resolver() -> PathResolver {
        PathResolver::new("/packages")
    }

    #[test]
    fn hello_nuget_file_names() {
        let r = resolver();
        assert_eq!(
            r.hash_file_name("HelloNuget", "1.0.2").unwrap(),
            "hellonuget.1.0.2.nupkg.sha512"
        );
        assert_eq!(
            r.package_file_name("HelloNuget", "1.0.2").unwrap(),
            "hellonuget.1.0.2.nupkg"
        );
        assert_eq!(
            r.manifest_file_name("HelloNuget", "1.0.2").unwrap(),
            "hellonuget.nuspec"
        );
        assert_eq!(
            r.package_download_marker_file_name("HelloNuget").unwrap(),
            "hellonuget.packagedownload.marker"
        );
    }

    #[test]
    fn hello_nuget_paths() {
        let r = resolver();
        let install = PathBuf::from("/packages").join("hellonuget").join("1.0.2");
        assert_eq!(r.install_path("HelloNuget", "1.0.2").unwrap(), install);
        assert_eq!(
            r.package_file_path("HelloNuget", "1.0.2").unwrap(),
            install.join("hellonuget.1.0.2.nupkg")
        );
        assert_eq!(
            r.manifest_file_path("HelloNuget", "1.0.2").unwrap(),
            install.join("hellonuget.nuspec")
        );
        assert_eq!(
            r.hash_path("HelloNuget", "1.0.2").unwrap(),
            install.join("hellonuget.1.0.2.nupkg.sha512")
        );
        assert_eq!(
            r.package_download_marker_path("HelloNuget").unwrap(),
            PathBuf::from("/packages")
                .join("hellonuget")
                .join("hellonuget.packagedownload.marker")
        );
    }

    #[test]
    fn case_preserved_without_folding() {
        let r = PathResolver::with_case("root", false);
        assert_eq!(r.normalize_id("HelloNuget"), "HelloNuget");
        assert_eq!(r.normalize_version("1.0.0-Beta"), "1.0.0-Beta");
        assert_eq!(
            r.package_directory("HelloNuget", "1.0.0-Beta").unwrap(),
            PathBuf::from("HelloNuget").join("1.0.0-Beta")
        );
        assert_ne!(
            r.hash_file_name("HelloNuget", "1.0.0-Beta").unwrap(),
            r.hash_file_name("HELLONUGET", "1.0.0-BETA").unwrap()
        );
    }

    #[test]
    fn versions_are_opaque_tokens() {
        let r = resolver();
        assert_ne!(
            r.install_path("pkg", "1.0").unwrap(),
            r.install_path("pkg", "1.0.0").unwrap()
        );
    }

    #[test]
    fn root_is_stored_verbatim() {
        let r = PathResolver::new("relative/root");
        assert_eq!(r.root(), Path::new("relative/root"));
        assert!(r.is_lowercase());
        assert!(r.install_path("a", "1").unwrap().starts_with("relative/root"));
    }

    #[test]
    fn blank_inputs_rejected() {
        let r = resolver();
        assert!(matches!(
            r.install_path("", "1.0.0"),
            Err(StoreError::InvalidPackageKey { .. })
        ));
        assert!(matches!(
            r.hash_file_name("pkg", " "),
            Err(StoreError::InvalidPackageKey { .. })
        ));
        assert!(r.version_list_directory("\t").is_err());
        assert!(r.package_download_marker_file_name("").is_err());
    }

    #[test]
    fn flat_layout_substitutes_directories_only() {
        let r = PathResolver::with_layout("/repo", true, Arc::new(FlatLayout));
        let install = PathBuf::from("/repo").join("hellonuget.1.0.2");
        assert_eq!(r.install_path("HelloNuget", "1.0.2").unwrap(), install);
        assert_eq!(
            r.hash_path("HelloNuget", "1.0.2").unwrap(),
            install.join("hellonuget.1.0.2.nupkg.sha512")
        );
        assert_eq!(
            r.manifest_file_path("HelloNuget", "1.0.2").unwrap(),
            install.join("hellonuget.nuspec")
        );
    }

    #[test]
    fn flat_layout_uses_root_as_version_list() {
        let r = PathResolver::with_layout("/repo", true, Arc::new(FlatLayout));
        assert_eq!(r.version_list_path("HelloNuget").unwrap(), Path::new("/repo"));
        assert!(r
            .install_path("HelloNuget", "1.0.2")
            .unwrap()
            .starts_with(r.version_list_path("HelloNuget").unwrap()));
        assert_eq!(
            r.package_download_marker_path("HelloNuget").unwrap(),
            Path::new("/repo/hellonuget.packagedownload.marker")
        );
    }

    #[test]
    fn flat_layout_parses_entries() {
        let r = PathResolver::with_layout("/repo", true, Arc::new(FlatLayout));
        assert_eq!(
            r.version_from_entry("Foo", "foo.1.2.0", true).unwrap().as_deref(),
            Some("1.2.0")
        );
        // Another package whose id extends this one.
        assert_eq!(r.version_from_entry("Foo", "foo.bar.1.0.0", true).unwrap(), None);
        assert_eq!(r.version_from_entry("Foo", "foo.1.2.0", false).unwrap(), None);
        assert_eq!(
            r.id_from_entry("foo.bar.packagedownload.marker", false).as_deref(),
            Some("foo.bar")
        );
        assert_eq!(r.id_from_entry("foo.1.2.0", true), None);
    }

    #[test]
    fn version_folder_layout_parses_entries() {
        let r = resolver();
        assert_eq!(
            r.version_from_entry("Foo", "1.2.0", true).unwrap().as_deref(),
            Some("1.2.0")
        );
        assert_eq!(
            r.version_from_entry("Foo", "foo.packagedownload.marker", false).unwrap(),
            None
        );
        assert_eq!(r.id_from_entry("foo", true).as_deref(), Some("foo"));
    }

    #[test]
    fn path_escaping_inputs_rejected() {
        let r = resolver();
        assert!(r.install_path("a", "..").is_err());
        assert!(r.install_path("/etc", "1").is_err());
        assert!(r.package_file_path("a/b", "1.0.0").is_err());
        assert!(r.version_list_path("..").is_err());
    }

    #[derive(Debug)]
    struct ShardedLayout;

    impl LayoutStrategy for ShardedLayout {
        fn version_list_directory(&self, id: &str) -> PathBuf {
            let shard: String = id.chars().take(2).collect();
            PathBuf::from(shard).join(id)
        }

        fn manifest_file_name(&self, id: &str, version: &str) -> String {
            format!("{id}.{version}.nuspec")
        }
    }

    #[test]
    fn custom_layout_overrides_are_honored() {
        let r = PathResolver::with_layout("/r", true, Arc::new(ShardedLayout));
        let install = PathBuf::from("/r").join("he").join("hellonuget").join("1.0.2");
        assert_eq!(r.install_path("HelloNuget", "1.0.2").unwrap(), install);
        assert_eq!(
            r.manifest_file_path("HelloNuget", "1.0.2").unwrap(),
            install.join("hellonuget.1.0.2.nuspec")
        );
        // Non-overridable names keep the fixed convention.
        assert_eq!(
            r.hash_file_name("HelloNuget", "1.0.2").unwrap(),
            "hellonuget.1.0.2.nupkg.sha512"
        );
    }

    #[test]
    fn resolve_collects_all_paths() {
        let r = resolver();
        let key = PackageKey::new("Newtonsoft.Json", "13.0.1").unwrap();
        let paths = r.resolve(&key).unwrap();
        assert_eq!(paths.install_path, r.install_path("Newtonsoft.Json", "13.0.1").unwrap());
        assert_eq!(paths.hash_path, r.hash_path("Newtonsoft.Json", "13.0.1").unwrap());

        let json = serde_json::to_value(&paths).unwrap();
        assert!(json["package_file_path"]
            .as_str()
            .unwrap()
            .ends_with("newtonsoft.json.13.0.1.nupkg"));
    }

    fn segment() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9._-]{0,15}"
    }

    proptest! {
        #[test]
        fn package_file_nested_under_install_path(id in segment(), version in segment()) {
            let r = resolver();
            let install = r.install_path(&id, &version).unwrap();
            let file = r.package_file_path(&id, &version).unwrap();
            prop_assert!(file.starts_with(&install));
            prop_assert!(install.starts_with(r.version_list_path(&id).unwrap()));
        }

        #[test]
        fn flat_install_nested_under_root(id in segment(), version in segment()) {
            let r = PathResolver::with_layout("/repo", true, Arc::new(FlatLayout));
            let install = r.install_path(&id, &version).unwrap();
            prop_assert!(r.package_file_path(&id, &version).unwrap().starts_with(&install));
            prop_assert!(install.starts_with(r.version_list_path(&id).unwrap()));
            prop_assert!(install.starts_with("/repo"));
        }

        #[test]
        fn case_folding_is_idempotent(id in segment(), version in segment()) {
            let r = resolver();
            prop_assert_eq!(
                r.hash_file_name(&id, &version).unwrap(),
                r.hash_file_name(&id.to_uppercase(), &version.to_uppercase()).unwrap()
            );
            let once = r.normalize_id(&id);
            prop_assert_eq!(r.normalize_id(&once), once);
        }
    }
}
