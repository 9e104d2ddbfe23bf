//! Local package cache.
//!
//! Materializes package archives under a [`PathResolver`] layout and keeps
//! a hash sidecar beside each one. The sidecar is written last, so its
//! presence marks a completed install.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::integrity::{ContentHash, HashProvider};
use crate::key::PackageKey;
use crate::layout::{PathResolver, ResolvedPaths};
use crate::sidecar::{verify_package_file, write_sidecar};

/// A package cache backed by the filesystem.
#[derive(Debug, Clone)]
pub struct PackageCache {
    resolver: PathResolver,
    provider: HashProvider,
}

/// Information about a cached package version.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The package key as requested.
    pub key: PackageKey,
    /// Resolved locations of every file of the package.
    pub paths: ResolvedPaths,
}

impl PackageCache {
    /// Create a cache over the given resolver and hash provider.
    pub fn new(resolver: PathResolver, provider: HashProvider) -> Self {
        PackageCache { resolver, provider }
    }

    /// Create a cache at the default location (`~/.nuget/packages`).
    pub fn default_location() -> Option<Self> {
        dirs_or_home().map(|home| {
            PackageCache::new(
                PathResolver::new(home.join(".nuget").join("packages")),
                HashProvider::default(),
            )
        })
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn provider(&self) -> &HashProvider {
        &self.provider
    }

    /// Root directory of this cache.
    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Check if a package version is fully installed.
    pub fn contains(&self, id: &str, version: &str) -> Result<bool> {
        Ok(self.resolver.package_file_path(id, version)?.is_file()
            && self.resolver.hash_path(id, version)?.is_file())
    }

    /// Get the cache entry for a package version, if installed.
    pub fn get(&self, id: &str, version: &str) -> Result<Option<CacheEntry>> {
        if !self.contains(id, version)? {
            return Ok(None);
        }
        let key = PackageKey::new(id, version)?;
        let paths = self.resolver.resolve(&key)?;
        Ok(Some(CacheEntry { key, paths }))
    }

    /// Install a package archive read from `package`.
    ///
    /// The archive is streamed to a temporary file in the install directory,
    /// hashed from offset zero, then moved into place. The manifest, if any,
    /// is written next, then the hash sidecar, then the download marker.
    pub fn install<R: Read + ?Sized>(
        &self,
        key: &PackageKey,
        package: &mut R,
        manifest: Option<&[u8]>,
    ) -> Result<CacheEntry> {
        let paths = self.resolver.resolve(key)?;
        std::fs::create_dir_all(&paths.install_path)
            .map_err(cache_err(&paths.install_path, "creating install dir"))?;

        // A leftover sidecar would mark a half-written reinstall as complete.
        if paths.hash_path.is_file() {
            std::fs::remove_file(&paths.hash_path)
                .map_err(cache_err(&paths.hash_path, "removing stale hash file"))?;
        }

        let temp_path = paths
            .install_path
            .join(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        let hash = match self.spool(&temp_path, package) {
            Ok(hash) => hash,
            Err(e) => {
                let _ = std::fs::remove_file(&temp_path);
                return Err(e);
            }
        };

        if let Err(e) = std::fs::rename(&temp_path, &paths.package_file_path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(cache_err(&paths.package_file_path, "moving package into place")(e));
        }

        if let Some(manifest) = manifest {
            std::fs::write(&paths.manifest_file_path, manifest)
                .map_err(cache_err(&paths.manifest_file_path, "writing manifest"))?;
        }

        write_sidecar(&paths.hash_path, &hash)?;

        if let Some(parent) = paths.download_marker_path.parent() {
            std::fs::create_dir_all(parent).map_err(cache_err(parent, "creating marker dir"))?;
        }
        std::fs::write(&paths.download_marker_path, b"")
            .map_err(cache_err(&paths.download_marker_path, "writing download marker"))?;

        tracing::info!(
            package = %key,
            algorithm = %self.provider.algorithm(),
            hash = %hash,
            "installed package"
        );
        Ok(CacheEntry {
            key: key.clone(),
            paths,
        })
    }

    /// Recompute the sidecar of an installed package archive.
    pub fn rehash(&self, id: &str, version: &str) -> Result<ContentHash> {
        let package_path = self.resolver.package_file_path(id, version)?;
        let file = File::open(&package_path).map_err(cache_err(&package_path, "opening package"))?;
        let hash = self
            .provider
            .calculate_hash_reader(&mut BufReader::new(file))?;
        write_sidecar(&self.resolver.hash_path(id, version)?, &hash)?;
        tracing::info!(id, version, hash = %hash, "rewrote hash file");
        Ok(hash)
    }

    /// Remove a specific package version from the cache.
    pub fn remove(&self, id: &str, version: &str) -> Result<bool> {
        let dir = self.resolver.install_path(id, version)?;
        if dir.is_dir() {
            std::fs::remove_dir_all(&dir).map_err(cache_err(&dir, "removing cache entry"))?;
            tracing::info!(id, version, "removed package");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// List all cached versions of a package.
    ///
    /// Ordered by semantic version when every entry parses as one,
    /// lexically otherwise.
    pub fn list_versions(&self, id: &str) -> Result<Vec<String>> {
        let mut versions = Vec::new();
        for (name, is_dir) in list_entries(&self.resolver.version_list_path(id)?)? {
            if let Some(version) = self.resolver.version_from_entry(id, &name, is_dir)? {
                versions.push(version);
            }
        }
        sort_versions(&mut versions);
        Ok(versions)
    }

    /// List all cached package ids, as the layout names them on disk.
    pub fn list_packages(&self) -> Result<Vec<String>> {
        let mut packages: Vec<String> = list_entries(self.resolver.root())?
            .into_iter()
            .filter_map(|(name, is_dir)| self.resolver.id_from_entry(&name, is_dir))
            .collect();
        packages.sort();
        packages.dedup();
        Ok(packages)
    }

    /// Check whether the download marker of a package exists.
    pub fn has_download_marker(&self, id: &str) -> Result<bool> {
        Ok(self.resolver.package_download_marker_path(id)?.is_file())
    }

    /// Verify the integrity of a cached package.
    ///
    /// `Ok(false)` when the archive or its sidecar is missing, or when the
    /// archive no longer matches the recorded digest.
    pub fn verify_integrity(&self, id: &str, version: &str) -> Result<bool> {
        let package_path = self.resolver.package_file_path(id, version)?;
        let hash_path = self.resolver.hash_path(id, version)?;
        if !package_path.is_file() || !hash_path.is_file() {
            return Ok(false);
        }
        verify_package_file(&self.provider, &package_path, &hash_path)
    }

    fn spool<R: Read + ?Sized>(&self, temp_path: &Path, package: &mut R) -> Result<ContentHash> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(temp_path)
            .map_err(cache_err(temp_path, "creating temp file"))?;
        std::io::copy(package, &mut file).map_err(cache_err(temp_path, "writing package"))?;
        file.seek(SeekFrom::Start(0))
            .map_err(cache_err(temp_path, "rewinding package"))?;
        let hash = self
            .provider
            .calculate_hash_reader(&mut BufReader::new(&mut file))?;
        file.sync_all().map_err(cache_err(temp_path, "syncing package"))?;
        Ok(hash)
    }
}

fn cache_err<'a>(path: &'a Path, action: &'a str) -> impl FnOnce(std::io::Error) -> StoreError + 'a {
    move |e| StoreError::CacheError {
        path: path.to_path_buf(),
        detail: format!("{action}: {e}"),
    }
}

/// Names of the entries of `dir`, each flagged with whether it is a directory.
fn list_entries(dir: &Path) -> Result<Vec<(String, bool)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(cache_err(dir, "listing directory"))? {
        let entry = entry.map_err(cache_err(dir, "reading entry"))?;
        if let Some(name) = entry.file_name().to_str() {
            names.push((name.to_string(), entry.path().is_dir()));
        }
    }
    Ok(names)
}

fn sort_versions(versions: &mut [String]) {
    if versions.iter().all(|v| semver::Version::parse(v).is_ok()) {
        versions.sort_by_cached_key(|v| semver::Version::parse(v).ok());
    } else {
        versions.sort();
    }
}

/// Get the user's home directory.
fn dirs_or_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
