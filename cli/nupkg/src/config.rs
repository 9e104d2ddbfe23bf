//! `nupkg.toml` parsing and cache configuration.
//!
//! Settings are layered: built-in defaults, then the nearest `nupkg.toml`
//! found walking up from the working directory, then command-line flags.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use nupkg_store::{FlatLayout, HashProvider, LayoutStrategy, PackageCache, PathResolver, VersionFolderLayout};

/// File name searched for by [`NupkgConfig::find_and_load`].
pub const CONFIG_FILE: &str = "nupkg.toml";

/// The top-level configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NupkgConfig {
    /// Package folder settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Hashing settings.
    #[serde(default)]
    pub hash: HashConfig,
}

/// `[cache]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Packages root. Relative paths resolve against the config file's directory.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Lowercase ids and versions in paths (default: true).
    #[serde(default)]
    pub lowercase: Option<bool>,
    /// Directory layout.
    #[serde(default)]
    pub layout: Option<LayoutKind>,
}

/// `[hash]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HashConfig {
    /// Hash algorithm name (SHA256 or SHA512).
    #[serde(default)]
    pub algorithm: Option<String>,
}

/// Built-in directory layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    /// `<root>/<id>/<version>/`
    #[default]
    VersionFolder,
    /// `<root>/<id>.<version>/`
    Flat,
}

impl LayoutKind {
    fn strategy(self) -> Arc<dyn LayoutStrategy> {
        match self {
            LayoutKind::VersionFolder => Arc::new(VersionFolderLayout),
            LayoutKind::Flat => Arc::new(FlatLayout),
        }
    }
}

/// Command-line overrides, applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub no_lowercase: bool,
    pub layout: Option<LayoutKind>,
    pub algorithm: Option<String>,
}

impl NupkgConfig {
    /// Search upward from `start_dir` for a `nupkg.toml` file, parse and return it
    /// along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let config: NupkgConfig = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                tracing::debug!(path = %candidate.display(), "loaded config");
                return Ok(Some((config, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a config from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing nupkg.toml")
    }

    /// Hash algorithm after applying the override.
    pub fn hash_provider(&self, overrides: &Overrides) -> Result<HashProvider> {
        let name = overrides
            .algorithm
            .as_deref()
            .or(self.hash.algorithm.as_deref());
        Ok(HashProvider::new(name)?)
    }

    /// Build the package cache described by this config and the overrides.
    ///
    /// `config_dir` is the directory the config file was found in.
    pub fn build_cache(&self, config_dir: Option<&Path>, overrides: &Overrides) -> Result<PackageCache> {
        let provider = self.hash_provider(overrides)?;

        let root = match (&overrides.root, &self.cache.root, config_dir) {
            (Some(root), _, _) => root.clone(),
            (None, Some(root), Some(dir)) if root.is_relative() => dir.join(root),
            (None, Some(root), _) => root.clone(),
            (None, None, _) => PackageCache::default_location()
                .map(|c| c.root().to_path_buf())
                .context("no cache root configured and $HOME is not set (use --root)")?,
        };
        let lowercase = !overrides.no_lowercase && self.cache.lowercase.unwrap_or(true);
        let layout = overrides.layout.or(self.cache.layout).unwrap_or_default();

        let resolver = PathResolver::with_layout(root, lowercase, layout.strategy());
        Ok(PackageCache::new(resolver, provider))
    }

    /// Generate a starter config file.
    pub fn template() -> String {
        r#"[cache]
root = "packages"
lowercase = true
layout = "version-folder"

[hash]
algorithm = "SHA512"
"#
        .to_string()
    }
}
