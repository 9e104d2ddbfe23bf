//! Cache commands: install, verify, rehash, list, remove.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context, Result};

use nupkg_store::{CacheEntry, PackageCache, PackageKey};

/// Run `nupkg install <id> <version> <nupkg> [--nuspec <file>]`.
///
/// Copies the archive into the cache and writes its hash file.
pub fn install(
    cache: &PackageCache,
    id: &str,
    version: &str,
    nupkg: &Path,
    nuspec: Option<&Path>,
) -> Result<CacheEntry> {
    let key = PackageKey::new(id, version)?;
    let manifest = match nuspec {
        Some(path) => {
            Some(std::fs::read(path).with_context(|| format!("reading {}", path.display()))?)
        }
        None => None,
    };

    let file = File::open(nupkg).with_context(|| format!("opening {}", nupkg.display()))?;
    let entry = cache
        .install(&key, &mut BufReader::new(file), manifest.as_deref())
        .with_context(|| format!("installing {key}"))?;

    println!("Installed {key} -> {}", entry.paths.package_file_path.display());
    Ok(entry)
}

/// Run `nupkg verify <id> <version>`. Returns whether the archive matches
/// its hash file.
pub fn verify(cache: &PackageCache, id: &str, version: &str) -> Result<bool> {
    if !cache.contains(id, version)? {
        bail!("package '{id} {version}' is not installed in {}", cache.root().display());
    }
    let ok = cache.verify_integrity(id, version)?;
    if ok {
        println!("OK       {id} {version}");
    } else {
        println!("MISMATCH {id} {version}");
    }
    Ok(ok)
}

/// Run `nupkg rehash <id> <version>`.
pub fn rehash(cache: &PackageCache, id: &str, version: &str) -> Result<()> {
    let hash = cache
        .rehash(id, version)
        .with_context(|| format!("rehashing {id} {version}"))?;
    println!("{hash}");
    Ok(())
}

/// Run `nupkg list [<id>]`.
pub fn list(cache: &PackageCache, id: Option<&str>) -> Result<()> {
    match id {
        Some(id) => {
            let versions = cache.list_versions(id)?;
            if versions.is_empty() {
                println!("No versions of '{id}' cached.");
            }
            for version in versions {
                let status = if cache.contains(id, &version)? {
                    ""
                } else {
                    " (incomplete)"
                };
                println!("  {version}{status}");
            }
        }
        None => {
            let packages = cache.list_packages()?;
            if packages.is_empty() {
                println!("Cache at {} is empty.", cache.root().display());
            }
            for package in packages {
                println!("  {package}");
            }
        }
    }
    Ok(())
}

/// Run `nupkg remove <id> <version>`.
pub fn remove(cache: &PackageCache, id: &str, version: &str) -> Result<()> {
    if cache.remove(id, version)? {
        println!("Removed {id} {version}");
    } else {
        bail!("package '{id} {version}' is not in the cache");
    }
    Ok(())
}
