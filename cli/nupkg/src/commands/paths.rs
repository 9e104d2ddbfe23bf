//! `nupkg paths`: show where a package lives in the cache.

use anyhow::{bail, Result};

use nupkg_store::{PackageKey, PathResolver};

/// Render the resolved paths of a package as text or JSON.
pub fn render(resolver: &PathResolver, id: &str, version: &str, format: Option<&str>) -> Result<String> {
    let key = PackageKey::new(id, version)?;
    let paths = resolver.resolve(&key)?;

    match format.unwrap_or("text") {
        "json" => Ok(serde_json::to_string_pretty(&paths)?),
        "text" => {
            let rows = [
                ("version list", &paths.version_list_path),
                ("install", &paths.install_path),
                ("package", &paths.package_file_path),
                ("manifest", &paths.manifest_file_path),
                ("hash", &paths.hash_path),
                ("marker", &paths.download_marker_path),
            ];
            let mut out = String::new();
            for (label, path) in rows {
                out.push_str(&format!("{label:<14} {}\n", path.display()));
            }
            Ok(out)
        }
        other => bail!("unknown format '{other}' (expected text or json)"),
    }
}

/// Run `nupkg paths <id> <version>`.
pub fn run(resolver: &PathResolver, id: &str, version: &str, format: Option<&str>) -> Result<()> {
    print!("{}", render(resolver, id, version, format)?);
    Ok(())
}
