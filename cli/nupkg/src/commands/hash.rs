//! `nupkg hash`: digest a package archive.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};

use nupkg_store::{ContentHash, HashProvider};

/// Stream a file through the provider from offset zero.
pub fn digest_file(provider: &HashProvider, path: &Path) -> Result<ContentHash> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    provider
        .calculate_hash_reader(&mut BufReader::new(file))
        .with_context(|| format!("reading {}", path.display()))
}

/// Run `nupkg hash <file> [--hex]`, printing the digest.
pub fn run(provider: &HashProvider, path: &Path, hex: bool) -> Result<()> {
    let hash = digest_file(provider, path)?;
    if hex {
        println!("{}", hash.to_hex());
    } else {
        println!("{}", hash.to_base64());
    }
    Ok(())
}
