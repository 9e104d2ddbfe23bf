//! Hash sidecar files.
//!
//! A sidecar holds the base64 digest of the package archive beside it,
//! with no trailing newline. It is rewritten whenever the archive is.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Result, StoreError};
use crate::integrity::{ContentHash, HashProvider};

/// Overwrite `path` with the base64 encoding of `hash`.
pub fn write_sidecar(path: &Path, hash: &ContentHash) -> Result<()> {
    std::fs::write(path, hash.to_base64()).map_err(|e| StoreError::CacheError {
        path: path.to_path_buf(),
        detail: format!("writing hash file: {e}"),
    })
}

/// Read and decode the digest stored at `path`.
pub fn read_sidecar(path: &Path) -> Result<ContentHash> {
    let text = std::fs::read_to_string(path).map_err(|e| StoreError::CacheError {
        path: path.to_path_buf(),
        detail: format!("reading hash file: {e}"),
    })?;
    ContentHash::from_base64(&text).map_err(|e| StoreError::MalformedSidecar {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Stream `package_path` through `provider` and compare with the sidecar.
///
/// A mismatch is `Ok(false)`, not an error.
pub fn verify_package_file(
    provider: &HashProvider,
    package_path: &Path,
    sidecar_path: &Path,
) -> Result<bool> {
    let expected = read_sidecar(sidecar_path)?;
    let file = File::open(package_path).map_err(|e| StoreError::CacheError {
        path: package_path.to_path_buf(),
        detail: format!("opening package: {e}"),
    })?;
    let actual = provider.calculate_hash_reader(&mut BufReader::new(file))?;
    let matches = actual == expected;
    if !matches {
        tracing::warn!(
            package = %package_path.display(),
            expected = %expected,
            actual = %actual,
            "package hash mismatch"
        );
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_sidecar_has_no_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.1.0.0.nupkg.sha512");
        let hash = HashProvider::default().calculate_hash(b"bytes");
        write_sidecar(&path, &hash).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, hash.to_base64());
        assert_eq!(read_sidecar(&path).unwrap(), hash);
    }

    #[test]
    fn overwrite_replaces_previous_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h");
        let provider = HashProvider::default();
        write_sidecar(&path, &provider.calculate_hash(b"old")).unwrap();
        write_sidecar(&path, &provider.calculate_hash(b"new")).unwrap();
        assert_eq!(read_sidecar(&path).unwrap(), provider.calculate_hash(b"new"));
    }

    #[test]
    fn malformed_sidecar_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h");
        std::fs::write(&path, "%%% not a digest %%%").unwrap();
        assert!(matches!(
            read_sidecar(&path),
            Err(StoreError::MalformedSidecar { .. })
        ));
    }

    #[test]
    fn verify_package_file_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("p.nupkg");
        let sidecar = dir.path().join("p.nupkg.sha512");
        let provider = HashProvider::new(Some("SHA256")).unwrap();

        std::fs::write(&package, b"archive").unwrap();
        write_sidecar(&sidecar, &provider.calculate_hash(b"archive")).unwrap();
        assert!(verify_package_file(&provider, &package, &sidecar).unwrap());

        std::fs::write(&package, b"archivE").unwrap();
        assert!(!verify_package_file(&provider, &package, &sidecar).unwrap());
    }

    #[test]
    fn missing_sidecar_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_sidecar(&dir.path().join("absent"));
        assert!(matches!(result, Err(StoreError::CacheError { .. })));
    }
}
