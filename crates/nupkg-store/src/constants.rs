//! File-name conventions shared by the package cache.

/// Extension of a package archive.
pub const NUPKG_EXTENSION: &str = ".nupkg";

/// Extension of a package manifest.
pub const NUSPEC_EXTENSION: &str = ".nuspec";

/// Extension of the hash sidecar written next to a package archive.
///
/// Fixed regardless of the configured hash algorithm.
pub const HASH_FILE_EXTENSION: &str = ".nupkg.sha512";

/// Extension of the marker recording that a package was downloaded.
pub const PACKAGE_DOWNLOAD_MARKER_FILE_EXTENSION: &str = ".packagedownload.marker";

/// `_._` denotes an empty folder, since package archives cannot hold a
/// real empty folder.
pub const EMPTY_FOLDER: &str = "_._";

/// The empty-folder marker as seen by archive readers that normalize `/`.
pub const FORWARD_SLASH_EMPTY_FOLDER: &str = "/_._";

/// Check whether an archive entry path is an empty-folder marker.
pub fn is_empty_folder_marker(entry_path: &str) -> bool {
    entry_path
        .rsplit(['/', '\\'])
        .next()
        .is_some_and(|last| last == EMPTY_FOLDER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_slash_marker_is_prefixed() {
        assert_eq!(FORWARD_SLASH_EMPTY_FOLDER, format!("/{EMPTY_FOLDER}"));
    }

    #[test]
    fn hash_extension_extends_package_extension() {
        assert!(HASH_FILE_EXTENSION.starts_with(NUPKG_EXTENSION));
    }

    #[test]
    fn detects_empty_folder_markers() {
        assert!(is_empty_folder_marker("_._"));
        assert!(is_empty_folder_marker("lib/net45/_._"));
        assert!(is_empty_folder_marker("lib\\net45\\_._"));
        assert!(!is_empty_folder_marker("lib/net45/foo.dll"));
        assert!(!is_empty_folder_marker("lib/_._/foo.dll"));
        assert!(!is_empty_folder_marker(""));
    }
}
