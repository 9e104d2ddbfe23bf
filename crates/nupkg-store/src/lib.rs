//! Package cache layout and content hashing for `.nupkg` archives.
//!
//! Maps a package id and version to the directories and file names of a
//! local package folder, and computes the digests recorded in the
//! `.nupkg.sha512` sidecar written next to each archive.
//!
//! # Architecture
//!
//! - **Layout**: [`PathResolver`] is a pure mapping from package keys to
//!   paths, with the naming rules supplied by a [`LayoutStrategy`].
//! - **Integrity**: [`HashProvider`] hashes bytes or streams with one
//!   vetted algorithm (SHA256 or SHA512).
//! - **Cache**: [`PackageCache`] ties the two together on disk.

pub mod cache;
pub mod constants;
pub mod error;
pub mod integrity;
pub mod key;
pub mod layout;
pub mod sidecar;

// Re-exports for convenience.
pub use cache::{CacheEntry, PackageCache};
pub use error::{Result, StoreError};
pub use integrity::{ContentHash, HashAlgorithmName, HashProvider};
pub use key::PackageKey;
pub use layout::{FlatLayout, LayoutStrategy, PathResolver, ResolvedPaths, VersionFolderLayout};
pub use sidecar::{read_sidecar, verify_package_file, write_sidecar};
