//! Content hashing for package archives.
//!
//! A [`HashProvider`] is bound to one vetted algorithm at construction.
//! Each call builds its own hasher, so a provider can be shared freely
//! between threads.

use std::io::{Read, Write};
use std::str::FromStr;

use base64::Engine;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::{Result, StoreError};

/// Hash algorithm names understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithmName {
    Sha256,
    /// Recognized but not accepted by [`HashProvider`].
    Sha384,
    Sha512,
}

impl HashAlgorithmName {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithmName::Sha256 => "SHA256",
            HashAlgorithmName::Sha384 => "SHA384",
            HashAlgorithmName::Sha512 => "SHA512",
        }
    }

    /// Digest length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            HashAlgorithmName::Sha256 => 32,
            HashAlgorithmName::Sha384 => 48,
            HashAlgorithmName::Sha512 => 64,
        }
    }

    fn hasher(&self) -> Hasher {
        match self {
            HashAlgorithmName::Sha256 => Hasher::Sha256(Sha256::new()),
            HashAlgorithmName::Sha384 => Hasher::Sha384(Sha384::new()),
            HashAlgorithmName::Sha512 => Hasher::Sha512(Sha512::new()),
        }
    }
}

impl FromStr for HashAlgorithmName {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SHA256" => Ok(HashAlgorithmName::Sha256),
            "SHA384" => Ok(HashAlgorithmName::Sha384),
            "SHA512" => Ok(HashAlgorithmName::Sha512),
            _ => Err(StoreError::UnsupportedHashAlgorithm {
                name: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for HashAlgorithmName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hash primitive scoped to a single call.
enum Hasher {
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl Hasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha384(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
        }
    }

    fn finalize(self) -> ContentHash {
        let bytes = match self {
            Hasher::Sha256(h) => h.finalize().to_vec(),
            Hasher::Sha384(h) => h.finalize().to_vec(),
            Hasher::Sha512(h) => h.finalize().to_vec(),
        };
        ContentHash(bytes)
    }
}

impl Write for Hasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A raw digest. Its length depends on the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(Vec<u8>);

impl From<Vec<u8>> for ContentHash {
    fn from(bytes: Vec<u8>) -> Self {
        ContentHash(bytes)
    }
}

impl ContentHash {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Standard base64 with padding, the hash file encoding.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.0)
    }

    /// Decode a base64 digest, ignoring surrounding whitespace.
    pub fn from_base64(s: &str) -> std::result::Result<Self, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD
            .decode(s.trim())
            .map(ContentHash)
    }

    /// Lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

/// Computes and verifies digests with one fixed algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashProvider {
    algorithm: HashAlgorithmName,
}

impl Default for HashProvider {
    fn default() -> Self {
        HashProvider {
            algorithm: HashAlgorithmName::Sha512,
        }
    }
}

impl HashProvider {
    /// Create a provider. `None` or an empty name selects SHA512.
    ///
    /// Only SHA256 and SHA512 are accepted, case-insensitively; anything
    /// else fails with [`StoreError::UnsupportedHashAlgorithm`].
    pub fn new(algorithm: Option<&str>) -> Result<Self> {
        let name = match algorithm {
            None | Some("") => return Ok(HashProvider::default()),
            Some(name) => name,
        };
        match name.parse::<HashAlgorithmName>() {
            Ok(alg @ (HashAlgorithmName::Sha256 | HashAlgorithmName::Sha512)) => {
                Ok(HashProvider { algorithm: alg })
            }
            _ => Err(StoreError::UnsupportedHashAlgorithm {
                name: name.to_string(),
            }),
        }
    }

    /// The configured algorithm.
    pub fn algorithm(&self) -> HashAlgorithmName {
        self.algorithm
    }

    /// Hash a byte slice.
    pub fn calculate_hash(&self, data: &[u8]) -> ContentHash {
        let mut hasher = self.algorithm.hasher();
        hasher.update(data);
        hasher.finalize()
    }

    /// Hash everything from the reader's current position to end of stream.
    ///
    /// The reader is consumed and never rewound.
    pub fn calculate_hash_reader<R: Read + ?Sized>(
        &self,
        reader: &mut R,
    ) -> std::io::Result<ContentHash> {
        let mut hasher = self.algorithm.hasher();
        std::io::copy(reader, &mut hasher)?;
        let hash = hasher.finalize();
        tracing::debug!(algorithm = %self.algorithm, "hashed stream");
        Ok(hash)
    }

    /// Check that `data` hashes to `expected`.
    pub fn verify_hash(&self, data: &[u8], expected: &[u8]) -> bool {
        self.calculate_hash(data).as_bytes() == expected
    }
}
