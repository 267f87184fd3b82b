//! SHA-256 content identity.
//!
//! Lambda reports `CodeSha256` as base64, local tooling prints hex. Both are
//! views of the same 32 bytes, so comparisons happen on the raw digest.

use std::fmt;
use std::io::Read;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::error::{LayerError, LayerResult};

/// SHA-256 digest of an archive's bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeDigest([u8; 32]);

impl CodeDigest {
    /// Digest an in-memory buffer.
    #[must_use]
    pub fn of(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Digest everything readable from `reader`.
    pub fn of_reader(mut reader: impl Read) -> LayerResult<Self> {
        let mut hasher = Sha256::new();
        let mut buf = [0_u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(hasher.finalize().into()))
    }

    /// Decode the provider's base64 representation.
    pub fn from_base64(encoded: &str) -> LayerResult<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| LayerError::internal(format!("invalid base64 digest: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            LayerError::internal(format!("digest has {} bytes, expected 32", v.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Decode a lowercase or uppercase hex representation.
    pub fn from_hex(encoded: &str) -> LayerResult<Self> {
        let mut bytes = [0_u8; 32];
        hex::decode_to_slice(encoded, &mut bytes)
            .map_err(|e| LayerError::internal(format!("invalid hex digest: {e}")))?;
        Ok(Self(bytes))
    }

    /// Base64 form, as reported by the provider.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for CodeDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CodeDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodeDigest({})", self.to_hex())
    }
}
