// crates/apiforge-core/src/core/hashing.rs
// ============================================================================
// Module: apiforge Definition Digests
// Description: Canonical JSON digests for API definitions.
// Purpose: Stamp emitted artifacts with a stable fingerprint of their source.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Definitions are canonicalized with RFC 8785 (JCS) before hashing, so key
//! order and whitespace in the authored file never change the digest. The
//! digest lands in every emitted artifact header and lets drift checks tell
//! a stale artifact from a hand-edited one.
//!
//! Emitted request bodies keep the authored key order, so reordering keys
//! changes an artifact body while its digest line stays the same. The digest
//! fingerprints definition content, not artifact bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write as _;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::schema::ApiDefinition;

// ============================================================================
// SECTION: Digest
// ============================================================================

/// Content digest of a canonical definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Algorithm label (always `sha256`).
    pub algorithm: String,
    /// Lowercase hex digest.
    pub value: String,
}

impl HashDigest {
    /// Hashes raw bytes with SHA-256.
    #[must_use]
    pub fn sha256(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut value = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(value, "{byte:02x}");
        }
        Self {
            algorithm: "sha256".to_string(),
            value,
        }
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.value)
    }
}

/// Digest computation failures.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize definition: {0}")]
    Canonicalization(String),
}

/// Computes the digest of a definition's canonical JSON form.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when the definition cannot be serialized.
pub fn definition_digest(definition: &ApiDefinition) -> Result<HashDigest, HashError> {
    let bytes = serde_jcs::to_vec(definition)
        .map_err(|err| HashError::Canonicalization(err.to_string()))?;
    Ok(HashDigest::sha256(&bytes))
}
