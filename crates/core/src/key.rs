// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable lock identity derived from application identity and base path

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Identity scoping the main-instance lease to one logical application at
/// one deployment path.
///
/// Two instances of the same application deployed at the same path compute
/// the same key and therefore contend for the same lease; a different
/// application or a different path yields a different key, so collocated
/// deployments never falsely share a lease token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainKey(String);

impl DomainKey {
    /// Derive the key for an application identity and its base path.
    ///
    /// Callers should canonicalize `base_path` first so that equivalent
    /// spellings of one directory hash identically.
    pub fn derive(app_id: &str, base_path: &Path) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(app_id.as_bytes());
        // Separator so (app, path) pairs cannot collide by concatenation
        hasher.update([0u8]);
        hasher.update(base_path.to_string_lossy().as_bytes());
        let digest = hasher.finalize();
        Self(format!("maindom-{}", hex_encode(&digest[..8])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DomainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Hex encoding helper
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod tests;
