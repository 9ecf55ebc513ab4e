use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::errors::Result;

/// SHA-256 over a sequence of inputs. Each part is length-prefixed so moving bytes from
/// one part into the next changes the digest.
pub struct SourceDigest {
    hasher: Sha256,
}

impl SourceDigest {
    pub fn new() -> Self {
        SourceDigest { hasher: Sha256::new() }
    }

    pub fn bytes(mut self, part: &[u8]) -> Self {
        self.hasher.update((part.len() as u64).to_le_bytes());
        self.hasher.update(part);
        self
    }

    /// Settings are hashed through their JSON form.
    pub fn settings<T: Serialize>(self, settings: &T) -> Result<Self> {
        let json = serde_json::to_vec(settings)?;
        Ok(self.bytes(&json))
    }

    pub fn finish(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

impl Default for SourceDigest {
    fn default() -> Self {
        SourceDigest::new()
    }
}
