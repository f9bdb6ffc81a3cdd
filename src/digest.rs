//! Build Description Digest
//!
//! SHA-256 over the serialized targets, so two runs over the same input
//! can be compared without diffing the makefile.

use sha2::{Digest, Sha256};

use crate::makefile::Makefile;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Digest of every target currently in `makefile`
pub fn description_digest(makefile: &Makefile) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(makefile.targets())?;
    Ok(sha256_hex(json.as_bytes()))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}
