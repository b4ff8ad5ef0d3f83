use serde::Serialize;
use sha2::{Digest, Sha256};
use twiss_core::OpticsError;

use crate::record::LinearOptics;
use crate::serde::to_canonical_json_bytes;

/// Computes a stable hexadecimal hash for any payload using canonical JSON ordering.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, OpticsError> {
    let bytes = to_canonical_json_bytes(value)?;
    Ok(hex::encode(Sha256::digest(bytes)))
}

/// Content hash of an optics result.
pub fn optics_hash(optics: &LinearOptics) -> Result<String, OpticsError> {
    stable_hash_string(optics)
}
