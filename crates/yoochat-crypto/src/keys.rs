use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::CipherError;

/// Generate a random 256-bit key for AES-256-GCM.
pub fn generate_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    key
}

/// Encode a key to base64 for configuration files.
pub fn key_to_base64(key: &[u8; 32]) -> String {
    BASE64.encode(key)
}

/// Decode a base64 key.
pub fn key_from_base64(encoded: &str) -> Result<[u8; 32], CipherError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| CipherError::InvalidKey(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| CipherError::InvalidKey("AES key must be 32 bytes".into()))
}
