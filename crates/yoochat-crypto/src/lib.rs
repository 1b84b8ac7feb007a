/// YooChat message ciphers
///
/// Message content is transformed before it is written to the database and
/// reversed when a conversation is read back. The key is held by the server.
///
/// - `hill`: Hill cipher over a 97-symbol alphabet. Obfuscation only, it
///   offers no confidentiality against anyone who looks at the data.
/// - `aes-gcm`: AES-256-GCM with a random nonce per message, for deployments
///   that want real confidentiality behind the same interface.
pub mod encrypt;
pub mod hill;
pub mod keys;

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

pub use encrypt::AesGcmCipher;
pub use hill::HillCipher;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("invalid cipher key: {0}")]
    InvalidKey(String),

    #[error("cipher key matrix is not invertible mod {0}")]
    NonInvertibleKey(u32),

    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("encryption failed")]
    Encryption,

    #[error("decryption failed")]
    Decryption,
}

/// Reversible transform applied to message content at rest.
pub trait MessageCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;
    fn decrypt(&self, stored: &str) -> Result<String, CipherError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CipherKind {
    #[default]
    Hill,
    AesGcm,
}

impl FromStr for CipherKind {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hill" => Ok(Self::Hill),
            "aes-gcm" | "aes256gcm" | "aes" => Ok(Self::AesGcm),
            other => Err(CipherError::InvalidKey(format!("unknown cipher '{other}'"))),
        }
    }
}

/// Build the configured cipher. Fails on any key the cipher cannot use,
/// so a bad key stops the server at startup.
pub fn build_cipher(kind: CipherKind, key: &str) -> Result<Arc<dyn MessageCipher>, CipherError> {
    match kind {
        CipherKind::Hill => Ok(Arc::new(HillCipher::from_key(key)?)),
        CipherKind::AesGcm => Ok(Arc::new(AesGcmCipher::new(keys::key_from_base64(key)?))),
    }
}
