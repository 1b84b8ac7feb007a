use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::{CipherError, MessageCipher};

const NONCE_LEN: usize = 12;

/// Encrypt a plaintext message with AES-256-GCM.
/// Returns (ciphertext, nonce).
pub fn encrypt_message(key: &[u8; 32], plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>), CipherError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CipherError::Encryption)?;

    Ok((ciphertext, nonce_bytes.to_vec()))
}

/// Decrypt a ciphertext message with AES-256-GCM.
pub fn decrypt_message(key: &[u8; 32], ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>, CipherError> {
    if nonce.len() != NONCE_LEN {
        return Err(CipherError::MalformedCiphertext(format!(
            "nonce must be {NONCE_LEN} bytes"
        )));
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CipherError::Decryption)
}

/// AES-256-GCM behind the `MessageCipher` interface. Stored form is
/// `base64(nonce || ciphertext)`.
pub struct AesGcmCipher {
    key: [u8; 32],
}

impl AesGcmCipher {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }
}

impl MessageCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let (ciphertext, nonce) = encrypt_message(&self.key, plaintext.as_bytes())?;
        let mut stored = nonce;
        stored.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(stored))
    }

    fn decrypt(&self, stored: &str) -> Result<String, CipherError> {
        let bytes = BASE64
            .decode(stored)
            .map_err(|e| CipherError::MalformedCiphertext(e.to_string()))?;
        if bytes.len() < NONCE_LEN {
            return Err(CipherError::MalformedCiphertext("too short".into()));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = decrypt_message(&self.key, ciphertext, nonce)?;
        String::from_utf8(plaintext).map_err(|e| CipherError::MalformedCiphertext(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_key;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = generate_key();
        let message = b"Hello from YooChat!";

        let (ciphertext, nonce) = encrypt_message(&key, message).unwrap();
        assert_ne!(&ciphertext, message);

        let decrypted = decrypt_message(&key, &ciphertext, &nonce).unwrap();
        assert_eq!(decrypted, message);
    }

    #[test]
    fn wrong_key_fails() {
        let key1 = generate_key();
        let key2 = generate_key();
        let message = b"Secret message";

        let (ciphertext, nonce) = encrypt_message(&key1, message).unwrap();
        let result = decrypt_message(&key2, &ciphertext, &nonce);
        assert!(result.is_err());
    }

    #[test]
    fn stored_form_roundtrips_unicode() {
        let cipher = AesGcmCipher::new(generate_key());
        let stored = cipher.encrypt("héllo ☕").unwrap();
        assert_eq!(cipher.decrypt(&stored).unwrap(), "héllo ☕");
    }

    #[test]
    fn tampered_stored_form_is_rejected() {
        let cipher = AesGcmCipher::new(generate_key());
        let mut bytes = BASE64.decode(cipher.encrypt("hello").unwrap()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert_eq!(cipher.decrypt(&BASE64.encode(bytes)), Err(CipherError::Decryption));
        assert!(cipher.decrypt("AAAA").is_err());
    }
}
