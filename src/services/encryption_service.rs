//! AES-256-GCM encryption for the ERPNext API secret at rest.
//!
//! Stored format is `base64(nonce || ciphertext || tag)` with a fresh 96-bit
//! nonce per value.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use thiserror::Error;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid key")]
    InvalidKey,

    #[error("Invalid ciphertext format")]
    InvalidFormat,
}

pub type Result<T> = std::result::Result<T, EncryptionError>;

#[derive(Clone)]
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl EncryptionService {
    /// Key must decode to exactly 32 bytes.
    pub fn new(base64_key: &str) -> Result<Self> {
        let key_bytes = BASE64
            .decode(base64_key)
            .map_err(|_| EncryptionError::InvalidKey)?;

        if key_bytes.len() != 32 {
            return Err(EncryptionError::InvalidKey);
        }

        let cipher = Aes256Gcm::new_from_slice(&key_bytes).map_err(|_| EncryptionError::InvalidKey)?;

        Ok(Self { cipher })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(&combined))
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        if ciphertext.is_empty() {
            return Ok(String::new());
        }

        let combined = BASE64
            .decode(ciphertext)
            .map_err(|_| EncryptionError::InvalidFormat)?;

        if combined.len() < NONCE_LEN + TAG_LEN {
            return Err(EncryptionError::InvalidFormat);
        }

        let (nonce_bytes, encrypted) = combined.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), encrypted)
            .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| EncryptionError::DecryptionFailed("Invalid UTF-8".to_string()))
    }

    pub fn encrypt_optional(&self, plaintext: Option<&str>) -> Result<Option<String>> {
        plaintext.map(|text| self.encrypt(text)).transpose()
    }

    pub fn decrypt_optional(&self, ciphertext: Option<&str>) -> Result<Option<String>> {
        ciphertext.map(|text| self.decrypt(text)).transpose()
    }

    /// Generate a new base64-encoded 256-bit key.
    pub fn generate_key() -> String {
        let mut key_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key_bytes);
        BASE64.encode(key_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_survives_storage() {
        let service = EncryptionService::new(&EncryptionService::generate_key()).unwrap();
        let stored = service.encrypt("api-secret-123").unwrap();

        assert_ne!(stored, "api-secret-123");
        assert_eq!(service.decrypt(&stored).unwrap(), "api-secret-123");
    }

    #[test]
    fn test_nonce_is_fresh_per_value() {
        let service = EncryptionService::new(&EncryptionService::generate_key()).unwrap();
        assert_ne!(service.encrypt("same").unwrap(), service.encrypt("same").unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let a = EncryptionService::new(&EncryptionService::generate_key()).unwrap();
        let b = EncryptionService::new(&EncryptionService::generate_key()).unwrap();
        let stored = a.encrypt("secret").unwrap();
        assert!(matches!(b.decrypt(&stored), Err(EncryptionError::DecryptionFailed(_))));
    }

    #[test]
    fn test_short_key_rejected() {
        assert!(matches!(
            EncryptionService::new(&BASE64.encode([0u8; 16])),
            Err(EncryptionError::InvalidKey)
        ));
    }

    #[test]
    fn test_empty_and_missing_values() {
        let service = EncryptionService::new(&EncryptionService::generate_key()).unwrap();
        assert_eq!(service.encrypt("").unwrap(), "");
        assert_eq!(service.encrypt_optional(None).unwrap(), None);
    }
}
