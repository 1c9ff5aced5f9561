use aes_gcm::{ aead::{ Aead, AeadCore, KeyInit, OsRng }, Aes256Gcm, Nonce };
use thiserror::Error;

use crate::error::AppError;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Failures reading or writing a sealed column value.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SealError {
    #[error("key must be 32 bytes, got {0}")] KeyLength(usize),
    #[error("stored value is not hex")] NotHex,
    #[error("stored value is truncated ({0} bytes)")] Truncated(usize),
    #[error("stored value failed authentication")] Tampered,
    #[error("decrypted value is not UTF-8")] NotUtf8,
    #[error("cipher refused to seal value")] Seal,
}

impl From<SealError> for AppError {
    fn from(err: SealError) -> Self {
        AppError::Encryption(err.to_string())
    }
}

/// AES-256-GCM sealing for sensitive columns such as bank account numbers.
///
/// A sealed value is stored as lowercase hex of `nonce (12) | ciphertext |
/// tag (16)`, with a fresh random nonce per call. Anything shorter than a
/// nonce plus a tag cannot have come from [`Encryptor::seal`].
pub struct Encryptor {
    cipher: Aes256Gcm,
}

impl Encryptor {
    pub fn new(key: &[u8]) -> Result<Self, SealError> {
        if key.len() != KEY_LEN {
            return Err(SealError::KeyLength(key.len()));
        }
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| SealError::KeyLength(key.len()))?;
        Ok(Self { cipher })
    }

    pub fn seal(&self, plaintext: &str) -> Result<String, SealError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self.cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| SealError::Seal)?;

        let mut stored = Vec::with_capacity(NONCE_LEN + sealed.len());
        stored.extend_from_slice(&nonce);
        stored.extend_from_slice(&sealed);
        Ok(hex::encode(stored))
    }

    pub fn open(&self, stored: &str) -> Result<String, SealError> {
        let bytes = hex::decode(stored).map_err(|_| SealError::NotHex)?;
        let (nonce, sealed) = split_stored(&bytes)?;

        let plaintext = self.cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| SealError::Tampered)?;
        String::from_utf8(plaintext).map_err(|_| SealError::NotUtf8)
    }
}

fn split_stored(bytes: &[u8]) -> Result<(&[u8], &[u8]), SealError> {
    if bytes.len() < NONCE_LEN + TAG_LEN {
        return Err(SealError::Truncated(bytes.len()));
    }
    Ok(bytes.split_at(NONCE_LEN))
}
