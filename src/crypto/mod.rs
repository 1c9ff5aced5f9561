mod encryption;
mod pin_hasher;

pub use encryption::{ Encryptor, SealError };
pub use pin_hasher::{ PinHashPolicy, PinHasher };

use sha2::{ Digest, Sha256 };

/// Hex SHA-256 over length-prefixed parts, used to detect duplicate
/// bank accounts without decrypting stored numbers.
pub fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}
