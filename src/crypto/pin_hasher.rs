use argon2::{ Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version };
use argon2::password_hash::{ SaltString, rand_core::OsRng };

use crate::error::{ AppError, Result };

/// Cost parameters for PIN hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinHashPolicy {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PinHashPolicy {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Argon2id hasher built from an immutable policy.
pub struct PinHasher {
    params: Params,
}

impl PinHasher {
    pub fn new(policy: PinHashPolicy) -> Result<Self> {
        let params = Params::new(policy.memory_kib, policy.iterations, policy.parallelism, None)
            .map_err(|e| AppError::Config(format!("Invalid PIN hash policy: {}", e)))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, pin: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(pin.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash PIN: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Cost parameters are read from the stored PHC string, so hashes made
    /// under an older policy still verify.
    pub fn verify(&self, pin: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e|
            AppError::Internal(format!("Invalid PIN hash: {}", e))
        )?;

        Ok(self.argon2().verify_password(pin.as_bytes(), &parsed).is_ok())
    }
}
