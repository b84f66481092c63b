use argon2::{
    Algorithm, Argon2, Params, ParamsBuilder, Version,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
};
use password_hash::Error as PasswordHashError;
use rand::{Rng, TryRngCore, distr::Alphanumeric, rngs::OsRng};
use thiserror::Error;
use zeroize::Zeroizing;

/// Password hashing, verification, and single-use token issuance.
///
/// Passwords are hashed with Argon2id and a per-hash random salt. An
/// optional server-side pepper is appended to the plaintext before hashing;
/// it may be empty. The default cost keeps a single verification in the
/// tens of milliseconds on commodity hardware.
///
/// No I/O happens here; callers on an async runtime should run
/// [`hash_password`](Self::hash_password) and [`verify`](Self::verify) on a
/// blocking thread.
#[derive(Debug)]
pub struct CredentialManager {
    argon2: Argon2<'static>,
    password_pepper: Zeroizing<Vec<u8>>,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("password does not match")]
    Mismatch,
    #[error("invalid Argon2 parameters: {0}")]
    InvalidArgon2Params(String),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
}

impl From<PasswordHashError> for CredentialError {
    fn from(err: PasswordHashError) -> Self {
        CredentialError::PasswordHash(err.to_string())
    }
}

impl CredentialManager {
    /// 19 MiB / 2 passes: OWASP's Argon2id floor, ~30-60ms per hash.
    pub const DEFAULT_MEMORY_KIB: u32 = 19 * 1024;
    pub const DEFAULT_ITERATIONS: u32 = 2;
    const DEFAULT_PARALLELISM: u32 = 1;
    const SALT_LENGTH: usize = password_hash::Salt::RECOMMENDED_LENGTH;

    /// Length of confirmation and password-reset tokens.
    pub const TOKEN_LENGTH: usize = 32;

    /// Build a manager with the default Argon2id cost.
    pub fn new(
        password_pepper: impl AsRef<[u8]>,
    ) -> Result<Self, CredentialError> {
        Self::with_cost(
            password_pepper,
            Self::DEFAULT_MEMORY_KIB,
            Self::DEFAULT_ITERATIONS,
        )
    }

    /// Build a manager with a custom memory/iteration cost (useful for
    /// integration tests or constrained environments).
    pub fn with_cost(
        password_pepper: impl AsRef<[u8]>,
        memory_kib: u32,
        iterations: u32,
    ) -> Result<Self, CredentialError> {
        let params = ParamsBuilder::new()
            .m_cost(memory_kib)
            .t_cost(iterations)
            .p_cost(Self::DEFAULT_PARALLELISM)
            .output_len(32)
            .build()
            .map_err(|err| {
                CredentialError::InvalidArgon2Params(err.to_string())
            })?;
        Ok(Self::with_params(password_pepper, params))
    }

    pub fn with_params(
        password_pepper: impl AsRef<[u8]>,
        params: Params,
    ) -> Self {
        let argon2 =
            Argon2::new(Algorithm::Argon2id, Version::default(), params);

        Self {
            argon2,
            password_pepper: Zeroizing::new(password_pepper.as_ref().to_vec()),
        }
    }

    fn peppered(&self, password: &str) -> Zeroizing<Vec<u8>> {
        let mut material = Zeroizing::new(Vec::with_capacity(
            password.len() + self.password_pepper.len(),
        ));
        material.extend_from_slice(password.as_bytes());
        material.extend_from_slice(&self.password_pepper);
        material
    }

    /// Hash a password into a PHC string suitable for storage.
    pub fn hash_password(
        &self,
        password: &str,
    ) -> Result<String, CredentialError> {
        if password.is_empty() {
            return Err(CredentialError::EmptyPassword);
        }

        let material = self.peppered(password);

        let mut salt_bytes = [0u8; Self::SALT_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|err| CredentialError::PasswordHash(err.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(CredentialError::from)?;
        let hash = self.argon2.hash_password(&material, &salt)?.to_string();
        Ok(hash)
    }

    /// Check a plaintext password against a stored digest.
    pub fn verify(
        &self,
        password_hash: &str,
        password: &str,
    ) -> Result<(), CredentialError> {
        let parsed = PasswordHash::new(password_hash)?;
        let material = self.peppered(password);

        self.argon2
            .verify_password(&material, &parsed)
            .map_err(|_| CredentialError::Mismatch)
    }

    /// Random alphanumeric token drawn from the thread-local CSPRNG.
    ///
    /// Collisions are negligible at [`Self::TOKEN_LENGTH`]; no uniqueness
    /// check is performed against the store.
    pub fn issue_token(&self, length: usize) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect()
    }
}
