use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use rand::Rng;
use thiserror::Error;

static ARGON2: Lazy<Argon2<'static>> = Lazy::new(|| {
    let params = Params::new(64 * 1024, 3, 4, None).expect("params");
    Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params)
});

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("hash error: {0}")]
    Hash(String),
}

pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    ARGON2
        .hash_password(plain.as_bytes(), &salt)
        .map(|p| p.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

pub fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(ARGON2.verify_password(plain.as_bytes(), &parsed).is_ok())
}

const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";

/// Random replacement password for the reset flow.
pub fn generate_random(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_accepts_the_password() {
        let hash = hash_password("correct horse battery").expect("hash");
        assert!(verify_password("correct horse battery", &hash).expect("verify"));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let hash = hash_password("correct horse battery").expect("hash");
        assert!(!verify_password("wrong horse", &hash).expect("verify"));
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_match() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn random_password_uses_the_charset() {
        let pw = generate_random(12);
        assert_eq!(pw.len(), 12);
        assert!(pw.bytes().all(|b| CHARSET.contains(&b)));
    }
}
