use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::domain::{NewUser, User};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Build a storable account with a fresh salt; the password itself is never kept.
pub fn new_user(email: &str, password: &str) -> NewUser {
    let password_salt = Uuid::new_v4().simple().to_string();
    let password_digest = password_digest(&password_salt, password);
    NewUser {
        email: normalize_email(email),
        password_salt,
        password_digest,
    }
}

/// Whether `password` matches the account's stored digest.
pub fn verify_password(user: &User, password: &str) -> bool {
    let candidate = password_digest(&user.password_salt, password);
    constant_time_eq(candidate.as_bytes(), user.password_digest.as_bytes())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn password_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"polling:credential:v1:");
    hasher.update((salt.len() as u64).to_le_bytes());
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
