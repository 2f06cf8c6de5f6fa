use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use argon2::password_hash::SaltString;
use ammonia::Builder;
use rand::rngs::OsRng;
use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::config::{MAX_CONTENT_LENGTH, MAX_USERNAME_LENGTH, MIN_PASSWORD_LENGTH, MIN_USERNAME_LENGTH};
use crate::core::errors::ApiError;

/// Milliseconds since the Unix epoch, UTC.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn new_uuid() -> String {
    Uuid::new_v4().to_string()
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::PasswordHash;

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

fn username_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("Regex should compile")
    })
}

pub fn validate_credentials(username: &str, password: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }
    if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Username must be {}-{} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        )));
    }
    if !username_regex().is_match(username) {
        return Err(ApiError::BadRequest(
            "Username may only contain letters, digits, '.', '_' and '-'".to_string(),
        ));
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }
    Ok(())
}

/// Validates post/comment bodies and strips any markup from them. The
/// result is escaped text; a body that is only markup is rejected.
pub fn clean_content(content: &str) -> Result<String, ApiError> {
    if content.len() > MAX_CONTENT_LENGTH {
        return Err(ApiError::BadRequest("Invalid content".to_string()));
    }
    let cleaned = Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(content)
        .to_string();
    if cleaned.trim().is_empty() {
        return Err(ApiError::BadRequest("Invalid content".to_string()));
    }
    Ok(cleaned)
}
