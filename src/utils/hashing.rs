use bcrypt::{DEFAULT_COST, hash, verify};

use crate::utils::error::CustomError;

pub fn hash_password(password: &str) -> Result<String, CustomError> {
    hash_password_with_cost(password, DEFAULT_COST)
}

pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, CustomError> {
    hash(password, cost)
        .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool, CustomError> {
    verify(password, hashed)
        .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to verify password: {}", e)))
}
