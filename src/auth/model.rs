use serde::{Deserialize, Serialize};

/// Signed-in account as the auth backend reports it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
}

/// Public display profile, keyed by the user id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}
