use async_trait::async_trait;

use crate::auth::model::{Profile, SignInRequest, SignUpRequest, User};
use crate::utils::error::CustomError;

/// Account and session store behind the auth context.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The user of a session persisted by an earlier `sign_in`, if any.
    async fn restore_session(&self) -> Result<Option<User>, CustomError>;

    async fn sign_in(&self, request: SignInRequest) -> Result<User, CustomError>;

    /// Creates the account and its profile. Does not start a session.
    async fn sign_up(&self, request: SignUpRequest) -> Result<User, CustomError>;

    async fn sign_out(&self) -> Result<(), CustomError>;

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, CustomError>;
}

pub(crate) fn invalid_credentials() -> CustomError {
    CustomError::UnauthorizedError("Invalid credentials".to_string())
}
