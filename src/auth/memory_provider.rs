use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::model::{Profile, SignInRequest, SignUpRequest, User};
use crate::auth::provider::{AuthProvider, invalid_credentials};
use crate::utils::error::CustomError;
use crate::utils::hashing;

/// Low bcrypt cost; this store never leaves the process.
const MEMORY_HASH_COST: u32 = 4;

struct Account {
    user: User,
    password_hash: String,
}

#[derive(Default)]
pub struct MemoryAuthProvider {
    accounts: RwLock<HashMap<String, Account>>,
    profiles: RwLock<HashMap<String, Profile>>,
    session: RwLock<Option<User>>,
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn restore_session(&self) -> Result<Option<User>, CustomError> {
        Ok(self.session.read().await.clone())
    }

    async fn sign_in(&self, request: SignInRequest) -> Result<User, CustomError> {
        let user = {
            let accounts = self.accounts.read().await;
            let account = accounts
                .get(&request.email.to_lowercase())
                .ok_or_else(invalid_credentials)?;
            if !hashing::verify_password(&request.password, &account.password_hash)? {
                return Err(invalid_credentials());
            }
            account.user.clone()
        };

        *self.session.write().await = Some(user.clone());
        Ok(user)
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<User, CustomError> {
        let email = request.email.to_lowercase();
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&email) {
            return Err(CustomError::ConflictError(
                "Email already exists".to_string(),
            ));
        }

        let mut profiles = self.profiles.write().await;
        if profiles.values().any(|p| p.username == request.username) {
            return Err(CustomError::ConflictError(
                "Username already exists".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
        };
        let password_hash = hashing::hash_password_with_cost(&request.password, MEMORY_HASH_COST)?;

        profiles.insert(
            user.id.clone(),
            Profile {
                id: user.id.clone(),
                username: request.username,
            },
        );
        accounts.insert(
            email,
            Account {
                user: user.clone(),
                password_hash,
            },
        );

        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), CustomError> {
        *self.session.write().await = None;
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, CustomError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }
}
