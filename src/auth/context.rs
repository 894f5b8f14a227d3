use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::auth::model::{Profile, SignInRequest, SignUpRequest, User};
use crate::auth::provider::AuthProvider;
use crate::notify::{Notice, Notifier};
use crate::utils::error::CustomError;
use crate::utils::validation;

#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

/// Who is signed in, shared by every view. Created once with [`AuthContext::init`]
/// and handed to controllers explicitly; `sign_out` tears the state down.
pub struct AuthContext {
    provider: Arc<dyn AuthProvider>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<AuthState>,
}

impl AuthContext {
    /// Builds the context and tries to restore a persisted session. A failed
    /// restore leaves the context signed out.
    pub async fn init(provider: Arc<dyn AuthProvider>, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        let context = Arc::new(AuthContext {
            provider,
            notifier,
            state: RwLock::new(AuthState {
                loading: true,
                ..AuthState::default()
            }),
        });

        match context.provider.restore_session().await {
            Ok(Some(user)) => {
                info!("Restored session for user {}", user.id);
                let profile = context.load_profile(&user.id).await;
                *context.state.write().await = AuthState {
                    user: Some(user),
                    profile,
                    loading: false,
                };
            }
            Ok(None) => context.state.write().await.loading = false,
            Err(e) => {
                warn!("Session restore failed: {}", e);
                context.state.write().await.loading = false;
            }
        }

        context
    }

    pub async fn state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn profile(&self) -> Option<Profile> {
        self.state.read().await.profile.clone()
    }

    pub async fn is_signed_in(&self) -> bool {
        self.state.read().await.user.is_some()
    }

    async fn load_profile(&self, user_id: &str) -> Option<Profile> {
        match self.provider.fetch_profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Failed to load profile for {}: {}", user_id, e);
                None
            }
        }
    }

    fn report(&self, title: &str, err: &CustomError) {
        self.notifier.notify(Notice::error(title, &err.to_string()));
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, CustomError> {
        if let Err(e) = validation::validate_email(email) {
            self.report("Sign in failed", &e);
            return Err(e);
        }

        self.state.write().await.loading = true;
        let request = SignInRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };

        match self.provider.sign_in(request).await {
            Ok(user) => {
                let profile = self.load_profile(&user.id).await;
                *self.state.write().await = AuthState {
                    user: Some(user.clone()),
                    profile,
                    loading: false,
                };
                self.notifier.notify(Notice::success(
                    "Welcome back!",
                    "You have successfully signed in.",
                ));
                Ok(user)
            }
            Err(e) => {
                self.state.write().await.loading = false;
                self.report("Sign in failed", &e);
                Err(e)
            }
        }
    }

    /// Registers an account. The caller still has to sign in afterwards.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<User, CustomError> {
        let checks = validation::validate_email(email)
            .and_then(|_| validation::validate_username(username))
            .and_then(|_| validation::validate_password(password));
        if let Err(e) = checks {
            self.report("Sign up failed", &e);
            return Err(e);
        }

        self.state.write().await.loading = true;
        let request = SignUpRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
            username: username.trim().to_string(),
        };
        let result = self.provider.sign_up(request).await;
        self.state.write().await.loading = false;

        match result {
            Ok(user) => {
                self.notifier.notify(Notice::success(
                    "Account created",
                    "Please sign in with your new account.",
                ));
                Ok(user)
            }
            Err(e) => {
                self.report("Sign up failed", &e);
                Err(e)
            }
        }
    }

    /// Clears the local state even when the provider fails to forget the
    /// session; the error is still returned.
    pub async fn sign_out(&self) -> Result<(), CustomError> {
        let result = self.provider.sign_out().await;
        *self.state.write().await = AuthState::default();

        match result {
            Ok(()) => {
                self.notifier
                    .notify(Notice::success("Signed out", "You have been signed out."));
                Ok(())
            }
            Err(e) => {
                warn!("Provider sign out failed: {}", e);
                self.report("Sign out failed", &e);
                Err(e)
            }
        }
    }
}
