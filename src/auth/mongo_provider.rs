use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info};
use mongodb::{
    Client, Collection,
    bson::{doc, oid::ObjectId},
};
use serde::{Deserialize, Serialize};

use crate::auth::model::{Profile, SignInRequest, SignUpRequest, User};
use crate::auth::provider::{AuthProvider, invalid_credentials};
use crate::utils::error::CustomError;
use crate::utils::hashing;

#[derive(Debug, Serialize, Deserialize)]
struct Account {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    email: String,
    password: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Account {
    fn to_user(&self) -> Result<User, CustomError> {
        let id = self
            .id
            .ok_or_else(|| CustomError::NetworkOrServerError("User ID missing".to_string()))?;
        Ok(User {
            id: id.to_hex(),
            email: self.email.clone(),
        })
    }
}

/// Stored shape of a profile, keyed by the owning account's id.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub(crate) struct ProfileDocument {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    pub(crate) username: String,
}

impl From<ProfileDocument> for Profile {
    fn from(document: ProfileDocument) -> Self {
        Profile {
            id: document.id,
            username: document.username,
        }
    }
}

/// Persisted sign-in for one device, so a restart can restore it.
#[derive(Debug, Serialize, Deserialize)]
struct Session {
    #[serde(rename = "_id")]
    device_id: String,
    user_id: ObjectId,
    signed_in_at: DateTime<Utc>,
}

pub struct MongoAuthProvider {
    collection: Collection<Account>,
    profiles: Collection<ProfileDocument>,
    sessions: Collection<Session>,
    device_id: String,
}

impl MongoAuthProvider {
    pub fn new(client: &Client, database: &str, device_id: &str) -> Self {
        let db = client.database(database);
        MongoAuthProvider {
            collection: db.collection::<Account>("users"),
            profiles: db.collection::<ProfileDocument>("profiles"),
            sessions: db.collection::<Session>("sessions"),
            device_id: device_id.to_string(),
        }
    }

    async fn email_exists(&self, email: &str) -> Result<bool, mongodb::error::Error> {
        let count = self
            .collection
            .count_documents(doc! { "email": email })
            .await?;
        Ok(count > 0)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, mongodb::error::Error> {
        let count = self
            .profiles
            .count_documents(doc! { "username": username })
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl AuthProvider for MongoAuthProvider {
    async fn restore_session(&self) -> Result<Option<User>, CustomError> {
        let session = self
            .sessions
            .find_one(doc! { "_id": &self.device_id })
            .await
            .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to read session: {}", e)))?;

        let Some(session) = session else {
            return Ok(None);
        };

        let account = self
            .collection
            .find_one(doc! { "_id": session.user_id })
            .await
            .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to fetch user: {}", e)))?;

        match account {
            Some(account) => account.to_user().map(Some),
            // The account is gone; forget the dangling session.
            None => {
                self.sign_out().await?;
                Ok(None)
            }
        }
    }

    async fn sign_in(&self, request: SignInRequest) -> Result<User, CustomError> {
        let account = self
            .collection
            .find_one(doc! { "email": request.email.to_lowercase() })
            .await
            .map_err(|_| CustomError::NetworkOrServerError("Database error".to_string()))?
            .ok_or_else(invalid_credentials)?;

        if !hashing::verify_password(&request.password, &account.password)? {
            return Err(invalid_credentials());
        }

        let user = account.to_user()?;
        let user_id = account
            .id
            .ok_or_else(|| CustomError::NetworkOrServerError("User ID missing".to_string()))?;

        let session = Session {
            device_id: self.device_id.clone(),
            user_id,
            signed_in_at: Utc::now(),
        };
        self.sessions
            .replace_one(doc! { "_id": &self.device_id }, session)
            .upsert(true)
            .await
            .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to store session: {}", e)))?;

        info!("User {} signed in on device {}", user.id, self.device_id);
        Ok(user)
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<User, CustomError> {
        let email = request.email.to_lowercase();

        // Check if email already exists
        if self.email_exists(&email).await.map_err(|_| {
            CustomError::NetworkOrServerError("Failed to check email existence".to_string())
        })? {
            return Err(CustomError::ConflictError(
                "Email already exists".to_string(),
            ));
        }

        // Check if username already exists
        if self.username_exists(&request.username).await.map_err(|_| {
            CustomError::NetworkOrServerError("Failed to check username existence".to_string())
        })? {
            return Err(CustomError::ConflictError(
                "Username already exists".to_string(),
            ));
        }

        let account = Account {
            id: None,
            email,
            password: hashing::hash_password(&request.password)?,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let result = self
            .collection
            .insert_one(&account)
            .await
            .map_err(|e| CustomError::NetworkOrServerError(e.to_string()))?;

        let user_id = result.inserted_id.as_object_id().ok_or_else(|| {
            CustomError::NetworkOrServerError("Failed to get inserted ID".to_string())
        })?;

        let profile = ProfileDocument {
            id: user_id.to_hex(),
            username: request.username,
        };
        if let Err(e) = self.profiles.insert_one(&profile).await {
            if let Err(cleanup) = self.collection.delete_one(doc! { "_id": user_id }).await {
                error!("Failed to remove account {} after profile error: {}", user_id, cleanup);
            }
            return Err(CustomError::NetworkOrServerError(format!(
                "Failed to create profile: {}",
                e
            )));
        }

        Ok(User {
            id: user_id.to_hex(),
            email: account.email,
        })
    }

    async fn sign_out(&self) -> Result<(), CustomError> {
        self.sessions
            .delete_one(doc! { "_id": &self.device_id })
            .await
            .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to delete session: {}", e)))?;
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, CustomError> {
        let profile = self
            .profiles
            .find_one(doc! { "_id": user_id })
            .await
            .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to fetch profile: {}", e)))?;
        Ok(profile.map(Profile::from))
    }
}
