use std::str::FromStr;

use crate::utils::error::CustomError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Mongo,
    Rest,
    Memory,
}

impl FromStr for Backend {
    type Err = CustomError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(Backend::Mongo),
            "rest" => Ok(Backend::Rest),
            "memory" => Ok(Backend::Memory),
            other => Err(CustomError::ConfigError(format!(
                "Unknown backend `{}` (expected mongo, rest or memory)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Where posts live
    pub backend: Backend,
    /// Where accounts and sessions live; defaults to mongo unless posts are in memory
    pub auth_backend: Backend,
    pub mongodb_uri: String,
    pub database_name: String,
    pub rest_url: Option<String>,
    pub rest_api_key: Option<String>,
    /// Session slot restored on start-up
    pub device_id: String,
    pub service_name: String,
}

impl AppConfig {
    pub fn from_env() -> Result<AppConfig, CustomError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<AppConfig, CustomError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = lookup("BACKEND")
            .map(|v| v.parse::<Backend>())
            .transpose()?
            .unwrap_or(Backend::Mongo);

        let auth_backend = match lookup("AUTH_BACKEND") {
            Some(value) => value.parse::<Backend>()?,
            None if backend == Backend::Memory => Backend::Memory,
            None => Backend::Mongo,
        };
        if auth_backend == Backend::Rest {
            return Err(CustomError::ConfigError(
                "AUTH_BACKEND must be mongo or memory".to_string(),
            ));
        }

        let mongodb_uri =
            lookup("MONGODB_URI").unwrap_or_else(|| "mongodb://localhost:27017".to_string());
        let database_name = lookup("DATABASE_NAME").unwrap_or_else(|| "rust_blogdb".to_string());
        let rest_url = lookup("REST_URL");
        let rest_api_key = lookup("REST_API_KEY");

        if backend == Backend::Rest && (rest_url.is_none() || rest_api_key.is_none()) {
            return Err(CustomError::ConfigError(
                "REST_URL and REST_API_KEY must be set for the rest backend".to_string(),
            ));
        }

        let device_id = lookup("DEVICE_ID").unwrap_or_else(|| "default".to_string());
        let service_name =
            lookup("SERVICE_NAME").unwrap_or_else(|| "vibrant-journal".to_string());

        Ok(AppConfig {
            backend,
            auth_backend,
            mongodb_uri,
            database_name,
            rest_url,
            rest_api_key,
            device_id,
            service_name,
        })
    }
}
