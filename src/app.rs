use std::sync::Arc;

use log::info;
use mongodb::Client;

use crate::auth::context::AuthContext;
use crate::auth::memory_provider::MemoryAuthProvider;
use crate::auth::mongo_provider::MongoAuthProvider;
use crate::auth::provider::AuthProvider;
use crate::config::{AppConfig, Backend};
use crate::database::connect_to_mongo;
use crate::notify::{NoopViewHost, Notifier};
use crate::post::list_controller::PostListController;
use crate::post::memory_gateway::MemoryPostGateway;
use crate::post::post_controller::{CreatePostView, EditPostView, PostDetailView};
use crate::post::post_gateway::PostGateway;
use crate::post::post_service::MongoPostGateway;
use crate::post::rest_gateway::RestPostGateway;
use crate::utils::error::CustomError;

/// Collaborators shared by every view, built once from the configuration.
pub struct App {
    pub gateway: Arc<dyn PostGateway>,
    pub auth: Arc<AuthContext>,
    pub notifier: Arc<dyn Notifier>,
}

impl App {
    pub async fn build(config: &AppConfig, notifier: Arc<dyn Notifier>) -> Result<App, CustomError> {
        let needs_mongo = config.backend == Backend::Mongo || config.auth_backend == Backend::Mongo;
        let client: Option<Client> = if needs_mongo {
            Some(connect_to_mongo(&config.mongodb_uri, &config.service_name).await?)
        } else {
            None
        };

        let gateway: Arc<dyn PostGateway> = match (config.backend, &client) {
            (Backend::Mongo, Some(client)) => {
                Arc::new(MongoPostGateway::new(client, &config.database_name))
            }
            (Backend::Rest, _) => {
                let url = config.rest_url.as_deref().unwrap_or_default();
                let key = config.rest_api_key.as_deref().unwrap_or_default();
                Arc::new(RestPostGateway::new(url, key))
            }
            _ => Arc::new(MemoryPostGateway::new()),
        };

        let provider: Arc<dyn AuthProvider> = match (config.auth_backend, &client) {
            (Backend::Mongo, Some(client)) => Arc::new(MongoAuthProvider::new(
                client,
                &config.database_name,
                &config.device_id,
            )),
            _ => Arc::new(MemoryAuthProvider::new()),
        };

        info!(
            "Using {:?} posts and {:?} accounts",
            config.backend, config.auth_backend
        );

        let auth = AuthContext::init(provider, notifier.clone()).await;
        Ok(App {
            gateway,
            auth,
            notifier,
        })
    }

    pub fn post_list(&self) -> PostListController {
        PostListController::new(
            self.gateway.clone(),
            self.notifier.clone(),
            Arc::new(NoopViewHost),
        )
    }

    pub fn post_detail(&self) -> PostDetailView {
        PostDetailView::new(self.gateway.clone(), self.auth.clone(), self.notifier.clone())
    }

    pub fn create_post(&self) -> CreatePostView {
        CreatePostView::new(self.gateway.clone(), self.auth.clone(), self.notifier.clone())
    }

    pub fn edit_post(&self) -> EditPostView {
        EditPostView::new(self.gateway.clone(), self.auth.clone(), self.notifier.clone())
    }
}
