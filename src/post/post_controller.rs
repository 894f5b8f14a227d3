use std::sync::Arc;

use log::{error, info};
use serde::Serialize;

use crate::auth::context::AuthContext;
use crate::auth::model::User;
use crate::notify::{Notice, Notifier};
use crate::post::post_gateway::PostGateway;
use crate::post::post_model::{NewPost, Post, PostForm};
use crate::utils::error::CustomError;
use crate::utils::validation::validate_post_form;

/// Where the host should go after an action.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "to", content = "id", rename_all = "snake_case")]
pub enum Navigation {
    Home,
    Auth,
    Post(String),
}

async fn require_user(auth: &AuthContext) -> Result<User, CustomError> {
    auth.user().await.ok_or_else(|| {
        CustomError::UnauthenticatedError("You must be logged in".to_string())
    })
}

/// Single post page: shows the post and lets its author delete it.
pub struct PostDetailView {
    gateway: Arc<dyn PostGateway>,
    auth: Arc<AuthContext>,
    notifier: Arc<dyn Notifier>,
    post: Option<Post>,
    is_loading: bool,
}

impl PostDetailView {
    pub fn new(
        gateway: Arc<dyn PostGateway>,
        auth: Arc<AuthContext>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        PostDetailView {
            gateway,
            auth,
            notifier,
            post: None,
            is_loading: true,
        }
    }

    pub fn post(&self) -> Option<&Post> {
        self.post.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// True once loading finished without a post: render "post not found".
    pub fn is_missing(&self) -> bool {
        !self.is_loading && self.post.is_none()
    }

    pub async fn load(&mut self, id: &str) -> Result<(), CustomError> {
        self.is_loading = true;
        let result = self.gateway.get_post(id).await;
        self.is_loading = false;

        match result {
            Ok(post) => {
                self.post = Some(post);
                Ok(())
            }
            Err(e) => {
                error!("Error fetching post {}: {}", id, e);
                self.post = None;
                self.notifier
                    .notify(Notice::error("Error", "Failed to load the post"));
                Err(e)
            }
        }
    }

    /// Edit and delete are offered only to the author.
    pub async fn is_author(&self) -> bool {
        match (&self.post, self.auth.user().await) {
            (Some(post), Some(user)) => post.is_authored_by(&user.id),
            _ => false,
        }
    }

    pub async fn delete(&mut self) -> Result<Navigation, CustomError> {
        let post = self.post.as_ref().ok_or_else(|| {
            CustomError::NotFoundError("Post not found".to_string())
        })?;

        let outcome = match require_user(&self.auth).await {
            Ok(user) => self.gateway.delete_post(&post.id, &user.id).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                info!("Deleted post {}", post.id);
                self.notifier
                    .notify(Notice::success("Success", "Post deleted successfully"));
                self.post = None;
                Ok(Navigation::Home)
            }
            Err(e) => {
                error!("Error deleting post {}: {}", post.id, e);
                self.notifier
                    .notify(Notice::error("Error", "Failed to delete the post"));
                Err(e)
            }
        }
    }
}

/// New post page.
pub struct CreatePostView {
    gateway: Arc<dyn PostGateway>,
    auth: Arc<AuthContext>,
    notifier: Arc<dyn Notifier>,
    is_saving: bool,
}

impl CreatePostView {
    pub fn new(
        gateway: Arc<dyn PostGateway>,
        auth: Arc<AuthContext>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        CreatePostView {
            gateway,
            auth,
            notifier,
            is_saving: false,
        }
    }

    pub fn is_saving(&self) -> bool {
        self.is_saving
    }

    /// Signed-out users are sent to the auth page instead.
    pub async fn submit(&mut self, form: PostForm) -> Result<Navigation, CustomError> {
        let Some(user) = self.auth.user().await else {
            self.notifier.notify(Notice::error(
                "Authentication error",
                "You must be logged in to create a post",
            ));
            return Ok(Navigation::Auth);
        };

        if let Err(e) = validate_post_form(&form) {
            self.notifier.notify(Notice::error("Error", &e.to_string()));
            return Err(e);
        }

        self.is_saving = true;
        info!("Creating post with user ID: {}", user.id);
        let result = self
            .gateway
            .create_post(NewPost {
                title: form.title,
                content: form.content,
                author_id: user.id,
            })
            .await;
        self.is_saving = false;

        match result {
            Ok(post) => {
                self.notifier
                    .notify(Notice::success("Success", "Your post has been published!"));
                Ok(Navigation::Post(post.id))
            }
            Err(e) => {
                error!("Error creating post: {}", e);
                self.notifier.notify(Notice::error(
                    "Error",
                    "Failed to create post. Please try again.",
                ));
                Err(e)
            }
        }
    }
}

/// Edit page. Only the author gets past `load`.
pub struct EditPostView {
    gateway: Arc<dyn PostGateway>,
    auth: Arc<AuthContext>,
    notifier: Arc<dyn Notifier>,
    post: Option<Post>,
    is_loading: bool,
    is_saving: bool,
}

impl EditPostView {
    pub fn new(
        gateway: Arc<dyn PostGateway>,
        auth: Arc<AuthContext>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        EditPostView {
            gateway,
            auth,
            notifier,
            post: None,
            is_loading: true,
            is_saving: false,
        }
    }

    pub fn post(&self) -> Option<&Post> {
        self.post.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_saving(&self) -> bool {
        self.is_saving
    }

    /// Form pre-filled with the loaded post.
    pub fn initial_form(&self) -> Option<PostForm> {
        self.post.as_ref().map(PostForm::from)
    }

    /// `Some(Navigation::Home)` when the post cannot be edited by the
    /// current user; `None` when the form can be shown.
    pub async fn load(&mut self, id: &str) -> Option<Navigation> {
        self.is_loading = true;
        let result = self.gateway.get_post(id).await;
        self.is_loading = false;

        let post = match result {
            Ok(post) => post,
            Err(e) => {
                error!("Error fetching post {}: {}", id, e);
                self.notifier
                    .notify(Notice::error("Error", "Failed to load the post"));
                return Some(Navigation::Home);
            }
        };

        let is_author = match self.auth.user().await {
            Some(user) => post.is_authored_by(&user.id),
            None => false,
        };
        if !is_author {
            self.notifier.notify(Notice::error(
                "Access denied",
                "You can only edit your own posts",
            ));
            return Some(Navigation::Home);
        }

        self.post = Some(post);
        None
    }

    pub async fn submit(&mut self, form: PostForm) -> Result<Navigation, CustomError> {
        let post_id = self
            .post
            .as_ref()
            .map(|post| post.id.clone())
            .ok_or_else(|| CustomError::NotFoundError("Post not found".to_string()))?;
        let user = require_user(&self.auth).await?;

        if let Err(e) = validate_post_form(&form) {
            self.notifier.notify(Notice::error("Error", &e.to_string()));
            return Err(e);
        }

        self.is_saving = true;
        info!("Updating post: {}", post_id);
        let result = self.gateway.update_post(&post_id, &user.id, form).await;
        self.is_saving = false;

        match result {
            Ok(post) => {
                self.post = Some(post);
                self.notifier
                    .notify(Notice::success("Success", "Your post has been updated!"));
                Ok(Navigation::Post(post_id))
            }
            Err(e) => {
                error!("Error updating post {}: {}", post_id, e);
                self.notifier.notify(Notice::error(
                    "Error",
                    "Failed to update post. Please try again.",
                ));
                Err(e)
            }
        }
    }
}
