use async_trait::async_trait;

use crate::post::post_model::{ListQuery, NewPost, Post, PostForm, PostPage};
use crate::utils::error::CustomError;

/// Remote source of posts. Every adapter enforces the owner check on
/// `update_post` and `delete_post` itself; hiding edit/delete buttons in the
/// host is never enough.
#[async_trait]
pub trait PostGateway: Send + Sync {
    /// Posts matching `query`, newest first, plus the total matching count.
    async fn list_posts(&self, query: &ListQuery) -> Result<PostPage, CustomError>;

    async fn get_post(&self, id: &str) -> Result<Post, CustomError>;

    async fn create_post(&self, post: NewPost) -> Result<Post, CustomError>;

    /// Fails with `NotFoundError` if `id` is absent and `ForbiddenError` if
    /// `author_id` is not the post's author.
    async fn update_post(
        &self,
        id: &str,
        author_id: &str,
        changes: PostForm,
    ) -> Result<Post, CustomError>;

    async fn delete_post(&self, id: &str, author_id: &str) -> Result<(), CustomError>;
}

pub(crate) fn post_not_found() -> CustomError {
    CustomError::NotFoundError("Post not found".to_string())
}

pub(crate) fn not_post_owner() -> CustomError {
    CustomError::ForbiddenError("You can only modify your own posts".to_string())
}
