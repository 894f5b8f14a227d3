use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::post::post_gateway::{PostGateway, not_post_owner, post_not_found};
use crate::post::post_model::{ListQuery, NewPost, Post, PostForm, PostPage};
use crate::utils::error::CustomError;

/// In-process gateway. Posts are kept in insertion order; listing sorts by
/// `created_at` descending and falls back to reverse insertion order on ties.
#[derive(Default)]
pub struct MemoryPostGateway {
    posts: RwLock<Vec<Post>>,
    profiles: RwLock<HashMap<String, String>>,
    offline: AtomicBool,
}

impl MemoryPostGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a post as-is, keeping its id and timestamps.
    pub async fn insert(&self, post: Post) {
        self.posts.write().await.push(post);
    }

    /// Username joined onto posts written by `user_id`.
    pub async fn register_profile(&self, user_id: &str, username: &str) {
        self.profiles
            .write()
            .await
            .insert(user_id.to_string(), username.to_string());
    }

    /// While offline every call fails with `NetworkOrServerError`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.posts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.posts.read().await.is_empty()
    }

    fn ensure_online(&self) -> Result<(), CustomError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CustomError::NetworkOrServerError(
                "Backend is unreachable".to_string(),
            ));
        }
        Ok(())
    }

    async fn with_author(&self, mut post: Post) -> Post {
        post.author_name = self.profiles.read().await.get(&post.author_id).cloned();
        post
    }
}

#[async_trait]
impl PostGateway for MemoryPostGateway {
    async fn list_posts(&self, query: &ListQuery) -> Result<PostPage, CustomError> {
        self.ensure_online()?;

        let posts = self.posts.read().await;
        let mut matching: Vec<(usize, &Post)> = posts
            .iter()
            .enumerate()
            .filter(|(_, post)| query.matches(post))
            .collect();
        matching.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));

        let total_count = matching.len() as u64;
        let page: Vec<Post> = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .map(|(_, post)| post.clone())
            .collect();
        drop(posts);

        let mut items = Vec::with_capacity(page.len());
        for post in page {
            items.push(self.with_author(post).await);
        }

        Ok(PostPage { items, total_count })
    }

    async fn get_post(&self, id: &str) -> Result<Post, CustomError> {
        self.ensure_online()?;

        let post = self
            .posts
            .read()
            .await
            .iter()
            .find(|post| post.id == id)
            .cloned()
            .ok_or_else(post_not_found)?;
        Ok(self.with_author(post).await)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, CustomError> {
        self.ensure_online()?;

        let now = Utc::now();
        let created = Post {
            id: Uuid::new_v4().to_string(),
            title: post.title,
            content: post.content,
            author_id: post.author_id,
            created_at: now,
            updated_at: now,
            author_name: None,
        };
        self.posts.write().await.push(created.clone());
        Ok(self.with_author(created).await)
    }

    async fn update_post(
        &self,
        id: &str,
        author_id: &str,
        changes: PostForm,
    ) -> Result<Post, CustomError> {
        self.ensure_online()?;

        let updated = {
            let mut posts = self.posts.write().await;
            let post = posts
                .iter_mut()
                .find(|post| post.id == id)
                .ok_or_else(post_not_found)?;
            if !post.is_authored_by(author_id) {
                return Err(not_post_owner());
            }
            post.title = changes.title;
            post.content = changes.content;
            post.updated_at = Utc::now().max(post.updated_at);
            post.clone()
        };
        Ok(self.with_author(updated).await)
    }

    async fn delete_post(&self, id: &str, author_id: &str) -> Result<(), CustomError> {
        self.ensure_online()?;

        let mut posts = self.posts.write().await;
        let index = posts
            .iter()
            .position(|post| post.id == id)
            .ok_or_else(post_not_found)?;
        if !posts[index].is_authored_by(author_id) {
            return Err(not_post_owner());
        }
        posts.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_post(title: &str, author: &str) -> NewPost {
        NewPost {
            title: title.to_string(),
            content: format!("{} body", title),
            author_id: author.to_string(),
        }
    }

    #[tokio::test]
    async fn lists_newest_first_with_author_name() {
        let gateway = MemoryPostGateway::new();
        gateway.register_profile("u1", "alice").await;
        for i in 0..3 {
            gateway
                .create_post(new_post(&format!("Post {}", i), "u1"))
                .await
                .unwrap();
        }

        let page = gateway.list_posts(&ListQuery::default()).await.unwrap();
        let titles: Vec<_> = page.items.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Post 2", "Post 1", "Post 0"]);
        assert_eq!(page.total_count, 3);
        assert!(
            page.items
                .iter()
                .all(|p| p.author_name.as_deref() == Some("alice"))
        );
    }

    #[tokio::test]
    async fn paginates_with_offset_and_limit() {
        let gateway = MemoryPostGateway::new();
        for i in 0..13 {
            gateway
                .create_post(new_post(&format!("Post {}", i), "u1"))
                .await
                .unwrap();
        }

        let last = gateway.list_posts(&ListQuery::new("", 3)).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].title, "Post 0");
        assert_eq!(last.total_count, 13);

        let beyond = gateway.list_posts(&ListQuery::new("", 4)).await.unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_count, 13);
    }

    #[tokio::test]
    async fn update_checks_owner_and_bumps_timestamp() {
        let gateway = MemoryPostGateway::new();
        let post = gateway.create_post(new_post("Mine", "u1")).await.unwrap();

        let forbidden = gateway
            .update_post(&post.id, "u2", PostForm::default())
            .await
            .unwrap_err();
        assert!(forbidden.is_forbidden());

        let missing = gateway
            .update_post("nope", "u1", PostForm::default())
            .await
            .unwrap_err();
        assert!(missing.is_not_found());

        let updated = gateway
            .update_post(
                &post.id,
                "u1",
                PostForm {
                    title: "Renamed".into(),
                    content: "New body".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.author_id, "u1");
        assert_eq!(updated.created_at, post.created_at);
        assert!(updated.updated_at >= post.updated_at);
    }

    #[tokio::test]
    async fn delete_by_non_author_is_forbidden() {
        let gateway = MemoryPostGateway::new();
        let post = gateway.create_post(new_post("Mine", "u1")).await.unwrap();

        let err = gateway.delete_post(&post.id, "u2").await.unwrap_err();
        assert!(err.is_forbidden());
        assert_eq!(gateway.len().await, 1);

        gateway.delete_post(&post.id, "u1").await.unwrap();
        assert!(gateway.is_empty().await);
        assert!(gateway.get_post(&post.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn offline_gateway_fails_every_call() {
        let gateway = MemoryPostGateway::new();
        gateway.set_offline(true);
        let err = gateway.list_posts(&ListQuery::default()).await.unwrap_err();
        assert_eq!(err.code(), "NETWORK_OR_SERVER_ERROR");
    }
}
