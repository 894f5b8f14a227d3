use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use log::debug;
use mongodb::{
    Client, Collection,
    bson::{self, Document, doc, oid::ObjectId},
    options::ReturnDocument,
};
use serde::{Deserialize, Serialize};

use crate::auth::mongo_provider::ProfileDocument;
use crate::post::post_gateway::{PostGateway, not_post_owner, post_not_found};
use crate::post::post_model::{ListQuery, NewPost, Post, PostForm, PostPage};
use crate::utils::error::CustomError;

/// Stored shape of a post; timestamps are native BSON dates so that sorting
/// on `created_at` is chronological.
#[derive(Debug, Serialize, Deserialize, Clone)]
struct PostDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    content: String,
    author_id: String,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

fn to_bson_date(at: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(at.timestamp_millis())
}

fn from_bson_date(at: bson::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or_default()
}

impl PostDocument {
    fn into_post(self, author_name: Option<String>) -> Post {
        Post {
            id: self.id.to_hex(),
            title: self.title,
            content: self.content,
            author_id: self.author_id,
            created_at: from_bson_date(self.created_at),
            updated_at: from_bson_date(self.updated_at),
            author_name,
        }
    }
}

/// Case-insensitive substring filter on title OR content. The search text is
/// regex-escaped so it is matched literally.
pub(crate) fn search_filter(query: &ListQuery) -> Document {
    match query.filter() {
        None => doc! {},
        Some(text) => {
            let pattern = regex::escape(text);
            doc! {
                "$or": [
                    { "title": { "$regex": pattern.as_str(), "$options": "i" } },
                    { "content": { "$regex": pattern.as_str(), "$options": "i" } },
                ]
            }
        }
    }
}

/// Unknown or malformed ids are reported as missing posts.
fn parse_post_id(id: &str) -> Result<ObjectId, CustomError> {
    ObjectId::parse_str(id).map_err(|_| post_not_found())
}

pub struct MongoPostGateway {
    collection: Collection<PostDocument>,
    profiles: Collection<ProfileDocument>,
}

impl MongoPostGateway {
    pub fn new(client: &Client, database: &str) -> Self {
        let db = client.database(database);
        MongoPostGateway {
            collection: db.collection::<PostDocument>("posts"),
            profiles: db.collection::<ProfileDocument>("profiles"),
        }
    }

    /// Usernames for the given author ids, the join behind `Post::author_name`.
    async fn usernames(&self, author_ids: Vec<String>) -> Result<HashMap<String, String>, CustomError> {
        if author_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let cursor = self
            .profiles
            .find(doc! { "_id": { "$in": author_ids } })
            .await
            .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to fetch profiles: {}", e)))?;

        let profiles: Vec<ProfileDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to collect profiles: {}", e)))?;

        Ok(profiles.into_iter().map(|p| (p.id, p.username)).collect())
    }

    async fn with_author(&self, document: PostDocument) -> Result<Post, CustomError> {
        let mut names = self.usernames(vec![document.author_id.clone()]).await?;
        let name = names.remove(&document.author_id);
        Ok(document.into_post(name))
    }

    /// Distinguishes "no such post" from "not yours" after an owner-scoped
    /// write matched nothing.
    async fn missing_or_forbidden(&self, id: &ObjectId) -> CustomError {
        match self.collection.count_documents(doc! { "_id": id }).await {
            Ok(0) => post_not_found(),
            Ok(_) => not_post_owner(),
            Err(e) => CustomError::NetworkOrServerError(format!("Failed to check post: {}", e)),
        }
    }
}

#[async_trait]
impl PostGateway for MongoPostGateway {
    async fn list_posts(&self, query: &ListQuery) -> Result<PostPage, CustomError> {
        let filter = search_filter(query);
        debug!(
            "Listing posts page={} search={:?}",
            query.page, query.search_text
        );

        let total_count = self
            .collection
            .count_documents(filter.clone())
            .await
            .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to count posts: {}", e)))?;

        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": -1, "_id": -1 })
            .skip(query.offset())
            .limit(query.limit() as i64)
            .await
            .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to fetch posts: {}", e)))?;

        let documents: Vec<PostDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to collect posts: {}", e)))?;

        let mut author_ids: Vec<String> = documents.iter().map(|d| d.author_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();
        let names = self.usernames(author_ids).await?;

        let items = documents
            .into_iter()
            .map(|d| {
                let name = names.get(&d.author_id).cloned();
                d.into_post(name)
            })
            .collect();

        Ok(PostPage { items, total_count })
    }

    async fn get_post(&self, id: &str) -> Result<Post, CustomError> {
        let object_id = parse_post_id(id)?;

        let document = self
            .collection
            .find_one(doc! { "_id": object_id })
            .await
            .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to fetch post: {}", e)))?
            .ok_or_else(post_not_found)?;

        self.with_author(document).await
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, CustomError> {
        let now = to_bson_date(Utc::now());
        let document = PostDocument {
            id: ObjectId::new(),
            title: post.title,
            content: post.content,
            author_id: post.author_id,
            created_at: now,
            updated_at: now,
        };

        self.collection
            .insert_one(&document)
            .await
            .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to create post: {}", e)))?;

        self.with_author(document).await
    }

    async fn update_post(
        &self,
        id: &str,
        author_id: &str,
        changes: PostForm,
    ) -> Result<Post, CustomError> {
        let object_id = parse_post_id(id)?;

        // `$max` keeps updated_at from ever moving backwards.
        let update = doc! {
            "$set": { "title": changes.title, "content": changes.content },
            "$max": { "updated_at": to_bson_date(Utc::now()) },
        };

        let updated = self
            .collection
            .find_one_and_update(doc! { "_id": object_id, "author_id": author_id }, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to update post: {}", e)))?;

        match updated {
            Some(document) => self.with_author(document).await,
            None => Err(self.missing_or_forbidden(&object_id).await),
        }
    }

    async fn delete_post(&self, id: &str, author_id: &str) -> Result<(), CustomError> {
        let object_id = parse_post_id(id)?;

        let result = self
            .collection
            .delete_one(doc! { "_id": object_id, "author_id": author_id })
            .await
            .map_err(|e| CustomError::NetworkOrServerError(format!("Failed to delete post: {}", e)))?;

        if result.deleted_count == 0 {
            return Err(self.missing_or_forbidden(&object_id).await);
        }

        Ok(())
    }
}
