use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response, header};
use serde::Deserialize;
use serde_json::json;

use crate::post::post_gateway::{PostGateway, not_post_owner, post_not_found};
use crate::post::post_model::{ListQuery, NewPost, Post, PostForm, PostPage};
use crate::utils::error::CustomError;

/// Columns requested for every post, with the author's username joined from
/// `profiles` through the posts -> profiles foreign key.
const POST_SELECT: &str = "*,profiles!fk_posts_profiles(username)";

#[derive(Debug, Deserialize)]
struct ProfileRef {
    username: String,
}

/// A `posts` row as the REST API returns it.
#[derive(Debug, Deserialize)]
struct PostRow {
    id: String,
    title: String,
    content: String,
    author_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    profiles: Option<ProfileRef>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            title: row.title,
            content: row.content,
            author_id: row.author_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            author_name: row.profiles.map(|p| p.username),
        }
    }
}

/// Operand for an `ilike` filter matching `text` as a substring.
/// LIKE wildcards are escaped first, then the whole value is double-quoted
/// so commas and parentheses survive the `or=(...)` syntax.
///
/// PostgREST rewrites every `*` in a like pattern to `%`, escaped or not, so
/// a literal `*` cannot be sent. It goes out as `_` instead: `a*b` matches
/// `a*b` and any other single character between `a` and `b`.
pub(crate) fn ilike_operand(text: &str) -> String {
    let mut like = String::with_capacity(text.len() + 2);
    like.push('%');
    for c in text.chars() {
        match c {
            '\\' | '%' | '_' => {
                like.push('\\');
                like.push(c);
            }
            '*' => like.push('_'),
            _ => like.push(c),
        }
    }
    like.push('%');

    let quoted = like.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", quoted)
}

/// `or` filter for a non-empty search, `None` otherwise.
pub(crate) fn search_param(query: &ListQuery) -> Option<String> {
    query.filter().map(|text| {
        let operand = ilike_operand(text);
        format!("(title.ilike.{0},content.ilike.{0})", operand)
    })
}

/// Total from a `Content-Range` header such as `0-5/13` or `*/0`.
pub(crate) fn parse_total_count(content_range: &str) -> Option<u64> {
    content_range
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
}

/// Gateway for a PostgREST-style HTTP API.
pub struct RestPostGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestPostGateway {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        RestPostGateway {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn posts_url(&self) -> String {
        format!("{}/rest/v1/posts", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
    }

    async fn check(response: Response, action: &str) -> Result<Response, CustomError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!("{} failed with status {}: {}", action, status, body);
        Err(CustomError::NetworkOrServerError(format!(
            "Failed to {}: HTTP {}",
            action, status
        )))
    }

    async fn rows(response: Response, action: &str) -> Result<Vec<PostRow>, CustomError> {
        response.json::<Vec<PostRow>>().await.map_err(|e| {
            CustomError::NetworkOrServerError(format!("Failed to {}: {}", action, e))
        })
    }

    async fn fetch_row(&self, id: &str) -> Result<Option<PostRow>, CustomError> {
        let response = self
            .authorize(self.client.get(self.posts_url()))
            .query(&[("select", POST_SELECT.to_string()), ("id", format!("eq.{}", id))])
            .send()
            .await?;
        let response = Self::check(response, "fetch post").await?;
        Ok(Self::rows(response, "fetch post").await?.into_iter().next())
    }

    async fn missing_or_forbidden(&self, id: &str) -> CustomError {
        match self.fetch_row(id).await {
            Ok(None) => post_not_found(),
            Ok(Some(_)) => not_post_owner(),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl PostGateway for RestPostGateway {
    async fn list_posts(&self, query: &ListQuery) -> Result<PostPage, CustomError> {
        let mut params = vec![
            ("select", POST_SELECT.to_string()),
            ("order", "created_at.desc".to_string()),
            ("offset", query.offset().to_string()),
            ("limit", query.limit().to_string()),
        ];
        if let Some(filter) = search_param(query) {
            params.push(("or", filter));
        }
        debug!("Listing posts with {:?}", params);

        let response = self
            .authorize(self.client.get(self.posts_url()))
            .header("Prefer", "count=exact")
            .query(&params)
            .send()
            .await?;
        let response = Self::check(response, "fetch posts").await?;

        let total_count = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_total_count)
            .ok_or_else(|| {
                CustomError::NetworkOrServerError("Missing total count in response".to_string())
            })?;

        let items = Self::rows(response, "fetch posts")
            .await?
            .into_iter()
            .map(Post::from)
            .collect();

        Ok(PostPage { items, total_count })
    }

    async fn get_post(&self, id: &str) -> Result<Post, CustomError> {
        self.fetch_row(id)
            .await?
            .map(Post::from)
            .ok_or_else(post_not_found)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, CustomError> {
        let body = json!({
            "title": post.title,
            "content": post.content,
            "author_id": post.author_id,
            "profile_id": post.author_id,
        });

        let response = self
            .authorize(self.client.post(self.posts_url()))
            .header("Prefer", "return=representation")
            .query(&[("select", POST_SELECT)])
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response, "create post").await?;

        Self::rows(response, "create post")
            .await?
            .into_iter()
            .next()
            .map(Post::from)
            .ok_or_else(|| {
                CustomError::NetworkOrServerError("Create returned no post".to_string())
            })
    }

    async fn update_post(
        &self,
        id: &str,
        author_id: &str,
        changes: PostForm,
    ) -> Result<Post, CustomError> {
        let body = json!({
            "title": changes.title,
            "content": changes.content,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let response = self
            .authorize(self.client.patch(self.posts_url()))
            .header("Prefer", "return=representation")
            .query(&[
                ("select", POST_SELECT.to_string()),
                ("id", format!("eq.{}", id)),
                ("author_id", format!("eq.{}", author_id)),
            ])
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response, "update post").await?;

        match Self::rows(response, "update post").await?.into_iter().next() {
            Some(row) => Ok(row.into()),
            None => Err(self.missing_or_forbidden(id).await),
        }
    }

    async fn delete_post(&self, id: &str, author_id: &str) -> Result<(), CustomError> {
        let response = self
            .authorize(self.client.delete(self.posts_url()))
            .header("Prefer", "return=representation")
            .query(&[
                ("id", format!("eq.{}", id)),
                ("author_id", format!("eq.{}", author_id)),
            ])
            .send()
            .await?;
        let response = Self::check(response, "delete post").await?;

        if Self::rows(response, "delete post").await?.is_empty() {
            return Err(self.missing_or_forbidden(id).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_total() {
        assert_eq!(parse_total_count("0-5/13"), Some(13));
        assert_eq!(parse_total_count("*/0"), Some(0));
        assert_eq!(parse_total_count("0-5/*"), None);
        assert_eq!(parse_total_count("garbage"), None);
    }

    #[test]
    fn search_param_wraps_both_columns() {
        assert_eq!(search_param(&ListQuery::default()), None);
        assert_eq!(
            search_param(&ListQuery::new("hello", 1)).unwrap(),
            r#"(title.ilike."%hello%",content.ilike."%hello%")"#
        );
    }

    #[test]
    fn ilike_operand_escapes_wildcards_and_quotes() {
        assert_eq!(ilike_operand("50%"), r#""%50\\%%""#);
        assert_eq!(ilike_operand("a_b"), r#""%a\\_b%""#);
        assert_eq!(ilike_operand(r#"say "hi", ok"#), r#""%say \"hi\", ok%""#);
    }

    #[test]
    fn asterisk_is_sent_as_single_character_wildcard() {
        assert_eq!(ilike_operand("a*b"), r#""%a_b%""#);
        assert!(!ilike_operand("**").contains('*'));
    }

    #[test]
    fn row_joins_profile_username() {
        let row: PostRow = serde_json::from_value(serde_json::json!({
            "id": "7",
            "title": "Hello",
            "content": "World",
            "author_id": "u1",
            "profile_id": "u1",
            "created_at": "2024-03-01T10:00:00.123456+00:00",
            "updated_at": "2024-03-01T10:00:00.123456+00:00",
            "profiles": { "username": "alice" }
        }))
        .unwrap();
        let post = Post::from(row);
        assert_eq!(post.author_name.as_deref(), Some("alice"));
        assert_eq!(post.id, "7");
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let gateway = RestPostGateway::new("https://example.test/", "key");
        assert_eq!(gateway.posts_url(), "https://example.test/rest/v1/posts");
    }
}
