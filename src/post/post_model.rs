use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of posts shown on one list page.
pub const PAGE_SIZE: u64 = 6;

/// Characters of content shown on a list card before it is cut off.
pub const PREVIEW_CHARS: usize = 150;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Username of the author's profile, when the gateway joined it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
}

impl Post {
    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.author_id == user_id
    }

    /// Content split on newlines, the way the detail view renders paragraphs.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.content.split('\n')
    }

    /// First `PREVIEW_CHARS` characters of the content, with "..." appended
    /// when anything was cut.
    pub fn preview(&self) -> String {
        match self.content.char_indices().nth(PREVIEW_CHARS) {
            Some((cut, _)) => format!("{}...", &self.content[..cut]),
            None => self.content.clone(),
        }
    }

    pub fn author_label(&self) -> &str {
        match self.author_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "Unknown",
        }
    }
}

/// What a list card shows for one post.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct PostCard {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Post> for PostCard {
    fn from(post: &Post) -> Self {
        PostCard {
            id: post.id.clone(),
            title: post.title.clone(),
            preview: post.preview(),
            author: post.author_label().to_string(),
            created_at: post.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct PostForm {
    pub title: String,
    pub content: String,
}

impl From<&Post> for PostForm {
    fn from(post: &Post) -> Self {
        PostForm {
            title: post.title.clone(),
            content: post.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_id: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search_text: String,
    pub page: u64,
    pub page_size: u64,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            search_text: String::new(),
            page: 1,
            page_size: PAGE_SIZE,
        }
    }
}

impl ListQuery {
    pub fn new(search_text: impl Into<String>, page: u64) -> Self {
        ListQuery {
            search_text: search_text.into(),
            page: page.max(1),
            page_size: PAGE_SIZE,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page.max(1) - 1) * self.page_size
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }

    /// `None` when the search text is empty, i.e. no filter.
    pub fn filter(&self) -> Option<&str> {
        if self.search_text.is_empty() {
            None
        } else {
            Some(&self.search_text)
        }
    }

    /// Case-insensitive substring match on title OR content.
    pub fn matches(&self, post: &Post) -> bool {
        match self.filter() {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                post.title.to_lowercase().contains(&needle)
                    || post.content.to_lowercase().contains(&needle)
            }
        }
    }
}

/// One page of posts plus the number of posts matching the query overall.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct PostPage {
    pub items: Vec<Post>,
    pub total_count: u64,
}

impl PostPage {
    pub fn total_pages(&self, page_size: u64) -> u64 {
        total_pages(self.total_count, page_size)
    }
}

/// `max(1, ceil(count / page_size))`. A zero page size is treated as one.
pub fn total_pages(count: u64, page_size: u64) -> u64 {
    count.div_ceil(page_size.max(1)).max(1)
}
