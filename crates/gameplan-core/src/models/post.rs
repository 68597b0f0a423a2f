//! Feed posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The author reference embedded in a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub username: String,
}

/// A post as the feed endpoints return it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author: Author,
    pub text: String,
    #[serde(default)]
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// The attached media URL, if any. The server sends an empty string
    /// for posts without media; that reads as no attachment.
    pub fn media(&self) -> Option<&str> {
        self.media_url.as_deref().filter(|url| !url.is_empty())
    }
}
