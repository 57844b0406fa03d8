use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cache::CacheKey;
use crate::classify::Classification;
use crate::dates;

/// One collected post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub permalink: String,
    pub author: String,
    pub timestamp: String,
    pub body: String,
    pub reply_count: String,
    pub repost_count: String,
    pub like_count: String,
    pub classification: Classification,
}

impl Record {
    /// Calendar date of the post when `timestamp` is normalised.
    pub fn date(&self) -> Option<NaiveDate> {
        dates::parse_display(&self.timestamp)
    }
}

impl CacheKey for Record {
    fn cache_key(&self) -> &str {
        &self.id
    }
}

/// Account metadata for one author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub username: String,
    pub posts_count: String,
    pub joined: String,
    pub following: String,
    pub followers: String,
    pub verified: bool,
}

impl CacheKey for Profile {
    fn cache_key(&self) -> &str {
        &self.username
    }
}

/// Extract the post id from a permalink such as `https://x.com/a/status/123?s=2`.
pub fn post_id_from_permalink(permalink: &str) -> Option<String> {
    let (_, rest) = permalink.split_once("/status/")?;
    let id: String = rest
        .chars()
        .take_while(|c| !matches!(c, '/' | '?' | '#'))
        .collect();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
