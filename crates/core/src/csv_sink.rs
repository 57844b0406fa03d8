//! Append-only CSV report files.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, WriterBuilder};

use crate::error::{HarvestError, Result};
use crate::record::{Profile, Record};

/// A type that can be written as one CSV row under a fixed header.
pub trait CsvRow {
    fn header() -> &'static [&'static str];
    fn to_csv_record(&self) -> Vec<String>;
}

#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, creating the file and writing the header first when it
    /// does not exist yet. Every field is quoted; inner quotes are doubled.
    pub fn append<R: CsvRow>(&self, row: &R) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| HarvestError::io(dir, e))?;
        }
        let needs_header = fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| HarvestError::io(&self.path, e))?;
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(R::header())?;
        }
        writer.write_record(row.to_csv_record())?;
        writer.flush().map_err(|e| HarvestError::io(&self.path, e))?;
        Ok(())
    }
}

fn target(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

impl CsvRow for Record {
    fn header() -> &'static [&'static str] {
        &[
            "id",
            "permalink",
            "author",
            "date",
            "body",
            "replies",
            "reposts",
            "likes",
            "isRegularPost",
            "isMention",
            "mentionTarget",
            "isQuote",
            "quoteTarget",
            "isReply",
            "replyTarget",
        ]
    }

    fn to_csv_record(&self) -> Vec<String> {
        let c = &self.classification;
        vec![
            self.id.clone(),
            self.permalink.clone(),
            self.author.clone(),
            self.timestamp.clone(),
            self.body.clone(),
            self.reply_count.clone(),
            self.repost_count.clone(),
            self.like_count.clone(),
            c.is_regular_post.to_string(),
            c.is_mention.to_string(),
            target(&c.mention_target),
            c.is_quote.to_string(),
            target(&c.quote_target),
            c.is_reply.to_string(),
            target(&c.reply_target),
        ]
    }
}

impl CsvRow for Profile {
    fn header() -> &'static [&'static str] {
        &[
            "username",
            "postsCount",
            "joined",
            "following",
            "followers",
            "verified",
        ]
    }

    fn to_csv_record(&self) -> Vec<String> {
        vec![
            self.username.clone(),
            self.posts_count.clone(),
            self.joined.clone(),
            self.following.clone(),
            self.followers.clone(),
            self.verified.to_string(),
        ]
    }
}
