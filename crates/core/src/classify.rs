//! Interaction classification from body, reply-context and quote-context text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static RE_HANDLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@\w+").unwrap());

/// Every `@handle` token in `text`, in order of appearance.
pub fn extract_handles(text: &str) -> Vec<String> {
    RE_HANDLE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// The six category combinations a post can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Regular,
    /// Regular post that mentions someone.
    Mention,
    Quote,
    Reply,
    MentionReply,
    MentionQuote,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub is_regular_post: bool,
    pub is_mention: bool,
    pub mention_target: Option<String>,
    pub is_quote: bool,
    pub quote_target: Option<String>,
    pub is_reply: bool,
    pub reply_target: Option<String>,
}

impl Classification {
    pub fn kind(&self) -> InteractionKind {
        match (self.is_mention, self.is_reply, self.is_quote) {
            (true, true, _) => InteractionKind::MentionReply,
            (true, false, true) => InteractionKind::MentionQuote,
            (false, _, true) => InteractionKind::Quote,
            (false, true, false) => InteractionKind::Reply,
            (true, false, false) => InteractionKind::Mention,
            (false, false, false) => InteractionKind::Regular,
        }
    }
}

fn joined(handles: &[String]) -> Option<String> {
    Some(handles.join(" "))
}

/// Classify a post. Context counts as present when it names at least one
/// handle, so a placeholder like `NA` is absent.
///
/// Mention-only posts stay flagged as regular posts carrying a mention.
pub fn classify(body: &str, reply_context: &str, quote_context: &str) -> Classification {
    let mentions = extract_handles(body);
    let replies = extract_handles(reply_context);
    let quotes = extract_handles(quote_context);

    let has_mention = !mentions.is_empty();
    let has_reply = !replies.is_empty();
    let has_quote = !quotes.is_empty();

    let mut c = Classification::default();
    if has_mention && has_reply {
        c.is_mention = true;
        c.is_reply = true;
        c.mention_target = joined(&mentions);
        c.reply_target = joined(&replies);
    } else if has_mention && has_quote {
        c.is_mention = true;
        c.is_quote = true;
        c.mention_target = joined(&mentions);
        c.quote_target = joined(&quotes);
    } else if has_quote {
        c.is_quote = true;
        c.quote_target = joined(&quotes);
    } else if has_reply {
        c.is_reply = true;
        c.reply_target = joined(&replies);
    } else if has_mention {
        c.is_regular_post = true;
        c.is_mention = true;
        c.mention_target = joined(&mentions);
    } else {
        c.is_regular_post = true;
    }
    c
}
