//! Symbolic selector keys and their resolution.
//!
//! Components never hard-code selectors; they ask a [`SelectorMap`] for a key
//! such as `post:permalink`. The shipped table reads `section:name` keys from
//! TOML whose values use the `By.css => ...` notation.

use std::collections::BTreeMap;
use std::path::Path;

use crate::driver::Selector;
use crate::error::{HarvestError, Result};

/// Keys the collection engine resolves.
pub mod keys {
    pub const POST: &str = "timeline:post";
    pub const RETRY_BUTTON: &str = "timeline:retry_button";
    pub const PERMALINK: &str = "post:permalink";
    pub const AUTHOR: &str = "post:author";
    pub const BODY: &str = "post:body";
    pub const TIME: &str = "post:time";
    pub const REPLIES: &str = "post:replies";
    pub const REPOSTS: &str = "post:reposts";
    pub const LIKES: &str = "post:likes";
    pub const REPLYING_TO: &str = "post:replying_to";
    pub const QUOTE: &str = "post:quote";
    pub const PROFILE_POSTS: &str = "profile:posts";
    pub const PROFILE_JOINED: &str = "profile:joined";
    pub const PROFILE_FOLLOWING: &str = "profile:following";
    pub const PROFILE_FOLLOWERS: &str = "profile:followers";
    pub const PROFILE_VERIFIED: &str = "profile:verified";

    pub const ALL: &[&str] = &[
        POST,
        RETRY_BUTTON,
        PERMALINK,
        AUTHOR,
        BODY,
        TIME,
        REPLIES,
        REPOSTS,
        LIKES,
        REPLYING_TO,
        QUOTE,
        PROFILE_POSTS,
        PROFILE_JOINED,
        PROFILE_FOLLOWING,
        PROFILE_FOLLOWERS,
        PROFILE_VERIFIED,
    ];
}

/// Injected selector resolution: symbolic key in, selector out.
pub trait SelectorMap {
    fn resolve(&self, key: &str) -> Result<Selector>;
}

/// Selector table keyed by `section:name`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectorTable {
    entries: BTreeMap<String, Selector>,
}

impl SelectorTable {
    /// Selectors for the x.com timeline markup.
    pub fn x_timeline() -> Self {
        let defaults = [
            (keys::POST, r#"By.css => article[data-testid="tweet"]"#),
            (keys::RETRY_BUTTON, r#"By.css => [role="button"][data-testid="retry"], button.retry"#),
            (keys::PERMALINK, r#"By.css => a[href*="/status/"]"#),
            (keys::AUTHOR, r#"By.css => [data-testid="User-Name"] a[href^="/"] [dir="ltr"]"#),
            (keys::BODY, r#"By.css => [data-testid="tweetText"]"#),
            (keys::TIME, "By.css => time"),
            (keys::REPLIES, r#"By.css => [data-testid="reply"] [data-testid="app-text-transition-container"]"#),
            (keys::REPOSTS, r#"By.css => [data-testid="retweet"] [data-testid="app-text-transition-container"]"#),
            (keys::LIKES, r#"By.css => [data-testid="like"] [data-testid="app-text-transition-container"]"#),
            (keys::REPLYING_TO, r#"By.css => [data-testid="replyingTo"], .replying-to"#),
            (keys::QUOTE, r#"By.css => [data-testid="quoteTweet"] [data-testid="User-Name"]"#),
            (keys::PROFILE_POSTS, r#"By.css => [data-testid="primaryColumn"] h2 + div"#),
            (keys::PROFILE_JOINED, r#"By.css => [data-testid="UserJoinDate"]"#),
            (keys::PROFILE_FOLLOWING, r#"By.css => a[href$="/following"] span"#),
            (keys::PROFILE_FOLLOWERS, r#"By.css => a[href$="/verified_followers"] span"#),
            (keys::PROFILE_VERIFIED, r#"By.css => [data-testid="icon-verified"]"#),
        ];
        let mut table = Self::default();
        for (key, definition) in defaults {
            // The built-in definitions are all well formed.
            if let Ok(selector) = parse_definition(key, definition) {
                table.entries.insert(key.to_string(), selector);
            }
        }
        table
    }

    pub fn insert(&mut self, key: &str, selector: Selector) {
        self.entries.insert(key.to_string(), selector);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a TOML table of `[section] name = "By.css => ..."` entries.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let root: toml::Table = input
            .parse()
            .map_err(|e: toml::de::Error| HarvestError::Config(e.to_string()))?;

        let mut table = Self::default();
        for (section, value) in root {
            let toml::Value::Table(entries) = value else {
                return Err(HarvestError::Config(format!(
                    "selector section '{section}' must be a table"
                )));
            };
            for (name, definition) in entries {
                let key = format!("{section}:{name}");
                let toml::Value::String(definition) = definition else {
                    return Err(HarvestError::InvalidSelector {
                        key,
                        reason: "definition must be a string".to_string(),
                    });
                };
                let selector = parse_definition(&key, &definition)?;
                table.entries.insert(key, selector);
            }
        }
        Ok(table)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Defaults overlaid with the entries of `other`.
    pub fn merged(mut self, other: SelectorTable) -> Self {
        self.entries.extend(other.entries);
        self
    }

    /// Render back to the TOML notation `from_toml_str` reads.
    pub fn to_toml_string(&self) -> String {
        let mut sections: BTreeMap<&str, Vec<(&str, String)>> = BTreeMap::new();
        for (key, selector) in &self.entries {
            let (section, name) = key.split_once(':').unwrap_or(("default", key.as_str()));
            let definition = match selector {
                Selector::Css(css) => format!("By.css => {css}"),
                Selector::XPath(xpath) => format!("By.xpath => {xpath}"),
            };
            sections.entry(section).or_default().push((name, definition));
        }

        let mut out = String::new();
        for (section, entries) in sections {
            out.push_str(&format!("[{section}]\n"));
            for (name, definition) in entries {
                out.push_str(&format!("{name} = {}\n", toml::Value::String(definition)));
            }
            out.push('\n');
        }
        out
    }
}

impl SelectorMap for SelectorTable {
    fn resolve(&self, key: &str) -> Result<Selector> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| HarvestError::UnknownSelector(key.to_string()))
    }
}

/// Parse `By.<strategy> => <value>`.
pub fn parse_definition(key: &str, definition: &str) -> Result<Selector> {
    let invalid = |reason: &str| HarvestError::InvalidSelector {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    let (strategy, value) = definition
        .split_once("=>")
        .ok_or_else(|| invalid("expected 'By.<strategy> => <value>'"))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid("empty selector value"));
    }
    match strategy.trim() {
        "By.css" => Ok(Selector::css(value)),
        "By.xpath" => Ok(Selector::xpath(value)),
        "By.id" => Ok(Selector::css(format!("#{value}"))),
        "By.testid" => Ok(Selector::css(format!("[data-testid=\"{value}\"]"))),
        other => Err(invalid(&format!("unknown strategy '{other}'"))),
    }
}
