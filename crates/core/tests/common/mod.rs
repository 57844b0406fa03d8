#![allow(dead_code)]

use std::path::PathBuf;

use timeliner_core::classify::Classification;
use serde_json::Value;
use timeliner_core::driver::{Browser, DriverError, ElementRef, Selector, SnapshotBrowser, Viewport};
use timeliner_core::{HarvestConfig, Record, SelectorTable};

pub const CARD: &str = r#"article[data-testid="tweet"]"#;

pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {e}", path.display()))
}

pub fn selectors() -> SelectorTable {
    SelectorTable::x_timeline()
}

/// Default config with the every-4th-slot nudge disabled, so slot n is the
/// n-th mounted card.
pub fn steady_config() -> HarvestConfig {
    let mut config = HarvestConfig::default();
    config.schedule.nudge_every = 1000;
    config
}

pub fn post_html(id: u64, author: &str, body: &str, datetime: &str) -> String {
    format!(
        r#"<article data-testid="tweet">
  <div data-testid="User-Name">
    <a href="/{author}"><div dir="ltr"><span>@{author}</span></div></a>
    <a href="/{author}/status/{id}"><time datetime="{datetime}">Mar 5</time></a>
  </div>
  <div data-testid="tweetText"><span>{body}</span></div>
  <div role="group">
    <div data-testid="like"><span data-testid="app-text-transition-container">{likes}</span></div>
  </div>
</article>
"#,
        likes = id % 7
    )
}

pub fn page(posts: &[String]) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>Home / X</title></head><body><main>\
         <section>{}</section></main></body></html>",
        posts.concat()
    )
}

/// `count` posts with ids 1000, 1001, ... all dated 5 March 2025.
pub fn numbered_feed(count: u64) -> String {
    let posts: Vec<String> = (0..count)
        .map(|i| {
            post_html(
                1000 + i,
                &format!("user{}", i % 3),
                &format!("Post number {i}"),
                "2025-03-05T12:00:00.000Z",
            )
        })
        .collect();
    page(&posts)
}

/// Timeline with `window` cards mounted at a time, one card per 200px.
pub fn feed_browser(html: &str, window: usize) -> SnapshotBrowser {
    SnapshotBrowser::new(html).with_feed(CARD, window, 200.0)
}

pub fn record(id: &str, author: &str) -> Record {
    Record {
        id: id.to_string(),
        permalink: format!("/{author}/status/{id}"),
        author: format!("@{author}"),
        timestamp: "5 March 2025".to_string(),
        body: format!("body of {id}"),
        reply_count: "0".to_string(),
        repost_count: "0".to_string(),
        like_count: "0".to_string(),
        classification: Classification {
            is_regular_post: true,
            ..Classification::default()
        },
    }
}

pub fn ids(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

/// Snapshot whose attribute and text reads fail at the transport level.
pub struct Disconnected(SnapshotBrowser);

impl Disconnected {
    pub fn new(browser: SnapshotBrowser) -> Self {
        Self(browser)
    }
}

impl Browser for Disconnected {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.0.navigate(url)
    }

    fn refresh(&mut self) -> Result<(), DriverError> {
        self.0.refresh()
    }

    fn title(&mut self) -> Result<String, DriverError> {
        self.0.title()
    }

    fn viewport(&mut self) -> Result<Viewport, DriverError> {
        self.0.viewport()
    }

    fn scroll_by(&mut self, dx: i64, dy: i64) -> Result<(), DriverError> {
        self.0.scroll_by(dx, dy)
    }

    fn find_all(
        &mut self,
        scope: Option<&ElementRef>,
        selector: &Selector,
    ) -> Result<Vec<ElementRef>, DriverError> {
        self.0.find_all(scope, selector)
    }

    fn text(&mut self, _element: &ElementRef) -> Result<String, DriverError> {
        Err(DriverError::Network("connection reset".to_string()))
    }

    fn attribute(
        &mut self,
        _element: &ElementRef,
        _name: &str,
    ) -> Result<Option<String>, DriverError> {
        Err(DriverError::Network("connection reset".to_string()))
    }

    fn is_displayed(&mut self, element: &ElementRef) -> Result<bool, DriverError> {
        self.0.is_displayed(element)
    }

    fn outer_html(&mut self, element: &ElementRef) -> Result<String, DriverError> {
        self.0.outer_html(element)
    }

    fn click(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.0.click(element)
    }

    fn execute(&mut self, script: &str, args: Vec<Value>) -> Result<Value, DriverError> {
        self.0.execute(script, args)
    }

    fn ready_state(&mut self) -> Result<String, DriverError> {
        self.0.ready_state()
    }

    fn pause(&mut self, duration: std::time::Duration) {
        self.0.pause(duration)
    }
}
