//! Offline browser over saved HTML.
//!
//! Models the parts of a live timeline the collector depends on: a
//! virtualised feed where only a window of post cards is mounted, hidden
//! elements, stale handles after a reload, queued frames that replace the page
//! on refresh/click (retry screens), URL routes, and a virtual clock.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use super::{Browser, DriverError, ElementRef, Selector, Viewport};
use crate::dom::{self, CssSelector, Document, NodeId};

const DEFAULT_VIEWPORT: Viewport = Viewport {
    width: 1470.0,
    height: 854.0,
};

/// Virtualised list of post cards: only `start..end` are mounted.
#[derive(Debug, Clone)]
struct FeedWindow {
    selectors: Vec<CssSelector>,
    window: usize,
    card_height: f64,
    start: usize,
    end: usize,
    carry: f64,
}

pub struct SnapshotBrowser {
    doc: Document,
    generation: u64,
    url: String,
    frames: VecDeque<String>,
    routes: HashMap<String, String>,
    viewport: Viewport,
    feed: Option<FeedWindow>,
    card_positions: HashMap<NodeId, usize>,
    scroll_y: f64,
    clock: Duration,
    reloads: usize,
}

impl SnapshotBrowser {
    pub fn new(html: &str) -> Self {
        Self {
            doc: dom::parse_html(html),
            generation: 0,
            url: "about:blank".to_string(),
            frames: VecDeque::new(),
            routes: HashMap::new(),
            viewport: DEFAULT_VIEWPORT,
            feed: None,
            card_positions: HashMap::new(),
            scroll_y: 0.0,
            clock: Duration::ZERO,
            reloads: 0,
        }
    }

    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = Viewport { width, height };
        self
    }

    /// Mount at most `window` cards matching `card_selector` at a time; each
    /// `card_height` pixels scrolled mounts the next card.
    pub fn with_feed(mut self, card_selector: &str, window: usize, card_height: f64) -> Self {
        match dom::parse_selector_list(card_selector) {
            Some(selectors) => {
                self.feed = Some(FeedWindow {
                    selectors,
                    window: window.max(1),
                    card_height: card_height.max(1.0),
                    start: 0,
                    end: 0,
                    carry: 0.0,
                });
                self.index_cards();
                if let Some(feed) = self.feed.as_mut() {
                    feed.end = feed.window.min(self.card_positions.len());
                }
            }
            None => warn!(card_selector, "Feed selector does not parse, feed window disabled"),
        }
        self
    }

    /// Queue a page that replaces the current one on the next refresh or click.
    pub fn then_frame(mut self, html: &str) -> Self {
        self.frames.push_back(html.to_string());
        self
    }

    /// Serve `html` when `url` is navigated to.
    pub fn with_route(mut self, url: &str, html: &str) -> Self {
        self.routes.insert(url.to_string(), html.to_string());
        self
    }

    /// Total time spent in `pause`.
    pub fn elapsed(&self) -> Duration {
        self.clock
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    pub fn reloads(&self) -> usize {
        self.reloads
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Range of mounted card positions, if a feed is configured.
    pub fn mounted_cards(&self) -> Option<(usize, usize)> {
        self.feed.as_ref().map(|f| (f.start, f.end))
    }

    fn load(&mut self, html: &str) {
        self.doc = dom::parse_html(html);
        self.bump_generation();
        self.index_cards();
        let total = self.card_positions.len();
        if let Some(feed) = self.feed.as_mut() {
            feed.end = feed.end.max(feed.window).min(total);
            feed.start = feed.start.min(feed.end);
        }
    }

    fn bump_generation(&mut self) {
        self.generation += 1;
        self.reloads += 1;
    }

    fn advance_frame(&mut self) -> bool {
        match self.frames.pop_front() {
            Some(html) => {
                debug!(remaining = self.frames.len(), "Advancing to next snapshot frame");
                self.load(&html);
                true
            }
            None => false,
        }
    }

    fn index_cards(&mut self) {
        self.card_positions.clear();
        if let Some(feed) = &self.feed {
            let cards = self.doc.select(None, &feed.selectors);
            self.card_positions = cards
                .into_iter()
                .enumerate()
                .map(|(pos, id)| (id, pos))
                .collect();
        }
    }

    fn is_mounted(&self, id: NodeId) -> bool {
        let Some(feed) = &self.feed else {
            return true;
        };
        std::iter::once(id)
            .chain(self.doc.ancestors(id))
            .find_map(|n| self.card_positions.get(&n))
            .map(|&pos| pos >= feed.start && pos < feed.end)
            .unwrap_or(true)
    }

    fn element_ref(&self, id: NodeId) -> ElementRef {
        ElementRef::new(format!("{}:{}", self.generation, id))
    }

    fn resolve(&self, element: &ElementRef) -> Result<NodeId, DriverError> {
        let (generation, id) = element
            .id()
            .split_once(':')
            .and_then(|(g, n)| Some((g.parse::<u64>().ok()?, n.parse::<NodeId>().ok()?)))
            .ok_or_else(|| DriverError::NoSuchElement(element.id().to_string()))?;
        if generation != self.generation || !self.is_mounted(id) {
            return Err(DriverError::StaleElement(element.id().to_string()));
        }
        match self.doc.node(id) {
            Some(node) if node.is_element() => Ok(id),
            _ => Err(DriverError::NoSuchElement(element.id().to_string())),
        }
    }

    fn displayed(&self, id: NodeId) -> bool {
        self.is_mounted(id) && !self.doc.is_hidden(id)
    }
}

impl Browser for SnapshotBrowser {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.url = url.to_string();
        if let Some(html) = self.routes.get(url).cloned() {
            if let Some(feed) = self.feed.as_mut() {
                feed.start = 0;
                feed.end = 0;
                feed.carry = 0.0;
            }
            self.scroll_y = 0.0;
            self.load(&html);
        } else if !self.advance_frame() {
            self.bump_generation();
        }
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), DriverError> {
        if !self.advance_frame() {
            self.bump_generation();
        }
        Ok(())
    }

    fn title(&mut self) -> Result<String, DriverError> {
        Ok(self.doc.title())
    }

    fn viewport(&mut self) -> Result<Viewport, DriverError> {
        Ok(self.viewport)
    }

    fn scroll_by(&mut self, _dx: i64, dy: i64) -> Result<(), DriverError> {
        self.scroll_y = (self.scroll_y + dy as f64).max(0.0);
        let total = self.card_positions.len();
        let Some(feed) = self.feed.as_mut() else {
            return Ok(());
        };

        let travelled = feed.carry + dy.unsigned_abs() as f64;
        let cards = (travelled / feed.card_height).floor() as usize;
        feed.carry = travelled - cards as f64 * feed.card_height;

        if dy >= 0 {
            feed.end = (feed.end + cards).min(total);
            feed.start = feed.end.saturating_sub(feed.window).max(feed.start);
        } else {
            feed.start = feed.start.saturating_sub(cards);
            feed.end = (feed.start + feed.window).min(total);
        }
        debug!(start = feed.start, end = feed.end, "Feed window moved");
        Ok(())
    }

    fn find_all(
        &mut self,
        scope: Option<&ElementRef>,
        selector: &Selector,
    ) -> Result<Vec<ElementRef>, DriverError> {
        let css = match selector {
            Selector::Css(css) => css,
            Selector::XPath(xpath) => {
                return Err(DriverError::Unsupported(format!(
                    "xpath selectors in snapshots ({xpath})"
                )))
            }
        };
        let selectors = dom::parse_selector_list(css)
            .ok_or_else(|| DriverError::InvalidResponse(format!("invalid CSS selector '{css}'")))?;
        let scope = scope.map(|s| self.resolve(s)).transpose()?;

        Ok(self
            .doc
            .select(scope, &selectors)
            .into_iter()
            .filter(|&id| self.is_mounted(id))
            .map(|id| self.element_ref(id))
            .collect())
    }

    fn text(&mut self, element: &ElementRef) -> Result<String, DriverError> {
        let id = self.resolve(element)?;
        if !self.displayed(id) {
            return Ok(String::new());
        }
        Ok(self.doc.visible_text(id))
    }

    fn attribute(
        &mut self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let id = self.resolve(element)?;
        Ok(self
            .doc
            .node(id)
            .and_then(|n| n.get_attr(name))
            .map(String::from))
    }

    fn is_displayed(&mut self, element: &ElementRef) -> Result<bool, DriverError> {
        let id = self.resolve(element)?;
        Ok(self.displayed(id))
    }

    fn outer_html(&mut self, element: &ElementRef) -> Result<String, DriverError> {
        let id = self.resolve(element)?;
        Ok(self.doc.outer_html(id))
    }

    fn click(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        let id = self.resolve(element)?;
        let href = self
            .doc
            .node(id)
            .and_then(|n| n.get_attr("href"))
            .map(String::from);
        if let Some(href) = href.filter(|h| self.routes.contains_key(h)) {
            return self.navigate(&href);
        }
        self.advance_frame();
        Ok(())
    }

    fn execute(&mut self, script: &str, _args: Vec<Value>) -> Result<Value, DriverError> {
        Err(DriverError::Unsupported(format!("script execution ({script})")))
    }

    fn ready_state(&mut self) -> Result<String, DriverError> {
        Ok("complete".to_string())
    }

    fn pause(&mut self, duration: Duration) {
        self.clock += duration;
    }
}
