//! Browser automation primitives consumed by the collection engine.
//!
//! Everything above this module talks to a [`Browser`]; the concrete session
//! is either a live W3C WebDriver session or an offline snapshot of HTML.

pub mod snapshot;
#[cfg(feature = "webdriver")]
pub mod webdriver;

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

pub use snapshot::SnapshotBrowser;
#[cfg(feature = "webdriver")]
pub use webdriver::{WebDriverConfig, WebDriverSession};

/// How an element is located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    pub fn css(value: impl Into<String>) -> Self {
        Selector::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Selector::XPath(value.into())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(v) => write!(f, "css={v}"),
            Selector::XPath(v) => write!(f, "xpath={v}"),
        }
    }
}

/// Opaque handle to an element inside the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no such element: {0}")]
    NoSuchElement(String),

    #[error("stale element reference: {0}")]
    StaleElement(String),

    #[error("unsupported by this driver: {0}")]
    Unsupported(String),

    #[error("WebDriver error '{code}': {message}")]
    Protocol { code: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// The primitive set a browser session offers.
///
/// Waits above this layer are expressed as a number of `pause` calls rather
/// than wall-clock deadlines, so a driver with a virtual clock stays
/// deterministic.
pub trait Browser {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    fn refresh(&mut self) -> Result<(), DriverError>;

    /// Throw the session away and start a fresh one on the same page.
    fn restart(&mut self) -> Result<(), DriverError> {
        self.refresh()
    }

    fn title(&mut self) -> Result<String, DriverError>;

    fn viewport(&mut self) -> Result<Viewport, DriverError>;

    fn scroll_by(&mut self, dx: i64, dy: i64) -> Result<(), DriverError>;

    /// Find elements matching `selector`, inside `scope` when given.
    fn find_all(
        &mut self,
        scope: Option<&ElementRef>,
        selector: &Selector,
    ) -> Result<Vec<ElementRef>, DriverError>;

    /// Rendered text. Hidden elements read as empty, like WebDriver.
    fn text(&mut self, element: &ElementRef) -> Result<String, DriverError>;

    fn attribute(&mut self, element: &ElementRef, name: &str)
        -> Result<Option<String>, DriverError>;

    fn is_displayed(&mut self, element: &ElementRef) -> Result<bool, DriverError>;

    fn outer_html(&mut self, element: &ElementRef) -> Result<String, DriverError>;

    fn click(&mut self, element: &ElementRef) -> Result<(), DriverError>;

    fn execute(&mut self, script: &str, args: Vec<Value>) -> Result<Value, DriverError>;

    fn ready_state(&mut self) -> Result<String, DriverError> {
        let value = self.execute("return document.readyState", Vec::new())?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn find_one(
        &mut self,
        scope: Option<&ElementRef>,
        selector: &Selector,
    ) -> Result<Option<ElementRef>, DriverError> {
        Ok(self.find_all(scope, selector)?.into_iter().next())
    }
}

/// A selector plus an optional 1-based structural index among its matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub selector: Selector,
    pub nth: Option<usize>,
}

impl Locator {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            nth: None,
        }
    }

    pub fn nth(selector: Selector, index: usize) -> Self {
        Self {
            selector,
            nth: Some(index),
        }
    }

    /// Resolve against the whole page. A missing match is `None`, not an error.
    pub fn resolve(&self, browser: &mut dyn Browser) -> Result<Option<ElementRef>, DriverError> {
        self.resolve_in(browser, None)
    }

    pub fn resolve_in(
        &self,
        browser: &mut dyn Browser,
        scope: Option<&ElementRef>,
    ) -> Result<Option<ElementRef>, DriverError> {
        let mut found = browser.find_all(scope, &self.selector)?;
        let element = match self.nth {
            Some(0) => None,
            Some(n) if n <= found.len() => Some(found.swap_remove(n - 1)),
            Some(_) => None,
            None => found.into_iter().next(),
        };
        Ok(element)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.nth {
            Some(n) => write!(f, "({})[{n}]", self.selector),
            None => write!(f, "{}", self.selector),
        }
    }
}
