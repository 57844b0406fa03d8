//! Visibility polling and viewport scrolling.
//!
//! Existence alone never counts as "found": a card can sit in the DOM while
//! hidden or unmounted, so every wait checks visibility too.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::WaitConfig;
use crate::driver::{Browser, DriverError, ElementRef, Locator, Selector};
use crate::error::{HarvestError, Result};
use crate::record::post_id_from_permalink;

pub struct Scroller<'c> {
    waits: &'c WaitConfig,
}

impl<'c> Scroller<'c> {
    pub fn new(waits: &'c WaitConfig) -> Self {
        Self { waits }
    }

    /// Poll until `locator` matches inside `scope`, or give up after `timeout`.
    pub fn wait_exists(
        &self,
        browser: &mut dyn Browser,
        locator: &Locator,
        scope: Option<&ElementRef>,
        timeout: Duration,
    ) -> Option<ElementRef> {
        let polls = self.waits.polls_within(timeout);
        for poll in 0..=polls {
            match locator.resolve_in(browser, scope) {
                Ok(Some(element)) => return Some(element),
                Ok(None) => {}
                Err(e) => debug!(%locator, error = %e, "Lookup failed while waiting"),
            }
            if poll < polls {
                browser.pause(self.waits.poll_interval());
            }
        }
        None
    }

    /// Wait for existence, then for visibility, each within `timeout`.
    /// Never fails: a timeout is logged and reported as `None`.
    pub fn wait_visible(
        &self,
        browser: &mut dyn Browser,
        locator: &Locator,
        scope: Option<&ElementRef>,
        timeout: Duration,
    ) -> Option<ElementRef> {
        let Some(element) = self.wait_exists(browser, locator, scope, timeout) else {
            warn!(%locator, ?timeout, "Element did not appear");
            return None;
        };

        let polls = self.waits.polls_within(timeout);
        for poll in 0..=polls {
            match browser.is_displayed(&element) {
                Ok(true) => return Some(element),
                Ok(false) => {}
                Err(DriverError::StaleElement(_)) => {
                    // Re-rendered under us; look it up again.
                    if let Ok(Some(fresh)) = locator.resolve_in(browser, scope) {
                        if matches!(browser.is_displayed(&fresh), Ok(true)) {
                            return Some(fresh);
                        }
                    }
                }
                Err(e) => debug!(%locator, error = %e, "Visibility check failed"),
            }
            if poll < polls {
                browser.pause(self.waits.poll_interval());
            }
        }
        warn!(%locator, ?timeout, "Element exists but never became visible");
        None
    }

    /// Single quick probe: visible right now.
    fn visible_now(
        &self,
        browser: &mut dyn Browser,
        locator: &Locator,
        scope: Option<&ElementRef>,
    ) -> Option<ElementRef> {
        let element = locator.resolve_in(browser, scope).ok()??;
        matches!(browser.is_displayed(&element), Ok(true)).then_some(element)
    }

    pub fn scroll_by_ratio(&self, browser: &mut dyn Browser, ratio: f64) -> Result<()> {
        let viewport = browser.viewport()?;
        let dy = (viewport.height * ratio).round() as i64;
        browser.scroll_by(0, dy)?;
        Ok(())
    }

    /// Scroll by `ratio` of the viewport until `locator` is visible, checking
    /// before each scroll and once after the last.
    pub fn scroll_until_visible(
        &self,
        browser: &mut dyn Browser,
        locator: &Locator,
        scope: Option<&ElementRef>,
        ratio: f64,
        max_attempts: usize,
    ) -> Result<Option<ElementRef>> {
        if let Some(element) = self.visible_now(browser, locator, scope) {
            return Ok(Some(element));
        }
        for attempt in 1..=max_attempts {
            self.scroll_by_ratio(browser, ratio)?;
            browser.pause(self.waits.poll_interval());
            if let Some(element) = self.visible_now(browser, locator, scope) {
                debug!(%locator, attempt, "Visible after scrolling");
                return Ok(Some(element));
            }
        }
        warn!(%locator, max_attempts, "Not visible after scrolling");
        Ok(None)
    }

    /// Ids of the last `window` cards currently rendered. Cards whose
    /// permalink cannot be read are skipped.
    pub fn trailing_ids(
        &self,
        browser: &mut dyn Browser,
        cards: &Selector,
        permalink: &Selector,
        window: usize,
    ) -> Result<Vec<String>> {
        let found = browser.find_all(None, cards)?;
        let tail = &found[found.len().saturating_sub(window)..];
        let mut ids = Vec::new();
        for card in tail {
            let link = match browser.find_one(Some(card), permalink) {
                Ok(Some(link)) => link,
                Ok(None) | Err(DriverError::StaleElement(_)) | Err(DriverError::NoSuchElement(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            if let Ok(Some(href)) = browser.attribute(&link, "href") {
                if let Some(id) = post_id_from_permalink(&href) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    /// Scroll until a card outside the trailing window seen before appears.
    /// Returns the number of scrolls it took.
    #[allow(clippy::too_many_arguments)]
    pub fn scroll_until_new_content(
        &self,
        browser: &mut dyn Browser,
        cards: &Selector,
        permalink: &Selector,
        window: usize,
        ratio: f64,
        pause: Duration,
        retries: usize,
    ) -> Result<usize> {
        let seen: HashSet<String> = self
            .trailing_ids(browser, cards, permalink, window)?
            .into_iter()
            .collect();

        for attempt in 1..=retries {
            self.scroll_by_ratio(browser, ratio)?;
            browser.pause(pause);
            let current = self.trailing_ids(browser, cards, permalink, window)?;
            if current.iter().any(|id| !seen.contains(id)) {
                debug!(attempt, "New posts rendered");
                return Ok(attempt);
            }
        }
        Err(HarvestError::FeedStalled(retries))
    }

    /// Poll `document.readyState` until it reports `complete`.
    pub fn wait_page_load(&self, browser: &mut dyn Browser, timeout: Duration) -> Result<()> {
        let polls = self.waits.polls_within(timeout);
        for poll in 0..=polls {
            if browser.ready_state()? == "complete" {
                return Ok(());
            }
            if poll < polls {
                browser.pause(self.waits.poll_interval());
            }
        }
        Err(HarvestError::PageLoadTimeout(timeout))
    }

    pub fn wait_title_contains(
        &self,
        browser: &mut dyn Browser,
        needle: &str,
        timeout: Duration,
    ) -> Result<bool> {
        let polls = self.waits.polls_within(timeout);
        for poll in 0..=polls {
            if browser.title()?.contains(needle) {
                return Ok(true);
            }
            if poll < polls {
                browser.pause(self.waits.poll_interval());
            }
        }
        Ok(false)
    }
}
