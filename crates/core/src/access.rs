//! Field reads inside a post card, with fallbacks and bounded retries.

use tracing::{debug, info, warn};

use crate::config::WaitConfig;
use crate::driver::{Browser, DriverError, ElementRef, Locator, Selector};
use crate::error::{HarvestError, Result};
use crate::locator::{keys, SelectorMap};
use crate::record::post_id_from_permalink;
use crate::retry::RetryPolicy;
use crate::scroll::Scroller;

/// A post card located by structural index, re-resolved after reloads.
///
/// Once pinned to a post id, re-resolution only accepts a card carrying that
/// post: a reloaded feed rarely puts the same post back at the same slot.
#[derive(Debug, Clone)]
pub struct CardHandle {
    locator: Locator,
    element: ElementRef,
    pinned: Option<(Selector, String)>,
}

impl CardHandle {
    pub fn new(locator: Locator, element: ElementRef) -> Self {
        Self {
            locator,
            element,
            pinned: None,
        }
    }

    pub fn element(&self) -> &ElementRef {
        &self.element
    }

    /// Tie the handle to the post whose permalink matches `permalink` with `id`.
    pub fn pin(&mut self, permalink: Selector, id: impl Into<String>) {
        self.pinned = Some((permalink, id.into()));
    }

    /// Look the card up again. `false` when the slot is gone or, for a pinned
    /// handle, when the post is no longer on the page.
    pub fn reacquire(&mut self, browser: &mut dyn Browser) -> Result<bool> {
        let Some(element) = self.locator.resolve(browser)? else {
            return Ok(false);
        };
        let Some((permalink, id)) = &self.pinned else {
            self.element = element;
            return Ok(true);
        };
        if card_post_id(browser, &element, permalink)?.as_deref() == Some(id.as_str()) {
            self.element = element;
            return Ok(true);
        }

        debug!(post = %id, slot = %self.locator, "Slot now holds another post, searching the page");
        for candidate in browser.find_all(None, &self.locator.selector)? {
            if card_post_id(browser, &candidate, permalink)?.as_deref() == Some(id.as_str()) {
                self.element = candidate;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Post id behind the permalink inside `card`, if one can be read.
fn card_post_id(
    browser: &mut dyn Browser,
    card: &ElementRef,
    permalink: &Selector,
) -> Result<Option<String>> {
    let link = match browser.find_one(Some(card), permalink) {
        Ok(Some(link)) => link,
        Ok(None) | Err(DriverError::StaleElement(_)) | Err(DriverError::NoSuchElement(_)) => {
            return Ok(None)
        }
        Err(e) => return Err(e.into()),
    };
    let href = match browser.attribute(&link, "href") {
        Ok(href) => href,
        Err(DriverError::StaleElement(_)) | Err(DriverError::NoSuchElement(_)) => None,
        Err(e) => return Err(e.into()),
    };
    Ok(href.as_deref().and_then(post_id_from_permalink))
}

struct ReadState<'a, 'b> {
    browser: &'a mut dyn Browser,
    card: Option<&'b mut CardHandle>,
}

pub struct TextAccessor<'a> {
    selectors: &'a dyn SelectorMap,
    waits: &'a WaitConfig,
}

impl<'a> TextAccessor<'a> {
    pub fn new(selectors: &'a dyn SelectorMap, waits: &'a WaitConfig) -> Self {
        Self { selectors, waits }
    }

    fn scroller(&self) -> Scroller<'a> {
        Scroller::new(self.waits)
    }

    /// Trimmed text of `key` inside `card`, or `fallback` when the element is
    /// missing, hidden, detached or empty. Only an unmapped key is an error.
    pub fn safe_text(
        &self,
        browser: &mut dyn Browser,
        card: Option<&ElementRef>,
        key: &str,
        fallback: &str,
    ) -> Result<String> {
        let locator = Locator::new(self.selectors.resolve(key)?);
        let Some(element) =
            self.scroller()
                .wait_visible(browser, &locator, card, self.waits.visible_timeout())
        else {
            debug!(key, fallback, "Optional field absent, using fallback");
            return Ok(fallback.to_string());
        };
        match browser.text(&element) {
            Ok(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(_) => Ok(fallback.to_string()),
            Err(e) => {
                debug!(key, error = %e, "Optional field unreadable, using fallback");
                Ok(fallback.to_string())
            }
        }
    }

    /// Non-empty trimmed text of `key`, retried with a page reload part way
    /// through. Inside a card the field is scrolled into view first, and the
    /// card is re-resolved after the reload; a card that cannot be found again
    /// ends the retries early.
    pub fn required_text(
        &self,
        browser: &mut dyn Browser,
        card: Option<&mut CardHandle>,
        key: &str,
    ) -> Result<String> {
        let locator = Locator::new(self.selectors.resolve(key)?);
        let attempts = self.waits.mandatory_attempts.max(1);
        let policy = RetryPolicy::fixed(self.waits.mandatory_pause(), attempts - 1);
        let unavailable = |attempts| HarvestError::FieldUnavailable {
            selector: locator.to_string(),
            attempts,
        };

        if let Some(card) = card.as_deref() {
            self.scroller().scroll_until_visible(
                browser,
                &locator,
                Some(card.element()),
                self.waits.field_scroll_ratio,
                self.waits.field_scroll_attempts,
            )?;
        }
        let mut state = ReadState { browser, card };

        let text = policy.run(
            &mut state,
            |state, attempt| {
                let scope = state.card.as_deref().map(|c| c.element().clone());
                let text = self.read_once(state.browser, &locator, scope.as_ref())?;
                if text.is_none() {
                    debug!(key, attempt, "Required field empty");
                }
                Ok::<_, HarvestError>(text)
            },
            |state, attempt, delay| {
                if attempt == self.waits.refresh_on_attempt {
                    warn!(key, attempt, "Required field still empty, reloading page");
                    state.browser.refresh()?;
                    if let Some(card) = state.card.as_deref_mut() {
                        if !card.reacquire(state.browser)? {
                            warn!(key, "Post is gone after reload, giving up on field");
                            return Err(unavailable(attempt + 1));
                        }
                    }
                }
                state.browser.pause(delay);
                Ok(())
            },
        )?;

        match text {
            Some(text) => {
                info!(key, value = %truncate(&text, 80), "Read field");
                Ok(text)
            }
            None => Err(unavailable(attempts)),
        }
    }

    fn read_once(
        &self,
        browser: &mut dyn Browser,
        locator: &Locator,
        scope: Option<&ElementRef>,
    ) -> Result<Option<String>> {
        let Some(element) =
            self.scroller()
                .wait_exists(browser, locator, scope, self.waits.exist_timeout())
        else {
            return Ok(None);
        };
        match browser.text(&element) {
            Ok(text) => {
                let text = text.trim();
                Ok((!text.is_empty()).then(|| text.to_string()))
            }
            Err(DriverError::StaleElement(_)) | Err(DriverError::NoSuchElement(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Permalink and post id of `card`, scrolling it into view if needed.
    pub fn permalink(
        &self,
        browser: &mut dyn Browser,
        card: &CardHandle,
    ) -> Result<Option<(String, String)>> {
        let locator = Locator::new(self.selectors.resolve(keys::PERMALINK)?);
        let link = self.scroller().scroll_until_visible(
            browser,
            &locator,
            Some(card.element()),
            self.waits.field_scroll_ratio,
            self.waits.field_scroll_attempts,
        )?;
        let Some(link) = link else {
            return Ok(None);
        };
        let href = match browser.attribute(&link, "href") {
            Ok(href) => href,
            Err(DriverError::StaleElement(_)) | Err(DriverError::NoSuchElement(_)) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(href.and_then(|href| {
            let id = post_id_from_permalink(&href)?;
            Some((href, id))
        }))
    }

    /// Attribute of the first `key` match inside `card`, if any.
    pub fn attribute(
        &self,
        browser: &mut dyn Browser,
        card: Option<&ElementRef>,
        key: &str,
        name: &str,
    ) -> Result<Option<String>> {
        let selector = self.selectors.resolve(key)?;
        let element = match browser.find_one(card, &selector) {
            Ok(element) => element,
            Err(DriverError::StaleElement(_)) | Err(DriverError::NoSuchElement(_)) => None,
            Err(e) => return Err(e.into()),
        };
        let Some(element) = element else {
            return Ok(None);
        };
        match browser.attribute(&element, name) {
            Ok(value) => Ok(value),
            Err(DriverError::StaleElement(_)) | Err(DriverError::NoSuchElement(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
