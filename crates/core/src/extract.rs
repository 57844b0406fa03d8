//! Pulls one record out of the post card at a structural slot.
//!
//! Cheap checks run first: placeholder text, then the permalink and the
//! duplicate check, and only then the per-field reads.

use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use crate::access::{CardHandle, TextAccessor};
use crate::cache::JsonCache;
use crate::classify::classify;
use crate::config::HarvestConfig;
use crate::dates;
use crate::driver::{Browser, DriverError, Locator};
use crate::error::{HarvestError, Result};
use crate::locator::{keys, SelectorMap};
use crate::record::Record;
use crate::scroll::Scroller;
use crate::stats::StageTimings;

const COUNTER_FALLBACK: &str = "0";
const CONTEXT_FALLBACK: &str = "NA";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    /// No card rendered at this slot.
    EmptySlot,
    /// Platform placeholder for a deleted or withheld post.
    Unavailable,
    Duplicate(String),
    /// Author, body or date never produced text, or the post vanished
    /// while they were being read.
    MissingContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Record(Record),
    Skipped(Skip),
}

pub struct Extractor<'a> {
    selectors: &'a dyn SelectorMap,
    config: &'a HarvestConfig,
    today: NaiveDate,
}

impl<'a> Extractor<'a> {
    pub fn new(selectors: &'a dyn SelectorMap, config: &'a HarvestConfig) -> Self {
        Self {
            selectors,
            config,
            today: Local::now().date_naive(),
        }
    }

    /// Date that relative timestamps (`5h`) resolve to.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn accessor(&self) -> TextAccessor<'a> {
        TextAccessor::new(self.selectors, &self.config.waits)
    }

    /// Extract the card at 1-based `slot`.
    ///
    /// A missing card is an error when `required`, otherwise a skip. A card
    /// without a readable permalink is always an error.
    pub fn extract_at(
        &self,
        browser: &mut dyn Browser,
        slot: usize,
        required: bool,
        cache: &JsonCache<Record>,
        timings: &mut StageTimings,
    ) -> Result<Extracted> {
        let schedule = &self.config.schedule;
        let locator = Locator::nth(self.selectors.resolve(keys::POST)?, slot);
        let element = Scroller::new(&self.config.waits).scroll_until_visible(
            browser,
            &locator,
            None,
            schedule.slot_scroll_ratio,
            schedule.slot_scroll_attempts,
        )?;
        let Some(element) = element else {
            if required {
                return Err(HarvestError::SlotNotFound {
                    target: locator.to_string(),
                    attempts: schedule.slot_scroll_attempts,
                });
            }
            warn!(slot, "No post rendered at slot, skipping");
            return Ok(Extracted::Skipped(Skip::EmptySlot));
        };
        let mut card = CardHandle::new(locator, element);
        browser.pause(self.config.waits.field_settle());

        let card_text = match browser.text(card.element()) {
            Ok(text) => text,
            Err(DriverError::StaleElement(_)) | Err(DriverError::NoSuchElement(_)) => String::new(),
            Err(e) => return Err(e.into()),
        };
        if card_text.contains(&self.config.interstitial.unavailable_text) {
            warn!(slot, "Post unavailable, skipping");
            return Ok(Extracted::Skipped(Skip::Unavailable));
        }

        let accessor = self.accessor();
        let permalink = timings.time("permalink", || accessor.permalink(browser, &card))?;
        let Some((permalink, id)) = permalink else {
            return Err(HarvestError::PermalinkMissing { slot });
        };
        if cache.exists(&id) {
            debug!(slot, id = %id, "Already collected, skipping");
            return Ok(Extracted::Skipped(Skip::Duplicate(id)));
        }
        card.pin(self.selectors.resolve(keys::PERMALINK)?, id.clone());

        let content = timings.time("text", || -> Result<Option<(String, String, String)>> {
            let mut read = |key: &str| accessor.required_text(browser, Some(&mut card), key);
            let fields = read(keys::AUTHOR).and_then(|author| {
                let body = read(keys::BODY)?;
                let time = read(keys::TIME)?;
                Ok((author, body, time))
            });
            match fields {
                Ok(fields) => Ok(Some(fields)),
                Err(e @ HarvestError::FieldUnavailable { .. }) => {
                    warn!(slot, id = %id, error = %e, "Post has no readable author, body or date, skipping");
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })?;
        let Some((author, body, time_text)) = content else {
            return Ok(Extracted::Skipped(Skip::MissingContent));
        };

        let scope = Some(card.element());
        let datetime = accessor.attribute(browser, scope, keys::TIME, "datetime")?;
        let date = dates::normalize(datetime.as_deref(), &time_text, self.today);

        let (reply_count, repost_count, like_count, replying_to, quoting) =
            timings.time("stats", || -> Result<_> {
                Ok((
                    accessor.safe_text(browser, scope, keys::REPLIES, COUNTER_FALLBACK)?,
                    accessor.safe_text(browser, scope, keys::REPOSTS, COUNTER_FALLBACK)?,
                    accessor.safe_text(browser, scope, keys::LIKES, COUNTER_FALLBACK)?,
                    accessor.safe_text(browser, scope, keys::REPLYING_TO, CONTEXT_FALLBACK)?,
                    accessor.safe_text(browser, scope, keys::QUOTE, CONTEXT_FALLBACK)?,
                ))
            })?;

        let classification = classify(&body, &replying_to, &quoting);
        Ok(Extracted::Record(Record {
            id,
            permalink,
            author,
            timestamp: date.display,
            body,
            reply_count,
            repost_count,
            like_count,
            classification,
        }))
    }
}
