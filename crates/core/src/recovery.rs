//! Recovery from the platform's retry interstitial ("Something went wrong.
//! Try reloading.") that replaces the timeline when rate limited.

use tracing::{info, warn};

use crate::config::{InterstitialConfig, WaitConfig};
use crate::driver::{Browser, Locator};
use crate::error::{HarvestError, Result};
use crate::locator::{keys, SelectorMap};
use crate::retry::RetryPolicy;
use crate::scroll::Scroller;

pub struct InterstitialGuard<'a> {
    selectors: &'a dyn SelectorMap,
    config: &'a InterstitialConfig,
    waits: &'a WaitConfig,
}

impl<'a> InterstitialGuard<'a> {
    pub fn new(
        selectors: &'a dyn SelectorMap,
        config: &'a InterstitialConfig,
        waits: &'a WaitConfig,
    ) -> Self {
        Self {
            selectors,
            config,
            waits,
        }
    }

    fn retry_button(&self) -> Result<Locator> {
        Ok(Locator::new(self.selectors.resolve(keys::RETRY_BUTTON)?))
    }

    /// Whether the retry screen is showing right now.
    pub fn is_present(&self, browser: &mut dyn Browser) -> Result<bool> {
        let locator = self.retry_button()?;
        let scroller = Scroller::new(self.waits);
        Ok(
            match scroller.wait_exists(browser, &locator, None, self.config.probe_timeout()) {
                Some(button) => browser.is_displayed(&button).unwrap_or(false),
                None => false,
            },
        )
    }

    /// Clear the interstitial if one is showing, backing off between attempts.
    /// Returns the number of recovery attempts used.
    pub fn recover(&self, browser: &mut dyn Browser) -> Result<usize> {
        let locator = self.retry_button()?;
        let policy = RetryPolicy::new(self.config.backoff(), self.config.max_attempts);
        let scroller = Scroller::new(self.waits);

        let cleared = policy.run(
            browser,
            |browser, attempt| Ok::<_, HarvestError>((!self.is_present(browser)?).then_some(attempt)),
            |browser, attempt, delay| {
                warn!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_retries(),
                    wait_secs = delay.as_secs(),
                    "Retry screen visible, backing off"
                );
                browser.pause(delay);
                if let Some(button) = locator.resolve(browser)? {
                    if let Err(e) = browser.click(&button) {
                        warn!(error = %e, "Failed to click retry button");
                    }
                }
                browser.pause(self.config.after_click_pause());
                if let Err(e) = scroller.wait_page_load(browser, self.waits.page_load_timeout()) {
                    warn!(error = %e, "Page did not finish loading after retry");
                }
                Ok(())
            },
        )?;

        match cleared {
            Some(0) => Ok(0),
            Some(attempts) => {
                info!(attempts, "Recovered from retry screen");
                Ok(attempts)
            }
            None => Err(HarvestError::InterstitialExhausted {
                attempts: policy.max_retries(),
            }),
        }
    }
}
