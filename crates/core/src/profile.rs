//! Account metadata for the authors of collected posts.

use tracing::{info, warn};

use crate::access::TextAccessor;
use crate::cache::JsonCache;
use crate::config::{HarvestConfig, ReportPaths};
use crate::csv_sink::CsvSink;
use crate::driver::{Browser, Locator};
use crate::error::{HarvestError, Result};
use crate::locator::{keys, SelectorMap};
use crate::record::{Profile, Record};
use crate::scroll::Scroller;
use crate::stats::StageTimings;

#[derive(Debug, Clone, Default)]
pub struct ProfileStats {
    /// Distinct authors in the post cache.
    pub authors: usize,
    pub already_known: usize,
    pub collected: usize,
    pub skipped: usize,
    pub timings: StageTimings,
}

pub struct ProfileCollector<'a> {
    browser: &'a mut dyn Browser,
    selectors: &'a dyn SelectorMap,
    config: &'a HarvestConfig,
}

impl<'a> ProfileCollector<'a> {
    pub fn new(
        browser: &'a mut dyn Browser,
        selectors: &'a dyn SelectorMap,
        config: &'a HarvestConfig,
    ) -> Self {
        Self {
            browser,
            selectors,
            config,
        }
    }

    /// Visit every author of the report's posts that has no metadata yet.
    pub fn run(&mut self, paths: &ReportPaths) -> Result<ProfileStats> {
        let posts = JsonCache::<Record>::load(paths.posts_json())?;
        let mut profiles = JsonCache::<Profile>::load(paths.metadata_json())?;
        let csv = CsvSink::new(paths.metadata_csv());
        let mut stats = ProfileStats::default();

        let handles = distinct_authors(posts.items());
        stats.authors = handles.len();
        let pending: Vec<String> = handles
            .into_iter()
            .filter(|h| !profiles.exists(h))
            .collect();
        stats.already_known = stats.authors - pending.len();
        info!(
            authors = stats.authors,
            pending = pending.len(),
            "Collecting profile metadata"
        );

        let restart_every = self.config.profiles.restart_every.max(1);
        for (visited, handle) in pending.iter().enumerate() {
            if visited > 0 && visited % restart_every == 0 {
                info!(visited, "Restarting browser session");
                self.browser.restart()?;
            }
            let profile = stats.timings.time("profile", || self.fetch(handle))?;
            match profile {
                Some(profile) => {
                    profiles.append(profile.clone());
                    profiles.persist()?;
                    csv.append(&profile)?;
                    stats.collected += 1;
                    info!(username = %handle, collected = stats.collected, "Collected profile");
                }
                None => stats.skipped += 1,
            }
        }
        stats.timings.log_summary();
        Ok(stats)
    }

    /// Read one profile page. `None` when the page is not the expected
    /// profile or a count never renders.
    pub fn fetch(&mut self, handle: &str) -> Result<Option<Profile>> {
        let config = self.config;
        let profiles = &config.profiles;
        let scroller = Scroller::new(&config.waits);
        let accessor = TextAccessor::new(self.selectors, &config.waits);
        let username = handle.trim_start_matches('@');

        self.browser.navigate(&profiles.profile_url(username))?;
        self.browser.pause(profiles.settle());
        scroller.wait_page_load(self.browser, config.waits.page_load_timeout())?;
        self.browser.pause(profiles.settle());

        if !scroller.wait_title_contains(self.browser, username, config.waits.exist_timeout())? {
            warn!(username, "Profile page title does not name the account, skipping");
            return Ok(None);
        }

        let (posts, joined, following, followers) = match self.read_counts(&accessor) {
            Ok(counts) => counts,
            Err(e @ HarvestError::FieldUnavailable { .. }) => {
                warn!(username, error = %e, "Profile field missing, skipping");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let verified = Locator::new(self.selectors.resolve(keys::PROFILE_VERIFIED)?);
        let verified = scroller
            .wait_exists(self.browser, &verified, None, profiles.verified_timeout())
            .map(|badge| self.browser.is_displayed(&badge).unwrap_or(false))
            .unwrap_or(false);

        Ok(Some(Profile {
            username: username.to_string(),
            posts_count: posts.replace(" posts", "").trim().to_string(),
            joined,
            following,
            followers,
            verified,
        }))
    }

    fn read_counts(
        &mut self,
        accessor: &TextAccessor<'_>,
    ) -> Result<(String, String, String, String)> {
        Ok((
            accessor.required_text(self.browser, None, keys::PROFILE_POSTS)?,
            accessor.required_text(self.browser, None, keys::PROFILE_JOINED)?,
            accessor.required_text(self.browser, None, keys::PROFILE_FOLLOWING)?,
            accessor.required_text(self.browser, None, keys::PROFILE_FOLLOWERS)?,
        ))
    }
}

/// Author handles in first-seen order, without duplicates.
pub fn distinct_authors(records: &[Record]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    records
        .iter()
        .map(|r| r.author.trim().trim_start_matches('@').to_string())
        .filter(|a| !a.is_empty() && seen.insert(a.clone()))
        .collect()
}
