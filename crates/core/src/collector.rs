//! The scroll-and-extract loop.
//!
//! Runs up to `batches_for(limit)` batches of `slots_per_batch` slots. Each
//! collected record is appended to the JSON cache, persisted and written to
//! CSV before the next slot, so a run killed at any point leaves consistent
//! files behind.

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::cache::JsonCache;
use crate::config::{HarvestConfig, ReportPaths, RunParams};
use crate::csv_sink::CsvSink;
use crate::driver::Browser;
use crate::error::Result;
use crate::extract::{Extracted, Extractor, Skip};
use crate::locator::{keys, SelectorMap};
use crate::record::Record;
use crate::recovery::InterstitialGuard;
use crate::scroll::Scroller;
use crate::stats::{RunOutcome, RunStats};

pub struct Collector<'a> {
    browser: &'a mut dyn Browser,
    selectors: &'a dyn SelectorMap,
    config: &'a HarvestConfig,
    today: Option<NaiveDate>,
}

impl<'a> Collector<'a> {
    pub fn new(
        browser: &'a mut dyn Browser,
        selectors: &'a dyn SelectorMap,
        config: &'a HarvestConfig,
    ) -> Self {
        Self {
            browser,
            selectors,
            config,
            today: None,
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Collect into the report at `paths`. `stats` is reset first and holds
    /// the final counters whether the run succeeds or fails.
    pub fn run(
        &mut self,
        params: &RunParams,
        paths: &ReportPaths,
        stats: &mut RunStats,
    ) -> Result<RunOutcome> {
        *stats = RunStats::new(params.limit);
        let mut cache = JsonCache::<Record>::load(paths.posts_json())?;
        let csv = CsvSink::new(paths.posts_csv());
        stats.collected = cache.len();

        let result = self.collect(params, &mut cache, &csv, stats);
        match &result {
            Ok(outcome) => info!(
                %outcome,
                collected = stats.collected,
                new = stats.new_this_run,
                inspected = stats.inspected,
                "Collection finished"
            ),
            Err(e) => error!(
                error = %e,
                collected = stats.collected,
                inspected = stats.inspected,
                "Collection aborted"
            ),
        }
        stats.timings.log_summary();
        result
    }

    fn collect(
        &mut self,
        params: &RunParams,
        cache: &mut JsonCache<Record>,
        csv: &CsvSink,
        stats: &mut RunStats,
    ) -> Result<RunOutcome> {
        let config = self.config;
        let schedule = &config.schedule;
        let slots = schedule.slots_per_batch;
        let batches = schedule.batches_for(params.limit);
        let cards = self.selectors.resolve(keys::POST)?;
        let permalink = self.selectors.resolve(keys::PERMALINK)?;

        let scroller = Scroller::new(&config.waits);
        let guard = InterstitialGuard::new(self.selectors, &config.interstitial, &config.waits);
        let mut extractor = Extractor::new(self.selectors, config);
        if let Some(today) = self.today {
            extractor = extractor.with_today(today);
        }

        info!(
            limit = params.limit,
            batches,
            cached = cache.len(),
            until = ?params.until,
            "Starting collection"
        );

        for batch in 0..batches {
            if cache.len() >= params.limit {
                return Ok(RunOutcome::LimitReached);
            }
            if batch == 0 {
                self.warm_start(cache.len(), &scroller, &guard)?;
            }
            debug!(batch = batch + 1, batches, "Starting batch");

            for slot in 1..=slots {
                if cache.len() >= params.limit {
                    break;
                }
                guard.recover(self.browser)?;
                if slot % schedule.nudge_every == 0 {
                    scroller.scroll_by_ratio(self.browser, schedule.nudge_ratio)?;
                }
                if slot == slots {
                    scroller.scroll_until_new_content(
                        self.browser,
                        &cards,
                        &permalink,
                        schedule.new_content_window,
                        schedule.new_content_ratio,
                        schedule.new_content_pause(),
                        schedule.new_content_retries,
                    )?;
                }

                stats.inspected += 1;
                let extracted = extractor.extract_at(
                    self.browser,
                    slot,
                    slot < slots,
                    cache,
                    &mut stats.timings,
                )?;
                let record = match extracted {
                    Extracted::Record(record) => record,
                    Extracted::Skipped(Skip::Duplicate(id)) => {
                        debug!(slot, id = %id, "Duplicate");
                        continue;
                    }
                    Extracted::Skipped(reason) => {
                        debug!(slot, ?reason, "Slot skipped");
                        continue;
                    }
                };

                if let (Some(until), Some(date)) = (params.until, record.date()) {
                    if date < until {
                        info!(id = %record.id, %date, %until, "Reached stop date");
                        return Ok(RunOutcome::DateBoundary {
                            id: record.id,
                            date,
                        });
                    }
                }

                cache.append(record.clone());
                cache.persist()?;
                csv.append(&record)?;
                stats.collected = cache.len();
                stats.new_this_run += 1;
                info!(
                    id = %record.id,
                    collected = stats.collected,
                    limit = params.limit,
                    "Collected post"
                );
            }
        }

        if cache.len() >= params.limit {
            Ok(RunOutcome::LimitReached)
        } else {
            warn!(
                collected = cache.len(),
                limit = params.limit,
                "All batches used before reaching the limit"
            );
            Ok(RunOutcome::BatchesExhausted)
        }
    }

    /// Skip past content a resumed run has already collected.
    fn warm_start(
        &mut self,
        cached: usize,
        scroller: &Scroller<'_>,
        guard: &InterstitialGuard<'_>,
    ) -> Result<()> {
        let config = self.config;
        let schedule = &config.schedule;
        let scrolls = schedule.warm_start_scrolls(cached);
        if scrolls == 0 {
            return Ok(());
        }
        info!(cached, scrolls, "Fast-forwarding past collected posts");
        for _ in 0..scrolls {
            scroller.scroll_by_ratio(self.browser, schedule.warm_start_scroll_ratio)?;
            self.browser.pause(schedule.warm_start_pause());
            guard.recover(self.browser)?;
        }
        Ok(())
    }
}
