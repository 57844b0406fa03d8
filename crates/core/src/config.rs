//! Tuning constants, run parameters and report locations.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};

/// Every tuning constant of the collection engine. All sections default to the
/// values the x.com timeline needs; a TOML file may override any subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HarvestConfig {
    pub schedule: ScheduleConfig,
    pub waits: WaitConfig,
    pub interstitial: InterstitialConfig,
    pub profiles: ProfileConfig,
}

/// Batch/slot shape of the collection loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Post cards the timeline keeps rendered at once.
    pub slots_per_batch: usize,
    /// Extra share of the limit requested, since many slots yield duplicates.
    pub request_overshoot: f64,
    /// Cached records needed before a resumed run fast-forwards.
    pub warm_start_threshold: usize,
    /// Share of the computed warm-start scrolls that is skipped.
    pub warm_start_reduction: f64,
    pub warm_start_scroll_ratio: f64,
    pub warm_start_pause_ms: u64,
    /// Every n-th slot scrolls `nudge_ratio` of the viewport first.
    pub nudge_every: usize,
    pub nudge_ratio: f64,
    pub new_content_retries: usize,
    pub new_content_ratio: f64,
    pub new_content_pause_ms: u64,
    /// Trailing cards whose ids count as "already seen".
    pub new_content_window: usize,
    pub slot_scroll_ratio: f64,
    pub slot_scroll_attempts: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            slots_per_batch: 11,
            request_overshoot: 0.8,
            warm_start_threshold: 20,
            warm_start_reduction: 0.5,
            warm_start_scroll_ratio: 0.7,
            warm_start_pause_ms: 2500,
            nudge_every: 4,
            nudge_ratio: 0.5,
            new_content_retries: 12,
            new_content_ratio: 0.7,
            new_content_pause_ms: 1000,
            new_content_window: 6,
            slot_scroll_ratio: 0.8,
            slot_scroll_attempts: 8,
        }
    }
}

impl ScheduleConfig {
    /// Number of batches needed to cover `limit` plus the overshoot.
    pub fn batches_for(&self, limit: usize) -> usize {
        let slots = self.slots_per_batch.max(1) as f64;
        let requested = limit as f64 * (1.0 + self.request_overshoot);
        (requested / slots).ceil() as usize
    }

    /// Scrolls a resumed run performs to skip `cached` known records.
    pub fn warm_start_scrolls(&self, cached: usize) -> usize {
        if cached < self.warm_start_threshold {
            return 0;
        }
        let screens = (cached as f64 / self.slots_per_batch.max(1) as f64).ceil();
        let skipped = (screens * self.warm_start_reduction).ceil();
        (screens - skipped).max(0.0) as usize
    }

    pub fn warm_start_pause(&self) -> Duration {
        Duration::from_millis(self.warm_start_pause_ms)
    }

    pub fn new_content_pause(&self) -> Duration {
        Duration::from_millis(self.new_content_pause_ms)
    }
}

/// Poll intervals, timeouts and attempt budgets for element waits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub poll_interval_ms: u64,
    pub exist_timeout_ms: u64,
    pub visible_timeout_ms: u64,
    /// Pause after a card is in view, before its fields are read.
    pub field_settle_ms: u64,
    pub field_scroll_ratio: f64,
    pub field_scroll_attempts: usize,
    pub mandatory_attempts: usize,
    pub mandatory_pause_ms: u64,
    /// Zero-based attempt after which a mandatory read reloads the page.
    pub refresh_on_attempt: usize,
    pub page_load_timeout_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            exist_timeout_ms: 6500,
            visible_timeout_ms: 3000,
            field_settle_ms: 2000,
            field_scroll_ratio: 0.7,
            field_scroll_attempts: 10,
            mandatory_attempts: 5,
            mandatory_pause_ms: 1000,
            refresh_on_attempt: 3,
            page_load_timeout_ms: 5000,
        }
    }
}

impl WaitConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn exist_timeout(&self) -> Duration {
        Duration::from_millis(self.exist_timeout_ms)
    }

    pub fn visible_timeout(&self) -> Duration {
        Duration::from_millis(self.visible_timeout_ms)
    }

    pub fn field_settle(&self) -> Duration {
        Duration::from_millis(self.field_settle_ms)
    }

    pub fn mandatory_pause(&self) -> Duration {
        Duration::from_millis(self.mandatory_pause_ms)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_millis(self.page_load_timeout_ms)
    }

    /// Polls that fit in `timeout`, at least one.
    pub fn polls_within(&self, timeout: Duration) -> u32 {
        let interval = self.poll_interval().as_millis();
        (timeout.as_millis().div_ceil(interval)).max(1) as u32
    }
}

/// Recovery from the platform's "Something went wrong" screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterstitialConfig {
    pub probe_timeout_ms: u64,
    /// Wait before each recovery attempt; the last entry repeats.
    pub backoff_secs: Vec<u64>,
    pub max_attempts: usize,
    pub after_click_pause_ms: u64,
    /// Text of the placeholder rendered in place of deleted/withheld posts.
    pub unavailable_text: String,
}

impl Default for InterstitialConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 1500,
            backoff_secs: vec![180, 180, 300, 480, 600],
            max_attempts: 5,
            after_click_pause_ms: 2000,
            unavailable_text: "This post is unavailable".to_string(),
        }
    }
}

impl InterstitialConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn backoff(&self) -> Vec<Duration> {
        self.backoff_secs
            .iter()
            .map(|&s| Duration::from_secs(s))
            .collect()
    }

    pub fn after_click_pause(&self) -> Duration {
        Duration::from_millis(self.after_click_pause_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub base_url: String,
    /// Restart the browser session after this many profiles.
    pub restart_every: usize,
    pub verified_timeout_ms: u64,
    pub settle_ms: u64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            base_url: "https://x.com/".to_string(),
            restart_every: 20,
            verified_timeout_ms: 3500,
            settle_ms: 1000,
        }
    }
}

impl ProfileConfig {
    pub fn profile_url(&self, handle: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            handle.trim_start_matches('@')
        )
    }

    pub fn verified_timeout(&self) -> Duration {
        Duration::from_millis(self.verified_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl HarvestConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| HarvestError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(HarvestError::Config(msg.to_string()));
        if self.schedule.slots_per_batch == 0 {
            return fail("schedule.slots_per_batch must be at least 1");
        }
        if self.schedule.nudge_every == 0 {
            return fail("schedule.nudge_every must be at least 1");
        }
        if self.waits.mandatory_attempts == 0 {
            return fail("waits.mandatory_attempts must be at least 1");
        }
        if self.interstitial.backoff_secs.is_empty() {
            return fail("interstitial.backoff_secs must not be empty");
        }
        if self.profiles.restart_every == 0 {
            return fail("profiles.restart_every must be at least 1");
        }
        Ok(())
    }
}

/// What one run should collect.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParams {
    pub limit: usize,
    /// Posts dated strictly before this end the run.
    pub until: Option<NaiveDate>,
    pub report: String,
}

impl RunParams {
    pub fn new(report: impl Into<String>, limit: usize) -> Self {
        Self {
            limit,
            until: None,
            report: report.into(),
        }
    }

    pub fn until(mut self, date: NaiveDate) -> Self {
        self.until = Some(date);
        self
    }
}

/// Where a named report's files live.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    dir: PathBuf,
    name: String,
}

impl ReportPaths {
    pub fn new(reports_dir: impl Into<PathBuf>, name: &str) -> Self {
        Self {
            dir: reports_dir.into().join(name),
            name: name.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn posts_json(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.name))
    }

    pub fn posts_csv(&self) -> PathBuf {
        self.dir.join(format!("{}.csv", self.name))
    }

    pub fn metadata_json(&self) -> PathBuf {
        self.dir.join(format!("{}_metadata.json", self.name))
    }

    pub fn metadata_csv(&self) -> PathBuf {
        self.dir.join(format!("{}_metadata.csv", self.name))
    }
}
