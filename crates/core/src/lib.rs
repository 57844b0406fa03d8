pub mod access;
pub mod cache;
pub mod classify;
pub mod collector;
pub mod config;
pub mod csv_sink;
pub mod dates;
pub mod dom;
pub mod driver;
pub mod error;
pub mod extract;
pub mod locator;
pub mod profile;
pub mod record;
pub mod recovery;
pub mod retry;
pub mod scroll;
pub mod stats;

pub use cache::JsonCache;
pub use collector::Collector;
pub use config::{HarvestConfig, ReportPaths, RunParams};
pub use error::{HarvestError, Result};
pub use locator::{SelectorMap, SelectorTable};
pub use record::{Profile, Record};
pub use stats::{RunOutcome, RunStats};

use driver::{Browser, SnapshotBrowser};
use extract::{Extracted, Extractor};
use stats::StageTimings;

/// Run the record extractor over a saved timeline page without touching any
/// report files. Cards that yield no record are skipped.
pub fn inspect(
    html: &str,
    selectors: &dyn SelectorMap,
    config: &HarvestConfig,
    slots: usize,
) -> Result<Vec<Record>> {
    let mut browser = SnapshotBrowser::new(html);
    let cards = browser.find_all(None, &selectors.resolve(locator::keys::POST)?)?;
    let extractor = Extractor::new(selectors, config);
    let mut seen = JsonCache::<Record>::empty("");
    let mut timings = StageTimings::default();

    for slot in 1..=slots.min(cards.len()) {
        if let Extracted::Record(record) =
            extractor.extract_at(&mut browser, slot, false, &seen, &mut timings)?
        {
            seen.append(record);
        }
    }
    Ok(seen.items().to_vec())
}
