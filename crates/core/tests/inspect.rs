mod common;

use common::{fixture, ids, page, post_html, selectors};
use pretty_assertions::assert_eq;
use timeliner_core::driver::Selector;
use timeliner_core::locator::keys;
use timeliner_core::{inspect, HarvestConfig};

#[test]
fn test_inspect_saved_timeline() {
    let records = inspect(
        &fixture("timeline.html"),
        &selectors(),
        &HarvestConfig::default(),
        11,
    )
    .unwrap();
    assert_eq!(ids(&records), vec!["1001", "1002", "1003", "1004", "1006", "1007"]);
    assert_eq!(records[3].author, "@dave");
    assert_eq!(records[5].timestamp, "1 March 2024");
}

#[test]
fn test_inspect_respects_slot_count() {
    let records = inspect(
        &fixture("timeline.html"),
        &selectors(),
        &HarvestConfig::default(),
        2,
    )
    .unwrap();
    assert_eq!(ids(&records), vec!["1001", "1002"]);
}

#[test]
fn test_inspect_drops_repeated_cards() {
    let post = post_html(5, "echo", "same post twice", "2025-03-05T12:00:00.000Z");
    let records = inspect(
        &page(&[post.clone(), post]),
        &selectors(),
        &HarvestConfig::default(),
        11,
    )
    .unwrap();
    assert_eq!(ids(&records), vec!["5"]);
}

#[test]
fn test_inspect_with_unmatched_card_selector() {
    let mut table = selectors();
    table.insert(keys::POST, Selector::css("div.card"));
    let records = inspect(&fixture("timeline.html"), &table, &HarvestConfig::default(), 11).unwrap();
    assert!(records.is_empty());
}
