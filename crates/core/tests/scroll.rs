mod common;

use std::time::Duration;

use common::{feed_browser, fixture, numbered_feed, CARD};
use pretty_assertions::assert_eq;
use timeliner_core::config::{InterstitialConfig, WaitConfig};
use timeliner_core::driver::{Locator, Selector, SnapshotBrowser};
use timeliner_core::recovery::InterstitialGuard;
use timeliner_core::scroll::Scroller;
use timeliner_core::{HarvestError, SelectorTable};

fn permalink() -> Selector {
    Selector::css(r#"a[href*="/status/"]"#)
}

#[test]
fn test_trailing_ids_of_mounted_cards() {
    let waits = WaitConfig::default();
    let scroller = Scroller::new(&waits);
    let mut browser = feed_browser(&numbered_feed(30), 11);

    let ids = scroller
        .trailing_ids(&mut browser, &Selector::css(CARD), &permalink(), 3)
        .unwrap();
    assert_eq!(ids, vec!["1008", "1009", "1010"]);
}

#[test]
fn test_new_content_after_one_scroll() {
    let waits = WaitConfig::default();
    let scroller = Scroller::new(&waits);
    let mut browser = feed_browser(&numbered_feed(30), 11);

    let scrolls = scroller
        .scroll_until_new_content(
            &mut browser,
            &Selector::css(CARD),
            &permalink(),
            6,
            0.7,
            Duration::from_secs(1),
            12,
        )
        .unwrap();
    assert_eq!(scrolls, 1);
    assert_eq!(browser.mounted_cards(), Some((2, 13)));
    assert_eq!(browser.elapsed(), Duration::from_secs(1));
}

#[test]
fn test_new_content_gives_up() {
    let waits = WaitConfig::default();
    let scroller = Scroller::new(&waits);
    let mut browser = feed_browser(&numbered_feed(8), 11);

    let err = scroller
        .scroll_until_new_content(
            &mut browser,
            &Selector::css(CARD),
            &permalink(),
            6,
            0.7,
            Duration::from_secs(1),
            3,
        )
        .unwrap_err();
    assert!(matches!(err, HarvestError::FeedStalled(3)));
    assert_eq!(browser.elapsed(), Duration::from_secs(3));
}

#[test]
fn test_scroll_until_visible_mounts_later_cards() {
    let waits = WaitConfig::default();
    let scroller = Scroller::new(&waits);
    let mut browser = feed_browser(&numbered_feed(30), 11);
    let target = Locator::new(Selector::css(r#"a[href="/user2/status/1014"]"#));

    let found = scroller
        .scroll_until_visible(&mut browser, &target, None, 0.8, 8)
        .unwrap();
    assert!(found.is_some());
    // 683px per scroll: the first mounts three cards, the second three more.
    assert_eq!(browser.mounted_cards(), Some((6, 17)));
}

#[test]
fn test_wait_visible_times_out_on_hidden_element() {
    let waits = WaitConfig::default();
    let scroller = Scroller::new(&waits);
    let mut browser = SnapshotBrowser::new(&fixture("timeline.html"));
    let hidden = Locator::new(Selector::css(r#"[data-testid="reply"][style]"#));

    assert!(scroller
        .wait_visible(&mut browser, &hidden, None, Duration::from_secs(2))
        .is_none());
    assert_eq!(browser.elapsed(), Duration::from_secs(2));
}

#[test]
fn test_title_and_page_load_waits() {
    let waits = WaitConfig::default();
    let scroller = Scroller::new(&waits);
    let mut browser = SnapshotBrowser::new(&fixture("profile_bob.html"));

    scroller
        .wait_page_load(&mut browser, waits.page_load_timeout())
        .unwrap();
    assert!(scroller
        .wait_title_contains(&mut browser, "bob", Duration::from_secs(1))
        .unwrap());
    assert!(!scroller
        .wait_title_contains(&mut browser, "carol", Duration::from_secs(1))
        .unwrap());
    assert_eq!(browser.elapsed(), Duration::from_secs(1));
}

#[test]
fn test_guard_is_quiet_without_retry_screen() {
    let table = SelectorTable::x_timeline();
    let waits = WaitConfig::default();
    let interstitial = InterstitialConfig::default();
    let guard = InterstitialGuard::new(&table, &interstitial, &waits);
    let mut browser = SnapshotBrowser::new(&fixture("timeline.html"));

    assert!(!guard.is_present(&mut browser).unwrap());
    assert_eq!(guard.recover(&mut browser).unwrap(), 0);
    assert_eq!(browser.reloads(), 0);
}

#[test]
fn test_guard_backs_off_until_cleared() {
    let table = SelectorTable::x_timeline();
    let waits = WaitConfig::default();
    let interstitial = InterstitialConfig {
        backoff_secs: vec![10, 20],
        ..InterstitialConfig::default()
    };
    let guard = InterstitialGuard::new(&table, &interstitial, &waits);
    let mut browser = SnapshotBrowser::new(&fixture("interstitial.html"))
        .then_frame(&fixture("interstitial.html"))
        .then_frame(&fixture("interstitial.html"))
        .then_frame(&fixture("timeline.html"));

    assert!(guard.is_present(&mut browser).unwrap());
    assert_eq!(guard.recover(&mut browser).unwrap(), 3);
    assert!(browser.elapsed() >= Duration::from_secs(10 + 20 + 20));
    assert_eq!(browser.reloads(), 3);
}
