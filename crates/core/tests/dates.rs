use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use timeliner_core::dates::{format_date, normalize, parse_display, parse_stop_date, PostDate};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    ymd(2025, 3, 10)
}

#[test]
fn test_display_format_has_no_padding() {
    assert_eq!(format_date(ymd(2025, 3, 5)), "5 March 2025");
    assert_eq!(format_date(ymd(2024, 12, 25)), "25 December 2024");
    assert_eq!(parse_display("5 March 2025"), Some(ymd(2025, 3, 5)));
    assert_eq!(parse_display("March 5"), None);
}

#[test]
fn test_datetime_attribute_wins() {
    let date = normalize(Some("2025-03-04T18:22:01.000Z"), "Mar 9", today());
    assert_eq!(
        date,
        PostDate {
            display: "4 March 2025".to_string(),
            date: Some(ymd(2025, 3, 4)),
        }
    );
}

#[test]
fn test_relative_times_are_today() {
    for text in ["5h", "12m", "30s", "3 h"] {
        assert_eq!(normalize(None, text, today()).date, Some(today()), "{text}");
    }
}

#[test]
fn test_month_day_text() {
    assert_eq!(normalize(None, "Mar 1, 2024", today()).display, "1 March 2024");
    assert_eq!(normalize(None, "Mar 9", today()).date, Some(ymd(2025, 3, 9)));
    // A year-less date after today belongs to last year.
    assert_eq!(normalize(None, "Dec 24", today()).date, Some(ymd(2024, 12, 24)));
}

#[test]
fn test_unparseable_text_is_kept() {
    let date = normalize(Some("yesterday-ish"), "  sometime  ", today());
    assert_eq!(date.display, "sometime");
    assert_eq!(date.date, None);

    let invalid_day = normalize(None, "Feb 30, 2024", today());
    assert_eq!(invalid_day.date, None);
}

#[test]
fn test_stop_date() {
    assert_eq!(parse_stop_date("2025-01-31").unwrap(), ymd(2025, 1, 31));
    assert!(parse_stop_date("31/01/2025").is_err());
}
