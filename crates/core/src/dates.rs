//! Post timestamp normalisation.
//!
//! Output is always `5 March 2025`. The machine-readable `datetime` attribute
//! wins when present; otherwise the display text is parsed (`Mar 5`,
//! `Mar 5, 2024`, or relative `5h` / `12m` / `30s`).

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Month, NaiveDate};
use regex::Regex;

use crate::error::{HarvestError, Result};

const DISPLAY_FORMAT: &str = "%-d %B %Y";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDate {
    pub display: String,
    /// `None` when the source text could not be understood.
    pub date: Option<NaiveDate>,
}

impl PostDate {
    fn parsed(date: NaiveDate) -> Self {
        Self {
            display: format_date(date),
            date: Some(date),
        }
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

/// Read a normalised display date back.
pub fn parse_display(display: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(display.trim(), "%d %B %Y").ok()
}

/// Parse a `YYYY-MM-DD` stop date.
pub fn parse_stop_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| HarvestError::Config(format!("invalid stop date '{input}': {e}")))
}

static RE_MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]{3,9})\.?\s+(\d{1,2})(?:,\s*(\d{4}))?$").unwrap()
});
static RE_RELATIVE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\s*[smh]$").unwrap());

pub fn normalize(datetime_attr: Option<&str>, text: &str, today: NaiveDate) -> PostDate {
    if let Some(date) = datetime_attr
        .and_then(|attr| DateTime::parse_from_rfc3339(attr.trim()).ok())
        .map(|dt| dt.date_naive())
    {
        return PostDate::parsed(date);
    }

    let text = text.trim();
    if RE_RELATIVE.is_match(text) {
        return PostDate::parsed(today);
    }
    if let Some(date) = parse_month_day(text, today) {
        return PostDate::parsed(date);
    }
    PostDate {
        display: text.to_string(),
        date: parse_display(text),
    }
}

fn parse_month_day(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = RE_MONTH_DAY.captures(text)?;
    let month = Month::from_str(caps.get(1)?.as_str()).ok()?;
    let day: u32 = caps.get(2)?.as_str().parse().ok()?;

    match caps.get(3) {
        Some(year) => NaiveDate::from_ymd_opt(year.as_str().parse().ok()?, month.number_from_month(), day),
        None => {
            // Year-less dates belong to the most recent such day.
            let this_year = NaiveDate::from_ymd_opt(today.year(), month.number_from_month(), day);
            match this_year {
                Some(date) if date <= today => Some(date),
                _ => NaiveDate::from_ymd_opt(today.year() - 1, month.number_from_month(), day),
            }
        }
    }
}
