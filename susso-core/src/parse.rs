//! Field parsing for free text pulled out of account summaries
//!
//! Counts come in display form ("12,345", "1.5K", "2M") next to a label
//! word; join dates come as "Joined <Month> <Year>". Anything that does
//! not parse cleanly becomes unknown rather than zero.

use chrono::{Month, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

use crate::Count;

/// Label words that follow a count in summary text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountLabel {
    Followers,
    Following,
}

impl CountLabel {
    fn pattern(self) -> &'static Regex {
        match self {
            CountLabel::Followers => &FOLLOWERS_REGEX,
            CountLabel::Following => &FOLLOWING_REGEX,
        }
    }
}

static FOLLOWERS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:,\d+)*(?:\.\d+)?[KMB]?)\s*Followers").unwrap()
});

static FOLLOWING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:,\d+)*(?:\.\d+)?[KMB]?)\s*Following").unwrap()
});

static JOINED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Joined\s+(\w+)\s+(\d{4})").unwrap()
});

/// Find the first count labelled with `label` in `text`
pub fn parse_count(text: &str, label: CountLabel) -> Count {
    label
        .pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(Count::Unknown, |m| parse_count_value(m.as_str()))
}

/// Parse a single display count such as "12,345", "1.5K" or "2M"
pub fn parse_count_value(token: &str) -> Count {
    let cleaned: String = token.trim().chars().filter(|&c| c != ',').collect();

    let (digits, multiplier) = match cleaned.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('K') => (&cleaned[..cleaned.len() - 1], 1_000f64),
        Some('M') => (&cleaned[..cleaned.len() - 1], 1_000_000f64),
        Some('B') => (&cleaned[..cleaned.len() - 1], 1_000_000_000f64),
        _ => (cleaned.as_str(), 1f64),
    };

    match digits.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => {
            Count::Known((value * multiplier).round() as u64)
        }
        _ => Count::Unknown,
    }
}

/// Find a "Joined <Month> <Year>" phrase and anchor it to the first of the month
pub fn parse_join_date(text: &str) -> Option<NaiveDate> {
    let caps = JOINED_REGEX.captures(text)?;
    let month: Month = caps.get(1)?.as_str().parse().ok()?;
    let year: i32 = caps.get(2)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month.number_from_month(), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_with_separators() {
        assert_eq!(parse_count("12,345 Followers", CountLabel::Followers), Count::Known(12_345));
    }

    #[test]
    fn test_count_with_suffix() {
        assert_eq!(parse_count("1.5K Following", CountLabel::Following), Count::Known(1_500));
        assert_eq!(parse_count("3.2m followers", CountLabel::Followers), Count::Known(3_200_000));
        assert_eq!(parse_count_value("2M"), Count::Known(2_000_000));
        assert_eq!(parse_count_value("1B"), Count::Known(1_000_000_000));
        assert_eq!(parse_count_value("7k"), Count::Known(7_000));
    }

    #[test]
    fn test_count_picks_matching_label() {
        let text = "@someone 321 Following 4,567 Followers Joined May 2019";
        assert_eq!(parse_count(text, CountLabel::Following), Count::Known(321));
        assert_eq!(parse_count(text, CountLabel::Followers), Count::Known(4_567));
    }

    #[test]
    fn test_count_zero_is_known() {
        assert_eq!(parse_count("0 Followers", CountLabel::Followers), Count::Known(0));
    }

    #[test]
    fn test_count_missing_is_unknown() {
        assert_eq!(parse_count("no numbers here", CountLabel::Followers), Count::Unknown);
        assert_eq!(parse_count("Followers", CountLabel::Followers), Count::Unknown);
        assert_eq!(parse_count("12 Following", CountLabel::Followers), Count::Unknown);
        assert_eq!(parse_count_value("K"), Count::Unknown);
        assert_eq!(parse_count_value(""), Count::Unknown);
        assert_eq!(parse_count_value("abc"), Count::Unknown);
    }

    #[test]
    fn test_join_date() {
        assert_eq!(parse_join_date("Joined March 2020"), NaiveDate::from_ymd_opt(2020, 3, 1));
        assert_eq!(
            parse_join_date("Bio text. joined sep 2011 · 10 Following"),
            NaiveDate::from_ymd_opt(2011, 9, 1)
        );
    }

    #[test]
    fn test_join_date_unknown_month() {
        assert_eq!(parse_join_date("Joined Xyzzy 2020"), None);
        assert_eq!(parse_join_date("Joined March twenty"), None);
        assert_eq!(parse_join_date(""), None);
    }
}
