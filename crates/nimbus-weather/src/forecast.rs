//! Daily reduction of the 3-hour forecast and display formatting helpers.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::types::ForecastEntry;

const DT_TXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DEFAULT_ICON: &str = "01d";

/// Reduce a forecast to one entry per calendar date.
///
/// Dates keep the order in which they first appear. For each date the
/// `12:00:00` entry is chosen when present, otherwise the middle one.
pub fn daily_forecast(entries: &[ForecastEntry]) -> Vec<ForecastEntry> {
    let mut days: Vec<(&str, Vec<&ForecastEntry>)> = Vec::new();

    for entry in entries {
        let key = entry.date_key();
        match days.iter_mut().find(|(date, _)| *date == key) {
            Some((_, group)) => group.push(entry),
            None => days.push((key, vec![entry])),
        }
    }

    days.into_iter()
        .filter_map(|(_, group)| {
            group
                .iter()
                .find(|e| e.dt_txt.contains("12:00:00"))
                .or_else(|| group.get(group.len() / 2))
                .map(|e| (*e).clone())
        })
        .collect()
}

fn parse_dt_txt(dt_txt: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(dt_txt, DT_TXT_FORMAT).ok()
}

/// "2024-05-01 15:00:00" -> "3 PM". Unparsable input gives "N/A".
pub fn format_hour_period(dt_txt: &str) -> String {
    parse_dt_txt(dt_txt)
        .map(|dt| dt.format("%-I %p").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// "2024-05-01 12:00:00" -> "Wed, May 1". Unparsable input is returned as-is.
pub fn format_date(dt_txt: &str) -> String {
    parse_dt_txt(dt_txt)
        .map(|dt| dt.format("%a, %b %-d").to_string())
        .unwrap_or_else(|| dt_txt.to_string())
}

/// Epoch milliseconds as "hh:mm AM" in UTC.
pub fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%I:%M %p").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn icon_url(icon: Option<&str>) -> String {
    let code = icon.filter(|c| !c.is_empty()).unwrap_or(DEFAULT_ICON);
    format!("https://openweathermap.org/img/wn/{}@2x.png", code)
}
