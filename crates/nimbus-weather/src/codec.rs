//! Encoding of composite columns.
//!
//! Each composite field is stored as JSON text produced from a fixed typed
//! shape. The layout of these shapes is part of the cache schema, so a change
//! here must bump `cache::SCHEMA_VERSION`.

use rusqlite::types::Type;

use crate::types::{Condition, Coord, ForecastEntry, Main, Wind};

fn encode<T: serde::Serialize>(value: &T) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn decode<T: serde::de::DeserializeOwned>(column: usize, text: &str) -> rusqlite::Result<T> {
    serde_json::from_str(text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

pub fn encode_main(main: &Main) -> rusqlite::Result<String> {
    encode(main)
}

pub fn decode_main(column: usize, text: &str) -> rusqlite::Result<Main> {
    decode(column, text)
}

pub fn encode_wind(wind: &Wind) -> rusqlite::Result<String> {
    encode(wind)
}

pub fn decode_wind(column: usize, text: &str) -> rusqlite::Result<Wind> {
    decode(column, text)
}

pub fn encode_conditions(weather: &[Condition]) -> rusqlite::Result<String> {
    encode(&weather)
}

pub fn decode_conditions(column: usize, text: &str) -> rusqlite::Result<Vec<Condition>> {
    decode(column, text)
}

pub fn encode_coord(coord: &Coord) -> rusqlite::Result<String> {
    encode(coord)
}

pub fn decode_coord(column: usize, text: &str) -> rusqlite::Result<Coord> {
    decode(column, text)
}

pub fn encode_entries(entries: &[ForecastEntry]) -> rusqlite::Result<String> {
    encode(&entries)
}

pub fn decode_entries(column: usize, text: &str) -> rusqlite::Result<Vec<ForecastEntry>> {
    decode(column, text)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::fixtures;

    #[test]
    fn test_main_layout_is_stable() {
        let text = encode_main(&fixtures::main(20.0)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        for key in ["temp", "feels_like", "temp_min", "temp_max", "pressure", "humidity"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_wind_without_gust_decodes() {
        let wind = decode_wind(0, r#"{"speed": 1.5, "deg": 90.0}"#).unwrap();
        assert_eq!(wind.gust, None);
        assert_eq!(wind.speed, 1.5);
    }

    #[test]
    fn test_decode_failure_reports_column() {
        let err = decode_main(3, "not json").unwrap_err();
        match err {
            rusqlite::Error::FromSqlConversionFailure(col, Type::Text, _) => assert_eq!(col, 3),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_entries_keep_order() {
        let entries = vec![
            fixtures::entry("2024-05-01 09:00:00", 1.0),
            fixtures::entry("2024-05-01 12:00:00", 2.0),
        ];
        let text = encode_entries(&entries).unwrap();
        assert_eq!(decode_entries(0, &text).unwrap(), entries);
    }
}
