//! Payload shapes returned by the weather API and their translation into
//! the persisted records.

use serde::Deserialize;

use crate::types::{
    Condition, Coord, CurrentConditions, ForecastBundle, ForecastEntry, LocationReading, Main,
    Wind,
};

/// Response of the current-conditions endpoint (by city or by coordinates).
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherResponse {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub coord: Coord,
    pub main: Main,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub dt: i64,
    #[serde(default)]
    pub timezone: i64,
    #[serde(default)]
    pub visibility: Option<i64>,
}

impl WeatherResponse {
    pub fn into_conditions(self, fetched_at: i64) -> CurrentConditions {
        CurrentConditions {
            id: self.id,
            name: self.name,
            main: self.main,
            wind: self.wind,
            weather: self.weather,
            last_updated: fetched_at,
        }
    }

    pub fn into_location(self, fetched_at: i64) -> LocationReading {
        LocationReading {
            id: self.id,
            name: self.name,
            coord: self.coord,
            main: self.main,
            wind: self.wind,
            weather: self.weather,
            last_updated: fetched_at,
        }
    }
}

/// Response of the 5-day / 3-hour forecast endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub city: City,
    #[serde(default)]
    pub cnt: u32,
    pub list: Vec<ForecastItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct City {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub coord: Coord,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastItem {
    pub dt: i64,
    pub dt_txt: String,
    pub main: Main,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub wind: Option<Wind>,
}

impl ForecastResponse {
    pub fn into_bundle(self, fetched_at: i64) -> ForecastBundle {
        ForecastBundle {
            city: self.city.name,
            entries: self
                .list
                .into_iter()
                .map(|item| ForecastEntry {
                    dt: item.dt,
                    dt_txt: item.dt_txt,
                    main: item.main,
                    weather: item.weather,
                    wind: item.wind,
                })
                .collect(),
            last_updated: fetched_at,
        }
    }
}
