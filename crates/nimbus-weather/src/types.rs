use serde::{Deserialize, Serialize};

/// Temperature, pressure and humidity bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Main {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Atmospheric pressure in hPa
    pub pressure: f64,
    /// Relative humidity in percent
    pub humidity: u8,
}

/// Wind vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Wind {
    pub speed: f64,
    /// Meteorological direction in degrees
    pub deg: f64,
    #[serde(default)]
    pub gust: Option<f64>,
}

/// Condition descriptor as reported by the weather source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub id: i64,
    /// Short code such as "Rain" or "Clouds"
    pub main: String,
    pub description: String,
    /// Icon code such as "10d"
    pub icon: String,
}

/// Geographic coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// Current weather conditions for a city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Source-assigned city id
    pub id: i64,
    pub name: String,
    pub main: Main,
    pub wind: Wind,
    pub weather: Vec<Condition>,
    /// Epoch milliseconds of the last successful write
    pub last_updated: i64,
}

impl CurrentConditions {
    /// First condition descriptor, if the source sent any.
    pub fn primary_condition(&self) -> Option<&Condition> {
        self.weather.first()
    }
}

/// One step of a multi-day forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    /// Epoch seconds of the forecast step
    pub dt: i64,
    /// "YYYY-MM-DD HH:MM:SS" in UTC
    pub dt_txt: String,
    pub main: Main,
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub wind: Option<Wind>,
}

impl ForecastEntry {
    /// Calendar date portion of `dt_txt`.
    pub fn date_key(&self) -> &str {
        self.dt_txt.get(..10).unwrap_or(&self.dt_txt)
    }
}

/// Complete forecast for one city, replaced wholesale on refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBundle {
    pub city: String,
    pub entries: Vec<ForecastEntry>,
    pub last_updated: i64,
}

/// Frozen snapshot of a city's conditions at the time it was favorited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteCity {
    pub id: i64,
    pub name: String,
    pub main: Main,
    pub wind: Wind,
    pub weather: Vec<Condition>,
    pub last_updated: i64,
}

impl FavoriteCity {
    /// Take a snapshot of `conditions`, stamped at `timestamp`.
    pub fn snapshot(conditions: &CurrentConditions, timestamp: i64) -> Self {
        Self {
            id: conditions.id,
            name: conditions.name.clone(),
            main: conditions.main.clone(),
            wind: conditions.wind.clone(),
            weather: conditions.weather.clone(),
            last_updated: timestamp,
        }
    }

    /// View the snapshot as current conditions (for rendering alongside live data).
    pub fn to_conditions(&self) -> CurrentConditions {
        CurrentConditions {
            id: self.id,
            name: self.name.clone(),
            main: self.main.clone(),
            wind: self.wind.clone(),
            weather: self.weather.clone(),
            last_updated: self.last_updated,
        }
    }
}

/// Weather at the device's coordinates; the store keeps at most one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationReading {
    pub id: i64,
    pub name: String,
    pub coord: Coord,
    pub main: Main,
    pub wind: Wind,
    pub weather: Vec<Condition>,
    pub last_updated: i64,
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
