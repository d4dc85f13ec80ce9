//! Offline-first weather data layer.
//!
//! Current conditions and forecasts come from an OpenWeatherMap-style API
//! and are cached in SQLite; favorites and the device-location reading live
//! in the same cache and are observable through `watch` channels.

pub mod cache;
pub mod client;
mod codec;
pub mod connectivity;
pub mod controller;
pub mod dto;
pub mod error;
pub mod forecast;
pub mod outcome;
pub mod repository;
pub mod store;
pub mod types;

pub use cache::{WeatherStore, SCHEMA_VERSION};
pub use client::{OpenWeatherClient, WeatherSource};
pub use connectivity::{ConnectivityProbe, ManualProbe, TcpProbe};
pub use controller::{FavoritesController, LocationController, SearchController, ViewState};
pub use error::WeatherError;
pub use forecast::{daily_forecast, format_date, format_hour_period, format_timestamp, icon_url};
pub use outcome::{safe_call, Outcome};
pub use repository::{
    FavoriteMembership, FavoritesRepository, LocationRepository, WeatherRepository,
};
pub use store::SharedStore;
pub use types::*;
