use std::sync::Arc;

use nimbus_core::DatabaseError;
use tokio::sync::watch;

use crate::client::WeatherSource;
use crate::error::WeatherError;
use crate::store::SharedStore;
use crate::types::{now_millis, LocationReading};

/// Weather at the device's position. The cache keeps a single reading.
#[derive(Clone)]
pub struct LocationRepository {
    source: Arc<dyn WeatherSource>,
    store: SharedStore,
}

impl LocationRepository {
    pub fn new(source: Arc<dyn WeatherSource>, store: SharedStore) -> Self {
        Self { source, store }
    }

    pub fn watch(&self) -> watch::Receiver<Option<LocationReading>> {
        self.store.watch_location()
    }

    pub async fn latest(&self) -> Result<Option<LocationReading>, DatabaseError> {
        self.store.location().await
    }

    /// Fetch conditions at (`lat`, `lon`) and replace the stored reading.
    ///
    /// Failures are returned as-is and the previous reading is kept.
    pub async fn refresh(&self, lat: f64, lon: f64) -> Result<LocationReading, WeatherError> {
        let response = self.source.current_by_coords(lat, lon).await?;
        let reading = response.into_location(now_millis());
        self.store.replace_location(reading.clone()).await?;
        tracing::info!(
            "Location updated to {} ({}, {})",
            reading.name,
            reading.coord.lat,
            reading.coord.lon
        );
        Ok(reading)
    }
}
