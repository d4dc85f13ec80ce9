//! Shared, async access to the weather cache.
//!
//! `SharedStore` serialises all SQLite work behind one mutex and runs it on
//! the blocking pool. Favorites and the location slot are additionally
//! published on `watch` channels. Publishing happens while the mutex is
//! held, so the watched value always matches the committed rows.

use std::path::Path;
use std::sync::Arc;

use nimbus_core::DatabaseError;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::cache::WeatherStore;
use crate::types::{CurrentConditions, FavoriteCity, ForecastBundle, LocationReading};

type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<WeatherStore>>,
    favorites_tx: Arc<watch::Sender<Vec<FavoriteCity>>>,
    location_tx: Arc<watch::Sender<Option<LocationReading>>>,
}

impl SharedStore {
    /// Wrap an open store, seeding the change channels from its current rows.
    pub fn new(store: WeatherStore) -> Result<Self> {
        let favorites = store.list_favorites()?;
        let location = store.get_location()?;
        let (favorites_tx, _) = watch::channel(favorites);
        let (location_tx, _) = watch::channel(location);

        Ok(Self {
            inner: Arc::new(Mutex::new(store)),
            favorites_tx: Arc::new(favorites_tx),
            location_tx: Arc::new(location_tx),
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(WeatherStore::new(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(WeatherStore::in_memory()?)
    }

    /// Run `f` against the store on the blocking pool.
    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WeatherStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut store = inner.lock();
            f(&mut store)
        })
        .await
        .map_err(|e| DatabaseError::QueryFailed(format!("cache task failed: {}", e)))?
    }

    // ---- current conditions ----

    pub async fn current(&self, city: &str) -> Result<Option<CurrentConditions>> {
        let city = city.to_string();
        self.with_store(move |s| s.get_current(&city)).await
    }

    pub async fn upsert_current(&self, conditions: CurrentConditions) -> Result<CurrentConditions> {
        self.with_store(move |s| s.upsert_current(&conditions)).await
    }

    // ---- forecast ----

    pub async fn forecast(&self, city: &str) -> Result<Option<ForecastBundle>> {
        let city = city.to_string();
        self.with_store(move |s| s.get_forecast(&city)).await
    }

    pub async fn upsert_forecast(&self, bundle: ForecastBundle) -> Result<ForecastBundle> {
        self.with_store(move |s| s.upsert_forecast(&bundle)).await
    }

    pub async fn list_forecasts(&self) -> Result<Vec<ForecastBundle>> {
        self.with_store(|s| s.list_forecasts()).await
    }

    pub async fn clear_forecasts(&self) -> Result<()> {
        self.with_store(|s| s.clear_forecasts()).await
    }

    // ---- favorites ----

    /// Apply a favorites write and publish the resulting list.
    async fn write_favorites<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WeatherStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let favorites_tx = self.favorites_tx.clone();
        self.with_store(move |s| {
            let value = f(s)?;
            // Publish under the lock so watchers see writes in commit order
            favorites_tx.send_replace(s.list_favorites()?);
            Ok(value)
        })
        .await
    }

    pub async fn upsert_favorite(&self, favorite: FavoriteCity) -> Result<()> {
        self.write_favorites(move |s| s.upsert_favorite(&favorite))
            .await
    }

    pub async fn delete_favorite(&self, id: i64) -> Result<bool> {
        self.write_favorites(move |s| s.delete_favorite(id)).await
    }

    pub async fn delete_favorite_by_name(&self, name: &str) -> Result<usize> {
        let name = name.to_string();
        self.write_favorites(move |s| s.delete_favorite_by_name(&name))
            .await
    }

    pub async fn clear_favorites(&self) -> Result<()> {
        self.write_favorites(|s| s.clear_favorites()).await
    }

    pub async fn list_favorites(&self) -> Result<Vec<FavoriteCity>> {
        self.with_store(|s| s.list_favorites()).await
    }

    pub async fn is_favorite(&self, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.with_store(move |s| s.is_favorite(&name)).await
    }

    pub fn watch_favorites(&self) -> watch::Receiver<Vec<FavoriteCity>> {
        self.favorites_tx.subscribe()
    }

    // ---- location ----

    /// Atomically replace the single location slot and publish it.
    pub async fn replace_location(&self, reading: LocationReading) -> Result<()> {
        let location_tx = self.location_tx.clone();
        self.with_store(move |s| {
            s.replace_location(&reading)?;
            location_tx.send_replace(Some(reading));
            Ok(())
        })
        .await
    }

    pub async fn location(&self) -> Result<Option<LocationReading>> {
        self.with_store(|s| s.get_location()).await
    }

    pub async fn location_count(&self) -> Result<usize> {
        self.with_store(|s| s.location_count()).await
    }

    pub fn watch_location(&self) -> watch::Receiver<Option<LocationReading>> {
        self.location_tx.subscribe()
    }

    /// Clear every table and publish the empty state.
    pub async fn clear(&self) -> Result<()> {
        let favorites_tx = self.favorites_tx.clone();
        let location_tx = self.location_tx.clone();
        self.with_store(move |s| {
            s.clear()?;
            favorites_tx.send_replace(Vec::new());
            location_tx.send_replace(None);
            Ok(())
        })
        .await
    }
}
