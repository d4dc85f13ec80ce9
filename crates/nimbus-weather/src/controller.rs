//! Request-scoped controllers that turn repository calls into display state.
//!
//! Every controller publishes on `watch` channels; failures become an
//! error message in the published state and are never returned.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::forecast::daily_forecast;
use crate::outcome::Outcome;
use crate::repository::{FavoritesRepository, LocationRepository, WeatherRepository};
use crate::types::{CurrentConditions, FavoriteCity, ForecastEntry, LocationReading};

pub const NO_LOCATION_FIX: &str = "Could not retrieve location";

/// What a screen shows for one piece of data.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState<T> {
    pub loading: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            loading: false,
            data: None,
            error: None,
        }
    }
}

impl<T> ViewState<T> {
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

impl<T> From<Outcome<T>> for ViewState<T> {
    fn from(outcome: Outcome<T>) -> Self {
        match outcome {
            Outcome::Loading => Self::loading(),
            Outcome::Success(data) => Self {
                data: Some(data),
                ..Self::default()
            },
            Outcome::Error(msg) => Self::failed(msg),
        }
    }
}

// ---- search ----

/// City search: current conditions plus a one-per-day forecast.
pub struct SearchController {
    weather: WeatherRepository,
    query: Mutex<String>,
    generation: AtomicU64,
    conditions_tx: watch::Sender<ViewState<CurrentConditions>>,
    forecast_tx: watch::Sender<ViewState<Vec<ForecastEntry>>>,
}

impl SearchController {
    pub fn new(weather: WeatherRepository) -> Self {
        let (conditions_tx, _) = watch::channel(ViewState::default());
        let (forecast_tx, _) = watch::channel(ViewState::default());
        Self {
            weather,
            query: Mutex::new(String::new()),
            generation: AtomicU64::new(0),
            conditions_tx,
            forecast_tx,
        }
    }

    pub fn set_query(&self, query: impl Into<String>) {
        *self.query.lock() = query.into();
    }

    pub fn query(&self) -> String {
        self.query.lock().clone()
    }

    pub fn conditions(&self) -> watch::Receiver<ViewState<CurrentConditions>> {
        self.conditions_tx.subscribe()
    }

    pub fn forecast(&self) -> watch::Receiver<ViewState<Vec<ForecastEntry>>> {
        self.forecast_tx.subscribe()
    }

    fn is_current(&self, token: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == token
    }

    /// Search for the current query.
    ///
    /// A search started later supersedes this one; once superseded, its
    /// results are dropped instead of published.
    pub async fn search(&self) {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let city = self.query();
        tracing::debug!("Search #{} for {:?}", token, city);

        self.conditions_tx.send_replace(ViewState::loading());
        self.forecast_tx.send_replace(ViewState::loading());

        let conditions = match self.weather.current_conditions(&city).await {
            Ok(outcome) => ViewState::from(outcome),
            Err(e) => ViewState::failed(e.user_message()),
        };
        if !self.is_current(token) {
            tracing::debug!("Dropping superseded search #{}", token);
            return;
        }
        self.conditions_tx.send_replace(conditions);

        let forecast = match self.weather.forecast(&city).await {
            Ok(outcome) => ViewState::from(outcome.map(|bundle| daily_forecast(&bundle.entries))),
            Err(e) => ViewState::failed(e.user_message()),
        };
        if !self.is_current(token) {
            tracing::debug!("Dropping superseded search #{}", token);
            return;
        }
        self.forecast_tx.send_replace(forecast);
    }
}

// ---- favorites ----

/// Favorites list with a single-slot undo for the last deletion.
pub struct FavoritesController {
    favorites: FavoritesRepository,
    recently_deleted: Mutex<Option<FavoriteCity>>,
    error_tx: watch::Sender<Option<String>>,
}

impl FavoritesController {
    pub fn new(favorites: FavoritesRepository) -> Self {
        let (error_tx, _) = watch::channel(None);
        Self {
            favorites,
            recently_deleted: Mutex::new(None),
            error_tx,
        }
    }

    pub fn favorites(&self) -> watch::Receiver<Vec<FavoriteCity>> {
        self.favorites.watch()
    }

    /// Last failure message, if any.
    pub fn errors(&self) -> watch::Receiver<Option<String>> {
        self.error_tx.subscribe()
    }

    pub fn last_deleted(&self) -> Option<FavoriteCity> {
        self.recently_deleted.lock().clone()
    }

    pub async fn add(&self, conditions: &CurrentConditions) {
        if let Err(e) = self.favorites.add(conditions).await {
            tracing::warn!("Failed to add favorite {}: {}", conditions.name, e);
            self.error_tx.send_replace(Some(e.user_message().to_string()));
        }
    }

    /// Delete `favorite`, keeping it as the undo candidate.
    pub async fn delete(&self, favorite: &FavoriteCity) {
        *self.recently_deleted.lock() = Some(favorite.clone());
        if let Err(e) = self.favorites.remove(favorite).await {
            tracing::warn!("Failed to delete favorite {}: {}", favorite.name, e);
            self.error_tx.send_replace(Some(e.user_message().to_string()));
        }
    }

    /// Re-add the last deleted favorite. Returns false when there is nothing to restore.
    pub async fn restore_last_deleted(&self) -> bool {
        let Some(favorite) = self.recently_deleted.lock().take() else {
            return false;
        };
        self.add(&favorite.to_conditions()).await;
        true
    }
}

// ---- location ----

/// Weather at the device's position.
pub struct LocationController {
    location: LocationRepository,
    state_tx: watch::Sender<ViewState<LocationReading>>,
}

impl LocationController {
    pub fn new(location: LocationRepository) -> Self {
        let stored = location.watch().borrow().clone();
        let (state_tx, _) = watch::channel(ViewState {
            data: stored,
            ..ViewState::default()
        });
        Self { location, state_tx }
    }

    pub fn state(&self) -> watch::Receiver<ViewState<LocationReading>> {
        self.state_tx.subscribe()
    }

    /// Fetch weather for a device fix. `None` means no fix could be obtained.
    pub async fn fetch(&self, fix: Option<(f64, f64)>) {
        let Some((lat, lon)) = fix else {
            self.state_tx.send_modify(|state| {
                state.loading = false;
                state.error = Some(NO_LOCATION_FIX.to_string());
            });
            return;
        };

        self.state_tx.send_modify(|state| state.loading = true);
        match self.location.refresh(lat, lon).await {
            Ok(reading) => {
                self.state_tx.send_replace(ViewState {
                    data: Some(reading),
                    ..ViewState::default()
                });
            }
            Err(e) => {
                tracing::warn!("Location refresh failed: {}", e);
                let message = e.user_message();
                self.state_tx.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(message);
                });
            }
        }
    }
}
