//! Offline-first repositories over the remote source and the local cache.

mod favorites;
mod location;
mod weather;

pub use favorites::{FavoriteMembership, FavoritesRepository};
pub use location::LocationRepository;
pub use weather::{WeatherRepository, NO_CACHED_CONDITIONS, NO_CACHED_FORECAST};
