use std::sync::Arc;

use nimbus_core::DatabaseError;

use crate::client::WeatherSource;
use crate::connectivity::ConnectivityProbe;
use crate::outcome::{safe_call, Outcome};
use crate::store::SharedStore;
use crate::types::{now_millis, CurrentConditions, ForecastBundle};

pub const NO_CACHED_CONDITIONS: &str = "No cached data available and no internet";
pub const NO_CACHED_FORECAST: &str = "No cached forecast data and no internet";

/// Current conditions and forecasts, served from the network when reachable
/// and from the cache otherwise.
///
/// A failed online fetch is reported as an error; it never falls back to a
/// cached row, so a stale value cannot mask a real failure.
#[derive(Clone)]
pub struct WeatherRepository {
    source: Arc<dyn WeatherSource>,
    store: SharedStore,
    probe: Arc<dyn ConnectivityProbe>,
}

impl WeatherRepository {
    pub fn new(
        source: Arc<dyn WeatherSource>,
        store: SharedStore,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        Self {
            source,
            store,
            probe,
        }
    }

    /// Current conditions for `city`.
    ///
    /// The outer `Err` carries cache failures untranslated; remote failures
    /// arrive as `Outcome::Error`.
    pub async fn current_conditions(
        &self,
        city: &str,
    ) -> Result<Outcome<CurrentConditions>, DatabaseError> {
        let cached = self.store.current(city).await?;

        if !self.probe.is_connected().await {
            tracing::info!("Offline, serving cached conditions for {}", city);
            return Ok(match cached {
                Some(row) => Outcome::Success(row),
                None => Outcome::error(NO_CACHED_CONDITIONS),
            });
        }

        let fetched = safe_call(self.source.current_by_city(city)).await;
        match fetched {
            Outcome::Success(response) => {
                let stored = self
                    .store
                    .upsert_current(response.into_conditions(now_millis()))
                    .await?;
                tracing::info!("Cached current conditions for {} (id {})", stored.name, stored.id);
                Ok(Outcome::Success(stored))
            }
            other => Ok(other.map(|r| r.into_conditions(now_millis()))),
        }
    }

    /// Forecast for `city`, replacing the cached bundle on success.
    pub async fn forecast(&self, city: &str) -> Result<Outcome<ForecastBundle>, DatabaseError> {
        let cached = self.store.forecast(city).await?;
        if let Some(bundle) = &cached {
            tracing::debug!(
                "Cached forecast for {} has {} entries",
                bundle.city,
                bundle.entries.len()
            );
        }

        if !self.probe.is_connected().await {
            tracing::info!("Offline, serving cached forecast for {}", city);
            return Ok(match cached {
                Some(bundle) => Outcome::Success(bundle),
                None => Outcome::error(NO_CACHED_FORECAST),
            });
        }

        let fetched = safe_call(self.source.forecast_by_city(city)).await;
        match fetched {
            Outcome::Success(response) => {
                let stored = self
                    .store
                    .upsert_forecast(response.into_bundle(now_millis()))
                    .await?;
                tracing::info!(
                    "Cached forecast for {} ({} entries)",
                    stored.city,
                    stored.entries.len()
                );
                Ok(Outcome::Success(stored))
            }
            other => Ok(other.map(|r| r.into_bundle(now_millis()))),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::client::OpenWeatherClient;
    use crate::connectivity::ManualProbe;
    use crate::types::fixtures;
    use nimbus_core::Units;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo(uri: &str, store: SharedStore, online: bool) -> WeatherRepository {
        let client =
            OpenWeatherClient::new(uri, "key", Units::Metric, Duration::from_secs(2)).unwrap();
        WeatherRepository::new(Arc::new(client), store, Arc::new(ManualProbe::new(online)))
    }

    #[tokio::test]
    async fn test_offline_serves_cached_row_unchanged() {
        let store = SharedStore::in_memory().unwrap();
        let cached = store
            .upsert_current(fixtures::conditions(1, "Madrid", 27.0))
            .await
            .unwrap();

        // Any request reaching this address would fail
        let repo = repo("http://127.0.0.1:9", store, false);
        let outcome = repo.current_conditions("madrid").await.unwrap();

        assert_eq!(outcome, Outcome::Success(cached));
    }

    #[tokio::test]
    async fn test_offline_without_cache_is_error() {
        let repo = repo("http://127.0.0.1:9", SharedStore::in_memory().unwrap(), false);

        let outcome = repo.current_conditions("Madrid").await.unwrap();
        assert_eq!(outcome.error_message(), Some(NO_CACHED_CONDITIONS));

        let outcome = repo.forecast("Madrid").await.unwrap();
        assert_eq!(outcome.error_message(), Some(NO_CACHED_FORECAST));
    }

    #[tokio::test]
    async fn test_failed_fetch_does_not_fall_back_to_cache() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&mock_server)
            .await;

        let store = SharedStore::in_memory().unwrap();
        let cached = store
            .upsert_current(fixtures::conditions(1, "Madrid", 27.0))
            .await
            .unwrap();

        let repo = repo(&mock_server.uri(), store.clone(), true);
        let outcome = repo.current_conditions("Madrid").await.unwrap();

        assert_eq!(outcome.error_message(), Some("Something went wrong: 500"));
        assert_eq!(store.current("Madrid").await.unwrap(), Some(cached));
    }

    #[tokio::test]
    async fn test_failed_forecast_fetch_keeps_cached_bundle() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = SharedStore::in_memory().unwrap();
        let cached = store
            .upsert_forecast(ForecastBundle {
                city: "Lima".into(),
                entries: vec![fixtures::entry("2024-05-01 12:00:00", 19.0)],
                last_updated: 0,
            })
            .await
            .unwrap();

        let repo = repo(&format!("http://{}", addr), store.clone(), true);
        let outcome = repo.forecast("Lima").await.unwrap();

        assert_eq!(
            outcome.error_message(),
            Some("Couldn't reach server. Check your connection.")
        );
        assert_eq!(store.forecast("Lima").await.unwrap(), Some(cached));
    }

    #[tokio::test]
    async fn test_forecast_server_error_is_not_masked_by_cache() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&mock_server)
            .await;

        let store = SharedStore::in_memory().unwrap();
        let cached = store
            .upsert_forecast(ForecastBundle {
                city: "Lima".into(),
                entries: vec![fixtures::entry("2024-05-01 12:00:00", 19.0)],
                last_updated: 0,
            })
            .await
            .unwrap();

        let repo = repo(&mock_server.uri(), store.clone(), true);
        let outcome = repo.forecast("Lima").await.unwrap();

        assert_eq!(outcome.error_message(), Some("Something went wrong: 503"));
        assert_eq!(store.forecast("Lima").await.unwrap(), Some(cached));
    }

    #[tokio::test]
    async fn test_online_forecast_replaces_cache() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("q", "Oslo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "city": {"id": 3143244, "name": "Oslo"},
                "list": [{
                    "dt": 1, "dt_txt": "2024-05-01 12:00:00",
                    "main": {"temp": 8.0, "feels_like": 6.0, "temp_min": 7.0, "temp_max": 9.0, "pressure": 1002, "humidity": 80},
                    "weather": [{"id": 600, "main": "Snow", "description": "light snow", "icon": "13d"}]
                }]
            })))
            .mount(&mock_server)
            .await;

        let store = SharedStore::in_memory().unwrap();
        store
            .upsert_forecast(ForecastBundle {
                city: "Oslo".into(),
                entries: vec![
                    fixtures::entry("2024-04-01 09:00:00", 1.0),
                    fixtures::entry("2024-04-01 12:00:00", 2.0),
                ],
                last_updated: 0,
            })
            .await
            .unwrap();

        let repo = repo(&mock_server.uri(), store.clone(), true);
        let bundle = repo.forecast("Oslo").await.unwrap().into_data().unwrap();

        assert_eq!(bundle.entries.len(), 1);
        assert_eq!(store.forecast("oslo").await.unwrap(), Some(bundle));
    }
}
