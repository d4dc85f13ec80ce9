//! Remote weather source and its HTTP implementation.

use async_trait::async_trait;
use nimbus_core::{Units, WeatherConfig};
use reqwest::Client;
use std::time::Duration;
use tracing::instrument;

use crate::dto::{ForecastResponse, WeatherResponse};
use crate::error::WeatherError;

/// Read-only operations the repositories need from a weather API.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Current conditions by city name.
    async fn current_by_city(&self, city: &str) -> Result<WeatherResponse, WeatherError>;

    /// 5-day / 3-hour forecast by city name.
    async fn forecast_by_city(&self, city: &str) -> Result<ForecastResponse, WeatherError>;

    /// Current conditions at a coordinate pair.
    async fn current_by_coords(&self, lat: f64, lon: f64)
        -> Result<WeatherResponse, WeatherError>;
}

/// Client for OpenWeatherMap-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    units: Units,
}

impl OpenWeatherClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        units: Units,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            units,
        })
    }

    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        Self::new(
            &config.base_url,
            &config.api_key,
            config.units,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn units(&self) -> Units {
        self.units
    }

    fn url(&self, endpoint: &str, query: &str) -> String {
        format!(
            "{}/{}?{}&appid={}&units={}",
            self.base_url,
            endpoint,
            query,
            urlencoding::encode(&self.api_key),
            self.units.as_query(),
        )
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, WeatherError> {
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    /// Decode a success body, or capture status and body of a failure.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, WeatherError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| WeatherError::Unexpected(format!("JSON parse error: {}", e)))
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Weather API returned {}: {}", status, body);
            Err(WeatherError::Server {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    #[instrument(skip(self), level = "info")]
    async fn current_by_city(&self, city: &str) -> Result<WeatherResponse, WeatherError> {
        let url = self.url("weather", &format!("q={}", urlencoding::encode(city)));
        self.get(&url).await
    }

    #[instrument(skip(self), level = "info")]
    async fn forecast_by_city(&self, city: &str) -> Result<ForecastResponse, WeatherError> {
        let url = self.url("forecast", &format!("q={}", urlencoding::encode(city)));
        self.get(&url).await
    }

    #[instrument(skip(self), level = "info")]
    async fn current_by_coords(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<WeatherResponse, WeatherError> {
        let url = self.url("weather", &format!("lat={}&lon={}", lat, lon));
        self.get(&url).await
    }
}
