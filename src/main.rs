mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use nimbus_core::{AppError, Config, Units};
use nimbus_weather::{
    daily_forecast, format_date, format_hour_period, format_timestamp, ConnectivityProbe,
    CurrentConditions, FavoritesController, FavoritesRepository, LocationController,
    LocationRepository, ManualProbe, OpenWeatherClient, Outcome, SharedStore, TcpProbe,
    WeatherRepository,
};

use cli::{Cli, Commands, FavoritesCommands};

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Everything a command needs, wired from the loaded config.
struct Services {
    units: Units,
    weather: WeatherRepository,
    favorites: FavoritesRepository,
    location: LocationRepository,
}

impl Services {
    fn build(config: &Config, offline: bool) -> Result<Self> {
        let store = SharedStore::open(config.cache_path()).map_err(AppError::from)?;
        let client =
            Arc::new(OpenWeatherClient::from_config(&config.weather).map_err(AppError::from)?);

        let probe: Arc<dyn ConnectivityProbe> = if offline {
            Arc::new(ManualProbe::new(false))
        } else {
            match TcpProbe::for_base_url(&config.weather.base_url, PROBE_TIMEOUT) {
                Some(probe) => Arc::new(probe),
                None => {
                    tracing::warn!("Cannot probe {}, assuming online", config.weather.base_url);
                    Arc::new(ManualProbe::new(true))
                }
            }
        };

        Ok(Self {
            units: config.weather.units,
            weather: WeatherRepository::new(client.clone(), store.clone(), probe),
            favorites: FavoritesRepository::new(store.clone()),
            location: LocationRepository::new(client, store),
        })
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        let message = match e.downcast_ref::<AppError>() {
            Some(app) => app.user_message(),
            None => e.to_string(),
        };
        tracing::error!("{:#}", e);
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    nimbus_core::init()?;

    if let Some(reason) = cli.offline_conflict() {
        anyhow::bail!(AppError::Weather(reason.to_string()));
    }

    let (config, _) = Config::load_validated()?;
    if !config.weather.has_api_key() && !cli.offline {
        tracing::warn!("No API key configured; set NIMBUS_API_KEY or weather.api_key");
    }

    let services = Services::build(&config, cli.offline)?;

    match cli.command {
        Commands::Current { city } => cmd_current(&services, &city.join(" ")).await,
        Commands::Forecast { city } => cmd_forecast(&services, &city.join(" ")).await,
        Commands::Locate { lat, lon } => cmd_locate(&services, lat, lon).await,
        Commands::Favorites { command } => match command {
            FavoritesCommands::List => cmd_favorites_list(&services).await,
            FavoritesCommands::Add { city } => cmd_favorites_add(&services, &city.join(" ")).await,
            FavoritesCommands::Remove { city } => {
                cmd_favorites_remove(&services, &city.join(" ")).await
            }
        },
    }
}

/// Unwrap a finished lookup, turning its error message into an `AppError`.
fn into_data<T>(outcome: Outcome<T>, city: &str) -> Result<T> {
    match outcome {
        Outcome::Success(data) => Ok(data),
        Outcome::Error(error) => Err(AppError::Weather(error).into()),
        Outcome::Loading => anyhow::bail!("Lookup for {} did not finish", city),
    }
}

fn print_conditions(c: &CurrentConditions, units: Units) {
    let suffix = units.temperature_suffix();
    println!("{} (id {})", c.name, c.id);
    if let Some(cond) = c.primary_condition() {
        println!("  {} - {}", cond.main, cond.description);
    }
    println!(
        "  {:.1}{} (feels like {:.1}{}), low {:.1}{} / high {:.1}{}",
        c.main.temp,
        suffix,
        c.main.feels_like,
        suffix,
        c.main.temp_min,
        suffix,
        c.main.temp_max,
        suffix
    );
    println!(
        "  Humidity {}%, pressure {} hPa, wind {:.1} @ {:.0}°",
        c.main.humidity, c.main.pressure, c.wind.speed, c.wind.deg
    );
    println!("  Updated {} UTC", format_timestamp(c.last_updated));
}

async fn cmd_current(services: &Services, city: &str) -> Result<()> {
    let outcome = services
        .weather
        .current_conditions(city)
        .await
        .map_err(AppError::from)?;
    let conditions = into_data(outcome, city)?;
    print_conditions(&conditions, services.units);
    Ok(())
}

async fn cmd_forecast(services: &Services, city: &str) -> Result<()> {
    let outcome = services
        .weather
        .forecast(city)
        .await
        .map_err(AppError::from)?;
    let days = daily_forecast(&into_data(outcome, city)?.entries);

    let suffix = services.units.temperature_suffix();
    println!("Forecast for {}", city);
    for day in days {
        let description = day
            .weather
            .first()
            .map(|c| c.description.as_str())
            .unwrap_or("");
        println!(
            "  {:<12} {:>5}  {:>6.1}{}  {}",
            format_date(&day.dt_txt),
            format_hour_period(&day.dt_txt),
            day.main.temp,
            suffix,
            description
        );
    }
    Ok(())
}

async fn cmd_locate(services: &Services, lat: f64, lon: f64) -> Result<()> {
    let controller = LocationController::new(services.location.clone());
    controller.fetch(Some((lat, lon))).await;

    let state = controller.state().borrow().clone();
    if let Some(error) = state.error {
        anyhow::bail!(AppError::Weather(error));
    }
    match state.data {
        Some(reading) => {
            println!(
                "{} ({:.2}, {:.2})",
                reading.name, reading.coord.lat, reading.coord.lon
            );
            if let Some(cond) = reading.weather.first() {
                println!("  {} - {}", cond.main, cond.description);
            }
            println!(
                "  {:.1}{}, humidity {}%",
                reading.main.temp,
                services.units.temperature_suffix(),
                reading.main.humidity
            );
        }
        None => println!("No location reading"),
    }
    Ok(())
}

async fn cmd_favorites_list(services: &Services) -> Result<()> {
    let favorites = services.favorites.list().await.map_err(AppError::from)?;
    if favorites.is_empty() {
        println!("No favorites yet");
        return Ok(());
    }

    let suffix = services.units.temperature_suffix();
    for fav in favorites {
        let description = fav
            .weather
            .first()
            .map(|c| c.description.as_str())
            .unwrap_or("");
        println!(
            "  {:<20} {:>6.1}{}  {:<20} saved {}",
            fav.name,
            fav.main.temp,
            suffix,
            description,
            format_timestamp(fav.last_updated)
        );
    }
    Ok(())
}

async fn cmd_favorites_add(services: &Services, city: &str) -> Result<()> {
    let outcome = services
        .weather
        .current_conditions(city)
        .await
        .map_err(AppError::from)?;
    let conditions = into_data(outcome, city)?;

    let controller = FavoritesController::new(services.favorites.clone());
    controller.add(&conditions).await;
    if let Some(error) = controller.errors().borrow().clone() {
        anyhow::bail!(AppError::Weather(error));
    }
    println!("Added {} to favorites", conditions.name);
    Ok(())
}

async fn cmd_favorites_remove(services: &Services, city: &str) -> Result<()> {
    let removed = services
        .favorites
        .remove_by_name(city)
        .await
        .map_err(AppError::from)?;
    if removed == 0 {
        println!("{} is not a favorite", city);
    } else {
        println!("Removed {} from favorites", city);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn services(uri: &str) -> Services {
        let store = SharedStore::in_memory().unwrap();
        let client = Arc::new(
            OpenWeatherClient::new(uri, "key", Units::Metric, Duration::from_secs(2)).unwrap(),
        );
        Services {
            units: Units::Metric,
            weather: WeatherRepository::new(
                client.clone(),
                store.clone(),
                Arc::new(ManualProbe::new(true)),
            ),
            favorites: FavoritesRepository::new(store.clone()),
            location: LocationRepository::new(client, store),
        }
    }

    #[tokio::test]
    async fn test_current_fetches_only_conditions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 1,
                "name": "Oslo",
                "main": {"temp": 4.0, "feels_like": 1.0, "temp_min": 3.0, "temp_max": 5.0, "pressure": 1000, "humidity": 90}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        cmd_current(&services(&server.uri()), "Oslo").await.unwrap();
    }

    #[tokio::test]
    async fn test_forecast_fetches_only_forecast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "city": {"id": 1, "name": "Oslo"},
                "list": []
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        cmd_forecast(&services(&server.uri()), "Oslo").await.unwrap();
    }
}
