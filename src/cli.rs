//! Command-line interface for Nimbus.

use clap::{Parser, Subcommand};

/// Nimbus - offline-first weather from the terminal
#[derive(Parser)]
#[command(name = "nimbus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Answer `current` and `forecast` from the cache only; `locate` is refused
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show current conditions for a city
    #[command(alias = "c")]
    Current {
        #[arg(required = true)]
        city: Vec<String>,
    },

    /// Show the daily forecast for a city
    #[command(alias = "f")]
    Forecast {
        #[arg(required = true)]
        city: Vec<String>,
    },

    /// Show conditions at a coordinate pair
    #[command(allow_negative_numbers = true)]
    Locate { lat: f64, lon: f64 },

    /// Manage favorite cities
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommands,
    },
}

impl Cli {
    /// Reason this invocation cannot run, if it needs the network while `--offline` is set.
    pub fn offline_conflict(&self) -> Option<&'static str> {
        match self.command {
            Commands::Locate { .. } if self.offline => {
                Some("Location lookup needs the network; run it without --offline")
            }
            _ => None,
        }
    }
}

#[derive(Subcommand)]
pub enum FavoritesCommands {
    /// List favorites, most recent first
    #[command(alias = "ls")]
    List,

    /// Look up a city and save a snapshot of it
    Add {
        #[arg(required = true)]
        city: Vec<String>,
    },

    /// Remove a city from the favorites
    #[command(alias = "rm")]
    Remove {
        #[arg(required = true)]
        city: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_multi_word_city() {
        let cli = Cli::try_parse_from(["nimbus", "current", "Sao", "Paulo"]).unwrap();
        match cli.command {
            Commands::Current { city } => assert_eq!(city.join(" "), "Sao Paulo"),
            _ => panic!("expected current"),
        }
        assert!(!cli.offline);
    }

    #[test]
    fn test_negative_longitude() {
        let cli = Cli::try_parse_from(["nimbus", "--offline", "locate", "51.5", "-0.12"]).unwrap();
        assert!(cli.offline);
        match cli.command {
            Commands::Locate { lat, lon } => {
                assert_eq!(lat, 51.5);
                assert_eq!(lon, -0.12);
            }
            _ => panic!("expected locate"),
        }
    }

    #[test]
    fn test_offline_refuses_locate_only() {
        let cli = Cli::try_parse_from(["nimbus", "--offline", "locate", "1", "2"]).unwrap();
        assert!(cli.offline_conflict().is_some());

        let cli = Cli::try_parse_from(["nimbus", "locate", "1", "2"]).unwrap();
        assert!(cli.offline_conflict().is_none());

        let cli = Cli::try_parse_from(["nimbus", "--offline", "forecast", "Oslo"]).unwrap();
        assert!(cli.offline_conflict().is_none());
    }

    #[test]
    fn test_favorites_remove_alias() {
        let cli = Cli::try_parse_from(["nimbus", "favorites", "rm", "Oslo"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Favorites {
                command: FavoritesCommands::Remove { .. }
            }
        ));
    }
}
