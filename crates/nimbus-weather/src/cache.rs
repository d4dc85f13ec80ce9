//! SQLite-based row store for weather data.
//!
//! Holds the latest current conditions per city, the latest forecast per
//! city, the favorites list and the single-slot location reading. Rows are
//! never expired.

use nimbus_core::DatabaseError;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::codec;
use crate::types::{now_millis, CurrentConditions, FavoriteCity, ForecastBundle, LocationReading};

/// Version of the table layout and the composite column encoding.
pub const SCHEMA_VERSION: i32 = 1;

type Result<T> = std::result::Result<T, DatabaseError>;

const CURRENT_COLUMNS: &str = "id, name, main_json, wind_json, weather_json, last_updated";
const FAVORITE_COLUMNS: &str = "id, name, main_json, wind_json, weather_json, last_updated";
const LOCATION_COLUMNS: &str =
    "id, name, coord_json, main_json, wind_json, weather_json, last_updated";

/// SQLite cache for weather data.
pub struct WeatherStore {
    conn: Connection,
}

impl WeatherStore {
    /// Open (or create) a cache at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::ConnectionFailed(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory cache (tests, throwaway sessions).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    ///
    /// A database written with any other schema version is rebuilt from
    /// scratch: every table holds either a cache or a snapshot that the
    /// user can recreate.
    fn init_schema(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        let tables = self.user_tables()?;

        if !tables.is_empty() && version != SCHEMA_VERSION {
            tracing::warn!(
                "Cache schema version {} does not match {}, rebuilding",
                version,
                SCHEMA_VERSION
            );
            for table in &tables {
                self.conn
                    .execute_batch(&format!("DROP TABLE IF EXISTS \"{}\";", table))
                    .map_err(|e| {
                        DatabaseError::MigrationFailed(format!("drop {}: {}", table, e))
                    })?;
            }
        }

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS current_weather (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                main_json TEXT NOT NULL,
                wind_json TEXT NOT NULL,
                weather_json TEXT NOT NULL,
                last_updated INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS forecast (
                city TEXT PRIMARY KEY COLLATE NOCASE,
                entries_json TEXT NOT NULL,
                last_updated INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS favorite (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                main_json TEXT NOT NULL,
                wind_json TEXT NOT NULL,
                weather_json TEXT NOT NULL,
                last_updated INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS location (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                coord_json TEXT NOT NULL,
                main_json TEXT NOT NULL,
                wind_json TEXT NOT NULL,
                weather_json TEXT NOT NULL,
                last_updated INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_current_weather_name ON current_weather(name COLLATE NOCASE);
            CREATE INDEX IF NOT EXISTS idx_favorite_name ON favorite(name COLLATE NOCASE);
            "#,
        )?;

        self.conn
            .pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    fn user_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Schema version recorded in the database file.
    pub fn schema_version(&self) -> Result<i32> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    // ---- current conditions ----

    /// Latest current conditions whose name matches `city`, ignoring case.
    pub fn get_current(&self, city: &str) -> Result<Option<CurrentConditions>> {
        let sql = format!(
            "SELECT {} FROM current_weather WHERE name = ?1 COLLATE NOCASE ORDER BY last_updated DESC LIMIT 1",
            CURRENT_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![city], Self::row_to_current)
            .optional()?)
    }

    /// Insert or replace the row for `conditions.id`, stamping the write time.
    pub fn upsert_current(&self, conditions: &CurrentConditions) -> Result<CurrentConditions> {
        let stored = CurrentConditions {
            last_updated: now_millis().max(conditions.last_updated),
            ..conditions.clone()
        };

        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO current_weather
            (id, name, main_json, wind_json, weather_json, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                stored.id,
                stored.name,
                codec::encode_main(&stored.main)?,
                codec::encode_wind(&stored.wind)?,
                codec::encode_conditions(&stored.weather)?,
                stored.last_updated,
            ],
        )?;
        Ok(stored)
    }

    fn row_to_current(row: &rusqlite::Row) -> rusqlite::Result<CurrentConditions> {
        let main_json: String = row.get(2)?;
        let wind_json: String = row.get(3)?;
        let weather_json: String = row.get(4)?;

        Ok(CurrentConditions {
            id: row.get(0)?,
            name: row.get(1)?,
            main: codec::decode_main(2, &main_json)?,
            wind: codec::decode_wind(3, &wind_json)?,
            weather: codec::decode_conditions(4, &weather_json)?,
            last_updated: row.get(5)?,
        })
    }

    // ---- forecast ----

    pub fn get_forecast(&self, city: &str) -> Result<Option<ForecastBundle>> {
        Ok(self
            .conn
            .query_row(
                "SELECT city, entries_json, last_updated FROM forecast WHERE city = ?1 COLLATE NOCASE",
                params![city],
                Self::row_to_forecast,
            )
            .optional()?)
    }

    /// Replace the whole forecast for `bundle.city`, stamping the write time.
    pub fn upsert_forecast(&self, bundle: &ForecastBundle) -> Result<ForecastBundle> {
        let stored = ForecastBundle {
            last_updated: now_millis().max(bundle.last_updated),
            ..bundle.clone()
        };

        self.conn.execute(
            "INSERT OR REPLACE INTO forecast (city, entries_json, last_updated) VALUES (?1, ?2, ?3)",
            params![
                stored.city,
                codec::encode_entries(&stored.entries)?,
                stored.last_updated,
            ],
        )?;
        Ok(stored)
    }

    pub fn list_forecasts(&self) -> Result<Vec<ForecastBundle>> {
        let mut stmt = self
            .conn
            .prepare("SELECT city, entries_json, last_updated FROM forecast ORDER BY city")?;
        let rows = stmt.query_map([], Self::row_to_forecast)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn clear_forecasts(&self) -> Result<()> {
        self.conn.execute("DELETE FROM forecast", [])?;
        Ok(())
    }

    fn row_to_forecast(row: &rusqlite::Row) -> rusqlite::Result<ForecastBundle> {
        let entries_json: String = row.get(1)?;
        Ok(ForecastBundle {
            city: row.get(0)?,
            entries: codec::decode_entries(1, &entries_json)?,
            last_updated: row.get(2)?,
        })
    }

    // ---- favorites ----

    /// Insert or replace the favorite keyed by its id.
    pub fn upsert_favorite(&self, favorite: &FavoriteCity) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO favorite
            (id, name, main_json, wind_json, weather_json, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                favorite.id,
                favorite.name,
                codec::encode_main(&favorite.main)?,
                codec::encode_wind(&favorite.wind)?,
                codec::encode_conditions(&favorite.weather)?,
                favorite.last_updated,
            ],
        )?;
        Ok(())
    }

    /// Delete a favorite by id. Returns whether a row was removed.
    pub fn delete_favorite(&self, id: i64) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM favorite WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    /// Delete every favorite whose name matches, ignoring case.
    pub fn delete_favorite_by_name(&self, name: &str) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM favorite WHERE name = ?1 COLLATE NOCASE",
            params![name],
        )?)
    }

    pub fn get_favorite(&self, id: i64) -> Result<Option<FavoriteCity>> {
        let sql = format!("SELECT {} FROM favorite WHERE id = ?1", FAVORITE_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::row_to_favorite)
            .optional()?)
    }

    /// All favorites, most recently added first.
    pub fn list_favorites(&self) -> Result<Vec<FavoriteCity>> {
        let sql = format!(
            "SELECT {} FROM favorite ORDER BY last_updated DESC, id ASC",
            FAVORITE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_favorite)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn is_favorite(&self, name: &str) -> Result<bool> {
        let exists: i32 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM favorite WHERE name = ?1 COLLATE NOCASE)",
            params![name],
            |row| row.get(0),
        )?;
        Ok(exists != 0)
    }

    pub fn clear_favorites(&self) -> Result<()> {
        self.conn.execute("DELETE FROM favorite", [])?;
        Ok(())
    }

    fn row_to_favorite(row: &rusqlite::Row) -> rusqlite::Result<FavoriteCity> {
        let main_json: String = row.get(2)?;
        let wind_json: String = row.get(3)?;
        let weather_json: String = row.get(4)?;

        Ok(FavoriteCity {
            id: row.get(0)?,
            name: row.get(1)?,
            main: codec::decode_main(2, &main_json)?,
            wind: codec::decode_wind(3, &wind_json)?,
            weather: codec::decode_conditions(4, &weather_json)?,
            last_updated: row.get(5)?,
        })
    }

    // ---- location (single slot) ----

    pub fn get_location(&self) -> Result<Option<LocationReading>> {
        let sql = format!(
            "SELECT {} FROM location ORDER BY last_updated DESC LIMIT 1",
            LOCATION_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, [], Self::row_to_location)
            .optional()?)
    }

    /// Clear the slot and insert `reading` in one transaction.
    pub fn replace_location(&mut self, reading: &LocationReading) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM location", [])?;
        tx.execute(
            r#"
            INSERT INTO location
            (id, name, coord_json, main_json, wind_json, weather_json, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                reading.id,
                reading.name,
                codec::encode_coord(&reading.coord)?,
                codec::encode_main(&reading.main)?,
                codec::encode_wind(&reading.wind)?,
                codec::encode_conditions(&reading.weather)?,
                reading.last_updated,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn location_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM location", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn row_to_location(row: &rusqlite::Row) -> rusqlite::Result<LocationReading> {
        let coord_json: String = row.get(2)?;
        let main_json: String = row.get(3)?;
        let wind_json: String = row.get(4)?;
        let weather_json: String = row.get(5)?;

        Ok(LocationReading {
            id: row.get(0)?,
            name: row.get(1)?,
            coord: codec::decode_coord(2, &coord_json)?,
            main: codec::decode_main(3, &main_json)?,
            wind: codec::decode_wind(4, &wind_json)?,
            weather: codec::decode_conditions(5, &weather_json)?,
            last_updated: row.get(6)?,
        })
    }

    /// Clear all cached data.
    pub fn clear(&self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM current_weather; DELETE FROM forecast; DELETE FROM favorite; DELETE FROM location;",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::fixtures::{conditions, entry};
    use crate::types::Coord;

    fn reading(id: i64, name: &str, lat: f64, lon: f64) -> LocationReading {
        let c = conditions(id, name, 11.0);
        LocationReading {
            id,
            name: name.to_string(),
            coord: Coord { lat, lon },
            main: c.main,
            wind: c.wind,
            weather: c.weather,
            last_updated: now_millis(),
        }
    }

    #[test]
    fn test_current_round_trip_case_insensitive() {
        let store = WeatherStore::in_memory().unwrap();
        let value = conditions(2988507, "Paris", 18.0);

        let before = now_millis();
        store.upsert_current(&value).unwrap();
        let loaded = store.get_current("pArIs").unwrap().unwrap();

        assert_eq!(loaded.id, value.id);
        assert_eq!(loaded.name, value.name);
        assert_eq!(loaded.main, value.main);
        assert_eq!(loaded.wind, value.wind);
        assert_eq!(loaded.weather, value.weather);
        assert!(loaded.last_updated >= before);
    }

    #[test]
    fn test_current_upsert_overwrites_by_id() {
        let store = WeatherStore::in_memory().unwrap();
        store.upsert_current(&conditions(1, "Lima", 20.0)).unwrap();
        store.upsert_current(&conditions(1, "Lima", 25.0)).unwrap();

        let count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM current_weather", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.get_current("lima").unwrap().unwrap().main.temp, 25.0);
    }

    #[test]
    fn test_current_missing_city() {
        let store = WeatherStore::in_memory().unwrap();
        assert!(store.get_current("Nowhere").unwrap().is_none());
    }

    #[test]
    fn test_forecast_replaced_wholesale() {
        let store = WeatherStore::in_memory().unwrap();
        let first = ForecastBundle {
            city: "Nairobi".into(),
            entries: vec![
                entry("2024-05-01 09:00:00", 1.0),
                entry("2024-05-01 12:00:00", 2.0),
            ],
            last_updated: 0,
        };
        store.upsert_forecast(&first).unwrap();

        let second = ForecastBundle {
            city: "nairobi".into(),
            entries: vec![entry("2024-05-02 12:00:00", 3.0)],
            last_updated: 0,
        };
        store.upsert_forecast(&second).unwrap();

        let all = store.list_forecasts().unwrap();
        assert_eq!(all.len(), 1);
        let loaded = store.get_forecast("NAIROBI").unwrap().unwrap();
        assert_eq!(loaded.entries, second.entries);

        store.clear_forecasts().unwrap();
        assert!(store.get_forecast("Nairobi").unwrap().is_none());
    }

    #[test]
    fn test_favorites_upsert_and_membership() {
        let store = WeatherStore::in_memory().unwrap();
        let fav = FavoriteCity::snapshot(&conditions(5, "Berlin", 9.0), 100);
        store.upsert_favorite(&fav).unwrap();
        store.upsert_favorite(&fav).unwrap();

        assert_eq!(store.list_favorites().unwrap().len(), 1);
        assert!(store.is_favorite("BERLIN").unwrap());
        assert!(!store.is_favorite("Bern").unwrap());
        assert_eq!(store.get_favorite(5).unwrap(), Some(fav));
    }

    #[test]
    fn test_favorites_ordered_newest_first() {
        let store = WeatherStore::in_memory().unwrap();
        store
            .upsert_favorite(&FavoriteCity::snapshot(&conditions(1, "Old", 1.0), 10))
            .unwrap();
        store
            .upsert_favorite(&FavoriteCity::snapshot(&conditions(2, "New", 1.0), 20))
            .unwrap();

        let names: Vec<String> = store
            .list_favorites()
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["New", "Old"]);
    }

    #[test]
    fn test_delete_missing_favorite_is_noop() {
        let store = WeatherStore::in_memory().unwrap();
        assert!(!store.delete_favorite(404).unwrap());
        assert_eq!(store.delete_favorite_by_name("ghost").unwrap(), 0);
        assert!(store.list_favorites().unwrap().is_empty());
    }

    #[test]
    fn test_location_single_slot() {
        let mut store = WeatherStore::in_memory().unwrap();
        store.replace_location(&reading(1, "Paris", 48.85, 2.35)).unwrap();
        store.replace_location(&reading(2, "London", 51.5, -0.12)).unwrap();

        assert_eq!(store.location_count().unwrap(), 1);
        let slot = store.get_location().unwrap().unwrap();
        assert_eq!(slot.name, "London");
        assert_eq!(slot.coord, Coord { lat: 51.5, lon: -0.12 });
    }

    #[test]
    fn test_clear() {
        let mut store = WeatherStore::in_memory().unwrap();
        store.upsert_current(&conditions(1, "Rome", 22.0)).unwrap();
        store.replace_location(&reading(1, "Rome", 41.9, 12.5)).unwrap();
        store.clear().unwrap();

        assert!(store.get_current("Rome").unwrap().is_none());
        assert!(store.get_location().unwrap().is_none());
    }

    #[test]
    fn test_legacy_schema_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                r#"
                CREATE TABLE weather (id INTEGER PRIMARY KEY, name TEXT, main TEXT);
                CREATE TABLE favorite_cities (name TEXT PRIMARY KEY);
                INSERT INTO favorite_cities (name) VALUES ('Paris');
                PRAGMA user_version = 7;
                "#,
            )
            .unwrap();
        }

        let store = WeatherStore::new(&path).unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);

        let tables = store.user_tables().unwrap();
        assert!(!tables.iter().any(|t| t == "favorite_cities"));
        assert!(!tables.iter().any(|t| t == "weather"));
        assert!(tables.iter().any(|t| t == "favorite"));
        assert!(store.list_favorites().unwrap().is_empty());
    }

    #[test]
    fn test_current_schema_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather.db");
        {
            let store = WeatherStore::new(&path).unwrap();
            store
                .upsert_favorite(&FavoriteCity::snapshot(&conditions(3, "Quito", 15.0), 1))
                .unwrap();
        }

        let store = WeatherStore::new(&path).unwrap();
        assert!(store.is_favorite("quito").unwrap());
    }
}
