use nimbus_core::DatabaseError;
use tokio::sync::watch;

use crate::store::SharedStore;
use crate::types::{now_millis, CurrentConditions, FavoriteCity};

/// User-curated list of frozen city snapshots.
#[derive(Clone)]
pub struct FavoritesRepository {
    store: SharedStore,
}

impl FavoritesRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Snapshot `conditions` into the favorites, replacing any earlier
    /// snapshot with the same id. Returns what was stored.
    pub async fn add(&self, conditions: &CurrentConditions) -> Result<FavoriteCity, DatabaseError> {
        let favorite = FavoriteCity::snapshot(conditions, now_millis());
        self.store.upsert_favorite(favorite.clone()).await?;
        tracing::info!("Added favorite {} (id {})", favorite.name, favorite.id);
        Ok(favorite)
    }

    /// Remove `favorite` by id. Returns whether a row was deleted.
    pub async fn remove(&self, favorite: &FavoriteCity) -> Result<bool, DatabaseError> {
        let removed = self.store.delete_favorite(favorite.id).await?;
        if removed {
            tracing::info!("Removed favorite {} (id {})", favorite.name, favorite.id);
        } else {
            tracing::debug!("Favorite {} was not stored", favorite.name);
        }
        Ok(removed)
    }

    /// Remove every favorite whose name matches `name` case-insensitively.
    pub async fn remove_by_name(&self, name: &str) -> Result<usize, DatabaseError> {
        self.store.delete_favorite_by_name(name).await
    }

    /// All favorites, most recently added first.
    pub async fn list(&self) -> Result<Vec<FavoriteCity>, DatabaseError> {
        self.store.list_favorites().await
    }

    pub fn watch(&self) -> watch::Receiver<Vec<FavoriteCity>> {
        self.store.watch_favorites()
    }

    pub async fn is_favorite(&self, name: &str) -> Result<bool, DatabaseError> {
        self.store.is_favorite(name).await
    }

    /// Live membership flag for `name`.
    pub fn membership(&self, name: &str) -> FavoriteMembership {
        FavoriteMembership {
            name: name.to_string(),
            rx: self.store.watch_favorites(),
        }
    }

    pub async fn clear(&self) -> Result<(), DatabaseError> {
        self.store.clear_favorites().await
    }
}

/// Whether one city is currently a favorite, updated on every favorites write.
pub struct FavoriteMembership {
    name: String,
    rx: watch::Receiver<Vec<FavoriteCity>>,
}

impl FavoriteMembership {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current(&self) -> bool {
        contains(&self.rx.borrow(), &self.name)
    }

    /// Wait for the next favorites write and return the new flag.
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(contains(&self.rx.borrow_and_update(), &self.name))
    }
}

// Same folding as SQLite's NOCASE collation
fn contains(favorites: &[FavoriteCity], name: &str) -> bool {
    favorites.iter().any(|f| f.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::fixtures::conditions;

    fn repo() -> FavoritesRepository {
        FavoritesRepository::new(SharedStore::in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_add_twice_keeps_one_row() {
        let repo = repo();
        repo.add(&conditions(5, "Lima", 18.0)).await.unwrap();
        let second = repo.add(&conditions(5, "Lima", 21.0)).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all, vec![second]);
        assert_eq!(all[0].main.temp, 21.0);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let repo = repo();
        let kept = repo.add(&conditions(1, "Rome", 24.0)).await.unwrap();
        let never_added = FavoriteCity::snapshot(&conditions(2, "Milan", 22.0), 0);

        assert!(!repo.remove(&never_added).await.unwrap());
        assert_eq!(repo.list().await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn test_names_match_case_insensitively() {
        let repo = repo();
        repo.add(&conditions(1, "Berlin", 15.0)).await.unwrap();

        assert!(repo.is_favorite("BERLIN").await.unwrap());
        assert_eq!(repo.remove_by_name("berlin").await.unwrap(), 1);
        assert!(!repo.is_favorite("Berlin").await.unwrap());
    }

    #[tokio::test]
    async fn test_membership_follows_writes() {
        let repo = repo();
        let mut member = repo.membership("quito");
        assert!(!member.current());

        let added = repo.add(&conditions(3, "Quito", 14.0)).await.unwrap();
        assert_eq!(member.changed().await, Some(true));

        repo.remove(&added).await.unwrap();
        assert_eq!(member.changed().await, Some(false));
    }

    #[tokio::test]
    async fn test_clear_empties_list() {
        let repo = repo();
        repo.add(&conditions(1, "Accra", 30.0)).await.unwrap();
        repo.add(&conditions(2, "Dakar", 28.0)).await.unwrap();
        repo.clear().await.unwrap();

        assert!(repo.list().await.unwrap().is_empty());
        assert!(repo.watch().borrow().is_empty());
    }
}
