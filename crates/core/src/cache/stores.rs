//! Store-level operations: create, enumerate, delete and bulk populate.

use super::connection::CacheStorage;
use super::entries::{CacheStore, RequestKey, ResponseRecord, write_entry};
use crate::Error;
use tokio_rusqlite::{params, rusqlite};

fn insert_store(conn: &rusqlite::Connection, name: &str, created_at: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO cache_stores (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![name, created_at],
    )?;
    Ok(())
}

impl CacheStorage {
    /// Open a named store, creating it if it doesn't exist.
    pub async fn open_store(&self, name: &str) -> Result<CacheStore, Error> {
        let owned = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> { insert_store(conn, &owned, &created_at) })
            .await
            .map_err(Error::from)?;

        Ok(CacheStore { storage: self.clone(), name: name.to_string() })
    }

    /// Handle to a store without creating it.
    ///
    /// Reads through it find nothing while the store doesn't exist.
    pub fn store(&self, name: &str) -> CacheStore {
        CacheStore { storage: self.clone(), name: name.to_string() }
    }

    /// Check whether a store with this name exists.
    pub async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn
                    .query_row(
                        "SELECT EXISTS(SELECT 1 FROM cache_stores WHERE name = ?1)",
                        params![name],
                        |row| row.get(0),
                    )
                    .map_err(Error::from)?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List all store names in creation order.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and every entry in it.
    ///
    /// Returns whether the store existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Create a store (if absent) and write all entries in one transaction.
    ///
    /// Either every entry is stored and the store exists afterwards, or the
    /// storage is left exactly as it was.
    pub async fn populate_store(
        &self, name: &str, entries: Vec<(RequestKey, ResponseRecord)>,
    ) -> Result<CacheStore, Error> {
        if let Some((key, _)) = entries.iter().find(|(key, _)| !key.is_cacheable()) {
            return Err(Error::NotCacheable { method: key.method.clone(), url: key.url.clone() });
        }

        let owned = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let count = entries.len();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                insert_store(&tx, &owned, &now)?;
                for (key, record) in &entries {
                    write_entry(&tx, &owned, key, record, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!(store = name, entries = count, "populated cache store");

        Ok(CacheStore { storage: self.clone(), name: name.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn entry(url: &str) -> (RequestKey, ResponseRecord) {
        (
            RequestKey::get(url),
            ResponseRecord { url: url.to_string(), status: 200, headers: Vec::new(), body: Bytes::from_static(b"ok") },
        )
    }

    #[tokio::test]
    async fn test_open_store_idempotent() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        storage.open_store("weather-pwa-v2").await.unwrap();
        storage.open_store("weather-pwa-v2").await.unwrap();

        assert_eq!(storage.store_names().await.unwrap(), vec!["weather-pwa-v2"]);
        assert!(storage.has_store("weather-pwa-v2").await.unwrap());
        assert!(!storage.has_store("weather-pwa-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_store_handle_does_not_create() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let store = storage.store("weather-pwa-v2");

        let result = store.match_request(&RequestKey::get("http://localhost:8080/")).await.unwrap();
        assert!(result.is_none());
        assert!(storage.store_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_names_in_creation_order() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        storage.open_store("weather-pwa-v2").await.unwrap();
        storage.open_store("weather-pwa-v1").await.unwrap();
        storage.open_store("weather-pwa-v3").await.unwrap();

        assert_eq!(storage.store_names().await.unwrap(), vec!["weather-pwa-v2", "weather-pwa-v1", "weather-pwa-v3"]);
    }

    #[tokio::test]
    async fn test_delete_store_cascades_entries() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let (key, record) = entry("http://localhost:8080/styles.css");
        let store = storage.open_store("weather-pwa-v1").await.unwrap();
        store.put(&key, &record).await.unwrap();

        assert!(storage.delete_store("weather-pwa-v1").await.unwrap());
        assert!(!storage.delete_store("weather-pwa-v1").await.unwrap());
        assert!(storage.store_names().await.unwrap().is_empty());

        // recreating the store starts empty
        let store = storage.open_store("weather-pwa-v1").await.unwrap();
        assert!(store.match_request(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_populate_store() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let entries = vec![entry("http://localhost:8080/"), entry("http://localhost:8080/app.js")];

        let store = storage.populate_store("weather-pwa-v2", entries).await.unwrap();

        assert_eq!(store.keys().await.unwrap().len(), 2);
        assert_eq!(storage.store_names().await.unwrap(), vec!["weather-pwa-v2"]);
    }

    #[tokio::test]
    async fn test_populate_store_rejects_non_get_without_side_effects() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let (_, record) = entry("http://localhost:8080/");
        let entries = vec![entry("http://localhost:8080/"), (RequestKey::new("POST", "http://localhost:8080/"), record)];

        let result = storage.populate_store("weather-pwa-v2", entries).await;

        assert!(matches!(result, Err(Error::NotCacheable { .. })));
        assert!(!storage.has_store("weather-pwa-v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_populate_store_rolls_back_on_failure() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        storage
            .conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER fail_on_icon BEFORE INSERT ON cache_entries
                     WHEN NEW.url LIKE '%icon%'
                     BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
                )
            })
            .await
            .unwrap();

        let entries = vec![entry("http://localhost:8080/"), entry("http://localhost:8080/icon-192.png")];
        let result = storage.populate_store("weather-pwa-v2", entries).await;

        assert!(matches!(result, Err(Error::Database(_))));
        assert!(storage.store_names().await.unwrap().is_empty());
    }
}
