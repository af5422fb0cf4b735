//! Store registry operations.
//!
//! A store is a named bucket of entries. Stores are created on first open
//! and removed wholesale; removing one cascades to its entries.

use async_trait::async_trait;
use tokio_rusqlite::params;

use super::CacheStorage;
use super::connection::CacheDb;
use super::entries::Store;
use crate::Error;

impl CacheDb {
    /// Open the named store, creating it if absent.
    pub async fn open_store(&self, name: &str) -> Result<Store, Error> {
        let store = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        let created = self
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![store, created_at],
                )?;
                Ok(inserted == 1)
            })
            .await
            .map_err(Error::from)?;

        if created {
            tracing::debug!(store = name, "created cache store");
        }

        Ok(Store::new(self.clone(), name))
    }

    /// Open the named store without creating it.
    pub async fn find_store(&self, name: &str) -> Result<Option<Store>, Error> {
        let exists = self.has_store(name).await?;
        Ok(exists.then(|| Store::new(self.clone(), name)))
    }

    /// Names of all stores, oldest first.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Whether a store with this name exists.
    pub async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn
                    .query_row("SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })
                    .map_err(Error::from)?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and all of its entries.
    ///
    /// Returns false if no store had this name.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl CacheStorage for CacheDb {
    type Cache = Store;

    async fn open(&self, name: &str) -> Result<Store, Error> {
        self.open_store(name).await
    }

    async fn lookup(&self, name: &str) -> Result<Option<Store>, Error> {
        self.find_store(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.store_names().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.delete_store(name).await
    }
}
