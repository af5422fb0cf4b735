//! Entry operations on a single opened store.
//!
//! Provides lookup, upsert and bulk upsert of responses keyed by request
//! identity, plus a metadata listing used for inspection.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::Cache;
use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;
use crate::http::{Request, Response};

/// Handle to one named store.
#[derive(Clone, Debug)]
pub struct Store {
    db: CacheDb,
    name: String,
}

/// Summary of a cached entry, without its body.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntryMeta {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body_bytes: u64,
    pub stored_at: String,
}

/// Row to be written, already serialized.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        let url = request.cache_url();
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("failed to serialize headers: {e}")))?;
        Ok(Self {
            key_hash: compute_cache_key(&request.method, &url),
            method: request.method.clone(),
            url,
            status: response.status,
            headers_json,
            body: response.body.to_vec(),
        })
    }
}

const UPSERT_ENTRY: &str = "INSERT INTO entries (store, key_hash, method, url, status, headers_json, body, stored_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(store, key_hash) DO UPDATE SET
        method = excluded.method,
        url = excluded.url,
        status = excluded.status,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

fn upsert(conn: &rusqlite::Connection, store: &str, row: &EntryRow, stored_at: &str) -> Result<(), Error> {
    conn.execute(
        UPSERT_ENTRY,
        params![store, row.key_hash, row.method, row.url, row.status, row.headers_json, row.body, stored_at],
    )?;
    Ok(())
}

fn decode_headers(headers_json: &str) -> Result<Vec<(String, String)>, Error> {
    serde_json::from_str(headers_json)
        .map_err(|e| Error::InvalidInput(format!("corrupt headers for cached entry: {e}")))
}

impl Store {
    pub(crate) fn new(db: CacheDb, name: &str) -> Self {
        Self { db, name: name.to_string() }
    }

    /// The store's name (its version tag).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the stored response for a request.
    ///
    /// Returns None if there is no entry for the request's method and URL.
    pub async fn get_entry(&self, request: &Request) -> Result<Option<Response>, Error> {
        let store = self.name.clone();
        let key_hash = compute_cache_key(&request.method, &request.cache_url());
        self.db
            .conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt =
                    conn.prepare("SELECT status, headers_json, body FROM entries WHERE store = ?1 AND key_hash = ?2")?;

                let result = stmt.query_row(params![store, key_hash], |row| {
                    Ok((row.get::<_, u16>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?))
                });

                match result {
                    Ok((status, headers_json, body)) => {
                        let headers = decode_headers(&headers_json)?;
                        Ok(Some(Response { status, headers, body: Bytes::from(body) }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite the entry for a request.
    pub async fn put_entry(&self, request: &Request, response: &Response) -> Result<(), Error> {
        let store = self.name.clone();
        let row = EntryRow::new(request, response)?;
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> { upsert(conn, &store, &row, &stored_at) })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite several entries in one transaction.
    ///
    /// Either every entry is written or none is.
    pub async fn put_entries(&self, entries: &[(Request, Response)]) -> Result<(), Error> {
        let store = self.name.clone();
        let rows = entries
            .iter()
            .map(|(request, response)| EntryRow::new(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for row in &rows {
                    upsert(&tx, &store, row, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List entry metadata, ordered by URL then method.
    pub async fn list_entries(&self) -> Result<Vec<EntryMeta>, Error> {
        let store = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<EntryMeta>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, headers_json, length(body), stored_at
                    FROM entries WHERE store = ?1 ORDER BY url ASC, method ASC",
                )?;

                let rows = stmt
                    .query_map(params![store], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, u16>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, i64>(4)?,
                            row.get::<_, String>(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(method, url, status, headers_json, body_len, stored_at)| {
                        let headers = decode_headers(&headers_json)?;
                        let content_type = headers
                            .into_iter()
                            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
                            .map(|(_, value)| value);
                        Ok(EntryMeta { method, url, status, content_type, body_bytes: body_len as u64, stored_at })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in the store.
    pub async fn count(&self) -> Result<u64, Error> {
        let store = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl Cache for Store {
    async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        self.get_entry(request).await
    }

    async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_entry(request, response).await
    }

    async fn put_all(&self, entries: Vec<(Request, Response)>) -> Result<(), Error> {
        self.put_entries(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    fn html(body: &str) -> Response {
        Response::new(200, body.to_string()).with_header("content-type", "text/html")
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("atc-v1").await.unwrap();
        let request = get("http://localhost:8000/index.html");
        let response = html("<h1>shell</h1>");

        store.put_entry(&request, &response).await.unwrap();

        let retrieved = store.get_entry(&request).await.unwrap().unwrap();
        assert_eq!(retrieved, response);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("atc-v1").await.unwrap();
        let result = store.get_entry(&get("http://localhost:8000/nope")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_method_is_part_of_identity() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("atc-v1").await.unwrap();
        let request = get("http://localhost:8000/form");
        store.put_entry(&request, &html("form")).await.unwrap();

        let post = Request::new("POST", request.url.clone());
        assert!(store.get_entry(&post).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fragment_ignored() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("atc-v1").await.unwrap();
        store
            .put_entry(&get("http://localhost:8000/index.html#intro"), &html("x"))
            .await
            .unwrap();

        assert!(store.get_entry(&get("http://localhost:8000/index.html")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("atc-v1").await.unwrap();
        let request = get("http://localhost:8000/");

        store.put_entry(&request, &html("old")).await.unwrap();
        store.put_entry(&request, &html("new")).await.unwrap();

        assert_eq!(store.get_entry(&request).await.unwrap().unwrap().text(), "new");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stores_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = db.open_store("atc-v0").await.unwrap();
        let new = db.open_store("atc-v1").await.unwrap();
        let request = get("http://localhost:8000/");

        old.put_entry(&request, &html("v0")).await.unwrap();

        assert!(new.get_entry(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_entries_bulk() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("atc-v1").await.unwrap();
        let entries = vec![
            (get("http://localhost:8000/"), html("root")),
            (get("http://localhost:8000/index.html"), html("index")),
        ];

        store.put_all(entries).await.unwrap();

        let metas = store.list_entries().await.unwrap();
        assert_eq!(metas.len(), 2);
        assert_eq!(metas[0].url, "http://localhost:8000/");
        assert_eq!(metas[0].content_type.as_deref(), Some("text/html"));
        assert_eq!(metas[1].body_bytes, 5);
    }

    #[tokio::test]
    async fn test_corrupt_headers_reported_by_get_and_list() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("atc-v1").await.unwrap();
        let request = get("http://localhost:8000/");
        store.put_entry(&request, &html("root")).await.unwrap();

        db.conn
            .call(|conn| conn.execute("UPDATE entries SET headers_json = 'not json'", []))
            .await
            .unwrap();

        assert!(matches!(store.get_entry(&request).await, Err(Error::InvalidInput(_))));
        assert!(matches!(store.list_entries().await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_delete_store_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("atc-v0").await.unwrap();
        store.put_entry(&get("http://localhost:8000/"), &html("v0")).await.unwrap();

        db.delete_store("atc-v0").await.unwrap();

        let reopened = db.open_store("atc-v0").await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_into_deleted_store_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("atc-v0").await.unwrap();
        db.delete_store("atc-v0").await.unwrap();

        let result = store.put_entry(&get("http://localhost:8000/"), &html("orphan")).await;
        assert!(result.is_err());
    }
}
