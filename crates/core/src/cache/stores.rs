//! Named cache stores and their entries.
//!
//! A store is a named key→response mapping. Entries carry no expiry; they
//! live until the store holding them is deleted.

use super::connection::CacheDb;
use super::hash::{cache_url, compute_cache_key};
use super::snapshot::ResponseSnapshot;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

/// The only method whose responses may be stored.
const CACHEABLE_METHOD: &str = "GET";

/// A cached response together with the request it answers.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheEntry {
    pub store: String,
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub response: ResponseSnapshot,
    pub cached_at: String,
}

/// Store name with its entry count.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: u64,
    pub created_at: String,
}

/// Handle on one named store.
///
/// Obtained from [`CacheDb::open_store`] or [`CacheDb::store`]; holds no
/// state besides the name.
#[derive(Clone, Debug)]
pub struct CacheStore {
    db: CacheDb,
    name: String,
}

struct EntryRow {
    store: String,
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    cached_at: String,
}

impl EntryRow {
    const COLUMNS: &'static str =
        "store, key_hash, method, url, status, status_text, headers_json, body, cached_at";

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            store: row.get(0)?,
            key_hash: row.get(1)?,
            method: row.get(2)?,
            url: row.get(3)?,
            status: row.get(4)?,
            status_text: row.get(5)?,
            headers_json: row.get(6)?,
            body: row.get(7)?,
            cached_at: row.get(8)?,
        })
    }

    fn into_entry(self) -> CacheEntry {
        let headers = serde_json::from_str(&self.headers_json).unwrap_or_else(|e| {
            tracing::warn!(url = %self.url, "discarding unreadable cached headers: {e}");
            Vec::new()
        });
        CacheEntry {
            store: self.store,
            key_hash: self.key_hash,
            method: self.method,
            url: self.url,
            response: ResponseSnapshot {
                status: self.status,
                status_text: self.status_text,
                headers,
                body: self.body,
            },
            cached_at: self.cached_at,
        }
    }
}

/// A prepared insert: everything computed before entering the DB thread.
struct PendingEntry {
    key_hash: String,
    url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
}

impl PendingEntry {
    fn new(url: &Url, response: &ResponseSnapshot) -> Result<Self, Error> {
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("failed to encode headers: {e}")))?;
        Ok(Self {
            key_hash: compute_cache_key(CACHEABLE_METHOD, url),
            url: cache_url(url),
            status: response.status,
            status_text: response.status_text.clone(),
            headers_json,
            body: response.body.clone(),
        })
    }
}

fn ensure_store(conn: &rusqlite::Connection, name: &str, now: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
        params![name, now],
    )?;
    Ok(())
}

fn upsert_entries(
    conn: &rusqlite::Connection, store: &str, entries: &[PendingEntry], now: &str,
) -> rusqlite::Result<()> {
    ensure_store(conn, store, now)?;
    let mut stmt = conn.prepare(
        "INSERT INTO cache_entries (store, key_hash, method, url, status, status_text, headers_json, body, cached_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(store, key_hash) DO UPDATE SET
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            cached_at = excluded.cached_at",
    )?;
    for entry in entries {
        stmt.execute(params![
            store,
            &entry.key_hash,
            CACHEABLE_METHOD,
            &entry.url,
            entry.status,
            &entry.status_text,
            &entry.headers_json,
            &entry.body,
            now,
        ])?;
    }
    Ok(())
}

impl CacheDb {
    /// Handle on a store without touching the database.
    ///
    /// Lookups on a store that does not exist simply miss; the first `put`
    /// creates it.
    pub fn store(&self, name: &str) -> CacheStore {
        CacheStore { db: self.clone(), name: name.to_string() }
    }

    /// Open a store by name, creating it if it does not exist.
    pub async fn open_store(&self, name: &str) -> Result<CacheStore, Error> {
        let store = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> { Ok(ensure_store(conn, &store, &now)?) })
            .await
            .map_err(Error::from)?;
        Ok(CacheStore { db: self.clone(), name: name.to_string() })
    }

    /// Whether a store with this name exists.
    pub async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                Ok(conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_stores WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all existing stores, oldest first.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// All stores with their entry counts.
    pub async fn store_summaries(&self) -> Result<Vec<StoreSummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<StoreSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT s.name, s.created_at, COUNT(e.key_hash)
                     FROM cache_stores s LEFT JOIN cache_entries e ON e.store = s.name
                     GROUP BY s.name
                     ORDER BY s.created_at ASC, s.name ASC",
                )?;
                let summaries = stmt
                    .query_map([], |row| {
                        Ok(StoreSummary {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(summaries)
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
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cache_entries WHERE store = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

impl CacheStore {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a response for a request, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for methods other than GET.
    pub async fn put(&self, method: &str, url: &Url, response: &ResponseSnapshot) -> Result<(), Error> {
        if !method.eq_ignore_ascii_case(CACHEABLE_METHOD) {
            return Err(Error::InvalidInput(format!("cannot cache {method} request for {url}")));
        }

        let pending = [PendingEntry::new(url, response)?];
        let store = self.name.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                upsert_entries(&tx, &store, &pending, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!(store = %self.name, %url, status = response.status, "stored response");
        Ok(())
    }

    /// Store a batch of GET responses atomically: all or nothing.
    pub async fn put_all(&self, entries: &[(Url, ResponseSnapshot)]) -> Result<(), Error> {
        let pending = entries
            .iter()
            .map(|(url, response)| PendingEntry::new(url, response))
            .collect::<Result<Vec<_>, _>>()?;
        let store = self.name.clone();
        let now = chrono::Utc::now().to_rfc3339();
        let count = pending.len();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                upsert_entries(&tx, &store, &pending, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!(store = %self.name, count, "stored response batch");
        Ok(())
    }

    /// Look up the entry answering a request.
    ///
    /// Only GET requests can match.
    pub async fn match_request(&self, method: &str, url: &Url) -> Result<Option<CacheEntry>, Error> {
        if !method.eq_ignore_ascii_case(CACHEABLE_METHOD) {
            return Ok(None);
        }

        let key_hash = compute_cache_key(CACHEABLE_METHOD, url);
        let store = self.name.clone();
        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let sql = format!(
                    "SELECT {} FROM cache_entries WHERE store = ?1 AND key_hash = ?2",
                    EntryRow::COLUMNS
                );
                match conn.query_row(&sql, params![store, key_hash], EntryRow::from_row) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        Ok(row.map(EntryRow::into_entry))
    }

    /// Number of entries in the store.
    pub async fn len(&self) -> Result<u64, Error> {
        let store = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries WHERE store = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }

    /// All entries, ordered by URL.
    pub async fn entries(&self) -> Result<Vec<CacheEntry>, Error> {
        let store = self.name.clone();
        let rows = self
            .db
            .conn
            .call(move |conn| -> Result<Vec<EntryRow>, Error> {
                let sql = format!(
                    "SELECT {} FROM cache_entries WHERE store = ?1 ORDER BY url ASC",
                    EntryRow::COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![store], EntryRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        Ok(rows.into_iter().map(EntryRow::into_entry).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn html(body: &str) -> ResponseSnapshot {
        ResponseSnapshot::new(200, "OK")
            .with_header("Content-Type", "text/html")
            .with_body(body)
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("lwebmaker-recettes-v1").await.unwrap();
        let page = url("http://localhost:3000/");

        store.put("GET", &page, &html("<p>home</p>")).await.unwrap();

        let entry = store.match_request("GET", &page).await.unwrap().unwrap();
        assert_eq!(entry.store, "lwebmaker-recettes-v1");
        assert_eq!(entry.url, "http://localhost:3000/");
        assert_eq!(entry.response.text(), "<p>home</p>");
        assert_eq!(entry.response.content_type(), Some("text/html"));
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("static").await.unwrap();
        let result = store.match_request("GET", &url("http://localhost:3000/nope")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_existing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("static").await.unwrap();
        let page = url("http://localhost:3000/manifest.json");

        store.put("GET", &page, &html("old")).await.unwrap();
        store.put("GET", &page, &html("new")).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
        let entry = store.match_request("GET", &page).await.unwrap().unwrap();
        assert_eq!(entry.response.text(), "new");
    }

    #[tokio::test]
    async fn test_non_get_rejected_and_never_matches() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("api").await.unwrap();
        let endpoint = url("http://localhost:3000/api/recettes");

        let result = store.put("POST", &endpoint, &html("{}")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        store.put("GET", &endpoint, &html("{}")).await.unwrap();
        assert!(store.match_request("POST", &endpoint).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stores_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let a = db.open_store("a").await.unwrap();
        let b = db.open_store("b").await.unwrap();
        let page = url("http://localhost:3000/");

        a.put("GET", &page, &html("a")).await.unwrap();

        assert!(a.match_request("GET", &page).await.unwrap().is_some());
        assert!(b.match_request("GET", &page).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_store_removes_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("old-v1").await.unwrap();
        store.put("GET", &url("http://localhost:3000/"), &html("x")).await.unwrap();

        assert!(db.delete_store("old-v1").await.unwrap());
        assert!(!db.has_store("old-v1").await.unwrap());
        assert!(!db.delete_store("old-v1").await.unwrap());

        let reopened = db.open_store("old-v1").await.unwrap();
        assert!(reopened.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_store_names_and_summaries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let a = db.open_store("a").await.unwrap();
        db.open_store("b").await.unwrap();
        a.put("GET", &url("http://localhost:3000/1"), &html("1")).await.unwrap();
        a.put("GET", &url("http://localhost:3000/2"), &html("2")).await.unwrap();

        let mut names = db.store_names().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);

        let summaries = db.store_summaries().await.unwrap();
        let a_summary = summaries.iter().find(|s| s.name == "a").unwrap();
        let b_summary = summaries.iter().find(|s| s.name == "b").unwrap();
        assert_eq!(a_summary.entries, 2);
        assert_eq!(b_summary.entries, 0);
    }

    #[tokio::test]
    async fn test_put_all_and_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("static").await.unwrap();
        let batch = vec![
            (url("http://localhost:3000/"), html("root")),
            (url("http://localhost:3000/static/js/bundle.js"), html("js")),
        ];

        store.put_all(&batch).await.unwrap();

        let entries = store.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "http://localhost:3000/");
        assert_eq!(entries[1].url, "http://localhost:3000/static/js/bundle.js");
    }

    #[tokio::test]
    async fn test_put_recreates_deleted_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("api").await.unwrap();
        db.delete_store("api").await.unwrap();

        store.put("GET", &url("http://localhost:3000/api/auth/me"), &html("{}")).await.unwrap();

        assert!(db.has_store("api").await.unwrap());
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_handle_does_not_create() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.store("lwebmaker-api-v2");

        assert!(store.match_request("GET", &url("http://localhost:3000/api/recettes")).await.unwrap().is_none());
        assert!(store.is_empty().await.unwrap());
        assert!(!db.has_store("lwebmaker-api-v2").await.unwrap());

        store.put("GET", &url("http://localhost:3000/api/recettes"), &html("[]")).await.unwrap();
        assert!(db.has_store("lwebmaker-api-v2").await.unwrap());
    }
}
