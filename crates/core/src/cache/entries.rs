//! Entry operations on a single named cache store.

use super::connection::CacheStorage;
use super::hash::compute_request_key;
use crate::Error;
use bytes::Bytes;
use tokio_rusqlite::{params, rusqlite};

/// Request identity: the method + URL a response is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: impl AsRef<str>, url: impl Into<String>) -> Self {
        Self { method: method.as_ref().to_ascii_uppercase(), url: url.into() }
    }

    /// Shorthand for a GET identity.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Only GET identities are ever stored or matched.
    pub fn is_cacheable(&self) -> bool {
        self.method == "GET"
    }

    pub fn hash(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }

    fn ensure_cacheable(&self) -> Result<(), Error> {
        if self.is_cacheable() {
            Ok(())
        } else {
            Err(Error::NotCacheable { method: self.method.clone(), url: self.url.clone() })
        }
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A stored response: status, headers and the full body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    /// URL the response was served from (after redirects).
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// Handle to one named cache store.
#[derive(Clone, Debug)]
pub struct CacheStore {
    pub(crate) storage: CacheStorage,
    pub(crate) name: String,
}

/// Upsert a single entry. Shared by `put` and bulk population.
pub(crate) fn write_entry(
    conn: &rusqlite::Connection, store: &str, key: &RequestKey, record: &ResponseRecord, stored_at: &str,
) -> Result<(), Error> {
    let headers_json =
        serde_json::to_string(&record.headers).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;

    conn.execute(
        "INSERT INTO cache_entries (
            store_name, key_hash, method, url, response_url, status_code, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(store_name, key_hash) DO UPDATE SET
            response_url = excluded.response_url,
            status_code = excluded.status_code,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            store,
            key.hash(),
            &key.method,
            &key.url,
            &record.url,
            record.status as i64,
            headers_json,
            record.body.as_ref(),
            stored_at,
        ],
    )?;
    Ok(())
}

impl CacheStore {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a response under the given identity, replacing any previous one.
    pub async fn put(&self, key: &RequestKey, record: &ResponseRecord) -> Result<(), Error> {
        key.ensure_cacheable()?;

        let name = self.name.clone();
        let key = key.clone();
        let record = record.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.storage
            .conn
            .call(move |conn| -> Result<(), Error> { write_entry(conn, &name, &key, &record, &stored_at) })
            .await
            .map_err(Error::from)
    }

    /// Look up the response stored for an identity.
    ///
    /// Returns None when nothing is stored or the identity is not cacheable.
    pub async fn match_request(&self, key: &RequestKey) -> Result<Option<ResponseRecord>, Error> {
        if !key.is_cacheable() {
            return Ok(None);
        }

        let name = self.name.clone();
        let hash = key.hash();
        self.storage
            .conn
            .call(move |conn| -> Result<Option<ResponseRecord>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT response_url, status_code, headers_json, body
                     FROM cache_entries WHERE store_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![name, hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                });

                match result {
                    Ok((url, status, headers_json, body)) => {
                        let status = u16::try_from(status)
                            .map_err(|_| Error::CorruptEntry(format!("status code {status}")))?;
                        let headers = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;
                        Ok(Some(ResponseRecord { url, status, headers, body: Bytes::from(body) }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entry for an identity. Returns whether one existed.
    pub async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        let name = self.name.clone();
        let hash = key.hash();
        self.storage
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE store_name = ?1 AND key_hash = ?2",
                    params![name, hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// List the identities stored in this store, oldest write first.
    pub async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        let name = self.name.clone();
        self.storage
            .conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url FROM cache_entries WHERE store_name = ?1 ORDER BY stored_at ASC, rowid ASC",
                )?;
                let keys = stmt
                    .query_map(params![name], |row| Ok(RequestKey { method: row.get(0)?, url: row.get(1)? }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}
