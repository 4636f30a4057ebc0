//! Cache entry operations.
//!
//! An entry is a (RequestKey, ResponseSnapshot) pair stored under a namespace.
//! Entries are only ever replaced wholesale; there is no partial update and no
//! per-entry delete.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;

/// Normalized request identity. Only GET requests become keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    method: String,
    url: String,
}

impl RequestKey {
    /// Build a key for `method url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotCacheable` for any method other than GET.
    pub fn new(method: &str, url: &url::Url) -> Result<Self, Error> {
        if !method.eq_ignore_ascii_case("GET") {
            return Err(Error::NotCacheable(format!("{method} {url}")));
        }
        let mut url = url.clone();
        url.set_fragment(None);
        Ok(Self { method: "GET".to_string(), url: url.to_string() })
    }

    /// Key for a GET of `url`.
    pub fn get(url: &url::Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self { method: "GET".to_string(), url: url.to_string() }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Storage hash of this key.
    pub fn hash(&self) -> String {
        compute_cache_key(&self.method, &self.url)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// How much of a response the runtime lets the agent see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin response, fully inspectable.
    #[default]
    Basic,
    /// Cross-origin response with CORS headers.
    Cors,
    /// Cross-origin response without CORS; status and body hidden.
    Opaque,
    /// Network-level error surfaced as a response object.
    Error,
}

impl ResponseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Cors => "cors",
            ResponseKind::Opaque => "opaque",
            ResponseKind::Error => "error",
        }
    }
}

impl FromStr for ResponseKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseKind::Basic),
            "cors" => Ok(ResponseKind::Cors),
            "opaque" => Ok(ResponseKind::Opaque),
            "error" => Ok(ResponseKind::Error),
            other => Err(Error::CorruptEntry(format!("unknown response kind: {other}"))),
        }
    }
}

/// Immutable capture of a response: status, headers and body.
///
/// Cloning shares the body buffer, so forking one snapshot into a "send to
/// page" copy and a "write to cache" copy never re-reads the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub kind: ResponseKind,
}

impl ResponseSnapshot {
    pub fn new(
        status: u16, status_text: impl Into<String>, headers: Vec<(String, String)>, body: impl Into<Bytes>,
    ) -> Self {
        Self { status, status_text: status_text.into(), headers, body: body.into(), kind: ResponseKind::Basic }
    }

    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    /// First header value whose name matches case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Exactly 200 and not an error-typed response.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.kind != ResponseKind::Error
    }

    /// Any 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl CacheDb {
    /// Insert or replace the entry for `key` in `namespace`.
    ///
    /// Creates the namespace if it does not exist yet. The previous entry for
    /// the same key, if any, is overwritten in full.
    pub async fn put_entry(&self, namespace: &str, key: &RequestKey, response: &ResponseSnapshot) -> Result<(), Error> {
        self.put_entries(namespace, &[(key.clone(), response.clone())]).await
    }

    /// Insert several entries into `namespace` in one transaction.
    ///
    /// Either every entry is written or none is.
    pub async fn put_entries(&self, namespace: &str, items: &[(RequestKey, ResponseSnapshot)]) -> Result<(), Error> {
        let namespace = namespace.to_string();
        let stored_at = chrono::Utc::now().to_rfc3339();
        let rows = items
            .iter()
            .map(|(key, response)| {
                let headers_json =
                    serde_json::to_string(&response.headers).map_err(|e| Error::CorruptEntry(e.to_string()))?;
                Ok((key.clone(), response.clone(), headers_json))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO namespaces (name, created_at) VALUES (?1, ?2)",
                    params![&namespace, &stored_at],
                )?;
                for (key, response, headers_json) in &rows {
                    tx.execute(
                        "INSERT INTO entries (
                        namespace, key_hash, method, url, status, status_text,
                        headers_json, body, kind, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(namespace, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        kind = excluded.kind,
                        stored_at = excluded.stored_at",
                        params![
                            &namespace,
                            key.hash(),
                            key.method(),
                            key.url(),
                            i64::from(response.status),
                            &response.status_text,
                            headers_json,
                            response.body.as_ref(),
                            response.kind.as_str(),
                            &stored_at,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `key` in a single namespace.
    ///
    /// Returns None if the namespace or the entry doesn't exist.
    pub async fn match_entry(&self, namespace: &str, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        let namespace = namespace.to_string();
        let key_hash = key.hash();
        self.conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, headers_json, body, kind
                FROM entries WHERE namespace = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![namespace, key_hash], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                });

                let (status, status_text, headers_json, body, kind) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let headers: Vec<(String, String)> =
                    serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
                let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status}")))?;

                Ok(Some(ResponseSnapshot {
                    status,
                    status_text,
                    headers,
                    body: Bytes::from(body),
                    kind: kind.parse()?,
                }))
            })
            .await
            .map_err(Error::from)
    }

    /// All keys stored in `namespace`, ordered by URL.
    pub async fn entry_keys(&self, namespace: &str) -> Result<Vec<RequestKey>, Error> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE namespace = ?1 ORDER BY url")?;
                let keys = stmt
                    .query_map(params![namespace], |row| {
                        Ok(RequestKey { method: row.get(0)?, url: row.get(1)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in `namespace`.
    pub async fn entry_count(&self, namespace: &str) -> Result<u64, Error> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE namespace = ?1", params![namespace], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
