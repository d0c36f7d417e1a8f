//! Entry CRUD operations.
//!
//! Provides functions for storing, reading, listing, deleting and evicting
//! request/response snapshots inside a partition.

use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use super::partition::{PartitionName, PartitionRole};
use crate::Error;
use crate::http::{Method, RequestKey, Response};

/// Insert or overwrite one entry, creating the partition on first write.
///
/// Overwrites take a fresh `seq`, so a rewritten key counts as the most
/// recently written entry for eviction purposes.
fn upsert(conn: &rusqlite::Connection, partition: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
    if !key.method.is_retrieval() {
        return Err(Error::InvalidInput(format!("refusing to store {} {}", key.method, key.url)));
    }

    let role = PartitionName::parse(partition)
        .map(|p| p.role)
        .unwrap_or(PartitionRole::Dynamic);
    let now = chrono::Utc::now().to_rfc3339();

    conn.execute(
        "INSERT OR IGNORE INTO partitions (name, role, created_at) VALUES (?1, ?2, ?3)",
        params![partition, role.as_str(), now],
    )?;

    let seq: i64 = conn.query_row("SELECT COALESCE(MAX(seq), 0) + 1 FROM entries", [], |row| row.get(0))?;
    let headers_json =
        serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(format!("headers: {e}")))?;

    conn.execute(
        "INSERT INTO entries (
            partition, key_hash, method, url, status, response_type,
            headers_json, body, stored_at, seq
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(partition, key_hash) DO UPDATE SET
            status = excluded.status,
            response_type = excluded.response_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at,
            seq = excluded.seq",
        params![
            partition,
            compute_cache_key(key),
            key.method.as_str(),
            &key.url,
            response.status as i64,
            response.response_type.as_str(),
            headers_json,
            response.body.as_ref(),
            now,
            seq,
        ],
    )?;
    Ok(())
}

fn row_to_response(status: i64, response_type: String, headers_json: String, body: Vec<u8>) -> Result<Response, Error> {
    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
        .map_err(|e| Error::InvalidInput(format!("corrupt headers_json: {e}")))?;
    Ok(Response {
        status: u16::try_from(status).map_err(|_| Error::InvalidInput(format!("corrupt status: {status}")))?,
        headers,
        body: Bytes::from(body),
        response_type: response_type.parse()?,
    })
}

impl CacheDb {
    /// Insert or update a single entry.
    pub async fn put_entry(&self, partition: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
        let partition = partition.to_string();
        let key = key.clone();
        let response = response.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> { upsert(conn, &partition, &key, &response) })
            .await
            .map_err(Error::from)
    }

    /// Insert or update many entries in one transaction.
    ///
    /// Either every entry is written or none is.
    pub async fn put_entries(&self, partition: &str, entries: Vec<(RequestKey, Response)>) -> Result<(), Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for (key, response) in &entries {
                    upsert(&tx, &partition, key, response)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by exact method+URL.
    ///
    /// Returns None if the partition or the entry doesn't exist.
    pub async fn get_entry(&self, partition: &str, key: &RequestKey) -> Result<Option<Response>, Error> {
        let partition = partition.to_string();
        let key_hash = compute_cache_key(key);
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, response_type, headers_json, body
                    FROM entries WHERE partition = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![partition, key_hash], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?, row.get::<_, Vec<u8>>(3)?))
                });

                match result {
                    Ok((status, response_type, headers_json, body)) => {
                        row_to_response(status, response_type, headers_json, body).map(Some)
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// List the keys of a partition in insertion order, oldest first.
    pub async fn entry_keys(&self, partition: &str) -> Result<Vec<RequestKey>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE partition = ?1 ORDER BY seq ASC")?;
                let rows = stmt
                    .query_map(params![partition], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(method, url)| Ok(RequestKey { method: method.parse::<Method>()?, url }))
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry. Returns false if it was absent.
    pub async fn delete_entry(&self, partition: &str, key: &RequestKey) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key_hash = compute_cache_key(key);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key_hash = ?2",
                    params![partition, key_hash],
                )?;
                Ok(deleted == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// Count entries in one partition, or across all partitions.
    pub async fn count_entries(&self, partition: Option<&str>) -> Result<u64, Error> {
        let partition = partition.map(str::to_string);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = match &partition {
                    Some(name) => {
                        conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![name], |row| {
                            row.get(0)
                        })?
                    }
                    None => conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?,
                };
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Evict the oldest entries until the partition holds at most `max_entries`.
    ///
    /// Count and delete run in one transaction, so a single trim never
    /// over-evicts; concurrent writers landing between trims can still push
    /// the partition briefly past the bound.
    ///
    /// Returns the number of deleted entries.
    pub async fn trim_partition(&self, partition: &str, max_entries: usize) -> Result<u64, Error> {
        let partition = partition.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let count: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM entries WHERE partition = ?1",
                    params![partition],
                    |row| row.get(0),
                )?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = tx.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key_hash IN (
                        SELECT key_hash FROM entries WHERE partition = ?1 ORDER BY seq ASC LIMIT ?2
                    )",
                    params![partition, to_delete],
                )?;
                tx.commit()?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
