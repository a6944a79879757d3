//! Redis-backed cache.
//!
//! The connection manager reconnects on its own; while Redis is unreachable
//! every call degrades to a miss or a no-op.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, IntoConnectionInfo};

use super::{Cache, CachePayload};

const RECONNECT_RETRIES: usize = 2;
const RECONNECT_MAX_DELAY_MS: u64 = 500;
/// Bounds each connect and each command so a stalled server reads as a miss.
const IO_TIMEOUT: Duration = Duration::from_secs(2);

pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Open a managed connection.
    ///
    /// # Arguments
    /// * `info` - a `redis://` URL or a prebuilt `ConnectionInfo`
    pub async fn connect(info: impl IntoConnectionInfo) -> Result<Self> {
        let client = redis::Client::open(info).context("invalid Redis connection settings")?;
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(RECONNECT_RETRIES)
            .set_max_delay(RECONNECT_MAX_DELAY_MS)
            .set_connection_timeout(IO_TIMEOUT)
            .set_response_timeout(IO_TIMEOUT);
        let conn = ConnectionManager::new_with_config(client, config)
            .await
            .context("failed to connect to Redis")?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<CachePayload> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(raw) => raw.map(|raw| CachePayload::decode(&raw)),
            Err(e) => {
                tracing::warn!(key, error = %e, "redis GET failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: CachePayload, ttl: Duration) {
        let mut conn = self.conn.clone();
        let raw = value.encode();
        let result = if ttl.is_zero() {
            conn.set::<_, _, ()>(key, raw).await
        } else {
            // EX rejects 0, so sub-second TTLs round up.
            let secs = ttl.as_secs().max(1);
            conn.set_ex::<_, _, ()>(key, raw, secs).await
        };
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "redis SET failed");
        }
    }

    async fn delete(&self, key: &str) {
        let mut conn = self.conn.clone();
        if let Err(e) = conn.del::<_, ()>(key).await {
            tracing::warn!(key, error = %e, "redis DEL failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    /// Read one RESP array command, returning its arguments.
    async fn read_command(reader: &mut BufReader<TcpStream>) -> Option<Vec<String>> {
        let mut line = String::new();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let count: usize = line.trim().strip_prefix('*')?.parse().ok()?;
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            line.clear();
            reader.read_line(&mut line).await.ok()?;
            let len: usize = line.trim().strip_prefix('$')?.parse().ok()?;
            let mut buf = vec![0u8; len + 2];
            reader.read_exact(&mut buf).await.ok()?;
            buf.truncate(len);
            args.push(String::from_utf8(buf).ok()?);
        }
        Some(args)
    }

    /// A server that completes the client handshake, then hangs up on the
    /// first data command of every connection.
    async fn spawn_flaky_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut reader = BufReader::new(stream);
                    while let Some(args) = read_command(&mut reader).await {
                        if !args[0].eq_ignore_ascii_case("CLIENT") {
                            return;
                        }
                        if reader.get_mut().write_all(b"+OK\r\n").await.is_err() {
                            return;
                        }
                    }
                });
            }
        });
        format!("redis://{addr}")
    }

    #[tokio::test]
    async fn test_dropped_connection_fails_open() {
        let url = spawn_flaky_server().await;
        let cache = RedisCache::connect(url.as_str()).await.unwrap();
        let limit = Duration::from_secs(10);

        let hit = tokio::time::timeout(limit, cache.get("prompts:list:u1:sort=latest"))
            .await
            .expect("GET should not hang");
        assert!(hit.is_none());

        tokio::time::timeout(
            limit,
            cache.set("k", CachePayload::Text("v".into()), Duration::from_secs(60)),
        )
        .await
        .expect("SET should not hang");

        tokio::time::timeout(limit, cache.delete("k"))
            .await
            .expect("DEL should not hang");

        let hit = tokio::time::timeout(limit, cache.get("k"))
            .await
            .expect("GET should not hang");
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn test_connect_fails_without_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = RedisCache::connect(format!("redis://{addr}")).await;
        assert!(result.is_err());
    }
}
