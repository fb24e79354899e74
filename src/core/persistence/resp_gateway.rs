// src/core/persistence/resp_gateway.rs

//! A persistence gateway that talks RESP2 to a Redis-compatible server.
//!
//! Requests are serialized over a single connection, so writes reach the
//! server in the order they were issued. A broken connection is dropped and
//! re-established on the next request.

use super::gateway::PersistenceGateway;
use crate::core::RankError;
use crate::core::protocol::{RespFrame, RespFrameCodec};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use indexmap::IndexMap;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

type Connection = Framed<TcpStream, RespFrameCodec>;

pub struct RespGateway {
    address: String,
    password: Option<String>,
    conn: Mutex<Option<Connection>>,
}

impl RespGateway {
    /// Connects eagerly so that a bad address fails at startup rather than on first write.
    pub async fn connect(address: &str, password: Option<String>) -> Result<Self, RankError> {
        let gateway = Self {
            address: address.to_string(),
            password,
            conn: Mutex::new(None),
        };
        let conn = gateway.open().await?;
        *gateway.conn.lock().await = Some(conn);
        info!("Connected to persistence store at {}", address);
        Ok(gateway)
    }

    async fn open(&self) -> Result<Connection, RankError> {
        let stream = TcpStream::connect(&self.address).await?;
        stream.set_nodelay(true)?;
        let mut conn = Framed::new(stream, RespFrameCodec);
        if let Some(password) = &self.password {
            let reply = roundtrip(
                &mut conn,
                RespFrame::command([Bytes::from_static(b"AUTH"), Bytes::from(password.clone())]),
            )
            .await?;
            match reply {
                RespFrame::Error(message) => return Err(RankError::Gateway(message)),
                reply => reply.expect_ack()?,
            }
        }
        Ok(conn)
    }

    /// Sends one command and waits for its reply.
    async fn request(&self, frame: RespFrame) -> Result<RespFrame, RankError> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            debug!("Reconnecting to persistence store at {}", self.address);
            *guard = Some(self.open().await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(RankError::ConnectionClosed);
        };

        match roundtrip(conn, frame).await {
            Ok(RespFrame::Error(message)) => Err(RankError::Gateway(message)),
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!(
                    "Connection to persistence store at {} failed: {}",
                    self.address, e
                );
                *guard = None;
                Err(e)
            }
        }
    }
}

async fn roundtrip(conn: &mut Connection, frame: RespFrame) -> Result<RespFrame, RankError> {
    conn.send(frame).await?;
    match conn.next().await {
        Some(result) => result,
        None => Err(RankError::ConnectionClosed),
    }
}

fn key_bytes(key: &str) -> Bytes {
    Bytes::copy_from_slice(key.as_bytes())
}

#[async_trait]
impl PersistenceGateway for RespGateway {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, RankError> {
        let reply = self
            .request(RespFrame::command([Bytes::from_static(b"GET"), key_bytes(key)]))
            .await?;
        reply.into_optional_bytes()
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), RankError> {
        self.request(RespFrame::command([
            Bytes::from_static(b"SET"),
            key_bytes(key),
            value,
        ]))
        .await?
        .expect_ack()
    }

    async fn hash_get_all(&self, key: &str) -> Result<IndexMap<String, Bytes>, RankError> {
        let items = self
            .request(RespFrame::command([
                Bytes::from_static(b"HGETALL"),
                key_bytes(key),
            ]))
            .await?
            .into_bytes_array()?;
        if items.len() % 2 != 0 {
            return Err(RankError::Gateway(format!(
                "HGETALL {key} returned an odd number of elements"
            )));
        }

        let mut fields = IndexMap::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
            fields.insert(String::from_utf8(field.to_vec())?, value);
        }
        Ok(fields)
    }

    async fn hash_set_many(
        &self,
        key: &str,
        fields: &IndexMap<String, Bytes>,
    ) -> Result<(), RankError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::with_capacity(2 + fields.len() * 2);
        parts.push(Bytes::from_static(b"HSET"));
        parts.push(key_bytes(key));
        for (field, value) in fields {
            parts.push(key_bytes(field));
            parts.push(value.clone());
        }
        self.request(RespFrame::command(parts)).await?.expect_ack()
    }

    async fn hash_delete(&self, key: &str, fields: &[String]) -> Result<(), RankError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::with_capacity(2 + fields.len());
        parts.push(Bytes::from_static(b"HDEL"));
        parts.push(key_bytes(key));
        parts.extend(fields.iter().map(|f| key_bytes(f)));
        self.request(RespFrame::command(parts)).await?.expect_ack()
    }

    async fn delete(&self, key: &str) -> Result<(), RankError> {
        self.request(RespFrame::command([Bytes::from_static(b"DEL"), key_bytes(key)]))
            .await?
            .expect_ack()
    }
}
