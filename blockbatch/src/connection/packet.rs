//! RCON packet framing.
//!
//! ```text
//! ┌──────────┬────────────┬──────────┬──────────────┬──────┐
//! │ i32 len  │ i32 id     │ i32 type │ body (UTF-8) │ 0 0  │
//! └──────────┴────────────┴──────────┴──────────────┴──────┘
//!   little-endian; len counts everything after itself
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::ConnectionError;

/// Client → server: authenticate with the shared secret.
pub const TYPE_AUTH: i32 = 3;
/// Client → server: execute a command.
pub const TYPE_EXEC_COMMAND: i32 = 2;
/// Server → client: authentication outcome (same wire value as exec).
pub const TYPE_AUTH_RESPONSE: i32 = 2;
/// Server → client: command output.
pub const TYPE_RESPONSE_VALUE: i32 = 0;

/// Request id the server uses to signal a rejected secret.
pub const AUTH_FAILED_ID: i32 = -1;

/// Largest body the server accepts from a client.
pub const MAX_REQUEST_BODY: usize = 1446;
/// Largest body the server sends in a single packet.
pub const MAX_RESPONSE_BODY: usize = 4096;

/// id + type + two NUL terminators.
const FRAME_OVERHEAD: usize = 10;

/// A single decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    pub fn new(id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    /// Encode including the length prefix.
    pub fn encode(&self) -> Bytes {
        let payload_len = FRAME_OVERHEAD + self.body.len();
        let mut buf = BytesMut::with_capacity(4 + payload_len);
        buf.put_i32_le(payload_len as i32);
        buf.put_i32_le(self.id);
        buf.put_i32_le(self.kind);
        buf.put_slice(self.body.as_bytes());
        buf.put_u8(0);
        buf.put_u8(0);
        buf.freeze()
    }

    /// Decode a payload (everything after the length prefix).
    pub fn decode(mut payload: &[u8]) -> Result<Self, ConnectionError> {
        if payload.len() < FRAME_OVERHEAD {
            return Err(ConnectionError::Protocol(format!(
                "packet payload too short: {} bytes",
                payload.len()
            )));
        }
        let id = payload.get_i32_le();
        let kind = payload.get_i32_le();

        let mut body = payload;
        while let [rest @ .., 0] = body {
            body = rest;
        }

        Ok(Self {
            id,
            kind,
            body: String::from_utf8_lossy(body).into_owned(),
        })
    }
}

/// Read one packet from the stream.
pub async fn read_packet<R>(reader: &mut R) -> Result<Packet, ConnectionError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_i32_le().await {
        Ok(len) => len,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ConnectionError::Closed)
        }
        Err(e) => return Err(ConnectionError::Io(e)),
    };

    let max = (FRAME_OVERHEAD + MAX_RESPONSE_BODY) as i32;
    if len < FRAME_OVERHEAD as i32 || len > max {
        return Err(ConnectionError::Protocol(format!(
            "invalid packet length {} (expected {}..={})",
            len, FRAME_OVERHEAD, max
        )));
    }

    let mut payload = vec![0u8; len as usize];
    match reader.read_exact(&mut payload).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ConnectionError::Closed)
        }
        Err(e) => return Err(ConnectionError::Io(e)),
    }

    Packet::decode(&payload)
}

/// Write one packet and flush.
pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&packet.encode()).await?;
    writer.flush().await?;
    Ok(())
}
