//! TCP RCON connector and session.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::{debug, info};

use super::packet::{
    self, Packet, AUTH_FAILED_ID, TYPE_AUTH, TYPE_AUTH_RESPONSE, TYPE_EXEC_COMMAND,
};
use super::{BoxFuture, ConnectionError, Connector, Session};
use crate::config::defaults::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_HOST, DEFAULT_PORT};
use crate::config::ConfigError;

/// Connection parameters for the remote server.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Shared secret. Required; a missing secret is a fatal config error.
    pub password: Option<String>,
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            password: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl ConnectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "connection.host",
                reason: "must not be empty".to_string(),
            });
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connection.port",
                reason: "must be between 1 and 65535".to_string(),
            });
        }
        match self.password.as_deref() {
            Some(p) if !p.is_empty() => Ok(()),
            _ => Err(ConfigError::MissingSecret),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Opens authenticated RCON sessions over TCP.
pub struct RconConnector {
    address: String,
    password: String,
    connect_timeout: Duration,
}

impl std::fmt::Debug for RconConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RconConnector")
            .field("address", &self.address)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl RconConnector {
    /// Create a connector, failing fast on an invalid configuration.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            address: config.address(),
            password: config.password.clone().unwrap_or_default(),
            connect_timeout: config.connect_timeout,
        })
    }

    async fn open(&self) -> Result<RconSession, ConnectionError> {
        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|source| ConnectionError::Refused {
                target: self.address.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;

        let mut session = RconSession {
            stream,
            target: self.address.clone(),
            next_id: 1,
        };
        session.authenticate(&self.password).await?;
        Ok(session)
    }
}

impl Connector for RconConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn Session>, ConnectionError>> {
        Box::pin(async move {
            let session = tokio::time::timeout(self.connect_timeout, self.open())
                .await
                .map_err(|_| ConnectionError::ConnectTimeout {
                    target: self.address.clone(),
                    timeout_ms: self.connect_timeout.as_millis() as u64,
                })??;
            info!(target_addr = %self.address, "RCON session established");
            Ok(Box::new(session) as Box<dyn Session>)
        })
    }

    fn target(&self) -> String {
        self.address.clone()
    }
}

/// An authenticated RCON connection.
#[derive(Debug)]
pub struct RconSession {
    stream: TcpStream,
    target: String,
    next_id: i32,
}

impl RconSession {
    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        // Stay positive; -1 is reserved for auth failure.
        self.next_id = if self.next_id == i32::MAX {
            1
        } else {
            self.next_id + 1
        };
        id
    }

    async fn authenticate(&mut self, password: &str) -> Result<(), ConnectionError> {
        let id = self.allocate_id();
        packet::write_packet(&mut self.stream, &Packet::new(id, TYPE_AUTH, password)).await?;

        loop {
            let reply = packet::read_packet(&mut self.stream).await?;
            if reply.kind != TYPE_AUTH_RESPONSE {
                // Some servers send an empty RESPONSE_VALUE before the auth result.
                continue;
            }
            if reply.id == AUTH_FAILED_ID {
                return Err(ConnectionError::AuthenticationFailed {
                    target: self.target.clone(),
                });
            }
            if reply.id == id {
                debug!(target_addr = %self.target, "RCON authentication accepted");
                return Ok(());
            }
        }
    }

    async fn exchange(&mut self, command: &str) -> Result<String, ConnectionError> {
        if command.len() > packet::MAX_REQUEST_BODY {
            return Err(ConnectionError::Protocol(format!(
                "command is {} bytes, limit is {}",
                command.len(),
                packet::MAX_REQUEST_BODY
            )));
        }

        let id = self.allocate_id();
        packet::write_packet(&mut self.stream, &Packet::new(id, TYPE_EXEC_COMMAND, command))
            .await?;

        loop {
            let reply = packet::read_packet(&mut self.stream).await?;
            if reply.id == AUTH_FAILED_ID {
                return Err(ConnectionError::AuthenticationFailed {
                    target: self.target.clone(),
                });
            }
            if reply.id == id {
                return Ok(reply.body);
            }
            debug!(
                expected = id,
                received = reply.id,
                "Discarding stale RCON response"
            );
        }
    }
}

impl Session for RconSession {
    fn send<'a>(
        &'a mut self,
        command: &'a str,
    ) -> BoxFuture<'a, Result<String, ConnectionError>> {
        Box::pin(self.exchange(command))
    }
}
