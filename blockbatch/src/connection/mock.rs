//! In-process scripted server.
//!
//! `MockConnector` implements [`Connector`] without any networking. A handler
//! closure maps each command to a [`MockReply`], and every command sent is
//! recorded for later assertions. [`SimulatedServer`] provides a small game
//! server emulation (fills, gamerules, block tests) for callers that just
//! need plausible responses.
//!
//! # Example
//!
//! ```
//! use blockbatch::connection::mock::{MockConnector, MockReply};
//!
//! let connector = MockConnector::new(|cmd| {
//!     if cmd.starts_with("fill") {
//!         MockReply::text("Successfully filled 8 blocks")
//!     } else {
//!         MockReply::Reset
//!     }
//! });
//! assert_eq!(connector.connect_count(), 0);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{BoxFuture, ConnectionError, Connector, Session};
use crate::coord::{BlockPos, Bounds};

/// Scripted outcome for one command.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Respond immediately with this text.
    Text(String),
    /// Respond with this text after a delay.
    Delayed(Duration, String),
    /// Fail with a connection reset.
    Reset,
    /// Never respond.
    Hang,
}

impl MockReply {
    pub fn text(body: impl Into<String>) -> Self {
        MockReply::Text(body.into())
    }
}

type Handler = dyn Fn(&str) -> MockReply + Send + Sync;

#[derive(Default)]
struct Counters {
    connects: AtomicUsize,
    refuse_remaining: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Scripted connector for tests.
pub struct MockConnector {
    handler: Arc<Handler>,
    sent: Arc<Mutex<Vec<String>>>,
    counters: Arc<Counters>,
    reject_auth: AtomicBool,
}

impl std::fmt::Debug for MockConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnector")
            .field("sent", &self.sent.lock().len())
            .field("connects", &self.connect_count())
            .finish_non_exhaustive()
    }
}

impl MockConnector {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str) -> MockReply + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            sent: Arc::new(Mutex::new(Vec::new())),
            counters: Arc::new(Counters::default()),
            reject_auth: AtomicBool::new(false),
        }
    }

    /// Connector backed by a fresh [`SimulatedServer`].
    pub fn simulated() -> Self {
        let server = Arc::new(SimulatedServer::new());
        Self::new(move |cmd| server.respond(cmd))
    }

    /// Refuse the first `n` connection attempts.
    pub fn refusing_first(self, n: usize) -> Self {
        self.counters.refuse_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Reject every authentication attempt.
    pub fn rejecting_auth(self) -> Self {
        self.reject_auth.store(true, Ordering::SeqCst);
        self
    }

    /// Every command sent so far, in order.
    pub fn sent_commands(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Number of sent commands starting with `prefix`.
    pub fn count_sent(&self, prefix: &str) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Number of successful connects.
    pub fn connect_count(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }

    /// Highest number of commands observed in flight at once.
    pub fn max_concurrent_sends(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn Session>, ConnectionError>> {
        Box::pin(async move {
            let refused = self
                .counters
                .refuse_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if refused {
                return Err(ConnectionError::Refused {
                    target: self.target(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "connection refused",
                    ),
                });
            }
            if self.reject_auth.load(Ordering::SeqCst) {
                return Err(ConnectionError::AuthenticationFailed {
                    target: self.target(),
                });
            }

            self.counters.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockSession {
                handler: Arc::clone(&self.handler),
                sent: Arc::clone(&self.sent),
                counters: Arc::clone(&self.counters),
            }) as Box<dyn Session>)
        })
    }

    fn target(&self) -> String {
        "mock".to_string()
    }
}

struct MockSession {
    handler: Arc<Handler>,
    sent: Arc<Mutex<Vec<String>>>,
    counters: Arc<Counters>,
}

struct InFlight<'a>(&'a Counters);

impl<'a> InFlight<'a> {
    fn enter(counters: &'a Counters) -> Self {
        let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Session for MockSession {
    fn send<'a>(
        &'a mut self,
        command: &'a str,
    ) -> BoxFuture<'a, Result<String, ConnectionError>> {
        Box::pin(async move {
            self.sent.lock().push(command.to_string());
            let _guard = InFlight::enter(&self.counters);

            match (self.handler)(command) {
                MockReply::Text(body) => {
                    tokio::task::yield_now().await;
                    Ok(body)
                }
                MockReply::Delayed(delay, body) => {
                    tokio::time::sleep(delay).await;
                    Ok(body)
                }
                MockReply::Reset => Err(ConnectionError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                ))),
                MockReply::Hang => {
                    std::future::pending::<()>().await;
                    Err(ConnectionError::Closed)
                }
            }
        })
    }
}

/// Minimal game server emulation.
///
/// Understands `fill` (including the block limit), `gamerule` queries and
/// updates, `execute if block` probes, and `list`. Filled regions are not
/// remembered, so block probes always fail.
#[derive(Debug)]
pub struct SimulatedServer {
    max_fill: u64,
    gamerules: Mutex<HashMap<String, String>>,
}

impl Default for SimulatedServer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedServer {
    pub fn new() -> Self {
        Self::with_fill_limit(32_768)
    }

    pub fn with_fill_limit(max_fill: u64) -> Self {
        Self {
            max_fill,
            gamerules: Mutex::new(HashMap::new()),
        }
    }

    pub fn respond(&self, command: &str) -> MockReply {
        let mut parts = command.split_whitespace();
        match parts.next() {
            Some("fill") => match parse_fill_bounds(command) {
                Some(bounds) if bounds.volume() > self.max_fill => MockReply::text(format!(
                    "Too many blocks in the specified area (maximum {}, specified {})",
                    self.max_fill,
                    bounds.volume()
                )),
                Some(bounds) => MockReply::text(fill_response(bounds.volume())),
                None => MockReply::text("Incorrect argument for command<--[HERE]"),
            },
            Some("gamerule") => {
                let key = parts.next();
                let value = parts.next();
                let mut rules = self.gamerules.lock();
                match (key, value) {
                    (Some(key), Some(value)) => {
                        rules.insert(key.to_string(), value.to_string());
                        MockReply::text(format!("Gamerule {key} is now set to: {value}"))
                    }
                    (Some(key), None) => {
                        let value = rules.get(key).map(String::as_str).unwrap_or("true");
                        MockReply::text(format!("Gamerule {key} is currently set to: {value}"))
                    }
                    _ => MockReply::text("Unknown or incomplete command, see below for error"),
                }
            }
            Some("execute") => MockReply::text("Test failed"),
            Some("list") => MockReply::text("There are 0 of a max of 20 players online: "),
            _ => MockReply::text("Unknown or incomplete command, see below for error<--[HERE]"),
        }
    }
}

/// Server text for a successful fill of `count` blocks.
pub fn fill_response(count: u64) -> String {
    if count == 1 {
        "Successfully filled 1 block".to_string()
    } else {
        format!("Successfully filled {count} blocks")
    }
}

/// Parse the region of a `fill x1 y1 z1 x2 y2 z2 <block> ...` command.
pub fn parse_fill_bounds(command: &str) -> Option<Bounds> {
    let mut parts = command.split_whitespace();
    if parts.next()? != "fill" {
        return None;
    }
    let mut coords = [0i32; 6];
    for slot in coords.iter_mut() {
        *slot = parts.next()?.parse().ok()?;
    }
    Some(Bounds::spanning(
        BlockPos::new(coords[0], coords[1], coords[2]),
        BlockPos::new(coords[3], coords[4], coords[5]),
    ))
}
