//! Integration tests against a local TCP RCON server.
//!
//! These tests exercise the real connector end to end:
//! - authentication success and rejection
//! - command round trips through the pool and classifier
//! - a small region clear over the wire
//!
//! Run with: `cargo test --test rcon_integration`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use blockbatch::clear::{format_report, ClearConfig, RegionClearer};
use blockbatch::connection::mock::{MockReply, SimulatedServer};
use blockbatch::connection::packet::{
    read_packet, write_packet, Packet, AUTH_FAILED_ID, TYPE_AUTH, TYPE_AUTH_RESPONSE,
    TYPE_RESPONSE_VALUE,
};
use blockbatch::connection::ConnectionConfig;
use blockbatch::coord::{Area, BlockPos, Bounds, YRange};
use blockbatch::executor::{CommandExecutor, ErrorKind, ExecutorConfig, FillOptions};

// ============================================================================
// Test Server
// ============================================================================

const PASSWORD: &str = "hunter2";

/// Local RCON server backed by a [`SimulatedServer`].
struct TestServer {
    port: u16,
    connections: Arc<AtomicUsize>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let connections = Arc::new(AtomicUsize::new(0));
        let game = Arc::new(SimulatedServer::new());

        let counter = Arc::clone(&connections);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(stream, Arc::clone(&game)));
            }
        });

        Self { port, connections }
    }

    fn connection_config(&self, password: &str) -> ConnectionConfig {
        ConnectionConfig {
            host: "127.0.0.1".to_string(),
            port: self.port,
            password: Some(password.to_string()),
            connect_timeout: Duration::from_secs(2),
        }
    }

    fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

async fn serve(mut stream: TcpStream, game: Arc<SimulatedServer>) {
    let mut authenticated = false;
    while let Ok(request) = read_packet(&mut stream).await {
        let reply = if request.kind == TYPE_AUTH {
            authenticated = request.body == PASSWORD;
            let id = if authenticated { request.id } else { AUTH_FAILED_ID };
            Packet::new(id, TYPE_AUTH_RESPONSE, "")
        } else if !authenticated {
            Packet::new(AUTH_FAILED_ID, TYPE_RESPONSE_VALUE, "")
        } else {
            let body = match game.respond(&request.body) {
                MockReply::Text(body) | MockReply::Delayed(_, body) => body,
                MockReply::Reset | MockReply::Hang => return,
            };
            Packet::new(request.id, TYPE_RESPONSE_VALUE, body)
        };
        if write_packet(&mut stream, &reply).await.is_err() {
            return;
        }
    }
}

fn executor_config() -> ExecutorConfig {
    ExecutorConfig {
        command_timeout: Duration::from_secs(2),
        retry_backoff: Duration::from_millis(10),
        ..ExecutorConfig::default()
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

#[tokio::test]
async fn test_command_round_trip() {
    let server = TestServer::start().await;
    let executor =
        CommandExecutor::connect(&server.connection_config(PASSWORD), executor_config()).unwrap();

    let result = executor.execute_command("list").await;
    assert!(result.success, "{:?}", result.error);
    assert!(result.response.contains("players online"));

    let result = executor.execute_command("gamerule doDaylightCycle").await;
    assert!(result.success);

    // One session serves every command.
    assert_eq!(server.connections(), 1);
}

#[tokio::test]
async fn test_wrong_password_is_authentication_failure() {
    let server = TestServer::start().await;
    let executor =
        CommandExecutor::connect(&server.connection_config("wrong"), executor_config()).unwrap();

    let result = executor.execute_command("list").await;
    assert!(!result.success);
    assert_eq!(result.error_kind(), Some(ErrorKind::AuthenticationFailed));
    // Authentication is never retried.
    assert_eq!(result.retries, 0);
    assert_eq!(server.connections(), 1);
}

#[tokio::test]
async fn test_refused_connection_is_retried_then_reported() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ConnectionConfig {
        host: "127.0.0.1".to_string(),
        port,
        password: Some(PASSWORD.to_string()),
        connect_timeout: Duration::from_secs(1),
    };
    let executor = CommandExecutor::connect(&config, executor_config()).unwrap();

    let result = executor.execute_command("list").await;
    assert!(!result.success);
    assert_eq!(result.error_kind(), Some(ErrorKind::ConnectionRefused));
    assert_eq!(result.retries, executor_config().max_retries - 1);
    let message = result.error.unwrap().user_message();
    assert!(message.contains("Suggestions:\n  1. "));
}

#[tokio::test]
async fn test_oversized_fill_split_over_the_wire() {
    let server = TestServer::start().await;
    let executor =
        CommandExecutor::connect(&server.connection_config(PASSWORD), executor_config()).unwrap();

    let region = Bounds::new(BlockPos::new(0, 0, 0), BlockPos::new(39, 39, 39));
    let result = executor
        .execute_fill(&region, "minecraft:stone", &FillOptions::default())
        .await;

    assert!(result.success, "{:?}", result.error);
    assert!(result.sub_commands >= 2);
    assert_eq!(result.elements_affected, 40 * 40 * 40);
}

#[tokio::test]
async fn test_verify_and_set_state() {
    let server = TestServer::start().await;
    let executor =
        CommandExecutor::connect(&server.connection_config(PASSWORD), executor_config()).unwrap();

    assert!(executor.verify_state("doMobSpawning", "true").await);
    let result = executor.set_state("doMobSpawning", "false").await;
    assert!(result.success);
    assert!(executor.verify_state("doMobSpawning", "false").await);
}

#[tokio::test]
async fn test_small_region_clear() {
    let server = TestServer::start().await;
    let executor = Arc::new(
        CommandExecutor::connect(&server.connection_config(PASSWORD), executor_config()).unwrap(),
    );
    let config = ClearConfig {
        clear_y: YRange::new(60, 90),
        chunk_size: Some(32),
        ..ClearConfig::default()
    };
    let clearer = RegionClearer::new(executor, config).unwrap();

    let result = clearer
        .clear_region(&Area::new(0, 0, 63, 63), true)
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.successful_chunks, 4);
    assert_eq!(result.total_blocks_cleared, 64 * 64 * 31);
    assert_eq!(result.total_blocks_restored, 64 * 64 * 4);

    let report = format_report(&result, true);
    assert!(report.starts_with("Region clear completed"));
}
