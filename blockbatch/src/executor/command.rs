//! The command executor: retries, classification and batches.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::aggregate;
use super::classify::{Classification, MinecraftClassifier, ResponseClassifier};
use super::error::{CommandError, ErrorKind};
use super::result::CommandResult;
use crate::batch::{BatchProfile, DispatchMode, DispatchPolicy, OperationKind};
use crate::config::defaults::*;
use crate::config::ConfigError;
use crate::connection::packet::MAX_REQUEST_BODY;
use crate::connection::{
    ConnectionConfig, ConnectionError, ConnectionPool, Connector, RconConnector,
};
use crate::state::StateCache;
use crate::throughput::{PerformanceStats, ThroughputConfig, ThroughputController};

/// Executor tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Time allowed for one response.
    pub command_timeout: Duration,
    /// Total attempts per command, first attempt included.
    pub max_retries: u32,
    /// Delay before attempt `n + 1` is `retry_backoff × n`.
    pub retry_backoff: Duration,
    pub max_elements_per_command: u64,
    pub pool_size: usize,
    /// Whether the server tolerates concurrent fills.
    pub concurrent_fills: bool,
    /// Whether the server tolerates concurrent independent commands.
    pub concurrent_commands: bool,
    /// How long a verified state flag is trusted.
    pub state_ttl: Duration,
    pub throughput: ThroughputConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            max_elements_per_command: DEFAULT_MAX_ELEMENTS_PER_COMMAND,
            pool_size: DEFAULT_POOL_SIZE,
            concurrent_fills: false,
            concurrent_commands: false,
            state_ttl: Duration::from_secs(DEFAULT_STATE_TTL_SECS),
            throughput: ThroughputConfig::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "executor.command_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "executor.max_retries",
                reason: "must allow at least one attempt".to_string(),
            });
        }
        if self.max_elements_per_command == 0 {
            return Err(ConfigError::InvalidValue {
                field: "executor.max_elements_per_command",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "executor.pool_size",
                reason: "must be at least 1".to_string(),
            });
        }
        self.throughput.validate()
    }

    pub(super) fn dispatch_policy(&self) -> DispatchPolicy {
        DispatchPolicy {
            pool_size: self.pool_size,
            concurrent_fills: self.concurrent_fills,
            concurrent_commands: self.concurrent_commands,
        }
    }
}

/// Sends commands to the server and turns every outcome into a
/// [`CommandResult`].
///
/// # Retry semantics
///
/// Transport failures (refused connect, reset, protocol garbage) and
/// response timeouts are retried up to `max_retries` total attempts with a
/// linear backoff. Authentication rejections and server-reported failures
/// are returned as-is. `CommandResult::retries` is the number of additional
/// attempts made, so a command that succeeds on attempt `k` reports `k − 1`.
///
/// # Example
///
/// ```ignore
/// let executor = CommandExecutor::new(ExecutorConfig::default(), connector)?;
/// let result = executor.execute_command("list").await;
/// if !result.success {
///     eprintln!("{}", result.error.unwrap().user_message());
/// }
/// ```
pub struct CommandExecutor {
    pub(super) config: ExecutorConfig,
    pool: ConnectionPool,
    pub(super) classifier: Arc<dyn ResponseClassifier>,
    pub(super) controller: Arc<ThroughputController>,
    cache: StateCache,
    pub(super) dispatch: DispatchPolicy,
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl CommandExecutor {
    /// Create an executor over any connector.
    ///
    /// Fails immediately on invalid configuration.
    pub fn new(config: ExecutorConfig, connector: Arc<dyn Connector>) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = ConnectionPool::new(connector, config.pool_size);
        let controller = Arc::new(ThroughputController::new(config.throughput.clone()));
        let cache = StateCache::new(config.state_ttl);
        let dispatch = config.dispatch_policy();

        Ok(Self {
            config,
            pool,
            classifier: Arc::new(MinecraftClassifier),
            controller,
            cache,
            dispatch,
        })
    }

    /// Create an executor talking RCON over TCP.
    ///
    /// Fails immediately when the secret is missing or a value is invalid.
    pub fn connect(
        connection: &ConnectionConfig,
        config: ExecutorConfig,
    ) -> Result<Self, ConfigError> {
        let connector = RconConnector::from_config(connection)?;
        Self::new(config, Arc::new(connector))
    }

    /// Replace the response classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn ResponseClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Share a throughput controller with other executors.
    pub fn with_controller(mut self, controller: Arc<ThroughputController>) -> Self {
        self.controller = controller;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn controller(&self) -> &Arc<ThroughputController> {
        &self.controller
    }

    pub fn state_cache(&self) -> &StateCache {
        &self.cache
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn get_performance_stats(&self) -> PerformanceStats {
        self.controller.stats()
    }

    /// Close every connection. Later commands fail with `ConnectionLost`.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Execute one raw command.
    pub async fn execute_command(&self, command: &str) -> CommandResult {
        let command = command.trim();
        if command.is_empty() {
            return CommandResult::rejected(command, "command is empty");
        }
        if command.contains('\0') {
            return CommandResult::rejected(command, "command contains a NUL byte");
        }
        if command.len() > MAX_REQUEST_BODY {
            return CommandResult::rejected(
                command,
                format!(
                    "command is {} bytes, the server accepts at most {}",
                    command.len(),
                    MAX_REQUEST_BODY
                ),
            );
        }
        self.run(command).await
    }

    /// Send a validated command with retries and classify the response.
    pub(super) async fn run(&self, command: &str) -> CommandResult {
        let attempts = self.config.max_retries.max(1);
        let mut attempt = 1;

        loop {
            let started = Instant::now();
            match self.attempt(command).await {
                Ok(response) => {
                    debug!(
                        command,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Command answered"
                    );
                    return match self.classifier.classify(command, &response) {
                        Classification::Success { elements } => CommandResult::succeeded(
                            command,
                            response,
                            elements.unwrap_or(0),
                            attempt - 1,
                        ),
                        Classification::Failure(error) => {
                            warn!(command, kind = %error.kind, response = %response, "Command failed");
                            CommandResult::failed(command, error, response, attempt - 1)
                        }
                    };
                }
                Err(e) if !e.is_retryable() || attempt >= attempts => {
                    warn!(command, attempt, error = %e, "Command failed after retries");
                    return CommandResult::failed(
                        command,
                        CommandError::from(&e),
                        String::new(),
                        attempt - 1,
                    );
                }
                Err(e) => {
                    let delay = self.config.retry_backoff * attempt;
                    warn!(
                        command,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying command"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, command: &str) -> Result<String, ConnectionError> {
        let mut session = self.pool.acquire().await?;
        match tokio::time::timeout(self.config.command_timeout, session.send(command)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::ResponseTimeout {
                timeout_ms: self.config.command_timeout.as_millis() as u64,
            }),
        }
    }

    /// Execute a list of raw commands as one batch.
    ///
    /// Commands run in order unless `independent` is set and the server
    /// tolerates concurrent commands. A dependent batch stops at the first
    /// failure; the commands after it are reported as failed without being
    /// sent.
    pub async fn execute_batch(&self, commands: &[String], independent: bool) -> CommandResult {
        let label = format!("batch of {} commands", commands.len());
        let mode = self.dispatch.decide(&BatchProfile {
            operation: OperationKind::Command,
            sub_commands: commands.len(),
            dependent: !independent,
        });
        info!(commands = commands.len(), mode = ?mode, "Executing command batch");

        let results = match mode {
            DispatchMode::Sequential => {
                let mut results = Vec::with_capacity(commands.len());
                let mut halted = false;
                for command in commands {
                    if halted {
                        results.push(CommandResult::failed(
                            command.as_str(),
                            CommandError::new(
                                ErrorKind::ExecutionFailed,
                                "not sent: an earlier command in the batch failed",
                            ),
                            String::new(),
                            0,
                        ));
                        continue;
                    }
                    let result = self.execute_command(command).await;
                    halted = !independent && !result.success;
                    results.push(result);
                }
                results
            }
            DispatchMode::Parallel { max_in_flight } => {
                stream::iter(commands.iter().cloned())
                    .map(|command| async move { self.execute_command(&command).await }.boxed())
                    .buffered(max_in_flight)
                    .collect()
                    .await
            }
        };

        aggregate::merge(label, results)
    }

    /// Check that state flag `key` holds `expected`.
    ///
    /// Answers from the cache when the last observation is within the TTL;
    /// otherwise issues one `gamerule <key>` query. Any failure yields
    /// `false`.
    pub async fn verify_state(&self, key: &str, expected: &str) -> bool {
        if !is_state_token(key) {
            warn!(key, "Invalid state key");
            return false;
        }
        self.cache
            .verify(key, expected, || async {
                let result = self.execute_command(&format!("gamerule {key}")).await;
                if !result.success {
                    return Err(result.error.unwrap_or_else(|| {
                        CommandError::new(ErrorKind::ExecutionFailed, "state query failed")
                    }));
                }
                self.classifier
                    .parse_state_value(key, &result.response)
                    .ok_or_else(|| {
                        CommandError::new(
                            ErrorKind::ExecutionFailed,
                            format!("unrecognised state response: {}", result.response),
                        )
                    })
            })
            .await
    }

    /// Set state flag `key` to `value`, refreshing the cache on success.
    pub async fn set_state(&self, key: &str, value: &str) -> CommandResult {
        let command = format!("gamerule {key} {value}");
        if !is_state_token(key) || !is_state_token(value) {
            return CommandResult::rejected(command, "state key and value must be single words");
        }

        let result = self.execute_command(&command).await;
        if result.success {
            self.cache.record(key, value).await;
        } else {
            self.cache.invalidate(key).await;
        }
        result
    }
}

fn is_state_token(token: &str) -> bool {
    !token.is_empty() && !token.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::mock::{MockConnector, MockReply};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn executor(connector: Arc<MockConnector>, config: ExecutorConfig) -> CommandExecutor {
        CommandExecutor::new(config, connector).unwrap()
    }

    fn fast_retries() -> ExecutorConfig {
        ExecutorConfig {
            retry_backoff: Duration::from_millis(1),
            ..ExecutorConfig::default()
        }
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let connector = Arc::new(MockConnector::simulated());
        let config = ExecutorConfig {
            max_retries: 0,
            ..ExecutorConfig::default()
        };
        assert!(matches!(
            CommandExecutor::new(config, connector),
            Err(ConfigError::InvalidValue {
                field: "executor.max_retries",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let err = CommandExecutor::connect(&ConnectionConfig::default(), ExecutorConfig::default())
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingSecret);
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let connector = Arc::new(MockConnector::simulated());
        let executor = executor(connector.clone(), fast_retries());

        let result = executor.execute_command("list").await;
        assert!(result.success);
        assert_eq!(result.retries, 0);
        assert!(result.response.contains("players online"));
    }

    #[tokio::test]
    async fn test_success_on_attempt_k_reports_k_minus_one_retries() {
        for k in 1..=3usize {
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&calls);
            let connector = Arc::new(MockConnector::new(move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) + 1 < k {
                    MockReply::Reset
                } else {
                    MockReply::text("ok")
                }
            }));
            let executor = executor(connector.clone(), fast_retries());

            let result = executor.execute_command("list").await;
            assert!(result.success, "attempt {k}");
            assert_eq!(result.retries, (k - 1) as u32);
            assert_eq!(connector.count_sent("list"), k);
        }
    }

    #[tokio::test]
    async fn test_exhausted_retries_yield_structured_failure() {
        let connector = Arc::new(MockConnector::new(|_| MockReply::Reset));
        let executor = executor(connector.clone(), fast_retries());

        let result = executor.execute_command("list").await;
        assert!(!result.success);
        assert_eq!(result.retries, 2);
        assert_eq!(result.error_kind(), Some(ErrorKind::ConnectionLost));
        assert_eq!(connector.count_sent("list"), 3);
    }

    #[tokio::test]
    async fn test_refused_connection_retried() {
        let connector = Arc::new(MockConnector::simulated().refusing_first(2));
        let executor = executor(connector.clone(), fast_retries());

        let result = executor.execute_command("list").await;
        assert!(result.success);
        assert_eq!(result.retries, 2);
    }

    #[tokio::test]
    async fn test_refused_connection_exhausted() {
        let connector = Arc::new(MockConnector::simulated().refusing_first(10));
        let executor = executor(connector, fast_retries());

        let result = executor.execute_command("list").await;
        assert_eq!(result.error_kind(), Some(ErrorKind::ConnectionRefused));
        assert_eq!(result.retries, 2);
    }

    #[tokio::test]
    async fn test_auth_failure_not_retried() {
        let connector = Arc::new(MockConnector::simulated().rejecting_auth());
        let executor = executor(connector, fast_retries());

        let result = executor.execute_command("list").await;
        assert_eq!(result.error_kind(), Some(ErrorKind::AuthenticationFailed));
        assert_eq!(result.retries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_retried_then_reported() {
        let connector = Arc::new(MockConnector::new(|_| MockReply::Hang));
        let config = ExecutorConfig {
            command_timeout: Duration::from_secs(5),
            retry_backoff: Duration::from_secs(1),
            ..ExecutorConfig::default()
        };
        let executor = executor(connector.clone(), config);

        let started = Instant::now();
        let result = executor.execute_command("list").await;

        assert_eq!(result.error_kind(), Some(ErrorKind::CommandTimeout));
        assert_eq!(result.retries, 2);
        // 3 × 5s timeouts + 1s + 2s backoff
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(18) && elapsed < Duration::from_secs(19));
        // Each abandoned request forces a fresh session.
        assert_eq!(connector.connect_count(), 3);
    }

    #[tokio::test]
    async fn test_server_failure_not_retried() {
        let connector = Arc::new(MockConnector::simulated());
        let executor = executor(connector.clone(), fast_retries());

        let result = executor.execute_command("frobnicate").await;
        assert_eq!(result.error_kind(), Some(ErrorKind::InvalidCommand));
        assert_eq!(result.retries, 0);
        assert_eq!(connector.count_sent("frobnicate"), 1);
    }

    #[tokio::test]
    async fn test_malformed_input_rejected_before_dispatch() {
        let connector = Arc::new(MockConnector::simulated());
        let executor = executor(connector.clone(), fast_retries());

        let empty = executor.execute_command("   ").await;
        assert_eq!(empty.error_kind(), Some(ErrorKind::InvalidCommand));
        assert_eq!(empty.retries, 0);

        let oversized = executor.execute_command(&"say x".repeat(400)).await;
        assert_eq!(oversized.error_kind(), Some(ErrorKind::InvalidCommand));

        let smuggled = executor
            .execute_command("say hi\0fill 0 0 0 1 1 1 minecraft:tnt")
            .await;
        assert_eq!(smuggled.error_kind(), Some(ErrorKind::InvalidCommand));

        let via_state = executor.set_state("doFireTick\0", "false").await;
        assert_eq!(via_state.error_kind(), Some(ErrorKind::InvalidCommand));

        assert!(connector.sent_commands().is_empty());
        assert_eq!(connector.connect_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_state_cached_within_ttl() {
        let connector = Arc::new(MockConnector::simulated());
        let executor = executor(connector.clone(), fast_retries());

        assert!(executor.verify_state("doTileDrops", "true").await);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(executor.verify_state("doTileDrops", "true").await);
        assert_eq!(connector.count_sent("gamerule doTileDrops"), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(executor.verify_state("doTileDrops", "true").await);
        assert_eq!(connector.count_sent("gamerule doTileDrops"), 2);
    }

    #[tokio::test]
    async fn test_verify_state_failure_is_false() {
        let connector = Arc::new(MockConnector::new(|_| MockReply::Reset));
        let executor = executor(connector, fast_retries());

        assert!(!executor.verify_state("doTileDrops", "true").await);
        assert!(!executor.verify_state("two words", "true").await);
    }

    #[tokio::test]
    async fn test_set_state_refreshes_cache() {
        let connector = Arc::new(MockConnector::simulated());
        let executor = executor(connector.clone(), fast_retries());

        let result = executor.set_state("doTileDrops", "false").await;
        assert!(result.success);
        assert!(executor.verify_state("doTileDrops", "false").await);
        // Answered from the cache; no query was sent.
        assert_eq!(connector.count_sent("gamerule doTileDrops"), 1);
    }

    #[tokio::test]
    async fn test_dependent_batch_halts_on_failure() {
        let connector = Arc::new(MockConnector::simulated());
        let executor = executor(connector.clone(), fast_retries());

        let commands = vec![
            "gamerule doTileDrops false".to_string(),
            "frobnicate".to_string(),
            "list".to_string(),
        ];
        let result = executor.execute_batch(&commands, false).await;

        assert!(!result.success);
        assert_eq!(result.sub_commands, 3);
        assert_eq!(result.failed_sub_commands, 2);
        assert_eq!(result.error_kind(), Some(ErrorKind::InvalidCommand));
        assert_eq!(connector.count_sent("list"), 0);
    }

    #[tokio::test]
    async fn test_independent_batch_runs_in_parallel_when_allowed() {
        let connector = Arc::new(MockConnector::new(|_| {
            MockReply::Delayed(Duration::from_millis(20), "ok".to_string())
        }));
        let config = ExecutorConfig {
            pool_size: 3,
            concurrent_commands: true,
            ..fast_retries()
        };
        let executor = executor(connector.clone(), config);

        let commands: Vec<String> = (0..6).map(|i| format!("say {i}")).collect();
        let result = executor.execute_batch(&commands, true).await;

        assert!(result.success);
        assert_eq!(result.sub_commands, 6);
        assert!(connector.max_concurrent_sends() > 1);
        assert!(connector.max_concurrent_sends() <= 3);
    }

    #[tokio::test]
    async fn test_parallel_batch_runs_on_spawned_task() {
        let connector = Arc::new(MockConnector::new(|_| MockReply::text("ok")));
        let config = ExecutorConfig {
            pool_size: 2,
            concurrent_commands: true,
            ..fast_retries()
        };
        let executor = Arc::new(executor(connector, config));

        let commands: Vec<String> = (0..4).map(|i| format!("say {i}")).collect();
        let task = tokio::spawn({
            let executor = Arc::clone(&executor);
            async move { executor.execute_batch(&commands, true).await }
        });

        let result = task.await.unwrap();
        assert!(result.success);
        assert_eq!(result.sub_commands, 4);
    }

    #[tokio::test]
    async fn test_independent_batch_sequential_when_not_tolerated() {
        let connector = Arc::new(MockConnector::new(|_| {
            MockReply::Delayed(Duration::from_millis(5), "ok".to_string())
        }));
        let config = ExecutorConfig {
            pool_size: 3,
            ..fast_retries()
        };
        let executor = executor(connector.clone(), config);

        let commands: Vec<String> = (0..4).map(|i| format!("say {i}")).collect();
        let result = executor.execute_batch(&commands, true).await;

        assert!(result.success);
        assert_eq!(connector.max_concurrent_sends(), 1);
        assert_eq!(
            connector.sent_commands(),
            vec!["say 0", "say 1", "say 2", "say 3"]
        );
    }
}
