//! Single-command subcommands: exec, fill, verify, set.

use blockbatch::coord::{BlockPos, Bounds};
use blockbatch::executor::{CommandError, CommandResult, ErrorKind, FillOptions};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Shared connection arguments.
pub struct ConnectArgs {
    pub password: Option<String>,
    pub json: bool,
}

/// Arguments for the fill command.
pub struct FillArgs {
    pub from: [i32; 3],
    pub to: [i32; 3],
    pub block: String,
    pub replace: Option<String>,
    pub smart: bool,
}

impl FillArgs {
    fn bounds(&self) -> Bounds {
        Bounds::spanning(
            BlockPos::new(self.from[0], self.from[1], self.from[2]),
            BlockPos::new(self.to[0], self.to[1], self.to[2]),
        )
    }

    fn options(&self) -> FillOptions {
        match &self.replace {
            Some(filter) => FillOptions::replace(filter.clone()),
            None if self.smart => FillOptions::smart(),
            None => FillOptions::default(),
        }
    }
}

/// Run one raw command.
pub fn run_exec(runner: CliRunner, args: ConnectArgs, command: &str) -> Result<(), CliError> {
    runner.log_startup("exec");
    let executor = runner.executor(args.password)?;
    let result = runner.runtime()?.block_on(async {
        let result = executor.execute_command(command).await;
        executor.close().await;
        result
    });
    finish(&result, args.json)
}

/// Fill a region, splitting it as needed.
pub fn run_fill(runner: CliRunner, args: ConnectArgs, fill: FillArgs) -> Result<(), CliError> {
    runner.log_startup("fill");
    let executor = runner.executor(args.password)?;
    let bounds = fill.bounds();
    let options = fill.options();

    let (result, stats) = runner.runtime()?.block_on(async {
        let result = executor.execute_fill(&bounds, &fill.block, &options).await;
        executor.close().await;
        (result, executor.get_performance_stats())
    });

    if !args.json {
        println!(
            "{} sub-command(s), {} skipped, {} failed",
            result.sub_commands, result.skipped_sub_commands, result.failed_sub_commands
        );
        println!("{}", stats);
    }
    finish(&result, args.json)
}

/// Check that a state flag holds a value.
pub fn run_verify(
    runner: CliRunner,
    args: ConnectArgs,
    key: &str,
    expected: &str,
) -> Result<(), CliError> {
    runner.log_startup("verify");
    let executor = runner.executor(args.password)?;
    let holds = runner.runtime()?.block_on(async {
        let holds = executor.verify_state(key, expected).await;
        executor.close().await;
        holds
    });

    if args.json {
        println!(
            "{}",
            serde_json::json!({ "key": key, "expected": expected, "matches": holds })
        );
    } else if holds {
        println!("{} = {}", key, expected);
    }
    if holds {
        Ok(())
    } else {
        Err(CliError::StateMismatch {
            key: key.to_string(),
            expected: expected.to_string(),
        })
    }
}

/// Set a state flag.
pub fn run_set(
    runner: CliRunner,
    args: ConnectArgs,
    key: &str,
    value: &str,
) -> Result<(), CliError> {
    runner.log_startup("set");
    let executor = runner.executor(args.password)?;
    let result = runner.runtime()?.block_on(async {
        let result = executor.set_state(key, value).await;
        executor.close().await;
        result
    });
    finish(&result, args.json)
}

/// Print a result and map failure to an error.
fn finish(result: &CommandResult, json: bool) -> Result<(), CliError> {
    if json {
        match serde_json::to_string_pretty(result) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Could not serialize result: {}", e),
        }
    } else if !result.response.is_empty() {
        println!("{}", result.response);
    } else if result.success {
        println!("OK ({} elements affected)", result.elements_affected);
    }

    if result.success {
        return Ok(());
    }
    Err(CliError::Command(result.error.clone().unwrap_or_else(|| {
        CommandError::new(ErrorKind::ExecutionFailed, "command failed")
    })))
}
