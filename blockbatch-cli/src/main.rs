//! blockbatch CLI - Command-line interface
//!
//! Runs batched region edits against an RCON game server.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::clear::ClearArgs;
use commands::exec::{ConnectArgs, FillArgs};
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "blockbatch")]
#[command(version = blockbatch::VERSION)]
#[command(about = "Batched region edits for RCON game servers", long_about = None)]
struct Cli {
    /// Config file (default: ~/.blockbatch/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// RCON password (overrides the config file)
    #[arg(long, global = true, env = "BLOCKBATCH_RCON_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Run one raw server command
    Exec {
        /// The command, e.g. "list" or "time set day"
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },

    /// Fill a region, splitting it to fit the server's limit
    Fill {
        /// Both corners and the block id, e.g. 0 60 0 15 64 15 minecraft:stone
        #[arg(
            num_args = 7,
            value_names = ["X1", "Y1", "Z1", "X2", "Y2", "Z2", "BLOCK"],
            allow_negative_numbers = true
        )]
        region: Vec<String>,

        /// Only replace blocks matching this filter
        #[arg(long)]
        replace: Option<String>,

        /// Skip sub-regions that already hold the block
        #[arg(long)]
        smart: bool,
    },

    /// Check that a gamerule holds a value
    Verify { key: String, expected: String },

    /// Set a gamerule
    Set { key: String, value: String },

    /// Clear a region chunk by chunk
    Clear {
        #[arg(long, allow_negative_numbers = true)]
        x_min: Option<i32>,
        #[arg(long, allow_negative_numbers = true)]
        z_min: Option<i32>,
        #[arg(long, allow_negative_numbers = true)]
        x_max: Option<i32>,
        #[arg(long, allow_negative_numbers = true)]
        z_max: Option<i32>,

        /// Chunk side length (default: adaptive)
        #[arg(long)]
        chunk_size: Option<u32>,

        /// Concurrent chunk workers
        #[arg(long)]
        workers: Option<usize>,

        /// Record progress here and resume from it
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Refill the ground layer after clearing
        #[arg(long)]
        preserve_terrain: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::Init { force } = cli.command {
        return commands::init::run(cli.config.as_deref(), force);
    }

    let runner = CliRunner::new(cli.config.as_deref(), cli.debug)?;
    let connect = ConnectArgs {
        password: cli.password,
        json: cli.json,
    };

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Exec { command } => {
            commands::exec::run_exec(runner, connect, &command.join(" "))
        }
        Commands::Fill {
            region,
            replace,
            smart,
        } => {
            let (from, to, block) = parse_region(&region)?;
            let fill = FillArgs {
                from,
                to,
                block,
                replace,
                smart,
            };
            commands::exec::run_fill(runner, connect, fill)
        }
        Commands::Verify { key, expected } => {
            commands::exec::run_verify(runner, connect, &key, &expected)
        }
        Commands::Set { key, value } => commands::exec::run_set(runner, connect, &key, &value),
        Commands::Clear {
            x_min,
            z_min,
            x_max,
            z_max,
            chunk_size,
            workers,
            checkpoint,
            preserve_terrain,
        } => {
            let args = ClearArgs {
                x_min,
                z_min,
                x_max,
                z_max,
                chunk_size,
                workers,
                checkpoint,
                preserve_terrain,
            };
            commands::clear::run(runner, connect, args)
        }
    }
}

/// Split `X1 Y1 Z1 X2 Y2 Z2 BLOCK` into corners and block id.
fn parse_region(values: &[String]) -> Result<([i32; 3], [i32; 3], String), CliError> {
    let [coords @ .., block] = values else {
        return Err(CliError::Usage("fill needs six coordinates and a block".to_string()));
    };
    if coords.len() != 6 {
        return Err(CliError::Usage("fill needs six coordinates and a block".to_string()));
    }

    let mut parsed = [0i32; 6];
    for (slot, raw) in parsed.iter_mut().zip(coords) {
        *slot = raw
            .parse()
            .map_err(|_| CliError::Usage(format!("'{}' is not a block coordinate", raw)))?;
    }
    Ok((
        [parsed[0], parsed[1], parsed[2]],
        [parsed[3], parsed[4], parsed[5]],
        block.clone(),
    ))
}
