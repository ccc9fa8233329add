//! CLI for retrier.

mod commands;
mod policy;

use anyhow::Result;
use clap::{Parser, Subcommand};
use retrier_core::config;
use retrier_core::RetryError;

use commands::{run_command, run_config, CommandError};
use policy::PolicyArgs;

/// Top-level CLI for retrier.
#[derive(Debug, Parser)]
#[command(name = "retrier")]
#[command(about = "retrier: re-run a command until it succeeds", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run a command, retrying it on failure according to the retry policy.
    Run {
        #[command(flatten)]
        policy: PolicyArgs,

        /// Program to run, followed by its arguments (use `--` before them).
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
        program: Vec<String>,
    },

    /// Show the config file location and the effective configuration.
    Config,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run { policy, program } => {
                let cfg = policy.apply(&cfg);
                run_command(&cfg, &program)?;
            }
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

/// Process exit code for a failed invocation: the child's own exit code when
/// the last attempt exited normally, 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err
        .downcast_ref::<RetryError<CommandError>>()
        .and_then(RetryError::last_error)
    {
        Some(CommandError::Exit { code, .. }) if *code != 0 => *code,
        _ => 1,
    }
}

#[cfg(test)]
mod tests;
