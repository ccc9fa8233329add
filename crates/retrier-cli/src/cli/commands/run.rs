//! `retrier run` – run a command under the retry policy.

use anyhow::{Context, Result};
use retrier_core::config::RetrierConfig;
use retrier_core::{run_with_retry_cancellable, CancelToken, RetryError};
use std::io;
use std::process::{Command, ExitStatus};
use std::time::Duration;

/// How often a running child is checked for exit while watching the token.
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Why one run of the child command failed.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with status {code}")]
    Exit { program: String, code: i32 },
    #[error("`{program}` was terminated by a signal")]
    Signal { program: String },
    #[error("`{program}` was killed after the retry was canceled")]
    Killed { program: String },
}

impl CommandError {
    /// `retry_codes` empty means every non-zero exit code is retryable.
    pub fn is_retryable(&self, retry_codes: &[i32]) -> bool {
        match self {
            CommandError::Spawn { source, .. } => !matches!(
                source.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
            ),
            CommandError::Exit { code, .. } => retry_codes.is_empty() || retry_codes.contains(code),
            // Killed only follows a fired token; the loop then reports the token's reason.
            CommandError::Killed { .. } | CommandError::Wait { .. } | CommandError::Signal { .. } => {
                true
            }
        }
    }
}

pub fn run_command(cfg: &RetrierConfig, command: &[String]) -> Result<()> {
    let (program, args) = command.split_first().context("no command given")?;

    let retry_codes = cfg.retry_exit_codes.clone();
    let options = cfg
        .retry
        .to_options::<CommandError>()
        .with_retry_if(move |e| e.is_retryable(&retry_codes))
        .on_retry(|attempt, err| {
            if !announces_retry(err) {
                return;
            }
            tracing::warn!(attempt, error = %err, "command failed, retrying");
            eprintln!("retrier: {err}; retry {attempt}");
        });
    let token = cfg.retry.cancel_token();

    tracing::info!(
        program = %program,
        max_attempts = options.max_attempts(),
        timeout_secs = ?cfg.retry.timeout_secs,
        "running command"
    );
    run_with_retry_cancellable(&token, &options, |token| run_once(program, args, token))
        .map_err(|err| attribute_kill(err, &token))?;
    tracing::info!(program = %program, "command succeeded");
    Ok(())
}

/// A kill only happens once the token fired, so no retry will follow it.
fn announces_retry(err: &CommandError) -> bool {
    !matches!(err, CommandError::Killed { .. })
}

/// A child killed on the last permitted attempt ends the loop as exhausted;
/// report the token's reason instead.
fn attribute_kill(err: RetryError<CommandError>, token: &CancelToken) -> RetryError<CommandError> {
    match err {
        RetryError::Exhausted {
            last: last @ CommandError::Killed { .. },
            attempts,
        } => match token.reason() {
            Some(reason) => RetryError::from_cancel(reason, Some(last)),
            None => RetryError::Exhausted { attempts, last },
        },
        other => other,
    }
}

/// Spawn the command once and wait for it, killing it if the token fires.
fn run_once(program: &str, args: &[String], token: &CancelToken) -> Result<(), CommandError> {
    let mut child = Command::new(program)
        .args(args)
        .spawn()
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return check_status(program, status),
            Ok(None) => {}
            Err(source) => {
                return Err(CommandError::Wait {
                    program: program.to_string(),
                    source,
                })
            }
        }
        if let Some(reason) = token.wait_timeout(CHILD_POLL_INTERVAL) {
            tracing::debug!(program, %reason, "killing child");
            if let Err(e) = child.kill() {
                tracing::debug!(program, error = %e, "failed to kill child");
            }
            if let Err(e) = child.wait() {
                tracing::debug!(program, error = %e, "failed to reap killed child");
            }
            return Err(CommandError::Killed {
                program: program.to_string(),
            });
        }
    }
}

fn check_status(program: &str, status: ExitStatus) -> Result<(), CommandError> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(CommandError::Exit {
            program: program.to_string(),
            code,
        }),
        None => Err(CommandError::Signal {
            program: program.to_string(),
        }),
    }
}
