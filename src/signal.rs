// src/signal.rs

//! Provides signal handling for graceful shutdown.

use crate::cancellation::CancellationToken;
use anyhow::{Context, Result};

/// Sets up a handler for Ctrl+C (SIGINT, and SIGTERM with the `termination` feature).
///
/// When the signal is caught the returned token is cancelled, which aborts
/// the in-flight worker request and kills any running git subprocess.
///
/// # Errors
/// Returns an error if the signal handler cannot be set.
pub fn setup_signal_handler() -> Result<CancellationToken> {
    let token = CancellationToken::new();
    let handler_token = token.clone();

    ctrlc::set_handler(move || {
        log::info!("Interrupt received, cancelling the current operation.");
        handler_token.cancel();
    })
    .context("Failed to set Ctrl+C signal handler")?;

    Ok(token)
}
