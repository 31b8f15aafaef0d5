// SPDX-License-Identifier: AGPL-3.0-only

//! Structured logging for validation binaries and long-running checks.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! caller's choice. Binaries call [`init_tracing`] once at startup.
//!
//! Verbosity follows `RUST_LOG` (default `info`). Solver iteration counts and
//! residuals are logged at `debug`, refresh/action summaries at `info`.

use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Errors emitted when configuring the tracing subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("tracing has already been initialised")]
    AlreadyInitialised,
    #[error("failed to install tracing subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber: `EnvFilter` from `RUST_LOG` plus a fmt layer.
pub fn init_tracing() -> Result<(), TelemetryError> {
    INITIALISED
        .set(())
        .map_err(|()| TelemetryError::AlreadyInitialised)?;

    let ansi = std::io::stdout().is_terminal();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(ansi);
    Registry::default().with(filter).with(fmt_layer).try_init()?;
    Ok(())
}

/// Like [`init_tracing`], but a second call is not an error.
pub fn ensure_tracing() {
    match init_tracing() {
        Ok(()) | Err(TelemetryError::AlreadyInitialised) => {}
        Err(e) => eprintln!("warning: {e}"),
    }
}
