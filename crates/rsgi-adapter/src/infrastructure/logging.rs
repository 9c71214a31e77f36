//! Log output setup.
//!
//! `RUST_LOG` always wins when it is set and valid.  Otherwise the adapter
//! logs at `warn`, or at `debug` when the debug toggle is on (the `debug`
//! config field, `--debug`, or `RSGI_ADAPTER_DEBUG=1`).

use tracing_subscriber::EnvFilter;

use crate::domain::AdapterConfig;

/// The filter used when `RUST_LOG` is absent.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "warn"
    }
}

/// Installs the global `tracing` subscriber.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_tracing(config: &AdapterConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config.debug)));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

// ── Tests ─────────────────────────────────────────────────────────────────────
