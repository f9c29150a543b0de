//! Logger setup.
//!
//! Installs `env_logger` once. `RUST_LOG` wins over the level passed in,
//! so a user can always turn on `debug` for a single subsystem.

use log::LevelFilter;
use std::sync::Once;

static INIT: Once = Once::new();

/// Installs the global logger at `level`. Later calls are no-ops.
pub fn init_logging(level: LevelFilter) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(level).format_timestamp_millis();
        if let Ok(spec) = std::env::var("RUST_LOG") {
            builder.parse_filters(&spec);
        }
        if let Err(e) = builder.try_init() {
            eprintln!("[MAIN] Logger already installed: {e}");
        }
    });
}
