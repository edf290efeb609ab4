//! Tracing/logging setup shared by every tenantguard process.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::{LogConfig, LogFormat};

/// Initialize process-wide tracing with defaults (`RUST_LOG`, JSON output).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    crate::tracing::init(&LogConfig::default());
}

/// Initialize process-wide tracing with an explicit configuration.
pub fn init_with(config: &LogConfig) {
    crate::tracing::init(config);
}
