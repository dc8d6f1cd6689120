//! Tracing/logging setup shared by the console binaries.

/// Initialize process-wide tracing with the format selected by
/// `JADMIN_LOG_FORMAT` (`json` by default, `pretty` for local runs).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Tracing configuration (filters, formatters).
pub mod tracing;
