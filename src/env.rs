/// Environment variable names consumed by this crate for convenient
/// configuration from process environments.
///
/// These are purely helpers; the core context and record types remain
/// decoupled from environment access.

/// Service identifier stamped on every log line.
pub const SERVICE_NAME_ENV: &str = "SERVICE_NAME";

/// Deployment environment name (local, dev, prod, etc.).
pub const ENV_NAME_ENV: &str = "ENV";

/// Minimum severity emitted, e.g. `INFO` or `DEBUG`.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Optional externally supplied correlation ID. When present it takes
/// precedence over a freshly generated one.
pub const CORRELATION_ID_ENV: &str = "CORRELATION_ID";

/// Default service identifier when `SERVICE_NAME` is unset.
pub const DEFAULT_SERVICE_NAME: &str = "ai-system-security-automation";

/// Default environment name when `ENV` is unset.
pub const DEFAULT_ENV_NAME: &str = "local";

/// Default minimum severity when `LOG_LEVEL` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
