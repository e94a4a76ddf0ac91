use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Severity of a log record, ordered from least to most severe.
///
/// Serialized form matches the wire schema: `"DEBUG"`, `"INFO"`,
/// `"WARNING"`, `"ERROR"`, `"CRITICAL"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type returned when parsing a severity from a string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {value:?}")]
pub struct ParseLevelError {
    value: String,
}

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parse a severity name, case-insensitively. `WARN` is accepted as
    /// an alias for `WARNING`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARNING" | "WARN" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" => Ok(Level::Critical),
            _ => Err(ParseLevelError {
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_names() {
        assert_eq!("debug".parse::<Level>().unwrap(), Level::Debug);
        assert_eq!("INFO".parse::<Level>().unwrap(), Level::Info);
        assert_eq!("Warning".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("ERROR".parse::<Level>().unwrap(), Level::Error);
        assert_eq!("critical".parse::<Level>().unwrap(), Level::Critical);
    }

    #[test]
    fn parses_warn_alias() {
        assert_eq!("warn".parse::<Level>().unwrap(), Level::Warning);
    }

    #[test]
    fn rejects_unknown_names() {
        assert!("verbose".parse::<Level>().is_err());
        assert!("".parse::<Level>().is_err());
    }

    #[test]
    fn orders_by_severity() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Critical);
    }

    #[test]
    fn serializes_as_upper_case() {
        assert_eq!(
            serde_json::to_value(Level::Warning).unwrap(),
            serde_json::json!("WARNING")
        );
        assert_eq!(
            serde_json::to_value(Level::Critical).unwrap(),
            serde_json::json!("CRITICAL")
        );
    }
}
