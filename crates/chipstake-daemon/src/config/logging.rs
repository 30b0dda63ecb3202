use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use super::types::LogLevel;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Overrides `level` for the ledger state machine only.
    pub ledger_level: Option<LogLevel>,
    pub file: Option<PathBuf>,
    pub json: bool,
    pub timestamps: bool,
    pub source_location: bool,
    /// `serve` logs every committed event at info.
    pub log_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            ledger_level: None,
            file: None,
            json: false,
            timestamps: true,
            source_location: false,
            log_events: false,
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directive for the configured levels.
    pub fn filter_directive(&self) -> String {
        match self.ledger_level {
            Some(ledger) if ledger != self.level => format!("{},chipstake_ledger={}", self.level, ledger),
            _ => self.level.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        let mut config = LoggingConfig::default();
        assert_eq!(config.filter_directive(), "info");

        config.ledger_level = Some(LogLevel::Trace);
        assert_eq!(config.filter_directive(), "info,chipstake_ledger=trace");

        config.ledger_level = Some(LogLevel::Info);
        assert_eq!(config.filter_directive(), "info");
    }
}
