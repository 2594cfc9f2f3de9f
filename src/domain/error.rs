//! Domain error types.

/// Top-level error type for equiscore.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data format error: {reason}")]
    DataFormat { reason: String },

    #[error("price series for {symbol} is not strictly ascending at {timestamp}")]
    UnorderedSeries { symbol: String, timestamp: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        EngineError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::DataFormat { .. }
            | EngineError::UnorderedSeries { .. }
            | EngineError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_invalid_display() {
        let err = EngineError::invalid("strategy", "macd_fast", "must be less than macd_slow");
        assert_eq!(
            err.to_string(),
            "invalid config value [strategy] macd_fast: must be less than macd_slow"
        );
    }

    #[test]
    fn unordered_series_display() {
        let err = EngineError::UnorderedSeries {
            symbol: "AAPL".into(),
            timestamp: "2024-01-02 00:00:00".into(),
        };
        assert!(err.to_string().contains("AAPL"));
        assert!(err.to_string().contains("2024-01-02"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
