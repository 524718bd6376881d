//! Domain error types.

/// Top-level error type for flowtrader.
#[derive(Debug, thiserror::Error)]
pub enum FlowtraderError {
    #[error("data source error: {reason}")]
    DataSource { reason: String },

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

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data: have {bars} bars, none with a defined {indicator} value")]
    InsufficientData { bars: usize, indicator: String },

    #[error("invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FlowtraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        FlowtraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors raised while validating configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            FlowtraderError::ConfigParse { .. }
                | FlowtraderError::ConfigMissing { .. }
                | FlowtraderError::ConfigInvalid { .. }
        )
    }
}

impl From<&FlowtraderError> for std::process::ExitCode {
    fn from(err: &FlowtraderError) -> Self {
        let code: u8 = match err {
            FlowtraderError::Io(_) => 1,
            FlowtraderError::ConfigParse { .. }
            | FlowtraderError::ConfigMissing { .. }
            | FlowtraderError::ConfigInvalid { .. } => 2,
            FlowtraderError::DataSource { .. } => 3,
            FlowtraderError::InvalidBar { .. } => 4,
            FlowtraderError::NoData { .. } | FlowtraderError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
