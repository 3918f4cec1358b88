use thiserror::Error;

/// Engine error types.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid candle: {0}")]
    InvalidCandle(String),

    #[error("Invalid candle series: {0}")]
    InvalidSeries(String),

    #[error("Period {period} exceeds series length {len}")]
    InvalidPeriod { period: usize, len: usize },

    #[error("Invalid option leg: {0}")]
    InvalidOption(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{layer} layer failed: {message}")]
    Layer { layer: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether this error was raised while validating caller input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidCandle(_)
                | EngineError::InvalidSeries(_)
                | EngineError::InvalidPeriod { .. }
                | EngineError::InvalidOption(_)
                | EngineError::InvalidInput(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
