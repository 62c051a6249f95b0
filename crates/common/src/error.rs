use thiserror::Error;

#[derive(Error, Debug)]
pub enum BreakError {
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("insufficient history: {available} usable observations, at least {required} required")]
    InsufficientHistory { required: usize, available: usize },

    #[error("degenerate gap: {0}")]
    DegenerateGap(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model error: {0}")]
    ModelError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl BreakError {
    /// Short machine-readable tag, used when failures are tallied per kind.
    pub fn kind(&self) -> &'static str {
        match self {
            BreakError::InsufficientData(_) => "insufficient_data",
            BreakError::InsufficientHistory { .. } => "insufficient_history",
            BreakError::DegenerateGap(_) => "degenerate_gap",
            BreakError::InvalidDate(_) => "invalid_date",
            BreakError::InvalidInput(_) => "invalid_input",
            BreakError::ModelError(_) => "model_error",
            BreakError::ConfigError(_) => "config_error",
            BreakError::Io(_) => "io",
            BreakError::Serde(_) => "serde",
        }
    }
}

pub type Result<T> = std::result::Result<T, BreakError>;
