use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScribeError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScribeError {
    /// Short error code string used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            ScribeError::Config(_) => "CONFIG_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ScribeError>;
