use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Gave up after {strikes} consecutive failures: {last}")]
    StrikeLimit { strikes: u32, last: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Output error: {0}")]
    Output(String),
}

impl AppError {
    /// Whether the failed request may succeed if simply tried again
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Request(_) | AppError::Decode(_))
    }

    /// Whether the error makes every further request pointless
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Unauthorized(_) | AppError::Config(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 401 || status.as_u16() == 403 => {
                AppError::Unauthorized(status.to_string())
            }
            _ if err.is_decode() => AppError::Decode(err.to_string()),
            _ => AppError::Request(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Output(err.to_string())
    }
}
