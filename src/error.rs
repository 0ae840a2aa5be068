use std::path::PathBuf;

/// Fallback reason shown to the user when an error carries no usable text.
pub const GENERIC_RETRY_HINT: &str = "Bitte versuche es später erneut.";

/// Coarse classification used by callers that only care about the failure class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Network,
    Parse,
    Storage,
    InvalidInput,
}

/// Common error type for the application core
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Configuration(String),

    #[error("OpenAI request failed: {status} {body}")]
    Network { status: u16, body: String },

    #[error("OpenAI request could not be sent: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn missing_api_key() -> Self {
        Self::Configuration(
            "OpenAI API key is missing. Please provide it in the .env file.".to_string(),
        )
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Network { .. } | Self::Transport(_) => ErrorKind::Network,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    /// Reason string suitable for an error bubble or banner.
    pub fn user_message(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            GENERIC_RETRY_HINT.to_string()
        } else {
            text
        }
    }
}
