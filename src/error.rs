use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type ConfigError = Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Feed validation failed: {0}")]
    FeedValidation(String),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl Error {
    pub fn is_temporary(&self) -> bool {
        matches!(self, Error::Fetch(_) | Error::Io(_))
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl(_) | Error::Config(_) | Error::FeedNotFound(_) | Error::FeedValidation(_)
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Error::FeedValidation(_) => "FEED_VALIDATION",
            Error::FeedNotFound(_) => "FEED_NOT_FOUND",
            Error::Fetch(_) => "FETCH",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Io(_) => "IO_ERROR",
            Error::Serialization(_) => "SERIALIZATION",
            Error::Config(_) => "CONFIG",
            Error::Storage(_) => "STORAGE",
            Error::NotFound(_) => "NOT_FOUND",
        }
    }
}
