use thiserror::Error;

#[derive(Error, Debug)]
pub enum FareWatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Flight search error: {0}")]
    Search(String),
}

impl FareWatchError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn search_error(msg: impl Into<String>) -> Self {
        Self::Search(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, FareWatchError>;
