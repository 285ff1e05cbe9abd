use thiserror::Error;
use crate::data::event::InputTag;

pub type Result<T> = std::result::Result<T, MatchingError>;

#[derive(Error, Debug)]
pub enum MatchingError {
    #[error("Hit collection {0} is not valid")]
    InvalidHits(InputTag),

    #[error("Truth particle collection {0} not found")]
    MissingParticles(InputTag),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event {0} not found in store")]
    EventNotFound(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary serialization error: {0}")]
    Bincode(#[from] bincode::Error),
}
