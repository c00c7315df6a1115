//! Error types for the simulation.
//!
//! The domain tolerates missed opportunities (a failed move, a failed hunt, a
//! reproduction with no room); those are silent no-ops returning
//! `bool`/`Option`, not errors. `Error` covers misuse of the engine surface
//! and malformed configuration input.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("engine not initialized: call initialize() with a configuration first")]
    NotInitialized,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("a tick is already in flight")]
    TickInFlight,

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
