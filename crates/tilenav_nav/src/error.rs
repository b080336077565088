use tilenav_storage::StoreError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NavError {
    #[error("failed to parse config: {0}")]
    Config(#[from] ron::Error),

    #[error("map error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to start the {name} worker: {source}")]
    Spawn {
        name: String,
        source: std::io::Error,
    },

    #[error("invalid waypoint coordinate {0:?}")]
    InvalidWaypoint(String),

    #[error("no waypoints given")]
    NoWaypoints,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type NavResult<T> = Result<T, NavError>;
