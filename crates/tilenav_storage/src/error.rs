use tilenav_core::MapInfo;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("backend is unreachable")]
    Unreachable,

    #[error("corrupt {what}: expected {expected} bytes, found {actual}")]
    Corrupt {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("malformed key {0:?}")]
    MalformedKey(Vec<u8>),

    #[error("no map info in the backend")]
    MissingInfo,

    #[error("invalid map info {0:?}")]
    InvalidInfo(MapInfo),

    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Corruption means the backend returned data we cannot trust, as opposed to not returning anything.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            StoreError::Corrupt { .. } | StoreError::MalformedKey(_) | StoreError::Encoding(_)
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
