use thiserror::Error;

use crate::model::Id;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("manager '{0}' already exists")]
    DuplicateManager(String),

    #[error("manager {0} not found")]
    ManagerNotFound(Id),

    #[error("tracker {0} not found")]
    TrackerNotFound(Id),

    #[error("'{login}' may not modify trackers owned by '{owner}'")]
    Forbidden { login: String, owner: String },

    #[error("no authenticated principal")]
    Unauthenticated,

    #[error("tracker {id} is stale: expected version {expected}, found {actual}")]
    VersionConflict { id: Id, expected: i64, actual: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
