//! Storage errors and their conversion into [`TriggerError`].

use motiontrigger_domain::error::TriggerError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The database could not be opened.
    #[error("cannot open database {url}")]
    Open {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    /// Reading or writing metrics failed.
    #[error("metrics query failed")]
    Query(#[from] sqlx::Error),

    #[error("cannot migrate the metrics schema")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for TriggerError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
