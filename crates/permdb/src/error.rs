use entry::EntryError;
use std::io;
use table::TableError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// A required sub-table is missing from an otherwise valid file.
    #[error("no {0} table in db")]
    MissingTable(&'static str),
    #[error("invalid table file: {0}")]
    Table(TableError),
    #[error("bad entry {id:?}: {source}")]
    Entry { id: String, source: EntryError },
    /// A reverse-index row (application to ids) does not decode.
    #[error("bad application index row {app:?}: {source}")]
    AppIndex { app: String, source: EntryError },
    #[error("invalid table name {0:?}")]
    InvalidTableName(String),
}

impl From<TableError> for DbError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::Io(e) => DbError::Io(e),
            other => DbError::Table(other),
        }
    }
}

impl DbError {
    /// The file could not be opened, read or mapped.
    pub fn is_io(&self) -> bool {
        matches!(self, DbError::Io(_))
    }

    /// The file was readable but its contents are unusable.
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            DbError::MissingTable(_)
                | DbError::Table(_)
                | DbError::Entry { .. }
                | DbError::AppIndex { .. }
        )
    }
}
