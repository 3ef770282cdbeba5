use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerpError {
    #[error("could not parse ranked list: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("ranked list has no keyword (empty input)")]
    MissingKeyword,

    #[error("keyword '{0}' already collected from another item")]
    DuplicateKeyword(String),

    #[error("ingestion pool closed: {0}")]
    PoolClosed(#[from] tokio::sync::AcquireError),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("{item}: {source}")]
    Item {
        item: String,
        #[source]
        source: Box<SerpError>,
    },
}

impl SerpError {
    /// Attach the ingestion item (path or keyword) that produced this error.
    pub fn for_item(item: impl Into<String>, source: SerpError) -> Self {
        SerpError::Item {
            item: item.into(),
            source: Box::new(source),
        }
    }
}

/// One or more items failed during a bounded ingestion run.
///
/// Causes are kept in input order; none are dropped.
#[derive(Debug)]
pub struct BuildError {
    pub errors: Vec<SerpError>,
}

impl BuildError {
    pub fn new(errors: Vec<SerpError>) -> Self {
        Self { errors }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.first() {
            Some(first) => write!(
                f,
                "got {} error(s) - first was: {}",
                self.errors.len(),
                first
            ),
            None => write!(f, "got 0 error(s)"),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors
            .first()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

pub type Result<T> = std::result::Result<T, SerpError>;
