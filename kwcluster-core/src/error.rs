use kwcluster_serp::{BuildError, SerpError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("p must be between 0 and 1, got {0}")]
    InvalidPersistence(f64),

    #[error("error computing {from}->{to}: {source}")]
    Similarity {
        from: String,
        to: String,
        #[source]
        source: Box<ClusterError>,
    },

    #[error("could not find graph clusters: {0}")]
    Clustering(String),

    #[error("clustering strategy failed: {0}")]
    Strategy(#[source] Box<ClusterError>),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Serp(#[from] SerpError),

    #[error("could not build keyword data: {0}")]
    Build(#[from] BuildError),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ClusterError>;
