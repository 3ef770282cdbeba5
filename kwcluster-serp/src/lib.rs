pub mod error;
pub mod ingest;
pub mod serp;

pub use error::{BuildError, SerpError};
pub use ingest::{ProgressSink, build_from_directory, build_from_sources, list_directory, read_serp_file};
pub use serp::{KeywordData, Member, Serp, parse, parse_reader};
