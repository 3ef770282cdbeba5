pub mod config;
pub mod data;
pub mod error;
pub mod graph;
pub mod mcl;
pub mod pipeline;
pub mod rbo;
pub mod report;

pub use config::Config;
pub use data::RankingStore;
pub use error::ClusterError;
pub use graph::{ClusterFinder, ClusterGroup, ClusterParams, Clusterer, KeywordGraph};
pub use mcl::MarkovClusterer;
pub use rbo::{RboScore, rbo};
