use crate::error::{ClusterError, Result};
use crate::mcl::MarkovClusterer;
use crate::rbo::rbo;
use kwcluster_serp::{KeywordData, Serp};
use petgraph::graph::{DiGraph, NodeIndex};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Keywords as nodes, directed edges weighted by the extrapolated RBO score.
pub type KeywordGraph = DiGraph<String, f64>;

/// Tuning passed through to a [`Clusterer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    /// Expansion exponent.
    pub power: u32,
    /// Inflation exponent.
    pub inflation: u32,
    /// Upper bound on refinement steps.
    pub max_iterations: usize,
}

/// Partitions a weighted keyword graph.
///
/// Implementations return disjoint groups of node weights (keywords) that
/// together cover every node. They should return their best partition when
/// `max_iterations` runs out rather than fail.
pub trait Clusterer: Send + Sync {
    fn cluster(&self, graph: &KeywordGraph, params: &ClusterParams) -> Result<Vec<Vec<String>>>;
}

/// A group of keywords whose SERPs look alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterGroup {
    pub name: String,
    pub keywords: Vec<String>,
}

impl ClusterGroup {
    /// Sorts the members and names the group after its shortest keyword.
    /// Returns `None` for an empty group.
    pub fn from_keywords(mut keywords: Vec<String>) -> Option<Self> {
        keywords.sort();
        let name = shortest_keyword(&keywords)?.to_string();
        Some(Self { name, keywords })
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

/// The keyword with the fewest characters; ties go to the lexicographically
/// smallest.
pub fn shortest_keyword(keywords: &[String]) -> Option<&str> {
    keywords
        .iter()
        .min_by(|a, b| {
            a.chars()
                .count()
                .cmp(&b.chars().count())
                .then_with(|| a.cmp(b))
        })
        .map(String::as_str)
}

/// Builds keyword graphs and extracts named clusters from them.
#[derive(Clone)]
pub struct ClusterFinder {
    rbo_p: f64,
    power: u32,
    inflation: u32,
    max_iterations: usize,
    clusterer: Arc<dyn Clusterer>,
}

impl ClusterFinder {
    pub fn new() -> Self {
        Self {
            rbo_p: 0.9,
            power: 2,
            inflation: 5,
            max_iterations: 100,
            clusterer: Arc::new(MarkovClusterer::new()),
        }
    }

    pub fn with_rbo_p(mut self, p: f64) -> Self {
        self.rbo_p = p;
        self
    }

    pub fn with_power(mut self, power: u32) -> Self {
        self.power = power;
        self
    }

    pub fn with_inflation(mut self, inflation: u32) -> Self {
        self.inflation = inflation;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_clusterer(mut self, clusterer: Arc<dyn Clusterer>) -> Self {
        self.clusterer = clusterer;
        self
    }

    pub fn rbo_p(&self) -> f64 {
        self.rbo_p
    }

    pub fn params(&self) -> ClusterParams {
        ClusterParams {
            power: self.power,
            inflation: self.inflation,
            max_iterations: self.max_iterations,
        }
    }

    /// One node per keyword and an edge for every ordered pair of distinct
    /// keywords. Pair scores are computed in parallel; nodes and edges are
    /// added in sorted keyword order.
    pub fn build_graph(&self, data: &KeywordData) -> Result<KeywordGraph> {
        let n = data.len();
        let keywords: Vec<&String> = data.keys().collect();
        let serps: Vec<&Serp> = data.values().collect();

        let mut graph = KeywordGraph::with_capacity(n, n.saturating_mul(n.saturating_sub(1)));
        let nodes: Vec<NodeIndex> = keywords
            .iter()
            .map(|kw| graph.add_node((*kw).clone()))
            .collect();

        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .collect();
        debug!("Scoring {} keyword pair(s) with p = {}", pairs.len(), self.rbo_p);

        let weights = pairs
            .par_iter()
            .map(|&(i, j)| {
                rbo(serps[i], serps[j], self.rbo_p)
                    .map(|score| (i, j, score.ext))
                    .map_err(|e| ClusterError::Similarity {
                        from: keywords[i].clone(),
                        to: keywords[j].clone(),
                        source: Box::new(e),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        for (i, j, weight) in weights {
            graph.add_edge(nodes[i], nodes[j], weight);
        }

        Ok(graph)
    }

    /// Score every keyword pair, partition the resulting graph and name each
    /// group. Any failure aborts the whole call.
    pub fn find_clusters(&self, data: &KeywordData) -> Result<Vec<ClusterGroup>> {
        info!("Finding clusters among {} keyword(s)", data.len());

        let graph = self.build_graph(data)?;
        let partition = self
            .clusterer
            .cluster(&graph, &self.params())
            .map_err(|e| match e {
                ClusterError::Clustering(_) => e,
                other => ClusterError::Strategy(Box::new(other)),
            })?;

        let mut clusters: Vec<ClusterGroup> = partition
            .into_iter()
            .filter_map(ClusterGroup::from_keywords)
            .collect();
        clusters.sort_by(|a, b| a.name.cmp(&b.name));

        info!("Found {} cluster(s)", clusters.len());
        Ok(clusters)
    }
}

impl Default for ClusterFinder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyword_data(entries: &[(&str, &[&str])]) -> KeywordData {
        entries
            .iter()
            .map(|(kw, competitors)| (kw.to_string(), Serp::from_competitors(*kw, competitors)))
            .collect()
    }

    /// Puts every keyword in one group.
    struct SingleGroup;

    impl Clusterer for SingleGroup {
        fn cluster(&self, graph: &KeywordGraph, _: &ClusterParams) -> Result<Vec<Vec<String>>> {
            Ok(vec![graph.node_weights().cloned().collect()])
        }
    }

    struct Failing;

    impl Clusterer for Failing {
        fn cluster(&self, _: &KeywordGraph, _: &ClusterParams) -> Result<Vec<Vec<String>>> {
            Err(ClusterError::Config("boom".to_string()))
        }
    }

    #[test]
    fn test_shortest_keyword() {
        let keywords = vec!["apartment parking".to_string(), "parking".to_string()];
        assert_eq!(shortest_keyword(&keywords), Some("parking"));
    }

    #[test]
    fn test_shortest_keyword_tie_is_lexicographic() {
        let keywords = vec!["pear".to_string(), "kiwi".to_string(), "plum".to_string()];
        assert_eq!(shortest_keyword(&keywords), Some("kiwi"));
        assert_eq!(shortest_keyword(&[]), None);
    }

    #[test]
    fn test_shortest_keyword_counts_characters() {
        // 4 characters, 5 bytes
        let keywords = vec!["café".to_string(), "cafes".to_string()];
        assert_eq!(shortest_keyword(&keywords), Some("café"));
    }

    #[test]
    fn test_build_graph_is_complete_and_directed() {
        let data = keyword_data(&[
            ("a", &["x", "y"]),
            ("b", &["x", "y"]),
            ("c", &["z"]),
        ]);
        let graph = ClusterFinder::new().build_graph(&data).unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 6);

        let a = graph.node_indices().find(|&n| graph[n] == "a").unwrap();
        let b = graph.node_indices().find(|&n| graph[n] == "b").unwrap();
        let c = graph.node_indices().find(|&n| graph[n] == "c").unwrap();
        let ab = graph.find_edge(a, b).map(|e| graph[e]).unwrap();
        let ac = graph.find_edge(a, c).map(|e| graph[e]).unwrap();
        assert!((ab - 1.0).abs() < 1e-9);
        assert!(ac.abs() < 1e-9);
        assert!(graph.find_edge(a, a).is_none());
    }

    #[test]
    fn test_bad_p_names_the_pair() {
        let data = keyword_data(&[("a", &["x"]), ("b", &["x"])]);
        let result = ClusterFinder::new().with_rbo_p(1.5).find_clusters(&data);

        match result {
            Err(ClusterError::Similarity { from, to, source }) => {
                // Either direction may fail first
                let mut pair = vec![from, to];
                pair.sort();
                assert_eq!(pair, vec!["a", "b"]);
                assert!(matches!(*source, ClusterError::InvalidPersistence(_)));
            }
            other => panic!("expected similarity error, got {:?}", other.map(|c| c.len())),
        }
    }

    #[test]
    fn test_custom_clusterer_is_used() {
        let data = keyword_data(&[
            ("apartment parking", &["x"]),
            ("parking", &["y"]),
        ]);
        let clusters = ClusterFinder::new()
            .with_clusterer(Arc::new(SingleGroup))
            .find_clusters(&data)
            .unwrap();

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].name, "parking");
        assert_eq!(clusters[0].keywords, vec!["apartment parking", "parking"]);
    }

    #[test]
    fn test_clusterer_failure_is_wrapped() {
        let data = keyword_data(&[("a", &["x"])]);
        let result = ClusterFinder::new()
            .with_clusterer(Arc::new(Failing))
            .find_clusters(&data);
        match result {
            Err(err @ ClusterError::Strategy(_)) => {
                let source = std::error::Error::source(&err).expect("cause is kept");
                assert_eq!(source.to_string(), "invalid configuration: boom");
            }
            other => panic!("expected strategy error, got {:?}", other.map(|c| c.len())),
        }
    }
}
