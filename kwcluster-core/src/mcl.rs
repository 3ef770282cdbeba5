//! Markov clustering over a keyword graph.

use crate::error::{ClusterError, Result};
use crate::graph::{ClusterParams, Clusterer, KeywordGraph};
use ndarray::{Array2, Axis};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use tracing::debug;

/// Entries below this are treated as zero flow.
const PRUNE_THRESHOLD: f64 = 1e-6;
const CONVERGENCE_EPSILON: f64 = 1e-9;
/// Loop added to every node before the first normalisation.
const SELF_LOOP_WEIGHT: f64 = 1.0;

/// Flow simulation by alternating expansion (matrix power) and inflation
/// (element-wise power), read out from the attractor rows once stable.
#[derive(Debug, Clone, Default)]
pub struct MarkovClusterer;

impl MarkovClusterer {
    pub fn new() -> Self {
        Self
    }

    fn flow_matrix(&self, graph: &KeywordGraph) -> Result<Array2<f64>> {
        let n = graph.node_count();
        let mut m = Array2::<f64>::zeros((n, n));

        // Column j holds the outgoing flow of node j
        for edge in graph.edge_references() {
            let weight = *edge.weight();
            if !weight.is_finite() || weight < 0.0 {
                return Err(ClusterError::Clustering(format!(
                    "invalid weight {} on edge {}->{}",
                    weight,
                    graph[edge.source()],
                    graph[edge.target()]
                )));
            }
            m[[edge.target().index(), edge.source().index()]] += weight;
        }

        for i in 0..n {
            m[[i, i]] += SELF_LOOP_WEIGHT;
        }

        normalize_columns(&mut m);
        Ok(m)
    }
}

impl Clusterer for MarkovClusterer {
    fn cluster(&self, graph: &KeywordGraph, params: &ClusterParams) -> Result<Vec<Vec<String>>> {
        if graph.node_count() == 0 {
            return Err(ClusterError::Clustering("graph has no nodes".to_string()));
        }
        if params.power < 1 {
            return Err(ClusterError::Clustering("power must be at least 1".to_string()));
        }
        if params.inflation < 1 {
            return Err(ClusterError::Clustering(
                "inflation must be at least 1".to_string(),
            ));
        }

        let mut m = self.flow_matrix(graph)?;

        let mut converged = false;
        for iteration in 0..params.max_iterations {
            let mut next = expand(&m, params.power);
            inflate(&mut next, params.inflation);

            let delta = (&next - &m).fold(0.0_f64, |acc, v| acc.max(v.abs()));
            m = next;

            if delta < CONVERGENCE_EPSILON {
                debug!("Markov clustering converged after {} iteration(s)", iteration + 1);
                converged = true;
                break;
            }
        }
        if !converged {
            debug!(
                "Markov clustering stopped at {} iteration(s) without converging",
                params.max_iterations
            );
        }

        Ok(interpret(graph, &m))
    }
}

fn normalize_columns(m: &mut Array2<f64>) {
    for mut column in m.axis_iter_mut(Axis(1)) {
        let sum = column.sum();
        if sum > 0.0 {
            column.mapv_inplace(|v| v / sum);
        }
    }
}

fn expand(m: &Array2<f64>, power: u32) -> Array2<f64> {
    let mut result = m.clone();
    for _ in 1..power {
        result = result.dot(m);
    }
    result
}

fn inflate(m: &mut Array2<f64>, inflation: u32) {
    let exponent = inflation as i32;
    m.mapv_inplace(|v| v.powi(exponent));
    normalize_columns(m);

    // Prune on the normalised matrix so a column can never empty out
    m.mapv_inplace(|v| if v < PRUNE_THRESHOLD { 0.0 } else { v });
    normalize_columns(m);
}

/// Every attractor row pulls the columns it holds flow for into one group.
/// Overlapping groups are merged so the result is a strict partition.
fn interpret(graph: &KeywordGraph, m: &Array2<f64>) -> Vec<Vec<String>> {
    let n = graph.node_count();
    let mut sets = UnionFind::<usize>::new(n);

    for row in m.axis_iter(Axis(0)) {
        let mut support = row
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > PRUNE_THRESHOLD)
            .map(|(col, _)| col);

        if let Some(first) = support.next() {
            for other in support {
                sets.union(first, other);
            }
        }
    }

    let mut groups: Vec<Vec<String>> = Vec::new();
    let mut group_of_root: HashMap<usize, usize> = HashMap::new();
    for node in graph.node_indices() {
        let root = sets.find(node.index());
        let slot = *group_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(graph[node].clone());
    }

    groups
}
