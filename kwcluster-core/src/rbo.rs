//! Rank-biased overlap between two ranked competitor lists.
//!
//! Follows the estimates from Webber et al. as implemented in
//! https://github.com/dlukes/rbo: a tight lower bound (`min`), an upper bound
//! on the residual beyond the evaluated depth (`res`) and the extrapolated
//! point estimate (`ext`).

use crate::error::{ClusterError, Result};
use kwcluster_serp::{Member, Serp};
use std::collections::HashSet;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RboScore {
    pub min: f64,
    pub res: f64,
    pub ext: f64,
}

/// Score two ranked lists. `p` is the probability of looking at rank k + 1
/// after having examined rank k.
///
/// When either list is empty there is nothing to compare and every estimate
/// is 0.
pub fn rbo(a: &Serp, b: &Serp, p: f64) -> Result<RboScore> {
    if !(0.0..=1.0).contains(&p) {
        return Err(ClusterError::InvalidPersistence(p));
    }

    if a.is_empty() || b.is_empty() {
        return Ok(RboScore::default());
    }

    Ok(RboScore {
        min: rbo_min(a, b, p),
        res: rbo_res(a, b, p),
        ext: rbo_ext(a, b, p),
    })
}

fn rbo_min(a: &Serp, b: &Serp, p: f64) -> f64 {
    let depth = a.len().min(b.len());
    let xk = overlap(a, b, depth);
    let log_term = xk * (1.0 - p).ln();

    let sum_term: f64 = (1..=depth)
        .map(|d| pow(p, d) / d as f64 * (overlap(a, b, d) - xk))
        .sum();

    (1.0 - p) / p * (sum_term - log_term)
}

fn rbo_res(a: &Serp, b: &Serp, p: f64) -> f64 {
    let (short, long) = order_by_length(a, b);
    let (s, l) = (short.len(), long.len());
    let xl = overlap(a, b, l);
    let f = (l as f64 + s as f64 - xl).ceil() as usize;

    let term1 = s as f64 * harmonic(p, s + 1..=f);
    let term2 = l as f64 * harmonic(p, l + 1..=f);
    let term3 = xl * (1.0 / (1.0 - p)).ln() - harmonic(p, 1..=f);

    // The three partial sums are multiplied, not added
    pow(p, s) + pow(p, l) - pow(p, f) - (1.0 - p) / p * (term1 * term2 * term3)
}

fn rbo_ext(a: &Serp, b: &Serp, p: f64) -> f64 {
    let (short, long) = order_by_length(a, b);
    let (s, l) = (short.len(), long.len());
    let xl = overlap(a, b, l);
    let xs = overlap(a, b, s);

    let sum1: f64 = (1..=l).map(|d| pow(p, d) * agreement(a, b, d)).sum();
    let sum2: f64 = (s + 1..=l)
        .map(|d| pow(p, d) * xs * (d - s) as f64 / s as f64 / d as f64)
        .sum();

    let term1 = (1.0 - p) / p * (sum1 + sum2);
    let term2 = pow(p, l) * ((xl - xs) / l as f64 + xs / s as f64);
    term1 + term2
}

/// Sum of p^d / d over `range`.
fn harmonic(p: f64, range: RangeInclusive<usize>) -> f64 {
    range.map(|d| pow(p, d) / d as f64).sum()
}

fn pow(p: f64, d: usize) -> f64 {
    p.powi(d as i32)
}

/// Overlap at `depth`, clamped to the shorter list.
pub fn overlap(a: &Serp, b: &Serp, depth: usize) -> f64 {
    let min_depth = depth.min(a.len()).min(b.len());
    agreement(a, b, depth) * min_depth as f64
}

/// Proportion of competitors shared by the two lists truncated to `depth`.
pub fn agreement(a: &Serp, b: &Serp, depth: usize) -> f64 {
    let a_members = a.prefix(depth);
    let b_members = b.prefix(depth);

    let total = a_members.len() + b_members.len();
    if total == 0 {
        return 0.0;
    }

    let shared = intersection(a_members, b_members).len();
    (2 * shared) as f64 / total as f64
}

/// Competitors present in both slices. Each slice is treated as a set.
pub fn intersection<'a>(a: &'a [Member], b: &'a [Member]) -> HashSet<&'a str> {
    let a_set: HashSet<&str> = a.iter().map(|m| m.competitor.as_str()).collect();
    b.iter()
        .map(|m| m.competitor.as_str())
        .filter(|c| a_set.contains(c))
        .collect()
}

fn order_by_length<'a>(a: &'a Serp, b: &'a Serp) -> (&'a Serp, &'a Serp) {
    if a.len() <= b.len() { (a, b) } else { (b, a) }
}
