//! Shared-nearest-neighbor similarity between each point and its own neighbors.

use crate::error::{ClusterError, Result};
use leiden::Network;
use log::debug;
use ndarray::{ArrayView2, Axis};
use rayon::prelude::*;
use serde::Serialize;

/// A similarity edge from a point to one of its neighbors. The direction is only the order
/// in which it was produced; graphs built from edges are undirected.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Edge {
    pub source: u32,
    pub target: u32,
    pub weight: f32,
}

/// Number of values present in both sorted slices.
fn sorted_intersection(a: &[u32], b: &[u32]) -> usize {
    let (mut i, mut j, mut count) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count
}

/// Similarity of two neighbor sets of size `k` sharing `shared` members. Jaccard weighting
/// divides by the size of the union, `2k - shared`; otherwise the raw count is used.
pub fn shared_neighbor_weight(shared: usize, k: usize, weighted: bool) -> f32 {
    if weighted {
        shared as f32 / (2 * k - shared) as f32
    } else {
        shared as f32
    }
}

/// Emit one edge per `(i, j)` with `j` in row `i` of `neighbors`, weighted by the overlap of
/// the two points' neighbor sets. Zero-weight edges are included; see `retain_positive`.
/// Edges come out in row-major order of the table.
pub fn build_similarity_edges(neighbors: &ArrayView2<u32>, weighted: bool) -> Result<Vec<Edge>> {
    let (n, k) = neighbors.dim();
    if n == 0 {
        return Err(ClusterError::EmptyInput);
    }
    if k == 0 {
        return Err(ClusterError::KNotPositive);
    }
    if let Some(&bad) = neighbors.iter().find(|&&j| j as usize >= n) {
        return Err(ClusterError::InvalidArgument(format!(
            "neighbor index {bad} out of range for {n} points"
        )));
    }

    let sorted = neighbors
        .axis_iter(Axis(0))
        .map(|row| {
            let mut row = row.to_vec();
            row.sort_unstable();
            row
        })
        .collect::<Vec<_>>();

    debug!("computing shared-neighbor weights for {} points, k = {}", n, k);
    let edges = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let sorted = &sorted;
            neighbors.row(i).to_vec().into_iter().map(move |j| {
                let shared = sorted_intersection(&sorted[i], &sorted[j as usize]);
                Edge {
                    source: i as u32,
                    target: j,
                    weight: shared_neighbor_weight(shared, k, weighted),
                }
            })
        })
        .collect();
    Ok(edges)
}

/// Drop edges without a strictly positive weight.
pub fn retain_positive(mut edges: Vec<Edge>) -> Vec<Edge> {
    edges.retain(|e| e.weight > 0.0);
    edges
}

/// The undirected similarity graph over all `n_nodes` points, together with the edge list it
/// was assembled from.
#[derive(Clone, Debug, Serialize)]
pub struct CellGraph {
    pub n_nodes: usize,
    pub edges: Vec<Edge>,
    #[serde(skip)]
    network: Network,
}

impl CellGraph {
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Points without any edge.
    pub fn isolated_nodes(&self) -> Vec<usize> {
        (0..self.n_nodes).filter(|&i| self.network.degree(i) == 0).collect()
    }
}

/// Assemble an undirected multigraph over the points `0..n_nodes`. Parallel and reversed
/// edges are kept as given; points referenced by no edge become isolated nodes.
pub fn build_graph(n_nodes: usize, edges: Vec<Edge>) -> Result<CellGraph> {
    if n_nodes == 0 {
        return Err(ClusterError::EmptyInput);
    }
    let network = Network::from_edges(
        n_nodes,
        edges.iter().map(|e| (e.source as usize, e.target as usize, e.weight)),
    )?;
    Ok(CellGraph {
        n_nodes,
        edges,
        network,
    })
}
