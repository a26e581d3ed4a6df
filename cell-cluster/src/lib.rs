//! Graph-based clustering of single cells: k-nearest neighbors over an embedding, a
//! shared-neighbor similarity graph, and Louvain or Leiden community detection.

pub mod cluster;
pub mod community;
pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod nn;
pub mod snn;

#[cfg(test)]
mod test;

pub use cluster::{cluster_cells, cluster_cells_with, run_clustering};
pub use community::{CommunityDetector, LeidenDetector, LouvainDetector, Partition};
pub use config::{ClusterConfig, ClusterMethod};
pub use dataset::{CellDataSet, CellMetadata, ClusterResult, Column, CLUSTER_COLUMN};
pub use error::{ClusterError, Result};
