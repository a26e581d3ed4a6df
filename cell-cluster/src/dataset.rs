use crate::community::Partition;
use crate::config::ClusterMethod;
use crate::error::{ClusterError, Result};
use crate::snn::CellGraph;
use ndarray::Array2;
use serde::Serialize;
use std::collections::BTreeMap;

/// Metadata column written by `CellDataSet::apply_clusters`
pub const CLUSTER_COLUMN: &str = "Cluster";

/// One metadata column, one entry per cell.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Column {
    /// Integer category codes, starting at 1
    Categorical(Vec<u32>),
    Text(Vec<String>),
    Numeric(Vec<f64>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Categorical(v) => v.len(),
            Column::Text(v) => v.len(),
            Column::Numeric(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named per-cell columns, aligned with the dataset's barcodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellMetadata {
    num_cells: usize,
    columns: BTreeMap<String, Column>,
}

impl CellMetadata {
    pub fn new(num_cells: usize) -> Self {
        CellMetadata {
            num_cells,
            columns: BTreeMap::new(),
        }
    }

    /// Add or replace a column. Its length must match the number of cells.
    pub fn insert(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if column.len() != self.num_cells {
            return Err(ClusterError::InvalidArgument(format!(
                "column '{}' has {} entries for {} cells",
                name,
                column.len(),
                self.num_cells
            )));
        }
        self.columns.insert(name, column);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// Provenance of one clustering run: the graph that was partitioned and the raw result.
#[derive(Clone, Debug, Serialize)]
pub struct ClusterResult {
    pub graph: CellGraph,
    pub partition: Partition,
}

impl ClusterResult {
    pub fn method(&self) -> ClusterMethod {
        self.partition.method
    }
}

/// Cells with their reduced-dimension embedding, metadata and per-method clustering results.
#[derive(Clone, Debug)]
pub struct CellDataSet {
    barcodes: Vec<String>,
    embedding: Array2<f64>,
    metadata: CellMetadata,
    aux: BTreeMap<String, ClusterResult>,
}

impl CellDataSet {
    /// `embedding` has one row per barcode.
    pub fn new(barcodes: Vec<String>, embedding: Array2<f64>) -> Result<Self> {
        if barcodes.len() != embedding.nrows() {
            return Err(ClusterError::InvalidArgument(format!(
                "{} barcodes for an embedding of {} rows",
                barcodes.len(),
                embedding.nrows()
            )));
        }
        let metadata = CellMetadata::new(barcodes.len());
        Ok(CellDataSet {
            barcodes,
            embedding,
            metadata,
            aux: BTreeMap::new(),
        })
    }

    pub fn num_cells(&self) -> usize {
        self.barcodes.len()
    }

    pub fn barcodes(&self) -> &[String] {
        &self.barcodes
    }

    pub fn embedding(&self) -> &Array2<f64> {
        &self.embedding
    }

    pub fn metadata(&self) -> &CellMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut CellMetadata {
        &mut self.metadata
    }

    /// Store `result` under `key`, replacing any previous entry.
    pub fn set_aux(&mut self, key: impl Into<String>, result: ClusterResult) {
        self.aux.insert(key.into(), result);
    }

    pub fn get_aux(&self, key: &str) -> Option<&ClusterResult> {
        self.aux.get(key)
    }

    pub fn aux_keys(&self) -> impl Iterator<Item = &str> {
        self.aux.keys().map(String::as_str)
    }

    /// 1-based cluster label per cell from the last clustering run, if any.
    pub fn clusters(&self) -> Option<&[u32]> {
        match self.metadata.get(CLUSTER_COLUMN) {
            Some(Column::Categorical(labels)) => Some(labels),
            _ => None,
        }
    }

    /// Write the partition into the `Cluster` column and keep `result` under the method's key.
    /// Both replace the output of any earlier run.
    pub fn apply_clusters(&mut self, result: ClusterResult) -> Result<()> {
        let membership = &result.partition.membership;
        if membership.len() != self.num_cells() {
            return Err(ClusterError::InvalidArgument(format!(
                "partition covers {} points, dataset has {} cells",
                membership.len(),
                self.num_cells()
            )));
        }
        let labels = membership.iter().map(|&l| l + 1).collect();
        self.metadata.insert(CLUSTER_COLUMN, Column::Categorical(labels))?;
        self.set_aux(result.method().key(), result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snn::{build_graph, Edge};
    use ndarray::array;

    fn result(method: ClusterMethod, membership: Vec<u32>) -> ClusterResult {
        let n = membership.len();
        let num_clusters = membership.iter().max().map_or(0, |&m| m as usize + 1);
        ClusterResult {
            graph: build_graph(
                n,
                vec![Edge {
                    source: 0,
                    target: 1,
                    weight: 1.0,
                }],
            )
            .unwrap(),
            partition: Partition {
                method,
                membership,
                quality: 0.5,
                num_clusters,
            },
        }
    }

    fn dataset() -> CellDataSet {
        let barcodes = ["AAAC-1", "AAAG-1", "AACT-1"].iter().map(|s| s.to_string()).collect();
        CellDataSet::new(barcodes, array![[0.0, 1.0], [0.5, 1.0], [4.0, 4.0]]).unwrap()
    }

    #[test]
    fn test_apply_clusters() {
        let mut ds = dataset();
        assert_eq!(ds.clusters(), None);

        ds.apply_clusters(result(ClusterMethod::Louvain, vec![0, 0, 1])).unwrap();
        assert_eq!(ds.clusters(), Some(&[1, 1, 2][..]));
        assert_eq!(ds.aux_keys().collect::<Vec<_>>(), vec!["louvain"]);

        // a rerun replaces the column and the entry for its method
        ds.apply_clusters(result(ClusterMethod::Louvain, vec![0, 1, 2])).unwrap();
        assert_eq!(ds.clusters(), Some(&[1, 2, 3][..]));
        assert_eq!(ds.get_aux("louvain").unwrap().partition.num_clusters, 3);

        ds.apply_clusters(result(ClusterMethod::Leiden, vec![0, 0, 0])).unwrap();
        assert_eq!(ds.clusters(), Some(&[1, 1, 1][..]));
        assert_eq!(ds.aux_keys().collect::<Vec<_>>(), vec!["leiden", "louvain"]);
    }

    #[test]
    fn test_mismatched_lengths() {
        let mut ds = dataset();
        let err = ds.apply_clusters(result(ClusterMethod::Leiden, vec![0, 0])).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(ds.clusters(), None);
        assert_eq!(ds.aux_keys().count(), 0);

        assert!(ds
            .metadata_mut()
            .insert("Sample", Column::Text(vec!["a".to_string()]))
            .is_err());
        assert!(CellDataSet::new(vec!["A".to_string()], Array2::zeros((2, 2))).is_err());
    }

    #[test]
    fn test_metadata_columns() {
        let mut ds = dataset();
        ds.metadata_mut()
            .insert("Size_Factor", Column::Numeric(vec![1.0, 0.8, 1.2]))
            .unwrap();
        ds.apply_clusters(result(ClusterMethod::Leiden, vec![1, 0, 0])).unwrap();
        assert_eq!(
            ds.metadata().column_names().collect::<Vec<_>>(),
            vec![CLUSTER_COLUMN, "Size_Factor"]
        );
        assert_eq!(ds.metadata().get("Size_Factor").map(Column::len), Some(3));
    }
}
