use crate::community::{detector_for, stage_level, CommunityDetector};
use crate::config::{ClusterConfig, ClusterMethod};
use crate::dataset::{CellDataSet, ClusterResult};
use crate::error::{ClusterError, Result};
use crate::nn::{check_k, knn};
use crate::snn::{build_graph, build_similarity_edges, retain_positive};
use log::{log, warn};
use ndarray::ArrayView2;

/// Above this many points the legacy method is quadratic enough to be impractical.
pub const LARGE_N_THRESHOLD: usize = 500_000;

/// Cluster the cells of `ds` with the built-in detector for `config.method`, writing the
/// `Cluster` column and the method's auxiliary result. Nothing is written on error.
pub fn cluster_cells(ds: &mut CellDataSet, config: &ClusterConfig) -> Result<()> {
    config.validate()?;
    let detector = detector_for(config)?;
    cluster_cells_with(ds, config, detector.as_ref())
}

/// As `cluster_cells`, but partition the similarity graph with `detector`.
pub fn cluster_cells_with(
    ds: &mut CellDataSet,
    config: &ClusterConfig,
    detector: &dyn CommunityDetector,
) -> Result<()> {
    config.validate()?;
    if detector.tag() != config.method {
        return Err(ClusterError::InvalidArgument(format!(
            "configured method {} but detector implements {}",
            config.method,
            detector.tag()
        )));
    }
    if config.method == ClusterMethod::DdrTree && ds.num_cells() > LARGE_N_THRESHOLD {
        warn!(
            "{} cells exceed {}; {} clustering is slow at this size, prefer leiden or louvain",
            ds.num_cells(),
            LARGE_N_THRESHOLD,
            config.method
        );
    }

    let result = run_clustering(&ds.embedding().view(), config, detector)?;
    ds.apply_clusters(result)
}

/// Neighbor search, shared-neighbor graph and community detection over `embedding`.
pub fn run_clustering(
    embedding: &ArrayView2<f64>,
    config: &ClusterConfig,
    detector: &dyn CommunityDetector,
) -> Result<ClusterResult> {
    let level = stage_level(config.verbose);
    let n = embedding.nrows();
    check_k(config.k, n)?;

    log!(level, "computing k-nearest neighbors with k = {} over {} points", config.k, n);
    let neighbors = knn(embedding, config.k)?;

    log!(
        level,
        "computing {} shared-neighbor weights",
        if config.weight { "jaccard" } else { "raw" }
    );
    let edges = retain_positive(build_similarity_edges(&neighbors.view(), config.weight)?);

    let graph = build_graph(n, edges)?;
    log!(
        level,
        "similarity graph: {} nodes, {} edges",
        graph.n_nodes,
        graph.edges.len()
    );
    let isolated = graph.isolated_nodes().len();
    if isolated > 0 {
        warn!("{} points share no neighbors with any other point and form singleton clusters", isolated);
    }

    log!(level, "running {} community detection", detector.tag());
    let partition = detector.detect(graph.network())?;
    log!(
        level,
        "{}: {} clusters, quality {:.6}",
        detector.tag(),
        partition.num_clusters,
        partition.quality
    );

    Ok(ClusterResult { graph, partition })
}
