use crate::community::Partition;
use crate::metrics::{adjusted_rand_index, rand_index};
use crate::{cluster_cells, cluster_cells_with, CellDataSet, ClusterConfig, ClusterError, ClusterMethod, CommunityDetector};
use leiden::{Clustering, Network, SimpleClustering};
use ndarray::Array2;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64Mcg;

/// `clusters` Gaussian blobs of `per_cluster` points in `dims` dimensions, centered 20 apart
/// along separate axes. Returns the dataset and the blob of every point.
fn gaussian_blobs(seed: u64, clusters: usize, per_cluster: usize, dims: usize) -> (CellDataSet, Vec<usize>) {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let noise = Normal::new(0.0f64, 1.0).unwrap();

    let n = clusters * per_cluster;
    let truth = (0..n).map(|i| i / per_cluster).collect::<Vec<_>>();
    let mut embedding = Array2::<f64>::zeros((n, dims));
    for ((i, j), x) in embedding.indexed_iter_mut() {
        let center = if j == truth[i] % dims { 20.0 } else { 0.0 };
        *x = center + noise.sample(&mut rng);
    }

    let barcodes = (0..n).map(|i| format!("CELL{i:04}-1")).collect();
    (CellDataSet::new(barcodes, embedding).unwrap(), truth)
}

fn cluster_labels(ds: &CellDataSet) -> Vec<u32> {
    ds.clusters().unwrap().to_vec()
}

#[test]
fn louvain_recovers_gaussian_blobs() {
    let (mut ds, truth) = gaussian_blobs(0, 4, 50, 10);
    let config = ClusterConfig {
        k: 15,
        method: ClusterMethod::Louvain,
        ..ClusterConfig::default()
    };
    cluster_cells(&mut ds, &config).unwrap();

    let labels = cluster_labels(&ds);
    assert_eq!(labels.len(), 200);
    let mut distinct = labels.clone();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct, vec![1, 2, 3, 4]);

    let ari = adjusted_rand_index(&labels, &truth).unwrap();
    let ri = rand_index(&labels, &truth).unwrap();
    println!("louvain: ari {ari}, rand index {ri}");
    assert!(ari >= 0.9);
    assert!(ri >= 0.9);

    let result = ds.get_aux("louvain").unwrap();
    assert_eq!(result.partition.num_clusters, 4);
    assert_eq!(result.graph.n_nodes, 200);
    assert!(result.graph.edges.iter().all(|e| e.weight > 0.0));
}

#[test]
fn leiden_recovers_gaussian_blobs() {
    let (mut ds, truth) = gaussian_blobs(1, 4, 50, 10);
    let config = ClusterConfig {
        k: 15,
        ..ClusterConfig::default()
    };
    cluster_cells(&mut ds, &config).unwrap();

    let labels = cluster_labels(&ds);
    let ari = adjusted_rand_index(&labels, &truth).unwrap();
    println!("leiden: ari {ari}");
    assert!(ari >= 0.9);
    assert_eq!(ds.aux_keys().collect::<Vec<_>>(), vec!["leiden"]);
}

#[test]
fn rerun_replaces_previous_result() {
    let (mut ds, _) = gaussian_blobs(2, 3, 30, 5);
    let louvain = ClusterConfig {
        k: 10,
        method: ClusterMethod::Louvain,
        louvain_iter: 3,
        ..ClusterConfig::default()
    };
    cluster_cells(&mut ds, &louvain).unwrap();
    let first = cluster_labels(&ds);

    cluster_cells(&mut ds, &louvain).unwrap();
    assert_eq!(cluster_labels(&ds), first);

    cluster_cells(&mut ds, &ClusterConfig { k: 10, ..ClusterConfig::default() }).unwrap();
    assert_eq!(ds.aux_keys().collect::<Vec<_>>(), vec!["leiden", "louvain"]);
    assert_eq!(ds.metadata().column_names().count(), 1);
}

#[test]
fn invalid_arguments_leave_dataset_untouched() {
    let (mut ds, _) = gaussian_blobs(3, 2, 10, 3);

    let config = ClusterConfig {
        k: 0,
        ..ClusterConfig::default()
    };
    assert_eq!(cluster_cells(&mut ds, &config), Err(ClusterError::KNotPositive));

    let config = ClusterConfig {
        k: 19,
        ..ClusterConfig::default()
    };
    assert_eq!(
        cluster_cells(&mut ds, &config),
        Err(ClusterError::KTooLarge { k: 19, n: 20 })
    );

    let config = ClusterConfig {
        k: 5,
        method: ClusterMethod::Leiden,
        num_clusters: Some(3),
        ..ClusterConfig::default()
    };
    assert!(matches!(
        cluster_cells(&mut ds, &config),
        Err(ClusterError::UnsupportedConfiguration(_))
    ));

    assert_eq!(ds.clusters(), None);
    assert_eq!(ds.aux_keys().count(), 0);

    // k = n - 2 is the largest accepted value
    let config = ClusterConfig {
        k: 18,
        ..ClusterConfig::default()
    };
    cluster_cells(&mut ds, &config).unwrap();
    assert_eq!(ds.clusters().map(|c| c.len()), Some(20));
}

#[test]
fn empty_dataset_is_an_error() {
    let mut ds = CellDataSet::new(vec![], Array2::zeros((0, 4))).unwrap();
    assert_eq!(
        cluster_cells(&mut ds, &ClusterConfig::default()),
        Err(ClusterError::EmptyInput)
    );
}

/// Stand-in for the legacy tree-based method: one cluster per connected component.
struct Components;

impl CommunityDetector for Components {
    fn tag(&self) -> ClusterMethod {
        ClusterMethod::DdrTree
    }

    fn detect(&self, network: &Network) -> crate::Result<Partition> {
        let n = network.nodes();
        let mut labels = vec![usize::MAX; n];
        let mut next = 0;
        for start in 0..n {
            if labels[start] != usize::MAX {
                continue;
            }
            let mut stack = vec![start];
            labels[start] = next;
            while let Some(node) = stack.pop() {
                for (neighbor, _) in network.neighbors(node) {
                    if labels[neighbor] == usize::MAX {
                        labels[neighbor] = next;
                        stack.push(neighbor);
                    }
                }
            }
            next += 1;
        }
        let clustering = SimpleClustering::new_from_labels(&labels);
        Ok(Partition::from_clustering(ClusterMethod::DdrTree, clustering, 0.0))
    }
}

#[test]
fn legacy_method_uses_injected_detector() {
    let (mut ds, truth) = gaussian_blobs(4, 3, 20, 4);
    let config = ClusterConfig {
        k: 8,
        method: ClusterMethod::DdrTree,
        num_clusters: Some(3),
        ..ClusterConfig::default()
    };
    assert!(matches!(
        cluster_cells(&mut ds, &config),
        Err(ClusterError::UnsupportedConfiguration(_))
    ));

    cluster_cells_with(&mut ds, &config, &Components).unwrap();
    let labels = cluster_labels(&ds);
    assert_eq!(adjusted_rand_index(&labels, &truth).unwrap(), 1.0);
    assert_eq!(ds.aux_keys().collect::<Vec<_>>(), vec!["ddrtree"]);

    // the detector must match the configured method
    let louvain = ClusterConfig {
        k: 8,
        method: ClusterMethod::Louvain,
        ..ClusterConfig::default()
    };
    assert!(cluster_cells_with(&mut ds, &louvain, &Components)
        .unwrap_err()
        .is_invalid_argument());
}

#[test]
fn every_point_gets_exactly_one_cluster() {
    let (mut ds, _) = gaussian_blobs(5, 5, 40, 8);
    for method in [ClusterMethod::Louvain, ClusterMethod::Leiden] {
        let config = ClusterConfig {
            k: 12,
            weight: true,
            method,
            louvain_iter: 2,
            ..ClusterConfig::default()
        };
        cluster_cells(&mut ds, &config).unwrap();
        let partition = &ds.get_aux(method.key()).unwrap().partition;
        let members = partition.members();
        let mut seen = members.concat();
        seen.sort_unstable();
        assert_eq!(seen, (0..200).collect::<Vec<_>>());

        let clustering = SimpleClustering::new_from_labels(
            &partition.membership.iter().map(|&l| l as usize).collect::<Vec<_>>(),
        );
        assert_eq!(clustering.num_clusters(), partition.num_clusters);
    }
}
