use crate::config::{ClusterConfig, ClusterMethod};
use crate::error::{ClusterError, Result};
use leiden::leiden::Leiden;
use leiden::louvain::{Louvain, DEFAULT_RESOLUTION};
use leiden::{Clustering, Network, SimpleClustering};
use log::{debug, log, Level};
use rayon::prelude::*;
use serde::Serialize;

/// Cluster label per node plus the quality of the partition as a whole.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Partition {
    /// Method that produced this partition
    pub method: ClusterMethod,
    /// 0-based label per node; label 0 is the largest cluster
    pub membership: Vec<u32>,
    /// Modularity for Louvain, CPM for Leiden
    pub quality: f64,
    pub num_clusters: usize,
}

impl Partition {
    /// Relabel `clustering` by decreasing cluster size.
    pub fn from_clustering(method: ClusterMethod, mut clustering: SimpleClustering, quality: f64) -> Self {
        clustering.relabel_by_size();
        Partition {
            method,
            membership: clustering.labels().iter().map(|&l| l as u32).collect(),
            quality,
            num_clusters: clustering.num_clusters(),
        }
    }

    /// Indices of the nodes in each cluster, by label.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.num_clusters];
        for (node, &label) in self.membership.iter().enumerate() {
            members[label as usize].push(node);
        }
        members
    }
}

/// Partition a network. Implementations are pure functions of the network and their own
/// parameters.
pub trait CommunityDetector: Send + Sync {
    /// Which method this detector implements; also the key its result is stored under.
    fn tag(&self) -> ClusterMethod;

    fn detect(&self, network: &Network) -> Result<Partition>;
}

pub(crate) fn stage_level(verbose: bool) -> Level {
    if verbose {
        Level::Info
    } else {
        Level::Debug
    }
}

/// Best-of-`trials` modularity maximization.
#[derive(Clone, Debug)]
pub struct LouvainDetector {
    pub trials: usize,
    /// Trial `t` is seeded with `seed + t`
    pub seed: u64,
    pub verbose: bool,
}

impl LouvainDetector {
    /// Run a single trial.
    pub fn trial(&self, network: &Network, t: usize) -> (SimpleClustering, f64) {
        let mut louvain = Louvain::new(DEFAULT_RESOLUTION, Some(self.seed.wrapping_add(t as u64)));
        louvain.run(network)
    }
}

impl CommunityDetector for LouvainDetector {
    fn tag(&self) -> ClusterMethod {
        ClusterMethod::Louvain
    }

    fn detect(&self, network: &Network) -> Result<Partition> {
        if network.nodes() == 0 {
            return Err(ClusterError::EmptyInput);
        }
        if self.trials == 0 {
            return Err(ClusterError::InvalidArgument(
                "louvain_iter must be a positive integer".to_string(),
            ));
        }

        // Trials are independent; the fold below runs in trial order after all of them finish.
        let outcomes = (0..self.trials)
            .into_par_iter()
            .map(|t| self.trial(network, t))
            .collect::<Vec<_>>();

        let mut best: Option<(SimpleClustering, f64)> = None;
        for (t, (clustering, modularity)) in outcomes.into_iter().enumerate() {
            log!(
                stage_level(self.verbose),
                "louvain trial {}: {} clusters, modularity {:.6}",
                t + 1,
                clustering.num_clusters(),
                modularity
            );
            if best.as_ref().map_or(true, |(_, q)| modularity > *q) {
                best = Some((clustering, modularity));
            }
        }

        match best {
            Some((clustering, modularity)) => {
                log!(stage_level(self.verbose), "louvain: best modularity {:.6}", modularity);
                Ok(Partition::from_clustering(ClusterMethod::Louvain, clustering, modularity))
            }
            None => Err(ClusterError::EmptyInput),
        }
    }
}

/// CPM optimization at a fixed resolution.
#[derive(Clone, Debug)]
pub struct LeidenDetector {
    pub resolution: f64,
    pub num_iter: usize,
    pub randomness: f64,
    pub seed: u64,
}

impl CommunityDetector for LeidenDetector {
    fn tag(&self) -> ClusterMethod {
        ClusterMethod::Leiden
    }

    fn detect(&self, network: &Network) -> Result<Partition> {
        if network.nodes() == 0 {
            return Err(ClusterError::EmptyInput);
        }
        let mut leiden = Leiden::new(self.resolution, self.randomness, Some(self.seed));
        let (clustering, quality) = leiden.run(network, self.num_iter);
        debug!(
            "leiden: resolution {}, {} clusters, quality {:.6}",
            self.resolution,
            clustering.num_clusters(),
            quality
        );
        Ok(Partition::from_clustering(ClusterMethod::Leiden, clustering, quality))
    }
}

/// The built-in detector for `config.method`. The legacy tree-based method has none; callers
/// that need it pass their own detector to `cluster_cells_with`.
pub fn detector_for(config: &ClusterConfig) -> Result<Box<dyn CommunityDetector>> {
    match config.method {
        ClusterMethod::Louvain => Ok(Box::new(LouvainDetector {
            trials: config.louvain_iter,
            seed: config.random_seed,
            verbose: config.verbose,
        })),
        ClusterMethod::Leiden => Ok(Box::new(LeidenDetector {
            resolution: config.resolution_parameter,
            num_iter: config.louvain_iter,
            randomness: config.randomness,
            seed: config.random_seed,
        })),
        ClusterMethod::DdrTree => Err(ClusterError::UnsupportedConfiguration(
            "DDRTree clustering needs an external detector".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_level_follows_verbose() {
        assert_eq!(stage_level(true), Level::Info);
        assert_eq!(stage_level(false), Level::Debug);
    }
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    /// Four communities of 25 nodes with noisy edges between them.
    fn planted_network(seed: u64) -> Network {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut edges = Vec::new();
        for _ in 0..800 {
            let a = rng.random_range(0..100usize);
            let b = if rng.random_bool(0.7) {
                (a / 25) * 25 + rng.random_range(0..25)
            } else {
                rng.random_range(0..100)
            };
            if a != b {
                edges.push((a, b, rng.random_range(0.1f32..1.0)));
            }
        }
        Network::from_edges(100, edges).unwrap()
    }

    fn assert_complete(p: &Partition, n: usize) {
        assert_eq!(p.membership.len(), n);
        let members = p.members();
        assert_eq!(members.iter().map(|m| m.len()).sum::<usize>(), n);
        assert!(members.iter().all(|m| !m.is_empty()));
        assert!(members.windows(2).all(|w| w[0].len() >= w[1].len()));
    }

    #[test]
    fn test_best_of_n_louvain() {
        let network = planted_network(0);
        let seed = 42;
        let best = LouvainDetector {
            trials: 5,
            seed,
            verbose: false,
        }
        .detect(&network)
        .unwrap();
        assert_complete(&best, 100);

        for t in 0..5 {
            let single = LouvainDetector {
                trials: 1,
                seed: seed + t,
                verbose: false,
            }
            .detect(&network)
            .unwrap();
            assert!(best.quality >= single.quality);
        }
    }

    #[test]
    fn test_louvain_is_reproducible() {
        let network = planted_network(1);
        let detector = LouvainDetector {
            trials: 3,
            seed: 7,
            verbose: true,
        };
        assert_eq!(detector.detect(&network).unwrap(), detector.detect(&network).unwrap());
    }

    #[test]
    fn test_leiden_detector() {
        let network = planted_network(2);
        let detector = LeidenDetector {
            resolution: 0.05,
            num_iter: 2,
            randomness: 0.01,
            seed: 3,
        };
        let p = detector.detect(&network).unwrap();
        assert_eq!(p.method, ClusterMethod::Leiden);
        assert_complete(&p, 100);
        assert_eq!(p, detector.detect(&network).unwrap());
    }

    #[test]
    fn test_isolated_point_is_a_singleton() {
        // a triangle, a second triangle and node 6 with no edges
        let edges = vec![(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0), (3, 4, 1.0), (4, 5, 1.0), (3, 5, 1.0)];
        let network = Network::from_edges(7, edges).unwrap();

        let louvain = LouvainDetector {
            trials: 2,
            seed: 0,
            verbose: false,
        };
        let leiden = LeidenDetector {
            resolution: 0.1,
            num_iter: 2,
            randomness: 0.01,
            seed: 0,
        };
        for p in [louvain.detect(&network).unwrap(), leiden.detect(&network).unwrap()] {
            assert_complete(&p, 7);
            assert_eq!(p.num_clusters, 3);
            let isolated = p.membership[6];
            assert!(p.membership[..6].iter().all(|&l| l != isolated));
            assert_eq!(p.members()[isolated as usize], vec![6]);
        }
    }

    #[test]
    fn test_empty_network() {
        let network = Network::from_edges(0, vec![]).unwrap();
        let detector = LeidenDetector {
            resolution: 0.1,
            num_iter: 1,
            randomness: 0.01,
            seed: 0,
        };
        assert_eq!(detector.detect(&network), Err(ClusterError::EmptyInput));
    }

    #[test]
    fn test_detector_for() {
        let config = ClusterConfig {
            method: ClusterMethod::Louvain,
            ..ClusterConfig::default()
        };
        assert_eq!(detector_for(&config).unwrap().tag(), ClusterMethod::Louvain);
        assert_eq!(detector_for(&ClusterConfig::default()).unwrap().tag(), ClusterMethod::Leiden);

        let config = ClusterConfig {
            method: ClusterMethod::DdrTree,
            ..ClusterConfig::default()
        };
        assert!(matches!(
            detector_for(&config),
            Err(ClusterError::UnsupportedConfiguration(_))
        ));
    }
}
