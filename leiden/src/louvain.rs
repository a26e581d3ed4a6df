use crate::objective::modularity;
use crate::standard_local_moving::StandardLocalMoving;
use crate::{Clustering, Network, SimpleClustering};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Default resolution for Louvain
pub const DEFAULT_RESOLUTION: f64 = 1.0;

/// Stop repeating multilevel passes once modularity improves by less than this
pub const TOLERANCE: f64 = 1e-10;

/// Upper bound on multilevel passes in `Louvain::run`
pub const MAX_PASSES: usize = 32;

/// Perform the Louvain clustering algorithm, maximizing modularity.
pub struct Louvain {
    resolution: f64,
    rng: ChaCha20Rng,
}

impl Louvain {
    /// Initialize the Louvain algorithm with the given modularity resolution.
    /// An optional random seed can be supplied, otherwise a seed of 0 will be used.
    pub fn new(resolution: f64, seed: Option<u64>) -> Louvain {
        Louvain {
            resolution,
            rng: ChaCha20Rng::seed_from_u64(seed.unwrap_or_default()),
        }
    }

    /// Prepare `network` for modularity optimization: node weights become node strengths.
    pub fn build_network(network: &Network) -> Network {
        network.with_strength_weights()
    }

    /// Iterate the Louvain algorithm a single level: local moving only.
    /// `n` must carry strength node weights, see `build_network`.
    pub fn iterate_one_level<C: Clustering>(&mut self, n: &Network, c: &mut C) -> bool {
        let mut local_moving = StandardLocalMoving::new(self.scaled_resolution(n));
        local_moving.iterate(n, c, &mut self.rng)
    }

    /// One multilevel pass: move nodes until stable, aggregate clusters into a reduced
    /// network and recurse on it. Returns true if cluster labels were updated.
    /// `n` must carry strength node weights, see `build_network`.
    pub fn iterate<C: Clustering>(&mut self, n: &Network, c: &mut C) -> bool {
        let mut local_moving = StandardLocalMoving::new(self.scaled_resolution(n));
        self.iterate_level(&mut local_moving, n, c)
    }

    fn iterate_level<C: Clustering>(&mut self, local_moving: &mut StandardLocalMoving, n: &Network, c: &mut C) -> bool {
        // Update the clustering by moving individual nodes between clusters.
        let mut update = local_moving.iterate(n, c, &mut self.rng);

        if c.num_clusters() == n.nodes() {
            return update;
        }

        // Create an aggregate network based on the clustering of the non-aggregate network.
        let reduced_n = n.create_reduced_network(c);

        // Create one-cluster-per-node clustering
        let mut reduced_clusters = C::init_different_clusters(reduced_n.nodes());

        update |= self.iterate_level(local_moving, &reduced_n, &mut reduced_clusters);

        c.merge_clusters(&reduced_clusters);

        update
    }

    /// Run multilevel passes from singletons until modularity stops improving.
    /// Returns the clustering and its modularity on `network`.
    pub fn run(&mut self, network: &Network) -> (SimpleClustering, f64) {
        let n = Self::build_network(network);
        let mut clustering = SimpleClustering::init_different_clusters(n.nodes());
        let mut score = modularity(self.resolution, &n, &clustering);

        for _ in 0..MAX_PASSES {
            let mut candidate = clustering.clone();
            if !self.iterate(&n, &mut candidate) {
                break;
            }
            let new_score = modularity(self.resolution, &n, &candidate);
            if new_score < score {
                break;
            }
            let gain = new_score - score;
            clustering = candidate;
            score = new_score;
            if gain <= TOLERANCE {
                break;
            }
        }

        (clustering, score)
    }

    /// Modularity optimization in the raw-resolution form used by local moving:
    /// `resolution / 2m`, with node weights equal to strengths.
    fn scaled_resolution(&self, n: &Network) -> f64 {
        let total_node_weight = n.get_total_node_weight();
        if total_node_weight > 0.0 {
            self.resolution / total_node_weight
        } else {
            0.0
        }
    }
}
