use crate::fast_local_moving::FastLocalMoving;
use crate::local_merging::LocalMerging;
use crate::objective::cpm;
use crate::{Clustering, Network, SimpleClustering, ZeroVec};
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Default CPM resolution for Leiden
pub const DEFAULT_RESOLUTION: f64 = 0.1;

/// Default randomness of the refinement phase
pub const DEFAULT_RANDOMNESS: f64 = 1e-2;

/// Perform the Leiden clustering algorithm, optimizing the Constant Potts Model with node
/// weights as node sizes.
pub struct Leiden {
    resolution: f64,
    randomness: f64,

    rng: SmallRng,

    local_moving: FastLocalMoving,
    num_nodes_per_cluster_reduced_network: Vec<usize>,
}

impl Leiden {
    /// Initialize the Leiden algorithm with the given resolution and randomness parameters.
    /// An optional random seed can be supplied, otherwise a seed of 0 will be used.
    pub fn new(resolution: f64, randomness: f64, seed: Option<u64>) -> Leiden {
        Leiden {
            resolution,
            randomness,
            rng: SmallRng::seed_from_u64(seed.unwrap_or_default()),
            local_moving: FastLocalMoving::new(resolution),
            num_nodes_per_cluster_reduced_network: Vec::new(),
        }
    }

    /// Prepare `network` for CPM optimization: every node has size 1.
    pub fn build_network(network: &Network) -> Network {
        network.with_unit_weights()
    }

    /// Iterate the Leiden algorithm one step. Returns true if cluster labels were updated, otherwise returns false.
    pub fn iterate<C: Clustering>(&mut self, n: &Network, c: &mut C) -> bool {
        // Update the clustering by moving individual nodes between clusters.
        let mut update = self.local_moving.iterate(n, c, &mut self.rng);

        if c.num_clusters() == n.nodes() {
            return update;
        }

        let mut local_merging = LocalMerging::new(self.resolution, self.randomness);

        let subnetworks = n.create_subnetworks(c);

        let nodes_per_cluster = c.nodes_per_cluster();
        let unrefined = (0..n.nodes()).map(|i| c.get(i)).collect::<Vec<_>>();

        c.clear();

        self.num_nodes_per_cluster_reduced_network.zero_len(subnetworks.len());
        let mut cluster_counter = 0;

        // Refine each cluster independently; refined clusters get consecutive labels.
        for (i, subnetwork) in subnetworks.iter().enumerate() {
            let sub_clustering = local_merging.run(subnetwork, &mut self.rng);

            for j in 0..subnetwork.nodes() {
                c.set(nodes_per_cluster[i][j], cluster_counter + sub_clustering.get(j))
            }

            cluster_counter += sub_clustering.num_clusters();
            self.num_nodes_per_cluster_reduced_network[i] = sub_clustering.num_clusters()
        }
        c.remove_empty_clusters();

        // Refinement merged nothing: aggregate on the unrefined clustering so the
        // reduced network is strictly smaller than this one.
        if c.num_clusters() == n.nodes() {
            for (i, &label) in unrefined.iter().enumerate() {
                c.set(i, label);
            }
            c.remove_empty_clusters();

            let reduced_n = n.create_reduced_network(c);
            let mut clustering_reduced_network = C::init_different_clusters(reduced_n.nodes());
            update |= self.iterate(&reduced_n, &mut clustering_reduced_network);
            c.merge_clusters(&clustering_reduced_network);
            return update;
        }

        // Create an aggregate network based on the refined clustering of
        // the non-aggregate network.
        let reduced_n = n.create_reduced_network(c);

        // Create an initial clustering for the aggregate network based on the
        // non-refined clustering of the non-aggregate network.
        let mut clusters_reduced_network = vec![0; c.num_clusters()];

        let mut i = 0;
        for (j, num_nodes) in self.num_nodes_per_cluster_reduced_network.iter().enumerate() {
            for cluster in clusters_reduced_network.iter_mut().skip(i).take(*num_nodes) {
                *cluster = j;
            }
            i += num_nodes;
        }

        let mut clustering_reduced_network = C::new_from_labels(&clusters_reduced_network);

        // Recursively apply the algorithm to the aggregate network,
        // starting from the initial clustering created for this network.
        update |= self.iterate(&reduced_n, &mut clustering_reduced_network);

        // Update the clustering of the non-aggregate network so that it
        // coincides with the final clustering obtained for the aggregate
        // network.
        c.merge_clusters(&clustering_reduced_network);

        update
    }

    /// Run up to `num_iter` iterations from singletons, stopping early once an iteration leaves
    /// every label unchanged. Returns the clustering and its CPM quality on `network`.
    pub fn run(&mut self, network: &Network, num_iter: usize) -> (SimpleClustering, f64) {
        let n = Self::build_network(network);
        let mut clustering = SimpleClustering::init_different_clusters(n.nodes());

        for _ in 0..num_iter.max(1) {
            if !self.iterate(&n, &mut clustering) {
                break;
            }
        }

        let quality = cpm(self.resolution, &n, &clustering);
        (clustering, quality)
    }
}
