use crate::{Clustering, Network, SimpleClustering, ZeroVec};
use rand::seq::SliceRandom;
use rand::Rng;

/// Leiden refinement: starting from singletons inside one cluster's subnetwork, merge
/// well-connected singleton nodes into well-connected clusters. The target cluster is drawn
/// with probability proportional to `exp(increment / randomness)` among non-negative increments.
pub(crate) struct LocalMerging {
    randomness: f64,
    resolution: f64,
    cluster_weights: Vec<f64>,
    non_singleton_clusters: Vec<bool>,
    external_edge_weight_per_cluster: Vec<f64>,
    edge_weight_per_cluster: Vec<f64>,
    neighboring_clusters: Vec<usize>,
    cum_transformed_qv_incr_per_cluster: Vec<f64>,
    node_order: Vec<usize>,
}

impl LocalMerging {
    pub fn new(resolution: f64, randomness: f64) -> Self {
        LocalMerging {
            randomness,
            resolution,
            cluster_weights: Vec::new(),
            non_singleton_clusters: Vec::new(),
            external_edge_weight_per_cluster: Vec::new(),
            edge_weight_per_cluster: Vec::new(),
            neighboring_clusters: Vec::new(),
            cum_transformed_qv_incr_per_cluster: Vec::new(),
            node_order: Vec::new(),
        }
    }

    pub fn run(&mut self, n: &Network, rng: &mut impl Rng) -> SimpleClustering {
        let mut c = SimpleClustering::init_different_clusters(n.nodes());

        if n.nodes() <= 1 {
            return c;
        }

        let mut update = false;

        let total_node_weight = n.get_total_node_weight();
        self.cluster_weights.clear();
        self.cluster_weights.extend((0..n.nodes()).map(|i| n.weight(i)));

        n.get_total_edge_weight_per_node(&mut self.external_edge_weight_per_cluster);

        self.node_order.clear();
        self.node_order.extend(0..n.nodes());
        self.node_order.shuffle(rng);

        self.non_singleton_clusters.zero_len(n.nodes());
        self.edge_weight_per_cluster.zero_len(n.nodes());
        self.neighboring_clusters.zero_len(n.nodes() + 1);

        for i in 0..n.nodes() {
            let j = self.node_order[i];

            /*
             * Only nodes belonging to singleton clusters can be moved to a
             * different cluster. This guarantees that clusters will never be
             * split up. Additionally, only nodes that are well connected with
             * the rest of the network are considered for moving.
             */
            let thresh = self.cluster_weights[j] * (total_node_weight - self.cluster_weights[j]) * self.resolution;
            if self.non_singleton_clusters[j] || self.external_edge_weight_per_cluster[j] < thresh {
                continue;
            }

            // Taking the node out leaves its singleton cluster empty.
            self.cluster_weights[j] = 0.0;
            self.external_edge_weight_per_cluster[j] = 0.0;

            // The node's own (now empty) cluster is always a candidate.
            self.neighboring_clusters[0] = j;
            let mut num_neighboring_clusters = 1;

            for (neighbor, edge_weight) in n.neighbors(j) {
                if neighbor == j || edge_weight <= 0.0 {
                    continue;
                }
                let neighbor_cluster = c.get(neighbor);
                if self.edge_weight_per_cluster[neighbor_cluster] == 0.0 {
                    self.neighboring_clusters[num_neighboring_clusters] = neighbor_cluster;
                    num_neighboring_clusters += 1;
                }
                self.edge_weight_per_cluster[neighbor_cluster] += edge_weight;
            }

            /*
             * For each well-connected neighboring cluster compute the quality
             * increment of moving there. Non-negative increments get a
             * transformed weight exp(increment / randomness) that sets the
             * probability of choosing that cluster.
             */
            let mut best_cluster = j;
            let mut max_qv_increment = 0.0;
            let mut total_transformed_qv_increment = 0.0;
            self.cum_transformed_qv_incr_per_cluster.clear();
            for &l in &self.neighboring_clusters[..num_neighboring_clusters] {
                let thresh = self.cluster_weights[l] * (total_node_weight - self.cluster_weights[l]) * self.resolution;
                if self.external_edge_weight_per_cluster[l] >= thresh {
                    let qv_increment =
                        self.edge_weight_per_cluster[l] - n.weight(j) * self.cluster_weights[l] * self.resolution;

                    if qv_increment > max_qv_increment {
                        best_cluster = l;
                        max_qv_increment = qv_increment;
                    }

                    if qv_increment >= 0.0 {
                        total_transformed_qv_increment += (qv_increment / self.randomness).exp();
                    }
                }

                self.cum_transformed_qv_incr_per_cluster
                    .push(total_transformed_qv_increment);
                self.edge_weight_per_cluster[l] = 0.0;
            }

            // An overflowing exponent degenerates to the greedy choice.
            let chosen_cluster = if total_transformed_qv_increment < f64::INFINITY {
                let r = total_transformed_qv_increment * rng.random::<f64>();
                let idx = self
                    .cum_transformed_qv_incr_per_cluster
                    .partition_point(|&cum| cum < r)
                    .min(num_neighboring_clusters - 1);
                self.neighboring_clusters[idx]
            } else {
                best_cluster
            };

            self.cluster_weights[chosen_cluster] += n.weight(j);

            for (neighbor, edge_weight) in n.neighbors(j) {
                if neighbor == j {
                    continue;
                }
                if c.get(neighbor) == chosen_cluster {
                    self.external_edge_weight_per_cluster[chosen_cluster] -= edge_weight;
                } else {
                    self.external_edge_weight_per_cluster[chosen_cluster] += edge_weight;
                }
            }

            if chosen_cluster != j {
                c.set(j, chosen_cluster);
                self.non_singleton_clusters[chosen_cluster] = true;
                update = true;
            }
        }

        if update {
            c.remove_empty_clusters();
        }

        c
    }
}
