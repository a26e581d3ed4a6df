use crate::{Clustering, Network, ZeroVec};
use rand::{seq::SliceRandom, Rng};

/// Louvain local moving: visit the nodes in a random order, cyclically, moving each one to the
/// neighboring cluster with the largest quality increment, until a full cycle moves no node.
/// `resolution` is applied as-is to `node_weight * cluster_weight`; callers scale it.
#[derive(Default)]
pub(crate) struct StandardLocalMoving {
    resolution: f64,
    cluster_weights: Vec<f64>,
    nodes_per_cluster: Vec<usize>,
    unused_clusters: Vec<usize>,
    node_order: Vec<usize>,
    edge_weight_per_cluster: Vec<f64>,
    neighboring_clusters: Vec<usize>,
}

impl StandardLocalMoving {
    pub fn new(resolution: f64) -> Self {
        StandardLocalMoving {
            resolution,
            ..StandardLocalMoving::default()
        }
    }

    pub fn iterate(&mut self, n: &Network, c: &mut impl Clustering, rng: &mut impl Rng) -> bool {
        let mut update = false;

        if n.nodes() == 0 {
            return update;
        }

        self.cluster_weights.zero_len(n.nodes());
        self.nodes_per_cluster.zero_len(n.nodes());

        for i in 0..n.nodes() {
            self.cluster_weights[c.get(i)] += n.weight(i);
            self.nodes_per_cluster[c.get(i)] += 1;
        }

        let mut num_unused_clusters = 0;
        self.unused_clusters.zero_len(n.nodes());

        // make a list of unused cluster ids.
        for i in (0..n.nodes()).rev() {
            if self.nodes_per_cluster[i] == 0 {
                self.unused_clusters[num_unused_clusters] = i;
                num_unused_clusters += 1;
            }
        }

        // generate random permutation of the nodes
        self.node_order.clear();
        self.node_order.extend(0..n.nodes());
        self.node_order.shuffle(rng);

        self.edge_weight_per_cluster.zero_len(n.nodes());
        self.neighboring_clusters.zero_len(n.nodes() + 1);

        // Cycle through node_order until n.nodes() consecutive visits leave their node in place.
        let mut num_stable_nodes = 0;
        let mut i = 0;

        while num_stable_nodes < n.nodes() {
            let j = self.node_order[i];
            let current_cluster = c.get(j);

            // Remove the currently selected node from its current cluster.
            self.cluster_weights[current_cluster] -= n.weight(j);
            self.nodes_per_cluster[current_cluster] -= 1;
            if self.nodes_per_cluster[current_cluster] == 0 {
                self.unused_clusters[num_unused_clusters] = current_cluster;
                num_unused_clusters += 1;
            }

            /*
             * Identify the neighboring clusters of the currently selected
             * node. An empty cluster is also included, so it is always
             * possible for the node to end up on its own.
             */
            self.neighboring_clusters[0] = self.unused_clusters[num_unused_clusters - 1];
            let mut num_neighboring_clusters = 1;
            for (target, edge_weight) in n.neighbors(j) {
                if target == j || edge_weight <= 0.0 {
                    continue;
                }
                let neighbor_cluster = c.get(target);

                if self.edge_weight_per_cluster[neighbor_cluster] == 0.0 {
                    self.neighboring_clusters[num_neighboring_clusters] = neighbor_cluster;
                    num_neighboring_clusters += 1;
                }
                self.edge_weight_per_cluster[neighbor_cluster] += edge_weight;
            }

            /*
             * Move to the cluster with the strictly largest increment of the
             * quality function. Staying in the old cluster wins every tie,
             * which guarantees that the loop terminates.
             */
            let mut best_cluster = current_cluster;
            let mut max_qv_increment = self.edge_weight_per_cluster[current_cluster]
                - n.weight(j) * self.cluster_weights[current_cluster] * self.resolution;

            for &l in &self.neighboring_clusters[..num_neighboring_clusters] {
                let qv_increment =
                    self.edge_weight_per_cluster[l] - n.weight(j) * self.cluster_weights[l] * self.resolution;
                if qv_increment > max_qv_increment {
                    best_cluster = l;
                    max_qv_increment = qv_increment;
                }
                self.edge_weight_per_cluster[l] = 0.0;
            }
            self.edge_weight_per_cluster[current_cluster] = 0.0;

            self.cluster_weights[best_cluster] += n.weight(j);
            self.nodes_per_cluster[best_cluster] += 1;

            if best_cluster == self.unused_clusters[num_unused_clusters - 1] {
                num_unused_clusters -= 1;
            }

            if best_cluster == current_cluster {
                num_stable_nodes += 1;
            } else {
                c.set(j, best_cluster);
                num_stable_nodes = 1;
                update = true;
            }

            i = (i + 1) % n.nodes();
        }

        if update {
            c.remove_empty_clusters();
        }

        update
    }
}
