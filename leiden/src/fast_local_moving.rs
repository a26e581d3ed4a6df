use crate::{Clustering, Network, ZeroVec};
use rand::{seq::SliceRandom, Rng};

/// Queue-based local moving used by Leiden. Every node starts in the queue in a random order.
/// When a node changes cluster, its neighbors outside the new cluster are queued again, so only
/// nodes whose neighborhood changed are revisited.
#[derive(Default)]
pub(crate) struct FastLocalMoving {
    resolution: f64,
    cluster_weights: Vec<f64>,
    nodes_per_cluster: Vec<usize>,
    unused_clusters: Vec<usize>,
    node_order: Vec<usize>,
    stable_nodes: Vec<bool>,
    edge_weight_per_cluster: Vec<f64>,
    neighboring_clusters: Vec<usize>,
}

impl FastLocalMoving {
    pub fn new(resolution: f64) -> Self {
        FastLocalMoving {
            resolution,
            ..FastLocalMoving::default()
        }
    }

    pub fn iterate(&mut self, n: &Network, c: &mut impl Clustering, rng: &mut impl Rng) -> bool {
        let mut update = false;
        let num_nodes = n.nodes();

        if num_nodes == 0 {
            return update;
        }

        self.cluster_weights.zero_len(num_nodes);
        self.nodes_per_cluster.zero_len(num_nodes);

        for i in 0..num_nodes {
            self.cluster_weights[c.get(i)] += n.weight(i);
            self.nodes_per_cluster[c.get(i)] += 1;
        }

        let mut num_unused_clusters = 0;
        self.unused_clusters.zero_len(num_nodes);
        for i in (0..num_nodes).rev() {
            if self.nodes_per_cluster[i] == 0 {
                self.unused_clusters[num_unused_clusters] = i;
                num_unused_clusters += 1;
            }
        }

        self.node_order.clear();
        self.node_order.extend(0..num_nodes);
        self.node_order.shuffle(rng);

        self.stable_nodes.zero_len(num_nodes);
        self.edge_weight_per_cluster.zero_len(num_nodes);
        self.neighboring_clusters.zero_len(num_nodes + 1);

        /*
         * node_order is a circular queue: the nodes still to be visited are
         * node_order[i], ..., node_order[i + num_unstable_nodes - 1], wrapping
         * around at the end of the array.
         */
        let mut num_unstable_nodes = num_nodes;
        let mut i = 0;

        while num_unstable_nodes > 0 {
            let j = self.node_order[i];
            let current_cluster = c.get(j);

            self.cluster_weights[current_cluster] -= n.weight(j);
            self.nodes_per_cluster[current_cluster] -= 1;
            if self.nodes_per_cluster[current_cluster] == 0 {
                self.unused_clusters[num_unused_clusters] = current_cluster;
                num_unused_clusters += 1;
            }

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

            self.stable_nodes[j] = true;
            num_unstable_nodes -= 1;

            if best_cluster != current_cluster {
                c.set(j, best_cluster);
                update = true;

                // Neighbors left outside the new cluster may now prefer to move; queue them again.
                for (k, edge_weight) in n.neighbors(j) {
                    if k == j || edge_weight <= 0.0 {
                        continue;
                    }
                    if self.stable_nodes[k] && c.get(k) != best_cluster {
                        self.stable_nodes[k] = false;
                        num_unstable_nodes += 1;
                        let slot = (i + num_unstable_nodes) % num_nodes;
                        self.node_order[slot] = k;
                    }
                }
            }

            i = (i + 1) % num_nodes;
        }

        if update {
            c.remove_empty_clusters();
        }

        update
    }
}
