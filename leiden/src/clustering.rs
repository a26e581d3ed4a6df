/// Trait representing a clustering over a set of items
/// Each item is assigned a single integer label
pub trait Clustering: std::fmt::Debug {
    /// Initialize a fresh clustering with each node in it's own cluster
    fn init_different_clusters(num_nodes: usize) -> Self;

    /// Initialize a fresh clustering with all nodes in a single cluser
    fn init_same_cluster(num_nodes: usize) -> Self;

    /// Initialize the clustering with a known set of labels
    fn new_from_labels(labels: &[usize]) -> Self;

    /// Tabulate the nodes in each cluster, in increasing node order
    fn nodes_per_cluster(&self) -> Vec<Vec<usize>>;

    /// Get the label of node `i`
    fn get(&self, i: usize) -> usize;

    /// Set the label of node 'i'. Note this must update the number of clusters
    fn set(&mut self, i: usize, cluster: usize);

    /// Total number of nodes
    fn nodes(&self) -> usize;

    /// Number of distinct clusters
    fn num_clusters(&self) -> usize;

    /// Reassign node labels, removing unused labels
    fn remove_empty_clusters(&mut self);

    /// Take clustering of the cluster labels, and reassign label to reflect the higher-order clustering
    fn merge_clusters<C: Clustering>(&mut self, cluster_clusterings: &C) {
        for i in 0..self.nodes() {
            self.set(i, cluster_clusterings.get(self.get(i)))
        }

        self.remove_empty_clusters();
    }

    /// Set all cluster labels to 0.
    fn clear(&mut self) {
        for i in 0..self.nodes() {
            self.set(i, 0);
        }

        self.remove_empty_clusters();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// A basic Vec-backed implementation of `Clustering`
pub struct SimpleClustering {
    labels: Vec<usize>,
    num_clusters: usize,
}

impl SimpleClustering {
    /// Cluster label of every node, in node order
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Relabel clusters from greatest size to least, so label 0 is the largest cluster.
    /// Clusters of equal size keep the order in which they first appear.
    pub fn relabel_by_size(&mut self) {
        let mut sizes = vec![(0usize, usize::MAX); self.num_clusters];
        for (node, &l) in self.labels.iter().enumerate() {
            if sizes[l].0 == 0 {
                sizes[l].1 = node;
            }
            sizes[l].0 += 1;
        }

        let mut order = (0..self.num_clusters).collect::<Vec<_>>();
        order.sort_by(|&a, &b| sizes[b].0.cmp(&sizes[a].0).then(sizes[a].1.cmp(&sizes[b].1)));

        let mut map = vec![0; self.num_clusters];
        for (new_label, old_label) in order.into_iter().enumerate() {
            map[old_label] = new_label;
        }
        for l in self.labels.iter_mut() {
            *l = map[*l];
        }
    }
}

impl Clustering for SimpleClustering {
    fn init_different_clusters(num_nodes: usize) -> Self {
        SimpleClustering {
            labels: (0..num_nodes).collect(),
            num_clusters: num_nodes,
        }
    }

    fn init_same_cluster(num_nodes: usize) -> Self {
        SimpleClustering {
            labels: vec![0; num_nodes],
            num_clusters: usize::from(num_nodes > 0),
        }
    }

    fn new_from_labels(input_labels: &[usize]) -> Self {
        let max_cluster = input_labels.iter().copied().max();

        let mut r = SimpleClustering {
            labels: input_labels.to_vec(),
            num_clusters: max_cluster.map_or(0, |m| m + 1),
        };

        r.remove_empty_clusters();
        r
    }

    fn nodes_per_cluster(&self) -> Vec<Vec<usize>> {
        let mut cluster_lists = vec![Vec::new(); self.num_clusters()];

        for (node, label) in self.labels.iter().enumerate() {
            cluster_lists[*label].push(node)
        }

        cluster_lists
    }

    fn get(&self, node: usize) -> usize {
        self.labels[node]
    }

    fn set(&mut self, node: usize, label: usize) {
        self.labels[node] = label;
        if label >= self.num_clusters {
            self.num_clusters = label + 1;
        }
    }

    fn nodes(&self) -> usize {
        self.labels.len()
    }

    fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    fn remove_empty_clusters(&mut self) {
        let mut counts = vec![0usize; self.num_clusters()];

        for &l in self.labels.iter() {
            counts[l] += 1;
        }

        let mut new_labels = Vec::with_capacity(self.num_clusters());

        let mut new_label = 0;
        for cluster_count in counts {
            if cluster_count == 0 {
                new_labels.push(usize::MAX);
            } else {
                new_labels.push(new_label);
                new_label += 1;
            }
        }

        for l in self.labels.iter_mut() {
            *l = new_labels[*l];
            debug_assert!(*l != usize::MAX);
        }

        self.num_clusters = new_label;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_labels() {
        let labels = vec![1, 2, 3, 4, 5];
        let mut c = SimpleClustering::new_from_labels(&labels);
        assert_eq!(c.num_clusters(), 5);

        c.remove_empty_clusters();
        assert_eq!(c.num_clusters(), 5);
        assert_eq!(c.labels(), &[0, 1, 2, 3, 4])
    }

    #[test]
    fn test_empty() {
        let c = SimpleClustering::new_from_labels(&[]);
        assert_eq!(c.num_clusters(), 0);
        assert_eq!(SimpleClustering::init_same_cluster(0).num_clusters(), 0);
    }

    #[test]
    fn test_operations() {
        let mut c = SimpleClustering::init_different_clusters(10);
        assert_eq!(c.num_clusters(), 10);

        c.set(8, 0);
        c.set(7, 0);

        c.remove_empty_clusters();

        assert_eq!(c.num_clusters(), 8);
        assert_eq!(c.get(9), 7);
    }

    #[test]
    fn test_merge_clusters() {
        let mut c = SimpleClustering::new_from_labels(&[0, 1, 2, 2, 3]);
        let higher = SimpleClustering::new_from_labels(&[1, 0, 1, 0]);
        c.merge_clusters(&higher);
        assert_eq!(c.labels(), &[1, 0, 1, 1, 0]);
        assert_eq!(c.num_clusters(), 2);
    }

    #[test]
    fn test_relabel_by_size() {
        let mut c = SimpleClustering::new_from_labels(&[0, 1, 1, 2, 2, 2, 3, 4]);
        c.relabel_by_size();
        assert_eq!(c.labels(), &[2, 1, 1, 0, 0, 0, 3, 4]);
        assert_eq!(c.num_clusters(), 5);
    }
}
