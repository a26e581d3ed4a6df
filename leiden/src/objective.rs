use crate::{Clustering, Network};
use rayon::prelude::*;

fn cluster_sums(weights: impl Iterator<Item = f64>, clustering: &impl Clustering) -> Vec<f64> {
    let mut cluster_weights = vec![0.0; clustering.num_clusters()];
    for (i, w) in weights.enumerate() {
        cluster_weights[clustering.get(i)] += w;
    }
    cluster_weights
}

/// Edge weight inside clusters (each edge counted twice) and total edge weight (each edge counted once).
fn internal_and_total_edge_weight(graph: &Network, clustering: &impl Clustering) -> (f64, f64) {
    let mut internal = 0.0f64;
    let mut total = 0.0f64;

    for (source, target, weight) in graph.edge_list() {
        let w = weight as f64;
        if clustering.get(source) == clustering.get(target) {
            internal += 2.0 * w;
        }
        total += w;
    }

    (internal, total)
}

/// Newman-Girvan modularity of a network clustering, with a resolution parameter
/// (1.0 gives classic modularity). Node strengths are derived from the edge weights,
/// the node weights of `graph` are not used. A network without edges has modularity 0.
pub fn modularity(resolution: f64, graph: &Network, clustering: &impl Clustering) -> f64 {
    let (internal, total_edge_weight) = internal_and_total_edge_weight(graph, clustering);
    if total_edge_weight == 0.0 {
        return 0.0;
    }

    let mut strengths = Vec::with_capacity(graph.nodes());
    graph.get_total_edge_weight_per_node(&mut strengths);

    let two_m = 2.0 * total_edge_weight;
    let mut quality = internal / two_m;
    for k in cluster_sums(strengths.into_iter(), clustering) {
        quality -= resolution * (k / two_m) * (k / two_m);
    }

    quality
}

/// Modularity computed with parallelization. Chunk results are reduced serially so the
/// result is deterministic.
pub fn par_modularity<C: Clustering + Sync>(resolution: f64, graph: &Network, clustering: &C) -> f64 {
    // Create a number of chunks that is large relative to typical thread-counts
    // To allow rayon to balance the uneven chunk loads induced by the "node ordering" constraint.
    let chunk_size = std::cmp::max(1, graph.nodes() / 64);
    let chunks = (0..graph.nodes())
        .collect::<Vec<usize>>()
        .par_chunks(chunk_size)
        .map(|nodes| {
            let mut internal = 0f64;
            let mut total = 0f64;
            let mut strength_per_cluster = Vec::new();

            for &i in nodes {
                let c_i = clustering.get(i);
                let mut strength = 0f64;
                for (j, w) in graph.neighbors(i) {
                    strength += if j == i { 2.0 * w } else { w };
                    // Enforce ordering of node indices to avoid processing edges twice.
                    if j <= i {
                        total += w;
                        internal += if c_i == clustering.get(j) { 2.0 * w } else { 0.0 };
                    }
                }
                strength_per_cluster.push((c_i, strength));
            }
            (internal, total, strength_per_cluster)
        })
        .collect::<Vec<_>>();

    let mut internal = 0f64;
    let mut total_edge_weight = 0f64;
    let mut cluster_strengths = vec![0f64; clustering.num_clusters()];
    for (chunk_internal, chunk_total, strengths) in chunks {
        internal += chunk_internal;
        total_edge_weight += chunk_total;
        for (c, s) in strengths {
            cluster_strengths[c] += s;
        }
    }

    if total_edge_weight == 0.0 {
        return 0.0;
    }

    let two_m = 2.0 * total_edge_weight;
    let mut quality = internal / two_m;
    for k in cluster_strengths {
        quality -= resolution * (k / two_m) * (k / two_m);
    }
    quality
}

/// The 'Constant Pott's Model' objective function of a network clustering,
/// using the node weights of `graph` as node sizes:
/// `(sum_c 2 * e_c - resolution * sum_c n_c^2) / 2m`, where `e_c` is the edge weight inside
/// cluster `c`, `n_c` the total node weight of `c` and `m` the total edge weight.
/// With node weights equal to node strengths and `resolution / 2m` this is modularity.
pub fn cpm(resolution: f64, graph: &Network, clustering: &impl Clustering) -> f64 {
    let (internal, total_edge_weight) = internal_and_total_edge_weight(graph, clustering);
    if total_edge_weight == 0.0 {
        return 0.0;
    }

    let mut quality = internal;
    for cluster_weight in cluster_sums((0..graph.nodes()).map(|i| graph.weight(i)), clustering) {
        quality -= cluster_weight * cluster_weight * resolution;
    }

    quality / (2.0 * total_edge_weight)
}
