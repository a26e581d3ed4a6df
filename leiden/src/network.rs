use crate::graph::{Edges, NodeIndex, UnGraph};
use crate::Clustering;
use fxhash::FxHashMap;
use rayon::prelude::{IndexedParallelIterator, ParallelIterator};
use rayon::slice::ParallelSlice;
use thiserror::Error;

/// Undirected multigraph with f64 node weights and f32 edge weights. Used to represent the network being clustered.
pub type Graph = UnGraph;

const EDGE_SUM_CHUNK: usize = 256;

/// Reasons an edge list cannot be assembled into a `Network`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    /// An edge references a node outside `0..nodes`.
    #[error("edge references node {node}, but the network has {nodes} nodes")]
    NodeOutOfRange {
        /// Offending node index
        node: usize,
        /// Number of nodes in the network
        nodes: usize,
    },
    /// An edge weight is negative, NaN or infinite.
    #[error("edge ({from}, {to}) has invalid weight {weight}")]
    InvalidWeight {
        /// First endpoint of the edge
        from: usize,
        /// Second endpoint of the edge
        to: usize,
        /// Offending weight
        weight: f32,
    },
}

/// Container for the network graph.
#[derive(Clone, Debug, Default)]
pub struct Network {
    pub(crate) graph: Graph,
}

/// Iterator over pairs of (adjacent node id, edge_weight) for all neighbors of a chosen node.
pub struct NeighborAndWeightIter<'a> {
    edge_iter: Edges<'a>,
}

impl Iterator for NeighborAndWeightIter<'_> {
    type Item = (usize, f64);

    fn next(&mut self) -> Option<Self::Item> {
        self.edge_iter
            .next()
            .map(|edge_ref| (edge_ref.target().index(), *edge_ref.weight() as f64))
    }
}

impl Network {
    /// Create a new empty network
    pub fn new() -> Network {
        Network {
            graph: Graph::with_capacity(0),
        }
    }

    /// Create a new network from a graph
    pub fn new_from_graph(graph: Graph) -> Network {
        Network { graph }
    }

    /// Assemble a network over nodes `0..nodes` from an undirected edge list.
    /// Every node is present even if no edge touches it. Duplicate and reversed
    /// edges are kept as parallel edges, their weights add up wherever the
    /// algorithms aggregate edge weight. Node weights are initialized to 1.
    pub fn from_edges<I>(nodes: usize, edges: I) -> Result<Network, NetworkError>
    where
        I: IntoIterator<Item = (usize, usize, f32)>,
    {
        let mut graph = Graph::with_capacity(nodes);
        for _ in 0..nodes {
            graph.add_node(1.0);
        }

        for (source, target, weight) in edges {
            for node in [source, target] {
                if node >= nodes {
                    return Err(NetworkError::NodeOutOfRange { node, nodes });
                }
            }
            if !weight.is_finite() || weight < 0.0 {
                return Err(NetworkError::InvalidWeight {
                    from: source,
                    to: target,
                    weight,
                });
            }
            graph.add_edge((source as u32).into(), (target as u32).into(), weight);
        }

        Ok(Network { graph })
    }

    /// Copy of this network whose node weights are the weighted degree of each node.
    /// This is the node weighting under which `cpm` coincides with modularity.
    pub fn with_strength_weights(&self) -> Network {
        let mut strengths = Vec::with_capacity(self.nodes());
        self.get_total_edge_weight_per_node(&mut strengths);

        let mut graph = self.graph.clone();
        for (i, s) in strengths.into_iter().enumerate() {
            if let Some(w) = graph.node_weight_mut((i as u32).into()) {
                *w = s;
            }
        }
        Network { graph }
    }

    /// Copy of this network with every node weight set to 1.
    pub fn with_unit_weights(&self) -> Network {
        let mut graph = self.graph.clone();
        for i in 0..self.nodes() {
            if let Some(w) = graph.node_weight_mut((i as u32).into()) {
                *w = 1.0;
            }
        }
        Network { graph }
    }

    /// Number of nodes in the graph
    pub fn nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of undirected edges, counting parallel edges separately
    pub fn edges_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Get the node weight of `node`.
    pub fn weight(&self, node: usize) -> f64 {
        self.graph.node_weights()[node]
    }

    /// Number of edges incident to `node`
    pub fn degree(&self, node: usize) -> usize {
        self.graph.degree(NodeIndex::from(node as u32))
    }

    fn edges(&self, node: usize) -> Edges<'_> {
        self.graph.edges((node as u32).into())
    }

    /// Iterator over pairs of (adjacent node id, edge_weight) for all neighbors of `node`.
    pub fn neighbors(&self, node: usize) -> NeighborAndWeightIter<'_> {
        NeighborAndWeightIter {
            edge_iter: self.edges(node),
        }
    }

    /// Iterator over (source, target, weight) for every undirected edge, each reported once
    pub fn edge_list(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), *e.weight()))
    }

    /// Get the total weight of all nodes in the graph
    pub fn get_total_node_weight(&self) -> f64 {
        self.graph.node_weights().iter().sum()
    }

    /// Get the total edge weight of all nodes in the graph
    pub fn get_total_edge_weight(&self) -> f64 {
        self.graph
            .edge_references()
            .fold(0.0, |acc, edge| acc + *edge.weight() as f64)
    }

    /// Get the total edge weight of all nodes in the graph, summed over chunks in parallel.
    /// The chunk sums are reduced serially so the result is deterministic.
    pub fn get_total_edge_weight_par(&self) -> f64 {
        let mut partial_sums = vec![];

        // every edge between distinct nodes is seen from both ends; self loops only once
        self.graph
            .edges
            .par_chunks(EDGE_SUM_CHUNK)
            .enumerate()
            .map(|(chunk, adjacency)| {
                adjacency
                    .iter()
                    .enumerate()
                    .map(|(offset, half_edges)| {
                        let node = chunk * EDGE_SUM_CHUNK + offset;
                        half_edges.iter().fold(0.0, |acc, e| {
                            let w = e.weight as f64;
                            acc + if e.target.index() == node { 2.0 * w } else { w }
                        })
                    })
                    .sum::<f64>()
            })
            .collect_into_vec(&mut partial_sums);

        partial_sums.iter().sum::<f64>() / 2.0
    }

    /// Tabulate the total edge weight of each node into `result`. A self loop counts twice.
    pub fn get_total_edge_weight_per_node(&self, result: &mut Vec<f64>) {
        result.clear();

        for i in 0..self.nodes() {
            let mut w = 0.0;
            for e in self.edges(i) {
                let ew = *e.weight() as f64;
                w += if e.target().index() == i { 2.0 * ew } else { ew };
            }

            result.push(w);
        }
    }

    /// Creates a reduced (or aggregate) network based on a clustering.
    /// Each node in the reduced network corresponds to a cluster of nodes in
    /// the original network. The weight of a node in the reduced network equals
    /// the sum of the weights of the nodes in the corresponding cluster in the
    /// original network. The weight of an edge between two nodes in the reduced
    /// network equals the sum of the weights of the edges between the nodes in
    /// the two corresponding clusters in the original network. Edge weight inside
    /// a cluster is dropped.
    pub fn create_reduced_network(&self, clustering: &impl Clustering) -> Network {
        let mut cluster_g = Graph::with_capacity(clustering.num_clusters());

        for i in 0..clustering.num_clusters() {
            let ni = cluster_g.add_node(0.0);
            debug_assert_eq!(ni.index(), i);
        }

        for n in self.graph.node_indices() {
            let cluster = clustering.get(n.index());
            if let Some(w) = cluster_g.node_weight_mut((cluster as u32).into()) {
                *w += self.graph.node_weights()[n.index()];
            }
        }

        let mut edge_memo: FxHashMap<(u32, u32), f32> = FxHashMap::default();

        for e in self.graph.edge_references() {
            let c1 = clustering.get(e.source().index()) as u32;
            let c2 = clustering.get(e.target().index()) as u32;

            if c1 == c2 {
                continue;
            }

            let key = if c1 < c2 { (c1, c2) } else { (c2, c1) };
            *edge_memo.entry(key).or_insert(0.0) += e.weight();
        }

        // sort so the adjacency order, and hence the optimizers, do not depend on hash order
        let mut reduced_edges = edge_memo.into_iter().collect::<Vec<_>>();
        reduced_edges.sort_unstable_by_key(|&(key, _)| key);

        for ((c1, c2), weight) in reduced_edges {
            cluster_g.add_edge(c1.into(), c2.into(), weight);
        }

        Network { graph: cluster_g }
    }

    /// Make a subnetwork for each cluster, containing the cluster's nodes and the edges among them.
    /// Nodes keep their relative order, so node `j` of subnetwork `c` is `c.nodes_per_cluster()[c][j]`.
    pub fn create_subnetworks(&self, c: &impl Clustering) -> Vec<Network> {
        let mut graphs = Vec::with_capacity(c.num_clusters());
        let mut new_id_map = Vec::with_capacity(c.nodes());
        let mut counts = vec![0u32; c.num_clusters()];

        for _ in 0..c.num_clusters() {
            graphs.push(Graph::with_capacity(0));
        }

        for i in 0..self.nodes() {
            let cluster = c.get(i);

            new_id_map.push(counts[cluster]);
            counts[cluster] += 1;
            graphs[cluster].add_node(self.weight(i));
        }

        for e in self.graph.edge_references() {
            let n1 = e.source().index();
            let c1 = c.get(n1);

            let n2 = e.target().index();
            let c2 = c.get(n2);

            if c1 == c2 && n1 != n2 {
                graphs[c1].add_edge(new_id_map[n1].into(), new_id_map[n2].into(), *e.weight());
            }
        }

        graphs.into_iter().map(|graph| Network { graph }).collect()
    }
}
