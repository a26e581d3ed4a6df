use std::iter::{repeat, Repeat, Zip};
use std::slice::Iter;

/// Node index in an `UnGraph`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(u32);

impl NodeIndex {
    /// Position of the node in the graph
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for NodeIndex {
    fn from(ix: u32) -> Self {
        NodeIndex(ix)
    }
}

/// One endpoint-annotated view of an undirected edge.
#[derive(Copy, Clone, Debug)]
pub struct EdgeRef<'a> {
    source: NodeIndex,
    target: NodeIndex,
    weight: &'a f32,
}

impl<'a> EdgeRef<'a> {
    /// Node whose adjacency list holds this edge
    pub fn source(&self) -> NodeIndex {
        self.source
    }

    /// Other endpoint
    pub fn target(&self) -> NodeIndex {
        self.target
    }

    /// Edge weight
    pub fn weight(&self) -> &'a f32 {
        self.weight
    }
}

/// Half of an undirected edge, stored in the adjacency list of its source.
#[derive(Copy, Clone, Debug)]
pub struct HalfEdge {
    pub(crate) target: NodeIndex,
    pub(crate) weight: f32,
}

/// Edges incident to a single node.
pub struct Edges<'a> {
    source: NodeIndex,
    iter: Iter<'a, HalfEdge>,
}

impl<'a> Iterator for Edges<'a> {
    type Item = EdgeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|HalfEdge { target, weight }| EdgeRef {
            source: self.source,
            target: *target,
            weight,
        })
    }
}

type AdjacencyZip<'a> = Zip<Repeat<NodeIndex>, Iter<'a, HalfEdge>>;

/// Every undirected edge exactly once: the half with `target >= source`.
/// Self loops are stored once and reported once.
pub struct EdgeReferences<'a> {
    adjacency: std::iter::Enumerate<Iter<'a, Vec<HalfEdge>>>,
    current: Option<AdjacencyZip<'a>>,
}

impl<'a> Iterator for EdgeReferences<'a> {
    type Item = EdgeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(iter) = self.current.as_mut() {
                for (source, HalfEdge { target, weight }) in iter.by_ref() {
                    if target.0 >= source.0 {
                        return Some(EdgeRef {
                            source,
                            target: *target,
                            weight,
                        });
                    }
                }
            }
            let (ix, edges) = self.adjacency.next()?;
            self.current = Some(repeat(NodeIndex(ix as u32)).zip(edges.iter()));
        }
    }
}

/// Undirected multigraph with `f64` node weights and `f32` edge weights.
/// Parallel edges between the same pair of nodes are kept as separate entries.
#[derive(Clone, Debug, Default)]
pub struct UnGraph {
    pub(crate) edges: Vec<Vec<HalfEdge>>,
    node_weights: Vec<f64>,
    total_edges: usize,
}

impl UnGraph {
    /// Empty graph with room for `nodes` nodes
    pub fn with_capacity(nodes: usize) -> Self {
        UnGraph {
            edges: Vec::with_capacity(nodes),
            node_weights: Vec::with_capacity(nodes),
            total_edges: 0,
        }
    }

    /// Append a node with the given weight
    pub fn add_node(&mut self, weight: f64) -> NodeIndex {
        let index = NodeIndex(self.node_weights.len() as u32);
        self.edges.push(vec![]);
        self.node_weights.push(weight);
        index
    }

    /// Add an undirected edge. Both endpoints must already exist.
    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, weight: f32) {
        self.edges[source.index()].push(HalfEdge { target, weight });
        if source != target {
            self.edges[target.index()].push(HalfEdge { target: source, weight });
        }
        self.total_edges += 1;
    }

    /// Number of undirected edges, parallel edges counted separately
    pub fn edge_count(&self) -> usize {
        self.total_edges
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.node_weights.len()
    }

    /// Weight of node `ix`
    pub fn node_weight(&self, ix: NodeIndex) -> Option<&f64> {
        self.node_weights.get(ix.index())
    }

    /// Mutable weight of node `ix`
    pub fn node_weight_mut(&mut self, ix: NodeIndex) -> Option<&mut f64> {
        self.node_weights.get_mut(ix.index())
    }

    /// Weights of all nodes, in node order
    pub fn node_weights(&self) -> &[f64] {
        &self.node_weights
    }

    /// Number of adjacency entries of `ix`
    pub fn degree(&self, ix: NodeIndex) -> usize {
        self.edges[ix.index()].len()
    }

    /// Edges incident to `source`
    pub fn edges(&self, source: NodeIndex) -> Edges<'_> {
        Edges {
            source,
            iter: self.edges[source.index()].iter(),
        }
    }

    /// All node indices in order
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.node_count() as u32).map(NodeIndex)
    }

    /// Every undirected edge once
    pub fn edge_references(&self) -> EdgeReferences<'_> {
        EdgeReferences {
            adjacency: self.edges.iter().enumerate(),
            current: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_multigraph_edges() {
        let mut g = UnGraph::with_capacity(3);
        let a = g.add_node(1.0);
        let b = g.add_node(1.0);
        let c = g.add_node(1.0);
        g.add_edge(a, b, 0.5);
        g.add_edge(b, a, 0.25);
        g.add_edge(b, c, 1.0);

        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.degree(b), 3);
        assert_eq!(g.edge_references().count(), 3);

        let total: f32 = g.edge_references().map(|e| *e.weight()).sum();
        assert_eq!(total, 1.75);
        assert!(g.edges(c).all(|e| e.source() == c && e.target() == b));
    }

    #[test]
    fn test_isolated_node() {
        let mut g = UnGraph::with_capacity(2);
        let a = g.add_node(1.0);
        let b = g.add_node(2.0);
        assert_eq!(g.edges(a).count(), 0);
        assert_eq!(g.node_weight(b), Some(&2.0));
        assert_eq!(g.edge_references().count(), 0);
    }
}
