//! A static, undirected graph snapshot in compressed sparse row form.

use crate::adjacency::{AdjacencyRecord, Rank, VertexId};
use crate::error::Error;

/// Vertices with sorted neighbor lists, stored as offsets into one target array.
///
/// Vertex identifiers need not be dense; `vertices` is sorted and looked up by binary search.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    vertices: Vec<VertexId>,
    offsets: Vec<usize>,
    targets: Vec<VertexId>,
}

impl Graph {
    /// Builds a graph from undirected edges given in either orientation.
    ///
    /// Repeated edges collapse to one; a self loop is an error.
    pub fn from_edges<I>(edges: I) -> Result<Graph, Error>
    where
        I: IntoIterator<Item = (VertexId, VertexId)>,
    {
        let mut directed = Vec::new();
        for (src, dst) in edges {
            if src == dst {
                return Err(Error::InvalidAdjacency { owner: src, reason: "self loop".to_string() });
            }
            directed.push((src, dst));
            directed.push((dst, src));
        }
        directed.sort_unstable();
        directed.dedup();

        let mut graph = Graph { vertices: Vec::new(), offsets: vec![0], targets: Vec::with_capacity(directed.len()) };
        for (src, dst) in directed {
            if graph.vertices.last() != Some(&src) {
                if !graph.vertices.is_empty() {
                    graph.offsets.push(graph.targets.len());
                }
                graph.vertices.push(src);
            }
            graph.targets.push(dst);
        }
        if !graph.vertices.is_empty() {
            graph.offsets.push(graph.targets.len());
        }
        Ok(graph)
    }

    #[inline(always)]
    pub fn nodes(&self) -> usize { self.vertices.len() }

    /// Vertices with at least one edge, ascending.
    #[inline(always)]
    pub fn vertices(&self) -> &[VertexId] { &self.vertices }

    /// Sorted neighbors of `node`; empty if `node` is absent.
    #[inline(always)]
    pub fn edges(&self, node: VertexId) -> &[VertexId] {
        match self.vertices.binary_search(&node) {
            Ok(index) => &self.targets[self.offsets[index]..self.offsets[index + 1]],
            Err(_) => &[],
        }
    }

    #[inline(always)]
    pub fn degree(&self, node: VertexId) -> usize { self.edges(node).len() }

    pub fn has_edge(&self, a: VertexId, b: VertexId) -> bool {
        let (small, large) = if self.degree(a) <= self.degree(b) { (a, b) } else { (b, a) };
        let slice = gallop(self.edges(small), &large);
        !slice.is_empty() && slice[0] == large
    }

    /// Orientation rank of `node`.
    #[inline(always)]
    pub fn rank(&self, node: VertexId) -> Rank { (self.degree(node), node) }

    /// Each undirected edge once, as `(smaller, larger)`, ascending.
    pub fn edge_list(&self) -> Vec<(VertexId, VertexId)> {
        let mut list = Vec::with_capacity(self.targets.len() / 2);
        for &src in &self.vertices {
            let edges = self.edges(src);
            let upper = gallop_gt(edges, &src);
            list.extend(upper.iter().map(|&dst| (src, dst)));
        }
        list
    }

    /// Adjacency records for every vertex, lower-ranked neighbors chunked by `max_size`.
    pub fn adjacency_records(&self, max_size: usize) -> Result<Vec<AdjacencyRecord>, Error> {
        let mut records = Vec::with_capacity(self.vertices.len());
        let mut higher = Vec::new();
        let mut lower = Vec::new();
        for &node in &self.vertices {
            higher.clear();
            lower.clear();
            let own = self.rank(node);
            for &neighbor in self.edges(node) {
                if self.rank(neighbor) > own { higher.push(neighbor); }
                else                         { lower.push(neighbor); }
            }
            for record in AdjacencyRecord::chunked(node, &higher, &lower, max_size)? {
                record.check_orientation(|v| self.rank(v))?;
                records.push(record);
            }
        }
        Ok(records)
    }
}

// advances slice to start at the first element >= value.
pub fn gallop<'a, T: Ord>(mut slice: &'a [T], value: &T) -> &'a [T] {
    // if empty slice, or already >= element, return
    if !slice.is_empty() && &slice[0] < value {
        let mut step = 1;
        while step < slice.len() && &slice[step] < value {
            slice = &slice[step..];
            step <<= 1;
        }

        step >>= 1;
        while step > 0 {
            if step < slice.len() && &slice[step] < value {
                slice = &slice[step..];
            }
            step >>= 1;
        }

        slice = &slice[1..]; // advance one, as we always stayed < value
    }

    slice
}

// advances slice to start at the first element > value.
pub fn gallop_gt<'a, T: Ord>(mut slice: &'a [T], value: &T) -> &'a [T] {
    if !slice.is_empty() && &slice[0] <= value {
        let mut step = 1;
        while step < slice.len() && &slice[step] <= value {
            slice = &slice[step..];
            step <<= 1;
        }

        step >>= 1;
        while step > 0 {
            if step < slice.len() && &slice[step] <= value {
                slice = &slice[step..];
            }
            step >>= 1;
        }

        slice = &slice[1..]; // advance one, as we always stayed <= value
    }

    slice
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> Graph {
        Graph::from_edges(vec![(1, 2), (1, 3), (2, 3), (2, 4), (3, 4)]).unwrap()
    }

    #[test]
    fn builds_symmetric_csr() {
        let graph = diamond();
        assert_eq!(graph.nodes(), 4);
        assert_eq!(graph.edges(2), &[1, 3, 4]);
        assert_eq!(graph.edges(9), &[] as &[VertexId]);
        assert!(graph.has_edge(4, 3));
        assert!(!graph.has_edge(1, 4));
        assert_eq!(graph.edge_list(), vec![(1, 2), (1, 3), (2, 3), (2, 4), (3, 4)]);
    }

    #[test]
    fn collapses_repeated_edges() {
        let graph = Graph::from_edges(vec![(1, 2), (2, 1), (1, 2)]).unwrap();
        assert_eq!(graph.edge_list(), vec![(1, 2)]);
    }

    #[test]
    fn rejects_self_loop() {
        assert!(Graph::from_edges(vec![(1, 2), (3, 3)]).is_err());
    }

    #[test]
    fn records_respect_orientation() {
        let graph = diamond();
        let records = graph.adjacency_records(1).unwrap();
        for record in &records {
            record.check_orientation(|v| graph.rank(v)).unwrap();
        }
        // vertex 1 and 4 have degree 2, so 2 and 3 rank above them.
        let first = records.iter().find(|r| r.owner() == 1).unwrap();
        assert_eq!(first.higher(), &[2, 3]);
    }

    #[test]
    fn gallops() {
        let data = [1, 3, 5, 7, 9, 11];
        assert_eq!(gallop(&data, &6), &[7, 9, 11]);
        assert_eq!(gallop(&data, &7), &[7, 9, 11]);
        assert_eq!(gallop_gt(&data, &7), &[9, 11]);
        assert_eq!(gallop(&data, &20), &[] as &[i32]);
    }
}
