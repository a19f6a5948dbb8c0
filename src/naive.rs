//! Single-threaded enumeration straight from the pattern definitions.
//!
//! Used as ground truth for the staged pipelines; output is in the same canonical forms and
//! sorted.

use crate::adjacency::VertexId;
use crate::graph::{gallop, Graph};
use crate::tuple::PatternTuple;

/// Every chordal square as `[v, x, w, y]`: chord `x - y` with `x < y`, and `v < w` both
/// adjacent to `x` and `y`.
pub fn chordal_squares(graph: &Graph) -> Vec<PatternTuple> {
    let mut found = Vec::new();
    for (x, y) in graph.edge_list() {
        let mut common = Vec::new();
        intersect_and(graph.edges(x), graph.edges(y), |v| common.push(v));
        for (index, &v) in common.iter().enumerate() {
            for &w in &common[index + 1..] {
                found.push(PatternTuple::new(&[v, x, w, y]));
            }
        }
    }
    found.sort();
    found
}

/// Every solar square as `[h, x, v, y, w]`: hub `h` adjacent to the rim cycle
/// `x - v - y - w - x`, where `x` is the smallest rim vertex and `v < w`.
pub fn solar_squares(graph: &Graph) -> Vec<PatternTuple> {
    let mut found = Vec::new();
    for &hub in graph.vertices() {
        let rim = graph.edges(hub);
        for (index, &x) in rim.iter().enumerate() {
            let x_edges = graph.edges(x);
            for &y in &rim[index + 1..] {
                // opposite corners, both adjacent to the hub, x and y.
                let mut corners = Vec::new();
                intersect_and(x_edges, graph.edges(y), |c| if c > x && graph.has_edge(hub, c) { corners.push(c) });
                for (index, &v) in corners.iter().enumerate() {
                    for &w in &corners[index + 1..] {
                        found.push(PatternTuple::new(&[hub, x, v, y, w]));
                    }
                }
            }
        }
    }
    found.sort();
    found
}

/// Calls `func` on each element common to two sorted slices, in order.
pub fn intersect_and<F: FnMut(VertexId)>(aaa: &[VertexId], mut bbb: &[VertexId], mut func: F) {
    if aaa.len() > bbb.len() {
        intersect_and(bbb, aaa, func);
    }
    else if aaa.len() < bbb.len() / 16 {
        for &a in aaa {
            bbb = gallop(bbb, &a);
            if !bbb.is_empty() && bbb[0] == a {
                func(a)
            }
        }
    }
    else {
        for &a in aaa {
            while !bbb.is_empty() && bbb[0] < a {
                bbb = &bbb[1..];
            }
            if !bbb.is_empty() && a == bbb[0] {
                func(a);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clique(n: u64) -> Graph {
        let mut edges = Vec::new();
        for a in 0..n {
            for b in (a + 1)..n {
                edges.push((a, b));
            }
        }
        Graph::from_edges(edges).unwrap()
    }

    #[test]
    fn intersects_sorted_lists() {
        let mut found = Vec::new();
        intersect_and(&[1, 3, 5, 7, 9], &[2, 3, 4, 9], |x| found.push(x));
        assert_eq!(found, vec![3, 9]);

        let long: Vec<u64> = (0..100).collect();
        found.clear();
        intersect_and(&[17, 200], &long, |x| found.push(x));
        assert_eq!(found, vec![17]);
    }

    #[test]
    fn two_triangles_share_one_chord() {
        let graph = Graph::from_edges(vec![(1, 2), (1, 3), (2, 3), (2, 4), (3, 4)]).unwrap();
        assert_eq!(chordal_squares(&graph), vec![PatternTuple::new(&[1, 2, 4, 3])]);
        assert!(solar_squares(&graph).is_empty());
    }

    #[test]
    fn cliques() {
        // each of the six edges of a K4 is the chord of one square.
        assert_eq!(chordal_squares(&clique(4)).len(), 6);
        // a K5 has five hubs, each with three rim cycles over the other four.
        let wheels = solar_squares(&clique(5));
        assert_eq!(wheels.len(), 15);
        assert!(wheels.iter().all(|t| {
            let s = t.as_slice();
            s[1] < s[2] && s[1] < s[3] && s[1] < s[4] && s[2] < s[4]
        }));
    }

    #[test]
    fn wheel_has_one_solar_square() {
        let graph = Graph::from_edges(vec![(0, 1), (0, 2), (0, 3), (0, 4), (1, 2), (2, 3), (3, 4), (4, 1)]).unwrap();
        assert_eq!(solar_squares(&graph), vec![PatternTuple::new(&[0, 1, 2, 3, 4])]);
        // four triangles around the hub; each spoke is a chord between two of them.
        assert_eq!(chordal_squares(&graph).len(), 4);
    }
}
