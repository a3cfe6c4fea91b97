// Similarity graph: one node per fingerprinted domain, an edge for every
// pair within the Hamming threshold

use crate::domain::Domain;
use crate::error::{GroupError, Result};
use crate::fingerprint::{Fingerprint, FingerprintMap, hamming_distance};
use std::collections::HashMap;
use tracing::info;

/// Undirected, unweighted adjacency-list graph over domains
#[derive(Debug, Clone)]
pub struct SimilarityGraph {
    nodes: Vec<Domain>,
    index: HashMap<Domain, usize>,
    adjacency: Vec<Vec<usize>>,
    edge_count: usize,
    threshold: u32,
}

impl SimilarityGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn nodes(&self) -> &[Domain] {
        &self.nodes
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.index.contains_key(domain)
    }

    /// Neighbours of a domain, or `None` if it is not a node
    pub fn neighbors(&self, domain: &str) -> Option<Vec<&Domain>> {
        let &i = self.index.get(domain)?;
        Some(self.adjacency[i].iter().map(|&j| &self.nodes[j]).collect())
    }

    pub fn are_connected(&self, a: &str, b: &str) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&i), Some(&j)) => self.adjacency[i].contains(&j),
            _ => false,
        }
    }

    pub(crate) fn adjacency(&self) -> &[Vec<usize>] {
        &self.adjacency
    }
}

/// Compare every unordered pair of fingerprints and connect the pairs whose
/// distance is at most `threshold`. Quadratic in the number of domains.
pub fn build_similarity_graph(fingerprints: &FingerprintMap, threshold: u32) -> Result<SimilarityGraph> {
    if threshold > Fingerprint::BITS {
        return Err(GroupError::InvalidThreshold {
            threshold,
            max: Fingerprint::BITS,
        });
    }

    let (nodes, hashes): (Vec<Domain>, Vec<Fingerprint>) =
        fingerprints.iter().map(|(d, f)| (d.clone(), *f)).unzip();
    let index: HashMap<Domain, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, d)| (d.clone(), i))
        .collect();

    let mut adjacency = vec![Vec::new(); nodes.len()];
    let mut edge_count = 0;
    for i in 0..hashes.len() {
        for j in (i + 1)..hashes.len() {
            if hamming_distance(hashes[i], hashes[j]) <= threshold {
                adjacency[i].push(j);
                adjacency[j].push(i);
                edge_count += 1;
            }
        }
    }

    info!(
        "Similarity graph: {} nodes, {} edges (threshold {})",
        nodes.len(),
        edge_count,
        threshold
    );

    Ok(SimilarityGraph {
        nodes,
        index,
        adjacency,
        edge_count,
        threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, u64)]) -> FingerprintMap {
        entries
            .iter()
            .map(|(d, bits)| (Domain::parse(d).unwrap(), Fingerprint::from_bits(*bits)))
            .collect()
    }

    #[test]
    fn test_isolated_nodes_are_present() {
        let graph = build_similarity_graph(&map(&[("a.com", 0), ("b.com", u64::MAX)]), 10).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.contains("a.com"));
        assert_eq!(graph.neighbors("b.com").unwrap().len(), 0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let fingerprints = map(&[("a.com", 0), ("b.com", 0b111)]);
        assert!(build_similarity_graph(&fingerprints, 3).unwrap().are_connected("a.com", "b.com"));
        assert!(!build_similarity_graph(&fingerprints, 2).unwrap().are_connected("a.com", "b.com"));
    }

    #[test]
    fn test_edges_are_undirected_without_self_loops() {
        let graph = build_similarity_graph(&map(&[("a.com", 1), ("b.com", 1), ("c.com", 3)]), 1).unwrap();
        assert_eq!(graph.edge_count(), 3);
        assert!(graph.are_connected("a.com", "b.com"));
        assert!(graph.are_connected("b.com", "a.com"));
        for node in graph.nodes() {
            let neighbors = graph.neighbors(node.as_str()).unwrap();
            assert!(!neighbors.contains(&node));
        }
    }

    #[test]
    fn test_threshold_above_bit_width_rejected() {
        let result = build_similarity_graph(&map(&[("a.com", 0)]), 65);
        assert!(matches!(
            result,
            Err(GroupError::InvalidThreshold { threshold: 65, max: 64 })
        ));
    }

    #[test]
    fn test_empty_map_gives_empty_graph() {
        let graph = build_similarity_graph(&FingerprintMap::new(), 10).unwrap();
        assert_eq!(graph.node_count(), 0);
        assert!(graph.neighbors("a.com").is_none());
    }
}
