// Connected components of the similarity graph

use crate::domain::Domain;
use crate::graph::SimilarityGraph;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::info;

/// A maximal set of domains connected through similar fingerprints.
/// Members are kept sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cluster {
    domains: Vec<Domain>,
}

impl Cluster {
    pub fn new(mut domains: Vec<Domain>) -> Self {
        domains.sort();
        Self { domains }
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.iter().any(|d| d.as_str() == domain)
    }
}

/// Breadth-first search from every unvisited node. Every node lands in
/// exactly one cluster. Clusters come out largest first.
pub fn extract_clusters(graph: &SimilarityGraph) -> Vec<Cluster> {
    let adjacency = graph.adjacency();
    let nodes = graph.nodes();
    let mut visited = vec![false; nodes.len()];
    let mut clusters = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..nodes.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);

        let mut members = Vec::new();
        while let Some(current) = queue.pop_front() {
            members.push(nodes[current].clone());
            for &next in &adjacency[current] {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }
        clusters.push(Cluster::new(members));
    }

    clusters.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| a.domains.first().cmp(&b.domains.first()))
    });

    info!("Extracted {} clusters from {} domains", clusters.len(), nodes.len());
    clusters
}
