// Grouping pipeline: validate, fetch and hash, build the graph, extract clusters

use crate::cluster::{Cluster, extract_clusters};
use crate::coordinator::{FailedDomain, FetchCoordinator, FetchProgressCallback, Preview, SourceStats};
use crate::domain::DomainSet;
use crate::error::Result;
use crate::fingerprint::FingerprintMap;
use crate::graph::build_similarity_graph;
use crate::options::GroupingOptions;
use chrono::{DateTime, Utc};
use logomatch_scanner::LogoFetcher;
use serde::Serialize;
use tracing::info;

/// Result of a grouping run
#[derive(Debug, Clone, Serialize)]
pub struct GroupingReport {
    pub generated_at: DateTime<Utc>,
    pub similarity_threshold: u32,
    pub total: usize,
    pub clusters: Vec<Cluster>,
    pub failed: Vec<FailedDomain>,
    pub fingerprints: FingerprintMap,
    pub source_stats: SourceStats,
}

impl GroupingReport {
    pub fn fingerprinted(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Clusters with more than one member
    pub fn shared_clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter().filter(|c| c.len() > 1)
    }
}

pub struct GroupingOutcome {
    pub report: GroupingReport,
    pub previews: Vec<Preview>,
}

/// Partition an existing fingerprint map. Pure, so it can be re-run with a
/// different threshold without fetching again.
pub fn cluster_fingerprints(fingerprints: &FingerprintMap, threshold: u32) -> Result<Vec<Cluster>> {
    let graph = build_similarity_graph(fingerprints, threshold)?;
    Ok(extract_clusters(&graph))
}

/// Run the full pipeline with the built-in source chain
pub async fn group_domains(
    domains: &DomainSet,
    options: &GroupingOptions,
    progress: Option<FetchProgressCallback>,
) -> Result<GroupingOutcome> {
    options.validate()?;
    let fetcher = LogoFetcher::from_settings(&options.fetch)?;
    group_domains_with(fetcher, domains, options, progress).await
}

/// Run the full pipeline with a caller-supplied fetcher
pub async fn group_domains_with(
    fetcher: LogoFetcher,
    domains: &DomainSet,
    options: &GroupingOptions,
    progress: Option<FetchProgressCallback>,
) -> Result<GroupingOutcome> {
    options.validate()?;

    let mut coordinator = FetchCoordinator::new(fetcher, options.fetch_concurrency)
        .with_preview_count(options.preview_count);
    if let Some(callback) = progress {
        coordinator = coordinator.with_progress_callback(callback);
    }

    let summary = coordinator.run(domains).await?;
    let clusters = cluster_fingerprints(&summary.fingerprints, options.similarity_threshold)?;

    info!(
        "Grouped {} domains into {} clusters ({} failed)",
        summary.fingerprinted(),
        clusters.len(),
        summary.failed_count()
    );

    let report = GroupingReport {
        generated_at: Utc::now(),
        similarity_threshold: options.similarity_threshold,
        total: summary.total(),
        clusters,
        failed: summary.failed,
        fingerprints: summary.fingerprints,
        source_stats: summary.source_stats,
    };

    Ok(GroupingOutcome {
        report,
        previews: summary.previews,
    })
}
