//! Logo fingerprinting and grouping.
//!
//! Fetches one logo per domain through the scanner's source chain, reduces
//! each to a 64-bit perceptual hash and partitions domains into clusters of
//! near-identical fingerprints.

pub mod cluster;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod group;
pub mod options;
pub mod report;

pub use cluster::{Cluster, extract_clusters};
pub use coordinator::{
    FailedDomain, FailureReason, FetchCoordinator, FetchProgressCallback, FetchSummary, Preview,
    SourceStats,
};
pub use domain::{Domain, DomainSet};
pub use error::{GroupError, HashError, Result};
pub use fingerprint::{Fingerprint, FingerprintMap, LogoHasher, PerceptualHasher, hamming_distance};
pub use graph::{SimilarityGraph, build_similarity_graph};
pub use group::{GroupingOutcome, GroupingReport, cluster_fingerprints, group_domains, group_domains_with};
pub use options::GroupingOptions;
pub use report::{ReportFormat, render_report};
