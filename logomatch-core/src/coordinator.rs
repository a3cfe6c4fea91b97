// Fetch coordination: fetch and hash every domain under a concurrency cap,
// funnelling completions to a single aggregator

use crate::domain::{Domain, DomainSet};
use crate::error::{GroupError, Result};
use crate::fingerprint::{Fingerprint, FingerprintMap, LogoHasher, PerceptualHasher};
use logomatch_scanner::{FetchedLogo, LogoFetcher};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, warn};

/// Called after every completed domain with (completed, total)
pub type FetchProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// No source produced a decodable image
    NoImage,
    Hashing(String),
    /// The worker task died before reporting
    TaskAborted(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoImage => write!(f, "no image from any source"),
            FailureReason::Hashing(e) => write!(f, "hashing failed: {}", e),
            FailureReason::TaskAborted(e) => write!(f, "worker aborted: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDomain {
    pub domain: Domain,
    pub reason: FailureReason,
}

/// A fetched logo kept for inspection after the run. Previews are the
/// first fingerprinted domains by input position, not by completion.
#[derive(Debug, Clone)]
pub struct Preview {
    pub domain: Domain,
    pub logo: FetchedLogo,
}

/// Which sources supplied the accepted logos
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    pub by_source: BTreeMap<String, usize>,
    /// Logos accepted only as a weak fallback
    pub fallbacks: usize,
}

/// Everything the fetch phase produced. Every submitted domain is in exactly
/// one of `fingerprints` or `failed`.
#[derive(Debug, Clone, Default)]
pub struct FetchSummary {
    pub fingerprints: FingerprintMap,
    pub failed: Vec<FailedDomain>,
    pub previews: Vec<Preview>,
    pub source_stats: SourceStats,
}

impl FetchSummary {
    pub fn total(&self) -> usize {
        self.fingerprints.len() + self.failed.len()
    }

    pub fn fingerprinted(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

enum Completion {
    Hashed {
        /// Position of the domain in the input set
        index: usize,
        domain: Domain,
        fingerprint: Fingerprint,
        logo: FetchedLogo,
    },
    Failed(FailedDomain),
}

impl Completion {
    fn domain(&self) -> &Domain {
        match self {
            Completion::Hashed { domain, .. } => domain,
            Completion::Failed(failed) => &failed.domain,
        }
    }
}

pub struct FetchCoordinator {
    fetcher: LogoFetcher,
    hasher: Arc<dyn LogoHasher>,
    concurrency: usize,
    preview_count: usize,
    progress_callback: Option<FetchProgressCallback>,
}

impl FetchCoordinator {
    pub fn new(fetcher: LogoFetcher, concurrency: usize) -> Self {
        Self {
            fetcher,
            hasher: Arc::new(PerceptualHasher::new()),
            concurrency,
            preview_count: 0,
            progress_callback: None,
        }
    }

    /// Replace the pHash hasher
    pub fn with_hasher(mut self, hasher: Arc<dyn LogoHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_preview_count(mut self, count: usize) -> Self {
        self.preview_count = count;
        self
    }

    pub fn with_progress_callback(mut self, callback: FetchProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Fetch and hash every domain. Per-domain failures are collected, never
    /// returned as errors.
    pub async fn run(&self, domains: &DomainSet) -> Result<FetchSummary> {
        if self.concurrency == 0 {
            return Err(GroupError::InvalidConcurrency);
        }
        if domains.is_empty() {
            return Err(GroupError::EmptyInput);
        }

        let total = domains.len();
        info!("Fetching logos for {} domains with {} workers", total, self.concurrency);

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::channel::<Completion>(self.concurrency);
        let mut handles = Vec::with_capacity(total);

        for (index, domain) in domains.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let fetcher = self.fetcher.clone();
            let hasher = self.hasher.clone();
            let tx = tx.clone();
            let task_domain = domain.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let completion = process_domain(&fetcher, hasher, index, task_domain).await;
                // Only fails if the aggregator is gone, in which case nobody is listening
                let _ = tx.send(completion).await;
            });
            handles.push((domain, handle));
        }
        drop(tx);

        // Single owner of the results: completions arrive in any order
        let mut summary = FetchSummary::default();
        let mut previews: Vec<(usize, Preview)> = Vec::with_capacity(self.preview_count.min(total));
        let mut resolved: HashSet<Domain> = HashSet::with_capacity(total);
        while let Some(completion) = rx.recv().await {
            if !resolved.insert(completion.domain().clone()) {
                warn!("Duplicate completion for {}, ignoring", completion.domain());
                continue;
            }
            self.aggregate(&mut summary, &mut previews, completion);

            if let Some(ref callback) = self.progress_callback {
                callback(resolved.len(), total);
            }
        }

        // Barrier: every worker has exited before the map is handed out
        for (domain, handle) in handles {
            let joined = handle.await;
            if resolved.contains(&domain) {
                continue;
            }
            let reason = match joined {
                Err(e) => e.to_string(),
                Ok(()) => "worker exited without reporting".to_string(),
            };
            warn!("Worker for {} failed: {}", domain, reason);
            resolved.insert(domain.clone());
            summary.failed.push(FailedDomain {
                domain,
                reason: FailureReason::TaskAborted(reason),
            });
            if let Some(ref callback) = self.progress_callback {
                callback(resolved.len(), total);
            }
        }

        summary.previews = previews.into_iter().map(|(_, preview)| preview).collect();

        info!(
            "Fetch phase complete: {} fingerprinted, {} failed",
            summary.fingerprinted(),
            summary.failed_count()
        );
        Ok(summary)
    }

    fn aggregate(
        &self,
        summary: &mut FetchSummary,
        previews: &mut Vec<(usize, Preview)>,
        completion: Completion,
    ) {
        match completion {
            Completion::Hashed {
                index,
                domain,
                fingerprint,
                logo,
            } => {
                *summary
                    .source_stats
                    .by_source
                    .entry(logo.source.clone())
                    .or_insert(0) += 1;
                if logo.is_fallback() {
                    summary.source_stats.fallbacks += 1;
                }
                summary.fingerprints.insert(domain.clone(), fingerprint);
                keep_preview(previews, self.preview_count, index, Preview { domain, logo });
            }
            Completion::Failed(failed) => {
                debug!("{} failed: {}", failed.domain, failed.reason);
                summary.failed.push(failed);
            }
        }
    }
}

/// Keep the `limit` lowest-indexed previews, sorted by index
fn keep_preview(previews: &mut Vec<(usize, Preview)>, limit: usize, index: usize, preview: Preview) {
    if limit == 0 {
        return;
    }
    if previews.len() == limit && previews.last().is_some_and(|(last, _)| *last < index) {
        return;
    }
    let at = previews.partition_point(|(i, _)| *i < index);
    previews.insert(at, (index, preview));
    previews.truncate(limit);
}

async fn process_domain(
    fetcher: &LogoFetcher,
    hasher: Arc<dyn LogoHasher>,
    index: usize,
    domain: Domain,
) -> Completion {
    let Some(logo) = fetcher.fetch(domain.as_str()).await else {
        return Completion::Failed(FailedDomain {
            domain,
            reason: FailureReason::NoImage,
        });
    };

    // Resampling and the DCT are CPU work, keep them off the async workers
    let hashed = tokio::task::spawn_blocking(move || {
        let result = hasher.hash(&logo.image);
        (logo, result)
    })
    .await;

    match hashed {
        Ok((logo, Ok(fingerprint))) => Completion::Hashed {
            index,
            domain,
            fingerprint,
            logo,
        },
        Ok((_, Err(e))) => Completion::Failed(FailedDomain {
            domain,
            reason: FailureReason::Hashing(e.to_string()),
        }),
        Err(e) => Completion::Failed(FailedDomain {
            domain,
            reason: FailureReason::Hashing(e.to_string()),
        }),
    }
}
