use crate::error::SourceFailure;
use crate::logo::{LogoImage, Quality};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happened when one source was tried for one domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAttempt {
    pub source: String,
    pub response_time: Duration,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    /// Decoded an image of the given size and quality
    Image {
        width: u32,
        height: u32,
        quality: Quality,
    },
    Failed(SourceFailure),
}

impl SourceAttempt {
    /// Record a decoded image with the quality the fetcher already graded
    pub fn image(source: String, response_time: Duration, logo: &LogoImage, quality: Quality) -> Self {
        Self {
            source,
            response_time,
            outcome: AttemptOutcome::Image {
                width: logo.width(),
                height: logo.height(),
                quality,
            },
        }
    }

    pub fn failed(source: String, response_time: Duration, failure: SourceFailure) -> Self {
        Self {
            source,
            response_time,
            outcome: AttemptOutcome::Failed(failure),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Failed(_))
    }
}

/// The image a fetch settled on, and where it came from
#[derive(Debug, Clone)]
pub struct FetchedLogo {
    pub image: LogoImage,
    pub source: String,
    pub quality: Quality,
}

impl FetchedLogo {
    pub fn is_fallback(&self) -> bool {
        self.quality == Quality::Weak
    }
}

/// Full trace of a fetch: the chosen logo (if any) and every attempt made
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub domain: String,
    pub logo: Option<FetchedLogo>,
    pub attempts: Vec<SourceAttempt>,
}
