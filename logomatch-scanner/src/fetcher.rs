use crate::error::{Result, ScanError, SourceFailure};
use crate::logo::{DecodeSettings, LogoImage, Quality};
use crate::result::{FetchReport, FetchedLogo, SourceAttempt};
use crate::source::{
    FAVICON, HtmlIconSource, ICON_SERVICE, ImageSource, LOGO_API, SourceTemplates, TemplateSource,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Network and decoding settings for the fetch chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Timeout for every image download, in seconds
    pub image_timeout_secs: u64,
    /// Timeout for the homepage request of the HTML source, in seconds
    pub homepage_timeout_secs: u64,
    pub user_agent: String,
    pub decode: DecodeSettings,
    pub templates: SourceTemplates,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            image_timeout_secs: 8,
            homepage_timeout_secs: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            decode: DecodeSettings::default(),
            templates: SourceTemplates::default(),
        }
    }
}

impl FetchSettings {
    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }

    pub fn homepage_timeout(&self) -> Duration {
        Duration::from_secs(self.homepage_timeout_secs)
    }
}

/// Shared HTTP client for all sources
pub fn build_client(settings: &FetchSettings) -> Result<Client> {
    let client = Client::builder()
        .user_agent(settings.user_agent.as_str())
        .connect_timeout(settings.image_timeout())
        .pool_max_idle_per_host(8)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;
    Ok(client)
}

/// The built-in chain: logo API, homepage icon link, icon service, favicon
pub fn default_sources(client: &Client, settings: &FetchSettings) -> Vec<Arc<dyn ImageSource>> {
    let templates = &settings.templates;
    let mut sources: Vec<Arc<dyn ImageSource>> = Vec::with_capacity(4);
    sources.push(Arc::new(TemplateSource::new(
        LOGO_API,
        &templates.logo_api,
        client.clone(),
        settings.image_timeout(),
    )));
    sources.push(Arc::new(HtmlIconSource::new(
        &templates.homepage,
        client.clone(),
        settings.homepage_timeout(),
        settings.image_timeout(),
    )));
    sources.push(Arc::new(TemplateSource::new(
        ICON_SERVICE,
        &templates.icon_service,
        client.clone(),
        settings.image_timeout(),
    )));
    sources.push(Arc::new(TemplateSource::new(
        FAVICON,
        &templates.favicon,
        client.clone(),
        settings.image_timeout(),
    )));
    sources
}

/// Walks an ordered list of sources and settles on one image per domain.
///
/// The first meaningful image wins. If no source yields a meaningful image,
/// the first decodable one is returned as a fallback.
#[derive(Clone)]
pub struct LogoFetcher {
    sources: Vec<Arc<dyn ImageSource>>,
    decode: DecodeSettings,
}

impl LogoFetcher {
    pub fn new(sources: Vec<Arc<dyn ImageSource>>, decode: DecodeSettings) -> Self {
        Self { sources, decode }
    }

    /// Fetcher using the built-in source chain
    pub fn from_settings(settings: &FetchSettings) -> Result<Self> {
        if settings.image_timeout_secs == 0 || settings.homepage_timeout_secs == 0 {
            return Err(ScanError::InvalidSettings("timeouts must be at least one second".to_string()));
        }
        let client = build_client(settings)?;
        Ok(Self::new(default_sources(&client, settings), settings.decode.clone()))
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn fetch(&self, domain: &str) -> Option<FetchedLogo> {
        self.fetch_with_report(domain).await.logo
    }

    /// Like `fetch`, but also returns every attempt made along the way
    pub async fn fetch_with_report(&self, domain: &str) -> FetchReport {
        let mut attempts = Vec::with_capacity(self.sources.len());
        let mut fallback: Option<FetchedLogo> = None;

        for source in &self.sources {
            let name = source.name().to_string();
            let start = Instant::now();
            let decoded = match source.attempt(domain).await {
                Ok(bytes) => decode_and_grade(bytes, self.decode.clone()).await,
                Err(failure) => Err(failure),
            };
            let elapsed = start.elapsed();

            let (image, quality) = match decoded {
                Ok(graded) => graded,
                Err(failure) => {
                    debug!("{} [{}]: {}", domain, name, failure);
                    attempts.push(SourceAttempt::failed(name, elapsed, failure));
                    continue;
                }
            };

            attempts.push(SourceAttempt::image(name.clone(), elapsed, &image, quality));
            debug!(
                "{} [{}]: {}x{} {}",
                domain,
                name,
                image.width(),
                image.height(),
                quality.as_str()
            );

            if quality == Quality::Meaningful {
                return FetchReport {
                    domain: domain.to_string(),
                    logo: Some(FetchedLogo {
                        image,
                        source: name,
                        quality,
                    }),
                    attempts,
                };
            }

            if fallback.is_none() {
                fallback = Some(FetchedLogo {
                    image,
                    source: name,
                    quality,
                });
            }
        }

        FetchReport {
            domain: domain.to_string(),
            logo: fallback,
            attempts,
        }
    }
}

/// Decode and run the quality filter on the blocking pool. Both walk every
/// pixel of images up to the decode limits.
async fn decode_and_grade(
    bytes: Vec<u8>,
    settings: DecodeSettings,
) -> std::result::Result<(LogoImage, Quality), SourceFailure> {
    tokio::task::spawn_blocking(move || -> std::result::Result<(LogoImage, Quality), SourceFailure> {
        let image = LogoImage::decode(&bytes, &settings)?;
        let quality = image.quality();
        Ok((image, quality))
    })
    .await
    .map_err(|e| SourceFailure::Decode(format!("decoder task failed: {}", e)))?
}
