pub mod error;
pub mod fetcher;
pub mod logo;
pub mod result;
pub mod source;

pub use error::{ScanError, SourceFailure};
pub use fetcher::{FetchSettings, LogoFetcher};
pub use logo::{DecodeSettings, LogoImage, Quality};
pub use result::{AttemptOutcome, FetchReport, FetchedLogo, SourceAttempt};
pub use source::{ImageSource, SourceTemplates};
