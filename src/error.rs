use std::error::Error as StdError;
use thiserror::Error;

/// The single failure kind of an analysis request.
///
/// The `Display` text is deliberately generic and safe to show to end users.
/// The underlying cause (network error, API status, empty response, ...) is
/// available through [`std::error::Error::source`] and [`AnalysisFailure::cause`].
#[derive(Debug, Error)]
#[error("Failed to analyze image. Please try again.")]
pub struct AnalysisFailure {
    #[source]
    cause: Box<dyn StdError + Send + Sync + 'static>,
}

impl AnalysisFailure {
    pub fn new(cause: anyhow::Error) -> Self {
        Self {
            cause: cause.into(),
        }
    }

    /// The underlying error, for diagnostics.
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }
}

impl From<anyhow::Error> for AnalysisFailure {
    fn from(cause: anyhow::Error) -> Self {
        Self::new(cause)
    }
}
