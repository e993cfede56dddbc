use std::time::Duration;

/// Failures while fetching rows from the shortcut provider.
///
/// Every variant is surfaced to the HTTP layer as a 500; row-level data
/// problems never end up here.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0} not set")]
    MissingConfig(&'static str),

    #[error("sheets API base {0} cannot carry a path")]
    InvalidApiBase(String),

    #[error("sheets request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("sheets API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider query timed out after {0:?}")]
    Timeout(Duration),
}

/// Why a sheet row's destination could not be used. Logged, never returned
/// to clients.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DestinationError {
    #[error("destination {0:?} must be an absolute URL with a scheme, e.g. https://")]
    NotAbsolute(String),

    #[error("destination {0:?} is not a valid URL: {1}")]
    Invalid(String, url::ParseError),
}
