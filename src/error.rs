use std::time::Duration;

use chromiumoxide::error::CdpError;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The selector you are trying to scrape for is invalid. Selector: {0}")]
    ParseMissingSelector(String),

    #[error("Column `{column}` is missing from {path}")]
    MissingColumn { path: String, column: String },

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),

    #[error("Browser Error: {0}")]
    Browser(#[from] CdpError),
    #[error("Couldn't build the browser config: {0}")]
    BrowserConfig(String),
}

pub type FetchResult<T> = core::result::Result<T, FetchError>;

/// Failures while driving a single page. None of these end the run.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A bounded wait ran out, whatever loaded so far is still usable.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The automation layer failed, the page is abandoned.
    #[error("Browser protocol error: {0}")]
    Protocol(String),
}

impl From<CdpError> for FetchError {
    fn from(value: CdpError) -> Self {
        FetchError::Protocol(value.to_string())
    }
}
