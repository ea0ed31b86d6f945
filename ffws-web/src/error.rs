use ffws_drivers::DriverError;
use thiserror::Error;

/// Why an extraction call produced no data.
///
/// Every variant is fatal for the call; undersized rows are not errors and
/// never surface here.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not acquire a browser session: {0}")]
    SessionAcquisition(#[source] DriverError),

    #[error("page never became ready: {0}")]
    Navigation(#[source] DriverError),

    #[error("could not read the rendered page: {0}")]
    PageSource(#[source] DriverError),

    #[error("no element matches `{selector}`")]
    TableNotFound { selector: String },

    #[error("table has no <{0}> section")]
    MissingSection(&'static str),

    #[error("invalid selector {0}")]
    InvalidSelector(String),
}
