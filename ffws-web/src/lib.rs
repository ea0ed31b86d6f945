//! Extraction of the FFWS water-level and rainfall tables.
//!
//! - [`table`]: locate the data table in rendered markup and map its rows
//! - [`dataset`]: the two declarative dataset adapters
//! - [`pipeline`]: acquire → navigate → parse → release, with a tracked
//!   state machine
//! - [`record`]: the typed output handed to publishers

pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod table;

pub use dataset::{Dataset, ExtractionRequest, RAINFALL, WATER_LEVEL};
pub use error::ExtractError;
pub use pipeline::{ExtractionRun, ExtractionState, Scraper};
pub use record::{CaptureTime, Extraction, ExtractionResult, Record};
