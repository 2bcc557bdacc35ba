//! The upstream record-source seam.

use report_core::{Granularity, SimulationRecord, SimulationState};
use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain records from upstream. Always recoverable: the driver
/// keeps its last view and the next poll tries again.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {target} failed: {message}")]
    Transport { target: String, message: String },
    #[error("{target} answered with status {status}")]
    Status { target: String, status: u16 },
    #[error("cannot decode {target}: {source}")]
    Decode {
        target: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Provider of decoded records and simulation progress.
pub trait RecordSource {
    /// All records of one granularity, in backend order.
    fn fetch_records(&self, granularity: Granularity)
        -> Result<Vec<SimulationRecord>, SourceError>;

    fn fetch_state(&self) -> Result<SimulationState, SourceError>;
}

impl<S: RecordSource + ?Sized> RecordSource for &S {
    fn fetch_records(
        &self,
        granularity: Granularity,
    ) -> Result<Vec<SimulationRecord>, SourceError> {
        (**self).fetch_records(granularity)
    }

    fn fetch_state(&self) -> Result<SimulationState, SourceError> {
        (**self).fetch_state()
    }
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn fetch_records(
        &self,
        granularity: Granularity,
    ) -> Result<Vec<SimulationRecord>, SourceError> {
        (**self).fetch_records(granularity)
    }

    fn fetch_state(&self) -> Result<SimulationState, SourceError> {
        (**self).fetch_state()
    }
}
