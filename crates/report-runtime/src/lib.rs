#![deny(warnings)]

//! Runtime for the clinic report engine: the record-source seam, immutable
//! view state, request sequencing and the polling drivers that feed the
//! pipeline and the analytics.

pub mod config;
pub mod driver;
pub mod source;
pub mod state;

pub use config::{ConfigError, ReportConfig};
pub use driver::{DetailDriver, RefreshOutcome, SummaryDriver, SummaryInputs};
pub use source::{RecordSource, SourceError};
pub use state::{RequestSequencer, RequestToken, ViewState};
