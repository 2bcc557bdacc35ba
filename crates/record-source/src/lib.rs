#![deny(warnings)]

//! Concrete record sources: a directory of JSON exports and the simulation
//! backend's HTTP API.

use report_core::{decode_records, Granularity, SimulationRecord, SimulationState};
use report_runtime::{RecordSource, SourceError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Backend resource name of a granularity.
pub fn resource_name(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Daily => "daily",
        Granularity::Weekly => "weekly",
        Granularity::Monthly => "monthly",
        Granularity::PatientEvent => "patient_details",
    }
}

fn decode_state(target: &str, text: &str) -> Result<SimulationState, SourceError> {
    serde_json::from_str(text).map_err(|source| SourceError::Decode {
        target: target.to_string(),
        source,
    })
}

/// Reads `<name>.json` exports from a directory.
///
/// A missing file means the simulation has not produced that series yet and
/// reads as empty.
#[derive(Clone, Debug)]
pub struct JsonDirSource {
    root: PathBuf,
}

impl JsonDirSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, granularity: Granularity) -> PathBuf {
        self.root.join(format!("{}.json", resource_name(granularity)))
    }

    fn read_optional(&self, path: &Path) -> Result<Option<String>, SourceError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "export not present");
                Ok(None)
            }
            Err(source) => Err(SourceError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl RecordSource for JsonDirSource {
    fn fetch_records(
        &self,
        granularity: Granularity,
    ) -> Result<Vec<SimulationRecord>, SourceError> {
        let path = self.path_for(granularity);
        let Some(text) = self.read_optional(&path)? else {
            return Ok(Vec::new());
        };
        decode_records(granularity, &text).map_err(|source| SourceError::Decode {
            target: path.display().to_string(),
            source,
        })
    }

    fn fetch_state(&self) -> Result<SimulationState, SourceError> {
        let path = self.root.join("state.json");
        match self.read_optional(&path)? {
            Some(text) => decode_state(&path.display().to_string(), &text),
            None => Ok(SimulationState::default()),
        }
    }
}

/// Blocking client for the simulation backend.
#[derive(Clone, Debug)]
pub struct HttpSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Transport {
                target: base_url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, granularity: Granularity) -> String {
        format!("{}/api/results/{}", self.base_url, resource_name(granularity))
    }

    fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let response = self.client.get(url).send().map_err(|e| SourceError::Transport {
            target: url.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                target: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().map_err(|e| SourceError::Transport {
            target: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Combine the live progress endpoint with the results summary. Progress
/// wins for the clock and the cash balance; totals come from the summary.
pub fn merge_state(progress: SimulationState, summary: SimulationState) -> SimulationState {
    SimulationState {
        current_day: progress.current_day.max(summary.current_day),
        current_week: progress.current_week.max(summary.current_week),
        final_cash: if progress.current_week > 0 {
            progress.final_cash
        } else {
            summary.final_cash
        },
        ..summary
    }
}

impl RecordSource for HttpSource {
    fn fetch_records(
        &self,
        granularity: Granularity,
    ) -> Result<Vec<SimulationRecord>, SourceError> {
        let url = self.url_for(granularity);
        let text = self.get_text(&url)?;
        let records = decode_records(granularity, &text)
            .map_err(|source| SourceError::Decode { target: url.clone(), source })?;
        debug!(%url, count = records.len(), "fetched records");
        Ok(records)
    }

    fn fetch_state(&self) -> Result<SimulationState, SourceError> {
        let state_url = format!("{}/api/simulation/state", self.base_url);
        let summary_url = format!("{}/api/results/summary", self.base_url);
        let progress = decode_state(&state_url, &self.get_text(&state_url)?)?;
        let summary = decode_state(&summary_url, &self.get_text(&summary_url)?)?;
        Ok(merge_state(progress, summary))
    }
}
