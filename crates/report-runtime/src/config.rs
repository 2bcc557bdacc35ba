//! YAML configuration.

use report_analytics::DEFAULT_INITIAL_INVESTMENT;
use report_pipeline::DEFAULT_PAGE_SIZE;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config value: {0}")]
    Invalid(&'static str),
}

/// Report settings. Every field is optional in the file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Capital put in before the first period.
    pub initial_investment: Decimal,
    pub page_size: usize,
    pub detail_poll_secs: u64,
    pub summary_poll_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            initial_investment: DEFAULT_INITIAL_INVESTMENT,
            page_size: DEFAULT_PAGE_SIZE,
            detail_poll_secs: 3,
            summary_poll_secs: 5,
        }
    }
}

impl ReportConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        // an empty document is the default config
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: ReportConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be positive"));
        }
        if self.detail_poll_secs == 0 || self.summary_poll_secs == 0 {
            return Err(ConfigError::Invalid("poll intervals must be positive"));
        }
        if self.initial_investment < Decimal::ZERO {
            return Err(ConfigError::Invalid("initial_investment must not be negative"));
        }
        Ok(())
    }

    pub fn detail_poll(&self) -> Duration {
        Duration::from_secs(self.detail_poll_secs)
    }

    pub fn summary_poll(&self) -> Duration {
        Duration::from_secs(self.summary_poll_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_clinic_setup() {
        let cfg = ReportConfig::from_yaml_str("").unwrap();
        assert_eq!(cfg.initial_investment, Decimal::from(580_000));
        assert_eq!(cfg.page_size, 100);
        assert_eq!(cfg.detail_poll(), Duration::from_secs(3));
        assert_eq!(cfg.summary_poll(), Duration::from_secs(5));
    }

    #[test]
    fn partial_file_overrides_some_fields() {
        let cfg = ReportConfig::from_yaml_str("initial_investment: 600000.50\npage_size: 25\n").unwrap();
        assert_eq!(cfg.initial_investment, Decimal::new(60_000_050, 2));
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.summary_poll_secs, 5);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            ReportConfig::from_yaml_str("page_size: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ReportConfig::from_yaml_str("pages: 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "detail_poll_secs: 10").unwrap();
        let cfg = ReportConfig::load(f.path()).unwrap();
        assert_eq!(cfg.detail_poll_secs, 10);
        let missing = ReportConfig::load(f.path().with_extension("absent"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
