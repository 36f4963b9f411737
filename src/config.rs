use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::AggregateKind;

/// Bin count of the price histogram when none is configured.
pub const DEFAULT_HISTOGRAM_BINS: usize = 50;

pub const MAX_HISTOGRAM_BINS: usize = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("histogram_bins must be between 1 and {MAX_HISTOGRAM_BINS}, got {0}")]
    BinsOutOfRange(usize),
}

/// Which aggregates are visible and how they are parameterised.
///
/// ```json
/// { "histogram_bins": 40, "visible": ["price_by_bedrooms", "price_histogram"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub histogram_bins: usize,
    pub visible: Vec<AggregateKind>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            visible: AggregateKind::CATALOG.to_vec(),
        }
    }
}

impl CatalogConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: CatalogConfig =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_HISTOGRAM_BINS).contains(&self.histogram_bins) {
            return Err(ConfigError::BinsOutOfRange(self.histogram_bins));
        }
        Ok(())
    }
}
