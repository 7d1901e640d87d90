//! Replayable oracle backed by pinned JSON fixtures.

use std::path::Path;

use async_trait::async_trait;

use super::DeviceOracle;
use crate::error::OracleError;
use crate::record::{Device, MatchedDevice, Mode, SourceDocument};

/// File holding the pinned extraction output.
pub const EXTRACTION_FIXTURE: &str = "extraction_node_output.json";
/// File holding the pinned matching output.
pub const MATCHING_FIXTURE: &str = "matcher_node_output.json";

/// Oracle that ignores its inputs and returns the same recorded answers.
#[derive(Debug, Clone)]
pub struct FixtureOracle {
    extraction: Vec<Device>,
    matching: Vec<MatchedDevice>,
}

impl FixtureOracle {
    #[must_use]
    pub fn new(extraction: Vec<Device>, matching: Vec<MatchedDevice>) -> Self {
        Self {
            extraction,
            matching,
        }
    }

    /// Load both fixtures from a directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, OracleError> {
        let dir = dir.as_ref();
        let extraction = read_fixture(&dir.join(EXTRACTION_FIXTURE))?;
        let matching = read_fixture(&dir.join(MATCHING_FIXTURE))?;
        tracing::debug!(
            dir = %dir.display(),
            extracted = extraction.len(),
            matched = matching.len(),
            "Loaded oracle fixtures"
        );
        Ok(Self::new(extraction, matching))
    }
}

fn read_fixture<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, OracleError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| OracleError::Fixture(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw).map_err(|e| OracleError::Fixture(format!("{}: {e}", path.display())))
}

#[async_trait]
impl DeviceOracle for FixtureOracle {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn extract(
        &self,
        _document: &SourceDocument,
        _mode: Mode,
    ) -> Result<Vec<Device>, OracleError> {
        Ok(self.extraction.clone())
    }

    async fn match_devices(&self, _devices: &[Device]) -> Result<Vec<MatchedDevice>, OracleError> {
        Ok(self.matching.clone())
    }
}
