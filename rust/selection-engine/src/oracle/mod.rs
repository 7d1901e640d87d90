//! Extraction/matching oracle interface.
//!
//! An oracle turns a source document into raw device descriptors and then
//! annotates those descriptors with canonical group keys. The engine does not
//! care whether the answers come from a live model or a pinned fixture; it
//! only checks the shape of what comes back.

pub mod fixture;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::OracleError;
use crate::record::{Device, MatchedDevice, Mode, SourceDocument};

pub use fixture::FixtureOracle;

/// Producer of extraction and matching results.
#[async_trait]
pub trait DeviceOracle: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Extract raw device descriptors from a document.
    async fn extract(
        &self,
        document: &SourceDocument,
        mode: Mode,
    ) -> Result<Vec<Device>, OracleError>;

    /// Annotate each device with its canonical group key, preserving order.
    async fn match_devices(&self, devices: &[Device]) -> Result<Vec<MatchedDevice>, OracleError>;
}

/// The fixture oracle plus an optional live one, selected per workflow.
#[derive(Clone)]
pub struct OracleSet {
    fixture: Arc<dyn DeviceOracle>,
    live: Option<Arc<dyn DeviceOracle>>,
}

impl OracleSet {
    #[must_use]
    pub fn new(fixture: Arc<dyn DeviceOracle>) -> Self {
        Self {
            fixture,
            live: None,
        }
    }

    #[must_use]
    pub fn with_live(mut self, live: Arc<dyn DeviceOracle>) -> Self {
        self.live = Some(live);
        self
    }

    pub fn has_live(&self) -> bool {
        self.live.is_some()
    }

    /// Pick the oracle for a workflow's `use_live_oracle` flag.
    pub fn select(&self, use_live: bool) -> Result<&dyn DeviceOracle, OracleError> {
        if use_live {
            self.live.as_deref().ok_or_else(|| {
                OracleError::Unavailable("live oracle calls are not configured".to_string())
            })
        } else {
            Ok(self.fixture.as_ref())
        }
    }
}

impl fmt::Debug for OracleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleSet")
            .field("fixture", &self.fixture.name())
            .field("live", &self.live.as_ref().map(|o| o.name().to_string()))
            .finish()
    }
}

/// Validate extraction output.
pub fn validate_extraction(devices: &[Device]) -> Result<(), OracleError> {
    if devices.is_empty() {
        return Err(OracleError::Empty { stage: "extract" });
    }
    if let Some(index) = devices.iter().position(|d| d.device_raw.trim().is_empty()) {
        return Err(OracleError::Malformed(format!(
            "extracted item {index} has no device label"
        )));
    }
    Ok(())
}

/// Validate that matching kept the extracted items in order, one for one.
pub fn validate_matches(extracted: &[Device], matched: &[MatchedDevice]) -> Result<(), OracleError> {
    if matched.is_empty() {
        return Err(OracleError::Empty { stage: "match" });
    }
    if matched.len() != extracted.len() {
        return Err(OracleError::ArityMismatch {
            extracted: extracted.len(),
            matched: matched.len(),
        });
    }
    for (index, (source, target)) in extracted.iter().zip(matched).enumerate() {
        if source.device_raw != target.device.device_raw {
            return Err(OracleError::Diverged {
                index,
                extracted: source.device_raw.clone(),
                matched: target.device.device_raw.clone(),
            });
        }
        if target.device_matched.trim().is_empty() {
            return Err(OracleError::Malformed(format!(
                "matched item {index} has no group key"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(raw: &str) -> Device {
        Device {
            device_raw: raw.to_string(),
            ..Device::default()
        }
    }

    fn matched(raw: &str, key: &str) -> MatchedDevice {
        MatchedDevice {
            device: device(raw),
            device_matched: key.to_string(),
        }
    }

    #[test]
    fn test_validate_extraction() {
        assert!(matches!(
            validate_extraction(&[]),
            Err(OracleError::Empty { stage: "extract" })
        ));
        assert!(matches!(
            validate_extraction(&[device("Herd"), device("  ")]),
            Err(OracleError::Malformed(_))
        ));
        assert!(validate_extraction(&[device("Herd")]).is_ok());
    }

    #[test]
    fn test_validate_matches_arity_and_order() {
        let extracted = vec![device("Herd"), device("Spüle")];

        assert!(matches!(
            validate_matches(&extracted, &[matched("Herd", "Herd")]),
            Err(OracleError::ArityMismatch {
                extracted: 2,
                matched: 1
            })
        ));
        assert!(matches!(
            validate_matches(
                &extracted,
                &[matched("Spüle", "Spüle"), matched("Herd", "Herd")]
            ),
            Err(OracleError::Diverged { index: 0, .. })
        ));
        assert!(matches!(
            validate_matches(&extracted, &[matched("Herd", "Herd"), matched("Spüle", "")]),
            Err(OracleError::Malformed(_))
        ));
        assert!(validate_matches(
            &extracted,
            &[matched("Herd", "Herd"), matched("Spüle", "Spültisch")]
        )
        .is_ok());
    }

    #[test]
    fn test_select_without_live_oracle() {
        let set = OracleSet::new(Arc::new(FixtureOracle::new(vec![], vec![])));
        assert!(!set.has_live());
        assert_eq!(set.select(false).unwrap().name(), "fixture");
        assert!(matches!(set.select(true), Err(OracleError::Unavailable(_))));
    }
}
