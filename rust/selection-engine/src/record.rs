//! The workflow record and the device/catalog types it carries.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the extracted devices are used once matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Resolve every matched group to an existing catalog row.
    FillFromCatalog,
    /// Persist every matched device as a new catalog row.
    SaveNew,
}

impl Mode {
    /// Map the legacy "document to fill" upload flag onto a mode.
    #[must_use]
    pub fn from_fill_flag(pdf_to_fill: bool) -> Self {
        if pdf_to_fill {
            Self::FillFromCatalog
        } else {
            Self::SaveNew
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FillFromCatalog => "fill_from_catalog",
            Self::SaveNew => "save_new",
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fill_from_catalog" => Ok(Self::FillFromCatalog),
            "save_new" => Ok(Self::SaveNew),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// A device as extracted from the source document.
///
/// Missing numeric fields default to 0 and missing text to the empty string,
/// mirroring what extraction is asked to emit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Device {
    pub device_raw: String,
    #[serde(default)]
    pub length: i64,
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub height: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub price: i64,
}

/// A device annotated with its canonical group key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedDevice {
    #[serde(flatten)]
    pub device: Device,
    pub device_matched: String,
}

impl MatchedDevice {
    /// Canonical group key.
    #[must_use]
    pub fn group_key(&self) -> &str {
        &self.device_matched
    }
}

/// A row of the device catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub id: i64,
    pub device_raw: String,
    #[serde(default)]
    pub length: Option<i64>,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub device_matched: Option<String>,
    #[serde(default, rename = "marge")]
    pub margin: Option<f64>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new catalog row. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCatalogRow {
    pub device_raw: String,
    pub length: Option<i64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub price: Option<i64>,
    pub device_matched: Option<String>,
    pub margin: Option<f64>,
}

impl NewCatalogRow {
    /// Materialize the row with the store-assigned id and timestamp.
    #[must_use]
    pub fn into_row(self, id: i64, created_at: DateTime<Utc>) -> CatalogRow {
        CatalogRow {
            id,
            device_raw: self.device_raw,
            length: self.length,
            width: self.width,
            height: self.height,
            description: self.description,
            manufacturer: self.manufacturer,
            model: self.model,
            price: self.price,
            device_matched: self.device_matched,
            margin: self.margin,
            created_at,
        }
    }
}

impl From<&MatchedDevice> for NewCatalogRow {
    fn from(matched: &MatchedDevice) -> Self {
        let d = &matched.device;
        let text = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            device_raw: d.device_raw.clone(),
            length: Some(d.length),
            width: Some(d.width),
            height: Some(d.height),
            description: text(&d.description),
            manufacturer: text(&d.manufacturer),
            model: text(&d.model),
            price: Some(d.price),
            device_matched: Some(matched.device_matched.clone()),
            margin: None,
        }
    }
}

/// Immutable uploaded document bytes, shared without copying.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SourceDocument(Arc<[u8]>);

impl SourceDocument {
    #[must_use]
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDocument")
            .field("len", &self.0.len())
            .finish()
    }
}

impl From<Vec<u8>> for SourceDocument {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

/// The single record threaded through every stage.
///
/// Fields are written only by the engine; everything outside the crate reads
/// through accessors.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRecord {
    pub(crate) mode: Mode,
    #[serde(skip)]
    pub(crate) source_document: SourceDocument,
    pub(crate) use_live_oracle: bool,
    pub(crate) extracted_items: Vec<Device>,
    pub(crate) matched_groups: Vec<MatchedDevice>,
    pub(crate) candidates_for_current_group: Vec<CatalogRow>,
    pub(crate) current_group_index: usize,
    pub(crate) selected_rows: Vec<CatalogRow>,
    pub(crate) log: Vec<String>,
}

impl WorkflowRecord {
    /// Fresh record holding only the immutable inputs.
    #[must_use]
    pub fn new(mode: Mode, source_document: SourceDocument, use_live_oracle: bool) -> Self {
        Self {
            mode,
            source_document,
            use_live_oracle,
            extracted_items: Vec::new(),
            matched_groups: Vec::new(),
            candidates_for_current_group: Vec::new(),
            current_group_index: 0,
            selected_rows: Vec::new(),
            log: Vec::new(),
        }
    }

    /// Reset every mutable field, keeping the immutable inputs.
    pub(crate) fn reset(&mut self) {
        *self = Self::new(self.mode, self.source_document.clone(), self.use_live_oracle);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn source_document(&self) -> &SourceDocument {
        &self.source_document
    }

    pub fn use_live_oracle(&self) -> bool {
        self.use_live_oracle
    }

    pub fn extracted_items(&self) -> &[Device] {
        &self.extracted_items
    }

    pub fn matched_groups(&self) -> &[MatchedDevice] {
        &self.matched_groups
    }

    pub fn candidates_for_current_group(&self) -> &[CatalogRow] {
        &self.candidates_for_current_group
    }

    pub fn current_group_index(&self) -> usize {
        self.current_group_index
    }

    pub fn selected_rows(&self) -> &[CatalogRow] {
        &self.selected_rows
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// The group currently being resolved, if any remain.
    pub fn current_group(&self) -> Option<&MatchedDevice> {
        self.matched_groups.get(self.current_group_index)
    }

    pub fn total_groups(&self) -> usize {
        self.matched_groups.len()
    }

    pub(crate) fn note(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }

    /// Check the invariants that must hold at every stable checkpoint.
    ///
    /// `suspended` is true when the record is about to be parked at the
    /// selection interrupt.
    pub fn check_invariants(&self, suspended: bool) -> Result<(), String> {
        let len = self.matched_groups.len();
        if self.current_group_index > len {
            return Err(format!(
                "current_group_index {} exceeds {len} groups",
                self.current_group_index
            ));
        }
        if self.selected_rows.len() != self.current_group_index {
            return Err(format!(
                "{} selected rows at group index {}",
                self.selected_rows.len(),
                self.current_group_index
            ));
        }
        if suspended && self.candidates_for_current_group.is_empty() {
            return Err("suspended with no candidates".to_string());
        }
        if self.mode == Mode::SaveNew
            && (self.current_group_index != 0
                || !self.selected_rows.is_empty()
                || !self.candidates_for_current_group.is_empty())
        {
            return Err("group resolution state touched in save_new mode".to_string());
        }
        Ok(())
    }
}
