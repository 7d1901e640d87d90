//! Stage cursor and transition types of the selection graph.
//!
//! ```text
//! Start -> Extract -> Match --save_new--------> Save -> (completed)
//!                           \--fill_from_catalog-> PrepareGroup -> AwaitSelection
//!                                                     ^                 |
//!                                                     +--- more groups -+--> (completed)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a workflow instance in the stage graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Extract,
    Match,
    Save,
    PrepareGroup,
    /// The only suspension point.
    AwaitSelection,
    Completed,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Extract => "extract",
            Self::Match => "match",
            Self::Save => "save",
            Self::PrepareGroup => "prepare_group",
            Self::AwaitSelection => "await_selection",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Continue with the given stage.
    Goto(Stage),
    /// Park at [`Stage::AwaitSelection`] until a selection arrives.
    Suspend,
    /// Terminal success.
    Complete,
}
