//! Configuration errors that say what is wrong and how to fix it.

use std::fmt::Write as _;

/// A rejected configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}\n\nHow to fix: {fix_hint}")]
    Invalid { message: String, fix_hint: String },

    #[error("Incompatible settings: {first} cannot be used with {second}\n\nReason: {reason}")]
    Incompatible {
        first: String,
        second: String,
        reason: String,
    },

    /// `needed_for` names the feature that cannot work without the setting.
    #[error("Missing required configuration: {setting}\n\nRequired for: {needed_for}\nSet via: {env_var}")]
    MissingRequired {
        setting: String,
        needed_for: String,
        env_var: String,
    },

    /// The setting needs a cargo feature this binary was built without.
    #[error("Not supported by this build: {setting}\n\nReason: {reason}\nAlternative: {alternative}")]
    Unsupported {
        setting: String,
        reason: String,
        alternative: String,
    },

    #[error("{}", render_all(.0))]
    Multiple(Vec<ConfigurationError>),
}

fn render_all(errors: &[ConfigurationError]) -> String {
    let mut out = String::from("Multiple configuration errors:\n");
    for (i, err) in errors.iter().enumerate() {
        let _ = write!(out, "\n{}. {err}\n", i + 1);
    }
    out
}

impl ConfigurationError {
    #[must_use]
    pub fn invalid(message: impl Into<String>, fix_hint: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
            fix_hint: fix_hint.into(),
        }
    }

    #[must_use]
    pub fn incompatible(
        first: impl Into<String>,
        second: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Incompatible {
            first: first.into(),
            second: second.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn missing_required(
        setting: impl Into<String>,
        needed_for: impl Into<String>,
        env_var: impl Into<String>,
    ) -> Self {
        Self::MissingRequired {
            setting: setting.into(),
            needed_for: needed_for.into(),
            env_var: env_var.into(),
        }
    }

    #[must_use]
    pub fn unsupported(
        setting: impl Into<String>,
        reason: impl Into<String>,
        alternative: impl Into<String>,
    ) -> Self {
        Self::Unsupported {
            setting: setting.into(),
            reason: reason.into(),
            alternative: alternative.into(),
        }
    }

    /// `None` for no errors, the error itself for one, [`Self::Multiple`]
    /// otherwise.
    #[must_use]
    pub fn collect(mut errors: Vec<ConfigurationError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Multiple(errors) => errors.len(),
            _ => 1,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
