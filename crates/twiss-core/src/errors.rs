//! Structured error types shared across the optics crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`OpticsError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Kebab-case code, stable across releases.
    pub code: String,
    /// What went wrong.
    pub message: String,
    /// Offending values keyed by name.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Suggested remedy, when one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload with an empty context and no hint.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records a named value; later entries overwrite earlier ones.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Attaches a remedy.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the optics engine and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum OpticsError {
    /// Closed-orbit search did not converge within its iteration cap.
    #[error("convergence error: {0}")]
    Convergence(ErrorInfo),
    /// A normal mode is unstable and has no finite Twiss parameters.
    #[error("unstable optics: {0}")]
    UnstableOptics(ErrorInfo),
    /// Inputs have inconsistent shapes or missing fields.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(ErrorInfo),
    /// The lattice cannot satisfy the request (no cavity, bad element, ...).
    #[error("lattice error: {0}")]
    Lattice(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        let mut entries = self.context.iter();
        if let Some((key, value)) = entries.next() {
            write!(f, " ({key}={value}")?;
            for (key, value) in entries {
                write!(f, ", {key}={value}")?;
            }
            f.write_str(")")?;
        }
        match &self.hint {
            Some(hint) => write!(f, "; hint: {hint}"),
            None => Ok(()),
        }
    }
}

impl OpticsError {
    /// Payload of any variant.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            OpticsError::Convergence(info)
            | OpticsError::UnstableOptics(info)
            | OpticsError::DimensionMismatch(info)
            | OpticsError::Lattice(info)
            | OpticsError::Serde(info) => info,
        }
    }

    /// Shorthand for [`OpticsError::UnstableOptics`] with a fresh payload.
    pub fn unstable(code: &str, message: impl Into<String>) -> Self {
        OpticsError::UnstableOptics(ErrorInfo::new(code, message))
    }
}
