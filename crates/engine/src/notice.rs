use serde::Serialize;

use crate::error::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Must be acknowledged before the user continues (e.g. sheet no longer exists).
    Blocking,
    /// Dismissible; editing continues.
    NonBlocking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Validation,
    Transient,
    NotFound,
}

impl From<&RepositoryError> for NoticeKind {
    fn from(err: &RepositoryError) -> Self {
        match err {
            RepositoryError::Transient(_) => NoticeKind::Transient,
            RepositoryError::NotFound(_) => NoticeKind::NotFound,
            RepositoryError::Validation(_) => NoticeKind::Validation,
        }
    }
}

/// A user-visible message about a failed remote operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    /// Failure of an operation the user explicitly asked for and is waiting on.
    /// Only a missing resource blocks; everything else can be dismissed.
    pub fn foreground(context: &str, err: &RepositoryError) -> Self {
        let severity = if err.is_not_found() { Severity::Blocking } else { Severity::NonBlocking };
        Self {
            severity,
            kind: err.into(),
            message: format!("{context}: {err}"),
        }
    }

    /// Failure of a background save. Never blocks.
    pub fn background(context: &str, err: &RepositoryError) -> Self {
        Self {
            severity: Severity::NonBlocking,
            kind: err.into(),
            message: format!("{context}: {err}"),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}
