use std::fmt;

/// Misuse of the engine API (bad index, unknown column, invalid schema).
///
/// Recoverable input problems (unparseable numbers, disallowed options) are
/// not errors at this level; see `ParsedInput` and `CommitOutcome`.
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    RowOutOfRange { index: usize, len: usize },
    UnknownColumn(String),
    /// Derived or otherwise non-editable column.
    ReadOnlyColumn(String),
    DuplicateColumn(String),
    InvalidSchema(String),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RowOutOfRange { index, len } => {
                write!(f, "row {index} out of range (grid has {len} rows)")
            }
            Self::UnknownColumn(key) => write!(f, "unknown column '{key}'"),
            Self::ReadOnlyColumn(key) => write!(f, "column '{key}' is not editable"),
            Self::DuplicateColumn(key) => write!(f, "duplicate column key '{key}'"),
            Self::InvalidSchema(msg) => write!(f, "invalid schema: {msg}"),
        }
    }
}

impl std::error::Error for GridError {}

/// Failures reported by a `RowRepository`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Network or availability problem; retrying may succeed.
    Transient(String),
    /// Row or sheet does not exist (anymore).
    NotFound(String),
    /// Rejected by the store (missing required field, type mismatch).
    Validation(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(msg) => write!(f, "remote store unavailable: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Validation(msg) => write!(f, "rejected by remote store: {msg}"),
        }
    }
}

impl std::error::Error for RepositoryError {}
