use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::{format_number, CellValue};

/// Column key → stored value.
pub type FieldMap = BTreeMap<String, CellValue>;

/// Identifier assigned by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub String);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        RowId(s.to_string())
    }
}

/// Whether a row has been durably stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowIdentity {
    LocalOnly,
    Persisted(RowId),
}

/// Handle for a row that survives inserts and removals of other rows.
/// Unique within one `RowStore` for its whole lifetime, across reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalKey(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub identity: RowIdentity,
    pub local_key: LocalKey,
    /// Stable sort key, not the display position.
    pub ordinal: i64,
    /// One value per input column of the schema.
    pub fields: FieldMap,
    /// Cached derived values for display. Always recomputed, never authoritative.
    pub derived: BTreeMap<String, f64>,
}

impl Row {
    pub fn row_id(&self) -> Option<&RowId> {
        match &self.identity {
            RowIdentity::Persisted(id) => Some(id),
            RowIdentity::LocalOnly => None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self.identity, RowIdentity::Persisted(_))
    }

    pub fn field(&self, key: &str) -> Option<&CellValue> {
        self.fields.get(key)
    }

    /// Numeric value of an input or derived column (0 when absent).
    pub fn number(&self, key: &str) -> f64 {
        if let Some(v) = self.derived.get(key) {
            return *v;
        }
        self.fields.get(key).map(|v| v.as_number()).unwrap_or(0.0)
    }

    /// Raw string for any column, input or derived.
    pub fn display(&self, key: &str) -> String {
        if let Some(v) = self.derived.get(key) {
            return format_number(*v);
        }
        self.fields.get(key).map(|v| v.raw_display()).unwrap_or_default()
    }
}
