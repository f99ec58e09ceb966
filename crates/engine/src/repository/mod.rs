//! Row repository: the remote persistence collaborator.
//!
//! The grid only talks to the store through this trait. Transport (REST,
//! database client) lives outside the engine.

mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::CellValue;
use crate::error::RepositoryError;
use crate::row::{FieldMap, RowId};

pub use memory::InMemoryRepository;

/// Identifies one quantities sheet in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SheetId(pub String);

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SheetId {
    fn from(s: &str) -> Self {
        SheetId(s.to_string())
    }
}

/// A row as the remote store returns it. Field values are loosely typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    pub id: RowId,
    pub ordinal: i64,
    pub fields: FieldMap,
}

pub trait RowRepository {
    /// All rows of a sheet. `NotFound` when the sheet does not exist.
    fn fetch_rows(&mut self, sheet: &SheetId) -> Result<Vec<StoredRow>, RepositoryError>;

    fn insert_row(&mut self, sheet: &SheetId, fields: &FieldMap) -> Result<RowId, RepositoryError>;

    fn update_field(&mut self, row: &RowId, column: &str, value: &CellValue) -> Result<(), RepositoryError>;

    fn delete_row(&mut self, row: &RowId) -> Result<(), RepositoryError>;

    /// One outcome per input row, in input order. Not all-or-nothing.
    fn bulk_insert(&mut self, sheet: &SheetId, rows: &[FieldMap]) -> Vec<Result<RowId, RepositoryError>>;
}
