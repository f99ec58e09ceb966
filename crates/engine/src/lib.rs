//! `mqt-engine`: quantities-sheet grid engine.
//!
//! Pure engine crate: column schema, typed rows with derived fields, sheet
//! totals, the selection/edit state machine and the commit pipeline. Remote
//! persistence goes through the `RowRepository` trait; no IO here.

pub mod cell;
pub mod commit;
pub mod derived;
mod editing;
pub mod error;
pub mod grid;
pub mod mode;
mod navigation;
pub mod notice;
pub mod pending;
pub mod repository;
pub mod row;
pub mod schema;
pub mod store;
pub mod totals;

pub use cell::CellValue;
pub use commit::{CommitOutcome, RemoteWrite};
pub use error::{GridError, RepositoryError};
pub use grid::Grid;
pub use mode::{GridEvent, GridMode, Key, Response};
pub use notice::{Notice, NoticeKind, Severity};
pub use repository::{InMemoryRepository, RowRepository, SheetId, StoredRow};
pub use row::{FieldMap, LocalKey, Row, RowId, RowIdentity};
pub use schema::{ColumnDefinition, ColumnSchema, ValueType};
pub use store::RowStore;
pub use totals::SheetTotals;
