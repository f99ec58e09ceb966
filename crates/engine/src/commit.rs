//! Cell commit pipeline
//!
//! raw string → typed value (per column type) → row store update (derived
//! fields follow synchronously) → totals → queued remote write.
//!
//! Local state always wins: a failed remote write is reported later through
//! `Grid::apply_delivery` and never rolls the cell back.

use crate::cell::CellValue;
use crate::error::GridError;
use crate::grid::Grid;
use crate::row::RowIdentity;
use crate::schema::ParsedInput;

/// What happened to the remote side of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteWrite {
    /// Update queued for the persisted row.
    Queued,
    /// Row's insert has not been sent yet; the value rides along with it.
    FoldedIntoInsert,
    /// Row has no durable id and no queued insert (insert in flight or failed).
    SkippedLocalOnly,
    /// Value did not change.
    NotNeeded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Applied {
        value: CellValue,
        /// Input was unparseable and a default was stored instead.
        recovered: bool,
        remote: RemoteWrite,
    },
    /// Value not acceptable for the column; the cell keeps its prior value.
    Rejected { reason: String },
}

impl Grid {
    /// Commit raw text into a cell.
    ///
    /// Errors only on API misuse (bad row, unknown or read-only column). Bad
    /// input is recovered locally and reported in the outcome.
    pub fn commit_cell(&mut self, row: usize, column: &str, raw: &str) -> Result<CommitOutcome, GridError> {
        let def = self
            .schema()
            .column(column)
            .ok_or_else(|| GridError::UnknownColumn(column.to_string()))?;
        if !def.editable {
            return Err(GridError::ReadOnlyColumn(column.to_string()));
        }
        let parsed = def.parse_input(raw);

        let previous = self
            .store
            .get(row)
            .ok_or(GridError::RowOutOfRange { index: row, len: self.store.len() })?
            .field(column)
            .cloned();

        let (value, recovered) = match parsed {
            ParsedInput::Value { value, recovered } => (value, recovered),
            ParsedInput::Rejected { reason } => {
                log::warn!("rejected value for {} in row {}: {}", column, row, reason);
                return Ok(CommitOutcome::Rejected { reason });
            }
        };
        if recovered {
            log::warn!("'{}' is not a number; stored 0 in {} (row {})", raw, column, row);
        }

        self.store.update_field(row, column, value.clone())?;
        self.refresh_totals();

        let remote = if previous.as_ref() == Some(&value) {
            RemoteWrite::NotNeeded
        } else {
            self.queue_remote_update(row, column, &value)
        };
        log::debug!("committed {}={:?} in row {} ({:?})", column, value, row, remote);

        Ok(CommitOutcome::Applied { value, recovered, remote })
    }

    fn queue_remote_update(&mut self, row: usize, column: &str, value: &CellValue) -> RemoteWrite {
        let row = &self.store.rows()[row];
        match &row.identity {
            RowIdentity::Persisted(id) => {
                self.writes.push_update(id.clone(), column, value.clone());
                RemoteWrite::Queued
            }
            RowIdentity::LocalOnly => {
                if self.writes.refresh_insert(row.local_key, column, value) {
                    RemoteWrite::FoldedIntoInsert
                } else {
                    log::warn!("row {:?} has no remote id yet; skipped saving {}", row.local_key, column);
                    RemoteWrite::SkippedLocalOnly
                }
            }
        }
    }
}
