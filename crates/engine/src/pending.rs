//! Pending remote writes.
//!
//! Local state is the source of truth; remote persistence trails behind through
//! this queue. Delivery is at-most-once: a write is handed to the repository
//! once and its failure is reported, never retried.
//!
//! The queue is drained with [`PendingWrites::take_batch`], the batch is sent
//! with [`deliver`] (on any thread; the batch owns its data), and the reports
//! are folded back into the grid with `Grid::apply_delivery`.

use std::collections::VecDeque;

use crate::cell::CellValue;
use crate::error::RepositoryError;
use crate::repository::{RowRepository, SheetId};
use crate::row::{FieldMap, LocalKey, RowId};

#[derive(Debug, Clone, PartialEq)]
pub enum PendingWrite {
    InsertRow { sheet: SheetId, local: LocalKey, fields: FieldMap },
    /// One batched insert per import.
    BulkInsert { sheet: SheetId, locals: Vec<LocalKey>, rows: Vec<FieldMap> },
    UpdateField { row_id: RowId, column: String, value: CellValue },
    DeleteRow { row_id: RowId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryReport {
    Inserted { sheet: SheetId, local: LocalKey, result: Result<RowId, RepositoryError> },
    /// One entry per row of a batched insert, in batch order.
    BulkInserted { sheet: SheetId, results: Vec<(LocalKey, Result<RowId, RepositoryError>)> },
    Updated { row_id: RowId, column: String, result: Result<(), RepositoryError> },
    Deleted { row_id: RowId, result: Result<(), RepositoryError> },
}

impl DeliveryReport {
    pub fn is_ok(&self) -> bool {
        self.failures() == 0
    }

    /// Number of rows whose write failed.
    pub fn failures(&self) -> usize {
        match self {
            DeliveryReport::Inserted { result, .. } => result.is_err() as usize,
            DeliveryReport::BulkInserted { results, .. } => results.iter().filter(|(_, r)| r.is_err()).count(),
            DeliveryReport::Updated { result, .. } | DeliveryReport::Deleted { result, .. } => result.is_err() as usize,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PendingWrites {
    queue: VecDeque<PendingWrite>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingWrite> {
        self.queue.iter()
    }

    /// Queue a single-field update. At most one update per (row, column) is
    /// queued: a newer value replaces the queued one in place.
    pub fn push_update(&mut self, row_id: RowId, column: &str, value: CellValue) {
        let existing = self.queue.iter_mut().find_map(|w| match w {
            PendingWrite::UpdateField { row_id: r, column: c, value: v } if *r == row_id && c == column => Some(v),
            _ => None,
        });
        match existing {
            Some(queued) => *queued = value,
            None => self.queue.push_back(PendingWrite::UpdateField {
                row_id,
                column: column.to_string(),
                value,
            }),
        }
    }

    pub fn push_insert(&mut self, sheet: SheetId, local: LocalKey, fields: FieldMap) {
        self.queue.push_back(PendingWrite::InsertRow { sheet, local, fields });
    }

    pub fn push_bulk_insert(&mut self, sheet: SheetId, locals: Vec<LocalKey>, rows: Vec<FieldMap>) {
        if locals.is_empty() {
            return;
        }
        self.queue.push_back(PendingWrite::BulkInsert { sheet, locals, rows });
    }

    /// Queue a delete. Updates still queued for the row are dropped.
    pub fn push_delete(&mut self, row_id: RowId) {
        self.queue.retain(|w| !matches!(w, PendingWrite::UpdateField { row_id: r, .. } if *r == row_id));
        self.queue.push_back(PendingWrite::DeleteRow { row_id });
    }

    /// Update a field inside a still-queued insert for `local`.
    /// Returns false when no queued insert covers the row.
    pub fn refresh_insert(&mut self, local: LocalKey, column: &str, value: &CellValue) -> bool {
        for write in self.queue.iter_mut() {
            let fields = match write {
                PendingWrite::InsertRow { local: l, fields, .. } if *l == local => fields,
                PendingWrite::BulkInsert { locals, rows, .. } => match locals.iter().position(|l| *l == local) {
                    Some(i) => &mut rows[i],
                    None => continue,
                },
                _ => continue,
            };
            fields.insert(column.to_string(), value.clone());
            return true;
        }
        false
    }

    /// Withdraw the queued insert for a row that was deleted before it was sent.
    pub fn withdraw_insert(&mut self, local: LocalKey) -> bool {
        let mut withdrawn = false;
        self.queue.retain_mut(|w| match w {
            PendingWrite::InsertRow { local: l, .. } if *l == local => {
                withdrawn = true;
                false
            }
            PendingWrite::BulkInsert { locals, rows, .. } => {
                if let Some(i) = locals.iter().position(|l| *l == local) {
                    locals.remove(i);
                    rows.remove(i);
                    withdrawn = true;
                }
                !locals.is_empty()
            }
            _ => true,
        });
        withdrawn
    }

    pub fn take_batch(&mut self) -> Vec<PendingWrite> {
        self.queue.drain(..).collect()
    }
}

/// Send a batch to the repository, in queue order. Every write is attempted
/// exactly once; one report per queued write.
pub fn deliver(batch: Vec<PendingWrite>, repo: &mut dyn RowRepository) -> Vec<DeliveryReport> {
    let mut reports = Vec::with_capacity(batch.len());
    for write in batch {
        match write {
            PendingWrite::InsertRow { sheet, local, fields } => {
                let result = repo.insert_row(&sheet, &fields);
                reports.push(DeliveryReport::Inserted { sheet, local, result });
            }
            PendingWrite::BulkInsert { sheet, locals, rows } => {
                let mut outcomes = repo.bulk_insert(&sheet, &rows).into_iter();
                let results = locals
                    .into_iter()
                    .map(|local| {
                        let result = outcomes.next().unwrap_or_else(|| {
                            Err(RepositoryError::Transient("no result reported for row".into()))
                        });
                        (local, result)
                    })
                    .collect();
                reports.push(DeliveryReport::BulkInserted { sheet, results });
            }
            PendingWrite::UpdateField { row_id, column, value } => {
                let result = repo.update_field(&row_id, &column, &value);
                reports.push(DeliveryReport::Updated { row_id, column, result });
            }
            PendingWrite::DeleteRow { row_id } => {
                let result = repo.delete_row(&row_id);
                reports.push(DeliveryReport::Deleted { row_id, result });
            }
        }
    }
    log::debug!(
        "delivered {} write(s), {} row(s) failed",
        reports.len(),
        reports.iter().map(|r| r.failures()).sum::<usize>()
    );
    reports
}
