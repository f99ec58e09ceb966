//! Grid controller
//!
//! Owns the row store, the selection/edit state, the pending-writes queue and
//! the notices shown to the user. All mutation happens through `&mut self` on
//! the UI thread; only remote delivery may run elsewhere.
//!
//! The `impl Grid` is split by concern:
//! - `navigation.rs`: pointer selection and arrow movement
//! - `editing.rs`: entering, feeding and leaving edit mode
//! - `commit.rs`: turning an edit buffer into a stored value

use std::collections::BTreeSet;

use crate::error::{GridError, RepositoryError};
use crate::mode::{GridEvent, GridMode, Key, Response};
use crate::notice::Notice;
use crate::pending::{deliver, DeliveryReport, PendingWrite, PendingWrites};
use crate::repository::{RowRepository, SheetId, StoredRow};
use crate::row::{FieldMap, LocalKey, Row, RowId, RowIdentity};
use crate::schema::ColumnSchema;
use crate::store::RowStore;
use crate::totals::SheetTotals;

#[derive(Debug)]
pub struct Grid {
    pub(crate) sheet: SheetId,
    pub(crate) store: RowStore,
    pub(crate) mode: GridMode,
    pub(crate) pending_delete: Option<usize>,
    pub(crate) writes: PendingWrites,
    pub(crate) notices: Vec<Notice>,
    pub(crate) totals: SheetTotals,
    /// Local-only rows deleted after their insert was handed off for delivery.
    deleted_locals: BTreeSet<LocalKey>,
    confirm_delete: bool,
}

impl Grid {
    pub fn new(sheet: SheetId, schema: ColumnSchema) -> Self {
        Self {
            sheet,
            store: RowStore::new(schema),
            mode: GridMode::Idle,
            pending_delete: None,
            writes: PendingWrites::new(),
            notices: Vec::new(),
            totals: SheetTotals::default(),
            deleted_locals: BTreeSet::new(),
            confirm_delete: true,
        }
    }

    /// When disabled, `Delete` removes the selected row without asking.
    pub fn with_confirm_delete(mut self, confirm: bool) -> Self {
        self.confirm_delete = confirm;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn sheet(&self) -> &SheetId {
        &self.sheet
    }

    pub fn schema(&self) -> &ColumnSchema {
        self.store.schema()
    }

    pub fn store(&self) -> &RowStore {
        &self.store
    }

    pub fn rows(&self) -> &[Row] {
        self.store.rows()
    }

    pub fn mode(&self) -> &GridMode {
        &self.mode
    }

    pub fn selected(&self) -> Option<(usize, usize)> {
        self.mode.selected()
    }

    pub fn editing(&self) -> Option<(usize, usize)> {
        self.mode.editing()
    }

    pub fn edit_buffer(&self) -> Option<&str> {
        self.mode.buffer()
    }

    pub fn totals(&self) -> &SheetTotals {
        &self.totals
    }

    /// Row awaiting delete confirmation, if the user pressed `Delete`.
    pub fn pending_delete(&self) -> Option<usize> {
        self.pending_delete
    }

    pub fn pending_writes(&self) -> &PendingWrites {
        &self.writes
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn dismiss_notice(&mut self, index: usize) -> Option<Notice> {
        (index < self.notices.len()).then(|| self.notices.remove(index))
    }

    pub fn clear_notices(&mut self) {
        self.notices.clear();
    }

    // =========================================================================
    // Row set
    // =========================================================================

    /// Replace the row set with fetched rows. Selection and editing reset.
    pub fn load_rows(&mut self, rows: Vec<StoredRow>) {
        self.store.load(rows);
        self.reset_selection();
        self.refresh_totals();
    }

    /// Fetch and load a sheet. On failure the current rows stay and a notice
    /// is raised (blocking when the sheet does not exist).
    ///
    /// Writes still queued for the previous sheet are kept; they carry their
    /// own row ids and sheet ids.
    pub fn load_sheet(&mut self, repo: &mut dyn RowRepository, sheet: SheetId) -> Result<usize, RepositoryError> {
        match repo.fetch_rows(&sheet) {
            Ok(rows) => {
                log::info!("loaded {} row(s) for sheet {}", rows.len(), sheet);
                self.sheet = sheet;
                self.load_rows(rows);
                Ok(self.store.len())
            }
            Err(err) => {
                log::warn!("failed to load sheet {}: {}", sheet, err);
                self.notices.push(Notice::foreground(&format!("Loading sheet {sheet}"), &err));
                Err(err)
            }
        }
    }

    /// Append an empty row and queue its remote insert. Returns its index.
    pub fn add_row(&mut self) -> usize {
        let index = self.store.insert(FieldMap::new());
        let row = &self.store.rows()[index];
        self.writes.push_insert(self.sheet.clone(), row.local_key, row.fields.clone());
        self.refresh_totals();
        index
    }

    /// Append rows as one local step and queue a single batched insert.
    /// Existing rows are never touched. Returns the new indices.
    pub fn append_rows(&mut self, rows: Vec<FieldMap>) -> Vec<usize> {
        let indices = self.store.append(rows);
        let (locals, fields): (Vec<_>, Vec<_>) = indices
            .iter()
            .map(|&i| {
                let row = &self.store.rows()[i];
                (row.local_key, row.fields.clone())
            })
            .unzip();
        self.writes.push_bulk_insert(self.sheet.clone(), locals, fields);
        self.refresh_totals();
        indices
    }

    /// Remove a row immediately (no confirmation) and queue the remote delete.
    /// Selection resets to `Idle`.
    pub fn delete_row(&mut self, index: usize) -> Result<Row, GridError> {
        let row = self.store.remove(index)?;
        match &row.identity {
            RowIdentity::Persisted(id) => self.writes.push_delete(id.clone()),
            RowIdentity::LocalOnly => {
                if !self.writes.withdraw_insert(row.local_key) {
                    log::debug!("deleted local row {:?} with no queued insert", row.local_key);
                    self.deleted_locals.insert(row.local_key);
                }
            }
        }
        self.reset_selection();
        self.refresh_totals();
        Ok(row)
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Route one input event through the selection/edit state machine.
    ///
    /// Never fails: persistence problems surface as notices and the state
    /// machine always completes its transition.
    pub fn handle(&mut self, event: GridEvent) -> Response {
        if !matches!(event, GridEvent::ConfirmDelete) && self.pending_delete.take().is_some() {
            // Any other input dismisses the confirmation prompt.
            log::debug!("delete confirmation dismissed");
            if matches!(event, GridEvent::CancelDelete | GridEvent::Key(Key::Escape)) {
                return Response::DeleteCancelled;
            }
        }

        if self.store.is_empty() {
            return Response::Ignored;
        }

        match event {
            GridEvent::Click { row, col } => self.click(row, col),
            GridEvent::DoubleClick { row, col } => self.double_click(row, col),
            GridEvent::Blur => self.blur(),
            GridEvent::SetBuffer(text) => self.set_buffer(text),
            GridEvent::ConfirmDelete => self.confirm_delete(),
            GridEvent::CancelDelete => Response::Ignored,
            GridEvent::Key(key) => match self.mode {
                GridMode::Idle => Response::Ignored,
                GridMode::Selected { row, col } => self.key_selected(row, col, key),
                GridMode::Editing { .. } => self.key_editing(key),
            },
        }
    }

    fn key_selected(&mut self, row: usize, col: usize, key: Key) -> Response {
        match key {
            Key::Enter | Key::F2 => self.start_edit(row, col, None),
            Key::Char(c) if !c.is_control() => self.start_edit(row, col, Some(c)),
            Key::Up => self.move_selection(-1, 0),
            Key::Down => self.move_selection(1, 0),
            Key::Left => self.move_selection(0, -1),
            Key::Right => self.move_selection(0, 1),
            Key::Delete => self.request_delete(row),
            _ => Response::Ignored,
        }
    }

    fn request_delete(&mut self, row: usize) -> Response {
        if self.confirm_delete {
            self.pending_delete = Some(row);
            return Response::DeleteRequested { row };
        }
        self.delete_selected(row)
    }

    fn confirm_delete(&mut self) -> Response {
        match self.pending_delete.take() {
            Some(row) => self.delete_selected(row),
            None => Response::Ignored,
        }
    }

    fn delete_selected(&mut self, row: usize) -> Response {
        match self.delete_row(row) {
            Ok(_) => Response::RowDeleted { row },
            Err(err) => {
                log::error!("delete failed: {}", err);
                Response::Ignored
            }
        }
    }

    pub(crate) fn reset_selection(&mut self) {
        self.mode = GridMode::Idle;
        self.pending_delete = None;
    }

    pub(crate) fn refresh_totals(&mut self) {
        self.totals = SheetTotals::compute(&self.store);
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Drain the pending-writes queue for delivery.
    pub fn take_batch(&mut self) -> Vec<PendingWrite> {
        self.writes.take_batch()
    }

    /// Fold delivery results back into local state.
    ///
    /// Inserted rows become persisted. Failures become non-blocking notices;
    /// local values are never rolled back.
    pub fn apply_delivery(&mut self, reports: Vec<DeliveryReport>) {
        for report in reports {
            match report {
                DeliveryReport::Inserted { local, result, .. } => {
                    if let Err(err) = self.apply_insert(local, result) {
                        log::warn!("row insert failed: {}", err);
                        self.notices.push(Notice::background("Saving new row", &err));
                    }
                }
                DeliveryReport::BulkInserted { results, .. } => {
                    let total = results.len();
                    let mut failed = 0;
                    let mut first_error = None;
                    for (local, result) in results {
                        if let Err(err) = self.apply_insert(local, result) {
                            failed += 1;
                            first_error.get_or_insert(err);
                        }
                    }
                    if let Some(err) = first_error {
                        log::warn!("{} of {} imported row(s) not saved: {}", failed, total, err);
                        let context = format!("{failed} of {total} imported rows were not saved");
                        self.notices.push(Notice::background(&context, &err));
                    }
                }
                DeliveryReport::Updated { row_id, column, result: Err(err) } => {
                    log::warn!("update of {}.{} failed: {}", row_id, column, err);
                    self.notices.push(Notice::background(&format!("Saving '{column}'"), &err));
                }
                DeliveryReport::Deleted { row_id, result: Err(err) } => {
                    log::warn!("delete of {} failed: {}", row_id, err);
                    self.notices.push(Notice::background("Deleting row", &err));
                }
                DeliveryReport::Updated { result: Ok(()), .. } | DeliveryReport::Deleted { result: Ok(()), .. } => {}
            }
        }
    }

    /// Attach a remote id to the row it was inserted for. A row deleted while
    /// its insert was in flight is deleted remotely too; a row that vanished
    /// through a reload is left alone.
    fn apply_insert(&mut self, local: LocalKey, result: Result<RowId, RepositoryError>) -> Result<(), RepositoryError> {
        let deleted = self.deleted_locals.remove(&local);
        let id = result?;
        if self.store.mark_persisted(local, id.clone()) {
            return Ok(());
        }
        if deleted {
            log::debug!("removing orphaned remote row {}", id);
            self.writes.push_delete(id);
        } else {
            log::debug!("row {:?} was reloaded before its insert completed", local);
        }
        Ok(())
    }

    /// Deliver everything queued and apply the results. Returns how many
    /// row writes failed.
    pub fn flush_pending(&mut self, repo: &mut dyn RowRepository) -> usize {
        let batch = self.take_batch();
        if batch.is_empty() {
            return 0;
        }
        let reports = deliver(batch, repo);
        let failed = reports.iter().map(|r| r.failures()).sum();
        self.apply_delivery(reports);
        failed
    }
}
