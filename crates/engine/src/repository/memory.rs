// In-memory row repository
// Reference implementation of the repository contract, with failure injection for tests.

use std::collections::{BTreeMap, VecDeque};

use super::{RowRepository, SheetId, StoredRow};
use crate::cell::CellValue;
use crate::error::RepositoryError;
use crate::row::{FieldMap, RowId};

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    sheets: BTreeMap<SheetId, Vec<StoredRow>>,
    next_id: u64,
    /// Fields `insert_row` / `bulk_insert` require to be present and non-blank.
    required_fields: Vec<String>,
    /// Errors returned by the next calls, one per call, before any other check.
    injected: VecDeque<RepositoryError>,
    /// When set, `bulk_insert` fails every row after this many successes.
    bulk_limit: Option<usize>,
    calls: usize,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, sheet: SheetId, rows: Vec<StoredRow>) -> Self {
        self.sheets.insert(sheet, rows);
        self
    }

    pub fn create_sheet(&mut self, sheet: SheetId) {
        self.sheets.entry(sheet).or_default();
    }

    pub fn require_field(mut self, key: impl Into<String>) -> Self {
        self.required_fields.push(key.into());
        self
    }

    /// Make the next call fail with `err`. Queued errors are consumed in order.
    pub fn fail_next(&mut self, err: RepositoryError) {
        self.injected.push_back(err);
    }

    pub fn limit_bulk_inserts(&mut self, limit: usize) {
        self.bulk_limit = Some(limit);
    }

    pub fn rows(&self, sheet: &SheetId) -> &[StoredRow] {
        self.sheets.get(sheet).map(|r| r.as_slice()).unwrap_or(&[])
    }

    pub fn find(&self, id: &RowId) -> Option<&StoredRow> {
        self.sheets.values().flatten().find(|r| &r.id == id)
    }

    /// Number of repository calls made so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn begin_call(&mut self) -> Result<(), RepositoryError> {
        self.calls += 1;
        match self.injected.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn validate(&self, fields: &FieldMap) -> Result<(), RepositoryError> {
        for key in &self.required_fields {
            if fields.get(key).map_or(true, |v| v.is_blank()) {
                return Err(RepositoryError::Validation(format!("missing required field '{key}'")));
            }
        }
        Ok(())
    }

    fn store_row(&mut self, sheet: &SheetId, fields: &FieldMap) -> Result<RowId, RepositoryError> {
        self.validate(fields)?;
        self.next_id += 1;
        let id = RowId(format!("row-{}", self.next_id));
        let rows = self
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| RepositoryError::NotFound(format!("sheet '{sheet}'")))?;
        let ordinal = rows.iter().map(|r| r.ordinal + 1).max().unwrap_or(0);
        rows.push(StoredRow { id: id.clone(), ordinal, fields: fields.clone() });
        Ok(id)
    }

    fn row_mut(&mut self, id: &RowId) -> Option<&mut StoredRow> {
        self.sheets.values_mut().flatten().find(|r| &r.id == id)
    }
}

impl RowRepository for InMemoryRepository {
    fn fetch_rows(&mut self, sheet: &SheetId) -> Result<Vec<StoredRow>, RepositoryError> {
        self.begin_call()?;
        let mut rows = self
            .sheets
            .get(sheet)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("sheet '{sheet}'")))?;
        rows.sort_by_key(|r| r.ordinal);
        Ok(rows)
    }

    fn insert_row(&mut self, sheet: &SheetId, fields: &FieldMap) -> Result<RowId, RepositoryError> {
        self.begin_call()?;
        self.store_row(sheet, fields)
    }

    fn update_field(&mut self, row: &RowId, column: &str, value: &CellValue) -> Result<(), RepositoryError> {
        self.begin_call()?;
        let stored = self
            .row_mut(row)
            .ok_or_else(|| RepositoryError::NotFound(format!("row '{row}'")))?;
        stored.fields.insert(column.to_string(), value.clone());
        Ok(())
    }

    fn delete_row(&mut self, row: &RowId) -> Result<(), RepositoryError> {
        self.begin_call()?;
        for rows in self.sheets.values_mut() {
            if let Some(pos) = rows.iter().position(|r| &r.id == row) {
                rows.remove(pos);
                return Ok(());
            }
        }
        Err(RepositoryError::NotFound(format!("row '{row}'")))
    }

    fn bulk_insert(&mut self, sheet: &SheetId, rows: &[FieldMap]) -> Vec<Result<RowId, RepositoryError>> {
        if let Err(err) = self.begin_call() {
            return rows.iter().map(|_| Err(err.clone())).collect();
        }
        rows.iter()
            .enumerate()
            .map(|(i, fields)| match self.bulk_limit {
                Some(limit) if i >= limit => {
                    Err(RepositoryError::Transient("connection reset during batch".into()))
                }
                _ => self.store_row(sheet, fields),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::keys;

    fn sheet() -> SheetId {
        SheetId::from("s1")
    }

    fn fields(desc: &str) -> FieldMap {
        let mut f = FieldMap::new();
        f.insert(keys::DESCRIPTION.into(), CellValue::text(desc));
        f
    }

    #[test]
    fn test_insert_fetch_update_delete() {
        let mut repo = InMemoryRepository::new();
        repo.create_sheet(sheet());

        let id = repo.insert_row(&sheet(), &fields("Concrete")).unwrap();
        repo.update_field(&id, keys::QUANTITY, &CellValue::Number(3.0)).unwrap();

        let rows = repo.fetch_rows(&sheet()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields.get(keys::QUANTITY), Some(&CellValue::Number(3.0)));

        repo.delete_row(&id).unwrap();
        assert!(repo.fetch_rows(&sheet()).unwrap().is_empty());
        assert!(repo.delete_row(&id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_unknown_sheet_is_not_found() {
        let mut repo = InMemoryRepository::new();
        assert!(repo.fetch_rows(&SheetId::from("missing")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_required_fields() {
        let mut repo = InMemoryRepository::new().require_field(keys::DESCRIPTION);
        repo.create_sheet(sheet());
        let err = repo.insert_row(&sheet(), &FieldMap::new()).unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
        assert!(repo.insert_row(&sheet(), &fields("Steel")).is_ok());
    }

    #[test]
    fn test_injected_failure_consumed_once() {
        let mut repo = InMemoryRepository::new();
        repo.create_sheet(sheet());
        repo.fail_next(RepositoryError::Transient("offline".into()));
        assert!(repo.fetch_rows(&sheet()).is_err());
        assert!(repo.fetch_rows(&sheet()).is_ok());
        assert_eq!(repo.calls(), 2);
    }

    #[test]
    fn test_bulk_insert_partial_failure() {
        let mut repo = InMemoryRepository::new();
        repo.create_sheet(sheet());
        repo.limit_bulk_inserts(2);
        let results = repo.bulk_insert(&sheet(), &[fields("a"), fields("b"), fields("c")]);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(results[2].is_err());
        assert_eq!(repo.rows(&sheet()).len(), 2);
    }
}
