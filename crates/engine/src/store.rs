//! Row store
//!
//! In-memory ordered rows mirroring one remote sheet. Owns the column schema so
//! every mutation can keep derived fields consistent with their inputs.

use std::collections::BTreeMap;

use crate::cell::CellValue;
use crate::error::GridError;
use crate::repository::StoredRow;
use crate::row::{FieldMap, LocalKey, Row, RowId, RowIdentity};
use crate::schema::ColumnSchema;

#[derive(Debug, Clone)]
pub struct RowStore {
    schema: ColumnSchema,
    rows: Vec<Row>,
    next_local: u64,
}

impl RowStore {
    pub fn new(schema: ColumnSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            next_local: 1,
        }
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn position_of(&self, local: LocalKey) -> Option<usize> {
        self.rows.iter().position(|r| r.local_key == local)
    }

    /// Replace all rows with a fetched set, ordered by ordinal (stable).
    pub fn load(&mut self, stored: Vec<StoredRow>) {
        let mut rows: Vec<Row> = stored
            .into_iter()
            .map(|s| {
                let local_key = self.allocate_local();
                let mut row = Row {
                    identity: RowIdentity::Persisted(s.id),
                    local_key,
                    ordinal: s.ordinal,
                    fields: self.normalize_fields(s.fields),
                    derived: BTreeMap::new(),
                };
                recompute_all(&self.schema, &mut row);
                row
            })
            .collect();
        rows.sort_by_key(|r| r.ordinal);
        self.rows = rows;
    }

    /// Append a local-only row. Missing input columns get their default value.
    pub fn insert(&mut self, fields: FieldMap) -> usize {
        let ordinal = self.next_ordinal();
        let local_key = self.allocate_local();
        let mut row = Row {
            identity: RowIdentity::LocalOnly,
            local_key,
            ordinal,
            fields: self.normalize_fields(fields),
            derived: BTreeMap::new(),
        };
        recompute_all(&self.schema, &mut row);
        self.rows.push(row);
        self.rows.len() - 1
    }

    /// Append several rows at once; returns their indices.
    pub fn append(&mut self, rows: Vec<FieldMap>) -> Vec<usize> {
        rows.into_iter().map(|fields| self.insert(fields)).collect()
    }

    /// Remove the row at `index`. Other rows keep their ordinals.
    pub fn remove(&mut self, index: usize) -> Result<Row, GridError> {
        self.check_index(index)?;
        Ok(self.rows.remove(index))
    }

    /// Set one input field and recompute the derived fields that read it.
    pub fn update_field(&mut self, index: usize, key: &str, value: CellValue) -> Result<(), GridError> {
        self.check_index(index)?;
        let def = self
            .schema
            .column(key)
            .ok_or_else(|| GridError::UnknownColumn(key.to_string()))?;
        if !def.editable {
            return Err(GridError::ReadOnlyColumn(key.to_string()));
        }

        let value = def.normalize(value);
        let row = &mut self.rows[index];
        row.fields.insert(key.to_string(), value);
        for (col, formula) in self.schema.dependents_of(key) {
            row.derived.insert(col.key.clone(), formula.evaluate(&row.fields));
        }
        Ok(())
    }

    /// Record the identifier the remote store assigned to a local row.
    /// Returns false when the row no longer exists.
    pub fn mark_persisted(&mut self, local: LocalKey, id: RowId) -> bool {
        match self.rows.iter_mut().find(|r| r.local_key == local) {
            Some(row) => {
                row.identity = RowIdentity::Persisted(id);
                true
            }
            None => false,
        }
    }

    fn check_index(&self, index: usize) -> Result<(), GridError> {
        if index < self.rows.len() {
            Ok(())
        } else {
            Err(GridError::RowOutOfRange { index, len: self.rows.len() })
        }
    }

    fn allocate_local(&mut self) -> LocalKey {
        let key = LocalKey(self.next_local);
        self.next_local += 1;
        key
    }

    // Consistent with the row count, but never reuses an ordinal after removals.
    fn next_ordinal(&self) -> i64 {
        let by_len = self.rows.len() as i64;
        let after_last = self.rows.iter().map(|r| r.ordinal).max().map_or(0, |m| m + 1);
        by_len.max(after_last)
    }

    /// Exactly one typed value per input column; unknown keys are dropped.
    fn normalize_fields(&self, mut raw: FieldMap) -> FieldMap {
        self.schema
            .input_columns()
            .map(|def| {
                let value = raw.remove(&def.key).unwrap_or(CellValue::Empty);
                (def.key.clone(), def.normalize(value))
            })
            .collect()
    }
}

fn recompute_all(schema: &ColumnSchema, row: &mut Row) {
    row.derived.clear();
    for (col, formula) in schema.derived_columns() {
        row.derived.insert(col.key.clone(), formula.evaluate(&row.fields));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::keys;

    fn fields(pairs: &[(&str, CellValue)]) -> FieldMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn stored(id: &str, ordinal: i64, qty: f64, price: f64) -> StoredRow {
        StoredRow {
            id: RowId::from(id),
            ordinal,
            fields: fields(&[
                (keys::QUANTITY, CellValue::Number(qty)),
                (keys::UNIT_PRICE, CellValue::Number(price)),
            ]),
        }
    }

    #[test]
    fn test_load_sorts_and_computes() {
        let mut store = RowStore::new(ColumnSchema::quantities_sheet());
        store.load(vec![stored("b", 2, 3.0, 2.0), stored("a", 1, 10.0, 1.5)]);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).unwrap().row_id(), Some(&RowId::from("a")));
        assert_eq!(store.get(0).unwrap().number(keys::TOTAL), 15.0);
        assert_eq!(store.get(1).unwrap().number(keys::TOTAL), 6.0);
    }

    #[test]
    fn test_load_fills_every_input_column() {
        let mut store = RowStore::new(ColumnSchema::quantities_sheet());
        store.load(vec![stored("a", 0, 1.0, 1.0)]);
        let row = store.get(0).unwrap();
        for def in store.schema().input_columns() {
            assert!(row.fields.contains_key(&def.key), "missing {}", def.key);
        }
        assert_eq!(row.fields.len(), store.schema().input_columns().count());
        assert_eq!(row.field(keys::DESCRIPTION), Some(&CellValue::text("")));
    }

    #[test]
    fn test_insert_defaults_and_ordinal() {
        let mut store = RowStore::new(ColumnSchema::quantities_sheet());
        let idx = store.insert(FieldMap::new());
        let row = store.get(idx).unwrap();
        assert_eq!(row.identity, RowIdentity::LocalOnly);
        assert_eq!(row.ordinal, 0);
        assert_eq!(row.number(keys::TOTAL), 0.0);
        assert_eq!(row.number(keys::COMPLETION_RATIO), 0.0);

        store.insert(FieldMap::new());
        store.insert(FieldMap::new());
        store.remove(0).unwrap();
        let idx = store.insert(FieldMap::new());
        // Two rows left, but ordinals 1 and 2 are taken
        assert_eq!(store.get(idx).unwrap().ordinal, 3);
    }

    #[test]
    fn test_update_field_recomputes_dependents() {
        let mut store = RowStore::new(ColumnSchema::quantities_sheet());
        store.load(vec![stored("a", 0, 10.0, 2.0)]);

        store.update_field(0, keys::QUANTITY, CellValue::Number(5.0)).unwrap();
        assert_eq!(store.get(0).unwrap().number(keys::TOTAL), 10.0);

        store.update_field(0, keys::EXECUTED_QUANTITY, CellValue::Number(2.0)).unwrap();
        assert_eq!(store.get(0).unwrap().number(keys::COMPLETION_RATIO), 40.0);

        // Idempotent
        let before = store.get(0).unwrap().clone();
        store.update_field(0, keys::QUANTITY, CellValue::Number(5.0)).unwrap();
        assert_eq!(store.get(0).unwrap(), &before);
    }

    #[test]
    fn test_update_field_rejects_derived_and_unknown() {
        let mut store = RowStore::new(ColumnSchema::quantities_sheet());
        store.insert(FieldMap::new());
        assert_eq!(
            store.update_field(0, keys::TOTAL, CellValue::Number(1.0)),
            Err(GridError::ReadOnlyColumn(keys::TOTAL.into()))
        );
        assert_eq!(
            store.update_field(0, "nope", CellValue::Number(1.0)),
            Err(GridError::UnknownColumn("nope".into()))
        );
        assert_eq!(
            store.update_field(3, keys::QUANTITY, CellValue::Number(1.0)),
            Err(GridError::RowOutOfRange { index: 3, len: 1 })
        );
    }

    #[test]
    fn test_mark_persisted() {
        let mut store = RowStore::new(ColumnSchema::quantities_sheet());
        let idx = store.insert(FieldMap::new());
        let local = store.get(idx).unwrap().local_key;
        assert!(store.mark_persisted(local, RowId::from("r1")));
        assert_eq!(store.get(idx).unwrap().row_id(), Some(&RowId::from("r1")));
        assert!(!store.mark_persisted(LocalKey(999), RowId::from("r2")));
    }
}
