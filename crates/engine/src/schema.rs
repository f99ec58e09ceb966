//! Column schema registry
//!
//! The ordered list of column definitions for a grid. Column order is the
//! on-screen order and the navigation order (Tab moves left to right through it).
//! A schema is immutable once constructed.

use serde::{Deserialize, Serialize};

use crate::cell::{parse_number, CellValue};
use crate::derived::DerivedFormula;
use crate::error::GridError;

/// Column keys of the standard quantities sheet.
pub mod keys {
    pub const REFERENCE: &str = "ref";
    pub const DESCRIPTION: &str = "description";
    pub const UNIT: &str = "unit";
    pub const QUANTITY: &str = "quantity";
    pub const UNIT_PRICE: &str = "unitPrice";
    pub const TOTAL: &str = "total";
    pub const EXECUTED_QUANTITY: &str = "executedQuantity";
    pub const COMPLETION_RATIO: &str = "completionRatio";
    pub const STATUS: &str = "status";
}

/// Status options for the standard sheet, in display order.
pub const STATUS_OPTIONS: [&str; 3] = ["Not started", "In progress", "Completed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Text,
    Number,
    Currency,
    Percent,
    Enumerated,
}

impl ValueType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Number | ValueType::Currency | ValueType::Percent)
    }
}

/// Result of interpreting raw input against a column's type.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedInput {
    /// Typed value to store. `recovered` is set when the input could not be
    /// parsed and a safe default was substituted.
    Value { value: CellValue, recovered: bool },
    /// Input is not acceptable for this column; the cell keeps its prior value.
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub key: String,
    pub label: String,
    pub width: f32,
    pub value_type: ValueType,
    pub editable: bool,
    /// Allowed values, only meaningful for `ValueType::Enumerated`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedFormula>,
}

impl ColumnDefinition {
    pub fn new(key: impl Into<String>, label: impl Into<String>, width: f32, value_type: ValueType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            width,
            value_type,
            editable: true,
            options: Vec::new(),
            derived: None,
        }
    }

    pub fn text(key: impl Into<String>, label: impl Into<String>, width: f32) -> Self {
        Self::new(key, label, width, ValueType::Text)
    }

    pub fn number(key: impl Into<String>, label: impl Into<String>, width: f32) -> Self {
        Self::new(key, label, width, ValueType::Number)
    }

    pub fn currency(key: impl Into<String>, label: impl Into<String>, width: f32) -> Self {
        Self::new(key, label, width, ValueType::Currency)
    }

    pub fn percent(key: impl Into<String>, label: impl Into<String>, width: f32) -> Self {
        Self::new(key, label, width, ValueType::Percent)
    }

    pub fn enumerated(key: impl Into<String>, label: impl Into<String>, width: f32, options: Vec<String>) -> Self {
        let mut def = Self::new(key, label, width, ValueType::Enumerated);
        def.options = options;
        def
    }

    /// Mark the column as computed from other fields. Derived columns are never editable.
    pub fn derived(mut self, formula: DerivedFormula) -> Self {
        self.derived = Some(formula);
        self.editable = false;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn is_derived(&self) -> bool {
        self.derived.is_some()
    }

    /// Value a freshly created row holds for this column.
    pub fn default_value(&self) -> CellValue {
        match self.value_type {
            ValueType::Number | ValueType::Currency | ValueType::Percent => CellValue::Number(0.0),
            ValueType::Text => CellValue::Text(String::new()),
            ValueType::Enumerated => {
                CellValue::Text(self.options.first().cloned().unwrap_or_default())
            }
        }
    }

    /// Interpret a raw edit buffer as a value of this column's type.
    ///
    /// Numeric input never fails: unparseable text becomes 0.
    /// Enumerated input must match one of the options exactly (case-sensitive).
    /// Text is taken verbatim, including the empty string.
    pub fn parse_input(&self, raw: &str) -> ParsedInput {
        match self.value_type {
            ValueType::Number | ValueType::Currency | ValueType::Percent => match parse_number(raw) {
                Some(n) => ParsedInput::Value { value: CellValue::Number(n), recovered: false },
                None => ParsedInput::Value { value: CellValue::Number(0.0), recovered: true },
            },
            ValueType::Text => ParsedInput::Value {
                value: CellValue::Text(raw.to_string()),
                recovered: false,
            },
            ValueType::Enumerated => match self.options.iter().find(|o| o.as_str() == raw) {
                Some(option) => ParsedInput::Value {
                    value: CellValue::Text(option.clone()),
                    recovered: false,
                },
                None => ParsedInput::Rejected {
                    reason: format!("'{}' is not one of {:?}", raw, self.options),
                },
            },
        }
    }

    /// Coerce a repository value to this column's type.
    ///
    /// Unlike `parse_input`, nothing is rejected: enumerated values that are not
    /// in the option list are kept as-is so remote data is never dropped.
    pub fn normalize(&self, value: CellValue) -> CellValue {
        match (self.value_type, value) {
            (t, CellValue::Number(n)) if t.is_numeric() => {
                CellValue::Number(if n.is_finite() { n } else { 0.0 })
            }
            (t, CellValue::Text(s)) if t.is_numeric() => {
                CellValue::Number(parse_number(&s).unwrap_or(0.0))
            }
            (_, CellValue::Empty) => self.default_value(),
            (_, CellValue::Number(n)) => CellValue::Text(crate::cell::format_number(n)),
            (_, text) => text,
        }
    }
}

/// Ordered, immutable set of columns for one grid instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSchema {
    columns: Vec<ColumnDefinition>,
}

impl ColumnSchema {
    /// Build a schema, checking keys are unique, derived inputs exist and are
    /// numeric, and enumerated columns declare at least one option.
    pub fn new(columns: Vec<ColumnDefinition>) -> Result<Self, GridError> {
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.key == col.key) {
                return Err(GridError::DuplicateColumn(col.key.clone()));
            }
            if col.value_type == ValueType::Enumerated && col.options.is_empty() {
                return Err(GridError::InvalidSchema(format!(
                    "enumerated column '{}' has no options",
                    col.key
                )));
            }
            if let Some(formula) = &col.derived {
                if !col.value_type.is_numeric() {
                    return Err(GridError::InvalidSchema(format!(
                        "derived column '{}' must be numeric",
                        col.key
                    )));
                }
                for input in formula.inputs() {
                    let Some(source) = columns.iter().find(|c| c.key == input) else {
                        return Err(GridError::InvalidSchema(format!(
                            "derived column '{}' depends on unknown column '{}'",
                            col.key, input
                        )));
                    };
                    if !source.value_type.is_numeric() || source.is_derived() {
                        return Err(GridError::InvalidSchema(format!(
                            "derived column '{}' input '{}' must be a numeric input column",
                            col.key, input
                        )));
                    }
                }
            }
        }
        Ok(Self { columns })
    }

    /// The standard quantities sheet ("MQT") layout.
    pub fn quantities_sheet() -> Self {
        let columns = vec![
            ColumnDefinition::text(keys::REFERENCE, "Ref.", 70.0),
            ColumnDefinition::text(keys::DESCRIPTION, "Description", 320.0),
            ColumnDefinition::text(keys::UNIT, "Unit", 60.0),
            ColumnDefinition::number(keys::QUANTITY, "Quantity", 90.0),
            ColumnDefinition::currency(keys::UNIT_PRICE, "Unit price", 100.0),
            ColumnDefinition::currency(keys::TOTAL, "Total", 110.0)
                .derived(DerivedFormula::Product {
                    left: keys::QUANTITY.into(),
                    right: keys::UNIT_PRICE.into(),
                }),
            ColumnDefinition::number(keys::EXECUTED_QUANTITY, "Executed qty", 100.0),
            ColumnDefinition::percent(keys::COMPLETION_RATIO, "Completion %", 100.0)
                .derived(DerivedFormula::RatioPercent {
                    numerator: keys::EXECUTED_QUANTITY.into(),
                    denominator: keys::QUANTITY.into(),
                }),
            ColumnDefinition::enumerated(
                keys::STATUS,
                "Status",
                110.0,
                STATUS_OPTIONS.iter().map(|s| s.to_string()).collect(),
            ),
        ];
        // Static layout above satisfies every check in `new`.
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ColumnDefinition> {
        self.columns.get(index)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.key == key)
    }

    pub fn column(&self, key: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn value_type(&self, key: &str) -> Option<ValueType> {
        self.column(key).map(|c| c.value_type)
    }

    /// Allowed values for an enumerated column, `None` for any other column.
    pub fn options(&self, key: &str) -> Option<&[String]> {
        self.column(key)
            .filter(|c| c.value_type == ValueType::Enumerated)
            .map(|c| c.options.as_slice())
    }

    pub fn is_editable(&self, index: usize) -> bool {
        self.columns.get(index).is_some_and(|c| c.editable)
    }

    /// Columns that hold stored input values (everything that is not derived).
    pub fn input_columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter().filter(|c| !c.is_derived())
    }

    pub fn derived_columns(&self) -> impl Iterator<Item = (&ColumnDefinition, &DerivedFormula)> {
        self.columns
            .iter()
            .filter_map(|c| c.derived.as_ref().map(|f| (c, f)))
    }

    /// Derived columns whose formula reads `key`.
    pub fn dependents_of<'a>(&'a self, key: &'a str) -> impl Iterator<Item = (&'a ColumnDefinition, &'a DerivedFormula)> + 'a {
        self.derived_columns()
            .filter(move |(_, formula)| formula.inputs().contains(&key))
    }
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self::quantities_sheet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantities_sheet_is_valid() {
        let schema = ColumnSchema::quantities_sheet();
        let rebuilt = ColumnSchema::new(schema.columns().to_vec()).unwrap();
        assert_eq!(rebuilt, schema);
        assert_eq!(schema.index_of(keys::QUANTITY), Some(3));
        assert!(!schema.is_editable(schema.index_of(keys::TOTAL).unwrap()));
        assert!(schema.is_editable(schema.index_of(keys::STATUS).unwrap()));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = ColumnSchema::new(vec![
            ColumnDefinition::text("a", "A", 10.0),
            ColumnDefinition::number("a", "A2", 10.0),
        ])
        .unwrap_err();
        assert!(matches!(err, GridError::DuplicateColumn(k) if k == "a"));
    }

    #[test]
    fn test_derived_input_must_exist() {
        let err = ColumnSchema::new(vec![
            ColumnDefinition::number("qty", "Qty", 10.0),
            ColumnDefinition::currency("total", "Total", 10.0).derived(DerivedFormula::Product {
                left: "qty".into(),
                right: "price".into(),
            }),
        ])
        .unwrap_err();
        assert!(matches!(err, GridError::InvalidSchema(_)));
    }

    #[test]
    fn test_enumerated_needs_options() {
        let err = ColumnSchema::new(vec![ColumnDefinition::enumerated("s", "S", 10.0, vec![])]).unwrap_err();
        assert!(matches!(err, GridError::InvalidSchema(_)));
    }

    #[test]
    fn test_dependents_of() {
        let schema = ColumnSchema::quantities_sheet();
        let deps: Vec<&str> = schema.dependents_of(keys::QUANTITY).map(|(c, _)| c.key.as_str()).collect();
        assert_eq!(deps, vec![keys::TOTAL, keys::COMPLETION_RATIO]);
        let deps: Vec<&str> = schema.dependents_of(keys::UNIT_PRICE).map(|(c, _)| c.key.as_str()).collect();
        assert_eq!(deps, vec![keys::TOTAL]);
        assert_eq!(schema.dependents_of(keys::DESCRIPTION).count(), 0);
    }

    #[test]
    fn test_parse_input_by_type() {
        let schema = ColumnSchema::quantities_sheet();
        let qty = schema.column(keys::QUANTITY).unwrap();
        assert_eq!(
            qty.parse_input("12,5"),
            ParsedInput::Value { value: CellValue::Number(12.5), recovered: false }
        );
        assert_eq!(
            qty.parse_input("abc"),
            ParsedInput::Value { value: CellValue::Number(0.0), recovered: true }
        );

        let desc = schema.column(keys::DESCRIPTION).unwrap();
        assert_eq!(
            desc.parse_input(""),
            ParsedInput::Value { value: CellValue::text(""), recovered: false }
        );

        let status = schema.column(keys::STATUS).unwrap();
        assert!(matches!(status.parse_input("Completed"), ParsedInput::Value { .. }));
        assert!(matches!(status.parse_input("completed"), ParsedInput::Rejected { .. }));
    }

    #[test]
    fn test_normalize() {
        let schema = ColumnSchema::quantities_sheet();
        let qty = schema.column(keys::QUANTITY).unwrap();
        assert_eq!(qty.normalize(CellValue::text("4,5")), CellValue::Number(4.5));
        assert_eq!(qty.normalize(CellValue::Empty), CellValue::Number(0.0));
        let unit = schema.column(keys::UNIT).unwrap();
        assert_eq!(unit.normalize(CellValue::Number(2.0)), CellValue::text("2"));
        let status = schema.column(keys::STATUS).unwrap();
        assert_eq!(status.normalize(CellValue::Empty), CellValue::text("Not started"));
        assert_eq!(status.normalize(CellValue::text("Legacy")), CellValue::text("Legacy"));
    }
}
