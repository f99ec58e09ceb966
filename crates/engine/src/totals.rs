use serde::Serialize;

use crate::derived::{product, ratio_percent, DerivedFormula};
use crate::schema::ColumnSchema;
use crate::store::RowStore;

/// Sheet-wide totals. A read-only projection of the row store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SheetTotals {
    pub row_count: usize,
    /// Σ total (the schema's first product column)
    pub total_planned_value: f64,
    /// Σ executed quantity × unit price (the ratio numerator times the
    /// product's other factor)
    pub total_executed_value: f64,
    /// executed / planned as a fraction, 0 when nothing is planned. Not clamped.
    pub overall_completion: f64,
}

impl SheetTotals {
    pub fn compute(store: &RowStore) -> Self {
        let columns = ValueColumns::of(store.schema());
        let mut planned = 0.0;
        let mut executed = 0.0;
        if let Some(columns) = &columns {
            for row in store.rows() {
                planned += row.number(columns.planned);
                if let Some((quantity, price)) = columns.executed {
                    executed += product(row.number(quantity), row.number(price));
                }
            }
        }

        let overall_completion = if planned == 0.0 { 0.0 } else { executed / planned };

        Self {
            row_count: store.len(),
            total_planned_value: planned,
            total_executed_value: executed,
            overall_completion: if overall_completion.is_finite() { overall_completion } else { 0.0 },
        }
    }

    /// Overall completion for display, clamped to 0..=100 like the per-row ratio.
    pub fn overall_completion_percent(&self) -> f64 {
        ratio_percent(self.total_executed_value, self.total_planned_value)
    }
}

/// Columns the totals are read from.
struct ValueColumns<'a> {
    /// Derived `left × right` column.
    planned: &'a str,
    /// (executed quantity, price): the completion ratio's numerator and the
    /// product factor that is not its denominator.
    executed: Option<(&'a str, &'a str)>,
}

impl<'a> ValueColumns<'a> {
    fn of(schema: &'a ColumnSchema) -> Option<Self> {
        let (planned, left, right) = schema.derived_columns().find_map(|(col, formula)| match formula {
            DerivedFormula::Product { left, right } => Some((col.key.as_str(), left.as_str(), right.as_str())),
            _ => None,
        })?;
        let executed = schema.derived_columns().find_map(|(_, formula)| match formula {
            DerivedFormula::RatioPercent { numerator, denominator } if denominator == left => {
                Some((numerator.as_str(), right))
            }
            DerivedFormula::RatioPercent { numerator, denominator } if denominator == right => {
                Some((numerator.as_str(), left))
            }
            _ => None,
        });
        Some(Self { planned, executed })
    }
}
