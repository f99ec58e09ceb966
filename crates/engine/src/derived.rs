//! Derived-field formulas.
//!
//! A derived column is a pure function of two numeric input columns of the same
//! row. Values are recomputed whenever an input changes and never persisted.

use serde::{Deserialize, Serialize};

use crate::row::FieldMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedFormula {
    /// `left × right` (e.g. total = quantity × unit price)
    Product { left: String, right: String },
    /// `clamp(numerator / denominator × 100, 0, 100)`, 0 when the denominator is 0.
    RatioPercent { numerator: String, denominator: String },
}

impl DerivedFormula {
    pub fn inputs(&self) -> [&str; 2] {
        match self {
            DerivedFormula::Product { left, right } => [left.as_str(), right.as_str()],
            DerivedFormula::RatioPercent { numerator, denominator } => {
                [numerator.as_str(), denominator.as_str()]
            }
        }
    }

    pub fn evaluate(&self, fields: &FieldMap) -> f64 {
        let number = |key: &str| fields.get(key).map(|v| v.as_number()).unwrap_or(0.0);
        match self {
            DerivedFormula::Product { left, right } => product(number(left), number(right)),
            DerivedFormula::RatioPercent { numerator, denominator } => {
                ratio_percent(number(numerator), number(denominator))
            }
        }
    }
}

pub fn product(a: f64, b: f64) -> f64 {
    let p = a * b;
    if p.is_finite() { p } else { 0.0 }
}

pub fn ratio_percent(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let pct = numerator / denominator * 100.0;
    if pct.is_nan() {
        return 0.0;
    }
    pct.clamp(0.0, 100.0)
}
