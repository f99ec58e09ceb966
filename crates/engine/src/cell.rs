use serde::{Deserialize, Serialize};

/// A loosely-typed scalar as stored in a row field.
///
/// The column schema decides which variant a field holds after normalisation:
/// numeric columns always carry `Number`, text and enumerated columns carry `Text`.
/// `Empty` only appears in raw repository payloads before normalisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Numeric view of the value. Text is parsed leniently, anything else is 0.
    pub fn as_number(&self) -> f64 {
        match self {
            CellValue::Number(n) => *n,
            CellValue::Text(s) => parse_number(s).unwrap_or(0.0),
            CellValue::Empty => 0.0,
        }
    }

    /// String form used to seed the edit buffer and for export.
    pub fn raw_display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }
}

/// Parse a user-typed number.
///
/// Accepts `.` and `,` as decimal separators. When both appear, the last one is
/// the decimal separator and the other is treated as a thousands separator
/// (`1.234,5` and `1,234.5` are both 1234.5). Whitespace and currency/percent
/// symbols are ignored. Returns `None` for anything that is not a finite number.
pub fn parse_number(input: &str) -> Option<f64> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '€' | '$' | '£' | '%'))
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(_)) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse a number, substituting 0 for unparseable input.
pub fn parse_number_or_zero(input: &str) -> f64 {
    parse_number(input).unwrap_or(0.0)
}

/// Shortest representation that parses back to the same `f64`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Avoid "-0"
        return "0".to_string();
    }
    format!("{}", n)
}
