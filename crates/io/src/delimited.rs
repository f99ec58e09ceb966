// Delimited-text import/export for quantities sheets

use std::fmt;
use std::io::Read;
use std::path::Path;

use mqt_config::GridSettings;
use mqt_engine::cell::parse_number_or_zero;
use mqt_engine::schema::{keys, ValueType};
use mqt_engine::{CellValue, ColumnDefinition, ColumnSchema, FieldMap, Grid, RowStore};

use crate::headers::HeaderMap;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ImportError {
    /// No header line.
    Empty,
    /// Header line present but none of its tokens maps to a column.
    NoRecognizedColumns { headers: Vec<String> },
    Csv(String),
    Io(String),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "nothing to import: no header line"),
            Self::NoRecognizedColumns { headers } => {
                write!(f, "no recognized columns in header: {}", headers.join(", "))
            }
            Self::Csv(msg) => write!(f, "malformed delimited text: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for ImportError {}

#[derive(Debug)]
pub enum ExportError {
    Csv(String),
    Io(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv(msg) => write!(f, "failed to write delimited text: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for ExportError {}

// ============================================================================
// Options and report
// ============================================================================

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Field delimiter; sniffed from the content when `None`.
    pub delimiter: Option<u8>,
    /// Lines with fewer non-empty mapped fields are skipped.
    pub min_populated_fields: usize,
    /// Unit used when a line has none.
    pub default_unit: String,
    /// Prefix for generated references.
    pub reference_prefix: String,
    /// Number of the first generated reference.
    pub first_reference: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            min_populated_fields: 2,
            default_unit: "un".to_string(),
            reference_prefix: String::new(),
            first_reference: 1,
        }
    }
}

impl ImportOptions {
    pub fn from_settings(settings: &GridSettings) -> Self {
        Self {
            delimiter: settings.import_delimiter_byte(),
            min_populated_fields: settings.import_min_populated_fields,
            default_unit: settings.import_default_unit.clone(),
            reference_prefix: settings.import_reference_prefix.clone(),
            first_reference: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub delimiter: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { delimiter: b';' }
    }
}

impl ExportOptions {
    pub fn from_settings(settings: &GridSettings) -> Self {
        Self { delimiter: settings.export_delimiter_byte() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    TooFewFields { populated: usize },
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the source, header included.
    pub line: u64,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub delimiter: u8,
    /// (header as written, column key)
    pub mapped: Vec<(String, String)>,
    pub ignored_headers: Vec<String>,
    pub skipped: Vec<SkippedLine>,
    pub generated_references: usize,
    pub accepted: usize,
}

#[derive(Debug, Clone)]
pub struct ImportedRows {
    pub rows: Vec<FieldMap>,
    pub report: ImportReport,
}

// ============================================================================
// Import
// ============================================================================

/// Parse delimited text with a header line into row field maps.
///
/// Every returned row has exactly one value per input column of `schema`.
/// Cells of mapped columns are typed per column and text is kept verbatim,
/// blanks included. Columns missing from the header get defaults: 0 for
/// numbers, empty text, `default_unit` for the unit. References missing from
/// the header or left blank are generated sequentially.
pub fn import_rows(content: &str, schema: &ColumnSchema, options: &ImportOptions) -> Result<ImportedRows, ImportError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let delimiter = options.delimiter.unwrap_or_else(|| sniff_delimiter(content));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(Ok(record)) => record,
        Some(Err(e)) => return Err(ImportError::Csv(e.to_string())),
        None => return Err(ImportError::Empty),
    };

    let map = HeaderMap::build(schema, header.iter());
    if map.mapped_count() == 0 {
        return Err(ImportError::NoRecognizedColumns {
            headers: header.iter().map(|h| h.to_string()).collect(),
        });
    }

    let mut report = ImportReport {
        delimiter,
        mapped: header
            .iter()
            .zip(&map.columns)
            .filter_map(|(h, c)| c.as_ref().map(|key| (h.trim().to_string(), key.clone())))
            .collect(),
        ignored_headers: map.ignored.clone(),
        ..ImportReport::default()
    };

    let mut rows = Vec::new();
    for result in records {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                log::warn!("skipping malformed line {}: {}", line, e);
                report.skipped.push(SkippedLine { line, reason: SkipReason::Malformed(e.to_string()) });
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let populated = map
            .columns
            .iter()
            .zip(record.iter())
            .filter(|(c, v)| c.is_some() && !v.trim().is_empty())
            .count();
        if populated < options.min_populated_fields {
            report.skipped.push(SkippedLine { line, reason: SkipReason::TooFewFields { populated } });
            continue;
        }

        let mut fields = FieldMap::new();
        for def in schema.input_columns() {
            // Column in the header: the cell is taken as written, even when blank.
            let cell = map.position_of(&def.key).map(|i| record.get(i).unwrap_or(""));
            let value = match cell {
                Some(raw) if def.key == keys::REFERENCE && raw.trim().is_empty() => {
                    generate_reference(options, rows.len(), &mut report)
                }
                Some(raw) => import_value(def, raw),
                None if def.key == keys::REFERENCE => generate_reference(options, rows.len(), &mut report),
                None if def.key == keys::UNIT => CellValue::Text(options.default_unit.clone()),
                None => def.default_value(),
            };
            fields.insert(def.key.clone(), value);
        }
        rows.push(fields);
    }

    report.accepted = rows.len();
    log::info!(
        "import: {} row(s) accepted, {} skipped, {} header(s) ignored",
        report.accepted,
        report.skipped.len(),
        report.ignored_headers.len()
    );
    Ok(ImportedRows { rows, report })
}

fn import_value(def: &ColumnDefinition, raw: &str) -> CellValue {
    match def.value_type {
        ValueType::Number | ValueType::Currency | ValueType::Percent => CellValue::Number(parse_number_or_zero(raw)),
        ValueType::Text => CellValue::Text(raw.to_string()),
        ValueType::Enumerated => match def.options.iter().find(|o| o.as_str() == raw.trim()) {
            Some(option) => CellValue::Text(option.clone()),
            None => {
                if !raw.trim().is_empty() {
                    log::warn!("'{}' is not a valid {}; using default", raw, def.key);
                }
                def.default_value()
            }
        },
    }
}

fn generate_reference(options: &ImportOptions, accepted: usize, report: &mut ImportReport) -> CellValue {
    report.generated_references += 1;
    CellValue::Text(format!("{}{}", options.reference_prefix, options.first_reference + accepted))
}

/// Import into a grid: rows are appended (never overwriting) and one batched
/// remote insert is queued. Generated references continue after the
/// existing rows.
pub fn import_into_grid(grid: &mut Grid, content: &str, options: &ImportOptions) -> Result<ImportReport, ImportError> {
    let options = ImportOptions { first_reference: grid.rows().len() + 1, ..options.clone() };
    let imported = import_rows(content, grid.schema(), &options)?;
    grid.append_rows(imported.rows);
    Ok(imported.report)
}

pub fn import_file(path: &Path, schema: &ColumnSchema, options: &ImportOptions) -> Result<ImportedRows, ImportError> {
    let content = read_file_as_utf8(path)?;
    import_rows(&content, schema, options)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (semicolon, tab, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b';', b'\t', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b';';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the header line to be viable
        let Some(&target) = counts.first() else {
            break;
        };
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, ImportError> {
    let mut file = std::fs::File::open(path).map_err(|e| ImportError::Io(e.to_string()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| ImportError::Io(e.to_string()))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Spreadsheet exports from older Office versions
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

// ============================================================================
// Export
// ============================================================================

/// Serialize all columns, in schema order, with labels as the header line.
/// Numbers use `.` as the decimal separator and round-trip exactly.
pub fn export_rows(store: &RowStore, options: &ExportOptions) -> Result<String, ExportError> {
    let schema = store.schema();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(Vec::new());

    writer
        .write_record(schema.columns().iter().map(|c| c.label.as_str()))
        .map_err(|e| ExportError::Csv(e.to_string()))?;

    for row in store.rows() {
        let record: Vec<String> = schema
            .columns()
            .iter()
            .map(|c| row.display(&c.key))
            .collect();
        writer.write_record(&record).map_err(|e| ExportError::Csv(e.to_string()))?;
    }

    let bytes = writer.into_inner().map_err(|e| ExportError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Csv(e.to_string()))
}

pub fn export_file(store: &RowStore, path: &Path, options: &ExportOptions) -> Result<(), ExportError> {
    let content = export_rows(store, options)?;
    std::fs::write(path, content).map_err(|e| ExportError::Io(e.to_string()))
}
