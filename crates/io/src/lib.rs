// File I/O operations

pub mod delimited;
pub mod headers;
pub mod session;

pub use delimited::{
    export_file, export_rows, import_file, import_into_grid, import_rows, read_file_as_utf8, sniff_delimiter,
    ExportError, ExportOptions, ImportError, ImportOptions, ImportReport, ImportedRows, SkipReason, SkippedLine,
};
pub use headers::{fold_header, resolve_header, HeaderMap};
pub use session::{open_grid, transfer_options};
