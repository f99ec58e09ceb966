// Grid construction from user settings

use mqt_config::GridSettings;
use mqt_engine::{ColumnSchema, Grid, SheetId};

use crate::delimited::{ExportOptions, ImportOptions};

/// A grid for `sheet` with the editing behaviour from `settings`.
pub fn open_grid(sheet: SheetId, schema: ColumnSchema, settings: &GridSettings) -> Grid {
    log::debug!("opening grid for sheet {} (confirm delete: {})", sheet, settings.confirm_delete);
    Grid::new(sheet, schema).with_confirm_delete(settings.confirm_delete)
}

/// Import and export options from the same settings file.
pub fn transfer_options(settings: &GridSettings) -> (ImportOptions, ExportOptions) {
    (ImportOptions::from_settings(settings), ExportOptions::from_settings(settings))
}
