// Grid settings
// Loaded from ~/.config/mqt/grid.json

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum SettingsError {
    Io(String),
    Serialize(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "settings I/O error: {}", msg),
            Self::Serialize(msg) => write!(f, "failed to serialize settings: {}", msg),
        }
    }
}

impl std::error::Error for SettingsError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    // Import
    #[serde(rename = "import.delimiter")]
    pub import_delimiter: Option<char>, // None = sniff from content

    #[serde(rename = "import.minPopulatedFields")]
    pub import_min_populated_fields: usize,

    #[serde(rename = "import.defaultUnit")]
    pub import_default_unit: String,

    #[serde(rename = "import.referencePrefix")]
    pub import_reference_prefix: String,

    // Export
    #[serde(rename = "export.delimiter")]
    pub export_delimiter: char,

    // Editing
    #[serde(rename = "grid.confirmDelete")]
    pub confirm_delete: bool,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            // Import
            import_delimiter: None,
            import_min_populated_fields: 2,
            import_default_unit: "un".to_string(),
            import_reference_prefix: String::new(),
            // Export
            export_delimiter: ';',
            // Editing
            confirm_delete: true,
        }
    }
}

impl GridSettings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mqt");
        config_dir.join("grid.json")
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`. A missing or unreadable file yields defaults;
    /// so does a malformed one, with a warning.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Strip comments (lines starting with //)
                let cleaned: String = contents
                    .lines()
                    .filter(|line| !line.trim().starts_with("//"))
                    .collect::<Vec<_>>()
                    .join("\n");

                match serde_json::from_str(&cleaned) {
                    Ok(settings) => settings,
                    Err(e) => {
                        log::warn!("error parsing {}: {}; using default settings", path.display(), e);
                        Self::default()
                    }
                }
            }
            Err(e) => {
                log::warn!("error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save current settings to the default location
    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_to(&Self::config_path())
    }

    /// Write settings to `path` via a temp file + rename, so a crash never
    /// leaves a half-written file behind.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| SettingsError::Serialize(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| SettingsError::Io(e.to_string()))?;
        fs::rename(&tmp, path).map_err(|e| SettingsError::Io(e.to_string()))
    }

    /// Import delimiter as a byte. Non-ASCII delimiters are ignored (sniffed instead).
    pub fn import_delimiter_byte(&self) -> Option<u8> {
        match self.import_delimiter {
            Some(c) if c.is_ascii() => Some(c as u8),
            Some(c) => {
                log::warn!("import delimiter '{}' is not ASCII; sniffing instead", c);
                None
            }
            None => None,
        }
    }

    /// Export delimiter as a byte, `;` when the configured one is not ASCII.
    pub fn export_delimiter_byte(&self) -> u8 {
        if self.export_delimiter.is_ascii() {
            self.export_delimiter as u8
        } else {
            log::warn!("export delimiter '{}' is not ASCII; using ';'", self.export_delimiter);
            b';'
        }
    }
}
