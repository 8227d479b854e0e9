use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vorcheck_recon::{KeywordTable, Locale, MatchMode, Threshold};

/// Environment variable that points at an alternative settings file.
pub const CONFIG_ENV: &str = "VORCHECK_CONFIG";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Extra column-name keywords appended to the built-in ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordSettings {
    pub key: Vec<String>,
    pub name: Vec<String>,
    pub quantity: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Comparison defaults
    pub default_threshold: Threshold,
    pub default_match_by: MatchMode,

    // Output
    pub locale: Locale,

    // PDF extraction; None = look up pdftotext on PATH
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdftotext_path: Option<PathBuf>,

    pub keywords: KeywordSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_threshold: Threshold::DEFAULT,
            default_match_by: MatchMode::ByCode,
            locale: Locale::Ru,
            pdftotext_path: None,
            keywords: KeywordSettings::default(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vorcheck");
        config_dir.join("settings.toml")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match Self::try_load_from(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("{e}");
                tracing::warn!("using default settings");
                Self::default()
            }
        }
    }

    /// Like `load_from`, but a broken file is an error. A missing file is not.
    pub fn try_load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let settings = toml::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Write settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.display().to_string(),
            source,
        };

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(write_err)
    }

    /// Built-in column keywords extended with the user's.
    pub fn keyword_table(&self) -> KeywordTable {
        KeywordTable::extended(&self.keywords.key, &self.keywords.name, &self.keywords.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vorcheck_recon::model::ColumnRole;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::try_load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.default_threshold.percent(), 5);
        assert_eq!(settings.locale, Locale::Ru);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            r#"
default_threshold = 10
locale = "en"

[keywords]
quantity = ["Факт"]
"#,
        )
        .unwrap();

        let settings = Settings::try_load_from(&path).unwrap();
        assert_eq!(settings.default_threshold.percent(), 10);
        assert_eq!(settings.default_match_by, MatchMode::ByCode);
        assert_eq!(settings.locale, Locale::En);
        assert!(settings
            .keyword_table()
            .keywords(ColumnRole::Quantity)
            .contains(&"факт".to_string()));
    }

    #[test]
    fn broken_file_is_an_error_but_load_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "default_threshold = 500\n").unwrap();

        assert!(matches!(
            Settings::try_load_from(&path),
            Err(SettingsError::Parse { .. })
        ));
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.toml");
        let settings = Settings {
            default_match_by: MatchMode::ByName,
            pdftotext_path: Some(PathBuf::from("/opt/poppler/bin/pdftotext")),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::try_load_from(&path).unwrap(), settings);
    }
}
