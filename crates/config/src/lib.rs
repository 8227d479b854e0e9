// Configuration loading

pub mod settings;

pub use settings::{KeywordSettings, Settings, SettingsError};
