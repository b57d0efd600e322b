//! Persisted operator settings

pub mod store;


pub use store::{
    CLIENT_ADDRESS, CLIENT_PORT, ConfigItem, DEFAULT_SETTINGS_FILE, SERVER_ADDRESS, SERVER_PORT,
    SettingsError, SettingsStore, grid_position,
};
