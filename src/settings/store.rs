use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SERVER_ADDRESS: &str = "Server Inbound Address";
pub const SERVER_PORT: &str = "Server Inbound Port";
pub const CLIENT_ADDRESS: &str = "Client Outbound Address";
pub const CLIENT_PORT: &str = "Client Outbound Port";

pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Label, default text, column, row
const DEFAULT_ITEMS: [(&str, &str, u32, u32); 4] = [
    (SERVER_ADDRESS, "127.0.0.1", 0, 0),
    (SERVER_PORT, "8080", 1, 0),
    (CLIENT_ADDRESS, "127.0.0.1", 0, 1),
    (CLIENT_PORT, "8080", 1, 1),
];

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Settings file is invalid: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Unknown setting: {0}")]
    UnknownLabel(String),
}

/// One labelled value and where it sits in the operator's layout
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigItem {
    pub label: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
}

impl ConfigItem {
    fn at_grid(label: &str, text: &str, column: u32, row: u32) -> Self {
        let (x, y) = grid_position(column, row);
        Self {
            label: label.to_string(),
            text: text.to_string(),
            x,
            y,
        }
    }
}

/// Layout position of a grid cell
pub fn grid_position(column: u32, row: u32) -> (f64, f64) {
    (10.0 + f64::from(column) * 210.0, 10.0 + f64::from(row) * 90.0)
}

/// On-disk shape of one item
#[derive(Debug, Serialize, Deserialize)]
struct StoredItem {
    #[serde(rename = "Text")]
    text: String,
    #[serde(rename = "X")]
    x: f64,
    #[serde(rename = "Y")]
    y: f64,
}

/// The four persisted configuration items, backed by a JSON file
///
/// # Examples
///
/// ```no_run
/// use roundtrip::settings::{SERVER_PORT, SettingsStore};
///
/// let mut store = SettingsStore::load("settings.json")?;
/// store.set_value(SERVER_PORT, "9090")?;
/// store.save()?;
/// assert_eq!(store.value(SERVER_PORT), "9090");
/// # Ok::<(), roundtrip::settings::SettingsError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    items: Vec<ConfigItem>,
}

impl SettingsStore {
    /// Defaults only; nothing is read from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            items: default_items(),
        }
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    ///
    /// Labels in the file that are not known items are ignored.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let mut store = Self::new(path);

        let raw = match std::fs::read_to_string(&store.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %store.path.display(), "No settings file, using defaults");
                return Ok(store);
            }
            Err(e) => return Err(e.into()),
        };

        let stored: BTreeMap<String, serde_json::Value> = serde_json::from_str(&raw)?;
        for item in &mut store.items {
            if let Some(value) = stored.get(&item.label) {
                let StoredItem { text, x, y } = serde_json::from_value(value.clone())?;
                item.text = text;
                item.x = x;
                item.y = y;
            }
        }

        debug!(path = %store.path.display(), "Loaded settings");
        Ok(store)
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let stored: BTreeMap<&str, StoredItem> = self
            .items
            .iter()
            .map(|item| {
                (
                    item.label.as_str(),
                    StoredItem {
                        text: item.text.clone(),
                        x: item.x,
                        y: item.y,
                    },
                )
            })
            .collect();

        std::fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;
        info!(path = %self.path.display(), "Saved settings");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn items(&self) -> &[ConfigItem] {
        &self.items
    }

    /// Text of `label`, or an empty string for an unknown label
    pub fn value(&self, label: &str) -> &str {
        self.find(label).map_or("", |item| item.text.as_str())
    }

    pub fn set_value(&mut self, label: &str, text: &str) -> Result<(), SettingsError> {
        let item = self.find_mut(label)?;
        item.text = text.to_string();
        Ok(())
    }

    pub fn move_item(&mut self, label: &str, x: f64, y: f64) -> Result<(), SettingsError> {
        let item = self.find_mut(label)?;
        item.x = x;
        item.y = y;
        Ok(())
    }

    /// Restores default texts and positions; the file is untouched until [`save`](Self::save)
    pub fn reset(&mut self) {
        self.items = default_items();
    }

    fn find(&self, label: &str) -> Option<&ConfigItem> {
        self.items.iter().find(|item| item.label == label)
    }

    fn find_mut(&mut self, label: &str) -> Result<&mut ConfigItem, SettingsError> {
        self.items
            .iter_mut()
            .find(|item| item.label == label)
            .ok_or_else(|| SettingsError::UnknownLabel(label.to_string()))
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(DEFAULT_SETTINGS_FILE)
    }
}

fn default_items() -> Vec<ConfigItem> {
    DEFAULT_ITEMS
        .iter()
        .map(|&(label, text, column, row)| ConfigItem::at_grid(label, text, column, row))
        .collect()
}
