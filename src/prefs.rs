//! Read-once user preferences.
//!
//! A flat JSON object in the platform config dir. The engine only reads it
//! (once, at startup); nothing in this crate writes it. Known key:
//! `asset_roots` — asset-root override, same syntax as the env override.

use std::collections::HashMap;
use std::path::PathBuf;

use directories::ProjectDirs;

use crate::debug::dbg_log;

pub struct Prefs {
    values: HashMap<String, serde_json::Value>,
}

pub fn default_prefs_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("dev", "tropedeck", "tropedeck") {
        dirs.config_dir().join("prefs.json")
    } else {
        PathBuf::from("prefs.json")
    }
}

impl Prefs {
    /// Missing or malformed file yields empty prefs; never an error.
    pub fn load(path: &PathBuf) -> Self {
        let values = std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        let prefs = Prefs { values };
        dbg_log!("prefs: {} keys from {}", prefs.values.len(), path.display());
        prefs
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.values.get(key)?.as_str().map(|s| s.to_string())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key)?.as_bool()
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.values.get(key)?.as_f64()
    }
}
