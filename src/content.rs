//! Content source: the signal catalog loaded from `signals.json`.
//!
//! One record per trope hand signal. Media fields are hints for the variant
//! registry — declared URLs are merged into an entry only after a probe has
//! confirmed which asset root the id resolves from.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::debug::dbg_log;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub id: String,
    pub name: String,
    /// Explicit single media URL, if the catalog pins one.
    #[serde(default)]
    pub media: Option<String>,
    /// Declared alternate takes, in preference order.
    #[serde(default)]
    pub media_variants: Vec<String>,
    /// Cantillation mark(s), either precomposed or as a token list.
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    symbols: Vec<String>,
    #[serde(default)]
    pub symbol_alt: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
}

/// The loaded catalog, indexed by id. Read once at startup.
pub struct SignalSet {
    signals: Vec<Signal>,
    by_id: HashMap<String, usize>,
}

impl SignalSet {
    pub fn from_json(json: &str) -> Result<Self> {
        let mut signals: Vec<Signal> =
            serde_json::from_str(json).context("signals.json must be an array of signals")?;
        for s in &mut signals {
            // `symbols: ["a", "b"]` collapses into `symbol` when no
            // precomposed symbol is given.
            if s.symbol.is_none() && !s.symbols.is_empty() {
                s.symbol = Some(s.symbols.join(""));
            }
        }
        let by_id = signals
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        Ok(SignalSet { signals, by_id })
    }

    pub fn load(path: &Path) -> Result<Self> {
        dbg_log!("loading catalog: {}", path.display());
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let set = Self::from_json(&json)?;
        dbg_log!("catalog: {} signals", set.len());
        Ok(set)
    }

    pub fn get(&self, id: &str) -> Option<&Signal> {
        self.by_id.get(id).map(|&i| &self.signals[i])
    }

    pub fn all(&self) -> &[Signal] {
        &self.signals
    }

    pub fn ids(&self) -> Vec<String> {
        self.signals.iter().map(|s| s.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}
