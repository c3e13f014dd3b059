//! Variant selection: which of an id's variants to show next.
//!
//! Keeps a per-id cursor into the variant list and a per-id mirror flag.
//! The cursor is seeded at index 0 on first use (deterministic, so the
//! base rendition appears first) and only moves when asked to. Both maps
//! live for the page session, independent of which card is on screen.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::media::{self, BASE_EXT_ORDER};

#[derive(Clone, Copy, Debug, Default)]
pub struct ChooseOpts {
    /// Move the cursor forward (cyclic) before returning.
    pub advance: bool,
    /// Pin the cursor to the canonical base variant, if the list has one.
    pub prefer_base: bool,
    /// Caller-supplied orientation for this render. When set, a
    /// single-entry advance must not toggle the internal flag.
    pub mirror: Option<bool>,
}

#[derive(Default)]
pub struct VariantSelector {
    cursors: Mutex<HashMap<String, usize>>,
    mirrors: Mutex<HashMap<String, bool>>,
}

impl VariantSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a URL from `list` for `id`. `None` iff the list is empty —
    /// the caller then falls back to base-file inference or the inline
    /// placeholder. Precedence: prefer-base, then advance, then the
    /// current cursor.
    pub fn choose(&self, id: &str, list: &[String], opts: ChooseOpts) -> Option<String> {
        if list.is_empty() {
            return None;
        }

        let mut cursors = self.cursors.lock().unwrap();
        let cursor = cursors.entry(id.to_string()).or_insert(0);
        // A stale cursor can outlive a shorter fallback list.
        if *cursor >= list.len() {
            *cursor = 0;
        }

        if opts.prefer_base {
            if let Some(i) = base_index(id, list) {
                *cursor = i;
                return Some(list[i].clone());
            }
        }

        if opts.advance {
            if list.len() == 1 {
                // Advancing cannot change the URL; flip orientation instead
                // as the "something changed" signal, unless the caller is
                // controlling the mirror for this render.
                if opts.mirror.is_none() {
                    self.toggle_mirror(id);
                }
            } else {
                *cursor = (*cursor + 1) % list.len();
            }
        }

        Some(list[*cursor].clone())
    }

    /// The per-id mirror flag (horizontal flip). Seeded unset.
    pub fn mirrored(&self, id: &str) -> bool {
        self.mirrors.lock().unwrap().get(id).copied().unwrap_or(false)
    }

    pub fn toggle_mirror(&self, id: &str) {
        let mut mirrors = self.mirrors.lock().unwrap();
        let flag = mirrors.entry(id.to_string()).or_insert(false);
        *flag = !*flag;
    }
}

/// Index of the canonical base variant in `list`, video form preferred
/// over still form when both are present.
fn base_index(id: &str, list: &[String]) -> Option<usize> {
    for ext in BASE_EXT_ORDER {
        if let Some(i) = list
            .iter()
            .position(|u| media::is_base_of(u, id) && media::ext_of(u) == *ext)
        {
            return Some(i);
        }
    }
    None
}
