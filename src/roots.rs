//! Asset-root selection: which base directories to try, in which order.
//!
//! Computed once per session and frozen — two roots may hold visually
//! different renditions of the same id, so mixing orders mid-session is
//! forbidden. Priority: explicit override, then link-quality heuristic,
//! then full-quality first.

use std::sync::OnceLock;

use crate::debug::dbg_log;

/// Full-quality renditions.
pub const FULL_ROOT: &str = "./assets/signals";
/// Bandwidth-optimized renditions.
pub const OPT_ROOT: &str = "./assets/signals_opt";

/// Network-quality hints, read once. The fields mirror what a constrained
/// link exposes: a data-saver flag, an effective connection class, and a
/// downlink estimate in Mbit/s. All optional; absent means unknown.
#[derive(Clone, Debug, Default)]
pub struct LinkSignal {
    pub save_data: bool,
    pub effective_type: Option<String>,
    pub downlink_mbps: Option<f64>,
}

impl LinkSignal {
    /// Does this signal indicate a constrained link?
    fn constrained(&self) -> bool {
        if self.save_data {
            return true;
        }
        if let Some(t) = &self.effective_type {
            if matches!(t.as_str(), "slow-2g" | "2g" | "3g") {
                return true;
            }
        }
        matches!(self.downlink_mbps, Some(d) if d < 1.5)
    }
}

/// Provides the link signal at selection time. Injectable so tests can
/// simulate fluctuating network quality.
pub trait LinkProbe: Send + Sync {
    fn signal(&self) -> LinkSignal;
}

/// No signal available (the default outside a browser-like host).
pub struct NoLink;

impl LinkProbe for NoLink {
    fn signal(&self) -> LinkSignal {
        LinkSignal::default()
    }
}

pub struct RootSelector {
    override_spec: Option<String>,
    link: Box<dyn LinkProbe>,
    roots: OnceLock<Vec<String>>,
}

impl RootSelector {
    /// `override_spec` comes from CLI flag > env var > prefs, already
    /// collapsed by the caller. Recognized values: `full`/`hq`,
    /// `opt`/`optimized`/`low`, or an explicit comma-separated root list.
    pub fn new(override_spec: Option<String>, link: Box<dyn LinkProbe>) -> Self {
        RootSelector {
            override_spec,
            link,
            roots: OnceLock::new(),
        }
    }

    /// The frozen root order. First call computes, later calls return the
    /// identical list.
    pub fn roots(&self) -> &[String] {
        self.roots.get_or_init(|| {
            let order = self.compute();
            dbg_log!("asset roots: {:?}", order);
            order
        })
    }

    fn compute(&self) -> Vec<String> {
        if let Some(spec) = &self.override_spec {
            match spec.trim() {
                "full" | "hq" => return vec![FULL_ROOT.into(), OPT_ROOT.into()],
                "opt" | "optimized" | "low" => return vec![OPT_ROOT.into(), FULL_ROOT.into()],
                other => {
                    let list = dedup(other.split(',').map(|r| r.trim().trim_end_matches('/')));
                    if !list.is_empty() {
                        return list;
                    }
                    eprintln!("roots: ignoring empty override {:?}", other);
                }
            }
        }
        if self.link.signal().constrained() {
            vec![OPT_ROOT.into(), FULL_ROOT.into()]
        } else {
            vec![FULL_ROOT.into(), OPT_ROOT.into()]
        }
    }
}

fn dedup<'a>(parts: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for p in parts {
        if !p.is_empty() && !out.iter().any(|q| q == p) {
            out.push(p.to_string());
        }
    }
    out
}
