//! The per-session media engine: one object owning every piece of shared
//! media-resolution state, constructed once at startup and injected into
//! the views. A fresh engine per test gives each test a clean session.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::content::SignalSet;
use crate::probe::Prober;
use crate::registry::VariantRegistry;
use crate::roots::{LinkProbe, RootSelector};
use crate::select::VariantSelector;

pub struct MediaEngine {
    pub content: Arc<SignalSet>,
    pub roots: Arc<RootSelector>,
    pub registry: VariantRegistry,
    pub selector: VariantSelector,
    /// Most recent URL that successfully rendered, per id. Keeps a later
    /// failure from visibly regressing to the placeholder.
    last_good: Mutex<HashMap<String, String>>,
    /// Natural width of the first media to load this session; every later
    /// display is capped to it so card widths stay consistent.
    width_cap: Mutex<Option<u32>>,
    /// Ids whose canonical base file the fallback chain already attempted
    /// this session.
    base_attempted: Mutex<HashSet<String>>,
}

impl MediaEngine {
    pub fn new(
        content: Arc<SignalSet>,
        prober: Arc<dyn Prober>,
        override_spec: Option<String>,
        link: Box<dyn LinkProbe>,
    ) -> Arc<Self> {
        let roots = Arc::new(RootSelector::new(override_spec, link));
        let registry = VariantRegistry::new(content.clone(), roots.clone(), prober);
        Arc::new(MediaEngine {
            content,
            roots,
            registry,
            selector: VariantSelector::new(),
            last_good: Mutex::new(HashMap::new()),
            width_cap: Mutex::new(None),
            base_attempted: Mutex::new(HashSet::new()),
        })
    }

    pub fn last_good(&self, id: &str) -> Option<String> {
        self.last_good.lock().unwrap().get(id).cloned()
    }

    pub fn record_good(&self, id: &str, url: &str) {
        self.last_good
            .lock()
            .unwrap()
            .insert(id.to_string(), url.to_string());
    }

    pub fn width_cap(&self) -> Option<u32> {
        *self.width_cap.lock().unwrap()
    }

    /// Record the first observed natural width as the session cap; returns
    /// the effective cap either way.
    pub fn observe_width(&self, width: u32) -> u32 {
        let mut cap = self.width_cap.lock().unwrap();
        *cap.get_or_insert(width)
    }

    /// `true` exactly once per id per session.
    pub fn base_attempt_once(&self, id: &str) -> bool {
        self.base_attempted.lock().unwrap().insert(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::SignalSet;
    use crate::probe::testing::ScriptedProber;
    use crate::roots::NoLink;

    fn engine() -> Arc<MediaEngine> {
        let content = Arc::new(SignalSet::from_json("[]").unwrap());
        MediaEngine::new(
            content,
            Arc::new(ScriptedProber::new(&[])),
            None,
            Box::new(NoLink),
        )
    }

    #[test]
    fn width_cap_sticks_to_first_observation() {
        let e = engine();
        assert_eq!(e.width_cap(), None);
        assert_eq!(e.observe_width(500), 500);
        assert_eq!(e.observe_width(800), 500);
        assert_eq!(e.width_cap(), Some(500));
    }

    #[test]
    fn base_attempt_fires_once_per_id() {
        let e = engine();
        assert!(e.base_attempt_once("tevir"));
        assert!(!e.base_attempt_once("tevir"));
        assert!(e.base_attempt_once("zarqa"));
    }

    #[test]
    fn last_good_overwrites() {
        let e = engine();
        assert_eq!(e.last_good("tevir"), None);
        e.record_good("tevir", "./assets/signals/tevir.gif");
        e.record_good("tevir", "./assets/signals/tevir-1.gif");
        assert_eq!(
            e.last_good("tevir").as_deref(),
            Some("./assets/signals/tevir-1.gif")
        );
    }
}
