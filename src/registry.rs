//! Variant registry: which media files actually exist for each signal id.
//!
//! Discovery is at-most-once per id. A present entry — even an empty one —
//! is a terminal cache state and is never re-probed; "checked, nothing
//! found" is a valid answer. Entries are ordered: index 0 is the confirmed
//! base rendition, followed by declared alternates from the catalog, then
//! numbered takes found by probing.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::content::SignalSet;
use crate::debug::dbg_log;
use crate::media::{self, MediaKind, BASE_EXT_ORDER};
use crate::probe::{Prober, PROBE_TIMEOUT};
use crate::roots::RootSelector;

/// Numbered-alternate cap for display-triggered discovery.
pub const DEFAULT_MAX_ALTERNATES: usize = 5;
/// Upper bound the original fallback chain ever reached for.
pub const MAX_ALTERNATES: usize = 9;

#[derive(Clone, Debug)]
pub struct EnsureOpts {
    /// How many numbered takes (`id-1` ..= `id-max`) to probe for.
    pub max: usize,
    pub timeout: Duration,
}

impl Default for EnsureOpts {
    fn default() -> Self {
        EnsureOpts {
            max: DEFAULT_MAX_ALTERNATES,
            timeout: PROBE_TIMEOUT,
        }
    }
}

impl EnsureOpts {
    /// Base-only discovery, used by background prefetch.
    pub fn base_only() -> Self {
        EnsureOpts {
            max: 0,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RegistryStats {
    pub entries: usize,
    pub with_base: usize,
    pub probes: u64,
}

pub struct VariantRegistry {
    prober: Arc<dyn Prober>,
    roots: Arc<RootSelector>,
    content: Arc<SignalSet>,
    entries: Mutex<HashMap<String, Vec<String>>>,
    base_ok: Mutex<HashSet<String>>,
    /// Ids whose discovery is currently running; a second `ensure` while an
    /// id is here is a no-op, same as a present entry.
    in_flight: Mutex<HashSet<String>>,
    probes: AtomicU64,
}

impl VariantRegistry {
    pub fn new(content: Arc<SignalSet>, roots: Arc<RootSelector>, prober: Arc<dyn Prober>) -> Self {
        VariantRegistry {
            prober,
            roots,
            content,
            entries: Mutex::new(HashMap::new()),
            base_ok: Mutex::new(HashSet::new()),
            in_flight: Mutex::new(HashSet::new()),
            probes: AtomicU64::new(0),
        }
    }

    /// Discover the variant list for `id`, once. Idempotent: if an entry
    /// exists (or discovery is already running) this returns immediately
    /// without probing. Ids absent from the catalog are a no-op.
    pub fn ensure(&self, id: &str, opts: &EnsureOpts) {
        if self.content.get(id).is_none() {
            return;
        }
        {
            let entries = self.entries.lock().unwrap();
            if entries.contains_key(id) {
                return;
            }
        }
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            if !in_flight.insert(id.to_string()) {
                return;
            }
        }

        let list = self.discover(id, opts);
        dbg_log!("registry: {} -> {} variant(s)", id, list.len());

        let mut entries = self.entries.lock().unwrap();
        entries.entry(id.to_string()).or_insert(list);
        drop(entries);
        self.in_flight.lock().unwrap().remove(id);
    }

    /// Whatever is cached right now. `None` means "not yet discovered";
    /// `Some(vec![])` means "discovered, nothing found".
    pub fn get(&self, id: &str) -> Option<Vec<String>> {
        self.entries.lock().unwrap().get(id).cloned()
    }

    /// Cheap "does the canonical file exist" check. Set as soon as a base
    /// probe confirms, before the full list is complete. `false` means
    /// unknown, never confirmed-absent.
    pub fn has_base(&self, id: &str) -> bool {
        self.base_ok.lock().unwrap().contains(id)
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            entries: self.entries.lock().unwrap().len(),
            with_base: self.base_ok.lock().unwrap().len(),
            probes: self.probes.load(Ordering::Relaxed),
        }
    }

    fn probe(&self, url: &str, kind: MediaKind, timeout: Duration) -> bool {
        self.probes.fetch_add(1, Ordering::Relaxed);
        self.prober.probe(url, kind, timeout)
    }

    /// One full discovery pass. Roots are tried in the frozen session
    /// order; the first root with any base hit becomes the chosen root and
    /// later roots are never consulted. Every probe failure is absorbed as
    /// "not found".
    fn discover(&self, id: &str, opts: &EnsureOpts) -> Vec<String> {
        let mut base: Option<(String, String)> = None; // (root, url)
        'roots: for root in self.roots.roots() {
            for ext in BASE_EXT_ORDER {
                let url = media::base_url(root, id, ext);
                if self.probe(&url, media::kind_of(&url), opts.timeout) {
                    base = Some((root.clone(), url));
                    break 'roots;
                }
            }
        }

        let Some((root, base_url)) = base else {
            return Vec::new();
        };

        // Base confirmed: flag it before the (slow) alternate scan so
        // has_base answers while discovery is still running.
        self.base_ok.lock().unwrap().insert(id.to_string());

        let mut list = vec![base_url];

        // Declared alternates from the catalog, kept only when they belong
        // to the chosen root, in declared order, deduplicated.
        if let Some(signal) = self.content.get(id) {
            let declared = signal.media.iter().chain(signal.media_variants.iter());
            for url in declared {
                if media::in_root(url, &root) && !list.contains(url) {
                    list.push(url.clone());
                }
            }
        }

        // Numbered takes, ascending, within the chosen root only. Video
        // form preferred at each slot.
        for n in 1..=opts.max {
            for ext in BASE_EXT_ORDER {
                let url = media::numbered_url(&root, id, n, ext);
                if self.probe(&url, media::kind_of(&url), opts.timeout) {
                    if !list.contains(&url) {
                        list.push(url);
                    }
                    break;
                }
            }
        }

        list
    }

    /// Warm ids one at a time, base-only, with an optional pause between
    /// items so idle-time warming does not saturate the link.
    pub fn prefetch_sequential(&self, ids: &[String], delay: Duration) {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                thread::sleep(delay);
            }
            self.ensure(id, &EnsureOpts::base_only());
        }
    }

    /// Warm ids with a fixed-size worker pool: `concurrency` workers pull
    /// from a shared queue until it drains. Base-only, like the sequential
    /// form; full alternate discovery stays on-demand.
    pub fn prefetch_concurrent(&self, ids: &[String], concurrency: usize) {
        let workers = concurrency.clamp(1, ids.len().max(1));
        let queue: Mutex<VecDeque<String>> = Mutex::new(ids.iter().cloned().collect());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let next = queue.lock().unwrap().pop_front();
                    match next {
                        Some(id) => self.ensure(&id, &EnsureOpts::base_only()),
                        None => break,
                    }
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::testing::ScriptedProber;
    use crate::roots::{NoLink, FULL_ROOT, OPT_ROOT};

    fn catalog(json: &str) -> Arc<SignalSet> {
        Arc::new(SignalSet::from_json(json).unwrap())
    }

    fn registry(content: Arc<SignalSet>, prober: Arc<ScriptedProber>) -> VariantRegistry {
        let roots = Arc::new(RootSelector::new(None, Box::new(NoLink)));
        VariantRegistry::new(content, roots, prober)
    }

    // ── discovery ───────────────────────────────────────────────────────

    #[test]
    fn tevir_scenario() {
        // Declared in the spec of record: mp4 probes false, gif probes
        // true, the optimized root is never consulted.
        let content = catalog(r#"[{"id": "tevir", "name": "Tevir"}]"#);
        let prober = Arc::new(ScriptedProber::new(&["./assets/signals/tevir.gif"]));
        let reg = registry(content, prober.clone());

        reg.ensure("tevir", &EnsureOpts::base_only());

        assert_eq!(reg.get("tevir").unwrap(), vec!["./assets/signals/tevir.gif"]);
        assert!(reg.has_base("tevir"));
        assert!(prober.probed("./assets/signals/tevir.mp4"));
        assert!(!prober.probed("./assets/signals_opt/tevir.gif"));
    }

    #[test]
    fn idempotent_discovery() {
        let content = catalog(r#"[{"id": "tevir", "name": "Tevir"}]"#);
        let prober = Arc::new(ScriptedProber::new(&["./assets/signals/tevir.gif"]));
        let reg = registry(content, prober.clone());

        reg.ensure("tevir", &EnsureOpts::default());
        let entry = reg.get("tevir").unwrap();
        let probes = prober.call_count();

        reg.ensure("tevir", &EnsureOpts::default());
        assert_eq!(reg.get("tevir").unwrap(), entry);
        assert_eq!(prober.call_count(), probes, "second ensure must not probe");
    }

    #[test]
    fn first_hit_wins_across_roots() {
        // Root A (full) lacks the id entirely; root B (opt) has it. The
        // entry must be sourced from B only.
        let content = catalog(r#"[{"id": "zarqa", "name": "Zarqa"}]"#);
        let prober = Arc::new(ScriptedProber::new(&[
            "./assets/signals_opt/zarqa.gif",
            "./assets/signals_opt/zarqa-1.gif",
        ]));
        let reg = registry(content, prober.clone());

        reg.ensure("zarqa", &EnsureOpts::default());

        let entry = reg.get("zarqa").unwrap();
        assert!(entry.iter().all(|u| u.starts_with(OPT_ROOT)));
        assert_eq!(
            entry,
            vec![
                "./assets/signals_opt/zarqa.gif",
                "./assets/signals_opt/zarqa-1.gif"
            ]
        );
    }

    #[test]
    fn probing_stops_at_first_successful_root() {
        // Both roots would succeed; only the first may be touched.
        let content = catalog(r#"[{"id": "munach", "name": "Munach"}]"#);
        let prober = Arc::new(ScriptedProber::new(&[
            "./assets/signals/munach.mp4",
            "./assets/signals_opt/munach.mp4",
        ]));
        let reg = registry(content, prober.clone());

        reg.ensure("munach", &EnsureOpts::base_only());

        assert_eq!(reg.get("munach").unwrap(), vec!["./assets/signals/munach.mp4"]);
        assert!(!prober.probed("./assets/signals_opt/munach.mp4"));
    }

    #[test]
    fn declared_alternates_merge_after_base() {
        // Declared URLs in the chosen root keep their order after the
        // confirmed base; ones from other roots are dropped; duplicates of
        // the base collapse.
        let content = catalog(
            r#"[{"id": "mapach", "name": "Mapach",
                 "media": "./assets/signals/mapach.gif",
                 "mediaVariants": [
                    "./assets/signals/mapach-extra.png",
                    "./assets/signals_opt/mapach-9.gif"
                 ]}]"#,
        );
        let prober = Arc::new(ScriptedProber::new(&["./assets/signals/mapach.gif"]));
        let reg = registry(content, prober);

        reg.ensure("mapach", &EnsureOpts::base_only());

        assert_eq!(
            reg.get("mapach").unwrap(),
            vec![
                "./assets/signals/mapach.gif",
                "./assets/signals/mapach-extra.png"
            ]
        );
    }

    #[test]
    fn numbered_takes_prefer_video_per_slot() {
        let content = catalog(r#"[{"id": "darga", "name": "Darga"}]"#);
        let prober = Arc::new(ScriptedProber::new(&[
            "./assets/signals/darga.gif",
            "./assets/signals/darga-1.mp4",
            "./assets/signals/darga-1.gif", // shadowed by the mp4
            "./assets/signals/darga-2.png",
        ]));
        let reg = registry(content, prober.clone());

        reg.ensure("darga", &EnsureOpts { max: 3, timeout: PROBE_TIMEOUT });

        assert_eq!(
            reg.get("darga").unwrap(),
            vec![
                "./assets/signals/darga.gif",
                "./assets/signals/darga-1.mp4",
                "./assets/signals/darga-2.png"
            ]
        );
        // slot 1 stopped at the video form
        assert!(!prober.probed("./assets/signals/darga-1.gif"));
    }

    #[test]
    fn empty_entry_is_terminal() {
        let content = catalog(r#"[{"id": "ghost", "name": "Ghost"}]"#);
        let prober = Arc::new(ScriptedProber::new(&[]));
        let reg = registry(content, prober.clone());

        assert_eq!(reg.get("ghost"), None, "unknown before ensure");
        reg.ensure("ghost", &EnsureOpts::default());
        assert_eq!(reg.get("ghost"), Some(vec![]), "known empty after ensure");
        assert!(!reg.has_base("ghost"));

        let probes = prober.call_count();
        reg.ensure("ghost", &EnsureOpts::default());
        assert_eq!(prober.call_count(), probes, "empty entry is never re-probed");
    }

    #[test]
    fn unknown_id_is_noop() {
        let content = catalog("[]");
        let prober = Arc::new(ScriptedProber::new(&[]));
        let reg = registry(content, prober.clone());

        reg.ensure("nobody", &EnsureOpts::default());
        assert_eq!(prober.call_count(), 0);
        assert_eq!(reg.get("nobody"), None);
    }

    // ── prefetch ────────────────────────────────────────────────────────

    #[test]
    fn prefetch_is_base_only() {
        let content = catalog(r#"[{"id": "tevir", "name": "Tevir"}]"#);
        let prober = Arc::new(ScriptedProber::new(&["./assets/signals/tevir.mp4"]));
        let reg = registry(content, prober.clone());

        reg.prefetch_sequential(&["tevir".to_string()], Duration::ZERO);

        // one probe: the base mp4 hit; no numbered-take probes
        assert_eq!(prober.call_count(), 1);
        assert_eq!(reg.get("tevir").unwrap().len(), 1);
    }

    #[test]
    fn concurrent_prefetch_covers_all_ids_within_bound() {
        let json: String = {
            let items: Vec<String> = (0..12)
                .map(|i| format!(r#"{{"id": "s{i}", "name": "S{i}"}}"#))
                .collect();
            format!("[{}]", items.join(","))
        };
        let present: Vec<String> = (0..12)
            .map(|i| format!("./assets/signals/s{i}.mp4"))
            .collect();
        let present_refs: Vec<&str> = present.iter().map(|s| s.as_str()).collect();

        let content = catalog(&json);
        let prober = Arc::new(
            ScriptedProber::new(&present_refs).with_delay(Duration::from_millis(10)),
        );
        let reg = registry(content.clone(), prober.clone());

        reg.prefetch_concurrent(&content.ids(), 3);

        for id in content.ids() {
            assert!(reg.has_base(&id), "missing {}", id);
        }
        let max = prober.max_in_flight.load(std::sync::atomic::Ordering::SeqCst);
        assert!(max <= 3, "probe concurrency {} exceeded bound", max);
    }
}
