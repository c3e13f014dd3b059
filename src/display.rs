//! Media display state machine: one driver per on-screen media slot.
//!
//! The slot must show something reasonable at every instant. A render seeds
//! the slot with the id's last-known-good image (or the inline
//! placeholder), dispatches an asynchronous load for the chosen variant,
//! and walks a bounded fallback chain on failure: remaining registry
//! variants, then the canonical base file, then last-known-good, then the
//! placeholder. Every settlement carries the render generation it belongs
//! to; a settlement whose generation is stale (the user already flipped or
//! paged) is discarded instead of clobbering a newer display.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::content::Signal;
use crate::debug::dbg_log;
use crate::engine::MediaEngine;
use crate::media::{self, MediaKind};
use crate::probe::load_media;
use crate::select::ChooseOpts;

/// Baked-in inline placeholder; always renderable, never fetched.
pub const PLACEHOLDER_URL: &str = "data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg' \
     width='640' height='360'%3E%3Crect width='100%25' height='100%25' fill='%23e8e8e8'/%3E\
     %3Ctext x='50%25' y='50%25' text-anchor='middle' fill='%23888' font-size='24'%3E\
     Signal unavailable%3C/text%3E%3C/svg%3E";

#[derive(Clone, Debug, PartialEq)]
pub enum SlotState {
    /// Load dispatched; the slot shows the seed meanwhile.
    Loading { seed: String },
    Displayed { url: String, kind: MediaKind },
    /// A load failed; the fallback chain is deciding what to do.
    Erroring { attempted: String },
    /// The chain picked another candidate and dispatched it.
    FallbackRetry { next: String },
    Placeholder,
}

/// What a view must provide for one media slot. `display_video` reveals
/// the (lazily created) video element, hides the sibling image and begins
/// playback; `display_image` the reverse.
pub trait MediaSlot {
    fn display_image(&mut self, url: &str);
    fn display_video(&mut self, url: &str);
    fn set_spinner(&mut self, on: bool);
    fn set_mirrored(&mut self, on: bool);
    fn set_width_cap(&mut self, px: u32);
}

#[derive(Clone, Debug)]
pub struct LoadRequest {
    pub generation: u64,
    pub url: String,
    pub kind: MediaKind,
}

/// Outcome of one asynchronous load, tagged with the generation of the
/// render that requested it.
#[derive(Clone, Debug)]
pub struct Settlement {
    pub generation: u64,
    pub url: String,
    pub kind: MediaKind,
    pub ok: bool,
    pub natural_width: Option<u32>,
}

/// Starts asynchronous media loads; settlements come back through whatever
/// channel the implementation was built with. Injectable so tests can
/// interleave settlements by hand.
pub trait MediaLoader {
    fn start(&self, req: LoadRequest);
}

/// Production loader: one helper thread per load, settlement over an mpsc
/// channel the caller pumps into `DisplayDriver::on_settlement`.
pub struct ThreadLoader {
    tx: mpsc::Sender<Settlement>,
    timeout: Duration,
}

impl ThreadLoader {
    pub fn channel(timeout: Duration) -> (Self, mpsc::Receiver<Settlement>) {
        let (tx, rx) = mpsc::channel();
        (ThreadLoader { tx, timeout }, rx)
    }
}

impl MediaLoader for ThreadLoader {
    fn start(&self, req: LoadRequest) {
        let tx = self.tx.clone();
        let timeout = self.timeout;
        thread::spawn(move || {
            let (ok, natural_width) = load_media(&req.url, req.kind, timeout);
            let _ = tx.send(Settlement {
                generation: req.generation,
                url: req.url,
                kind: req.kind,
                ok,
                natural_width,
            });
        });
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RenderOpts {
    /// Render the media face at all.
    pub show_signal: bool,
    /// Cycle to the id's next variant for this render.
    pub advance_variant: bool,
    /// Pin to the canonical base variant (first-ever view, front face).
    pub prefer_base: bool,
    /// External orientation override for this render.
    pub mirror: Option<bool>,
}

impl Default for RenderOpts {
    fn default() -> Self {
        RenderOpts {
            show_signal: true,
            advance_variant: false,
            prefer_base: false,
            mirror: None,
        }
    }
}

pub struct DisplayDriver {
    engine: Arc<MediaEngine>,
    loader: Box<dyn MediaLoader>,
    state: SlotState,
    /// Bumped on every render; settlements carrying an older generation
    /// are stale and ignored.
    generation: u64,
    current_id: Option<String>,
    /// Source currently on the live element (what the user sees).
    rendered: Option<String>,
    /// URLs attempted during the current error chain.
    tried: Vec<String>,
    pending_mirror: Option<bool>,
}

impl DisplayDriver {
    pub fn new(engine: Arc<MediaEngine>, loader: Box<dyn MediaLoader>) -> Self {
        DisplayDriver {
            engine,
            loader,
            state: SlotState::Placeholder,
            generation: 0,
            current_id: None,
            rendered: None,
            tried: Vec::new(),
            pending_mirror: None,
        }
    }

    pub fn state(&self) -> &SlotState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Begin displaying `signal`. Supersedes any in-flight load for this
    /// slot. The target comes from the selector over the registry entry;
    /// with no entry yet, the catalog's explicit URL or the inferred base
    /// file; with a known-empty entry, the placeholder.
    pub fn render(&mut self, slot: &mut dyn MediaSlot, signal: &Signal, opts: &RenderOpts) {
        if !opts.show_signal {
            return;
        }
        let id = signal.id.clone();
        self.generation += 1;
        self.current_id = Some(id.clone());
        self.tried.clear();
        self.pending_mirror = opts.mirror;

        let entry = self.engine.registry.get(&id);
        let chosen = match &entry {
            Some(list) if !list.is_empty() => self.engine.selector.choose(
                &id,
                list,
                ChooseOpts {
                    advance: opts.advance_variant,
                    prefer_base: opts.prefer_base,
                    mirror: opts.mirror,
                },
            ),
            _ => None,
        };

        let target = match chosen {
            Some(t) => t,
            None => match entry {
                // Discovered and empty: nothing will ever load.
                Some(_) => {
                    self.show_placeholder(slot);
                    return;
                }
                // Not discovered yet: catalog hint, else the inferred base.
                None => signal
                    .media
                    .clone()
                    .unwrap_or_else(|| self.inferred_base_url(&id, "gif")),
            },
        };

        if self.rendered.as_deref() == Some(target.as_str()) {
            self.finish_displayed(slot, target);
            return;
        }

        // Seed so the slot never shows a broken element while loading. A
        // video URL is never a seed; it would error before the real source
        // lands.
        let seed = self
            .engine
            .last_good(&id)
            .filter(|u| media::kind_of(u) == MediaKind::Image)
            .unwrap_or_else(|| PLACEHOLDER_URL.to_string());
        if self.rendered.as_deref() != Some(seed.as_str()) {
            slot.display_image(&seed);
            self.rendered = Some(seed.clone());
        }
        self.state = SlotState::Loading { seed };
        self.dispatch(slot, target);
    }

    /// Feed one load settlement back into the machine. Stale generations
    /// are discarded without touching visible state.
    pub fn on_settlement(&mut self, slot: &mut dyn MediaSlot, s: Settlement) {
        if s.generation != self.generation {
            dbg_log!("display: stale settlement for {} ignored", s.url);
            return;
        }
        let Some(id) = self.current_id.clone() else {
            return;
        };

        if s.ok {
            match s.kind {
                MediaKind::Video => slot.display_video(&s.url),
                MediaKind::Image => slot.display_image(&s.url),
            }
            slot.set_spinner(false);
            self.engine.record_good(&id, &s.url);
            let cap = match s.natural_width {
                Some(w) => Some(self.engine.observe_width(w)),
                None => self.engine.width_cap(),
            };
            if let Some(cap) = cap {
                slot.set_width_cap(cap);
            }
            self.apply_mirror(slot, &id);
            self.rendered = Some(s.url.clone());
            self.state = SlotState::Displayed {
                url: s.url,
                kind: s.kind,
            };
            return;
        }

        // Placeholder short-circuit: if the placeholder itself failed,
        // keep last-known-good when there is one and stop churning.
        if s.url == PLACEHOLDER_URL {
            if let Some(lg) = self.engine.last_good(&id) {
                self.keep_displayed(slot, lg);
            } else {
                self.show_placeholder(slot);
            }
            return;
        }

        self.tried.push(s.url.clone());
        self.state = SlotState::Erroring { attempted: s.url };
        self.next_fallback(slot, &id);
    }

    /// The error chain of §display, in order, first applicable step wins:
    /// untried cursor variant, remaining variants (at most len-1 hops),
    /// canonical base once per session, last-known-good, placeholder.
    fn next_fallback(&mut self, slot: &mut dyn MediaSlot, id: &str) {
        let list = self.engine.registry.get(id).unwrap_or_default();

        if !list.is_empty() {
            if let Some(u) = self.engine.selector.choose(id, &list, ChooseOpts::default()) {
                if !self.tried.contains(&u) {
                    self.retry(slot, u);
                    return;
                }
            }
            let mut hops = 0;
            while hops + 1 < list.len() {
                hops += 1;
                let next = self.engine.selector.choose(
                    id,
                    &list,
                    ChooseOpts {
                        advance: true,
                        ..Default::default()
                    },
                );
                if let Some(u) = next {
                    if !self.tried.contains(&u) {
                        self.retry(slot, u);
                        return;
                    }
                }
            }
        }

        if self.engine.base_attempt_once(id) {
            let root = list
                .first()
                .and_then(|u| u.rsplit_once('/').map(|(r, _)| r.to_string()))
                .unwrap_or_else(|| self.engine.roots.roots()[0].clone());
            for ext in ["gif", "png"] {
                let base = media::base_url(&root, id, ext);
                if !self.tried.contains(&base) {
                    self.retry(slot, base);
                    return;
                }
            }
        }

        if let Some(lg) = self.engine.last_good(id) {
            self.keep_displayed(slot, lg);
            return;
        }

        self.show_placeholder(slot);
    }

    fn retry(&mut self, slot: &mut dyn MediaSlot, url: String) {
        self.state = SlotState::FallbackRetry { next: url.clone() };
        self.dispatch(slot, url);
    }

    /// Dispatch a load, unless the URL is already what the live element
    /// shows — then it is a no-op Displayed transition (no re-fetch).
    fn dispatch(&mut self, slot: &mut dyn MediaSlot, url: String) {
        if self.rendered.as_deref() == Some(url.as_str()) {
            self.finish_displayed(slot, url);
            return;
        }
        slot.set_spinner(true);
        self.loader.start(LoadRequest {
            generation: self.generation,
            kind: media::kind_of(&url),
            url,
        });
    }

    fn finish_displayed(&mut self, slot: &mut dyn MediaSlot, url: String) {
        slot.set_spinner(false);
        if let Some(id) = self.current_id.clone() {
            self.apply_mirror(slot, &id);
        }
        self.state = SlotState::Displayed {
            kind: media::kind_of(&url),
            url,
        };
    }

    /// Keep (or restore) an already-known-good source without touching the
    /// network.
    fn keep_displayed(&mut self, slot: &mut dyn MediaSlot, url: String) {
        if self.rendered.as_deref() != Some(url.as_str()) {
            match media::kind_of(&url) {
                MediaKind::Video => slot.display_video(&url),
                MediaKind::Image => slot.display_image(&url),
            }
            self.rendered = Some(url.clone());
        }
        slot.set_spinner(false);
        self.state = SlotState::Displayed {
            kind: media::kind_of(&url),
            url,
        };
    }

    fn show_placeholder(&mut self, slot: &mut dyn MediaSlot) {
        if self.rendered.as_deref() != Some(PLACEHOLDER_URL) {
            slot.display_image(PLACEHOLDER_URL);
            self.rendered = Some(PLACEHOLDER_URL.to_string());
        }
        slot.set_spinner(false);
        self.state = SlotState::Placeholder;
    }

    fn apply_mirror(&self, slot: &mut dyn MediaSlot, id: &str) {
        let on = self
            .pending_mirror
            .unwrap_or_else(|| self.engine.selector.mirrored(id));
        slot.set_mirrored(on);
    }

    fn inferred_base_url(&self, id: &str, ext: &str) -> String {
        media::base_url(&self.engine.roots.roots()[0], id, ext)
    }
}
