//! CLI subcommand implementations.

use std::sync::Arc;
use std::time::Duration;

use crate::audit;
use crate::display::{DisplayDriver, MediaSlot, RenderOpts, SlotState, ThreadLoader};
use crate::engine::MediaEngine;
use crate::probe::PROBE_TIMEOUT;
use crate::registry::{EnsureOpts, MAX_ALTERNATES};

/// Discover and print the variant list for one id.
pub fn resolve(engine: &MediaEngine, id: &str, max: usize) {
    if engine.content.get(id).is_none() {
        eprintln!("resolve: unknown id {:?}", id);
        return;
    }
    engine.registry.ensure(
        id,
        &EnsureOpts {
            max,
            timeout: PROBE_TIMEOUT,
        },
    );
    match engine.registry.get(id) {
        Some(list) if !list.is_empty() => {
            println!(
                "{}: {} variant(s), base confirmed: {}",
                id,
                list.len(),
                engine.registry.has_base(id)
            );
            for (i, url) in list.iter().enumerate() {
                println!("  [{}] {}", i, url);
            }
        }
        Some(_) => println!("{}: no media found (cached as empty)", id),
        None => println!("{}: not discovered", id),
    }
}

/// Warm the registry for every catalog id, base-only.
pub fn warm(engine: &MediaEngine, concurrency: usize, delay: Duration) {
    let ids = engine.content.ids();
    println!("warm: {} ids, concurrency {}", ids.len(), concurrency.max(1));
    if concurrency > 1 {
        engine.registry.prefetch_concurrent(&ids, concurrency);
    } else {
        engine.registry.prefetch_sequential(&ids, delay);
    }
    let stats = engine.registry.stats();
    println!(
        "warm: {} entries, {} with base, {} probes",
        stats.entries, stats.with_base, stats.probes
    );
}

pub fn status(engine: &MediaEngine) {
    println!("roots: {:?}", engine.roots.roots());
    println!("catalog: {} signals", engine.content.len());
    let stats = engine.registry.stats();
    println!(
        "registry: {} entries, {} with base, {} probes issued",
        stats.entries, stats.with_base, stats.probes
    );
}

pub fn run_audit(engine: &MediaEngine) {
    let report = audit::audit(&engine.content, engine.roots.roots());
    println!(
        "audit: {} media files under {:?}",
        report.files_seen,
        engine.roots.roots()
    );
    for id in &report.missing {
        println!("  missing: {}", id);
    }
    for id in &report.still_only {
        println!("  still-only: {}", id);
    }
    for f in &report.orphans {
        println!("  orphan: {}", f);
    }
    if report.missing.is_empty() && report.still_only.is_empty() && report.orphans.is_empty() {
        println!("  all good");
    }
}

/// Slot that narrates transitions to the terminal.
struct TermSlot;

impl MediaSlot for TermSlot {
    fn display_image(&mut self, url: &str) {
        println!("  slot: image {}", shorten(url));
    }
    fn display_video(&mut self, url: &str) {
        println!("  slot: video {} (playing)", shorten(url));
    }
    fn set_spinner(&mut self, on: bool) {
        println!("  slot: spinner {}", if on { "on" } else { "off" });
    }
    fn set_mirrored(&mut self, on: bool) {
        if on {
            println!("  slot: mirrored");
        }
    }
    fn set_width_cap(&mut self, px: u32) {
        println!("  slot: width capped to {}px", px);
    }
}

fn shorten(url: &str) -> &str {
    if url.starts_with("data:") {
        "<inline placeholder>"
    } else {
        url
    }
}

/// Drive the display state machine for one id against a terminal slot:
/// one prefer-base render, then `advances` advance renders.
pub fn show(engine: &Arc<MediaEngine>, id: &str, advances: usize, mirror: Option<bool>) {
    let Some(signal) = engine.content.get(id).cloned() else {
        eprintln!("show: unknown id {:?}", id);
        return;
    };
    engine.registry.ensure(
        id,
        &EnsureOpts {
            max: MAX_ALTERNATES,
            timeout: PROBE_TIMEOUT,
        },
    );

    let (loader, rx) = ThreadLoader::channel(PROBE_TIMEOUT);
    let mut driver = DisplayDriver::new(engine.clone(), Box::new(loader));
    let mut slot = TermSlot;

    for round in 0..=advances {
        let opts = RenderOpts {
            prefer_base: round == 0,
            advance_variant: round > 0,
            mirror,
            ..Default::default()
        };
        println!("render #{}", round + 1);
        driver.render(&mut slot, &signal, &opts);
        while matches!(
            driver.state(),
            SlotState::Loading { .. } | SlotState::FallbackRetry { .. } | SlotState::Erroring { .. }
        ) {
            match rx.recv_timeout(PROBE_TIMEOUT + Duration::from_secs(1)) {
                Ok(s) => driver.on_settlement(&mut slot, s),
                Err(_) => break,
            }
        }
        match driver.state() {
            SlotState::Displayed { url, .. } => println!("  displayed: {}", shorten(url)),
            SlotState::Placeholder => println!("  displayed: <inline placeholder>"),
            other => println!("  unsettled: {:?}", other),
        }
    }
}
