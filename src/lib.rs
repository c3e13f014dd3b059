//! tropedeck — media resolution and adaptive rendering for trope
//! hand-signal flashcards.
//!
//! A card's media face is resolved at runtime: the registry probes which
//! renditions (video, animated, still) actually exist for an id under the
//! session's asset roots, the selector picks which variant to show, and the
//! display driver keeps the slot showing something reasonable through slow
//! loads, format fallbacks and rapid re-renders.

pub mod audit;
pub mod cli;
pub mod content;
pub mod debug;
pub mod display;
pub mod engine;
pub mod media;
pub mod prefs;
pub mod probe;
pub mod registry;
pub mod roots;
pub mod select;
