//! Asset audit: walk the asset roots and cross-check them against the
//! catalog. Convenience for content maintainers; the runtime engine never
//! needs this (it probes by convention instead of scanning).

use std::collections::HashMap;
use std::path::Path;

use walkdir::WalkDir;

use crate::content::SignalSet;
use crate::media::{self, MediaKind};

#[derive(Debug, Default)]
pub struct AuditReport {
    pub files_seen: usize,
    /// Catalog ids with no media file under any root.
    pub missing: Vec<String>,
    /// Catalog ids whose only renditions are still images (no video, no
    /// animated take).
    pub still_only: Vec<String>,
    /// Files whose stem matches no catalog id.
    pub orphans: Vec<String>,
}

/// Stem of an asset file name, with a numbered-take suffix stripped:
/// `tevir-2.gif` and `tevir.gif` both map to `tevir`.
fn id_of_file(name: &str) -> Option<(String, String)> {
    let (stem, ext) = name.rsplit_once('.')?;
    let ext = ext.to_lowercase();
    if !media::is_media_ext(&ext) {
        return None;
    }
    let id = match stem.rsplit_once('-') {
        Some((head, tail)) if tail.chars().all(|c| c.is_ascii_digit()) && !tail.is_empty() => head,
        _ => stem,
    };
    Some((id.to_string(), ext))
}

pub fn audit(content: &SignalSet, roots: &[String]) -> AuditReport {
    let mut report = AuditReport::default();
    // id -> saw any motion rendition (video or gif)
    let mut seen: HashMap<String, bool> = HashMap::new();

    // Declared URLs may use names outside the `{id}-{n}` convention; map
    // them back to their id so they do not show up as orphans.
    let mut declared: HashMap<String, String> = HashMap::new();
    for signal in content.all() {
        for url in signal.media.iter().chain(signal.media_variants.iter()) {
            declared.insert(url.clone(), signal.id.clone());
        }
    }

    for root in roots {
        for entry in WalkDir::new(Path::new(root))
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some((stem_id, ext)) = id_of_file(&name) else {
                continue;
            };
            report.files_seen += 1;
            let url = format!("{}/{}", root.trim_end_matches('/'), name);
            let id = match declared.get(&url) {
                Some(id) => id.clone(),
                None if content.get(&stem_id).is_some() => stem_id,
                None => {
                    report.orphans.push(url);
                    continue;
                }
            };
            let motion = ext == "gif" || media::kind_of(&name) == MediaKind::Video;
            let flag = seen.entry(id).or_insert(false);
            *flag = *flag || motion;
        }
    }

    for signal in content.all() {
        match seen.get(&signal.id) {
            None => report.missing.push(signal.id.clone()),
            Some(false) => report.still_only.push(signal.id.clone()),
            Some(true) => {}
        }
    }
    report.orphans.sort();
    report
}
