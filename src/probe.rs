//! Candidate-URL probing: does this media file exist and load?
//!
//! A probe is a pure existence check — it never mutates registry state and
//! it always answers within its timeout. Timeout counts as "absent": a slow
//! but real asset may be reported missing, in exchange for bounded latency.

use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::debug::dbg_log;
use crate::media::MediaKind;

/// Default per-probe budget.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(3000);

pub trait Prober: Send + Sync {
    /// `true` iff the URL exists and is loadable as the given kind.
    /// Must return within roughly `timeout` and must not panic.
    fn probe(&self, url: &str, kind: MediaKind, timeout: Duration) -> bool;
}

/// Probes assets on the local filesystem (URLs are relative paths by the
/// `{root}/{id}.{ext}` convention).
pub struct FsProber;

impl Prober for FsProber {
    fn probe(&self, url: &str, kind: MediaKind, timeout: Duration) -> bool {
        let (ok, _width) = load_media(url, kind, timeout);
        dbg_log!("probe {} -> {}", url, ok);
        ok
    }
}

/// Load check shared by the prober and the display loader.
///
/// Image kind: a real decode (matching the browser probe, which decodes),
/// reporting the natural width on success. Video kind: the file must open
/// and yield header bytes; no decode, no width.
///
/// The work runs on a helper thread joined with `recv_timeout`, so a stuck
/// filesystem or a pathological file cannot block the caller past the
/// timeout. A timed-out helper finishes in the background and its result is
/// dropped.
pub fn load_media(url: &str, kind: MediaKind, timeout: Duration) -> (bool, Option<u32>) {
    // Inline placeholders are always renderable; nothing to fetch.
    if url.starts_with("data:") {
        return (true, None);
    }

    let (tx, rx) = mpsc::channel();
    let path = url.to_string();
    thread::spawn(move || {
        let result = match kind {
            MediaKind::Image => match image::open(Path::new(&path)) {
                Ok(img) => (true, Some(image_width(&img))),
                Err(_) => (false, None),
            },
            MediaKind::Video => (video_header_ok(Path::new(&path)), None),
        };
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => (false, None),
    }
}

fn image_width(img: &image::DynamicImage) -> u32 {
    use image::GenericImageView;
    img.dimensions().0
}

/// A video "response" is successful if the file opens and has content.
fn video_header_ok(path: &Path) -> bool {
    use std::io::Read;
    let Ok(mut f) = std::fs::File::open(path) else {
        return false;
    };
    let mut header = [0u8; 16];
    matches!(f.read(&mut header), Ok(n) if n > 0)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Probers for tests: scripted outcomes plus call accounting.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers from a fixed url -> bool table (absent urls probe false),
    /// counting every call and tracking the maximum number of probes in
    /// flight at once.
    pub struct ScriptedProber {
        table: HashMap<String, bool>,
        pub calls: AtomicUsize,
        pub log: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
        pub delay: Option<Duration>,
    }

    impl ScriptedProber {
        pub fn new(present: &[&str]) -> Self {
            ScriptedProber {
                table: present.iter().map(|u| (u.to_string(), true)).collect(),
                calls: AtomicUsize::new(0),
                log: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                delay: None,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn probed(&self, url: &str) -> bool {
            self.log.lock().unwrap().iter().any(|u| u == url)
        }
    }

    impl Prober for ScriptedProber {
        fn probe(&self, url: &str, _kind: MediaKind, _timeout: Duration) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(url.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(d) = self.delay {
                thread::sleep(d);
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.table.get(url).copied().unwrap_or(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn image_probe_decodes_real_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ok.png");
        image::RgbaImage::new(4, 2).save(&path).unwrap();

        let (ok, width) = load_media(path.to_str().unwrap(), MediaKind::Image, PROBE_TIMEOUT);
        assert!(ok);
        assert_eq!(width, Some(4));
    }

    #[test]
    fn image_probe_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.png");
        std::fs::write(&path, b"not an image").unwrap();

        let (ok, _) = load_media(path.to_str().unwrap(), MediaKind::Image, PROBE_TIMEOUT);
        assert!(!ok);
    }

    #[test]
    fn missing_file_probes_false() {
        let (ok, _) = load_media("./nope/missing.gif", MediaKind::Image, PROBE_TIMEOUT);
        assert!(!ok);
        let (ok, _) = load_media("./nope/missing.mp4", MediaKind::Video, PROBE_TIMEOUT);
        assert!(!ok);
    }

    #[test]
    fn video_probe_reads_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"\x00\x00\x00\x18ftypmp42").unwrap();
        let (ok, width) = load_media(path.to_str().unwrap(), MediaKind::Video, PROBE_TIMEOUT);
        assert!(ok);
        assert_eq!(width, None);

        // empty file is not a successful response
        let empty = dir.path().join("empty.mp4");
        std::fs::write(&empty, b"").unwrap();
        let (ok, _) = load_media(empty.to_str().unwrap(), MediaKind::Video, PROBE_TIMEOUT);
        assert!(!ok);
    }

    #[test]
    fn data_url_always_loads() {
        let (ok, _) = load_media("data:image/svg+xml,<svg/>", MediaKind::Image, PROBE_TIMEOUT);
        assert!(ok);
    }
}
