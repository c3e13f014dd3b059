//! Media kinds and the asset URL convention.
//!
//! Variants live under an asset root as `{root}/{id}.{ext}` (base) and
//! `{root}/{id}-{n}.{ext}` (numbered alternate takes). The kind of a URL is
//! inferred from its extension and decides both the probing technique and
//! the display technique.

/// Extensions rendered through the video path.
pub const VIDEO_EXTS: &[&str] = &["mp4", "webm", "m4v", "mov"];

/// Extensions rendered through the image path (still or animated).
pub const IMAGE_EXTS: &[&str] = &["gif", "png", "jpg", "jpeg", "webp", "bmp", "svg"];

/// Probe order for the base file within one root: video first, then
/// animated, then still. First hit wins.
pub const BASE_EXT_ORDER: &[&str] = &["mp4", "gif", "png"];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MediaKind {
    Video,
    Image,
}

pub fn ext_of(url: &str) -> String {
    url.rsplit('.').next().unwrap_or("").to_lowercase()
}

/// Kind of a candidate URL. Anything that is not a known video extension
/// is treated as image-kind, including inline `data:` URLs.
pub fn kind_of(url: &str) -> MediaKind {
    if url.starts_with("data:") {
        return MediaKind::Image;
    }
    if VIDEO_EXTS.contains(&ext_of(url).as_str()) {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

pub fn is_media_ext(ext: &str) -> bool {
    VIDEO_EXTS.contains(&ext) || IMAGE_EXTS.contains(&ext)
}

/// `{root}/{id}.{ext}`
pub fn base_url(root: &str, id: &str, ext: &str) -> String {
    format!("{}/{}.{}", root.trim_end_matches('/'), id, ext)
}

/// `{root}/{id}-{n}.{ext}`
pub fn numbered_url(root: &str, id: &str, n: usize, ext: &str) -> String {
    format!("{}/{}-{}.{}", root.trim_end_matches('/'), id, n, ext)
}

/// Whether a URL lives directly under the given root.
pub fn in_root(url: &str, root: &str) -> bool {
    let root = root.trim_end_matches('/');
    match url.strip_prefix(root) {
        Some(rest) => rest.starts_with('/') && !rest[1..].contains('/'),
        None => false,
    }
}

/// File stem of a base URL for `id` in `root`, if it is one (`{id}.{ext}`).
/// Used by prefer-base matching: the root does not matter, only the name.
pub fn is_base_of(url: &str, id: &str) -> bool {
    let name = url.rsplit('/').next().unwrap_or(url);
    match name.rsplit_once('.') {
        Some((stem, ext)) => stem == id && is_media_ext(&ext.to_lowercase()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(kind_of("./assets/signals/tevir.mp4"), MediaKind::Video);
        assert_eq!(kind_of("./assets/signals/tevir.gif"), MediaKind::Image);
        assert_eq!(kind_of("./assets/signals/tevir.png"), MediaKind::Image);
        assert_eq!(kind_of("./assets/signals/TEVIR.MP4"), MediaKind::Video);
        assert_eq!(kind_of("data:image/svg+xml,<svg/>"), MediaKind::Image);
        assert_eq!(kind_of("no-extension"), MediaKind::Image);
    }

    #[test]
    fn url_construction() {
        assert_eq!(base_url("./assets/signals", "tevir", "gif"), "./assets/signals/tevir.gif");
        assert_eq!(base_url("./assets/signals/", "tevir", "mp4"), "./assets/signals/tevir.mp4");
        assert_eq!(
            numbered_url("./assets/signals", "tevir", 2, "png"),
            "./assets/signals/tevir-2.png"
        );
    }

    #[test]
    fn root_membership() {
        assert!(in_root("./assets/signals/tevir.gif", "./assets/signals"));
        assert!(in_root("./assets/signals/tevir.gif", "./assets/signals/"));
        assert!(!in_root("./assets/signals_opt/tevir.gif", "./assets/signals"));
        assert!(!in_root("./assets/signals/sub/tevir.gif", "./assets/signals"));
        assert!(!in_root("./elsewhere/tevir.gif", "./assets/signals"));
    }

    #[test]
    fn base_name_matching() {
        assert!(is_base_of("./assets/signals/tevir.gif", "tevir"));
        assert!(is_base_of("./assets/signals_opt/tevir.mp4", "tevir"));
        assert!(!is_base_of("./assets/signals/tevir-1.gif", "tevir"));
        assert!(!is_base_of("./assets/signals/zarqa.gif", "tevir"));
        assert!(!is_base_of("./assets/signals/tevir.txt", "tevir"));
    }
}
