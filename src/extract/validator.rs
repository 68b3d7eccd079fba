//! Cover image URL validation
//!
//! A pure predicate over URL strings. The heuristics are tuned for Amazon
//! image hosts and are kept exactly as they are; a legitimate URL without a
//! recognized extension or marker is rejected on purpose.

use regex::Regex;
use std::sync::OnceLock;

/// Known non-content images (spinners, blank pixels), matched case-insensitively
pub const PLACEHOLDER_MARKERS: [&str; 9] = [
    "grey-pixel.gif",
    "transparent-pixel.gif",
    "loading-img",
    "no-img",
    "no-image",
    "placeholder",
    "spinner",
    "loading",
    "blank",
];

/// Recognized image file extensions, matched case-insensitively
pub const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// Fragments identifying the site's image hosts, matched case-sensitively
pub const IMAGE_HOST_FRAGMENTS: [&str; 2] = ["amazon", "images-na.ssl-images-amazon.com"];

/// Marker for dynamically served images that carry no extension
pub const DYNAMIC_IMAGE_MARKER: &str = "images-amazon";

/// Smallest accepted width or height encoded in the URL
pub const MIN_DIMENSION: u32 = 100;

fn width_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_SX(\d+)_").expect("width token regex is valid"))
}

fn height_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_SY(\d+)_").expect("height token regex is valid"))
}

/// Checks whether a candidate string is a plausible cover image URL
///
/// # Rules
///
/// 1. Empty strings and placeholder markers are rejected outright
/// 2. `_SX<w>_` / `_SY<h>_` tokens below 100px in either axis are rejected;
///    missing or unparsable tokens impose no constraint
/// 3. The URL must point at an image host and carry either an image
///    extension or the dynamic image marker
///
/// # Examples
///
/// ```
/// use bookcover_finder::extract::is_valid_image_url;
///
/// assert!(is_valid_image_url("https://m.media-amazon.com/images/I/abc.jpg"));
/// assert!(!is_valid_image_url("https://m.media-amazon.com/images/I/abc._SX80_SY80_.jpg"));
/// assert!(!is_valid_image_url("https://m.media-amazon.com/images/G/01/grey-pixel.gif"));
/// ```
pub fn is_valid_image_url(candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }

    let lower = candidate.to_lowercase();

    if let Some(marker) = PLACEHOLDER_MARKERS.iter().find(|m| lower.contains(*m)) {
        tracing::debug!(url = candidate, marker, "Filtered out placeholder image");
        return false;
    }

    if let Some((width, height)) = encoded_dimensions(candidate) {
        if width < MIN_DIMENSION || height < MIN_DIMENSION {
            tracing::debug!(url = candidate, width, height, "Filtered out small image");
            return false;
        }
    }

    let has_extension = IMAGE_EXTENSIONS.iter().any(|ext| lower.contains(ext));
    let is_image_host = IMAGE_HOST_FRAGMENTS.iter().any(|f| candidate.contains(f));

    is_image_host && (has_extension || candidate.contains(DYNAMIC_IMAGE_MARKER))
}

/// Width and height encoded as `_SX<w>_` and `_SY<h>_` tokens
///
/// Returns `None` when either token is missing or does not fit a `u32`.
pub fn encoded_dimensions(url: &str) -> Option<(u32, u32)> {
    if !(url.contains("SX") && url.contains("SY")) {
        return None;
    }

    let width = width_token().captures(url)?.get(1)?.as_str().parse().ok()?;
    let height = height_token().captures(url)?.get(1)?.as_str().parse().ok()?;
    Some((width, height))
}
