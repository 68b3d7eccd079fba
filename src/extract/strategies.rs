//! Cover image extraction strategies
//!
//! Each strategy looks for the cover through one structural signal of the
//! product page. Strategies are independent of each other: they read the
//! document and nothing else. Malformed embedded data surfaces as a
//! `StrategyFault` from `find` and is turned into `NoMatch` by `evaluate`.

use crate::extract::document::{Document, Element};
use crate::extract::validator::is_valid_image_url;
use crate::extract::StrategyOutcome;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

/// Attribute holding a JSON object of `{image_url: [width, height]}`
pub const DYNAMIC_IMAGE_ATTR: &str = "data-a-dynamic-image";

/// Attribute holding the high resolution variant of a gallery image
pub const HIRES_ATTR: &str = "data-old-hires";

const PRIMARY_IMAGE_SELECTOR: &str = "#imgBlkFront, #ebooksImgBlkFront";
const INLINE_SCRIPT_SELECTOR: &str = r#"script[type="text/javascript"]"#;
const GALLERY_SELECTOR: &str =
    "#imageBlock_feature_div img, #main-image-container img, #imgTagWrapperId img";
const MAIN_CONTENT_SELECTOR: &str = "#landingImage, #imgBlkFront, #main-image, #img-canvas img";
const DETAIL_COLUMN_SELECTOR: &str =
    ".a-fixed-left-grid-col img, .a-fixed-right-grid-col img, .dp-title-col img";

const GALLERY_DATA_MARKER: &str = "imageGalleryData";
const BLOCK_DATA_MARKER: &str = "ImageBlockATF";

/// Alt-text keywords that suggest a cover image
pub const ALT_KEYWORDS: [&str; 3] = ["book", "cover", "product"];

/// Smallest `width`/`height` attribute accepted by the large-image scan
pub const LARGE_IMAGE_MIN: i64 = 200;

/// Fault inside a single strategy; never escapes the chain
#[derive(Debug, Error)]
pub enum StrategyFault {
    #[error("Malformed JSON in {origin}: {source}")]
    MalformedJson {
        origin: &'static str,
        source: serde_json::Error,
    },

    #[error("Unexpected JSON shape in {origin}: expected {expected}")]
    UnexpectedShape {
        origin: &'static str,
        expected: &'static str,
    },
}

/// One structural heuristic for locating the cover image
pub trait Strategy: Send + Sync {
    /// Short identifier used in logs and timing reports
    fn name(&self) -> &'static str;

    /// Looks for a candidate URL
    ///
    /// # Returns
    ///
    /// * `Ok(Some(url))` - A candidate was found
    /// * `Ok(None)` - The signal this strategy looks for is absent
    /// * `Err(StrategyFault)` - Embedded data was malformed
    fn find(&self, doc: &Document) -> Result<Option<String>, StrategyFault>;

    /// Runs `find`, converting faults into `NoMatch`
    fn evaluate(&self, doc: &Document) -> StrategyOutcome {
        match self.find(doc) {
            Ok(Some(url)) => StrategyOutcome::Candidate(url),
            Ok(None) => StrategyOutcome::NoMatch,
            Err(fault) => {
                tracing::debug!(strategy = self.name(), error = %fault, "Strategy fault");
                StrategyOutcome::NoMatch
            }
        }
    }
}

/// The seven strategies, from most to least structurally specific
pub fn default_strategies() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(PrimaryImageBlock),
        Box::new(EmbeddedScriptData),
        Box::new(GalleryContainer),
        Box::new(MainContentArea),
        Box::new(DetailColumns),
        Box::new(AltTextScan),
        Box::new(LargeImageScan),
    ]
}

fn gallery_data_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)var data = (\{.*?\});").expect("gallery data regex is valid"))
}

fn script_image_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"https://[^"\s]+\.(?:jpg|jpeg|png|gif)"#).expect("script image regex is valid")
    })
}

/// First valid key of a dynamic-image JSON object, in encoded order
fn first_valid_dynamic_key(
    raw: &str,
    origin: &'static str,
) -> Result<Option<String>, StrategyFault> {
    let data: Value = serde_json::from_str(raw)
        .map_err(|source| StrategyFault::MalformedJson { origin, source })?;

    let images = data.as_object().ok_or(StrategyFault::UnexpectedShape {
        origin,
        expected: "object keyed by image URL",
    })?;

    Ok(images.keys().find(|url| is_valid_image_url(url)).cloned())
}

/// `src` of an element when it validates
fn valid_src(element: &Element<'_>) -> Option<String> {
    element
        .attr("src")
        .filter(|src| is_valid_image_url(src))
        .map(str::to_string)
}

/// 1. The canonical front image and its dynamic-image attribute
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryImageBlock;

impl Strategy for PrimaryImageBlock {
    fn name(&self) -> &'static str {
        "primary_image_block"
    }

    fn find(&self, doc: &Document) -> Result<Option<String>, StrategyFault> {
        let Some(raw) = doc
            .select_one(PRIMARY_IMAGE_SELECTOR)
            .and_then(|img| img.attr(DYNAMIC_IMAGE_ATTR))
        else {
            return Ok(None);
        };

        first_valid_dynamic_key(raw, DYNAMIC_IMAGE_ATTR)
    }
}

/// 2. Image data embedded in inline scripts
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedScriptData;

impl EmbeddedScriptData {
    /// `imageGalleryData[*].mainUrl` from every `var data = {...};` payload
    fn from_gallery_data(script: &str) -> Option<String> {
        for capture in gallery_data_pattern().captures_iter(script) {
            let Some(payload) = capture.get(1) else {
                continue;
            };

            let data: Value = match serde_json::from_str(payload.as_str()) {
                Ok(data) => data,
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping malformed gallery payload");
                    continue;
                }
            };

            let Some(items) = data.get(GALLERY_DATA_MARKER).and_then(Value::as_array) else {
                continue;
            };

            let found = items
                .iter()
                .filter_map(|item| item.get("mainUrl").and_then(Value::as_str))
                .find(|url| is_valid_image_url(url));

            if let Some(url) = found {
                return Some(url.to_string());
            }
        }

        None
    }

    /// Raw image URLs appearing anywhere in the script
    fn from_block_data(script: &str) -> Option<String> {
        script_image_pattern()
            .find_iter(script)
            .map(|m| m.as_str())
            .find(|url| is_valid_image_url(url))
            .map(str::to_string)
    }
}

impl Strategy for EmbeddedScriptData {
    fn name(&self) -> &'static str {
        "embedded_script_data"
    }

    fn find(&self, doc: &Document) -> Result<Option<String>, StrategyFault> {
        for script in doc.select_all(INLINE_SCRIPT_SELECTOR) {
            let text = script.text();
            if text.is_empty() {
                continue;
            }

            if text.contains(GALLERY_DATA_MARKER) {
                if let Some(url) = Self::from_gallery_data(&text) {
                    return Ok(Some(url));
                }
            }

            if text.contains(BLOCK_DATA_MARKER) {
                if let Some(url) = Self::from_block_data(&text) {
                    return Ok(Some(url));
                }
            }
        }

        Ok(None)
    }
}

/// 3. First image of the gallery container, falling back to its hi-res variant
#[derive(Debug, Clone, Copy, Default)]
pub struct GalleryContainer;

impl Strategy for GalleryContainer {
    fn name(&self) -> &'static str {
        "gallery_container"
    }

    fn find(&self, doc: &Document) -> Result<Option<String>, StrategyFault> {
        let Some(img) = doc.select_one(GALLERY_SELECTOR) else {
            return Ok(None);
        };

        if !img.has_attr("src") {
            return Ok(None);
        }

        Ok(valid_src(&img).or_else(|| {
            img.attr(HIRES_ATTR)
                .filter(|hires| is_valid_image_url(hires))
                .map(str::to_string)
        }))
    }
}

/// 4. Main content image, falling back to its dynamic-image attribute
#[derive(Debug, Clone, Copy, Default)]
pub struct MainContentArea;

impl Strategy for MainContentArea {
    fn name(&self) -> &'static str {
        "main_content_area"
    }

    fn find(&self, doc: &Document) -> Result<Option<String>, StrategyFault> {
        let Some(img) = doc.select_one(MAIN_CONTENT_SELECTOR) else {
            return Ok(None);
        };

        if !img.has_attr("src") {
            return Ok(None);
        }

        if let Some(src) = valid_src(&img) {
            return Ok(Some(src));
        }

        match img.attr(DYNAMIC_IMAGE_ATTR) {
            Some(raw) => first_valid_dynamic_key(raw, DYNAMIC_IMAGE_ATTR),
            None => Ok(None),
        }
    }
}

/// 5. Image inside the book-details grid columns
#[derive(Debug, Clone, Copy, Default)]
pub struct DetailColumns;

impl Strategy for DetailColumns {
    fn name(&self) -> &'static str {
        "detail_columns"
    }

    fn find(&self, doc: &Document) -> Result<Option<String>, StrategyFault> {
        Ok(doc
            .select_one(DETAIL_COLUMN_SELECTOR)
            .and_then(|img| valid_src(&img)))
    }
}

/// 6. First image whose alt text mentions a book, cover or product
#[derive(Debug, Clone, Copy, Default)]
pub struct AltTextScan;

impl Strategy for AltTextScan {
    fn name(&self) -> &'static str {
        "alt_text_scan"
    }

    fn find(&self, doc: &Document) -> Result<Option<String>, StrategyFault> {
        Ok(doc.select_all("img[src]").iter().find_map(|img| {
            let alt = img.attr("alt").unwrap_or_default().to_lowercase();
            if ALT_KEYWORDS.iter().any(|keyword| alt.contains(keyword)) {
                valid_src(img)
            } else {
                None
            }
        }))
    }
}

/// 7. First image declared at least 200x200 through its attributes
#[derive(Debug, Clone, Copy, Default)]
pub struct LargeImageScan;

impl LargeImageScan {
    fn dimension(img: &Element<'_>, name: &str) -> Option<i64> {
        img.attr(name)?.trim().parse().ok()
    }
}

impl Strategy for LargeImageScan {
    fn name(&self) -> &'static str {
        "large_image_scan"
    }

    fn find(&self, doc: &Document) -> Result<Option<String>, StrategyFault> {
        Ok(doc
            .select_all("img[src][width][height]")
            .iter()
            .find_map(|img| {
                let width = Self::dimension(img, "width")?;
                let height = Self::dimension(img, "height")?;
                if width >= LARGE_IMAGE_MIN && height >= LARGE_IMAGE_MIN {
                    valid_src(img)
                } else {
                    None
                }
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COVER: &str = "https://m.media-amazon.com/images/I/abc._SX300_SY400_.jpg";
    const OTHER: &str = "https://m.media-amazon.com/images/I/xyz.jpg";
    const PIXEL: &str = "https://m.media-amazon.com/images/G/01/grey-pixel.gif";

    fn outcome(strategy: &dyn Strategy, html: &str) -> StrategyOutcome {
        strategy.evaluate(&Document::parse(html))
    }

    fn candidate(url: &str) -> StrategyOutcome {
        StrategyOutcome::Candidate(url.to_string())
    }

    #[test]
    fn test_default_strategy_order() {
        let names: Vec<_> = default_strategies().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "primary_image_block",
                "embedded_script_data",
                "gallery_container",
                "main_content_area",
                "detail_columns",
                "alt_text_scan",
                "large_image_scan",
            ]
        );
    }

    #[test]
    fn test_primary_block_reads_dynamic_image() {
        let html = format!(
            r#"<img id="imgBlkFront" data-a-dynamic-image='{{"{}":[300,400]}}'>"#,
            COVER
        );
        assert_eq!(outcome(&PrimaryImageBlock, &html), candidate(COVER));
    }

    #[test]
    fn test_primary_block_keeps_encoded_key_order() {
        let html = format!(
            r#"<img id="ebooksImgBlkFront" data-a-dynamic-image='{{"{}":[1,1],"{}":[2,2],"{}":[3,3]}}'>"#,
            PIXEL, OTHER, COVER
        );
        assert_eq!(outcome(&PrimaryImageBlock, &html), candidate(OTHER));
    }

    #[test]
    fn test_primary_block_bad_json_is_no_match() {
        let html = r#"<img id="imgBlkFront" data-a-dynamic-image='{not json'>"#;
        assert!(PrimaryImageBlock.find(&Document::parse(html)).is_err());
        assert_eq!(outcome(&PrimaryImageBlock, html), StrategyOutcome::NoMatch);
    }

    #[test]
    fn test_primary_block_array_json_is_no_match() {
        let html = format!(
            r#"<img id="imgBlkFront" data-a-dynamic-image='["{}"]'>"#,
            COVER
        );
        assert!(matches!(
            PrimaryImageBlock.find(&Document::parse(&html)),
            Err(StrategyFault::UnexpectedShape { .. })
        ));
    }

    #[test]
    fn test_primary_block_without_attribute() {
        let html = format!(r#"<img id="imgBlkFront" src="{}">"#, COVER);
        assert_eq!(outcome(&PrimaryImageBlock, &html), StrategyOutcome::NoMatch);
    }

    #[test]
    fn test_script_gallery_data() {
        let html = format!(
            r#"<script type="text/javascript">
            P.when('A').execute(function(A) {{
                var data = {{"imageGalleryData": [{{"mainUrl": "{}"}}, {{"mainUrl": "{}"}}]}};
                A.trigger('imageGalleryData', data);
            }});
            </script>"#,
            PIXEL, COVER
        );
        assert_eq!(outcome(&EmbeddedScriptData, &html), candidate(COVER));
    }

    #[test]
    fn test_script_gallery_data_skips_bad_payload() {
        let html = format!(
            r#"<script type="text/javascript">
            var data = {{imageGalleryData: broken}};
            var data = {{"imageGalleryData": [{{"mainUrl": "{}"}}]}};
            </script>"#,
            COVER
        );
        assert_eq!(outcome(&EmbeddedScriptData, &html), candidate(COVER));
    }

    #[test]
    fn test_script_block_data() {
        let html = format!(
            r#"<script type="text/javascript">
            P.register('ImageBlockATF', function() {{
                return {{"colorImages": {{"initial": [{{"thumb": "{}", "large": "{}"}}]}}}};
            }});
            </script>"#,
            PIXEL, OTHER
        );
        assert_eq!(outcome(&EmbeddedScriptData, &html), candidate(OTHER));
    }

    #[test]
    fn test_script_without_type_is_ignored() {
        let html = format!(
            r#"<script>P.register('ImageBlockATF', "{}");</script>"#,
            OTHER
        );
        assert_eq!(outcome(&EmbeddedScriptData, &html), StrategyOutcome::NoMatch);
    }

    #[test]
    fn test_gallery_container_src() {
        let html = format!(
            r#"<div id="imageBlock_feature_div"><img src="{}"></div>"#,
            OTHER
        );
        assert_eq!(outcome(&GalleryContainer, &html), candidate(OTHER));
    }

    #[test]
    fn test_gallery_container_falls_back_to_hires() {
        let html = format!(
            r#"<div id="imgTagWrapperId"><img src="{}" data-old-hires="{}"></div>"#,
            PIXEL, COVER
        );
        assert_eq!(outcome(&GalleryContainer, &html), candidate(COVER));
    }

    #[test]
    fn test_gallery_container_requires_src() {
        let html = format!(
            r#"<div id="main-image-container"><img data-old-hires="{}"></div>"#,
            COVER
        );
        assert_eq!(outcome(&GalleryContainer, &html), StrategyOutcome::NoMatch);
    }

    #[test]
    fn test_main_content_src() {
        let html = format!(r#"<img id="landingImage" src="{}">"#, OTHER);
        assert_eq!(outcome(&MainContentArea, &html), candidate(OTHER));
    }

    #[test]
    fn test_main_content_falls_back_to_dynamic_image() {
        let html = format!(
            r#"<div id="img-canvas"><img src="{}" data-a-dynamic-image='{{"{}":[500,750]}}'></div>"#,
            PIXEL, COVER
        );
        assert_eq!(outcome(&MainContentArea, &html), candidate(COVER));
    }

    #[test]
    fn test_main_content_bad_dynamic_json_is_no_match() {
        let html = format!(
            r#"<img id="main-image" src="{}" data-a-dynamic-image="[[[">"#,
            PIXEL
        );
        assert_eq!(outcome(&MainContentArea, &html), StrategyOutcome::NoMatch);
    }

    #[test]
    fn test_detail_columns() {
        let html = format!(
            r#"<div class="a-fixed-left-grid-col"><img src="{}"></div>"#,
            OTHER
        );
        assert_eq!(outcome(&DetailColumns, &html), candidate(OTHER));
    }

    #[test]
    fn test_detail_columns_only_checks_first_image() {
        let html = format!(
            r#"<div class="dp-title-col"><img src="{}"><img src="{}"></div>"#,
            PIXEL, OTHER
        );
        assert_eq!(outcome(&DetailColumns, &html), StrategyOutcome::NoMatch);
    }

    #[test]
    fn test_alt_text_scan() {
        let html = format!(
            r#"<img src="{}" alt="Company logo">
               <img src="{}" alt="Book Cover">
               <img src="{}" alt="product photo">"#,
            OTHER, COVER, OTHER
        );
        assert_eq!(outcome(&AltTextScan, &html), candidate(COVER));
    }

    #[test]
    fn test_alt_text_scan_skips_invalid_src() {
        let html = format!(
            r#"<img src="{}" alt="book"><img src="{}" alt="cover">"#,
            PIXEL, OTHER
        );
        assert_eq!(outcome(&AltTextScan, &html), candidate(OTHER));
    }

    #[test]
    fn test_large_image_scan() {
        let html = format!(
            r#"<img src="{}" width="100" height="400">
               <img src="{}" width="wide" height="300">
               <img src="{}" width=" 250 " height="300">"#,
            OTHER, OTHER, COVER
        );
        assert_eq!(outcome(&LargeImageScan, &html), candidate(COVER));
    }

    #[test]
    fn test_large_image_scan_requires_both_attributes() {
        let html = format!(r#"<img src="{}" width="500">"#, COVER);
        assert_eq!(outcome(&LargeImageScan, &html), StrategyOutcome::NoMatch);
    }

    #[test]
    fn test_every_strategy_handles_empty_document() {
        let doc = Document::parse("");
        for strategy in default_strategies() {
            assert_eq!(strategy.evaluate(&doc), StrategyOutcome::NoMatch);
        }
    }
}
