//! Queryable document built from page markup
//!
//! Parsing never fails. A full document parse is attempted first; if the
//! parser faults, the markup is parsed as a fragment, and as a last resort
//! an empty document is returned.

use scraper::{ElementRef, Html, Selector};
use std::panic::{self, AssertUnwindSafe};

/// How a `Document` was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Full HTML document parse
    Strict,
    /// Fragment parse after the strict parse faulted
    Lenient,
    /// Both parses faulted; the document is empty
    Empty,
}

/// Parsed HTML document
pub struct Document {
    html: Html,
    mode: ParseMode,
}

impl Document {
    /// Parses markup into a document
    ///
    /// # Arguments
    ///
    /// * `markup` - Raw HTML, possibly malformed
    ///
    /// # Example
    ///
    /// ```
    /// use bookcover_finder::extract::Document;
    ///
    /// let doc = Document::parse(r#"<div id="a"><img src="x.jpg"></div>"#);
    /// let img = doc.select_one("#a img").unwrap();
    /// assert_eq!(img.attr("src"), Some("x.jpg"));
    /// ```
    pub fn parse(markup: &str) -> Self {
        match guarded(|| Html::parse_document(markup)) {
            Some(html) => {
                if !html.errors.is_empty() {
                    tracing::debug!(
                        errors = html.errors.len(),
                        "Markup parsed with recoverable errors"
                    );
                }
                Self {
                    html,
                    mode: ParseMode::Strict,
                }
            }
            None => {
                tracing::warn!("Document parse failed, falling back to fragment parse");
                match guarded(|| Html::parse_fragment(markup)) {
                    Some(html) => Self {
                        html,
                        mode: ParseMode::Lenient,
                    },
                    None => Self {
                        html: Html::new_document(),
                        mode: ParseMode::Empty,
                    },
                }
            }
        }
    }

    /// Which parser produced this document
    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Whether the markup needed error recovery or a fallback parse
    pub fn is_degraded(&self) -> bool {
        self.mode != ParseMode::Strict || !self.html.errors.is_empty()
    }

    /// First element matching a CSS selector, in document order
    ///
    /// An invalid selector matches nothing.
    pub fn select_one(&self, css: &str) -> Option<Element<'_>> {
        let selector = Selector::parse(css).ok()?;
        self.html.select(&selector).next().map(Element)
    }

    /// All elements matching a CSS selector, in document order
    pub fn select_all(&self, css: &str) -> Vec<Element<'_>> {
        match Selector::parse(css) {
            Ok(selector) => self.html.select(&selector).map(Element).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Runs a parse, turning a panic inside the parser into `None`
fn guarded<F>(parse: F) -> Option<Html>
where
    F: FnOnce() -> Html,
{
    panic::catch_unwind(AssertUnwindSafe(parse)).ok()
}

/// Element handle borrowed from a `Document`
#[derive(Debug, Clone, Copy)]
pub struct Element<'a>(ElementRef<'a>);

impl<'a> Element<'a> {
    /// Lowercase tag name
    pub fn tag_name(&self) -> &'a str {
        self.0.value().name()
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.0.value().attr(name).is_some()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text(&self) -> String {
        self.0.text().collect()
    }
}
