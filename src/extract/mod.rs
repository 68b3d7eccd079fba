//! Cover image extraction
//!
//! This module turns page markup into a single validated image URL:
//! - Parsing markup into a queryable [`Document`]
//! - Validating candidate URLs ([`is_valid_image_url`])
//! - Seven structural strategies behind the [`Strategy`] trait
//! - The ordered [`StrategyChain`] that picks the first valid hit

mod chain;
mod document;
mod strategies;
mod validator;

pub use chain::{ChainReport, StrategyChain};
pub use document::{Document, Element, ParseMode};
pub use strategies::{
    default_strategies, AltTextScan, DetailColumns, EmbeddedScriptData, GalleryContainer,
    LargeImageScan, MainContentArea, PrimaryImageBlock, Strategy, StrategyFault,
};
pub use validator::{encoded_dimensions, is_valid_image_url, PLACEHOLDER_MARKERS};

/// Terminal result of one resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    Found(String),
    NotFound,
}

impl ExtractionResult {
    pub fn image_url(&self) -> Option<&str> {
        match self {
            Self::Found(url) => Some(url),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// What a single strategy produced, before chain-level validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    Candidate(String),
    NoMatch,
}
