//! Ordered strategy dispatch
//!
//! The chain evaluates strategies in a fixed order and stops at the first
//! candidate that passes validation. Lower positions always win.

use crate::extract::document::Document;
use crate::extract::strategies::{default_strategies, Strategy};
use crate::extract::validator::is_valid_image_url;
use crate::extract::{ExtractionResult, StrategyOutcome};
use std::time::{Duration, Instant};

/// Outcome of running the chain over one document
#[derive(Debug, Clone, PartialEq)]
pub struct ChainReport {
    pub result: ExtractionResult,
    /// Name of the strategy that produced the result
    pub matched: Option<&'static str>,
    /// Per-strategy durations, in evaluation order (empty unless timed)
    pub timings: Vec<(&'static str, Duration)>,
}

/// Fixed-order list of extraction strategies
pub struct StrategyChain {
    strategies: Vec<Box<dyn Strategy>>,
}

impl Default for StrategyChain {
    fn default() -> Self {
        Self::new(default_strategies())
    }
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    /// Strategy names in evaluation order
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Returns the first validated candidate, or `NotFound`
    pub fn extract(&self, doc: &Document) -> ExtractionResult {
        self.run(doc, false).result
    }

    /// Runs the chain, optionally timing each evaluated strategy
    ///
    /// # Arguments
    ///
    /// * `doc` - The parsed page
    /// * `timed` - Record the wall-clock duration of every strategy evaluated
    pub fn run(&self, doc: &Document, timed: bool) -> ChainReport {
        let mut timings = Vec::new();

        for strategy in &self.strategies {
            let started = Instant::now();
            let outcome = strategy.evaluate(doc);
            if timed {
                timings.push((strategy.name(), started.elapsed()));
            }

            match outcome {
                StrategyOutcome::Candidate(url) if is_valid_image_url(&url) => {
                    tracing::debug!(strategy = strategy.name(), url = %url, "Strategy matched");
                    return ChainReport {
                        result: ExtractionResult::Found(url),
                        matched: Some(strategy.name()),
                        timings,
                    };
                }
                StrategyOutcome::Candidate(url) => {
                    tracing::debug!(strategy = strategy.name(), url = %url, "Candidate failed validation");
                }
                StrategyOutcome::NoMatch => {
                    tracing::trace!(strategy = strategy.name(), "No match");
                }
            }
        }

        ChainReport {
            result: ExtractionResult::NotFound,
            matched: None,
            timings,
        }
    }
}
