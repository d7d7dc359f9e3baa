//! PPM context model.
//!
//! A [`Model`] couples a [`ModelConfig`] with the [`ContextTree`] of counts
//! gathered so far. It outlives individual streams: the same model can code
//! several streams one after another, and it can be saved and reloaded with
//! bit-identical predictions.
//!
//! ## Layout
//!
//! | Module | Role |
//! |--------|------|
//! | `tree` | Arena of context nodes, count updates, rescaling |
//! | `exclusion` | Symbols ruled out during one coding step |
//! | `predictor` | Escape/exclusion walk, encode and decode |
//! | `persist` | Binary save/load |

mod exclusion;
mod persist;
mod predictor;
mod tree;

#[cfg(test)]
mod tests;

use std::fmt;

use crate::config::ModelConfig;

pub use exclusion::ExclusionSet;
pub use predictor::Predictor;
pub use tree::{Context, ContextNode, ContextTree, NodeId, SymbolCount, RESCALE_THRESHOLD};

/// Title given to models that were not named explicitly.
pub const DEFAULT_TITLE: &str = "Sample PPMD model";

/// One coded event: a user symbol, or the end-of-stream sentinel.
///
/// The sentinel is its own case rather than a reserved number, so it never
/// collides with the alphabet whatever size that is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Symbol(u32),
    EndOfStream,
}

/// Configuration plus accumulated statistics.
#[derive(Debug, Clone)]
pub struct Model {
    title: String,
    pub(crate) config: ModelConfig,
    pub(crate) tree: ContextTree,
}

impl Model {
    /// Fresh model with no counts.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            config,
            tree: ContextTree::new(config.max_order()),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn tree(&self) -> &ContextTree {
        &self.tree
    }

    /// Forget all statistics, keeping title and configuration.
    pub fn reset(&mut self) {
        self.tree = ContextTree::new(self.config.max_order());
    }
}

impl fmt::Display for Model {
    /// Human-readable dump: a header line, then one line per context.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "model {:?}: alphabet {} order {} escape {} full exclusions {} update exclusions {} nodes {}",
            self.title,
            self.config.alphabet_size(),
            self.config.max_order(),
            self.config.escape_method(),
            self.config.full_exclusions(),
            self.config.update_exclusions(),
            self.tree.len()
        )?;
        write!(f, "{}", self.tree)
    }
}
