//! The highlighting backend.
//!
//! [`CodeHighlighter`] is the seam between the rewriter and whatever turns
//! source code into markup. [`ArboriumHighlighter`] is the real implementation,
//! backed by arborium's tree-sitter grammars; tests plug in simpler ones.

use std::sync::Arc;

use arborium::{Config, GrammarStore, Highlighter, HtmlFormat};

use crate::error::HighlightError;

/// Turns source code into highlighted HTML markup.
pub trait CodeHighlighter {
    /// Highlight `code` as `language`, returning HTML with special characters escaped.
    fn highlight(&mut self, language: &str, code: &str) -> Result<String, HighlightError>;
}

/// Highlighter producing class-based spans (`<span class="hljs-keyword">`).
///
/// Compiled grammars live in a [`GrammarStore`] that can be shared between
/// highlighters on different threads; each highlighter keeps its own parse
/// context.
#[derive(Clone)]
pub struct ArboriumHighlighter {
    inner: Highlighter,
}

impl Default for ArboriumHighlighter {
    fn default() -> Self {
        Self::new("hljs")
    }
}

impl ArboriumHighlighter {
    /// Create a highlighter whose span classes are prefixed with `class_prefix`.
    pub fn new(class_prefix: &str) -> Self {
        Self::with_store(Arc::new(GrammarStore::new()), class_prefix)
    }

    /// Create a highlighter sharing compiled grammars with others.
    pub fn with_store(store: Arc<GrammarStore>, class_prefix: &str) -> Self {
        let config = Config {
            html_format: HtmlFormat::ClassNamesWithPrefix(class_prefix.to_string()),
            ..Default::default()
        };
        Self {
            inner: Highlighter::with_store_and_config(store, config),
        }
    }

    /// The grammar store shared by this highlighter.
    pub fn store(&self) -> &Arc<GrammarStore> {
        self.inner.store()
    }
}

impl CodeHighlighter for ArboriumHighlighter {
    fn highlight(&mut self, language: &str, code: &str) -> Result<String, HighlightError> {
        self.inner
            .highlight(language, code)
            .map_err(|e| HighlightError {
                language: language.to_string(),
                message: e.to_string(),
            })
    }
}
