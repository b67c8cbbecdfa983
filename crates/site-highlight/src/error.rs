//! Error types for locating, highlighting and writing code blocks.

use std::path::PathBuf;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// The document could not be split into marked elements.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    /// A marked element never received its own closing tag, either because
    /// an outer closing tag ended it implicitly or because the document ended.
    #[error("<{tag}> marked for highlighting has no closing tag")]
    #[diagnostic(
        code(site_highlight::unclosed_element),
        help("close the element explicitly so the code block has a well-defined end")
    )]
    UnclosedElement {
        tag: String,
        #[label("opened here")]
        span: SourceSpan,
        #[source_code]
        src: String,
    },
}

impl ParseError {
    /// Byte offset of the offending opening tag.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::UnclosedElement { span, .. } => span.offset(),
        }
    }
}

/// The highlighter rejected the code or the language.
#[derive(Debug, Error, Diagnostic)]
#[error("failed to highlight code as {language}: {message}")]
#[diagnostic(code(site_highlight::highlight))]
pub struct HighlightError {
    pub language: String,
    pub message: String,
}

/// Errors from rewriting a single document.
#[derive(Debug, Error, Diagnostic)]
pub enum RewriteError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Highlight(#[from] HighlightError),
}

/// Errors that can occur while processing a directory.
#[derive(Debug, Error, Diagnostic)]
pub enum ProcessError {
    /// The input path is missing or is not a directory.
    #[error("input directory {} is not usable: {reason}", .path.display())]
    #[diagnostic(code(site_highlight::input))]
    InvalidInput { path: PathBuf, reason: &'static str },

    #[error(transparent)]
    #[diagnostic(code(site_highlight::io))]
    Io(#[from] std::io::Error),

    #[error("failed to list input directory")]
    #[diagnostic(code(site_highlight::walk))]
    Walk(#[from] walkdir::Error),

    #[error("failed to rewrite {}", .path.display())]
    #[diagnostic(code(site_highlight::rewrite))]
    Rewrite {
        path: PathBuf,
        #[source]
        #[diagnostic_source]
        source: RewriteError,
    },
}
