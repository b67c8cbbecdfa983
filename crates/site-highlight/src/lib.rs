//! Syntax-highlight marked code blocks in a directory of static HTML pages.
//!
//! Any element carrying the class `build-js` is treated as a raw JavaScript
//! code block. Its source is trimmed, highlighted with arborium's tree-sitter
//! grammars, and the whole element is replaced by a `<code>` element:
//!
//! ```html
//! <pre class="build-js">
//!   let x = 1;
//! </pre>
//! ```
//!
//! becomes
//!
//! ```html
//! <code class="hljs"><span class="hljs-keyword">let</span> x = <span class="hljs-number">1</span>;</code>
//! ```
//!
//! Snippets shorter than ten characters also get the `nowrap` class.
//!
//! # Usage
//!
//! ```bash
//! site-highlight ./source ./docs
//! ```
//!
//! # How it works
//!
//! 1. **Locating**: a position-aware scan ([`find_marked`]) reports the byte
//!    offsets of each marked element's opening and closing tags.
//!
//! 2. **Rewriting**: [`rewrite_html`] highlights each block and splices the
//!    replacement in, last block first, so earlier offsets stay valid.
//!
//! 3. **Processing**: [`Processor`] rewrites every `.html` file of the input
//!    directory in parallel and writes the results only if all of them succeed.

mod config;
mod error;
mod highlight;
mod html;
mod locate;
mod processor;

pub use config::RewriteConfig;
pub use error::{HighlightError, ParseError, ProcessError, RewriteError};
pub use highlight::{ArboriumHighlighter, CodeHighlighter};
pub use html::{RewriteResult, rewrite, rewrite_html};
pub use locate::{Location, MarkedNode, find_marked};
pub use processor::{ProcessOptions, Processor, ProcessorStats};
