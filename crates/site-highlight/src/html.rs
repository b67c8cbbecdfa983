//! Replace marked code blocks with highlighted `<code>` elements.

use std::cmp::Reverse;

use memchr::memchr;
use tracing::trace;

use crate::config::RewriteConfig;
use crate::error::RewriteError;
use crate::highlight::{ArboriumHighlighter, CodeHighlighter};
use crate::locate::find_marked;

/// What a rewrite did to a document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteResult {
    /// Number of marked blocks replaced.
    pub blocks_highlighted: usize,
    /// How many of those got the nowrap class.
    pub blocks_nowrap: usize,
}

/// Rewrite a document with the default highlighter and configuration.
///
/// Every element with class `build-js` is replaced by
/// `<code class="hljs">...</code>` holding its highlighted, trimmed source.
pub fn rewrite(html: &str) -> Result<String, RewriteError> {
    let mut highlighter = ArboriumHighlighter::default();
    let (rewritten, _) = rewrite_html(html, &mut highlighter, &RewriteConfig::default())?;
    Ok(rewritten)
}

/// Rewrite every marked element in `html`.
///
/// The raw source between a marked element's tags is trimmed and highlighted
/// as [`RewriteConfig::language`]; the element, tags included, is replaced by
/// a `<code>` element with the highlighted markup as its body. Everything
/// outside marked elements is copied through byte for byte.
///
/// Replacements are spliced in from the last element to the first, so the
/// offsets of elements not yet replaced stay valid.
pub fn rewrite_html<H: CodeHighlighter + ?Sized>(
    html: &str,
    highlighter: &mut H,
    config: &RewriteConfig,
) -> Result<(String, RewriteResult), RewriteError> {
    let mut result = RewriteResult::default();

    // Quick check: without the marker text or a character reference that could
    // spell it inside a class attribute, there is nothing to parse
    if !html.contains(config.marker_class.as_str()) && memchr(b'&', html.as_bytes()).is_none() {
        return Ok((html.to_string(), result));
    }

    let mut nodes = find_marked(html, &config.marker_class)?;
    if nodes.is_empty() {
        return Ok((html.to_string(), result));
    }

    nodes.sort_by_key(|node| Reverse(node.location.start));

    let mut output = html.to_string();
    for node in &nodes {
        let code = trim_code(node.location.inner(html));
        let formatted = highlighter.highlight(&config.language, code)?;
        let class = config.class_attr(code);

        trace!(
            tag = %node.tag,
            offset = node.location.start,
            len = code.len(),
            class = %class,
            "highlighted block"
        );

        let replacement = format!("<code class=\"{class}\">{}</code>", trim_code(&formatted));
        output.replace_range(node.location.span(), &replacement);

        result.blocks_highlighted += 1;
        if class != config.code_class {
            result.blocks_nowrap += 1;
        }
    }

    Ok((output, result))
}

/// Trim the whitespace a JavaScript `String.prototype.trim` would.
///
/// That set is Unicode `White_Space` without U+0085, plus U+FEFF.
fn trim_code(code: &str) -> &str {
    code.trim_matches(|c: char| c == '\u{feff}' || (c.is_whitespace() && c != '\u{85}'))
}
