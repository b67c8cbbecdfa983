//! Rewrite configuration.

/// Configuration for rewriting marked code blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteConfig {
    /// Class that flags an element as a raw code block.
    pub marker_class: String,

    /// Language every marked block is highlighted as.
    pub language: String,

    /// Class of the `<code>` element that replaces a marked block.
    ///
    /// Highlighted spans use the same name as their class prefix
    /// (`hljs` gives `<span class="hljs-keyword">`).
    pub code_class: String,

    /// Extra class added to short snippets so they don't wrap.
    pub nowrap_class: String,

    /// Snippets shorter than this (after trimming) get
    /// [`nowrap_class`](Self::nowrap_class). Length is measured in UTF-16
    /// code units, so a character outside the BMP counts twice.
    pub nowrap_below: usize,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            marker_class: "build-js".to_string(),
            language: "javascript".to_string(),
            code_class: "hljs".to_string(),
            nowrap_class: "nowrap".to_string(),
            nowrap_below: 10,
        }
    }
}

impl RewriteConfig {
    /// The `class` attribute value for a replacement element.
    pub fn class_attr(&self, code: &str) -> String {
        if code.encode_utf16().count() < self.nowrap_below {
            format!("{} {}", self.code_class, self.nowrap_class)
        } else {
            self.code_class.clone()
        }
    }
}
