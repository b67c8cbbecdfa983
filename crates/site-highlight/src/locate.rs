//! Position-aware scan of an HTML document for marked elements.
//!
//! This is a tolerant tokenizer, not a validating parser: it tracks just
//! enough structure (open elements, comments, raw-text elements, quoted
//! attribute values) to pair each marked element with its own closing tag
//! and report the exact byte offsets of both tags.
//!
//! ```text
//! <pre class="build-js">  let x = 1;  </pre>
//! ^                     ^            ^      ^
//! start     start_tag_end  end_tag_start    end
//! ```

use std::borrow::Cow;
use std::ops::Range;

use memchr::{memchr, memmem};

use crate::error::ParseError;

/// Elements that never have content or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is never tokenized as markup.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes",
];

/// Byte offsets of an element's tags within the original document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Offset of the `<` opening the start tag.
    pub start: usize,
    /// Offset just past the start tag's `>`.
    pub start_tag_end: usize,
    /// Offset of the `<` opening the closing tag.
    pub end_tag_start: usize,
    /// Offset just past the closing tag's `>`.
    pub end: usize,
}

impl Location {
    /// The element's raw source between its two tags.
    pub fn inner<'a>(&self, html: &'a str) -> &'a str {
        &html[self.start_tag_end..self.end_tag_start]
    }

    /// The whole element, tags included.
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// An element carrying the marker class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedNode {
    /// Lowercased tag name.
    pub tag: String,
    pub location: Location,
}

/// An element whose closing tag hasn't been seen yet.
struct OpenElement {
    name: String,
    start: usize,
    start_tag_end: usize,
    marked: bool,
}

impl OpenElement {
    fn unclosed(&self, html: &str) -> ParseError {
        ParseError::UnclosedElement {
            tag: self.name.clone(),
            span: (self.start..self.start_tag_end).into(),
            src: html.to_string(),
        }
    }
}

/// A scanned start or end tag.
struct Tag<'a> {
    name: &'a str,
    /// Offset just past the closing `>`.
    end: usize,
    /// Value of the first `class` attribute, if any.
    class: Option<&'a str>,
}

/// Find every element whose `class` list contains `marker_class`, in document order.
///
/// A marked element nested inside another marked element is part of the outer
/// one's content and is not reported separately.
pub fn find_marked(html: &str, marker_class: &str) -> Result<Vec<MarkedNode>, ParseError> {
    let bytes = html.as_bytes();
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(rel) = memchr(b'<', &bytes[pos..]) {
        let lt = pos + rel;
        let rest = &bytes[lt + 1..];

        if rest.starts_with(b"!--") {
            pos = memmem::find(&bytes[lt + 2..], b"-->").map_or(bytes.len(), |i| lt + 2 + i + 3);
            continue;
        }

        match rest.first() {
            Some(b'!' | b'?') => {
                pos = skip_past_gt(bytes, lt);
            }
            Some(b'/') => match rest.get(1) {
                Some(c) if c.is_ascii_alphabetic() => match scan_tag(html, lt + 2) {
                    Some(tag) => {
                        let name = tag.name.to_ascii_lowercase();
                        close_element(html, &mut stack, &mut found, &name, lt, tag.end)?;
                        pos = tag.end;
                    }
                    None => pos = bytes.len(),
                },
                Some(b'>') => pos = lt + 3,
                Some(_) => pos = skip_past_gt(bytes, lt),
                None => pos = bytes.len(),
            },
            Some(c) if c.is_ascii_alphabetic() => {
                let Some(tag) = scan_tag(html, lt + 1) else {
                    // A start tag cut off by the end of the document is text.
                    break;
                };
                let name = tag.name.to_ascii_lowercase();
                let marked = tag.class.is_some_and(|class| {
                    decode_char_refs(class)
                        .split_ascii_whitespace()
                        .any(|c| c == marker_class)
                }) && !stack.iter().any(|open| open.marked);
                let open = OpenElement {
                    name,
                    start: lt,
                    start_tag_end: tag.end,
                    marked,
                };

                if VOID_ELEMENTS.contains(&open.name.as_str()) {
                    if open.marked {
                        return Err(open.unclosed(html));
                    }
                    pos = tag.end;
                } else if RAW_TEXT_ELEMENTS.contains(&open.name.as_str()) {
                    pos = close_raw_text(html, open, &mut found)?;
                } else {
                    stack.push(open);
                    pos = tag.end;
                }
            }
            _ => pos = lt + 1,
        }
    }

    if let Some(open) = stack.iter().find(|open| open.marked) {
        return Err(open.unclosed(html));
    }

    Ok(found)
}

/// Close the nearest open element named `name`, implicitly closing anything opened after it.
fn close_element(
    html: &str,
    stack: &mut Vec<OpenElement>,
    found: &mut Vec<MarkedNode>,
    name: &str,
    end_tag_start: usize,
    end: usize,
) -> Result<(), ParseError> {
    // Stray closing tags are ignored.
    let Some(index) = stack.iter().rposition(|open| open.name == name) else {
        return Ok(());
    };

    if let Some(open) = stack[index + 1..].iter().find(|open| open.marked) {
        return Err(open.unclosed(html));
    }

    stack.truncate(index + 1);
    if let Some(open) = stack.pop()
        && open.marked
    {
        found.push(MarkedNode {
            tag: open.name,
            location: Location {
                start: open.start,
                start_tag_end: open.start_tag_end,
                end_tag_start,
                end,
            },
        });
    }
    Ok(())
}

/// Skip a raw-text element's content up to its closing tag, returning the offset after it.
fn close_raw_text(
    html: &str,
    open: OpenElement,
    found: &mut Vec<MarkedNode>,
) -> Result<usize, ParseError> {
    let bytes = html.as_bytes();
    let closing = find_raw_text_end(bytes, open.start_tag_end, &open.name)
        .and_then(|lt| scan_tag(html, lt + 2).map(|tag| (lt, tag.end)));

    match closing {
        Some((end_tag_start, end)) => {
            if open.marked {
                found.push(MarkedNode {
                    tag: open.name,
                    location: Location {
                        start: open.start,
                        start_tag_end: open.start_tag_end,
                        end_tag_start,
                        end,
                    },
                });
            }
            Ok(end)
        }
        None if open.marked => Err(open.unclosed(html)),
        None => Ok(bytes.len()),
    }
}

/// Find `</name` (ASCII case-insensitive) followed by a tag delimiter.
fn find_raw_text_end(bytes: &[u8], from: usize, name: &str) -> Option<usize> {
    let mut pos = from;
    while let Some(rel) = memmem::find(&bytes[pos..], b"</") {
        let lt = pos + rel;
        let name_end = lt + 2 + name.len();
        if name_end <= bytes.len()
            && bytes[lt + 2..name_end].eq_ignore_ascii_case(name.as_bytes())
            && bytes.get(name_end).is_none_or(|&b| is_tag_delimiter(b))
        {
            return Some(lt);
        }
        pos = lt + 2;
    }
    None
}

/// Scan a tag whose name starts at `name_start`.
///
/// Returns `None` if the document ends before the tag does.
fn scan_tag(html: &str, name_start: usize) -> Option<Tag<'_>> {
    let bytes = html.as_bytes();
    let mut i = name_start;
    while i < bytes.len() && !is_tag_delimiter(bytes[i]) {
        i += 1;
    }
    let name = &html[name_start..i];
    let mut class = None;

    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if *bytes.get(i)? == b'>' {
            return Some(Tag {
                name,
                end: i + 1,
                class,
            });
        }

        let attr_start = i;
        // The first character is part of the name even if it is `=`.
        i += 1;
        while i < bytes.len() && !is_tag_delimiter(bytes[i]) && bytes[i] != b'=' {
            i += 1;
        }
        let attr_name = &html[attr_start..i];

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = "";
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match *bytes.get(i)? {
                quote @ (b'"' | b'\'') => {
                    let close = i + 1 + memchr(quote, &bytes[i + 1..])?;
                    value = &html[i + 1..close];
                    i = close + 1;
                }
                b'>' => {}
                _ => {
                    let value_start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = &html[value_start..i];
                }
            }
        }

        if class.is_none() && attr_name.eq_ignore_ascii_case("class") {
            class = Some(value);
        }
    }
}

/// Decode character references in an attribute value.
///
/// Handles numeric references and the common named ones. Unknown or
/// malformed references are kept as-is.
fn decode_char_refs(value: &str) -> Cow<'_, str> {
    if memchr(b'&', value.as_bytes()).is_none() {
        return Cow::Borrowed(value);
    }

    let mut decoded = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let reference = rest[1..]
            .find(';')
            .and_then(|semi| Some((decode_char_ref(&rest[1..1 + semi])?, semi + 2)));
        match reference {
            Some((c, len)) => {
                decoded.push(c);
                rest = &rest[len..];
            }
            None => {
                decoded.push('&');
                rest = &rest[1..];
            }
        }
    }
    decoded.push_str(rest);
    Cow::Owned(decoded)
}

/// Decode a single reference (without `&` and `;`).
fn decode_char_ref(name: &str) -> Option<char> {
    if let Some(number) = name.strip_prefix('#') {
        let (digits, radix) = match number.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16),
            None => (number, 10),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        // Invalid code points decode to U+FFFD.
        let c = u32::from_str_radix(digits, radix)
            .ok()
            .and_then(char::from_u32)
            .filter(|&c| c != '\0')
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        return Some(c);
    }

    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "hyphen" | "dash" => '\u{2010}',
        "minus" => '\u{2212}',
        "period" => '.',
        "lowbar" | "UnderBar" => '_',
        "Tab" => '\t',
        "NewLine" => '\n',
        _ => return None,
    })
}

fn skip_past_gt(bytes: &[u8], from: usize) -> usize {
    memchr(b'>', &bytes[from..]).map_or(bytes.len(), |i| from + i + 1)
}

fn is_tag_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}
