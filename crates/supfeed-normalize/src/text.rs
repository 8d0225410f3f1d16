//! String primitives shared by the parameter, description, and offer builders.

use std::borrow::Cow;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use scraper::{Html, Node};

/// Characters percent-encoded in picture URLs. Non-ASCII is always encoded;
/// `%` is left alone so already-encoded URLs stay unchanged.
const PICTURE_URL_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

/// Elements that start a new line when flattening third-party HTML to text.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "tr", "table", "h1", "h2", "h3", "h4", "h5", "h6",
    "section", "article", "blockquote", "pre", "hr", "dt", "dd",
];

/// Elements whose text content is never shown.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}')
}

/// Removes zero-width spaces, joiners, and byte-order marks.
#[must_use]
pub fn strip_zero_width(s: &str) -> Cow<'_, str> {
    if s.chars().any(is_zero_width) {
        Cow::Owned(s.chars().filter(|&c| !is_zero_width(c)).collect())
    } else {
        Cow::Borrowed(s)
    }
}

/// Trims and collapses every whitespace run (NBSP included) to one space.
#[must_use]
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escapes `<`, `>`, `&`, `'` and `"` for XML text and attribute values.
#[must_use]
pub fn xml_escape(s: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(s)
}

/// Reverses [`xml_escape`]; malformed entities are returned untouched.
#[must_use]
pub fn xml_unescape(s: &str) -> Cow<'_, str> {
    quick_xml::escape::unescape(s).unwrap_or(Cow::Borrowed(s))
}

/// Splits `]]>` so the payload can sit inside a single CDATA section.
#[must_use]
pub fn cdata_safe(s: &str) -> Cow<'_, str> {
    if s.contains("]]>") {
        Cow::Owned(s.replace("]]>", "]]]]><![CDATA[>"))
    } else {
        Cow::Borrowed(s)
    }
}

/// Flattens a supplier description to plain text, one block per line.
///
/// Markup is parsed with a real HTML tree parser; block elements and `<br>`
/// become line breaks, scripts and styles are dropped, entities are decoded.
/// Each line is whitespace-collapsed and blank lines are removed.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let raw = if html.contains('<') || html.contains('&') {
        let fragment = Html::parse_fragment(html);
        let mut out = String::with_capacity(html.len());
        for node in fragment.root_element().descendants() {
            match node.value() {
                Node::Element(element) if BLOCK_ELEMENTS.contains(&element.name()) => {
                    out.push('\n');
                }
                Node::Text(text) => {
                    let hidden = node
                        .parent()
                        .and_then(|p| p.value().as_element())
                        .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()));
                    if !hidden {
                        out.push_str(text);
                    }
                }
                _ => {}
            }
        }
        out
    } else {
        html.to_string()
    };

    raw.lines()
        .map(|line| collapse_whitespace(&strip_zero_width(line)))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trims a picture URL and percent-encodes spaces and non-ASCII characters.
#[must_use]
pub fn normalize_picture_url(url: &str) -> String {
    utf8_percent_encode(url.trim(), PICTURE_URL_SET).to_string()
}
