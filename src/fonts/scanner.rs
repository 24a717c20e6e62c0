//! Minimal scanner for font references in stylesheets
//!
//! Only understands what the upstream API emits: `@font-face` blocks whose
//! `src` declarations hold one or more `url(...)` tokens. Comments and
//! strings are skipped so braces, semicolons, or `url(` inside them never
//! confuse the block structure.

use std::ops::Range;

const FONT_FACE: &[u8] = b"@font-face";
const URL_OPEN: &[u8] = b"url(";

/// A URL found in a `src` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRef {
    /// The URL without quotes or surrounding whitespace
    pub value: String,
    /// Byte range of `value` in the scanned text
    pub span: Range<usize>,
}

/// Every URL referenced by a `src` declaration inside an `@font-face`
/// block, in document order
pub fn font_sources(css: &str) -> Vec<UrlRef> {
    let scanner = Scanner::new(css);
    let mut refs = Vec::new();

    for block in scanner.font_face_blocks() {
        for decl in scanner.declarations(block) {
            if let Some(value) = scanner.src_value(decl) {
                refs.extend(scanner.urls(value));
            }
        }
    }

    refs
}

/// Rebuild `css` with each span replaced. Spans must be sorted and must
/// not overlap.
pub fn replace_spans(css: &str, replacements: &[(Range<usize>, String)]) -> String {
    let mut out = String::with_capacity(css.len());
    let mut cursor = 0;

    for (span, replacement) in replacements {
        out.push_str(&css[cursor..span.start]);
        out.push_str(replacement);
        cursor = span.end;
    }
    out.push_str(&css[cursor..]);

    out
}

/// Replace every occurrence of each pattern in one left-to-right pass.
/// Where patterns overlap the longest one wins, and inserted text is never
/// scanned again.
pub fn replace_all(text: &str, patterns: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        let hit = patterns
            .iter()
            .filter(|(pattern, _)| !pattern.is_empty() && rest.starts_with(*pattern))
            .max_by_key(|(pattern, _)| pattern.len());

        match hit {
            Some((pattern, replacement)) => {
                out.push_str(&text[copied..pos]);
                out.push_str(replacement);
                pos += pattern.len();
                copied = pos;
            }
            None => pos += rest.chars().next().map_or(1, char::len_utf8),
        }
    }
    out.push_str(&text[copied..]);

    out
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
        }
    }

    /// Body ranges (between the braces) of all `@font-face` blocks
    fn font_face_blocks(&self) -> Vec<Range<usize>> {
        let mut blocks = Vec::new();
        let mut pos = 0;

        while pos < self.bytes.len() {
            if let Some(next) = self.skip_trivia(pos) {
                pos = next;
                continue;
            }

            if self.keyword_at(pos, FONT_FACE) {
                pos += FONT_FACE.len();
                if let Some(open) = self.find_open_brace(pos) {
                    let close = self.find_block_end(open);
                    blocks.push(open + 1..close);
                    pos = close;
                }
                continue;
            }

            pos += 1;
        }

        blocks
    }

    /// Declaration ranges of a block body, split at top-level `;`
    fn declarations(&self, block: Range<usize>) -> Vec<Range<usize>> {
        let mut decls = Vec::new();
        let mut start = block.start;
        let mut depth = 0usize;
        let mut pos = block.start;

        while pos < block.end {
            if let Some(next) = self.skip_trivia(pos) {
                pos = next.min(block.end);
                continue;
            }
            match self.bytes[pos] {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b';' if depth == 0 => {
                    decls.push(start..pos);
                    start = pos + 1;
                }
                _ => {}
            }
            pos += 1;
        }
        if start < block.end {
            decls.push(start..block.end);
        }

        decls
    }

    /// The value range of a `src: ...` declaration
    fn src_value(&self, decl: Range<usize>) -> Option<Range<usize>> {
        let mut pos = decl.start;
        while pos < decl.end {
            if let Some(next) = self.skip_trivia(pos) {
                pos = next.min(decl.end);
                continue;
            }
            if self.bytes[pos] == b':' {
                let name = self.strip_comments(decl.start..pos);
                return name
                    .trim()
                    .eq_ignore_ascii_case("src")
                    .then_some(pos + 1..decl.end);
            }
            pos += 1;
        }
        None
    }

    /// All `url(...)` tokens in a declaration value
    fn urls(&self, value: Range<usize>) -> Vec<UrlRef> {
        let mut urls = Vec::new();
        let mut pos = value.start;

        while pos < value.end {
            if let Some(next) = self.skip_trivia(pos) {
                pos = next.min(value.end);
                continue;
            }
            if self.keyword_at(pos, URL_OPEN) {
                let (url, next) = self.url_token(pos + URL_OPEN.len(), value.end);
                if let Some(url) = url {
                    urls.push(url);
                }
                pos = next;
                continue;
            }
            pos += 1;
        }

        urls
    }

    /// Parse the inside of `url(` starting at `pos`; returns the URL (if
    /// non-empty) and the position after the closing parenthesis
    fn url_token(&self, pos: usize, end: usize) -> (Option<UrlRef>, usize) {
        let mut pos = self.skip_whitespace(pos, end);

        let span = if pos < end && matches!(self.bytes[pos], b'"' | b'\'') {
            let (close, terminated) = self.string_end(pos);
            // An unterminated string runs to the end of the value
            let content_end = if terminated { close - 1 } else { end };
            let span = pos + 1..content_end.min(end).max(pos + 1);
            pos = close.min(end);
            // Anything up to `)` after a quoted URL is ignored
            while pos < end && self.bytes[pos] != b')' {
                pos += 1;
            }
            span
        } else {
            let start = pos;
            let mut depth = 0usize;
            while pos < end {
                match self.bytes[pos] {
                    b'(' => depth += 1,
                    b')' if depth == 0 => break,
                    b')' => depth -= 1,
                    _ => {}
                }
                pos += 1;
            }
            let mut stop = pos;
            while stop > start && self.bytes[stop - 1].is_ascii_whitespace() {
                stop -= 1;
            }
            start..stop
        };

        let next = (pos + 1).min(end.max(pos));
        if span.is_empty() {
            return (None, next);
        }

        let url = UrlRef {
            value: self.src[span.clone()].to_string(),
            span,
        };
        (Some(url), next)
    }

    /// If a comment or string starts at `pos`, the position after it
    fn skip_trivia(&self, pos: usize) -> Option<usize> {
        match self.bytes[pos] {
            b'/' if self.bytes.get(pos + 1) == Some(&b'*') => Some(self.skip_comment(pos)),
            b'"' | b'\'' => Some(self.skip_string(pos)),
            _ => None,
        }
    }

    fn skip_comment(&self, pos: usize) -> usize {
        self.src[pos + 2..]
            .find("*/")
            .map(|i| pos + 2 + i + 2)
            .unwrap_or(self.bytes.len())
    }

    /// Position after the closing quote of the string starting at `pos`
    fn skip_string(&self, pos: usize) -> usize {
        self.string_end(pos).0
    }

    /// Position after the string starting at `pos`, and whether its closing
    /// quote was found before the end of input
    fn string_end(&self, pos: usize) -> (usize, bool) {
        let quote = self.bytes[pos];
        let mut i = pos + 1;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b if b == quote => return (i + 1, true),
                _ => i += 1,
            }
        }
        (self.bytes.len(), false)
    }

    fn skip_whitespace(&self, mut pos: usize, end: usize) -> usize {
        while pos < end && self.bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        pos
    }

    /// Case-insensitive keyword match not preceded by an identifier character
    fn keyword_at(&self, pos: usize, keyword: &[u8]) -> bool {
        let Some(candidate) = self.bytes.get(pos..pos + keyword.len()) else {
            return false;
        };
        if !candidate.eq_ignore_ascii_case(keyword) {
            return false;
        }
        pos == 0 || !is_ident_byte(self.bytes[pos - 1])
    }

    fn find_open_brace(&self, mut pos: usize) -> Option<usize> {
        while pos < self.bytes.len() {
            if let Some(next) = self.skip_trivia(pos) {
                pos = next;
                continue;
            }
            match self.bytes[pos] {
                b'{' => return Some(pos),
                b';' | b'}' => return None,
                _ => pos += 1,
            }
        }
        None
    }

    /// Position of the `}` matching the `{` at `open` (or end of input)
    fn find_block_end(&self, open: usize) -> usize {
        let mut depth = 0usize;
        let mut pos = open;
        while pos < self.bytes.len() {
            if let Some(next) = self.skip_trivia(pos) {
                pos = next;
                continue;
            }
            match self.bytes[pos] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return pos;
                    }
                }
                _ => {}
            }
            pos += 1;
        }
        self.bytes.len()
    }

    fn strip_comments(&self, range: Range<usize>) -> String {
        let mut out = String::new();
        let mut pos = range.start;
        while pos < range.end {
            if self.bytes[pos] == b'/' && self.bytes.get(pos + 1) == Some(&b'*') {
                pos = self.skip_comment(pos).min(range.end);
                continue;
            }
            out.push(self.bytes[pos] as char);
            pos += 1;
        }
        out
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}
