// ==============================================================================
// Lexical Scanner / Block Extractor
// ==============================================================================
//
// Character-level scanning over raw `.proto` text. No grammar, no token
// stream: the only structure we need is top-level `message`/`enum`/`extend`
// blocks with exact byte spans, plus the `syntax` and `package` declarations.
// All scanning is comment-aware (`//` and `/* */`) and string-literal-aware,
// so braces inside strings or comments never confuse depth tracking.
//
// Nested message/enum/extend blocks are not indexed separately. They stay
// inside their parent's span and are preserved whole whenever the parent is
// selected.

use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

/// Kind of a top-level definition block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    Message,
    Enum,
    Extend,
}

impl DefKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DefKind::Message => "message",
            DefKind::Enum => "enum",
            DefKind::Extend => "extend",
        }
    }

    fn from_keyword(kw: &str) -> Option<Self> {
        match kw {
            "message" => Some(DefKind::Message),
            "enum" => Some(DefKind::Enum),
            "extend" => Some(DefKind::Extend),
            _ => None,
        }
    }
}

/// A top-level definition block with exact byte offsets into the source text.
///
/// `start` points at the keyword, `brace_start` at the opening `{`, and `end`
/// one past the matching closing `}`.
#[derive(Debug, Clone)]
pub struct Block {
    pub kind: DefKind,
    pub name: String,
    pub start: usize,
    pub brace_start: usize,
    pub end: usize,
}

impl Block {
    /// The full block text, keyword through closing brace.
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }

    /// The text between the braces, exclusive.
    pub fn body<'a>(&self, src: &'a str) -> &'a str {
        if self.brace_start + 1 < self.end {
            &src[self.brace_start + 1..self.end - 1]
        } else {
            ""
        }
    }
}

/// A definition block that never reached its matching closing brace.
#[derive(Debug)]
pub struct UnclosedBlock {
    pub kind: DefKind,
    pub name: String,
    /// Byte offset of the block keyword.
    pub at: usize,
}

const fn is_ident_start(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphabetic()
}

const fn is_ident(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

const fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// Scan `src` for top-level definition blocks, in source order.
///
/// Depth-aware: braces inside strings and comments are skipped, and blocks at
/// depth > 0 (nested definitions) are never reported. A block whose closing
/// brace is missing is a hard error — the remaining text cannot be attributed
/// to any definition.
pub fn scan_top_level_blocks(src: &str) -> Result<Vec<Block>, UnclosedBlock> {
    let s = src.as_bytes();
    let n = s.len();
    let mut out = Vec::new();
    let mut i = 0;
    let mut depth = 0usize;

    while i < n {
        if s[i] == b'/' && i + 1 < n && (s[i + 1] == b'/' || s[i + 1] == b'*') {
            i = skip_comment(s, i);
            continue;
        }
        if s[i] == b'"' {
            i = skip_string(s, i);
            continue;
        }
        if s[i] == b'{' {
            depth += 1;
            i += 1;
            continue;
        }
        if s[i] == b'}' {
            depth = depth.saturating_sub(1);
            i += 1;
            continue;
        }
        if depth == 0 && is_ident_start(s[i]) {
            let start = i;
            while i < n && is_ident(s[i]) {
                i += 1;
            }
            let kw = &src[start..i];
            if let Some(kind) = DefKind::from_keyword(kw) {
                while i < n && is_space(s[i]) {
                    i += 1;
                }
                let name_start = i;
                // An extend target is a dotted path (`extend a.b.Options`);
                // message and enum names are plain identifiers.
                while i < n && (is_ident(s[i]) || (kind == DefKind::Extend && s[i] == b'.')) {
                    i += 1;
                }
                let name = src[name_start..i].to_string();
                while i < n && s[i] != b'{' {
                    i += 1;
                }
                if i >= n {
                    return Err(UnclosedBlock { kind, name, at: start });
                }
                let brace_start = i;
                let Some(end) = match_brace(s, brace_start) else {
                    return Err(UnclosedBlock { kind, name, at: start });
                };
                i = end;
                out.push(Block {
                    kind,
                    name,
                    start,
                    brace_start,
                    end,
                });
                continue;
            }
            continue;
        }
        i += 1;
    }
    Ok(out)
}

/// Advance past the matching `}` for the `{` at `open`, skipping strings and
/// comments. Returns one past the closing brace, or `None` at EOF.
fn match_brace(s: &[u8], open: usize) -> Option<usize> {
    debug_assert_eq!(s[open], b'{');
    let n = s.len();
    let mut i = open + 1;
    let mut depth = 1usize;
    while i < n {
        if s[i] == b'"' {
            i = skip_string(s, i);
            continue;
        }
        if s[i] == b'/' && i + 1 < n && (s[i + 1] == b'/' || s[i + 1] == b'*') {
            i = skip_comment(s, i);
            continue;
        }
        match s[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Advance past a string literal starting at the opening quote. Backslash
/// escapes are honored. An unterminated string runs to EOF.
fn skip_string(s: &[u8], at: usize) -> usize {
    debug_assert_eq!(s[at], b'"');
    let n = s.len();
    let mut i = at + 1;
    while i < n {
        match s[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    n
}

/// Advance past a `//` or `/* */` comment starting at `at`. Line comments
/// stop *before* the newline so callers keep line structure intact.
fn skip_comment(s: &[u8], at: usize) -> usize {
    let n = s.len();
    debug_assert!(s[at] == b'/' && at + 1 < n);
    let mut i = at + 2;
    if s[at + 1] == b'/' {
        while i < n && s[i] != b'\n' {
            i += 1;
        }
        i
    } else {
        while i + 1 < n {
            if s[i] == b'*' && s[i + 1] == b'/' {
                return i + 2;
            }
            i += 1;
        }
        n
    }
}

/// Remove all comments from `src`, string-literal-aware. Newlines outside
/// comments survive, so line-oriented patterns still work on the result.
pub fn strip_comments(src: &str) -> String {
    let s = src.as_bytes();
    let n = s.len();
    let mut out = String::with_capacity(n);
    let mut i = 0;
    let mut run_start = 0;
    while i < n {
        if s[i] == b'"' {
            i = skip_string(s, i);
            continue;
        }
        if s[i] == b'/' && i + 1 < n && (s[i + 1] == b'/' || s[i + 1] == b'*') {
            out.push_str(&src[run_start..i]);
            i = skip_comment(s, i);
            run_start = i;
            continue;
        }
        i += 1;
    }
    out.push_str(&src[run_start..n]);
    out
}

static SYNTAX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*syntax\s*=\s*"([^"]+)"\s*;"#).expect("valid regex"));
static PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*package\s+([A-Za-z_][\w.]*?)\s*;").expect("valid regex"));
static MAP_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"map\s*<\s*([A-Za-z_][\w.]*)\s*,\s*([A-Za-z_][\w.]*)\s*>").expect("valid regex")
});
static FIELD_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^|[\s{])(?:repeated|optional)?\s*([A-Za-z_][\w.]*)\s+[A-Za-z_]\w*\s*=\s*\d+\s*[;\[]")
        .expect("valid regex")
});

/// Extract the `syntax = "...";` declaration from comment-stripped text.
/// Defaults to `proto3` when absent.
pub fn extract_syntax(stripped: &str) -> String {
    SYNTAX_RE
        .captures(stripped)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "proto3".to_string())
}

/// Extract the `package a.b.c;` declaration from comment-stripped text.
/// Empty when absent.
pub fn extract_package(stripped: &str) -> String {
    PACKAGE_RE
        .captures(stripped)
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

/// Collect candidate type-reference tokens from a definition's text.
///
/// Covers ordinary field declarations (`[repeated|optional] <type> <name> =
/// <number>`), including those nested inside oneof and nested blocks, and both
/// key and value positions of `map<K, V>`. Scalars and other non-type tokens
/// are filtered later during resolution, not here. The input is
/// comment-stripped before matching so commented-out fields contribute
/// nothing.
pub fn collect_type_tokens(def_text: &str) -> Vec<String> {
    let stripped = strip_comments(def_text);
    let mut tokens = IndexSet::new();
    for caps in MAP_TYPE_RE.captures_iter(&stripped) {
        tokens.insert(caps[1].to_string());
        tokens.insert(caps[2].to_string());
    }
    for caps in FIELD_TYPE_RE.captures_iter(&stripped) {
        tokens.insert(caps[1].to_string());
    }
    tokens.into_iter().collect()
}

/// Read the identifier (keyword) at or after `i`, skipping leading whitespace.
/// Returns the keyword and the offset one past it.
pub(crate) fn read_keyword(s: &str, mut i: usize) -> (&str, usize) {
    let b = s.as_bytes();
    while i < b.len() && is_space(b[i]) {
        i += 1;
    }
    let start = i;
    while i < b.len() && (b[i] == b'_' || b[i].is_ascii_alphabetic()) {
        i += 1;
    }
    (&s[start..i], i)
}

/// Read the identifier after `i`, skipping leading whitespace. Unlike
/// [`read_keyword`] this also accepts digits and dots, so it covers both
/// plain identifiers and dotted extend targets.
pub(crate) fn read_ident_after(s: &str, mut i: usize) -> (&str, usize) {
    let b = s.as_bytes();
    while i < b.len() && is_space(b[i]) {
        i += 1;
    }
    let start = i;
    while i < b.len() && (is_ident(b[i]) || b[i] == b'.') {
        i += 1;
    }
    (&s[start..i], i)
}

/// Find the `{ ... }` block starting at or after `i` and return
/// `(open, one_past_close)`. Returns an empty range when no block opens.
pub(crate) fn find_block(s: &str, mut i: usize) -> (usize, usize) {
    let b = s.as_bytes();
    while i < b.len() && is_space(b[i]) {
        i += 1;
    }
    if i >= b.len() || b[i] != b'{' {
        return (i, i);
    }
    match match_brace(b, i) {
        Some(end) => (i, end),
        None => (i, i),
    }
}

/// The trailing identifier of `s`, ignoring trailing whitespace. Used to pull
/// a field name out of the text left of its `=`.
pub(crate) fn last_ident(s: &str) -> &str {
    let b = s.as_bytes();
    let mut i = b.len();
    while i > 0 && matches!(b[i - 1], b' ' | b'\t') {
        i -= 1;
    }
    let end = i;
    while i > 0 && is_ident(b[i - 1]) {
        i -= 1;
    }
    &s[i..end]
}

/// The final dotted segment of a type token, with any leading `.` removed.
pub(crate) fn base_name(token: &str) -> &str {
    let t = token.trim().trim_start_matches('.');
    match t.rfind('.') {
        Some(i) => &t[i + 1..],
        None => t,
    }
}
