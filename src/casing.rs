// ==============================================================================
// Naming-Case Engine
// ==============================================================================
//
// Pure string-case transforms applied to output file stems and field
// identifiers. Delimiters are `_`, `-`, `.`, and space. The camel transform
// has two acronym escapes: a fully upper-case input is returned unchanged
// (`FOO`), and so is an input whose first character is upper-case with an
// all-upper remainder (`ASNBe`).

use serde::Deserialize;

/// Case mode for output file stems and field identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    Camel,
    Snake,
    Compact,
    /// Identity transform.
    #[default]
    #[serde(alias = "unchanged")]
    Keep,
}

impl CaseMode {
    /// Apply this case mode to `s`.
    pub fn apply(self, s: &str) -> String {
        match self {
            CaseMode::Camel => to_camel(s),
            CaseMode::Snake => to_snake(s),
            CaseMode::Compact => remove_delims(s).to_lowercase(),
            CaseMode::Keep => s.to_string(),
        }
    }
}

fn is_delim(c: char) -> bool {
    matches!(c, '_' | '-' | '.' | ' ')
}

/// Upper-camel-case `s`, splitting on delimiters.
///
/// Fully upper-case inputs, and inputs whose first character is upper-case
/// with an all-upper remainder, are treated as acronyms and returned as-is.
pub fn to_camel(s: &str) -> String {
    let s = s.trim();
    if s == s.to_uppercase() {
        return s.to_string();
    }
    let mut chars = s.chars();
    if let Some(first) = chars.next() {
        let rest = chars.as_str();
        if first.is_uppercase() && !rest.is_empty() && rest == rest.to_uppercase() {
            return s.to_string();
        }
    }
    let mut out = String::with_capacity(s.len());
    for part in s.split(is_delim) {
        let mut chars = part.chars();
        match chars.next() {
            Some(c) if c.is_lowercase() => {
                out.extend(c.to_uppercase());
                out.push_str(chars.as_str());
            }
            Some(c) => {
                out.push(c);
                out.push_str(chars.as_str());
            }
            None => {}
        }
    }
    out
}

/// Snake-case `s`: delimiters collapse to single underscores, and every
/// upper-case letter past position 0 (not already preceded by an underscore)
/// gets an underscore inserted before its lower-cased form.
pub fn to_snake(s: &str) -> String {
    let s = s.trim();
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_underscore = false;
    for (i, c) in s.chars().enumerate() {
        if is_delim(c) {
            if !prev_underscore {
                out.push('_');
                prev_underscore = true;
            }
            continue;
        }
        if c.is_uppercase() {
            if i > 0 && !prev_underscore {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
        prev_underscore = false;
    }
    while out.contains("__") {
        out = out.replace("__", "_");
    }
    out.trim_matches('_').to_string()
}

/// Strip all delimiters from `s` without touching letter case.
pub fn remove_delims(s: &str) -> String {
    s.chars().filter(|&c| !is_delim(c)).collect()
}
