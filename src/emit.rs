// ==============================================================================
// Text Resynthesis: Import Recomputation, Assembly, Sanitization
// ==============================================================================
//
// Rebuilds each closure file's text from the definitions that actually
// survived pruning. Imports are *recomputed*, never copied: a retained
// field's type resolving into a different file makes that file's re-cased
// output name an import; a well-known type adds its canonical import path;
// pruned-away types generate nothing. A file with zero retained defs still
// emits a minimal stub so every closure file has exactly one output artifact
// and no emitted import dangles.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

use crate::casing::CaseMode;
use crate::config::{KeepDirectives, Language};
use crate::model::SchemaFile;
use crate::prune::prune_message_fields;
use crate::resolve::{well_known_import, Resolution, SymbolIndex};
use crate::scanner::{self, DefKind};

/// Knobs for the assembly step, straight from the export config.
pub struct EmitOptions<'a> {
    pub language: Language,
    pub namespace: &'a str,
    pub file_name_case: CaseMode,
    pub field_name_case: CaseMode,
}

/// The output artifact name for a schema file: re-cased stem plus extension.
pub fn output_file_name(path: &Path, mode: CaseMode) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}.proto", mode.apply(&stem))
}

/// Assemble the sanitized output text for one closure file.
///
/// `chosen` is the retained def-name set; `None` or empty produces a stub
/// (syntax/package/namespace only).
pub fn assemble_file(
    pf: &SchemaFile,
    chosen: Option<&IndexSet<String>>,
    index: &SymbolIndex<'_>,
    keep: &KeepDirectives,
    opts: &EmitOptions<'_>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("syntax = \"{}\";\n\n", pf.syntax));
    if !pf.package.is_empty() {
        out.push_str(&format!("package {};\n\n", pf.package));
    }

    let chosen = match chosen {
        Some(set) if !set.is_empty() => set,
        _ => {
            push_namespace_option(&mut out, opts);
            return sanitize(&out);
        }
    };

    // Pruned and re-cased text of every retained def, in source order.
    let mut pruned_defs = Vec::new();
    for def in &pf.defs {
        if !chosen.contains(&def.name) {
            continue;
        }
        let mut text = match keep.type_keep(&pf.package, &def.name) {
            Some(keep_set) if def.kind == DefKind::Message => {
                prune_message_fields(&def.text, keep_set)
            }
            _ => def.text.clone(),
        };
        // The output keeps its own package, so internal references no longer
        // need the self-qualifying prefix.
        text = strip_self_package_qualifiers(&text, &pf.package);
        if def.kind == DefKind::Message {
            text = transform_field_names(&text, opts.field_name_case);
        }
        pruned_defs.push(text);
    }

    // Base names of types still referenced after field pruning. Only these
    // may generate imports — a pruned-away reference must not.
    let mut present: BTreeSet<String> = BTreeSet::new();
    for text in &pruned_defs {
        for token in scanner::collect_type_tokens(text) {
            present.insert(scanner::base_name(&token).to_string());
        }
    }

    let mut cross_imports: BTreeSet<String> = BTreeSet::new();
    let mut well_known_imports: BTreeSet<&'static str> = BTreeSet::new();
    for def in &pf.defs {
        if !chosen.contains(&def.name) {
            continue;
        }
        for token in &def.refs {
            let token = token.trim().trim_start_matches('.');
            if !present.contains(scanner::base_name(token)) {
                continue;
            }
            if let Some(import) = well_known_import(token) {
                well_known_imports.insert(import);
                continue;
            }
            if let Resolution::Def(target) = index.resolve(pf, token)
                && target.file != pf.path
            {
                cross_imports.insert(output_file_name(target.file, opts.file_name_case));
            }
        }
    }

    for import in &cross_imports {
        out.push_str(&format!("import \"{import}\";\n"));
    }
    for import in &well_known_imports {
        out.push_str(&format!("import \"{import}\";\n"));
    }
    if !cross_imports.is_empty() || !well_known_imports.is_empty() {
        out.push('\n');
    }

    push_namespace_option(&mut out, opts);

    for text in &pruned_defs {
        out.push_str(text);
        out.push_str("\n\n");
    }

    sanitize(&out)
}

/// Append the language-keyed namespace/package option line. Lua has no
/// namespace option syntax and emits nothing; an empty namespace emits
/// nothing for any language.
fn push_namespace_option(out: &mut String, opts: &EmitOptions<'_>) {
    if opts.namespace.is_empty() {
        return;
    }
    let line = match opts.language {
        Language::Csharp => format!("option csharp_namespace = \"{}\";", opts.namespace),
        Language::Go => format!("option go_package = \"{}\";", opts.namespace),
        Language::Lua => return,
    };
    out.push_str(&line);
    out.push_str("\n\n");
}

/// Remove `selfpkg.` prefixes from type references inside a definition.
fn strip_self_package_qualifiers(text: &str, package: &str) -> String {
    if package.trim().is_empty() {
        return text.to_string();
    }
    let re = Regex::new(&format!(r"\b{}\.([A-Za-z_]\w*)", regex::escape(package)))
        .expect("escaped package is a valid pattern");
    re.replace_all(text, "$1").into_owned()
}

static FIELD_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([\t ]*(?:repeated[\t ]+|optional[\t ]+)?(?:map\s*<[^>]+>|[^\s=]+)[\t ]+)([A-Za-z_]\w*)([\t ]*=\s*\d+.*;.*)$",
    )
    .expect("valid regex")
});

/// Re-case field identifiers on field-shaped lines of a message body.
fn transform_field_names(def: &str, mode: CaseMode) -> String {
    if mode == CaseMode::Keep {
        return def.to_string();
    }
    let Some(open) = def.find('{') else {
        return def.to_string();
    };
    let Some(close) = def.rfind('}') else {
        return def.to_string();
    };
    if close <= open {
        return def.to_string();
    }
    let head = &def[..=open];
    let body = &def[open + 1..close];
    let tail = &def[close..];

    let lines: Vec<String> = body
        .split('\n')
        .map(|line| match FIELD_LINE_RE.captures(line) {
            Some(caps) => format!("{}{}{}", &caps[1], mode.apply(&caps[2]), &caps[3]),
            None => line.to_string(),
        })
        .collect();
    format!("{}{}{}", head, lines.join("\n"), tail)
}

static RESERVED_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*reserved\b[^;]*;\s*$").expect("valid regex"));
static AFTER_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\r?\n[\t ]*\r?\n").expect("valid regex"));
static BEFORE_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[\t ]*\r?\n\}").expect("valid regex"));

/// Sanitize assembled output: strip comments (string-aware), drop `reserved`
/// lines, collapse blank-line runs to one, and remove blank lines just
/// inside block braces.
pub fn sanitize(text: &str) -> String {
    let no_comments = scanner::strip_comments(text);
    let no_reserved: Vec<&str> = no_comments
        .split('\n')
        .filter(|line| !RESERVED_LINE_RE.is_match(line))
        .collect();
    let compact = collapse_blank_lines(&no_reserved);
    let tightened = AFTER_OPEN_RE.replace_all(&compact, "{\n");
    BEFORE_CLOSE_RE.replace_all(&tightened, "\n}").into_owned()
}

/// Collapse blank-line runs to a single blank line, trim leading and
/// trailing blanks, and end with exactly one newline.
fn collapse_blank_lines(lines: &[&str]) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut prev_blank = true;
    for line in lines {
        if line.trim().is_empty() {
            if prev_blank {
                continue;
            }
            prev_blank = true;
            out.push("");
        } else {
            prev_blank = false;
            out.push(line);
        }
    }
    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }
    let mut joined = out.join("\n");
    joined.push('\n');
    joined
}
