// ==============================================================================
// Reachability Pruning: Selection Closure and Field-Level Keep Sets
// ==============================================================================
//
// Two layers of trimming. The selection closure decides which top-level
// definitions survive at all: seeds contribute their (possibly keep-filtered)
// defs, and a work queue follows type references until a fixed point. Field
// pruning then narrows a surviving `message` down to the fields a per-type
// keep set names. The two interact: a field dropped by a keep set must not
// pull its type into the closure, so the walk collects references from the
// *pruned* text, not the original.
//
// Field-statement boundaries are found by balanced, string-aware scanning to
// the next top-level `;`, which keeps `map<...>` angle brackets and aggregate
// option values (`option (x) = { ... };`) intact. Nested message/enum/extend
// blocks pass through whole; a `oneof` block is filtered member by member and
// dropped entirely when no member survives.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::config::KeepDirectives;
use crate::model::{SchemaFile, SeedEntry};
use crate::resolve::{Resolution, SymbolIndex};
use crate::scanner::{self, DefKind};

/// Per-file set of retained definition names. Grows monotonically during the
/// closure walk; never names a definition absent from its file.
#[derive(Debug, Default)]
pub struct Selection {
    per_file: IndexMap<PathBuf, IndexSet<String>>,
}

impl Selection {
    /// The retained names for one file, if any were selected.
    pub fn selected(&self, file: &Path) -> Option<&IndexSet<String>> {
        self.per_file.get(file).filter(|set| !set.is_empty())
    }

    pub fn contains(&self, file: &Path, name: &str) -> bool {
        self.per_file
            .get(file)
            .is_some_and(|set| set.contains(name))
    }

    /// Select every definition of every file — for `prune: false` runs.
    pub fn all(files: &IndexMap<PathBuf, SchemaFile>) -> Selection {
        let per_file = files
            .iter()
            .map(|(path, pf)| {
                let names = pf.defs.iter().map(|d| d.name.clone()).collect();
                (path.clone(), names)
            })
            .collect();
        Selection { per_file }
    }

    fn insert(&mut self, file: &Path, name: &str) -> bool {
        self.per_file
            .entry(file.to_path_buf())
            .or_default()
            .insert(name.to_string())
    }
}

/// Compute the reachable definition subset.
///
/// Seeding: a closure file that is a resolved seed contributes either the
/// defs its keep directive names or, absent a directive, all of its defs.
/// Non-seed files contribute nothing initially. The walk then resolves every
/// type reference of every selected def; resolutions landing on unselected
/// defs are enqueued (revisits are no-ops). Well-known types never enter the
/// selection — they become import obligations at emission time.
pub fn select(
    files: &IndexMap<PathBuf, SchemaFile>,
    index: &SymbolIndex<'_>,
    seeds: &[SeedEntry],
    keep: &KeepDirectives,
) -> Selection {
    let mut selection = Selection::default();
    let mut queue: VecDeque<(PathBuf, String)> = VecDeque::new();

    let seed_keys: HashMap<String, &SeedEntry> =
        seeds.iter().map(|s| (s.key(), s)).collect();

    for (path, pf) in files {
        let file_key = path
            .file_name()
            .map(|b| b.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let Some(seed) = seed_keys.get(&file_key) else {
            continue;
        };
        match keep.seed_keep(seed) {
            Some(names) => {
                for def in &pf.defs {
                    if names.contains(&def.name) && selection.insert(path, &def.name) {
                        queue.push_back((path.clone(), def.name.clone()));
                    }
                }
            }
            None => {
                for def in &pf.defs {
                    if selection.insert(path, &def.name) {
                        queue.push_back((path.clone(), def.name.clone()));
                    }
                }
            }
        }
    }

    while let Some((path, name)) = queue.pop_front() {
        let Some(pf) = files.get(&path) else {
            continue;
        };
        let Some(def) = pf.defs.iter().find(|d| d.name == name) else {
            continue;
        };

        // References are collected from the field-pruned text so that a
        // dropped field cannot pull its type into the closure.
        let text = match keep.type_keep(&pf.package, &def.name) {
            Some(keep_set) if def.kind == DefKind::Message => {
                prune_message_fields(&def.text, keep_set)
            }
            _ => def.text.clone(),
        };

        for token in scanner::collect_type_tokens(&text) {
            match index.resolve(pf, &token) {
                Resolution::Def(target) => {
                    if selection.insert(target.file, &target.def.name) {
                        queue.push_back((target.file.to_path_buf(), target.def.name.clone()));
                    }
                }
                Resolution::WellKnown(_) => {}
                Resolution::Unresolved => {
                    debug!("unresolved type reference `{token}` in {}", path.display());
                }
            }
        }
    }

    selection
}

/// Filter a message block's fields down to `keep_set`.
///
/// Nested message/enum/extend blocks pass through whole; oneof blocks are
/// filtered member by member (the whole block goes when no member survives);
/// ordinary field statements survive only when their name is kept.
pub fn prune_message_fields(def: &str, keep_set: &IndexSet<String>) -> String {
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

    let mut out = String::with_capacity(def.len());
    out.push_str(head);

    let bytes = body.as_bytes();
    let n = bytes.len();
    let mut cur = 0;
    while cur < n {
        while cur < n && matches!(bytes[cur], b' ' | b'\t' | b'\r' | b'\n') {
            out.push(bytes[cur] as char);
            cur += 1;
        }
        if cur >= n {
            break;
        }

        let (kw, after_kw) = scanner::read_keyword(body, cur);
        match kw {
            "oneof" => {
                let (_, after_name) = scanner::read_ident_after(body, after_kw);
                let (_, blk_end) = scanner::find_block(body, after_name);
                if blk_end <= after_name {
                    out.push_str(&body[cur..]);
                    break;
                }
                let kept = prune_oneof_fields(&body[cur..blk_end], keep_set);
                if !kept.trim().is_empty() {
                    out.push_str(&kept);
                }
                cur = blk_end;
            }
            "message" | "enum" | "extend" => {
                let (_, after_name) = scanner::read_ident_after(body, after_kw);
                let (_, blk_end) = scanner::find_block(body, after_name);
                if blk_end <= after_name {
                    out.push_str(&body[cur..]);
                    break;
                }
                // Nested blocks are always preserved whole.
                out.push_str(&body[cur..blk_end]);
                cur = blk_end;
            }
            _ => {
                let stmt_end = statement_end(body, cur);
                let stmt = &body[cur..stmt_end];
                if keep_field_stmt(stmt, keep_set) {
                    out.push_str(stmt);
                }
                cur = stmt_end;
            }
        }
    }

    out.push_str(tail);
    drop_blank_body_lines(&out)
}

/// Advance to one past the next `;` at brace depth zero, string-aware.
fn statement_end(body: &str, mut cur: usize) -> usize {
    let bytes = body.as_bytes();
    let n = bytes.len();
    let mut depth = 0usize;
    while cur < n {
        match bytes[cur] {
            b'"' => {
                cur += 1;
                while cur < n {
                    match bytes[cur] {
                        b'\\' => cur += 2,
                        b'"' => {
                            cur += 1;
                            break;
                        }
                        _ => cur += 1,
                    }
                }
            }
            b'{' => {
                depth += 1;
                cur += 1;
            }
            b'}' => {
                depth = depth.saturating_sub(1);
                cur += 1;
            }
            b';' if depth == 0 => return cur + 1,
            _ => cur += 1,
        }
    }
    n
}

/// The field name of an ordinary `... name = number ...;` statement, or
/// `None` when the statement has no field shape.
fn field_name(stmt: &str) -> Option<&str> {
    let s = stmt.trim();
    if s.is_empty() || !s.ends_with(';') {
        return None;
    }
    let eq = s.find('=')?;
    if eq == 0 {
        return None;
    }
    let name = scanner::last_ident(&s[..eq]);
    if name.is_empty() { None } else { Some(name) }
}

/// Should this statement survive the keep set? Anything that is not an
/// ordinary field passes through untouched.
fn keep_field_stmt(stmt: &str, keep_set: &IndexSet<String>) -> bool {
    if keep_set.is_empty() {
        return true;
    }
    match field_name(stmt) {
        Some(name) => keep_set.contains(name),
        None => true,
    }
}

/// Filter a oneof block's members statement by statement, brace-aware, so
/// layout (one line or many) does not matter. Returns the empty string when
/// no member survives, which drops the block entirely.
fn prune_oneof_fields(block: &str, keep_set: &IndexSet<String>) -> String {
    if keep_set.is_empty() {
        return block.to_string();
    }
    let Some(open) = block.find('{') else {
        return block.to_string();
    };
    let Some(close) = block.rfind('}') else {
        return block.to_string();
    };
    if close <= open {
        return block.to_string();
    }
    let head = &block[..=open];
    let body = &block[open + 1..close];
    let tail = &block[close..];

    let mut out = String::with_capacity(block.len());
    out.push_str(head);

    let bytes = body.as_bytes();
    let n = bytes.len();
    let mut cur = 0;
    let mut kept = 0usize;
    while cur < n {
        while cur < n && matches!(bytes[cur], b' ' | b'\t' | b'\r' | b'\n') {
            out.push(bytes[cur] as char);
            cur += 1;
        }
        if cur >= n {
            break;
        }
        let stmt_end = statement_end(body, cur);
        let stmt = &body[cur..stmt_end];
        match field_name(stmt) {
            Some(name) if keep_set.contains(name) => {
                out.push_str(stmt);
                kept += 1;
            }
            Some(_) => {}
            None => out.push_str(stmt),
        }
        cur = stmt_end;
    }
    if kept == 0 {
        return String::new();
    }
    out.push_str(tail);
    out
}

/// Remove blank lines from the region between the outermost braces, keeping
/// one line break after `{` and before `}`.
fn drop_blank_body_lines(def: &str) -> String {
    let Some(open) = def.find('{') else {
        return def.to_string();
    };
    let Some(close) = def.rfind('}') else {
        return def.to_string();
    };
    if close <= open {
        return def.to_string();
    }
    let inner = &def[open + 1..close];
    let cleaned: Vec<&str> = inner
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect();
    if cleaned.is_empty() {
        return format!("{}\n{}", &def[..=open], &def[close..]);
    }
    format!("{}\n{}\n{}", &def[..=open], cleaned.join("\n"), &def[close..])
}
