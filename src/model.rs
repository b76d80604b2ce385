// ==============================================================================
// File Model: Parsed Schema Files and Seed Entries
// ==============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use miette::NamedSource;

use crate::error::{LexicalDiagnostic, PruneError};
use crate::scanner::{self, DefKind};

/// One parsed `.proto` file. Immutable once built.
#[derive(Debug)]
pub struct SchemaFile {
    pub path: PathBuf,
    /// Dotted package identifier; empty when the file declares none.
    pub package: String,
    /// Syntax version; `proto3` when the file declares none.
    pub syntax: String,
    /// Top-level definitions in source order.
    pub defs: Vec<TopLevelDef>,
}

/// A top-level `message`/`enum`/`extend` block, name-unique within its file.
#[derive(Debug)]
pub struct TopLevelDef {
    pub kind: DefKind,
    pub name: String,
    /// Exact source text, keyword through closing brace. Nested blocks stay
    /// embedded here and are never tracked separately.
    pub text: String,
    /// Outbound type-reference tokens collected from field positions.
    pub refs: Vec<String>,
}

/// Read and parse one schema file into its model form.
///
/// An unreadable file is fatal (the dependency resolver already decided this
/// file belongs to the closure), and so is a definition block that never
/// closes — that one carries a source span pointing at the offending keyword.
pub fn parse_schema_file(path: &Path) -> miette::Result<SchemaFile> {
    let content = fs::read_to_string(path).map_err(|source| {
        miette::Report::new(PruneError::Read {
            path: path.to_path_buf(),
            source,
        })
    })?;

    let blocks = scanner::scan_top_level_blocks(&content).map_err(|unclosed| {
        let label_len = unclosed.kind.as_str().len() + 1 + unclosed.name.len();
        let label_len = label_len.min(content.len().saturating_sub(unclosed.at)).max(1);
        miette::Report::new(LexicalDiagnostic {
            src: NamedSource::new(path.display().to_string(), content.clone()),
            span: (unclosed.at, label_len).into(),
            message: format!(
                "{} `{}` is never closed",
                unclosed.kind.as_str(),
                unclosed.name
            ),
        })
    })?;

    let stripped = scanner::strip_comments(&content);
    let syntax = scanner::extract_syntax(&stripped);
    let package = scanner::extract_package(&stripped);

    let defs = blocks
        .into_iter()
        .map(|b| {
            let refs = scanner::collect_type_tokens(b.body(&content));
            TopLevelDef {
                kind: b.kind,
                name: b.name.clone(),
                text: b.text(&content).to_string(),
                refs,
            }
        })
        .collect();

    Ok(SchemaFile {
        path: path.to_path_buf(),
        package,
        syntax,
        defs,
    })
}

/// A normalized handle to a starting file, before seed resolution.
#[derive(Debug, Clone)]
pub struct SeedEntry {
    /// The configured path, forward slashes, no leading `./` or root slash.
    pub path: PathBuf,
    /// Directory component; empty when the entry is a bare file name.
    pub dir: PathBuf,
    /// Base file name.
    pub base: String,
}

impl SeedEntry {
    /// Normalize a raw path string into a seed entry.
    pub fn normalize(raw: &str) -> Result<SeedEntry, PruneError> {
        let mut s = raw.trim();
        s = s.strip_prefix("./").unwrap_or(s);
        s = s.trim_start_matches(['/', '\\']);
        if s.is_empty() {
            return Err(PruneError::SeedResolution("empty schema entry".into()));
        }
        let path = PathBuf::from(s);
        let base = path
            .file_name()
            .map(|b| b.to_string_lossy().into_owned())
            .ok_or_else(|| PruneError::SeedResolution(format!("no file name in `{raw}`")))?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(SeedEntry { path, dir, base })
    }

    /// Wrap an on-disk path discovered during resolution. Unlike
    /// [`SeedEntry::normalize`] this keeps the path verbatim, so absolute
    /// paths survive.
    pub fn from_path(path: &Path) -> Option<SeedEntry> {
        let base = path.file_name()?.to_string_lossy().into_owned();
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Some(SeedEntry {
            path: path.to_path_buf(),
            dir,
            base,
        })
    }

    /// Lower-cased base name — the deduplication key used throughout.
    /// Two files sharing a base name across directories are one logical
    /// import target, matching search-path import resolution.
    pub fn key(&self) -> String {
        self.base.to_lowercase()
    }
}

/// Normalize configured seed names into entries. Bare names without an
/// extension get `.proto` appended; duplicates (by lower-cased base name)
/// keep their first occurrence.
pub fn seeds_from_list(list: &[String]) -> Result<Vec<SeedEntry>, PruneError> {
    let mut seeds: Vec<SeedEntry> = Vec::new();
    for raw in list {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut name = trimmed.to_string();
        if !name.to_lowercase().ends_with(".proto") {
            name.push_str(".proto");
        }
        let entry = SeedEntry::normalize(&name)?;
        if !seeds.iter().any(|s| s.key() == entry.key()) {
            seeds.push(entry);
        }
    }
    if seeds.is_empty() {
        return Err(PruneError::SeedResolution(
            "no seed files configured".into(),
        ));
    }
    Ok(seeds)
}
