// ==============================================================================
// Import Resolution and Transitive Closure
// ==============================================================================
//
// Starting from the configured seed files, this module computes the full
// import closure: every file reachable by following `import "X";` statements,
// resolved against an ordered list of search roots. Deduplication is by
// lower-cased base file name, not full path — two files sharing a base name
// across directories are one logical import target, which is how search-path
// import resolution behaves in practice.
//
// Failure policy here is permissive: an import that resolves nowhere is
// silently dropped (the file is simply absent from the closure), and a seed
// that cannot be located is still enqueued — it fails later, at parse time,
// if it remains unreadable.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use walkdir::WalkDir;

use crate::model::SeedEntry;

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s+(?:public\s+|weak\s+)?"([^"]+)"\s*;"#).expect("valid regex")
});

/// Ordered directories searched when resolving imports and relocating seeds.
///
/// Built once per run from the seed directories, the explicit import root
/// (recursively), and the working tree (recursively). Not global state — the
/// resolver takes it explicitly.
pub struct SearchRoots {
    roots: Vec<PathBuf>,
}

impl SearchRoots {
    /// Discover search roots: each seed's own directory, then every
    /// directory under `import_dir`, then every directory under `work_dir`,
    /// then `work_dir` itself. Duplicates (after path cleaning) collapse to
    /// their first occurrence.
    pub fn discover(seeds: &[SeedEntry], import_dir: Option<&Path>, work_dir: &Path) -> Self {
        let mut roots: Vec<PathBuf> = Vec::new();
        let mut push = |p: PathBuf| {
            if !roots.contains(&p) {
                roots.push(p);
            }
        };
        for seed in seeds {
            if seed.dir.as_os_str().is_empty() {
                continue;
            }
            push(seed.dir.clone());
        }
        if let Some(dir) = import_dir {
            for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
                if entry.file_type().is_dir() {
                    push(entry.path().to_path_buf());
                }
            }
        }
        for entry in WalkDir::new(work_dir).into_iter().filter_map(Result::ok) {
            if entry.file_type().is_dir() {
                push(entry.path().to_path_buf());
            }
        }
        push(work_dir.to_path_buf());
        SearchRoots { roots }
    }

    /// Resolve a relative path against (1) `current_dir`, then (2) each
    /// search root in order. First hit wins; `None` when nothing exists.
    pub fn resolve(&self, rel: &Path, current_dir: &Path) -> Option<PathBuf> {
        if !current_dir.as_os_str().is_empty() {
            let candidate = current_dir.join(rel);
            if candidate.exists() {
                return Some(candidate);
            }
        }
        self.roots
            .iter()
            .map(|root| root.join(rel))
            .find(|candidate| candidate.exists())
    }
}

/// The computed import closure: all reachable files plus the seeds
/// re-resolved to on-disk paths.
pub struct Closure {
    /// Every file in the closure, sorted by case-insensitive base name for
    /// reproducible downstream ordering.
    pub files: Vec<SeedEntry>,
    /// The seed entries, relocated to actual paths where possible.
    pub seeds: Vec<SeedEntry>,
}

/// Breadth-first import closure over the seeds.
///
/// Seeds are enqueued first so they are always part of the closure even when
/// nothing imports them. Each dequeued file contributes the imports its text
/// declares; unresolvable imports are dropped without error.
pub fn collect_closure(seeds: &[SeedEntry], roots: &SearchRoots) -> Closure {
    let mut seen: IndexMap<String, SeedEntry> = IndexMap::new();
    let mut queue: Vec<SeedEntry> = Vec::new();

    let mut push = |entry: SeedEntry, queue: &mut Vec<SeedEntry>, seen: &mut IndexMap<String, SeedEntry>| {
        let key = entry.key();
        if seen.contains_key(&key) {
            return;
        }
        seen.insert(key, entry.clone());
        queue.push(entry);
    };

    let mut resolved_seeds = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let entry = relocate(seed, roots);
        push(entry.clone(), &mut queue, &mut seen);
        resolved_seeds.push(entry);
    }

    let mut head = 0;
    while head < queue.len() {
        let current = queue[head].clone();
        head += 1;

        let path = if current.path.exists() {
            current.path.clone()
        } else {
            match roots.resolve(Path::new(&current.base), &current.dir) {
                Some(p) => p,
                None => current.path.clone(),
            }
        };
        let Ok(text) = fs::read_to_string(&path) else {
            debug!("skipping unreadable closure candidate {}", path.display());
            continue;
        };

        for caps in IMPORT_RE.captures_iter(&text) {
            let imported = caps[1].trim();
            let Some(found) = roots.resolve(Path::new(imported), &current.dir) else {
                debug!(
                    "unresolved import `{imported}` in {} — dropped",
                    path.display()
                );
                continue;
            };
            if let Some(entry) = SeedEntry::from_path(&found) {
                push(entry, &mut queue, &mut seen);
            }
        }
    }

    let mut files: Vec<SeedEntry> = seen.into_values().collect();
    files.sort_by_key(SeedEntry::key);

    Closure {
        files,
        seeds: resolved_seeds,
    }
}

/// Re-resolve a seed whose configured path does not exist verbatim: try its
/// own directory, then each search root, using the base name. A seed that
/// still resolves nowhere is returned unchanged — it fails at parse time.
fn relocate(seed: &SeedEntry, roots: &SearchRoots) -> SeedEntry {
    if seed.path.exists() {
        return seed.clone();
    }
    match roots.resolve(Path::new(&seed.base), &seed.dir) {
        Some(found) => SeedEntry::from_path(&found).unwrap_or_else(|| seed.clone()),
        None => {
            debug!("seed {} not found under any search root", seed.base);
            seed.clone()
        }
    }
}
