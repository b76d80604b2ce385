// ==============================================================================
// Shared Test Helpers
// ==============================================================================
//
// Fixture-tree builders used across the integration test files.
//
// Each test file that imports this module compiles its own copy, so not every
// function is used in every binary. Suppress the resulting dead_code warnings.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use prototrim::casing::CaseMode;
use prototrim::config::{KeepDirectives, Language, Settings};
use prototrim::model;

/// Write `content` at `rel` under `root`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture directory");
    }
    fs::write(&path, content).expect("write fixture file");
    path
}

/// Settings for a pipeline run rooted at `work`: csharp, camel file names,
/// unchanged field names, pruning on. Tests tweak the returned value.
pub fn settings(work: &Path, export: &Path, seed_names: &[&str]) -> Settings {
    let list: Vec<String> = seed_names.iter().map(|s| s.to_string()).collect();
    Settings {
        import_dir: None,
        export_dir: export.to_path_buf(),
        language: Language::Csharp,
        namespace: "Game.Gen".to_string(),
        file_name_case: CaseMode::Camel,
        field_name_case: CaseMode::Keep,
        prune: true,
        dry_run: false,
        protogen: None,
        work_dir: work.to_path_buf(),
        seeds: model::seeds_from_list(&list).expect("non-empty seed list"),
        keep: KeepDirectives::default(),
    }
}

/// Keep directives retaining only the named fields per type.
pub fn keep_types(rules: &[(&str, &[&str])]) -> KeepDirectives {
    let per_type = rules
        .iter()
        .map(|(type_name, fields)| {
            let set = fields.iter().map(|f| f.to_string()).collect();
            (type_name.to_string(), set)
        })
        .collect();
    KeepDirectives::new(std::collections::HashMap::new(), per_type)
}

/// Keep directives retaining only the named defs per seed file (keyed by
/// lower-cased base name).
pub fn keep_files(rules: &[(&str, &[&str])]) -> KeepDirectives {
    let per_seed = rules
        .iter()
        .map(|(base, names)| {
            let set = names.iter().map(|n| n.to_string()).collect();
            (base.to_lowercase(), set)
        })
        .collect();
    KeepDirectives::new(per_seed, std::collections::HashMap::new())
}

/// Read an output artifact to a string.
pub fn read_output(export: &Path, name: &str) -> String {
    let path = export.join(name);
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
}
