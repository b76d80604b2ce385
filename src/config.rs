// ==============================================================================
// Configuration: YAML Model and Validation
// ==============================================================================
//
// The YAML shape mirrors the two config sections consumers write:
//
//     dryRun: false
//     import:
//       dir: shared/proto
//       prune: true
//       keep:
//         files:
//           - file: hero.proto
//             keep: [Hero]
//         types:
//           - type: Hero
//             keep: [id, name]
//     export:
//       dir: out/proto
//       language: csharp
//       namespace: Game.Gen
//       fileNameCase: camel
//       fieldNameCase: snake
//       protogen: protoc        # optional external generator
//
// Raw deserialized structs are validated and flattened into `Settings`, the
// resolved form the rest of the pipeline consumes. Configuration errors are
// fatal before any schema file is touched.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde::Deserialize;

use crate::casing::CaseMode;
use crate::error::PruneError;
use crate::model::{self, SeedEntry};

/// Target language for the emitted namespace/package option. Closed set;
/// anything else is a configuration error at deserialize time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(alias = "cs", alias = "c#")]
    Csharp,
    #[serde(alias = "golang")]
    Go,
    Lua,
}

/// One seed file and, optionally, the top-level definitions to retain from
/// it. An absent/empty keep list retains every definition.
#[derive(Debug, Clone, Deserialize)]
pub struct FileRule {
    pub file: String,
    #[serde(default)]
    pub keep: Vec<String>,
}

/// Fields to retain for one message type, addressed by simple or
/// package-qualified name.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeRule {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub keep: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeepSection {
    #[serde(default)]
    pub files: Vec<FileRule>,
    #[serde(default)]
    pub types: Vec<TypeRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportSection {
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub prune: Option<bool>,
    #[serde(default)]
    pub keep: KeepSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSection {
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub file_name_case: Option<CaseMode>,
    #[serde(default)]
    pub field_name_case: Option<CaseMode>,
    #[serde(default)]
    pub protogen: Option<String>,
}

/// Raw top-level config as written in YAML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub dry_run: Option<bool>,
    #[serde(default)]
    pub import: ImportSection,
    #[serde(default)]
    pub export: ExportSection,
}

/// The two keep-directive surfaces: per-seed retained definition names and
/// per-type retained field names. Absence means "retain all".
#[derive(Debug, Clone, Default)]
pub struct KeepDirectives {
    /// Keyed by lower-cased seed base name — the same key the dependency
    /// resolver dedupes on.
    per_seed: HashMap<String, IndexSet<String>>,
    /// Keyed by simple or package-qualified type name.
    per_type: HashMap<String, IndexSet<String>>,
}

impl KeepDirectives {
    pub fn new(
        per_seed: HashMap<String, IndexSet<String>>,
        per_type: HashMap<String, IndexSet<String>>,
    ) -> Self {
        KeepDirectives { per_seed, per_type }
    }

    /// The retained def names for a seed, or `None` to retain all.
    pub fn seed_keep(&self, seed: &SeedEntry) -> Option<&IndexSet<String>> {
        self.per_seed.get(&seed.key())
    }

    /// The retained field names for a type. Simple name is tried first, then
    /// the package-qualified name; `None` retains all fields.
    pub fn type_keep(&self, package: &str, name: &str) -> Option<&IndexSet<String>> {
        if let Some(set) = self.per_type.get(name) {
            return Some(set);
        }
        if package.is_empty() {
            return None;
        }
        self.per_type.get(&format!("{package}.{name}"))
    }

    pub fn is_empty(&self) -> bool {
        self.per_seed.is_empty() && self.per_type.is_empty()
    }
}

/// Fully resolved settings, ready for the pipeline.
#[derive(Debug, Clone)]
pub struct Settings {
    pub import_dir: Option<PathBuf>,
    pub export_dir: PathBuf,
    pub language: Language,
    /// Namespace for the emitted option line; empty emits no option.
    pub namespace: String,
    pub file_name_case: CaseMode,
    pub field_name_case: CaseMode,
    pub prune: bool,
    pub dry_run: bool,
    /// Optional external code generator executable.
    pub protogen: Option<PathBuf>,
    /// Root for search-root discovery over the working tree.
    pub work_dir: PathBuf,
    pub seeds: Vec<SeedEntry>,
    pub keep: KeepDirectives,
}

impl Settings {
    /// Read and validate a YAML config file.
    pub fn load(path: &Path) -> Result<Settings, PruneError> {
        let data = fs::read_to_string(path)
            .map_err(|e| PruneError::Config(format!("cannot open {}: {e}", path.display())))?;
        let config: Config = serde_yaml::from_str(&data)
            .map_err(|e| PruneError::Config(format!("{}: {e}", path.display())))?;
        Settings::from_config(config)
    }

    /// Validate and flatten a raw config.
    pub fn from_config(config: Config) -> Result<Settings, PruneError> {
        let language = config.export.language.ok_or_else(|| {
            PruneError::Config(
                "export.language is required (one of: csharp/cs/c#, go/golang, lua)".into(),
            )
        })?;

        let file_list: Vec<String> = config
            .import
            .keep
            .files
            .iter()
            .map(|rule| rule.file.clone())
            .collect();
        let seeds = model::seeds_from_list(&file_list)?;

        let mut per_seed: HashMap<String, IndexSet<String>> = HashMap::new();
        for rule in &config.import.keep.files {
            let Ok(entry) = SeedEntry::normalize(rule.file.trim()) else {
                continue;
            };
            let mut key = entry.key();
            if !key.ends_with(".proto") {
                key.push_str(".proto");
            }
            let names: IndexSet<String> = rule
                .keep
                .iter()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect();
            if !names.is_empty() {
                per_seed.entry(key).or_default().extend(names);
            }
        }

        let mut per_type: HashMap<String, IndexSet<String>> = HashMap::new();
        for rule in &config.import.keep.types {
            let type_name = rule.type_name.trim();
            if type_name.is_empty() {
                continue;
            }
            let fields: IndexSet<String> = rule
                .keep
                .iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
            if !fields.is_empty() {
                per_type.insert(type_name.to_string(), fields);
            }
        }

        Ok(Settings {
            import_dir: config.import.dir.filter(|d| !d.is_empty()).map(PathBuf::from),
            export_dir: config
                .export
                .dir
                .filter(|d| !d.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            language,
            namespace: config.export.namespace.unwrap_or_default(),
            file_name_case: config.export.file_name_case.unwrap_or_default(),
            field_name_case: config.export.field_name_case.unwrap_or_default(),
            prune: config.import.prune.unwrap_or(true),
            dry_run: config.dry_run.unwrap_or(false),
            protogen: config.export.protogen.filter(|p| !p.is_empty()).map(PathBuf::from),
            work_dir: PathBuf::from("."),
            seeds,
            keep: KeepDirectives::new(per_seed, per_type),
        })
    }
}
