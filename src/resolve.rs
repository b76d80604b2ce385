// ==============================================================================
// Symbol Index: Qualified and Simple-Name Resolution
// ==============================================================================
//
// Built once over all files in the import closure. Two maps: an exact
// qualified-name map (`package.Name`) and a simple-name map collecting every
// definition sharing a bare name. Resolution of a type token follows a fixed
// ladder (scalar, local, package-qualified, explicit qualification,
// well-known, simple-name fallback); the simple-name fallback only resolves
// when exactly one candidate exists — ambiguity is treated as unresolved, not
// as an error. That permissiveness is deliberate: it degrades output
// completeness instead of aborting an iterative trimming workflow.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::model::{SchemaFile, TopLevelDef};
use crate::scanner::base_name;

/// Proto scalar type keywords — never user types.
const SCALARS: &[&str] = &[
    "double", "float", "int32", "int64", "uint32", "uint64", "sint32", "sint64", "fixed32",
    "fixed64", "sfixed32", "sfixed64", "bool", "string", "bytes",
];

/// Well-known standard types, assumed present in every target environment.
/// Referenced via canonical import, never copied into the closure.
const WELL_KNOWN: &[(&str, &str)] = &[
    ("google.protobuf.Timestamp", "google/protobuf/timestamp.proto"),
    ("google.protobuf.Duration", "google/protobuf/duration.proto"),
    ("google.protobuf.Any", "google/protobuf/any.proto"),
    ("google.protobuf.Empty", "google/protobuf/empty.proto"),
    ("google.protobuf.Struct", "google/protobuf/struct.proto"),
    ("google.protobuf.Value", "google/protobuf/struct.proto"),
    ("google.protobuf.ListValue", "google/protobuf/struct.proto"),
    ("google.protobuf.Int32Value", "google/protobuf/wrappers.proto"),
    ("google.protobuf.Int64Value", "google/protobuf/wrappers.proto"),
    ("google.protobuf.UInt32Value", "google/protobuf/wrappers.proto"),
    ("google.protobuf.UInt64Value", "google/protobuf/wrappers.proto"),
    ("google.protobuf.FloatValue", "google/protobuf/wrappers.proto"),
    ("google.protobuf.DoubleValue", "google/protobuf/wrappers.proto"),
    ("google.protobuf.StringValue", "google/protobuf/wrappers.proto"),
    ("google.protobuf.BoolValue", "google/protobuf/wrappers.proto"),
    ("google.protobuf.BytesValue", "google/protobuf/wrappers.proto"),
];

pub fn is_scalar(token: &str) -> bool {
    SCALARS.contains(&token)
}

/// The canonical import path for a well-known type token, if it is one.
pub fn well_known_import(token: &str) -> Option<&'static str> {
    let t = token.trim().trim_start_matches('.');
    WELL_KNOWN
        .iter()
        .find(|(name, _)| *name == t)
        .map(|(_, path)| *path)
}

/// A resolved definition: the file that declares it plus the definition.
#[derive(Clone, Copy)]
pub struct DefRef<'a> {
    pub file: &'a Path,
    pub def: &'a TopLevelDef,
}

/// Outcome of resolving one type token.
pub enum Resolution<'a> {
    /// A definition inside the closure.
    Def(DefRef<'a>),
    /// A well-known external type; carries its canonical import path.
    WellKnown(&'static str),
    /// Scalar, ambiguous, or unknown — dropped from the closure walk.
    Unresolved,
}

/// Name index over every file in the closure.
pub struct SymbolIndex<'a> {
    files: &'a IndexMap<PathBuf, SchemaFile>,
    qualified: HashMap<String, DefRef<'a>>,
    simple: HashMap<String, Vec<DefRef<'a>>>,
    packages: HashSet<String>,
}

impl<'a> SymbolIndex<'a> {
    /// Index all top-level definitions of all closure files.
    pub fn build(files: &'a IndexMap<PathBuf, SchemaFile>) -> Self {
        let mut qualified = HashMap::new();
        let mut simple: HashMap<String, Vec<DefRef<'a>>> = HashMap::new();
        let mut packages = HashSet::new();

        for (path, pf) in files {
            if !pf.package.is_empty() {
                packages.insert(pf.package.clone());
            }
            for def in &pf.defs {
                let def_ref = DefRef { file: path, def };
                if !pf.package.is_empty() {
                    qualified.insert(format!("{}.{}", pf.package, def.name), def_ref);
                }
                simple.entry(def.name.clone()).or_default().push(def_ref);
            }
        }

        SymbolIndex {
            files,
            qualified,
            simple,
            packages,
        }
    }

    /// Resolve a type token referenced from `from` (the file containing the
    /// reference). See the module comment for the resolution ladder.
    pub fn resolve(&self, from: &SchemaFile, token: &str) -> Resolution<'a> {
        let t = token.trim().trim_start_matches('.');
        if t.is_empty() || is_scalar(t) {
            return Resolution::Unresolved;
        }
        let base = base_name(t);

        // Local resolution wins: a def of the same base name declared in the
        // referencing file itself.
        if let Some((_, path, pf)) = self.files.get_full(&from.path)
            && let Some(def) = pf.defs.iter().find(|d| d.name == base)
        {
            return Resolution::Def(DefRef { file: path, def });
        }

        let parts: Vec<&str> = t.split('.').collect();
        if parts.len() == 1 {
            // Unqualified: try the referencing file's own package.
            if !from.package.is_empty()
                && let Some(&def_ref) = self.qualified.get(&format!("{}.{}", from.package, t))
            {
                return Resolution::Def(def_ref);
            }
        } else {
            // Qualified: try every dotted prefix that names a known package,
            // longest first.
            for split in (1..parts.len()).rev() {
                let prefix = parts[..split].join(".");
                if !self.packages.contains(&prefix) {
                    continue;
                }
                if let Some(&def_ref) = self
                    .qualified
                    .get(&format!("{}.{}", prefix, parts[split]))
                {
                    return Resolution::Def(def_ref);
                }
            }
        }

        if let Some(import) = well_known_import(t) {
            return Resolution::WellKnown(import);
        }

        // Simple-name fallback: exactly one candidate or nothing.
        match self.simple.get(base) {
            Some(candidates) if candidates.len() == 1 => Resolution::Def(candidates[0]),
            _ => Resolution::Unresolved,
        }
    }
}
