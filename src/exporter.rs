// ==============================================================================
// Export Pipeline: Config → Closure → Index → Prune → Emit → Write
// ==============================================================================
//
// Single-threaded, synchronous. Everything is rebuilt fresh per run and
// discarded afterward; the only cross-run state is the written output files.
// Dry mode suppresses every filesystem mutation, replacing each with a
// logged description, without changing any in-memory computation.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info};
use miette::Context;

use crate::config::{KeepDirectives, Settings};
use crate::emit::{self, EmitOptions};
use crate::error::PruneError;
use crate::generator;
use crate::import::{self, SearchRoots};
use crate::model::{self, SchemaFile};
use crate::prune::{self, Selection};
use crate::resolve::SymbolIndex;

/// Side-effect gate for filesystem mutations. In dry mode every mutation is
/// logged instead of performed.
pub struct Workspace {
    dry: bool,
}

impl Workspace {
    pub fn new(dry: bool) -> Self {
        Workspace { dry }
    }

    pub fn is_dry(&self) -> bool {
        self.dry
    }

    pub fn create_dir_all(&self, dir: &Path) -> Result<(), PruneError> {
        if self.dry {
            info!("[dry] mkdir -p {}", dir.display());
            return Ok(());
        }
        fs::create_dir_all(dir).map_err(|source| PruneError::Write {
            path: dir.to_path_buf(),
            source,
        })
    }

    pub fn write(&self, path: &Path, content: &str) -> Result<(), PruneError> {
        if self.dry {
            info!("[dry] write {}", path.display());
            return Ok(());
        }
        debug!("write {}", path.display());
        fs::write(path, content).map_err(|source| PruneError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn remove_file(&self, path: &Path) -> Result<(), PruneError> {
        if self.dry {
            info!("[dry] rm {}", path.display());
            return Ok(());
        }
        info!("remove stale artifact {}", path.display());
        fs::remove_file(path).map_err(|source| PruneError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// What a run produced (or, in dry mode, would have produced).
#[derive(Debug)]
pub struct ExportReport {
    /// Output artifact paths, one per closure file, in emission order.
    pub written: Vec<PathBuf>,
    pub dry_run: bool,
}

/// The export pipeline, configured once and runnable.
///
/// ```no_run
/// use prototrim::Exporter;
///
/// let report = Exporter::from_config_path("export.proto.yaml".as_ref())?.run()?;
/// for path in &report.written {
///     println!("{}", path.display());
/// }
/// # Ok::<(), miette::Report>(())
/// ```
pub struct Exporter {
    settings: Settings,
}

impl Exporter {
    /// Load settings from a YAML config file.
    pub fn from_config_path(path: &Path) -> miette::Result<Self> {
        let settings = Settings::load(path).map_err(miette::Report::new)?;
        Ok(Exporter { settings })
    }

    /// Use already-validated settings (library callers, tests).
    pub fn with_settings(settings: Settings) -> Self {
        Exporter { settings }
    }

    /// Force dry mode regardless of the config.
    pub fn dry_run(mut self) -> Self {
        self.settings.dry_run = true;
        self
    }

    /// Run the full pipeline. Fails fast on configuration and parse errors;
    /// unresolved imports and type references degrade output instead.
    pub fn run(&self) -> miette::Result<ExportReport> {
        let settings = &self.settings;
        let workspace = Workspace::new(settings.dry_run);

        let roots = SearchRoots::discover(
            &settings.seeds,
            settings.import_dir.as_deref(),
            &settings.work_dir,
        );
        let closure = import::collect_closure(&settings.seeds, &roots);

        if closure.seeds.iter().all(|s| !s.path.exists()) {
            return Err(miette::Report::new(PruneError::SeedResolution(format!(
                "none of the {} configured seed file(s) could be located",
                closure.seeds.len()
            ))));
        }

        // Parse every closure file. An unreadable or lexically broken file
        // is fatal here, with the offending path in the diagnostic.
        let mut files: IndexMap<PathBuf, SchemaFile> = IndexMap::new();
        for entry in &closure.files {
            let parsed = model::parse_schema_file(&entry.path)?;
            files.insert(entry.path.clone(), parsed);
        }
        info!(
            "closure: {} file(s) from {} seed(s)",
            files.len(),
            closure.seeds.len()
        );

        let index = SymbolIndex::build(&files);
        let no_keep = KeepDirectives::default();
        let (selection, keep) = if settings.prune {
            (
                prune::select(&files, &index, &closure.seeds, &settings.keep),
                &settings.keep,
            )
        } else {
            // Pruning disabled: the whole file set survives and keep
            // directives are ignored; casing and namespace still apply.
            (Selection::all(&files), &no_keep)
        };

        workspace
            .create_dir_all(&settings.export_dir)
            .map_err(miette::Report::new)
            .wrap_err("create export directory")?;

        let opts = EmitOptions {
            language: settings.language,
            namespace: &settings.namespace,
            file_name_case: settings.file_name_case,
            field_name_case: settings.field_name_case,
        };

        let mut written = Vec::with_capacity(files.len());
        let mut expected: BTreeSet<String> = BTreeSet::new();
        for (path, pf) in &files {
            let name = emit::output_file_name(path, settings.file_name_case);
            let content = emit::assemble_file(pf, selection.selected(path), &index, keep, &opts);
            let dst = settings.export_dir.join(&name);
            workspace.write(&dst, &content).map_err(miette::Report::new)?;
            expected.insert(name);
            written.push(dst);
        }

        generator::clean_extras(&settings.export_dir, &expected, &workspace)
            .map_err(miette::Report::new)
            .wrap_err("clean export directory")?;

        if let Some(protogen) = &settings.protogen {
            let targets: Vec<String> = expected.iter().cloned().collect();
            generator::generate(protogen, &settings.export_dir, &targets, &workspace)
                .map_err(miette::Report::new)?;
        }

        Ok(ExportReport {
            written,
            dry_run: settings.dry_run,
        })
    }
}
