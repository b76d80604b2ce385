//! Schema-corpus pruning for Protocol-Buffer-style IDL trees.
//!
//! Teams keep one large shared `.proto` tree; each downstream client needs
//! only a slice of it, under its own naming conventions. This crate trims
//! the shared tree down to the minimal, self-consistent subset a client's
//! seed files reach, re-cases file and field names, re-namespaces the
//! output, and recomputes imports from what actually survived — ready to
//! hand to a per-language code generator.
//!
//! The pipeline, leaves first:
//!
//! - [`casing`] — pure string-case transforms.
//! - [`scanner`] — comment/string-aware block extraction over raw text.
//! - [`model`] — per-file records: package, syntax, top-level definitions.
//! - [`import`] — seed resolution and transitive import closure.
//! - [`resolve`] — symbol index over the closure; the resolution ladder.
//! - [`prune`] — reachability selection and field-level keep sets.
//! - [`emit`] — import recomputation, assembly, sanitization.
//! - [`exporter`] — the orchestrator, [`Exporter`].
//!
//! # Running an export
//!
//! ```no_run
//! use prototrim::Exporter;
//!
//! let report = Exporter::from_config_path("export.proto.yaml".as_ref())?.run()?;
//! eprintln!("{} file(s) written", report.written.len());
//! # Ok::<(), miette::Report>(())
//! ```
//!
//! # Error handling
//!
//! Fallible entry points return [`miette::Result`]; lexical errors carry
//! source spans for rich diagnostics. Unresolved imports and unresolved or
//! ambiguous type references are deliberately non-fatal — they shrink the
//! output instead of aborting it.

pub mod casing;
pub mod config;
pub mod emit;
pub mod error;
pub mod exporter;
pub mod generator;
pub mod import;
pub mod model;
pub mod prune;
pub mod resolve;
pub mod scanner;

// Narrow re-exports for the common entry points.
pub use casing::CaseMode;
pub use config::{Config, KeepDirectives, Language, Settings};
pub use exporter::{ExportReport, Exporter};
