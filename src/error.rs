use std::path::PathBuf;

use miette::{LabeledSpan, NamedSource, SourceSpan};

/// A lexical error with source location information for rich diagnostics.
///
/// Produced when a definition block never reaches its matching closing brace,
/// which makes the rest of the file unparseable.
#[derive(Debug)]
pub struct LexicalDiagnostic {
    pub src: NamedSource<String>,
    pub span: SourceSpan,
    pub message: String,
}

impl std::fmt::Display for LexicalDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LexicalDiagnostic {}

impl miette::Diagnostic for LexicalDiagnostic {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(self.message.clone()),
            self.span,
        ))))
    }
}

/// Errors outside the lexical scanner: configuration, seed resolution, I/O.
///
/// Unresolved imports and unresolved type references are deliberately *not*
/// represented here — they degrade output completeness instead of aborting
/// the run.
#[derive(Debug)]
pub enum PruneError {
    /// Missing or invalid configuration; aborts before any file I/O.
    Config(String),
    /// The seed list is empty or no seed could be located on disk.
    SeedResolution(String),
    /// A closure file could not be read at parse time.
    Read { path: PathBuf, source: std::io::Error },
    /// Writing an output artifact failed; no rollback of partial output.
    Write { path: PathBuf, source: std::io::Error },
    /// The external code generator exited unsuccessfully.
    Generator(String),
}

impl std::fmt::Display for PruneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PruneError::Config(msg) => write!(f, "configuration error: {msg}"),
            PruneError::SeedResolution(msg) => write!(f, "seed resolution failed: {msg}"),
            PruneError::Read { path, source } => {
                write!(f, "cannot read {}: {source}", path.display())
            }
            PruneError::Write { path, source } => {
                write!(f, "cannot write {}: {source}", path.display())
            }
            PruneError::Generator(msg) => write!(f, "code generator failed: {msg}"),
        }
    }
}

impl std::error::Error for PruneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PruneError::Read { source, .. } | PruneError::Write { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl miette::Diagnostic for PruneError {
    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            PruneError::Config(_) => Some(Box::new(
                "check the YAML config against the documented import/export sections",
            )),
            PruneError::SeedResolution(_) => Some(Box::new(
                "seed files are resolved against the import dir and the working tree",
            )),
            _ => None,
        }
    }
}
