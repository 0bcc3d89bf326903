//! Core components of genmethods
//!
//! Turns Go functions taking a handle as their first parameter into methods on that handle.
//! [genmethods] is the entry point.

pub mod ast;
pub mod classify;
pub mod config;
pub mod emit;
pub mod load;
pub mod synth;
mod types;

use ast::Decl;
use ast::FuncDecl;
use ast::Package;
use ast::SourceFile;
use classify::Classifier;
use classify::Verdict;
use config::Config;
use emit::OutputUnit;
use std::fmt::Display;
use std::fmt::Formatter;
use std::path::Path;
use std::path::PathBuf;
use synth::MethodDecl;
use synth::Synthesizer;
use thiserror::Error;

/// Generates methods for every eligible function in a package and renders them into one Go
/// source file.
pub fn genmethods(package: &Package, config: &Config) -> Result<String, Error> {
    let mut generator = Generator::new(package, config);
    generator.parse_package()?;
    emit::render(&generator.into_output())
}

/// Walks the declarations of a [Package] in visitation order and collects synthesized methods.
pub struct Generator<'a> {
    package: &'a Package,
    classifier: Classifier<'a>,
    synthesizer: Synthesizer<'a>,
    methods: Vec<MethodDecl<'a>>,
}

impl<'a> Generator<'a> {
    pub fn new(package: &'a Package, config: &'a Config) -> Self {
        Self {
            package,
            classifier: Classifier::new(&config.receivers),
            synthesizer: Synthesizer::new(&config.rename),
            methods: Vec::new(),
        }
    }

    pub fn parse_package(&mut self) -> Result<(), Error> {
        for file in self.package.files.iter() {
            self.parse_file(file)?;
        }
        Ok(())
    }

    fn parse_file(&mut self, file: &'a SourceFile) -> Result<(), Error> {
        log::debug!("file: {}", file.path.display());
        for decl in file.decls.iter() {
            self.parse_decl(file, decl)?;
        }
        Ok(())
    }

    fn parse_decl(&mut self, file: &'a SourceFile, decl: &'a Decl) -> Result<(), Error> {
        match decl {
            Decl::Gen(gen) => {
                log::trace!("{} declaration at line {}", gen.kind.as_ref(), gen.line);
                Ok(())
            }
            Decl::Func(func) => {
                self.parse_func_decl(file, func);
                Ok(())
            }
            Decl::Unsupported { kind, line } => Err(Error {
                file: file.path.clone(),
                decl: Some(format!("line {}", line)),
                source: ErrorSource::UnsupportedDeclaration(kind.clone()),
            }),
        }
    }

    fn parse_func_decl(&mut self, file: &'a SourceFile, func: &'a FuncDecl) {
        match self.classifier.classify(self.package, file, func) {
            Verdict::Accept(candidate) => {
                log::info!("generating method: {}", func.name);
                self.methods.push(self.synthesizer.synthesize(candidate));
            }
            Verdict::Reject(rejection) => {
                log::debug!("skipping `{}`: {}", func.name, rejection.as_ref());
            }
        }
    }

    /// Methods synthesized so far, in visitation order.
    pub fn methods(&self) -> &[MethodDecl<'a>] {
        &self.methods
    }

    pub fn into_output(self) -> OutputUnit<'a> {
        OutputUnit {
            package: self.package.name.clone(),
            dir: self.package.dir.clone(),
            methods: self.methods,
        }
    }
}

/// Errors when loading a Go package or emitting generated code.
#[derive(Error, Debug)]
pub struct Error {
    /// The Go source file, package directory or output file which causes the error.
    pub file: PathBuf,

    /// The declaration being processed, if any.
    pub decl: Option<String>,

    pub source: ErrorSource,
}

impl Error {
    pub(crate) fn new(file: &Path, source: ErrorSource) -> Self {
        Self {
            file: file.to_owned(),
            decl: None,
            source,
        }
    }

    pub(crate) fn with_decl(mut self, decl: impl Into<String>) -> Self {
        self.decl = Some(decl.into());
        self
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.file.display())?;
        if let Some(decl) = &self.decl {
            write!(f, " (in `{}`)", decl)?;
        }
        Ok(())
    }
}

/// Cause of [Error].
///
/// Everything up to [UnsupportedDeclaration](ErrorSource::UnsupportedDeclaration) is a failure to
/// load the package.
#[derive(Error, Debug)]
pub enum ErrorSource {
    #[error("Failed to locate the package: {0}")]
    Locate(String),

    #[error("Failed to run `go list`")]
    GoList(#[source] std::io::Error),

    #[error("Failed to decode the output of `go list`")]
    GoListOutput(#[source] serde_json::Error),

    #[error("Failed to read a source file")]
    ReadSource(#[source] std::io::Error),

    #[error("Failed to load the Go grammar")]
    Grammar(#[source] tree_sitter::LanguageError),

    #[error("Syntax error at line {line} column {column}")]
    Parse { line: usize, column: usize },

    #[error("Found package `{found}` while loading package `{expected}`")]
    PackageMismatch { expected: String, found: String },

    #[error("Package `{0}` is not imported")]
    UnresolvedImport(String),

    #[error("Support for top-level `{0}` not implemented")]
    UnsupportedDeclaration(String),

    #[error("Failed to read the config")]
    ReadConfig(#[source] std::io::Error),

    #[error("Invalid config")]
    Config(#[source] toml::de::Error),

    #[error("Failed to render generated code: {0}")]
    Render(String),

    #[error("Generated code has a syntax error at line {line} column {column}")]
    Format { line: usize, column: usize },

    #[error("Failed to write generated code")]
    Write(#[source] std::io::Error),
}

#[cfg(test)]
fn normalize_source_code(code: &str) -> String {
    let regex = r"\s+".parse::<regex::Regex>().unwrap();
    regex.replace_all(code.trim(), " ").into_owned()
}
