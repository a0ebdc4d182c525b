//! Compiler driver that orchestrates one modc invocation.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::Result;
use crate::export;
use crate::makefile::BuildMetadata;
use crate::package::PackageRef;
use crate::registry::{Registry, ResolveOptions};

/// Options for compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Entry module source file.
    pub input: PathBuf,
    /// Regenerate headers even when they look up to date.
    pub force: bool,
    /// Never regenerate an existing header.
    pub silent: bool,
    /// Emit the build metadata fragment next to the generated source.
    pub metadata: bool,
}

impl CompileOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            force: false,
            silent: false,
            metadata: false,
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn metadata(mut self, metadata: bool) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Compilation output structure.
pub struct CompileOutput {
    /// The resolved entry module; its import records keep the whole
    /// dependency graph alive.
    pub package: PackageRef,
    /// Generated source path of the entry module.
    pub generated: PathBuf,
    /// Generated header path of the entry module.
    pub header: PathBuf,
    /// Build metadata fragment, when requested.
    pub metadata: Option<PathBuf>,
    /// Number of modules resolved in this invocation.
    pub modules: usize,
}

/// The modc compiler.
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Resolve the entry module and everything it imports, write the
    /// entry's header, and optionally emit build metadata.
    pub fn compile(&self) -> Result<CompileOutput> {
        let registry = Registry::new(ResolveOptions {
            force: self.options.force,
            silent: self.options.silent,
        });

        let package = registry.resolve(&self.options.input)?;
        let header = export::write_header(&package)?;
        let generated = package.borrow().generated.clone();

        let metadata = if self.options.metadata {
            let target = generated.with_extension("mk");
            debug!(target = %target.display(), "writing build metadata");
            BuildMetadata::collect(&package).write(&target)?;
            Some(target)
        } else {
            None
        };

        info!(
            input = %self.options.input.display(),
            modules = registry.len(),
            "compilation finished"
        );

        Ok(CompileOutput {
            package,
            generated,
            header,
            metadata,
            modules: registry.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_options_builder() {
        let opts = CompileOptions::new("main.module.c")
            .force(true)
            .metadata(true);

        assert_eq!(opts.input, PathBuf::from("main.module.c"));
        assert!(opts.force);
        assert!(!opts.silent);
        assert!(opts.metadata);
    }
}
