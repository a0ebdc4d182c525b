//! modc compiler
//!
//! Resolves the module dialect's import graph, synthesizes a plain C header
//! per module, rewrites module bodies into compilable C, and collects build
//! metadata for a downstream Makefile generator.

pub mod atomic;
mod directive;
pub mod driver;
pub mod error;
pub mod export;
mod grammar;
pub mod import;
pub mod makefile;
pub mod package;
pub mod paths;
pub mod registry;

pub use driver::{CompileOptions, CompileOutput, Compiler};
pub use error::{CompileError, Result};
pub use export::{Export, ExportKind};
pub use import::ImportRecord;
pub use makefile::BuildMetadata;
pub use package::{BuildVar, Package, PackageRef, ResolveState, VarOp};
pub use registry::{Registry, ResolveOptions};
