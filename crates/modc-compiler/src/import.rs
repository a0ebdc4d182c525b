//! Cross-module dependency wiring.
//!
//! An import statement binds an alias to a dependency module, compiling it
//! through the registry if it has not been seen yet. Native dependencies are
//! plain C files threaded through to build metadata without resolution.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CompileError, Result};
use crate::export;
use crate::package::PackageRef;
use crate::paths;
use crate::registry::Registry;

/// One import binding in a module, keyed by alias.
#[derive(Debug, Clone)]
pub struct ImportRecord {
    /// The local binding name; for native dependencies, the canonical path.
    pub alias: String,
    /// The target filename as written by the importer.
    pub filename: String,
    /// True for plain C file dependencies that skip module resolution.
    pub native: bool,
    /// The resolved module; absent for native dependencies.
    pub package: Option<PackageRef>,
}

/// Resolve `filename` and bind it to `alias` in `pkg`.
///
/// The dependency's header is forced so the importer can include it, and an
/// `#include` line referencing the header, relative to the importer's source
/// directory, is emitted into the importer's generated source.
pub fn add_import(
    alias: &str,
    filename: &str,
    pkg: &PackageRef,
    registry: &Registry,
) -> Result<PackageRef> {
    let target = resolve_against(pkg, filename);
    let dep = registry
        .resolve(&target)
        .map_err(|e| CompileError::import(filename, e))?;

    let header = export::write_header(&dep)?;
    let rel = paths::relative(&pkg.borrow().source_abs, &header);
    debug!(alias, file = filename, "import resolved");

    let mut p = pkg.borrow_mut();
    p.insert_import(ImportRecord {
        alias: alias.to_string(),
        filename: filename.to_string(),
        native: false,
        package: Some(dep.clone()),
    });
    p.emit(&format!("#include \"{}\"", rel.display()))
        .map_err(|e| CompileError::io(p.generated.clone(), e))?;

    Ok(dep)
}

/// Record a plain C file dependency of `pkg`.
///
/// The canonical path doubles as the alias, so the same file registered
/// twice collapses to one record. No header is synthesized; the record only
/// feeds the build metadata emitter.
pub fn add_native_dependency(pkg: &PackageRef, filename: &str) -> Result<ImportRecord> {
    let target = resolve_against(pkg, filename);
    let canonical = fs::canonicalize(&target).map_err(|e| CompileError::io(&target, e))?;

    let record = ImportRecord {
        alias: canonical.to_string_lossy().into_owned(),
        filename: filename.to_string(),
        native: true,
        package: None,
    };
    pkg.borrow_mut().insert_import(record.clone());
    Ok(record)
}

/// Interpret a filename relative to the importing module's directory.
fn resolve_against(pkg: &PackageRef, filename: &str) -> PathBuf {
    let path = Path::new(filename);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let p = pkg.borrow();
    match p.source_abs.parent() {
        Some(dir) => dir.join(path),
        None => path.to_path_buf(),
    }
}
