//! The compilation unit.
//!
//! One `Package` maps a module source file to its generated source and
//! (lazily) its generated header, and accumulates everything resolution
//! learns while the body is parsed: exports, imports, and build variable
//! operations. Packages are shared through `Rc<RefCell<..>>` because a
//! cyclic import must observe the same, possibly partially populated,
//! package that is still being parsed higher up the stack.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::atomic::AtomicFile;
use crate::export::Export;
use crate::import::ImportRecord;

pub type PackageRef = Rc<RefCell<Package>>;

/// Where a package is in its resolution lifecycle.
///
/// A package enters the registry cache as `InProgress` before its body is
/// parsed; a repeated or cyclic import of the same path sees that entry
/// instead of re-entering the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    InProgress,
    Complete,
    Failed,
}

/// How a build variable operation applies to the variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarOp {
    /// Unconditional assignment (`:=`).
    Set,
    /// Assign only if unset (`?=`).
    SetDefault,
    /// Accumulate (`+=`).
    Append,
}

/// One build variable operation, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildVar {
    pub name: String,
    pub value: String,
    pub op: VarOp,
}

pub struct Package {
    /// Canonical source path; the registry cache key.
    pub source_abs: PathBuf,
    /// Source path as given by the caller or importer, for diagnostics.
    pub source_rel: PathBuf,
    /// Generated source output path.
    pub generated: PathBuf,
    /// Generated header path; absent until the first `write_header`.
    pub header: Option<PathBuf>,
    /// Module name derived from the generated path, identifier-folded.
    pub name: String,
    pub force: bool,
    pub silent: bool,
    pub state: ResolveState,

    exports: Vec<Export>,
    export_index: HashMap<String, usize>,
    symbol_index: HashMap<String, usize>,
    imports: Vec<ImportRecord>,
    import_index: HashMap<String, usize>,
    variables: Vec<BuildVar>,
    /// Staged generated-source output, live while the body is parsed.
    pub(crate) out: Option<AtomicFile>,
}

impl Package {
    pub fn new(
        source_abs: impl Into<PathBuf>,
        source_rel: impl Into<PathBuf>,
        generated: impl Into<PathBuf>,
        force: bool,
        silent: bool,
    ) -> PackageRef {
        let generated = generated.into();
        let name = derive_name(&generated);
        Rc::new(RefCell::new(Package {
            source_abs: source_abs.into(),
            source_rel: source_rel.into(),
            generated,
            header: None,
            name,
            force,
            silent,
            state: ResolveState::InProgress,
            exports: Vec::new(),
            export_index: HashMap::new(),
            symbol_index: HashMap::new(),
            imports: Vec::new(),
            import_index: HashMap::new(),
            variables: Vec::new(),
            out: None,
        }))
    }

    /// Override the derived module name (the `package "<name>";` statement).
    pub fn set_name(&mut self, name: &str) {
        self.name = fold_identifier(name);
    }

    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    /// Look up an export by its exported name.
    pub fn export(&self, name: &str) -> Option<&Export> {
        self.export_index.get(name).map(|&i| &self.exports[i])
    }

    /// Look up an export by the local name it was declared under.
    pub fn export_by_local(&self, local: &str) -> Option<&Export> {
        self.symbol_index.get(local).map(|&i| &self.exports[i])
    }

    pub fn has_export(&self, name: &str) -> bool {
        self.export_index.contains_key(name)
    }

    pub(crate) fn push_export(&mut self, export: Export) {
        let index = self.exports.len();
        self.export_index.insert(export.export_name.clone(), index);
        self.symbol_index.insert(export.local_name.clone(), index);
        self.exports.push(export);
    }

    pub fn imports(&self) -> &[ImportRecord] {
        &self.imports
    }

    pub fn import(&self, alias: &str) -> Option<&ImportRecord> {
        self.import_index.get(alias).map(|&i| &self.imports[i])
    }

    /// Record an import. A duplicate alias silently overwrites the earlier
    /// record in place (last write wins).
    pub(crate) fn insert_import(&mut self, record: ImportRecord) {
        match self.import_index.get(&record.alias) {
            Some(&i) => self.imports[i] = record,
            None => {
                self.import_index
                    .insert(record.alias.clone(), self.imports.len());
                self.imports.push(record);
            }
        }
    }

    pub fn variables(&self) -> &[BuildVar] {
        &self.variables
    }

    pub(crate) fn push_variable(&mut self, var: BuildVar) {
        self.variables.push(var);
    }

    /// Append text to the staged generated source. A no-op once the output
    /// has been committed or discarded.
    pub(crate) fn emit(&mut self, text: &str) -> io::Result<()> {
        match self.out.as_mut() {
            Some(out) => out.write_all(text.as_bytes()),
            None => Ok(()),
        }
    }

    /// Human-readable listing of imports and exports.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        out.push_str("Imports:\n");
        for record in &self.imports {
            let _ = writeln!(out, "    import {} {}", record.alias, record.filename);
        }
        out.push_str("\nExports:\n");
        for export in &self.exports {
            let first_line = export.declaration.lines().next().unwrap_or("");
            let _ = writeln!(out, "    export {} {}", export.export_name, first_line);
        }
        out
    }
}

// Hand-written so formatting stops at this package instead of chasing
// import records through a possibly cyclic graph.
impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("source_abs", &self.source_abs)
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Module name from the generated path: basename, `.c` stripped,
/// non-identifier characters folded to `_`.
fn derive_name(generated: &Path) -> String {
    let stem = generated
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    fold_identifier(&stem)
}

fn fold_identifier(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_derived_from_generated_path() {
        let pkg = Package::new("/src/list.module.c", "list.module.c", "/src/list.c", false, false);
        assert_eq!(pkg.borrow().name, "list");
    }

    #[test]
    fn name_folds_non_identifier_characters() {
        let pkg = Package::new(
            "/src/foo-bar.baz.module.c",
            "foo-bar.baz.module.c",
            "/src/foo-bar.baz.c",
            false,
            false,
        );
        assert_eq!(pkg.borrow().name, "foo_bar_baz");
    }

    #[test]
    fn debug_formatting_does_not_follow_imports() {
        let a = Package::new("/src/a.module.c", "a.module.c", "/src/a.c", false, false);
        let b = Package::new("/src/b.module.c", "b.module.c", "/src/b.c", false, false);
        a.borrow_mut().insert_import(ImportRecord {
            alias: "b".to_string(),
            filename: "b.module.c".to_string(),
            native: false,
            package: Some(b.clone()),
        });
        b.borrow_mut().insert_import(ImportRecord {
            alias: "a".to_string(),
            filename: "a.module.c".to_string(),
            native: false,
            package: Some(a.clone()),
        });

        let text = format!("{:?}", a.borrow().import("b"));
        assert!(text.contains("b.module.c"));
        assert!(text.contains("Package"));
    }

    #[test]
    fn duplicate_import_alias_overwrites() {
        let pkg = Package::new("/a.module.c", "a.module.c", "/a.c", false, false);
        let mut p = pkg.borrow_mut();
        p.insert_import(ImportRecord {
            alias: "dep".to_string(),
            filename: "first.module.c".to_string(),
            native: false,
            package: None,
        });
        p.insert_import(ImportRecord {
            alias: "dep".to_string(),
            filename: "second.module.c".to_string(),
            native: false,
            package: None,
        });
        assert_eq!(p.imports().len(), 1);
        assert_eq!(p.import("dep").map(|r| r.filename.as_str()), Some("second.module.c"));
    }
}
