//! The export table and header synthesis.
//!
//! Each module keeps an ordered export list; the order is the literal order
//! emitted into the generated header. Adding an export under an already
//! taken export name is a defined no-op (first registration wins), not an
//! error.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::PathBuf;

use tracing::debug;

use crate::atomic::AtomicFile;
use crate::error::{CompileError, Result};
use crate::package::PackageRef;
use crate::paths;

/// Kind of an exported declaration. The vocabulary is fixed by the grammar
/// layer and drives blank-line grouping in the generated header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Block,
    Type,
    Function,
    Enum,
    Union,
    Struct,
    Header,
}

impl ExportKind {
    /// Map a kind name from the grammar's closed vocabulary.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "block" => Some(ExportKind::Block),
            "typedef" => Some(ExportKind::Type),
            "function" => Some(ExportKind::Function),
            "enum" => Some(ExportKind::Enum),
            "union" => Some(ExportKind::Union),
            "struct" => Some(ExportKind::Struct),
            "header" => Some(ExportKind::Header),
            _ => None,
        }
    }
}

/// A named declaration a module makes visible to importers.
#[derive(Debug, Clone)]
pub struct Export {
    /// The symbol as declared in the module body.
    pub local_name: String,
    /// The name importers see; equals `local_name` when no alias was given.
    pub export_name: String,
    /// Backend-visible linkage name; empty for header inclusions.
    pub symbol: String,
    /// Literal text emitted into the header, possibly multi-line.
    pub declaration: String,
    pub kind: ExportKind,
}

/// Register an export on `pkg` and return the effective export name.
///
/// If the name is already taken the new fields are discarded and the
/// existing name is returned unchanged.
pub fn add_export(
    local: &str,
    alias: Option<&str>,
    symbol: &str,
    kind: ExportKind,
    declaration: &str,
    pkg: &PackageRef,
) -> String {
    let export_name = alias.unwrap_or(local);
    let mut p = pkg.borrow_mut();
    if p.has_export(export_name) {
        return export_name.to_string();
    }
    p.push_export(Export {
        local_name: local.to_string(),
        export_name: export_name.to_string(),
        symbol: symbol.to_string(),
        declaration: declaration.to_string(),
        kind,
    });
    export_name.to_string()
}

/// Render the header text for a package.
///
/// Deterministic: an include-guard pair derived from the module name frames
/// the exports in insertion order. A blank line separates an export from its
/// predecessor when the kind changes or the declaration spans multiple
/// lines; multi-line declarations are also followed by a blank line. Runs of
/// same-kind single-line declarations stay tightly grouped.
pub fn render_header(pkg: &crate::package::Package) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "#ifndef _package_{name}_\n#define _package_{name}_\n\n",
        name = pkg.name
    );

    let mut last_kind: Option<ExportKind> = None;
    let mut had_newline = true;
    for export in pkg.exports() {
        let multiline = export.declaration.contains('\n');
        if !had_newline && (last_kind != Some(export.kind) || multiline) {
            out.push('\n');
        }
        out.push_str(&export.declaration);
        out.push('\n');
        if multiline {
            out.push('\n');
        }
        last_kind = Some(export.kind);
        had_newline = multiline;
    }

    if !had_newline {
        out.push('\n');
    }
    out.push_str("#endif\n");
    out
}

/// Write the package's header, returning its path.
///
/// Idempotent within one resolution pass: the header path is computed once
/// and later calls return immediately. When the package is not in forced
/// mode, regeneration is skipped if silent mode is set or the header on disk
/// is not older than the source.
pub fn write_header(pkg: &PackageRef) -> Result<PathBuf> {
    let (header, skip) = {
        let mut p = pkg.borrow_mut();
        if let Some(existing) = &p.header {
            return Ok(existing.clone());
        }
        let header = paths::generated_header(&p.generated);
        p.header = Some(header.clone());
        let skip = !p.force && (p.silent || !paths::newer(&p.source_abs, &header));
        (header, skip)
    };

    if skip {
        debug!(header = %header.display(), "header up to date");
        return Ok(header);
    }

    debug!(header = %header.display(), "writing header");
    let text = render_header(&pkg.borrow());
    let mut out = AtomicFile::create(&header).map_err(|e| CompileError::io(&header, e))?;
    out.write_all(text.as_bytes())
        .map_err(|e| CompileError::io(&header, e))?;
    out.commit().map_err(|e| CompileError::io(&header, e))?;
    Ok(header)
}

/// Make `pkg`'s own header include `dep`'s header.
///
/// Forces `dep`'s header and registers a header-kind export on `pkg` whose
/// declaration is the matching `#include` line, named by the header path
/// relative to `pkg`'s source. Repeated calls for the same dependency
/// deduplicate through the export table.
pub fn include_dependency(pkg: &PackageRef, dep: &PackageRef) -> Result<()> {
    let header = write_header(dep)?;
    let rel = paths::relative(&pkg.borrow().source_abs, &header);
    let rel = rel.display().to_string();
    let declaration = format!("#include \"{rel}\"");
    add_export(&rel, None, "", ExportKind::Header, &declaration, pkg);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Package;

    fn test_package() -> PackageRef {
        Package::new("/src/m.module.c", "m.module.c", "/src/m.c", false, false)
    }

    #[test]
    fn duplicate_export_name_is_silently_ignored() {
        let pkg = test_package();
        let first = add_export("f", Some("g"), "sym", ExportKind::Function, "decl1", &pkg);
        let second = add_export("f", Some("g"), "sym2", ExportKind::Enum, "decl2", &pkg);

        assert_eq!(first, "g");
        assert_eq!(second, "g");

        let p = pkg.borrow();
        assert_eq!(p.exports().len(), 1);
        let export = p.export("g").expect("export registered");
        assert_eq!(export.kind, ExportKind::Function);
        assert_eq!(export.declaration, "decl1");
        assert_eq!(export.symbol, "sym");
    }

    #[test]
    fn export_name_defaults_to_local_name() {
        let pkg = test_package();
        let name = add_export("push", None, "m_push", ExportKind::Function, "int m_push();", &pkg);
        assert_eq!(name, "push");
        let p = pkg.borrow();
        assert_eq!(p.export("push").map(|e| e.local_name.as_str()), Some("push"));
        assert_eq!(p.export_by_local("push").map(|e| e.export_name.as_str()), Some("push"));
    }

    #[test]
    fn header_groups_same_kind_and_separates_multiline() {
        let pkg = test_package();
        add_export("f", None, "m_f", ExportKind::Function, "int f();", &pkg);
        add_export("g", None, "m_g", ExportKind::Function, "int g();", &pkg);
        add_export(
            "S",
            None,
            "m_S",
            ExportKind::Struct,
            "struct S {\n  int x;\n};",
            &pkg,
        );

        let header = render_header(&pkg.borrow());
        assert_eq!(
            header,
            "#ifndef _package_m_\n\
             #define _package_m_\n\
             \n\
             int f();\n\
             int g();\n\
             \n\
             struct S {\n  int x;\n};\n\
             \n\
             #endif\n"
        );
    }

    #[test]
    fn header_with_no_exports_is_a_bare_guard() {
        let pkg = test_package();
        let header = render_header(&pkg.borrow());
        assert_eq!(
            header,
            "#ifndef _package_m_\n#define _package_m_\n\n#endif\n"
        );
    }

    #[test]
    fn trailing_single_line_export_gets_blank_before_guard_close() {
        let pkg = test_package();
        add_export("f", None, "m_f", ExportKind::Function, "int f();", &pkg);
        let header = render_header(&pkg.borrow());
        assert!(header.ends_with("int f();\n\n#endif\n"));
    }

    #[test]
    fn kind_names_map_to_kinds() {
        assert_eq!(ExportKind::from_name("typedef"), Some(ExportKind::Type));
        assert_eq!(ExportKind::from_name("function"), Some(ExportKind::Function));
        assert_eq!(ExportKind::from_name("header"), Some(ExportKind::Header));
        assert_eq!(ExportKind::from_name("widget"), None);
    }
}
