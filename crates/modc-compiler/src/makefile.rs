//! Build metadata for the downstream Makefile generator.
//!
//! Walks the resolved dependency graph and collects, per module, the
//! generated source, the native file dependencies, and the build variable
//! operations, in a deterministic dependency-first order.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::atomic::AtomicFile;
use crate::error::{CompileError, Result};
use crate::package::{BuildVar, PackageRef, VarOp};

#[derive(Debug, Default)]
pub struct BuildMetadata {
    /// Generated sources, dependencies before dependents.
    pub objects: Vec<PathBuf>,
    /// Native file dependencies, canonical paths, dependency order.
    pub native_deps: Vec<PathBuf>,
    /// Variable operations in application order.
    pub variables: Vec<BuildVar>,
}

impl BuildMetadata {
    /// Collect metadata for `root` and everything it transitively imports.
    pub fn collect(root: &PackageRef) -> Self {
        let mut meta = BuildMetadata::default();
        let mut visited = HashSet::new();
        visit(root, &mut visited, &mut meta);
        meta
    }

    /// Render the metadata as Makefile variable assignments.
    pub fn render(&self) -> String {
        let mut out = String::from("# Generated by modcc. Do not edit.\n");

        if !self.variables.is_empty() {
            out.push('\n');
            for var in &self.variables {
                let op = match var.op {
                    VarOp::Set => ":=",
                    VarOp::SetDefault => "?=",
                    VarOp::Append => "+=",
                };
                let _ = writeln!(out, "{} {} {}", var.name, op, var.value);
            }
        }

        out.push('\n');
        for object in &self.objects {
            let _ = writeln!(out, "OBJS += {}", object.display());
        }
        for dep in &self.native_deps {
            let _ = writeln!(out, "DEPS += {}", dep.display());
        }
        out
    }

    /// Write the rendered metadata to `target` atomically.
    pub fn write(&self, target: &Path) -> Result<()> {
        let mut out = AtomicFile::create(target).map_err(|e| CompileError::io(target, e))?;
        out.write_all(self.render().as_bytes())
            .map_err(|e| CompileError::io(target, e))?;
        out.commit().map_err(|e| CompileError::io(target, e))?;
        Ok(())
    }
}

fn visit(pkg: &PackageRef, visited: &mut HashSet<PathBuf>, meta: &mut BuildMetadata) {
    let p = pkg.borrow();
    if !visited.insert(p.source_abs.clone()) {
        return;
    }
    for record in p.imports() {
        if record.native {
            meta.native_deps.push(PathBuf::from(&record.alias));
        } else if let Some(dep) = &record.package {
            visit(dep, visited, meta);
        }
    }
    meta.objects.push(p.generated.clone());
    meta.variables.extend(p.variables().iter().cloned());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Package;

    #[test]
    fn renders_variable_operations_in_order() {
        let pkg = Package::new("/src/a.module.c", "a.module.c", "/src/a.c", false, false);
        {
            let mut p = pkg.borrow_mut();
            p.push_variable(BuildVar {
                name: "TIMEOUT".to_string(),
                value: "30".to_string(),
                op: VarOp::SetDefault,
            });
            p.push_variable(BuildVar {
                name: "TIMEOUT".to_string(),
                value: "+5".to_string(),
                op: VarOp::Append,
            });
            p.push_variable(BuildVar {
                name: "CC".to_string(),
                value: "clang".to_string(),
                op: VarOp::Set,
            });
        }

        let meta = BuildMetadata::collect(&pkg);
        let rendered = meta.render();

        let timeout_default = rendered.find("TIMEOUT ?= 30").expect("set default");
        let timeout_append = rendered.find("TIMEOUT += +5").expect("append");
        assert!(timeout_default < timeout_append);
        assert!(rendered.contains("CC := clang"));
        assert!(rendered.contains("OBJS += /src/a.c"));
    }

    #[test]
    fn cyclic_graph_terminates() {
        let a = Package::new("/src/a.module.c", "a.module.c", "/src/a.c", false, false);
        let b = Package::new("/src/b.module.c", "b.module.c", "/src/b.c", false, false);
        a.borrow_mut().insert_import(crate::import::ImportRecord {
            alias: "b".to_string(),
            filename: "b.module.c".to_string(),
            native: false,
            package: Some(b.clone()),
        });
        b.borrow_mut().insert_import(crate::import::ImportRecord {
            alias: "a".to_string(),
            filename: "a.module.c".to_string(),
            native: false,
            package: Some(a.clone()),
        });

        let meta = BuildMetadata::collect(&a);
        assert_eq!(meta.objects.len(), 2);
        // Dependencies come before dependents.
        assert_eq!(meta.objects[0], PathBuf::from("/src/b.c"));
        assert_eq!(meta.objects[1], PathBuf::from("/src/a.c"));
    }
}
