//! The package registry: memoized, path-keyed resolution.
//!
//! One registry spans one compiler invocation. Every distinct canonical
//! path is parsed at most once; the cache entry is claimed before the
//! body is parsed, which is what terminates cyclic imports without a
//! visited set.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::atomic::AtomicFile;
use crate::error::{CompileError, Result};
use crate::grammar;
use crate::package::{Package, PackageRef, ResolveState};
use crate::paths;

/// Header regeneration policy applied to every package the registry creates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Regenerate headers even when they look up to date.
    pub force: bool,
    /// Never regenerate an existing header.
    pub silent: bool,
}

pub struct Registry {
    cache: RefCell<HashMap<PathBuf, PackageRef>>,
    /// Reserved for a numeric-id indirection scheme; allocated but never
    /// populated by any current operation.
    #[allow(dead_code)]
    id_cache: RefCell<HashMap<u64, PackageRef>>,
    options: ResolveOptions,
}

impl Registry {
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            cache: RefCell::new(HashMap::new()),
            id_cache: RefCell::new(HashMap::new()),
            options,
        }
    }

    /// Resolve a module source path to its package, compiling it on first
    /// sight.
    ///
    /// The path must end with `.module.c`. A cache hit returns the cached
    /// package immediately, whatever its state; resolution may re-enter
    /// this method recursively for imports encountered while parsing.
    pub fn resolve(&self, path: &Path) -> Result<PackageRef> {
        if !paths::has_module_suffix(path) {
            return Err(CompileError::Naming(path.to_path_buf()));
        }

        let key = fs::canonicalize(path).map_err(|e| CompileError::io(path, e))?;
        if let Some(cached) = self.cache.borrow().get(&key) {
            return Ok(cached.clone());
        }

        debug!(path = %key.display(), "resolving module");
        let source = fs::read_to_string(&key).map_err(|e| CompileError::io(&key, e))?;
        let generated = paths::generated_source(&key);
        let out = AtomicFile::create(&generated).map_err(|e| CompileError::io(&generated, e))?;

        let pkg = Package::new(
            key.clone(),
            path.to_path_buf(),
            generated,
            self.options.force,
            self.options.silent,
        );
        pkg.borrow_mut().out = Some(out);

        // Claim the cache slot before parsing so a cyclic import of this
        // path observes the in-progress package instead of recursing.
        self.cache.borrow_mut().insert(key, pkg.clone());

        match grammar::parse(&source, self, &pkg) {
            Ok(()) => {
                let mut p = pkg.borrow_mut();
                p.state = ResolveState::Complete;
                if let Some(out) = p.out.take() {
                    out.commit()
                        .map_err(|e| CompileError::io(p.generated.clone(), e))?;
                }
            }
            Err(e) => {
                let mut p = pkg.borrow_mut();
                p.state = ResolveState::Failed;
                if let Some(out) = p.out.take() {
                    out.abort();
                }
                return Err(e);
            }
        }

        Ok(pkg)
    }

    /// Look up an already resolved package by its canonical path.
    pub fn lookup(&self, canonical: &Path) -> Option<PackageRef> {
        self.cache.borrow().get(canonical).cloned()
    }

    /// Number of packages resolved so far.
    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }
}
