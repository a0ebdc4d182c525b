//! Path conventions and helpers.
//!
//! Maps a module source (`X.module.c`) to its generated source (`X.c`) and
//! header (`X.h`), computes importer-relative include paths, and compares
//! file modification times for the header staleness check.

use std::fs;
use std::path::{Component, Path, PathBuf};

/// Required suffix for module dialect sources.
pub const MODULE_SUFFIX: &str = ".module.c";

pub fn has_module_suffix(path: &Path) -> bool {
    path.to_string_lossy().ends_with(MODULE_SUFFIX)
}

/// Generated source path for a module source: `X.module.c` -> `X.c`.
pub fn generated_source(source: &Path) -> PathBuf {
    let text = source.to_string_lossy();
    match text.strip_suffix(MODULE_SUFFIX) {
        Some(base) => PathBuf::from(format!("{base}.c")),
        None => source.with_extension("c"),
    }
}

/// Header path for a generated source: `X.c` -> `X.h`.
pub fn generated_header(generated: &Path) -> PathBuf {
    generated.with_extension("h")
}

/// Path of `to_file` relative to the directory containing `from_file`.
///
/// Both paths are expected to be absolute (they come from canonicalized
/// module keys); the result uses `..` segments where the directories
/// diverge.
pub fn relative(from_file: &Path, to_file: &Path) -> PathBuf {
    let from_dir = from_file.parent().unwrap_or_else(|| Path::new(""));
    let from: Vec<Component> = from_dir.components().collect();
    let to: Vec<Component> = to_file.components().collect();

    let mut common = 0;
    while common < from.len() && common < to.len() && from[common] == to[common] {
        common += 1;
    }

    let mut rel = PathBuf::new();
    for _ in common..from.len() {
        rel.push("..");
    }
    for component in &to[common..] {
        rel.push(component);
    }
    rel
}

/// True when `a` was modified more recently than `b`, or `b` is missing.
///
/// Unreadable metadata on either side counts as "newer" so callers fall
/// back to regenerating.
pub fn newer(a: &Path, b: &Path) -> bool {
    let b_modified = match fs::metadata(b).and_then(|m| m.modified()) {
        Ok(time) => time,
        Err(_) => return true,
    };
    let a_modified = match fs::metadata(a).and_then(|m| m.modified()) {
        Ok(time) => time,
        Err(_) => return true,
    };
    a_modified > b_modified
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_detection() {
        assert!(has_module_suffix(Path::new("src/list.module.c")));
        assert!(!has_module_suffix(Path::new("src/list.c")));
        assert!(!has_module_suffix(Path::new("list.module.h")));
    }

    #[test]
    fn generated_paths() {
        assert_eq!(
            generated_source(Path::new("/src/list.module.c")),
            PathBuf::from("/src/list.c")
        );
        assert_eq!(
            generated_header(Path::new("/src/list.c")),
            PathBuf::from("/src/list.h")
        );
    }

    #[test]
    fn relative_same_directory() {
        let rel = relative(Path::new("/a/b/main.c"), Path::new("/a/b/dep.h"));
        assert_eq!(rel, PathBuf::from("dep.h"));
    }

    #[test]
    fn relative_subdirectory() {
        let rel = relative(Path::new("/a/main.c"), Path::new("/a/sub/dep.h"));
        assert_eq!(rel, PathBuf::from("sub/dep.h"));
    }

    #[test]
    fn relative_sibling_directory() {
        let rel = relative(Path::new("/a/b/main.c"), Path::new("/a/lib/dep.h"));
        assert_eq!(rel, PathBuf::from("../lib/dep.h"));
    }

    #[test]
    fn newer_without_target_is_true() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a");
        fs::write(&a, "x").expect("write");
        assert!(newer(&a, &dir.path().join("missing")));
    }
}
