//! Atomic file replacement.
//!
//! Output is staged to a sibling temporary file and renamed over the target
//! on commit. If the writer is aborted or dropped without committing, the
//! staging file is removed and the target is left untouched.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub struct AtomicFile {
    target: PathBuf,
    staging: PathBuf,
    file: Option<File>,
}

impl AtomicFile {
    /// Open a staged writer for `target`.
    pub fn create(target: impl Into<PathBuf>) -> io::Result<Self> {
        let target = target.into();
        let staging = staging_path(&target);
        let file = File::create(&staging)?;
        Ok(Self {
            target,
            staging,
            file: Some(file),
        })
    }

    /// Flush and rename the staged content over the target path.
    pub fn commit(mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        fs::rename(&self.staging, &self.target)
    }

    /// Discard the staged content.
    pub fn abort(mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        if self.file.take().is_some() {
            let _ = fs::remove_file(&self.staging);
        }
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.write(buf),
            None => Err(io::Error::other("write to committed atomic file")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        self.discard();
    }
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_replaces_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("out.c");
        fs::write(&target, "old").expect("seed target");

        let mut out = AtomicFile::create(&target).expect("create");
        out.write_all(b"new content").expect("write");
        out.commit().expect("commit");

        assert_eq!(fs::read_to_string(&target).expect("read"), "new content");
        assert!(!staging_path(&target).exists());
    }

    #[test]
    fn abort_leaves_target_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("out.c");
        fs::write(&target, "old").expect("seed target");

        let mut out = AtomicFile::create(&target).expect("create");
        out.write_all(b"partial").expect("write");
        out.abort();

        assert_eq!(fs::read_to_string(&target).expect("read"), "old");
        assert!(!staging_path(&target).exists());
    }

    #[test]
    fn drop_without_commit_cleans_staging() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("out.c");

        {
            let mut out = AtomicFile::create(&target).expect("create");
            out.write_all(b"partial").expect("write");
        }

        assert!(!target.exists());
        assert!(!staging_path(&target).exists());
    }
}
