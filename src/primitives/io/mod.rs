//! File plumbing: staged output that appears atomically, and read-only maps.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, warn};

use crate::types::{Result, WikiGraphError};

/// An output file written under a temporary name in the destination
/// directory and renamed over the destination by [`StagedFile::commit`].
///
/// Dropping an uncommitted `StagedFile` removes the temporary file.
#[derive(Debug)]
pub struct StagedFile {
    target: PathBuf,
    temp: NamedTempFile,
}

impl StagedFile {
    /// Creates the temporary file next to `target`.
    pub fn create(target: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        if target.file_name().is_none() {
            return Err(WikiGraphError::Invalid("output path has no file name"));
        }
        let temp = NamedTempFile::new_in(parent_dir(&target))?;
        debug!(
            target = %target.display(),
            temp = %temp.path().display(),
            "io.staged.create"
        );
        Ok(Self { target, temp })
    }

    /// The file being written.
    pub fn file_mut(&mut self) -> &mut File {
        self.temp.as_file_mut()
    }

    /// Destination path.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Syncs the data and renames the temporary file over the destination.
    pub fn commit(self) -> Result<PathBuf> {
        self.temp.as_file().sync_all()?;
        Ok(self.replace()?.finish())
    }

    /// Moves any existing destination aside, then renames the staged file
    /// into place. The old file is put back if the rename fails.
    fn replace(self) -> Result<Replaced> {
        let Self { target, temp } = self;
        let backup = if fs::symlink_metadata(&target).is_ok() {
            let slot = tempfile::Builder::new()
                .prefix(".wikigraph-old")
                .tempfile_in(parent_dir(&target))?
                .into_temp_path();
            fs::rename(&target, &slot)?;
            Some(slot)
        } else {
            None
        };
        if let Err(err) = temp.persist(&target) {
            if backup.is_some() {
                Replaced { target, backup }.rollback();
            }
            return Err(err.error.into());
        }
        debug!(target = %target.display(), "io.staged.commit");
        Ok(Replaced { target, backup })
    }
}

/// Commits staged files as a group.
///
/// If any file cannot be put in place, the destinations already replaced are
/// restored to their previous contents (or removed if they did not exist), so
/// the group is never left half old and half new.
pub fn commit_all(files: Vec<StagedFile>) -> Result<Vec<PathBuf>> {
    for file in &files {
        file.temp.as_file().sync_all()?;
    }
    let mut done: Vec<Replaced> = Vec::with_capacity(files.len());
    for file in files {
        match file.replace() {
            Ok(replaced) => done.push(replaced),
            Err(err) => {
                for replaced in done.into_iter().rev() {
                    replaced.rollback();
                }
                return Err(err);
            }
        }
    }
    Ok(done.into_iter().map(Replaced::finish).collect())
}

/// A destination that now holds new contents, with the previous file parked
/// next to it until the commit is final.
struct Replaced {
    target: PathBuf,
    backup: Option<TempPath>,
}

impl Replaced {
    fn finish(self) -> PathBuf {
        // Dropping the backup deletes the previous file.
        self.target
    }

    fn rollback(self) {
        let restored = match &self.backup {
            Some(backup) => fs::rename(backup, &self.target),
            None => fs::remove_file(&self.target).or_else(|err| match err.kind() {
                io::ErrorKind::NotFound => Ok(()),
                _ => Err(err),
            }),
        };
        match restored {
            Ok(()) => debug!(target = %self.target.display(), "io.staged.rollback"),
            Err(err) => warn!(
                target = %self.target.display(),
                %err,
                "io.staged.rollback_failed"
            ),
        }
    }
}

fn parent_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Maps `file` read-only.
///
/// The store never writes through or truncates a mapped file; callers must
/// not modify graph files while a reader holds them open.
#[allow(unsafe_code)]
pub fn map_readonly(file: &File) -> io::Result<Mmap> {
    // SAFETY: the mapping is read-only and the store treats graph files as
    // immutable once written.
    unsafe { Mmap::map(file) }
}
