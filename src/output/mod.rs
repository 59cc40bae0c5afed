//! Writing artifacts
//!
//! Artifacts are first written to temporary files next to their final
//! location and only renamed into place once every artifact of a file
//! has been encoded, so a failed conversion leaves nothing behind.
use crate::error::{Error, Result};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

pub mod raster;
pub mod sidecar;

/// An artifact written to a temporary file, waiting to be committed
#[derive(Debug)]
pub struct Staged {
    file: NamedTempFile,
    target: PathBuf,
}

impl Staged {
    /// The path the artifact will be committed to
    pub fn target(&self) -> &Path {
        &self.target
    }
}

fn output_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Output(format!("{}: {}", path.display(), e))
}

fn parent_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Write an artifact to a temporary file in the directory of `target`
///
/// # Errors
///
/// Returns [`Error::Output`] if the temporary file cannot be created or
/// written, or whatever error `write` returns.
pub fn stage<F>(target: &Path, write: F) -> Result<Staged>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<()>,
{
    let mut file = NamedTempFile::new_in(parent_dir(target)).map_err(|e| output_error(target, e))?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        write(&mut writer)?;
        writer.flush().map_err(|e| output_error(target, e))?;
    }
    debug!("Staged {} at {}", target.display(), file.path().display());
    Ok(Staged {
        file,
        target: target.to_path_buf(),
    })
}

/// A file that was moved aside to make room for a new artifact
///
/// The saved copy lives in a temporary directory next to the target and
/// is deleted when the backup is dropped.
struct Backup {
    _dir: TempDir,
    saved: PathBuf,
}

/// Move an existing file at `target` aside
///
/// Directories are left alone; committing over one fails.
fn back_up(target: &Path) -> Result<Option<Backup>> {
    match std::fs::symlink_metadata(target) {
        Ok(meta) if !meta.is_dir() => {
            let dir = tempfile::Builder::new()
                .prefix(".backup")
                .tempdir_in(parent_dir(target))
                .map_err(|e| output_error(target, e))?;
            let saved = dir.path().join("previous");
            std::fs::rename(target, &saved).map_err(|e| output_error(target, e))?;
            debug!("Moved {} aside", target.display());
            Ok(Some(Backup { _dir: dir, saved }))
        }
        _ => Ok(None),
    }
}

fn restore(target: &Path, backup: Option<Backup>) {
    if let Some(backup) = backup {
        if let Err(e) = std::fs::rename(&backup.saved, target) {
            warn!("Unable to restore {}: {}", target.display(), e);
        }
    }
}

/// Undo committed artifacts, newest first
fn roll_back(committed: Vec<(PathBuf, Option<Backup>)>) {
    for (target, backup) in committed.into_iter().rev() {
        if let Err(e) = std::fs::remove_file(&target) {
            warn!("Unable to remove {}: {}", target.display(), e);
        }
        restore(&target, backup);
    }
}

/// Move staged artifacts into place
///
/// Files already at the targets are moved aside first. If any artifact
/// cannot be committed, the ones already committed are removed and
/// every previous file is put back, so the targets end up exactly as
/// they were. On success the previous files are deleted.
///
/// # Errors
///
/// Returns [`Error::Output`] naming the artifact that could not be committed.
pub fn commit(staged: Vec<Staged>) -> Result<Vec<PathBuf>> {
    let mut committed: Vec<(PathBuf, Option<Backup>)> = Vec::with_capacity(staged.len());
    for s in staged {
        let backup = match back_up(&s.target) {
            Ok(backup) => backup,
            Err(e) => {
                roll_back(committed);
                return Err(e);
            }
        };
        match s.file.persist(&s.target) {
            Ok(_) => committed.push((s.target, backup)),
            Err(e) => {
                restore(&s.target, backup);
                roll_back(committed);
                return Err(output_error(&s.target, e.error));
            }
        }
    }
    Ok(committed.into_iter().map(|(target, _)| target).collect())
}
