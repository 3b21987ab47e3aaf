//! Archive extraction.
//!
//! Unpacks `.tar.gz` and `.tar.bz2` archives into the install root, rejecting
//! entries that would escape it, then deletes the archive file.

use crate::error::{InstallerError, Result};
use bzip2::read::BzDecoder;
use camino::Utf8Path;
use flate2::read::GzDecoder;
use log::debug;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path};
use tar::EntryType;

/// Compression scheme of an archive, chosen by file name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// gzip-compressed tarball (`.tar.gz`, `.tgz`).
    Gzip,
    /// bzip2-compressed tarball (`.tar.bz2`, `.tbz2`, `.tbz`).
    Bzip2,
}

impl ArchiveFormat {
    /// Detect the format from the archive's file name.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use nonrel_installer::extract::ArchiveFormat;
    ///
    /// assert_eq!(
    ///     ArchiveFormat::from_path(Utf8Path::new("djangotoolbox.tar.gz")),
    ///     Some(ArchiveFormat::Gzip)
    /// );
    /// assert_eq!(ArchiveFormat::from_path(Utf8Path::new("djangotoolbox.zip")), None);
    /// ```
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        let name = path.file_name()?;
        if [".tar.gz", ".tgz"].iter().any(|s| name.ends_with(s)) {
            Some(Self::Gzip)
        } else if [".tar.bz2", ".tbz2", ".tbz"].iter().any(|s| name.ends_with(s)) {
            Some(Self::Bzip2)
        } else {
            None
        }
    }
}

/// Unpacks archives, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Unpack `archive` into `dest_dir`.
    ///
    /// Returns the sorted names of the top-level entries created.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::ExtractFailed`] if the suffix is not
    /// recognised, the archive is corrupt or empty, or an entry tries to
    /// escape `dest_dir`.
    fn extract(&self, archive: &Utf8Path, dest_dir: &Utf8Path) -> Result<Vec<String>>;
}

/// Extractor built on `tar` with `flate2` and `bzip2` decoders.
pub struct TarExtractor;

impl ArchiveExtractor for TarExtractor {
    fn extract(&self, archive: &Utf8Path, dest_dir: &Utf8Path) -> Result<Vec<String>> {
        let failed = |reason: String| InstallerError::ExtractFailed {
            archive: archive.to_owned(),
            reason,
        };
        let format = ArchiveFormat::from_path(archive)
            .ok_or_else(|| failed("unsupported archive suffix".to_owned()))?;
        let file = File::open(archive).map_err(|e| failed(e.to_string()))?;
        let reader: Box<dyn Read> = match format {
            ArchiveFormat::Gzip => Box::new(GzDecoder::new(file)),
            ArchiveFormat::Bzip2 => Box::new(BzDecoder::new(file)),
        };
        let top_level = unpack(reader, dest_dir.as_std_path()).map_err(|e| failed(e.to_string()))?;
        Ok(top_level.into_iter().collect())
    }
}

/// Unpack `archive` into `dest_dir`, then delete the archive.
///
/// # Errors
///
/// Returns [`InstallerError::ExtractFailed`] if unpacking fails or the
/// archive cannot be removed afterwards. On an unpack failure the archive is
/// left in place.
pub fn extract_and_remove(
    extractor: &dyn ArchiveExtractor,
    archive: &Utf8Path,
    dest_dir: &Utf8Path,
) -> Result<Vec<String>> {
    let top_level = extractor.extract(archive, dest_dir)?;
    debug!("extracted {archive}: {}", top_level.join(", "));
    fs::remove_file(archive).map_err(|e| InstallerError::ExtractFailed {
        archive: archive.to_owned(),
        reason: format!("could not delete archive: {e}"),
    })?;
    Ok(top_level)
}

#[derive(Debug, thiserror::Error)]
enum UnpackError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("path traversal detected: {path}")]
    PathTraversal { path: String },

    #[error("archive contains no entries")]
    EmptyArchive,
}

fn unpack(reader: impl Read, dest_dir: &Path) -> std::result::Result<BTreeSet<String>, UnpackError> {
    let mut archive = tar::Archive::new(reader);
    let mut top_level = BTreeSet::new();
    let mut any_entry = false;

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        // GitHub tarballs open with a pax global header carrying the commit id.
        if matches!(
            entry.header().entry_type(),
            EntryType::XGlobalHeader | EntryType::XHeader
        ) {
            continue;
        }
        let entry_path = entry.path()?.into_owned();
        validate_entry_path(&entry_path)?;
        if let Some(target) = entry.link_name()? {
            validate_link_target(&entry_path, &target)?;
        }
        any_entry = true;

        if let Some(Component::Normal(first)) = entry_path.components().next() {
            top_level.insert(first.to_string_lossy().into_owned());
        }

        // `unpack_in` refuses to write through symlinks leading out of `dest_dir`.
        if !entry.unpack_in(dest_dir)? {
            return Err(UnpackError::PathTraversal {
                path: entry_path.display().to_string(),
            });
        }
    }

    if any_entry {
        Ok(top_level)
    } else {
        Err(UnpackError::EmptyArchive)
    }
}

/// Reject absolute paths and `..` components.
fn validate_entry_path(path: &Path) -> std::result::Result<(), UnpackError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(UnpackError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Reject link targets that resolve outside the directory holding `entry`.
fn validate_link_target(entry: &Path, target: &Path) -> std::result::Result<(), UnpackError> {
    let escape = || UnpackError::PathTraversal {
        path: format!("{} -> {}", entry.display(), target.display()),
    };
    if target.is_absolute() {
        return Err(escape());
    }
    let mut depth = entry.parent().map_or(0, |parent| parent.components().count());
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => depth = depth.checked_sub(1).ok_or_else(escape)?,
            Component::RootDir | Component::Prefix(_) => return Err(escape()),
        }
    }
    Ok(())
}
