//! Renaming extracted directories to their library keys.
//!
//! Archive services name the extracted directory after the owner, the
//! repository, and the revision, e.g. `django-nonrel-djangotoolbox-1a2b3c4`.
//! The directory belonging to library `key` is the one whose name contains
//! `-<key>-`. Exactly one directory must match; a second match is reported
//! instead of guessing.

use crate::error::{InstallerError, Result};
use crate::layout::InstallLayout;
use camino::Utf8PathBuf;
use log::debug;
use std::fs;

/// Select the single name in `names` that contains `-<key>-`.
///
/// # Errors
///
/// Returns [`InstallerError::LibraryNotFound`] when nothing matches and
/// [`InstallerError::AmbiguousLibrary`] when more than one name does.
///
/// # Examples
///
/// ```
/// use nonrel_installer::resolve::find_infix_match;
///
/// // django-testapp has already been renamed, so only the fork matches.
/// let names = ["django-testapp", "django-nonrel-django-5a4b3c2"];
/// let found = find_infix_match(names, "django").expect("one match");
/// assert_eq!(found, "django-nonrel-django-5a4b3c2");
///
/// let both = ["django-nonrel-django-testapp-9f8e7d6", "django-nonrel-django-5a4b3c2"];
/// assert!(find_infix_match(both, "django").is_err());
/// ```
pub fn find_infix_match<I, S>(names: I, key: &str) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let infix = format!("-{key}-");
    let mut candidates: Vec<String> = names
        .into_iter()
        .filter(|name| name.as_ref().contains(&infix))
        .map(|name| name.as_ref().to_owned())
        .collect();
    candidates.sort();

    match candidates.len() {
        0 => Err(InstallerError::LibraryNotFound {
            key: key.to_owned(),
        }),
        1 => Ok(candidates.swap_remove(0)),
        _ => Err(InstallerError::AmbiguousLibrary {
            key: key.to_owned(),
            candidates,
        }),
    }
}

/// List the directories directly under the install root.
fn directory_names(layout: &InstallLayout) -> Result<Vec<String>> {
    let scan_failed = |source| InstallerError::ScanFailed {
        path: layout.root().to_owned(),
        source,
    };
    let mut names = Vec::new();
    for entry in layout.root().read_dir_utf8().map_err(scan_failed)? {
        let entry = entry.map_err(scan_failed)?;
        if entry.file_type().map_err(scan_failed)?.is_dir() {
            names.push(entry.file_name().to_owned());
        }
    }
    Ok(names)
}

/// An extracted directory after renaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedDirectory {
    /// Name the archive gave the directory.
    pub extracted_name: String,
    /// Canonical path, `<root>/<key>`.
    pub path: Utf8PathBuf,
}

/// Rename the extracted directory of `key` to `<root>/<key>`.
///
/// # Errors
///
/// Returns [`InstallerError::ScanFailed`] if the root cannot be listed,
/// [`InstallerError::LibraryNotFound`] or
/// [`InstallerError::AmbiguousLibrary`] if the infix does not pick out one
/// directory, [`InstallerError::PathAlreadyExists`] if the canonical name is
/// taken (nothing is renamed), and [`InstallerError::RenameFailed`] if the
/// rename itself fails.
pub fn resolve_and_rename(layout: &InstallLayout, key: &str) -> Result<RenamedDirectory> {
    let extracted_name = find_infix_match(directory_names(layout)?, key)?;
    let from = layout.entry(&extracted_name);
    let to = layout.entry(key);

    // symlink_metadata so a dangling link left behind also counts as taken.
    if fs::symlink_metadata(&to).is_ok() {
        return Err(InstallerError::PathAlreadyExists { path: to });
    }

    debug!("renaming {from} to {to}");
    fs::rename(&from, &to).map_err(|source| InstallerError::RenameFailed {
        from,
        to: to.clone(),
        source,
    })?;
    Ok(RenamedDirectory {
        extracted_name,
        path: to,
    })
}
