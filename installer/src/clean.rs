//! Removing an installation.

use crate::error::{InstallerError, Result};
use camino::Utf8Path;
use log::{debug, info};
use std::fs;
use std::io::ErrorKind;

/// Result of a clean run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanOutcome {
    /// The install root existed and was deleted.
    Removed,
    /// There was nothing to delete.
    AlreadyClean,
}

/// Recursively delete `root`.
///
/// A missing root is not an error, so cleaning twice succeeds.
///
/// # Errors
///
/// Returns [`InstallerError::CleanFailed`] for any failure other than the
/// root being absent.
pub fn clean(root: &Utf8Path) -> Result<CleanOutcome> {
    match fs::remove_dir_all(root) {
        Ok(()) => {
            info!("removed {root}");
            Ok(CleanOutcome::Removed)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{root} does not exist; nothing to clean");
            Ok(CleanOutcome::AlreadyClean)
        }
        Err(source) => Err(InstallerError::CleanFailed {
            path: root.to_owned(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().join("django-nonrel")).expect("UTF-8 path");
        (temp, root)
    }

    #[test]
    fn removes_a_populated_tree() {
        let (_temp, root) = temp_root();
        fs::create_dir_all(root.join("django-testapp/nested")).expect("create tree");
        fs::write(root.join("djangotoolbox.tar.gz"), b"partial").expect("write file");

        assert_eq!(clean(&root).expect("clean"), CleanOutcome::Removed);
        assert!(!root.exists());
    }

    #[test]
    fn cleaning_twice_succeeds() {
        let (_temp, root) = temp_root();
        fs::create_dir(&root).expect("create root");

        assert_eq!(clean(&root).expect("first clean"), CleanOutcome::Removed);
        assert_eq!(clean(&root).expect("second clean"), CleanOutcome::AlreadyClean);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_removed_without_following() {
        let (temp, root) = temp_root();
        let outside = temp.path().join("outside");
        fs::create_dir(&outside).expect("create outside dir");
        fs::write(outside.join("keep.txt"), b"").expect("write file");
        fs::create_dir(&root).expect("create root");
        std::os::unix::fs::symlink(&outside, root.join("link")).expect("symlink");

        clean(&root).expect("clean");

        assert!(outside.join("keep.txt").is_file());
    }

    #[test]
    fn a_file_in_place_of_the_root_is_a_clean_failure() {
        let (_temp, root) = temp_root();
        fs::write(&root, b"not a directory").expect("write file");

        let err = clean(&root).expect_err("remove_dir_all on a file");

        assert!(matches!(err, InstallerError::CleanFailed { ref path, .. } if *path == root));
    }
}
