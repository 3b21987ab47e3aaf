//! Static archive manifests for each django-nonrel branch.
//!
//! A manifest is the ordered list of archives a branch needs together with
//! the sub-directory of each archive that ends up in the link root. The
//! order is significant: every later stage walks the manifest in the same
//! order, and the final entry (the django fork) can only be matched once the
//! others have been renamed out of the way.

use crate::branch::Branch;
use crate::error::{InstallerError, Result};
use std::collections::HashSet;

/// Suffix appended to the library key to name the downloaded archive.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// The autoload library shipped with every branch.
pub const AUTOLOAD: LibraryEntry = LibraryEntry::new(
    "http://bitbucket.org/twanschik/django-autoload/get/default.tar.gz",
    "autoload",
);

const MASTER_URLS: [&str; 7] = [
    "http://github.com/django-nonrel/djangotoolbox/tarball/toolbox-1.3",
    "http://github.com/django-nonrel/djangoappengine/tarball/appengine-1.3",
    "http://github.com/django-nonrel/django-dbindexer/tarball/dbindexer-1.3",
    "http://github.com/django-nonrel/django-testapp/tarball/testapp-1.3",
    "http://github.com/django-nonrel/nonrel-search/tarball/master",
    "http://github.com/django-nonrel/django-permission-backend-nonrel/tarball/master",
    "http://github.com/django-nonrel/django-nonrel/tarball/master",
];

const DEV13_URLS: [&str; 7] = [
    "http://github.com/django-nonrel/djangotoolbox/tarball/toolbox-1.3",
    "http://github.com/django-nonrel/djangoappengine/tarball/appengine-1.3",
    "http://github.com/django-nonrel/django-dbindexer/tarball/dbindexer-1.3",
    "http://github.com/django-nonrel/django-testapp/tarball/testapp-1.3",
    "http://github.com/django-nonrel/nonrel-search/tarball/develop",
    "http://github.com/django-nonrel/django-permission-backend-nonrel/tarball/develop",
    "http://github.com/django-nonrel/django/tarball/nonrel-1.3",
];

const DEV14_URLS: [&str; 7] = [
    "http://github.com/django-nonrel/djangotoolbox/tarball/toolbox-1.4",
    "http://github.com/django-nonrel/djangoappengine/tarball/appengine-1.4",
    "http://github.com/django-nonrel/django-dbindexer/tarball/dbindexer-1.4",
    "http://github.com/django-nonrel/django-testapp/tarball/testapp-1.4",
    "http://github.com/django-nonrel/nonrel-search/tarball/develop",
    "http://github.com/django-nonrel/django-permission-backend-nonrel/tarball/develop",
    "http://github.com/django-nonrel/django/tarball/nonrel-1.4",
];

const DEV15_URLS: [&str; 7] = [
    "http://github.com/django-nonrel/djangotoolbox/tarball/toolbox-1.5-beta",
    "http://github.com/django-nonrel/djangoappengine/tarball/appengine-1.5-beta",
    "http://github.com/django-nonrel/django-dbindexer/tarball/dbindexer-1.5-beta",
    "http://github.com/django-nonrel/django-testapp/tarball/testapp-1.5-beta",
    "http://github.com/django-nonrel/nonrel-search/tarball/develop",
    "http://github.com/django-nonrel/django-permission-backend-nonrel/tarball/develop",
    "http://github.com/django-nonrel/django/tarball/nonrel-1.5-beta",
];

/// Sub-paths paired index-by-index with the branch URLs.
///
/// django-testapp is the link root itself, so its sub-path is empty.
const BRANCH_SUB_PATHS: [&str; 7] = [
    "djangotoolbox",
    "djangoappengine",
    "dbindexer",
    "",
    "search",
    "permission_backend_nonrel",
    "django",
];

/// One archive to download and the directory inside it to link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryEntry {
    url: &'static str,
    sub_path: &'static str,
}

impl LibraryEntry {
    /// Create an entry from a URL and a sub-path (empty for the archive root).
    #[must_use]
    pub const fn new(url: &'static str, sub_path: &'static str) -> Self {
        Self { url, sub_path }
    }

    /// Return the archive URL.
    #[must_use]
    pub const fn url(&self) -> &'static str {
        self.url
    }

    /// Return the directory inside the archive to link, or `""` for the root.
    #[must_use]
    pub const fn sub_path(&self) -> &'static str {
        self.sub_path
    }

    /// Return the library key derived from the URL.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::MalformedUrl`] if the URL has no repository
    /// segment.
    pub fn key(&self) -> Result<&'static str> {
        library_key(self.url)
    }
}

/// Derive the library key from an archive URL.
///
/// The key is the repository segment of the URL path, which for both GitHub
/// and Bitbucket URLs is the fifth `/`-separated piece.
///
/// # Errors
///
/// Returns [`InstallerError::MalformedUrl`] if the segment is missing or
/// empty.
///
/// # Examples
///
/// ```
/// use nonrel_installer::manifest::library_key;
///
/// let key = library_key("http://github.com/django-nonrel/djangotoolbox/tarball/toolbox-1.4")
///     .expect("valid URL");
/// assert_eq!(key, "djangotoolbox");
/// ```
pub fn library_key(url: &str) -> Result<&str> {
    url.split('/')
        .nth(4)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| InstallerError::MalformedUrl {
            url: url.to_owned(),
        })
}

/// Return the local archive file name for a library key.
#[must_use]
pub fn archive_file_name(key: &str) -> String {
    format!("{key}{ARCHIVE_SUFFIX}")
}

/// The ordered list of libraries for one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    branch: Branch,
    entries: Vec<LibraryEntry>,
}

impl Manifest {
    /// Build the manifest for a branch.
    ///
    /// # Examples
    ///
    /// ```
    /// use nonrel_installer::branch::Branch;
    /// use nonrel_installer::manifest::{AUTOLOAD, Manifest};
    ///
    /// let manifest = Manifest::for_branch(Branch::Dev14);
    /// assert_eq!(manifest.entries().first(), Some(&AUTOLOAD));
    /// ```
    #[must_use]
    pub fn for_branch(branch: Branch) -> Self {
        let urls = match branch {
            Branch::Master => &MASTER_URLS,
            Branch::Dev13 => &DEV13_URLS,
            Branch::Dev14 => &DEV14_URLS,
            Branch::Dev15 => &DEV15_URLS,
        };
        let entries = std::iter::once(AUTOLOAD)
            .chain(
                urls.iter()
                    .copied()
                    .zip(BRANCH_SUB_PATHS)
                    .map(|(url, sub_path)| LibraryEntry::new(url, sub_path)),
            )
            .collect();
        Self { branch, entries }
    }

    /// Return the branch this manifest belongs to.
    #[must_use]
    pub const fn branch(&self) -> Branch {
        self.branch
    }

    /// Return the entries in installation order.
    #[must_use]
    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    /// Return the number of libraries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest lists no libraries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Derive the key of every entry, in order.
    ///
    /// Two entries with the same key would download to the same archive file
    /// and fight over the same canonical directory, so duplicates are
    /// rejected here before anything touches the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::MalformedUrl`] or
    /// [`InstallerError::DuplicateLibrary`].
    pub fn library_keys(&self) -> Result<Vec<&'static str>> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(|entry| {
                let key = entry.key()?;
                if seen.insert(key) {
                    Ok(key)
                } else {
                    Err(InstallerError::DuplicateLibrary {
                        key: key.to_owned(),
                    })
                }
            })
            .collect()
    }
}
