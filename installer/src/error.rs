//! Error types for the django-nonrel installer.
//!
//! Every failure the installer can meet is fatal at the point of detection.
//! The variants carry the offending path, URL, or token so the report printed
//! by the binary can point at the exact stage that failed, and most of them
//! provide a recovery hint.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while installing or cleaning the library layout.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The branch selector token was not recognised.
    #[error("unknown argument: {token}; expected one of: {expected}")]
    UnknownArgument {
        /// The literal token given on the command line.
        token: String,
        /// Space-separated list of accepted tokens.
        expected: String,
    },

    /// The install root could not be created (it usually already exists).
    #[error("failed to create install directory {path}")]
    DirectoryCreateFailed {
        /// Path of the install root.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The local archive file could not be opened for writing.
    #[error("failed to open {path} for writing")]
    FileOpenFailed {
        /// Path of the archive file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The remote archive could not be fetched.
    #[error("failed to connect to {url}: {reason}")]
    ConnectionFailed {
        /// The requested URL.
        url: String,
        /// Description of the transport or HTTP failure.
        reason: String,
    },

    /// Reading the response body failed part way through a download.
    #[error("failed to read from {url}")]
    ReadFailed {
        /// The URL being downloaded.
        url: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the downloaded bytes to disk failed.
    #[error("failed to save download to {path}")]
    WriteFailed {
        /// Path of the archive file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An archive could not be unpacked or removed afterwards.
    #[error("failed to extract archive {archive}: {reason}")]
    ExtractFailed {
        /// Path of the archive file.
        archive: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Listing the install root failed while looking for an extracted directory.
    #[error("failed to list directory {path}")]
    ScanFailed {
        /// The directory being listed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Renaming an extracted directory to its canonical name failed.
    #[error("failed to rename {from} to {to}")]
    RenameFailed {
        /// The extracted directory.
        from: Utf8PathBuf,
        /// The canonical destination.
        to: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The canonical name of a library is already taken.
    #[error("path name already exists: {path}")]
    PathAlreadyExists {
        /// The pre-existing path.
        path: Utf8PathBuf,
    },

    /// No extracted directory carries the expected `-<key>-` infix.
    #[error("could not find a directory name containing -{key}-")]
    LibraryNotFound {
        /// The library key that was searched for.
        key: String,
    },

    /// More than one extracted directory carries the expected infix.
    #[error("several directories match -{key}-: {}", .candidates.join(", "))]
    AmbiguousLibrary {
        /// The library key that was searched for.
        key: String,
        /// Every matching directory name, sorted.
        candidates: Vec<String>,
    },

    /// Neither a symbolic link nor the fallback move could place a library.
    #[error("could not link or move {source_path} to {destination}")]
    LinkFailed {
        /// The library directory that should have been linked.
        source_path: Utf8PathBuf,
        /// The path inside the link root.
        destination: Utf8PathBuf,
        /// The error returned by the fallback move.
        #[source]
        source: std::io::Error,
    },

    /// Removing the install root failed for a reason other than absence.
    #[error("failed to delete {path}")]
    CleanFailed {
        /// The install root.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A manifest URL has no repository segment to name its archive after.
    #[error("cannot derive a library name from {url}")]
    MalformedUrl {
        /// The offending URL.
        url: String,
    },

    /// Two manifest entries derive the same library key.
    #[error("library {key} appears more than once in the manifest")]
    DuplicateLibrary {
        /// The repeated key.
        key: String,
    },
}

impl InstallerError {
    /// Return a short, stable identifier for the error kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use nonrel_installer::error::InstallerError;
    ///
    /// let err = InstallerError::LibraryNotFound { key: "djangotoolbox".to_owned() };
    /// assert_eq!(err.code(), "library-not-found");
    /// ```
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownArgument { .. } => "unknown-argument",
            Self::DirectoryCreateFailed { .. } => "directory-create",
            Self::FileOpenFailed { .. } => "file-open",
            Self::ConnectionFailed { .. } => "connection",
            Self::ReadFailed { .. } => "read",
            Self::WriteFailed { .. } => "write",
            Self::ExtractFailed { .. } => "extract",
            Self::ScanFailed { .. } => "scan",
            Self::RenameFailed { .. } => "rename",
            Self::PathAlreadyExists { .. } => "path-exists",
            Self::LibraryNotFound { .. } => "library-not-found",
            Self::AmbiguousLibrary { .. } => "ambiguous-library",
            Self::LinkFailed { .. } => "link",
            Self::CleanFailed { .. } => "clean",
            Self::MalformedUrl { .. } => "malformed-url",
            Self::DuplicateLibrary { .. } => "duplicate-library",
        }
    }

    /// Return a recovery hint for errors the user can act on.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match self {
            Self::DirectoryCreateFailed { .. } | Self::FileOpenFailed { .. } => {
                Some("run with --clean to remove an old install")
            }
            Self::PathAlreadyExists { .. } => {
                Some("if installing twice, run with --clean and begin again")
            }
            Self::LibraryNotFound { .. } | Self::AmbiguousLibrary { .. } => {
                Some("the archive layout may have changed upstream; run with --clean and retry")
            }
            Self::UnknownArgument { .. } => Some("run with --help to see usage"),
            _ => None,
        }
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
