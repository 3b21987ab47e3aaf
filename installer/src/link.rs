//! Linking libraries into the link root.
//!
//! Each library is exposed inside the link root as a relative symbolic link.
//! Where links cannot be created (older Windows filesystems, restricted
//! accounts) the library directory is moved into the link root instead.

use crate::error::{InstallerError, Result};
use crate::layout::InstallLayout;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::fmt;
use std::fs;
use std::io;

/// Creates directory symbolic links.
#[cfg_attr(test, mockall::automock)]
pub trait Symlinker {
    /// Create a symbolic link at `link` pointing to `target`.
    ///
    /// `target` is interpreted relative to the directory containing `link`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error reported by the platform, or
    /// [`io::ErrorKind::Unsupported`] where links are unavailable.
    fn symlink_dir(&self, target: &Utf8Path, link: &Utf8Path) -> io::Result<()>;
}

/// Symbolic links through the platform primitive.
pub struct PlatformSymlinker;

impl Symlinker for PlatformSymlinker {
    #[cfg(unix)]
    fn symlink_dir(&self, target: &Utf8Path, link: &Utf8Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(windows)]
    fn symlink_dir(&self, target: &Utf8Path, link: &Utf8Path) -> io::Result<()> {
        std::os::windows::fs::symlink_dir(target, link)
    }

    #[cfg(not(any(unix, windows)))]
    fn symlink_dir(&self, _target: &Utf8Path, _link: &Utf8Path) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }
}

/// Refuses every link, so libraries are always moved.
pub struct NoSymlinks;

impl Symlinker for NoSymlinks {
    fn symlink_dir(&self, _target: &Utf8Path, _link: &Utf8Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "symbolic links disabled",
        ))
    }
}

/// How a library ended up in the link root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The library is the link root; nothing to do.
    SelfReference,
    /// A relative symbolic link was created.
    Symlinked {
        /// Path of the new link.
        link: Utf8PathBuf,
        /// Relative target stored in the link.
        target: Utf8PathBuf,
    },
    /// The library directory was moved into the link root.
    Moved {
        /// Original location.
        from: Utf8PathBuf,
        /// New location inside the link root.
        to: Utf8PathBuf,
    },
}

impl fmt::Display for LinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfReference => f.write_str("link root, not linked"),
            Self::Symlinked { link, target } => write!(f, "Symlinking {link} to {target}"),
            Self::Moved { from, to } => write!(f, "Moving folder {from} to {to}"),
        }
    }
}

/// Where one library will appear in the link root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPlan {
    /// Library directory, relative to the install root.
    pub source: Utf8PathBuf,
    /// Entry created inside the link root.
    pub link: Utf8PathBuf,
    /// Relative target stored in a symbolic link.
    pub target: Utf8PathBuf,
}

/// Work out the link for `canonical[/sub_path]`.
///
/// Returns `None` for the link root itself. The link is named after
/// `sub_path`, or after `canonical` when the whole archive is linked.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use nonrel_installer::layout::{InstallLayout, LINK_ROOT_NAME};
/// use nonrel_installer::link::plan_link;
///
/// let layout = InstallLayout::under(Utf8Path::new("/srv"));
/// let plan = plan_link(&layout, "djangotoolbox", "djangotoolbox", LINK_ROOT_NAME)
///     .expect("not the link root");
/// assert_eq!(plan.link, "/srv/django-nonrel/django-testapp/djangotoolbox");
/// assert_eq!(plan.target, "../djangotoolbox/djangotoolbox");
/// assert!(plan_link(&layout, LINK_ROOT_NAME, "", LINK_ROOT_NAME).is_none());
/// ```
#[must_use]
pub fn plan_link(
    layout: &InstallLayout,
    canonical: &str,
    sub_path: &str,
    link_root: &str,
) -> Option<LinkPlan> {
    if canonical == link_root {
        return None;
    }
    let (source, link_name) = if sub_path.is_empty() {
        (Utf8PathBuf::from(canonical), canonical)
    } else {
        (Utf8Path::new(canonical).join(sub_path), sub_path)
    };
    Some(LinkPlan {
        link: layout.entry(link_root).join(link_name),
        target: Utf8Path::new("..").join(&source),
        source,
    })
}

/// Places canonical library directories into the link root.
pub struct Linker<'a> {
    layout: &'a InstallLayout,
    symlinker: &'a dyn Symlinker,
}

impl<'a> Linker<'a> {
    /// Create a linker using `symlinker` as the first strategy.
    #[must_use]
    pub const fn new(layout: &'a InstallLayout, symlinker: &'a dyn Symlinker) -> Self {
        Self { layout, symlinker }
    }

    /// Expose `canonical[/sub_path]` inside `link_root`, as planned by
    /// [`plan_link`].
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::LinkFailed`] if the symbolic link fails and
    /// the fallback move fails too.
    pub fn link(&self, canonical: &str, sub_path: &str, link_root: &str) -> Result<LinkOutcome> {
        let Some(LinkPlan {
            source,
            link,
            target,
        }) = plan_link(self.layout, canonical, sub_path, link_root)
        else {
            return Ok(LinkOutcome::SelfReference);
        };

        match self.symlinker.symlink_dir(&target, &link) {
            Ok(()) => {
                debug!("linked {link} -> {target}");
                Ok(LinkOutcome::Symlinked { link, target })
            }
            Err(e) => {
                warn!("symbolic link {link} failed ({e}); moving the directory instead");
                let from = self.layout.entry(&source);
                fs::rename(&from, &link).map_err(|source_err| InstallerError::LinkFailed {
                    source_path: from.clone(),
                    destination: link.clone(),
                    source: source_err,
                })?;
                Ok(LinkOutcome::Moved { from, to: link })
            }
        }
    }
}
