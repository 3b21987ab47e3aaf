//! Paths of the install root and the link root.
//!
//! Every component receives an [`InstallLayout`] instead of relying on the
//! process working directory, so the whole run can be pointed at any parent
//! directory (a temporary directory in tests).

use camino::{Utf8Path, Utf8PathBuf};

/// Name of the directory created to hold the installation.
pub const INSTALL_DIR_NAME: &str = "django-nonrel";

/// Library whose directory receives the links to every other library.
pub const LINK_ROOT_NAME: &str = "django-testapp";

/// Resolved locations for one installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: Utf8PathBuf,
}

impl InstallLayout {
    /// Lay out an installation under `parent`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use nonrel_installer::layout::InstallLayout;
    ///
    /// let layout = InstallLayout::under(Utf8Path::new("/srv"));
    /// assert_eq!(layout.root(), "/srv/django-nonrel");
    /// assert_eq!(layout.link_root(), "/srv/django-nonrel/django-testapp");
    /// ```
    #[must_use]
    pub fn under(parent: &Utf8Path) -> Self {
        Self {
            root: parent.join(INSTALL_DIR_NAME),
        }
    }

    /// Return the install root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Return the path of an entry directly inside the install root.
    #[must_use]
    pub fn entry(&self, name: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        self.root.join(name)
    }

    /// Return the link root.
    #[must_use]
    pub fn link_root(&self) -> Utf8PathBuf {
        self.entry(LINK_ROOT_NAME)
    }
}
