//! Output formatting for the installer CLI.
//!
//! Everything the user reads goes through an injected writer (stderr in the
//! binary): status lines, download progress, the dry-run plan, the closing
//! message and error reports.

use crate::branch::Branch;
use crate::error::InstallerError;
use crate::pipeline::PlannedLibrary;
use camino::Utf8Path;
use std::error::Error;
use std::fmt::Display;
use std::io::Write;

/// Where users should report problems.
pub const CONTACT: &str = "http://bitbucket.org/Sepero/install-django-nonrel/issues/new";

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Write `message` without a newline and flush, ignoring write failures.
///
/// Used for progress updates that end in a carriage return.
pub fn write_stderr_partial(stderr: &mut dyn Write, message: impl Display) {
    if write!(stderr, "{message}")
        .and_then(|()| stderr.flush())
        .is_err()
    {
        // Best-effort output; ignore write failures.
    }
}

/// Version and contact lines appended to every error report.
#[must_use]
pub fn help_block() -> String {
    format!(
        "nonrel-install {}\nReport issues to: {CONTACT}",
        env!("CARGO_PKG_VERSION")
    )
}

/// Write a full report for `err`: code and message, the chain of
/// underlying causes, the recovery hint, then [`help_block`].
///
/// # Example
///
/// ```
/// use nonrel_installer::error::InstallerError;
/// use nonrel_installer::output::write_error_report;
///
/// let err = InstallerError::LibraryNotFound { key: "djangotoolbox".to_owned() };
/// let mut stderr = Vec::new();
/// write_error_report(&err, &mut stderr);
///
/// let text = String::from_utf8(stderr).expect("UTF-8");
/// assert!(text.starts_with("error[library-not-found]:"));
/// assert!(text.contains("Report issues to:"));
/// ```
pub fn write_error_report(err: &InstallerError, stderr: &mut dyn Write) {
    write_stderr_line(stderr, format!("error[{}]: {err}", err.code()));
    let mut cause = err.source();
    while let Some(inner) = cause {
        write_stderr_line(stderr, format!("  caused by: {inner}"));
        cause = inner.source();
    }
    if let Some(hint) = err.hint() {
        write_stderr_line(stderr, format!("  hint: {hint}"));
    }
    write_stderr_line(stderr, "");
    write_stderr_line(stderr, help_block());
}

/// Format the closing message after a successful installation.
#[must_use]
pub fn success_message(library_count: usize, root: &Utf8Path, link_root: &Utf8Path) -> String {
    let plural = if library_count == 1 {
        "library"
    } else {
        "libraries"
    };
    format!(
        concat!(
            "==FINISHED==\n",
            "Installed {} {} to {}\n",
            "To start the test application, change to {} and run:\n",
            "  python manage.py runserver\n",
            "then point your browser to http://localhost:8000"
        ),
        library_count, plural, root, link_root
    )
}

/// Configuration information for dry-run output.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use nonrel_installer::branch::Branch;
/// use nonrel_installer::layout::InstallLayout;
/// use nonrel_installer::manifest::Manifest;
/// use nonrel_installer::output::DryRunInfo;
/// use nonrel_installer::pipeline::plan;
///
/// let layout = InstallLayout::under(Utf8Path::new("/srv"));
/// let manifest = Manifest::for_branch(Branch::Dev14);
/// let libraries = plan(&manifest, &layout).expect("valid manifest");
///
/// let info = DryRunInfo {
///     branch: Branch::Dev14,
///     root: layout.root(),
///     no_symlinks: false,
///     libraries: &libraries,
/// };
///
/// let output = info.display_text();
/// assert!(output.contains("Dry run"));
/// assert!(output.contains("djangotoolbox.tar.gz"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Branch that would be installed.
    pub branch: Branch,
    /// Install root that would be created.
    pub root: &'a Utf8Path,
    /// Whether directories would be moved rather than linked.
    pub no_symlinks: bool,
    /// Planned work for each library, in manifest order.
    pub libraries: &'a [PlannedLibrary],
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Branch: {} ({})", self.branch.token(), self.branch.description()),
            format!("Install root: {}", self.root),
            format!(
                "Link strategy: {}",
                if self.no_symlinks {
                    "move"
                } else {
                    "symlink, move on failure"
                }
            ),
            String::new(),
            "Libraries:".to_owned(),
        ];

        for library in self.libraries {
            lines.push(format!("  - {}", library.key));
            lines.push(format!("      from {}", library.url));
            lines.push(format!("      archive {}", library.archive));
            lines.push(library.link.as_ref().map_or_else(
                || "      link root".to_owned(),
                |plan| format!("      link {} -> {}", plan.link, plan.target),
            ));
        }

        lines.join("\n")
    }
}
