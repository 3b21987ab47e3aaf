//! CLI argument definitions for the django-nonrel installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::branch::Selector;
use crate::error::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use log::LevelFilter;

/// Install django-nonrel and its companion libraries.
#[derive(Parser, Debug, Clone)]
#[command(name = "nonrel-install")]
#[command(version, about)]
#[command(long_about = concat!(
    "Install django-nonrel and its companion libraries.\n\n",
    "Downloads the source archives for the selected branch, unpacks them into ",
    "a new django-nonrel directory, and links every library into the ",
    "django-testapp project so it runs out of the box.",
))]
#[command(after_help = concat!(
    "BRANCHES:\n",
    "  --master     Master 1.3 branches (deprecated, the current default)\n",
    "  --dev13      Development 1.3 branches (aliases: --dev, --develop)\n",
    "  --dev14      Development 1.4 branches\n",
    "  --dev15      Development 1.5 branches\n",
    "  --clean      Delete the django-nonrel directory and exit\n\n",
    "EXAMPLES:\n",
    "  Install the 1.4 development branches here:\n",
    "    $ nonrel-install --dev14\n\n",
    "  Start over:\n",
    "    $ nonrel-install --clean\n\n",
    "  Preview without downloading:\n",
    "    $ nonrel-install --dev15 --dry-run",
))]
pub struct Cli {
    /// Branch to install, or --clean to remove an installation.
    #[arg(value_name = "BRANCH", allow_hyphen_values = true)]
    pub branch: Option<String>,

    /// Directory in which django-nonrel/ is created.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub target_dir: Utf8PathBuf,

    /// Move libraries into django-testapp instead of linking them.
    #[arg(long)]
    pub no_symlinks: bool,

    /// Show the planned work and exit without downloading anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Default for Cli {
    /// Creates a `Cli` with no branch, the current directory as target and
    /// every flag off.
    ///
    /// # Examples
    ///
    /// ```
    /// use nonrel_installer::cli::Cli;
    ///
    /// let cli = Cli::default();
    /// assert!(cli.branch.is_none());
    /// assert_eq!(cli.target_dir, ".");
    /// ```
    fn default() -> Self {
        Self {
            branch: None,
            target_dir: Utf8PathBuf::from("."),
            no_symlinks: false,
            dry_run: false,
            verbosity: 0,
            quiet: false,
        }
    }
}

impl Cli {
    /// Resolve the branch argument, falling back to the default branch.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::InstallerError::UnknownArgument`] for an
    /// unrecognised token.
    pub fn selector(&self) -> Result<Selector> {
        Selector::resolve(self.branch.as_deref())
    }

    /// Log level implied by `--quiet` and the `-v` count.
    #[must_use]
    pub const fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
