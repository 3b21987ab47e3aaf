//! Install and clean orchestration.
//!
//! The install pipeline runs in batched stages: every archive is downloaded,
//! then every archive is extracted, then every directory is renamed, then
//! every library is linked. A stage finishes for all libraries before the
//! next one starts, and the first failure aborts the run without rolling
//! anything back.

use crate::clean::{CleanOutcome, clean};
use crate::error::{InstallerError, Result};
use crate::extract::{ArchiveExtractor, extract_and_remove};
use crate::fetch::{DownloadedArchive, Fetcher, Transport};
use crate::layout::{InstallLayout, LINK_ROOT_NAME};
use crate::link::{LinkOutcome, LinkPlan, Linker, Symlinker, plan_link};
use crate::manifest::{Manifest, archive_file_name};
use crate::output::{success_message, write_stderr_line};
use crate::resolve::resolve_and_rename;
use camino::Utf8PathBuf;
use log::{debug, info};
use std::fmt;
use std::fs;
use std::io::{self, Write};

/// Progress of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing has happened yet.
    Init,
    /// The install root exists.
    DirCreated,
    /// Every archive is on disk.
    AllDownloaded,
    /// Every archive has been unpacked and deleted.
    AllExtracted,
    /// Every extracted directory carries its canonical name.
    AllRenamed,
    /// Every library is reachable from the link root.
    AllLinked,
    /// The install root has been removed.
    Cleaned,
    /// The run finished.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::DirCreated => "directory created",
            Self::AllDownloaded => "all downloaded",
            Self::AllExtracted => "all extracted",
            Self::AllRenamed => "all renamed",
            Self::AllLinked => "all linked",
            Self::Cleaned => "cleaned",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Collaborators and settings for a pipeline run.
pub struct PipelineContext<'a> {
    /// Locations of the install root and link root.
    pub layout: &'a InstallLayout,
    /// Source of archive bodies.
    pub transport: &'a dyn Transport,
    /// Unpacks downloaded archives.
    pub extractor: &'a dyn ArchiveExtractor,
    /// First strategy for placing libraries in the link root.
    pub symlinker: &'a dyn Symlinker,
    /// Suppress status lines and download progress.
    pub quiet: bool,
}

/// What an installation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// The install root.
    pub root: Utf8PathBuf,
    /// Archives as downloaded, with their recorded digests.
    pub archives: Vec<DownloadedArchive>,
    /// How each library reached the link root, keyed by library.
    pub links: Vec<(String, LinkOutcome)>,
}

/// The work planned for one library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLibrary {
    /// Library key and canonical directory name.
    pub key: &'static str,
    /// Archive URL.
    pub url: &'static str,
    /// Where the archive is saved.
    pub archive: Utf8PathBuf,
    /// Canonical directory after renaming.
    pub canonical: Utf8PathBuf,
    /// Link into the link root, or `None` for the link root itself.
    pub link: Option<LinkPlan>,
}

/// Work out what installing `manifest` into `layout` would do, without
/// touching the filesystem or the network.
///
/// # Errors
///
/// Returns [`InstallerError::MalformedUrl`] or
/// [`InstallerError::DuplicateLibrary`] for an invalid manifest.
pub fn plan(manifest: &Manifest, layout: &InstallLayout) -> Result<Vec<PlannedLibrary>> {
    let keys = manifest.library_keys()?;
    Ok(manifest
        .entries()
        .iter()
        .zip(keys)
        .map(|(entry, key)| PlannedLibrary {
            key,
            url: entry.url(),
            archive: layout.entry(archive_file_name(key)),
            canonical: layout.entry(key),
            link: plan_link(layout, key, entry.sub_path(), LINK_ROOT_NAME),
        })
        .collect())
}

/// Drives one install run.
pub struct Pipeline<'a> {
    context: PipelineContext<'a>,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline in [`Stage::Init`].
    #[must_use]
    pub const fn new(context: PipelineContext<'a>) -> Self {
        Self {
            context,
            stage: Stage::Init,
        }
    }

    /// Return the stage reached so far.
    ///
    /// After a failure this is the last stage that completed.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, next: Stage) {
        log_transition(self.stage, next);
        self.stage = next;
    }

    fn status(&self, stderr: &mut dyn Write, message: impl fmt::Display) {
        if !self.context.quiet {
            write_stderr_line(stderr, message);
        }
    }

    /// Install every library in `manifest`.
    ///
    /// Status lines and download progress go to `stderr` unless the context
    /// is quiet.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::DirectoryCreateFailed`] if the install root
    /// cannot be created (it must not exist yet), otherwise the first error
    /// raised by a stage.
    pub fn install(&mut self, manifest: &Manifest, stderr: &mut dyn Write) -> Result<InstallReport> {
        let keys = manifest.library_keys()?;
        let layout = self.context.layout;

        fs::create_dir(layout.root()).map_err(|source| InstallerError::DirectoryCreateFailed {
            path: layout.root().to_owned(),
            source,
        })?;
        self.advance(Stage::DirCreated);

        let archives = self.download_all(manifest, stderr)?;
        self.advance(Stage::AllDownloaded);

        for archive in &archives {
            self.status(stderr, format!("Extracting file: {}", archive.path));
            extract_and_remove(self.context.extractor, &archive.path, layout.root())?;
        }
        self.advance(Stage::AllExtracted);

        for key in &keys {
            let renamed = resolve_and_rename(layout, key)?;
            self.status(
                stderr,
                format!("Renaming: {} to {}", renamed.extracted_name, key),
            );
        }
        self.advance(Stage::AllRenamed);

        let linker = Linker::new(layout, self.context.symlinker);
        let mut links = Vec::with_capacity(keys.len());
        for (entry, key) in manifest.entries().iter().zip(&keys) {
            let outcome = linker.link(key, entry.sub_path(), LINK_ROOT_NAME)?;
            if outcome != LinkOutcome::SelfReference {
                self.status(stderr, &outcome);
            }
            links.push(((*key).to_owned(), outcome));
        }
        self.advance(Stage::AllLinked);

        self.status(stderr, "");
        self.status(
            stderr,
            success_message(keys.len(), layout.root(), &layout.link_root()),
        );
        self.advance(Stage::Done);

        Ok(InstallReport {
            root: layout.root().to_owned(),
            archives,
            links,
        })
    }

    fn download_all(
        &self,
        manifest: &Manifest,
        stderr: &mut dyn Write,
    ) -> Result<Vec<DownloadedArchive>> {
        let fetcher = Fetcher::new(self.context.transport, self.context.layout);
        let mut archives = Vec::with_capacity(manifest.len());
        for entry in manifest.entries() {
            let archive = if self.context.quiet {
                fetcher.download(entry.url(), &mut io::sink())?
            } else {
                fetcher.download(entry.url(), stderr)?
            };
            debug!("{} sha256 {}", archive.key, archive.sha256);
            archives.push(archive);
        }
        Ok(archives)
    }
}

/// Delete `layout`'s install root and everything in it.
///
/// Runs `Init -> Cleaned -> Done` without any download, extraction or link
/// collaborators. The outcome is reported on `stderr` unless `quiet`.
///
/// # Errors
///
/// Returns [`InstallerError::CleanFailed`] if the root exists but cannot be
/// removed.
pub fn clean_install(layout: &InstallLayout, quiet: bool, stderr: &mut dyn Write) -> Result<CleanOutcome> {
    let root = layout.root();
    let outcome = clean(root)?;
    log_transition(Stage::Init, Stage::Cleaned);
    if !quiet {
        let message = match outcome {
            CleanOutcome::Removed => format!("Deleted {root}"),
            CleanOutcome::AlreadyClean => format!("Nothing to clean at {root}"),
        };
        write_stderr_line(stderr, message);
    }
    log_transition(Stage::Cleaned, Stage::Done);
    Ok(outcome)
}

fn log_transition(from: Stage, to: Stage) {
    info!("stage: {from} -> {to}");
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
