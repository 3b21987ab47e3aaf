//! Unit tests for pipeline orchestration.
//!
//! Archives come from a `StubTransport` serving synthetic tarballs shaped
//! like real GitHub and Bitbucket downloads, so the whole install runs
//! against a temporary directory.

use super::{Pipeline, PipelineContext, Stage, clean_install, plan};
use crate::branch::Branch;
use crate::clean::CleanOutcome;
use crate::error::InstallerError;
use crate::extract::{ArchiveExtractor, MockArchiveExtractor, TarExtractor};
use crate::fetch::{MockTransport, Transport};
use crate::layout::{InstallLayout, LINK_ROOT_NAME};
use crate::link::{LinkOutcome, NoSymlinks, PlatformSymlinker, Symlinker};
use crate::manifest::Manifest;
use crate::test_utils::StubTransport;
use camino::Utf8Path;
use rstest::{fixture, rstest};
use std::fs;
use tempfile::TempDir;

/// Fixture owning the temporary parent directory of the install root.
struct TestContext {
    _temp: TempDir,
    layout: InstallLayout,
    manifest: Manifest,
    transport: StubTransport,
}

impl TestContext {
    fn context<'a>(
        &'a self,
        transport: &'a dyn Transport,
        extractor: &'a dyn ArchiveExtractor,
        symlinker: &'a dyn Symlinker,
        quiet: bool,
    ) -> PipelineContext<'a> {
        PipelineContext {
            layout: &self.layout,
            transport,
            extractor,
            symlinker,
            quiet,
        }
    }

    fn link_root_names(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.layout.link_root())
            .expect("read link root")
            .map(|entry| {
                entry
                    .expect("dir entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }
}

#[fixture]
fn dev14() -> TestContext {
    let temp = tempfile::tempdir().expect("temp dir");
    let parent = Utf8Path::from_path(temp.path()).expect("UTF-8 path");
    let manifest = Manifest::for_branch(Branch::Dev14);
    let transport = StubTransport::for_manifest(&manifest).expect("synthetic archives");
    TestContext {
        layout: InstallLayout::under(parent),
        _temp: temp,
        manifest,
        transport,
    }
}

#[rstest]
fn install_places_every_library_in_the_link_root(dev14: TestContext) {
    let mut stderr = Vec::new();
    let mut pipeline = Pipeline::new(dev14.context(
        &dev14.transport,
        &TarExtractor,
        &PlatformSymlinker,
        false,
    ));

    let report = pipeline
        .install(&dev14.manifest, &mut stderr)
        .expect("install should succeed");

    assert_eq!(pipeline.stage(), Stage::Done);
    assert_eq!(report.archives.len(), 8);
    assert_eq!(report.links.len(), 8);
    assert_eq!(
        dev14.link_root_names(),
        vec![
            "autoload",
            "dbindexer",
            "django",
            "djangoappengine",
            "djangotoolbox",
            "manage.py",
            "permission_backend_nonrel",
            "search",
        ]
    );
    for (key, outcome) in &report.links {
        match outcome {
            LinkOutcome::SelfReference => assert_eq!(key, LINK_ROOT_NAME),
            LinkOutcome::Symlinked { link, .. } | LinkOutcome::Moved { to: link, .. } => {
                let entries = fs::read_dir(link).expect("link resolves to a directory").count();
                assert!(entries > 0, "{link} is empty");
            }
        }
    }

    let leftover_archives = fs::read_dir(dev14.layout.root())
        .expect("read root")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tar.gz"))
        .count();
    assert_eq!(leftover_archives, 0);

    let output = String::from_utf8(stderr).expect("UTF-8");
    assert!(output.contains("Downloading:"));
    assert!(output.contains("Extracting file:"));
    assert!(output.contains("Renaming: django-nonrel-djangotoolbox-"));
    assert!(output.contains("==FINISHED=="));
}

#[rstest]
fn no_symlinks_moves_libraries_into_place(dev14: TestContext) {
    let mut pipeline = Pipeline::new(dev14.context(
        &dev14.transport,
        &TarExtractor,
        &NoSymlinks,
        true,
    ));

    let report = pipeline
        .install(&dev14.manifest, &mut std::io::sink())
        .expect("install should succeed");

    let moved = report
        .links
        .iter()
        .filter(|(_, outcome)| matches!(outcome, LinkOutcome::Moved { .. }))
        .count();
    assert_eq!(moved, 7);
    let toolbox = dev14.layout.link_root().join("djangotoolbox");
    assert!(!fs::symlink_metadata(&toolbox).expect("metadata").file_type().is_symlink());
    assert!(toolbox.join("__init__.py").is_file());
    assert!(!dev14.layout.entry("djangotoolbox/djangotoolbox").exists());
}

#[rstest]
fn quiet_install_writes_nothing(dev14: TestContext) {
    let mut stderr = Vec::new();
    let mut pipeline = Pipeline::new(dev14.context(
        &dev14.transport,
        &TarExtractor,
        &NoSymlinks,
        true,
    ));

    pipeline
        .install(&dev14.manifest, &mut stderr)
        .expect("install should succeed");

    assert!(stderr.is_empty(), "{}", String::from_utf8_lossy(&stderr));
}

#[rstest]
fn existing_root_aborts_before_any_download(dev14: TestContext) {
    fs::create_dir(dev14.layout.root()).expect("seed old install");
    let mut transport = MockTransport::new();
    transport.expect_open().times(0);
    let mut pipeline = Pipeline::new(dev14.context(&transport, &TarExtractor, &NoSymlinks, true));

    let err = pipeline
        .install(&dev14.manifest, &mut std::io::sink())
        .expect_err("root already exists");

    assert!(matches!(err, InstallerError::DirectoryCreateFailed { .. }), "{err:?}");
    assert_eq!(pipeline.stage(), Stage::Init);
}

#[rstest]
fn missing_archive_stops_the_download_stage(dev14: TestContext) {
    let manifest = Manifest::for_branch(Branch::Dev15);
    let mut pipeline = Pipeline::new(dev14.context(
        &dev14.transport,
        &TarExtractor,
        &NoSymlinks,
        true,
    ));

    // The dev14 archives share the autoload URL only, so the second fetch 404s.
    let err = pipeline
        .install(&manifest, &mut std::io::sink())
        .expect_err("dev15 archives are not served");

    assert!(
        matches!(&err, InstallerError::ConnectionFailed { reason, .. } if reason.contains("404")),
        "{err:?}"
    );
    assert_eq!(pipeline.stage(), Stage::DirCreated);
    assert!(dev14.layout.entry("django-autoload.tar.gz").is_file());
}

#[rstest]
fn extraction_failure_skips_renaming_and_linking(dev14: TestContext) {
    let mut extractor = MockArchiveExtractor::new();
    extractor.expect_extract().times(1).returning(|archive, _| {
        Err(InstallerError::ExtractFailed {
            archive: archive.to_owned(),
            reason: "corrupt".to_owned(),
        })
    });
    let mut pipeline = Pipeline::new(dev14.context(
        &dev14.transport,
        &extractor,
        &NoSymlinks,
        true,
    ));

    let err = pipeline
        .install(&dev14.manifest, &mut std::io::sink())
        .expect_err("extraction fails");

    assert!(matches!(err, InstallerError::ExtractFailed { .. }));
    assert_eq!(pipeline.stage(), Stage::AllDownloaded);
    assert!(!dev14.layout.link_root().exists());
}

#[rstest]
fn clean_after_install_then_again(dev14: TestContext) {
    Pipeline::new(dev14.context(&dev14.transport, &TarExtractor, &NoSymlinks, true))
        .install(&dev14.manifest, &mut std::io::sink())
        .expect("install should succeed");

    let mut stderr = Vec::new();
    assert_eq!(
        clean_install(&dev14.layout, false, &mut stderr).expect("clean"),
        CleanOutcome::Removed
    );
    assert!(!dev14.layout.root().exists());
    assert_eq!(
        clean_install(&dev14.layout, false, &mut stderr).expect("clean twice"),
        CleanOutcome::AlreadyClean
    );
    assert!(String::from_utf8_lossy(&stderr).contains("Deleted"));
    assert!(String::from_utf8_lossy(&stderr).contains("Nothing to clean"));
}

#[rstest]
fn quiet_clean_writes_nothing(dev14: TestContext) {
    fs::create_dir(dev14.layout.root()).expect("seed install root");
    let mut stderr = Vec::new();

    let outcome = clean_install(&dev14.layout, true, &mut stderr).expect("clean");

    assert_eq!(outcome, CleanOutcome::Removed);
    assert!(stderr.is_empty());
}

#[rstest]
#[case::master(Branch::Master, "django-nonrel")]
#[case::dev13(Branch::Dev13, "django")]
#[case::dev15(Branch::Dev15, "django")]
fn plan_touches_nothing(dev14: TestContext, #[case] branch: Branch, #[case] fork_key: &str) {
    let libraries = plan(&Manifest::for_branch(branch), &dev14.layout).expect("plan");

    assert_eq!(libraries.len(), 8);
    let fork = libraries.last().expect("fork entry");
    assert_eq!(fork.key, fork_key);
    assert_eq!(
        fork.link.as_ref().map(|plan| plan.target.as_str()),
        Some(format!("../{fork_key}/django").as_str())
    );
    let testapp = libraries
        .iter()
        .find(|library| library.key == LINK_ROOT_NAME)
        .expect("link root entry");
    assert!(testapp.link.is_none());
    assert!(!dev14.layout.root().exists());
}
