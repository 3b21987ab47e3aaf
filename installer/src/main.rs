//! django-nonrel installer CLI entrypoint.
//!
//! Resolves the branch selector, then either installs the branch's libraries
//! into a fresh `django-nonrel` directory or deletes that directory. Any
//! failure is reported on stderr and ends the process with status 128.

use clap::Parser;
use nonrel_installer::branch::{Branch, Selector};
use nonrel_installer::cli::Cli;
use nonrel_installer::error::Result;
use nonrel_installer::extract::TarExtractor;
use nonrel_installer::fetch::HttpTransport;
use nonrel_installer::layout::InstallLayout;
use nonrel_installer::link::{NoSymlinks, PlatformSymlinker, Symlinker};
use nonrel_installer::manifest::Manifest;
use nonrel_installer::output::{DryRunInfo, write_error_report, write_stderr_line};
use nonrel_installer::pipeline::{Pipeline, PipelineContext, clean_install, plan};
use std::io::Write;

/// Exit status for every failure, including unknown arguments.
const FAILURE_EXIT_CODE: i32 = 128;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if err.print().is_err() {
                // Best-effort output; ignore write failures.
            }
            std::process::exit(exit_code_for_parse_error(&err));
        }
    };
    init_logging(&cli);
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn init_logging(cli: &Cli) {
    let init = env_logger::Builder::new()
        .filter_level(cli.log_level())
        .format_timestamp(None)
        .try_init();
    if init.is_err() {
        // A logger is already installed.
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let selector = cli.selector()?;
    let layout = InstallLayout::under(&cli.target_dir);

    let branch = match selector {
        Selector::Clean => return run_clean(cli, &layout, stderr),
        Selector::Install(branch) => branch,
    };
    announce_branch(cli, branch, stderr);

    let manifest = Manifest::for_branch(branch);
    if cli.dry_run {
        return run_dry(cli, &manifest, &layout, stderr);
    }

    let symlinker: &dyn Symlinker = if cli.no_symlinks {
        &NoSymlinks
    } else {
        &PlatformSymlinker
    };
    let mut pipeline = Pipeline::new(PipelineContext {
        layout: &layout,
        transport: &HttpTransport,
        extractor: &TarExtractor,
        symlinker,
        quiet: cli.quiet,
    });
    pipeline.install(&manifest, stderr)?;
    Ok(())
}

/// Prints the selected branch and any warnings about it.
fn announce_branch(cli: &Cli, branch: Branch, stderr: &mut dyn Write) {
    if cli.quiet {
        return;
    }
    if cli.branch.is_none() {
        write_stderr_line(
            stderr,
            format!(
                "Warning: Defaulting to option {}. Future default will be {}.",
                Branch::DEFAULT,
                Branch::Dev15
            ),
        );
    }
    if branch.is_deprecated() {
        write_stderr_line(
            stderr,
            format!("Warning: Option {branch} is no longer supported and will be removed in future releases."),
        );
    }
    write_stderr_line(stderr, format!(" {} selected", branch.description()));
}

/// Removes the install root.
fn run_clean(cli: &Cli, layout: &InstallLayout, stderr: &mut dyn Write) -> Result<()> {
    if cli.dry_run {
        write_stderr_line(stderr, "Dry run - no files will be modified");
        write_stderr_line(stderr, format!("Would delete {}", layout.root()));
        return Ok(());
    }

    clean_install(layout, cli.quiet, stderr)?;
    Ok(())
}

/// Shows the planned work without side effects.
fn run_dry(
    cli: &Cli,
    manifest: &Manifest,
    layout: &InstallLayout,
    stderr: &mut dyn Write,
) -> Result<()> {
    let libraries = plan(manifest, layout)?;
    let info = DryRunInfo {
        branch: manifest.branch(),
        root: layout.root(),
        no_symlinks: cli.no_symlinks,
        libraries: &libraries,
    };
    write_stderr_line(stderr, info.display_text());
    Ok(())
}

/// `--help` and `--version` exit cleanly; every other parse error is a
/// failure like any unknown argument.
fn exit_code_for_parse_error(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        FAILURE_EXIT_CODE
    } else {
        0
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_error_report(&err, stderr);
            FAILURE_EXIT_CODE
        }
    }
}
