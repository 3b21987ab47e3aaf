//! django-nonrel installer library.
//!
//! This crate downloads the source archives of a django-nonrel branch,
//! unpacks them, renames each extracted directory to its library name, and
//! links every library into the `django-testapp` project. It is used by the
//! `nonrel-install` CLI binary and can be driven programmatically, with the
//! network, archive and link steps behind injectable traits.
//!
//! # Modules
//!
//! - [`branch`] - Branch selector parsing
//! - [`clean`] - Removal of an installation
//! - [`cli`] - Command-line argument definitions
//! - [`error`] - Semantic error types with recovery hints
//! - [`extract`] - Tarball extraction
//! - [`fetch`] - Streamed archive downloads
//! - [`layout`] - Install root and link root paths
//! - [`link`] - Symbolic links with a move fallback
//! - [`manifest`] - Archive lists for each branch
//! - [`output`] - Status, dry-run and error report formatting
//! - [`pipeline`] - Staged install and clean orchestration
//! - [`resolve`] - Renaming extracted directories to library names

pub mod branch;
pub mod clean;
pub mod cli;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod layout;
pub mod link;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod resolve;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
