//! Shared test utilities for the installer crate.
//!
//! Builds synthetic archives shaped like the ones GitHub and Bitbucket serve,
//! and a [`StubTransport`] that hands them out without touching the network.

use crate::fetch::{Transport, TransportError};
use crate::manifest::{Manifest, library_key};
use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};

/// Compression applied by [`tarball`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// gzip, as served for `.tar.gz` downloads.
    Gzip,
    /// bzip2.
    Bzip2,
}

/// Build a compressed tarball whose files all live under `top_dir`.
///
/// `files` holds `(path relative to top_dir, contents)` pairs. An empty
/// slice yields a valid archive with no entries.
///
/// # Errors
///
/// Returns any I/O error raised while encoding.
pub fn tarball(top_dir: &str, files: &[(&str, &str)], compression: Compression) -> io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, format!("{top_dir}/{path}"), contents.as_bytes())?;
    }
    let tar_bytes = builder.into_inner()?;

    match compression {
        Compression::Gzip => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&tar_bytes)?;
            encoder.finish()
        }
        Compression::Bzip2 => {
            let mut encoder =
                bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            encoder.write_all(&tar_bytes)?;
            encoder.finish()
        }
    }
}

/// Directory name an archive service would give `url`'s tarball:
/// `<owner>-<repository>-<revision>`.
///
/// # Errors
///
/// Returns [`io::ErrorKind::InvalidInput`] if `url` has no owner or
/// repository segment.
pub fn extracted_dir_name(url: &str, revision: &str) -> io::Result<String> {
    let owner = url
        .split('/')
        .nth(3)
        .filter(|owner| !owner.is_empty())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, url.to_owned()))?;
    let key = library_key(url)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    Ok(format!("{owner}-{key}-{revision}"))
}

/// Serves canned response bodies by URL; unknown URLs answer 404.
#[derive(Debug, Default, Clone)]
pub struct StubTransport {
    bodies: HashMap<String, Vec<u8>>,
}

impl StubTransport {
    /// Create a transport that serves nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    #[must_use]
    pub fn serving(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_owned(), body);
        self
    }

    /// Stop serving `url`, so requests for it answer 404.
    #[must_use]
    pub fn without(mut self, url: &str) -> Self {
        self.bodies.remove(url);
        self
    }

    /// Serve a synthetic gzip archive for every entry of `manifest`.
    ///
    /// Each archive holds one top-level directory named like
    /// [`extracted_dir_name`]. Inside it the entry's sub-path contains an
    /// `__init__.py`; an entry without a sub-path gets a `manage.py`.
    ///
    /// # Errors
    ///
    /// Returns any error raised while building the archives.
    pub fn for_manifest(manifest: &Manifest) -> io::Result<Self> {
        let mut transport = Self::new();
        for (index, entry) in manifest.entries().iter().enumerate() {
            let top_dir = extracted_dir_name(entry.url(), &format!("{index:07x}"))?;
            let file = if entry.sub_path().is_empty() {
                "manage.py".to_owned()
            } else {
                format!("{}/__init__.py", entry.sub_path())
            };
            let body = tarball(&top_dir, &[(file.as_str(), "# synthetic\n")], Compression::Gzip)?;
            transport = transport.serving(entry.url(), body);
        }
        Ok(transport)
    }
}

impl Transport for StubTransport {
    fn open(&self, url: &str) -> Result<Box<dyn Read>, TransportError> {
        self.bodies
            .get(url)
            .map(|body| Box::new(Cursor::new(body.clone())) as Box<dyn Read>)
            .ok_or(TransportError::Status { code: 404 })
    }
}
