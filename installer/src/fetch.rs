//! Archive downloads.
//!
//! The [`Fetcher`] streams one archive at a time from a [`Transport`] into
//! the install root, in fixed-size chunks, reporting progress as it goes.
//! Each failure point maps to its own [`InstallerError`] variant so the
//! report says whether the local file, the connection, the read, or the
//! write went wrong.
//!
//! No timeout is configured on the HTTP agent: a stalled connection blocks
//! until the user interrupts the process.

use crate::error::{InstallerError, Result};
use crate::layout::InstallLayout;
use crate::manifest::{archive_file_name, library_key};
use crate::output::write_stderr_partial;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Read, Write};
use std::sync::OnceLock;

/// Size of each read from the response body.
pub const CHUNK_SIZE: usize = 8192;

const KIB: u64 = 1024;

/// Opens remote archives for streamed reading.
///
/// Abstracted so tests can serve archives from memory.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Open `url` and return a reader over the response body.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the connection cannot be established
    /// or the server answers with an error status.
    fn open(&self, url: &str) -> std::result::Result<Box<dyn Read>, TransportError>;
}

/// Errors raised while opening a remote archive.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("HTTP status {code}")]
    Status {
        /// The status code returned.
        code: u16,
    },

    /// The request could not be completed.
    #[error("{reason}")]
    Connect {
        /// A human-readable description of the failure.
        reason: String,
    },
}

/// HTTP transport using `ureq`.
pub struct HttpTransport;

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> std::result::Result<Box<dyn Read>, TransportError> {
        let response = http_agent().get(url).call().map_err(|e| map_ureq_error(&e))?;
        Ok(Box::new(response.into_body().into_reader()))
    }
}

/// Shared `ureq` agent. Redirects are followed; no timeout is set.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder().timeout_global(None).build();
        ureq::Agent::new_with_config(config)
    })
}

fn map_ureq_error(err: &ureq::Error) -> TransportError {
    match err {
        ureq::Error::StatusCode(code) => TransportError::Status { code: *code },
        other => TransportError::Connect {
            reason: other.to_string(),
        },
    }
}

/// An archive saved in the install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArchive {
    /// Library key the archive was named after.
    pub key: String,
    /// Location of the archive file.
    pub path: Utf8PathBuf,
    /// Number of bytes written.
    pub bytes: u64,
    /// Lowercase hex SHA-256 of the archive. Recorded, never verified.
    pub sha256: String,
}

/// Downloads archives into the install root.
pub struct Fetcher<'a> {
    transport: &'a dyn Transport,
    layout: &'a InstallLayout,
}

impl<'a> Fetcher<'a> {
    /// Create a fetcher writing into `layout`'s root.
    #[must_use]
    pub const fn new(transport: &'a dyn Transport, layout: &'a InstallLayout) -> Self {
        Self { transport, layout }
    }

    /// Download `url` to `<root>/<key>.tar.gz`.
    ///
    /// The destination must not exist yet. Progress lines are written to
    /// `progress`, each terminated by a carriage return so a terminal shows
    /// them in place.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::FileOpenFailed`],
    /// [`InstallerError::ConnectionFailed`], [`InstallerError::ReadFailed`],
    /// or [`InstallerError::WriteFailed`] depending on which step failed, and
    /// [`InstallerError::MalformedUrl`] if no file name can be derived.
    pub fn download(&self, url: &str, progress: &mut dyn Write) -> Result<DownloadedArchive> {
        let key = library_key(url)?;
        let file_name = archive_file_name(key);
        let path = self.layout.entry(&file_name);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| InstallerError::FileOpenFailed {
                path: path.clone(),
                source,
            })?;

        debug!("opening {url}");
        let mut body = self
            .transport
            .open(url)
            .map_err(|e| InstallerError::ConnectionFailed {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;

        let Copied { bytes, sha256 } = copy_chunks(
            &mut *body,
            &mut file,
            ChunkTarget {
                url,
                path: &path,
                file_name: &file_name,
            },
            progress,
        )?;
        write_stderr_partial(progress, "\n");

        info!("downloaded {url} to {path} ({bytes} bytes, sha256 {sha256})");
        Ok(DownloadedArchive {
            key: key.to_owned(),
            path,
            bytes,
            sha256,
        })
    }
}

/// Names used when reporting on one copy.
struct ChunkTarget<'a> {
    url: &'a str,
    path: &'a Utf8Path,
    file_name: &'a str,
}

struct Copied {
    bytes: u64,
    sha256: String,
}

/// Copy `body` into `sink` in [`CHUNK_SIZE`] pieces, hashing as it goes and
/// writing a progress line after every chunk.
fn copy_chunks(
    body: &mut dyn Read,
    sink: &mut dyn Write,
    target: ChunkTarget<'_>,
    progress: &mut dyn Write,
) -> Result<Copied> {
    let write_failed = |source| InstallerError::WriteFailed {
        path: target.path.to_owned(),
        source,
    };
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut loaded: u64 = 0;
    loop {
        let bytes_read = match body.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(InstallerError::ReadFailed {
                    url: target.url.to_owned(),
                    source,
                });
            }
        };
        let chunk = buffer.get(..bytes_read).unwrap_or_default();
        sink.write_all(chunk).map_err(write_failed)?;
        hasher.update(chunk);
        loaded += bytes_read as u64;
        write_stderr_partial(progress, progress_line(target.file_name, loaded));
    }
    sink.flush().map_err(write_failed)?;

    Ok(Copied {
        bytes: loaded,
        sha256: format!("{:x}", hasher.finalize()),
    })
}

/// Format one progress update. Never reports less than 1 KiB.
fn progress_line(file_name: &str, loaded: u64) -> String {
    let kib = loaded.div_euclid(KIB).max(1);
    format!("Downloading: {file_name:>32} {kib:>10} KiB downloaded\r")
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use rstest::{fixture, rstest};
    use std::io::Cursor;
    use tempfile::TempDir;

    const URL: &str = "http://github.com/django-nonrel/djangotoolbox/tarball/toolbox-1.4";

    struct Root {
        _temp: TempDir,
        layout: InstallLayout,
    }

    #[fixture]
    fn root() -> Root {
        let temp = tempfile::tempdir().expect("temp dir");
        let parent = Utf8Path::from_path(temp.path()).expect("UTF-8 path");
        let layout = InstallLayout::under(parent);
        std::fs::create_dir(layout.root()).expect("create root");
        Root {
            _temp: temp,
            layout,
        }
    }

    fn serving(body: Vec<u8>) -> MockTransport {
        let mut transport = MockTransport::new();
        transport
            .expect_open()
            .times(1)
            .returning(move |_| Ok(Box::new(Cursor::new(body.clone()))));
        transport
    }

    /// Serves one chunk, then fails.
    struct BrokenReader {
        served: bool,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.served {
                return Err(std::io::Error::new(ErrorKind::ConnectionReset, "reset"));
            }
            self.served = true;
            let n = buf.len().min(16);
            buf[..n].fill(b'x');
            Ok(n)
        }
    }

    fn reported_kib(progress: &[u8]) -> Vec<u64> {
        String::from_utf8_lossy(progress)
            .split('\r')
            .filter_map(|line| {
                line.trim()
                    .strip_suffix("KiB downloaded")
                    .and_then(|rest| rest.split_whitespace().last())
                    .and_then(|n| n.parse().ok())
            })
            .collect()
    }

    #[rstest]
    fn streams_body_into_named_archive(root: Root) {
        let body: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let transport = serving(body.clone());
        let mut progress = Vec::new();

        let archive = Fetcher::new(&transport, &root.layout)
            .download(URL, &mut progress)
            .expect("download should succeed");

        assert_eq!(archive.key, "djangotoolbox");
        assert_eq!(archive.path, root.layout.entry("djangotoolbox.tar.gz"));
        assert_eq!(archive.bytes, 20_000);
        assert_eq!(archive.sha256, format!("{:x}", Sha256::digest(&body)));
        assert_eq!(std::fs::read(&archive.path).expect("read archive"), body);

        let kib = reported_kib(&progress);
        assert_eq!(kib.len(), 3, "one update per chunk");
        assert!(kib.windows(2).all(|w| w[0] <= w[1]), "progress: {kib:?}");
        assert_eq!(kib.last(), Some(&19));
    }

    #[rstest]
    fn tiny_downloads_report_at_least_one_kib(root: Root) {
        let transport = serving(b"small".to_vec());
        let mut progress = Vec::new();

        Fetcher::new(&transport, &root.layout)
            .download(URL, &mut progress)
            .expect("download should succeed");

        assert_eq!(reported_kib(&progress), vec![1]);
    }

    #[rstest]
    fn existing_archive_is_a_file_open_failure(root: Root) {
        std::fs::write(root.layout.entry("djangotoolbox.tar.gz"), b"old").expect("seed file");
        let mut transport = MockTransport::new();
        transport.expect_open().times(0);

        let err = Fetcher::new(&transport, &root.layout)
            .download(URL, &mut std::io::sink())
            .expect_err("download should fail");

        assert!(matches!(err, InstallerError::FileOpenFailed { .. }), "{err:?}");
    }

    #[rstest]
    #[case::status(TransportError::Status { code: 404 }, "404")]
    #[case::connect(TransportError::Connect { reason: "refused".to_owned() }, "refused")]
    fn transport_errors_are_connection_failures(
        root: Root,
        #[case] error: TransportError,
        #[case] expected: &str,
    ) {
        let mut transport = MockTransport::new();
        let mut error = Some(error);
        transport.expect_open().times(1).returning(move |_| {
            Err(error.take().unwrap_or(TransportError::Connect {
                reason: "called twice".to_owned(),
            }))
        });

        let err = Fetcher::new(&transport, &root.layout)
            .download(URL, &mut std::io::sink())
            .expect_err("download should fail");

        match err {
            InstallerError::ConnectionFailed { url, reason } => {
                assert_eq!(url, URL);
                assert!(reason.contains(expected), "reason: {reason}");
            }
            other => panic!("expected ConnectionFailed, got {other:?}"),
        }
    }

    #[rstest]
    fn mid_stream_read_errors_name_the_url(root: Root) {
        let mut transport = MockTransport::new();
        transport
            .expect_open()
            .returning(|_| Ok(Box::new(BrokenReader { served: false })));

        let err = Fetcher::new(&transport, &root.layout)
            .download(URL, &mut std::io::sink())
            .expect_err("download should fail");

        assert!(
            matches!(&err, InstallerError::ReadFailed { url, .. } if url == URL),
            "{err:?}"
        );
    }

    /// Accepts `capacity` bytes, then reports a full disk.
    struct FullDisk {
        capacity: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.capacity == 0 {
                return Err(std::io::Error::new(ErrorKind::StorageFull, "no space left"));
            }
            let n = buf.len().min(self.capacity);
            self.capacity -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn mid_stream_write_errors_name_the_archive() {
        let path = Utf8Path::new("/srv/django-nonrel/djangotoolbox.tar.gz");
        let mut body = Cursor::new(vec![7u8; CHUNK_SIZE * 3]);
        let mut progress = Vec::new();

        let err = copy_chunks(
            &mut body,
            &mut FullDisk {
                capacity: CHUNK_SIZE + 100,
            },
            ChunkTarget {
                url: URL,
                path,
                file_name: "djangotoolbox.tar.gz",
            },
            &mut progress,
        )
        .err()
        .expect("copy should fail");

        match err {
            InstallerError::WriteFailed { path: reported, source } => {
                assert_eq!(reported, path);
                assert_eq!(source.kind(), ErrorKind::StorageFull);
            }
            other => panic!("expected WriteFailed, got {other:?}"),
        }
        assert_eq!(reported_kib(&progress), vec![8], "only the first chunk landed");
    }

    #[rstest]
    fn urls_without_a_repository_segment_are_rejected(root: Root) {
        let mut transport = MockTransport::new();
        transport.expect_open().times(0);

        let err = Fetcher::new(&transport, &root.layout)
            .download("http://example.com/", &mut std::io::sink())
            .expect_err("download should fail");

        assert!(matches!(err, InstallerError::MalformedUrl { .. }));
    }

    #[test]
    fn status_codes_map_to_status_errors() {
        let mapped = map_ureq_error(&ureq::Error::StatusCode(503));
        assert!(matches!(mapped, TransportError::Status { code: 503 }));
    }
}
