//! Append-only day file log.
//!
//! Each append opens the file in append mode, writes the encoded rows with a
//! single `write_all`, flushes, optionally syncs, and closes the handle.
//!
//! A new file is first written in full (header plus rows) under a temporary
//! name in the same directory and then hard-linked into place. Linking fails
//! if the target already exists, so a file is never visible without its
//! header, and a writer that loses the creation race falls back to a plain
//! append.
//!
//! On filesystems without hard links the file is created in place with
//! `create_new` and the header and rows go out in the same `write_all`. A
//! concurrent appender may then land its row ahead of the header.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// How far an append is pushed towards stable storage before returning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Durability {
    /// Flush userspace buffers to the OS.
    #[default]
    Flush,
    /// Flush and `fsync` file data.
    Sync,
}

/// Outcome of a single append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Appended {
    /// The file did not exist and was initialised with the header.
    Created,
    /// The rows were appended to an existing file.
    Extended,
}

/// Handle to one append-only CSV file.
#[derive(Debug, Clone)]
pub(crate) struct AppendLog {
    path: PathBuf,
    durability: Durability,
}

impl AppendLog {
    pub(crate) fn new(path: PathBuf, durability: Durability) -> Self {
        Self { path, durability }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Append `rows`, writing `header` first if the file is new.
    pub(crate) fn append<R>(&self, header: &[&str], rows: &[R]) -> Result<Appended>
    where
        R: AsRef<[String]>,
    {
        let unavailable = |e| Error::unavailable(&self.path, e);

        let appended = if !self.path.exists()
            && self.create(&encode(Some(header), rows).map_err(unavailable)?)?
        {
            Appended::Created
        } else {
            let buf = encode(None, rows).map_err(unavailable)?;
            let mut file = OpenOptions::new()
                .append(true)
                .open(&self.path)
                .map_err(unavailable)?;
            self.write(&mut file, &buf).map_err(unavailable)?;
            Appended::Extended
        };

        debug!(
            "Appended {} row(s) to {} ({:?})",
            rows.len(),
            self.path.display(),
            appended
        );

        Ok(appended)
    }

    /// Create the file with `buf` as its full content.
    ///
    /// Returns `false` if another writer created it first.
    fn create(&self, buf: &[u8]) -> Result<bool> {
        let temp = self.temp_path();

        let written = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp)
            .and_then(|mut file| self.write(&mut file, buf));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(Error::unavailable(&temp, e));
        }

        let linked = fs::hard_link(&temp, &self.path);
        let _ = fs::remove_file(&temp);

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) if links_unsupported(&e) => {
                debug!(
                    "Hard links unavailable for {} ({}), creating in place",
                    self.path.display(),
                    e
                );
                self.create_in_place(buf)
            }
            Err(e) => Err(Error::unavailable(&self.path, e)),
        }
    }

    /// Create the file directly with `buf` as its first write.
    ///
    /// Returns `false` if the file already exists.
    fn create_in_place(&self, buf: &[u8]) -> Result<bool> {
        let opened = OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(&self.path);

        match opened {
            Ok(mut file) => {
                self.write(&mut file, buf)
                    .map_err(|e| Error::unavailable(&self.path, e))?;
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(Error::unavailable(&self.path, e)),
        }
    }

    fn write(&self, file: &mut fs::File, buf: &[u8]) -> io::Result<()> {
        file.write_all(buf)?;
        file.flush()?;
        if self.durability == Durability::Sync {
            file.sync_data()?;
        }
        Ok(())
    }

    /// Hidden sibling path that never parses as a day file.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.path
            .with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), n))
    }
}

/// Errors `hard_link` returns on filesystems that cannot link (FAT, exFAT,
/// some network shares).
fn links_unsupported(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Unsupported | io::ErrorKind::PermissionDenied
    )
}

/// Encode rows into one buffer with every cell quoted.
fn encode<R>(header: Option<&[&str]>, rows: &[R]) -> io::Result<Vec<u8>>
where
    R: AsRef<[String]>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    if let Some(header) = header {
        writer.write_record(header).map_err(io::Error::other)?;
    }
    for row in rows {
        writer.write_record(row.as_ref()).map_err(io::Error::other)?;
    }

    writer
        .into_inner()
        .map_err(|e| io::Error::other(e.to_string()))
}
