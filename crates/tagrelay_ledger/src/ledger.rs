//! The durable ledger and its in-memory index.

use crate::record::LedgerRow;
use crate::{MediaId, MediaRecord};
use chrono::Utc;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};
use tagrelay_error::{StorageError, StorageErrorKind};
use tracing::{debug, info, instrument, warn};

/// Column names written as the first line of a fresh ledger.
pub const LEDGER_HEADER: [&str; 5] = ["tag", "id", "timestamp", "source_url", "filename"];

/// Durable target of ledger appends.
trait LogFile: Write + Send {
    /// Seek to the end, returning the current length.
    fn end_offset(&mut self) -> std::io::Result<u64>;
    /// Cut the file back to `len` bytes.
    fn truncate(&mut self, len: u64) -> std::io::Result<()>;
}

impl LogFile for File {
    fn end_offset(&mut self) -> std::io::Result<u64> {
        self.seek(SeekFrom::End(0))
    }

    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len)
    }
}

/// Append handle plus whether the file currently ends mid-line.
struct Appender {
    file: Box<dyn LogFile>,
    needs_newline: bool,
}

/// Append-only record of downloaded media with an O(1) membership index.
///
/// Reads go through an `RwLock`; appends are serialized by a `Mutex` that is
/// held across both the durable write and the index insert, so concurrent
/// fetchers never interleave rows and an id never appears in the index
/// without its row on disk.
///
/// All methods are synchronous. A row is written with a single `write_all`,
/// so dropping an async task around a `record()` call cannot leave half a row.
pub struct Ledger {
    path: PathBuf,
    index: RwLock<HashSet<MediaId>>,
    appender: Mutex<Appender>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("path", &self.path)
            .field("entries", &self.len())
            .finish()
    }
}

impl Ledger {
    /// Open the ledger at `path`, replaying every well-formed row into memory.
    ///
    /// Creates the file (and its parent directory) with a header row if it
    /// does not exist yet. Malformed rows are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] only when the file cannot be created, opened
    /// or read.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| StorageError::new(StorageErrorKind::from_read(&path, &e)))?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| StorageError::new(StorageErrorKind::from_read(&path, &e)))?;

        let needs_newline = if contents.is_empty() {
            write_header(&mut file, &path)?;
            info!(path = %path.display(), "Created new download ledger");
            false
        } else {
            !contents.ends_with(b"\n")
        };

        let ids: HashSet<MediaId> = read_rows(&contents, &path)
            .into_iter()
            .map(|row| MediaId::from(row.id))
            .collect();

        info!(
            path = %path.display(),
            entries = ids.len(),
            "Loaded download ledger"
        );

        Ok(Self {
            path,
            index: RwLock::new(ids),
            appender: Mutex::new(Appender {
                file: Box::new(file),
                needs_newline,
            }),
        })
    }

    /// Whether the given media id has been downloaded before.
    ///
    /// The id is normalized first, so numeric and string forms match.
    pub fn contains(&self, id: impl Into<MediaId>) -> bool {
        let id = id.into();
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }

    /// Append a row for a completed download and add its id to the index.
    ///
    /// Returns `None` without writing when the id is already recorded, so
    /// each id has at most one row even when fetchers race on the same item.
    /// If the append fails the id is not indexed, so the item stays eligible
    /// for download on the next run.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the row cannot be written or flushed.
    #[instrument(skip(self, tag, id, source_url, local_path))]
    pub fn record(
        &self,
        tag: &str,
        id: impl Into<MediaId>,
        source_url: &str,
        local_path: impl AsRef<Path>,
    ) -> Result<Option<MediaRecord>, StorageError> {
        let record = MediaRecord::new(
            tag,
            id,
            Utc::now(),
            source_url,
            local_path.as_ref().to_path_buf(),
        );
        let encoded = encode_row(&record.to_row(), &self.path)?;

        let mut appender = self.appender.lock().unwrap_or_else(PoisonError::into_inner);
        if self.contains(record.id()) {
            debug!(tag, id = %record.id(), "Id already recorded, not appending");
            return Ok(None);
        }

        let mut buf = Vec::with_capacity(encoded.len() + 1);
        if appender.needs_newline {
            buf.push(b'\n');
        }
        buf.extend_from_slice(&encoded);

        let before = appender.file.end_offset().ok();
        let written = {
            let file = &mut appender.file;
            file.write_all(&buf).and_then(|()| file.flush())
        };
        if let Err(e) = written {
            // Roll back any partial row so the log stays line-aligned.
            match before.map(|len| appender.file.truncate(len)) {
                Some(Ok(())) => {}
                _ => appender.needs_newline = true,
            }
            warn!(id = %record.id(), error = %e, "Failed to append ledger row");
            return Err(StorageError::new(StorageErrorKind::from_write(
                &self.path, &e,
            )));
        }
        appender.needs_newline = false;

        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.id().clone());

        debug!(tag, id = %record.id(), "Recorded download");
        Ok(Some(record))
    }

    /// Replay every well-formed row from disk.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the file cannot be read.
    pub fn records(&self) -> Result<Vec<MediaRecord>, StorageError> {
        let _appender = self.appender.lock().unwrap_or_else(PoisonError::into_inner);
        let contents = std::fs::read(&self.path)
            .map_err(|e| StorageError::new(StorageErrorKind::from_read(&self.path, &e)))?;
        Ok(read_rows(&contents, &self.path)
            .into_iter()
            .filter_map(MediaRecord::from_row)
            .collect())
    }

    /// Snapshot of every known id.
    pub fn ids(&self) -> HashSet<MediaId> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of distinct ids known to the ledger.
    pub fn len(&self) -> usize {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no downloads have been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Location of the durable log.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_header(file: &mut File, path: &Path) -> Result<(), StorageError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(LEDGER_HEADER)
        .map_err(|e| StorageError::new(StorageErrorKind::FileWrite(e.to_string())))?;
    let header = writer
        .into_inner()
        .map_err(|e| StorageError::new(StorageErrorKind::from_write(path, e.error())))?;
    file.write_all(&header)
        .and_then(|()| file.flush())
        .map_err(|e| StorageError::new(StorageErrorKind::from_write(path, &e)))
}

fn encode_row(row: &LedgerRow, path: &Path) -> Result<Vec<u8>, StorageError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.serialize(row).map_err(|e| {
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "{}: {}",
            path.display(),
            e
        )))
    })?;
    writer.into_inner().map_err(|e| {
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "{}: {}",
            path.display(),
            e.error()
        )))
    })
}

/// Decode the rows after the header, skipping anything that does not have
/// exactly the five expected columns and a non-empty id.
fn read_rows(contents: &[u8], path: &Path) -> Vec<LedgerRow> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(contents);

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path.display(), line = line + 2, error = %e, "Skipping unreadable ledger row");
                continue;
            }
        };
        if record.len() != LEDGER_HEADER.len() {
            warn!(
                path = %path.display(),
                line = line + 2,
                columns = record.len(),
                "Skipping ledger row with wrong column count"
            );
            continue;
        }
        let row = LedgerRow {
            tag: record[0].to_string(),
            id: record[1].to_string(),
            timestamp: record[2].to_string(),
            source_url: record[3].to_string(),
            filename: record[4].to_string(),
        };
        if row.id.trim().is_empty() {
            warn!(path = %path.display(), line = line + 2, "Skipping ledger row without id");
            continue;
        }
        rows.push(row);
    }
    rows
}
