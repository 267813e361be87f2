// Table persistence behind `TableStorage`; `JsonFile` keeps one JSON document per table.
// Creation writes a staging file and hard-links it into place, so a table file is
// either absent or complete. Appends rewrite the whole file under an exclusive
// advisory lock. The lock serializes cooperating writers but the rewrite is not
// crash-atomic: dying mid-write can leave a truncated file, which later surfaces
// as `Corrupt`.
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use fs2::FileExt;

use crate::core::codec::{EncodedRow, TableDocument};
use crate::core::error::{Error, ErrorKind, lock_error_kind};

pub trait TableStorage {
    fn exists(&self) -> Result<bool, Error>;

    /// Writes the initial document. Fails with `AlreadyExists` if storage is present.
    fn create(&self, document: &TableDocument) -> Result<(), Error>;

    fn load(&self) -> Result<TableDocument, Error>;

    /// Appends one encoded row and returns the new row count.
    fn append(&self, row: EncodedRow) -> Result<usize, Error>;
}

#[derive(Clone, Debug)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self, write: bool) -> Result<File, Error> {
        OpenOptions::new()
            .read(true)
            .write(write)
            .open(&self.path)
            .map_err(|err| Error::io(err, &self.path).with_message("failed to open table file"))
    }

    fn lock<'f>(&self, file: &'f File, exclusive: bool) -> Result<FileLock<'f>, Error> {
        let locked = if exclusive {
            file.lock_exclusive()
        } else {
            FileExt::lock_shared(file)
        };
        locked.map_err(|err| {
            Error::new(lock_error_kind(&err))
                .with_message("failed to lock table file")
                .with_path(&self.path)
                .with_source(err)
        })?;
        Ok(FileLock { file })
    }

    /// Sibling of the table file that never looks like a table (`<name>.json.<pid>.<seq>.tmp`).
    fn staging_path(&self) -> PathBuf {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(
            ".{}.{}.tmp",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        ));
        PathBuf::from(name)
    }

    fn write_staging(&self, staging: &Path, bytes: &[u8]) -> Result<(), Error> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(staging)
            .map_err(|err| Error::io(err, staging).with_message("failed to create staging file"))?;
        file.write_all(bytes)
            .and_then(|()| file.sync_all())
            .map_err(|err| Error::io(err, staging).with_message("failed to write staging file"))
    }

    fn read_document(&self, mut file: &File) -> Result<TableDocument, Error> {
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|err| Error::io(err, &self.path).with_message("failed to read table file"))?;
        TableDocument::from_slice(&bytes).map_err(|err| err.with_path(&self.path))
    }
}

impl TableStorage for JsonFile {
    fn exists(&self) -> Result<bool, Error> {
        self.path.try_exists().map_err(|err| Error::io(err, &self.path))
    }

    fn create(&self, document: &TableDocument) -> Result<(), Error> {
        let bytes = document.to_vec()?;
        let staging = self.staging_path();
        let created = self.write_staging(&staging, &bytes).and_then(|()| {
            // `hard_link` never replaces an existing file.
            fs::hard_link(&staging, &self.path).map_err(|err| {
                let err = Error::io(err, &self.path);
                if err.kind() == ErrorKind::AlreadyExists {
                    err.with_message("table already exists")
                } else {
                    err.with_message("failed to create table file")
                }
            })
        });
        if let Err(err) = fs::remove_file(&staging) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %staging.display(), error = %err, "failed to remove staging file");
            }
        }
        created?;
        tracing::debug!(path = %self.path.display(), "created table file");
        Ok(())
    }

    fn load(&self) -> Result<TableDocument, Error> {
        let file = self.open(false)?;
        let _guard = self.lock(&file, false)?;
        let document = self.read_document(&file)?;
        tracing::debug!(
            path = %self.path.display(),
            rows = document.rows.len(),
            "loaded table file"
        );
        Ok(document)
    }

    fn append(&self, row: EncodedRow) -> Result<usize, Error> {
        let file = self.open(true)?;
        let _guard = self.lock(&file, true)?;
        let mut document = self.read_document(&file)?;
        document.rows.push(row);
        let bytes = document.to_vec()?;

        let mut handle = &file;
        handle
            .seek(SeekFrom::Start(0))
            .and_then(|_| file.set_len(0))
            .and_then(|()| handle.write_all(&bytes))
            .and_then(|()| handle.flush())
            .map_err(|err| Error::io(err, &self.path).with_message("failed to rewrite table file"))?;

        let count = document.rows.len();
        tracing::debug!(path = %self.path.display(), rows = count, "rewrote table file");
        Ok(count)
    }
}

/// Holds an advisory lock until dropped.
struct FileLock<'a> {
    file: &'a File,
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        let _ = FileExt::unlock(self.file);
    }
}
