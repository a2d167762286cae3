//! Durable append-only record journal.
//!
//! Layout: `<name>.data` holds the records; its first 8 bytes are record 0,
//! the control block, a little-endian `u64` entry count kept memory-mapped
//! and updated in place. `<name>.index` holds one `(offset, len)` pair of
//! little-endian `u64`s per appended record.
//!
//! Durability: data and index are synced before the control block count is
//! advanced. A torn append therefore leaves the count unchanged and the
//! partial record invisible; the next append overwrites the orphan bytes. A
//! reopened journal resumes from the control block count without rescanning
//! data records.

pub mod recorder;

pub use recorder::{JournalRecord, SnapshotRecorder};

use crate::core::{Result, StatsError};
use memmap2::{MmapMut, MmapOptions};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Append surface for rotation observers. [`Journal`] is the durable
/// implementation; tests substitute failing sinks.
pub trait AppendSink: Send + Sync {
    /// Append one encoded record, returning its record index
    fn append_record(&self, bytes: &[u8]) -> Result<u64>;
}

impl AppendSink for Journal {
    fn append_record(&self, bytes: &[u8]) -> Result<u64> {
        self.append(bytes)
    }
}

/// Size of the control block (record 0)
const CONTROL_BLOCK_LEN: u64 = 8;
/// Size of one index entry: record offset + record length
const INDEX_ENTRY_LEN: u64 = 16;

#[derive(Debug)]
struct Inner {
    data: File,
    index: File,
    control: MmapMut,
    entry_count: u64,
    /// End of the last valid record in the data file; orphan bytes past this
    /// point are overwritten by the next append.
    data_end: u64,
}

/// A sequentially-written record store with a durable entry count.
#[derive(Debug)]
pub struct Journal {
    name: String,
    data_path: PathBuf,
    inner: Mutex<Inner>,
}

impl Journal {
    /// Open (or create) the journal `<name>` under `dir`.
    ///
    /// Creates `dir` if missing; fails if the path exists but is not a
    /// directory, or if the store cannot be created. `size_hint` is the
    /// estimated number of entries, used to preallocate the index.
    pub fn open(dir: &Path, name: &str, size_hint: u64) -> Result<Self> {
        if dir.exists() && !dir.is_dir() {
            return Err(StatsError::JournalNotADirectory {
                path: dir.to_path_buf(),
            });
        }
        std::fs::create_dir_all(dir).map_err(|e| {
            StatsError::journal(format!("failed to create journal directory {}: {}", dir.display(), e))
        })?;

        let data_path = dir.join(format!("{name}.data"));
        let index_path = dir.join(format!("{name}.index"));

        let data = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&data_path)?;
        let index = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&index_path)?;

        let fresh = data.metadata()?.len() < CONTROL_BLOCK_LEN;
        if fresh {
            data.set_len(CONTROL_BLOCK_LEN)?;
            index.set_len(size_hint * INDEX_ENTRY_LEN)?;
        }

        let mut control = unsafe {
            MmapOptions::new()
                .len(CONTROL_BLOCK_LEN as usize)
                .map_mut(&data)?
        };

        let entry_count = if fresh {
            control[..8].copy_from_slice(&0u64.to_le_bytes());
            control.flush()?;
            tracing::info!(journal = name, path = %data_path.display(), "created journal control block");
            0
        } else {
            let count = u64::from_le_bytes(control[..8].try_into().expect("control block is 8 bytes"));
            tracing::info!(
                journal = name,
                path = %data_path.display(),
                entry_count = count,
                "opened journal"
            );
            count
        };

        let mut inner = Inner {
            data,
            index,
            control,
            entry_count,
            data_end: CONTROL_BLOCK_LEN,
        };
        if entry_count > 0 {
            let (offset, len) = read_index_entry(&mut inner.index, entry_count - 1)?;
            inner.data_end = offset + len;
        }

        Ok(Self {
            name: name.to_string(),
            data_path,
            inner: Mutex::new(inner),
        })
    }

    /// The journal stream name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the data file
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Append a record at the end of the journal. Returns the record index
    /// (1-based; record 0 is the control block).
    ///
    /// On any failure the control block count is left unchanged and the
    /// record is not observable.
    pub fn append(&self, bytes: &[u8]) -> Result<u64> {
        let mut inner = self.inner.lock();
        let offset = inner.data_end;
        let len = bytes.len() as u64;

        inner.data.seek(SeekFrom::Start(offset))?;
        inner.data.write_all(bytes)?;
        inner.data.sync_data()?;

        let slot = inner.entry_count;
        inner.index.seek(SeekFrom::Start(slot * INDEX_ENTRY_LEN))?;
        let mut entry = [0u8; INDEX_ENTRY_LEN as usize];
        entry[..8].copy_from_slice(&offset.to_le_bytes());
        entry[8..].copy_from_slice(&len.to_le_bytes());
        inner.index.write_all(&entry)?;
        inner.index.sync_data()?;

        // Data and index are durable; advancing the count makes the record
        // visible.
        inner.entry_count += 1;
        let count = inner.entry_count;
        inner.control[..8].copy_from_slice(&count.to_le_bytes());
        inner.control.flush()?;
        inner.data_end = offset + len;

        tracing::trace!(journal = %self.name, record = count, len, "appended journal record");
        Ok(count)
    }

    /// Read back an appended record by its 1-based index
    pub fn read(&self, record: u64) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        if record == 0 || record > inner.entry_count {
            return Err(StatsError::RecordOutOfRange {
                index: record,
                count: inner.entry_count,
            });
        }

        let (offset, len) = read_index_entry(&mut inner.index, record - 1)?;
        let mut buf = vec![0u8; len as usize];
        inner.data.seek(SeekFrom::Start(offset))?;
        inner.data.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// The durable entry count from the control block. Always equal to the
    /// number of successfully appended records.
    pub fn entry_count(&self) -> u64 {
        self.inner.lock().entry_count
    }

    /// Flush data, index, and control block to stable storage
    pub fn sync(&self) -> Result<()> {
        let inner = self.inner.lock();
        inner.data.sync_all()?;
        inner.index.sync_all()?;
        inner.control.flush()?;
        Ok(())
    }
}

fn read_index_entry(index: &mut File, slot: u64) -> Result<(u64, u64)> {
    let mut entry = [0u8; INDEX_ENTRY_LEN as usize];
    index.seek(SeekFrom::Start(slot * INDEX_ENTRY_LEN))?;
    index.read_exact(&mut entry)?;
    let offset = u64::from_le_bytes(entry[..8].try_into().expect("8-byte offset"));
    let len = u64::from_le_bytes(entry[8..].try_into().expect("8-byte length"));
    Ok((offset, len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_journal_has_zero_entries() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::open(dir.path(), "stats", 16).unwrap();
        assert_eq!(journal.entry_count(), 0);
        assert!(journal.data_path().exists());
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::open(dir.path(), "stats", 16).unwrap();

        assert_eq!(journal.append(b"alpha").unwrap(), 1);
        assert_eq!(journal.append(b"beta").unwrap(), 2);
        assert_eq!(journal.entry_count(), 2);

        assert_eq!(journal.read(1).unwrap(), b"alpha");
        assert_eq!(journal.read(2).unwrap(), b"beta");
    }

    #[test]
    fn test_read_out_of_range() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::open(dir.path(), "stats", 16).unwrap();
        journal.append(b"only").unwrap();

        assert!(matches!(
            journal.read(0),
            Err(StatsError::RecordOutOfRange { index: 0, count: 1 })
        ));
        assert!(matches!(
            journal.read(2),
            Err(StatsError::RecordOutOfRange { index: 2, count: 1 })
        ));
    }

    #[test]
    fn test_reopen_resumes_from_control_block() {
        let dir = TempDir::new().unwrap();
        {
            let journal = Journal::open(dir.path(), "stats", 16).unwrap();
            journal.append(b"one").unwrap();
            journal.append(b"two").unwrap();
            journal.append(b"three").unwrap();
        }

        let journal = Journal::open(dir.path(), "stats", 16).unwrap();
        assert_eq!(journal.entry_count(), 3);
        assert_eq!(journal.read(3).unwrap(), b"three");

        assert_eq!(journal.append(b"four").unwrap(), 4);
        assert_eq!(journal.read(4).unwrap(), b"four");
    }

    #[test]
    fn test_torn_append_is_invisible() {
        let dir = TempDir::new().unwrap();
        let data_path;
        {
            let journal = Journal::open(dir.path(), "stats", 16).unwrap();
            journal.append(b"kept").unwrap();
            data_path = journal.data_path().to_path_buf();
        }

        // Simulate a torn append: payload bytes hit the data file but the
        // index and control block were never updated.
        {
            let mut data = OpenOptions::new().append(true).open(&data_path).unwrap();
            data.write_all(b"orphan").unwrap();
        }

        let journal = Journal::open(dir.path(), "stats", 16).unwrap();
        assert_eq!(journal.entry_count(), 1);
        assert_eq!(journal.append(b"next").unwrap(), 2);
        assert_eq!(journal.read(1).unwrap(), b"kept");
        assert_eq!(journal.read(2).unwrap(), b"next");
    }

    #[test]
    fn test_open_fails_on_non_directory() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("not_a_dir");
        std::fs::write(&file_path, b"file").unwrap();

        let err = Journal::open(&file_path, "stats", 16).unwrap_err();
        assert!(matches!(err, StatsError::JournalNotADirectory { .. }));
    }
}
