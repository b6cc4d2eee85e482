//! Write-ahead log: append-only, CRC-checked, crash-recoverable.
//!
//! On-disk entry format:
//! ```text
//! [length: u32][crc32: u32][entry_type: u8][payload: &[u8]]
//! ```
//!
//! Payload fields are length-prefixed (`[len: u32][bytes]`) so keys and
//! values may contain any byte. Every store mutation is appended here
//! before it touches the in-memory keyspace.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crc32fast::Hasher;

use super::error::{StoreError, StoreResult};
use super::keyspace::Mutation;

/// Discriminant byte for WAL entry types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryType {
    // String ops
    Set = 1,
    Del = 2,

    // Collection ops
    SetAdd = 10,
    ZSetAdd = 11,
}

impl EntryType {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Set),
            2 => Some(Self::Del),
            10 => Some(Self::SetAdd),
            11 => Some(Self::ZSetAdd),
            _ => None,
        }
    }
}

/// A single WAL entry (in-memory representation).
#[derive(Debug, Clone)]
pub struct WalEntry {
    pub entry_type: EntryType,
    pub payload: Vec<u8>,
}

impl WalEntry {
    pub fn new(entry_type: EntryType, payload: Vec<u8>) -> Self {
        Self {
            entry_type,
            payload,
        }
    }

    /// Encode a keyspace mutation.
    pub fn from_mutation(mutation: &Mutation) -> Self {
        match mutation {
            Mutation::Set { key, value } => Self::new(
                EntryType::Set,
                encode_fields(&[key.as_bytes(), value.as_bytes()]),
            ),
            Mutation::Del { key } => Self::new(EntryType::Del, encode_fields(&[key.as_bytes()])),
            Mutation::SetAdd { key, member } => Self::new(
                EntryType::SetAdd,
                encode_fields(&[key.as_bytes(), member.as_bytes()]),
            ),
            Mutation::ZSetAdd { key, score, member } => Self::new(
                EntryType::ZSetAdd,
                encode_fields(&[key.as_bytes(), &score.to_le_bytes(), member.as_bytes()]),
            ),
        }
    }

    /// Decode back into a keyspace mutation. `None` if the payload is malformed.
    pub fn to_mutation(&self) -> Option<Mutation> {
        let fields = decode_fields(&self.payload)?;
        let text = |i: usize| -> Option<String> {
            String::from_utf8(fields.get(i)?.to_vec()).ok()
        };
        match (self.entry_type, fields.len()) {
            (EntryType::Set, 2) => Some(Mutation::Set {
                key: text(0)?,
                value: text(1)?,
            }),
            (EntryType::Del, 1) => Some(Mutation::Del { key: text(0)? }),
            (EntryType::SetAdd, 2) => Some(Mutation::SetAdd {
                key: text(0)?,
                member: text(1)?,
            }),
            (EntryType::ZSetAdd, 3) => {
                let score_bytes: [u8; 8] = fields[1].try_into().ok()?;
                Some(Mutation::ZSetAdd {
                    key: text(0)?,
                    score: f64::from_le_bytes(score_bytes),
                    member: text(2)?,
                })
            }
            _ => None,
        }
    }

    /// Serialize to on-disk format: [length: u32][crc32: u32][entry_type: u8][payload]
    fn to_bytes(&self) -> Vec<u8> {
        // length = 1 (entry_type) + payload.len()
        let content_len = 1 + self.payload.len();
        let mut buf = Vec::with_capacity(4 + 4 + content_len);

        buf.extend_from_slice(&(content_len as u32).to_le_bytes());

        // CRC over entry_type + payload
        let mut hasher = Hasher::new();
        hasher.update(&[self.entry_type as u8]);
        hasher.update(&self.payload);
        let crc = hasher.finalize();
        buf.extend_from_slice(&crc.to_le_bytes());

        buf.push(self.entry_type as u8);
        buf.extend_from_slice(&self.payload);

        buf
    }
}

fn encode_fields(fields: &[&[u8]]) -> Vec<u8> {
    let total: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut payload = Vec::with_capacity(total);
    for field in fields {
        payload.extend_from_slice(&(field.len() as u32).to_le_bytes());
        payload.extend_from_slice(field);
    }
    payload
}

fn decode_fields(payload: &[u8]) -> Option<Vec<&[u8]>> {
    let mut fields = Vec::new();
    let mut pos = 0;
    while pos < payload.len() {
        let len_bytes: [u8; 4] = payload.get(pos..pos + 4)?.try_into().ok()?;
        let len = u32::from_le_bytes(len_bytes) as usize;
        pos += 4;
        fields.push(payload.get(pos..pos + len)?);
        pos += len;
    }
    Some(fields)
}

/// Result of reading a log from the start.
#[derive(Debug)]
pub struct Replay {
    pub entries: Vec<WalEntry>,
    /// Offset of a trailing partial entry, if the log ends mid-write.
    pub torn_at: Option<u64>,
}

/// Append-only write-ahead log with CRC integrity checks.
pub struct Wal {
    file: File,
    path: PathBuf,
    sync_writes: bool,
}

impl Wal {
    /// Open or create a WAL file at the given path.
    pub fn open(path: &Path, sync_writes: bool) -> StoreResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                StoreError::Wal(format!("failed to open WAL at {}: {e}", path.display()))
            })?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            sync_writes,
        })
    }

    /// Append a single entry. Writes, then fsyncs when `sync_writes` is on.
    ///
    /// On failure the file is cut back to its length before the write, so a
    /// partial entry never sits in front of later appends.
    pub fn append(&mut self, entry: &WalEntry) -> StoreResult<()> {
        let bytes = entry.to_bytes();
        let start = self.file.metadata()?.len();

        let written = self.file.write_all(&bytes).and_then(|()| {
            if self.sync_writes {
                self.file.sync_data()
            } else {
                Ok(())
            }
        });
        if let Err(e) = written {
            if let Err(trim_err) = self.file.set_len(start) {
                tracing::warn!("failed to trim WAL back to {start} bytes after failed append: {trim_err}");
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Replay all entries from the beginning of the WAL.
    /// Corrupted entries are skipped with a warning; subsequent entries are still read.
    /// A log that ends mid-entry reports where that entry starts in `torn_at`.
    pub fn replay(&self) -> StoreResult<Replay> {
        let mut file = File::open(&self.path)
            .map_err(|e| StoreError::Wal(format!("failed to open WAL for replay: {e}")))?;
        let file_len = file.metadata()?.len();

        let mut entries = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let mut len_buf = [0u8; 4];
            match file.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let content_len = u32::from_le_bytes(len_buf) as usize;

            let mut crc_buf = [0u8; 4];
            match file.read_exact(&mut crc_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    tracing::warn!("WAL truncated at offset {offset} (incomplete header)");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
            let stored_crc = u32::from_le_bytes(crc_buf);

            if content_len == 0 {
                tracing::warn!("WAL entry at offset {offset} has zero length, skipping");
                offset += 8;
                continue;
            }
            let mut content = vec![0u8; content_len];
            match file.read_exact(&mut content) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    tracing::warn!("WAL truncated at offset {offset} (incomplete payload)");
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let mut hasher = Hasher::new();
            hasher.update(&content);
            let computed_crc = hasher.finalize();

            if computed_crc != stored_crc {
                tracing::warn!(
                    "WAL entry corrupted at offset {offset}: CRC mismatch (stored={stored_crc:#x}, computed={computed_crc:#x}), skipping"
                );
                offset += 8 + content_len as u64;
                continue;
            }

            let type_byte = content[0];
            match EntryType::from_u8(type_byte) {
                Some(entry_type) => entries.push(WalEntry {
                    entry_type,
                    payload: content[1..].to_vec(),
                }),
                None => {
                    tracing::warn!(
                        "WAL entry at offset {offset}: unknown type {type_byte}, skipping"
                    );
                }
            }

            offset += 8 + content_len as u64;
        }

        let torn_at = (offset < file_len).then_some(offset);
        if let Some(at) = torn_at {
            tracing::warn!("WAL ends with a partial entry at offset {at} ({} bytes)", file_len - at);
        }
        Ok(Replay { entries, torn_at })
    }

    /// Cut the log back to `len` bytes. Used to drop a torn final entry
    /// before anything else is appended behind it.
    pub fn truncate(&mut self, len: u64) -> StoreResult<()> {
        self.file.set_len(len)?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Replace the whole log with `entries`.
    ///
    /// Writes a sibling temp file, fsyncs it, renames it over the log and
    /// reopens in append mode. A crash mid-rewrite leaves the old log intact.
    pub fn rewrite(&mut self, entries: &[WalEntry]) -> StoreResult<()> {
        let tmp_path = self.path.with_extension("wal.tmp");
        {
            let mut tmp = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .map_err(|e| StoreError::Wal(format!("failed to create {}: {e}", tmp_path.display())))?;
            for entry in entries {
                tmp.write_all(&entry.to_bytes())?;
            }
            tmp.sync_data()?;
        }

        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| StoreError::Wal(format!("failed to replace WAL: {e}")))?;

        self.file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::Wal(format!("failed to reopen WAL after rewrite: {e}")))?;
        Ok(())
    }

    /// Flush outstanding writes to disk.
    pub fn sync(&mut self) -> StoreResult<()> {
        self.file.sync_data()?;
        Ok(())
    }

    /// Current WAL file size in bytes.
    pub fn size(&self) -> StoreResult<u64> {
        let mut file = self.file.try_clone()?;
        let pos = file.seek(SeekFrom::End(0))?;
        Ok(pos)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
