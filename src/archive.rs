//! RGSS container archives (`Game.rgssad`, `Game.rgss2a`, `Game.rgss3a`).
//!
//! An archive starts with `RGSSAD\0<version>`. Versions 1 and 2 share a cipher driven by a
//! single running key that starts at `0xDEADCAFE` and advances through the whole index.
//! Version 3 derives a fixed index mask from a seed stored after the header and gives every
//! entry its own payload key.
//!
//! Payloads are decrypted lazily: [`RgssArchive::read_entry`] opens its own handle, so a
//! shared archive can serve concurrent readers.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use byteorder::ReadBytesExt;
use log::{debug, trace};

use crate::err::{ArchiveError, InvalidArchive};
use crate::utils::FastMap;

pub const RGSS_MAGIC: &[u8; 6] = b"RGSSAD";

const LEGACY_INITIAL_KEY: u32 = 0xDEAD_CAFE;

/// Advances a running cipher key.
#[inline]
pub fn advance_key(key: u32) -> u32 {
    key.wrapping_mul(7).wrapping_add(3)
}

/// The mask applied to every version 3 index field.
#[inline]
pub fn v3_index_mask(seed: u32) -> u32 {
    seed.wrapping_mul(9).wrapping_add(3)
}

/// Canonical form used to match entry names: backslash separators, trimmed, lowercase.
pub fn canonical_entry_name(name: &str) -> String {
    name.replace('/', "\\").trim().to_lowercase()
}

/// XORs `data` in place with the running payload key starting at `key`.
///
/// Whole 4-byte groups use the little-endian bytes of the key, which then advances. Trailing
/// bytes use the current key without advancing it. The cipher is its own inverse.
pub fn decrypt_payload(data: &mut [u8], mut key: u32) {
    let mut groups = data.chunks_exact_mut(4);
    for group in &mut groups {
        for (b, k) in group.iter_mut().zip(key.to_le_bytes()) {
            *b ^= k;
        }
        key = advance_key(key);
    }

    let key_bytes = key.to_le_bytes();
    for (i, b) in groups.into_remainder().iter_mut().enumerate() {
        *b ^= key_bytes[i % 4];
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveVersion {
    V1,
    V2,
    V3,
}

impl ArchiveVersion {
    pub fn from_byte(version: u8) -> Option<Self> {
        match version {
            1 => Some(ArchiveVersion::V1),
            2 => Some(ArchiveVersion::V2),
            3 => Some(ArchiveVersion::V3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Name as stored in the archive, e.g. `Data\MapInfos.rvdata2`.
    pub name: String,
    /// Absolute file offset of the encrypted payload.
    pub offset: u64,
    pub size: u32,
    /// Initial payload key.
    pub key: u32,
}

#[derive(Debug, Clone)]
enum Backing {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

#[derive(Debug, Clone)]
pub struct RgssArchive {
    path: PathBuf,
    backing: Backing,
    version: ArchiveVersion,
    entries: Vec<ArchiveEntry>,
    index: FastMap<String, usize>,
}

impl RgssArchive {
    /// Opens an archive and decodes its whole index.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(ArchiveError::Missing { path });
        }

        let io_err = |source| ArchiveError::Io {
            path: path.clone(),
            source,
        };
        let file = File::open(&path).map_err(io_err)?;
        let file_len = file.metadata().map_err(io_err)?.len();

        let (version, entries) =
            IndexReader::new(BufReader::new(file), &path, file_len).parse()?;

        debug!(
            "opened `{}`: {:?}, {} entries",
            path.display(),
            version,
            entries.len()
        );

        Ok(Self::from_parts(
            path.clone(),
            Backing::File(path),
            version,
            entries,
        ))
    }

    /// Decodes an archive held in memory.
    pub fn from_buffer(buf: impl Into<Arc<[u8]>>) -> Result<Self, ArchiveError> {
        let buf: Arc<[u8]> = buf.into();
        let path = PathBuf::from("<memory>");
        let (version, entries) =
            IndexReader::new(Cursor::new(&buf[..]), &path, buf.len() as u64).parse()?;

        Ok(Self::from_parts(path, Backing::Memory(buf), version, entries))
    }

    fn from_parts(
        path: PathBuf,
        backing: Backing,
        version: ArchiveVersion,
        entries: Vec<ArchiveEntry>,
    ) -> Self {
        // Later duplicates shadow earlier ones.
        let mut index = FastMap::default();
        for (i, entry) in entries.iter().enumerate() {
            index.insert(canonical_entry_name(&entry.name), i);
        }

        RgssArchive {
            path,
            backing,
            version,
            entries,
            index,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> ArchiveVersion {
        self.version
    }

    /// Entries in index order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.index
            .get(&canonical_entry_name(name))
            .map(|&i| &self.entries[i])
    }

    pub fn has_entry(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Reads and decrypts the payload of `name`.
    pub fn read_entry(&self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        let entry = self
            .entry(name)
            .ok_or_else(|| ArchiveError::EntryNotFound {
                name: name.to_owned(),
            })?;
        self.read(entry)
    }

    /// Reads and decrypts the payload of an entry of this archive.
    pub fn read(&self, entry: &ArchiveEntry) -> Result<Vec<u8>, ArchiveError> {
        let mut data = match &self.backing {
            Backing::File(path) => {
                let io_err = |source| ArchiveError::Io {
                    path: path.clone(),
                    source,
                };
                let mut file = File::open(path).map_err(io_err)?;
                file.seek(SeekFrom::Start(entry.offset)).map_err(io_err)?;

                let mut data = vec![0; entry.size as usize];
                file.read_exact(&mut data).map_err(|e| {
                    if e.kind() == io::ErrorKind::UnexpectedEof {
                        self.invalid(InvalidArchive::Truncated {
                            what: "entry payload",
                            offset: entry.offset,
                        })
                    } else {
                        io_err(e)
                    }
                })?;
                data
            }
            Backing::Memory(buf) => {
                let start = entry.offset as usize;
                let end = start.saturating_add(entry.size as usize);
                buf.get(start..end)
                    .ok_or_else(|| {
                        self.invalid(InvalidArchive::Overrun {
                            what: "entry payload",
                            offset: entry.offset,
                            need: u64::from(entry.size),
                            file_len: buf.len() as u64,
                        })
                    })?
                    .to_vec()
            }
        };

        decrypt_payload(&mut data, entry.key);
        Ok(data)
    }

    fn invalid(&self, reason: InvalidArchive) -> ArchiveError {
        ArchiveError::Invalid {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Sequential reader over the archive index, tracking its own position for error reporting.
struct IndexReader<'a, R> {
    inner: R,
    path: &'a Path,
    file_len: u64,
    pos: u64,
}

impl<'a, R: Read + Seek> IndexReader<'a, R> {
    fn new(inner: R, path: &'a Path, file_len: u64) -> Self {
        IndexReader {
            inner,
            path,
            file_len,
            pos: 0,
        }
    }

    fn invalid(&self, reason: InvalidArchive) -> ArchiveError {
        ArchiveError::Invalid {
            path: self.path.to_path_buf(),
            reason,
        }
    }

    fn read_error(&self, e: io::Error, what: &'static str) -> ArchiveError {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            self.invalid(InvalidArchive::Truncated {
                what,
                offset: self.pos,
            })
        } else {
            ArchiveError::Io {
                path: self.path.to_path_buf(),
                source: e,
            }
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.file_len
    }

    fn ensure_within(&self, len: u64, what: &'static str) -> Result<(), ArchiveError> {
        match self.pos.checked_add(len) {
            Some(end) if end <= self.file_len => Ok(()),
            _ => Err(self.invalid(InvalidArchive::Overrun {
                what,
                offset: self.pos,
                need: len,
                file_len: self.file_len,
            })),
        }
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, ArchiveError> {
        let v = try_read!(self.inner, u8, what, self);
        self.pos += 1;
        Ok(v)
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, ArchiveError> {
        let v = try_read!(self.inner, u32, what, self);
        self.pos += 4;
        Ok(v)
    }

    fn bytes(&mut self, len: u64, what: &'static str) -> Result<Vec<u8>, ArchiveError> {
        self.ensure_within(len, what)?;
        let mut buf = vec![0; len as usize];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| self.read_error(e, what))?;
        self.pos += len;
        Ok(buf)
    }

    fn skip(&mut self, len: u64, what: &'static str) -> Result<(), ArchiveError> {
        self.ensure_within(len, what)?;
        self.inner
            .seek(SeekFrom::Current(len as i64))
            .map_err(|e| self.read_error(e, what))?;
        self.pos += len;
        Ok(())
    }

    fn parse(mut self) -> Result<(ArchiveVersion, Vec<ArchiveEntry>), ArchiveError> {
        let magic = self.bytes(RGSS_MAGIC.len() as u64, "magic").map_err(|e| {
            match e {
                // A file shorter than the magic is simply not an archive.
                ArchiveError::Invalid {
                    reason: InvalidArchive::Overrun { .. },
                    ..
                } => self.invalid(InvalidArchive::Truncated {
                    what: "magic",
                    offset: 0,
                }),
                other => other,
            }
        })?;
        if magic.as_slice() != RGSS_MAGIC {
            return Err(self.invalid(InvalidArchive::BadMagic { found: magic }));
        }

        let _reserved = self.u8("reserved header byte")?;
        let version_byte = self.u8("version byte")?;
        let version = ArchiveVersion::from_byte(version_byte).ok_or_else(|| {
            self.invalid(InvalidArchive::UnsupportedVersion {
                version: version_byte,
            })
        })?;

        let entries = match version {
            ArchiveVersion::V1 | ArchiveVersion::V2 => self.parse_legacy_index()?,
            ArchiveVersion::V3 => self.parse_v3_index()?,
        };

        Ok((version, entries))
    }

    fn parse_legacy_index(&mut self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let mut entries = Vec::new();
        let mut key = LEGACY_INITIAL_KEY;

        while !self.at_end() {
            let name_len = self.u32("entry name length")? ^ key;
            key = advance_key(key);
            if name_len == 0 {
                break;
            }

            let mut name = self.bytes(u64::from(name_len), "entry name")?;
            for b in name.iter_mut() {
                *b ^= (key & 0xFF) as u8;
                key = advance_key(key);
            }

            let size = self.u32("entry size")? ^ key;
            key = advance_key(key);

            let entry = ArchiveEntry {
                name: String::from_utf8_lossy(&name).into_owned(),
                offset: self.pos,
                size,
                key,
            };
            trace!("{:?}", entry);

            self.skip(u64::from(size), "entry payload")?;
            entries.push(entry);
        }

        Ok(entries)
    }

    fn parse_v3_index(&mut self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let seed = self.u32("index seed")?;
        let mask = v3_index_mask(seed);
        let mask_bytes = mask.to_le_bytes();
        trace!("v3 seed {seed:#010x}, index mask {mask:#010x}");

        let mut entries = Vec::new();
        while !self.at_end() {
            let offset = self.u32("entry offset")? ^ mask;
            if offset == 0 {
                break;
            }
            let size = self.u32("entry size")? ^ mask;
            let key = self.u32("entry key")? ^ mask;
            let name_len = self.u32("entry name length")? ^ mask;

            let mut name = self.bytes(u64::from(name_len), "entry name")?;
            for (i, b) in name.iter_mut().enumerate() {
                *b ^= mask_bytes[i % 4];
            }

            if u64::from(offset) + u64::from(size) > self.file_len {
                return Err(self.invalid(InvalidArchive::Overrun {
                    what: "entry payload",
                    offset: u64::from(offset),
                    need: u64::from(size),
                    file_len: self.file_len,
                }));
            }

            let entry = ArchiveEntry {
                name: String::from_utf8_lossy(&name).into_owned(),
                offset: u64::from(offset),
                size,
                key,
            };
            trace!("{:?}", entry);
            entries.push(entry);
        }

        Ok(entries)
    }
}
