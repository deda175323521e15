//! Per-pack caches of resolved objects.
//!
//! Delta bases are requested over and over while walking history, so every
//! object a [`Pack`](crate::Pack) resolves is handed to its cache once and
//! read back from there afterwards. Cached streams are always random access,
//! which is what lets a delta seek backwards in its base.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use git_object::stream::unsupported;
use git_object::{header, BufferedObject, ObjectRead, ObjectType};
use lru::LruCache;
use tracing::trace;

use crate::PackError;

/// Storage for objects resolved from one pack, keyed by pack offset.
pub trait PackObjectCache {
    /// A fresh stream positioned at the start of the object cached for
    /// `offset`, if there is one.
    fn try_open(&mut self, offset: u64) -> Result<Option<Box<dyn ObjectRead>>, PackError>;

    /// Consume `stream` into the cache and return a stream over the cached
    /// copy, positioned at its start.
    fn add(
        &mut self,
        offset: u64,
        stream: Box<dyn ObjectRead>,
    ) -> Result<Box<dyn ObjectRead>, PackError>;
}

/// Which cache each pack gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKind {
    /// Keep decoded objects in memory, optionally capped to `capacity`
    /// objects with least-recently-used eviction.
    Memory { capacity: Option<NonZeroUsize> },
    /// Spill decoded objects to files under `dir`.
    Disk { dir: PathBuf },
}

impl Default for CacheKind {
    fn default() -> Self {
        Self::Memory { capacity: None }
    }
}

impl CacheKind {
    /// Build the cache for the pack called `pack_name`.
    pub fn build(&self, pack_name: &str) -> Box<dyn PackObjectCache> {
        match self {
            Self::Memory { capacity: Some(cap) } => Box::new(MemoryCache::with_capacity(*cap)),
            Self::Memory { capacity: None } => Box::new(MemoryCache::new()),
            Self::Disk { dir } => Box::new(DiskCache::new(dir, pack_name)),
        }
    }
}

/// Keeps decoded objects in memory.
pub struct MemoryCache {
    objects: LruCache<u64, BufferedObject>,
}

impl MemoryCache {
    /// A cache that never evicts.
    pub fn new() -> Self {
        Self {
            objects: LruCache::unbounded(),
        }
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            objects: LruCache::new(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PackObjectCache for MemoryCache {
    fn try_open(&mut self, offset: u64) -> Result<Option<Box<dyn ObjectRead>>, PackError> {
        Ok(self
            .objects
            .get(&offset)
            .map(|obj| Box::new(obj.reopen()) as Box<dyn ObjectRead>))
    }

    fn add(
        &mut self,
        offset: u64,
        mut stream: Box<dyn ObjectRead>,
    ) -> Result<Box<dyn ObjectRead>, PackError> {
        let obj = BufferedObject::from_stream(&mut stream)?;
        if obj.size() != stream.size() {
            return Err(PackError::CorruptEntry(offset));
        }
        trace!(offset, size = obj.size(), "cached object in memory");
        let handle = obj.reopen();
        self.objects.put(offset, obj);
        Ok(Box::new(handle))
    }
}

/// Spills decoded objects to `<dir>/<pack name>-<offset>`.
///
/// Each file holds a loose-style `"<type> <size>\0"` header followed by the
/// content, so the type survives a round trip through the file system.
pub struct DiskCache {
    dir: PathBuf,
    pack_name: String,
}

impl DiskCache {
    pub fn new(dir: impl AsRef<Path>, pack_name: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            pack_name: pack_name.to_string(),
        }
    }

    /// Path of the file caching `offset`.
    pub fn path_for(&self, offset: u64) -> PathBuf {
        self.dir.join(format!("{}-{}", self.pack_name, offset))
    }
}

impl PackObjectCache for DiskCache {
    fn try_open(&mut self, offset: u64) -> Result<Option<Box<dyn ObjectRead>>, PackError> {
        let file = match File::open(self.path_for(offset)) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(Box::new(CachedFile::open(file)?)))
    }

    fn add(
        &mut self,
        offset: u64,
        mut stream: Box<dyn ObjectRead>,
    ) -> Result<Box<dyn ObjectRead>, PackError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(offset);
        let tmp = path.with_extension("tmp");

        let mut out = BufWriter::new(File::create(&tmp)?);
        out.write_all(&header::write_header(stream.object_type(), stream.size()))?;
        let written = io::copy(&mut stream, &mut out)?;
        out.flush()?;
        drop(out);
        if written != stream.size() {
            let _ = fs::remove_file(&tmp);
            return Err(PackError::CorruptEntry(offset));
        }
        fs::rename(&tmp, &path)?;
        trace!(offset, size = written, path = %path.display(), "cached object on disk");

        self.try_open(offset)?
            .ok_or_else(|| PackError::Io(io::Error::new(io::ErrorKind::NotFound, "cache file vanished")))
    }
}

/// A cache file opened for reading; offsets exclude the header.
struct CachedFile {
    file: BufReader<File>,
    header_len: u64,
    obj_type: ObjectType,
    size: u64,
    position: u64,
}

impl CachedFile {
    fn open(file: File) -> Result<Self, PackError> {
        let mut file = BufReader::new(file);
        let (obj_type, size) = header::read_header(&mut file)?;
        let header_len = file.stream_position()?;
        Ok(Self {
            file,
            header_len,
            obj_type,
            size,
            position: 0,
        })
    }
}

impl Read for CachedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.size.saturating_sub(self.position);
        let max = remaining.min(buf.len() as u64) as usize;
        if max == 0 {
            return Ok(0);
        }
        let n = self.file.read(&mut buf[..max])?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for CachedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(d) => self.position.checked_add_signed(d),
            SeekFrom::End(d) => self.size.checked_add_signed(d),
        }
        .ok_or_else(|| unsupported("seek before start of cached object"))?;
        self.file.seek(SeekFrom::Start(self.header_len + target))?;
        self.position = target;
        Ok(target)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}

impl ObjectRead for CachedFile {
    fn object_type(&self) -> ObjectType {
        self.obj_type
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn is_random_access(&self) -> bool {
        true
    }
}
