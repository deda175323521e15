//! A `.idx` + `.pack` pair with lazy opening and per-pack caches.

use std::cell::{OnceCell, RefCell};
use std::path::{Path, PathBuf};

use git_hash::collections::OidMap;
use git_hash::ObjectId;
use git_loose::{ObjectDecodeStream, ZlibStream};
use git_object::{BufferedObject, ObjectRead, ObjectType};
use tracing::trace;

use crate::cache::{CacheKind, PackObjectCache};
use crate::data::PackData;
use crate::delta::DeltaStream;
use crate::entry::{parse_entry_header, EntryHeader};
use crate::index::PackIndex;
use crate::{PackEntryType, PackError, MAX_DELTA_CHAIN_DEPTH};

/// Finds REF_DELTA bases that live outside the pack being read.
pub type BaseResolver<'a> = dyn Fn(&ObjectId) -> Result<Option<Box<dyn ObjectRead>>, PackError> + 'a;

/// One pack of an object database.
///
/// Nothing is read from disk until the first lookup: the index is mapped on
/// the first [`Pack::offset_of`], the pack data on the first object read.
pub struct Pack {
    name: String,
    idx_path: PathBuf,
    pack_path: PathBuf,
    index: OnceCell<PackIndex>,
    data: OnceCell<PackData>,
    /// Index lookups already done; the index stays authoritative.
    offsets: RefCell<OidMap<u64>>,
    cache: RefCell<Box<dyn PackObjectCache>>,
}

impl Pack {
    /// A pack described by its `.idx` path, with a cache of the given kind.
    pub fn new(idx_path: impl Into<PathBuf>, cache: &CacheKind) -> Self {
        let idx_path = idx_path.into();
        let name = pack_name(&idx_path);
        let cache = cache.build(&name);
        Self::with_cache(idx_path, cache)
    }

    pub fn with_cache(idx_path: impl Into<PathBuf>, cache: Box<dyn PackObjectCache>) -> Self {
        let idx_path = idx_path.into();
        Self {
            name: pack_name(&idx_path),
            pack_path: idx_path.with_extension("pack"),
            idx_path,
            index: OnceCell::new(),
            data: OnceCell::new(),
            offsets: RefCell::new(OidMap::new()),
            cache: RefCell::new(cache),
        }
    }

    /// File stem shared by the `.idx` and `.pack` files.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn idx_path(&self) -> &Path {
        &self.idx_path
    }

    pub fn pack_path(&self) -> &Path {
        &self.pack_path
    }

    pub fn index(&self) -> Result<&PackIndex, PackError> {
        if let Some(index) = self.index.get() {
            return Ok(index);
        }
        let index = PackIndex::open(&self.idx_path)?;
        Ok(self.index.get_or_init(|| index))
    }

    fn data(&self) -> Result<&PackData, PackError> {
        if let Some(data) = self.data.get() {
            return Ok(data);
        }
        let data = PackData::open(&self.pack_path)?;
        let indexed = self.index()?.num_objects();
        if data.num_objects() as usize != indexed {
            return Err(PackError::InvalidHeader(format!(
                "pack has {} objects but index has {indexed}",
                data.num_objects()
            )));
        }
        Ok(self.data.get_or_init(|| data))
    }

    /// Pack offset of `oid`, if this pack holds it.
    pub fn offset_of(&self, oid: &ObjectId) -> Result<Option<u64>, PackError> {
        if let Some(&offset) = self.offsets.borrow().get(oid) {
            return Ok(Some(offset));
        }
        let found = self.index()?.lookup(oid)?;
        if let Some(offset) = found {
            self.offsets.borrow_mut().insert(*oid, offset);
        }
        Ok(found)
    }

    pub fn contains(&self, oid: &ObjectId) -> Result<bool, PackError> {
        Ok(self.offset_of(oid)?.is_some())
    }

    /// Read `oid` if this pack holds it, whatever its type.
    pub fn find_object(
        &self,
        oid: &ObjectId,
        resolver: &BaseResolver<'_>,
    ) -> Result<Option<Box<dyn ObjectRead>>, PackError> {
        match self.offset_of(oid)? {
            Some(offset) => self.object_at(offset, resolver).map(Some),
            None => Ok(None),
        }
    }

    /// Read `oid` if this pack holds it, failing if it is not an `expected`.
    pub fn get_object(
        &self,
        oid: &ObjectId,
        expected: ObjectType,
        resolver: &BaseResolver<'_>,
    ) -> Result<Option<Box<dyn ObjectRead>>, PackError> {
        let found = self.find_object(oid, resolver)?;
        if let Some(obj) = &found {
            obj.object_type().expect(expected)?;
        }
        Ok(found)
    }

    /// Resolve the entry at `offset`.
    ///
    /// The delta chain is walked down to the first cached or whole object
    /// and then rebuilt outward; every level passes through the cache, so
    /// each offset is decoded at most once.
    pub fn object_at(
        &self,
        offset: u64,
        resolver: &BaseResolver<'_>,
    ) -> Result<Box<dyn ObjectRead>, PackError> {
        let data = self.data()?;
        let mut chain: Vec<(u64, EntryHeader)> = Vec::new();
        let mut current = offset;

        let mut object = loop {
            let cached = self.cache.borrow_mut().try_open(current)?;
            if let Some(hit) = cached {
                trace!(pack = %self.name, offset = current, "cache hit");
                break hit;
            }
            let header = parse_entry_header(data.bytes_from(current)?, current)?;
            if header.kind.is_delta() && chain.len() == MAX_DELTA_CHAIN_DEPTH {
                return Err(PackError::DeltaChainTooDeep {
                    offset,
                    max_depth: MAX_DELTA_CHAIN_DEPTH,
                });
            }
            match header.kind {
                PackEntryType::Object(obj_type) => {
                    let stream = ObjectDecodeStream::with_type(
                        data.cursor(header.data_offset)?,
                        obj_type,
                        header.size,
                    )?;
                    break self.cache.borrow_mut().add(current, Box::new(stream))?;
                }
                PackEntryType::OfsDelta { base_offset } => {
                    chain.push((current, header));
                    current = base_offset;
                }
                PackEntryType::RefDelta { base_oid } => {
                    chain.push((current, header));
                    if let Some(base_offset) = self.offset_of(&base_oid)? {
                        current = base_offset;
                        continue;
                    }
                    trace!(pack = %self.name, base = %base_oid, "delta base outside pack");
                    let mut base = resolver(&base_oid)?.ok_or(PackError::MissingBase(base_oid))?;
                    if !base.is_random_access() {
                        base = Box::new(BufferedObject::from_stream(&mut base)?);
                    }
                    break base;
                }
            }
        };

        while let Some((entry_offset, header)) = chain.pop() {
            let delta = ZlibStream::new(data.cursor(header.data_offset)?)?;
            let target = DeltaStream::new(object, Box::new(delta), entry_offset)?;
            object = self.cache.borrow_mut().add(entry_offset, Box::new(target))?;
        }
        Ok(object)
    }
}

fn pack_name(idx_path: &Path) -> String {
    idx_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
