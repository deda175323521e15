use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};

use git_object::stream::{forward_seek_target, skip_bytes};
use git_object::{header, ObjectRead, ObjectType};

use crate::{LooseError, ZlibStream};

/// A loose object file opened for streaming.
pub type LooseObjectStream = ObjectDecodeStream<BufReader<File>>;

/// Typed, lazily inflated object content.
///
/// Reads stop at the declared size; positions are relative to the first
/// content byte, after any loose header.
pub struct ObjectDecodeStream<R> {
    inner: ZlibStream<R>,
    obj_type: ObjectType,
    size: u64,
    position: u64,
}

impl<R: BufRead> ObjectDecodeStream<R> {
    /// Open a loose object: zlib header, then the `"<type> <size>\0"` header.
    pub fn open(source: R) -> Result<Self, LooseError> {
        let mut stream = Self::with_type(source, ObjectType::Blob, 0)?;
        stream.read_header()?;
        Ok(stream)
    }

    /// Open headerless zlib content whose type and size are already known,
    /// as with non-delta pack entries.
    pub fn with_type(source: R, obj_type: ObjectType, size: u64) -> Result<Self, LooseError> {
        Ok(Self {
            inner: ZlibStream::new(source)?,
            obj_type,
            size,
            position: 0,
        })
    }

    /// Consume the loose header and adopt its type and size.
    ///
    /// Afterwards position 0 is the first content byte.
    pub fn read_header(&mut self) -> Result<(ObjectType, u64), LooseError> {
        let (obj_type, size) = header::read_header(&mut self.inner)?;
        self.obj_type = obj_type;
        self.size = size;
        self.position = 0;
        Ok((obj_type, size))
    }
}

impl<R: BufRead> Read for ObjectDecodeStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.size.saturating_sub(self.position);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let max = remaining.min(buf.len() as u64) as usize;
        let n = self.inner.read(&mut buf[..max])?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: BufRead> Seek for ObjectDecodeStream<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = forward_seek_target(self.position, pos)?;
        skip_bytes(self, target - self.position)?;
        Ok(self.position)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}

impl<R: BufRead> ObjectRead for ObjectDecodeStream<R> {
    fn object_type(&self) -> ObjectType {
        self.obj_type
    }

    fn size(&self) -> u64 {
        self.size
    }
}
