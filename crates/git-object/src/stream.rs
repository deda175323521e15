use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;

use crate::ObjectType;

/// A typed stream over one object's content (header already stripped).
///
/// Implementations may be forward-only: seeking backwards on those fails
/// with [`io::ErrorKind::Unsupported`].
pub trait ObjectRead: Read + Seek {
    fn object_type(&self) -> ObjectType;

    /// Declared content length in bytes.
    fn size(&self) -> u64;

    /// Whether arbitrary (including backward) seeks are supported.
    fn is_random_access(&self) -> bool {
        false
    }

    /// Read the remaining content into memory.
    fn read_content(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.size().min(1 << 20) as usize);
        self.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Resolve a seek on a forward-only stream currently at `position`.
///
/// Returns the target offset, or [`io::ErrorKind::Unsupported`] for
/// backward seeks and seeks relative to the end.
pub fn forward_seek_target(position: u64, pos: SeekFrom) -> io::Result<u64> {
    let target = match pos {
        SeekFrom::Start(n) => Some(n),
        SeekFrom::Current(delta) if delta >= 0 => position.checked_add(delta as u64),
        SeekFrom::Current(_) => None,
        SeekFrom::End(_) => return Err(unsupported("seek from end on a forward-only stream")),
    };
    match target {
        Some(t) if t >= position => Ok(t),
        _ => Err(unsupported("backward seek on a forward-only stream")),
    }
}

/// Advance `reader` by `count` bytes, discarding them. Returns the number of
/// bytes actually skipped, which is short only at end of stream.
pub fn skip_bytes<R: Read + ?Sized>(reader: &mut R, count: u64) -> io::Result<u64> {
    io::copy(&mut reader.take(count), &mut io::sink())
}

pub fn unsupported(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, what.to_string())
}

impl<T: ObjectRead + ?Sized> ObjectRead for Box<T> {
    fn object_type(&self) -> ObjectType {
        (**self).object_type()
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    fn is_random_access(&self) -> bool {
        (**self).is_random_access()
    }
}

/// A fully materialized object, cheap to clone and freely seekable.
#[derive(Debug, Clone)]
pub struct BufferedObject {
    obj_type: ObjectType,
    cursor: Cursor<Arc<[u8]>>,
}

impl BufferedObject {
    pub fn new(obj_type: ObjectType, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            obj_type,
            cursor: Cursor::new(data.into()),
        }
    }

    /// Drain `stream` into memory.
    pub fn from_stream<S: ObjectRead + ?Sized>(stream: &mut S) -> io::Result<Self> {
        let obj_type = stream.object_type();
        let data = stream.read_content()?;
        Ok(Self::new(obj_type, data))
    }

    /// The shared backing buffer.
    pub fn data(&self) -> &Arc<[u8]> {
        self.cursor.get_ref()
    }

    /// A fresh handle over the same bytes, positioned at the start.
    pub fn reopen(&self) -> Self {
        Self::new(self.obj_type, Arc::clone(self.data()))
    }
}

impl Read for BufferedObject {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for BufferedObject {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl ObjectRead for BufferedObject {
    fn object_type(&self) -> ObjectType {
        self.obj_type
    }

    fn size(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    fn is_random_access(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_object_seeks_both_ways() {
        let mut obj = BufferedObject::new(ObjectType::Blob, &b"hello world"[..]);
        assert_eq!(obj.size(), 11);
        obj.seek(SeekFrom::Start(6)).unwrap();
        let mut word = [0u8; 5];
        obj.read_exact(&mut word).unwrap();
        assert_eq!(&word, b"world");
        obj.seek(SeekFrom::Start(0)).unwrap();
        obj.read_exact(&mut word).unwrap();
        assert_eq!(&word, b"hello");
    }

    #[test]
    fn reopen_starts_at_zero_and_shares_data() {
        let mut obj = BufferedObject::new(ObjectType::Tree, vec![1u8, 2, 3]);
        obj.seek(SeekFrom::End(0)).unwrap();
        let mut again = obj.reopen();
        assert!(Arc::ptr_eq(obj.data(), again.data()));
        assert_eq!(again.read_content().unwrap(), vec![1, 2, 3]);
        assert_eq!(again.object_type(), ObjectType::Tree);
    }

    #[test]
    fn forward_seek_rules() {
        assert_eq!(forward_seek_target(4, SeekFrom::Start(4)).unwrap(), 4);
        assert_eq!(forward_seek_target(4, SeekFrom::Start(10)).unwrap(), 10);
        assert_eq!(forward_seek_target(4, SeekFrom::Current(3)).unwrap(), 7);
        for bad in [SeekFrom::Start(3), SeekFrom::Current(-1), SeekFrom::End(0)] {
            let err = forward_seek_target(4, bad).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        }
    }

    #[test]
    fn skip_stops_at_end() {
        let mut data: &[u8] = b"abcdef";
        assert_eq!(skip_bytes(&mut data, 4).unwrap(), 4);
        assert_eq!(data, b"ef");
        assert_eq!(skip_bytes(&mut data, 10).unwrap(), 2);
    }

    #[test]
    fn boxed_stream_forwards_metadata() {
        let mut boxed: Box<dyn ObjectRead> =
            Box::new(BufferedObject::new(ObjectType::Commit, &b"abc"[..]));
        assert_eq!(boxed.object_type(), ObjectType::Commit);
        assert!(boxed.is_random_access());
        let copy = BufferedObject::from_stream(&mut boxed).unwrap();
        assert_eq!(&copy.data()[..], b"abc");
    }
}
