use std::io::{self, Read, Seek, SeekFrom};

use git_object::stream::{forward_seek_target, skip_bytes};
use git_object::{ObjectRead, ObjectType};
use tracing::trace;

use super::{invalid, DeltaDecoder, DeltaInstruction};
use crate::PackError;

#[derive(Debug, Clone, Copy)]
enum Step {
    /// Bytes left in the current copy or insert.
    Copy(u64),
    Insert(u64),
    /// Between instructions.
    Idle,
    Done,
}

/// The target of a delta, produced while it is read.
///
/// Each read pulls bytes from the base (copy) or from the delta stream
/// itself (insert). The base must support seeking to arbitrary offsets;
/// the result is forward-only.
pub struct DeltaStream {
    base: Box<dyn ObjectRead>,
    delta: DeltaDecoder<Box<dyn Read>>,
    step: Step,
    position: u64,
}

impl DeltaStream {
    /// Start replaying `delta` (an inflated instruction stream) against
    /// `base`. `offset` is the delta entry's pack offset.
    pub fn new(
        base: Box<dyn ObjectRead>,
        delta: Box<dyn Read>,
        offset: u64,
    ) -> Result<Self, PackError> {
        let delta = DeltaDecoder::new(delta, offset)?;
        if delta.base_size() != base.size() {
            return Err(invalid(
                offset,
                &format!(
                    "base size mismatch: delta expects {}, base has {}",
                    delta.base_size(),
                    base.size()
                ),
            ));
        }
        trace!(offset, base = base.size(), target = delta.target_size(), "replaying delta");
        Ok(Self {
            base,
            delta,
            step: Step::Idle,
            position: 0,
        })
    }

    fn advance(&mut self) -> Result<(), PackError> {
        let offset = self.offset();
        let target = self.delta.target_size();
        self.step = match self.delta.next_instruction()? {
            None if self.position == target => Step::Done,
            None => {
                return Err(invalid(
                    offset,
                    &format!("delta produced {} of {target} bytes", self.position),
                ))
            }
            Some(ins) => {
                let size = match ins {
                    DeltaInstruction::Copy { size, .. } | DeltaInstruction::Insert { size } => size,
                };
                if self.position + size > target {
                    return Err(invalid(offset, "instruction runs past target size"));
                }
                match ins {
                    DeltaInstruction::Copy { offset: from, size } => {
                        if from.checked_add(size).map_or(true, |end| end > self.base.size()) {
                            return Err(invalid(offset, "copy outside base object"));
                        }
                        self.base.seek(SeekFrom::Start(from))?;
                        Step::Copy(size)
                    }
                    DeltaInstruction::Insert { size } => Step::Insert(size),
                }
            }
        };
        Ok(())
    }

    fn offset(&self) -> u64 {
        self.delta.offset
    }
}

fn to_io(err: PackError) -> io::Error {
    match err {
        PackError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

impl Read for DeltaStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.step {
                Step::Done => return Ok(0),
                Step::Idle | Step::Copy(0) | Step::Insert(0) => self.advance().map_err(to_io)?,
                Step::Copy(remaining) => {
                    let want = remaining.min(buf.len() as u64) as usize;
                    let n = self.base.read(&mut buf[..want])?;
                    if n == 0 {
                        return Err(to_io(invalid(self.offset(), "base ended during copy")));
                    }
                    self.step = Step::Copy(remaining - n as u64);
                    self.position += n as u64;
                    return Ok(n);
                }
                Step::Insert(remaining) => {
                    let want = remaining.min(buf.len() as u64) as usize;
                    let n = self.delta.reader().read(&mut buf[..want])?;
                    if n == 0 {
                        return Err(to_io(invalid(self.offset(), "truncated insert data")));
                    }
                    self.step = Step::Insert(remaining - n as u64);
                    self.position += n as u64;
                    return Ok(n);
                }
            }
        }
    }
}

impl Seek for DeltaStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = forward_seek_target(self.position, pos)?;
        skip_bytes(self, target - self.position)?;
        Ok(self.position)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}

impl ObjectRead for DeltaStream {
    fn object_type(&self) -> ObjectType {
        self.base.object_type()
    }

    fn size(&self) -> u64 {
        self.delta.target_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_object::BufferedObject;
    use git_testtools::delta::{diff, DeltaBuilder};

    fn replay(base: &[u8], delta: Vec<u8>) -> io::Result<Vec<u8>> {
        let base = Box::new(BufferedObject::new(ObjectType::Blob, base.to_vec()));
        let mut stream = DeltaStream::new(base, Box::new(io::Cursor::new(delta)), 100)
            .map_err(to_io)?;
        stream.read_content()
    }

    #[test]
    fn copy_then_insert() {
        let delta = DeltaBuilder::new(11, 8).copy(6, 5).insert(b"!!!").build();
        assert_eq!(replay(b"hello world", delta).unwrap(), b"world!!!");
    }

    #[test]
    fn copies_may_go_backwards_in_the_base() {
        let delta = DeltaBuilder::new(6, 6).copy(3, 3).copy(0, 3).build();
        assert_eq!(replay(b"abcdef", delta).unwrap(), b"defabc");
    }

    #[test]
    fn large_insert_is_split() {
        let target: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let delta = diff(b"", &target);
        assert_eq!(replay(b"", delta).unwrap(), target);
    }

    #[test]
    fn metadata_comes_from_base_and_header() {
        let base = Box::new(BufferedObject::new(ObjectType::Tree, b"abc".to_vec()));
        let delta = DeltaBuilder::new(3, 6).copy(0, 3).copy(0, 3).build();
        let stream = DeltaStream::new(base, Box::new(io::Cursor::new(delta)), 0).unwrap();
        assert_eq!(stream.object_type(), ObjectType::Tree);
        assert_eq!(stream.size(), 6);
        assert!(!stream.is_random_access());
    }

    #[test]
    fn base_size_mismatch() {
        let base = Box::new(BufferedObject::new(ObjectType::Blob, b"abc".to_vec()));
        let delta = DeltaBuilder::new(4, 1).insert(b"x").build();
        assert!(matches!(
            DeltaStream::new(base, Box::new(io::Cursor::new(delta)), 7),
            Err(PackError::InvalidDelta { offset: 7, .. })
        ));
    }

    #[test]
    fn short_output_is_invalid() {
        let delta = DeltaBuilder::new(3, 5).copy(0, 3).build();
        let err = replay(b"abc", delta).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn overlong_output_is_invalid() {
        let delta = DeltaBuilder::new(3, 2).copy(0, 3).build();
        assert_eq!(replay(b"abc", delta).unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn copy_outside_base_is_invalid() {
        let delta = DeltaBuilder::new(3, 4).copy(1, 4).build();
        assert_eq!(replay(b"abc", delta).unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn forward_seek_only() {
        let delta = DeltaBuilder::new(11, 11).copy(0, 11).build();
        let base = Box::new(BufferedObject::new(ObjectType::Blob, b"hello world".to_vec()));
        let mut stream = DeltaStream::new(base, Box::new(io::Cursor::new(delta)), 0).unwrap();
        stream.seek(SeekFrom::Start(6)).unwrap();
        assert_eq!(stream.read_content().unwrap(), b"world");
        let err = stream.seek(SeekFrom::Start(0)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
