//! Delta decoding.
//!
//! Git packfiles use delta compression to store similar objects compactly.
//! A delta instruction stream describes how to reconstruct a target object
//! from a base (source) object using copy and insert operations.
//!
//! Delta format:
//! ```text
//! [source_size: varint] [target_size: varint]
//! [instruction]*
//! ```
//!
//! Instructions:
//! - Copy:   `[1SSSOOOO] [offset_bytes] [size_bytes]`
//! - Insert: `[0NNNNNNN] [N literal bytes]`
//!
//! Instructions are decoded one at a time from the inflated delta stream;
//! insert payloads stay in the stream until the consumer reads them.

mod stream;

pub use stream::DeltaStream;

use std::io::{self, Read};

use crate::PackError;

/// A single delta instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaInstruction {
    /// Copy `size` bytes starting at `offset` in the base object.
    Copy { offset: u64, size: u64 },
    /// The next `size` bytes of the delta stream are literal output.
    Insert { size: u64 },
}

/// Pulls instructions off an inflated delta stream.
pub struct DeltaDecoder<R> {
    reader: R,
    base_size: u64,
    target_size: u64,
    /// Pack offset of the delta entry, for error reporting.
    offset: u64,
}

impl<R: Read> DeltaDecoder<R> {
    /// Read the base and target sizes from the front of `reader`.
    pub fn new(mut reader: R, offset: u64) -> Result<Self, PackError> {
        let base_size = read_varint(&mut reader, offset, "base size")?;
        let target_size = read_varint(&mut reader, offset, "target size")?;
        Ok(Self {
            reader,
            base_size,
            target_size,
            offset,
        })
    }

    pub fn base_size(&self) -> u64 {
        self.base_size
    }

    pub fn target_size(&self) -> u64 {
        self.target_size
    }

    /// Decode the next instruction, or `None` at the end of the stream.
    ///
    /// After an `Insert`, the caller must read exactly `size` bytes through
    /// [`DeltaDecoder::reader`] before asking for the next instruction.
    pub fn next_instruction(&mut self) -> Result<Option<DeltaInstruction>, PackError> {
        let Some(cmd) = read_byte(&mut self.reader, self.offset)? else {
            return Ok(None);
        };

        if cmd & 0x80 == 0 {
            if cmd == 0 {
                return Err(invalid(self.offset, "unexpected delta opcode 0"));
            }
            return Ok(Some(DeltaInstruction::Insert {
                size: u64::from(cmd),
            }));
        }

        let mut offset = 0u64;
        for i in 0..4 {
            if cmd & (1 << i) != 0 {
                offset |= u64::from(self.arg_byte("truncated copy offset")?) << (8 * i);
            }
        }
        let mut size = 0u64;
        for i in 0..3 {
            if cmd & (0x10 << i) != 0 {
                size |= u64::from(self.arg_byte("truncated copy size")?) << (8 * i);
            }
        }
        // Size of 0 means 0x10000 (65536)
        if size == 0 {
            size = 0x10000;
        }
        Ok(Some(DeltaInstruction::Copy { offset, size }))
    }

    /// The underlying stream, positioned at insert payload bytes after an
    /// `Insert` instruction.
    pub fn reader(&mut self) -> &mut R {
        &mut self.reader
    }

    fn arg_byte(&mut self, what: &str) -> Result<u8, PackError> {
        read_byte(&mut self.reader, self.offset)?.ok_or_else(|| invalid(self.offset, what))
    }
}

/// Read a 7-bit-per-byte, least-significant-group-first size.
pub fn read_varint<R: Read + ?Sized>(
    reader: &mut R,
    offset: u64,
    what: &str,
) -> Result<u64, PackError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = read_byte(reader, offset)?
            .ok_or_else(|| invalid(offset, &format!("truncated {what}")))?;
        if shift > 63 {
            return Err(invalid(offset, &format!("{what} overflows")));
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

fn read_byte<R: Read + ?Sized>(reader: &mut R, offset: u64) -> Result<Option<u8>, PackError> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(invalid(offset, &format!("corrupt delta data: {e}")))
            }
            Err(e) => return Err(e.into()),
        }
    }
}

pub(crate) fn invalid(offset: u64, reason: &str) -> PackError {
    PackError::InvalidDelta {
        offset,
        reason: reason.to_string(),
    }
}
