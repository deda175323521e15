use std::ops::Range;

use crate::{HashError, ObjectId};

/// Size of the on-disk fan-out table: 256 big-endian u32 values.
pub const FANOUT_BYTES: usize = 256 * 4;

/// Fan-out table mapping first byte to cumulative count.
///
/// Entry `i` holds the number of ids whose first byte is `<= i`, so the ids
/// starting with byte `b` live at `range(b)` in the sorted id table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutTable {
    table: [u32; 256],
}

impl FanoutTable {
    /// Build a fan-out table from a sorted slice of OIDs.
    pub fn build(oids: &[ObjectId]) -> Self {
        let mut table = [0u32; 256];
        for oid in oids {
            table[oid.first_byte() as usize] += 1;
        }
        for i in 1..256 {
            table[i] += table[i - 1];
        }
        Self { table }
    }

    /// Read the table as stored in a pack index.
    pub fn from_bytes(data: &[u8]) -> Result<Self, HashError> {
        if data.len() < FANOUT_BYTES {
            return Err(HashError::InvalidHashLength {
                expected: FANOUT_BYTES,
                actual: data.len(),
            });
        }
        let mut table = [0u32; 256];
        for (entry, chunk) in table.iter_mut().zip(data.chunks_exact(4)) {
            *entry = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        if let Some(index) = (1..256).find(|&i| table[i] < table[i - 1]) {
            return Err(HashError::InvalidFanout { index });
        }
        Ok(Self { table })
    }

    /// Write the table in pack index layout.
    pub fn to_bytes(&self) -> [u8; FANOUT_BYTES] {
        let mut buf = [0u8; FANOUT_BYTES];
        for (chunk, entry) in buf.chunks_exact_mut(4).zip(self.table.iter()) {
            chunk.copy_from_slice(&entry.to_be_bytes());
        }
        buf
    }

    /// Index range of ids whose first byte equals `first_byte`.
    pub fn range(&self, first_byte: u8) -> Range<usize> {
        let end = self.table[first_byte as usize] as usize;
        let start = match first_byte {
            0 => 0,
            b => self.table[(b - 1) as usize] as usize,
        };
        start..end
    }

    /// Total number of objects tracked by this fan-out table.
    pub fn total(&self) -> u32 {
        self.table[255]
    }
}
