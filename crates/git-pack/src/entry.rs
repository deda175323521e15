//! Pack entry header parsing.

use git_hash::ObjectId;

use crate::{PackEntryType, PackError, OBJ_OFS_DELTA, OBJ_REF_DELTA};

/// A raw entry header read from a packfile (before delta resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub kind: PackEntryType,
    /// Inflated size of the entry data: the object itself, or the delta
    /// instruction stream for delta entries.
    pub size: u64,
    /// Offset of the zlib stream in the pack.
    pub data_offset: u64,
}

/// Parse a pack entry header at the front of `data`.
///
/// `entry_offset` is the absolute offset of this entry in the pack file,
/// needed to turn an OFS_DELTA distance into the base's offset.
pub fn parse_entry_header(data: &[u8], entry_offset: u64) -> Result<EntryHeader, PackError> {
    let corrupt = || PackError::CorruptEntry(entry_offset);
    let mut bytes = data.iter().copied();

    // First byte: bits 6-4 = type, bits 3-0 = lower 4 bits of size
    let c = bytes.next().ok_or_else(corrupt)?;
    let type_num = (c >> 4) & 0x07;
    let mut size = u64::from(c & 0x0f);
    let mut shift = 4u32;
    let mut byte = c;
    while byte & 0x80 != 0 {
        byte = bytes.next().ok_or_else(corrupt)?;
        if shift > 63 - 7 {
            return Err(corrupt());
        }
        size |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }
    let mut used = data.len() - bytes.len();

    let kind = match type_num {
        OBJ_OFS_DELTA => {
            let mut c = bytes.next().ok_or_else(corrupt)?;
            let mut distance = u64::from(c & 0x7f);
            while c & 0x80 != 0 {
                c = bytes.next().ok_or_else(corrupt)?;
                distance = distance
                    .checked_add(1)
                    .filter(|d| d.leading_zeros() >= 7)
                    .ok_or_else(corrupt)?;
                distance = (distance << 7) | u64::from(c & 0x7f);
            }
            used = data.len() - bytes.len();
            if distance == 0 || distance > entry_offset {
                return Err(corrupt());
            }
            PackEntryType::OfsDelta {
                base_offset: entry_offset - distance,
            }
        }
        OBJ_REF_DELTA => {
            let end = used + ObjectId::LEN;
            if data.len() < end {
                return Err(corrupt());
            }
            let base_oid = ObjectId::from_bytes(&data[used..end])?;
            used = end;
            PackEntryType::RefDelta { base_oid }
        }
        n => PackEntryType::Object(PackEntryType::object_type(n).ok_or_else(corrupt)?),
    };

    Ok(EntryHeader {
        kind,
        size,
        data_offset: entry_offset + used as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_object::ObjectType;
    use git_testtools::pack::{entry_header, ofs_delta_distance};

    #[test]
    fn parse_base_object_header() {
        let data = entry_header(3, 100);
        let entry = parse_entry_header(&data, 0).unwrap();
        assert_eq!(entry.kind, PackEntryType::Object(ObjectType::Blob));
        assert_eq!(entry.size, 100);
        assert_eq!(entry.data_offset, data.len() as u64);
    }

    #[test]
    fn parse_commit_header_small_size() {
        // (1 << 4) | 5, no continuation
        let entry = parse_entry_header(&[0x15], 40).unwrap();
        assert_eq!(entry.kind, PackEntryType::Object(ObjectType::Commit));
        assert_eq!(entry.size, 5);
        assert_eq!(entry.data_offset, 41);
    }

    #[test]
    fn large_sizes() {
        for size in [15u64, 16, 2047, 2048, 1_000_000, u32::MAX as u64 + 7] {
            let entry = parse_entry_header(&entry_header(2, size), 0).unwrap();
            assert_eq!(entry.size, size);
        }
    }

    #[test]
    fn ofs_delta_base_offsets() {
        for distance in [1u64, 127, 128, 255, 16_511, 16_512, 1_000_000] {
            let mut data = entry_header(OBJ_OFS_DELTA, 9);
            data.extend(ofs_delta_distance(distance));
            let entry = parse_entry_header(&data, 2_000_000).unwrap();
            assert_eq!(
                entry.kind,
                PackEntryType::OfsDelta { base_offset: 2_000_000 - distance }
            );
            assert_eq!(entry.data_offset, 2_000_000 + data.len() as u64);
        }
    }

    #[test]
    fn ofs_delta_before_pack_start_is_corrupt() {
        let mut data = entry_header(OBJ_OFS_DELTA, 9);
        data.extend(ofs_delta_distance(100));
        assert!(matches!(
            parse_entry_header(&data, 50),
            Err(PackError::CorruptEntry(50))
        ));
    }

    #[test]
    fn ref_delta_reads_raw_id() {
        let base = ObjectId::new([0xab; 20]);
        let mut data = entry_header(OBJ_REF_DELTA, 12);
        data.extend_from_slice(base.as_bytes());
        let entry = parse_entry_header(&data, 12).unwrap();
        assert_eq!(entry.kind, PackEntryType::RefDelta { base_oid: base });
        assert_eq!(entry.data_offset, 12 + data.len() as u64);

        data.truncate(data.len() - 1);
        assert!(parse_entry_header(&data, 12).is_err());
    }

    #[test]
    fn reserved_types_and_truncation() {
        assert!(matches!(parse_entry_header(&[0x05], 0), Err(PackError::CorruptEntry(0))));
        assert!(matches!(parse_entry_header(&[0x55], 0), Err(PackError::CorruptEntry(0))));
        assert!(matches!(parse_entry_header(&[0x95], 7), Err(PackError::CorruptEntry(7))));
        assert!(matches!(parse_entry_header(&[], 3), Err(PackError::CorruptEntry(3))));
    }

    #[test]
    fn oversized_length_is_corrupt() {
        let data = [0xbf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        assert!(matches!(parse_entry_header(&data, 0), Err(PackError::CorruptEntry(0))));
    }
}
