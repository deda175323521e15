use std::io::Read;

use crate::{ObjectError, ObjectType};

/// Longest header accepted; `"commit <u64::MAX>\0"` is 28 bytes.
pub const MAX_HEADER_LEN: usize = 64;

/// Parse an object header from raw bytes.
///
/// The header format is `"<type> <size>\0"`. Returns `(type, content_size, header_length)`
/// where `header_length` includes the null terminator.
pub fn parse_header(data: &[u8]) -> Result<(ObjectType, u64, usize), ObjectError> {
    let null_pos = data
        .iter()
        .take(MAX_HEADER_LEN)
        .position(|&b| b == 0)
        .ok_or_else(|| ObjectError::InvalidHeader("missing null terminator".into()))?;
    let (obj_type, size) = split_header(&data[..null_pos])?;
    Ok((obj_type, size, null_pos + 1))
}

/// Consume a header from `reader`, one byte at a time, stopping right after
/// the NUL so the reader is left at the first content byte.
pub fn read_header<R: Read + ?Sized>(reader: &mut R) -> Result<(ObjectType, u64), ObjectError> {
    let mut header = Vec::with_capacity(32);
    let mut byte = [0u8; 1];
    loop {
        if reader.read(&mut byte)? == 0 {
            return Err(ObjectError::InvalidHeader("missing null terminator".into()));
        }
        if byte[0] == 0 {
            break;
        }
        if header.len() == MAX_HEADER_LEN {
            return Err(ObjectError::InvalidHeader("header too long".into()));
        }
        header.push(byte[0]);
    }
    split_header(&header)
}

fn split_header(header: &[u8]) -> Result<(ObjectType, u64), ObjectError> {
    let space_pos = header
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| ObjectError::InvalidHeader("missing space in header".into()))?;

    let obj_type = ObjectType::from_bytes(&header[..space_pos])?;

    let size_bytes = &header[space_pos + 1..];
    let size = std::str::from_utf8(size_bytes)
        .ok()
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| {
            ObjectError::InvalidHeader(format!(
                "invalid size: {}",
                String::from_utf8_lossy(size_bytes)
            ))
        })?;

    Ok((obj_type, size))
}

/// Write an object header: `"<type> <size>\0"`.
pub fn write_header(obj_type: ObjectType, content_size: u64) -> Vec<u8> {
    format!("{} {}\0", obj_type, content_size).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_blob_header() {
        let data = b"blob 12\0hello world!";
        let (ty, size, hdr_len) = parse_header(data).unwrap();
        assert_eq!(ty, ObjectType::Blob);
        assert_eq!(size, 12);
        assert_eq!(hdr_len, 8);
        assert_eq!(&data[hdr_len..], b"hello world!");
    }

    #[test]
    fn read_header_stops_after_nul() {
        let mut data: &[u8] = b"commit 256\0tree ";
        let (ty, size) = read_header(&mut data).unwrap();
        assert_eq!(ty, ObjectType::Commit);
        assert_eq!(size, 256);
        assert_eq!(data, b"tree ");
    }

    #[test]
    fn written_header_reads_back() {
        let hdr = write_header(ObjectType::Tree, 42);
        assert_eq!(hdr, b"tree 42\0");
        let (ty, size, len) = parse_header(&hdr).unwrap();
        assert_eq!((ty, size, len), (ObjectType::Tree, 42, hdr.len()));
    }

    #[test]
    fn missing_null() {
        assert!(parse_header(b"blob 12").is_err());
        let mut data: &[u8] = b"blob 12";
        assert!(matches!(
            read_header(&mut data),
            Err(ObjectError::InvalidHeader(_))
        ));
    }

    #[test]
    fn missing_space() {
        assert!(parse_header(b"blob12\0").is_err());
    }

    #[test]
    fn invalid_type() {
        assert!(matches!(
            parse_header(b"invalid 12\0"),
            Err(ObjectError::InvalidType(_))
        ));
    }

    #[test]
    fn invalid_size() {
        for bad in [&b"blob abc\0"[..], b"blob \0", b"blob -1\0", b"blob +4\0"] {
            assert!(matches!(parse_header(bad), Err(ObjectError::InvalidHeader(_))));
        }
    }

    #[test]
    fn overlong_header_rejected() {
        let mut data = b"blob ".to_vec();
        data.extend(std::iter::repeat(b'1').take(100));
        data.push(0);
        assert!(matches!(
            read_header(&mut data.as_slice()),
            Err(ObjectError::InvalidHeader(_))
        ));
    }
}
