//! Lowercase hex for object ids.

use crate::HashError;

const DIGITS: &[u8; 16] = b"0123456789abcdef";

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Lowercase hex form of `bytes`.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(DIGITS[usize::from(b >> 4)] as char);
        out.push(DIGITS[usize::from(b & 0x0f)] as char);
    }
    out
}

/// Fill `buf` from exactly `2 * buf.len()` hex digits of either case.
pub fn decode(hex: &[u8], buf: &mut [u8]) -> Result<(), HashError> {
    if hex.len() != buf.len() * 2 {
        return Err(HashError::InvalidHexLength {
            expected: buf.len() * 2,
            actual: hex.len(),
        });
    }
    let invalid = |position: usize| HashError::InvalidHex {
        position,
        character: hex[position] as char,
    };
    for (i, out) in buf.iter_mut().enumerate() {
        let hi = nibble(hex[2 * i]).ok_or_else(|| invalid(2 * i))?;
        let lo = nibble(hex[2 * i + 1]).ok_or_else(|| invalid(2 * i + 1))?;
        *out = (hi << 4) | lo;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(hex: &str) -> Result<Vec<u8>, HashError> {
        let mut buf = vec![0u8; hex.len() / 2];
        decode(hex.as_bytes(), &mut buf)?;
        Ok(buf)
    }

    #[test]
    fn encodes_lowercase() {
        assert_eq!(encode(&[0xde, 0xad, 0xbe, 0xef, 0x00, 0xff]), "deadbeef00ff");
    }

    #[test]
    fn decodes_either_case() {
        assert_eq!(decoded("DeAdBeEf").unwrap(), [0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn reports_position_of_bad_digit() {
        assert!(matches!(
            decoded("deadgoof"),
            Err(HashError::InvalidHex { position: 4, character: 'g' })
        ));
        assert!(matches!(
            decoded("0x"),
            Err(HashError::InvalidHex { position: 1, character: 'x' })
        ));
    }

    #[test]
    fn rejects_odd_length() {
        let mut buf = [0u8; 2];
        assert!(matches!(
            decode(b"abc", &mut buf),
            Err(HashError::InvalidHexLength { expected: 4, actual: 3 })
        ));
    }
}
