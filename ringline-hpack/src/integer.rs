//! Prefixed integers: an N-bit prefix in the first byte, then base-128
//! continuation bytes, least significant group first.

use bytes::BufMut;

use crate::cursor::Cursor;
use crate::error::HpackError;

/// Largest value the decoder accepts.
const INTEGER_CEILING: u64 = u32::MAX as u64;

/// Encode `value` with a `prefix_bits`-bit prefix. `pattern` carries the
/// instruction bits above the prefix.
pub(crate) fn encode_integer<B: BufMut>(dst: &mut B, value: usize, prefix_bits: u8, pattern: u8) {
    let max = (1usize << prefix_bits) - 1;
    if value < max {
        dst.put_u8(pattern | value as u8);
        return;
    }
    dst.put_u8(pattern | max as u8);
    let mut remaining = value - max;
    while remaining >= 128 {
        dst.put_u8(0x80 | (remaining & 0x7f) as u8);
        remaining >>= 7;
    }
    dst.put_u8(remaining as u8);
}

/// Decode an integer whose prefix occupies the low `prefix_bits` bits of the
/// next byte.
pub(crate) fn decode_integer(
    cursor: &mut Cursor<'_>,
    prefix_bits: u8,
) -> Result<usize, HpackError> {
    let max = (1u16 << prefix_bits) - 1;
    let first = u16::from(cursor.next_byte()?) & max;
    if first < max {
        return Ok(usize::from(first));
    }

    let mut value = u64::from(max);
    let mut shift = 0u32;
    loop {
        let byte = cursor.next_byte()?;
        if shift > 28 {
            return Err(HpackError::IntegerOverflow);
        }
        value += u64::from(byte & 0x7f) << shift;
        if value > INTEGER_CEILING {
            return Err(HpackError::IntegerOverflow);
        }
        if byte & 0x80 == 0 {
            return usize::try_from(value).map_err(|_| HpackError::IntegerOverflow);
        }
        shift += 7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(buf: &[u8], prefix_bits: u8) -> Result<(usize, usize), HpackError> {
        let mut cursor = Cursor::new(buf);
        let value = decode_integer(&mut cursor, prefix_bits)?;
        Ok((value, cursor.position()))
    }

    #[test]
    fn prefix_int_round_trip() {
        for &(value, prefix_bits, pattern) in &[
            (0usize, 7, 0x80u8),
            (5, 7, 0x80),
            (126, 7, 0x80),
            (127, 7, 0x80),
            (128, 7, 0x80),
            (1000, 7, 0x80),
            (0, 6, 0x40),
            (63, 6, 0x40),
            (64, 6, 0x40),
            (14, 4, 0x20),
            (15, 4, 0x20),
            (4096, 4, 0x20),
            (15, 4, 0x10),
            (16, 4, 0x00),
            (u32::MAX as usize, 7, 0x80),
        ] {
            let mut buf = Vec::new();
            encode_integer(&mut buf, value, prefix_bits, pattern);
            let (decoded, len) = decode(&buf, prefix_bits).unwrap();
            assert_eq!(decoded, value, "value={value} prefix={prefix_bits}");
            assert_eq!(len, buf.len());
            let mask = !((1u8 << prefix_bits) - 1);
            assert_eq!(buf[0] & mask, pattern & mask);
        }
    }

    #[test]
    fn integer_examples() {
        // 10 with a 5-bit prefix.
        let mut buf = Vec::new();
        encode_integer(&mut buf, 10, 5, 0x00);
        assert_eq!(buf, vec![0x0a]);

        // 1337 with a 5-bit prefix.
        let mut buf = Vec::new();
        encode_integer(&mut buf, 1337, 5, 0x00);
        assert_eq!(buf, vec![0x1f, 0x9a, 0x0a]);

        // 42 on an octet boundary.
        let mut buf = Vec::new();
        encode_integer(&mut buf, 42, 8, 0x00);
        assert_eq!(buf, vec![0x2a]);
        assert_eq!(decode(&buf, 8).unwrap(), (42, 1));
    }

    #[test]
    fn truncated_continuation() {
        assert_eq!(decode(&[], 7), Err(HpackError::TruncatedInput));
        assert_eq!(decode(&[0x7f], 7), Err(HpackError::TruncatedInput));
        assert_eq!(
            decode(&[0x7f, 0x80, 0x80], 7),
            Err(HpackError::TruncatedInput)
        );
    }

    #[test]
    fn overflow_is_rejected() {
        // 127 + 0x7f << 28 already exceeds u32::MAX.
        assert_eq!(
            decode(&[0x7f, 0xff, 0xff, 0xff, 0xff, 0x7f], 7),
            Err(HpackError::IntegerOverflow)
        );
        // Endless zero continuations.
        assert_eq!(
            decode(&[0x7f, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x00], 7),
            Err(HpackError::IntegerOverflow)
        );
    }
}
