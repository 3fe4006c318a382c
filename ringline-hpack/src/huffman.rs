//! Canonical Huffman code for header string literals.
//!
//! Encoding packs codes most-significant-bit first and pads the last byte
//! with 1-bits (a prefix of EOS). Decoding walks byte-indexed tables: each
//! 256-slot table is keyed by the next 8 input bits and either resolves a
//! symbol or chains to the table for the following 8 bits.

use std::sync::OnceLock;

use bytes::BufMut;

use crate::error::HpackError;

const EOS: u16 = 256;

/// (code, bit length) per symbol; bytes 0..=255, then EOS.
static CODES: [(u32, u8); 257] = [
    (0x1ff8, 13), (0x7fffd8, 23), (0xfffffe2, 28), (0xfffffe3, 28), // 0
    (0xfffffe4, 28), (0xfffffe5, 28), (0xfffffe6, 28), (0xfffffe7, 28), // 4
    (0xfffffe8, 28), (0xffffea, 24), (0x3ffffffc, 30), (0xfffffe9, 28), // 8
    (0xfffffea, 28), (0x3ffffffd, 30), (0xfffffeb, 28), (0xfffffec, 28), // 12
    (0xfffffed, 28), (0xfffffee, 28), (0xfffffef, 28), (0xffffff0, 28), // 16
    (0xffffff1, 28), (0xffffff2, 28), (0x3ffffffe, 30), (0xffffff3, 28), // 20
    (0xffffff4, 28), (0xffffff5, 28), (0xffffff6, 28), (0xffffff7, 28), // 24
    (0xffffff8, 28), (0xffffff9, 28), (0xffffffa, 28), (0xffffffb, 28), // 28
    (0x14, 6), (0x3f8, 10), (0x3f9, 10), (0xffa, 12), // 32
    (0x1ff9, 13), (0x15, 6), (0xf8, 8), (0x7fa, 11), // 36
    (0x3fa, 10), (0x3fb, 10), (0xf9, 8), (0x7fb, 11), // 40
    (0xfa, 8), (0x16, 6), (0x17, 6), (0x18, 6), // 44
    (0x0, 5), (0x1, 5), (0x2, 5), (0x19, 6), // 48
    (0x1a, 6), (0x1b, 6), (0x1c, 6), (0x1d, 6), // 52
    (0x1e, 6), (0x1f, 6), (0x5c, 7), (0xfb, 8), // 56
    (0x7ffc, 15), (0x20, 6), (0xffb, 12), (0x3fc, 10), // 60
    (0x1ffa, 13), (0x21, 6), (0x5d, 7), (0x5e, 7), // 64
    (0x5f, 7), (0x60, 7), (0x61, 7), (0x62, 7), // 68
    (0x63, 7), (0x64, 7), (0x65, 7), (0x66, 7), // 72
    (0x67, 7), (0x68, 7), (0x69, 7), (0x6a, 7), // 76
    (0x6b, 7), (0x6c, 7), (0x6d, 7), (0x6e, 7), // 80
    (0x6f, 7), (0x70, 7), (0x71, 7), (0x72, 7), // 84
    (0xfc, 8), (0x73, 7), (0xfd, 8), (0x1ffb, 13), // 88
    (0x7fff0, 19), (0x1ffc, 13), (0x3ffc, 14), (0x22, 6), // 92
    (0x7ffd, 15), (0x3, 5), (0x23, 6), (0x4, 5), // 96
    (0x24, 6), (0x5, 5), (0x25, 6), (0x26, 6), // 100
    (0x27, 6), (0x6, 5), (0x74, 7), (0x75, 7), // 104
    (0x28, 6), (0x29, 6), (0x2a, 6), (0x7, 5), // 108
    (0x2b, 6), (0x76, 7), (0x2c, 6), (0x8, 5), // 112
    (0x9, 5), (0x2d, 6), (0x77, 7), (0x78, 7), // 116
    (0x79, 7), (0x7a, 7), (0x7b, 7), (0x7ffe, 15), // 120
    (0x7fc, 11), (0x3ffd, 14), (0x1ffd, 13), (0xffffffc, 28), // 124
    (0xfffe6, 20), (0x3fffd2, 22), (0xfffe7, 20), (0xfffe8, 20), // 128
    (0x3fffd3, 22), (0x3fffd4, 22), (0x3fffd5, 22), (0x7fffd9, 23), // 132
    (0x3fffd6, 22), (0x7fffda, 23), (0x7fffdb, 23), (0x7fffdc, 23), // 136
    (0x7fffdd, 23), (0x7fffde, 23), (0xffffeb, 24), (0x7fffdf, 23), // 140
    (0xffffec, 24), (0xffffed, 24), (0x3fffd7, 22), (0x7fffe0, 23), // 144
    (0xffffee, 24), (0x7fffe1, 23), (0x7fffe2, 23), (0x7fffe3, 23), // 148
    (0x7fffe4, 23), (0x1fffdc, 21), (0x3fffd8, 22), (0x7fffe5, 23), // 152
    (0x3fffd9, 22), (0x7fffe6, 23), (0x7fffe7, 23), (0xffffef, 24), // 156
    (0x3fffda, 22), (0x1fffdd, 21), (0xfffe9, 20), (0x3fffdb, 22), // 160
    (0x3fffdc, 22), (0x7fffe8, 23), (0x7fffe9, 23), (0x1fffde, 21), // 164
    (0x7fffea, 23), (0x3fffdd, 22), (0x3fffde, 22), (0xfffff0, 24), // 168
    (0x1fffdf, 21), (0x3fffdf, 22), (0x7fffeb, 23), (0x7fffec, 23), // 172
    (0x1fffe0, 21), (0x1fffe1, 21), (0x3fffe0, 22), (0x1fffe2, 21), // 176
    (0x7fffed, 23), (0x3fffe1, 22), (0x7fffee, 23), (0x7fffef, 23), // 180
    (0xfffea, 20), (0x3fffe2, 22), (0x3fffe3, 22), (0x3fffe4, 22), // 184
    (0x7ffff0, 23), (0x3fffe5, 22), (0x3fffe6, 22), (0x7ffff1, 23), // 188
    (0x3ffffe0, 26), (0x3ffffe1, 26), (0xfffeb, 20), (0x7fff1, 19), // 192
    (0x3fffe7, 22), (0x7ffff2, 23), (0x3fffe8, 22), (0x1ffffec, 25), // 196
    (0x3ffffe2, 26), (0x3ffffe3, 26), (0x3ffffe4, 26), (0x7ffffde, 27), // 200
    (0x7ffffdf, 27), (0x3ffffe5, 26), (0xfffff1, 24), (0x1ffffed, 25), // 204
    (0x7fff2, 19), (0x1fffe3, 21), (0x3ffffe6, 26), (0x7ffffe0, 27), // 208
    (0x7ffffe1, 27), (0x3ffffe7, 26), (0x7ffffe2, 27), (0xfffff2, 24), // 212
    (0x1fffe4, 21), (0x1fffe5, 21), (0x3ffffe8, 26), (0x3ffffe9, 26), // 216
    (0xffffffd, 28), (0x7ffffe3, 27), (0x7ffffe4, 27), (0x7ffffe5, 27), // 220
    (0xfffec, 20), (0xfffff3, 24), (0xfffed, 20), (0x1fffe6, 21), // 224
    (0x3fffe9, 22), (0x1fffe7, 21), (0x1fffe8, 21), (0x7ffff3, 23), // 228
    (0x3fffea, 22), (0x3fffeb, 22), (0x1ffffee, 25), (0x1ffffef, 25), // 232
    (0xfffff4, 24), (0xfffff5, 24), (0x3ffffea, 26), (0x7ffff4, 23), // 236
    (0x3ffffeb, 26), (0x7ffffe6, 27), (0x3ffffec, 26), (0x3ffffed, 26), // 240
    (0x7ffffe7, 27), (0x7ffffe8, 27), (0x7ffffe9, 27), (0x7ffffea, 27), // 244
    (0x7ffffeb, 27), (0xffffffe, 28), (0x7ffffec, 27), (0x7ffffed, 27), // 248
    (0x7ffffee, 27), (0x7ffffef, 27), (0x7fffff0, 27), (0x3ffffee, 26), // 252
    (0x3fffffff, 30), // 256
];

#[derive(Clone, Copy)]
enum Slot {
    Invalid,
    /// Symbol completed after `bits` more bits of the current byte.
    Symbol { sym: u16, bits: u8 },
    /// Code continues in another table.
    Next(u16),
}

type DecodeTable = [Slot; 256];

fn decode_tables() -> &'static [DecodeTable] {
    static TABLES: OnceLock<Vec<DecodeTable>> = OnceLock::new();
    TABLES.get_or_init(build_decode_tables)
}

fn build_decode_tables() -> Vec<DecodeTable> {
    let mut tables = vec![[Slot::Invalid; 256]];

    for (sym, &(code, bits)) in CODES.iter().enumerate() {
        let mut table = 0usize;
        let mut remaining = bits;
        while remaining > 8 {
            remaining -= 8;
            let byte = ((code >> remaining) & 0xff) as usize;
            table = match tables[table][byte] {
                Slot::Next(next) => usize::from(next),
                slot => {
                    debug_assert!(matches!(slot, Slot::Invalid), "huffman code collision");
                    let next = tables.len();
                    tables.push([Slot::Invalid; 256]);
                    tables[table][byte] = Slot::Next(next as u16);
                    next
                }
            };
        }

        // The final 1..=8 bits fill every slot sharing them as a prefix.
        let spare = 8 - remaining;
        let first = ((code & ((1 << remaining) - 1)) << spare) as usize;
        for slot in &mut tables[table][first..first + (1 << spare)] {
            *slot = Slot::Symbol {
                sym: sym as u16,
                bits: remaining,
            };
        }
    }

    tables
}

/// Number of bytes `encode` will produce for `data`.
pub(crate) fn encoded_len(data: &[u8]) -> usize {
    let bits: usize = data
        .iter()
        .map(|&byte| usize::from(CODES[usize::from(byte)].1))
        .sum();
    bits.div_ceil(8)
}

/// Huffman-encode `data` onto `dst`.
pub(crate) fn encode<B: BufMut>(data: &[u8], dst: &mut B) {
    let mut bits: u64 = 0;
    let mut bit_count = 0u8;

    for &byte in data {
        let (code, len) = CODES[usize::from(byte)];
        bits = (bits << len) | u64::from(code);
        bit_count += len;

        while bit_count >= 8 {
            bit_count -= 8;
            dst.put_u8((bits >> bit_count) as u8);
        }
        bits &= (1 << bit_count) - 1;
    }

    if bit_count > 0 {
        let pad = 8 - bit_count;
        dst.put_u8(((bits << pad) | ((1 << pad) - 1)) as u8);
    }
}

/// The 8 bits starting at `bit_pos`, zero-filled past the end of `data`.
fn peek_byte(data: &[u8], bit_pos: usize) -> u8 {
    let idx = bit_pos / 8;
    let hi = u16::from(data[idx]);
    let lo = u16::from(data.get(idx + 1).copied().unwrap_or(0));
    (((hi << 8) | lo) << (bit_pos % 8) >> 8) as u8
}

/// Decode a Huffman-encoded string.
pub(crate) fn decode(data: &[u8]) -> Result<Vec<u8>, HpackError> {
    let tables = decode_tables();
    let total = data.len() * 8;
    let mut out = Vec::with_capacity(data.len() + data.len() / 2);
    let mut pos = 0usize;

    'symbols: while pos < total {
        let remaining = total - pos;
        if remaining < 8 {
            // Up to 7 bits of EOS prefix end the string.
            let mask = (1u8 << remaining) - 1;
            if data[data.len() - 1] & mask == mask {
                break;
            }
        }

        let mut table = 0usize;
        let mut consumed = 0usize;
        loop {
            let available = remaining - consumed;
            match tables[table][usize::from(peek_byte(data, pos + consumed))] {
                Slot::Symbol { sym, bits } => {
                    if usize::from(bits) > available || sym == EOS {
                        return Err(HpackError::IllegalHuffmanCode);
                    }
                    out.push(sym as u8);
                    pos += consumed + usize::from(bits);
                    continue 'symbols;
                }
                Slot::Next(next) => {
                    if available <= 8 {
                        return Err(HpackError::IllegalHuffmanCode);
                    }
                    consumed += 8;
                    table = usize::from(next);
                }
                Slot::Invalid => return Err(HpackError::IllegalHuffmanCode),
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn encode_vec(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        encode(data, &mut out);
        out
    }

    #[test]
    fn roundtrip_simple_strings() {
        let test_cases: &[&[u8]] = &[
            b"",
            b"a",
            b"hello",
            b"www.example.com",
            b"Mon, 21 Oct 2013 20:13:21 GMT",
            b"text/html; charset=utf-8",
        ];

        for &input in test_cases {
            let encoded = encode_vec(input);
            assert_eq!(encoded.len(), encoded_len(input));
            let decoded = decode(&encoded).unwrap();
            assert_eq!(
                input,
                decoded.as_slice(),
                "roundtrip failed for {:?}",
                std::str::from_utf8(input)
            );
        }
    }

    #[test]
    fn known_encodings() {
        assert_eq!(
            encode_vec(b"www.example.com"),
            [
                0xf1, 0xe3, 0xc2, 0xe5, 0xf2, 0x3a, 0x6b, 0xa0, 0xab, 0x90, 0xf4, 0xff,
            ]
        );
        assert_eq!(
            encode_vec(b"no-cache"),
            [0xa8, 0xeb, 0x10, 0x64, 0x9c, 0xbf]
        );
    }

    #[test]
    fn every_byte_roundtrips_alone() {
        for byte in 0..=255u8 {
            let encoded = encode_vec(&[byte]);
            assert_eq!(decode(&encoded).unwrap(), [byte], "byte {byte}");
        }
    }

    #[test]
    fn all_bytes_roundtrip() {
        let input: Vec<u8> = (0..=255).collect();
        let decoded = decode(&encode_vec(&input)).unwrap();
        assert_eq!(input, decoded);
    }

    #[test]
    fn non_eos_padding_is_rejected() {
        for byte in 0..=255u8 {
            let pad = (8 - CODES[usize::from(byte)].1 % 8) % 8;
            // A zeroed pad of five bits or more decodes as '0' (00000), so
            // only shorter pads can be told apart from a symbol.
            if !(1..=4).contains(&pad) {
                continue;
            }
            let mut encoded = encode_vec(&[byte]);
            let last = encoded.len() - 1;
            encoded[last] &= !((1u8 << pad) - 1);
            assert_eq!(
                decode(&encoded),
                Err(HpackError::IllegalHuffmanCode),
                "byte {byte} with zeroed {pad}-bit pad"
            );
        }
    }

    #[test]
    fn full_byte_of_padding_is_rejected() {
        let mut encoded = encode_vec(b"a");
        encoded.push(0xff);
        assert_eq!(decode(&encoded), Err(HpackError::IllegalHuffmanCode));
        assert_eq!(decode(&[0xff]), Err(HpackError::IllegalHuffmanCode));
    }

    #[test]
    fn eos_symbol_is_rejected() {
        assert_eq!(
            decode(&[0xff, 0xff, 0xff, 0xff]),
            Err(HpackError::IllegalHuffmanCode)
        );
    }

    proptest! {
        #[test]
        fn arbitrary_bytes_roundtrip(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let encoded = encode_vec(&data);
            prop_assert_eq!(encoded.len(), encoded_len(&data));
            prop_assert_eq!(decode(&encoded), Ok(data));
        }
    }
}
