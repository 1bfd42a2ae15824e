//! Raw realtime frames and word unpacking.

/// Realtime data poll command, written verbatim once per cycle.
pub const RT_REQUEST: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Upper bound on a single realtime reply, in bytes.
pub const RESPONSE_MAX: usize = 256;

/// Unpack a raw reply into little-endian 16-bit words.
///
/// Bytes are consumed two at a time, least-significant byte first,
/// starting at offset 0. A trailing unpaired byte is dropped. Any input,
/// including an empty reply, is valid.
pub fn words_le(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Format a reply as space-separated hex for trace logging.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unpack_pairs_lsb_first() {
        assert_eq!(words_le(&[0xB8, 0x0B]), vec![3000]);
        assert_eq!(words_le(&[0x34, 0x12, 0xFF, 0x00]), vec![0x1234, 0x00FF]);
    }

    #[test]
    fn test_trailing_byte_dropped() {
        assert_eq!(words_le(&[0x01, 0x02, 0x03]), vec![0x0201]);
    }

    #[test]
    fn test_empty_input() {
        assert!(words_le(&[]).is_empty());
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0xB8, 0x0B, 0x00]), "B8 0B 00");
        assert_eq!(hex_dump(&[]), "");
    }

    proptest! {
        #[test]
        fn unpack_length_law(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let words = words_le(&bytes);
            prop_assert_eq!(words.len(), bytes.len() / 2);
        }

        #[test]
        fn unpack_value_law(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let words = words_le(&bytes);
            for (i, word) in words.iter().enumerate() {
                let expected = bytes[2 * i] as u16 | ((bytes[2 * i + 1] as u16) << 8);
                prop_assert_eq!(*word, expected);
            }
        }
    }
}
