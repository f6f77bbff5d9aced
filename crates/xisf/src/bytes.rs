use std::ops::{Index, IndexMut};
use std::sync::Arc;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

// Transport decoding must tolerate whitespace and absent padding, so the
// engine is built indifferent to padding and the input is pre-filtered to
// alphabet bytes.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Byte container with value semantics and cheap cloning.
///
/// The payload is reference-shared between clones; any mutating access
/// copies it first when aliased, so independent copies never observe each
/// other's writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Arc<Vec<u8>>,
}

impl ByteBuffer {
    /// Zero-filled buffer of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: Arc::new(vec![0; size]),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            data: Arc::new(bytes.to_vec()),
        }
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            data: Arc::new(bytes),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_slice()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.data.as_slice().to_vec()
    }

    pub fn resize(&mut self, new_len: usize) {
        Arc::make_mut(&mut self.data).resize(new_len, 0);
    }

    pub fn push(&mut self, byte: u8) {
        Arc::make_mut(&mut self.data).push(byte);
    }

    /// Replace the payload with its base-64 text form, `=`-padded to a
    /// multiple of four.
    pub fn encode_base64(&mut self) {
        if self.is_empty() {
            return;
        }
        let encoded = BASE64.encode(self.as_slice());
        self.data = Arc::new(encoded.into_bytes());
    }

    /// Replace a base-64 text payload with the decoded bytes. Non-alphabet
    /// bytes (whitespace, padding) are ignored; partial tail groups of two
    /// or three characters yield one or two bytes.
    pub fn decode_base64(&mut self) {
        if self.is_empty() {
            return;
        }
        let mut filtered: Vec<u8> = self
            .as_slice()
            .iter()
            .copied()
            .filter(|b| is_base64_byte(*b))
            .collect();
        // a lone trailing character carries fewer than eight bits
        if filtered.len() % 4 == 1 {
            filtered.pop();
        }
        let decoded = BASE64.decode(&filtered).unwrap_or_default();
        self.data = Arc::new(decoded);
    }

    /// Replace the payload with its lowercase hexadecimal text form.
    pub fn encode_base16(&mut self) {
        if self.is_empty() {
            return;
        }
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let src = self.as_slice();
        let mut out = Vec::with_capacity(src.len() * 2);
        for &b in src {
            out.push(HEX[(b >> 4) as usize]);
            out.push(HEX[(b & 0x0f) as usize]);
        }
        self.data = Arc::new(out);
    }

    /// Replace a hexadecimal text payload with the decoded bytes.
    /// Case-insensitive; an odd trailing nibble is truncated.
    pub fn decode_base16(&mut self) {
        if self.is_empty() {
            return;
        }
        let src = self.as_slice();
        let mut out = Vec::with_capacity(src.len() / 2);
        for pair in src.chunks_exact(2) {
            out.push((nibble(pair[0]) << 4) | nibble(pair[1]));
        }
        self.data = Arc::new(out);
    }
}

impl Index<usize> for ByteBuffer {
    type Output = u8;

    fn index(&self, i: usize) -> &u8 {
        &self.data[i]
    }
}

impl IndexMut<usize> for ByteBuffer {
    fn index_mut(&mut self, i: usize) -> &mut u8 {
        &mut Arc::make_mut(&mut self.data)[i]
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self::from_slice(bytes)
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_vec(bytes)
    }
}

impl From<&str> for ByteBuffer {
    fn from(s: &str) -> Self {
        Self::from_slice(s.as_bytes())
    }
}

#[inline]
fn is_base64_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/'
}

#[inline]
fn nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pseudo_random(len: usize, mut seed: u64) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            out.push((seed >> 33) as u8);
        }
        out
    }

    #[test]
    fn base64_round_trip() {
        for len in [0usize, 1, 2, 3, 4, 5, 63, 64, 65, 1000] {
            let raw = pseudo_random(len, len as u64 + 1);
            let mut buf = ByteBuffer::from_slice(&raw);
            buf.encode_base64();
            assert_eq!(buf.len() % 4, 0, "encoded length must be a multiple of 4");
            buf.decode_base64();
            assert_eq!(buf.as_slice(), raw.as_slice(), "len {len}");
        }
    }

    #[test]
    fn base64_encode_pads() {
        let mut buf = ByteBuffer::from_slice(b"M");
        buf.encode_base64();
        assert_eq!(buf.as_slice(), b"TQ==");
    }

    #[test]
    fn base64_decode_ignores_whitespace_and_padding() {
        let mut buf = ByteBuffer::from_slice(b"SGVs\n bG8g\tWElT\r\nRg==");
        buf.decode_base64();
        assert_eq!(buf.as_slice(), b"Hello XISF");

        let mut unpadded = ByteBuffer::from_slice(b"SGVsbG8gWElTRg");
        unpadded.decode_base64();
        assert_eq!(unpadded.as_slice(), b"Hello XISF");
    }

    #[test]
    fn base64_partial_tail_groups() {
        // two chars -> one byte, three chars -> two bytes
        let mut two = ByteBuffer::from_slice(b"TQ");
        two.decode_base64();
        assert_eq!(two.as_slice(), b"M");

        let mut three = ByteBuffer::from_slice(b"TWE");
        three.decode_base64();
        assert_eq!(three.as_slice(), b"Ma");
    }

    #[test]
    fn base16_round_trip() {
        let raw = pseudo_random(257, 7);
        let mut buf = ByteBuffer::from_slice(&raw);
        buf.encode_base16();
        assert_eq!(buf.len(), raw.len() * 2);
        buf.decode_base16();
        assert_eq!(buf.as_slice(), raw.as_slice());
    }

    #[test]
    fn base16_is_case_insensitive_and_truncates_odd_nibble() {
        let mut upper = ByteBuffer::from_slice(b"DEADBEEF");
        upper.decode_base16();
        assert_eq!(upper.as_slice(), &[0xde, 0xad, 0xbe, 0xef]);

        let mut odd = ByteBuffer::from_slice(b"0ff");
        odd.decode_base16();
        assert_eq!(odd.as_slice(), &[0x0f]);
    }

    #[test]
    fn clones_do_not_alias_after_write() {
        let mut a = ByteBuffer::from_slice(&[1, 2, 3]);
        let b = a.clone();
        a[0] = 9;
        a.push(4);
        assert_eq!(a.as_slice(), &[9, 2, 3, 4]);
        assert_eq!(b.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn empty_transforms_stay_empty() {
        let mut buf = ByteBuffer::default();
        buf.encode_base64();
        buf.decode_base64();
        buf.encode_base16();
        buf.decode_base16();
        assert!(buf.is_empty());
    }
}
