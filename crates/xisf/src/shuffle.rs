//! Byte shuffling rearranges interleaved multi-byte samples into planes of
//! same-significance bytes, which compress better. The trailing
//! `len % item_size` bytes are copied verbatim after the shuffled region.

/// Forward transform. `item_size <= 1` copies the input unchanged.
pub fn shuffle(input: &[u8], item_size: usize) -> Vec<u8> {
    let mut out = vec![0u8; input.len()];
    shuffle_into(&mut out, input, item_size);
    out
}

/// Inverse transform: `unshuffle(shuffle(x, s), s) == x`.
pub fn unshuffle(input: &[u8], item_size: usize) -> Vec<u8> {
    let mut out = vec![0u8; input.len()];
    unshuffle_into(&mut out, input, item_size);
    out
}

pub(crate) fn shuffle_into(dst: &mut [u8], src: &[u8], item_size: usize) {
    debug_assert_eq!(dst.len(), src.len());
    if item_size <= 1 {
        dst.copy_from_slice(src);
        return;
    }
    let count = src.len() / item_size;
    for b in 0..item_size {
        let out_base = b * count;
        let mut in_i = b;
        for e in 0..count {
            dst[out_base + e] = src[in_i];
            in_i += item_size;
        }
    }
    let tail = count * item_size;
    dst[tail..].copy_from_slice(&src[tail..]);
}

pub(crate) fn unshuffle_into(dst: &mut [u8], src: &[u8], item_size: usize) {
    debug_assert_eq!(dst.len(), src.len());
    if item_size <= 1 {
        dst.copy_from_slice(src);
        return;
    }
    let count = src.len() / item_size;
    for b in 0..item_size {
        let in_base = b * count;
        let mut out_i = b;
        for e in 0..count {
            dst[out_i] = src[in_base + e];
            out_i += item_size;
        }
    }
    let tail = count * item_size;
    dst[tail..].copy_from_slice(&src[tail..]);
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
    fn known_layout() {
        // two-byte items [a0 a1 b0 b1 c0 c1] -> [a0 b0 c0 a1 b1 c1]
        let input = [0x10, 0x11, 0x20, 0x21, 0x30, 0x31];
        assert_eq!(shuffle(&input, 2), vec![0x10, 0x20, 0x30, 0x11, 0x21, 0x31]);
    }

    #[test]
    fn tail_bytes_are_verbatim() {
        let input = [1, 2, 3, 4, 5, 6, 7];
        let out = shuffle(&input, 4);
        assert_eq!(&out[4..], &[5, 6, 7]);
        assert_eq!(unshuffle(&out, 4), input);
    }

    #[test]
    fn round_trip_all_item_sizes() {
        for item_size in 1..=16usize {
            for len in [0usize, 1, 15, 16, 17, 255, 1024] {
                let input = pseudo_random(len, (item_size * 1000 + len) as u64);
                let forward = shuffle(&input, item_size);
                assert_eq!(
                    unshuffle(&forward, item_size),
                    input,
                    "item_size {item_size} len {len}"
                );
            }
        }
    }

    #[test]
    fn item_size_one_is_identity() {
        let input = pseudo_random(64, 3);
        assert_eq!(shuffle(&input, 1), input);
        assert_eq!(shuffle(&input, 0), input);
    }
}
