//! 128-bit Frame Fingerprint (CityHash v1.0.2)
//!
//! Every compressed frame on the wire carries a 16-byte fingerprint computed
//! with the 128-bit variant of CityHash, pinned to revision 1.0.2: the
//! revision the server uses, which still carries the `k3` mixing constant
//! that later revisions dropped. This is a checksum, not a security
//! primitive: it exists to catch corruption between the server's compressor
//! and our decompressor.
//!
//! ## Why Bit-Exactness Matters
//!
//! The hash runs over every frame, valid or not. Any divergence from the
//! server's implementation makes *every* checksum comparison fail, not just
//! the corrupt ones, and the whole transport goes dark. The port below follows
//! the reference structure byte for byte (little-endian fetches, wrapping
//! arithmetic, the length-dependent tail rules) and keeps the reference's
//! internal shape so it can be audited against it.
//!
//! ## Wire Order
//!
//! The result is `(hi << 64) | lo`; `u128::to_le_bytes()` therefore emits the
//! low word first, matching the order the server writes the two halves.

const K0: u64 = 0xc3a5_c85c_97cb_3127;
const K1: u64 = 0xb492_b66f_be98_f273;
const K2: u64 = 0x9ae1_6a3b_2f90_404f;
const K3: u64 = 0xc949_d7c7_509e_6557;
const K_MUL: u64 = 0x9ddf_ea08_eb38_2d69;

#[inline]
fn fetch64(s: &[u8], i: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&s[i..i + 8]);
    u64::from_le_bytes(b)
}

#[inline]
fn fetch32(s: &[u8], i: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&s[i..i + 4]);
    u32::from_le_bytes(b)
}

#[inline]
fn rot(v: u64, shift: u32) -> u64 {
    v.rotate_right(shift)
}

#[inline]
fn shift_mix(v: u64) -> u64 {
    v ^ (v >> 47)
}

/// Reference `Hash128to64`: fold two 64-bit words into one.
#[inline]
fn hash_len_16(u: u64, v: u64) -> u64 {
    let mut a = (u ^ v).wrapping_mul(K_MUL);
    a ^= a >> 47;
    let mut b = (v ^ a).wrapping_mul(K_MUL);
    b ^= b >> 47;
    b.wrapping_mul(K_MUL)
}

/// Tail rule for inputs of 0..=16 bytes.
fn hash_len_0_to_16(s: &[u8]) -> u64 {
    let len = s.len();
    if len > 8 {
        let a = fetch64(s, 0);
        let b = fetch64(s, len - 8);
        hash_len_16(a, rot(b.wrapping_add(len as u64), len as u32)) ^ b
    } else if len >= 4 {
        let a = fetch32(s, 0) as u64;
        hash_len_16((len as u64).wrapping_add(a << 3), fetch32(s, len - 4) as u64)
    } else if len > 0 {
        let a = s[0] as u32;
        let b = s[len >> 1] as u32;
        let c = s[len - 1] as u32;
        let y = (a.wrapping_add(b << 8)) as u64;
        let z = ((len as u32).wrapping_add(c << 2)) as u64;
        shift_mix(y.wrapping_mul(K2) ^ z.wrapping_mul(K3)).wrapping_mul(K2)
    } else {
        K2
    }
}

/// Reference `WeakHashLen32WithSeeds` over 32 bytes at `pos`.
fn weak_hash_len_32(s: &[u8], pos: usize, seed_a: u64, seed_b: u64) -> (u64, u64) {
    let w = fetch64(s, pos);
    let x = fetch64(s, pos + 8);
    let y = fetch64(s, pos + 16);
    let z = fetch64(s, pos + 24);

    let mut a = seed_a.wrapping_add(w);
    let mut b = rot(seed_b.wrapping_add(a).wrapping_add(z), 21);
    let c = a;
    a = a.wrapping_add(x);
    a = a.wrapping_add(y);
    b = b.wrapping_add(rot(a, 44));
    (a.wrapping_add(z), b.wrapping_add(c))
}

/// Reference `CityMurmur`: the short-body (< 128 bytes) path.
fn city_murmur(s: &[u8], seed_lo: u64, seed_hi: u64) -> u128 {
    let len = s.len();
    let mut a = seed_lo;
    let mut b = seed_hi;
    let mut c: u64;
    let mut d: u64;

    if len <= 16 {
        a = shift_mix(a.wrapping_mul(K1)).wrapping_mul(K1);
        c = b.wrapping_mul(K1).wrapping_add(hash_len_0_to_16(s));
        d = shift_mix(a.wrapping_add(if len >= 8 { fetch64(s, 0) } else { c }));
    } else {
        c = hash_len_16(fetch64(s, len - 8).wrapping_add(K1), a);
        d = hash_len_16(
            b.wrapping_add(len as u64),
            c.wrapping_add(fetch64(s, len - 16)),
        );
        a = a.wrapping_add(d);

        let mut pos = 0usize;
        let mut l = len as i64 - 16;
        loop {
            a ^= shift_mix(fetch64(s, pos).wrapping_mul(K1)).wrapping_mul(K1);
            a = a.wrapping_mul(K1);
            b ^= a;
            c ^= shift_mix(fetch64(s, pos + 8).wrapping_mul(K1)).wrapping_mul(K1);
            c = c.wrapping_mul(K1);
            d ^= c;
            pos += 16;
            l -= 16;
            if l <= 0 {
                break;
            }
        }
    }

    a = hash_len_16(a, c);
    b = hash_len_16(d, b);
    let lo = a ^ b;
    let hi = hash_len_16(b, a);
    ((hi as u128) << 64) | lo as u128
}

fn city_hash_128_with_seed(s: &[u8], seed_lo: u64, seed_hi: u64) -> u128 {
    if s.len() < 128 {
        return city_murmur(s, seed_lo, seed_hi);
    }

    // 48 bytes of rolling state over 128-byte super-rounds, exactly as in
    // the reference: x/y/z plus the v and w pairs.
    let mut len = s.len();
    let mut pos = 0usize;
    let mut x = seed_lo;
    let mut y = seed_hi;
    let mut z = (len as u64).wrapping_mul(K1);
    let mut v0 = rot(y ^ K1, 49).wrapping_mul(K1).wrapping_add(fetch64(s, 0));
    let mut v1 = rot(v0, 42).wrapping_mul(K1).wrapping_add(fetch64(s, 8));
    let mut w0 = rot(y.wrapping_add(z), 35).wrapping_mul(K1).wrapping_add(x);
    let mut w1 = rot(x.wrapping_add(fetch64(s, 88)), 53).wrapping_mul(K1);

    loop {
        // Two identical 64-byte rounds per iteration, manually unrolled in
        // the reference.
        for _ in 0..2 {
            x = rot(
                x.wrapping_add(y)
                    .wrapping_add(v0)
                    .wrapping_add(fetch64(s, pos + 16)),
                37,
            )
            .wrapping_mul(K1);
            y = rot(y.wrapping_add(v1).wrapping_add(fetch64(s, pos + 48)), 42).wrapping_mul(K1);
            x ^= w1;
            y ^= v0;
            z = rot(z ^ w0, 33);
            let (a, b) = weak_hash_len_32(s, pos, v1.wrapping_mul(K1), x.wrapping_add(w0));
            v0 = a;
            v1 = b;
            let (a, b) = weak_hash_len_32(s, pos + 32, z.wrapping_add(w1), y);
            w0 = a;
            w1 = b;
            std::mem::swap(&mut z, &mut x);
            pos += 64;
        }
        len -= 128;
        if len < 128 {
            break;
        }
    }

    y = y.wrapping_add(rot(w0, 37).wrapping_mul(K0).wrapping_add(z));
    x = x.wrapping_add(rot(v0.wrapping_add(z), 49).wrapping_mul(K0));

    // Hash up to four 32-byte chunks from the end of the remaining tail.
    let mut tail_done = 0usize;
    while tail_done < len {
        tail_done += 32;
        y = rot(y.wrapping_sub(x), 42).wrapping_mul(K0).wrapping_add(v1);
        w0 = w0.wrapping_add(fetch64(s, pos + len - tail_done + 16));
        x = rot(x, 49).wrapping_mul(K0).wrapping_add(w0);
        w0 = w0.wrapping_add(v0);
        let (a, b) = weak_hash_len_32(s, pos + len - tail_done, v0, v1);
        v0 = a;
        v1 = b;
    }

    x = hash_len_16(x, v0);
    y = hash_len_16(y, w0);
    let lo = hash_len_16(x.wrapping_add(v1), w1).wrapping_add(y);
    let hi = hash_len_16(x.wrapping_add(w1), y.wrapping_add(v1));
    ((hi as u128) << 64) | lo as u128
}

/// Compute the 128-bit CityHash v1.0.2 fingerprint of `data`.
///
/// Deterministic and pure; safe to call from any number of threads.
pub fn city_hash_128(data: &[u8]) -> u128 {
    let len = data.len();
    if len >= 16 {
        city_hash_128_with_seed(&data[16..], fetch64(data, 0) ^ K3, fetch64(data, 8))
    } else if len >= 8 {
        city_hash_128_with_seed(
            &[],
            fetch64(data, 0) ^ (len as u64).wrapping_mul(K0),
            fetch64(data, len - 8) ^ K1,
        )
    } else {
        city_hash_128_with_seed(data, K0, K1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 131 + 7) as u8).collect()
    }

    #[test]
    fn test_reference_vectors() {
        // Fixed inputs with expected outputs precomputed from the v1.0.2
        // reference algorithm. These cover every dispatch path: empty,
        // < 8 bytes, 8..=15, the 16-byte seeded entry with an empty body,
        // CityMurmur short and long branches, and the 128-byte main loop
        // with one and two rounds plus the 32-byte tail.
        let cases: &[(&[u8], u128)] = &[
            (b"", 0x3cb540c392e51e293df09dfc64c09a2b),
            (b"a", 0xfd7e8ee2e4c86cf6d27139a1afe01ad0),
            (b"abc", 0x13a9176355b20d7e900ff195577748fe),
            (b"result", 0x472ed316485bd3e5aef5e9613b88ad52),
            (b"emberwire", 0x7f13b21150feb1a7b9b4391f3450c084),
            (b"0123456789abcdef", 0x7369a2fab076de4cc52ea1adb29e4800),
            (
                b"The quick brown fox jumps over the lazy dog",
                0xe4b1346bbee531a169102202d326a2fd,
            ),
        ];
        for (input, expected) in cases {
            assert_eq!(
                city_hash_128(input),
                *expected,
                "vector mismatch for {:?}",
                std::str::from_utf8(input)
            );
        }

        assert_eq!(
            city_hash_128(&patterned(100)),
            0x0965dc5abf8f6b1a68fbbfdca6d44994
        );
        assert_eq!(
            city_hash_128(&patterned(200)),
            0x2243220d9d5304713141545e08fec2d8
        );
        assert_eq!(
            city_hash_128(&patterned(300)),
            0x9a7f28ce83b402f020960ed077b5e071
        );
    }

    #[test]
    fn test_deterministic() {
        let data = b"the quick brown fox jumps over the lazy dog";
        assert_eq!(city_hash_128(data), city_hash_128(data));
    }

    #[test]
    fn test_empty_input_is_stable() {
        // The empty input exercises the `< 8 bytes` seed path with a
        // zero-length body; it must hash, not panic.
        let h = city_hash_128(b"");
        assert_eq!(h, city_hash_128(b""));
        assert_ne!(h, 0);
    }

    #[test]
    fn test_length_dispatch_boundaries() {
        // Each length class (0..8, 8..16, 16.., murmur short, long loop,
        // long loop + tail) must produce distinct, stable values.
        let payload = [0x5Au8; 512];
        let lengths = [0, 1, 3, 7, 8, 9, 15, 16, 17, 63, 127, 128, 143, 144, 200, 256, 383, 512];
        let mut seen = Vec::new();
        for &len in &lengths {
            let h = city_hash_128(&payload[..len]);
            assert!(
                !seen.contains(&h),
                "hash collision between length classes at len {}",
                len
            );
            seen.push(h);
        }
    }

    #[test]
    fn test_single_byte_avalanche() {
        // Flipping any single byte must change the fingerprint, at every
        // position of a frame-sized input.
        let base: Vec<u8> = (0..200u32).map(|i| (i * 31 % 251) as u8).collect();
        let expected = city_hash_128(&base);
        for i in 0..base.len() {
            let mut copy = base.clone();
            copy[i] ^= 0x01;
            assert_ne!(
                city_hash_128(&copy),
                expected,
                "byte {} did not perturb the hash",
                i
            );
        }
    }

    #[test]
    fn test_length_extension_changes_hash() {
        let data = [0u8; 64];
        assert_ne!(city_hash_128(&data[..63]), city_hash_128(&data[..64]));
    }

    #[test]
    fn test_halves_both_populated() {
        // Both 64-bit halves carry entropy; a port bug that zeroes one half
        // would still pass determinism tests.
        let h = city_hash_128(b"frame payload bytes");
        assert_ne!((h >> 64) as u64, 0);
        assert_ne!(h as u64, 0);
    }

    #[test]
    fn test_wire_order_low_word_first() {
        let h = city_hash_128(b"order check");
        let bytes = h.to_le_bytes();
        let lo = u64::from_le_bytes(bytes[..8].try_into().unwrap());
        let hi = u64::from_le_bytes(bytes[8..].try_into().unwrap());
        assert_eq!(h, ((hi as u128) << 64) | lo as u128);
    }
}
