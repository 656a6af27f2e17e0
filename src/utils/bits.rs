//! Fixed-width bit packing.
//!
//! Element `i` of a packed array with width `w` occupies bits `[i*w, (i+1)*w)`,
//! counted LSB-first inside each byte. A packed array of `n` elements always
//! takes exactly `ceil(n*w/8)` bytes. Widths range over `0..=64`; width 0
//! stores nothing and every element reads back as 0.

/// Minimal bit width able to hold `value` (at least 1)
#[inline]
pub fn bits_needed(value: u64) -> u8 {
    (64 - value.leading_zeros()).max(1) as u8
}

/// Bytes used by `count` elements packed at `bits` each
#[inline]
pub fn packed_len(count: usize, bits: u8) -> usize {
    (count * bits as usize).div_ceil(8)
}

#[inline]
fn mask(bits: u8) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

/// Append `values` packed at `bits` each to `out`
///
/// Values wider than `bits` are truncated; callers pick `bits` from the
/// maximum value they are about to write.
pub fn pack_into<I>(values: I, bits: u8, out: &mut Vec<u8>)
where
    I: IntoIterator<Item = u64>,
{
    if bits == 0 {
        return;
    }
    let mask = mask(bits);
    let mut acc: u128 = 0;
    let mut acc_bits: u32 = 0;

    for value in values {
        debug_assert!(value <= mask, "value {value} wider than {bits} bits");
        acc |= ((value & mask) as u128) << acc_bits;
        acc_bits += bits as u32;
        while acc_bits >= 8 {
            out.push(acc as u8);
            acc >>= 8;
            acc_bits -= 8;
        }
    }

    if acc_bits > 0 {
        out.push(acc as u8);
    }
}

/// Read element `pos` of an array packed at `bits` each
///
/// `data` must hold at least `packed_len(pos + 1, bits)` bytes.
#[inline]
pub fn unpack_at(data: &[u8], bits: u8, pos: usize) -> u64 {
    if bits == 0 {
        return 0;
    }
    let bit = pos * bits as usize;
    let byte = bit / 8;
    let shift = (bit % 8) as u32;
    let covering = (shift as usize + bits as usize).div_ceil(8);

    let mut word = [0u8; 16];
    let available = covering.min(data.len().saturating_sub(byte));
    if available > 0 {
        word[..available].copy_from_slice(&data[byte..byte + available]);
    }

    ((u128::from_le_bytes(word) >> shift) as u64) & mask(bits)
}
