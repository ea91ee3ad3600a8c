pub fn get_coils_len(nobjs: u16) -> usize {
    if nobjs > 0 {
        ((nobjs - 1) / 8 + 1) as usize
    } else {
        0
    }
}

pub fn get_registers_len(nobjs: u16) -> usize {
    nobjs as usize * 2
}

pub fn get_bit(buffer: &[u8], idx: usize) -> Option<bool> {
    if idx < buffer.len() * 8 {
        let byte_idx = idx / 8;
        let offset = idx % 8;
        Some(buffer[byte_idx] & (1 << offset) > 0)
    } else {
        None
    }
}

/// Bit `idx` of a coil payload read as little-endian 16-bit words. An odd
/// trailing byte forms a word with a zero high byte.
pub fn get_word_bit(buffer: &[u8], idx: usize) -> Option<bool> {
    let word_idx = idx / 16;
    let lo = *buffer.get(word_idx * 2)?;
    let hi = buffer.get(word_idx * 2 + 1).copied().unwrap_or(0);
    let word = u16::from_le_bytes([lo, hi]);
    Some(word & (1 << (idx % 16)) > 0)
}

pub fn pack_bits(bits: &[bool], dst: &mut [u8]) -> usize {
    let len = std::cmp::min(bits.len(), dst.len() * 8);
    for (i, bit) in bits.iter().take(len).enumerate() {
        if *bit {
            dst[i / 8] |= 1 << (i % 8);
        } else {
            dst[i / 8] &= !(1 << (i % 8));
        }
    }
    len
}
