/// 360 sixteen-bit words per reduction block.
const BLOCK_BYTES: usize = 720;
const MODULUS: u64 = 65_535;

/// Fletcher-32 over little-endian 16-bit words. An odd trailing byte is
/// treated as a word with a zero high byte, so the result depends only on the
/// byte contents and never on host endianness.
pub fn fletcher32(data: &[u8]) -> u32 {
    let mut c0: u64 = 0;
    let mut c1: u64 = 0;

    for block in data.chunks(BLOCK_BYTES) {
        for word in block.chunks(2) {
            let lo = word[0] as u64;
            let hi = word.get(1).copied().unwrap_or(0) as u64;
            c0 += lo | (hi << 8);
            c1 += c0;
        }
        c0 %= MODULUS;
        c1 %= MODULUS;
    }

    ((c1 as u32) << 16) | c0 as u32
}
