//! Reflected CRC-32 lookup table (polynomial 0xEDB88320).
//! Built at compile time and shared by every keystream engine.

pub const POLYNOMIAL: u32 = 0xEDB88320;

pub static CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0u32;
    while i < 256 {
        let mut crc = i;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

/// Advance a running CRC by one byte.
#[inline]
pub fn crc32_step(crc: u32, b: u8) -> u32 {
    (crc >> 8) ^ CRC32_TABLE[((crc ^ b as u32) & 0xff) as usize]
}
