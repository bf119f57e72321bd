//! PKware ZIP traditional encryption keystream.
//! Keys initialized to [0x12345678, 0x23456789, 0x34567890] and keyed by the
//! password through the shared CRC32 table.

use crate::crc32::crc32_step;
use crate::error::{ZipError, ZipResult};

const INITIAL_KEYS: (u32, u32, u32) = (0x12345678, 0x23456789, 0x34567890);
const MULTIPLIER: u32 = 134775813;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZipCryptoKeys {
    pub k0: u32,
    pub k1: u32,
    pub k2: u32,
}

impl Default for ZipCryptoKeys {
    fn default() -> Self {
        let (k0, k1, k2) = INITIAL_KEYS;
        Self { k0, k1, k2 }
    }
}

impl ZipCryptoKeys {
    /// Keys seeded from `password`. An empty password is rejected.
    pub fn new(password: &[u8]) -> ZipResult<Self> {
        let mut keys = Self::default();
        keys.initialize(password)?;
        Ok(keys)
    }

    pub fn initialize(&mut self, password: &[u8]) -> ZipResult<()> {
        if password.is_empty() {
            return Err(ZipError::invalid_input("empty password"));
        }
        *self = Self::default();
        for &b in password {
            self.update(b);
        }
        Ok(())
    }

    /// Advance the state by one plaintext byte.
    pub fn update(&mut self, b: u8) {
        self.k0 = crc32_step(self.k0, b);
        self.k1 = self
            .k1
            .wrapping_add(self.k0 & 0xff)
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(1);
        self.k2 = crc32_step(self.k2, (self.k1 >> 24) as u8);
    }

    /// Mask for the next byte. Does not advance the state.
    pub fn next_mask_byte(&self) -> u8 {
        let temp = self.k2 | 2;
        (temp.wrapping_mul(temp ^ 1) >> 8) as u8
    }

    pub fn decrypt_byte(&mut self, cipher: u8) -> u8 {
        let plain = cipher ^ self.next_mask_byte();
        self.update(plain);
        plain
    }

    pub fn encrypt_byte(&mut self, plain: u8) -> u8 {
        let cipher = plain ^ self.next_mask_byte();
        self.update(plain);
        cipher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encrypt(password: &[u8], data: &[u8]) -> Vec<u8> {
        let mut keys = ZipCryptoKeys::new(password).unwrap();
        data.iter().map(|&b| keys.encrypt_byte(b)).collect()
    }

    #[test]
    fn test_initial_keys() {
        let keys = ZipCryptoKeys::default();
        assert_eq!(keys.k0, 305419896);
        assert_eq!(keys.k1, 591751049);
        assert_eq!(keys.k2, 878082192);
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(matches!(
            ZipCryptoKeys::new(b""),
            Err(ZipError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_key_update_deterministic() {
        let c1 = ZipCryptoKeys::new(b"password").unwrap();
        let c2 = ZipCryptoKeys::new(b"password").unwrap();
        assert_eq!(c1, c2);
    }

    #[test]
    fn test_different_passwords_different_keys() {
        let c1 = ZipCryptoKeys::new(b"abc").unwrap();
        let c2 = ZipCryptoKeys::new(b"xyz").unwrap();
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_reinitialize_resets_state() {
        let mut keys = ZipCryptoKeys::new(b"first").unwrap();
        keys.update(0x42);
        keys.initialize(b"secret").unwrap();
        assert_eq!(keys, ZipCryptoKeys::new(b"secret").unwrap());
    }

    #[test]
    fn test_mask_does_not_advance() {
        let keys = ZipCryptoKeys::new(b"secret").unwrap();
        let before = keys;
        assert_eq!(keys.next_mask_byte(), keys.next_mask_byte());
        assert_eq!(keys, before);
    }

    #[test]
    fn test_header_consumption_deterministic() {
        for b in 0..=255u8 {
            let header = [b; 12];
            let mut a = ZipCryptoKeys::new(b"secret").unwrap();
            let mut c = ZipCryptoKeys::new(b"secret").unwrap();
            for &h in &header {
                a.decrypt_byte(h);
                c.decrypt_byte(h);
            }
            assert_eq!(a, c);
        }
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        for n in [0usize, 1, 16, 4096] {
            let data: Vec<u8> = (0..n).map(|i| (i * 7 + 3) as u8).collect();
            let encrypted = encrypt(b"secret", &data);

            let mut keys = ZipCryptoKeys::new(b"secret").unwrap();
            let decrypted: Vec<u8> = encrypted.iter().map(|&b| keys.decrypt_byte(b)).collect();
            assert_eq!(decrypted, data, "length {n}");
        }
    }

    #[test]
    fn test_wrong_password_garbles() {
        let data = b"hello world";
        let encrypted = encrypt(b"secret", data);
        let mut keys = ZipCryptoKeys::new(b"Secret").unwrap();
        let decrypted: Vec<u8> = encrypted.iter().map(|&b| keys.decrypt_byte(b)).collect();
        assert_ne!(&decrypted, data);
    }
}
