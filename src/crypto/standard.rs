use log::debug;

use crate::crypto::keys::ZipCryptoKeys;
use crate::crypto::{Decryptor, region};
use crate::entry::EntryDescriptor;
use crate::error::{ZipError, ZipResult};

pub const ENCR_HEADER_LEN: usize = 12;

/// PKware traditional decryptor.
pub struct StandardDecryptor {
    keys: ZipCryptoKeys,
}

impl StandardDecryptor {
    /// Key the cipher from the entry's password and consume the 12-byte
    /// decryption header.
    ///
    /// When the entry carries a check byte the last decrypted header byte
    /// must match it. Without one a wrong password only shows up as a CRC
    /// mismatch or corrupt stream once the entry is read.
    pub fn new(entry: Option<&EntryDescriptor>, header: &[u8]) -> ZipResult<Self> {
        let entry = entry.ok_or(ZipError::MissingEntryMetadata)?;
        let password = entry
            .password()
            .filter(|p| !p.is_empty())
            .ok_or(ZipError::MissingPassword)?;
        let header: &[u8; ENCR_HEADER_LEN] = header.try_into().map_err(|_| {
            ZipError::invalid_input(format!(
                "decryption header must be {ENCR_HEADER_LEN} bytes, got {}",
                header.len()
            ))
        })?;

        let mut keys = ZipCryptoKeys::new(password)?;
        let mut last_byte = 0u8;
        for &b in header {
            last_byte = keys.decrypt_byte(b);
        }

        if let Some(expected) = entry.check_byte() {
            if expected != last_byte {
                debug!(
                    "{}: header check byte {last_byte:02x}, expected {expected:02x}",
                    entry.file_name
                );
                return Err(ZipError::InvalidPassword);
            }
        }

        Ok(Self { keys })
    }

    /// Decrypt a whole buffer in place.
    pub fn decrypt_all(&mut self, data: &mut [u8]) {
        for b in data.iter_mut() {
            *b = self.keys.decrypt_byte(*b);
        }
    }
}

impl Decryptor for StandardDecryptor {
    fn decrypt(&mut self, buf: &mut [u8], offset: usize, len: usize) -> ZipResult<usize> {
        let data = region(buf, offset, len)?;
        self.decrypt_all(data);
        Ok(len)
    }
}
