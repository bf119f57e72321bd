//! Entry decryptors.

pub mod aes;
pub mod keys;
pub mod standard;

use crate::error::{ZipError, ZipResult};

pub use self::aes::{AesDecryptor, AesKeys, AesStrength};
pub use self::keys::ZipCryptoKeys;
pub use self::standard::{ENCR_HEADER_LEN, StandardDecryptor};

/// In-place, byte-wise decryption of an entry's data region.
pub trait Decryptor: Send {
    /// Decrypt `buf[offset..offset + len]` in place and return `len`.
    fn decrypt(&mut self, buf: &mut [u8], offset: usize, len: usize) -> ZipResult<usize>;

    /// Length of the authentication code stored after the data.
    fn mac_len(&self) -> usize {
        0
    }

    /// Check the stored authentication code once all data was decrypted.
    fn verify_mac(&mut self, _stored: &[u8]) -> ZipResult<()> {
        Ok(())
    }
}

/// Resolve `offset`/`len` into a mutable region of `buf`.
pub(crate) fn region(buf: &mut [u8], offset: usize, len: usize) -> ZipResult<&mut [u8]> {
    let end = offset
        .checked_add(len)
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| {
            ZipError::invalid_input(format!(
                "region {offset}+{len} outside buffer of {}",
                buf.len()
            ))
        })?;
    Ok(&mut buf[offset..end])
}
