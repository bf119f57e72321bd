//! WinZip AES (AE-1/AE-2) entry decryption.
//!
//! Keys are derived by the caller (PBKDF2-HMAC-SHA1 over the password and
//! the entry salt); this module only runs AES-CTR over the entry data and
//! checks the trailing HMAC-SHA1 authentication code.

use std::fmt;

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256, Block};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use zeroize::Zeroizing;

use crate::crypto::{Decryptor, region};
use crate::error::{ZipError, ZipResult};

type HmacSha1 = Hmac<Sha1>;

pub const AES_VERIFIER_LEN: usize = 2;
pub const AES_MAC_LEN: usize = 10;
const BLOCK_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AesStrength {
    Aes128, // 1
    Aes192, // 2
    Aes256, // 3
}

impl AesStrength {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Aes128),
            2 => Some(Self::Aes192),
            3 => Some(Self::Aes256),
            _ => None,
        }
    }

    pub fn key_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }

    pub fn salt_len(self) -> usize {
        self.key_len() / 2
    }
}

/// Key material for one AES entry.
#[derive(Clone)]
pub struct AesKeys {
    pub strength: AesStrength,
    pub encryption_key: Zeroizing<Vec<u8>>,
    pub mac_key: Zeroizing<Vec<u8>>,
    /// Derived 2-byte password verifier, checked against the stored one.
    pub password_verifier: Option<[u8; AES_VERIFIER_LEN]>,
}

impl AesKeys {
    pub fn new(strength: AesStrength, encryption_key: Vec<u8>, mac_key: Vec<u8>) -> Self {
        Self {
            strength,
            encryption_key: Zeroizing::new(encryption_key),
            mac_key: Zeroizing::new(mac_key),
            password_verifier: None,
        }
    }

    pub fn with_verifier(mut self, verifier: [u8; AES_VERIFIER_LEN]) -> Self {
        self.password_verifier = Some(verifier);
        self
    }

    /// Bytes in front of the encrypted data: salt plus stored verifier.
    pub fn prefix_len(&self) -> usize {
        self.strength.salt_len() + AES_VERIFIER_LEN
    }
}

impl fmt::Debug for AesKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesKeys")
            .field("strength", &self.strength)
            .finish_non_exhaustive()
    }
}

enum AesCipher {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl AesCipher {
    fn new(strength: AesStrength, key: &[u8]) -> ZipResult<Self> {
        let wrap = |e: aes::cipher::InvalidLength| ZipError::DecryptionFailure(e.to_string());
        Ok(match strength {
            AesStrength::Aes128 => Self::Aes128(Aes128::new_from_slice(key).map_err(wrap)?),
            AesStrength::Aes192 => Self::Aes192(Aes192::new_from_slice(key).map_err(wrap)?),
            AesStrength::Aes256 => Self::Aes256(Aes256::new_from_slice(key).map_err(wrap)?),
        })
    }

    fn encrypt_block(&self, block: &mut Block) {
        match self {
            Self::Aes128(c) => c.encrypt_block(block),
            Self::Aes192(c) => c.encrypt_block(block),
            Self::Aes256(c) => c.encrypt_block(block),
        }
    }
}

pub struct AesDecryptor {
    cipher: AesCipher,
    mac: Option<HmacSha1>,
    counter: [u8; BLOCK_LEN],
    keystream: [u8; BLOCK_LEN],
    keystream_pos: usize,
}

impl AesDecryptor {
    /// `stored_verifier` is the 2-byte verifier read from the entry data.
    pub fn new(keys: &AesKeys, stored_verifier: &[u8]) -> ZipResult<Self> {
        let key_len = keys.strength.key_len();
        if keys.encryption_key.len() != key_len || keys.mac_key.len() != key_len {
            return Err(ZipError::invalid_input(format!(
                "{:?} needs {key_len}-byte keys",
                keys.strength
            )));
        }
        if let Some(expected) = keys.password_verifier {
            if stored_verifier != expected {
                return Err(ZipError::InvalidPassword);
            }
        }

        let cipher = AesCipher::new(keys.strength, &keys.encryption_key)?;
        let mac = <HmacSha1 as Mac>::new_from_slice(&keys.mac_key)
            .map_err(|e| ZipError::DecryptionFailure(e.to_string()))?;

        let mut counter = [0u8; BLOCK_LEN];
        counter[0] = 1;
        Ok(Self {
            cipher,
            mac: Some(mac),
            counter,
            keystream: [0u8; BLOCK_LEN],
            keystream_pos: BLOCK_LEN,
        })
    }

    fn apply_keystream(&mut self, data: &mut [u8]) {
        for b in data.iter_mut() {
            if self.keystream_pos == BLOCK_LEN {
                self.next_block();
            }
            *b ^= self.keystream[self.keystream_pos];
            self.keystream_pos += 1;
        }
    }

    fn next_block(&mut self) {
        let mut block = Block::from(self.counter);
        self.cipher.encrypt_block(&mut block);
        self.keystream.copy_from_slice(&block);
        self.keystream_pos = 0;
        // Little-endian counter.
        for byte in &mut self.counter {
            *byte = byte.wrapping_add(1);
            if *byte != 0 {
                break;
            }
        }
    }
}

impl Decryptor for AesDecryptor {
    fn decrypt(&mut self, buf: &mut [u8], offset: usize, len: usize) -> ZipResult<usize> {
        let data = region(buf, offset, len)?;
        let mac = self
            .mac
            .as_mut()
            .ok_or_else(|| ZipError::DecryptionFailure("decrypt after MAC check".into()))?;
        mac.update(data);
        self.apply_keystream(data);
        Ok(len)
    }

    fn mac_len(&self) -> usize {
        AES_MAC_LEN
    }

    fn verify_mac(&mut self, stored: &[u8]) -> ZipResult<()> {
        let mac = self
            .mac
            .take()
            .ok_or_else(|| ZipError::DecryptionFailure("MAC already checked".into()))?;
        if stored.len() != AES_MAC_LEN {
            return Err(ZipError::DecryptionFailure(format!(
                "stored MAC is {} bytes",
                stored.len()
            )));
        }
        mac.verify_truncated_left(stored)
            .map_err(|_| ZipError::MacMismatch)
    }
}
