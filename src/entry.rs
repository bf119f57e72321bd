use std::fmt;

use zeroize::Zeroizing;

use crate::crypto::aes::AesKeys;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Store,   // 0
    Deflate, // 8
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(n: u16) -> Self {
        match n {
            0 => Self::Store,
            8 => Self::Deflate,
            n => Self::Unknown(n),
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store => write!(f, "Store"),
            Self::Deflate => write!(f, "Deflate"),
            Self::Unknown(n) => write!(f, "Unknown({n})"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum Encryption {
    #[default]
    None,
    /// PKware traditional encryption with a 12-byte header.
    Standard,
    /// WinZip AES with keys already derived by the caller.
    Aes(AesKeys),
}

/// Metadata for one entry, as produced by the archive header parser.
///
/// `data_pos` is the absolute offset of the entry's data region in the
/// source. For encrypted entries `compressed_size` covers the whole region:
/// the decryption header (or AES salt, verifier and MAC) included.
#[derive(Clone)]
pub struct EntryDescriptor {
    pub file_name: String,
    pub password: Option<Zeroizing<Vec<u8>>>,
    pub compression_method: CompressionMethod,
    pub encryption: Encryption,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub data_pos: u64,
    pub file_crc: Option<u32>,
    /// DOS modification time, set for entries with a trailing data descriptor.
    pub data_descriptor_time: Option<u16>,
    /// Compare the last decrypted header byte against [`check_byte`](Self::check_byte).
    pub header_check: bool,
}

impl EntryDescriptor {
    pub fn new(
        file_name: impl Into<String>,
        compression_method: CompressionMethod,
        compressed_size: u64,
        uncompressed_size: u64,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            password: None,
            compression_method,
            encryption: Encryption::None,
            compressed_size,
            uncompressed_size,
            data_pos: 0,
            file_crc: None,
            data_descriptor_time: None,
            header_check: true,
        }
    }

    /// Each character contributes its low 8 bits.
    pub fn with_password(self, password: &str) -> Self {
        let bytes = password.chars().map(|c| (c as u32 & 0xff) as u8).collect();
        self.with_password_bytes(bytes)
    }

    pub fn with_password_bytes(mut self, password: Vec<u8>) -> Self {
        self.password = Some(Zeroizing::new(password));
        self
    }

    pub fn with_encryption(mut self, encryption: Encryption) -> Self {
        self.encryption = encryption;
        self
    }

    pub fn with_data_pos(mut self, data_pos: u64) -> Self {
        self.data_pos = data_pos;
        self
    }

    pub fn with_crc(mut self, crc: u32) -> Self {
        self.file_crc = Some(crc);
        self
    }

    /// Marks the entry as written with a trailing data descriptor.
    pub fn with_data_descriptor(mut self, dos_time: u16) -> Self {
        self.data_descriptor_time = Some(dos_time);
        self
    }

    pub fn with_header_check(mut self, header_check: bool) -> Self {
        self.header_check = header_check;
        self
    }

    /// Expected last byte of the decrypted 12-byte header: the high byte of
    /// the DOS time when a data descriptor follows the data, otherwise the
    /// high byte of the CRC.
    pub fn check_byte(&self) -> Option<u8> {
        if !self.header_check {
            return None;
        }
        match self.data_descriptor_time {
            Some(time) => Some((time >> 8) as u8),
            None => self.file_crc.map(|crc| (crc >> 24) as u8),
        }
    }

    pub fn has_data_descriptor(&self) -> bool {
        self.data_descriptor_time.is_some()
    }

    pub fn is_encrypted(&self) -> bool {
        !matches!(self.encryption, Encryption::None)
    }

    pub fn is_aes(&self) -> bool {
        matches!(self.encryption, Encryption::Aes(_))
    }

    pub fn password(&self) -> Option<&[u8]> {
        self.password.as_deref().map(Vec::as_slice)
    }
}

impl fmt::Debug for EntryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryDescriptor")
            .field("file_name", &self.file_name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("compression_method", &self.compression_method)
            .field("encryption", &self.encryption)
            .field("compressed_size", &self.compressed_size)
            .field("uncompressed_size", &self.uncompressed_size)
            .field("data_pos", &self.data_pos)
            .field("file_crc", &self.file_crc)
            .field("data_descriptor_time", &self.data_descriptor_time)
            .field("header_check", &self.header_check)
            .finish()
    }
}
