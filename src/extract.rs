use std::io::{self, Read, Write};

use log::debug;

use crate::crypto::aes::AES_MAC_LEN;
use crate::crypto::{AesDecryptor, Decryptor, ENCR_HEADER_LEN, StandardDecryptor};
use crate::decompress::{DEFAULT_BUFFER_SIZE, EntryStream, InflateStream, StoredStream};
use crate::entry::{CompressionMethod, Encryption, EntryDescriptor};
use crate::error::{ZipError, ZipResult};
use crate::part::PartReader;
use crate::source::RandomAccess;

/// Per-session stream settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Size of the compressed-input refill buffer.
    pub buffer_size: usize,
    /// Check the entry CRC, when known, at end of stream.
    pub verify_crc: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            verify_crc: true,
        }
    }
}

impl StreamOptions {
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn with_verify_crc(mut self, verify_crc: bool) -> Self {
        self.verify_crc = verify_crc;
        self
    }
}

/// Plaintext stream for one entry, as returned by [`open_entry`].
pub enum EntryReader<R> {
    Stored(StoredStream<R>),
    Inflate(InflateStream<R>),
}

impl<R: RandomAccess> EntryReader<R> {
    pub fn into_inner(self) -> Option<R> {
        match self {
            Self::Stored(s) => s.into_inner(),
            Self::Inflate(s) => s.into_inner(),
        }
    }
}

impl<R: RandomAccess> EntryStream for EntryReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> ZipResult<usize> {
        match self {
            Self::Stored(s) => s.read(buf),
            Self::Inflate(s) => s.read(buf),
        }
    }

    fn available(&self) -> usize {
        match self {
            Self::Stored(s) => s.available(),
            Self::Inflate(s) => s.available(),
        }
    }

    fn close(&mut self) -> ZipResult<()> {
        match self {
            Self::Stored(s) => s.close(),
            Self::Inflate(s) => s.close(),
        }
    }
}

impl<R: RandomAccess> Read for EntryReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        EntryStream::read(self, buf).map_err(io::Error::from)
    }
}

/// Look up an entry by name.
pub fn find_entry<'a>(
    entries: &'a [EntryDescriptor],
    name: &str,
) -> ZipResult<&'a EntryDescriptor> {
    entries
        .iter()
        .find(|e| e.file_name == name)
        .ok_or(ZipError::MissingEntryMetadata)
}

/// Build the decryptor for an encrypted entry, reading the decryption
/// header (or AES verifier) from the start of its data region.
pub fn decryptor_for<R: RandomAccess>(
    source: &mut R,
    entry: &EntryDescriptor,
) -> ZipResult<Option<Box<dyn Decryptor>>> {
    match &entry.encryption {
        Encryption::None => Ok(None),
        Encryption::Standard => {
            if entry.compressed_size < ENCR_HEADER_LEN as u64 {
                return Err(ZipError::CorruptData(format!(
                    "{}: encrypted entry shorter than its header",
                    entry.file_name
                )));
            }
            let mut header = [0u8; ENCR_HEADER_LEN];
            source.read_exact_at(entry.data_pos, &mut header)?;
            let d = StandardDecryptor::new(Some(entry), &header)?;
            Ok(Some(Box::new(d)))
        }
        Encryption::Aes(keys) => {
            if entry.compressed_size < (keys.prefix_len() + AES_MAC_LEN) as u64 {
                return Err(ZipError::CorruptData(format!(
                    "{}: AES entry shorter than salt and MAC",
                    entry.file_name
                )));
            }
            let mut verifier = [0u8; 2];
            let at = offset(entry, keys.strength.salt_len() as u64)?;
            source.read_exact_at(at, &mut verifier)?;
            let d = AesDecryptor::new(keys, &verifier)?;
            Ok(Some(Box::new(d)))
        }
    }
}

fn offset(entry: &EntryDescriptor, delta: u64) -> ZipResult<u64> {
    entry.data_pos.checked_add(delta).ok_or_else(|| {
        ZipError::invalid_input(format!(
            "{}: data offset {} overflows",
            entry.file_name, entry.data_pos
        ))
    })
}

/// Offset and length of the encrypted/compressed payload, without any
/// encryption header or trailing MAC.
fn data_window(entry: &EntryDescriptor) -> ZipResult<(u64, u64)> {
    let (prefix, suffix) = match &entry.encryption {
        Encryption::None => (0, 0),
        Encryption::Standard => (ENCR_HEADER_LEN as u64, 0),
        Encryption::Aes(keys) => (keys.prefix_len() as u64, AES_MAC_LEN as u64),
    };
    let len = entry.compressed_size.saturating_sub(prefix + suffix);
    Ok((offset(entry, prefix)?, len))
}

/// Open a plaintext stream over one entry of `source`.
pub fn open_entry<R: RandomAccess>(
    mut source: R,
    entry: &EntryDescriptor,
    options: &StreamOptions,
) -> ZipResult<EntryReader<R>> {
    if let CompressionMethod::Unknown(n) = entry.compression_method {
        return Err(ZipError::UnsupportedCompression(n));
    }

    let decryptor = decryptor_for(&mut source, entry)?;
    let (start, len) = data_window(entry)?;
    debug!(
        "open {} ({}, {len} bytes at {start}, {} bytes out)",
        entry.file_name, entry.compression_method, entry.uncompressed_size
    );
    let part = PartReader::new(source, start, len, decryptor);
    let crc = entry.file_crc.filter(|_| options.verify_crc);

    let reader = match entry.compression_method {
        CompressionMethod::Deflate => {
            let s =
                InflateStream::with_buffer_size(part, entry.uncompressed_size, options.buffer_size);
            EntryReader::Inflate(match crc {
                Some(crc) => s.verify_crc(crc),
                None => s,
            })
        }
        CompressionMethod::Store => {
            let s = StoredStream::new(part, entry.uncompressed_size);
            EntryReader::Stored(match crc {
                Some(crc) => s.verify_crc(crc),
                None => s,
            })
        }
        CompressionMethod::Unknown(n) => return Err(ZipError::UnsupportedCompression(n)),
    };
    Ok(reader)
}

/// Write the whole entry to `writer`. Returns the number of bytes written.
pub fn extract_to<R: RandomAccess, W: Write>(
    source: R,
    entry: &EntryDescriptor,
    options: &StreamOptions,
    writer: &mut W,
) -> ZipResult<u64> {
    let mut reader = open_entry(source, entry, options)?;
    let mut buf = vec![0u8; options.buffer_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = EntryStream::read(&mut reader, &mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    reader.close()?;
    Ok(total)
}
