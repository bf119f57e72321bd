use log::{debug, trace};

use crate::crypto::Decryptor;
use crate::error::{ZipError, ZipResult};
use crate::source::RandomAccess;

const DRAIN_BUF_SIZE: usize = 4096;

/// Reader over the ciphertext window `[start, start + len)` of one entry.
///
/// Bytes are decrypted as they are read. A decryptor with an authentication
/// code expects it right after the window; it is read and checked by
/// [`seek_to_end`](Self::seek_to_end).
pub struct PartReader<R> {
    source: Option<R>,
    decryptor: Option<Box<dyn Decryptor>>,
    start: u64,
    len: u64,
    pos: u64,
    finished: bool,
    failure: Option<ZipError>,
}

impl<R: RandomAccess> PartReader<R> {
    pub fn new(source: R, start: u64, len: u64, decryptor: Option<Box<dyn Decryptor>>) -> Self {
        Self {
            source: Some(source),
            decryptor,
            start,
            len,
            pos: 0,
            finished: false,
            failure: None,
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn remaining(&self) -> u64 {
        self.len - self.pos
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    /// Read and decrypt up to `buf.len()` bytes. `Ok(0)` once the window is
    /// exhausted; a source that ends inside the window is an error.
    pub fn read(&mut self, buf: &mut [u8]) -> ZipResult<usize> {
        let source = self
            .source
            .as_mut()
            .ok_or_else(|| ZipError::invalid_input("entry reader is closed"))?;
        let want = (self.len - self.pos).min(buf.len() as u64) as usize;
        if want == 0 {
            return Ok(0);
        }

        let offset = offset_in_window(self.start, self.pos)?;
        let n = source.read_at(offset, &mut buf[..want])?;
        if n == 0 {
            return Err(ZipError::UnexpectedEndOfStream);
        }
        if let Some(d) = self.decryptor.as_mut() {
            d.decrypt(buf, 0, n)?;
        }
        self.pos += n as u64;
        trace!("part read {n} bytes, {} left", self.len - self.pos);
        Ok(n)
    }

    /// Consume the rest of the window and check the authentication code,
    /// if the decryptor has one. A failed check is final: later calls
    /// report the same error.
    pub fn seek_to_end(&mut self) -> ZipResult<()> {
        if self.finished {
            return Ok(());
        }
        if let Some(e) = &self.failure {
            return Err(e.duplicate());
        }
        match self.check_trailer() {
            Ok(()) => {
                self.finished = true;
                Ok(())
            }
            Err(e) => {
                self.failure = Some(e.duplicate());
                Err(e)
            }
        }
    }

    fn check_trailer(&mut self) -> ZipResult<()> {
        let mac_len = self.decryptor.as_ref().map_or(0, |d| d.mac_len());

        if mac_len == 0 {
            self.pos = self.len;
        } else {
            // The MAC covers every ciphertext byte, read or not.
            let mut scratch = vec![0u8; DRAIN_BUF_SIZE];
            while self.read(&mut scratch)? > 0 {}

            let mut stored = vec![0u8; mac_len];
            let source = self
                .source
                .as_mut()
                .ok_or_else(|| ZipError::invalid_input("entry reader is closed"))?;
            let offset = offset_in_window(self.start, self.len)?;
            source.read_exact_at(offset, &mut stored)?;
            if let Some(d) = self.decryptor.as_mut() {
                d.verify_mac(&stored)?;
            }
            debug!("authentication code verified");
        }
        Ok(())
    }

    /// Release the decryptor and the source. Safe to call more than once.
    pub fn close(&mut self) {
        self.decryptor = None;
        self.source = None;
    }

    /// Hand back the source, e.g. to open the next entry.
    pub fn into_inner(mut self) -> Option<R> {
        self.source.take()
    }
}

fn offset_in_window(start: u64, pos: u64) -> ZipResult<u64> {
    start
        .checked_add(pos)
        .ok_or_else(|| ZipError::invalid_input(format!("entry offset {start}+{pos} overflows")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::crypto::{AesDecryptor, AesKeys, AesStrength};

    struct XorDecryptor(u8);

    impl Decryptor for XorDecryptor {
        fn decrypt(&mut self, buf: &mut [u8], offset: usize, len: usize) -> ZipResult<usize> {
            for b in &mut buf[offset..offset + len] {
                *b ^= self.0;
            }
            Ok(len)
        }
    }

    #[test]
    fn test_reads_only_window() {
        let src = Cursor::new(b"xxhello worldyy".to_vec());
        let mut part = PartReader::new(src, 2, 11, None);
        let mut buf = [0u8; 64];
        assert_eq!(part.read(&mut buf).unwrap(), 11);
        assert_eq!(&buf[..11], b"hello world");
        assert_eq!(part.read(&mut buf).unwrap(), 0);
        assert_eq!(part.remaining(), 0);
    }

    #[test]
    fn test_small_reads() {
        let src = Cursor::new(b"abcdef".to_vec());
        let mut part = PartReader::new(src, 1, 4, None);
        let mut buf = [0u8; 3];
        assert_eq!(part.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"bcd");
        assert_eq!(part.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'e');
    }

    #[test]
    fn test_decrypts() {
        let src = Cursor::new(vec![0x01, 0x02, 0x03]);
        let mut part = PartReader::new(src, 0, 3, Some(Box::new(XorDecryptor(0xff))));
        let mut buf = [0u8; 3];
        part.read(&mut buf).unwrap();
        assert_eq!(buf, [0xfe, 0xfd, 0xfc]);
    }

    #[test]
    fn test_short_source() {
        let src = Cursor::new(vec![0u8; 4]);
        let mut part = PartReader::new(src, 0, 10, None);
        let mut buf = [0u8; 16];
        assert_eq!(part.read(&mut buf).unwrap(), 4);
        assert!(matches!(
            part.read(&mut buf),
            Err(ZipError::UnexpectedEndOfStream)
        ));
    }

    #[test]
    fn test_seek_to_end_without_mac() {
        let src = Cursor::new(vec![0u8; 8]);
        let mut part = PartReader::new(src, 0, 8, None);
        part.seek_to_end().unwrap();
        assert_eq!(part.remaining(), 0);
        let mut buf = [0u8; 4];
        assert_eq!(part.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_seek_to_end_checks_mac() {
        let keys = AesKeys::new(AesStrength::Aes128, vec![7; 16], vec![9; 16]);

        // Ciphertext is arbitrary; the MAC is over it.
        let cipher = b"0123456789abcdef".to_vec();
        let mut mac = <hmac::Hmac<sha1::Sha1> as hmac::Mac>::new_from_slice(&[9; 16]).unwrap();
        hmac::Mac::update(&mut mac, &cipher);
        let tag = hmac::Mac::finalize(mac).into_bytes();

        let mut data = cipher.clone();
        data.extend_from_slice(&tag[..10]);
        let d = AesDecryptor::new(&keys, &[0, 0]).unwrap();
        let mut part = PartReader::new(Cursor::new(data.clone()), 0, 16, Some(Box::new(d)));
        let mut buf = [0u8; 5];
        part.read(&mut buf).unwrap();
        part.seek_to_end().unwrap();

        data[20] ^= 0x80;
        let d = AesDecryptor::new(&keys, &[0, 0]).unwrap();
        let mut part = PartReader::new(Cursor::new(data), 0, 16, Some(Box::new(d)));
        assert!(matches!(part.seek_to_end(), Err(ZipError::MacMismatch)));
        // The failure sticks instead of re-checking a spent MAC.
        assert!(matches!(part.seek_to_end(), Err(ZipError::MacMismatch)));
    }

    #[test]
    fn test_offset_overflow() {
        let mut part = PartReader::new(Cursor::new(vec![0u8; 4]), u64::MAX - 1, 4, None);
        let mut buf = [0u8; 4];
        assert!(matches!(part.read(&mut buf), Err(ZipError::InvalidInput(_))));
    }

    #[test]
    fn test_close() {
        let mut part = PartReader::new(Cursor::new(vec![1u8; 4]), 0, 4, None);
        part.close();
        part.close();
        assert!(part.is_closed());
        let mut buf = [0u8; 4];
        assert!(matches!(part.read(&mut buf), Err(ZipError::InvalidInput(_))));
    }
}
