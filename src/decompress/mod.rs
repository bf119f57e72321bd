pub mod deflate;
pub mod raw;

use crate::error::{ZipError, ZipResult};

pub use self::deflate::InflateStream;
pub use self::raw::StoredStream;

pub const DEFAULT_BUFFER_SIZE: usize = 4096;
const SKIP_BUF_SIZE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Reading,
    /// The last inflate call filled the caller's buffer; output may be pending.
    Draining,
    Finished,
    /// A read failed; every later read reports the same error.
    Failed,
    Closed,
}

/// A finite, non-restartable stream of one entry's plaintext.
pub trait EntryStream {
    /// Read up to `buf.len()` bytes. `Ok(0)` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> ZipResult<usize>;

    /// Rough liveness hint: 0 once the stream is known to be done, 1 otherwise.
    fn available(&self) -> usize;

    /// Release the decompressor and the underlying reader.
    fn close(&mut self) -> ZipResult<()>;

    /// Read and discard up to `n` bytes, returning how many were skipped.
    fn skip(&mut self, n: i64) -> ZipResult<u64> {
        if n < 0 {
            return Err(ZipError::invalid_input(format!("negative skip length {n}")));
        }
        let limit = n as u64;
        let mut scratch = [0u8; SKIP_BUF_SIZE];
        let mut total = 0u64;
        while total < limit {
            let want = (limit - total).min(SKIP_BUF_SIZE as u64) as usize;
            let got = self.read(&mut scratch[..want])?;
            if got == 0 {
                break;
            }
            total += got as u64;
        }
        Ok(total)
    }

    /// Read the rest of the stream into `out`.
    fn read_to_end(&mut self, out: &mut Vec<u8>) -> ZipResult<usize> {
        let mut buf = [0u8; DEFAULT_BUFFER_SIZE];
        let mut total = 0;
        loop {
            let n = self.read(&mut buf)?;
            if n == 0 {
                return Ok(total);
            }
            out.extend_from_slice(&buf[..n]);
            total += n;
        }
    }
}

/// Running CRC-32 of the produced plaintext, checked when the stream ends.
pub(crate) struct CrcCheck {
    hasher: crc32fast::Hasher,
    expected: u32,
}

impl CrcCheck {
    pub(crate) fn new(expected: u32) -> Self {
        Self {
            hasher: crc32fast::Hasher::new(),
            expected,
        }
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    pub(crate) fn verify(&self) -> ZipResult<()> {
        let got = self.hasher.clone().finalize();
        if got != self.expected {
            return Err(ZipError::CrcMismatch {
                expected: self.expected,
                got,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting {
        left: u64,
        reads: usize,
    }

    impl EntryStream for Counting {
        fn read(&mut self, buf: &mut [u8]) -> ZipResult<usize> {
            self.reads += 1;
            let n = self.left.min(buf.len() as u64) as usize;
            self.left -= n as u64;
            Ok(n)
        }

        fn available(&self) -> usize {
            usize::from(self.left > 0)
        }

        fn close(&mut self) -> ZipResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_skip_zero() {
        let mut s = Counting { left: 10, reads: 0 };
        assert_eq!(s.skip(0).unwrap(), 0);
        assert_eq!(s.reads, 0);
        assert_eq!(s.left, 10);
    }

    #[test]
    fn test_skip_negative() {
        let mut s = Counting { left: 10, reads: 0 };
        assert!(matches!(s.skip(-1), Err(ZipError::InvalidInput(_))));
    }

    #[test]
    fn test_skip_past_end() {
        let mut s = Counting { left: 1000, reads: 0 };
        assert_eq!(s.skip(600).unwrap(), 600);
        assert_eq!(s.skip(600).unwrap(), 400);
        assert_eq!(s.available(), 0);
    }

    #[test]
    fn test_crc_check() {
        let mut c = CrcCheck::new(crc32fast::hash(b"hello"));
        c.update(b"hel");
        c.update(b"lo");
        c.verify().unwrap();
        c.update(b"!");
        assert!(matches!(c.verify(), Err(ZipError::CrcMismatch { .. })));
    }
}
