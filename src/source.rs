use std::io::{self, Read, Seek, SeekFrom};

/// Random-access byte source an entry is read from.
///
/// Every positioned read seeks first, so several entry streams can share
/// one file as long as the caller serialises their calls.
pub trait RandomAccess: Read + Seek {
    /// Read into `buf` starting at absolute `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.seek(SeekFrom::Start(offset))?;
        let mut total = 0;
        while total < buf.len() {
            match self.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }

    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)
    }

    /// Total length in bytes. The current position is preserved.
    fn byte_len(&mut self) -> io::Result<u64> {
        let cur = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        if cur != end {
            self.seek(SeekFrom::Start(cur))?;
        }
        Ok(end)
    }
}

impl<T: Read + Seek> RandomAccess for T {}
