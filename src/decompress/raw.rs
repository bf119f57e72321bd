use std::io::{self, Read};

use log::debug;

use crate::decompress::{CrcCheck, EntryStream, StreamState};
use crate::error::{ZipError, ZipResult};
use crate::part::PartReader;
use crate::source::RandomAccess;

/// Stream over an uncompressed (stored) entry, optionally decrypting.
pub struct StoredStream<R> {
    part: PartReader<R>,
    produced: u64,
    original_size: u64,
    state: StreamState,
    failure: Option<ZipError>,
    crc: Option<CrcCheck>,
}

impl<R: RandomAccess> StoredStream<R> {
    pub fn new(part: PartReader<R>, original_size: u64) -> Self {
        Self {
            part,
            produced: 0,
            original_size,
            state: StreamState::Reading,
            failure: None,
            crc: None,
        }
    }

    pub fn verify_crc(mut self, crc: u32) -> Self {
        self.crc = Some(CrcCheck::new(crc));
        self
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn bytes_produced(&self) -> u64 {
        self.produced
    }

    pub fn read(&mut self, buf: &mut [u8]) -> ZipResult<usize> {
        match self.state {
            StreamState::Closed => return Err(ZipError::invalid_input("stream is closed")),
            StreamState::Finished => return Ok(0),
            StreamState::Failed => {
                return Err(self
                    .failure
                    .as_ref()
                    .map_or(ZipError::UnexpectedEndOfStream, ZipError::duplicate));
            }
            StreamState::Reading | StreamState::Draining => {}
        }
        match self.copy_out(buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                self.failure = Some(e.duplicate());
                self.state = StreamState::Failed;
                Err(e)
            }
        }
    }

    fn copy_out(&mut self, buf: &mut [u8]) -> ZipResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.produced >= self.original_size {
            self.finish()?;
            return Ok(0);
        }

        let want = (self.original_size - self.produced).min(buf.len() as u64) as usize;
        let n = self.part.read(&mut buf[..want])?;
        if n == 0 {
            // Window shorter than the declared size.
            return Err(ZipError::UnexpectedEndOfStream);
        }
        if let Some(crc) = self.crc.as_mut() {
            crc.update(&buf[..n]);
        }
        self.produced += n as u64;
        Ok(n)
    }

    pub fn available(&self) -> usize {
        match self.state {
            StreamState::Finished | StreamState::Failed | StreamState::Closed => 0,
            _ => usize::from(self.produced < self.original_size),
        }
    }

    pub fn close(&mut self) -> ZipResult<()> {
        self.part.close();
        self.state = StreamState::Closed;
        Ok(())
    }

    pub fn into_inner(self) -> Option<R> {
        self.part.into_inner()
    }

    fn finish(&mut self) -> ZipResult<()> {
        self.part.seek_to_end()?;
        if let Some(crc) = self.crc.as_ref() {
            crc.verify()?;
        }
        self.state = StreamState::Finished;
        debug!("stored entry finished, {} bytes", self.produced);
        Ok(())
    }
}

impl<R: RandomAccess> EntryStream for StoredStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> ZipResult<usize> {
        StoredStream::read(self, buf)
    }

    fn available(&self) -> usize {
        StoredStream::available(self)
    }

    fn close(&mut self) -> ZipResult<()> {
        StoredStream::close(self)
    }
}

impl<R: RandomAccess> Read for StoredStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        StoredStream::read(self, buf).map_err(io::Error::from)
    }
}
