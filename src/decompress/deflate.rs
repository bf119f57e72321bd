use std::io::{self, Read};

use flate2::{Decompress, FlushDecompress, Status};
use log::{debug, trace, warn};

use crate::decompress::{CrcCheck, DEFAULT_BUFFER_SIZE, EntryStream, StreamState};
use crate::error::{ZipError, ZipResult};
use crate::part::PartReader;
use crate::source::RandomAccess;

/// Raw DEFLATE stream (no zlib/gzip header) over an entry's data.
pub struct InflateStream<R> {
    part: PartReader<R>,
    decompressor: Option<Decompress>,
    in_buf: Vec<u8>,
    in_pos: usize,
    in_end: usize,
    produced: u64,
    original_size: u64,
    stream_end: bool,
    state: StreamState,
    failure: Option<ZipError>,
    crc: Option<CrcCheck>,
    inflate_calls: u64,
}

impl<R: RandomAccess> InflateStream<R> {
    pub fn new(part: PartReader<R>, original_size: u64) -> Self {
        Self::with_buffer_size(part, original_size, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(part: PartReader<R>, original_size: u64, buffer_size: usize) -> Self {
        Self {
            part,
            decompressor: Some(Decompress::new(false)),
            in_buf: vec![0u8; buffer_size.max(1)],
            in_pos: 0,
            in_end: 0,
            produced: 0,
            original_size,
            stream_end: false,
            state: StreamState::Reading,
            failure: None,
            crc: None,
            inflate_calls: 0,
        }
    }

    /// Check the plaintext against `crc` once the stream ends.
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

    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    /// Compressed bytes handed to the decompressor so far.
    pub fn total_in(&self) -> u64 {
        self.decompressor.as_ref().map_or(0, Decompress::total_in)
    }

    pub fn total_out(&self) -> u64 {
        self.decompressor.as_ref().map_or(0, Decompress::total_out)
    }

    /// Number of times the decompressor has been run.
    pub fn inflate_calls(&self) -> u64 {
        self.inflate_calls
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
        match self.inflate(buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                self.failure = Some(e.duplicate());
                self.state = StreamState::Failed;
                Err(e)
            }
        }
    }

    fn inflate(&mut self, buf: &mut [u8]) -> ZipResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.produced >= self.original_size {
            self.finish()?;
            return Ok(0);
        }

        // Never inflate past the declared size.
        let want = (self.original_size - self.produced).min(buf.len() as u64) as usize;
        let out = &mut buf[..want];

        loop {
            let decompressor = self
                .decompressor
                .as_mut()
                .ok_or_else(|| ZipError::invalid_input("stream is closed"))?;
            let before_in = decompressor.total_in();
            let before_out = decompressor.total_out();
            self.inflate_calls += 1;

            let status = decompressor
                .decompress(
                    &self.in_buf[self.in_pos..self.in_end],
                    out,
                    FlushDecompress::None,
                )
                .map_err(|e| ZipError::CorruptData(e.to_string()))?;

            let consumed = (decompressor.total_in() - before_in) as usize;
            let produced = (decompressor.total_out() - before_out) as usize;
            self.in_pos += consumed;

            if status == Status::StreamEnd {
                self.stream_end = true;
            }

            if produced > 0 {
                if let Some(crc) = self.crc.as_mut() {
                    crc.update(&out[..produced]);
                }
                self.produced += produced as u64;
                self.state = if produced == want {
                    StreamState::Draining
                } else {
                    StreamState::Reading
                };
                return Ok(produced);
            }

            if self.stream_end {
                if self.produced < self.original_size {
                    warn!(
                        "deflate stream ended after {} of {} bytes",
                        self.produced, self.original_size
                    );
                }
                self.finish()?;
                return Ok(0);
            }

            if self.in_pos == self.in_end {
                self.fill()?;
            } else if consumed == 0 {
                return Err(ZipError::CorruptData("inflate made no progress".into()));
            }
        }
    }

    pub fn available(&self) -> usize {
        match self.state {
            StreamState::Finished | StreamState::Failed | StreamState::Closed => 0,
            _ if self.stream_end => 0,
            _ => 1,
        }
    }

    /// Drop the decompressor, then release the entry reader.
    pub fn close(&mut self) -> ZipResult<()> {
        if self.state == StreamState::Closed {
            return Ok(());
        }
        self.decompressor = None;
        self.part.close();
        self.state = StreamState::Closed;
        Ok(())
    }

    pub fn into_inner(mut self) -> Option<R> {
        self.decompressor = None;
        self.part.into_inner()
    }

    fn fill(&mut self) -> ZipResult<()> {
        let n = self.part.read(&mut self.in_buf)?;
        if n == 0 {
            return Err(ZipError::UnexpectedEndOfStream);
        }
        trace!("inflate fill {n} bytes");
        self.in_pos = 0;
        self.in_end = n;
        Ok(())
    }

    fn finish(&mut self) -> ZipResult<()> {
        self.part.seek_to_end()?;
        if let Some(crc) = self.crc.as_ref() {
            crc.verify()?;
        }
        self.state = StreamState::Finished;
        debug!("inflate finished, {} bytes", self.produced);
        Ok(())
    }
}

impl<R: RandomAccess> EntryStream for InflateStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> ZipResult<usize> {
        InflateStream::read(self, buf)
    }

    fn available(&self) -> usize {
        InflateStream::available(self)
    }

    fn close(&mut self) -> ZipResult<()> {
        InflateStream::close(self)
    }
}

impl<R: RandomAccess> Read for InflateStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        InflateStream::read(self, buf).map_err(io::Error::from)
    }
}
