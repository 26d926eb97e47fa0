// Forward-only positional reader over a byte source.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};

use crate::decode::DecodeError;

/// Byte source for the decoder. Sources that support random access can
/// advertise it for long forward jumps; everything else is read
/// sequentially and skipped by discarding.
pub(crate) trait Source: Read {
    /// Seeks to an absolute offset, or returns `None` if the source only
    /// supports sequential reads.
    fn seek_start(&mut self, pos: u64) -> Option<io::Result<u64>>;
}

/// A sequential-only source, e.g. a pipe or socket.
pub(crate) struct Stream<R>(pub R);

impl<R: Read> Read for Stream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R: Read> Source for Stream<R> {
    fn seek_start(&mut self, _pos: u64) -> Option<io::Result<u64>> {
        None
    }
}

/// A randomly accessible source, e.g. an open file or an in-memory buffer.
pub(crate) struct Random<R>(pub R);

impl<R: Read + Seek> Read for Random<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R: Read + Seek> Source for Random<R> {
    fn seek_start(&mut self, pos: u64) -> Option<io::Result<u64>> {
        Some(self.0.seek(SeekFrom::Start(pos)))
    }
}

/// Buffered reader that tracks the number of bytes consumed and only ever
/// moves forward. Section offsets in a cursor file are absolute, so the
/// decoder jumps between sections via [`Reader::seek_to`].
pub(crate) struct Reader<S> {
    inner: BufReader<S>,
    pos: u64,
}

impl<S: Source> Reader<S> {
    pub fn new(src: S) -> Self {
        Self {
            inner: BufReader::new(src),
            pos: 0,
        }
    }

    /// Total bytes consumed so far, i.e. the absolute offset of the next read.
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        self.inner.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let v = self.inner.read_u32::<LittleEndian>()?;
        self.pos += 4;
        Ok(v)
    }

    /// Advances the read position to `target`, an absolute offset.
    ///
    /// Small jumps are served from the buffer; jumps past the buffer issue a
    /// real seek when the source supports one and discard bytes otherwise.
    /// The target must not lie behind the current position.
    pub fn seek_to(&mut self, target: u64) -> Result<(), DecodeError> {
        if target < self.pos {
            return Err(DecodeError::InvalidSeek {
                position: self.position(),
                target,
            });
        }

        let gap = target - self.pos;
        if gap == 0 {
            return Ok(());
        }

        if gap <= self.inner.buffer().len() as u64 {
            self.inner.consume(gap as usize);
            self.pos = target;
            return Ok(());
        }

        match self.inner.get_mut().seek_start(target) {
            Some(res) => {
                res?;
                // The buffer predates the seek and no longer matches the
                // stream position.
                let stale = self.inner.buffer().len();
                self.inner.consume(stale);
                self.pos = target;
                Ok(())
            }
            None => self.discard(gap),
        }
    }

    fn discard(&mut self, n: u64) -> Result<(), DecodeError> {
        let copied = io::copy(&mut (&mut self.inner).take(n), &mut io::sink())?;
        self.pos += copied;
        if copied < n {
            return Err(DecodeError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("skipped {copied} of {n} bytes"),
            )));
        }
        Ok(())
    }
}
