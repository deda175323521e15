use std::io::{self, BufRead, Read, Seek, SeekFrom};

use flate2::bufread::DeflateDecoder;
use git_object::stream::{forward_seek_target, skip_bytes};

use crate::LooseError;

/// Does `header` start a zlib stream git can have written?
///
/// The compression method byte must be `0x78` (deflate, 32K window) and the
/// flag byte one of the four FLEVEL values without a preset dictionary.
pub fn is_zlib_header(header: [u8; 2]) -> bool {
    header[0] == 0x78 && matches!(header[1], 0x01 | 0x5e | 0x9c | 0xda)
}

/// Lazily inflating reader over a zlib stream.
///
/// The two header bytes are checked up front; the deflate body is inflated
/// only as bytes are read. Seeking is forward-only.
pub struct ZlibStream<R> {
    decoder: DeflateDecoder<R>,
    position: u64,
}

impl<R: BufRead> ZlibStream<R> {
    /// Validate the zlib header at the front of `source` and start inflating.
    pub fn new(mut source: R) -> Result<Self, LooseError> {
        let mut header = [0u8; 2];
        source.read_exact(&mut header)?;
        if !is_zlib_header(header) {
            return Err(LooseError::InvalidZlibHeader(header));
        }
        Ok(Self {
            decoder: DeflateDecoder::new(source),
            position: 0,
        })
    }

    /// Number of inflated bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl<R: BufRead> Read for ZlibStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.decoder.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: BufRead> Seek for ZlibStream<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = forward_seek_target(self.position, pos)?;
        let wanted = target - self.position;
        let skipped = skip_bytes(self, wanted)?;
        if skipped < wanted {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "seek past end of zlib stream",
            ));
        }
        Ok(self.position)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}
