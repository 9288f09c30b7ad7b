use std::{
    fs::File,
    io::{BufReader, ErrorKind, Read},
    path::Path,
};

use crate::{
    foundation::core::{FrameDims, YuvPlanes},
    foundation::error::PlaneviewResult,
};

/// One owned I420 frame: a full-size Y plane followed by quarter-size U and V.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct I420Frame {
    pub dims: FrameDims,
    pub y: Vec<u8>,
    pub u: Vec<u8>,
    pub v: Vec<u8>,
}

impl I420Frame {
    /// A frame where every sample of each plane has the same value.
    pub fn filled(dims: FrameDims, y: u8, u: u8, v: u8) -> Self {
        Self {
            dims,
            y: vec![y; dims.luma_len()],
            u: vec![u; dims.chroma_len()],
            v: vec![v; dims.chroma_len()],
        }
    }

    pub fn planes(&self) -> YuvPlanes<'_> {
        YuvPlanes::new(&self.y, &self.u, &self.v)
    }

    /// Size of one frame in a raw `.yuv` stream.
    pub fn byte_len(dims: FrameDims) -> usize {
        dims.luma_len() + 2 * dims.chroma_len()
    }

    /// Serializes the frame in raw I420 layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::byte_len(self.dims));
        out.extend_from_slice(&self.y);
        out.extend_from_slice(&self.u);
        out.extend_from_slice(&self.v);
        out
    }
}

/// Reads consecutive raw I420 frames from a byte stream.
///
/// A raw stream carries no header, so the frame size is supplied by the
/// caller. A trailing partial frame is reported as an `UnexpectedEof` error.
pub struct I420Reader<R> {
    inner: R,
    dims: FrameDims,
    frames_read: u64,
}

impl I420Reader<BufReader<File>> {
    pub fn open(path: &Path, dims: FrameDims) -> PlaneviewResult<Self> {
        let f = File::open(path)?;
        Ok(Self::new(BufReader::new(f), dims))
    }
}

impl<R: Read> I420Reader<R> {
    pub fn new(inner: R, dims: FrameDims) -> Self {
        Self {
            inner,
            dims,
            frames_read: 0,
        }
    }

    pub fn dims(&self) -> FrameDims {
        self.dims
    }

    /// Frames returned or skipped so far.
    pub fn position(&self) -> u64 {
        self.frames_read
    }

    /// Returns `Ok(None)` at a clean end of stream.
    pub fn next_frame(&mut self) -> PlaneviewResult<Option<I420Frame>> {
        let mut buf = vec![0u8; I420Frame::byte_len(self.dims)];
        if !self.fill(&mut buf)? {
            return Ok(None);
        }

        let luma = self.dims.luma_len();
        let chroma = self.dims.chroma_len();
        let v = buf.split_off(luma + chroma);
        let u = buf.split_off(luma);
        self.frames_read += 1;
        Ok(Some(I420Frame {
            dims: self.dims,
            y: buf,
            u,
            v,
        }))
    }

    /// Discards up to `n` frames and returns how many were skipped.
    pub fn skip_frames(&mut self, n: u64) -> PlaneviewResult<u64> {
        let mut scratch = vec![0u8; I420Frame::byte_len(self.dims)];
        for skipped in 0..n {
            if !self.fill(&mut scratch)? {
                return Ok(skipped);
            }
            self.frames_read += 1;
        }
        Ok(n)
    }

    /// Fills `buf` completely, or returns `false` if the stream ended before
    /// the first byte.
    fn fill(&mut self, buf: &mut [u8]) -> PlaneviewResult<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled == 0 {
            return Ok(false);
        }
        if filled < buf.len() {
            return Err(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                format!(
                    "truncated I420 frame {}: got {filled} of {} bytes",
                    self.frames_read,
                    buf.len()
                ),
            )
            .into());
        }
        Ok(true)
    }
}

impl<R: Read> Iterator for I420Reader<R> {
    type Item = PlaneviewResult<I420Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}
