//! Primitive big-endian readers on top of [`BufRead`].
//!
//! All packet body parsing in this crate goes through these helpers,
//! so "unexpected EOF" surfaces uniformly as an
//! [`UnexpectedEof`](std::io::ErrorKind::UnexpectedEof) IO error.

use std::cmp;
use std::io::{BufRead, Read, Result};

use bytes::{BufMut, BytesMut};

pub trait BufReadParsing: BufRead + Sized {
    fn read_u8(&mut self) -> Result<u8> {
        let arr = self.read_array::<1>()?;
        Ok(arr[0])
    }

    fn read_be_u16(&mut self) -> Result<u16> {
        let arr = self.read_array::<2>()?;
        Ok(u16::from_be_bytes(arr))
    }

    fn read_be_u32(&mut self) -> Result<u32> {
        let arr = self.read_array::<4>()?;
        Ok(u32::from_be_bytes(arr))
    }

    fn has_remaining(&mut self) -> Result<bool> {
        let has_remaining = !self.fill_buf()?.is_empty();
        Ok(has_remaining)
    }

    fn read_array<const C: usize>(&mut self) -> Result<[u8; C]> {
        let mut arr = [0u8; C];
        fill_from(self, &mut arr)?;
        Ok(arr)
    }

    fn take_bytes(&mut self, size: usize) -> Result<BytesMut> {
        let mut out = BytesMut::zeroed(size);
        fill_from(self, &mut out)?;
        Ok(out)
    }

    /// Limits this reader to the next `limit` bytes.
    fn read_take(&mut self, limit: usize) -> Take<'_, Self> {
        Take { inner: self, limit }
    }

    /// Reads everything that is left.
    fn rest(&mut self) -> Result<BytesMut> {
        let out = BytesMut::new();
        let mut writer = out.writer();
        std::io::copy(self, &mut writer)?;
        Ok(writer.into_inner())
    }
}

fn fill_from<R: BufRead>(r: &mut R, out: &mut [u8]) -> Result<()> {
    let mut read = 0;
    while read < out.len() {
        let buf = r.fill_buf()?;
        if buf.is_empty() {
            break;
        }

        let available = (out.len() - read).min(buf.len());
        out[read..read + available].copy_from_slice(&buf[..available]);
        read += available;
        r.consume(available);
    }
    if read != out.len() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "no more data available",
        ));
    }
    Ok(())
}

impl<B: BufRead> BufReadParsing for B {}

/// Reader adapter limiting the bytes read from an underlying reader,
/// with `BufRead` support so nested parsers can keep peeking.
#[derive(Debug)]
pub struct Take<'a, T> {
    inner: &'a mut T,
    limit: usize,
}

impl<T> Take<'_, T> {
    /// The number of bytes left before this reader reports EOF.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl<T: Read> Read for Take<'_, T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.limit == 0 {
            return Ok(0);
        }

        let max = cmp::min(buf.len(), self.limit);
        let n = self.inner.read(&mut buf[..max])?;
        assert!(n <= self.limit, "number of read bytes exceeds limit");
        self.limit -= n;
        Ok(n)
    }
}

impl<T: BufRead> BufRead for Take<'_, T> {
    fn fill_buf(&mut self) -> Result<&[u8]> {
        if self.limit == 0 {
            return Ok(&[]);
        }

        let buf = self.inner.fill_buf()?;
        let cap = cmp::min(buf.len(), self.limit);
        Ok(&buf[..cap])
    }

    fn consume(&mut self, amt: usize) {
        let amt = cmp::min(amt, self.limit);
        self.limit -= amt;
        self.inner.consume(amt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_primitives() {
        let mut data = &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07][..];
        assert_eq!(data.read_u8().unwrap(), 0x01);
        assert_eq!(data.read_be_u16().unwrap(), 0x0203);
        assert_eq!(data.read_be_u32().unwrap(), 0x0405_0607);
        assert!(!data.has_remaining().unwrap());
        assert!(data.read_u8().is_err());
    }

    #[test]
    fn take_stops_at_limit() {
        let mut data = &[1u8, 2, 3, 4, 5][..];
        let mut take = data.read_take(3);
        assert_eq!(take.rest().unwrap().as_ref(), &[1, 2, 3]);
        assert_eq!(data, &[4, 5]);
    }
}
