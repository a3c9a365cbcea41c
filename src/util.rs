use std::io;

/// A reader with explicit lookahead.
///
/// Packet and armor detection need to inspect the next bytes of a
/// stream without consuming them. `PeekReader` buffers as much
/// lookahead as requested and hands the bytes back out first on
/// subsequent reads.
#[derive(Debug)]
pub struct PeekReader<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
}

impl<R: io::Read> PeekReader<R> {
    pub fn new(inner: R) -> Self {
        PeekReader {
            inner,
            buf: Vec::new(),
            pos: 0,
        }
    }

    /// Returns up to `n` bytes of lookahead without consuming them.
    /// A shorter slice means the source hit EOF.
    pub fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        while self.buf.len() - self.pos < n {
            let mut chunk = [0u8; 4096];
            let read = self.inner.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            if self.pos > 0 {
                self.buf.drain(..self.pos);
                self.pos = 0;
            }
            self.buf.extend_from_slice(&chunk[..read]);
        }
        let end = cmp_min(self.pos + n, self.buf.len());
        Ok(&self.buf[self.pos..end])
    }

    pub fn peek_u8(&mut self) -> io::Result<Option<u8>> {
        Ok(self.peek(1)?.first().copied())
    }

    /// True once both the lookahead buffer and the source are exhausted.
    pub fn is_done(&mut self) -> io::Result<bool> {
        Ok(self.peek(1)?.is_empty())
    }
}

#[inline]
fn cmp_min(a: usize, b: usize) -> usize {
    if a < b {
        a
    } else {
        b
    }
}

impl<R: io::Read> io::Read for PeekReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.pos < self.buf.len() {
            let n = cmp_min(self.buf.len() - self.pos, out.len());
            out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            return Ok(n);
        }
        self.inner.read(out)
    }
}

impl<R: io::Read> io::BufRead for PeekReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.buf.len() {
            self.buf.clear();
            self.pos = 0;
            let mut chunk = [0u8; 4096];
            let read = self.inner.read(&mut chunk)?;
            self.buf.extend_from_slice(&chunk[..read]);
        }
        Ok(&self.buf[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = cmp_min(self.pos + amt, self.buf.len());
    }
}

/// Decodes a userid payload, falling back to a byte-wise char mapping
/// for the pre-utf8 userids that are still out there.
pub fn read_string_lossy(raw: &[u8]) -> String {
    match ::std::str::from_utf8(raw) {
        Ok(s) => s.to_string(),
        Err(_) => raw.iter().map(|c| *c as char).collect::<String>(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn peek_does_not_consume() {
        let mut r = PeekReader::new(&b"hello world"[..]);
        assert_eq!(r.peek(5).unwrap(), b"hello");
        assert_eq!(r.peek(5).unwrap(), b"hello");

        let mut out = String::new();
        r.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn peek_past_eof_is_short() {
        let mut r = PeekReader::new(&b"ab"[..]);
        assert_eq!(r.peek(10).unwrap(), b"ab");
        assert!(!r.is_done().unwrap());

        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert!(r.is_done().unwrap());
    }

    #[test]
    fn test_read_string_lossy() {
        assert_eq!(read_string_lossy(b"hello"), "hello".to_string());
        assert_eq!(
            read_string_lossy(&[74, 252, 114, 103, 101, 110]),
            "J\u{fc}rgen".to_string()
        );
    }
}
