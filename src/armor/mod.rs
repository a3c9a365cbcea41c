//! ASCII armor framing for key streams: detection, a decoding
//! reader, and the encoding writer.

mod reader;
mod writer;

pub use self::reader::Dearmor;
pub use self::writer::write;

use std::fmt;
use std::io;

use crate::errors::Result;
use crate::util::PeekReader;

/// Armor block kinds produced and consumed by the key codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// `PGP PUBLIC KEY BLOCK`
    PublicKey,
    /// `PGP PRIVATE KEY BLOCK`
    SecretKey,
}

impl BlockType {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::PublicKey => "PGP PUBLIC KEY BLOCK",
            BlockType::SecretKey => "PGP PRIVATE KEY BLOCK",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "PGP PUBLIC KEY BLOCK" => Some(BlockType::PublicKey),
            "PGP PRIVATE KEY BLOCK" => Some(BlockType::SecretKey),
            _ => None,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const BEGIN: &[u8] = b"-----BEGIN PGP ";

/// Checks whether the stream starts with an armor header, without
/// consuming anything. Leading whitespace is ignored for the check.
pub fn detect<R: io::Read>(src: &mut PeekReader<R>) -> Result<bool> {
    let window = src.peek(BEGIN.len() + 64)?;
    let trimmed = skip_leading_whitespace(window);
    Ok(trimmed.starts_with(BEGIN))
}

/// Consumes blank lines and stray whitespace between armored blocks.
pub(crate) fn skip_gap<R: io::Read>(src: &mut PeekReader<R>) -> Result<()> {
    use std::io::BufRead;
    loop {
        let buf = src.fill_buf()?;
        if buf.is_empty() {
            return Ok(());
        }
        let skip = buf
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(buf.len());
        if skip == 0 {
            return Ok(());
        }
        src.consume(skip);
    }
}

fn skip_leading_whitespace(data: &[u8]) -> &[u8] {
    let skip = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    &data[skip..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_does_not_consume() {
        let data = b"\n\n-----BEGIN PGP PUBLIC KEY BLOCK-----\n";
        let mut src = PeekReader::new(&data[..]);
        assert!(detect(&mut src).unwrap());
        assert!(detect(&mut src).unwrap());
        assert_eq!(src.peek(2).unwrap(), b"\n\n");
    }

    #[test]
    fn detect_rejects_binary() {
        let data = [0x99u8, 0x01, 0x0d];
        let mut src = PeekReader::new(&data[..]);
        assert!(!detect(&mut src).unwrap());
        assert_eq!(src.peek(1).unwrap(), &[0x99]);
    }
}
