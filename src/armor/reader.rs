use std::hash::Hasher as _;
use std::io::{self, BufRead};

use base64::engine::{general_purpose, Engine as _};
use crc24::Crc24Hasher;
use log::debug;

use crate::armor::BlockType;
use crate::errors::{Error, Result};
use crate::util::PeekReader;

/// Decoding reader over one armored block.
///
/// After `read_header`, `Read` yields the base64-decoded body. The
/// reader stops at the END line (validating the CRC-24 when present)
/// and leaves anything after the block untouched in the source, so
/// concatenated armored blocks can be opened one after another.
pub struct Dearmor<'a, R: io::Read> {
    source: &'a mut PeekReader<R>,
    typ: Option<BlockType>,
    buffer: Vec<u8>,
    pos: usize,
    crc: Crc24Hasher,
    done: bool,
}

impl<'a, R: io::Read> Dearmor<'a, R> {
    pub fn new(source: &'a mut PeekReader<R>) -> Self {
        Dearmor {
            source,
            typ: None,
            buffer: Vec::new(),
            pos: 0,
            crc: Crc24Hasher::new(),
            done: false,
        }
    }

    pub fn typ(&self) -> Option<BlockType> {
        self.typ
    }

    /// Reads the BEGIN line and any armor headers, up to the start
    /// of the base64 body.
    pub fn read_header(&mut self) -> Result<BlockType> {
        crate::armor::skip_gap(self.source)?;

        let begin = self.read_line()?;
        let label = begin
            .strip_prefix("-----BEGIN ")
            .and_then(|rest| rest.strip_suffix("-----"))
            .ok_or(Error::InvalidArmorWrappers)?;
        let typ = match BlockType::from_label(label) {
            Some(typ) => typ,
            None => unsupported_err!("armor block type {:?}", label),
        };

        // armor headers (Version, Comment, ...) end at the first
        // empty line; a body line may follow directly as well
        loop {
            let peeked = self.source.peek(1)?;
            if peeked.is_empty() {
                return Err(Error::InvalidArmorWrappers);
            }
            let line = self.read_line()?;
            if line.is_empty() {
                break;
            }
            if !line.contains(": ") {
                // no headers at all: this already was a body line
                self.decode_body_line(&line)?;
                break;
            }
            debug!("armor header: {}", line);
        }

        self.typ = Some(typ);
        Ok(typ)
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self.source.read_line(&mut line)?;
        if read == 0 {
            return Err(Error::InvalidArmorWrappers);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }

    fn decode_body_line(&mut self, line: &str) -> Result<()> {
        let decoded = general_purpose::STANDARD.decode(line.trim())?;
        self.crc.write(&decoded);
        self.buffer.extend_from_slice(&decoded);
        Ok(())
    }

    /// Reads lines until the internal buffer has data again or the
    /// block is finished.
    fn refill(&mut self) -> Result<()> {
        while !self.done && self.pos >= self.buffer.len() {
            let line = self.read_line()?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(crc_part) = line.strip_prefix('=') {
                // checksum line, followed by the END line
                let crc_bytes = general_purpose::STANDARD.decode(crc_part)?;
                if crc_bytes.len() != 3 {
                    return Err(Error::InvalidChecksum);
                }
                let expected = (u32::from(crc_bytes[0]) << 16)
                    | (u32::from(crc_bytes[1]) << 8)
                    | u32::from(crc_bytes[2]);
                if expected != self.crc.finish() as u32 {
                    return Err(Error::InvalidChecksum);
                }
                self.expect_end_line()?;
                self.done = true;
            } else if line.starts_with("-----END ") {
                self.check_end_line(line)?;
                self.done = true;
            } else {
                self.decode_body_line(line)?;
            }
        }
        Ok(())
    }

    fn expect_end_line(&mut self) -> Result<()> {
        loop {
            let line = self.read_line()?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return self.check_end_line(trimmed);
        }
    }

    fn check_end_line(&self, line: &str) -> Result<()> {
        let label = line
            .strip_prefix("-----END ")
            .and_then(|rest| rest.strip_suffix("-----"))
            .ok_or(Error::InvalidArmorWrappers)?;
        let typ = self.typ.ok_or(Error::InvalidArmorWrappers)?;
        if BlockType::from_label(label) != Some(typ) {
            return Err(Error::InvalidArmorWrappers);
        }
        Ok(())
    }
}

impl<R: io::Read> io::Read for Dearmor<'_, R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.buffer.len() {
            // compact the consumed part before decoding more
            self.buffer.clear();
            self.pos = 0;
            self.refill().map_err(io::Error::other)?;
        }

        let available = self.buffer.len() - self.pos;
        let n = available.min(out.len());
        out[..n].copy_from_slice(&self.buffer[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
