use std::io::{self, BufRead};

use byteorder::{BigEndian, WriteBytesExt};

use crate::errors::{Error, Result};
use crate::parsing_reader::BufReadParsing;
use crate::types::Tag;

/// Which of the two header encodings a packet was read with.
/// Serialization reproduces the format so parsed keys round-trip
/// byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFormat {
    /// "Old" format: tag in bits 5..2, length type in the low bits.
    Old,
    /// "New" format: tag in the low six bits, self-describing length.
    New,
}

/// The body length taken from a packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketLength {
    Fixed(usize),
    /// Old format length type 3: the packet extends to EOF.
    Indeterminate,
    /// New format partial body length (first chunk size).
    Partial(usize),
}

/// A parsed packet header: format plus tag. Body lengths are encoded
/// minimally from the body size at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    format: HeaderFormat,
    tag: Tag,
}

impl PacketHeader {
    pub fn new(format: HeaderFormat, tag: Tag) -> Self {
        PacketHeader { format, tag }
    }

    /// Default header for locally created packets.
    pub fn from_tag(tag: Tag) -> Self {
        PacketHeader {
            format: HeaderFormat::New,
            tag,
        }
    }

    pub fn format(&self) -> HeaderFormat {
        self.format
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub(crate) fn with_tag(self, tag: Tag) -> Self {
        PacketHeader { tag, ..self }
    }

    /// Reads a packet header and its body length.
    pub fn try_from_reader<B: BufRead>(i: &mut B) -> Result<(Self, PacketLength)> {
        let header = i.read_u8()?;

        match header & 0b1100_0000 {
            0b1100_0000 => {
                // new format starts with 0b11
                let tag = Tag::from(header & 0b0011_1111);
                let olen = i.read_u8()?;
                let length = match olen {
                    // One-Octet Lengths
                    0..=191 => PacketLength::Fixed(olen.into()),
                    // Two-Octet Lengths
                    192..=223 => {
                        let a = i.read_u8()?;
                        PacketLength::Fixed(((olen as usize - 192) << 8) + 192 + a as usize)
                    }
                    // Partial Body Lengths
                    224..=254 => PacketLength::Partial(1 << (olen as usize & 0x1F)),
                    // Five-Octet Lengths
                    255 => PacketLength::Fixed(i.read_be_u32()?.try_into()?),
                };
                Ok((PacketHeader::new(HeaderFormat::New, tag), length))
            }
            0b1000_0000 => {
                // old format starts with 0b10
                let tag = Tag::from((header & 0b0011_1100) >> 2);
                let length = match header & 0b0000_0011 {
                    0 => PacketLength::Fixed(i.read_u8()?.into()),
                    1 => PacketLength::Fixed(i.read_be_u16()?.into()),
                    2 => PacketLength::Fixed(i.read_be_u32()?.try_into()?),
                    3 => PacketLength::Indeterminate,
                    _ => unreachable!("old packet length type is only 2 bits"),
                };
                Ok((PacketHeader::new(HeaderFormat::Old, tag), length))
            }
            _ => Err(Error::bad_format(format!(
                "unknown packet header version {:#b}",
                header
            ))),
        }
    }

    /// Writes the header for a body of `len` bytes, minimally encoded.
    pub fn write_with_len<W: io::Write>(&self, len: usize, writer: &mut W) -> Result<()> {
        match self.format {
            HeaderFormat::New => {
                writer.write_u8(0b1100_0000 | u8::from(self.tag))?;
                if len < 192 {
                    writer.write_u8(len as u8)?;
                } else if len < 8384 {
                    writer.write_u8((((len - 192) >> 8) + 192) as u8)?;
                    writer.write_u8(((len - 192) & 0xFF) as u8)?;
                } else {
                    writer.write_u8(255)?;
                    writer.write_u32::<BigEndian>(len as u32)?;
                }
            }
            HeaderFormat::Old => {
                let raw_tag = u8::from(self.tag);
                ensure!(
                    raw_tag < 16,
                    "tag {:?} is not representable in old format headers",
                    self.tag
                );
                let (length_type, octets) = old_length_encoding(len);
                writer.write_u8(0b1000_0000 | (raw_tag << 2) | length_type)?;
                match octets {
                    1 => writer.write_u8(len as u8)?,
                    2 => writer.write_u16::<BigEndian>(len as u16)?,
                    _ => writer.write_u32::<BigEndian>(len as u32)?,
                }
            }
        }

        Ok(())
    }

    /// Size of the encoded header for a body of `len` bytes.
    pub fn write_len(&self, len: usize) -> usize {
        match self.format {
            HeaderFormat::New => {
                if len < 192 {
                    2
                } else if len < 8384 {
                    3
                } else {
                    6
                }
            }
            HeaderFormat::Old => 1 + old_length_encoding(len).1,
        }
    }
}

fn old_length_encoding(len: usize) -> (u8, usize) {
    if len < 256 {
        (0, 1)
    } else if len < 65536 {
        (1, 2)
    } else {
        (2, 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(header: PacketHeader, len: usize) {
        let mut buf = Vec::new();
        header.write_with_len(len, &mut buf).unwrap();
        assert_eq!(buf.len(), header.write_len(len));

        let (back, back_len) = PacketHeader::try_from_reader(&mut &buf[..]).unwrap();
        assert_eq!(back, header);
        assert_eq!(back_len, PacketLength::Fixed(len));
    }

    #[test]
    fn new_format_lengths() {
        let header = PacketHeader::from_tag(Tag::Signature);
        for len in [0, 1, 191, 192, 8383, 8384, 70000] {
            roundtrip(header, len);
        }
    }

    #[test]
    fn old_format_lengths() {
        let header = PacketHeader::new(HeaderFormat::Old, Tag::PublicKey);
        for len in [0, 255, 256, 65535, 65536] {
            roundtrip(header, len);
        }
    }

    #[test]
    fn old_format_rejects_large_tags() {
        let header = PacketHeader::new(HeaderFormat::Old, Tag::UserAttribute);
        let mut buf = Vec::new();
        assert!(header.write_with_len(1, &mut buf).is_err());
    }

    #[test]
    fn indeterminate_length() {
        // old format, tag 6, length type 3
        let raw = [0b1001_1011u8];
        let (header, len) = PacketHeader::try_from_reader(&mut &raw[..]).unwrap();
        assert_eq!(header.tag(), Tag::PublicKey);
        assert_eq!(len, PacketLength::Indeterminate);
    }
}
