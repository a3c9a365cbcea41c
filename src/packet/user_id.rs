use std::io::{self, BufRead};

use crate::errors::Result;
use crate::packet::{PacketHeader, PacketTrait};
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;
use crate::types::Tag;
use crate::util::read_string_lossy;

/// A user id or user attribute packet. Both carry an opaque payload;
/// user ids are conventionally UTF-8 `name <email>` strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdPacket {
    packet_header: PacketHeader,
    data: Vec<u8>,
}

impl UserIdPacket {
    pub fn new(id: &str) -> Self {
        UserIdPacket {
            packet_header: PacketHeader::from_tag(Tag::UserId),
            data: id.as_bytes().to_vec(),
        }
    }

    pub fn try_from_reader<B: BufRead>(packet_header: PacketHeader, i: &mut B) -> Result<Self> {
        ensure!(
            packet_header.tag().is_userid(),
            "not a user id packet tag: {:?}",
            packet_header.tag()
        );
        let data = i.rest()?.to_vec();
        Ok(UserIdPacket {
            packet_header,
            data,
        })
    }

    pub fn tag(&self) -> Tag {
        self.packet_header.tag()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The display form: the decoded string for user ids, a marker
    /// for (image) attributes.
    pub fn id(&self) -> String {
        match self.tag() {
            Tag::UserId => read_string_lossy(&self.data),
            _ => "(photo)".to_string(),
        }
    }

    /// Packet-level equality: tag and payload, ignoring the header
    /// encoding the packet arrived with.
    pub fn pkt_eq(&self, other: &UserIdPacket) -> bool {
        self.tag() == other.tag() && self.data == other.data
    }
}

impl Serialize for UserIdPacket {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.data.len()
    }
}

impl PacketTrait for UserIdPacket {
    fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }
}
