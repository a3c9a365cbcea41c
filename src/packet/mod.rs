mod header;
mod key;
mod secret;
pub mod signature;
mod user_id;

pub use self::header::{HeaderFormat, PacketHeader, PacketLength};
pub use self::key::KeyPacket;
pub(crate) use self::key::timestamp_to_datetime;
pub use self::signature::{
    RevocationCode, Signature, SignatureType, SignatureVersion, Subpacket, SubpacketData,
};
pub use self::user_id::UserIdPacket;

use std::io;

use crate::errors::Result;
use crate::ser::Serialize;

/// A packet body that knows its header: `Serialize` covers the body,
/// this trait prepends the framing.
pub trait PacketTrait: Serialize {
    fn packet_header(&self) -> &PacketHeader;

    fn to_writer_with_header<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.packet_header()
            .write_with_len(self.write_len(), writer)?;
        self.to_writer(writer)
    }

    fn write_len_with_header(&self) -> usize {
        let body = self.write_len();
        self.packet_header().write_len(body) + body
    }
}
