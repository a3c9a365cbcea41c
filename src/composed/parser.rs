use std::fmt;
use std::io;

use log::debug;

use crate::armor::{self, Dearmor};
use crate::composed::transferable::{TransferableKey, TransferableSubkey, TransferableUserId};
use crate::errors::{Error, Result};
use crate::packet::{KeyPacket, PacketHeader, PacketLength, Signature, UserIdPacket};
use crate::parsing_reader::BufReadParsing;
use crate::types::Tag;
use crate::util::PeekReader;

/// Non-fatal anomalies found while parsing a key sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    /// Secret and public primary keys in the same sequence.
    MixedPublicAndSecretKeys,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MixedPublicAndSecretKeys => {
                f.write_str("public keys are mixed together with secret ones")
            }
        }
    }
}

/// The outcome of [`parse_keys`]: the keys in input order plus any
/// warnings, which never fail the parse.
#[derive(Debug)]
pub struct ParsedKeys {
    pub keys: Vec<TransferableKey>,
    pub warnings: Vec<Warning>,
}

/// Parses one or more transferable keys, from raw packets or from
/// one or more concatenated armored blocks.
/// Ref: https://tools.ietf.org/html/rfc4880.html#section-11
pub fn parse_keys<R: io::Read>(input: R) -> Result<ParsedKeys> {
    let mut src = PeekReader::new(input);
    let mut keys = Vec::new();
    let mut has_secret = false;
    let mut has_public = false;

    loop {
        armor::skip_gap(&mut src)?;
        if src.is_done()? {
            break;
        }

        if armor::detect(&mut src)? {
            let mut dearmor = Dearmor::new(&mut src);
            dearmor.read_header()?;
            let mut inner = PeekReader::new(dearmor);
            read_raw_keys(&mut inner, &mut keys, &mut has_secret, &mut has_public)?;
            // the dearmor stops at its END line; outer loop decides
            // whether another armored block follows
        } else {
            read_raw_keys(&mut src, &mut keys, &mut has_secret, &mut has_public)?;
            break;
        }
    }

    let mut warnings = Vec::new();
    if has_secret && has_public {
        warnings.push(Warning::MixedPublicAndSecretKeys);
    }

    Ok(ParsedKeys { keys, warnings })
}

/// Parses a lone transferable subkey, for consumers that store
/// orphan subkeys and link them to their primary via the grip later.
pub fn parse_subkey<R: io::Read>(input: R) -> Result<TransferableSubkey> {
    let mut src = PeekReader::new(input);
    read_subkey(&mut src)
}

fn read_raw_keys<R: io::Read>(
    src: &mut PeekReader<R>,
    keys: &mut Vec<TransferableKey>,
    has_secret: &mut bool,
    has_public: &mut bool,
) -> Result<()> {
    while !src.is_done()? {
        let tag = peek_tag(src)?;
        if !tag.is_primary_key() {
            return Err(Error::bad_format(format!("wrong key tag: {:?}", tag)));
        }

        let key = read_transferable_key(src)?;
        *has_secret |= key.key.is_secret();
        *has_public |= !key.key.is_secret();
        keys.push(key);
    }
    Ok(())
}

fn read_transferable_key<R: io::Read>(src: &mut PeekReader<R>) -> Result<TransferableKey> {
    debug!("parsing transferable key");
    let (header, mut body) = next_packet(src)?;
    ensure!(
        header.tag().is_primary_key(),
        "wrong key packet tag: {:?}",
        header.tag()
    );
    let key = finish_packet(KeyPacket::try_from_reader(header, &mut body), &mut body)?;

    skip_trust_packets(src)?;
    let mut signatures = Vec::new();
    read_signatures(src, &mut signatures)?;

    let mut userids = Vec::new();
    while peek_tag_opt(src)?.map(Tag::is_userid).unwrap_or(false) {
        userids.push(read_userid(src)?);
    }

    let mut subkeys = Vec::new();
    while peek_tag_opt(src)?.map(Tag::is_subkey).unwrap_or(false) {
        subkeys.push(read_subkey(src)?);
    }

    Ok(TransferableKey {
        key,
        signatures,
        userids,
        subkeys,
    })
}

fn read_userid<R: io::Read>(src: &mut PeekReader<R>) -> Result<TransferableUserId> {
    let (header, mut body) = next_packet(src)?;
    ensure!(
        header.tag().is_userid(),
        "wrong uid packet tag: {:?}",
        header.tag()
    );
    let userid = finish_packet(UserIdPacket::try_from_reader(header, &mut body), &mut body)?;

    skip_trust_packets(src)?;
    let mut signatures = Vec::new();
    read_signatures(src, &mut signatures)?;

    Ok(TransferableUserId { userid, signatures })
}

fn read_subkey<R: io::Read>(src: &mut PeekReader<R>) -> Result<TransferableSubkey> {
    let (header, mut body) = next_packet(src)?;
    ensure!(
        header.tag().is_subkey(),
        "wrong subkey packet tag: {:?}",
        header.tag()
    );
    let subkey = finish_packet(KeyPacket::try_from_reader(header, &mut body), &mut body)?;

    skip_trust_packets(src)?;
    let mut signatures = Vec::new();
    read_signatures(src, &mut signatures)?;

    Ok(TransferableSubkey { subkey, signatures })
}

/// Reads a run of signature packets, skipping legacy trust packets
/// between them.
fn read_signatures<R: io::Read>(
    src: &mut PeekReader<R>,
    signatures: &mut Vec<Signature>,
) -> Result<()> {
    while peek_tag_opt(src)? == Some(Tag::Signature) {
        let (header, mut body) = next_packet(src)?;
        let sig = finish_packet(Signature::try_from_reader(header, &mut body), &mut body)?;
        signatures.push(sig);

        skip_trust_packets(src)?;
    }
    Ok(())
}

fn skip_trust_packets<R: io::Read>(src: &mut PeekReader<R>) -> Result<()> {
    while peek_tag_opt(src)? == Some(Tag::Trust) {
        let (_, mut body) = next_packet(src)?;
        io::copy(&mut body, &mut io::sink())?;
    }
    Ok(())
}

/// The tag of the next packet; errors at EOF.
fn peek_tag<R: io::Read>(src: &mut PeekReader<R>) -> Result<Tag> {
    peek_tag_opt(src)?.ok_or_else(|| Error::bad_format("unexpected end of key data"))
}

/// The tag of the next packet without consuming it, or `None` at EOF.
fn peek_tag_opt<R: io::Read>(src: &mut PeekReader<R>) -> Result<Option<Tag>> {
    let peeked = src.peek(1)?;
    let Some(first) = peeked.first() else {
        return Ok(None);
    };

    match first & 0b1100_0000 {
        0b1100_0000 => Ok(Some(Tag::from(first & 0b0011_1111))),
        0b1000_0000 => Ok(Some(Tag::from((first & 0b0011_1100) >> 2))),
        _ => Err(Error::bad_format(format!(
            "invalid packet header octet {:#04x}",
            first
        ))),
    }
}

/// Reads the next packet header and bounds the body.
fn next_packet<R: io::Read>(
    src: &mut PeekReader<R>,
) -> Result<(PacketHeader, crate::parsing_reader::Take<'_, PeekReader<R>>)> {
    let (header, length) = PacketHeader::try_from_reader(src).map_err(eof_is_bad_format)?;
    match length {
        PacketLength::Fixed(len) => Ok((header, src.read_take(len))),
        PacketLength::Indeterminate | PacketLength::Partial(_) => Err(Error::bad_format(
            "key packets require fixed length framing",
        )),
    }
}

/// Completes a packet body parse: maps EOF to a format error and
/// rejects trailing bytes after the structured body.
fn finish_packet<T, B: io::BufRead>(parsed: Result<T>, body: &mut B) -> Result<T> {
    let value = parsed.map_err(eof_is_bad_format)?;
    if body.has_remaining()? {
        return Err(Error::bad_format("trailing bytes after packet body"));
    }
    Ok(value)
}

/// Truncated input inside a packet run is a stream format error, not
/// an IO failure of the caller's source.
fn eof_is_bad_format(err: Error) -> Error {
    match err {
        Error::IO { ref source, .. } if source.kind() == io::ErrorKind::UnexpectedEof => {
            Error::bad_format("unexpected end of key data")
        }
        other => other,
    }
}
