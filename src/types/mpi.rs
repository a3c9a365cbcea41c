use std::fmt;
use std::io::{self, BufRead};

use byteorder::{BigEndian, WriteBytesExt};
use num_bigint::BigUint;
use zeroize::Zeroize;

use crate::errors::{Error, Result};
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;

/// Number of bits we accept when reading or writing MPIs.
/// The value is the same as gnupgs.
const MAX_EXTERN_MPI_BITS: u16 = 16384;

/// An owned multi precision integer: big-endian magnitude bytes with
/// leading zeros stripped.
///
/// Ref: https://tools.ietf.org/html/rfc4880.html#section-3.2
#[derive(Default, Clone, PartialEq, Eq, Zeroize)]
pub struct Mpi(Vec<u8>);

impl Mpi {
    /// Wraps the data in `raw` as an Mpi, stripping leading zeros.
    /// `raw` is not expected to be length-prefixed.
    pub fn from_slice(raw: &[u8]) -> Self {
        Mpi(strip_leading_zeros(raw).to_vec())
    }

    /// Parses a length-prefixed MPI from the given reader.
    ///
    /// The declared bit length must name the first significant bit of
    /// the value: unused leading bits must be zero, and the length
    /// may not overstate them. The zero-length empty MPI is accepted.
    pub fn try_from_reader<B: BufRead>(i: &mut B) -> Result<Self> {
        let len_bits = i.read_be_u16()?;
        if len_bits > MAX_EXTERN_MPI_BITS {
            return Err(Error::bad_format(format!("mpi too long: {} bits", len_bits)));
        }

        let len_bytes = usize::from((len_bits + 7) >> 3);
        let raw = i.take_bytes(len_bytes)?;

        let mpi = Mpi::from_slice(&raw);
        if mpi.bits() != usize::from(len_bits) {
            return Err(Error::bad_format(format!(
                "mpi declared as {} bits holds {} significant bits",
                len_bits,
                mpi.bits()
            )));
        }

        Ok(mpi)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of significant bits.
    pub fn bits(&self) -> usize {
        bit_size(&self.0)
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }

    pub fn from_biguint(n: &BigUint) -> Self {
        Mpi(n.to_bytes_be())
    }

    /// The magnitude, left-padded with zeros to `size` bytes.
    /// Fails if the value does not fit.
    pub fn left_padded(&self, size: usize) -> Result<Vec<u8>> {
        if self.0.len() > size {
            return Err(Error::bad_parameters(format!(
                "value of {} bytes does not fit into {}",
                self.0.len(),
                size
            )));
        }
        let mut out = vec![0u8; size];
        out[size - self.0.len()..].copy_from_slice(&self.0);
        Ok(out)
    }
}

/// Returns the bit length of a given slice.
#[inline]
fn bit_size(val: &[u8]) -> usize {
    if val.is_empty() {
        0
    } else {
        (val.len() * 8) - val[0].leading_zeros() as usize
    }
}

#[inline]
fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|b| b != &0) {
        Some(offset) => &bytes[offset..],
        None => &[],
    }
}

impl AsRef<[u8]> for Mpi {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Mpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mpi({})", hex::encode(&self.0))
    }
}

impl Serialize for Mpi {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_u16::<BigEndian>(self.bits() as u16)?;
        w.write_all(&self.0)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        2 + self.0.len()
    }
}
