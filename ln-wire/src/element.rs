//! Composite element codec.
//!
//! Every wire message is a fixed sequence of elements. This module is the only
//! place that knows how each element kind looks on the wire; message types
//! just list their fields in order.
//!
//! | Kind                          | Encoding                                   |
//! |-------------------------------|--------------------------------------------|
//! | `u8`/`u16`/`u32`/`u64`        | fixed width, big-endian                    |
//! | `ChannelId`/`HtlcKey`/`ReservationId` | `u64`, big-endian                  |
//! | `PublicKey`                   | 33-byte compressed key                     |
//! | `ShaHash`                     | 32 raw bytes                               |
//! | `RedemptionHash`              | 20 raw bytes                               |
//! | `Signature`                   | 1-byte length + DER, length <= 73          |
//! | `PkScript`                    | 1-byte length + script, length <= 25       |
//! | `Option<Signature>`           | `None` is a single `0x00` length byte      |
//! | `Option<ShaHash>`             | `None` is 32 zero bytes, and decodes so    |

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use secp256k1::ecdsa::Signature;
use secp256k1::PublicKey;

use crate::error::{WireError, WireResult};
use crate::primitives::{
    ChannelId, HtlcKey, PkScript, RedemptionHash, ReservationId, ShaHash, MAX_PK_SCRIPT_SIZE,
    MAX_SIGNATURE_SIZE,
};

/// Size of a compressed public key on the wire.
pub const PUBLIC_KEY_SIZE: usize = 33;

/// A value with a single fixed wire representation.
pub trait Element: Sized {
    /// Write this element to `w`.
    fn write_element<W: Write + ?Sized>(&self, w: &mut W) -> WireResult<()>;

    /// Read one element from `r`.
    fn read_element<R: Read + ?Sized>(r: &mut R) -> WireResult<Self>;
}

/// Read one element of type `T`.
///
/// Message decoders call this once per field inside a struct literal, which
/// evaluates in source order and stops at the first error.
#[inline]
pub fn read_element<T: Element, R: Read + ?Sized>(r: &mut R) -> WireResult<T> {
    T::read_element(r)
}

/// Write a list of elements in order, returning early on the first error.
#[macro_export]
macro_rules! write_elements {
    ($w:expr, $($field:expr),+ $(,)?) => {{
        $( $crate::element::Element::write_element(&$field, &mut *$w)?; )+
    }};
}

impl Element for u8 {
    fn write_element<W: Write + ?Sized>(&self, w: &mut W) -> WireResult<()> {
        w.write_u8(*self)?;
        Ok(())
    }

    fn read_element<R: Read + ?Sized>(r: &mut R) -> WireResult<Self> {
        Ok(r.read_u8()?)
    }
}

impl Element for u16 {
    fn write_element<W: Write + ?Sized>(&self, w: &mut W) -> WireResult<()> {
        w.write_u16::<BigEndian>(*self)?;
        Ok(())
    }

    fn read_element<R: Read + ?Sized>(r: &mut R) -> WireResult<Self> {
        Ok(r.read_u16::<BigEndian>()?)
    }
}

impl Element for u32 {
    fn write_element<W: Write + ?Sized>(&self, w: &mut W) -> WireResult<()> {
        w.write_u32::<BigEndian>(*self)?;
        Ok(())
    }

    fn read_element<R: Read + ?Sized>(r: &mut R) -> WireResult<Self> {
        Ok(r.read_u32::<BigEndian>()?)
    }
}

impl Element for u64 {
    fn write_element<W: Write + ?Sized>(&self, w: &mut W) -> WireResult<()> {
        w.write_u64::<BigEndian>(*self)?;
        Ok(())
    }

    fn read_element<R: Read + ?Sized>(r: &mut R) -> WireResult<Self> {
        Ok(r.read_u64::<BigEndian>()?)
    }
}

macro_rules! u64_element {
    ($($ty:ty),+) => {$(
        impl Element for $ty {
            fn write_element<W: Write + ?Sized>(&self, w: &mut W) -> WireResult<()> {
                self.0.write_element(w)
            }

            fn read_element<R: Read + ?Sized>(r: &mut R) -> WireResult<Self> {
                u64::read_element(r).map(Self)
            }
        }
    )+};
}

u64_element!(ChannelId, HtlcKey, ReservationId);

impl Element for PublicKey {
    fn write_element<W: Write + ?Sized>(&self, w: &mut W) -> WireResult<()> {
        w.write_all(&self.serialize())?;
        Ok(())
    }

    fn read_element<R: Read + ?Sized>(r: &mut R) -> WireResult<Self> {
        let mut buf = [0u8; PUBLIC_KEY_SIZE];
        r.read_exact(&mut buf)?;
        Ok(PublicKey::from_slice(&buf)?)
    }
}

impl Element for ShaHash {
    fn write_element<W: Write + ?Sized>(&self, w: &mut W) -> WireResult<()> {
        w.write_all(&self.0)?;
        Ok(())
    }

    fn read_element<R: Read + ?Sized>(r: &mut R) -> WireResult<Self> {
        let mut buf = [0u8; ShaHash::LEN];
        r.read_exact(&mut buf)?;
        Ok(ShaHash(buf))
    }
}

impl Element for Option<ShaHash> {
    fn write_element<W: Write + ?Sized>(&self, w: &mut W) -> WireResult<()> {
        self.unwrap_or_default().write_element(w)
    }

    fn read_element<R: Read + ?Sized>(r: &mut R) -> WireResult<Self> {
        let hash = ShaHash::read_element(r)?;
        Ok((!hash.is_zero()).then_some(hash))
    }
}

impl Element for RedemptionHash {
    fn write_element<W: Write + ?Sized>(&self, w: &mut W) -> WireResult<()> {
        w.write_all(&self.0)?;
        Ok(())
    }

    fn read_element<R: Read + ?Sized>(r: &mut R) -> WireResult<Self> {
        let mut buf = [0u8; RedemptionHash::LEN];
        r.read_exact(&mut buf)?;
        Ok(RedemptionHash(buf))
    }
}

impl Element for Signature {
    fn write_element<W: Write + ?Sized>(&self, w: &mut W) -> WireResult<()> {
        write_var_bytes(w, &self.serialize_der(), MAX_SIGNATURE_SIZE, "signature")
    }

    fn read_element<R: Read + ?Sized>(r: &mut R) -> WireResult<Self> {
        let mut buf = [0u8; MAX_SIGNATURE_SIZE];
        let len = read_var_bytes(r, &mut buf, "signature")?;
        Ok(Signature::from_der(&buf[..len])?)
    }
}

impl Element for Option<Signature> {
    fn write_element<W: Write + ?Sized>(&self, w: &mut W) -> WireResult<()> {
        match self {
            Some(sig) => sig.write_element(w),
            None => 0u8.write_element(w),
        }
    }

    fn read_element<R: Read + ?Sized>(r: &mut R) -> WireResult<Self> {
        let mut buf = [0u8; MAX_SIGNATURE_SIZE];
        match read_var_bytes(r, &mut buf, "signature")? {
            0 => Ok(None),
            len => Ok(Some(Signature::from_der(&buf[..len])?)),
        }
    }
}

impl Element for PkScript {
    fn write_element<W: Write + ?Sized>(&self, w: &mut W) -> WireResult<()> {
        write_var_bytes(w, &self.0, MAX_PK_SCRIPT_SIZE, "pkscript")
    }

    fn read_element<R: Read + ?Sized>(r: &mut R) -> WireResult<Self> {
        let mut buf = [0u8; MAX_PK_SCRIPT_SIZE];
        let len = read_var_bytes(r, &mut buf, "pkscript")?;
        Ok(PkScript(buf[..len].to_vec()))
    }
}

/// Write a one-byte length prefix followed by `bytes`.
fn write_var_bytes<W: Write + ?Sized>(
    w: &mut W,
    bytes: &[u8],
    max: usize,
    field: &'static str,
) -> WireResult<()> {
    if bytes.len() > max {
        return Err(WireError::FieldTooLong {
            field,
            len: bytes.len(),
            max,
        });
    }
    w.write_u8(bytes.len() as u8)?;
    w.write_all(bytes)?;
    Ok(())
}

/// Read a one-byte length prefix, then that many bytes into `buf`.
///
/// The declared length is checked against `buf.len()` before any payload
/// byte is consumed.
fn read_var_bytes<R: Read + ?Sized>(
    r: &mut R,
    buf: &mut [u8],
    field: &'static str,
) -> WireResult<usize> {
    let len = r.read_u8()? as usize;
    if len > buf.len() {
        return Err(WireError::FieldTooLong {
            field,
            len,
            max: buf.len(),
        });
    }
    r.read_exact(&mut buf[..len])?;
    Ok(len)
}
