//! A minimal `Encodable`/`Decodable` framework plus an "opaque" binary
//! encoder, in the style of `rustc_serialize`: every on-disk record the
//! incremental-build core writes goes through these traits instead of a
//! general-purpose format like `bincode`, because the artifact layout is
//! tag-framed and versioned rather than a straight field dump.

pub mod collection_impls;
pub mod opaque;

/// Anything that can write primitive values into a byte stream. Mirrors
/// `rustc_serialize::Encoder`: one method per primitive width, no
/// reflection, no schema beyond what callers encode by hand.
pub trait Encoder {
    type Error;

    fn emit_u8(&mut self, v: u8) -> Result<(), Self::Error>;
    fn emit_u16(&mut self, v: u16) -> Result<(), Self::Error>;
    fn emit_u32(&mut self, v: u32) -> Result<(), Self::Error>;
    fn emit_u64(&mut self, v: u64) -> Result<(), Self::Error>;
    fn emit_usize(&mut self, v: usize) -> Result<(), Self::Error>;
    fn emit_bool(&mut self, v: bool) -> Result<(), Self::Error>;
    fn emit_raw_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Variable-byte-rate encoding: 7 payload bits per byte, high bit set on
    /// every byte but the last. Used for the artifact codec's `vbr13`-style
    /// identifier/index fields without needing a separate type.
    fn emit_vbr(&mut self, mut v: u64) -> Result<(), Self::Error> {
        loop {
            let low7 = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.emit_u8(low7)?;
                return Ok(());
            } else {
                self.emit_u8(low7 | 0x80)?;
            }
        }
    }
}

/// The read-side counterpart of `Encoder`.
pub trait Decoder {
    type Error;

    fn read_u8(&mut self) -> Result<u8, Self::Error>;
    fn read_u16(&mut self) -> Result<u16, Self::Error>;
    fn read_u32(&mut self) -> Result<u32, Self::Error>;
    fn read_u64(&mut self) -> Result<u64, Self::Error>;
    fn read_usize(&mut self) -> Result<usize, Self::Error>;
    fn read_bool(&mut self) -> Result<bool, Self::Error>;
    fn read_raw_bytes(&mut self, len: usize) -> Result<Vec<u8>, Self::Error>;
    fn error(&mut self, msg: &str) -> Self::Error;

    fn read_vbr(&mut self) -> Result<u64, Self::Error> {
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            result |= ((byte & 0x7f) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 64 {
                return Err(self.error("vbr-encoded integer too long"));
            }
        }
    }
}

pub trait Encodable<E: Encoder> {
    fn encode(&self, e: &mut E) -> Result<(), E::Error>;
}

pub trait Decodable<D: Decoder>: Sized {
    fn decode(d: &mut D) -> Result<Self, D::Error>;
}

macro_rules! impl_prim {
    ($($t:ty => $emit:ident, $read:ident);+ $(;)?) => {
        $(
            impl<E: Encoder> Encodable<E> for $t {
                fn encode(&self, e: &mut E) -> Result<(), E::Error> {
                    e.$emit(*self)
                }
            }
            impl<D: Decoder> Decodable<D> for $t {
                fn decode(d: &mut D) -> Result<Self, D::Error> {
                    d.$read()
                }
            }
        )+
    };
}

impl_prim! {
    u8 => emit_u8, read_u8;
    u16 => emit_u16, read_u16;
    u32 => emit_u32, read_u32;
    u64 => emit_u64, read_u64;
    usize => emit_usize, read_usize;
    bool => emit_bool, read_bool;
}

impl<E: Encoder> Encodable<E> for String {
    fn encode(&self, e: &mut E) -> Result<(), E::Error> {
        e.emit_usize(self.len())?;
        e.emit_raw_bytes(self.as_bytes())
    }
}

impl<D: Decoder> Decodable<D> for String {
    fn decode(d: &mut D) -> Result<Self, D::Error> {
        let len = d.read_usize()?;
        let bytes = d.read_raw_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| d.error("invalid utf-8 in decoded string"))
    }
}

impl<E: Encoder, T: Encodable<E>> Encodable<E> for Vec<T> {
    fn encode(&self, e: &mut E) -> Result<(), E::Error> {
        e.emit_usize(self.len())?;
        for item in self {
            item.encode(e)?;
        }
        Ok(())
    }
}

impl<D: Decoder, T: Decodable<D>> Decodable<D> for Vec<T> {
    fn decode(d: &mut D) -> Result<Self, D::Error> {
        let len = d.read_usize()?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(T::decode(d)?);
        }
        Ok(out)
    }
}

impl<E: Encoder, T: Encodable<E>> Encodable<E> for Option<T> {
    fn encode(&self, e: &mut E) -> Result<(), E::Error> {
        match self {
            None => e.emit_bool(false),
            Some(v) => {
                e.emit_bool(true)?;
                v.encode(e)
            }
        }
    }
}

impl<D: Decoder, T: Decodable<D>> Decodable<D> for Option<T> {
    fn decode(d: &mut D) -> Result<Self, D::Error> {
        if d.read_bool()? { Ok(Some(T::decode(d)?)) } else { Ok(None) }
    }
}
