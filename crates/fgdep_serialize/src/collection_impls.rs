//! `Encodable`/`Decodable` for the collection types used by the dependency
//! graph beyond plain `Vec` (defined in the crate root).

use crate::{Decodable, Decoder, Encodable, Encoder};
use smallvec::{Array, SmallVec};

impl<E: Encoder, A: Array> Encodable<E> for SmallVec<A>
where
    A::Item: Encodable<E>,
{
    fn encode(&self, e: &mut E) -> Result<(), E::Error> {
        let slice: &[A::Item] = self;
        e.emit_usize(slice.len())?;
        for item in slice {
            item.encode(e)?;
        }
        Ok(())
    }
}

impl<D: Decoder, A: Array> Decodable<D> for SmallVec<A>
where
    A::Item: Decodable<D>,
{
    fn decode(d: &mut D) -> Result<Self, D::Error> {
        let len = d.read_usize()?;
        let mut out = SmallVec::with_capacity(len);
        for _ in 0..len {
            out.push(Decodable::decode(d)?);
        }
        Ok(out)
    }
}
