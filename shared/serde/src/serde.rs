use crate::{bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr};

/// A type that can be written to and read from a bit stream.
///
/// `ser` is shared by writing and measuring: passing a `BitCounter` instead of
/// a `BitWriter` yields the exact number of bits `ser` would produce.
pub trait Serde: Sized + Clone + PartialEq {
    fn ser(&self, writer: &mut dyn BitWrite);

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr>;

    fn bit_length(&self) -> u32;
}

/// A type whose serialized size does not depend on its value
pub trait ConstBitLength {
    fn const_bit_length() -> u32;
}
