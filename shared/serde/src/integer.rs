use crate::{
    bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr, serde::Serde, ConstBitLength,
};

pub type UnsignedInteger<const BITS: u8> = SerdeInteger<false, false, BITS>;
pub type SignedInteger<const BITS: u8> = SerdeInteger<true, false, BITS>;
pub type UnsignedVariableInteger<const BITS: u8> = SerdeInteger<false, true, BITS>;
pub type SignedVariableInteger<const BITS: u8> = SerdeInteger<true, true, BITS>;

/// An integer serialized with a fixed or variable number of bits.
///
/// Variable integers are written in groups of `BITS` bits, each preceded by a
/// bit telling whether another group follows. Signed integers carry a leading
/// sign bit followed by the magnitude.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SerdeInteger<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> {
    inner: SerdeIntegerInner,
}

// Non-generic so that the bit twiddling is compiled once, not per instantiation
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
struct SerdeIntegerInner {
    value: i64,
    signed: bool,
    variable: bool,
    bits: u8,
}

impl SerdeIntegerInner {
    fn new(signed: bool, variable: bool, bits: u8, value: i64) -> Self {
        if bits == 0 {
            panic!("can't create an integer with 0 bits...");
        }
        if bits > 32 {
            panic!("can't create an integer with more than 32 bits...");
        }
        if !signed && value < 0 {
            panic!("can't encode a negative number with an Unsigned Integer!");
        }
        if !variable {
            let limit: i64 = 1 << bits;
            if value.unsigned_abs() >= limit.unsigned_abs() {
                panic!("with {} bits, can't encode number {}", bits, value);
            }
        }

        Self {
            value,
            signed,
            variable,
            bits,
        }
    }

    fn magnitude(&self) -> u64 {
        self.value.unsigned_abs()
    }

    fn ser(&self, writer: &mut dyn BitWrite) {
        let mut magnitude = self.magnitude();
        if self.signed {
            writer.write_bit(self.value < 0);
        }

        if !self.variable {
            write_group(writer, magnitude, self.bits);
            return;
        }

        loop {
            let proceed = magnitude >> self.bits != 0;
            writer.write_bit(proceed);
            write_group(writer, magnitude, self.bits);
            magnitude >>= self.bits;
            if !proceed {
                return;
            }
        }
    }

    fn de(
        reader: &mut BitReader,
        signed: bool,
        variable: bool,
        bits: u8,
    ) -> Result<Self, SerdeErr> {
        let negative = if signed { reader.read_bit()? } else { false };

        let magnitude: u64 = if variable {
            let mut output: u128 = 0;
            let mut shift: u32 = 0;
            loop {
                let proceed = reader.read_bit()?;
                let group = u128::from(reader.read_bits(bits)?);
                if shift >= 64 {
                    return Err(SerdeErr);
                }
                output |= group << shift;
                if !proceed {
                    break u64::try_from(output).map_err(|_| SerdeErr)?;
                }
                shift += u32::from(bits);
            }
        } else {
            u64::from(reader.read_bits(bits)?)
        };

        let magnitude = i64::try_from(magnitude).map_err(|_| SerdeErr)?;
        let value = if negative { -magnitude } else { magnitude };
        Ok(Self {
            value,
            signed,
            variable,
            bits,
        })
    }

    fn bit_length(&self) -> u32 {
        let sign = u32::from(self.signed);
        if !self.variable {
            return sign + u32::from(self.bits);
        }

        let mut magnitude = self.magnitude();
        let mut groups: u32 = 1;
        while magnitude >> self.bits != 0 {
            magnitude >>= self.bits;
            groups += 1;
        }
        sign + groups * (1 + u32::from(self.bits))
    }
}

fn write_group(writer: &mut dyn BitWrite, value: u64, bits: u8) {
    let mask = (1u64 << bits) - 1;
    // masked to at most 32 bits
    writer.write_bits((value & mask) as u32, bits);
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8>
    SerdeInteger<SIGNED, VARIABLE, BITS>
{
    pub fn new<T: Into<i64>>(value: T) -> Self {
        Self {
            inner: SerdeIntegerInner::new(SIGNED, VARIABLE, BITS, value.into()),
        }
    }

    pub fn get(&self) -> i64 {
        self.inner.value
    }

    pub fn set<T: Into<i64>>(&mut self, value: T) {
        self.inner = SerdeIntegerInner::new(SIGNED, VARIABLE, BITS, value.into());
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> Serde
    for SerdeInteger<SIGNED, VARIABLE, BITS>
{
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.inner.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let inner = SerdeIntegerInner::de(reader, SIGNED, VARIABLE, BITS)?;
        Ok(Self { inner })
    }

    fn bit_length(&self) -> u32 {
        self.inner.bit_length()
    }
}

impl<const SIGNED: bool, const BITS: u8> ConstBitLength for SerdeInteger<SIGNED, false, BITS> {
    fn const_bit_length() -> u32 {
        u32::from(SIGNED) + u32::from(BITS)
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8, T: Into<i64>> From<T>
    for SerdeInteger<SIGNED, VARIABLE, BITS>
{
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
