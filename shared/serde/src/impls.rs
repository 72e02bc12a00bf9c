use crate::{
    bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr, integer::UnsignedVariableInteger,
    serde::Serde, ConstBitLength,
};

// Primitives

impl Serde for bool {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bit(*self);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        reader.read_bit()
    }

    fn bit_length(&self) -> u32 {
        <Self as ConstBitLength>::const_bit_length()
    }
}

impl ConstBitLength for bool {
    fn const_bit_length() -> u32 {
        1
    }
}

macro_rules! impl_serde_for_unsigned {
    ($type:ty, $bits:expr) => {
        impl Serde for $type {
            fn ser(&self, writer: &mut dyn BitWrite) {
                writer.write_bits(u32::from(*self), $bits);
            }

            fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                let value = reader.read_bits($bits)?;
                <$type>::try_from(value).map_err(|_| SerdeErr)
            }

            fn bit_length(&self) -> u32 {
                <Self as ConstBitLength>::const_bit_length()
            }
        }

        impl ConstBitLength for $type {
            fn const_bit_length() -> u32 {
                $bits
            }
        }
    };
}

impl_serde_for_unsigned!(u8, 8);
impl_serde_for_unsigned!(u16, 16);
impl_serde_for_unsigned!(u32, 32);

impl Serde for u64 {
    fn ser(&self, writer: &mut dyn BitWrite) {
        // low and high halves, each masked to 32 bits
        writer.write_bits((*self & 0xFFFF_FFFF) as u32, 32);
        writer.write_bits((*self >> 32) as u32, 32);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let low = u64::from(reader.read_bits(32)?);
        let high = u64::from(reader.read_bits(32)?);
        Ok(low | (high << 32))
    }

    fn bit_length(&self) -> u32 {
        <Self as ConstBitLength>::const_bit_length()
    }
}

impl ConstBitLength for u64 {
    fn const_bit_length() -> u32 {
        64
    }
}

impl Serde for i32 {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bits(u32::from_le_bytes(self.to_le_bytes()), 32);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let value = reader.read_bits(32)?;
        Ok(i32::from_le_bytes(value.to_le_bytes()))
    }

    fn bit_length(&self) -> u32 {
        <Self as ConstBitLength>::const_bit_length()
    }
}

impl ConstBitLength for i32 {
    fn const_bit_length() -> u32 {
        32
    }
}

// Containers

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            Some(value) => {
                writer.write_bit(true);
                value.ser(writer);
            }
            None => writer.write_bit(false),
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(Some(T::de(reader)?))
        } else {
            Ok(None)
        }
    }

    fn bit_length(&self) -> u32 {
        1 + self.as_ref().map_or(0, Serde::bit_length)
    }
}

fn ser_length(writer: &mut dyn BitWrite, length: usize) {
    UnsignedVariableInteger::<7>::new(i64::try_from(length).unwrap_or(i64::MAX)).ser(writer);
}

/// Reads a collection length, rejecting lengths that could not possibly fit in
/// the rest of the stream
fn de_length(reader: &mut BitReader) -> Result<usize, SerdeErr> {
    let length = UnsignedVariableInteger::<7>::de(reader)?.get();
    let length = usize::try_from(length).map_err(|_| SerdeErr)?;
    if length > reader.bits_remaining() as usize {
        return Err(SerdeErr);
    }
    Ok(length)
}

fn length_bit_length(length: usize) -> u32 {
    UnsignedVariableInteger::<7>::new(i64::try_from(length).unwrap_or(i64::MAX)).bit_length()
}

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        ser_length(writer, self.len());
        for item in self {
            item.ser(writer);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length = de_length(reader)?;
        let mut output = Vec::with_capacity(length);
        for _ in 0..length {
            output.push(T::de(reader)?);
        }
        Ok(output)
    }

    fn bit_length(&self) -> u32 {
        self.iter()
            .fold(length_bit_length(self.len()), |total, item| {
                total.saturating_add(item.bit_length())
            })
    }
}

impl Serde for String {
    fn ser(&self, writer: &mut dyn BitWrite) {
        ser_length(writer, self.len());
        writer.write_bytes(self.as_bytes());
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length = de_length(reader)?;
        let bytes = reader.read_bytes(length)?;
        String::from_utf8(bytes).map_err(|_| SerdeErr)
    }

    fn bit_length(&self) -> u32 {
        let bytes = u32::try_from(self.len()).unwrap_or(u32::MAX);
        length_bit_length(self.len()).saturating_add(bytes.saturating_mul(8))
    }
}
