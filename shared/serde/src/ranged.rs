use crate::{bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr};

/// Number of bits needed to encode any value in `[min, max]`
pub fn bits_required(min: u32, max: u32) -> u8 {
    if min >= max {
        return 0;
    }
    // at most 32, always fits in a u8
    (32 - (max - min).leading_zeros()) as u8
}

/// Writes `value` relative to `min`, using only as many bits as the range needs
pub fn ser_ranged(writer: &mut dyn BitWrite, value: u32, min: u32, max: u32) {
    debug_assert!(
        min <= value && value <= max,
        "value {} is outside of range [{}, {}]",
        value,
        min,
        max
    );
    writer.write_bits(value.wrapping_sub(min), bits_required(min, max));
}

/// Reads a value written by [`ser_ranged`]. Values the bit width can express
/// but the range excludes are rejected.
pub fn de_ranged(reader: &mut BitReader, min: u32, max: u32) -> Result<u32, SerdeErr> {
    if min > max {
        return Err(SerdeErr);
    }
    let offset = reader.read_bits(bits_required(min, max))?;
    let value = min.checked_add(offset).ok_or(SerdeErr)?;
    if value > max {
        return Err(SerdeErr);
    }
    Ok(value)
}
