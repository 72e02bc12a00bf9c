use crate::{bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr};

/// Written at the end of a packet so that a reader whose interpretation of the
/// stream drifted from the writer's fails instead of accepting garbage.
pub const SERDE_CHECK_VALUE: u32 = 0x1234_5678;

pub fn ser_check(writer: &mut dyn BitWrite) {
    writer.align();
    writer.write_bits(SERDE_CHECK_VALUE, 32);
}

pub fn de_check(reader: &mut BitReader) -> Result<(), SerdeErr> {
    reader.align()?;
    if reader.read_bits(32)? != SERDE_CHECK_VALUE {
        return Err(SerdeErr);
    }
    Ok(())
}
