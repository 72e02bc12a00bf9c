/// Default byte bound of a [`crate::BitWriter`] created with `BitWriter::new()`
pub const MTU_SIZE_BYTES: usize = 1200;
pub const MTU_SIZE_BITS: u32 = (MTU_SIZE_BYTES as u32) * 8;
