use crate::{constants::MTU_SIZE_BYTES, error::SerdeErr};

/// A sink for bits. Implemented by [`BitWriter`], which stores the bits, and
/// [`BitCounter`], which only measures them, so that one `ser` routine can be
/// used for both writing and dry-run measurement.
pub trait BitWrite {
    fn write_bit(&mut self, bit: bool);

    /// Writes the lowest `bits` bits of `value`, least significant bit first
    fn write_bits(&mut self, value: u32, bits: u8) {
        debug_assert!(bits <= 32);
        for index in 0..bits {
            self.write_bit((value >> index) & 1 != 0);
        }
    }

    fn write_byte(&mut self, byte: u8) {
        self.write_bits(u32::from(byte), 8);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.write_byte(*byte);
        }
    }

    /// Pads with zero bits up to the next byte boundary
    fn align(&mut self) {
        while self.bits_written() % 8 != 0 {
            self.write_bit(false);
        }
    }

    /// Absolute bit position of the stream
    fn bits_written(&self) -> u32;

    fn is_counter(&self) -> bool;

    /// Advances the stream by `bits` without specifying their values. Only
    /// meaningful for counters.
    fn count_bits(&mut self, bits: u32);
}

// BitWriter

/// Writes bits into a buffer bounded by a maximum number of bytes.
///
/// Writing past the bound does not panic: the extra bits are discarded and the
/// writer is marked as overflowed, which makes [`BitWriter::finish`] fail.
pub struct BitWriter {
    buffer: Vec<u8>,
    max_bytes: usize,
    bits_written: u32,
    overflowed: bool,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::with_max_bytes(MTU_SIZE_BYTES)
    }

    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(max_bytes),
            max_bytes,
            bits_written: 0,
            overflowed: false,
        }
    }

    pub fn max_bits(&self) -> u32 {
        u32::try_from(self.max_bytes.saturating_mul(8)).unwrap_or(u32::MAX)
    }

    pub fn bits_free(&self) -> u32 {
        self.max_bits().saturating_sub(self.bits_written)
    }

    pub fn bytes_written(&self) -> usize {
        self.bits_written.div_ceil(8) as usize
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// A counter positioned where this writer currently is, bounded by the
    /// same maximum. Used to check whether something fits before writing it.
    pub fn counter(&self) -> BitCounter {
        BitCounter::starting_at(self.bits_written, self.max_bits())
    }

    /// Returns the written bytes, with the final partial byte zero-padded
    pub fn to_bytes(self) -> Box<[u8]> {
        self.buffer.into_boxed_slice()
    }

    /// Like [`BitWriter::to_bytes`], but fails if anything was written past
    /// the byte bound
    pub fn finish(self) -> Result<Box<[u8]>, SerdeErr> {
        if self.overflowed {
            return Err(SerdeErr);
        }
        Ok(self.to_bytes())
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWrite for BitWriter {
    fn write_bit(&mut self, bit: bool) {
        if self.bits_written >= self.max_bits() {
            self.overflowed = true;
            return;
        }

        let byte_index = (self.bits_written / 8) as usize;
        if byte_index == self.buffer.len() {
            self.buffer.push(0);
        }
        if bit {
            self.buffer[byte_index] |= 1 << (self.bits_written % 8);
        }
        self.bits_written += 1;
    }

    fn bits_written(&self) -> u32 {
        self.bits_written
    }

    fn is_counter(&self) -> bool {
        false
    }

    fn count_bits(&mut self, _bits: u32) {
        debug_assert!(false, "count_bits() is only meaningful on a BitCounter");
    }
}

// BitCounter

/// Measures how many bits a `ser` routine would write, without storing them.
pub struct BitCounter {
    start_bits: u32,
    current_bits: u32,
    max_bits: u32,
}

impl BitCounter {
    pub fn new() -> Self {
        Self::starting_at(0, u32::MAX)
    }

    pub fn starting_at(start_bits: u32, max_bits: u32) -> Self {
        Self {
            start_bits,
            current_bits: start_bits,
            max_bits,
        }
    }

    /// Bits counted since this counter was created
    pub fn bits_needed(&self) -> u32 {
        self.current_bits - self.start_bits
    }

    pub fn overflowed(&self) -> bool {
        self.current_bits > self.max_bits
    }
}

impl Default for BitCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWrite for BitCounter {
    fn write_bit(&mut self, _bit: bool) {
        self.current_bits = self.current_bits.saturating_add(1);
    }

    fn write_bits(&mut self, _value: u32, bits: u8) {
        self.current_bits = self.current_bits.saturating_add(u32::from(bits));
    }

    fn write_byte(&mut self, _byte: u8) {
        self.current_bits = self.current_bits.saturating_add(8);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        let bits = u32::try_from(bytes.len()).unwrap_or(u32::MAX).saturating_mul(8);
        self.current_bits = self.current_bits.saturating_add(bits);
    }

    fn bits_written(&self) -> u32 {
        self.current_bits
    }

    fn is_counter(&self) -> bool {
        true
    }

    fn count_bits(&mut self, bits: u32) {
        self.current_bits = self.current_bits.saturating_add(bits);
    }
}
