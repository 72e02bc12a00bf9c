use crate::error::SerdeErr;

/// Reads bits from a received buffer. Every read is checked against the end of
/// the buffer, since the buffer comes off the network.
pub struct BitReader<'b> {
    buffer: &'b [u8],
    bits_read: u32,
}

impl<'b> BitReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            bits_read: 0,
        }
    }

    pub fn total_bits(&self) -> u32 {
        u32::try_from(self.buffer.len().saturating_mul(8)).unwrap_or(u32::MAX)
    }

    pub fn bits_read(&self) -> u32 {
        self.bits_read
    }

    pub fn bytes_read(&self) -> usize {
        self.bits_read.div_ceil(8) as usize
    }

    pub fn bits_remaining(&self) -> u32 {
        self.total_bits() - self.bits_read
    }

    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        if self.bits_read >= self.total_bits() {
            return Err(SerdeErr);
        }
        let byte = self.buffer[(self.bits_read / 8) as usize];
        let bit = (byte >> (self.bits_read % 8)) & 1 != 0;
        self.bits_read += 1;
        Ok(bit)
    }

    /// Reads `bits` bits, least significant bit first
    pub fn read_bits(&mut self, bits: u8) -> Result<u32, SerdeErr> {
        if bits > 32 || u32::from(bits) > self.bits_remaining() {
            return Err(SerdeErr);
        }
        let mut value: u32 = 0;
        for index in 0..bits {
            if self.read_bit()? {
                value |= 1 << index;
            }
        }
        Ok(value)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        // 8 bits always fit into a u8
        Ok(self.read_bits(8)? as u8)
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>, SerdeErr> {
        let needed = length.checked_mul(8).ok_or(SerdeErr)?;
        if needed > self.bits_remaining() as usize {
            return Err(SerdeErr);
        }
        let mut output = Vec::with_capacity(length);
        for _ in 0..length {
            output.push(self.read_byte()?);
        }
        Ok(output)
    }

    /// Skips to the next byte boundary. Padding bits must be zero.
    pub fn align(&mut self) -> Result<(), SerdeErr> {
        while self.bits_read % 8 != 0 {
            if self.read_bit()? {
                return Err(SerdeErr);
            }
        }
        Ok(())
    }
}
