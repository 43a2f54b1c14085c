//! # Bit-Field Access
//!
//! LSB-first bit packing over a byte buffer, matching the C bit-field
//! layout of the original little-endian targets: bit `n` of the packet is
//! bit `n % 8` of byte `n / 8`.

/// One field of a fixed packet layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    /// Bit offset from the start of the payload
    pub offset: usize,
    /// Width in bits (1-32)
    pub width: usize,
}

impl Field {
    pub const fn new(name: &'static str, offset: usize, width: usize) -> Self {
        Self { name, offset, width }
    }

    /// Offset of the first bit after this field
    pub const fn end(&self) -> usize {
        self.offset + self.width
    }
}

/// Read a field as an unsigned code
pub fn get(buffer: &[u8], field: Field) -> u32 {
    let mut value = 0u32;

    for bit in 0..field.width {
        let index = field.offset + bit;
        if (buffer[index / 8] >> (index % 8)) & 1 == 1 {
            value |= 1 << bit;
        }
    }

    value
}

/// Write the low `field.width` bits of `value` into the buffer
pub fn put(buffer: &mut [u8], field: Field, value: u32) {
    for bit in 0..field.width {
        let index = field.offset + bit;
        let byte_index = index / 8;
        let bit_offset = index % 8;

        if (value >> bit) & 1 == 1 {
            buffer[byte_index] |= 1 << bit_offset;
        } else {
            buffer[byte_index] &= !(1 << bit_offset);
        }
    }
}
