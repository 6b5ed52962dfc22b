use super::Address;
use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Story memory
///
/// Dynamic memory runs from zero to the dynamic ceiling and is the only
/// writable region. Static memory continues to the lesser of the image
/// length and 64K. Everything past the dynamic ceiling is readable.
/// A pristine copy of the image is kept for restart, verify and
/// compressed snapshots.

#[derive(Debug, Clone)]
pub struct Memory {
    bytes: Vec<u8>,
    pristine: Vec<u8>,
    version: u8,
    dynamic_ceiling: usize,
    routine_offset: usize,
    string_offset: usize,
}

impl Memory {
    pub fn new(image: Vec<u8>) -> Result<Memory> {
        if image.len() < 64 {
            return Err(error!(CorruptImage; "IMAGE IS {} BYTES", image.len()));
        }
        let version = image[0];
        if !(3..=8).contains(&version) {
            return Err(error!(UnsupportedVersion; "VERSION {}", version));
        }
        let word = |at: usize| (image[at] as usize) << 8 | image[at + 1] as usize;
        let dynamic_ceiling = word(0x0e);
        let static_ceiling = image.len().min(0x10000);
        if dynamic_ceiling < 64 || dynamic_ceiling > static_ceiling {
            return Err(error!(CorruptImage; "DYNAMIC MEMORY ENDS AT {:#06x}", dynamic_ceiling));
        }
        let (routine_offset, string_offset) = match version {
            6 | 7 => (word(0x28), word(0x2a)),
            _ => (0, 0),
        };
        Ok(Memory {
            pristine: image.clone(),
            bytes: image,
            version,
            dynamic_ceiling,
            routine_offset,
            string_offset,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn dynamic_ceiling(&self) -> Address {
        self.dynamic_ceiling
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn dynamic(&self) -> &[u8] {
        &self.bytes[..self.dynamic_ceiling]
    }

    pub fn pristine(&self) -> &[u8] {
        &self.pristine
    }

    pub fn pristine_dynamic(&self) -> &[u8] {
        &self.pristine[..self.dynamic_ceiling]
    }

    fn out_of_bounds(&self, address: Address) -> Error {
        error!(OutOfBounds; "{:#07x} OF {:#07x}", address, self.bytes.len())
    }

    pub fn read_byte(&self, address: Address) -> Result<u8> {
        match self.bytes.get(address) {
            Some(&b) => Ok(b),
            None => Err(self.out_of_bounds(address)),
        }
    }

    pub fn read_word(&self, address: Address) -> Result<u16> {
        match self.bytes.get(address..address + 2) {
            Some(w) => Ok((w[0] as u16) << 8 | w[1] as u16),
            None => Err(self.out_of_bounds(address)),
        }
    }

    pub fn slice(&self, address: Address, len: usize) -> Result<&[u8]> {
        match self.bytes.get(address..address + len) {
            Some(s) => Ok(s),
            None => Err(self.out_of_bounds(address + len)),
        }
    }

    fn write_check(&self, address: Address) -> Result<()> {
        if address >= self.bytes.len() {
            Err(self.out_of_bounds(address))
        } else if address >= self.dynamic_ceiling {
            Err(error!(WriteToStatic; "{:#07x}", address))
        } else {
            Ok(())
        }
    }

    pub fn write_byte(&mut self, address: Address, value: u8) -> Result<()> {
        self.write_check(address)?;
        self.bytes[address] = value;
        Ok(())
    }

    pub fn write_word(&mut self, address: Address, value: u16) -> Result<()> {
        self.write_check(address)?;
        self.write_check(address + 1)?;
        self.bytes[address] = (value >> 8) as u8;
        self.bytes[address + 1] = value as u8;
        Ok(())
    }

    pub fn unpack_routine(&self, packed: u16) -> Address {
        self.unpack(packed, self.routine_offset)
    }

    pub fn unpack_string(&self, packed: u16) -> Address {
        self.unpack(packed, self.string_offset)
    }

    fn unpack(&self, packed: u16, offset: usize) -> Address {
        let packed = packed as usize;
        match self.version {
            1..=3 => 2 * packed,
            4 | 5 => 4 * packed,
            6 | 7 => 4 * packed + 8 * offset,
            _ => 8 * packed,
        }
    }

    /// Replace dynamic memory with `data`, which must be exactly its size.
    pub fn set_dynamic(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != self.dynamic_ceiling {
            return Err(error!(InternalError; "DYNAMIC MEMORY SIZE {}", data.len()));
        }
        self.bytes[..self.dynamic_ceiling].copy_from_slice(data);
        Ok(())
    }

    /// Back to the dynamic memory the story started with.
    pub fn reset(&mut self) {
        let ceiling = self.dynamic_ceiling;
        self.bytes[..ceiling].copy_from_slice(&self.pristine[..ceiling]);
    }

    /// File length from the header, scaled by version.
    pub fn file_length(&self) -> usize {
        let raw = (self.pristine[0x1a] as usize) << 8 | self.pristine[0x1b] as usize;
        let scale = match self.version {
            1..=3 => 2,
            4 | 5 => 4,
            _ => 8,
        };
        match raw * scale {
            0 => self.pristine.len(),
            len => len.min(self.pristine.len()),
        }
    }

    /// Sum of the pristine image bytes past the header.
    pub fn checksum(&self) -> u16 {
        self.pristine[0x40..self.file_length().max(0x40)]
            .iter()
            .fold(0u16, |sum, &b| sum.wrapping_add(b as u16))
    }
}
