use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

const A0: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";
const A1: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const A2: &[u8; 26] = b" \r0123456789.,!?_#'\"/\\-:()";

/// ## The three alphabets of Z-characters 6 to 31
///
/// Entries are ZSCII. Row 2 positions 0 and 1 are always the
/// ten bit escape and newline, whatever a custom table says.

#[derive(Debug, Clone, PartialEq)]
pub struct Alphabet {
    rows: [[u8; 26]; 3],
}

impl Default for Alphabet {
    fn default() -> Alphabet {
        Alphabet {
            rows: [*A0, *A1, *A2],
        }
    }
}

impl Alphabet {
    /// Read the 78 byte table a version 5+ story may point to.
    pub fn from_memory(bytes: &[u8], address: usize) -> Result<Alphabet> {
        let table = match bytes.get(address..address + 78) {
            Some(table) => table,
            None => return Err(error!(OutOfBounds; "ALPHABET TABLE {:#06x}", address)),
        };
        let mut rows = [[0; 26]; 3];
        for (row, chunk) in rows.iter_mut().zip(table.chunks(26)) {
            row.copy_from_slice(chunk);
        }
        rows[2][0] = b' ';
        rows[2][1] = b'\r';
        Ok(Alphabet { rows })
    }

    pub fn zscii(&self, alphabet: usize, zchar: u8) -> u16 {
        debug_assert!((6..32).contains(&zchar));
        self.rows[alphabet % 3][(zchar - 6) as usize] as u16
    }

    /// Find the alphabet and Z-character for a ZSCII code, if it has one.
    pub fn find(&self, zscii: u16) -> Option<(usize, u8)> {
        if zscii == 0 || zscii > 255 {
            return None;
        }
        for (alphabet, row) in self.rows.iter().enumerate() {
            // Skip the escape slot.
            let start = if alphabet == 2 { 1 } else { 0 };
            if let Some(pos) = row[start..].iter().position(|&c| c as u16 == zscii) {
                return Some((alphabet, (pos + start) as u8 + 6));
            }
        }
        None
    }
}
