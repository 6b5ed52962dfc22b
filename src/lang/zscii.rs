use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// Unicode for ZSCII 155 and up when the story supplies no table.
const DEFAULT_EXTRAS: [u16; 69] = [
    0xe4, 0xf6, 0xfc, 0xc4, 0xd6, 0xdc, 0xdf, 0xbb, 0xab, 0xeb, 0xef, 0xff, 0xcb, 0xcf, 0xe1, 0xe9,
    0xed, 0xf3, 0xfa, 0xfd, 0xc1, 0xc9, 0xcd, 0xd3, 0xda, 0xdd, 0xe0, 0xe8, 0xec, 0xf2, 0xf9, 0xc0,
    0xc8, 0xcc, 0xd2, 0xd9, 0xe2, 0xea, 0xee, 0xf4, 0xfb, 0xc2, 0xca, 0xce, 0xd4, 0xdb, 0xe5, 0xc5,
    0xf8, 0xd8, 0xe3, 0xf1, 0xf5, 0xc3, 0xd1, 0xd5, 0xe6, 0xc6, 0xe7, 0xc7, 0xfe, 0xf0, 0xde, 0xd0,
    0xa3, 0x153, 0x152, 0xa1, 0xbf,
];

const FIRST_EXTRA: u16 = 155;
const MAX_EXTRAS: usize = 97;

/// ## ZSCII to Unicode translation
///
/// Codes 32 to 126 are ASCII. Code 13 is a newline. Codes from 155
/// map through the extra characters table, which a story may replace.

#[derive(Debug, Clone, PartialEq)]
pub struct UnicodeTable {
    extras: Vec<char>,
}

impl Default for UnicodeTable {
    fn default() -> UnicodeTable {
        UnicodeTable {
            extras: DEFAULT_EXTRAS
                .iter()
                .map(|&u| std::char::from_u32(u as u32).unwrap_or('?'))
                .collect(),
        }
    }
}

impl UnicodeTable {
    /// Load a story supplied table: a count byte followed by that many words.
    pub fn from_memory(bytes: &[u8], address: usize) -> Result<UnicodeTable> {
        let count = match bytes.get(address) {
            Some(&count) => count as usize,
            None => return Err(error!(OutOfBounds; "UNICODE TABLE {:#06x}", address)),
        };
        if count > MAX_EXTRAS {
            return Err(error!(CorruptImage; "UNICODE TABLE HAS {} ENTRIES", count));
        }
        let mut extras = Vec::with_capacity(count);
        for i in 0..count {
            let at = address + 1 + 2 * i;
            match (bytes.get(at), bytes.get(at + 1)) {
                (Some(&hi), Some(&lo)) => {
                    let code = (hi as u32) << 8 | lo as u32;
                    extras.push(std::char::from_u32(code).unwrap_or('?'));
                }
                _ => return Err(error!(OutOfBounds; "UNICODE TABLE {:#06x}", at)),
            }
        }
        Ok(UnicodeTable { extras })
    }

    pub fn to_char(&self, zscii: u16) -> Option<char> {
        match zscii {
            9 => Some('\t'),
            11 => Some(' '),
            13 => Some('\n'),
            32..=126 => std::char::from_u32(zscii as u32),
            _ if zscii >= FIRST_EXTRA => {
                self.extras.get((zscii - FIRST_EXTRA) as usize).copied()
            }
            _ => None,
        }
    }

    pub fn from_char(&self, ch: char) -> Option<u16> {
        match ch {
            '\n' | '\r' => Some(13),
            ' '..='~' => Some(ch as u16),
            _ => self
                .extras
                .iter()
                .position(|&c| c == ch)
                .map(|i| FIRST_EXTRA + i as u16),
        }
    }

    /// Characters the story cannot represent become `?`.
    pub fn encode(&self, text: &str) -> Vec<u16> {
        text.chars()
            .map(|ch| self.from_char(ch).unwrap_or(b'?' as u16))
            .collect()
    }

    pub fn decode(&self, zscii: &[u16]) -> String {
        zscii.iter().filter_map(|&z| self.to_char(z)).collect()
    }
}

/// Lower case for ASCII and the accented Latin-1 capitals.
pub fn unicode_to_lower(ch: char) -> char {
    match ch {
        'A'..='Z' => ch.to_ascii_lowercase(),
        '\u{c0}'..='\u{de}' if ch != '\u{d7}' => {
            std::char::from_u32(ch as u32 + 0x20).unwrap_or(ch)
        }
        _ => ch,
    }
}
