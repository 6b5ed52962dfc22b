use super::{Alphabet, UnicodeTable};
use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Z-string codec
///
/// Z-strings pack three five bit Z-characters into each word. The top
/// bit of a word marks the end of the string. Z-characters 1 to 3 select
/// an abbreviation, 4 and 5 shift the next character into alphabet 1 or 2,
/// and 6 in alphabet 2 starts a ten bit ZSCII literal.

#[derive(Debug, Clone)]
pub struct Codec {
    version: u8,
    alphabet: Alphabet,
    unicode: UnicodeTable,
    abbreviations: usize,
}

enum State {
    Normal,
    Abbreviation(u8),
    EscapeHigh,
    EscapeLow(u16),
}

fn read_word(bytes: &[u8], address: usize) -> Result<u16> {
    match (bytes.get(address), bytes.get(address + 1)) {
        (Some(&hi), Some(&lo)) => Ok((hi as u16) << 8 | lo as u16),
        _ => Err(error!(OutOfBounds; "Z-STRING RUNS PAST {:#06x}", address)),
    }
}

impl Codec {
    pub fn new(
        version: u8,
        alphabet: Alphabet,
        unicode: UnicodeTable,
        abbreviations: usize,
    ) -> Codec {
        Codec {
            version,
            alphabet,
            unicode,
            abbreviations,
        }
    }

    pub fn unicode(&self) -> &UnicodeTable {
        &self.unicode
    }

    /// Decode the Z-string at `address` to ZSCII. Also returns the
    /// number of bytes the encoded string occupies.
    pub fn decode(&self, bytes: &[u8], address: usize) -> Result<(Vec<u16>, usize)> {
        let mut out = Vec::new();
        let len = self.decode_into(bytes, address, false, &mut out)?;
        Ok((out, len))
    }

    fn decode_into(
        &self,
        bytes: &[u8],
        address: usize,
        in_abbreviation: bool,
        out: &mut Vec<u16>,
    ) -> Result<usize> {
        let mut addr = address;
        let mut alphabet = 0;
        let mut state = State::Normal;
        loop {
            let word = read_word(bytes, addr)?;
            addr += 2;
            for shift in &[10, 5, 0] {
                let zchar = ((word >> shift) & 0x1f) as u8;
                state = match state {
                    State::Normal => match zchar {
                        0 => {
                            out.push(32);
                            alphabet = 0;
                            State::Normal
                        }
                        1..=3 => {
                            if in_abbreviation {
                                return Err(error!(BadAbbreviation; "NESTED AT {:#06x}", addr - 2));
                            }
                            State::Abbreviation(zchar)
                        }
                        4 | 5 => {
                            alphabet = (zchar - 3) as usize;
                            State::Normal
                        }
                        6 if alphabet == 2 => {
                            alphabet = 0;
                            State::EscapeHigh
                        }
                        _ => {
                            out.push(self.alphabet.zscii(alphabet, zchar));
                            alphabet = 0;
                            State::Normal
                        }
                    },
                    State::Abbreviation(bank) => {
                        let index = 32 * (bank as usize - 1) + zchar as usize;
                        let entry = read_word(bytes, self.abbreviations + 2 * index)?;
                        self.decode_into(bytes, 2 * entry as usize, true, out)?;
                        alphabet = 0;
                        State::Normal
                    }
                    State::EscapeHigh => State::EscapeLow((zchar as u16) << 5),
                    State::EscapeLow(high) => {
                        out.push(high | zchar as u16);
                        State::Normal
                    }
                };
            }
            if word & 0x8000 != 0 {
                break;
            }
        }
        Ok(addr - address)
    }

    /// Number of Z-characters in a dictionary key.
    pub fn key_zchars(&self) -> usize {
        if self.version <= 3 {
            6
        } else {
            9
        }
    }

    /// Encode ZSCII text as a dictionary key: truncated or padded
    /// with Z-character 5 to the key length, end bit on the last word.
    pub fn encode_key(&self, zscii: &[u16]) -> Vec<u8> {
        let limit = self.key_zchars();
        let mut zchars: Vec<u8> = Vec::with_capacity(limit + 3);
        for &c in zscii {
            if zchars.len() >= limit {
                break;
            }
            if c == 32 {
                zchars.push(0);
                continue;
            }
            match self.alphabet.find(c) {
                Some((0, z)) => zchars.push(z),
                Some((alphabet, z)) => {
                    zchars.push(alphabet as u8 + 3);
                    zchars.push(z);
                }
                None => {
                    zchars.push(5);
                    zchars.push(6);
                    zchars.push(((c >> 5) & 0x1f) as u8);
                    zchars.push((c & 0x1f) as u8);
                }
            }
        }
        zchars.resize(limit, 5);
        let mut out = Vec::with_capacity(limit / 3 * 2);
        for (i, triple) in zchars.chunks(3).enumerate() {
            let mut word =
                (triple[0] as u16) << 10 | (triple[1] as u16) << 5 | triple[2] as u16;
            if i == limit / 3 - 1 {
                word |= 0x8000;
            }
            out.push((word >> 8) as u8);
            out.push(word as u8);
        }
        out
    }
}
