use super::header::{self, HeaderField};
use super::{Address, Memory};
use crate::lang::{unicode_to_lower, Error, Token, UnicodeTable};

type Result<T> = std::result::Result<T, Error>;

/// A line read waiting on its interrupt routine.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRead {
    pub text: Address,
    pub parse: Address,
    pub time: u16,
    pub routine: u16,
    pub store: Option<u8>,
    /// What had been typed when the read timed out.
    pub partial: String,
}

/// A character read waiting on its interrupt routine.
#[derive(Debug, Clone, PartialEq)]
pub struct CharRead {
    pub time: u16,
    pub routine: u16,
    pub store: Option<u8>,
}

/// Characters besides newline that finish a line read. 255 in the
/// story's table means every function key.
pub fn terminators(memory: &Memory) -> Result<Vec<u16>> {
    let mut keys = vec![13];
    if memory.version() < 5 {
        return Ok(keys);
    }
    let mut at = header::field_word(memory, HeaderField::TerminatorTable)? as Address;
    if at == 0 {
        return Ok(keys);
    }
    loop {
        match memory.read_byte(at)? {
            0 => break,
            255 => {
                keys.extend(129..=154);
                keys.extend(252..=254);
            }
            key @ 129..=154 | key @ 252..=254 => keys.push(key as u16),
            key => log::warn!("{} is not a terminating character", key),
        }
        at += 1;
    }
    keys.sort_unstable();
    keys.dedup();
    Ok(keys)
}

/// Characters the buffer at `text` has room for.
pub fn capacity(memory: &Memory, text: Address) -> Result<usize> {
    let max = memory.read_byte(text)? as usize;
    if memory.version() <= 4 {
        Ok(max.saturating_sub(1))
    } else {
        Ok(max)
    }
}

/// Offset of the first character within a text buffer.
pub fn text_offset(version: u8) -> usize {
    if version <= 4 {
        1
    } else {
        2
    }
}

/// ZSCII text already in a buffer. Version 5 buffers may arrive with
/// text for the player to edit, and `tokenise` works on them directly.
pub fn read_text(memory: &Memory, text: Address) -> Result<Vec<u16>> {
    let max = capacity(memory, text)?;
    let mut out = vec![];
    if memory.version() <= 4 {
        for i in 0..max {
            match memory.read_byte(text + 1 + i)? {
                0 => break,
                c => out.push(c as u16),
            }
        }
    } else {
        let len = (memory.read_byte(text + 1)? as usize).min(max);
        for i in 0..len {
            out.push(memory.read_byte(text + 2 + i)? as u16);
        }
    }
    Ok(out)
}

pub fn write_text(memory: &mut Memory, text: Address, zscii: &[u16]) -> Result<()> {
    let offset = text_offset(memory.version());
    for (i, &c) in zscii.iter().enumerate() {
        memory.write_byte(text + offset + i, c as u8)?;
    }
    if memory.version() <= 4 {
        memory.write_byte(text + 1 + zscii.len(), 0)
    } else {
        memory.write_byte(text + 1, zscii.len() as u8)
    }
}

/// Lower case the player's text and keep only what a story can
/// receive, at most `max` characters.
pub fn input_zscii(unicode: &UnicodeTable, text: &str, max: usize) -> Vec<u16> {
    text.chars()
        .filter(|ch| !ch.is_control())
        .map(|ch| unicode.from_char(unicode_to_lower(ch)).unwrap_or(b'?' as u16))
        .filter(|&c| (32..=126).contains(&c) || (155..=251).contains(&c))
        .take(max)
        .collect()
}

/// Fill a parse buffer. Positions count from the start of the text
/// buffer and must fit in a byte, so words starting past 255 are
/// dropped along with everything after them. With `skip_unknown`
/// records for unknown words are left alone.
pub fn write_tokens(
    memory: &mut Memory,
    parse: Address,
    tokens: &[Token],
    offset: usize,
    skip_unknown: bool,
) -> Result<()> {
    let max = memory.read_byte(parse)? as usize;
    let fits = tokens
        .iter()
        .take_while(|token| token.start as usize + offset <= 255)
        .count();
    let count = fits.min(max);
    if count < tokens.len() {
        log::debug!("parse buffer holds {} of {} words", count, tokens.len());
    }
    memory.write_byte(parse + 1, count as u8)?;
    for (i, token) in tokens.iter().take(count).enumerate() {
        if skip_unknown && token.address == 0 {
            continue;
        }
        let at = parse + 2 + 4 * i;
        memory.write_word(at, token.address)?;
        memory.write_byte(at + 2, token.length)?;
        memory.write_byte(at + 3, (token.start as usize + offset) as u8)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(version: u8) -> Memory {
        let mut image = vec![0u8; 0x200];
        image[0] = version;
        image[0x0e] = 0x01;
        Memory::new(image).unwrap()
    }

    #[test]
    fn test_text_buffers() {
        let mut m = memory(3);
        m.write_byte(0x40, 6).unwrap();
        write_text(&mut m, 0x40, &[104, 105]).unwrap();
        assert_eq!(m.slice(0x41, 3).unwrap(), b"hi\0");
        assert_eq!(read_text(&m, 0x40).unwrap(), vec![104, 105]);
        assert_eq!(capacity(&m, 0x40).unwrap(), 5);

        let mut m = memory(5);
        m.write_byte(0x40, 6).unwrap();
        write_text(&mut m, 0x40, &[104, 105]).unwrap();
        assert_eq!(m.slice(0x41, 3).unwrap(), b"\x02hi");
        assert_eq!(read_text(&m, 0x40).unwrap(), vec![104, 105]);
        assert_eq!(capacity(&m, 0x40).unwrap(), 6);
    }

    #[test]
    fn test_input_zscii() {
        let u = UnicodeTable::default();
        assert_eq!(input_zscii(&u, "GO Ñorth", 80), u.encode("go ñorth"));
        assert_eq!(input_zscii(&u, "abc\u{7}def", 4), u.encode("abcd"));
    }

    #[test]
    fn test_write_tokens() {
        let mut m = memory(5);
        m.write_byte(0x80, 2).unwrap();
        m.write_word(0x86, 0xbeef).unwrap();
        let tokens = [
            Token {
                address: 0x1234,
                length: 4,
                start: 0,
            },
            Token {
                address: 0,
                length: 3,
                start: 5,
            },
            Token {
                address: 0x5678,
                length: 1,
                start: 9,
            },
        ];
        write_tokens(&mut m, 0x80, &tokens, 2, true).unwrap();
        assert_eq!(m.read_byte(0x81).unwrap(), 2);
        assert_eq!(m.read_word(0x82).unwrap(), 0x1234);
        assert_eq!(m.slice(0x84, 2).unwrap(), &[4, 2]);
        assert_eq!(m.read_word(0x86).unwrap(), 0xbeef);
        write_tokens(&mut m, 0x80, &tokens, 2, false).unwrap();
        assert_eq!(m.read_word(0x86).unwrap(), 0);
        assert_eq!(m.slice(0x88, 2).unwrap(), &[3, 7]);
    }

    #[test]
    fn test_full_buffer_positions() {
        let mut image = vec![0u8; 0x400];
        image[0] = 5;
        image[0x0e] = 0x03;
        let mut m = Memory::new(image).unwrap();
        let (text, parse) = (0x100, 0x240);
        m.write_byte(text, 255).unwrap();
        m.write_byte(parse, 10).unwrap();
        let mut typed = vec![b'a' as u16; 251];
        typed.extend([32, b'b' as u16, 32, b'c' as u16]);
        write_text(&mut m, text, &typed).unwrap();
        assert_eq!(read_text(&m, text).unwrap().len(), 255);

        let tokens = [
            Token { address: 0, length: 251, start: 0 },
            Token { address: 0, length: 1, start: 252 },
            Token { address: 0, length: 1, start: 254 },
        ];
        write_tokens(&mut m, parse, &tokens, 2, false).unwrap();
        assert_eq!(m.read_byte(parse + 1).unwrap(), 2);
        assert_eq!(m.slice(parse + 4, 2).unwrap(), &[251, 2]);
        assert_eq!(m.slice(parse + 8, 2).unwrap(), &[1, 254]);
        assert_eq!(m.read_word(parse + 10).unwrap(), 0);
    }

    #[test]
    fn test_terminators() {
        let mut m = memory(5);
        assert_eq!(terminators(&m).unwrap(), vec![13]);
        m.write_word(0x2e, 0x60).unwrap();
        m.write_byte(0x60, 130).unwrap();
        m.write_byte(0x61, 65).unwrap();
        assert_eq!(terminators(&m).unwrap(), vec![13, 130]);
        m.write_byte(0x61, 255).unwrap();
        assert_eq!(terminators(&m).unwrap().len(), 1 + 26 + 3);
    }
}
