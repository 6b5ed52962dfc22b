use super::Codec;
use crate::error;
use crate::lang::Error;
use std::collections::HashMap;

type Result<T> = std::result::Result<T, Error>;

/// One lexeme found by the tokeniser. `start` is the character
/// position within the text, not counting any buffer header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub address: u16,
    pub length: u8,
    pub start: u8,
}

/// ## Story dictionary
///
/// A dictionary is a list of word separators followed by fixed length
/// entries. Each entry begins with an encoded key. A negative entry count
/// means the entries are not sorted.

#[derive(Debug)]
pub struct Dictionary {
    address: usize,
    separators: Vec<u16>,
    entry_length: usize,
    entries: usize,
    count: usize,
    sorted: bool,
    index: HashMap<Vec<u8>, u16>,
}

impl Dictionary {
    pub fn load(bytes: &[u8], address: usize, key_length: usize) -> Result<Dictionary> {
        let get = |at: usize| -> Result<u8> {
            match bytes.get(at) {
                Some(&b) => Ok(b),
                None => Err(error!(OutOfBounds; "DICTIONARY {:#06x}", at)),
            }
        };
        let sep_count = get(address)? as usize;
        let mut separators = Vec::with_capacity(sep_count);
        for i in 0..sep_count {
            separators.push(get(address + 1 + i)? as u16);
        }
        let header = address + 1 + sep_count;
        let entry_length = get(header)? as usize;
        let raw_count = ((get(header + 1)? as u16) << 8 | get(header + 2)? as u16) as i16;
        let entries = header + 3;
        let count = (raw_count as i32).abs() as usize;
        if count > 0 && entry_length < key_length {
            return Err(error!(BadDictionary; "ENTRY LENGTH {} AT {:#06x}", entry_length, address));
        }
        if entries + count * entry_length > bytes.len() {
            return Err(error!(BadDictionary; "{} ENTRIES AT {:#06x}", count, address));
        }
        Ok(Dictionary {
            address,
            separators,
            entry_length,
            entries,
            count,
            sorted: raw_count > 0,
            index: HashMap::new(),
        })
    }

    fn build_index(&mut self, bytes: &[u8], key_length: usize) {
        for i in 0..self.count {
            let at = self.entries + i * self.entry_length;
            self.index
                .entry(bytes[at..at + key_length].to_vec())
                .or_insert(at as u16);
        }
        log::debug!(
            "indexed dictionary at {:#06x}: {} entries",
            self.address,
            self.index.len()
        );
    }

    /// Address of the entry matching `key`, or zero.
    pub fn lookup(&self, bytes: &[u8], key: &[u8]) -> u16 {
        if !self.index.is_empty() {
            return self.index.get(key).copied().unwrap_or(0);
        }
        (0..self.count)
            .map(|i| self.entries + i * self.entry_length)
            .find(|&at| bytes.get(at..at + key.len()) == Some(key))
            .map(|at| at as u16)
            .unwrap_or(0)
    }

    /// Split ZSCII text into words and separators and look each one up.
    pub fn tokenise(&self, bytes: &[u8], codec: &Codec, text: &[u16]) -> Vec<Token> {
        let mut tokens = vec![];
        let mut start = None;
        for (pos, &c) in text.iter().enumerate() {
            let is_separator = self.separators.contains(&c);
            if c == 32 || c == 0 || is_separator {
                if let Some(s) = start.take() {
                    tokens.push(self.token(bytes, codec, text, s, pos));
                }
                if is_separator {
                    tokens.push(self.token(bytes, codec, text, pos, pos + 1));
                }
            } else if start.is_none() {
                start = Some(pos);
            }
        }
        if let Some(s) = start {
            tokens.push(self.token(bytes, codec, text, s, text.len()));
        }
        tokens
    }

    fn token(&self, bytes: &[u8], codec: &Codec, text: &[u16], start: usize, end: usize) -> Token {
        let key = codec.encode_key(&text[start..end]);
        Token {
            address: self.lookup(bytes, &key),
            length: (end - start) as u8,
            start: start as u8,
        }
    }
}

/// Dictionaries seen so far, by address. Sorted dictionaries in static
/// memory are indexed once. Anything else may change under us and is
/// reloaded and scanned on every use.
#[derive(Debug, Default)]
pub struct Dictionaries {
    cache: HashMap<usize, Dictionary>,
}

impl Dictionaries {
    pub fn new() -> Dictionaries {
        Dictionaries::default()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn tokenise(
        &mut self,
        bytes: &[u8],
        codec: &Codec,
        address: usize,
        dynamic_ceiling: usize,
        text: &[u16],
    ) -> Result<Vec<Token>> {
        let key_length = codec.key_zchars() / 3 * 2;
        if let Some(dictionary) = self.cache.get(&address) {
            return Ok(dictionary.tokenise(bytes, codec, text));
        }
        let mut dictionary = Dictionary::load(bytes, address, key_length)?;
        if dictionary.sorted && address >= dynamic_ceiling {
            dictionary.build_index(bytes, key_length);
            let tokens = dictionary.tokenise(bytes, codec, text);
            self.cache.insert(address, dictionary);
            Ok(tokens)
        } else {
            Ok(dictionary.tokenise(bytes, codec, text))
        }
    }
}
