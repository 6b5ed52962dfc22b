#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Read, Write};
use std::rc::Rc;
use zcode::lang::{Alphabet, Codec, UnicodeTable};
use zcode::mach::{
    Address, CharInput, Event, Host, LineInput, Options, Purpose, Runtime, StatusLine,
};

pub const GLOBALS: Address = 0x100;
pub const OBJECTS: Address = 0x2e0;
pub const TEXT: Address = 0x400;
pub const PARSE: Address = 0x450;
pub const SCRATCH: Address = 0x4a0;
pub const DICTIONARY: Address = 0x500;
pub const CODE: Address = 0x600;
pub const ROUTINE: Address = 0x700;

/// Encode text as a Z-string. Letters and spaces pack directly,
/// anything else goes through the ten bit escape.
pub fn zstring(text: &str) -> Vec<u8> {
    let mut z = vec![];
    for ch in text.chars() {
        match ch {
            ' ' => z.push(0),
            'a'..='z' => z.push(ch as u8 - b'a' + 6),
            'A'..='Z' => {
                z.push(4);
                z.push(ch as u8 - b'A' + 6);
            }
            _ => {
                z.push(5);
                z.push(6);
                z.push(ch as u8 >> 5);
                z.push(ch as u8 & 0x1f);
            }
        }
    }
    while z.is_empty() || z.len() % 3 != 0 {
        z.push(5);
    }
    let words = z.len() / 3;
    let mut out = vec![];
    for (i, t) in z.chunks(3).enumerate() {
        let mut w = (t[0] as u16) << 10 | (t[1] as u16) << 5 | t[2] as u16;
        if i == words - 1 {
            w |= 0x8000;
        }
        out.push((w >> 8) as u8);
        out.push(w as u8);
    }
    out
}

/// `print "text"`
pub fn print(text: &str) -> Vec<u8> {
    let mut out = vec![0xb2];
    out.extend(zstring(text));
    out
}

pub fn packed(version: u8, address: Address) -> u16 {
    match version {
        3 => (address / 2) as u16,
        4 | 5 => (address / 4) as u16,
        _ => (address / 8) as u16,
    }
}

/// A tiny story image: globals, objects, text and parse buffers in
/// dynamic memory, the dictionary opening static memory, code at 0x600.
pub struct Story {
    image: Vec<u8>,
}

impl Story {
    pub fn new(version: u8) -> Story {
        let mut story = Story {
            image: vec![0; 0x900],
        };
        story.image[0] = version;
        story.word(0x02, 7);
        story.word(0x04, CODE as u16);
        story.word(0x06, CODE as u16);
        story.word(0x08, DICTIONARY as u16);
        story.word(0x0a, OBJECTS as u16);
        story.word(0x0c, GLOBALS as u16);
        story.word(0x0e, DICTIONARY as u16);
        story.image[0x12..0x18].copy_from_slice(b"261018");
        story.image[TEXT] = 40;
        story.image[PARSE] = 8;
        story.image[DICTIONARY + 1] = if version <= 3 { 7 } else { 9 };
        story
    }

    fn word(&mut self, address: Address, value: u16) {
        self.image[address] = (value >> 8) as u8;
        self.image[address + 1] = value as u8;
    }

    pub fn at(mut self, address: Address, bytes: &[u8]) -> Story {
        self.image[address..address + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn code(self, bytes: &[u8]) -> Story {
        self.at(CODE, bytes)
    }

    pub fn global(mut self, number: u8, value: u16) -> Story {
        self.word(GLOBALS + 2 * (number as Address - 16), value);
        self
    }

    pub fn dictionary(mut self, separators: &[u8], words: &[&str]) -> Story {
        let version = self.image[0];
        let codec = Codec::new(version, Alphabet::default(), UnicodeTable::default(), 0);
        let mut keys: Vec<Vec<u8>> = words
            .iter()
            .map(|w| codec.encode_key(&UnicodeTable::default().encode(w)))
            .collect();
        keys.sort();
        let mut at = DICTIONARY;
        self.image[at] = separators.len() as u8;
        at += 1;
        self.image[at..at + separators.len()].copy_from_slice(separators);
        at += separators.len();
        let entry_length = keys.first().map(|k| k.len() + 3).unwrap_or(7);
        self.image[at] = entry_length as u8;
        self.word(at + 1, keys.len() as u16);
        at += 3;
        for key in keys {
            self.image[at..at + key.len()].copy_from_slice(&key);
            at += entry_length;
        }
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.image
    }
}

#[derive(Clone, Default)]
pub struct SharedFile(pub Rc<RefCell<Vec<u8>>>);

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Scripted host. Input comes from queues, output and files stay in
/// memory for inspection.
#[derive(Default)]
pub struct TestHost {
    pub output: String,
    pub lines: VecDeque<LineInput>,
    pub keys: VecDeque<CharInput>,
    pub initial: Vec<String>,
    pub timeouts: Vec<u16>,
    pub status: Vec<StatusLine>,
    pub files: HashMap<Purpose, SharedFile>,
}

impl TestHost {
    pub fn new() -> TestHost {
        TestHost::default()
    }

    pub fn line(mut self, text: &str) -> TestHost {
        self.lines.push_back(LineInput::Done {
            text: text.to_string(),
            terminator: 13,
        });
        self
    }

    pub fn timeout(mut self, partial: &str) -> TestHost {
        self.lines.push_back(LineInput::TimedOut {
            partial: partial.to_string(),
        });
        self
    }

    pub fn file(&self, purpose: Purpose) -> Vec<u8> {
        match self.files.get(&purpose) {
            Some(file) => file.0.borrow().clone(),
            None => vec![],
        }
    }

    pub fn set_file(&mut self, purpose: Purpose, bytes: Vec<u8>) {
        self.files
            .insert(purpose, SharedFile(Rc::new(RefCell::new(bytes))));
    }
}

impl Host for TestHost {
    fn print(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn read_line(
        &mut self,
        initial: &str,
        _max_len: usize,
        timeout: u16,
        _terminators: &[u16],
    ) -> LineInput {
        self.initial.push(initial.to_string());
        self.timeouts.push(timeout);
        self.lines.pop_front().unwrap_or(LineInput::Done {
            text: String::new(),
            terminator: 13,
        })
    }

    fn read_char(&mut self, _timeout: u16) -> CharInput {
        self.keys.pop_front().unwrap_or(CharInput::Key(13))
    }

    fn show_status(&mut self, status: &StatusLine) {
        self.status.push(status.clone());
    }

    fn open_for_read(&mut self, purpose: Purpose) -> Option<Box<dyn Read>> {
        let bytes = self.file(purpose);
        if bytes.is_empty() {
            None
        } else {
            Some(Box::new(Cursor::new(bytes)))
        }
    }

    fn open_for_write(&mut self, purpose: Purpose) -> Option<Box<dyn Write>> {
        let file = SharedFile::default();
        self.files.insert(purpose, file.clone());
        Some(Box::new(file))
    }
}

pub fn options() -> Options {
    Options {
        random_seed: Some(1),
        ..Options::default()
    }
}

pub fn start(image: Vec<u8>, host: &TestHost) -> Runtime {
    Runtime::new(image, options(), host).unwrap()
}

/// Run until the story stops, failing the test if it never does.
pub fn exec(runtime: &mut Runtime, host: &mut TestHost) -> Event {
    for _ in 0..100 {
        match runtime.execute(host, 1000) {
            Event::Running => continue,
            event => return event,
        }
    }
    panic!("story did not stop");
}

pub fn run(image: Vec<u8>, host: &mut TestHost) -> (Runtime, Event) {
    let mut runtime = start(image, host);
    let event = exec(&mut runtime, host);
    (runtime, event)
}
