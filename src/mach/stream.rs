use super::header::{self, HeaderField};
use super::{Address, Host, Memory, Purpose};
use crate::error;
use crate::lang::{Error, UnicodeTable};
use std::io::{BufRead, BufReader, Write};

type Result<T> = std::result::Result<T, Error>;

const MAX_MEMORY_STREAMS: usize = 16;

/// Text being captured to a table in story memory.
struct MemoryStream {
    table: Address,
    /// Characters per line, when the story asked for reformatting.
    width: Option<usize>,
    /// Length word of the record being written.
    record: Address,
    len: usize,
    line: Vec<u16>,
}

impl MemoryStream {
    fn write_char(&mut self, memory: &mut Memory, zscii: u16) -> Result<()> {
        let byte = if zscii > 255 { b'?' } else { zscii as u8 };
        memory.write_byte(self.record + 2 + self.len, byte)?;
        self.len += 1;
        memory.write_word(self.record, self.len as u16)
    }

    fn next_record(&mut self, memory: &mut Memory) -> Result<()> {
        self.record += 2 + self.len;
        self.len = 0;
        memory.write_word(self.record, 0)
    }

    fn emit_line(&mut self, memory: &mut Memory, line: &[u16]) -> Result<()> {
        for &c in line {
            self.write_char(memory, c)?;
        }
        self.next_record(memory)
    }

    fn print(&mut self, memory: &mut Memory, zscii: &[u16]) -> Result<()> {
        let width = match self.width {
            Some(width) => width,
            None => {
                for &c in zscii {
                    self.write_char(memory, c)?;
                }
                return Ok(());
            }
        };
        for &c in zscii {
            if c == 13 {
                let line = std::mem::take(&mut self.line);
                self.emit_line(memory, &line)?;
                continue;
            }
            self.line.push(c);
            if self.line.len() > width {
                let split = match self.line.iter().rposition(|&c| c == 32) {
                    Some(space) if space > 0 => space,
                    _ => width,
                };
                let rest: Vec<u16> = self.line.split_off(split);
                let line = std::mem::replace(&mut self.line, rest);
                self.emit_line(memory, &line)?;
                if self.line.first() == Some(&32) {
                    self.line.remove(0);
                }
            }
        }
        Ok(())
    }

    fn close(mut self, memory: &mut Memory) -> Result<()> {
        if self.width.is_some() {
            if !self.line.is_empty() {
                let line = std::mem::take(&mut self.line);
                self.emit_line(memory, &line)?;
            }
            memory.write_word(self.record, 0)?;
        }
        log::debug!("closed memory stream at {:#06x}", self.table);
        Ok(())
    }
}

/// ## Output and input streams
///
/// Stream 1 is the screen, 2 the transcript, 3 redirection into a table
/// in memory and 4 a record of player commands. While a memory stream is
/// open nothing else sees printed text. Input stream 1 replays a command
/// record.

pub struct Streams {
    screen: bool,
    transcript: Option<Box<dyn Write>>,
    transcript_on: bool,
    commands: Option<Box<dyn Write>>,
    commands_on: bool,
    memory: Vec<MemoryStream>,
    replay: Option<Box<dyn BufRead>>,
}

impl Default for Streams {
    fn default() -> Streams {
        Streams::new()
    }
}

impl Streams {
    pub fn new() -> Streams {
        Streams {
            screen: true,
            transcript: None,
            transcript_on: false,
            commands: None,
            commands_on: false,
            memory: vec![],
            replay: None,
        }
    }

    /// Drop memory streams and input replay and show the screen again.
    /// The transcript and command record carry on.
    pub fn reset_redirection(&mut self) {
        self.screen = true;
        self.memory.clear();
        self.replay = None;
    }

    pub fn transcript_on(&self) -> bool {
        self.transcript_on
    }

    pub fn is_redirected(&self) -> bool {
        !self.memory.is_empty()
    }

    /// The `output_stream` operation. A harmless mistake by the story
    /// comes back as a warning for the caller to report.
    pub fn select(
        &mut self,
        memory: &mut Memory,
        host: &mut dyn Host,
        number: i16,
        table: Option<u16>,
        width: Option<i16>,
    ) -> Result<Option<String>> {
        let mut warning = None;
        match number {
            0 => {}
            1 => self.screen = true,
            -1 => self.screen = false,
            2 => self.transcript_on = self.open_transcript(host),
            -2 => self.transcript_on = false,
            3 => {
                if self.memory.len() >= MAX_MEMORY_STREAMS {
                    return Err(error!(BadStream; "MORE THAN {} MEMORY STREAMS", MAX_MEMORY_STREAMS));
                }
                let table = match table {
                    Some(table) => table as Address,
                    None => return Err(error!(BadOperands; "STREAM 3 WITHOUT A TABLE")),
                };
                memory.write_word(table, 0)?;
                let width = width.map(|w| w.unsigned_abs() as usize).filter(|&w| w > 0);
                self.memory.push(MemoryStream {
                    table,
                    width,
                    record: table,
                    len: 0,
                    line: vec![],
                });
            }
            -3 => match self.memory.pop() {
                Some(stream) => stream.close(memory)?,
                None => warning = Some("closing memory stream when none is open".to_string()),
            },
            4 => {
                if self.commands.is_none() {
                    self.commands = host.open_for_write(Purpose::CommandLog);
                }
                self.commands_on = self.commands.is_some();
                if !self.commands_on {
                    log::warn!("command record could not be opened");
                }
            }
            -4 => self.commands_on = false,
            _ => warning = Some(format!("output stream {} does not exist", number)),
        }
        if number.abs() == 2 {
            let flags2 = header::field_word(memory, HeaderField::Flags2)?;
            let flags2 = if self.transcript_on {
                flags2 | 1
            } else {
                flags2 & !1
            };
            header::set_word(memory, HeaderField::Flags2, flags2)?;
        }
        Ok(warning)
    }

    fn open_transcript(&mut self, host: &mut dyn Host) -> bool {
        if self.transcript.is_some() {
            return true;
        }
        let mut file = match host.open_for_write(Purpose::Transcript) {
            Some(file) => file,
            None => {
                log::warn!("transcript could not be opened");
                return false;
            }
        };
        let stamp = chrono::Local::now().format("%a %b %e %H:%M:%S %Y");
        if writeln!(file, "*** Transcript generated {} ***\n", stamp).is_err() {
            log::warn!("transcript could not be written");
            return false;
        }
        self.transcript = Some(file);
        true
    }

    fn write_transcript(&mut self, text: &str) {
        if !self.transcript_on {
            return;
        }
        if let Some(file) = self.transcript.as_mut() {
            if file.write_all(text.as_bytes()).is_err() {
                log::warn!("transcript write failed, transcript closed");
                self.transcript = None;
                self.transcript_on = false;
            }
        }
    }

    pub fn print(
        &mut self,
        memory: &mut Memory,
        host: &mut dyn Host,
        unicode: &UnicodeTable,
        zscii: &[u16],
    ) -> Result<()> {
        if let Some(stream) = self.memory.last_mut() {
            return stream.print(memory, zscii);
        }
        let text = unicode.decode(zscii);
        if self.screen {
            host.print(&text);
        }
        self.write_transcript(&text);
        Ok(())
    }

    /// A line the player typed, for the transcript and command record.
    pub fn record_input(&mut self, text: &str) {
        if self.is_redirected() {
            return;
        }
        self.write_transcript(text);
        self.write_transcript("\n");
        if self.commands_on {
            if let Some(file) = self.commands.as_mut() {
                if writeln!(file, "{}", text).is_err() {
                    log::warn!("command record write failed, record closed");
                    self.commands = None;
                    self.commands_on = false;
                }
            }
        }
    }

    /// The `input_stream` operation. Returns a warning for a stream
    /// that does not exist.
    pub fn select_input(&mut self, host: &mut dyn Host, number: u16) -> Option<String> {
        match number {
            0 => self.replay = None,
            1 => match host.open_for_read(Purpose::CommandLog) {
                Some(file) => self.replay = Some(Box::new(BufReader::new(file))),
                None => log::warn!("command file could not be opened"),
            },
            _ => return Some(format!("input stream {} does not exist", number)),
        }
        None
    }

    /// Next replayed command, if replay is on and has lines left.
    pub fn replay_line(&mut self) -> Option<String> {
        let reader = self.replay.as_mut()?;
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(n) if n > 0 => Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()),
            _ => {
                self.replay = None;
                None
            }
        }
    }
}
