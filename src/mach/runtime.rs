use super::header::{self, ExtensionField, HeaderField};
use super::input::{self, CharRead, LineRead};
use super::snapshot;
use super::{
    Address, Branch, BranchTarget, CallStack, CharInput, Host, HostInfo, Instruction, LineInput,
    Memory, ObjectTable, Opcode, Operand, OperandCount, Operation, Options, Purpose, Random,
    StatusLine, StatusRight, Streams, Suspended, UndoRing,
};
use crate::error;
use crate::lang::{Alphabet, Codec, Dictionaries, Error, UnicodeTable};
use std::io::{Read, Write};

type Result<T> = std::result::Result<T, Error>;

/// Why `execute` returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Running,
    Quit,
    Error(Error),
}

/// ## The machine
///
/// Owns everything one story needs: memory, the call stack, the text
/// codec, the dictionary cache, random numbers, streams and undo. Any
/// number of machines can run side by side.

pub struct Runtime {
    memory: Memory,
    stack: CallStack,
    pc: Address,
    current: Address,
    objects: ObjectTable,
    globals: Address,
    codec: Codec,
    dictionaries: Dictionaries,
    streams: Streams,
    random: Random,
    undo: UndoRing,
    options: Options,
    info: HostInfo,
    resume: Option<(Suspended, u16)>,
    halted: Option<Event>,
}

fn read_file(host: &mut dyn Host, purpose: Purpose) -> Result<Vec<u8>> {
    let mut file = match host.open_for_read(purpose) {
        Some(file) => file,
        None => return Err(error!(FileUnavailable)),
    };
    let mut bytes = vec![];
    match file.read_to_end(&mut bytes) {
        Ok(_) => Ok(bytes),
        Err(e) => Err(error!(FileUnavailable; "{}", e)),
    }
}

fn write_file(host: &mut dyn Host, purpose: Purpose, bytes: &[u8]) -> bool {
    let mut file = match host.open_for_write(purpose) {
        Some(file) => file,
        None => return false,
    };
    match file.write_all(bytes).and_then(|_| file.flush()) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("write failed: {}", e);
            false
        }
    }
}

impl Runtime {
    pub fn new(image: Vec<u8>, options: Options, host: &dyn Host) -> Result<Runtime> {
        let mut memory = Memory::new(image)?;
        let version = memory.version();
        let info = host.info();
        header::setup(&mut memory, &info, &options)?;
        let codec = Runtime::codec(&memory)?;
        let objects = ObjectTable::new(
            version,
            header::field_word(&memory, HeaderField::ObjectTable)? as Address,
        );
        let globals = header::field_word(&memory, HeaderField::GlobalTable)? as Address;
        let mut random = Random::default();
        match options.random_seed {
            Some(seed) => random.seed(seed),
            None => random.seed_from_entropy(),
        }
        let mut runtime = Runtime {
            memory,
            stack: CallStack::new(),
            pc: 0,
            current: 0,
            objects,
            globals,
            codec,
            dictionaries: Dictionaries::new(),
            streams: Streams::new(),
            random,
            undo: UndoRing::new(options.undo_levels),
            options,
            info,
            resume: None,
            halted: None,
        };
        runtime.start()?;
        log::debug!(
            "version {} story, {} bytes, starts at {:#07x}",
            version,
            runtime.memory.len(),
            runtime.pc
        );
        Ok(runtime)
    }

    fn codec(memory: &Memory) -> Result<Codec> {
        let version = memory.version();
        let alphabet_table = if version >= 5 {
            header::field_word(memory, HeaderField::AlphabetTable)? as Address
        } else {
            0
        };
        let alphabet = match alphabet_table {
            0 => Alphabet::default(),
            at => Alphabet::from_memory(memory.bytes(), at)?,
        };
        let unicode = match header::extension_word(memory, ExtensionField::UnicodeTable)? {
            0 => UnicodeTable::default(),
            at => UnicodeTable::from_memory(memory.bytes(), at as Address)?,
        };
        let abbreviations = header::field_word(memory, HeaderField::AbbreviationsTable)?;
        Ok(Codec::new(version, alphabet, unicode, abbreviations as Address))
    }

    fn start(&mut self) -> Result<()> {
        self.stack.reset();
        let initial = header::field_word(&self.memory, HeaderField::InitialPC)?;
        self.pc = if self.memory.version() == 6 {
            let main = self.memory.unpack_routine(initial);
            self.stack
                .call(&self.memory, main, &[], 0, None, Suspended::None)?
        } else {
            initial as Address
        };
        Ok(())
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.stack
    }

    pub fn pc(&self) -> Address {
        self.pc
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Run at most `cycles` instructions. After `Quit` or an error the
    /// machine stays halted until restarted or restored.
    pub fn execute(&mut self, host: &mut dyn Host, cycles: usize) -> Event {
        if let Some(event) = &self.halted {
            return event.clone();
        }
        for _ in 0..cycles {
            if let Err(error) = self.step(host) {
                let error = error.at_pc(self.current);
                log::error!("{}", error);
                let event = Event::Error(error);
                self.halted = Some(event.clone());
                return event;
            }
            if let Some(event) = &self.halted {
                return event.clone();
            }
        }
        Event::Running
    }

    fn step(&mut self, host: &mut dyn Host) -> Result<()> {
        if let Some((suspended, value)) = self.resume.take() {
            return self.resume_after_timeout(host, suspended, value);
        }
        self.current = self.pc;
        let instruction = Instruction::decode(&self.memory, self.pc)?;
        log::trace!("{}", instruction);
        self.pc = instruction.next;
        self.dispatch(host, &instruction)
    }

    pub fn restart(&mut self, host: &mut dyn Host) -> Result<()> {
        let kept = header::field_word(&self.memory, HeaderField::Flags2)? & 0x0003;
        self.memory.reset();
        self.info = host.info();
        header::setup(&mut self.memory, &self.info, &self.options)?;
        self.keep_flags2(kept)?;
        self.streams.reset_redirection();
        self.dictionaries.clear();
        self.resume = None;
        self.halted = None;
        log::debug!("restart");
        self.start()
    }

    fn keep_flags2(&mut self, kept: u16) -> Result<()> {
        let flags2 = header::field_word(&self.memory, HeaderField::Flags2)?;
        header::set_word(&mut self.memory, HeaderField::Flags2, flags2 & !0x0003 | kept)
    }

    /// Restore from the host's save file.
    pub fn restore(&mut self, host: &mut dyn Host) -> Result<()> {
        let bytes = read_file(host, Purpose::SaveGame)?;
        self.restore_bytes(&bytes)
    }

    /// Restore a snapshot. A rejected snapshot changes nothing.
    pub fn restore_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.apply_snapshot(bytes)?;
        self.halted = None;
        Ok(())
    }

    /// Go back to the newest undo generation.
    pub fn undo(&mut self) -> Result<()> {
        let data = match self.undo.pop() {
            Some(data) => data,
            None => return Err(error!(NothingToUndo)),
        };
        if let Err(error) = self.apply_snapshot(&data) {
            self.undo.unpop(data);
            return Err(error);
        }
        self.halted = None;
        Ok(())
    }

    fn apply_snapshot(&mut self, bytes: &[u8]) -> Result<()> {
        let restored = snapshot::parse(bytes, &self.memory)?;
        let kept = header::field_word(&self.memory, HeaderField::Flags2)? & 0x0003;
        self.memory.set_dynamic(&restored.dynamic)?;
        header::setup(&mut self.memory, &self.info, &self.options)?;
        self.keep_flags2(kept)?;
        self.stack = restored.stack;
        self.resume = None;
        self.dictionaries.clear();
        log::debug!("restored to {:#07x}", restored.pc);
        self.complete_restore(restored.pc)
    }

    /// Finish the instruction that made the snapshot as if it had
    /// just returned 2.
    fn complete_restore(&mut self, result: Address) -> Result<()> {
        if self.memory.version() >= 4 {
            let variable = self.memory.read_byte(result)?;
            self.pc = result + 1;
            return self.write_variable(variable, 2);
        }
        let (branch, len) = Branch::decode(&self.memory, result)?;
        self.pc = result + len;
        if branch.condition {
            self.jump(branch.target(self.pc))?;
        }
        Ok(())
    }

    fn warn(&self, message: &str) -> Result<()> {
        if self.options.fatal_warnings {
            return Err(error!(StrictWarning, self.current; "{}", message));
        }
        log::warn!("{} at ${:05X}", message, self.current);
        Ok(())
    }

    fn warn_if(&self, warning: Option<String>) -> Result<()> {
        match warning {
            Some(message) => self.warn(&message),
            None => Ok(()),
        }
    }

    fn global(&self, variable: u8) -> Address {
        self.globals + 2 * (variable as Address - 16)
    }

    fn read_variable(&mut self, variable: u8) -> Result<u16> {
        match variable {
            0 => self.stack.pop(),
            1..=15 => self.stack.local(variable),
            _ => self.memory.read_word(self.global(variable)),
        }
    }

    fn write_variable(&mut self, variable: u8, value: u16) -> Result<()> {
        match variable {
            0 => self.stack.push(value),
            1..=15 => self.stack.set_local(variable, value),
            _ => self.memory.write_word(self.global(variable), value),
        }
    }

    /// Variables named by an operand use the top of stack in place.
    fn read_indirect(&mut self, variable: u8) -> Result<u16> {
        match variable {
            0 => self.stack.peek(),
            _ => self.read_variable(variable),
        }
    }

    fn write_indirect(&mut self, variable: u8, value: u16) -> Result<()> {
        match variable {
            0 => self.stack.poke(value),
            _ => self.write_variable(variable, value),
        }
    }

    fn operands(&mut self, instruction: &Instruction) -> Result<Vec<u16>> {
        let mut values = Vec::with_capacity(instruction.operands.len());
        for operand in &instruction.operands {
            values.push(match *operand {
                Operand::Large(n) => n,
                Operand::Small(n) => n as u16,
                Operand::Variable(v) => self.read_variable(v)?,
            });
        }
        Ok(values)
    }

    fn store(&mut self, instruction: &Instruction, value: u16) -> Result<()> {
        self.store_to(instruction.store, value)
    }

    fn store_to(&mut self, store: Option<u8>, value: u16) -> Result<()> {
        match store {
            Some(variable) => self.write_variable(variable, value),
            None => Ok(()),
        }
    }

    fn branch(&mut self, instruction: &Instruction, condition: bool) -> Result<()> {
        match instruction.branch {
            Some(branch) if branch.condition == condition => {
                self.jump(branch.target(instruction.next))
            }
            _ => Ok(()),
        }
    }

    fn jump(&mut self, target: BranchTarget) -> Result<()> {
        match target {
            BranchTarget::ReturnFalse => self.ret(0),
            BranchTarget::ReturnTrue => self.ret(1),
            BranchTarget::Address(address) => {
                self.pc = address;
                Ok(())
            }
        }
    }

    /// Save, restore and undo report through a branch in version 3
    /// and a store after that.
    fn outcome(&mut self, instruction: &Instruction, value: u16) -> Result<()> {
        if instruction.store.is_some() {
            self.store(instruction, value)
        } else {
            self.branch(instruction, value != 0)
        }
    }

    fn call(&mut self, routine: u16, arguments: &[u16], store: Option<u8>) -> Result<()> {
        if routine == 0 {
            return self.store_to(store, 0);
        }
        let address = self.memory.unpack_routine(routine);
        self.pc = self
            .stack
            .call(&self.memory, address, arguments, self.pc, store, Suspended::None)?;
        Ok(())
    }

    fn ret(&mut self, value: u16) -> Result<()> {
        let frame = self.stack.ret()?;
        self.pc = frame.return_pc;
        match frame.suspended {
            Suspended::None => {
                if self.memory.version() == 6 && self.stack.depth() == 1 {
                    self.halted = Some(Event::Quit);
                    return Ok(());
                }
                self.store_to(frame.store, value)
            }
            suspended => {
                self.resume = Some((suspended, value));
                Ok(())
            }
        }
    }

    fn print_zscii(&mut self, host: &mut dyn Host, zscii: &[u16]) -> Result<()> {
        self.streams
            .print(&mut self.memory, host, self.codec.unicode(), zscii)
    }

    fn print_str(&mut self, host: &mut dyn Host, text: &str) -> Result<()> {
        let zscii = self.codec.unicode().encode(text);
        self.print_zscii(host, &zscii)
    }

    fn print_at(&mut self, host: &mut dyn Host, address: Address) -> Result<()> {
        let (zscii, _) = self.codec.decode(self.memory.bytes(), address)?;
        self.print_zscii(host, &zscii)
    }

    fn object_name(&self, object: u16) -> Result<String> {
        if self.objects.name_is_empty(&self.memory, object)? {
            return Ok(String::new());
        }
        let address = self.objects.name(&self.memory, object)?;
        let (zscii, _) = self.codec.decode(self.memory.bytes(), address)?;
        Ok(self.codec.unicode().decode(&zscii))
    }

    /// Warns and returns false for object zero.
    fn object_ok(&self, object: u16, operation: Opcode) -> Result<bool> {
        if object == 0 {
            self.warn(&format!("{} with object 0", operation))?;
            return Ok(false);
        }
        Ok(true)
    }

    fn status_line(&self) -> Result<StatusLine> {
        let location = self.memory.read_word(self.global(16))?;
        let location = if location == 0 {
            String::new()
        } else {
            self.object_name(location)?
        };
        let first = self.memory.read_word(self.global(17))?;
        let second = self.memory.read_word(self.global(18))?;
        let right = if header::field_byte(&self.memory, HeaderField::Flags1)? & 0x02 != 0 {
            StatusRight::Time {
                hours: first,
                minutes: second,
            }
        } else {
            StatusRight::Score {
                score: first as i16,
                moves: second,
            }
        };
        Ok(StatusLine { location, right })
    }

    fn show_status(&mut self, host: &mut dyn Host) -> Result<()> {
        if self.memory.version() > 3 {
            return Ok(());
        }
        let status = self.status_line()?;
        host.show_status(&status);
        Ok(())
    }

    fn annotation(&self) -> String {
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M");
        let mut text = format!(
            "zcode {}; version {} story; saved {}",
            env!("CARGO_PKG_VERSION"),
            self.memory.version(),
            stamp
        );
        if self.memory.version() <= 3 {
            match self.status_line().map(|status| status.right) {
                Ok(StatusRight::Score { score, moves }) => {
                    text.push_str(&format!("; score {} in {} moves", score, moves))
                }
                Ok(StatusRight::Time { hours, minutes }) => {
                    text.push_str(&format!("; time {}:{:02}", hours, minutes))
                }
                Err(error) => log::debug!("no status for annotation: {}", error),
            }
        }
        text
    }

    fn write_check(&self, address: Address) -> Result<()> {
        if address < 0x40 && !(0x10..=0x11).contains(&address) {
            self.warn(&format!("write to header byte {:#04x}", address))?;
        }
        Ok(())
    }

    /// A story may start or stop the transcript through flags2.
    fn sync_transcript(&mut self, host: &mut dyn Host) -> Result<()> {
        let on = header::field_word(&self.memory, HeaderField::Flags2)? & 1 != 0;
        if on != self.streams.transcript_on() {
            let number = if on { 2 } else { -2 };
            let warning = self
                .streams
                .select(&mut self.memory, host, number, None, None)?;
            self.warn_if(warning)?;
        }
        Ok(())
    }

    fn record_mouse(&mut self, host: &mut dyn Host) -> Result<()> {
        let (x, y) = host.get_mouse();
        header::set_extension_word(&mut self.memory, ExtensionField::MouseX, x)?;
        header::set_extension_word(&mut self.memory, ExtensionField::MouseY, y)
    }

    fn tokenise(
        &mut self,
        text: Address,
        parse: Address,
        dictionary: Address,
        skip_unknown: bool,
    ) -> Result<()> {
        let zscii = input::read_text(&self.memory, text)?;
        let tokens = self.dictionaries.tokenise(
            self.memory.bytes(),
            &self.codec,
            dictionary,
            self.memory.dynamic_ceiling(),
            &zscii,
        )?;
        let offset = input::text_offset(self.memory.version());
        input::write_tokens(&mut self.memory, parse, &tokens, offset, skip_unknown)
    }

    fn line_read(&mut self, host: &mut dyn Host, read: LineRead) -> Result<()> {
        let version = self.memory.version();
        if version <= 3 {
            self.show_status(host)?;
        }
        let max = input::capacity(&self.memory, read.text)?;
        let initial = if version >= 5 && read.partial.is_empty() {
            let existing = input::read_text(&self.memory, read.text)?;
            self.codec.unicode().decode(&existing)
        } else {
            read.partial.clone()
        };
        let terminators = input::terminators(&self.memory)?;
        let time = if read.routine == 0 { 0 } else { read.time };
        let result = match self.streams.replay_line() {
            Some(line) => {
                host.print(&line);
                host.print("\n");
                LineInput::Done {
                    text: line,
                    terminator: 13,
                }
            }
            None => host.read_line(&initial, max, time, &terminators),
        };
        match result {
            LineInput::Done { text, terminator } => {
                self.finish_line_read(host, &read, &text, terminator)
            }
            LineInput::TimedOut { partial } if read.routine != 0 => {
                log::debug!("line read timed out with {:?}", partial);
                let routine = self.memory.unpack_routine(read.routine);
                let suspended = Suspended::AwaitingTimedLineRead(LineRead { partial, ..read });
                self.pc = self
                    .stack
                    .call(&self.memory, routine, &[], self.pc, None, suspended)?;
                Ok(())
            }
            LineInput::TimedOut { partial } => self.finish_line_read(host, &read, &partial, 0),
        }
    }

    fn finish_line_read(
        &mut self,
        host: &mut dyn Host,
        read: &LineRead,
        text: &str,
        terminator: u16,
    ) -> Result<()> {
        let max = input::capacity(&self.memory, read.text)?;
        let zscii = input::input_zscii(self.codec.unicode(), text, max);
        self.streams.record_input(text);
        input::write_text(&mut self.memory, read.text, &zscii)?;
        if read.parse != 0 {
            let dictionary = header::field_word(&self.memory, HeaderField::Dictionary)?;
            self.tokenise(read.text, read.parse, dictionary as Address, false)?;
        }
        if terminator == 253 || terminator == 254 {
            self.record_mouse(host)?;
        }
        self.store_to(read.store, terminator)
    }

    fn char_read(&mut self, host: &mut dyn Host, read: CharRead) -> Result<()> {
        let time = if read.routine == 0 { 0 } else { read.time };
        match host.read_char(time) {
            CharInput::Key(key) => {
                if key == 253 || key == 254 {
                    self.record_mouse(host)?;
                }
                self.store_to(read.store, key)
            }
            CharInput::TimedOut if read.routine != 0 => {
                let routine = self.memory.unpack_routine(read.routine);
                let suspended = Suspended::AwaitingTimedCharRead(read);
                self.pc = self
                    .stack
                    .call(&self.memory, routine, &[], self.pc, None, suspended)?;
                Ok(())
            }
            CharInput::TimedOut => self.store_to(read.store, 0),
        }
    }

    /// An interrupt routine returned. Non-zero abandons the read,
    /// zero reads again.
    fn resume_after_timeout(
        &mut self,
        host: &mut dyn Host,
        suspended: Suspended,
        value: u16,
    ) -> Result<()> {
        match suspended {
            Suspended::None => Ok(()),
            Suspended::AwaitingTimedLineRead(read) => {
                if value != 0 {
                    log::debug!("line read abandoned by interrupt routine");
                    input::write_text(&mut self.memory, read.text, &[])?;
                    return self.store_to(read.store, 0);
                }
                self.line_read(host, read)
            }
            Suspended::AwaitingTimedCharRead(read) => {
                if value != 0 {
                    return self.store_to(read.store, 0);
                }
                self.char_read(host, read)
            }
        }
    }

    fn save_game(&mut self, host: &mut dyn Host, instruction: &Instruction) -> Result<()> {
        let annotation = self.annotation();
        let data = snapshot::capture(
            &self.memory,
            &self.stack,
            instruction.result,
            false,
            Some(&annotation),
        )?;
        let saved = write_file(host, Purpose::SaveGame, &data);
        if !saved {
            log::warn!("game not saved");
        }
        self.outcome(instruction, saved as u16)
    }

    fn restore_game(&mut self, host: &mut dyn Host, instruction: &Instruction) -> Result<()> {
        let result = read_file(host, Purpose::SaveGame).and_then(|bytes| self.apply_snapshot(&bytes));
        match result {
            Ok(()) => Ok(()),
            Err(error) if !error.is_fatal() => {
                log::warn!("restore failed: {}", error);
                self.outcome(instruction, 0)
            }
            Err(error) => Err(error),
        }
    }

    fn save_auxiliary(&mut self, host: &mut dyn Host, table: u16, bytes: u16) -> Result<u16> {
        let data = self.memory.slice(table as Address, bytes as usize)?.to_vec();
        if write_file(host, Purpose::Auxiliary, &data) {
            Ok(bytes)
        } else {
            Ok(0)
        }
    }

    fn restore_auxiliary(&mut self, host: &mut dyn Host, table: u16, bytes: u16) -> Result<u16> {
        let data = match read_file(host, Purpose::Auxiliary) {
            Ok(data) => data,
            Err(error) => {
                log::warn!("auxiliary restore failed: {}", error);
                return Ok(0);
            }
        };
        let len = data.len().min(bytes as usize);
        for (i, &b) in data[..len].iter().enumerate() {
            self.memory.write_byte(table as Address + i, b)?;
        }
        Ok(len as u16)
    }

    fn save_undo(&mut self, instruction: &Instruction) -> Result<()> {
        let data = snapshot::capture(
            &self.memory,
            &self.stack,
            instruction.result,
            self.options.compress_undo,
            None,
        )?;
        log::debug!("undo generation of {} bytes", data.len());
        let value = if self.undo.push(data) { 1 } else { 0xffff };
        self.store(instruction, value)
    }

    fn restore_undo(&mut self, instruction: &Instruction) -> Result<()> {
        match self.undo() {
            Ok(()) => Ok(()),
            Err(error) if !error.is_fatal() => {
                log::warn!("undo failed: {}", error);
                self.store(instruction, 0)
            }
            Err(error) => Err(error),
        }
    }

    fn random(&mut self, range: u16) -> u16 {
        match range as i16 {
            n if n > 0 => self.random.below(range),
            0 => {
                self.random.seed_from_entropy();
                0
            }
            n => {
                self.random.seed(-(n as i32));
                0
            }
        }
    }

    fn scan_table(&mut self, value: u16, table: u16, len: u16, form: u16) -> Result<u16> {
        let field = (form & 0x7f) as Address;
        if field == 0 {
            self.warn("scan_table with zero field length")?;
            return Ok(0);
        }
        for i in 0..len as Address {
            let at = table as Address + i * field;
            let entry = if form & 0x80 != 0 {
                self.memory.read_word(at)?
            } else {
                self.memory.read_byte(at)? as u16
            };
            if entry == value {
                return Ok(at as u16);
            }
        }
        Ok(0)
    }

    fn copy_table(&mut self, first: u16, second: u16, size: u16) -> Result<()> {
        let len = (size as i16).unsigned_abs() as Address;
        let first = first as Address;
        let second = second as Address;
        if second == 0 {
            for i in 0..len {
                self.memory.write_byte(first + i, 0)?;
            }
        } else if (size as i16) < 0 || first >= second {
            for i in 0..len {
                let b = self.memory.read_byte(first + i)?;
                self.memory.write_byte(second + i, b)?;
            }
        } else {
            let data = self.memory.slice(first, len)?.to_vec();
            for (i, b) in data.into_iter().enumerate() {
                self.memory.write_byte(second + i, b)?;
            }
        }
        Ok(())
    }

    fn print_table(
        &mut self,
        host: &mut dyn Host,
        text: u16,
        width: u16,
        height: u16,
        skip: u16,
    ) -> Result<()> {
        let width = width as Address;
        for row in 0..height as Address {
            if row > 0 {
                self.print_zscii(host, &[13])?;
            }
            let start = text as Address + row * (width + skip as Address);
            let zscii: Vec<u16> = self
                .memory
                .slice(start, width)?
                .iter()
                .map(|&b| b as u16)
                .collect();
            self.print_zscii(host, &zscii)?;
        }
        Ok(())
    }

    fn print_form(&mut self, host: &mut dyn Host, table: u16) -> Result<()> {
        let mut at = table as Address;
        loop {
            let len = self.memory.read_word(at)? as Address;
            if len == 0 {
                return Ok(());
            }
            let zscii: Vec<u16> = self
                .memory
                .slice(at + 2, len)?
                .iter()
                .map(|&b| b as u16)
                .collect();
            self.print_zscii(host, &zscii)?;
            self.print_zscii(host, &[13])?;
            at += 2 + len;
        }
    }

    /// Version 6 user stacks start with a count of free slots.
    fn push_user_stack(&mut self, value: u16, stack: u16) -> Result<bool> {
        let stack = stack as Address;
        let free = self.memory.read_word(stack)?;
        if free == 0 {
            return Ok(false);
        }
        self.memory.write_word(stack + 2 * free as Address, value)?;
        self.memory.write_word(stack, free - 1)?;
        Ok(true)
    }

    fn pull_user_stack(&mut self, stack: u16) -> Result<u16> {
        let stack = stack as Address;
        let free = self.memory.read_word(stack)?.wrapping_add(1);
        let value = self.memory.read_word(stack + 2 * free as Address)?;
        self.memory.write_word(stack, free)?;
        Ok(value)
    }

    fn dispatch(&mut self, host: &mut dyn Host, instruction: &Instruction) -> Result<()> {
        use Opcode::*;
        let ops = self.operands(instruction)?;
        if instruction.count == OperandCount::Op2 && ops.len() < 2 {
            return Err(error!(BadOperands; "{} WITH {} OPERANDS", instruction.opcode, ops.len()));
        }
        let op = |n: usize| ops.get(n).copied().unwrap_or(0);
        let (a, b, c) = (op(0), op(1), op(2));
        let version = self.memory.version();
        match instruction.opcode {
            Je => self.branch(instruction, ops[1..].contains(&a)),
            Jl => self.branch(instruction, Operation::less(a, b)),
            Jg => self.branch(instruction, Operation::greater(a, b)),
            DecChk => {
                let value = self.read_indirect(a as u8)?.wrapping_sub(1);
                self.write_indirect(a as u8, value)?;
                self.branch(instruction, Operation::less(value, b))
            }
            IncChk => {
                let value = self.read_indirect(a as u8)?.wrapping_add(1);
                self.write_indirect(a as u8, value)?;
                self.branch(instruction, Operation::greater(value, b))
            }
            Jin => {
                let inside = self.object_ok(a, Jin)?
                    && self.objects.parent(&self.memory, a)? == b;
                self.branch(instruction, inside)
            }
            Test => self.branch(instruction, a & b == b),
            Or => self.store(instruction, a | b),
            And => self.store(instruction, a & b),
            TestAttr => {
                let set = self.object_ok(a, TestAttr)?
                    && self.objects.test_attribute(&self.memory, a, b)?;
                self.branch(instruction, set)
            }
            SetAttr | ClearAttr => {
                if self.object_ok(a, instruction.opcode)? {
                    let on = instruction.opcode == SetAttr;
                    self.objects.set_attribute(&mut self.memory, a, b, on)?;
                }
                Ok(())
            }
            Store => self.write_indirect(a as u8, b),
            InsertObj => {
                if self.object_ok(a, InsertObj)? && self.object_ok(b, InsertObj)? {
                    self.objects.insert(&mut self.memory, a, b)?;
                }
                Ok(())
            }
            Loadw => {
                let value = self.memory.read_word(a.wrapping_add(b.wrapping_mul(2)) as Address)?;
                self.store(instruction, value)
            }
            Loadb => {
                let value = self.memory.read_byte(a.wrapping_add(b) as Address)?;
                self.store(instruction, value as u16)
            }
            GetProp => {
                let value = if self.object_ok(a, GetProp)? {
                    let (value, len) = self.objects.get_property(&self.memory, a, b)?;
                    if len > 2 {
                        self.warn(&format!("get_prop on {} byte property {} of object {}", len, b, a))?;
                    }
                    value
                } else {
                    0
                };
                self.store(instruction, value)
            }
            GetPropAddr => {
                let value = if self.object_ok(a, GetPropAddr)? {
                    self.objects.property_address(&self.memory, a, b)?
                } else {
                    0
                };
                self.store(instruction, value)
            }
            GetNextProp => {
                let value = if self.object_ok(a, GetNextProp)? {
                    match self.objects.next_property(&self.memory, a, b)? {
                        Some(next) => next,
                        None => {
                            self.warn(&format!("object {} has no property {}", a, b))?;
                            0
                        }
                    }
                } else {
                    0
                };
                self.store(instruction, value)
            }
            Add => self.store(instruction, Operation::add(a, b)),
            Sub => self.store(instruction, Operation::subtract(a, b)),
            Mul => self.store(instruction, Operation::multiply(a, b)),
            Div => self.store(instruction, Operation::divide(a, b)?),
            Mod => self.store(instruction, Operation::modulo(a, b)?),
            Call1s | Call2s | CallVs | CallVs2 => {
                if ops.is_empty() {
                    return Err(error!(BadOperands; "CALL WITHOUT A ROUTINE"));
                }
                self.call(a, &ops[1..], instruction.store)
            }
            Call1n | Call2n | CallVn | CallVn2 => {
                if ops.is_empty() {
                    return Err(error!(BadOperands; "CALL WITHOUT A ROUTINE"));
                }
                self.call(a, &ops[1..], None)
            }
            SetColour => {
                host.set_colour(a, b, c);
                Ok(())
            }
            Throw => {
                self.stack.unwind(b as usize)?;
                self.ret(a)
            }

            Jz => self.branch(instruction, a == 0),
            GetSibling | GetChild => {
                let value = if self.object_ok(a, instruction.opcode)? {
                    if instruction.opcode == GetSibling {
                        self.objects.sibling(&self.memory, a)?
                    } else {
                        self.objects.child(&self.memory, a)?
                    }
                } else {
                    0
                };
                self.store(instruction, value)?;
                self.branch(instruction, value != 0)
            }
            GetParent => {
                let value = if self.object_ok(a, GetParent)? {
                    self.objects.parent(&self.memory, a)?
                } else {
                    0
                };
                self.store(instruction, value)
            }
            GetPropLen => {
                let len = self.objects.property_length(&self.memory, a as Address)?;
                self.store(instruction, len)
            }
            Inc => {
                let value = self.read_indirect(a as u8)?.wrapping_add(1);
                self.write_indirect(a as u8, value)
            }
            Dec => {
                let value = self.read_indirect(a as u8)?.wrapping_sub(1);
                self.write_indirect(a as u8, value)
            }
            PrintAddr => self.print_at(host, a as Address),
            RemoveObj => {
                if self.object_ok(a, RemoveObj)? {
                    self.objects.remove(&mut self.memory, a)?;
                }
                Ok(())
            }
            PrintObj => {
                if self.object_ok(a, PrintObj)? && !self.objects.name_is_empty(&self.memory, a)? {
                    let name = self.objects.name(&self.memory, a)?;
                    self.print_at(host, name)?;
                }
                Ok(())
            }
            Ret => self.ret(a),
            Jump => {
                self.pc = (instruction.next as i64 + a as i16 as i64 - 2) as Address;
                Ok(())
            }
            PrintPaddr => {
                let address = self.memory.unpack_string(a);
                self.print_at(host, address)
            }
            Load => {
                let value = self.read_indirect(a as u8)?;
                self.store(instruction, value)
            }
            Not => self.store(instruction, !a),

            Rtrue => self.ret(1),
            Rfalse => self.ret(0),
            Print | PrintRet => {
                if let Some(text) = instruction.text {
                    self.print_at(host, text)?;
                }
                if instruction.opcode == PrintRet {
                    self.print_zscii(host, &[13])?;
                    self.ret(1)?;
                }
                Ok(())
            }
            Nop => Ok(()),
            Save => {
                if ops.len() >= 2 {
                    let saved = self.save_auxiliary(host, a, b)?;
                    self.store(instruction, saved)
                } else {
                    self.save_game(host, instruction)
                }
            }
            Restore => {
                if ops.len() >= 2 {
                    let restored = self.restore_auxiliary(host, a, b)?;
                    self.store(instruction, restored)
                } else {
                    self.restore_game(host, instruction)
                }
            }
            Restart => self.restart(host),
            RetPopped => {
                let value = self.stack.pop()?;
                self.ret(value)
            }
            Pop => self.stack.pop().map(|_| ()),
            Catch => {
                let depth = self.stack.depth() as u16;
                self.store(instruction, depth)
            }
            Quit => {
                self.halted = Some(Event::Quit);
                Ok(())
            }
            NewLine => self.print_zscii(host, &[13]),
            ShowStatus => self.show_status(host),
            Verify => {
                let expected = header::field_word(&self.memory, HeaderField::Checksum)?;
                self.branch(instruction, self.memory.checksum() == expected)
            }
            Piracy => self.branch(instruction, true),

            Storew => {
                let address = a.wrapping_add(b.wrapping_mul(2)) as Address;
                self.write_check(address)?;
                self.memory.write_word(address, c)?;
                if address == 0x10 {
                    self.sync_transcript(host)?;
                }
                Ok(())
            }
            Storeb => {
                let address = a.wrapping_add(b) as Address;
                self.write_check(address)?;
                self.memory.write_byte(address, c as u8)?;
                if address == 0x11 {
                    self.sync_transcript(host)?;
                }
                Ok(())
            }
            PutProp => {
                if self.object_ok(a, PutProp)?
                    && !self.objects.put_property(&mut self.memory, a, b, c)?
                {
                    self.warn(&format!("put_prop on missing property {} of object {}", b, a))?;
                }
                Ok(())
            }
            Read => {
                let read = LineRead {
                    text: a as Address,
                    parse: b as Address,
                    time: c,
                    routine: op(3),
                    store: instruction.store,
                    partial: String::new(),
                };
                self.line_read(host, read)
            }
            PrintChar => self.print_zscii(host, &[a]),
            PrintNum => self.print_str(host, &(a as i16).to_string()),
            Random => {
                let value = self.random(a);
                self.store(instruction, value)
            }
            Push => self.stack.push(a),
            Pull => {
                if version == 6 {
                    let value = if ops.is_empty() {
                        self.stack.pop()?
                    } else {
                        self.pull_user_stack(a)?
                    };
                    self.store(instruction, value)
                } else {
                    let value = self.stack.pop()?;
                    self.write_indirect(a as u8, value)
                }
            }
            SplitWindow => {
                host.split_window(a);
                Ok(())
            }
            SetWindow => {
                host.set_window(a);
                Ok(())
            }
            EraseWindow => {
                host.erase_window(a as i16);
                Ok(())
            }
            EraseLine => {
                host.erase_line(a);
                Ok(())
            }
            SetCursor => {
                host.set_cursor(a as i16, b, c);
                Ok(())
            }
            GetCursor => {
                let (line, column) = host.get_cursor();
                self.memory.write_word(a as Address, line)?;
                self.memory.write_word(a as Address + 2, column)
            }
            SetTextStyle => {
                host.set_style(a);
                Ok(())
            }
            BufferMode => {
                host.set_buffering(a != 0);
                Ok(())
            }
            OutputStream => {
                let table = ops.get(1).copied();
                let width = if version == 6 {
                    ops.get(2).map(|&w| w as i16)
                } else {
                    None
                };
                let warning = self
                    .streams
                    .select(&mut self.memory, host, a as i16, table, width)?;
                self.warn_if(warning)
            }
            InputStream => {
                let warning = self.streams.select_input(host, a);
                self.warn_if(warning)
            }
            SoundEffect => {
                host.sound_effect(a, b, c);
                Ok(())
            }
            ReadChar => {
                if !ops.is_empty() && a != 1 {
                    self.warn(&format!("read_char from device {}", a))?;
                }
                let read = CharRead {
                    time: b,
                    routine: c,
                    store: instruction.store,
                };
                self.char_read(host, read)
            }
            ScanTable => {
                let form = ops.get(3).copied().unwrap_or(0x82);
                let found = self.scan_table(a, b, c, form)?;
                self.store(instruction, found)?;
                self.branch(instruction, found != 0)
            }
            Tokenise => {
                let dictionary = match c {
                    0 => header::field_word(&self.memory, HeaderField::Dictionary)?,
                    custom => custom,
                };
                self.tokenise(a as Address, b as Address, dictionary as Address, op(3) != 0)
            }
            EncodeText => {
                let zscii: Vec<u16> = self
                    .memory
                    .slice(a as Address + c as Address, b as Address)?
                    .iter()
                    .map(|&byte| byte as u16)
                    .collect();
                let key = self.codec.encode_key(&zscii);
                for (i, byte) in key.into_iter().enumerate() {
                    self.memory.write_byte(op(3) as Address + i, byte)?;
                }
                Ok(())
            }
            CopyTable => self.copy_table(a, b, c),
            PrintTable => {
                let height = if ops.len() > 2 { c } else { 1 };
                self.print_table(host, a, b, height, op(3))
            }
            CheckArgCount => {
                let supplied = self.stack.frame().arguments as u16;
                self.branch(instruction, a <= supplied)
            }

            LogShift => self.store(instruction, Operation::logical_shift(a, b)),
            ArtShift => self.store(instruction, Operation::arithmetic_shift(a, b)),
            SetFont => {
                let previous = host.set_font(a);
                self.store(instruction, previous)
            }
            DrawPicture => {
                host.draw_picture(a, b, c);
                Ok(())
            }
            PictureData => match host.picture_data(a) {
                Some((height, width)) => {
                    self.memory.write_word(b as Address, height)?;
                    self.memory.write_word(b as Address + 2, width)?;
                    self.branch(instruction, true)
                }
                None => self.branch(instruction, false),
            },
            ErasePicture => {
                host.erase_picture(a, b, c);
                Ok(())
            }
            SetMargins => {
                host.set_margins(a, b, c);
                Ok(())
            }
            SaveUndo => self.save_undo(instruction),
            RestoreUndo => self.restore_undo(instruction),
            PrintUnicode => {
                let zscii = std::char::from_u32(a as u32)
                    .and_then(|ch| self.codec.unicode().from_char(ch))
                    .unwrap_or(b'?' as u16);
                self.print_zscii(host, &[zscii])
            }
            CheckUnicode => {
                let support = match std::char::from_u32(a as u32) {
                    Some(ch) => host.check_unicode(ch),
                    None => 0,
                };
                self.store(instruction, support)
            }
            SetTrueColour => {
                host.set_true_colour(a, b, c);
                Ok(())
            }
            MoveWindow => {
                host.move_window(a, b, c);
                Ok(())
            }
            WindowSize => {
                host.window_size(a, b, c);
                Ok(())
            }
            WindowStyle => {
                host.window_style(a, b, c);
                Ok(())
            }
            GetWindProp => {
                let value = host.window_property(a, b);
                self.store(instruction, value)
            }
            ScrollWindow => {
                host.scroll_window(a, b as i16);
                Ok(())
            }
            PopStack => {
                if ops.len() > 1 {
                    let free = self.memory.read_word(b as Address)?;
                    self.memory.write_word(b as Address, free.wrapping_add(a))
                } else {
                    self.stack.pop_n(a as usize)
                }
            }
            ReadMouse => {
                let (x, y) = host.get_mouse();
                self.memory.write_word(a as Address, y)?;
                self.memory.write_word(a as Address + 2, x)?;
                self.memory.write_word(a as Address + 4, 0)?;
                self.memory.write_word(a as Address + 6, 0)
            }
            MouseWindow => {
                host.mouse_window(a);
                Ok(())
            }
            PushStack => {
                let pushed = self.push_user_stack(a, b)?;
                self.branch(instruction, pushed)
            }
            PutWindProp => {
                host.set_window_property(a, b, c);
                Ok(())
            }
            PrintForm => self.print_form(host, a),
            MakeMenu => self.branch(instruction, false),
            PictureTable => Ok(()),
            BufferScreen => self.store(instruction, 0),
        }
    }
}
