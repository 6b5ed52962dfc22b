use super::{Address, HostInfo, Memory, Options};
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// Byte offsets of the story header fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeaderField {
    Version = 0x00,
    Flags1 = 0x01,
    Release = 0x02,
    HighMemory = 0x04,
    InitialPC = 0x06,
    Dictionary = 0x08,
    ObjectTable = 0x0a,
    GlobalTable = 0x0c,
    StaticMemory = 0x0e,
    Flags2 = 0x10,
    Serial = 0x12,
    AbbreviationsTable = 0x18,
    FileLength = 0x1a,
    Checksum = 0x1c,
    InterpreterNumber = 0x1e,
    InterpreterVersion = 0x1f,
    ScreenLines = 0x20,
    ScreenColumns = 0x21,
    ScreenWidth = 0x22,
    ScreenHeight = 0x24,
    FontWidth = 0x26,
    FontHeight = 0x27,
    RoutinesOffset = 0x28,
    StringsOffset = 0x2a,
    DefaultBackground = 0x2c,
    DefaultForeground = 0x2d,
    TerminatorTable = 0x2e,
    OutputStream3Width = 0x30,
    Revision = 0x32,
    AlphabetTable = 0x34,
    ExtensionTable = 0x36,
}

/// Word indexes into the header extension table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExtensionField {
    MouseX = 1,
    MouseY = 2,
    UnicodeTable = 3,
    Flags3 = 4,
    TrueForeground = 5,
    TrueBackground = 6,
}

pub fn field_byte(memory: &Memory, field: HeaderField) -> Result<u8> {
    memory.read_byte(field as Address)
}

pub fn field_word(memory: &Memory, field: HeaderField) -> Result<u16> {
    memory.read_word(field as Address)
}

pub fn set_byte(memory: &mut Memory, field: HeaderField, value: u8) -> Result<()> {
    memory.write_byte(field as Address, value)
}

pub fn set_word(memory: &mut Memory, field: HeaderField, value: u16) -> Result<()> {
    memory.write_word(field as Address, value)
}

pub fn serial(memory: &Memory) -> Result<[u8; 6]> {
    let mut serial = [0; 6];
    serial.copy_from_slice(memory.slice(HeaderField::Serial as Address, 6)?);
    Ok(serial)
}

/// Address of the extension table, if the story has a usable one.
fn extension_table(memory: &Memory) -> Result<Option<(Address, usize)>> {
    if memory.version() < 5 {
        return Ok(None);
    }
    let address = field_word(memory, HeaderField::ExtensionTable)? as Address;
    if address == 0 {
        return Ok(None);
    }
    if address + 2 > memory.len() {
        log::warn!("header extension table {:#06x} is outside the story", address);
        return Ok(None);
    }
    let len = memory.read_word(address)? as usize;
    if len > 32 || address + 2 + 2 * len > memory.len() {
        log::warn!("header extension table {:#06x} claims {} words", address, len);
        return Ok(None);
    }
    Ok(Some((address, len)))
}

pub fn extension_word(memory: &Memory, field: ExtensionField) -> Result<u16> {
    match extension_table(memory)? {
        Some((address, len)) if field as usize <= len => {
            memory.read_word(address + 2 * field as usize)
        }
        _ => Ok(0),
    }
}

/// Writes to a missing extension table or field are dropped.
pub fn set_extension_word(memory: &mut Memory, field: ExtensionField, value: u16) -> Result<()> {
    match extension_table(memory)? {
        Some((address, len)) if field as usize <= len => {
            let at = address + 2 * field as usize;
            if at < memory.dynamic_ceiling() {
                memory.write_word(at, value)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Tell the story what this interpreter and its host can do. Runs at
/// start, after restart and after restore.
pub fn setup(memory: &mut Memory, info: &HostInfo, options: &Options) -> Result<()> {
    let version = memory.version();
    let mut flags1 = field_byte(memory, HeaderField::Flags1)?;
    if version <= 3 {
        flags1 &= !(0x10 | 0x20 | 0x40);
        if !info.status_line {
            flags1 |= 0x10;
        }
        if info.split_window {
            flags1 |= 0x20;
        }
    } else {
        flags1 &= 0x40;
        if info.colours {
            flags1 |= 0x01;
        }
        if version == 6 && info.pictures {
            flags1 |= 0x02;
        }
        if info.bold {
            flags1 |= 0x04;
        }
        if info.italic {
            flags1 |= 0x08;
        }
        if info.fixed {
            flags1 |= 0x10;
        }
        if version >= 6 && info.sound {
            flags1 |= 0x20;
        }
        if info.timed_input {
            flags1 |= 0x80;
        }
    }
    set_byte(memory, HeaderField::Flags1, flags1)?;

    let mut flags2 = field_word(memory, HeaderField::Flags2)?;
    if version >= 5 {
        if !info.pictures {
            flags2 &= !0x0008;
        }
        if !info.undo {
            flags2 &= !0x0010;
        }
        if !info.mouse {
            flags2 &= !0x0020;
        }
        if !info.colours {
            flags2 &= !0x0040;
        }
        if !info.sound {
            flags2 &= !0x0080;
        }
        if !info.menus {
            flags2 &= !0x0100;
        }
    }
    set_word(memory, HeaderField::Flags2, flags2)?;

    set_byte(
        memory,
        HeaderField::InterpreterNumber,
        options.interpreter_number,
    )?;
    set_byte(
        memory,
        HeaderField::InterpreterVersion,
        options.interpreter_version,
    )?;
    if version >= 4 {
        set_byte(memory, HeaderField::ScreenLines, info.lines)?;
        set_byte(memory, HeaderField::ScreenColumns, info.columns)?;
    }
    if version >= 5 {
        let (font_width, font_height) = if version == 6 {
            (info.font_width, info.font_height)
        } else {
            (1, 1)
        };
        set_word(
            memory,
            HeaderField::ScreenWidth,
            info.columns as u16 * font_width as u16,
        )?;
        set_word(
            memory,
            HeaderField::ScreenHeight,
            info.lines as u16 * font_height as u16,
        )?;
        // Version 6 swaps the two font size bytes.
        let (width_field, height_field) = if version == 6 {
            (HeaderField::FontHeight, HeaderField::FontWidth)
        } else {
            (HeaderField::FontWidth, HeaderField::FontHeight)
        };
        set_byte(memory, width_field, font_width)?;
        set_byte(memory, height_field, font_height)?;
        set_byte(memory, HeaderField::DefaultBackground, info.background)?;
        set_byte(memory, HeaderField::DefaultForeground, info.foreground)?;
        set_extension_word(
            memory,
            ExtensionField::TrueForeground,
            true_colour(info.foreground),
        )?;
        set_extension_word(
            memory,
            ExtensionField::TrueBackground,
            true_colour(info.background),
        )?;
    }
    set_word(memory, HeaderField::Revision, 0x0101)?;
    Ok(())
}

/// The 15 bit colour of a standard colour number. Anything else is
/// treated as white.
fn true_colour(colour: u8) -> u16 {
    match colour {
        2 => 0x0000,
        3 => 0x001d,
        4 => 0x0340,
        5 => 0x03bd,
        6 => 0x59a0,
        7 => 0x7c1f,
        8 => 0x77a0,
        10 => 0x5ad6,
        11 => 0x4631,
        12 => 0x2d6b,
        _ => 0x7fff,
    }
}
