use std::io::{Read, Write};

/// What a file is being opened for. Hosts typically pick a name or
/// directory from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    SaveGame,
    Transcript,
    CommandLog,
    Auxiliary,
}

/// Screen geometry and capabilities reported to the story header.
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub lines: u8,
    pub columns: u8,
    pub font_width: u8,
    pub font_height: u8,
    pub foreground: u8,
    pub background: u8,
    pub status_line: bool,
    pub split_window: bool,
    pub colours: bool,
    pub bold: bool,
    pub italic: bool,
    pub fixed: bool,
    pub pictures: bool,
    pub sound: bool,
    pub timed_input: bool,
    pub mouse: bool,
    pub menus: bool,
    pub undo: bool,
}

impl Default for HostInfo {
    fn default() -> HostInfo {
        HostInfo {
            lines: 24,
            columns: 80,
            font_width: 1,
            font_height: 1,
            foreground: 9,
            background: 2,
            status_line: true,
            split_window: true,
            colours: false,
            bold: true,
            italic: true,
            fixed: true,
            pictures: false,
            sound: false,
            timed_input: true,
            mouse: false,
            menus: false,
            undo: true,
        }
    }
}

/// Result of a line read. A timed out read reports what had been typed.
#[derive(Debug, Clone, PartialEq)]
pub enum LineInput {
    Done { text: String, terminator: u16 },
    TimedOut { partial: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CharInput {
    Key(u16),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusRight {
    Score { score: i16, moves: u16 },
    Time { hours: u16, minutes: u16 },
}

/// The version 3 status line.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub location: String,
    pub right: StatusRight,
}

/// ## The host surface
///
/// Everything the machine needs from the outside world. Only text output
/// and the two kinds of input are required. The rest default to doing
/// nothing or reporting the feature as unavailable.
///
/// Timeouts are in tenths of a second; zero waits forever.

#[allow(unused_variables)]
pub trait Host {
    fn info(&self) -> HostInfo {
        HostInfo::default()
    }

    fn print(&mut self, text: &str);

    fn read_line(
        &mut self,
        initial: &str,
        max_len: usize,
        timeout: u16,
        terminators: &[u16],
    ) -> LineInput;

    fn read_char(&mut self, timeout: u16) -> CharInput;

    fn set_style(&mut self, style: u16) {}
    fn set_colour(&mut self, foreground: u16, background: u16, window: u16) {}
    fn set_true_colour(&mut self, foreground: u16, background: u16, window: u16) {}
    /// Returns the previous font, or zero when `font` is unavailable.
    fn set_font(&mut self, font: u16) -> u16 {
        if font == 1 || font == 0 {
            1
        } else {
            0
        }
    }
    fn set_buffering(&mut self, on: bool) {}
    fn show_status(&mut self, status: &StatusLine) {}
    fn split_window(&mut self, lines: u16) {}
    fn set_window(&mut self, window: u16) {}
    fn erase_window(&mut self, window: i16) {}
    fn erase_line(&mut self, value: u16) {}
    fn set_cursor(&mut self, line: i16, column: u16, window: u16) {}
    fn get_cursor(&self) -> (u16, u16) {
        (1, 1)
    }
    fn get_mouse(&self) -> (u16, u16) {
        (0, 0)
    }
    fn sound_effect(&mut self, number: u16, effect: u16, volume: u16) {}
    /// Bit 0: can print. Bit 1: can be typed.
    fn check_unicode(&self, ch: char) -> u16 {
        3
    }

    fn draw_picture(&mut self, picture: u16, y: u16, x: u16) {}
    /// Height and width of a picture, if the host has it.
    fn picture_data(&self, picture: u16) -> Option<(u16, u16)> {
        None
    }
    fn erase_picture(&mut self, picture: u16, y: u16, x: u16) {}
    fn set_margins(&mut self, left: u16, right: u16, window: u16) {}
    fn move_window(&mut self, window: u16, y: u16, x: u16) {}
    fn window_size(&mut self, window: u16, y: u16, x: u16) {}
    fn window_style(&mut self, window: u16, flags: u16, operation: u16) {}
    fn window_property(&self, window: u16, property: u16) -> u16 {
        0
    }
    fn set_window_property(&mut self, window: u16, property: u16, value: u16) {}
    fn scroll_window(&mut self, window: u16, pixels: i16) {}
    fn mouse_window(&mut self, window: u16) {}

    fn open_for_read(&mut self, purpose: Purpose) -> Option<Box<dyn Read>> {
        None
    }
    fn open_for_write(&mut self, purpose: Purpose) -> Option<Box<dyn Write>> {
        None
    }
}
