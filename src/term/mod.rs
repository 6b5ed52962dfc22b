extern crate ansi_term;
extern crate ctrlc;
extern crate linefeed;
extern crate mortal;
use crate::mach::{
    CharInput, Event, Host, HostInfo, LineInput, Options, Purpose, Runtime, StatusLine,
    StatusRight,
};
use ansi_term::{Colour, Style};
use clap::Parser;
use linefeed::{DefaultTerminal, Interface, ReadResult, Terminal};
use mortal::{Key, PrepareConfig};
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Play a Z-code story in the terminal
#[derive(Parser)]
#[clap(name = "zcode", version)]
struct Args {
    /// Show warnings
    #[clap(short = 'w', long)]
    warnings: bool,

    /// Treat warnings as fatal errors
    #[clap(short = 'W', long)]
    fatal: bool,

    /// Show debugging output
    #[clap(short, long)]
    verbose: bool,

    /// Seed for the random number generator
    #[clap(long)]
    seed: Option<i32>,

    /// Undo generations to keep
    #[clap(long, default_value = "5")]
    undo: usize,

    /// Directory for saved games, transcripts and command records
    #[clap(long)]
    save_dir: Option<PathBuf>,

    /// The story file
    story: PathBuf,

    /// A saved game to restore before starting
    save: Option<PathBuf>,
}

struct Logger;

static LOGGER: Logger = Logger;

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            log::Level::Error => "ERROR",
            log::Level::Warn => "WARNING",
            log::Level::Info => "INFO",
            log::Level::Debug => "DEBUG",
            log::Level::Trace => "TRACE",
        };
        let line = format!("[ {} - {} ]", level, record.args());
        eprintln!("{}", Style::new().dimmed().paint(line));
    }

    fn flush(&self) {}
}

fn install_logger(args: &Args) {
    let level = if args.verbose {
        log::LevelFilter::Debug
    } else if args.warnings {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Error
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

pub fn main() {
    let args = Args::parse();
    install_logger(&args);
    let interrupted = Arc::new(AtomicBool::new(false));
    let int_moved = interrupted.clone();
    if let Err(error) = ctrlc::set_handler(move || {
        int_moved.store(true, Ordering::SeqCst);
    }) {
        log::warn!("Ctrl-C handler not installed: {}", error);
    }
    if let Err(error) = main_loop(args, interrupted) {
        eprintln!("{}", error);
    }
}

fn main_loop(args: Args, interrupted: Arc<AtomicBool>) -> std::io::Result<()> {
    let mut image = vec![];
    File::open(&args.story)?.read_to_end(&mut image)?;
    let options = Options {
        undo_levels: args.undo,
        fatal_warnings: args.fatal,
        random_seed: args.seed,
        ..Options::default()
    };
    let story_name = args
        .story
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "story".to_string());
    let save_dir = args.save_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut host = TerminalHost::new(story_name, save_dir, interrupted.clone())?;

    let mut runtime = match Runtime::new(image, options, &host) {
        Ok(runtime) => runtime,
        Err(error) => {
            host.report(&error.to_string())?;
            return Ok(());
        }
    };
    if let Some(save) = &args.save {
        let mut bytes = vec![];
        let restored = File::open(save)
            .and_then(|mut file| file.read_to_end(&mut bytes))
            .map_err(|e| e.to_string())
            .and_then(|_| runtime.restore_bytes(&bytes).map_err(|e| e.to_string()));
        if let Err(message) = restored {
            host.report(&message)?;
        }
    }

    loop {
        if interrupted.load(Ordering::SeqCst) {
            break;
        }
        match runtime.execute(&mut host, 5000) {
            Event::Running => {}
            Event::Quit => break,
            Event::Error(error) => {
                host.report(&error.to_string())?;
                break;
            }
        }
    }
    host.flush()
}

/// The lower window of a plain terminal. Upper window text is dropped
/// and the version 3 status line is drawn as a reversed line before
/// each read.
struct TerminalHost {
    interface: Interface<DefaultTerminal>,
    interrupted: Arc<AtomicBool>,
    story_name: String,
    save_dir: PathBuf,
    lines: u8,
    columns: u8,
    window: u16,
    style: u16,
    foreground: Option<Colour>,
    background: Option<Colour>,
    /// Text after the last newline, used as the prompt of the next read.
    pending: String,
}

impl TerminalHost {
    fn new(
        story_name: String,
        save_dir: PathBuf,
        interrupted: Arc<AtomicBool>,
    ) -> std::io::Result<TerminalHost> {
        let interface = Interface::new("zcode")?;
        interface.set_report_signal(linefeed::Signal::Interrupt, true);
        let (lines, columns) = match mortal::Terminal::new().and_then(|t| t.size()) {
            Ok(size) => (size.lines.min(255) as u8, size.columns.min(255) as u8),
            Err(_) => (24, 80),
        };
        Ok(TerminalHost {
            interface,
            interrupted,
            story_name,
            save_dir,
            lines,
            columns,
            window: 0,
            style: 0,
            foreground: None,
            background: None,
            pending: String::new(),
        })
    }

    fn paint(&self) -> Style {
        let mut style = Style::new();
        if self.style & 1 != 0 {
            style = style.reverse();
        }
        if self.style & 2 != 0 {
            style = style.bold();
        }
        if self.style & 4 != 0 {
            style = style.italic();
        }
        if let Some(colour) = self.foreground {
            style = style.fg(colour);
        }
        if let Some(colour) = self.background {
            style = style.on(colour);
        }
        style
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.pending);
        self.interface
            .write_fmt(format_args!("{}", self.paint().paint(text)))
    }

    fn report(&mut self, message: &str) -> std::io::Result<()> {
        self.flush()?;
        self.interface
            .write_fmt(format_args!("\n{}\n", Style::new().bold().paint(message)))
    }

    fn stop(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    fn line(&mut self, initial: &str, timeout: u16) -> std::io::Result<LineInput> {
        let prompt = if self.paint() == Style::new() {
            std::mem::take(&mut self.pending)
        } else {
            self.flush()?;
            String::new()
        };
        self.interface.set_prompt(&prompt)?;
        self.interface.set_buffer(initial)?;
        let deadline = deadline(timeout);
        loop {
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        let partial = abandon_line(&self.interface)?;
                        self.pending = prompt;
                        return Ok(LineInput::TimedOut { partial });
                    }
                    Some(deadline - now)
                }
                None => None,
            };
            match self.interface.read_line_step(wait)? {
                None => continue,
                Some(ReadResult::Input(text)) => {
                    if !text.is_empty() {
                        self.interface.add_history_unique(text.clone());
                    }
                    return Ok(LineInput::Done {
                        text,
                        terminator: 13,
                    });
                }
                Some(ReadResult::Signal(_)) => {
                    self.interface.cancel_read_line()?;
                    self.stop();
                    return Ok(done());
                }
                Some(ReadResult::Eof) => {
                    self.stop();
                    return Ok(done());
                }
            }
        }
    }

    fn key(&mut self, timeout: u16) -> std::io::Result<CharInput> {
        self.flush()?;
        let terminal = mortal::Terminal::new()?;
        let state = terminal.prepare(PrepareConfig::default())?;
        let result = self.wait_key(&terminal, deadline(timeout));
        terminal.restore(state)?;
        result
    }

    fn wait_key(
        &self,
        terminal: &mortal::Terminal,
        deadline: Option<Instant>,
    ) -> std::io::Result<CharInput> {
        loop {
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(CharInput::TimedOut);
                    }
                    Some(deadline - now)
                }
                None => None,
            };
            match terminal.read_event(wait)? {
                Some(mortal::Event::Key(Key::Ctrl('c'))) | Some(mortal::Event::Signal(_)) => {
                    self.stop();
                    return Ok(CharInput::Key(13));
                }
                Some(mortal::Event::Key(key)) => {
                    if let Some(zscii) = zscii_key(key) {
                        return Ok(CharInput::Key(zscii));
                    }
                }
                _ => {}
            }
        }
    }

    fn ask(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        self.flush()?;
        self.interface.set_prompt(prompt)?;
        match self.interface.read_line()? {
            ReadResult::Input(text) => Ok(Some(text.trim().to_string())),
            ReadResult::Signal(_) | ReadResult::Eof => Ok(None),
        }
    }

    fn file_name(&mut self, purpose: Purpose) -> std::io::Result<Option<PathBuf>> {
        let extension = match purpose {
            Purpose::SaveGame => "qzl",
            Purpose::Transcript => "txt",
            Purpose::CommandLog => "rec",
            Purpose::Auxiliary => "aux",
        };
        let default = self
            .save_dir
            .join(format!("{}.{}", self.story_name, extension));
        let prompt = format!("Enter a file name [{}]: ", default.display());
        Ok(match self.ask(&prompt)? {
            Some(name) if name.is_empty() => Some(default),
            Some(name) => Some(self.save_dir.join(name)),
            None => None,
        })
    }

    fn open_read(&mut self, purpose: Purpose) -> std::io::Result<Option<Box<dyn Read>>> {
        let path = match self.file_name(purpose)? {
            Some(path) => path,
            None => return Ok(None),
        };
        Ok(Some(Box::new(File::open(path)?)))
    }

    fn open_write(&mut self, purpose: Purpose) -> std::io::Result<Option<Box<dyn Write>>> {
        let path = match self.file_name(purpose)? {
            Some(path) => path,
            None => return Ok(None),
        };
        if path.exists() {
            match self.ask("Overwrite existing file? ")? {
                Some(answer) if answer.to_lowercase().starts_with('y') => {}
                _ => return Ok(None),
            }
        }
        Ok(Some(Box::new(File::create(path)?)))
    }
}

fn deadline(timeout: u16) -> Option<Instant> {
    match timeout {
        0 => None,
        tenths => Some(Instant::now() + Duration::from_millis(tenths as u64 * 100)),
    }
}

/// Stop a timed out read, keeping what was typed.
fn abandon_line<T: Terminal>(interface: &Interface<T>) -> std::io::Result<String> {
    let partial = interface.buffer();
    interface.cancel_read_line()?;
    Ok(partial)
}

fn done() -> LineInput {
    LineInput::Done {
        text: String::new(),
        terminator: 13,
    }
}

fn zscii_key(key: Key) -> Option<u16> {
    match key {
        Key::Enter => Some(13),
        Key::Backspace | Key::Delete => Some(8),
        Key::Escape => Some(27),
        Key::Tab => Some(9),
        Key::Up => Some(129),
        Key::Down => Some(130),
        Key::Left => Some(131),
        Key::Right => Some(132),
        Key::F(n) if (1..=12).contains(&n) => Some(132 + n as u16),
        Key::Char(ch) if (' '..='~').contains(&ch) => Some(ch as u16),
        Key::Char(_) => Some(b'?' as u16),
        _ => None,
    }
}

fn colour(code: u16, current: Option<Colour>) -> Option<Colour> {
    match code {
        0 => current,
        2 => Some(Colour::Black),
        3 => Some(Colour::Red),
        4 => Some(Colour::Green),
        5 => Some(Colour::Yellow),
        6 => Some(Colour::Blue),
        7 => Some(Colour::Purple),
        8 => Some(Colour::Cyan),
        9 => Some(Colour::White),
        10 => Some(Colour::Fixed(250)),
        11 => Some(Colour::Fixed(244)),
        12 => Some(Colour::Fixed(238)),
        _ => None,
    }
}

impl Host for TerminalHost {
    fn info(&self) -> HostInfo {
        HostInfo {
            lines: self.lines,
            columns: self.columns,
            split_window: false,
            colours: true,
            ..HostInfo::default()
        }
    }

    fn print(&mut self, text: &str) {
        if self.window != 0 {
            return;
        }
        match text.rfind('\n') {
            Some(i) => {
                self.pending.push_str(&text[..=i]);
                if let Err(e) = self.flush() {
                    log::error!("{}", e);
                }
                self.pending.push_str(&text[i + 1..]);
            }
            None => self.pending.push_str(text),
        }
    }

    fn read_line(
        &mut self,
        initial: &str,
        _max_len: usize,
        timeout: u16,
        _terminators: &[u16],
    ) -> LineInput {
        match self.line(initial, timeout) {
            Ok(input) => input,
            Err(e) => {
                log::error!("{}", e);
                self.stop();
                done()
            }
        }
    }

    fn read_char(&mut self, timeout: u16) -> CharInput {
        match self.key(timeout) {
            Ok(input) => input,
            Err(e) => {
                log::error!("{}", e);
                self.stop();
                CharInput::Key(13)
            }
        }
    }

    fn set_style(&mut self, style: u16) {
        if let Err(e) = self.flush() {
            log::error!("{}", e);
        }
        self.style = if style == 0 { 0 } else { self.style | style };
    }

    fn set_colour(&mut self, foreground: u16, background: u16, _window: u16) {
        if let Err(e) = self.flush() {
            log::error!("{}", e);
        }
        self.foreground = colour(foreground, self.foreground);
        self.background = colour(background, self.background);
    }

    fn set_window(&mut self, window: u16) {
        if let Err(e) = self.flush() {
            log::error!("{}", e);
        }
        self.window = window;
    }

    fn show_status(&mut self, status: &StatusLine) {
        let right = match status.right {
            StatusRight::Score { score, moves } => format!("Score: {}  Moves: {}", score, moves),
            StatusRight::Time { hours, minutes } => format!("Time: {}:{:02}", hours, minutes),
        };
        let width = (self.columns as usize).max(right.len() + 2);
        let line = format!(
            " {:<left$}{} ",
            status.location,
            right,
            left = width - right.len() - 2
        );
        let painted = Style::new().reverse().paint(line);
        let result = self
            .flush()
            .and_then(|_| self.interface.write_fmt(format_args!("{}\n", painted)));
        if let Err(e) = result {
            log::error!("{}", e);
        }
    }

    fn open_for_read(&mut self, purpose: Purpose) -> Option<Box<dyn Read>> {
        match self.open_read(purpose) {
            Ok(file) => file,
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        }
    }

    fn open_for_write(&mut self, purpose: Purpose) -> Option<Box<dyn Write>> {
        match self.open_write(purpose) {
            Ok(file) => file,
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        }
    }
}
