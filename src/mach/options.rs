/// Machine configuration.
#[derive(Debug, Clone)]
pub struct Options {
    /// Undo generations kept; zero disables undo.
    pub undo_levels: usize,
    pub compress_undo: bool,
    /// Treat every warning as a fatal error.
    pub fatal_warnings: bool,
    pub interpreter_number: u8,
    pub interpreter_version: u8,
    /// `None` seeds the random number generator from entropy.
    pub random_seed: Option<i32>,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            undo_levels: 5,
            compress_undo: true,
            fatal_warnings: false,
            interpreter_number: 6,
            interpreter_version: b'Z',
            random_seed: None,
        }
    }
}
