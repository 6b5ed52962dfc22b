#[derive(Clone, PartialEq)]
pub struct Error {
    code: u16,
    pc: Option<usize>,
    message: String,
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($err:ident) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
    };
    ($err:ident, $pc:expr; $($msg:tt)+) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
            .at_pc($pc)
            .message(&format!($($msg)+))
    };
    ($err:ident, $pc:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).at_pc($pc)
    };
    ($err:ident; $($msg:tt)+) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).message(&format!($($msg)+))
    };
}

impl Error {
    pub fn new(code: ErrorCode) -> Error {
        Error {
            code: code as u16,
            pc: None,
            message: String::new(),
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code as u16
    }

    /// Fatal errors halt the machine. The rest are reported
    /// to the running program as a failed save, restore or undo.
    pub fn is_fatal(&self) -> bool {
        self.code < 60
    }

    pub fn pc(&self) -> Option<usize> {
        self.pc
    }

    /// Attach the address of the failing instruction. An error
    /// already carrying one keeps it.
    pub fn at_pc(self, pc: usize) -> Error {
        Error {
            pc: self.pc.or(Some(pc)),
            ..self
        }
    }

    pub fn message(self, message: &str) -> Error {
        debug_assert_eq!(self.message.len(), 0);
        Error {
            message: message.to_string(),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorCode {
    CorruptImage = 1,
    UnsupportedVersion = 2,
    OutOfBounds = 3,
    WriteToStatic = 4,
    StackUnderflow = 5,
    StackOverflow = 6,
    UnknownOpcode = 7,
    BadOperands = 8,
    BadVariable = 9,
    BadDictionary = 10,
    BadAbbreviation = 11,
    DivisionByZero = 12,
    BadStream = 13,
    StrictWarning = 14,
    InternalError = 51,
    NotQuetzal = 60,
    Truncated = 61,
    MissingChunk = 62,
    WrongStory = 63,
    CorruptSnapshot = 64,
    FileUnavailable = 65,
    NothingToUndo = 66,
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error {{ {} }}", self.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let code_str = match self.code {
            1 => "CORRUPT STORY FILE",
            2 => "UNSUPPORTED VERSION",
            3 => "ADDRESS OUT OF BOUNDS",
            4 => "WRITE TO STATIC MEMORY",
            5 => "STACK UNDERFLOW",
            6 => "STACK OVERFLOW",
            7 => "UNKNOWN OPCODE",
            8 => "BAD OPERANDS",
            9 => "BAD VARIABLE",
            10 => "BAD DICTIONARY",
            11 => "BAD ABBREVIATION",
            12 => "DIVISION BY ZERO",
            13 => "BAD OUTPUT STREAM",
            14 => "WARNING",
            51 => "INTERNAL ERROR",
            60 => "NOT A SAVE FILE",
            61 => "TRUNCATED SAVE FILE",
            62 => "MISSING CHUNK",
            63 => "SAVE FILE IS FOR ANOTHER STORY",
            64 => "CORRUPT SAVE FILE",
            65 => "FILE NOT AVAILABLE",
            66 => "NOTHING TO UNDO",
            _ => "",
        };
        let mut suffix = String::new();
        if let Some(pc) = self.pc {
            suffix.push_str(&format!(" ${:05X}", pc));
        }
        if !self.message.is_empty() {
            suffix.push_str(&format!("; {}", self.message));
        }
        if code_str.is_empty() {
            if suffix.is_empty() {
                write!(f, "MACHINE ERROR {}", self.code)
            } else {
                write!(f, "MACHINE ERROR {} AT{}", self.code, suffix)
            }
        } else if suffix.is_empty() {
            write!(f, "{}", code_str)
        } else if self.pc.is_some() {
            write!(f, "{} AT{}", code_str, suffix)
        } else {
            write!(f, "{}{}", code_str, suffix)
        }
    }
}
