use super::{Address, CharRead, LineRead, Memory};
use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Stack enforced and size limited vector

pub struct Stack<T> {
    overflow_message: &'static str,
    vec: Vec<T>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.vec)
    }
}

impl<T: Clone> Clone for Stack<T> {
    fn clone(&self) -> Stack<T> {
        Stack {
            overflow_message: self.overflow_message,
            vec: self.vec.clone(),
        }
    }
}

impl<T> Stack<T> {
    pub fn new(overflow_message: &'static str) -> Stack<T> {
        Stack {
            overflow_message,
            vec: vec![],
        }
    }
    fn max_len(&self) -> usize {
        u16::max_value() as usize
    }
    fn overflow_check(&self) -> Result<()> {
        if self.vec.len() > self.max_len() {
            Err(error!(StackOverflow; "{}", self.overflow_message))
        } else {
            Ok(())
        }
    }
    fn underflow_error(&self) -> Error {
        error!(StackUnderflow)
    }
    pub fn clear(&mut self) {
        self.vec.clear()
    }
    pub fn len(&self) -> usize {
        self.vec.len()
    }
    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }
    pub fn last(&self) -> Option<&T> {
        self.vec.last()
    }
    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.vec.last_mut()
    }
    pub fn as_slice(&self) -> &[T] {
        &self.vec
    }
    pub fn push(&mut self, val: T) -> Result<()> {
        self.vec.push(val);
        self.overflow_check()
    }
    pub fn pop(&mut self) -> Result<T> {
        match self.vec.pop() {
            Some(v) => Ok(v),
            None => Err(self.underflow_error()),
        }
    }
    pub fn pop_n(&mut self, len: usize) -> Result<Vec<T>> {
        if len > self.vec.len() {
            Err(self.underflow_error())
        } else {
            let range = (self.vec.len() - len as usize)..;
            Ok(self.vec.drain(range).collect())
        }
    }
}

/// A pending timed read, resumed when the interrupt routine
/// running in this frame returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Suspended {
    None,
    AwaitingTimedLineRead(LineRead),
    AwaitingTimedCharRead(CharRead),
}

/// One routine activation.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub return_pc: Address,
    /// Variable receiving the result. `None` discards it.
    pub store: Option<u8>,
    pub locals: Vec<u16>,
    /// Number of arguments supplied by the caller.
    pub arguments: u8,
    /// Words this frame has on the evaluation stack.
    pub frame_size: usize,
    pub suspended: Suspended,
}

impl Frame {
    /// The frame under the main routine. It has no locals and
    /// nothing to return to.
    pub fn dummy() -> Frame {
        Frame {
            return_pc: 0,
            store: None,
            locals: vec![],
            arguments: 0,
            frame_size: 0,
            suspended: Suspended::None,
        }
    }
}

const MAX_FRAMES: usize = 1024;

/// ## Routine frames and the shared evaluation stack
///
/// Each frame owns the words it pushed. A frame can never pop below
/// its own base and returning from it drops whatever it left behind.

#[derive(Debug, Clone)]
pub struct CallStack {
    values: Stack<u16>,
    frames: Vec<Frame>,
}

impl Default for CallStack {
    fn default() -> CallStack {
        CallStack::new()
    }
}

impl CallStack {
    pub fn new() -> CallStack {
        CallStack {
            values: Stack::new("EVALUATION STACK FULL"),
            frames: vec![Frame::dummy()],
        }
    }

    /// Rebuild from saved frames and stack words, oldest first.
    pub fn from_parts(frames: Vec<Frame>, values: Vec<u16>) -> Result<CallStack> {
        let total: usize = frames.iter().map(|f| f.frame_size).sum();
        if frames.is_empty() || total != values.len() {
            return Err(error!(CorruptSnapshot; "FRAMES HOLD {} OF {} WORDS", total, values.len()));
        }
        let mut stack = Stack::new("EVALUATION STACK FULL");
        for v in values {
            stack.push(v)?;
        }
        Ok(CallStack {
            values: stack,
            frames,
        })
    }

    pub fn reset(&mut self) {
        self.values.clear();
        self.frames.clear();
        self.frames.push(Frame::dummy());
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn values(&self) -> &[u16] {
        self.values.as_slice()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self) -> &Frame {
        // There is always at least the dummy frame.
        &self.frames[self.frames.len() - 1]
    }

    fn frame_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub fn push(&mut self, value: u16) -> Result<()> {
        self.values.push(value)?;
        self.frame_mut().frame_size += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16> {
        if self.frame().frame_size == 0 {
            return Err(error!(StackUnderflow));
        }
        let value = self.values.pop()?;
        self.frame_mut().frame_size -= 1;
        Ok(value)
    }

    /// Discard `count` words from the current frame.
    pub fn pop_n(&mut self, count: usize) -> Result<()> {
        if count > self.frame().frame_size {
            return Err(error!(StackUnderflow));
        }
        self.values.pop_n(count)?;
        self.frame_mut().frame_size -= count;
        Ok(())
    }

    pub fn peek(&self) -> Result<u16> {
        match self.values.last() {
            Some(&v) if self.frame().frame_size > 0 => Ok(v),
            _ => Err(error!(StackUnderflow)),
        }
    }

    /// Replace the top word in place.
    pub fn poke(&mut self, value: u16) -> Result<()> {
        if self.frame().frame_size == 0 {
            return Err(error!(StackUnderflow));
        }
        match self.values.last_mut() {
            Some(top) => {
                *top = value;
                Ok(())
            }
            None => Err(error!(StackUnderflow)),
        }
    }

    pub fn local(&self, number: u8) -> Result<u16> {
        match self.frame().locals.get((number as usize).wrapping_sub(1)) {
            Some(&v) => Ok(v),
            None => Err(error!(BadVariable; "LOCAL {}", number)),
        }
    }

    pub fn set_local(&mut self, number: u8, value: u16) -> Result<()> {
        match self.frame_mut().locals.get_mut((number as usize).wrapping_sub(1)) {
            Some(v) => {
                *v = value;
                Ok(())
            }
            None => Err(error!(BadVariable; "LOCAL {}", number)),
        }
    }

    /// Enter the routine at `address`. Locals start from the routine
    /// header in versions 3 and 4, zero after that, then the arguments
    /// overwrite the first few. Returns the first instruction address.
    pub fn call(
        &mut self,
        memory: &Memory,
        address: Address,
        arguments: &[u16],
        return_pc: Address,
        store: Option<u8>,
        suspended: Suspended,
    ) -> Result<Address> {
        if self.frames.len() >= MAX_FRAMES {
            return Err(error!(StackOverflow; "{} NESTED CALLS", MAX_FRAMES));
        }
        let count = memory.read_byte(address)? as usize;
        if count > 15 {
            return Err(error!(CorruptImage; "ROUTINE {:#06x} HAS {} LOCALS", address, count));
        }
        let mut pc = address + 1;
        let mut locals = Vec::with_capacity(count);
        for _ in 0..count {
            if memory.version() <= 4 {
                locals.push(memory.read_word(pc)?);
                pc += 2;
            } else {
                locals.push(0);
            }
        }
        for (local, &arg) in locals.iter_mut().zip(arguments) {
            *local = arg;
        }
        self.frames.push(Frame {
            return_pc,
            store,
            locals,
            arguments: arguments.len().min(7) as u8,
            frame_size: 0,
            suspended,
        });
        Ok(pc)
    }

    /// Leave the current routine, dropping its stack words.
    pub fn ret(&mut self) -> Result<Frame> {
        if self.frames.len() <= 1 {
            return Err(error!(StackUnderflow; "RETURN FROM MAIN ROUTINE"));
        }
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => return Err(error!(StackUnderflow)),
        };
        self.values.pop_n(frame.frame_size)?;
        Ok(frame)
    }

    /// Drop frames until `depth` remain.
    pub fn unwind(&mut self, depth: usize) -> Result<()> {
        if depth == 0 || depth > self.frames.len() {
            return Err(error!(BadOperands; "THROW TO FRAME {} OF {}", depth, self.frames.len()));
        }
        while self.frames.len() > depth {
            self.ret()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(version: u8) -> Memory {
        let mut image = vec![0u8; 0x200];
        image[0] = version;
        image[0x0e] = 0x01;
        // routine with three locals at 0x100
        image[0x100] = 3;
        image[0x101..0x107].copy_from_slice(&[0x11, 0x11, 0x22, 0x22, 0x33, 0x33]);
        Memory::new(image).unwrap()
    }

    #[test]
    fn test_locals_v3_defaults() {
        let m = memory(3);
        let mut s = CallStack::new();
        let pc = s.call(&m, 0x100, &[7], 0x50, Some(0), Suspended::None).unwrap();
        assert_eq!(pc, 0x107);
        assert_eq!(s.frame().locals, vec![7, 0x2222, 0x3333]);
        assert_eq!(s.frame().arguments, 1);
    }

    #[test]
    fn test_locals_v5_zero() {
        let m = memory(5);
        let mut s = CallStack::new();
        let pc = s.call(&m, 0x100, &[7], 0x50, None, Suspended::None).unwrap();
        assert_eq!(pc, 0x101);
        assert_eq!(s.frame().locals, vec![7, 0, 0]);
    }

    #[test]
    fn test_return_drops_words() {
        let m = memory(5);
        let mut s = CallStack::new();
        s.push(1).unwrap();
        s.call(&m, 0x100, &[], 0x50, None, Suspended::None).unwrap();
        s.push(2).unwrap();
        s.push(3).unwrap();
        assert_eq!(s.frame().frame_size, 2);
        let frame = s.ret().unwrap();
        assert_eq!(frame.return_pc, 0x50);
        assert_eq!(s.values(), &[1]);
        assert_eq!(s.pop().unwrap(), 1);
    }

    #[test]
    fn test_underflow_at_frame_base() {
        let m = memory(5);
        let mut s = CallStack::new();
        s.push(1).unwrap();
        s.call(&m, 0x100, &[], 0x50, None, Suspended::None).unwrap();
        assert!(s.pop().unwrap_err().is(crate::lang::ErrorCode::StackUnderflow));
        assert!(s.peek().is_err());
        assert!(s.local(4).is_err());
        s.ret().unwrap();
        assert!(s.ret().is_err());
    }

    #[test]
    fn test_unwind() {
        let m = memory(5);
        let mut s = CallStack::new();
        s.call(&m, 0x100, &[], 0x50, None, Suspended::None).unwrap();
        let depth = s.depth();
        s.call(&m, 0x100, &[], 0x60, None, Suspended::None).unwrap();
        s.push(9).unwrap();
        s.call(&m, 0x100, &[], 0x70, None, Suspended::None).unwrap();
        s.unwind(depth).unwrap();
        assert_eq!(s.depth(), depth);
        assert!(s.values().is_empty());
    }
}
