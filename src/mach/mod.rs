/*!
## Rust Machine Module

This Rust module is the Z-machine itself: story memory, the call stack,
instruction decoding and execution, streams, snapshots and undo.

*/

pub type Address = usize;

pub mod header;
mod host;
mod input;
mod instruction;
mod memory;
mod object;
mod opcode;
mod operation;
mod options;
mod random;
mod runtime;
pub mod snapshot;
mod stack;
mod stream;
mod undo;

#[cfg(test)]
mod tests;

pub use host::CharInput;
pub use host::Host;
pub use host::HostInfo;
pub use host::LineInput;
pub use host::Purpose;
pub use host::StatusLine;
pub use host::StatusRight;
pub use input::CharRead;
pub use input::LineRead;
pub use instruction::Branch;
pub use instruction::BranchTarget;
pub use instruction::Form;
pub use instruction::Instruction;
pub use instruction::Operand;
pub use memory::Memory;
pub use object::ObjectTable;
pub use opcode::Opcode;
pub use opcode::OperandCount;
pub use operation::Operation;
pub use options::Options;
pub use random::Random;
pub use runtime::Event;
pub use runtime::Runtime;
pub use stack::CallStack;
pub use stack::Frame;
pub use stack::Stack;
pub use stack::Suspended;
pub use stream::Streams;
pub use undo::UndoRing;
