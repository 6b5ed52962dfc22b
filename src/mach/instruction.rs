use super::{Address, Memory, Opcode, OperandCount};
use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Form {
    Long,
    Short,
    Variable,
    Extended,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Large(u16),
    Small(u8),
    Variable(u8),
}

impl Operand {
    fn type_bits(self) -> u8 {
        match self {
            Operand::Large(_) => 0,
            Operand::Small(_) => 1,
            Operand::Variable(_) => 2,
        }
    }
}

/// Where a taken branch goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BranchTarget {
    ReturnFalse,
    ReturnTrue,
    Address(Address),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Branch {
    /// Branch when the test comes out this way.
    pub condition: bool,
    pub offset: i16,
    /// Encoded in one byte.
    pub short: bool,
}

impl Branch {
    /// Decode the branch data at `address`. Returns it with its length.
    pub fn decode(memory: &Memory, address: Address) -> Result<(Branch, usize)> {
        let first = memory.read_byte(address)?;
        let condition = first & 0x80 != 0;
        if first & 0x40 != 0 {
            let branch = Branch {
                condition,
                offset: (first & 0x3f) as i16,
                short: true,
            };
            return Ok((branch, 1));
        }
        let second = memory.read_byte(address + 1)?;
        let mut offset = ((first & 0x3f) as i16) << 8 | second as i16;
        if offset & 0x2000 != 0 {
            offset -= 0x4000;
        }
        let branch = Branch {
            condition,
            offset,
            short: false,
        };
        Ok((branch, 2))
    }

    /// Offsets 0 and 1 return false and true; anything else is
    /// relative to the address after the branch data, less two.
    pub fn target(&self, next: Address) -> BranchTarget {
        match self.offset {
            0 => BranchTarget::ReturnFalse,
            1 => BranchTarget::ReturnTrue,
            offset => BranchTarget::Address((next as i64 + offset as i64 - 2) as Address),
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        let polarity = if self.condition { 0x80 } else { 0 };
        if self.short {
            out.push(polarity | 0x40 | (self.offset as u8 & 0x3f));
        } else {
            let offset = self.offset as u16 & 0x3fff;
            out.push(polarity | (offset >> 8) as u8);
            out.push(offset as u8);
        }
    }
}

/// ## One decoded instruction

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub address: Address,
    pub form: Form,
    pub count: OperandCount,
    pub number: u8,
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    pub store: Option<u8>,
    pub branch: Option<Branch>,
    /// Inline Z-string of `print` and `print_ret`.
    pub text: Option<Address>,
    /// Address of the store byte or branch data. Snapshots record this.
    pub result: Address,
    pub next: Address,
}

fn read_types(memory: &Memory, at: &mut Address, bytes: usize) -> Result<Vec<u8>> {
    let mut types = Vec::with_capacity(4 * bytes);
    let mut done = false;
    for _ in 0..bytes {
        let b = memory.read_byte(*at)?;
        *at += 1;
        for shift in &[6, 4, 2, 0] {
            let t = (b >> shift) & 3;
            if t == 3 {
                done = true;
            }
            if !done {
                types.push(t);
            }
        }
    }
    Ok(types)
}

/// Bytes occupied by the Z-string at `address`.
fn text_length(memory: &Memory, address: Address) -> Result<usize> {
    let mut at = address;
    loop {
        let word = memory.read_word(at)?;
        at += 2;
        if word & 0x8000 != 0 {
            return Ok(at - address);
        }
    }
}

impl Instruction {
    pub fn decode(memory: &Memory, pc: Address) -> Result<Instruction> {
        let version = memory.version();
        let byte = memory.read_byte(pc)?;
        let mut at = pc + 1;
        let (form, count, number, types) = match byte {
            0x00..=0x7f => {
                let first = if byte & 0x40 != 0 { 2 } else { 1 };
                let second = if byte & 0x20 != 0 { 2 } else { 1 };
                (Form::Long, OperandCount::Op2, byte & 0x1f, vec![first, second])
            }
            0xbe if version >= 5 => {
                let number = memory.read_byte(at)?;
                at += 1;
                let types = read_types(memory, &mut at, 1)?;
                (Form::Extended, OperandCount::Ext, number, types)
            }
            0x80..=0xbf => match (byte >> 4) & 3 {
                3 => (Form::Short, OperandCount::Op0, byte & 0x0f, vec![]),
                t => (Form::Short, OperandCount::Op1, byte & 0x0f, vec![t]),
            },
            0xc0..=0xdf => {
                let types = read_types(memory, &mut at, 1)?;
                (Form::Variable, OperandCount::Op2, byte & 0x1f, types)
            }
            _ => {
                let number = byte & 0x1f;
                let type_bytes = if number == 12 || number == 26 { 2 } else { 1 };
                let types = read_types(memory, &mut at, type_bytes)?;
                (Form::Variable, OperandCount::Var, number, types)
            }
        };
        let opcode = match Opcode::decode(count, number, version) {
            Some(opcode) => opcode,
            None => {
                return Err(error!(UnknownOpcode, pc; "{:?} {} IN VERSION {}", count, number, version))
            }
        };
        let mut operands = Vec::with_capacity(types.len());
        for t in types {
            operands.push(match t {
                0 => {
                    let w = memory.read_word(at)?;
                    at += 2;
                    Operand::Large(w)
                }
                1 => {
                    at += 1;
                    Operand::Small(memory.read_byte(at - 1)?)
                }
                _ => {
                    at += 1;
                    Operand::Variable(memory.read_byte(at - 1)?)
                }
            });
        }
        let result = at;
        let store = if opcode.stores(version) {
            at += 1;
            Some(memory.read_byte(at - 1)?)
        } else {
            None
        };
        let branch = if opcode.branches(version) {
            let (branch, len) = Branch::decode(memory, at)?;
            at += len;
            Some(branch)
        } else {
            None
        };
        let text = if opcode.has_text() {
            let address = at;
            at += text_length(memory, at)?;
            Some(address)
        } else {
            None
        };
        Ok(Instruction {
            address: pc,
            form,
            count,
            number,
            opcode,
            operands,
            store,
            branch,
            text,
            result,
            next: at,
        })
    }

    /// The instruction's bytes, not counting any inline text.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![];
        let types = |out: &mut Vec<u8>, slots: usize| {
            let mut bits = vec![3u8; slots];
            for (slot, op) in bits.iter_mut().zip(&self.operands) {
                *slot = op.type_bits();
            }
            for chunk in bits.chunks(4) {
                out.push(chunk[0] << 6 | chunk[1] << 4 | chunk[2] << 2 | chunk[3]);
            }
        };
        match self.form {
            Form::Long => {
                let mut byte = self.number;
                if let Some(Operand::Variable(_)) = self.operands.get(0) {
                    byte |= 0x40;
                }
                if let Some(Operand::Variable(_)) = self.operands.get(1) {
                    byte |= 0x20;
                }
                out.push(byte);
            }
            Form::Short => match self.operands.get(0) {
                Some(op) => out.push(0x80 | op.type_bits() << 4 | self.number),
                None => out.push(0xb0 | self.number),
            },
            Form::Extended => {
                out.push(0xbe);
                out.push(self.number);
                types(&mut out, 4);
            }
            Form::Variable => {
                if self.count == OperandCount::Op2 {
                    out.push(0xc0 | self.number);
                    types(&mut out, 4);
                } else {
                    out.push(0xe0 | self.number);
                    let slots = if self.number == 12 || self.number == 26 { 8 } else { 4 };
                    types(&mut out, slots);
                }
            }
        }
        for op in &self.operands {
            match *op {
                Operand::Large(w) => {
                    out.push((w >> 8) as u8);
                    out.push(w as u8);
                }
                Operand::Small(b) | Operand::Variable(b) => out.push(b),
            }
        }
        if let Some(store) = self.store {
            out.push(store);
        }
        if let Some(branch) = &self.branch {
            branch.encode(&mut out);
        }
        out
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:05x}: {}", self.address, self.opcode)?;
        for op in &self.operands {
            match op {
                Operand::Large(w) => write!(f, " #{:04x}", w)?,
                Operand::Small(b) => write!(f, " #{:02x}", b)?,
                Operand::Variable(0) => write!(f, " sp")?,
                Operand::Variable(v) if *v < 16 => write!(f, " L{:02x}", v - 1)?,
                Operand::Variable(v) => write!(f, " G{:02x}", v - 16)?,
            }
        }
        if let Some(store) = self.store {
            write!(f, " -> {}", store)?;
        }
        if let Some(branch) = &self.branch {
            write!(f, " ?{}{}", if branch.condition { "" } else { "~" }, branch.offset)?;
        }
        Ok(())
    }
}
