/*!
## Quetzal snapshots

A snapshot is an IFF `FORM` of type `IFZS`. `IFhd` identifies the
story and holds the resume address, `CMem` or `UMem` holds dynamic
memory, and `Stks` holds every frame, oldest first. `CMem` is dynamic
memory XORed with the pristine image, zero runs compressed as a zero
byte followed by the run length less one.
*/

use super::header::{self, HeaderField};
use super::{Address, CallStack, Frame, Memory, Suspended};
use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// A parsed and fully validated snapshot, ready to apply.
#[derive(Debug)]
pub struct Restored {
    pub dynamic: Vec<u8>,
    pub stack: CallStack,
    pub pc: Address,
}

/// XOR against the original and run length encode the zeros.
/// Trailing zeros are left off.
pub fn compress(current: &[u8], original: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(current.len() / 4);
    let mut run = 0usize;
    for (c, o) in current.iter().zip(original) {
        let b = c ^ o;
        if b == 0 {
            run += 1;
            continue;
        }
        while run > 0 {
            let n = run.min(256);
            out.push(0);
            out.push((n - 1) as u8);
            run -= n;
        }
        out.push(b);
    }
    out
}

pub fn decompress(data: &[u8], original: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(original.len());
    let mut bytes = data.iter();
    while let Some(&b) = bytes.next() {
        if b != 0 {
            out.push(b);
            continue;
        }
        match bytes.next() {
            Some(&n) => out.resize(out.len() + n as usize + 1, 0),
            None => return Err(error!(CorruptSnapshot; "CMEM ENDS IN A ZERO RUN")),
        }
    }
    if out.len() > original.len() {
        return Err(error!(CorruptSnapshot; "CMEM EXPANDS TO {} BYTES", out.len()));
    }
    out.resize(original.len(), 0);
    for (b, o) in out.iter_mut().zip(original) {
        *b ^= o;
    }
    Ok(out)
}

fn chunk(out: &mut Vec<u8>, id: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(id);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
    if data.len() % 2 == 1 {
        out.push(0);
    }
}

fn push_word(out: &mut Vec<u8>, w: u16) {
    out.push((w >> 8) as u8);
    out.push(w as u8);
}

fn push_address(out: &mut Vec<u8>, a: Address) {
    out.push((a >> 16) as u8);
    out.push((a >> 8) as u8);
    out.push(a as u8);
}

fn ifhd(memory: &Memory, pc: Address) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(13);
    push_word(&mut data, header::field_word(memory, HeaderField::Release)?);
    data.extend_from_slice(&header::serial(memory)?);
    push_word(&mut data, header::field_word(memory, HeaderField::Checksum)?);
    push_address(&mut data, pc);
    Ok(data)
}

fn stks(stack: &CallStack) -> Vec<u8> {
    let mut data = vec![];
    let mut values = stack.values();
    for frame in stack.frames() {
        push_address(&mut data, frame.return_pc);
        let discard = if frame.store.is_none() { 0x10 } else { 0 };
        data.push(discard | frame.locals.len() as u8);
        data.push(frame.store.unwrap_or(0));
        data.push(((1u16 << frame.arguments) - 1) as u8);
        push_word(&mut data, frame.frame_size as u16);
        for &local in &frame.locals {
            push_word(&mut data, local);
        }
        let (own, rest) = values.split_at(frame.frame_size.min(values.len()));
        for &v in own {
            push_word(&mut data, v);
        }
        values = rest;
    }
    data
}

/// Build a snapshot. `pc` is where the restoring instruction's
/// result goes: its store byte or branch data.
pub fn capture(
    memory: &Memory,
    stack: &CallStack,
    pc: Address,
    compressed: bool,
    annotation: Option<&str>,
) -> Result<Vec<u8>> {
    let mut body = b"IFZS".to_vec();
    chunk(&mut body, b"IFhd", &ifhd(memory, pc)?);
    if compressed {
        chunk(
            &mut body,
            b"CMem",
            &compress(memory.dynamic(), memory.pristine_dynamic()),
        );
    } else {
        chunk(&mut body, b"UMem", memory.dynamic());
    }
    chunk(&mut body, b"Stks", &stks(stack));
    if let Some(text) = annotation {
        chunk(&mut body, b"ANNO", text.as_bytes());
    }
    let mut out = b"FORM".to_vec();
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend(body);
    log::debug!("snapshot of {} bytes at pc {:#07x}", out.len(), pc);
    Ok(out)
}

fn be32(bytes: &[u8]) -> usize {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
}

/// Split the container into chunks. Checks framing only.
fn chunks(bytes: &[u8]) -> Result<Vec<(&[u8], &[u8])>> {
    if bytes.len() < 12 || &bytes[0..4] != b"FORM" || &bytes[8..12] != b"IFZS" {
        return Err(error!(NotQuetzal));
    }
    let end = 8 + be32(&bytes[4..8]);
    if end > bytes.len() {
        return Err(error!(Truncated; "FORM NEEDS {} BYTES, HAS {}", end, bytes.len()));
    }
    if end < bytes.len() {
        log::warn!("{} bytes after the end of the save file", bytes.len() - end);
    }
    let mut found = vec![];
    let mut at = 12;
    while at < end {
        if at + 8 > end {
            return Err(error!(Truncated; "CHUNK HEADER AT {}", at));
        }
        let id = &bytes[at..at + 4];
        let len = be32(&bytes[at + 4..at + 8]);
        let data_end = at + 8 + len;
        if data_end > end {
            return Err(error!(Truncated; "CHUNK {} NEEDS {} BYTES", String::from_utf8_lossy(id), len));
        }
        found.push((id, &bytes[at + 8..data_end]));
        at = data_end + len % 2;
    }
    Ok(found)
}

fn read_stks(data: &[u8]) -> Result<CallStack> {
    let corrupt = || error!(CorruptSnapshot; "STKS");
    let mut frames = vec![];
    let mut values = vec![];
    let mut at = 0;
    let word = |at: usize| -> Result<u16> {
        match data.get(at..at + 2) {
            Some(w) => Ok((w[0] as u16) << 8 | w[1] as u16),
            None => Err(corrupt()),
        }
    };
    while at < data.len() {
        let head = data.get(at..at + 8).ok_or_else(corrupt)?;
        let return_pc = (head[0] as Address) << 16 | (head[1] as Address) << 8 | head[2] as Address;
        let flags = head[3];
        let store = if flags & 0x10 != 0 { None } else { Some(head[4]) };
        let arguments = head[5].count_ones() as u8;
        let frame_size = word(at + 6)? as usize;
        at += 8;
        let mut locals = vec![];
        for _ in 0..(flags & 0x0f) {
            locals.push(word(at)?);
            at += 2;
        }
        for _ in 0..frame_size {
            values.push(word(at)?);
            at += 2;
        }
        frames.push(Frame {
            return_pc,
            store,
            locals,
            arguments,
            frame_size,
            suspended: Suspended::None,
        });
    }
    CallStack::from_parts(frames, values)
}

/// Parse and check a snapshot against the running story. Nothing is
/// applied here, so a rejected snapshot leaves the machine untouched.
pub fn parse(bytes: &[u8], memory: &Memory) -> Result<Restored> {
    let chunks = chunks(bytes)?;
    let find = |id: &[u8; 4]| chunks.iter().find(|(i, _)| *i == id).map(|(_, d)| *d);

    let ifhd_data = match find(b"IFhd") {
        Some(data) => data,
        None => return Err(error!(MissingChunk; "IFHD")),
    };
    if ifhd_data.len() != 13 {
        return Err(error!(CorruptSnapshot; "IFHD IS {} BYTES", ifhd_data.len()));
    }
    let ours = ifhd(memory, 0)?;
    if ifhd_data[..10] != ours[..10] {
        return Err(error!(WrongStory));
    }
    let pc = (ifhd_data[10] as Address) << 16
        | (ifhd_data[11] as Address) << 8
        | ifhd_data[12] as Address;
    if pc >= memory.len() {
        return Err(error!(CorruptSnapshot; "PC {:#07x}", pc));
    }

    let dynamic = match (find(b"CMem"), find(b"UMem")) {
        (Some(cmem), _) => decompress(cmem, memory.pristine_dynamic())?,
        (None, Some(umem)) => {
            if umem.len() != memory.dynamic_ceiling() {
                return Err(error!(CorruptSnapshot; "UMEM IS {} BYTES", umem.len()));
            }
            umem.to_vec()
        }
        (None, None) => return Err(error!(MissingChunk; "CMEM OR UMEM")),
    };

    let stack = match find(b"Stks") {
        Some(data) => read_stks(data)?,
        None => return Err(error!(MissingChunk; "STKS")),
    };
    Ok(Restored { dynamic, stack, pc })
}
