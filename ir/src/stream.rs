//! Packed instruction stream: a byte vector holding, for each instruction in
//! forward translation order, an [`OpCode`] tag followed by its immediates.
//!
//! Reads and writes are always byte-wise (`to_ne_bytes`/`from_ne_bytes` via
//! `copy_from_slice`), never through a typed/aligned pointer cast: the
//! stream is a `Vec<u8>` and nothing guarantees slot alignment for anything
//! wider than a byte. This mirrors the unaligned `memcpy` reads the original
//! interpreter uses to pull immediates and branch targets out of its byte
//! stream.

use crate::opcode::{InvalidOpCode, OpCode};
use core::mem::size_of;

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, vec::Vec};
#[cfg(feature = "std")]
use std::{boxed::Box, vec::Vec};

/// Growable instruction stream under construction by the translator.
#[derive(Debug, Default, Clone)]
pub struct StreamBuilder {
    bytes: Vec<u8>,
}

/// A position within a [`StreamBuilder`]/[`Stream`], in bytes.
pub type StreamPos = usize;

impl StreamBuilder {
    /// Creates an empty stream.
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Current write position; the offset the next emitted instruction will
    /// start at. Used by the translator to record branch-target fixups.
    pub fn position(&self) -> StreamPos {
        self.bytes.len()
    }

    /// Appends an opcode tag.
    pub fn emit_op(&mut self, op: OpCode) {
        self.bytes.extend_from_slice(&op.to_u16().to_ne_bytes());
    }

    /// Appends a raw immediate of any `Copy` POD type, unaligned.
    pub fn emit_imm<T: Pod>(&mut self, value: T) {
        self.bytes.extend_from_slice(value.to_ne_bytes().as_ref());
    }

    /// Reserves space for a branch target that will be patched later with
    /// [`StreamBuilder::patch_target`], and returns its position.
    pub fn emit_placeholder_target(&mut self) -> StreamPos {
        let pos = self.position();
        self.emit_imm::<u32>(0);
        pos
    }

    /// Overwrites a previously reserved target at `pos` with the resolved
    /// branch destination.
    pub fn patch_target(&mut self, pos: StreamPos, target: StreamPos) {
        let target: u32 = target.try_into().expect("stream position overflows u32");
        self.bytes[pos..pos + size_of::<u32>()].copy_from_slice(&target.to_ne_bytes());
    }

    /// Finalizes the stream, freezing it for execution.
    pub fn finish(self) -> Stream {
        Stream { bytes: self.bytes.into_boxed_slice() }
    }
}

/// A finished, immutable instruction stream ready for dispatch.
#[derive(Debug, Clone)]
pub struct Stream {
    bytes: Box<[u8]>,
}

/// Cursor over a [`Stream`] used by the dispatch loop to decode one
/// instruction at a time.
///
/// This plays the role the original interpreter's raw `unsigned char const*`
/// instruction pointer plays: a handler reads its immediates by advancing
/// this cursor, then hands it to the next handler (by tail call, in the
/// threaded engine, or by returning to the dispatch loop, in the
/// by-reference engine).
#[derive(Debug, Copy, Clone)]
pub struct Ip<'a> {
    bytes: &'a [u8],
    pos: usize,
}

/// Errors produced while decoding a [`Stream`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes remained than the requested read needed.
    UnexpectedEnd,
    /// The opcode tag did not name a known [`OpCode`].
    InvalidOpCode,
}

impl From<InvalidOpCode> for DecodeError {
    fn from(_: InvalidOpCode) -> Self {
        Self::InvalidOpCode
    }
}

impl<'a> Ip<'a> {
    /// Creates a cursor at the start of `stream`.
    pub fn new(stream: &'a Stream) -> Self {
        Self { bytes: &stream.bytes, pos: 0 }
    }

    /// Creates a cursor at an arbitrary byte offset, e.g. a resolved branch
    /// target.
    pub fn at(stream: &'a Stream, pos: StreamPos) -> Self {
        Self { bytes: &stream.bytes, pos }
    }

    /// Current byte offset, usable as a branch target to jump back to later.
    pub fn position(&self) -> StreamPos {
        self.pos
    }

    /// Jumps this cursor to an absolute byte offset.
    pub fn jump_to(&mut self, pos: StreamPos) {
        self.pos = pos;
    }

    /// Decodes the next opcode tag, advancing past it.
    pub fn decode_op(&mut self) -> Result<OpCode, DecodeError> {
        let raw: u16 = self.decode_imm()?;
        Ok(OpCode::from_u16(raw)?)
    }

    /// Decodes the next POD immediate, advancing past it.
    pub fn decode_imm<T: Pod>(&mut self) -> Result<T, DecodeError> {
        let size = size_of::<T>();
        let slice = self
            .bytes
            .get(self.pos..self.pos + size)
            .ok_or(DecodeError::UnexpectedEnd)?;
        self.pos += size;
        Ok(T::from_ne_bytes(slice))
    }

    /// Decodes a branch target, advancing past it.
    pub fn decode_target(&mut self) -> Result<StreamPos, DecodeError> {
        let raw: u32 = self.decode_imm()?;
        Ok(raw as usize)
    }
}

/// A small, unaligned-safe plain-old-data value that can be written to and
/// read from the instruction stream.
///
/// Implemented for the integer/float immediate types the handler tables
/// need; not meant to be implemented outside this crate.
pub trait Pod: Copy {
    type Bytes: AsRef<[u8]>;
    fn to_ne_bytes(self) -> Self::Bytes;
    fn from_ne_bytes(bytes: &[u8]) -> Self;
}

macro_rules! impl_pod {
    ($( $ty:ty ),* $(,)?) => {
        $(
            impl Pod for $ty {
                type Bytes = [u8; size_of::<$ty>()];

                fn to_ne_bytes(self) -> Self::Bytes {
                    <$ty>::to_ne_bytes(self)
                }

                fn from_ne_bytes(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_ne_bytes(buf)
                }
            }
        )*
    };
}

impl_pod!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_and_decodes_op_then_immediate() {
        let mut builder = StreamBuilder::new();
        builder.emit_op(OpCode::I32Const);
        builder.emit_imm::<i32>(42);
        let stream = builder.finish();

        let mut ip = Ip::new(&stream);
        assert_eq!(ip.decode_op().unwrap(), OpCode::I32Const);
        assert_eq!(ip.decode_imm::<i32>().unwrap(), 42);
    }

    #[test]
    fn branch_target_patches_after_the_fact() {
        let mut builder = StreamBuilder::new();
        builder.emit_op(OpCode::Br);
        let slot = builder.emit_placeholder_target();
        builder.emit_op(OpCode::Unreachable);
        let loop_header = builder.position();
        builder.patch_target(slot, loop_header);
        let stream = builder.finish();

        let mut ip = Ip::new(&stream);
        assert_eq!(ip.decode_op().unwrap(), OpCode::Br);
        assert_eq!(ip.decode_target().unwrap(), loop_header);
    }

    #[test]
    fn decoding_past_the_end_is_an_error() {
        let mut builder = StreamBuilder::new();
        builder.emit_op(OpCode::Return);
        let stream = builder.finish();
        let mut ip = Ip::new(&stream);
        ip.decode_op().unwrap();
        assert_eq!(ip.decode_imm::<i32>(), Err(DecodeError::UnexpectedEnd));
    }

    #[test]
    fn unknown_opcode_tag_is_rejected() {
        let mut builder = StreamBuilder::new();
        builder.emit_imm::<u16>(u16::MAX);
        let stream = builder.finish();
        let mut ip = Ip::new(&stream);
        assert_eq!(ip.decode_op(), Err(DecodeError::InvalidOpCode));
    }
}
