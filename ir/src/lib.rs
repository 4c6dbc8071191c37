#![cfg_attr(not(feature = "std"), no_std)]
#![warn(clippy::cast_lossless, clippy::missing_errors_doc)]

//! Ring/TOS-cursor bookkeeping, the opcode table and the packed instruction
//! stream codec for the `uwvm_int` interpreter.
//!
//! This crate owns everything the translator needs that is independent of
//! any particular handler implementation: [`TranslateOption`] (the
//! per-translation cache layout), [`StackTopCursor`] (the translation-time
//! simulation of TOS pushes/pops), [`OpCode`] (what operator an instruction
//! names) and [`Stream`]/[`StreamBuilder`]/[`Ip`] (the byte-level encoding).
//! The engine crate owns the handlers themselves and the dispatch loop.

mod cursor;
mod opcode;
mod ring;
mod stream;
mod translate_option;

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

pub use self::{
    cursor::{StackTopCursor, ValKind},
    opcode::{InvalidOpCode, OpCode},
    ring::Ring,
    stream::{DecodeError, Ip, Pod, Stream, StreamBuilder, StreamPos},
    translate_option::{ArgPosition, TranslateOption, TranslateOptionError},
};
