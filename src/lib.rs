#![cfg_attr(not(feature = "std"), no_std)]
#![warn(clippy::cast_lossless, clippy::missing_errors_doc)]

//! A threaded/tail-call WebAssembly interpreter core.
//!
//! This crate translates a sequence of already-validated Wasm operators into
//! a packed instruction stream (`uwvm_int_ir`) and executes that stream with
//! one of two dispatch engines that share a single handler table
//! ([`dispatch::op_code_to_handler`]): a portable by-reference loop, and an
//! optional tail-call threaded engine behind the `trampolines` feature.
//!
//! Decoding a Wasm binary, validating it, and resolving imports are all the
//! embedder's job; this crate starts from an operator stream the embedder
//! already produced and validated, and stops at raising a [`trap::TrapCode`]
//! or returning.

mod config;
mod dispatch;
mod engine;
mod handlers;
mod memory;
mod stack;
mod trap;
mod translator;

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

pub use uwvm_int_core::TrapCode;

pub use self::{
    config::Config,
    dispatch::{op_code_to_handler, run_by_reference, Done, DoneReason, Handler, VmState},
    engine::{Engine, Func, FuncBody},
    memory::{LinearMemory, Memory},
    stack::{OperandStack, TosCache},
    trap::{TrapHandler, TrapHandlers},
    translator::{Translator, TranslatorError},
};

#[cfg(feature = "trampolines")]
pub use self::dispatch::run_threaded;
