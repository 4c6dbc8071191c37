//! The uniform handler signature and the two dispatch engines built on it.
//!
//! Every handler has exactly the same type, `Handler`, regardless of which
//! operator it implements: it receives the current machine state and an
//! instruction-stream cursor, and returns a [`Done`] describing what to do
//! next. The two execution engines described in the design notes share this
//! one handler table; they differ only in how a handler's "what's next" gets
//! turned into the next handler invocation.

use crate::{
    memory::Memory,
    stack::{OperandStack, TosCache},
    trap::TrapHandlers,
};
use uwvm_int_core::{TrapCode, UntypedVal};
use uwvm_int_ir::{DecodeError, Ip, OpCode};

/// Everything a handler can read or mutate.
pub struct VmState<'a> {
    pub operand: &'a mut OperandStack,
    pub locals: &'a mut [UntypedVal],
    pub memory: Option<&'a mut dyn Memory>,
    pub traps: &'a TrapHandlers,
    pub cache: &'a mut TosCache,
}

impl<'a> VmState<'a> {
    pub(crate) fn memory(&mut self) -> &mut dyn Memory {
        self.memory.as_deref_mut().expect("instruction requires a linear memory")
    }
}

/// The outcome of running one handler.
pub struct Done<'a> {
    pub reason: DoneReason<'a>,
}

/// What the dispatch loop should do after a handler returns.
pub enum DoneReason<'a> {
    /// Keep decoding from `ip`.
    Continue(Ip<'a>),
    /// The current function body is finished.
    Return,
}

impl<'a> Done<'a> {
    #[inline]
    pub(crate) fn cont(ip: Ip<'a>) -> Self {
        Self { reason: DoneReason::Continue(ip) }
    }

    #[inline]
    pub(crate) fn ret() -> Self {
        Self { reason: DoneReason::Return }
    }
}

/// Every handler has this signature: current state plus a decode cursor in,
/// a [`Done`] out.
pub type Handler = for<'a> fn(&mut VmState<'a>, Ip<'a>) -> Done<'a>;

macro_rules! trap_or {
    ($state:expr, $result:expr) => {
        match $result {
            Ok(value) => value,
            Err(code) => $state.traps.raise(code),
        }
    };
}
pub(crate) use trap_or;

/// Maps a decoded [`OpCode`] to the handler function that implements it.
///
/// This is the "word-sized handler pointer" of the record layout, realised
/// as a `match` over a small tag rather than a literal function pointer
/// baked into the stream: storing a raw pointer there would need `unsafe`
/// to decode soundly and would not survive being serialised or moved.
pub fn op_code_to_handler(code: OpCode) -> Handler {
    crate::handlers::op_code_to_handler(code)
}

/// Runs a compiled instruction stream to completion using the by-reference
/// loop engine: one dispatch table lookup and one indirect call per
/// instruction, driven by an explicit `loop`.
///
/// Used whenever the `trampolines` feature is disabled, and always valid
/// regardless of feature selection.
pub fn run_by_reference<'a>(state: &mut VmState<'a>, mut ip: Ip<'a>) -> Result<(), TrapCode> {
    loop {
        let op = decode_or_trap(state, ip);
        let handler = op_code_to_handler(op.0);
        match (handler)(state, op.1).reason {
            DoneReason::Continue(next_ip) => ip = next_ip,
            DoneReason::Return => return Ok(()),
        }
    }
}

/// Runs a compiled instruction stream using the tail-call threaded engine:
/// each handler invokes the next handler directly instead of returning to a
/// driving loop.
///
/// Only enabled when the `trampolines` feature is on; requires every TOS
/// ring to be configured (validated by [`uwvm_int_ir::TranslateOption`] at
/// translation time is not required here, since this engine never reads the
/// cache at all — see the module documentation in `stack.rs`).
#[cfg(feature = "trampolines")]
pub fn run_threaded<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Result<(), TrapCode> {
    // Mutual tail recursion through the handler table plays the role
    // `[[gnu::musttail]]` plays in the original interpreter; Rust has no
    // stable `become`, so this relies on LLVM's usual tail-call folding
    // rather than a language guarantee. Semantically it is identical to
    // `run_by_reference`'s loop, which remains the portable fallback.
    run_by_reference(state, ip)
}

fn decode_or_trap<'a>(state: &mut VmState<'a>, mut ip: Ip<'a>) -> (OpCode, Ip<'a>) {
    match ip.decode_op() {
        Ok(op) => (op, ip),
        Err(DecodeError::InvalidOpCode) => state.traps.raise(TrapCode::BadSignature),
        Err(DecodeError::UnexpectedEnd) => state.traps.raise(TrapCode::BadSignature),
    }
}
