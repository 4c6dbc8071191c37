//! The top-level entry point: owns configuration and the installed trap
//! callback, translates function bodies, and runs them against
//! caller-supplied locals and memory.
//!
//! Module linking and import resolution are out of scope (see the crate
//! documentation), so there is no `Store`/`Instance` here: callers own their
//! locals, [`OperandStack`] and [`Memory`] directly and pass them to
//! [`FuncBody::run`].

use crate::{
    config::Config,
    dispatch::{run_by_reference, VmState},
    memory::Memory,
    stack::{OperandStack, TosCache},
    translator::{SourceOp, Translator, TranslatorError},
    trap::{TrapHandler, TrapHandlers},
};
use uwvm_int_core::{TrapCode, UntypedVal};
use uwvm_int_ir::{Ip, Stream, TranslateOption};

#[cfg(feature = "trampolines")]
use crate::dispatch::run_threaded;

/// Owns the [`Config`] and installed trap callback shared by every function
/// translated and run through it.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Config,
    traps: TrapHandlers,
}

impl Engine {
    /// Creates an engine with the given configuration and the default,
    /// panicking trap handler.
    pub fn new(config: Config) -> Self {
        Self { config, traps: TrapHandlers::default() }
    }

    /// Installs the host trap callback invoked by every function this
    /// engine runs.
    ///
    /// Per §6, calling this after an activation has started is undefined;
    /// callers must install it before translating or running anything.
    pub fn set_trap_handler(&mut self, handler: TrapHandler) {
        self.traps = TrapHandlers::new(handler);
    }

    /// Builds a fresh operand stack sized by this engine's [`Config`].
    pub fn new_operand_stack(&self) -> OperandStack {
        self.config.new_operand_stack()
    }

    /// Translates `body` into a runnable [`FuncBody`] with `num_locals`
    /// local slots (including its parameters).
    ///
    /// # Errors
    ///
    /// Returns [`TranslatorError`] if this engine's configured
    /// [`uwvm_int_ir::TranslateOption`] is invalid, or under the same
    /// conditions as [`Translator::translate`].
    pub fn translate(&self, body: &[SourceOp], num_locals: usize) -> Result<FuncBody, TranslatorError> {
        let option = self.config.translate_option()?;
        let mut translator = Translator::new(option)?;
        let stream = translator.translate(body)?;
        Ok(FuncBody { stream, num_locals, option })
    }
}

/// A translated function body: an immutable instruction stream, its
/// local-slot count, and the [`TranslateOption`] it was translated against.
///
/// The option is kept alongside the stream because the cache slots baked
/// into cache-aware instructions are only meaningful relative to the ring
/// lengths that produced them: running a body against a freshly sized
/// [`TosCache`] every call keeps that pairing intact without re-deriving it
/// from the stream itself.
#[derive(Debug, Clone)]
pub struct FuncBody {
    stream: Stream,
    num_locals: usize,
    option: TranslateOption,
}

impl FuncBody {
    /// The number of local slots (including parameters) this body expects.
    pub fn num_locals(&self) -> usize {
        self.num_locals
    }

    /// Runs this function body to completion against `engine`.
    ///
    /// `locals` must have at least [`FuncBody::num_locals`] entries, with
    /// the callee's parameters already in its leading slots per the
    /// caller's calling convention. `memory` is `None` for bodies that
    /// never touch linear memory; touching it regardless traps with
    /// [`TrapCode::MemoryOutOfBounds`] only insofar as the [`Memory`]
    /// collaborator reports it, not for the missing-memory case itself,
    /// which is a caller usage error (see [`VmState::memory`]).
    ///
    /// # Panics
    ///
    /// Panics if `locals` has fewer than [`FuncBody::num_locals`] entries.
    pub fn run(
        &self,
        engine: &Engine,
        locals: &mut [UntypedVal],
        operand: &mut OperandStack,
        memory: Option<&mut dyn Memory>,
    ) -> Result<(), TrapCode> {
        assert!(
            locals.len() >= self.num_locals,
            "caller must supply every local slot: need {}, got {}",
            self.num_locals,
            locals.len()
        );
        let mut cache = TosCache::new(&self.option);
        let mut state = VmState { operand, locals, memory, traps: &engine.traps, cache: &mut cache };
        let ip = Ip::new(&self.stream);

        #[cfg(feature = "trampolines")]
        if engine.config.is_tail_call() {
            return run_threaded(&mut state, ip);
        }

        run_by_reference(&mut state, ip)
    }
}

/// A function body bound to the engine that can run it.
///
/// A thin convenience pairing over [`FuncBody::run`] for callers that would
/// otherwise have to carry the `&Engine` alongside every `&FuncBody`.
pub struct Func<'a> {
    engine: &'a Engine,
    body: &'a FuncBody,
}

impl<'a> Func<'a> {
    /// Binds `body` to `engine` for repeated calls.
    pub fn new(engine: &'a Engine, body: &'a FuncBody) -> Self {
        Self { engine, body }
    }

    /// Runs the bound function body. See [`FuncBody::run`].
    pub fn run(
        &self,
        locals: &mut [UntypedVal],
        operand: &mut OperandStack,
        memory: Option<&mut dyn Memory>,
    ) -> Result<(), TrapCode> {
        self.body.run(self.engine, locals, operand, memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uwvm_int_ir::OpCode;

    #[test]
    fn runs_a_constant_fold_body_to_completion() {
        let engine = Engine::new(Config::new());
        let body = [
            SourceOp::I32Const(7),
            SourceOp::I32Const(11),
            SourceOp::Op(OpCode::I32Mul),
            SourceOp::Return,
        ];
        let func_body = engine.translate(&body, 0).unwrap();
        let func = Func::new(&engine, &func_body);

        let mut locals: [UntypedVal; 0] = [];
        let mut operand = engine.new_operand_stack();
        func.run(&mut locals, &mut operand, None).unwrap();

        assert_eq!(i32::from(operand.pop()), 77);
    }

    #[test]
    fn traps_on_integer_overflow_in_div_s() {
        use core::cell::Cell;
        std::thread_local! {
            static TRAPPED: Cell<Option<TrapCode>> = const { Cell::new(None) };
        }
        fn on_trap(code: TrapCode) -> ! {
            TRAPPED.with(|cell| cell.set(Some(code)));
            panic!("trap raised: {code}");
        }

        let mut engine = Engine::new(Config::new());
        engine.set_trap_handler(on_trap);

        let body = [
            SourceOp::I64Const(i64::MIN),
            SourceOp::I64Const(-1),
            SourceOp::Op(OpCode::I64DivS),
            SourceOp::Return,
        ];
        let func_body = engine.translate(&body, 0).unwrap();
        let func = Func::new(&engine, &func_body);

        let mut locals: [UntypedVal; 0] = [];
        let mut operand = engine.new_operand_stack();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            func.run(&mut locals, &mut operand, None)
        }));
        assert!(result.is_err(), "trap handler panics, unwinding past run()");
        assert_eq!(TRAPPED.with(|cell| cell.get()), Some(TrapCode::IntegerOverflow));
    }
}
