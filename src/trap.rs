use uwvm_int_core::TrapCode;

/// A host-installed callback invoked when execution hits a trap.
///
/// Per the execution contract, the callback never returns: it unwinds,
/// longjmps, aborts the process or otherwise diverges. A callback that
/// returns normally is a fatal usage bug, not a recoverable error, so the
/// adapter that invokes it does not attempt to resume execution afterwards.
pub type TrapHandler = fn(TrapCode) -> !;

fn default_trap_handler(code: TrapCode) -> ! {
    panic!("unhandled trap: {code}")
}

/// Invokes `handler` with `code` and aborts if it returns.
///
/// Marked cold and never-inlined: traps are the unlikely path out of a
/// handler, and keeping the call site tiny keeps the common path's code
/// layout dense.
#[cold]
#[inline(never)]
pub fn raise(handler: TrapHandler, code: TrapCode) -> ! {
    handler(code);
    unreachable!("trap handler must not return")
}

/// Holds the trap callback installed for a running [`crate::engine::Engine`].
#[derive(Debug, Copy, Clone)]
pub struct TrapHandlers {
    on_trap: TrapHandler,
}

impl Default for TrapHandlers {
    fn default() -> Self {
        Self { on_trap: default_trap_handler }
    }
}

impl TrapHandlers {
    /// Installs a custom trap callback, replacing the panicking default.
    pub fn new(on_trap: TrapHandler) -> Self {
        Self { on_trap }
    }

    /// Invokes the installed callback; never returns.
    pub fn raise(&self, code: TrapCode) -> ! {
        raise(self.on_trap, code)
    }
}
