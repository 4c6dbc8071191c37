//! Operand stack memory and the runtime top-of-stack register cache.
//!
//! [`TranslateOption`] tells the translator which scalar types get cache
//! slots and how many; the cursor simulation in `uwvm_int_ir` works those
//! out ahead of time as fixed slot indices baked into each instruction's
//! immediates. At runtime we still need somewhere those slots physically
//! live, so [`TosCache`] holds one small array per type, indexed by the
//! slot number the translator already computed.
//!
//! Cache-aware handlers (see `handlers.rs`'s `*Cached` opcodes) mirror every
//! value they touch into the matching `TosCache` slot, but [`OperandStack`]
//! remains the sole source read back for computation: a handler not tracked
//! by the translator's cursor (locals, loads/stores, conversions, control
//! flow) can still observe or invalidate a value of a cached type without
//! the cache itself ever going stale in a way that corrupts a result. This
//! is a tractable stand-in for the fully monomorphized-per-layout handler
//! matrix described in the design notes: handlers are still generic over a
//! cache configuration value, but specialised by runtime slot count rather
//! than by a distinct instantiation of every handler per possible ring
//! shape, and the cache is write-through rather than authoritative.

use uwvm_int_core::UntypedVal;
use uwvm_int_ir::{TranslateOption, ValKind};

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

/// Operand-stack memory: the spill area every value not resident in a TOS
/// cache slot lives in.
#[derive(Debug, Default, Clone)]
pub struct OperandStack {
    values: Vec<UntypedVal>,
}

impl OperandStack {
    /// Creates an empty operand stack with room for `capacity` values
    /// before it needs to grow.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { values: Vec::with_capacity(capacity) }
    }

    pub fn push(&mut self, value: UntypedVal) {
        self.values.push(value);
    }

    pub fn pop(&mut self) -> UntypedVal {
        self.values.pop().expect("operand stack underflow")
    }

    pub fn peek(&self) -> UntypedVal {
        *self.values.last().expect("operand stack underflow")
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
    }
}

/// The runtime register file backing a [`TranslateOption`]'s TOS rings.
///
/// One slot vector per scalar type, sized to that type's configured ring.
/// A ring of length zero means the type is never cached and every access
/// for it goes straight through [`OperandStack`].
#[derive(Debug, Clone)]
pub struct TosCache {
    i32: Vec<UntypedVal>,
    i64: Vec<UntypedVal>,
    f32: Vec<UntypedVal>,
    f64: Vec<UntypedVal>,
}

impl TosCache {
    /// Allocates cache storage sized by `option`'s configured ring lengths.
    pub fn new(option: &TranslateOption) -> Self {
        let sized = |len: usize| alloc::vec![UntypedVal::default(); len];
        Self {
            i32: sized(option.i32_range().len()),
            i64: sized(option.i64_range().len()),
            f32: sized(option.f32_range().len()),
            f64: sized(option.f64_range().len()),
        }
    }

    fn slots_mut(&mut self, kind: ValKind) -> &mut Vec<UntypedVal> {
        match kind {
            ValKind::I32 => &mut self.i32,
            ValKind::I64 => &mut self.i64,
            ValKind::F32 => &mut self.f32,
            ValKind::F64 => &mut self.f64,
        }
    }

    /// Reads the cached value at `slot` of type `kind`.
    pub fn read(&self, kind: ValKind, slot: usize) -> UntypedVal {
        match kind {
            ValKind::I32 => self.i32[slot],
            ValKind::I64 => self.i64[slot],
            ValKind::F32 => self.f32[slot],
            ValKind::F64 => self.f64[slot],
        }
    }

    /// Writes `value` into the cached slot at `slot` of type `kind`.
    pub fn write(&mut self, kind: ValKind, slot: usize, value: UntypedVal) {
        self.slots_mut(kind)[slot] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uwvm_int_ir::Ring;

    #[test]
    fn operand_stack_pushes_and_pops_in_order() {
        let mut stack = OperandStack::with_capacity(4);
        stack.push(UntypedVal::from(1i32));
        stack.push(UntypedVal::from(2i32));
        assert_eq!(i32::from(stack.pop()), 2);
        assert_eq!(i32::from(stack.pop()), 1);
    }

    #[test]
    fn tos_cache_round_trips_through_configured_slots() {
        let option = TranslateOption::new(
            true, Some(0), Some(1), Ring::new(0, 2), Ring::empty(), Ring::empty(), Ring::empty(),
        );
        let mut cache = TosCache::new(&option);
        cache.write(ValKind::I32, 1, UntypedVal::from(7i32));
        assert_eq!(i32::from(cache.read(ValKind::I32, 1)), 7);
    }
}
