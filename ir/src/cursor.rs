use crate::translate_option::TranslateOption;

/// Per-type current top-of-stack slot, tracked by the translator while it
/// simulates pushes and pops over the validated instruction sequence.
///
/// Exists only during translation; it is not part of any handler's runtime
/// argument vector and has no representation at execution time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct StackTopCursor {
    i32: Option<usize>,
    i64: Option<usize>,
    f32: Option<usize>,
    f64: Option<usize>,
}

/// Selects one of the four scalar Wasm value kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValKind {
    I32,
    I64,
    F32,
    F64,
}

impl StackTopCursor {
    /// Creates a cursor whose slot for each non-empty ring starts at that
    /// ring's first slot, as it does for an empty stack.
    pub fn new(option: &TranslateOption) -> Self {
        let init = |ring: crate::ring::Ring| (!ring.is_empty()).then(|| ring.begin());
        Self {
            i32: init(option.i32_range()),
            i64: init(option.i64_range()),
            f32: init(option.f32_range()),
            f64: init(option.f64_range()),
        }
    }

    fn slot_mut(&mut self, kind: ValKind) -> &mut Option<usize> {
        match kind {
            ValKind::I32 => &mut self.i32,
            ValKind::I64 => &mut self.i64,
            ValKind::F32 => &mut self.f32,
            ValKind::F64 => &mut self.f64,
        }
    }

    /// Current slot holding the logical TOS of `kind`, or `None` if caching
    /// is disabled for `kind` or no value has been pushed yet.
    pub fn current(&self, kind: ValKind) -> Option<usize> {
        match kind {
            ValKind::I32 => self.i32,
            ValKind::I64 => self.i64,
            ValKind::F32 => self.f32,
            ValKind::F64 => self.f64,
        }
    }

    /// Simulates pushing a value of `kind`: the cursor moves to
    /// `prev(current)` per §4.1, the slot that push should write.
    ///
    /// Returns the slot the push handler should write to, or `None` if
    /// `kind`'s ring is disabled (value must go to operand-stack memory).
    pub fn push(&mut self, option: &TranslateOption, kind: ValKind) -> Option<usize> {
        let ring = ring_for(option, kind);
        if ring.is_empty() {
            return None;
        }
        let current = self.current(kind).unwrap_or_else(|| ring.begin());
        let new_slot = ring.prev(current);
        *self.slot_mut(kind) = Some(new_slot);
        Some(new_slot)
    }

    /// Simulates popping a value of `kind`: the returned slot is the one to
    /// read, and the cursor advances to `next(current)` per §4.1.
    pub fn pop(&mut self, option: &TranslateOption, kind: ValKind) -> Option<usize> {
        let ring = ring_for(option, kind);
        if ring.is_empty() {
            return None;
        }
        let current = self.current(kind)?;
        *self.slot_mut(kind) = Some(ring.next(current));
        Some(current)
    }
}

fn ring_for(option: &TranslateOption, kind: ValKind) -> crate::ring::Ring {
    match kind {
        ValKind::I32 => option.i32_range(),
        ValKind::I64 => option.i64_range(),
        ValKind::F32 => option.f32_range(),
        ValKind::F64 => option.f64_range(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::Ring;

    fn option_with_i32_ring(ring: Ring) -> TranslateOption {
        TranslateOption::new(true, Some(0), Some(1), ring, Ring::empty(), Ring::empty(), Ring::empty())
    }

    #[test]
    fn push_then_pop_round_trips() {
        let option = option_with_i32_ring(Ring::new(0, 2));
        let mut cursor = StackTopCursor::new(&option);
        let pushed = cursor.push(&option, ValKind::I32).unwrap();
        let popped = cursor.pop(&option, ValKind::I32).unwrap();
        assert_eq!(pushed, popped);
    }

    #[test]
    fn disabled_ring_never_yields_a_slot() {
        let option = option_with_i32_ring(Ring::empty());
        let mut cursor = StackTopCursor::new(&option);
        assert_eq!(cursor.push(&option, ValKind::I32), None);
        assert_eq!(cursor.pop(&option, ValKind::I32), None);
    }

    #[test]
    fn single_slot_ring_reuses_the_same_slot() {
        let option = option_with_i32_ring(Ring::new(5, 6));
        let mut cursor = StackTopCursor::new(&option);
        let a = cursor.push(&option, ValKind::I32).unwrap();
        let b = cursor.push(&option, ValKind::I32).unwrap();
        assert_eq!(a, 5);
        assert_eq!(b, 5);
    }
}
