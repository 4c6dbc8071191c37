//! Compile-time configuration: per §3/§6 this is the core's sole public
//! configuration surface, chosen once and never mutated once an activation
//! starts.

use crate::stack::OperandStack;
use uwvm_int_ir::{Ring, TranslateOption, TranslateOptionError};

/// Builder for the [`TranslateOption`] an [`crate::engine::Engine`] uses to
/// translate and run function bodies.
///
/// Every handler this crate ships runs against [`OperandStack`] only (see
/// `stack.rs`), so the ring extents configured here are not yet consulted by
/// handler selection; they still flow through [`TranslateOption::validate`]
/// and the translator's cursor bookkeeping, so a future cache-aware handler
/// table can be wired in without changing this surface.
#[derive(Debug, Clone)]
pub struct Config {
    is_tail_call: bool,
    i32_ring: Ring,
    i64_ring: Ring,
    f32_ring: Ring,
    f64_ring: Ring,
    initial_operand_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            is_tail_call: false,
            i32_ring: Ring::empty(),
            i64_ring: Ring::empty(),
            f32_ring: Ring::empty(),
            f64_ring: Ring::empty(),
            initial_operand_capacity: 64,
        }
    }
}

impl Config {
    /// Creates a [`Config`] selecting the by-reference execution shape and
    /// every TOS ring disabled, the only combination §4.2's fallback rule
    /// allows unconditionally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the tail-call threaded execution shape when `enable` is
    /// `true`, the by-reference loop otherwise.
    ///
    /// # Note
    ///
    /// Without the `trampolines` feature, [`crate::engine::FuncBody::run`]
    /// always uses the by-reference loop regardless of this setting.
    pub fn tail_call(&mut self, enable: bool) -> &mut Self {
        self.is_tail_call = enable;
        self
    }

    /// Sets the `i32` TOS ring extent. By-reference mode requires this
    /// empty; see [`TranslateOption::validate`].
    pub fn i32_ring(&mut self, ring: Ring) -> &mut Self {
        self.i32_ring = ring;
        self
    }

    /// Sets the `i64` TOS ring extent.
    pub fn i64_ring(&mut self, ring: Ring) -> &mut Self {
        self.i64_ring = ring;
        self
    }

    /// Sets the `f32` TOS ring extent.
    pub fn f32_ring(&mut self, ring: Ring) -> &mut Self {
        self.f32_ring = ring;
        self
    }

    /// Sets the `f64` TOS ring extent.
    pub fn f64_ring(&mut self, ring: Ring) -> &mut Self {
        self.f64_ring = ring;
        self
    }

    /// Sets the operand stack's initial reserved capacity, in values.
    ///
    /// Default: 64. The validator's stack-height maximum for a given
    /// function (§3, "operand stack memory") is not available to this core
    /// in isolation; callers that know it should pass it here to avoid
    /// reallocation during translation-time-verified execution.
    pub fn initial_operand_capacity(&mut self, capacity: usize) -> &mut Self {
        self.initial_operand_capacity = capacity;
        self
    }

    pub(crate) fn is_tail_call(&self) -> bool {
        self.is_tail_call
    }

    /// Builds a fresh [`OperandStack`] sized by
    /// [`Config::initial_operand_capacity`].
    pub fn new_operand_stack(&self) -> OperandStack {
        OperandStack::with_capacity(self.initial_operand_capacity)
    }

    /// Builds the [`TranslateOption`] this configuration describes.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateOptionError`] if the chosen rings are invalid for
    /// the chosen execution shape.
    pub fn translate_option(&self) -> Result<TranslateOption, TranslateOptionError> {
        let option = TranslateOption::new(
            self.is_tail_call,
            Some(0),
            Some(1),
            self.i32_ring,
            self.i64_ring,
            self.f32_ring,
            self.f64_ring,
        );
        option.validate()?;
        Ok(option)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::new().translate_option().is_ok());
    }

    #[test]
    fn non_empty_ring_without_tail_call_is_rejected() {
        let mut config = Config::new();
        config.i32_ring(Ring::new(0, 2));
        assert!(config.translate_option().is_err());
    }

    #[test]
    fn tail_call_with_ring_validates() {
        let mut config = Config::new();
        config.tail_call(true).i32_ring(Ring::new(0, 2));
        assert!(config.translate_option().is_ok());
    }
}
