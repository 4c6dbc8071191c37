use crate::ring::Ring;
use core::fmt::{self, Display};

/// Which handler argument carries the "current instruction pointer" or the
/// operand-stack memory pointer.
///
/// Mirrors `local_stack_ptr_pos`/`operand_stack_ptr_pos` of the original
/// interpreter: each is either a concrete argument-vector index or absent
/// (`None`), in which case the other position doubles as both roles.
pub type ArgPosition = Option<usize>;

/// Errors returned by [`TranslateOption::validate`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TranslateOptionError {
    /// Both `local_ptr_position` and `operand_ptr_position` were absent.
    MissingBasePointer,
    /// By-reference mode (`is_tail_call == false`) was selected with at
    /// least one non-empty TOS ring; by-reference mode requires every ring
    /// to be empty.
    CachingRequiresTailCall,
}

impl Display for TranslateOptionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MissingBasePointer => {
                write!(f, "local_ptr_position and operand_ptr_position are both absent")
            }
            Self::CachingRequiresTailCall => write!(
                f,
                "by-reference mode requires every TOS ring to be empty"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TranslateOptionError {}

#[cfg(not(feature = "std"))]
impl core::error::Error for TranslateOptionError {}

/// Immutable, per-translation configuration of the TOS cache and handler
/// argument-vector layout.
///
/// Chosen once before a function body is translated; has no runtime
/// mutators (see the Memory interface and trap-callback setters, which are
/// the only other configuration surfaces, for contrast).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TranslateOption {
    is_tail_call: bool,
    local_ptr_position: ArgPosition,
    operand_ptr_position: ArgPosition,
    i32_range: Ring,
    i64_range: Ring,
    f32_range: Ring,
    f64_range: Ring,
}

impl TranslateOption {
    /// Creates a new [`TranslateOption`].
    pub const fn new(
        is_tail_call: bool,
        local_ptr_position: ArgPosition,
        operand_ptr_position: ArgPosition,
        i32_range: Ring,
        i64_range: Ring,
        f32_range: Ring,
        f64_range: Ring,
    ) -> Self {
        Self {
            is_tail_call,
            local_ptr_position,
            operand_ptr_position,
            i32_range,
            i64_range,
            f32_range,
            f64_range,
        }
    }

    /// The by-reference-mode option: tail calls disabled, every TOS ring
    /// empty, operands flow entirely through operand-stack memory.
    pub const fn by_reference() -> Self {
        Self::new(false, Some(0), Some(1), Ring::empty(), Ring::empty(), Ring::empty(), Ring::empty())
    }

    /// Validates the invariants from §3/§4.2: exactly one base pointer may
    /// be absent, and by-reference mode requires every ring empty.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateOptionError`] describing which invariant failed.
    pub fn validate(&self) -> Result<(), TranslateOptionError> {
        if self.local_ptr_position.is_none() && self.operand_ptr_position.is_none() {
            return Err(TranslateOptionError::MissingBasePointer);
        }
        if !self.is_tail_call {
            let all_empty = self.i32_range.is_empty()
                && self.i64_range.is_empty()
                && self.f32_range.is_empty()
                && self.f64_range.is_empty();
            if !all_empty {
                return Err(TranslateOptionError::CachingRequiresTailCall);
            }
        }
        Ok(())
    }

    pub const fn is_tail_call(&self) -> bool {
        self.is_tail_call
    }

    pub const fn local_ptr_position(&self) -> ArgPosition {
        self.local_ptr_position
    }

    pub const fn operand_ptr_position(&self) -> ArgPosition {
        self.operand_ptr_position
    }

    pub const fn i32_range(&self) -> Ring {
        self.i32_range
    }

    pub const fn i64_range(&self) -> Ring {
        self.i64_range
    }

    pub const fn f32_range(&self) -> Ring {
        self.f32_range
    }

    pub const fn f64_range(&self) -> Ring {
        self.f64_range
    }

    /// Returns `true` if the `i32` and `f32` rings are merged (same
    /// physical slots, reinterpreted by logical type).
    pub const fn i32_f32_merged(&self) -> bool {
        self.i32_range.merges_with(&self.f32_range)
    }

    /// Returns `true` if the `i64` and `f64` rings are merged.
    pub const fn i64_f64_merged(&self) -> bool {
        self.i64_range.merges_with(&self.f64_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_reference_validates() {
        assert_eq!(TranslateOption::by_reference().validate(), Ok(()));
    }

    #[test]
    fn missing_both_base_pointers_is_an_error() {
        let opt = TranslateOption::new(
            true, None, None, Ring::empty(), Ring::empty(), Ring::empty(), Ring::empty(),
        );
        assert_eq!(opt.validate(), Err(TranslateOptionError::MissingBasePointer));
    }

    #[test]
    fn non_tail_call_with_cache_is_an_error() {
        let opt = TranslateOption::new(
            false, Some(0), Some(1), Ring::new(0, 2), Ring::empty(), Ring::empty(), Ring::empty(),
        );
        assert_eq!(
            opt.validate(),
            Err(TranslateOptionError::CachingRequiresTailCall)
        );
    }

    #[test]
    fn merged_ranges_detected() {
        let opt = TranslateOption::new(
            true,
            Some(0),
            Some(1),
            Ring::new(2, 4),
            Ring::empty(),
            Ring::new(2, 4),
            Ring::empty(),
        );
        assert!(opt.i32_f32_merged());
        assert!(!opt.i64_f64_merged());
    }
}
