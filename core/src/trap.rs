use core::fmt::{self, Display};

/// An invalid [`TrapCode`] integer value.
#[derive(Debug, Copy, Clone)]
pub struct InvalidTrapCode;

macro_rules! generate_trap_code {
    (
        $( $(#[$attr:meta])* $ident:ident = $discr:literal ),* $(,)?
    ) => {
        /// A trap raised by a handler and delivered to a host-installed
        /// trap callback.
        ///
        /// A trap aborts the currently executing interpreter loop; it is
        /// never caught or resumed by Wasm code itself.
        #[derive(Debug, Copy, Clone, PartialEq, Eq)]
        #[repr(u8)]
        pub enum TrapCode {
            $(
                $( #[$attr] )*
                $ident = $discr
            ),*
        }

        impl From<TrapCode> for u8 {
            fn from(trap_code: TrapCode) -> Self {
                trap_code as _
            }
        }

        impl TryFrom<u8> for TrapCode {
            type Error = InvalidTrapCode;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $discr => Ok(TrapCode::$ident), )*
                    _ => Err(InvalidTrapCode),
                }
            }
        }

        #[cfg(test)]
        mod generated_trap_code_tests {
            use super::*;

            #[test]
            fn trap_code_conversion() {
                $(
                    assert_eq!(
                        TrapCode::try_from(TrapCode::$ident as u8).unwrap(),
                        TrapCode::$ident,
                    );
                )*
                assert!(TrapCode::try_from(u8::MAX).is_err());
            }
        }
    };
}
generate_trap_code! {
    // Note: we deliberately do _not_ assign the zero value so that it can be used as success state
    //       in `Result<(), TrapCode>` as the compiler can then generate slightly better code.

    /// An `unreachable` opcode was actually reached.
    UnreachableCodeReached = 1,

    /// Attempt to load or store at an address outside the bounds of linear memory.
    MemoryOutOfBounds = 2,

    /// Attempt to access a table element at an index outside its bounds.
    TableOutOfBounds = 3,

    /// A `call_indirect` instruction called a function at an uninitialized
    /// (i.e. `null`) table index.
    IndirectCallToNull = 4,

    /// Attempt to divide by zero.
    IntegerDivisionByZero = 5,

    /// A signed integer division or remainder overflowed, i.e.
    /// `INT_MIN / -1`.
    IntegerOverflow = 6,

    /// Attempted to truncate a NaN, an infinity, or an out-of-range float
    /// into an integer.
    BadConversionToInteger = 7,

    /// A `call_indirect` instruction called a function whose signature did
    /// not match the expected one.
    BadSignature = 8,
}

impl TrapCode {
    /// Returns the trap message as specified by the WebAssembly specification.
    pub fn trap_message(&self) -> &'static str {
        match self {
            Self::UnreachableCodeReached => "wasm `unreachable` instruction executed",
            Self::MemoryOutOfBounds => "out of bounds memory access",
            Self::TableOutOfBounds => "undefined element: out of bounds table access",
            Self::IndirectCallToNull => "uninitialized element",
            Self::IntegerDivisionByZero => "integer divide by zero",
            Self::IntegerOverflow => "integer overflow",
            Self::BadConversionToInteger => "invalid conversion to integer",
            Self::BadSignature => "indirect call type mismatch",
        }
    }
}

impl Display for TrapCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.trap_message())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TrapCode {}

#[cfg(not(feature = "std"))]
impl core::error::Error for TrapCode {}
