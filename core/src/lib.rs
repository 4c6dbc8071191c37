#![cfg_attr(not(feature = "std"), no_std)]
#![warn(
    clippy::cast_lossless,
    clippy::missing_errors_doc,
    clippy::used_underscore_binding,
    clippy::redundant_closure_for_method_calls,
    clippy::map_unwrap_or
)]

//! Value representation, IEEE-754/wrapping numeric semantics and trap codes
//! shared by every part of the `uwvm_int` interpreter core.
//!
//! This crate has no knowledge of instruction streams, TOS caches or
//! translation; it only provides the scalar value types and the pure
//! functions that implement Wasm's numeric instruction semantics, so that
//! the engine crate can specialise handlers over them without duplicating
//! trap-sensitive arithmetic in more than one place.

mod hint;
mod memory;
mod nan_preserving_float;
mod trap;
mod units;
mod untyped;
mod value;
pub mod wasm;

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

pub use self::{
    hint::{cold, likely, unlikely},
    nan_preserving_float::{F32, F64},
    trap::TrapCode,
    units::Pages,
    untyped::{ReadAs, UntypedVal, WriteAs},
    value::{
        ArithmeticOps,
        ExtendInto,
        Float,
        Integer,
        LittleEndianConvert,
        LoadInto,
        SignExtendFrom,
        StoreFrom,
        TransmuteInto,
        TruncateSaturateInto,
        TryTruncateInto,
        WrapInto,
    },
};
