/// An invalid [`OpCode`] discriminant.
#[derive(Debug, Copy, Clone)]
pub struct InvalidOpCode;

macro_rules! for_each_op {
    ($mac:ident) => {
        $mac! {
            // Control
            Unreachable,
            Br,
            BrIf,
            BrTable,
            Return,
            Call,
            CallIndirect,

            // Locals
            LocalGet,
            LocalSet,
            LocalTee,

            // Constants
            I32Const,
            I64Const,
            F32Const,
            F64Const,

            // i32/i64 unary
            I32Clz, I32Ctz, I32Popcnt, I32Eqz,
            I64Clz, I64Ctz, I64Popcnt, I64Eqz,

            // i32/i64 binary arithmetic/bitwise/shift/rotate
            I32Add, I32Sub, I32Mul, I32And, I32Or, I32Xor, I32Shl, I32ShrS, I32ShrU, I32Rotl, I32Rotr,
            I64Add, I64Sub, I64Mul, I64And, I64Or, I64Xor, I64Shl, I64ShrS, I64ShrU, I64Rotl, I64Rotr,

            // i32/i64 division and remainder
            I32DivS, I32DivU, I32RemS, I32RemU,
            I64DivS, I64DivU, I64RemS, I64RemU,

            // i32/i64 comparisons
            I32Eq, I32Ne, I32LtS, I32LtU, I32LeS, I32LeU, I32GtS, I32GtU, I32GeS, I32GeU,
            I64Eq, I64Ne, I64LtS, I64LtU, I64LeS, I64LeU, I64GtS, I64GtU, I64GeS, I64GeU,

            // f32/f64 comparisons
            F32Eq, F32Ne, F32Lt, F32Le, F32Gt, F32Ge,
            F64Eq, F64Ne, F64Lt, F64Le, F64Gt, F64Ge,

            // f32/f64 unary
            F32Abs, F32Neg, F32Ceil, F32Floor, F32Trunc, F32Nearest, F32Sqrt,
            F64Abs, F64Neg, F64Ceil, F64Floor, F64Trunc, F64Nearest, F64Sqrt,

            // f32/f64 binary
            F32Add, F32Sub, F32Mul, F32Div, F32Min, F32Max, F32Copysign,
            F64Add, F64Sub, F64Mul, F64Div, F64Min, F64Max, F64Copysign,

            // Conversions
            I32WrapI64,
            I64ExtendI32S, I64ExtendI32U,
            I32TruncF32S, I32TruncF32U, I32TruncF64S, I32TruncF64U,
            I64TruncF32S, I64TruncF32U, I64TruncF64S, I64TruncF64U,
            F32ConvertI32S, F32ConvertI32U, F32ConvertI64S, F32ConvertI64U,
            F64ConvertI32S, F64ConvertI32U, F64ConvertI64S, F64ConvertI64U,
            F32DemoteF64, F64PromoteF32,
            I32ReinterpretF32, F32ReinterpretI32, I64ReinterpretF64, F64ReinterpretI64,

            // `sign-extension` proposal
            I32Extend8S, I32Extend16S, I64Extend8S, I64Extend16S, I64Extend32S,

            // `saturating-float-to-int` proposal
            I32TruncSatF32S, I32TruncSatF32U, I32TruncSatF64S, I32TruncSatF64U,
            I64TruncSatF32S, I64TruncSatF32U, I64TruncSatF64S, I64TruncSatF64U,

            // Linear memory access
            I32Load, I64Load, F32Load, F64Load,
            I32Load8S, I32Load8U, I32Load16S, I32Load16U,
            I64Load8S, I64Load8U, I64Load16S, I64Load16U, I64Load32S, I64Load32U,
            I32Store, I64Store, F32Store, F64Store,
            I32Store8, I32Store16, I64Store8, I64Store16, I64Store32,

            // TOS-cache-aware variants: emitted instead of the plain opcode
            // above when the translator's `TranslateOption` enables caching
            // for the relevant type and `StackTopCursor` assigns a slot that
            // fits a byte (see `uwvm_int::translator`). Each carries the
            // plain opcode's tag plus the cache slot(s) it must also write.
            I32ConstCached, I64ConstCached, F32ConstCached, F64ConstCached,
            I32BinCached, I64BinCached, F32BinCached, F64BinCached,
            I32UnCached, I64UnCached, F32UnCached, F64UnCached,
        }
    };
}

macro_rules! define_opcode {
    ( $( $ident:ident ),* $(,)? ) => {
        /// Identifies a single Wasm operator implemented by a handler.
        ///
        /// This is the tag stored in the instruction stream in place of a
        /// literal handler pointer (see [`crate::stream`]); the dispatch
        /// table maps each tag back to its handler function.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        #[repr(u16)]
        #[allow(missing_docs)]
        pub enum OpCode {
            $( $ident ),*
        }

        impl OpCode {
            const COUNT: u16 = { let mut n = 0u16; $( let _ = stringify!($ident); n += 1; )* n };

            /// Returns the numeric discriminant of this opcode.
            pub const fn to_u16(self) -> u16 {
                self as u16
            }

            /// Recovers an [`OpCode`] from its numeric discriminant.
            pub fn from_u16(value: u16) -> Result<Self, InvalidOpCode> {
                const TABLE: &[OpCode] = &[ $( OpCode::$ident ),* ];
                TABLE.get(value as usize).copied().ok_or(InvalidOpCode)
            }
        }

        #[cfg(test)]
        mod opcode_roundtrip_tests {
            use super::*;

            #[test]
            fn every_opcode_round_trips_through_u16() {
                for i in 0..OpCode::COUNT {
                    let code = OpCode::from_u16(i).unwrap();
                    assert_eq!(code.to_u16(), i);
                }
                assert!(OpCode::from_u16(OpCode::COUNT).is_err());
            }
        }
    };
}

for_each_op!(define_opcode);
