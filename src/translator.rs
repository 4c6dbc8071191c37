//! Lowers a sequence of already-decoded, type-checked operators into a
//! packed instruction stream.
//!
//! Wasm binary decoding and validation happen upstream and are out of scope
//! here (see the crate documentation): this module receives [`SourceOp`]s
//! that are already known to be well-typed, and performs the single forward
//! walk the design notes describe, tracking label positions for branch
//! fix-ups and the [`StackTopCursor`] for bookkeeping.
//!
//! Constants and same-type unary/binary arithmetic consult `self.cursor` to
//! pick between a plain opcode and its cache-aware counterpart (emitted only
//! when the relevant ring is non-empty and the assigned slot fits a byte);
//! every other operator — locals, loads/stores, conversions, control flow —
//! still only ever walks operand-stack memory, so the cursor is advanced for
//! `BrIf`/`BrTable` purely for bookkeeping and never changes what gets
//! emitted for those.

use uwvm_int_ir::{
    OpCode, StackTopCursor, Stream, StreamBuilder, StreamPos, TranslateOption,
    TranslateOptionError, ValKind,
};

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

/// Identifies a branch target within one function body's [`SourceOp`] list.
///
/// Assigned by the caller (the decoder/validator) to every block, loop and
/// if/else boundary some branch in the body targets. Opaque beyond that: the
/// translator never reconstructs block nesting, only label placement order.
pub type LabelId = u32;

/// One decoded, type-checked Wasm operator, ready for translation.
///
/// Structured control flow (blocks, loops, ifs) is already flattened by the
/// caller into label placements and branches against them.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOp {
    /// A branch target later `Br`/`BrIf` operators in the same body may
    /// reference. Each `LabelId` must be placed at most once.
    Label(LabelId),
    Unreachable,
    Br(LabelId),
    BrIf(LabelId),
    /// A `br_table`: `targets[i]` is the label taken when the index operand
    /// equals `i`; `default` is taken when the index is out of range.
    BrTable { targets: Vec<LabelId>, default: LabelId },
    Return,
    LocalGet(u32),
    LocalSet(u32),
    LocalTee(u32),
    I32Const(i32),
    I64Const(i64),
    F32Const(f32),
    F64Const(f64),
    /// A memory load/store; carries its static offset immediate.
    MemOp(OpCode, u64),
    /// Any opcode with no immediates of its own: arithmetic, comparisons,
    /// conversions, reinterpretations and the trunc/sat family.
    Op(OpCode),
}

/// Errors produced while lowering a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorError {
    /// The supplied [`TranslateOption`] failed its own validation.
    InvalidOption(TranslateOptionError),
    /// A `Br`/`BrIf` referenced a [`LabelId`] no `Label` in the body defines.
    UnresolvedLabel(LabelId),
    /// The same [`LabelId`] was placed more than once in one body.
    DuplicateLabel(LabelId),
}

impl From<TranslateOptionError> for TranslatorError {
    fn from(err: TranslateOptionError) -> Self {
        Self::InvalidOption(err)
    }
}

/// Lowers one function body's [`SourceOp`] sequence into a [`Stream`],
/// keyed to a single [`TranslateOption`].
pub struct Translator {
    option: TranslateOption,
    cursor: StackTopCursor,
}

impl Translator {
    /// Creates a translator for `option`, which must already validate.
    ///
    /// # Errors
    ///
    /// Returns [`TranslatorError::InvalidOption`] if `option` is invalid.
    pub fn new(option: TranslateOption) -> Result<Self, TranslatorError> {
        option.validate()?;
        let cursor = StackTopCursor::new(&option);
        Ok(Self { option, cursor })
    }

    /// Translates `body` into a finished instruction stream.
    ///
    /// # Errors
    ///
    /// Returns [`TranslatorError::UnresolvedLabel`] if a branch targets a
    /// label the body never places, or [`TranslatorError::DuplicateLabel`]
    /// if the body places the same label twice.
    pub fn translate(&mut self, body: &[SourceOp]) -> Result<Stream, TranslatorError> {
        let mut builder = StreamBuilder::new();
        let mut labels: Vec<Option<StreamPos>> = Vec::new();
        let mut pending: Vec<(LabelId, StreamPos)> = Vec::new();

        for op in body {
            match op {
                SourceOp::Label(id) => {
                    let id = *id;
                    reserve(&mut labels, id);
                    if labels[id as usize].is_some() {
                        return Err(TranslatorError::DuplicateLabel(id));
                    }
                    labels[id as usize] = Some(builder.position());
                }
                SourceOp::Unreachable => builder.emit_op(OpCode::Unreachable),
                SourceOp::Br(id) => {
                    builder.emit_op(OpCode::Br);
                    pending.push((*id, builder.emit_placeholder_target()));
                }
                SourceOp::BrIf(id) => {
                    builder.emit_op(OpCode::BrIf);
                    pending.push((*id, builder.emit_placeholder_target()));
                    self.cursor.pop(&self.option, ValKind::I32);
                }
                SourceOp::BrTable { ref targets, default } => {
                    builder.emit_op(OpCode::BrTable);
                    let count: u32 = targets.len().try_into().expect("br_table target count overflows u32");
                    builder.emit_imm::<u32>(count);
                    for &id in targets {
                        pending.push((id, builder.emit_placeholder_target()));
                    }
                    pending.push((*default, builder.emit_placeholder_target()));
                    self.cursor.pop(&self.option, ValKind::I32);
                }
                SourceOp::Return => builder.emit_op(OpCode::Return),
                SourceOp::LocalGet(index) => {
                    builder.emit_op(OpCode::LocalGet);
                    builder.emit_imm::<u32>(*index);
                }
                SourceOp::LocalSet(index) => {
                    builder.emit_op(OpCode::LocalSet);
                    builder.emit_imm::<u32>(*index);
                }
                SourceOp::LocalTee(index) => {
                    builder.emit_op(OpCode::LocalTee);
                    builder.emit_imm::<u32>(*index);
                }
                SourceOp::I32Const(value) => {
                    self.emit_const_i32(&mut builder, *value);
                }
                SourceOp::I64Const(value) => {
                    self.emit_const_i64(&mut builder, *value);
                }
                SourceOp::F32Const(value) => {
                    self.emit_const_f32(&mut builder, *value);
                }
                SourceOp::F64Const(value) => {
                    self.emit_const_f64(&mut builder, *value);
                }
                SourceOp::MemOp(code, offset) => {
                    builder.emit_op(*code);
                    builder.emit_imm::<u64>(*offset);
                }
                SourceOp::Op(code) => self.emit_op(&mut builder, *code),
            }
        }

        for (id, pos) in pending {
            let target = labels
                .get(id as usize)
                .copied()
                .flatten()
                .ok_or(TranslatorError::UnresolvedLabel(id))?;
            builder.patch_target(pos, target);
        }

        Ok(builder.finish())
    }

    fn emit_const_i32(&mut self, builder: &mut StreamBuilder, value: i32) {
        match self.cache_slot_u8(|c, o| c.push(o, ValKind::I32)) {
            Some(slot) => {
                builder.emit_op(OpCode::I32ConstCached);
                builder.emit_imm::<i32>(value);
                builder.emit_imm::<u8>(slot);
            }
            None => {
                builder.emit_op(OpCode::I32Const);
                builder.emit_imm::<i32>(value);
            }
        }
    }

    fn emit_const_i64(&mut self, builder: &mut StreamBuilder, value: i64) {
        match self.cache_slot_u8(|c, o| c.push(o, ValKind::I64)) {
            Some(slot) => {
                builder.emit_op(OpCode::I64ConstCached);
                builder.emit_imm::<i64>(value);
                builder.emit_imm::<u8>(slot);
            }
            None => {
                builder.emit_op(OpCode::I64Const);
                builder.emit_imm::<i64>(value);
            }
        }
    }

    fn emit_const_f32(&mut self, builder: &mut StreamBuilder, value: f32) {
        match self.cache_slot_u8(|c, o| c.push(o, ValKind::F32)) {
            Some(slot) => {
                builder.emit_op(OpCode::F32ConstCached);
                builder.emit_imm::<f32>(value);
                builder.emit_imm::<u8>(slot);
            }
            None => {
                builder.emit_op(OpCode::F32Const);
                builder.emit_imm::<f32>(value);
            }
        }
    }

    fn emit_const_f64(&mut self, builder: &mut StreamBuilder, value: f64) {
        match self.cache_slot_u8(|c, o| c.push(o, ValKind::F64)) {
            Some(slot) => {
                builder.emit_op(OpCode::F64ConstCached);
                builder.emit_imm::<f64>(value);
                builder.emit_imm::<u8>(slot);
            }
            None => {
                builder.emit_op(OpCode::F64Const);
                builder.emit_imm::<f64>(value);
            }
        }
    }

    /// Emits `code`, upgrading it to its `*Cached` counterpart when `code` is
    /// a same-type unary or binary op and the cursor assigns every slot it
    /// needs a byte-sized index; otherwise emits the plain opcode unchanged.
    fn emit_op(&mut self, builder: &mut StreamBuilder, code: OpCode) {
        if let Some(kind) = binary_kind(code) {
            let rhs = self.cache_slot_u8(|c, o| c.pop(o, kind));
            let lhs = self.cache_slot_u8(|c, o| c.pop(o, kind));
            let result = self.cache_slot_u8(|c, o| c.push(o, kind));
            if let (Some(rhs), Some(lhs), Some(result)) = (rhs, lhs, result) {
                builder.emit_op(cached_binary_opcode(kind));
                builder.emit_imm::<u16>(code.to_u16());
                builder.emit_imm::<u8>(rhs);
                builder.emit_imm::<u8>(lhs);
                builder.emit_imm::<u8>(result);
                return;
            }
        } else if let Some(kind) = unary_kind(code) {
            let operand = self.cache_slot_u8(|c, o| c.pop(o, kind));
            let result = self.cache_slot_u8(|c, o| c.push(o, kind));
            if let (Some(operand), Some(result)) = (operand, result) {
                builder.emit_op(cached_unary_opcode(kind));
                builder.emit_imm::<u16>(code.to_u16());
                builder.emit_imm::<u8>(operand);
                builder.emit_imm::<u8>(result);
                return;
            }
        }
        builder.emit_op(code);
    }

    /// Runs `step` against the cursor and narrows the resulting slot to a
    /// `u8`, the width cache-aware instructions encode it with. A ring long
    /// enough to overflow a byte falls back to the plain, uncached opcode.
    fn cache_slot_u8(
        &mut self,
        step: impl FnOnce(&mut StackTopCursor, &TranslateOption) -> Option<usize>,
    ) -> Option<u8> {
        step(&mut self.cursor, &self.option).and_then(|slot| u8::try_from(slot).ok())
    }
}

/// Returns the scalar type of a same-type binary arithmetic/bitwise/
/// shift/rotate op eligible for TOS caching, or `None` for anything else
/// (comparisons and asymmetric-type ops are never cached).
fn binary_kind(code: OpCode) -> Option<ValKind> {
    use OpCode::*;
    match code {
        I32Add | I32Sub | I32Mul | I32And | I32Or | I32Xor | I32Shl | I32ShrS | I32Rotl | I32Rotr => {
            Some(ValKind::I32)
        }
        I64Add | I64Sub | I64Mul | I64And | I64Or | I64Xor | I64Shl | I64ShrS | I64Rotl | I64Rotr => {
            Some(ValKind::I64)
        }
        F32Add | F32Sub | F32Mul | F32Div | F32Min | F32Max | F32Copysign => Some(ValKind::F32),
        F64Add | F64Sub | F64Mul | F64Div | F64Min | F64Max | F64Copysign => Some(ValKind::F64),
        _ => None,
    }
}

/// Returns the scalar type of a same-type unary op eligible for TOS
/// caching (the numeric unary family; `eqz` and the trunc/convert/
/// reinterpret families change type and are excluded).
fn unary_kind(code: OpCode) -> Option<ValKind> {
    use OpCode::*;
    match code {
        I32Clz | I32Ctz | I32Popcnt => Some(ValKind::I32),
        I64Clz | I64Ctz | I64Popcnt => Some(ValKind::I64),
        F32Abs | F32Neg | F32Ceil | F32Floor | F32Trunc | F32Nearest | F32Sqrt => Some(ValKind::F32),
        F64Abs | F64Neg | F64Ceil | F64Floor | F64Trunc | F64Nearest | F64Sqrt => Some(ValKind::F64),
        _ => None,
    }
}

fn cached_binary_opcode(kind: ValKind) -> OpCode {
    match kind {
        ValKind::I32 => OpCode::I32BinCached,
        ValKind::I64 => OpCode::I64BinCached,
        ValKind::F32 => OpCode::F32BinCached,
        ValKind::F64 => OpCode::F64BinCached,
    }
}

fn cached_unary_opcode(kind: ValKind) -> OpCode {
    match kind {
        ValKind::I32 => OpCode::I32UnCached,
        ValKind::I64 => OpCode::I64UnCached,
        ValKind::F32 => OpCode::F32UnCached,
        ValKind::F64 => OpCode::F64UnCached,
    }
}

fn reserve(labels: &mut Vec<Option<StreamPos>>, id: LabelId) {
    let id = id as usize;
    if labels.len() <= id {
        labels.resize(id + 1, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uwvm_int_ir::Ip;

    #[test]
    fn constant_fold_body_lowers_to_three_instructions() {
        let mut translator = Translator::new(TranslateOption::by_reference()).unwrap();
        let body = [
            SourceOp::I32Const(7),
            SourceOp::I32Const(11),
            SourceOp::Op(OpCode::I32Mul),
        ];
        let stream = translator.translate(&body).unwrap();

        let mut ip = Ip::new(&stream);
        assert_eq!(ip.decode_op().unwrap(), OpCode::I32Const);
        assert_eq!(ip.decode_imm::<i32>().unwrap(), 7);
        assert_eq!(ip.decode_op().unwrap(), OpCode::I32Const);
        assert_eq!(ip.decode_imm::<i32>().unwrap(), 11);
        assert_eq!(ip.decode_op().unwrap(), OpCode::I32Mul);
    }

    #[test]
    fn forward_branch_patches_to_the_label_that_follows_it() {
        let mut translator = Translator::new(TranslateOption::by_reference()).unwrap();
        let body = [
            SourceOp::I32Const(1),
            SourceOp::Br(0),
            SourceOp::I32Const(2),
            SourceOp::Label(0),
        ];
        let stream = translator.translate(&body).unwrap();

        let mut ip = Ip::new(&stream);
        assert_eq!(ip.decode_op().unwrap(), OpCode::I32Const);
        ip.decode_imm::<i32>().unwrap();
        assert_eq!(ip.decode_op().unwrap(), OpCode::Br);
        let target = ip.decode_target().unwrap();

        ip.jump_to(target);
        assert!(ip.decode_op().is_err(), "label position is the stream's end");
    }

    #[test]
    fn branch_to_a_label_never_placed_is_an_error() {
        let mut translator = Translator::new(TranslateOption::by_reference()).unwrap();
        let body = [SourceOp::Br(0)];
        assert_eq!(
            translator.translate(&body),
            Err(TranslatorError::UnresolvedLabel(0))
        );
    }

    #[test]
    fn placing_the_same_label_twice_is_an_error() {
        let mut translator = Translator::new(TranslateOption::by_reference()).unwrap();
        let body = [SourceOp::Label(0), SourceOp::Label(0)];
        assert_eq!(
            translator.translate(&body),
            Err(TranslatorError::DuplicateLabel(0))
        );
    }
}
