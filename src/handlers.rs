//! One handler function per [`OpCode`], grouped by the macros that generate
//! their boilerplate. Each handler pops its operands from, and pushes its
//! result onto, the operand stack; the `*Cached` handlers additionally
//! mirror every value they touch into the matching [`crate::stack::TosCache`]
//! slot (see `stack.rs`).

use crate::dispatch::{trap_or, Done, Handler, VmState};
use uwvm_int_core::{wasm, TrapCode, UntypedVal};
use uwvm_int_ir::{Ip, OpCode, ValKind};

macro_rules! handler_unary {
    ($( fn $handler:ident($in_ty:ty => $out_ty:ty) = $eval:expr );* $(;)?) => {
        $(
            fn $handler<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
                let value: $in_ty = state.operand.pop().into();
                let result: $out_ty = ($eval)(value);
                state.operand.push(result.into());
                Done::cont(ip)
            }
        )*
    };
}

macro_rules! handler_unary_fallible {
    ($( fn $handler:ident($in_ty:ty => $out_ty:ty) = $eval:expr );* $(;)?) => {
        $(
            fn $handler<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
                let value: $in_ty = state.operand.pop().into();
                let result: $out_ty = trap_or!(state, ($eval)(value));
                state.operand.push(result.into());
                Done::cont(ip)
            }
        )*
    };
}

macro_rules! handler_binary {
    ($( fn $handler:ident($ty:ty) = $eval:expr );* $(;)?) => {
        $(
            fn $handler<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
                let rhs: $ty = state.operand.pop().into();
                let lhs: $ty = state.operand.pop().into();
                let result: $ty = ($eval)(lhs, rhs);
                state.operand.push(result.into());
                Done::cont(ip)
            }
        )*
    };
}

macro_rules! handler_binary_fallible {
    ($( fn $handler:ident($ty:ty) = $eval:expr );* $(;)?) => {
        $(
            fn $handler<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
                let rhs: $ty = state.operand.pop().into();
                let lhs: $ty = state.operand.pop().into();
                let result: $ty = trap_or!(state, ($eval)(lhs, rhs));
                state.operand.push(result.into());
                Done::cont(ip)
            }
        )*
    };
}

macro_rules! handler_compare {
    ($( fn $handler:ident($ty:ty) = $eval:expr );* $(;)?) => {
        $(
            fn $handler<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
                let rhs: $ty = state.operand.pop().into();
                let lhs: $ty = state.operand.pop().into();
                let result: bool = ($eval)(lhs, rhs);
                state.operand.push(UntypedVal::from(result));
                Done::cont(ip)
            }
        )*
    };
}

handler_binary! {
    fn i32_add(i32) = wasm::i32_add;
    fn i32_sub(i32) = wasm::i32_sub;
    fn i32_mul(i32) = wasm::i32_mul;
    fn i32_and(i32) = wasm::i32_bitand;
    fn i32_or(i32) = wasm::i32_bitor;
    fn i32_xor(i32) = wasm::i32_bitxor;
    fn i32_shl(i32) = wasm::i32_shl;
    fn i32_shr_s(i32) = wasm::i32_shr_s;
    fn i32_rotl(i32) = wasm::i32_rotl;
    fn i32_rotr(i32) = wasm::i32_rotr;

    fn i64_add(i64) = wasm::i64_add;
    fn i64_sub(i64) = wasm::i64_sub;
    fn i64_mul(i64) = wasm::i64_mul;
    fn i64_and(i64) = wasm::i64_bitand;
    fn i64_or(i64) = wasm::i64_bitor;
    fn i64_xor(i64) = wasm::i64_bitxor;
    fn i64_shl(i64) = wasm::i64_shl;
    fn i64_shr_s(i64) = wasm::i64_shr_s;
    fn i64_rotl(i64) = wasm::i64_rotl;
    fn i64_rotr(i64) = wasm::i64_rotr;

    fn f32_add(f32) = wasm::f32_add;
    fn f32_sub(f32) = wasm::f32_sub;
    fn f32_mul(f32) = wasm::f32_mul;
    fn f32_div(f32) = wasm::f32_div;
    fn f32_min(f32) = wasm::f32_min;
    fn f32_max(f32) = wasm::f32_max;
    fn f32_copysign(f32) = wasm::f32_copysign;

    fn f64_add(f64) = wasm::f64_add;
    fn f64_sub(f64) = wasm::f64_sub;
    fn f64_mul(f64) = wasm::f64_mul;
    fn f64_div(f64) = wasm::f64_div;
    fn f64_min(f64) = wasm::f64_min;
    fn f64_max(f64) = wasm::f64_max;
    fn f64_copysign(f64) = wasm::f64_copysign;
}

fn i32_shr_u<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let rhs: u32 = state.operand.pop().into();
    let lhs: u32 = state.operand.pop().into();
    state.operand.push(UntypedVal::from(wasm::i32_shr_u(lhs, rhs)));
    Done::cont(ip)
}

fn i64_shr_u<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let rhs: u64 = state.operand.pop().into();
    let lhs: u64 = state.operand.pop().into();
    state.operand.push(UntypedVal::from(wasm::i64_shr_u(lhs, rhs)));
    Done::cont(ip)
}

handler_binary_fallible! {
    fn i32_div_s(i32) = wasm::i32_div_s;
    fn i64_div_s(i64) = wasm::i64_div_s;
    fn i32_rem_s(i32) = wasm::i32_rem_s;
    fn i64_rem_s(i64) = wasm::i64_rem_s;
}

fn i32_div_u<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let rhs: u32 = state.operand.pop().into();
    let lhs: u32 = state.operand.pop().into();
    let result = trap_or!(state, wasm::i32_div_u(lhs, rhs));
    state.operand.push(UntypedVal::from(result));
    Done::cont(ip)
}

fn i64_div_u<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let rhs: u64 = state.operand.pop().into();
    let lhs: u64 = state.operand.pop().into();
    let result = trap_or!(state, wasm::i64_div_u(lhs, rhs));
    state.operand.push(UntypedVal::from(result));
    Done::cont(ip)
}

fn i32_rem_u<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let rhs: u32 = state.operand.pop().into();
    let lhs: u32 = state.operand.pop().into();
    let result = trap_or!(state, wasm::i32_rem_u(lhs, rhs));
    state.operand.push(UntypedVal::from(result));
    Done::cont(ip)
}

fn i64_rem_u<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let rhs: u64 = state.operand.pop().into();
    let lhs: u64 = state.operand.pop().into();
    let result = trap_or!(state, wasm::i64_rem_u(lhs, rhs));
    state.operand.push(UntypedVal::from(result));
    Done::cont(ip)
}

handler_unary! {
    fn i32_clz(i32 => i32) = wasm::i32_clz;
    fn i32_ctz(i32 => i32) = wasm::i32_ctz;
    fn i32_popcnt(i32 => i32) = wasm::i32_popcnt;
    fn i64_clz(i64 => i64) = wasm::i64_clz;
    fn i64_ctz(i64 => i64) = wasm::i64_ctz;
    fn i64_popcnt(i64 => i64) = wasm::i64_popcnt;

    fn i32_eqz(i32 => bool) = wasm::i32_eqz;
    fn i64_eqz(i64 => bool) = wasm::i64_eqz;

    fn f32_abs(f32 => f32) = wasm::f32_abs;
    fn f32_neg(f32 => f32) = wasm::f32_neg;
    fn f32_ceil(f32 => f32) = wasm::f32_ceil;
    fn f32_floor(f32 => f32) = wasm::f32_floor;
    fn f32_trunc(f32 => f32) = wasm::f32_trunc;
    fn f32_nearest(f32 => f32) = wasm::f32_nearest;
    fn f32_sqrt(f32 => f32) = wasm::f32_sqrt;

    fn f64_abs(f64 => f64) = wasm::f64_abs;
    fn f64_neg(f64 => f64) = wasm::f64_neg;
    fn f64_ceil(f64 => f64) = wasm::f64_ceil;
    fn f64_floor(f64 => f64) = wasm::f64_floor;
    fn f64_trunc(f64 => f64) = wasm::f64_trunc;
    fn f64_nearest(f64 => f64) = wasm::f64_nearest;
    fn f64_sqrt(f64 => f64) = wasm::f64_sqrt;

    fn i32_wrap_i64(i64 => i32) = wasm::i32_wrap_i64;
    fn i64_extend_i32_s(i32 => i64) = wasm::i64_extend_i32_s;
    fn i64_extend_i32_u(u32 => u64) = wasm::i64_extend_i32_u;
    fn f32_demote_f64(f64 => f32) = wasm::f32_demote_f64;
    fn f64_promote_f32(f32 => f64) = wasm::f64_promote_f32;

    fn f32_convert_i32_s(i32 => f32) = wasm::f32_convert_i32_s;
    fn f32_convert_i32_u(u32 => f32) = wasm::f32_convert_i32_u;
    fn f32_convert_i64_s(i64 => f32) = wasm::f32_convert_i64_s;
    fn f32_convert_i64_u(u64 => f32) = wasm::f32_convert_i64_u;
    fn f64_convert_i32_s(i32 => f64) = wasm::f64_convert_i32_s;
    fn f64_convert_i32_u(u32 => f64) = wasm::f64_convert_i32_u;
    fn f64_convert_i64_s(i64 => f64) = wasm::f64_convert_i64_s;
    fn f64_convert_i64_u(u64 => f64) = wasm::f64_convert_i64_u;

    fn i32_extend8_s(i32 => i32) = wasm::i32_extend8_s;
    fn i32_extend16_s(i32 => i32) = wasm::i32_extend16_s;
    fn i64_extend8_s(i64 => i64) = wasm::i64_extend8_s;
    fn i64_extend16_s(i64 => i64) = wasm::i64_extend16_s;
    fn i64_extend32_s(i64 => i64) = wasm::i64_extend32_s;

    fn i32_trunc_sat_f32_s(f32 => i32) = wasm::i32_trunc_sat_f32_s;
    fn i32_trunc_sat_f32_u(f32 => u32) = wasm::i32_trunc_sat_f32_u;
    fn i32_trunc_sat_f64_s(f64 => i32) = wasm::i32_trunc_sat_f64_s;
    fn i32_trunc_sat_f64_u(f64 => u32) = wasm::i32_trunc_sat_f64_u;
    fn i64_trunc_sat_f32_s(f32 => i64) = wasm::i64_trunc_sat_f32_s;
    fn i64_trunc_sat_f32_u(f32 => u64) = wasm::i64_trunc_sat_f32_u;
    fn i64_trunc_sat_f64_s(f64 => i64) = wasm::i64_trunc_sat_f64_s;
    fn i64_trunc_sat_f64_u(f64 => u64) = wasm::i64_trunc_sat_f64_u;
}

handler_unary_fallible! {
    fn i32_trunc_f32_s(f32 => i32) = wasm::i32_trunc_f32_s;
    fn i32_trunc_f32_u(f32 => u32) = wasm::i32_trunc_f32_u;
    fn i32_trunc_f64_s(f64 => i32) = wasm::i32_trunc_f64_s;
    fn i32_trunc_f64_u(f64 => u32) = wasm::i32_trunc_f64_u;
    fn i64_trunc_f32_s(f32 => i64) = wasm::i64_trunc_f32_s;
    fn i64_trunc_f32_u(f32 => u64) = wasm::i64_trunc_f32_u;
    fn i64_trunc_f64_s(f64 => i64) = wasm::i64_trunc_f64_s;
    fn i64_trunc_f64_u(f64 => u64) = wasm::i64_trunc_f64_u;
}

handler_unary! {
    fn i32_reinterpret_f32(f32 => i32) = wasm::i32_reinterpret_f32;
    fn f32_reinterpret_i32(i32 => f32) = wasm::f32_reinterpret_i32;
    fn i64_reinterpret_f64(f64 => i64) = wasm::i64_reinterpret_f64;
    fn f64_reinterpret_i64(i64 => f64) = wasm::f64_reinterpret_i64;
}

handler_compare! {
    fn i32_eq(i32) = wasm::i32_eq;
    fn i32_ne(i32) = wasm::i32_ne;
    fn i32_lt_s(i32) = wasm::i32_lt_s;
    fn i32_le_s(i32) = wasm::i32_le_s;
    fn i32_gt_s(i32) = wasm::i32_gt_s;
    fn i32_ge_s(i32) = wasm::i32_ge_s;

    fn i64_eq(i64) = wasm::i64_eq;
    fn i64_ne(i64) = wasm::i64_ne;
    fn i64_lt_s(i64) = wasm::i64_lt_s;
    fn i64_le_s(i64) = wasm::i64_le_s;
    fn i64_gt_s(i64) = wasm::i64_gt_s;
    fn i64_ge_s(i64) = wasm::i64_ge_s;

    fn f32_eq(f32) = wasm::f32_eq;
    fn f32_ne(f32) = wasm::f32_ne;
    fn f32_lt(f32) = wasm::f32_lt;
    fn f32_le(f32) = wasm::f32_le;
    fn f32_gt(f32) = wasm::f32_gt;
    fn f32_ge(f32) = wasm::f32_ge;

    fn f64_eq(f64) = wasm::f64_eq;
    fn f64_ne(f64) = wasm::f64_ne;
    fn f64_lt(f64) = wasm::f64_lt;
    fn f64_le(f64) = wasm::f64_le;
    fn f64_gt(f64) = wasm::f64_gt;
    fn f64_ge(f64) = wasm::f64_ge;
}

fn i32_lt_u<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let rhs: u32 = state.operand.pop().into();
    let lhs: u32 = state.operand.pop().into();
    state.operand.push(UntypedVal::from(wasm::i32_lt_u(lhs, rhs)));
    Done::cont(ip)
}
fn i32_le_u<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let rhs: u32 = state.operand.pop().into();
    let lhs: u32 = state.operand.pop().into();
    state.operand.push(UntypedVal::from(wasm::i32_le_u(lhs, rhs)));
    Done::cont(ip)
}
fn i32_gt_u<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let rhs: u32 = state.operand.pop().into();
    let lhs: u32 = state.operand.pop().into();
    state.operand.push(UntypedVal::from(wasm::i32_gt_u(lhs, rhs)));
    Done::cont(ip)
}
fn i32_ge_u<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let rhs: u32 = state.operand.pop().into();
    let lhs: u32 = state.operand.pop().into();
    state.operand.push(UntypedVal::from(wasm::i32_ge_u(lhs, rhs)));
    Done::cont(ip)
}
fn i64_lt_u<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let rhs: u64 = state.operand.pop().into();
    let lhs: u64 = state.operand.pop().into();
    state.operand.push(UntypedVal::from(wasm::i64_lt_u(lhs, rhs)));
    Done::cont(ip)
}
fn i64_le_u<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let rhs: u64 = state.operand.pop().into();
    let lhs: u64 = state.operand.pop().into();
    state.operand.push(UntypedVal::from(wasm::i64_le_u(lhs, rhs)));
    Done::cont(ip)
}
fn i64_gt_u<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let rhs: u64 = state.operand.pop().into();
    let lhs: u64 = state.operand.pop().into();
    state.operand.push(UntypedVal::from(wasm::i64_gt_u(lhs, rhs)));
    Done::cont(ip)
}
fn i64_ge_u<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let rhs: u64 = state.operand.pop().into();
    let lhs: u64 = state.operand.pop().into();
    state.operand.push(UntypedVal::from(wasm::i64_ge_u(lhs, rhs)));
    Done::cont(ip)
}

// --- Control ---

fn unreachable<'a>(state: &mut VmState<'a>, _ip: Ip<'a>) -> Done<'a> {
    state.traps.raise(TrapCode::UnreachableCodeReached)
}

fn br<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let mut ip = ip;
    let target = trap_or!(state, ip.decode_target().map_err(|_| TrapCode::BadSignature));
    Done::cont(ip_at(ip, target))
}

fn br_if<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let mut ip = ip;
    let target = trap_or!(state, ip.decode_target().map_err(|_| TrapCode::BadSignature));
    let cond: i32 = state.operand.pop().into();
    if cond != 0 {
        Done::cont(ip_at(ip, target))
    } else {
        Done::cont(ip)
    }
}

fn ip_at<'a>(ip: Ip<'a>, target: usize) -> Ip<'a> {
    let mut ip = ip;
    ip.jump_to(target);
    ip
}

fn return_<'a>(_state: &mut VmState<'a>, _ip: Ip<'a>) -> Done<'a> {
    Done::ret()
}

// --- Locals ---

fn local_get<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let mut ip = ip;
    let index: u32 = trap_or!(state, ip.decode_imm::<u32>().map_err(|_| TrapCode::BadSignature));
    let value = state.locals[index as usize];
    state.operand.push(value);
    Done::cont(ip)
}

fn local_set<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let mut ip = ip;
    let index: u32 = trap_or!(state, ip.decode_imm::<u32>().map_err(|_| TrapCode::BadSignature));
    state.locals[index as usize] = state.operand.pop();
    Done::cont(ip)
}

fn local_tee<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let mut ip = ip;
    let index: u32 = trap_or!(state, ip.decode_imm::<u32>().map_err(|_| TrapCode::BadSignature));
    state.locals[index as usize] = state.operand.peek();
    Done::cont(ip)
}

// --- Constants ---

fn i32_const<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let mut ip = ip;
    let value = trap_or!(state, ip.decode_imm::<i32>().map_err(|_| TrapCode::BadSignature));
    state.operand.push(UntypedVal::from(value));
    Done::cont(ip)
}

fn i64_const<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let mut ip = ip;
    let value = trap_or!(state, ip.decode_imm::<i64>().map_err(|_| TrapCode::BadSignature));
    state.operand.push(UntypedVal::from(value));
    Done::cont(ip)
}

fn f32_const<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let mut ip = ip;
    let value = trap_or!(state, ip.decode_imm::<f32>().map_err(|_| TrapCode::BadSignature));
    state.operand.push(UntypedVal::from(value));
    Done::cont(ip)
}

fn f64_const<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let mut ip = ip;
    let value = trap_or!(state, ip.decode_imm::<f64>().map_err(|_| TrapCode::BadSignature));
    state.operand.push(UntypedVal::from(value));
    Done::cont(ip)
}

// --- TOS-cache-aware variants ---
//
// Each handler below decodes the plain opcode its translator-time op tag
// names, evaluates it exactly as the plain handler would, and additionally
// mirrors every operand and result it touches into the matching `TosCache`
// slot. The mirrored copy is never read back here: `state.operand` stays
// the only value this or any other handler computes from, so a cache slot
// going stale because some untracked handler ran in between never affects
// correctness, only whether the mirror still matches.

macro_rules! handler_const_cached {
    ($( fn $handler:ident($ty:ty, $kind:expr) = $plain_push:expr );* $(;)?) => {
        $(
            fn $handler<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
                let mut ip = ip;
                let value = trap_or!(state, ip.decode_imm::<$ty>().map_err(|_| TrapCode::BadSignature));
                let slot = trap_or!(state, ip.decode_imm::<u8>().map_err(|_| TrapCode::BadSignature));
                let result: UntypedVal = ($plain_push)(value);
                state.operand.push(result);
                state.cache.write($kind, slot as usize, result);
                Done::cont(ip)
            }
        )*
    };
}

handler_const_cached! {
    fn i32_const_cached(i32, ValKind::I32) = UntypedVal::from;
    fn i64_const_cached(i64, ValKind::I64) = UntypedVal::from;
    fn f32_const_cached(f32, ValKind::F32) = UntypedVal::from;
    fn f64_const_cached(f64, ValKind::F64) = UntypedVal::from;
}

fn eval_i32_binary(op: OpCode, lhs: UntypedVal, rhs: UntypedVal) -> UntypedVal {
    match op {
        OpCode::I32Add => UntypedVal::from(wasm::i32_add(lhs.into(), rhs.into())),
        OpCode::I32Sub => UntypedVal::from(wasm::i32_sub(lhs.into(), rhs.into())),
        OpCode::I32Mul => UntypedVal::from(wasm::i32_mul(lhs.into(), rhs.into())),
        OpCode::I32And => UntypedVal::from(wasm::i32_bitand(lhs.into(), rhs.into())),
        OpCode::I32Or => UntypedVal::from(wasm::i32_bitor(lhs.into(), rhs.into())),
        OpCode::I32Xor => UntypedVal::from(wasm::i32_bitxor(lhs.into(), rhs.into())),
        OpCode::I32Shl => UntypedVal::from(wasm::i32_shl(lhs.into(), rhs.into())),
        OpCode::I32ShrS => UntypedVal::from(wasm::i32_shr_s(lhs.into(), rhs.into())),
        OpCode::I32Rotl => UntypedVal::from(wasm::i32_rotl(lhs.into(), rhs.into())),
        OpCode::I32Rotr => UntypedVal::from(wasm::i32_rotr(lhs.into(), rhs.into())),
        _ => unreachable!("translator only tags I32BinCached with i32 binary ops"),
    }
}

fn eval_i64_binary(op: OpCode, lhs: UntypedVal, rhs: UntypedVal) -> UntypedVal {
    match op {
        OpCode::I64Add => UntypedVal::from(wasm::i64_add(lhs.into(), rhs.into())),
        OpCode::I64Sub => UntypedVal::from(wasm::i64_sub(lhs.into(), rhs.into())),
        OpCode::I64Mul => UntypedVal::from(wasm::i64_mul(lhs.into(), rhs.into())),
        OpCode::I64And => UntypedVal::from(wasm::i64_bitand(lhs.into(), rhs.into())),
        OpCode::I64Or => UntypedVal::from(wasm::i64_bitor(lhs.into(), rhs.into())),
        OpCode::I64Xor => UntypedVal::from(wasm::i64_bitxor(lhs.into(), rhs.into())),
        OpCode::I64Shl => UntypedVal::from(wasm::i64_shl(lhs.into(), rhs.into())),
        OpCode::I64ShrS => UntypedVal::from(wasm::i64_shr_s(lhs.into(), rhs.into())),
        OpCode::I64Rotl => UntypedVal::from(wasm::i64_rotl(lhs.into(), rhs.into())),
        OpCode::I64Rotr => UntypedVal::from(wasm::i64_rotr(lhs.into(), rhs.into())),
        _ => unreachable!("translator only tags I64BinCached with i64 binary ops"),
    }
}

fn eval_f32_binary(op: OpCode, lhs: UntypedVal, rhs: UntypedVal) -> UntypedVal {
    match op {
        OpCode::F32Add => UntypedVal::from(wasm::f32_add(lhs.into(), rhs.into())),
        OpCode::F32Sub => UntypedVal::from(wasm::f32_sub(lhs.into(), rhs.into())),
        OpCode::F32Mul => UntypedVal::from(wasm::f32_mul(lhs.into(), rhs.into())),
        OpCode::F32Div => UntypedVal::from(wasm::f32_div(lhs.into(), rhs.into())),
        OpCode::F32Min => UntypedVal::from(wasm::f32_min(lhs.into(), rhs.into())),
        OpCode::F32Max => UntypedVal::from(wasm::f32_max(lhs.into(), rhs.into())),
        OpCode::F32Copysign => UntypedVal::from(wasm::f32_copysign(lhs.into(), rhs.into())),
        _ => unreachable!("translator only tags F32BinCached with f32 binary ops"),
    }
}

fn eval_f64_binary(op: OpCode, lhs: UntypedVal, rhs: UntypedVal) -> UntypedVal {
    match op {
        OpCode::F64Add => UntypedVal::from(wasm::f64_add(lhs.into(), rhs.into())),
        OpCode::F64Sub => UntypedVal::from(wasm::f64_sub(lhs.into(), rhs.into())),
        OpCode::F64Mul => UntypedVal::from(wasm::f64_mul(lhs.into(), rhs.into())),
        OpCode::F64Div => UntypedVal::from(wasm::f64_div(lhs.into(), rhs.into())),
        OpCode::F64Min => UntypedVal::from(wasm::f64_min(lhs.into(), rhs.into())),
        OpCode::F64Max => UntypedVal::from(wasm::f64_max(lhs.into(), rhs.into())),
        OpCode::F64Copysign => UntypedVal::from(wasm::f64_copysign(lhs.into(), rhs.into())),
        _ => unreachable!("translator only tags F64BinCached with f64 binary ops"),
    }
}

macro_rules! handler_binary_cached {
    ($( fn $handler:ident = ($kind:expr, $eval:expr) );* $(;)?) => {
        $(
            fn $handler<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
                let mut ip = ip;
                let tag = trap_or!(state, ip.decode_imm::<u16>().map_err(|_| TrapCode::BadSignature));
                let tag = trap_or!(state, OpCode::from_u16(tag).map_err(|_| TrapCode::BadSignature));
                let rhs_slot = trap_or!(state, ip.decode_imm::<u8>().map_err(|_| TrapCode::BadSignature));
                let lhs_slot = trap_or!(state, ip.decode_imm::<u8>().map_err(|_| TrapCode::BadSignature));
                let result_slot = trap_or!(state, ip.decode_imm::<u8>().map_err(|_| TrapCode::BadSignature));
                let rhs = state.operand.pop();
                let lhs = state.operand.pop();
                let result = ($eval)(tag, lhs, rhs);
                state.operand.push(result);
                state.cache.write($kind, rhs_slot as usize, rhs);
                state.cache.write($kind, lhs_slot as usize, lhs);
                state.cache.write($kind, result_slot as usize, result);
                Done::cont(ip)
            }
        )*
    };
}

handler_binary_cached! {
    fn i32_bin_cached = (ValKind::I32, eval_i32_binary);
    fn i64_bin_cached = (ValKind::I64, eval_i64_binary);
    fn f32_bin_cached = (ValKind::F32, eval_f32_binary);
    fn f64_bin_cached = (ValKind::F64, eval_f64_binary);
}

fn eval_i32_unary(op: OpCode, value: UntypedVal) -> UntypedVal {
    match op {
        OpCode::I32Clz => UntypedVal::from(wasm::i32_clz(value.into())),
        OpCode::I32Ctz => UntypedVal::from(wasm::i32_ctz(value.into())),
        OpCode::I32Popcnt => UntypedVal::from(wasm::i32_popcnt(value.into())),
        _ => unreachable!("translator only tags I32UnCached with i32 unary ops"),
    }
}

fn eval_i64_unary(op: OpCode, value: UntypedVal) -> UntypedVal {
    match op {
        OpCode::I64Clz => UntypedVal::from(wasm::i64_clz(value.into())),
        OpCode::I64Ctz => UntypedVal::from(wasm::i64_ctz(value.into())),
        OpCode::I64Popcnt => UntypedVal::from(wasm::i64_popcnt(value.into())),
        _ => unreachable!("translator only tags I64UnCached with i64 unary ops"),
    }
}

fn eval_f32_unary(op: OpCode, value: UntypedVal) -> UntypedVal {
    match op {
        OpCode::F32Abs => UntypedVal::from(wasm::f32_abs(value.into())),
        OpCode::F32Neg => UntypedVal::from(wasm::f32_neg(value.into())),
        OpCode::F32Ceil => UntypedVal::from(wasm::f32_ceil(value.into())),
        OpCode::F32Floor => UntypedVal::from(wasm::f32_floor(value.into())),
        OpCode::F32Trunc => UntypedVal::from(wasm::f32_trunc(value.into())),
        OpCode::F32Nearest => UntypedVal::from(wasm::f32_nearest(value.into())),
        OpCode::F32Sqrt => UntypedVal::from(wasm::f32_sqrt(value.into())),
        _ => unreachable!("translator only tags F32UnCached with f32 unary ops"),
    }
}

fn eval_f64_unary(op: OpCode, value: UntypedVal) -> UntypedVal {
    match op {
        OpCode::F64Abs => UntypedVal::from(wasm::f64_abs(value.into())),
        OpCode::F64Neg => UntypedVal::from(wasm::f64_neg(value.into())),
        OpCode::F64Ceil => UntypedVal::from(wasm::f64_ceil(value.into())),
        OpCode::F64Floor => UntypedVal::from(wasm::f64_floor(value.into())),
        OpCode::F64Trunc => UntypedVal::from(wasm::f64_trunc(value.into())),
        OpCode::F64Nearest => UntypedVal::from(wasm::f64_nearest(value.into())),
        OpCode::F64Sqrt => UntypedVal::from(wasm::f64_sqrt(value.into())),
        _ => unreachable!("translator only tags F64UnCached with f64 unary ops"),
    }
}

macro_rules! handler_unary_cached {
    ($( fn $handler:ident = ($kind:expr, $eval:expr) );* $(;)?) => {
        $(
            fn $handler<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
                let mut ip = ip;
                let tag = trap_or!(state, ip.decode_imm::<u16>().map_err(|_| TrapCode::BadSignature));
                let tag = trap_or!(state, OpCode::from_u16(tag).map_err(|_| TrapCode::BadSignature));
                let operand_slot = trap_or!(state, ip.decode_imm::<u8>().map_err(|_| TrapCode::BadSignature));
                let result_slot = trap_or!(state, ip.decode_imm::<u8>().map_err(|_| TrapCode::BadSignature));
                let value = state.operand.pop();
                let result = ($eval)(tag, value);
                state.operand.push(result);
                state.cache.write($kind, operand_slot as usize, value);
                state.cache.write($kind, result_slot as usize, result);
                Done::cont(ip)
            }
        )*
    };
}

handler_unary_cached! {
    fn i32_un_cached = (ValKind::I32, eval_i32_unary);
    fn i64_un_cached = (ValKind::I64, eval_i64_unary);
    fn f32_un_cached = (ValKind::F32, eval_f32_unary);
    fn f64_un_cached = (ValKind::F64, eval_f64_unary);
}

// --- Linear memory ---

macro_rules! handler_load {
    ($( fn $handler:ident -> $ty:ty = $load:path );* $(;)?) => {
        $(
            fn $handler<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
                let mut ip = ip;
                let offset = trap_or!(state, ip.decode_imm::<u64>().map_err(|_| TrapCode::BadSignature));
                let ptr: u64 = state.operand.pop().into();
                let value: $ty = trap_or!(state, $load(state.memory().base(), ptr, offset));
                state.operand.push(value.into());
                Done::cont(ip)
            }
        )*
    };
}

handler_load! {
    fn i32_load -> u32 = wasm::load32;
    fn i64_load -> u64 = wasm::load64;
    fn i32_load8_s -> i32 = wasm::i32_load8_s;
    fn i32_load8_u -> i32 = wasm::i32_load8_u;
    fn i32_load16_s -> i32 = wasm::i32_load16_s;
    fn i32_load16_u -> i32 = wasm::i32_load16_u;
    fn i64_load8_s -> i64 = wasm::i64_load8_s;
    fn i64_load8_u -> i64 = wasm::i64_load8_u;
    fn i64_load16_s -> i64 = wasm::i64_load16_s;
    fn i64_load16_u -> i64 = wasm::i64_load16_u;
    fn i64_load32_s -> i64 = wasm::i64_load32_s;
    fn i64_load32_u -> i64 = wasm::i64_load32_u;
}

fn f32_load<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let mut ip = ip;
    let offset = trap_or!(state, ip.decode_imm::<u64>().map_err(|_| TrapCode::BadSignature));
    let ptr: u64 = state.operand.pop().into();
    let bits = trap_or!(state, wasm::load32(state.memory().base(), ptr, offset));
    state.operand.push(UntypedVal::from(f32::from_bits(bits)));
    Done::cont(ip)
}

fn f64_load<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let mut ip = ip;
    let offset = trap_or!(state, ip.decode_imm::<u64>().map_err(|_| TrapCode::BadSignature));
    let ptr: u64 = state.operand.pop().into();
    let bits = trap_or!(state, wasm::load64(state.memory().base(), ptr, offset));
    state.operand.push(UntypedVal::from(f64::from_bits(bits)));
    Done::cont(ip)
}

macro_rules! handler_store {
    ($( fn $handler:ident($ty:ty) = $store:path );* $(;)?) => {
        $(
            fn $handler<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
                let mut ip = ip;
                let offset = trap_or!(state, ip.decode_imm::<u64>().map_err(|_| TrapCode::BadSignature));
                let value: $ty = state.operand.pop().into();
                let ptr: u64 = state.operand.pop().into();
                trap_or!(state, $store(state.memory().base_mut(), ptr, offset, value));
                Done::cont(ip)
            }
        )*
    };
}

handler_store! {
    fn i32_store(u32) = wasm::store32;
    fn i64_store(u64) = wasm::store64;
    fn i32_store8(i32) = wasm::i32_store8;
    fn i32_store16(i32) = wasm::i32_store16;
    fn i64_store8(i64) = wasm::i64_store8;
    fn i64_store16(i64) = wasm::i64_store16;
    fn i64_store32(i64) = wasm::i64_store32;
}

fn f32_store<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let mut ip = ip;
    let offset = trap_or!(state, ip.decode_imm::<u64>().map_err(|_| TrapCode::BadSignature));
    let value: f32 = state.operand.pop().into();
    let ptr: u64 = state.operand.pop().into();
    trap_or!(state, wasm::store32(state.memory().base_mut(), ptr, offset, value.to_bits()));
    Done::cont(ip)
}

fn f64_store<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let mut ip = ip;
    let offset = trap_or!(state, ip.decode_imm::<u64>().map_err(|_| TrapCode::BadSignature));
    let value: f64 = state.operand.pop().into();
    let ptr: u64 = state.operand.pop().into();
    trap_or!(state, wasm::store64(state.memory().base_mut(), ptr, offset, value.to_bits()));
    Done::cont(ip)
}

// --- Calls (module linking is out of scope; these trap until wired up by
// an embedder that supplies an indirection table) ---

fn call<'a>(state: &mut VmState<'a>, _ip: Ip<'a>) -> Done<'a> {
    state.traps.raise(TrapCode::BadSignature)
}

fn call_indirect<'a>(state: &mut VmState<'a>, _ip: Ip<'a>) -> Done<'a> {
    state.traps.raise(TrapCode::IndirectCallToNull)
}

/// `br_table`: the stream holds `count`, then `count` non-default targets,
/// then the default target, each as an absolute byte offset. The index
/// operand selects a target by position; out-of-range (including negative,
/// reinterpreted as unsigned per the Wasm spec) selects the default.
fn br_table<'a>(state: &mut VmState<'a>, ip: Ip<'a>) -> Done<'a> {
    let mut ip = ip;
    let count = trap_or!(state, ip.decode_imm::<u32>().map_err(|_| TrapCode::BadSignature));
    let index: u32 = state.operand.pop().into();
    let chosen = if index < count { index } else { count };
    for _ in 0..chosen {
        trap_or!(state, ip.decode_target().map_err(|_| TrapCode::BadSignature));
    }
    let target = trap_or!(state, ip.decode_target().map_err(|_| TrapCode::BadSignature));
    Done::cont(ip_at(ip, target))
}

/// Maps a decoded [`OpCode`] to its handler.
pub fn op_code_to_handler(code: OpCode) -> Handler {
    match code {
        OpCode::Unreachable => unreachable,
        OpCode::Br => br,
        OpCode::BrIf => br_if,
        OpCode::BrTable => br_table,
        OpCode::Return => return_,
        OpCode::Call => call,
        OpCode::CallIndirect => call_indirect,

        OpCode::LocalGet => local_get,
        OpCode::LocalSet => local_set,
        OpCode::LocalTee => local_tee,

        OpCode::I32Const => i32_const,
        OpCode::I64Const => i64_const,
        OpCode::F32Const => f32_const,
        OpCode::F64Const => f64_const,

        OpCode::I32ConstCached => i32_const_cached,
        OpCode::I64ConstCached => i64_const_cached,
        OpCode::F32ConstCached => f32_const_cached,
        OpCode::F64ConstCached => f64_const_cached,
        OpCode::I32BinCached => i32_bin_cached,
        OpCode::I64BinCached => i64_bin_cached,
        OpCode::F32BinCached => f32_bin_cached,
        OpCode::F64BinCached => f64_bin_cached,
        OpCode::I32UnCached => i32_un_cached,
        OpCode::I64UnCached => i64_un_cached,
        OpCode::F32UnCached => f32_un_cached,
        OpCode::F64UnCached => f64_un_cached,

        OpCode::I32Clz => i32_clz,
        OpCode::I32Ctz => i32_ctz,
        OpCode::I32Popcnt => i32_popcnt,
        OpCode::I32Eqz => i32_eqz,
        OpCode::I64Clz => i64_clz,
        OpCode::I64Ctz => i64_ctz,
        OpCode::I64Popcnt => i64_popcnt,
        OpCode::I64Eqz => i64_eqz,

        OpCode::I32Add => i32_add,
        OpCode::I32Sub => i32_sub,
        OpCode::I32Mul => i32_mul,
        OpCode::I32And => i32_and,
        OpCode::I32Or => i32_or,
        OpCode::I32Xor => i32_xor,
        OpCode::I32Shl => i32_shl,
        OpCode::I32ShrS => i32_shr_s,
        OpCode::I32ShrU => i32_shr_u,
        OpCode::I32Rotl => i32_rotl,
        OpCode::I32Rotr => i32_rotr,

        OpCode::I64Add => i64_add,
        OpCode::I64Sub => i64_sub,
        OpCode::I64Mul => i64_mul,
        OpCode::I64And => i64_and,
        OpCode::I64Or => i64_or,
        OpCode::I64Xor => i64_xor,
        OpCode::I64Shl => i64_shl,
        OpCode::I64ShrS => i64_shr_s,
        OpCode::I64ShrU => i64_shr_u,
        OpCode::I64Rotl => i64_rotl,
        OpCode::I64Rotr => i64_rotr,

        OpCode::I32DivS => i32_div_s,
        OpCode::I32DivU => i32_div_u,
        OpCode::I32RemS => i32_rem_s,
        OpCode::I32RemU => i32_rem_u,
        OpCode::I64DivS => i64_div_s,
        OpCode::I64DivU => i64_div_u,
        OpCode::I64RemS => i64_rem_s,
        OpCode::I64RemU => i64_rem_u,

        OpCode::I32Eq => i32_eq,
        OpCode::I32Ne => i32_ne,
        OpCode::I32LtS => i32_lt_s,
        OpCode::I32LtU => i32_lt_u,
        OpCode::I32LeS => i32_le_s,
        OpCode::I32LeU => i32_le_u,
        OpCode::I32GtS => i32_gt_s,
        OpCode::I32GtU => i32_gt_u,
        OpCode::I32GeS => i32_ge_s,
        OpCode::I32GeU => i32_ge_u,

        OpCode::I64Eq => i64_eq,
        OpCode::I64Ne => i64_ne,
        OpCode::I64LtS => i64_lt_s,
        OpCode::I64LtU => i64_lt_u,
        OpCode::I64LeS => i64_le_s,
        OpCode::I64LeU => i64_le_u,
        OpCode::I64GtS => i64_gt_s,
        OpCode::I64GtU => i64_gt_u,
        OpCode::I64GeS => i64_ge_s,
        OpCode::I64GeU => i64_ge_u,

        OpCode::F32Eq => f32_eq,
        OpCode::F32Ne => f32_ne,
        OpCode::F32Lt => f32_lt,
        OpCode::F32Le => f32_le,
        OpCode::F32Gt => f32_gt,
        OpCode::F32Ge => f32_ge,
        OpCode::F64Eq => f64_eq,
        OpCode::F64Ne => f64_ne,
        OpCode::F64Lt => f64_lt,
        OpCode::F64Le => f64_le,
        OpCode::F64Gt => f64_gt,
        OpCode::F64Ge => f64_ge,

        OpCode::F32Abs => f32_abs,
        OpCode::F32Neg => f32_neg,
        OpCode::F32Ceil => f32_ceil,
        OpCode::F32Floor => f32_floor,
        OpCode::F32Trunc => f32_trunc,
        OpCode::F32Nearest => f32_nearest,
        OpCode::F32Sqrt => f32_sqrt,
        OpCode::F64Abs => f64_abs,
        OpCode::F64Neg => f64_neg,
        OpCode::F64Ceil => f64_ceil,
        OpCode::F64Floor => f64_floor,
        OpCode::F64Trunc => f64_trunc,
        OpCode::F64Nearest => f64_nearest,
        OpCode::F64Sqrt => f64_sqrt,

        OpCode::F32Add => f32_add,
        OpCode::F32Sub => f32_sub,
        OpCode::F32Mul => f32_mul,
        OpCode::F32Div => f32_div,
        OpCode::F32Min => f32_min,
        OpCode::F32Max => f32_max,
        OpCode::F32Copysign => f32_copysign,
        OpCode::F64Add => f64_add,
        OpCode::F64Sub => f64_sub,
        OpCode::F64Mul => f64_mul,
        OpCode::F64Div => f64_div,
        OpCode::F64Min => f64_min,
        OpCode::F64Max => f64_max,
        OpCode::F64Copysign => f64_copysign,

        OpCode::I32WrapI64 => i32_wrap_i64,
        OpCode::I64ExtendI32S => i64_extend_i32_s,
        OpCode::I64ExtendI32U => i64_extend_i32_u,
        OpCode::I32TruncF32S => i32_trunc_f32_s,
        OpCode::I32TruncF32U => i32_trunc_f32_u,
        OpCode::I32TruncF64S => i32_trunc_f64_s,
        OpCode::I32TruncF64U => i32_trunc_f64_u,
        OpCode::I64TruncF32S => i64_trunc_f32_s,
        OpCode::I64TruncF32U => i64_trunc_f32_u,
        OpCode::I64TruncF64S => i64_trunc_f64_s,
        OpCode::I64TruncF64U => i64_trunc_f64_u,
        OpCode::F32ConvertI32S => f32_convert_i32_s,
        OpCode::F32ConvertI32U => f32_convert_i32_u,
        OpCode::F32ConvertI64S => f32_convert_i64_s,
        OpCode::F32ConvertI64U => f32_convert_i64_u,
        OpCode::F64ConvertI32S => f64_convert_i32_s,
        OpCode::F64ConvertI32U => f64_convert_i32_u,
        OpCode::F64ConvertI64S => f64_convert_i64_s,
        OpCode::F64ConvertI64U => f64_convert_i64_u,
        OpCode::F32DemoteF64 => f32_demote_f64,
        OpCode::F64PromoteF32 => f64_promote_f32,
        OpCode::I32ReinterpretF32 => i32_reinterpret_f32,
        OpCode::F32ReinterpretI32 => f32_reinterpret_i32,
        OpCode::I64ReinterpretF64 => i64_reinterpret_f64,
        OpCode::F64ReinterpretI64 => f64_reinterpret_i64,

        OpCode::I32Extend8S => i32_extend8_s,
        OpCode::I32Extend16S => i32_extend16_s,
        OpCode::I64Extend8S => i64_extend8_s,
        OpCode::I64Extend16S => i64_extend16_s,
        OpCode::I64Extend32S => i64_extend32_s,

        OpCode::I32TruncSatF32S => i32_trunc_sat_f32_s,
        OpCode::I32TruncSatF32U => i32_trunc_sat_f32_u,
        OpCode::I32TruncSatF64S => i32_trunc_sat_f64_s,
        OpCode::I32TruncSatF64U => i32_trunc_sat_f64_u,
        OpCode::I64TruncSatF32S => i64_trunc_sat_f32_s,
        OpCode::I64TruncSatF32U => i64_trunc_sat_f32_u,
        OpCode::I64TruncSatF64S => i64_trunc_sat_f64_s,
        OpCode::I64TruncSatF64U => i64_trunc_sat_f64_u,

        OpCode::I32Load => i32_load,
        OpCode::I64Load => i64_load,
        OpCode::F32Load => f32_load,
        OpCode::F64Load => f64_load,
        OpCode::I32Load8S => i32_load8_s,
        OpCode::I32Load8U => i32_load8_u,
        OpCode::I32Load16S => i32_load16_s,
        OpCode::I32Load16U => i32_load16_u,
        OpCode::I64Load8S => i64_load8_s,
        OpCode::I64Load8U => i64_load8_u,
        OpCode::I64Load16S => i64_load16_s,
        OpCode::I64Load16U => i64_load16_u,
        OpCode::I64Load32S => i64_load32_s,
        OpCode::I64Load32U => i64_load32_u,
        OpCode::I32Store => i32_store,
        OpCode::I64Store => i64_store,
        OpCode::F32Store => f32_store,
        OpCode::F64Store => f64_store,
        OpCode::I32Store8 => i32_store8,
        OpCode::I32Store16 => i32_store16,
        OpCode::I64Store8 => i64_store8,
        OpCode::I64Store16 => i64_store16,
        OpCode::I64Store32 => i64_store32,
    }
}
