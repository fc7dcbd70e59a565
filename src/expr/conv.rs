//! Implicit conversions: integral promotion, the usual arithmetic
//! conversions, and boolean conversion.
//!
//! These mirror the target standard's rules exactly; the conversion pass
//! materializes each rule as an implicit [`TypeCast`](super::TypeCastExpr)
//! node so the emitted source spells out what the language would do anyway
//! and the evaluator only ever sees same-typed operands.

use super::{BinaryOp, Expr};
use crate::error::Result;
use crate::types::{IntTypeId, TypeLayout};
use crate::value::IRValue;

/// Integral promotion: operands below `int` rank widen to `int`.
/// Idempotent — promoting a promoted expression returns it unchanged.
pub fn integral_prom(e: Expr) -> Result<Expr> {
    let id = e.ty()?.expect_int("promotion operand")?;
    if id >= IntTypeId::Int {
        return Ok(e);
    }
    Ok(Expr::cast(e, IntTypeId::Int, true))
}

/// Boolean conversion for logical operators.
pub fn conv_to_bool(e: Expr) -> Result<Expr> {
    let id = e.ty()?.expect_int("bool-conversion operand")?;
    if id == IntTypeId::Bool {
        return Ok(e);
    }
    Ok(Expr::cast(e, IntTypeId::Bool, true))
}

/// Usual arithmetic conversions, applied after both sides are promoted.
/// Post-condition: both slots have the same kind, of at least `int` rank.
///
/// The five steps must run in order; the last one (both sides to the
/// unsigned counterpart of the signed side) is reachable when `long` and
/// `int` share a width.
pub fn arith_conv(lhs: &mut Box<Expr>, rhs: &mut Box<Expr>, lay: TypeLayout) -> Result<()> {
    let l_id = lhs.ty()?.expect_int("left operand")?;
    let r_id = rhs.ty()?.expect_int("right operand")?;

    // 1. Same kind: nothing to do.
    if l_id == r_id {
        return Ok(());
    }

    // 2. Same signedness: the smaller rank widens.
    if l_id.is_signed() == r_id.is_signed() {
        if l_id > r_id {
            cast_slot(rhs, l_id);
        } else {
            cast_slot(lhs, r_id);
        }
        return Ok(());
    }

    // 3. The unsigned side has rank at least the signed side: the signed
    //    side converts to it.
    if !l_id.is_signed() && l_id >= r_id {
        cast_slot(rhs, l_id);
        return Ok(());
    }
    if !r_id.is_signed() && r_id >= l_id {
        cast_slot(lhs, r_id);
        return Ok(());
    }

    // 4. The signed side can represent every value of the unsigned side.
    if l_id.is_signed() && lay.can_represent(l_id, r_id) {
        cast_slot(rhs, l_id);
        return Ok(());
    }
    if r_id.is_signed() && lay.can_represent(r_id, l_id) {
        cast_slot(lhs, r_id);
        return Ok(());
    }

    // 5. Both sides convert to the unsigned counterpart of the signed side.
    let target = if l_id.is_signed() {
        l_id.to_unsigned()
    } else {
        r_id.to_unsigned()
    };
    cast_slot(lhs, target);
    cast_slot(rhs, target);
    Ok(())
}

/// Take the expression out of a slot, leaving a placeholder.
fn take_slot(slot: &mut Box<Expr>) -> Expr {
    std::mem::replace(
        &mut **slot,
        Expr::constant(IRValue::zero(IntTypeId::Int)),
    )
}

/// Wrap a slot in an implicit cast to `to`.
pub(super) fn cast_slot(slot: &mut Box<Expr>, to: IntTypeId) {
    let inner = take_slot(slot);
    **slot = Expr::cast(inner, to, true);
}

/// Wrap a slot as the left side of a fresh binary node: `slot := slot <op> rhs`.
pub(super) fn wrap_binary(slot: &mut Box<Expr>, op: BinaryOp, rhs: Expr) {
    let inner = take_slot(slot);
    **slot = Expr::binary(op, inner, rhs);
}

/// In-place integral promotion of a child slot.
pub(super) fn promote_slot(slot: &mut Box<Expr>) -> Result<()> {
    let inner = take_slot(slot);
    **slot = integral_prom(inner)?;
    Ok(())
}

/// In-place boolean conversion of a child slot.
pub(super) fn bool_slot(slot: &mut Box<Expr>) -> Result<()> {
    let inner = take_slot(slot);
    **slot = conv_to_bool(inner)?;
    Ok(())
}
