//! Property-based tests over the value semantics.
//!
//! Uses proptest to generate random operands and verify the quantified
//! invariants: unsigned arithmetic never produces UB, conversions follow
//! modular arithmetic, and integral promotion is idempotent.

use proptest::prelude::*;

use grist::expr::{integral_prom, Expr, ExprTy};
use grist::types::{IntTypeId, TypeLayout};
use grist::value::{IRValue, UbKind};

const LAY: TypeLayout = TypeLayout { long_is_64: true };

fn unsigned_kind() -> impl Strategy<Value = IntTypeId> {
    proptest::sample::select(vec![IntTypeId::UInt, IntTypeId::ULong, IntTypeId::ULLong])
}

fn any_kind() -> impl Strategy<Value = IntTypeId> {
    proptest::sample::select(IntTypeId::ALL.to_vec())
}

proptest! {
    /// Property 3: unsigned arithmetic wraps and never reports UB.
    #[test]
    fn unsigned_arithmetic_never_ubs(
        id in unsigned_kind(),
        a in any::<u64>(),
        b in any::<u64>(),
    ) {
        let x = IRValue::truncated(id, LAY, a as i128);
        let y = IRValue::truncated(id, LAY, b as i128);
        for r in [
            x.add(y, LAY).unwrap(),
            x.sub(y, LAY).unwrap(),
            x.mul(y, LAY).unwrap(),
            x.bit_and(y, LAY).unwrap(),
            x.bit_or(y, LAY).unwrap(),
            x.bit_xor(y, LAY).unwrap(),
            x.neg(LAY),
            x.bit_not(LAY),
        ] {
            prop_assert_eq!(r.ub_code(), UbKind::NoUb);
            prop_assert_eq!(r.type_id(), id);
            // The result fits the width.
            prop_assert!(r.as_i128() <= LAY.max(id));
            prop_assert!(r.as_i128() >= 0);
        }
        // Division only objects to a zero divisor.
        if !y.is_zero() {
            prop_assert_eq!(x.div(y, LAY).unwrap().ub_code(), UbKind::NoUb);
            prop_assert_eq!(x.rem(y, LAY).unwrap().ub_code(), UbKind::NoUb);
        }
    }

    /// Property 5: casting reduces modulo 2^width (unsigned targets) or
    /// truncates in two's complement (signed targets).
    #[test]
    fn cast_follows_modular_arithmetic(
        from in any_kind(),
        to in any_kind(),
        raw in any::<i64>(),
    ) {
        let v = IRValue::truncated(from, LAY, raw as i128);
        let r = v.cast_to(to, LAY);
        prop_assert_eq!(r.type_id(), to);
        prop_assert_eq!(r.ub_code(), UbKind::NoUb);

        let w = LAY.width(to);
        if to == IntTypeId::Bool {
            prop_assert_eq!(r.as_i128() != 0, v.as_i128() != 0);
        } else if to.is_signed() {
            let m = v.as_i128().rem_euclid(1i128 << w);
            let expect = if m >= 1i128 << (w - 1) { m - (1i128 << w) } else { m };
            prop_assert_eq!(r.as_i128(), expect);
        } else {
            prop_assert_eq!(r.as_i128(), v.as_i128().rem_euclid(1i128 << w));
        }
    }

    /// Property 6: integral promotion is idempotent.
    #[test]
    fn integral_prom_idempotent(id in any_kind(), raw in any::<i32>()) {
        let v = IRValue::truncated(id, LAY, raw as i128);
        let once = integral_prom(Expr::constant(v)).unwrap();
        let once_ty = once.ty().unwrap();
        let twice = integral_prom(once).unwrap();
        prop_assert_eq!(twice.ty().unwrap(), once_ty.clone());
        // Promoted kinds are always at least int rank.
        let ExprTy::Int(kind) = once_ty else { panic!() };
        prop_assert!(kind >= IntTypeId::Int);
    }

    /// Signed overflow is always flagged, never silently wrapped.
    #[test]
    fn signed_overflow_is_always_flagged(a in any::<i32>(), b in any::<i32>()) {
        let x = IRValue::of(IntTypeId::Int, a as i128);
        let y = IRValue::of(IntTypeId::Int, b as i128);
        let sum = x.add(y, LAY).unwrap();
        let wide = a as i128 + b as i128;
        if wide >= i32::MIN as i128 && wide <= i32::MAX as i128 {
            prop_assert_eq!(sum.ub_code(), UbKind::NoUb);
            prop_assert_eq!(sum.as_i128(), wide);
        } else {
            prop_assert_eq!(sum.ub_code(), UbKind::SignOvf);
        }
    }

    /// Comparison results are always boolean and UB-free for clean inputs.
    #[test]
    fn comparisons_are_clean_bools(id in any_kind(), a in any::<i64>(), b in any::<i64>()) {
        let x = IRValue::truncated(id, LAY, a as i128);
        let y = IRValue::truncated(id, LAY, b as i128);
        for r in [
            x.lt(y).unwrap(),
            x.le(y).unwrap(),
            x.gt(y).unwrap(),
            x.ge(y).unwrap(),
            x.eq(y).unwrap(),
            x.ne(y).unwrap(),
        ] {
            prop_assert_eq!(r.type_id(), IntTypeId::Bool);
            prop_assert_eq!(r.ub_code(), UbKind::NoUb);
        }
        prop_assert_eq!(x.lt(y).unwrap().as_bool(), x.as_i128() < y.as_i128());
    }
}
