//! End-to-end scenarios for the expression IR, exercised through the
//! public API: the INT_MIN literal workaround, each rewrite family, and
//! the usual-arithmetic-conversion tie-break.

use std::rc::Rc;

use grist::context::{EvalCtx, GenSession};
use grist::data::{ArrayData, ArrayEssence, ScalarVar};
use grist::expr::{BinaryOp, Expr, ExprTy};
use grist::options::Options;
use grist::policy::SeededPolicy;
use grist::types::IntTypeId;
use grist::value::{IRValue, UbKind};

fn session() -> GenSession {
    GenSession::new(Options::default())
}

fn int_var(s: &GenSession, name: &str, v: i128) -> Rc<ScalarVar> {
    ScalarVar::new(
        name,
        s.types().int_type(IntTypeId::Int),
        IRValue::of(IntTypeId::Int, v),
    )
}

#[test]
fn s1_int_min_literal() {
    let s = session();
    let min = IRValue::from_parts(IntTypeId::Int, 2147483648, true);
    let rendered = Expr::constant(min).emit_to_string(s.options());
    assert_eq!(rendered, "((-2147483647) - 1)");
}

#[test]
fn s2_signed_overflow_rewrite() {
    let s = session();
    let a = int_var(&s, "a", 2_000_000_000);
    let b = int_var(&s, "b", 2_000_000_000);
    let mut e = Expr::binary(
        BinaryOp::Add,
        Expr::ScalarVarUse(s.scalar_use(&a)),
        Expr::ScalarVarUse(s.scalar_use(&b)),
    );
    e.propagate_type(&s).unwrap();

    let mut ctx = EvalCtx::new();
    let first = e.evaluate(&s, &mut ctx).unwrap();
    assert_eq!(first.ub(), UbKind::SignOvf);

    let mut policy = SeededPolicy::from_seed(0);
    let fixed = e
        .rebuild(&s, &mut ctx, &mut policy)
        .unwrap()
        .expect_scalar("test")
        .unwrap();
    assert_eq!(fixed.ub_code(), UbKind::NoUb);
    assert_eq!(fixed.as_i128(), 0);
    assert!(e.emit_to_string(s.options()).contains(" - "));
}

#[test]
fn s3_division_by_zero_rewrite() {
    let s = session();
    let a = int_var(&s, "a", 42);
    let b = int_var(&s, "b", 0);
    let mut e = Expr::binary(
        BinaryOp::Div,
        Expr::ScalarVarUse(s.scalar_use(&a)),
        Expr::ScalarVarUse(s.scalar_use(&b)),
    );
    let mut ctx = EvalCtx::new();
    let mut policy = SeededPolicy::from_seed(0);
    let fixed = e
        .rebuild(&s, &mut ctx, &mut policy)
        .unwrap()
        .expect_scalar("test")
        .unwrap();
    assert_eq!(fixed.ub_code(), UbKind::NoUb);
    assert_eq!(fixed.as_i128(), 0);
    assert!(e.emit_to_string(s.options()).contains(" * "));
}

#[test]
fn s4_oversized_shift_rewrite() {
    let s = session();
    let a = ScalarVar::new(
        "a",
        s.types().int_type(IntTypeId::UInt),
        IRValue::of(IntTypeId::UInt, 7),
    );
    let b = ScalarVar::new(
        "b",
        s.types().int_type(IntTypeId::UInt),
        IRValue::of(IntTypeId::UInt, 40),
    );
    let mut e = Expr::binary(
        BinaryOp::Shl,
        Expr::ScalarVarUse(s.scalar_use(&a)),
        Expr::ScalarVarUse(s.scalar_use(&b)),
    );
    let mut ctx = EvalCtx::new();
    assert_eq!(e.evaluate(&s, &mut ctx).unwrap().ub(), UbKind::ShiftRhsLarge);

    let mut policy = SeededPolicy::from_seed(17);
    let fixed = e
        .rebuild(&s, &mut ctx, &mut policy)
        .unwrap()
        .expect_scalar("test")
        .unwrap();
    assert_eq!(fixed.ub_code(), UbKind::NoUb);

    // The corrected count is b - (40 - k) = k for some k in [0, 32]; the
    // result must be a valid shift of 7.
    let v = fixed.as_i128();
    assert!((0..=32).any(|k| k < 32 && v == 7i128 << k), "unexpected {v}");
    assert!(e.emit_to_string(s.options()).contains("(b) - ("));
}

#[test]
fn s5_out_of_bounds_subscript_rewrite() {
    let s = session();
    let arr = ArrayData::new(
        "A",
        s.types().array_type(IntTypeId::Int, &[10]),
        ArrayEssence::UniformConst,
        IRValue::of(IntTypeId::Int, 5),
    );
    let i = int_var(&s, "i", 15);
    let mut e = Expr::subscript(
        Expr::ArrayUse(s.array_use(&arr)),
        Expr::ScalarVarUse(s.scalar_use(&i)),
    );
    let mut ctx = EvalCtx::new();
    assert_eq!(e.evaluate(&s, &mut ctx).unwrap().ub(), UbKind::OutOfBounds);

    let mut policy = SeededPolicy::from_seed(0);
    let fixed = e
        .rebuild(&s, &mut ctx, &mut policy)
        .unwrap()
        .expect_scalar("test")
        .unwrap();
    assert_eq!(fixed.ub_code(), UbKind::NoUb);
    assert_eq!(e.emit_to_string(s.options()), "A[(i) % (10)]");
}

#[test]
fn s6_arith_conv_tie_casts_signed_side() {
    let s = session();
    let x = int_var(&s, "x", 1);
    let y = ScalarVar::new(
        "y",
        s.types().int_type(IntTypeId::UInt),
        IRValue::of(IntTypeId::UInt, 2),
    );
    let mut e = Expr::binary(
        BinaryOp::Add,
        Expr::ScalarVarUse(s.scalar_use(&x)),
        Expr::ScalarVarUse(s.scalar_use(&y)),
    );
    e.propagate_type(&s).unwrap();
    assert_eq!(e.ty().unwrap(), ExprTy::Int(IntTypeId::UInt));

    let rendered = e.emit_to_string(s.options());
    assert_eq!(rendered, "(((/* implicit */unsigned int) x)) + (y)");
}
