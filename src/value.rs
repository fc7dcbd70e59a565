//! Tagged integer values with exact target-language semantics.
//!
//! [`IRValue`] is the unit of symbolic execution: a value of one of the
//! eleven integer kinds, stored as an absolute magnitude plus sign so that
//! magnitudes up to `2^64 - 1` (and `INT64_MIN`, whose magnitude does not fit
//! an `i64`) are representable without bias. Every operator reproduces the
//! target's abstract machine bit-exactly and records undefined behavior in
//! the value's [`UbKind`] instead of failing: a poisoned value still carries
//! a deterministic payload so the rebuild pass can reason about it.
//!
//! Operators take operands of the *same* kind — arranging that is the
//! conversion pass's job — except shifts, whose sides are promoted
//! independently and whose result takes the left operand's kind.

use std::fmt;

use crate::error::{Error, Result};
use crate::types::{IntTypeId, TypeLayout};

// ============================================================
// UB classification
// ============================================================

/// Undefined behavior detected during symbolic evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UbKind {
    NoUb,
    /// Negation (or multiplication) landed exactly on the type minimum.
    SignOvfMin,
    /// Signed result left the representable range.
    SignOvf,
    /// Division or remainder by zero.
    ZeroDiv,
    /// Shift amount is negative.
    ShiftRhsNeg,
    /// Shift amount reaches or exceeds the left operand's width.
    ShiftRhsLarge,
    /// Left-shifting a negative value.
    NegShift,
    /// Array subscript outside the active dimension.
    OutOfBounds,
}

impl UbKind {
    pub fn is_ub(self) -> bool {
        self != UbKind::NoUb
    }
}

// ============================================================
// IRValue
// ============================================================

/// A typed integer value: `(kind, |value|, sign, ub)`.
///
/// Invariants (when `ub == NoUb`): `abs` fits the kind's width, and `neg`
/// is false for unsigned kinds and for zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IRValue {
    ty: IntTypeId,
    abs: u64,
    neg: bool,
    ub: UbKind,
}

/// Bit length of `v`: the 1-based index of its most significant set bit,
/// or 0 for `v == 0`. Used by the shift-rebuild rule.
pub fn find_msb(v: u64) -> u32 {
    64 - v.leading_zeros()
}

impl IRValue {
    pub fn zero(ty: IntTypeId) -> Self {
        Self {
            ty,
            abs: 0,
            neg: false,
            ub: UbKind::NoUb,
        }
    }

    /// Build from magnitude and sign. The caller is responsible for the
    /// value fitting its kind; generation always draws from declared ranges.
    pub fn from_parts(ty: IntTypeId, abs: u64, neg: bool) -> Self {
        Self {
            ty,
            abs,
            neg: neg && abs != 0,
            ub: UbKind::NoUb,
        }
    }

    /// Build from a signed wide value known to be in range for `ty`.
    pub fn of(ty: IntTypeId, v: i128) -> Self {
        Self::from_parts(ty, v.unsigned_abs() as u64, v < 0)
    }

    /// Build by two's-complement truncation of `v` into `ty`'s width.
    ///
    /// This is both the unsigned wrap rule and the deterministic payload we
    /// keep on poisoned values.
    pub fn truncated(ty: IntTypeId, lay: TypeLayout, v: i128) -> Self {
        let w = lay.width(ty);
        let m = (v.rem_euclid(1i128 << w)) as u128;
        if ty.is_signed() && m >= (1u128 << (w - 1)) {
            Self::of(ty, m as i128 - (1i128 << w))
        } else {
            Self::of(ty, m as i128)
        }
    }

    pub fn min_of(ty: IntTypeId, lay: TypeLayout) -> Self {
        Self::of(ty, lay.min(ty))
    }

    pub fn max_of(ty: IntTypeId, lay: TypeLayout) -> Self {
        Self::of(ty, lay.max(ty))
    }

    fn bool_val(b: bool) -> Self {
        Self::from_parts(IntTypeId::Bool, b as u64, false)
    }

    pub fn type_id(self) -> IntTypeId {
        self.ty
    }

    pub fn abs_value(self) -> u64 {
        self.abs
    }

    pub fn is_negative(self) -> bool {
        self.neg
    }

    pub fn ub_code(self) -> UbKind {
        self.ub
    }

    pub fn has_ub(self) -> bool {
        self.ub.is_ub()
    }

    pub fn is_zero(self) -> bool {
        self.abs == 0
    }

    pub fn with_ub(mut self, ub: UbKind) -> Self {
        self.ub = ub;
        self
    }

    /// The value as a wide signed integer.
    pub fn as_i128(self) -> i128 {
        if self.neg {
            -(self.abs as i128)
        } else {
            self.abs as i128
        }
    }

    /// Truthiness under the target's `!= 0` rule.
    pub fn as_bool(self) -> bool {
        self.abs != 0
    }

    // --------------------------------------------------------
    // Poison propagation
    // --------------------------------------------------------

    /// If either operand already carries UB, the result does too: same
    /// payload, retyped to the result kind, left operand first.
    fn float_ub(res_ty: IntTypeId, a: IRValue, b: IRValue) -> Option<IRValue> {
        if a.has_ub() {
            Some(IRValue {
                ty: res_ty,
                ..a
            })
        } else if b.has_ub() {
            Some(IRValue {
                ty: res_ty,
                ..b
            })
        } else {
            None
        }
    }

    fn check_same(self, rhs: IRValue, op: &'static str) -> Result<()> {
        if self.ty != rhs.ty {
            return Err(Error::OperandMismatch {
                op,
                lhs: self.ty,
                rhs: rhs.ty,
            });
        }
        Ok(())
    }

    /// Classify a signed result: in-range values pass through, everything
    /// else becomes a truncated payload with `SignOvf`.
    fn signed_arith(ty: IntTypeId, lay: TypeLayout, r: i128) -> IRValue {
        if r < lay.min(ty) || r > lay.max(ty) {
            Self::truncated(ty, lay, r).with_ub(UbKind::SignOvf)
        } else {
            Self::of(ty, r)
        }
    }

    // --------------------------------------------------------
    // Arithmetic
    // --------------------------------------------------------

    pub fn add(self, rhs: IRValue, lay: TypeLayout) -> Result<IRValue> {
        self.check_same(rhs, "+")?;
        if let Some(p) = Self::float_ub(self.ty, self, rhs) {
            return Ok(p);
        }
        let r = self.as_i128() + rhs.as_i128();
        Ok(if self.ty.is_signed() {
            Self::signed_arith(self.ty, lay, r)
        } else {
            Self::truncated(self.ty, lay, r)
        })
    }

    pub fn sub(self, rhs: IRValue, lay: TypeLayout) -> Result<IRValue> {
        self.check_same(rhs, "-")?;
        if let Some(p) = Self::float_ub(self.ty, self, rhs) {
            return Ok(p);
        }
        let r = self.as_i128() - rhs.as_i128();
        Ok(if self.ty.is_signed() {
            Self::signed_arith(self.ty, lay, r)
        } else {
            Self::truncated(self.ty, lay, r)
        })
    }

    pub fn mul(self, rhs: IRValue, lay: TypeLayout) -> Result<IRValue> {
        self.check_same(rhs, "*")?;
        if let Some(p) = Self::float_ub(self.ty, self, rhs) {
            return Ok(p);
        }
        Ok(if self.ty.is_signed() {
            // Magnitudes are below 2^63 here, so the wide product fits.
            let r = self.as_i128() * rhs.as_i128();
            // Landing exactly on the minimum means the magnitude overflowed
            // the positive range before the sign was applied; the rewrite
            // rules distinguish this case from an ordinary overflow.
            if r == lay.min(self.ty) {
                Self::of(self.ty, r).with_ub(UbKind::SignOvfMin)
            } else {
                Self::signed_arith(self.ty, lay, r)
            }
        } else {
            // Full-width unsigned products can exceed i128; go through u128
            // and keep the low bits, which is the wrap rule anyway.
            let r = (self.abs as u128) * (rhs.abs as u128);
            Self::truncated(self.ty, lay, (r as u64) as i128)
        })
    }

    pub fn div(self, rhs: IRValue, lay: TypeLayout) -> Result<IRValue> {
        self.check_same(rhs, "/")?;
        if let Some(p) = Self::float_ub(self.ty, self, rhs) {
            return Ok(p);
        }
        if rhs.is_zero() {
            // No result exists; keep the dividend as the payload.
            return Ok(IRValue {
                ty: self.ty,
                ..self
            }
            .with_ub(UbKind::ZeroDiv));
        }
        let (a, b) = (self.as_i128(), rhs.as_i128());
        if self.ty.is_signed() && a == lay.min(self.ty) && b == -1 {
            return Ok(Self::truncated(self.ty, lay, -a).with_ub(UbKind::SignOvf));
        }
        Ok(Self::of(self.ty, a / b))
    }

    pub fn rem(self, rhs: IRValue, lay: TypeLayout) -> Result<IRValue> {
        self.check_same(rhs, "%")?;
        if let Some(p) = Self::float_ub(self.ty, self, rhs) {
            return Ok(p);
        }
        if rhs.is_zero() {
            return Ok(IRValue {
                ty: self.ty,
                ..self
            }
            .with_ub(UbKind::ZeroDiv));
        }
        let (a, b) = (self.as_i128(), rhs.as_i128());
        if self.ty.is_signed() && a == lay.min(self.ty) && b == -1 {
            return Ok(Self::truncated(self.ty, lay, -a).with_ub(UbKind::SignOvf));
        }
        // i128's `%` truncates toward zero, matching the target.
        Ok(Self::of(self.ty, a % b))
    }

    // --------------------------------------------------------
    // Unary
    // --------------------------------------------------------

    pub fn plus(self) -> IRValue {
        self
    }

    pub fn neg(self, lay: TypeLayout) -> IRValue {
        if self.has_ub() {
            return self;
        }
        if self.ty.is_signed() {
            if self.as_i128() == lay.min(self.ty) {
                return self.with_ub(UbKind::SignOvfMin);
            }
            Self::of(self.ty, -self.as_i128())
        } else {
            Self::truncated(self.ty, lay, -self.as_i128())
        }
    }

    pub fn bit_not(self, lay: TypeLayout) -> IRValue {
        if self.has_ub() {
            return self;
        }
        Self::from_bits(self.ty, lay, !self.to_bits(lay))
    }

    pub fn log_not(self) -> Result<IRValue> {
        if self.ty != IntTypeId::Bool {
            return Err(Error::OperandMismatch {
                op: "!",
                lhs: self.ty,
                rhs: IntTypeId::Bool,
            });
        }
        if self.has_ub() {
            return Ok(IRValue {
                ty: IntTypeId::Bool,
                ..self
            });
        }
        Ok(Self::bool_val(!self.as_bool()))
    }

    // --------------------------------------------------------
    // Comparison & logical
    // --------------------------------------------------------

    fn compare(self, rhs: IRValue, op: &'static str) -> Result<std::cmp::Ordering> {
        self.check_same(rhs, op)?;
        Ok(self.as_i128().cmp(&rhs.as_i128()))
    }

    pub fn lt(self, rhs: IRValue) -> Result<IRValue> {
        let ord = self.compare(rhs, "<")?;
        if let Some(p) = Self::float_ub(IntTypeId::Bool, self, rhs) {
            return Ok(p);
        }
        Ok(Self::bool_val(ord.is_lt()))
    }

    pub fn gt(self, rhs: IRValue) -> Result<IRValue> {
        let ord = self.compare(rhs, ">")?;
        if let Some(p) = Self::float_ub(IntTypeId::Bool, self, rhs) {
            return Ok(p);
        }
        Ok(Self::bool_val(ord.is_gt()))
    }

    pub fn le(self, rhs: IRValue) -> Result<IRValue> {
        let ord = self.compare(rhs, "<=")?;
        if let Some(p) = Self::float_ub(IntTypeId::Bool, self, rhs) {
            return Ok(p);
        }
        Ok(Self::bool_val(ord.is_le()))
    }

    pub fn ge(self, rhs: IRValue) -> Result<IRValue> {
        let ord = self.compare(rhs, ">=")?;
        if let Some(p) = Self::float_ub(IntTypeId::Bool, self, rhs) {
            return Ok(p);
        }
        Ok(Self::bool_val(ord.is_ge()))
    }

    pub fn eq(self, rhs: IRValue) -> Result<IRValue> {
        let ord = self.compare(rhs, "==")?;
        if let Some(p) = Self::float_ub(IntTypeId::Bool, self, rhs) {
            return Ok(p);
        }
        Ok(Self::bool_val(ord.is_eq()))
    }

    pub fn ne(self, rhs: IRValue) -> Result<IRValue> {
        let ord = self.compare(rhs, "!=")?;
        if let Some(p) = Self::float_ub(IntTypeId::Bool, self, rhs) {
            return Ok(p);
        }
        Ok(Self::bool_val(ord.is_ne()))
    }

    pub fn log_and(self, rhs: IRValue) -> Result<IRValue> {
        if self.ty != IntTypeId::Bool || rhs.ty != IntTypeId::Bool {
            return Err(Error::OperandMismatch {
                op: "&&",
                lhs: self.ty,
                rhs: rhs.ty,
            });
        }
        if let Some(p) = Self::float_ub(IntTypeId::Bool, self, rhs) {
            return Ok(p);
        }
        Ok(Self::bool_val(self.as_bool() && rhs.as_bool()))
    }

    pub fn log_or(self, rhs: IRValue) -> Result<IRValue> {
        if self.ty != IntTypeId::Bool || rhs.ty != IntTypeId::Bool {
            return Err(Error::OperandMismatch {
                op: "||",
                lhs: self.ty,
                rhs: rhs.ty,
            });
        }
        if let Some(p) = Self::float_ub(IntTypeId::Bool, self, rhs) {
            return Ok(p);
        }
        Ok(Self::bool_val(self.as_bool() || rhs.as_bool()))
    }

    // --------------------------------------------------------
    // Bitwise
    // --------------------------------------------------------

    /// Two's-complement bit pattern within the kind's width.
    fn to_bits(self, lay: TypeLayout) -> u64 {
        let w = lay.width(self.ty);
        let mask = if w == 64 { u64::MAX } else { (1u64 << w) - 1 };
        (self.as_i128() as u64) & mask
    }

    fn from_bits(ty: IntTypeId, lay: TypeLayout, bits: u64) -> IRValue {
        let w = lay.width(ty);
        let mask = if w == 64 { u64::MAX } else { (1u64 << w) - 1 };
        Self::truncated(ty, lay, (bits & mask) as i128)
    }

    pub fn bit_and(self, rhs: IRValue, lay: TypeLayout) -> Result<IRValue> {
        self.check_same(rhs, "&")?;
        if let Some(p) = Self::float_ub(self.ty, self, rhs) {
            return Ok(p);
        }
        Ok(Self::from_bits(self.ty, lay, self.to_bits(lay) & rhs.to_bits(lay)))
    }

    pub fn bit_or(self, rhs: IRValue, lay: TypeLayout) -> Result<IRValue> {
        self.check_same(rhs, "|")?;
        if let Some(p) = Self::float_ub(self.ty, self, rhs) {
            return Ok(p);
        }
        Ok(Self::from_bits(self.ty, lay, self.to_bits(lay) | rhs.to_bits(lay)))
    }

    pub fn bit_xor(self, rhs: IRValue, lay: TypeLayout) -> Result<IRValue> {
        self.check_same(rhs, "^")?;
        if let Some(p) = Self::float_ub(self.ty, self, rhs) {
            return Ok(p);
        }
        Ok(Self::from_bits(self.ty, lay, self.to_bits(lay) ^ rhs.to_bits(lay)))
    }

    // --------------------------------------------------------
    // Shifts
    // --------------------------------------------------------

    /// `self << rhs`. The sides may have different (promoted) kinds; the
    /// result takes the left kind. UB checks run in the standard's order:
    /// negative count, oversized count, negative left operand, then the
    /// result reaching the sign bit.
    pub fn shl(self, rhs: IRValue, lay: TypeLayout) -> IRValue {
        if let Some(p) = Self::float_ub(self.ty, self, rhs) {
            return p;
        }
        let w = lay.width(self.ty);
        if rhs.neg {
            return self.with_ub(UbKind::ShiftRhsNeg);
        }
        if rhs.abs >= u64::from(w) {
            return self.with_ub(UbKind::ShiftRhsLarge);
        }
        let s = rhs.abs as u32;
        if self.ty.is_signed() {
            if self.neg {
                return self.with_ub(UbKind::NegShift);
            }
            let r = self.as_i128() << s;
            if r > lay.max(self.ty) {
                return Self::truncated(self.ty, lay, r).with_ub(UbKind::ShiftRhsLarge);
            }
            Self::of(self.ty, r)
        } else {
            // A 64-bit operand shifted left can exceed i128; the low bits
            // are all that survive truncation anyway.
            let r = (self.abs as u128) << s;
            Self::truncated(self.ty, lay, (r as u64) as i128)
        }
    }

    /// `self >> rhs`. A negative signed left operand shifts arithmetically
    /// (implementation-defined in the target, but consistent across the
    /// compilers under test).
    pub fn shr(self, rhs: IRValue, lay: TypeLayout) -> IRValue {
        if let Some(p) = Self::float_ub(self.ty, self, rhs) {
            return p;
        }
        let w = lay.width(self.ty);
        if rhs.neg {
            return self.with_ub(UbKind::ShiftRhsNeg);
        }
        if rhs.abs >= u64::from(w) {
            return self.with_ub(UbKind::ShiftRhsLarge);
        }
        Self::of(self.ty, self.as_i128() >> (rhs.abs as u32))
    }

    // --------------------------------------------------------
    // Conversion
    // --------------------------------------------------------

    /// Convert to another kind: unsigned targets reduce modulo `2^width`,
    /// signed targets truncate in two's complement, `bool` tests `!= 0`.
    /// A UB code on the operand survives the conversion.
    pub fn cast_to(self, to: IntTypeId, lay: TypeLayout) -> IRValue {
        let ub = self.ub;
        let converted = if to == IntTypeId::Bool {
            Self::bool_val(self.as_bool())
        } else {
            Self::truncated(to, lay, self.as_i128())
        };
        converted.with_ub(ub)
    }
}

impl fmt::Display for IRValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.neg {
            write!(f, "-{}", self.abs)
        } else {
            write!(f, "{}", self.abs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAY: TypeLayout = TypeLayout { long_is_64: true };

    fn int(v: i128) -> IRValue {
        IRValue::of(IntTypeId::Int, v)
    }

    fn uint(v: i128) -> IRValue {
        IRValue::of(IntTypeId::UInt, v)
    }

    #[test]
    fn signed_add_overflow_is_flagged() {
        let r = int(2_000_000_000).add(int(2_000_000_000), LAY).unwrap();
        assert_eq!(r.ub_code(), UbKind::SignOvf);
        // Deterministic wrapped payload.
        assert_eq!(r.as_i128(), 4_000_000_000i128 - (1i128 << 32));
    }

    #[test]
    fn signed_add_in_range_is_clean() {
        let r = int(i32::MAX as i128 - 1).add(int(1), LAY).unwrap();
        assert_eq!(r.ub_code(), UbKind::NoUb);
        assert_eq!(r.as_i128(), i32::MAX as i128);
    }

    #[test]
    fn unsigned_arithmetic_wraps_without_ub() {
        let r = uint(u32::MAX as i128).add(uint(1), LAY).unwrap();
        assert_eq!(r.ub_code(), UbKind::NoUb);
        assert_eq!(r.as_i128(), 0);

        let r = uint(0).sub(uint(1), LAY).unwrap();
        assert_eq!(r.ub_code(), UbKind::NoUb);
        assert_eq!(r.as_i128(), u32::MAX as i128);
    }

    #[test]
    fn division_by_zero() {
        let r = int(42).div(int(0), LAY).unwrap();
        assert_eq!(r.ub_code(), UbKind::ZeroDiv);
        // Payload keeps the dividend.
        assert_eq!(r.abs_value(), 42);

        let r = uint(42).rem(uint(0), LAY).unwrap();
        assert_eq!(r.ub_code(), UbKind::ZeroDiv);
    }

    #[test]
    fn int_min_over_minus_one() {
        let min = IRValue::min_of(IntTypeId::Int, LAY);
        let r = min.div(int(-1), LAY).unwrap();
        assert_eq!(r.ub_code(), UbKind::SignOvf);
        let r = min.rem(int(-1), LAY).unwrap();
        assert_eq!(r.ub_code(), UbKind::SignOvf);
    }

    #[test]
    fn negate_minimum() {
        let min = IRValue::min_of(IntTypeId::Int, LAY);
        assert_eq!(min.neg(LAY).ub_code(), UbKind::SignOvfMin);
        assert_eq!(int(-5).neg(LAY).as_i128(), 5);
    }

    #[test]
    fn mul_reaching_minimum_is_special_cased() {
        let r = int(1 << 30).mul(int(-2), LAY).unwrap();
        assert_eq!(r.as_i128(), i32::MIN as i128);
        assert_eq!(r.ub_code(), UbKind::SignOvfMin);

        let r = int(1 << 30).mul(int(4), LAY).unwrap();
        assert_eq!(r.ub_code(), UbKind::SignOvf);
    }

    #[test]
    fn truncating_division_semantics() {
        let r = int(-7).div(int(2), LAY).unwrap();
        assert_eq!(r.as_i128(), -3);
        let r = int(-7).rem(int(2), LAY).unwrap();
        assert_eq!(r.as_i128(), -1);
    }

    #[test]
    fn shift_ub_ladder() {
        // Negative count.
        let r = uint(7).shl(int(-1).cast_to(IntTypeId::Int, LAY), LAY);
        assert_eq!(r.ub_code(), UbKind::ShiftRhsNeg);
        // Count at width.
        let r = uint(7).shl(uint(32), LAY);
        assert_eq!(r.ub_code(), UbKind::ShiftRhsLarge);
        // Negative left operand.
        let r = int(-1).shl(int(1), LAY);
        assert_eq!(r.ub_code(), UbKind::NegShift);
        // Sign bit reached.
        let r = int(1).shl(int(31), LAY);
        assert_eq!(r.ub_code(), UbKind::ShiftRhsLarge);
        // Clean signed shift.
        let r = int(3).shl(int(4), LAY);
        assert_eq!(r.ub_code(), UbKind::NoUb);
        assert_eq!(r.as_i128(), 48);
    }

    #[test]
    fn unsigned_shl_wraps() {
        let r = uint(0x8000_0001).shl(uint(1), LAY);
        assert_eq!(r.ub_code(), UbKind::NoUb);
        assert_eq!(r.as_i128(), 2);
    }

    #[test]
    fn arithmetic_right_shift() {
        let r = int(-8).shr(int(1), LAY);
        assert_eq!(r.ub_code(), UbKind::NoUb);
        assert_eq!(r.as_i128(), -4);
    }

    #[test]
    fn bitwise_on_negative_values() {
        let r = int(-1).bit_and(int(0x0F0F), LAY).unwrap();
        assert_eq!(r.as_i128(), 0x0F0F);
        let r = int(-1).bit_not(LAY);
        assert_eq!(r.as_i128(), 0);
    }

    #[test]
    fn casts_follow_modular_arithmetic() {
        // Unsigned target: reduce mod 2^width.
        let r = int(-1).cast_to(IntTypeId::UInt, LAY);
        assert_eq!(r.as_i128(), u32::MAX as i128);
        // Signed target: two's-complement truncation.
        let r = uint(0x180).cast_to(IntTypeId::Char, LAY);
        assert_eq!(r.as_i128(), -128);
        // Bool target: != 0.
        let r = int(42).cast_to(IntTypeId::Bool, LAY);
        assert_eq!(r.as_i128(), 1);
        let r = int(256).cast_to(IntTypeId::Bool, LAY);
        assert_eq!(r.as_i128(), 1);
    }

    #[test]
    fn poison_floats_through_operations() {
        let bad = int(1).div(int(0), LAY).unwrap();
        assert!(bad.has_ub());
        let r = bad.add(int(1), LAY).unwrap();
        assert_eq!(r.ub_code(), UbKind::ZeroDiv);
        let r = int(1).mul(bad, LAY).unwrap();
        assert_eq!(r.ub_code(), UbKind::ZeroDiv);
        let r = bad.cast_to(IntTypeId::LLong, LAY);
        assert_eq!(r.ub_code(), UbKind::ZeroDiv);
    }

    #[test]
    fn comparisons_yield_bool() {
        let r = int(3).lt(int(4)).unwrap();
        assert_eq!(r.type_id(), IntTypeId::Bool);
        assert!(r.as_bool());
        let r = int(-3).ge(int(4)).unwrap();
        assert!(!r.as_bool());
    }

    #[test]
    fn mismatched_operands_are_invariant_errors() {
        assert!(int(1).add(uint(1), LAY).is_err());
        assert!(int(1).lt(uint(1)).is_err());
        assert!(int(1).log_and(int(1)).is_err());
    }

    #[test]
    fn msb_positions() {
        assert_eq!(find_msb(0), 0);
        assert_eq!(find_msb(1), 1);
        assert_eq!(find_msb(7), 3);
        assert_eq!(find_msb(u64::MAX), 64);
    }
}
