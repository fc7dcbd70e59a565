//! Named runtime entities: scalar variables, arrays, iterators.
//!
//! `Data` entities are shared — every use expression referring to a variable
//! holds the same `Rc` — and their current values live in `Cell`s so a store
//! through one holder is visible to all of them. Lifetime equals that of the
//! enclosing symbol table.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::policy::{choose, GenPolicy, RandomPolicy};
use crate::types::{ArrayType, IntType, IntTypeId, TypeRegistry};
use crate::value::IRValue;

// ============================================================
// Common attributes
// ============================================================

/// Declaration qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modifier {
    None,
    Const,
    Volatile,
}

impl Modifier {
    /// Source spelling, including a trailing space when non-empty.
    pub fn prefix(self) -> &'static str {
        match self {
            Modifier::None => "",
            Modifier::Const => "const ",
            Modifier::Volatile => "volatile ",
        }
    }
}

/// Statistical shape of an array's element population.
///
/// All essences currently populate every element with the array's single
/// init value — the symbolic model summarizes an array with one scalar, and
/// uniform contents keep that summary sound. The essence still varies the
/// *emitted* initialization pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayEssence {
    UniformConst,
    VectorLike,
    MixedLike,
    StepLike,
    RandomLike,
}

/// Discriminates the entity classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Var,
    Arr,
    Iter,
}

// ============================================================
// Scalar variables
// ============================================================

/// A named scalar with a current value and declared bounds.
#[derive(Debug)]
pub struct ScalarVar {
    pub name: String,
    pub ty: Rc<IntType>,
    pub modifier: Modifier,
    pub is_static: bool,
    pub align: Option<u64>,
    cur: Cell<IRValue>,
    pub min: IRValue,
    pub max: IRValue,
}

impl ScalarVar {
    pub fn new(name: impl Into<String>, ty: Rc<IntType>, init: IRValue) -> Rc<Self> {
        let min = IRValue::of(ty.id, ty.min);
        let max = IRValue::of(ty.id, ty.max);
        Rc::new(Self {
            name: name.into(),
            ty,
            modifier: Modifier::None,
            is_static: false,
            align: None,
            cur: Cell::new(init),
            min,
            max,
        })
    }

    pub fn current_value(&self) -> IRValue {
        self.cur.get()
    }

    pub fn set_current_value(&self, v: IRValue) -> Result<()> {
        if v.type_id() != self.ty.id {
            return Err(Error::AssignMismatch {
                to: self.ty.id,
                from: v.type_id(),
            });
        }
        self.cur.set(v);
        Ok(())
    }

    /// Draw a fresh variable: random kind, random in-range initial value,
    /// occasionally `const` or `volatile`.
    pub fn generate(
        name: impl Into<String>,
        reg: &TypeRegistry,
        gp: &GenPolicy,
        policy: &mut dyn RandomPolicy,
    ) -> Rc<Self> {
        let id = choose(policy, &gp.scalar_type_distr);
        let ty = reg.int_type(id);
        let span = (ty.max - ty.min) as u128 as u64;
        let draw = if span == u64::MAX {
            policy.uniform(0, u64::MAX)
        } else {
            policy.uniform(0, span)
        };
        let init = IRValue::of(id, ty.min + draw as i128);
        let modifier = match policy.roll(&[70, 20, 10]) {
            1 => Modifier::Const,
            2 => Modifier::Volatile,
            _ => Modifier::None,
        };
        let min = IRValue::of(id, ty.min);
        let max = IRValue::of(id, ty.max);
        Rc::new(Self {
            name: name.into(),
            ty,
            modifier,
            is_static: false,
            align: None,
            cur: Cell::new(init),
            min,
            max,
        })
    }
}

// ============================================================
// Arrays
// ============================================================

/// A named array. `cur` is the scalar summary the symbolic evaluator reads
/// for any element access; `init_val` is what every element starts as.
#[derive(Debug)]
pub struct ArrayData {
    pub name: String,
    pub ty: Rc<ArrayType>,
    pub modifier: Modifier,
    pub is_static: bool,
    pub align: Option<u64>,
    pub essence: ArrayEssence,
    pub init_val: IRValue,
    cur: Cell<IRValue>,
}

impl ArrayData {
    pub fn new(
        name: impl Into<String>,
        ty: Rc<ArrayType>,
        essence: ArrayEssence,
        init_val: IRValue,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            ty,
            modifier: Modifier::None,
            is_static: false,
            align: None,
            essence,
            init_val,
            cur: Cell::new(init_val),
        })
    }

    pub fn base_id(&self) -> IntTypeId {
        self.ty.base.id
    }

    /// The scalar summary standing in for any element.
    pub fn current_value(&self) -> IRValue {
        self.cur.get()
    }

    pub fn set_current_value(&self, v: IRValue) -> Result<()> {
        if v.type_id() != self.base_id() {
            return Err(Error::AssignMismatch {
                to: self.base_id(),
                from: v.type_id(),
            });
        }
        self.cur.set(v);
        Ok(())
    }

    /// Draw a fresh single-dimension array, occasionally `static`.
    pub fn generate(
        name: impl Into<String>,
        reg: &TypeRegistry,
        gp: &GenPolicy,
        policy: &mut dyn RandomPolicy,
        dim: u64,
    ) -> Rc<Self> {
        let id = choose(policy, &gp.scalar_type_distr);
        let ty = reg.array_type(id, &[dim]);
        let essence = choose(policy, &gp.essence_distr);
        let span = (ty.base.max - ty.base.min) as u128 as u64;
        let draw = if span == u64::MAX {
            policy.uniform(0, u64::MAX)
        } else {
            policy.uniform(0, span)
        };
        let init = IRValue::of(id, ty.base.min + draw as i128);
        let is_static = policy.uniform(0, 99) < 20;
        // Alignment only reaches the output when the options allow it.
        let align = match policy.roll(&[60, 20, 10, 10]) {
            1 => Some(16),
            2 => Some(32),
            3 => Some(64),
            _ => None,
        };
        Rc::new(Self {
            name: name.into(),
            ty,
            modifier: Modifier::None,
            is_static,
            align,
            essence,
            init_val: init,
            cur: Cell::new(init),
        })
    }
}

// ============================================================
// Iterators
// ============================================================

/// A loop induction variable with its traversal range.
///
/// `start`/`end`/`step` are expressions so headers like
/// `for (i = x; i < n; i += 2)` stay representable; `cur` tracks the value
/// for the iteration being symbolically executed.
#[derive(Debug)]
pub struct IterData {
    pub name: String,
    pub ty: Rc<IntType>,
    start: RefCell<Expr>,
    end: RefCell<Expr>,
    step: RefCell<Expr>,
    cur: Cell<IRValue>,
}

impl IterData {
    pub fn new(
        name: impl Into<String>,
        ty: Rc<IntType>,
        start: Expr,
        end: Expr,
        step: Expr,
    ) -> Rc<Self> {
        let cur = Cell::new(IRValue::zero(ty.id));
        Rc::new(Self {
            name: name.into(),
            ty,
            start: RefCell::new(start),
            end: RefCell::new(end),
            step: RefCell::new(step),
            cur,
        })
    }

    /// The common `[0, len)` by-one traversal.
    pub fn for_range(name: impl Into<String>, ty: Rc<IntType>, len: u64) -> Rc<Self> {
        let id = ty.id;
        Self::new(
            name,
            ty,
            Expr::constant(IRValue::zero(id)),
            Expr::constant(IRValue::from_parts(id, len, false)),
            Expr::constant(IRValue::from_parts(id, 1, false)),
        )
    }

    pub fn start(&self) -> &RefCell<Expr> {
        &self.start
    }

    pub fn end(&self) -> &RefCell<Expr> {
        &self.end
    }

    pub fn step(&self) -> &RefCell<Expr> {
        &self.step
    }

    pub fn current_value(&self) -> IRValue {
        self.cur.get()
    }

    pub fn set_current_value(&self, v: IRValue) -> Result<()> {
        if v.type_id() != self.ty.id {
            return Err(Error::AssignMismatch {
                to: self.ty.id,
                from: v.type_id(),
            });
        }
        self.cur.set(v);
        Ok(())
    }

    /// Replace the traversal range, as assignment between iterators does.
    pub fn set_parameters(&self, start: Expr, end: Expr, step: Expr) {
        *self.start.borrow_mut() = start;
        *self.end.borrow_mut() = end;
        *self.step.borrow_mut() = step;
    }
}

// ============================================================
// Shared handles
// ============================================================

/// A cheap shared handle to any entity.
#[derive(Debug, Clone)]
pub enum Data {
    Scalar(Rc<ScalarVar>),
    Array(Rc<ArrayData>),
    Iter(Rc<IterData>),
}

impl Data {
    pub fn name(&self) -> &str {
        match self {
            Data::Scalar(v) => &v.name,
            Data::Array(a) => &a.name,
            Data::Iter(i) => &i.name,
        }
    }

    pub fn kind(&self) -> DataKind {
        match self {
            Data::Scalar(_) => DataKind::Var,
            Data::Array(_) => DataKind::Arr,
            Data::Iter(_) => DataKind::Iter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::SeededPolicy;
    use crate::types::TypeLayout;

    fn registry() -> TypeRegistry {
        TypeRegistry::new(TypeLayout { long_is_64: true })
    }

    #[test]
    fn scalar_store_is_visible_through_shared_handles() {
        let reg = registry();
        let v = ScalarVar::new("x", reg.int_type(IntTypeId::Int), IRValue::of(IntTypeId::Int, 3));
        let alias = Rc::clone(&v);
        v.set_current_value(IRValue::of(IntTypeId::Int, 7)).unwrap();
        assert_eq!(alias.current_value().as_i128(), 7);
    }

    #[test]
    fn scalar_store_rejects_wrong_type() {
        let reg = registry();
        let v = ScalarVar::new("x", reg.int_type(IntTypeId::Int), IRValue::zero(IntTypeId::Int));
        let err = v.set_current_value(IRValue::zero(IntTypeId::UInt)).unwrap_err();
        assert!(matches!(err, Error::AssignMismatch { .. }));
    }

    #[test]
    fn generated_scalars_start_within_declared_bounds() {
        let reg = registry();
        let gp = GenPolicy::default();
        let mut policy = SeededPolicy::from_seed(11);
        for i in 0..64 {
            let v = ScalarVar::generate(format!("v{i}"), &reg, &gp, &mut policy);
            let cur = v.current_value().as_i128();
            assert!(cur >= v.min.as_i128() && cur <= v.max.as_i128(), "{cur} out of range");
            assert!(!v.current_value().has_ub());
        }
    }

    #[test]
    fn array_summary_tracks_stores() {
        let reg = registry();
        let ty = reg.array_type(IntTypeId::UInt, &[16]);
        let arr = ArrayData::new("a", ty, ArrayEssence::UniformConst, IRValue::zero(IntTypeId::UInt));
        arr.set_current_value(IRValue::of(IntTypeId::UInt, 9)).unwrap();
        assert_eq!(arr.current_value().as_i128(), 9);
        assert_eq!(arr.init_val.as_i128(), 0);
    }

    #[test]
    fn iterator_range_constructor() {
        let reg = registry();
        let it = IterData::for_range("i", reg.int_type(IntTypeId::Int), 10);
        let mut ctx = crate::context::EvalCtx::new();
        let sess = crate::context::GenSession::new(crate::options::Options::default());
        let end = it
            .end()
            .borrow_mut()
            .evaluate(&sess, &mut ctx)
            .unwrap()
            .expect_scalar("test")
            .unwrap();
        assert_eq!(end.as_i128(), 10);
    }
}
