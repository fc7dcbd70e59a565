//! The typed expression IR.
//!
//! Expressions form a closed tree over nine variants. Every node supports
//! four operations:
//!
//! - [`Expr::propagate_type`] — top-down normalization that inserts the
//!   implicit conversions the target language would perform;
//! - [`Expr::evaluate`] — bottom-up symbolic execution producing an
//!   [`EvalRes`] whose UB code floats to the root;
//! - [`Expr::rebuild`] — the UB-elimination fixed point: evaluate, rewrite
//!   the offending operator or operand locally, repeat within a budget;
//! - [`Expr::emit`] — textual rendering in the configured standard.
//!
//! Trees exclusively own their children; references to named entities go
//! through use nodes handed out by the session cache, so a store through one
//! reference is visible at every other.

mod conv;

pub use conv::{arith_conv, conv_to_bool, integral_prom};

use std::rc::Rc;

use tracing::debug;

use crate::context::{EvalCtx, GenSession, PopulateCtx};
use crate::data::{ArrayData, Data, IterData, ScalarVar};
use crate::error::{Error, Result};
use crate::options::Options;
use crate::policy::{choose, LeafKind, NodeKind, RandomPolicy};
use crate::types::{type_name, ArrayType, IntTypeId, TypeLayout};
use crate::value::{find_msb, IRValue, UbKind};

// ============================================================
// Operators
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Negate,
    LogNot,
    BitNot,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Negate => "-",
            UnaryOp::LogNot => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    LogAnd,
    LogOr,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::LogAnd => "&&",
            BinaryOp::LogOr => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }

    /// Operators whose result kind is `bool`.
    pub fn yields_bool(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::Le
                | BinaryOp::Ge
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::LogAnd
                | BinaryOp::LogOr
        )
    }
}

/// Node discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrNodeKind {
    Constant,
    ScalarVarUse,
    ArrayUse,
    IterUse,
    TypeCast,
    Unary,
    Binary,
    Subscript,
    Assignment,
}

// ============================================================
// Evaluation results
// ============================================================

/// What a subtree evaluates to. The UB code rides along and floats upward.
#[derive(Debug, Clone)]
pub enum EvalRes {
    Scalar(IRValue),
    Array { arr: Rc<ArrayData>, ub: UbKind },
    Iter { iter: Rc<IterData>, ub: UbKind },
}

impl EvalRes {
    pub fn ub(&self) -> UbKind {
        match self {
            EvalRes::Scalar(v) => v.ub_code(),
            EvalRes::Array { ub, .. } | EvalRes::Iter { ub, .. } => *ub,
        }
    }

    pub fn has_ub(&self) -> bool {
        self.ub().is_ub()
    }

    pub fn expect_scalar(self, op: &'static str) -> Result<IRValue> {
        match self {
            EvalRes::Scalar(v) => Ok(v),
            EvalRes::Array { .. } => Err(Error::NonScalarOperand { op, found: "array" }),
            EvalRes::Iter { .. } => Err(Error::NonScalarOperand {
                op,
                found: "iterator",
            }),
        }
    }

    fn from_data(d: &Data) -> EvalRes {
        match d {
            Data::Scalar(v) => EvalRes::Scalar(v.current_value()),
            Data::Array(a) => EvalRes::Array {
                arr: Rc::clone(a),
                ub: UbKind::NoUb,
            },
            Data::Iter(i) => EvalRes::Iter {
                iter: Rc::clone(i),
                ub: UbKind::NoUb,
            },
        }
    }
}

/// The static type of a subtree, available once types have propagated.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprTy {
    Int(IntTypeId),
    Array(Rc<ArrayType>),
}

impl ExprTy {
    pub fn expect_int(&self, what: &str) -> Result<IntTypeId> {
        match self {
            ExprTy::Int(id) => Ok(*id),
            ExprTy::Array(_) => Err(Error::Propagation {
                reason: format!("{what} must have integral type"),
            }),
        }
    }
}

// ============================================================
// Use nodes
// ============================================================

/// Reference to a scalar variable. Obtain through
/// [`GenSession::scalar_use`] so equal entities share one node.
#[derive(Debug, Clone)]
pub struct ScalarVarUse {
    var: Rc<ScalarVar>,
}

impl ScalarVarUse {
    pub(crate) fn new(var: Rc<ScalarVar>) -> Self {
        Self { var }
    }

    pub fn var(&self) -> &Rc<ScalarVar> {
        &self.var
    }

    /// Store into the underlying variable; visible to every holder.
    pub fn set_value(&self, v: IRValue) -> Result<()> {
        self.var.set_current_value(v)
    }
}

/// Reference to an array. Obtain through [`GenSession::array_use`].
#[derive(Debug, Clone)]
pub struct ArrayUse {
    arr: Rc<ArrayData>,
}

impl ArrayUse {
    pub(crate) fn new(arr: Rc<ArrayData>) -> Self {
        Self { arr }
    }

    pub fn array(&self) -> &Rc<ArrayData> {
        &self.arr
    }

    pub fn set_value(&self, from: &Rc<ArrayData>) -> Result<()> {
        if self.arr.ty != from.ty {
            return Err(Error::AssignMismatch {
                to: self.arr.base_id(),
                from: from.base_id(),
            });
        }
        self.arr.set_current_value(from.current_value())
    }
}

/// Reference to an iterator. Obtain through [`GenSession::iter_use`].
#[derive(Debug, Clone)]
pub struct IterUse {
    iter: Rc<IterData>,
}

impl IterUse {
    pub(crate) fn new(iter: Rc<IterData>) -> Self {
        Self { iter }
    }

    pub fn iter(&self) -> &Rc<IterData> {
        &self.iter
    }

    pub fn set_value(&self, from: &Rc<IterData>) -> Result<()> {
        if self.iter.ty != from.ty {
            return Err(Error::AssignMismatch {
                to: self.iter.ty.id,
                from: from.ty.id,
            });
        }
        self.iter.set_parameters(
            from.start().borrow().clone(),
            from.end().borrow().clone(),
            from.step().borrow().clone(),
        );
        self.iter.set_current_value(from.current_value())
    }
}

// ============================================================
// Node payloads
// ============================================================

#[derive(Debug, Clone)]
pub struct ConstantExpr {
    pub val: IRValue,
}

#[derive(Debug, Clone)]
pub struct TypeCastExpr {
    pub expr: Box<Expr>,
    pub to_type: IntTypeId,
    pub is_implicit: bool,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub arg: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct SubscriptExpr {
    pub array: Box<Expr>,
    pub idx: Box<Expr>,
    // Filled in by evaluation; read by the rebuild rule.
    active_dim: usize,
    active_size: u64,
    idx_ty: IntTypeId,
}

#[derive(Debug, Clone)]
pub struct AssignmentExpr {
    pub to: Box<Expr>,
    pub from: Box<Expr>,
    /// Whether the enclosing control-flow path executes. When false the
    /// store is suppressed but the value is still computed.
    pub taken: bool,
}

/// A typed expression tree.
#[derive(Debug, Clone)]
pub enum Expr {
    Constant(ConstantExpr),
    ScalarVarUse(ScalarVarUse),
    ArrayUse(ArrayUse),
    IterUse(IterUse),
    TypeCast(TypeCastExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Subscript(SubscriptExpr),
    Assignment(AssignmentExpr),
}

impl Expr {
    // --------------------------------------------------------
    // Constructors
    // --------------------------------------------------------

    pub fn constant(val: IRValue) -> Expr {
        Expr::Constant(ConstantExpr { val })
    }

    pub fn unary(op: UnaryOp, arg: Expr) -> Expr {
        Expr::Unary(UnaryExpr {
            op,
            arg: Box::new(arg),
        })
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary(BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn cast(expr: Expr, to_type: IntTypeId, is_implicit: bool) -> Expr {
        Expr::TypeCast(TypeCastExpr {
            expr: Box::new(expr),
            to_type,
            is_implicit,
        })
    }

    pub fn subscript(array: Expr, idx: Expr) -> Expr {
        Expr::Subscript(SubscriptExpr {
            array: Box::new(array),
            idx: Box::new(idx),
            active_dim: 0,
            active_size: 0,
            idx_ty: IntTypeId::Int,
        })
    }

    pub fn assign(to: Expr, from: Expr) -> Expr {
        Expr::Assignment(AssignmentExpr {
            to: Box::new(to),
            from: Box::new(from),
            taken: true,
        })
    }

    pub fn assign_not_taken(to: Expr, from: Expr) -> Expr {
        Expr::Assignment(AssignmentExpr {
            to: Box::new(to),
            from: Box::new(from),
            taken: false,
        })
    }

    pub fn kind(&self) -> IrNodeKind {
        match self {
            Expr::Constant(_) => IrNodeKind::Constant,
            Expr::ScalarVarUse(_) => IrNodeKind::ScalarVarUse,
            Expr::ArrayUse(_) => IrNodeKind::ArrayUse,
            Expr::IterUse(_) => IrNodeKind::IterUse,
            Expr::TypeCast(_) => IrNodeKind::TypeCast,
            Expr::Unary(_) => IrNodeKind::Unary,
            Expr::Binary(_) => IrNodeKind::Binary,
            Expr::Subscript(_) => IrNodeKind::Subscript,
            Expr::Assignment(_) => IrNodeKind::Assignment,
        }
    }

    // --------------------------------------------------------
    // Static typing
    // --------------------------------------------------------

    /// The node's result type. For interior nodes this reflects whatever
    /// conversions have already been inserted, so call it after
    /// [`Expr::propagate_type`] when exact kinds matter.
    pub fn ty(&self) -> Result<ExprTy> {
        match self {
            Expr::Constant(c) => Ok(ExprTy::Int(c.val.type_id())),
            Expr::ScalarVarUse(u) => Ok(ExprTy::Int(u.var.ty.id)),
            Expr::ArrayUse(u) => Ok(ExprTy::Array(Rc::clone(&u.arr.ty))),
            Expr::IterUse(u) => Ok(ExprTy::Int(u.iter.ty.id)),
            Expr::TypeCast(t) => Ok(ExprTy::Int(t.to_type)),
            Expr::Unary(u) => u.arg.ty(),
            Expr::Binary(b) => {
                if b.op.yields_bool() {
                    Ok(ExprTy::Int(IntTypeId::Bool))
                } else {
                    b.lhs.ty()
                }
            }
            Expr::Subscript(s) => {
                let mut peels = 1usize;
                let mut base = &s.array;
                while let Expr::Subscript(inner) = &**base {
                    peels += 1;
                    base = &inner.array;
                }
                match base.ty()? {
                    ExprTy::Array(aty) => {
                        if peels >= aty.dims.len() {
                            Ok(ExprTy::Int(aty.base.id))
                        } else {
                            Ok(ExprTy::Array(aty))
                        }
                    }
                    ExprTy::Int(_) => Err(Error::SubscriptBase),
                }
            }
            Expr::Assignment(a) => a.to.ty(),
        }
    }

    // --------------------------------------------------------
    // Type propagation
    // --------------------------------------------------------

    /// Recursively normalize children, inserting implicit casts per the
    /// target's promotion and conversion rules. Idempotent.
    pub fn propagate_type(&mut self, sess: &GenSession) -> Result<()> {
        match self {
            Expr::Constant(_) | Expr::ScalarVarUse(_) | Expr::ArrayUse(_) | Expr::IterUse(_) => {
                Ok(())
            }
            Expr::TypeCast(t) => t.expr.propagate_type(sess),
            Expr::Unary(u) => {
                u.arg.propagate_type(sess)?;
                match u.op {
                    UnaryOp::Plus | UnaryOp::Negate | UnaryOp::BitNot => {
                        conv::promote_slot(&mut u.arg)
                    }
                    UnaryOp::LogNot => conv::bool_slot(&mut u.arg),
                }
            }
            Expr::Binary(b) => {
                b.lhs.propagate_type(sess)?;
                b.rhs.propagate_type(sess)?;
                match b.op {
                    BinaryOp::LogAnd | BinaryOp::LogOr => {
                        conv::bool_slot(&mut b.lhs)?;
                        conv::bool_slot(&mut b.rhs)
                    }
                    BinaryOp::Shl | BinaryOp::Shr => {
                        conv::promote_slot(&mut b.lhs)?;
                        conv::promote_slot(&mut b.rhs)
                    }
                    _ => {
                        conv::promote_slot(&mut b.lhs)?;
                        conv::promote_slot(&mut b.rhs)?;
                        arith_conv(&mut b.lhs, &mut b.rhs, sess.layout())
                    }
                }
            }
            Expr::Subscript(s) => {
                s.array.propagate_type(sess)?;
                s.idx.propagate_type(sess)
            }
            Expr::Assignment(a) => {
                a.to.propagate_type(sess)?;
                a.from.propagate_type(sess)?;
                // The implicit cast to the destination type is inserted at
                // evaluation time, once for the life of the node.
                Ok(())
            }
        }
    }

    // --------------------------------------------------------
    // Evaluation
    // --------------------------------------------------------

    /// Symbolically execute the tree. Context bindings shadow the entities a
    /// use node refers to; UB codes from children float into the result.
    pub fn evaluate(&mut self, sess: &GenSession, ctx: &mut EvalCtx) -> Result<EvalRes> {
        let lay = sess.layout();
        match self {
            Expr::Constant(c) => Ok(EvalRes::Scalar(c.val)),
            Expr::ScalarVarUse(u) => Ok(match ctx.lookup(&u.var.name) {
                Some(d) => EvalRes::from_data(d),
                None => EvalRes::Scalar(u.var.current_value()),
            }),
            Expr::ArrayUse(u) => Ok(match ctx.lookup(&u.arr.name) {
                Some(d) => EvalRes::from_data(d),
                None => EvalRes::Array {
                    arr: Rc::clone(&u.arr),
                    ub: UbKind::NoUb,
                },
            }),
            Expr::IterUse(u) => Ok(match ctx.lookup(&u.iter.name) {
                Some(d) => EvalRes::from_data(d),
                None => EvalRes::Iter {
                    iter: Rc::clone(&u.iter),
                    ub: UbKind::NoUb,
                },
            }),
            Expr::TypeCast(t) => {
                let to = t.to_type;
                let v = t.expr.evaluate(sess, ctx)?.expect_scalar("cast")?;
                Ok(EvalRes::Scalar(v.cast_to(to, lay)))
            }
            Expr::Unary(u) => {
                let op = u.op;
                let v = u.arg.evaluate(sess, ctx)?.expect_scalar(op.as_str())?;
                let r = match op {
                    UnaryOp::Plus => v.plus(),
                    UnaryOp::Negate => v.neg(lay),
                    UnaryOp::LogNot => v.log_not()?,
                    UnaryOp::BitNot => v.bit_not(lay),
                };
                Ok(EvalRes::Scalar(r))
            }
            Expr::Binary(_) => {
                self.propagate_type(sess)?;
                let Expr::Binary(b) = self else { unreachable!() };
                let op = b.op;
                let l = b.lhs.evaluate(sess, ctx)?.expect_scalar(op.as_str())?;
                let r = b.rhs.evaluate(sess, ctx)?.expect_scalar(op.as_str())?;
                Ok(EvalRes::Scalar(apply_binary(op, l, r, lay)?))
            }
            Expr::Subscript(_) => {
                self.propagate_type(sess)?;
                self.eval_subscript(sess, ctx)
            }
            Expr::Assignment(_) => {
                self.propagate_type(sess)?;
                self.eval_assignment(sess, ctx)
            }
        }
    }

    fn eval_subscript(&mut self, sess: &GenSession, ctx: &mut EvalCtx) -> Result<EvalRes> {
        let Expr::Subscript(s) = self else { unreachable!() };

        let arr_res = s.array.evaluate(sess, ctx)?;
        let (arr, base_ub) = match arr_res {
            EvalRes::Array { arr, ub } => (arr, ub),
            _ => return Err(Error::SubscriptBase),
        };

        s.active_dim = match &*s.array {
            Expr::ArrayUse(_) => 0,
            Expr::Subscript(inner) => inner.active_dim + 1,
            _ => return Err(Error::SubscriptBase),
        };
        let dims = &arr.ty.dims;
        if s.active_dim >= dims.len() {
            return Err(Error::DimOutOfRange {
                dim: s.active_dim,
                name: arr.name.clone(),
            });
        }
        s.active_size = dims[s.active_dim];

        let idx_res = s.idx.evaluate(sess, ctx)?;
        let mut ub = base_ub;
        if !ub.is_ub() {
            ub = match Self::idx_bounds_ub(sess, ctx, s.active_size, &idx_res, &mut s.idx_ty)? {
                Some(code) => code,
                None => UbKind::NoUb,
            };
        }

        if s.active_dim + 1 < dims.len() {
            Ok(EvalRes::Array { arr, ub })
        } else {
            Ok(EvalRes::Scalar(arr.current_value().with_ub(ub)))
        }
    }

    /// Bounds-check an index result against the active dimension.
    ///
    /// A scalar index must satisfy `0 <= idx < size`. An iterator index must
    /// start inside the dimension and end at or before it (`end` is never
    /// attained). Returns the UB code to attach, if any.
    fn idx_bounds_ub(
        sess: &GenSession,
        ctx: &mut EvalCtx,
        size: u64,
        idx_res: &EvalRes,
        idx_ty: &mut IntTypeId,
    ) -> Result<Option<UbKind>> {
        match idx_res {
            EvalRes::Scalar(v) => {
                *idx_ty = v.type_id();
                if v.has_ub() {
                    return Ok(Some(v.ub_code()));
                }
                let ok = !v.is_negative() && v.abs_value() < size;
                Ok((!ok).then_some(UbKind::OutOfBounds))
            }
            EvalRes::Iter { iter, ub } => {
                *idx_ty = iter.ty.id;
                if ub.is_ub() {
                    return Ok(Some(*ub));
                }
                let start = iter
                    .start()
                    .borrow_mut()
                    .evaluate(sess, ctx)?
                    .expect_scalar("iterator start")?;
                let end = iter
                    .end()
                    .borrow_mut()
                    .evaluate(sess, ctx)?
                    .expect_scalar("iterator end")?;
                if start.has_ub() {
                    return Ok(Some(start.ub_code()));
                }
                if end.has_ub() {
                    return Ok(Some(end.ub_code()));
                }
                let start_ok = !start.is_negative() && start.abs_value() < size;
                let end_ok = !end.is_negative() && end.abs_value() <= size;
                Ok((!(start_ok && end_ok)).then_some(UbKind::OutOfBounds))
            }
            EvalRes::Array { .. } => Err(Error::NonScalarOperand {
                op: "[]",
                found: "array",
            }),
        }
    }

    fn eval_assignment(&mut self, sess: &GenSession, ctx: &mut EvalCtx) -> Result<EvalRes> {
        let Expr::Assignment(a) = self else { unreachable!() };

        // Match the destination type once; the inserted cast is kept, so
        // re-evaluation does not grow the tree.
        if let ExprTy::Int(to_id) = a.to.ty()? {
            if a.from.ty()? != ExprTy::Int(to_id) {
                conv::cast_slot(&mut a.from, to_id);
            }
        }

        let to_res = a.to.evaluate(sess, ctx)?;
        let from_res = a.from.evaluate(sess, ctx)?;
        let compatible = matches!(
            (&to_res, &from_res),
            (EvalRes::Scalar(_), EvalRes::Scalar(_))
                | (EvalRes::Array { .. }, EvalRes::Array { .. })
                | (EvalRes::Iter { .. }, EvalRes::Iter { .. })
        );
        if !compatible {
            return Err(Error::Propagation {
                reason: "assignment between incompatible data classes".into(),
            });
        }

        if !a.taken {
            return Ok(from_res);
        }

        match &*a.to {
            Expr::ScalarVarUse(u) => {
                let v = from_res.clone().expect_scalar("=")?;
                u.set_value(v)?;
            }
            Expr::ArrayUse(u) => {
                if let EvalRes::Array { arr, .. } = &from_res {
                    u.set_value(arr)?;
                }
            }
            Expr::IterUse(u) => {
                if let EvalRes::Iter { iter, .. } = &from_res {
                    u.set_value(iter)?;
                }
            }
            other => {
                return Err(Error::BadAssignTarget { kind: other.kind() });
            }
        }
        Ok(from_res)
    }

    // --------------------------------------------------------
    // Rebuild
    // --------------------------------------------------------

    /// Evaluate, and while the result carries UB, rewrite the offending
    /// operator or operand and try again. Children are repaired first, so
    /// any UB seen at a node is its own. The per-node retry budget comes
    /// from the session options; exhausting it is a generator bug.
    pub fn rebuild(
        &mut self,
        sess: &GenSession,
        ctx: &mut EvalCtx,
        policy: &mut dyn RandomPolicy,
    ) -> Result<EvalRes> {
        match self {
            Expr::Constant(_) | Expr::ScalarVarUse(_) | Expr::ArrayUse(_) | Expr::IterUse(_) => {
                return self.evaluate(sess, ctx);
            }
            Expr::TypeCast(t) => {
                t.expr.rebuild(sess, ctx, policy)?;
            }
            Expr::Unary(u) => {
                u.arg.rebuild(sess, ctx, policy)?;
            }
            Expr::Binary(b) => {
                b.lhs.rebuild(sess, ctx, policy)?;
                b.rhs.rebuild(sess, ctx, policy)?;
            }
            Expr::Subscript(s) => {
                s.array.rebuild(sess, ctx, policy)?;
                s.idx.rebuild(sess, ctx, policy)?;
            }
            Expr::Assignment(a) => {
                a.from.rebuild(sess, ctx, policy)?;
            }
        }

        let budget = sess.options().rebuild_budget;
        let mut attempts = 0u32;
        loop {
            let res = self.evaluate(sess, ctx)?;
            if !res.has_ub() {
                return Ok(res);
            }
            if attempts >= budget {
                return Err(Error::RebuildBudget { budget });
            }
            attempts += 1;
            self.apply_rewrite(res.ub(), sess, ctx, policy)?;
        }
    }

    /// One step of the node-local rewrite tables.
    fn apply_rewrite(
        &mut self,
        ub: UbKind,
        sess: &GenSession,
        ctx: &mut EvalCtx,
        policy: &mut dyn RandomPolicy,
    ) -> Result<()> {
        let lay = sess.layout();
        match self {
            Expr::Unary(u) => {
                if u.op == UnaryOp::Negate && ub == UbKind::SignOvfMin {
                    debug!(target: "grist::rebuild", "unary negate -> plus");
                    u.op = UnaryOp::Plus;
                    Ok(())
                } else {
                    Err(Error::Propagation {
                        reason: format!("unary `{}` cannot produce {ub:?}", u.op.as_str()),
                    })
                }
            }
            Expr::Binary(b) => Self::rewrite_binary(b, ub, lay, sess, ctx, policy),
            Expr::Subscript(s) => {
                if ub != UbKind::OutOfBounds {
                    return Err(Error::Propagation {
                        reason: format!("subscript cannot produce {ub:?}"),
                    });
                }
                debug!(target: "grist::rebuild", size = s.active_size, "subscript index % size");
                let size = IRValue::from_parts(s.idx_ty, s.active_size, false);
                conv::wrap_binary(&mut s.idx, BinaryOp::Mod, Expr::constant(size));
                Ok(())
            }
            other => Err(Error::Propagation {
                reason: format!("{:?} has no rewrite for {ub:?}", other.kind()),
            }),
        }
    }

    fn rewrite_binary(
        b: &mut BinaryExpr,
        ub: UbKind,
        lay: TypeLayout,
        sess: &GenSession,
        ctx: &mut EvalCtx,
        policy: &mut dyn RandomPolicy,
    ) -> Result<()> {
        let old = b.op;
        match b.op {
            BinaryOp::Add => b.op = BinaryOp::Sub,
            BinaryOp::Sub => b.op = BinaryOp::Add,
            BinaryOp::Mul => {
                b.op = if ub == UbKind::SignOvfMin {
                    BinaryOp::Sub
                } else {
                    BinaryOp::Div
                }
            }
            BinaryOp::Div | BinaryOp::Mod => {
                b.op = if ub == UbKind::ZeroDiv {
                    BinaryOp::Mul
                } else {
                    BinaryOp::Sub
                }
            }
            BinaryOp::Shl | BinaryOp::Shr => {
                Self::rewrite_shift(b, ub, lay, sess, ctx, policy)?;
            }
            _ => {
                // Comparisons, bitwise and logical operators cannot produce
                // UB once operands are promoted.
                return Err(Error::Propagation {
                    reason: format!("binary `{}` cannot produce {ub:?}", b.op.as_str()),
                });
            }
        }
        debug!(
            target: "grist::rebuild",
            "binary `{}` -> `{}` for {ub:?}",
            old.as_str(),
            b.op.as_str()
        );
        Ok(())
    }

    /// Shift repairs splice a correction constant onto one operand instead
    /// of changing the operator.
    fn rewrite_shift(
        b: &mut BinaryExpr,
        ub: UbKind,
        lay: TypeLayout,
        sess: &GenSession,
        ctx: &mut EvalCtx,
        policy: &mut dyn RandomPolicy,
    ) -> Result<()> {
        let lhs_val = b.lhs.evaluate(sess, ctx)?.expect_scalar(b.op.as_str())?;
        let rhs_val = b.rhs.evaluate(sess, ctx)?.expect_scalar(b.op.as_str())?;
        let lhs_width = u64::from(lay.width(lhs_val.type_id()));
        debug!(target: "grist::rebuild", %lhs_val, %rhs_val, ?ub, "repairing shift");

        match ub {
            UbKind::ShiftRhsNeg => {
                let rand = policy.uniform(0, lhs_width);
                let rhs_abs = rhs_val.abs_value();
                let mut new_val = (rand + rhs_abs).min(lhs_width);
                if new_val < rhs_abs {
                    // The width cap cannot lift a far-negative count back
                    // into range; add as much as the operand type allows
                    // and let the next round finish the job.
                    let ty_max = lay.max(rhs_val.type_id()) as u64;
                    new_val = (rhs_abs + rand.min(lhs_width)).min(ty_max);
                }
                debug!(target: "grist::rebuild", new_val, "shift rhs += const");
                let adjust = IRValue::from_parts(rhs_val.type_id(), new_val, false);
                conv::wrap_binary(&mut b.rhs, BinaryOp::Add, Expr::constant(adjust));
            }
            UbKind::ShiftRhsLarge => {
                let mut max_valid = lhs_width;
                if b.op == BinaryOp::Shl && lhs_val.type_id().is_signed() {
                    max_valid = max_valid.saturating_sub(u64::from(find_msb(lhs_val.abs_value())));
                }
                let new_val = policy.uniform(0, max_valid);
                let adjust = rhs_val.abs_value().saturating_sub(new_val);
                debug!(target: "grist::rebuild", new_val, adjust, "shift rhs -= const");
                let adjust = IRValue::from_parts(rhs_val.type_id(), adjust, false);
                conv::wrap_binary(&mut b.rhs, BinaryOp::Sub, Expr::constant(adjust));
            }
            UbKind::NegShift => {
                debug!(target: "grist::rebuild", "shift lhs += type max");
                let max = IRValue::max_of(lhs_val.type_id(), lay);
                conv::wrap_binary(&mut b.lhs, BinaryOp::Add, Expr::constant(max));
            }
            other => {
                return Err(Error::Propagation {
                    reason: format!("shift cannot produce {other:?}"),
                });
            }
        }
        Ok(())
    }

    // --------------------------------------------------------
    // Emission
    // --------------------------------------------------------

    /// Render target-language source into `out`.
    pub fn emit(&self, opts: &Options, out: &mut String) {
        let lay = TypeLayout::new(opts);
        match self {
            Expr::Constant(c) => emit_constant(c.val, lay, out),
            Expr::ScalarVarUse(u) => out.push_str(&u.var.name),
            Expr::ArrayUse(u) => out.push_str(&u.arr.name),
            Expr::IterUse(u) => out.push_str(&u.iter.name),
            Expr::TypeCast(t) => {
                out.push_str("((");
                if t.is_implicit {
                    out.push_str("/* implicit */");
                }
                out.push_str(type_name(t.to_type, lay, opts.standard));
                out.push_str(") ");
                t.expr.emit(opts, out);
                out.push(')');
            }
            Expr::Unary(u) => {
                out.push('(');
                out.push_str(u.op.as_str());
                out.push('(');
                u.arg.emit(opts, out);
                out.push_str("))");
            }
            Expr::Binary(b) => {
                out.push('(');
                b.lhs.emit(opts, out);
                out.push_str(") ");
                out.push_str(b.op.as_str());
                out.push_str(" (");
                b.rhs.emit(opts, out);
                out.push(')');
            }
            Expr::Subscript(s) => {
                s.array.emit(opts, out);
                out.push('[');
                s.idx.emit(opts, out);
                out.push(']');
            }
            Expr::Assignment(a) => {
                a.to.emit(opts, out);
                out.push_str(" = ");
                a.from.emit(opts, out);
            }
        }
    }

    /// Convenience wrapper: emit into a fresh string.
    pub fn emit_to_string(&self, opts: &Options) -> String {
        let mut out = String::new();
        self.emit(opts, &mut out);
        out
    }

    // --------------------------------------------------------
    // Random construction
    // --------------------------------------------------------

    /// Produce a random arithmetic tree over the input symbol table. The
    /// returned tree has *not* been repaired yet; callers run
    /// [`Expr::propagate_type`] and [`Expr::rebuild`] before emitting.
    pub fn gen_arith(pctx: &mut PopulateCtx<'_>, depth: u32) -> Result<Expr> {
        let max_depth = pctx.sess.options().max_expr_depth;
        let stop_early =
            depth > 0 && pctx.policy.uniform(0, 99) < u64::from(pctx.gen_policy.early_leaf_pct);
        if depth >= max_depth || stop_early {
            return Self::gen_leaf(pctx);
        }

        match choose(pctx.policy, &pctx.gen_policy.node_distr) {
            NodeKind::Unary => {
                let op = choose(pctx.policy, &pctx.gen_policy.unary_op_distr);
                let arg = Self::gen_arith(pctx, depth + 1)?;
                Ok(Expr::unary(op, arg))
            }
            NodeKind::Binary => {
                let op = choose(pctx.policy, &pctx.gen_policy.binary_op_distr);
                let lhs = Self::gen_arith(pctx, depth + 1)?;
                let rhs = Self::gen_arith(pctx, depth + 1)?;
                Ok(Expr::binary(op, lhs, rhs))
            }
            NodeKind::Cast => {
                let to = choose(pctx.policy, &pctx.gen_policy.scalar_type_distr);
                let inner = Self::gen_arith(pctx, depth + 1)?;
                Ok(Expr::cast(inner, to, false))
            }
        }
    }

    fn gen_leaf(pctx: &mut PopulateCtx<'_>) -> Result<Expr> {
        match choose(pctx.policy, &pctx.gen_policy.leaf_distr) {
            LeafKind::ScalarUse if !pctx.ext_inp.vars().is_empty() => {
                let idx = pctx.policy.uniform(0, pctx.ext_inp.vars().len() as u64 - 1) as usize;
                let var = &pctx.ext_inp.vars()[idx];
                Ok(Expr::ScalarVarUse(pctx.sess.scalar_use(var)))
            }
            LeafKind::Subscript if !pctx.ext_inp.arrays().is_empty() => {
                let idx = pctx.policy.uniform(0, pctx.ext_inp.arrays().len() as u64 - 1) as usize;
                let arr = Rc::clone(&pctx.ext_inp.arrays()[idx]);
                let dim = arr.ty.dims[0];
                let index_expr = if let Some(iter) = pctx.active_iters.last() {
                    Expr::IterUse(pctx.sess.iter_use(iter))
                } else {
                    // Deliberately overshoot sometimes; the rebuild pass
                    // splices a `% size` when we do.
                    let v = pctx.policy.uniform(0, dim + dim / 2);
                    Expr::constant(IRValue::from_parts(IntTypeId::Int, v, false))
                };
                Ok(Expr::subscript(
                    Expr::ArrayUse(pctx.sess.array_use(&arr)),
                    index_expr,
                ))
            }
            _ => Self::gen_constant(pctx),
        }
    }

    fn gen_constant(pctx: &mut PopulateCtx<'_>) -> Result<Expr> {
        let id = choose(pctx.policy, &pctx.gen_policy.scalar_type_distr);
        let lay = pctx.sess.layout();
        let min = lay.min(id);
        let span = (lay.max(id) - min) as u128 as u64;
        let draw = if span == u64::MAX {
            pctx.policy.uniform(0, u64::MAX)
        } else {
            pctx.policy.uniform(0, span)
        };
        Ok(Expr::constant(IRValue::of(id, min + draw as i128)))
    }

    /// Produce a ready-to-emit assignment: a fresh destination variable
    /// (registered in the output table) receiving a repaired random tree.
    pub fn gen_assign(pctx: &mut PopulateCtx<'_>, dest_name: &str) -> Result<Expr> {
        let from = Self::gen_arith(pctx, 0)?;
        let from_ty = match from.ty()? {
            ExprTy::Int(id) => id,
            ExprTy::Array(aty) => aty.base.id,
        };
        let ty = pctx.sess.types().int_type(from_ty);
        let dest = ScalarVar::new(dest_name, ty, IRValue::zero(from_ty));
        pctx.ext_out.add_var(Rc::clone(&dest));

        let mut expr = Expr::assign(Expr::ScalarVarUse(pctx.sess.scalar_use(&dest)), from);
        expr.propagate_type(pctx.sess)?;
        let mut ctx = EvalCtx::new();
        let res = expr.rebuild(pctx.sess, &mut ctx, pctx.policy)?;
        debug_assert!(!res.has_ub());
        Ok(expr)
    }
}

/// Dispatch a binary operator over same-typed scalar operands (shifts keep
/// their independently promoted sides).
pub fn apply_binary(op: BinaryOp, l: IRValue, r: IRValue, lay: TypeLayout) -> Result<IRValue> {
    match op {
        BinaryOp::Add => l.add(r, lay),
        BinaryOp::Sub => l.sub(r, lay),
        BinaryOp::Mul => l.mul(r, lay),
        BinaryOp::Div => l.div(r, lay),
        BinaryOp::Mod => l.rem(r, lay),
        BinaryOp::Lt => l.lt(r),
        BinaryOp::Gt => l.gt(r),
        BinaryOp::Le => l.le(r),
        BinaryOp::Ge => l.ge(r),
        BinaryOp::Eq => l.eq(r),
        BinaryOp::Ne => l.ne(r),
        BinaryOp::LogAnd => l.log_and(r),
        BinaryOp::LogOr => l.log_or(r),
        BinaryOp::BitAnd => l.bit_and(r, lay),
        BinaryOp::BitOr => l.bit_or(r, lay),
        BinaryOp::BitXor => l.bit_xor(r, lay),
        BinaryOp::Shl => Ok(l.shl(r, lay)),
        BinaryOp::Shr => Ok(l.shr(r, lay)),
    }
}

/// Emit one integer literal.
///
/// A signed minimum cannot be spelled directly: the target parses `-X` as
/// unary minus applied to the literal `X`, and `X = |min|` overflows its own
/// type. Emit `((min+1) - 1)` instead, and parenthesize every negative
/// literal.
fn emit_constant(val: IRValue, lay: TypeLayout, out: &mut String) {
    let id = val.type_id();
    if id == IntTypeId::Bool {
        out.push_str(if val.as_bool() { "true" } else { "false" });
        return;
    }
    let suffix = id.literal_suffix();
    if id.is_signed() && val.as_i128() == lay.min(id) {
        let min_plus_one = val.abs_value() - 1;
        out.push_str(&format!("((-{min_plus_one}{suffix}) - 1{suffix})"));
    } else if val.is_negative() {
        out.push_str(&format!("(-{}{suffix})", val.abs_value()));
    } else {
        out.push_str(&format!("{}{suffix}", val.abs_value()));
    }
}
