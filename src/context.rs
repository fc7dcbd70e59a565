//! Generation-scoped state and evaluation contexts.
//!
//! Generators of this kind traditionally keep the options, the RNG, and the
//! use-expression caches in process globals. Here all of that run-scoped
//! state lives on [`GenSession`] with ordinary init/teardown, so independent
//! generations cannot observe each other.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::data::{ArrayData, Data, IterData, ScalarVar};
use crate::expr::{ArrayUse, IterUse, ScalarVarUse};
use crate::options::Options;
use crate::policy::{GenPolicy, RandomPolicy};
use crate::symtable::SymbolTable;
use crate::types::{TypeLayout, TypeRegistry};

// ============================================================
// Session
// ============================================================

/// One program-generation run: options, the interned type registry, and the
/// identity-keyed use-expression caches.
///
/// The caches guarantee that every reference to a given entity yields the
/// same use node, so a store through one reference is visible at every
/// textual appearance. They are append-only for the life of the session.
pub struct GenSession {
    opts: Options,
    types: TypeRegistry,
    scalar_uses: RefCell<FxHashMap<*const ScalarVar, ScalarVarUse>>,
    array_uses: RefCell<FxHashMap<*const ArrayData, ArrayUse>>,
    iter_uses: RefCell<FxHashMap<*const IterData, IterUse>>,
}

impl GenSession {
    pub fn new(opts: Options) -> Self {
        let layout = TypeLayout::new(&opts);
        Self {
            opts,
            types: TypeRegistry::new(layout),
            scalar_uses: RefCell::new(FxHashMap::default()),
            array_uses: RefCell::new(FxHashMap::default()),
            iter_uses: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn layout(&self) -> TypeLayout {
        self.types.layout()
    }

    /// The canonical use node for a scalar variable.
    pub fn scalar_use(&self, var: &Rc<ScalarVar>) -> ScalarVarUse {
        let key = Rc::as_ptr(var);
        self.scalar_uses
            .borrow_mut()
            .entry(key)
            .or_insert_with(|| ScalarVarUse::new(Rc::clone(var)))
            .clone()
    }

    /// The canonical use node for an array.
    pub fn array_use(&self, arr: &Rc<ArrayData>) -> ArrayUse {
        let key = Rc::as_ptr(arr);
        self.array_uses
            .borrow_mut()
            .entry(key)
            .or_insert_with(|| ArrayUse::new(Rc::clone(arr)))
            .clone()
    }

    /// The canonical use node for an iterator.
    pub fn iter_use(&self, iter: &Rc<IterData>) -> IterUse {
        let key = Rc::as_ptr(iter);
        self.iter_uses
            .borrow_mut()
            .entry(key)
            .or_insert_with(|| IterUse::new(Rc::clone(iter)))
            .clone()
    }
}

// ============================================================
// Evaluation context
// ============================================================

/// Name-to-entity bindings that override a use node's own binding during
/// evaluation, so one tree can be executed under different loop-iteration
/// snapshots without mutating it.
#[derive(Default)]
pub struct EvalCtx {
    input: FxHashMap<String, Data>,
}

impl EvalCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, data: Data) {
        self.input.insert(name.into(), data);
    }

    pub fn lookup(&self, name: &str) -> Option<&Data> {
        self.input.get(name)
    }
}

// ============================================================
// Populate context
// ============================================================

/// Everything the random factories need: symbol tables, the policy pair,
/// and where in the loop structure we currently are.
pub struct PopulateCtx<'a> {
    pub sess: &'a GenSession,
    pub ext_inp: &'a SymbolTable,
    pub ext_out: &'a mut SymbolTable,
    pub gen_policy: &'a GenPolicy,
    pub policy: &'a mut dyn RandomPolicy,
    pub loop_depth: u32,
    pub active_iters: Vec<Rc<IterData>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntTypeId;
    use crate::value::IRValue;

    #[test]
    fn use_cache_returns_the_same_node_per_entity() {
        let sess = GenSession::new(Options::default());
        let reg = sess.types();
        let v = ScalarVar::new("x", reg.int_type(IntTypeId::Int), IRValue::zero(IntTypeId::Int));
        let u1 = sess.scalar_use(&v);
        let u2 = sess.scalar_use(&v);
        assert!(Rc::ptr_eq(u1.var(), u2.var()));

        let w = ScalarVar::new("y", reg.int_type(IntTypeId::Int), IRValue::zero(IntTypeId::Int));
        let u3 = sess.scalar_use(&w);
        assert!(!Rc::ptr_eq(u1.var(), u3.var()));
    }

    #[test]
    fn eval_ctx_bindings_shadow_by_name() {
        let sess = GenSession::new(Options::default());
        let v = ScalarVar::new(
            "x",
            sess.types().int_type(IntTypeId::Int),
            IRValue::of(IntTypeId::Int, 1),
        );
        let mut ctx = EvalCtx::new();
        assert!(ctx.lookup("x").is_none());
        ctx.bind("x", Data::Scalar(Rc::clone(&v)));
        assert!(matches!(ctx.lookup("x"), Some(Data::Scalar(_))));
    }
}
