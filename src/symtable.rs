//! Symbol tables.
//!
//! Generation keeps two tables: an *input* table of entities expressions may
//! read (never reassigned inside a loop body, which keeps per-iteration
//! symbolic values stable) and an *output* table of entities assignments
//! write and the checksum folds over.

use std::rc::Rc;

use crate::data::{ArrayData, IterData, ScalarVar};

/// Named entities visible to the generator.
#[derive(Default)]
pub struct SymbolTable {
    vars: Vec<Rc<ScalarVar>>,
    arrays: Vec<Rc<ArrayData>>,
    iters: Vec<Rc<IterData>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_var(&mut self, var: Rc<ScalarVar>) {
        self.vars.push(var);
    }

    pub fn add_array(&mut self, arr: Rc<ArrayData>) {
        self.arrays.push(arr);
    }

    pub fn add_iter(&mut self, iter: Rc<IterData>) {
        self.iters.push(iter);
    }

    pub fn vars(&self) -> &[Rc<ScalarVar>] {
        &self.vars
    }

    pub fn arrays(&self) -> &[Rc<ArrayData>] {
        &self.arrays
    }

    pub fn iters(&self) -> &[Rc<IterData>] {
        &self.iters
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.arrays.is_empty() && self.iters.is_empty()
    }
}
