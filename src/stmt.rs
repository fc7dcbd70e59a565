//! Statements: declarations, expression statements, blocks, scopes, loops.
//!
//! The statement layer is deliberately thin — the interesting machinery
//! lives in the expression IR — but it is what turns repaired expression
//! trees into a compilable program body. Statement emission carries an
//! indentation offset; expression emission does not.

use std::rc::Rc;

use crate::context::PopulateCtx;
use crate::data::{Data, IterData, Modifier};
use crate::error::Result;
use crate::expr::Expr;
use crate::options::{Options, StandardKind};
use crate::types::type_name;

const INDENT: &str = "    ";

/// One statement.
#[derive(Debug)]
pub enum Stmt {
    /// `expr;`
    Expr(ExprStmt),
    /// `type name = init;`
    Decl(DeclStmt),
    /// A braced scope.
    Scope(StmtBlock),
    /// A sequence of counted loops, each with its own header and body.
    LoopSeq(LoopSeqStmt),
    /// Raw text passed through verbatim (pragmas, comments).
    Stub(String),
}

#[derive(Debug)]
pub struct ExprStmt {
    pub expr: Expr,
}

#[derive(Debug)]
pub struct DeclStmt {
    pub data: Data,
    pub init: Option<Expr>,
}

/// An unbraced statement sequence.
#[derive(Debug, Default)]
pub struct StmtBlock {
    pub stmts: Vec<Stmt>,
}

/// A loop header: the iterators it declares and steps.
#[derive(Debug)]
pub struct LoopHead {
    pub iters: Vec<Rc<IterData>>,
}

/// One or more sequential loops.
#[derive(Debug, Default)]
pub struct LoopSeqStmt {
    pub loops: Vec<(LoopHead, StmtBlock)>,
}

impl Stmt {
    pub fn emit(&self, opts: &Options, out: &mut String, offset: &str) {
        match self {
            Stmt::Expr(s) => {
                out.push_str(offset);
                s.expr.emit(opts, out);
                out.push_str(";\n");
            }
            Stmt::Decl(s) => s.emit(opts, out, offset),
            Stmt::Scope(block) => {
                out.push_str(offset);
                out.push_str("{\n");
                block.emit(opts, out, &format!("{offset}{INDENT}"));
                out.push_str(offset);
                out.push_str("}\n");
            }
            Stmt::LoopSeq(s) => s.emit(opts, out, offset),
            Stmt::Stub(text) => {
                out.push_str(offset);
                out.push_str(text);
                out.push('\n');
            }
        }
    }
}

impl DeclStmt {
    pub fn new(data: Data) -> Self {
        Self { data, init: None }
    }

    pub fn with_init(data: Data, init: Expr) -> Self {
        Self {
            data,
            init: Some(init),
        }
    }

    fn emit(&self, opts: &Options, out: &mut String, offset: &str) {
        let lay = crate::types::TypeLayout::new(opts);
        out.push_str(offset);
        match &self.data {
            Data::Scalar(v) => {
                if v.is_static {
                    out.push_str("static ");
                }
                out.push_str(effective_modifier(v.modifier, opts).prefix());
                if let Some(align) = v.align.filter(|_| emits_align(opts)) {
                    out.push_str(&format!("alignas({align}) "));
                }
                out.push_str(type_name(v.ty.id, lay, opts.standard));
                out.push(' ');
                out.push_str(&v.name);
            }
            Data::Array(a) => {
                if a.is_static {
                    out.push_str("static ");
                }
                out.push_str(effective_modifier(a.modifier, opts).prefix());
                if let Some(align) = a.align.filter(|_| emits_align(opts)) {
                    out.push_str(&format!("alignas({align}) "));
                }
                out.push_str(type_name(a.base_id(), lay, opts.standard));
                out.push(' ');
                out.push_str(&a.name);
                for dim in &a.ty.dims {
                    out.push_str(&format!(" [{dim}]"));
                }
            }
            Data::Iter(i) => {
                out.push_str(type_name(i.ty.id, lay, opts.standard));
                out.push(' ');
                out.push_str(&i.name);
            }
        }
        if let Some(init) = &self.init {
            out.push_str(" = ");
            init.emit(opts, out);
        }
        out.push_str(";\n");
    }
}

impl StmtBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stmt(&mut self, stmt: Stmt) {
        self.stmts.push(stmt);
    }

    pub fn emit(&self, opts: &Options, out: &mut String, offset: &str) {
        for stmt in &self.stmts {
            stmt.emit(opts, out, offset);
        }
    }

    /// Fill the block with repaired random assignments, one fresh output
    /// variable each.
    pub fn populate_assignments(
        &mut self,
        pctx: &mut PopulateCtx<'_>,
        count: u64,
        name_prefix: &str,
    ) -> Result<()> {
        for i in 0..count {
            let name = format!("{name_prefix}{i}");
            let expr = Expr::gen_assign(pctx, &name)?;
            self.stmts.push(Stmt::Expr(ExprStmt { expr }));
        }
        Ok(())
    }
}

impl LoopHead {
    pub fn new(iter: Rc<IterData>) -> Self {
        Self { iters: vec![iter] }
    }

    /// `for (type i = start; i < end; i += step) {`
    fn emit_header(&self, opts: &Options, out: &mut String, offset: &str) {
        let lay = crate::types::TypeLayout::new(opts);
        for iter in &self.iters {
            out.push_str(offset);
            out.push_str("for (");
            out.push_str(type_name(iter.ty.id, lay, opts.standard));
            out.push(' ');
            out.push_str(&iter.name);
            out.push_str(" = ");
            iter.start().borrow().emit(opts, out);
            out.push_str(&format!("; {} < ", iter.name));
            iter.end().borrow().emit(opts, out);
            out.push_str(&format!("; {} += ", iter.name));
            iter.step().borrow().emit(opts, out);
            out.push_str(") {\n");
        }
    }

    fn emit_footer(&self, out: &mut String, offset: &str) {
        for _ in &self.iters {
            out.push_str(offset);
            out.push_str("}\n");
        }
    }
}

impl LoopSeqStmt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_loop(&mut self, head: LoopHead, body: StmtBlock) {
        self.loops.push((head, body));
    }

    pub fn emit(&self, opts: &Options, out: &mut String, offset: &str) {
        for (head, body) in &self.loops {
            head.emit_header(opts, out, offset);
            let inner = format!("{offset}{INDENT}");
            body.emit(opts, out, &inner);
            head.emit_footer(out, offset);
        }
    }
}

/// ISPC has no `volatile`; everything else passes through.
fn effective_modifier(m: Modifier, opts: &Options) -> Modifier {
    match (m, opts.standard) {
        (Modifier::Volatile, StandardKind::Ispc) => Modifier::None,
        (m, _) => m,
    }
}

/// `alignas` is a C++ spelling; ISPC declarations go out unadorned.
fn emits_align(opts: &Options) -> bool {
    opts.allow_align && opts.standard != StandardKind::Ispc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GenSession;
    use crate::data::ScalarVar;
    use crate::types::IntTypeId;
    use crate::value::IRValue;

    #[test]
    fn decl_emission() {
        let sess = GenSession::new(Options::default());
        let v = ScalarVar::new(
            "seed_0",
            sess.types().int_type(IntTypeId::UInt),
            IRValue::of(IntTypeId::UInt, 9),
        );
        let decl = DeclStmt::with_init(
            Data::Scalar(Rc::clone(&v)),
            Expr::constant(v.current_value()),
        );
        let mut out = String::new();
        decl.emit(sess.options(), &mut out, "");
        assert_eq!(out, "unsigned int seed_0 = 9U;\n");
    }

    #[test]
    fn scope_indents_contents() {
        let sess = GenSession::new(Options::default());
        let mut block = StmtBlock::new();
        block.add_stmt(Stmt::Stub("// body".into()));
        let scope = Stmt::Scope(block);
        let mut out = String::new();
        scope.emit(sess.options(), &mut out, "");
        assert_eq!(out, "{\n    // body\n}\n");
    }

    #[test]
    fn loop_emission_shape() {
        let sess = GenSession::new(Options::default());
        let iter = IterData::for_range("i_0", sess.types().int_type(IntTypeId::Int), 8);
        let mut seq = LoopSeqStmt::new();
        let mut body = StmtBlock::new();
        body.add_stmt(Stmt::Stub("// work".into()));
        seq.add_loop(LoopHead::new(iter), body);

        let mut out = String::new();
        Stmt::LoopSeq(seq).emit(sess.options(), &mut out, "");
        assert_eq!(out, "for (int i_0 = 0; i_0 < 8; i_0 += 1) {\n    // work\n}\n");
    }
}
