//! Whole-program generation.
//!
//! A [`ProgramGenerator`] turns a seed into one self-contained source file:
//! seeded inputs, a loop nest of repaired assignments, and a checksum fold
//! over every output printed at exit. Any conforming compiler, at any
//! optimization level, must print the same checksum — a divergence is a
//! compiler bug.

use std::rc::Rc;

use tracing::{debug, info};

use crate::context::{EvalCtx, GenSession, PopulateCtx};
use crate::data::{ArrayData, ArrayEssence, Data, ScalarVar};
use crate::error::Result;
use crate::expr::Expr;
use crate::options::{Options, StandardKind};
use crate::policy::{GenPolicy, RandomPolicy, SeededPolicy};
use crate::stmt::{DeclStmt, ExprStmt, LoopHead, LoopSeqStmt, Stmt, StmtBlock};
use crate::symtable::SymbolTable;
use crate::types::{type_name, IntTypeId, TypeLayout};
use crate::value::IRValue;

const INDENT: &str = "    ";

/// The result of one generation run.
#[derive(Debug, Clone)]
pub struct GeneratedProgram {
    pub seed: u64,
    pub source: String,
}

/// Seed-to-source driver.
pub struct ProgramGenerator {
    opts: Options,
    gen_policy: GenPolicy,
}

impl ProgramGenerator {
    pub fn new(opts: Options) -> Self {
        Self {
            opts,
            gen_policy: GenPolicy::default(),
        }
    }

    pub fn with_policy(opts: Options, gen_policy: GenPolicy) -> Self {
        Self { opts, gen_policy }
    }

    /// Generate the program for `seed`.
    pub fn generate(&self, seed: u64) -> Result<GeneratedProgram> {
        let sess = GenSession::new(self.opts.clone());
        let mut policy = SeededPolicy::from_seed(seed);
        let gp = &self.gen_policy;

        // Input population. Arrays share one dimension, which doubles as
        // the loop trip count so iterator subscripts stay in bounds.
        let dim = policy.uniform(gp.array_dim.0, gp.array_dim.1);
        let n_vars = policy.uniform(gp.inp_vars.0, gp.inp_vars.1);
        let n_arrays = policy.uniform(gp.inp_arrays.0, gp.inp_arrays.1);

        let mut inp = SymbolTable::new();
        for i in 0..n_vars {
            inp.add_var(ScalarVar::generate(
                format!("var_{i}"),
                sess.types(),
                gp,
                &mut policy,
            ));
        }
        for i in 0..n_arrays {
            inp.add_array(ArrayData::generate(
                format!("arr_{i}"),
                sess.types(),
                gp,
                &mut policy,
                dim,
            ));
        }
        info!(seed, dim, n_vars, n_arrays, "populated input symbol table");

        let mut out = SymbolTable::new();
        let iter = crate::data::IterData::for_range(
            "i_0",
            sess.types().int_type(IntTypeId::Int),
            dim,
        );

        // A few standalone assignments, then the loop body.
        let mut prelude = StmtBlock::new();
        {
            let mut pctx = PopulateCtx {
                sess: &sess,
                ext_inp: &inp,
                ext_out: &mut out,
                gen_policy: gp,
                policy: &mut policy,
                loop_depth: 0,
                active_iters: Vec::new(),
            };
            let n = pctx.policy.uniform(1, 3);
            prelude.populate_assignments(&mut pctx, n, "pre_")?;
        }

        let mut body = StmtBlock::new();
        {
            let mut pctx = PopulateCtx {
                sess: &sess,
                ext_inp: &inp,
                ext_out: &mut out,
                gen_policy: gp,
                policy: &mut policy,
                loop_depth: 1,
                active_iters: vec![Rc::clone(&iter)],
            };
            let n = pctx.policy.uniform(gp.stmts_per_loop.0, gp.stmts_per_loop.1);
            body.populate_assignments(&mut pctx, n, "res_")?;
        }
        debug!(
            outputs = out.vars().len(),
            "generated statements are UB-free"
        );

        // Double-check the whole body under a fresh context; a UB leak here
        // would be a generator bug, not a property of the seed.
        self.verify_clean(&sess, &mut prelude, &mut body, &mut policy)?;

        let mut loop_seq = LoopSeqStmt::new();
        loop_seq.add_loop(LoopHead::new(Rc::clone(&iter)), body);

        let source = self.render(seed, &sess, &inp, &out, &prelude, &loop_seq);
        info!(seed, bytes = source.len(), "emitted program");
        Ok(GeneratedProgram { seed, source })
    }

    fn verify_clean(
        &self,
        sess: &GenSession,
        prelude: &mut StmtBlock,
        body: &mut StmtBlock,
        policy: &mut dyn RandomPolicy,
    ) -> Result<()> {
        let mut ctx = EvalCtx::new();
        for block in [prelude, body] {
            for stmt in &mut block.stmts {
                if let Stmt::Expr(ExprStmt { expr }) = stmt {
                    let res = expr.rebuild(sess, &mut ctx, policy)?;
                    debug_assert!(!res.has_ub());
                }
            }
        }
        Ok(())
    }

    // --------------------------------------------------------
    // Rendering
    // --------------------------------------------------------

    fn render(
        &self,
        seed: u64,
        sess: &GenSession,
        inp: &SymbolTable,
        out_tab: &SymbolTable,
        prelude: &StmtBlock,
        loop_seq: &LoopSeqStmt,
    ) -> String {
        let opts = sess.options();
        let lay = sess.layout();
        let mut src = String::new();

        src.push_str(&format!(
            "/* This test was generated with grist {} (seed {seed}, standard {}). */\n",
            env!("CARGO_PKG_VERSION"),
            opts.standard
        ));
        self.render_prologue(opts, lay, &mut src);

        // Entry point.
        match opts.standard {
            StandardKind::Cxx | StandardKind::Sycl => src.push_str("int main() {\n"),
            StandardKind::Ispc => src.push_str("export void test() {\n"),
        }

        // Inputs.
        for var in inp.vars() {
            let decl = DeclStmt::with_init(
                Data::Scalar(Rc::clone(var)),
                Expr::constant(var.current_value()),
            );
            Stmt::Decl(decl).emit(opts, &mut src, INDENT);
        }
        for arr in inp.arrays() {
            Stmt::Decl(DeclStmt::new(Data::Array(Rc::clone(arr)))).emit(opts, &mut src, INDENT);
        }
        for arr in inp.arrays() {
            self.render_array_init(opts, lay, arr, &mut src);
        }
        src.push('\n');

        // Outputs start at zero.
        for var in out_tab.vars() {
            let decl = DeclStmt::with_init(
                Data::Scalar(Rc::clone(var)),
                Expr::constant(IRValue::zero(var.ty.id)),
            );
            Stmt::Decl(decl).emit(opts, &mut src, INDENT);
        }
        src.push('\n');

        prelude.emit(opts, &mut src, INDENT);
        src.push('\n');
        loop_seq.emit(opts, &mut src, INDENT);
        src.push('\n');

        // Checksum fold.
        let ull = type_name(IntTypeId::ULLong, lay, opts.standard);
        src.push_str(&format!("{INDENT}{ull} hash = 1;\n"));
        for var in out_tab.vars() {
            src.push_str(&format!(
                "{INDENT}hash = hash * 31 + (({ull}) {});\n",
                var.name
            ));
        }
        match opts.standard {
            StandardKind::Cxx | StandardKind::Sycl => {
                src.push_str(&format!("{INDENT}printf(\"%llu\\n\", hash);\n"));
                src.push_str(&format!("{INDENT}return 0;\n"));
            }
            StandardKind::Ispc => {
                src.push_str(&format!("{INDENT}print(\"%\\n\", hash);\n"));
            }
        }
        src.push_str("}\n");
        src
    }

    fn render_prologue(&self, opts: &Options, _lay: TypeLayout, src: &mut String) {
        match opts.standard {
            StandardKind::Cxx => {
                src.push_str("#include <cstdio>\n\n");
            }
            StandardKind::Sycl => {
                // Generated computation runs on the host side of a SYCL
                // translation unit; the include keeps the TU honest.
                src.push_str("#include <sycl/sycl.hpp>\n#include <cstdio>\n\n");
            }
            StandardKind::Ispc => {
                src.push('\n');
            }
        }
    }

    /// Every essence writes the same value to every element (the symbolic
    /// summary must cover all of them); what varies is the shape of the
    /// initialization code the compiler under test has to chew through.
    fn render_array_init(
        &self,
        opts: &Options,
        lay: TypeLayout,
        arr: &Rc<ArrayData>,
        src: &mut String,
    ) {
        let dim = arr.ty.dims[0];
        let name = &arr.name;
        let init = Expr::constant(arr.init_val).emit_to_string(opts);
        let ity = type_name(IntTypeId::Int, lay, opts.standard);
        match arr.essence {
            ArrayEssence::UniformConst => {
                src.push_str(&format!(
                    "{INDENT}for ({ity} i = 0; i < {dim}; i += 1) {name}[i] = {init};\n"
                ));
            }
            ArrayEssence::VectorLike => {
                let half = dim / 2;
                src.push_str(&format!(
                    "{INDENT}for ({ity} i = 0; i < {half}; i += 1) {name}[i] = {init};\n"
                ));
                src.push_str(&format!(
                    "{INDENT}for ({ity} i = {half}; i < {dim}; i += 1) {name}[i] = {init};\n"
                ));
            }
            ArrayEssence::MixedLike => {
                src.push_str(&format!(
                    "{INDENT}for ({ity} i = 0; i < {dim}; i += 2) {name}[i] = {init};\n"
                ));
                src.push_str(&format!(
                    "{INDENT}for ({ity} i = 1; i < {dim}; i += 2) {name}[i] = {init};\n"
                ));
            }
            ArrayEssence::StepLike => {
                src.push_str(&format!(
                    "{INDENT}for ({ity} i = {last}; i >= 0; i -= 1) {name}[i] = {init};\n",
                    last = dim as i64 - 1
                ));
            }
            ArrayEssence::RandomLike => {
                let base = type_name(arr.base_id(), lay, opts.standard);
                src.push_str(&format!("{INDENT}{{\n{INDENT}{INDENT}{base} fill = {init};\n"));
                src.push_str(&format!(
                    "{INDENT}{INDENT}for ({ity} i = 0; i < {dim}; i += 1) {name}[i] = fill;\n"
                ));
                src.push_str(&format!("{INDENT}}}\n"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        let generator = ProgramGenerator::new(Options::default());
        let a = generator.generate(20260802).unwrap();
        let b = generator.generate(20260802).unwrap();
        assert_eq!(a.source, b.source);

        let c = generator.generate(20260803).unwrap();
        assert_ne!(a.source, c.source);
    }

    #[test]
    fn cxx_program_shape() {
        let generator = ProgramGenerator::new(Options::default());
        let prog = generator.generate(7).unwrap();
        let src = &prog.source;
        assert!(src.contains("#include <cstdio>"));
        assert!(src.contains("int main() {"));
        assert!(src.contains("printf(\"%llu\\n\", hash);"));
        assert!(src.contains("hash = hash * 31 + "));
        assert!(src.contains("for (int i_0 = 0; i_0 < "));
        // Balanced braces are a cheap syntactic sanity check.
        assert_eq!(
            src.matches('{').count(),
            src.matches('}').count(),
            "unbalanced braces in:\n{src}"
        );
    }

    #[test]
    fn ispc_program_uses_export_and_print() {
        let opts = Options {
            standard: StandardKind::Ispc,
            ..Options::default()
        };
        let prog = ProgramGenerator::new(opts).generate(7).unwrap();
        assert!(prog.source.contains("export void test() {"));
        assert!(prog.source.contains("print(\"%\\n\", hash);"));
        assert!(!prog.source.contains("#include <cstdio>"));
    }

    #[test]
    fn sycl_program_includes_header() {
        let opts = Options {
            standard: StandardKind::Sycl,
            ..Options::default()
        };
        let prog = ProgramGenerator::new(opts).generate(7).unwrap();
        assert!(prog.source.contains("#include <sycl/sycl.hpp>"));
        assert!(prog.source.contains("int main() {"));
    }

    #[test]
    fn ilp32_layout_generates_too() {
        let opts = Options {
            int64_mode: false,
            ..Options::default()
        };
        let prog = ProgramGenerator::new(opts).generate(99).unwrap();
        assert!(prog.source.contains("int main() {"));
    }
}
