//! Injected randomness.
//!
//! The core never touches an RNG directly: every random decision flows
//! through [`RandomPolicy`], so a seed fully determines the emitted program
//! and tests can substitute scripted policies. [`GenPolicy`] holds the
//! weighted distributions that shape generation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::ArrayEssence;
use crate::expr::{BinaryOp, UnaryOp};
use crate::types::IntTypeId;

/// Source of random decisions.
pub trait RandomPolicy {
    /// A uniform draw from the inclusive range `[lo, hi]`.
    fn uniform(&mut self, lo: u64, hi: u64) -> u64;

    /// A weighted draw: returns an index into `weights` with probability
    /// proportional to its weight. The table must be non-empty and carry at
    /// least one non-zero weight.
    fn roll(&mut self, weights: &[u32]) -> usize;
}

/// Weighted choice over an `(item, weight)` table.
pub fn choose<T: Copy>(policy: &mut dyn RandomPolicy, table: &[(T, u32)]) -> T {
    let weights: Vec<u32> = table.iter().map(|&(_, w)| w).collect();
    table[policy.roll(&weights)].0
}

/// The production policy: a seeded PRNG.
///
/// Identical seeds produce identical decision streams, which is the
/// determinism guarantee the whole tool rests on.
pub struct SeededPolicy {
    rng: StdRng,
}

impl SeededPolicy {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomPolicy for SeededPolicy {
    fn uniform(&mut self, lo: u64, hi: u64) -> u64 {
        debug_assert!(lo <= hi);
        self.rng.gen_range(lo..=hi)
    }

    fn roll(&mut self, weights: &[u32]) -> usize {
        let total: u64 = weights.iter().map(|&w| u64::from(w)).sum();
        debug_assert!(total > 0, "weight table must not be all-zero");
        let mut ticket = self.rng.gen_range(0..total);
        for (i, &w) in weights.iter().enumerate() {
            let w = u64::from(w);
            if ticket < w {
                return i;
            }
            ticket -= w;
        }
        weights.len() - 1
    }
}

/// What a leaf position in a generated tree becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Constant,
    ScalarUse,
    Subscript,
}

/// What an interior position in a generated tree becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Unary,
    Binary,
    Cast,
}

/// Distributions shaping generated programs.
///
/// Weights are relative; they do not need to sum to anything particular.
#[derive(Debug, Clone)]
pub struct GenPolicy {
    pub unary_op_distr: Vec<(UnaryOp, u32)>,
    pub binary_op_distr: Vec<(BinaryOp, u32)>,
    pub scalar_type_distr: Vec<(IntTypeId, u32)>,
    pub essence_distr: Vec<(ArrayEssence, u32)>,
    pub leaf_distr: Vec<(LeafKind, u32)>,
    pub node_distr: Vec<(NodeKind, u32)>,
    /// Percent chance an interior position stops early and emits a leaf.
    pub early_leaf_pct: u32,
    /// Bounds on input scalar count.
    pub inp_vars: (u64, u64),
    /// Bounds on input array count.
    pub inp_arrays: (u64, u64),
    /// Bounds on statements per loop body.
    pub stmts_per_loop: (u64, u64),
    /// Bounds on the shared array dimension (also the loop trip count).
    pub array_dim: (u64, u64),
}

impl Default for GenPolicy {
    fn default() -> Self {
        Self {
            unary_op_distr: vec![
                (UnaryOp::Plus, 10),
                (UnaryOp::Negate, 25),
                (UnaryOp::LogNot, 15),
                (UnaryOp::BitNot, 20),
            ],
            binary_op_distr: vec![
                (BinaryOp::Add, 30),
                (BinaryOp::Sub, 25),
                (BinaryOp::Mul, 20),
                (BinaryOp::Div, 10),
                (BinaryOp::Mod, 10),
                (BinaryOp::Lt, 5),
                (BinaryOp::Gt, 5),
                (BinaryOp::Le, 5),
                (BinaryOp::Ge, 5),
                (BinaryOp::Eq, 5),
                (BinaryOp::Ne, 5),
                (BinaryOp::LogAnd, 5),
                (BinaryOp::LogOr, 5),
                (BinaryOp::BitAnd, 10),
                (BinaryOp::BitOr, 10),
                (BinaryOp::BitXor, 10),
                (BinaryOp::Shl, 8),
                (BinaryOp::Shr, 8),
            ],
            scalar_type_distr: vec![
                (IntTypeId::Bool, 5),
                (IntTypeId::Char, 10),
                (IntTypeId::UChar, 10),
                (IntTypeId::Short, 10),
                (IntTypeId::UShort, 10),
                (IntTypeId::Int, 25),
                (IntTypeId::UInt, 20),
                (IntTypeId::Long, 10),
                (IntTypeId::ULong, 10),
                (IntTypeId::LLong, 10),
                (IntTypeId::ULLong, 10),
            ],
            essence_distr: vec![
                (ArrayEssence::UniformConst, 30),
                (ArrayEssence::VectorLike, 20),
                (ArrayEssence::MixedLike, 15),
                (ArrayEssence::StepLike, 15),
                (ArrayEssence::RandomLike, 20),
            ],
            leaf_distr: vec![
                (LeafKind::Constant, 30),
                (LeafKind::ScalarUse, 50),
                (LeafKind::Subscript, 20),
            ],
            node_distr: vec![
                (NodeKind::Unary, 20),
                (NodeKind::Binary, 70),
                (NodeKind::Cast, 10),
            ],
            early_leaf_pct: 25,
            inp_vars: (4, 8),
            inp_arrays: (1, 3),
            stmts_per_loop: (2, 6),
            array_dim: (8, 64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_seeds_identical_streams() {
        let mut a = SeededPolicy::from_seed(0xDEAD_BEEF);
        let mut b = SeededPolicy::from_seed(0xDEAD_BEEF);
        for _ in 0..256 {
            assert_eq!(a.uniform(0, 1000), b.uniform(0, 1000));
        }
    }

    #[test]
    fn uniform_respects_bounds() {
        let mut p = SeededPolicy::from_seed(7);
        for _ in 0..1000 {
            let v = p.uniform(3, 9);
            assert!((3..=9).contains(&v));
        }
    }

    #[test]
    fn roll_never_picks_zero_weight() {
        let mut p = SeededPolicy::from_seed(42);
        for _ in 0..1000 {
            let i = p.roll(&[0, 5, 0, 7]);
            assert!(i == 1 || i == 3);
        }
    }

    #[test]
    fn choose_is_deterministic_for_a_seed() {
        let table = [("a", 1), ("b", 2), ("c", 3)];
        let picks1: Vec<_> = {
            let mut p = SeededPolicy::from_seed(99);
            (0..32).map(|_| choose(&mut p, &table)).collect()
        };
        let picks2: Vec<_> = {
            let mut p = SeededPolicy::from_seed(99);
            (0..32).map(|_| choose(&mut p, &table)).collect()
        };
        assert_eq!(picks1, picks2);
    }
}
