//! Generator error types.
//!
//! Every error in this module is an *invariant violation*: a bug in the
//! generator itself, never a property of a particular seed. Detected UB is
//! not an error — it is carried inside [`crate::value::IRValue`] and repaired
//! by the rebuild pass. The CLI treats any `Error` as fatal.

use thiserror::Error;

use crate::expr::IrNodeKind;
use crate::types::IntTypeId;

/// A fatal generator invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A binary operator was handed operands of different types. The caller
    /// is responsible for running the conversion pass first.
    #[error("operand type mismatch for `{op}`: {lhs:?} vs {rhs:?}")]
    OperandMismatch {
        op: &'static str,
        lhs: IntTypeId,
        rhs: IntTypeId,
    },

    /// An operation that only works on scalar values received an array or
    /// iterator result.
    #[error("expected a scalar operand for `{op}`, found {found}")]
    NonScalarOperand { op: &'static str, found: &'static str },

    /// The rebuild loop failed to reach a UB-free state within its budget.
    /// The rewrite tables guarantee convergence, so this is a bug.
    #[error("rebuild did not converge after {budget} attempts")]
    RebuildBudget { budget: u32 },

    /// Assignment between incompatible types.
    #[error("cannot assign {from:?} to {to:?}")]
    AssignMismatch { to: IntTypeId, from: IntTypeId },

    /// Assignment target is not a use expression.
    #[error("bad assignment target: {kind:?}")]
    BadAssignTarget { kind: IrNodeKind },

    /// Subscript applied to something that is not an array.
    #[error("subscript base is not an array")]
    SubscriptBase,

    /// Subscript nesting exceeds the array's dimension count.
    #[error("dimension {dim} out of range for array `{name}`")]
    DimOutOfRange { dim: usize, name: String },

    /// A factory needed a symbol of some class and the table had none.
    #[error("symbol table has no {what}")]
    EmptySymbolTable { what: &'static str },

    /// Catch-all for a type-propagation step that cannot make progress.
    #[error("type propagation failed: {reason}")]
    Propagation { reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
