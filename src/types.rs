//! Integer and array type descriptors.
//!
//! The generator models the target language's integer types with a closed set
//! of kinds ([`IntTypeId`]). Widths are not fixed: [`TypeLayout`] resolves
//! them under the active [`Options`](crate::options::Options), so the same
//! kind set describes both an LP64 target (`long` is 64 bits) and an ILP32
//! one (`long == int`). Descriptor instances are interned — a
//! [`TypeRegistry`] hands out at most one [`IntType`] per kind and one
//! [`ArrayType`] per distinct (base, dims) pair.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::options::{Options, StandardKind};

// ============================================================
// Type kinds
// ============================================================

/// Integer type kinds, ordered by conversion rank.
///
/// The derived `Ord` is the rank order the conversion rules compare with;
/// it must match the declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum IntTypeId {
    Bool,
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LLong,
    ULLong,
}

impl IntTypeId {
    /// All kinds, in rank order.
    pub const ALL: [IntTypeId; 11] = [
        IntTypeId::Bool,
        IntTypeId::Char,
        IntTypeId::UChar,
        IntTypeId::Short,
        IntTypeId::UShort,
        IntTypeId::Int,
        IntTypeId::UInt,
        IntTypeId::Long,
        IntTypeId::ULong,
        IntTypeId::LLong,
        IntTypeId::ULLong,
    ];

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            IntTypeId::Char | IntTypeId::Short | IntTypeId::Int | IntTypeId::Long | IntTypeId::LLong
        )
    }

    /// The unsigned kind of the same rank. `Bool` has no counterpart and
    /// maps to itself; unsigned kinds map to themselves.
    pub fn to_unsigned(self) -> IntTypeId {
        match self {
            IntTypeId::Char => IntTypeId::UChar,
            IntTypeId::Short => IntTypeId::UShort,
            IntTypeId::Int => IntTypeId::UInt,
            IntTypeId::Long => IntTypeId::ULong,
            IntTypeId::LLong => IntTypeId::ULLong,
            other => other,
        }
    }

    /// Literal suffix for constants of this kind. Sub-`int` kinds have no
    /// suffix of their own; their constants only appear behind casts.
    pub fn literal_suffix(self) -> &'static str {
        match self {
            IntTypeId::UInt => "U",
            IntTypeId::Long => "L",
            IntTypeId::ULong => "UL",
            IntTypeId::LLong => "LL",
            IntTypeId::ULLong => "ULL",
            _ => "",
        }
    }
}

// ============================================================
// Layout resolution
// ============================================================

/// Resolves kind widths under the active options.
///
/// Cheap to copy; every [`IRValue`](crate::value::IRValue) operation takes
/// one so the semantics layer never reaches for ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeLayout {
    /// `long`/`unsigned long` are 64 bits wide; otherwise 32.
    pub long_is_64: bool,
}

impl TypeLayout {
    pub fn new(opts: &Options) -> Self {
        Self {
            long_is_64: opts.int64_mode,
        }
    }

    /// Bit width of a kind.
    pub fn width(self, id: IntTypeId) -> u32 {
        match id {
            IntTypeId::Bool => 1,
            IntTypeId::Char | IntTypeId::UChar => 8,
            IntTypeId::Short | IntTypeId::UShort => 16,
            IntTypeId::Int | IntTypeId::UInt => 32,
            IntTypeId::Long | IntTypeId::ULong => {
                if self.long_is_64 {
                    64
                } else {
                    32
                }
            }
            IntTypeId::LLong | IntTypeId::ULLong => 64,
        }
    }

    /// Smallest representable value.
    pub fn min(self, id: IntTypeId) -> i128 {
        if id.is_signed() {
            -(1i128 << (self.width(id) - 1))
        } else {
            0
        }
    }

    /// Largest representable value.
    pub fn max(self, id: IntTypeId) -> i128 {
        if id.is_signed() {
            (1i128 << (self.width(id) - 1)) - 1
        } else {
            (1i128 << self.width(id)) - 1
        }
    }

    /// Whether signed kind `a` can represent every value of kind `b`.
    pub fn can_represent(self, a: IntTypeId, b: IntTypeId) -> bool {
        self.min(a) <= self.min(b) && self.max(a) >= self.max(b)
    }
}

// ============================================================
// Interned descriptors
// ============================================================

/// Source spelling of a kind without going through the registry. Emission
/// only needs the id plus the layout.
pub fn type_name(id: IntTypeId, lay: TypeLayout, standard: StandardKind) -> &'static str {
    match standard {
        StandardKind::Cxx | StandardKind::Sycl => match id {
            IntTypeId::Bool => "bool",
            IntTypeId::Char => "signed char",
            IntTypeId::UChar => "unsigned char",
            IntTypeId::Short => "short",
            IntTypeId::UShort => "unsigned short",
            IntTypeId::Int => "int",
            IntTypeId::UInt => "unsigned int",
            IntTypeId::Long => "long",
            IntTypeId::ULong => "unsigned long",
            IntTypeId::LLong => "long long",
            IntTypeId::ULLong => "unsigned long long",
        },
        StandardKind::Ispc => match (id, lay.width(id)) {
            (IntTypeId::Bool, _) => "bool",
            (IntTypeId::Char, _) => "int8",
            (IntTypeId::UChar, _) => "unsigned int8",
            (IntTypeId::Short, _) => "int16",
            (IntTypeId::UShort, _) => "unsigned int16",
            (IntTypeId::Int, _) => "int32",
            (IntTypeId::UInt, _) => "unsigned int32",
            (IntTypeId::Long, 64) | (IntTypeId::LLong, _) => "int64",
            (IntTypeId::Long, _) => "int32",
            (IntTypeId::ULong, 64) | (IntTypeId::ULLong, _) => "unsigned int64",
            (IntTypeId::ULong, _) => "unsigned int32",
        },
    }
}

/// An interned integer type descriptor.
///
/// Immutable; obtain through [`TypeRegistry::int_type`] so that equal kinds
/// share one instance.
#[derive(Debug, PartialEq, Eq)]
pub struct IntType {
    pub id: IntTypeId,
    pub bit_size: u32,
    pub is_signed: bool,
    pub min: i128,
    pub max: i128,
}

impl IntType {
    /// Source spelling of this type under the given standard.
    pub fn name(&self, standard: StandardKind) -> &'static str {
        let lay = TypeLayout {
            long_is_64: self.bit_size == 64,
        };
        type_name(self.id, lay, standard)
    }

    pub fn literal_suffix(&self) -> &'static str {
        self.id.literal_suffix()
    }
}

impl fmt::Display for IntType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name(StandardKind::Cxx))
    }
}

/// An interned array type descriptor: a base kind and its dimension sizes.
#[derive(Debug, PartialEq, Eq)]
pub struct ArrayType {
    pub base: Rc<IntType>,
    pub dims: Vec<u64>,
}

impl ArrayType {
    pub fn total_elems(&self) -> u64 {
        self.dims.iter().product()
    }
}

/// Canonicalizing registry for type descriptors.
///
/// One registry per generation session; nothing here is process-wide.
/// Append-only during a run, so plain interior mutability suffices.
pub struct TypeRegistry {
    layout: TypeLayout,
    ints: RefCell<FxHashMap<IntTypeId, Rc<IntType>>>,
    arrays: RefCell<FxHashMap<(IntTypeId, Vec<u64>), Rc<ArrayType>>>,
}

impl TypeRegistry {
    pub fn new(layout: TypeLayout) -> Self {
        Self {
            layout,
            ints: RefCell::new(FxHashMap::default()),
            arrays: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn layout(&self) -> TypeLayout {
        self.layout
    }

    /// The canonical descriptor for a kind.
    pub fn int_type(&self, id: IntTypeId) -> Rc<IntType> {
        if let Some(existing) = self.ints.borrow().get(&id) {
            return Rc::clone(existing);
        }
        let lay = self.layout;
        let ty = Rc::new(IntType {
            id,
            bit_size: lay.width(id),
            is_signed: id.is_signed(),
            min: lay.min(id),
            max: lay.max(id),
        });
        self.ints.borrow_mut().insert(id, Rc::clone(&ty));
        ty
    }

    /// The canonical descriptor for an array shape.
    pub fn array_type(&self, base: IntTypeId, dims: &[u64]) -> Rc<ArrayType> {
        let key = (base, dims.to_vec());
        if let Some(existing) = self.arrays.borrow().get(&key) {
            return Rc::clone(existing);
        }
        let ty = Rc::new(ArrayType {
            base: self.int_type(base),
            dims: dims.to_vec(),
        });
        self.arrays.borrow_mut().insert(key, Rc::clone(&ty));
        ty
    }
}
