use crate::alloc::Vec;

/// An opaque symbol standing for a size or stride that is only known at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);
impl Symbol {
    /// Create a new symbol with the given id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The id of the symbol.
    pub const fn id(self) -> u32 {
        self.0
    }
}
impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// A size, stride or offset value that may be symbolic.
///
/// Tensors traced with dynamic shapes carry symbols instead of concrete integers in their sizes and strides.
/// Shape inference passes them through untouched, so a meta tensor derived from a symbolic tensor keeps the very same
/// symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymInt {
    /// A concrete value.
    Int(i64),
    /// A symbolic value.
    Symbolic {
        /// The symbol this value stands for.
        symbol: Symbol,
        /// A concrete value observed for the symbol when it was created, if any.
        hint: Option<i64>,
    },
}
impl SymInt {
    /// Create a concrete value.
    pub const fn new(value: i64) -> Self {
        SymInt::Int(value)
    }

    /// Create a symbolic value.
    pub const fn symbolic(symbol: Symbol, hint: Option<i64>) -> Self {
        SymInt::Symbolic { symbol, hint }
    }

    /// The concrete value, or `None` if the value is symbolic.
    pub const fn maybe_as_int(&self) -> Option<i64> {
        match self {
            SymInt::Int(v) => Some(*v),
            SymInt::Symbolic { .. } => None,
        }
    }

    /// Whether the value is symbolic.
    pub const fn is_symbolic(&self) -> bool {
        matches!(self, SymInt::Symbolic { .. })
    }

    /// The concrete value, falling back to the hint of a symbolic value.
    pub const fn hint(&self) -> Option<i64> {
        match self {
            SymInt::Int(v) => Some(*v),
            SymInt::Symbolic { hint, .. } => *hint,
        }
    }
}
impl From<i64> for SymInt {
    fn from(value: i64) -> Self {
        SymInt::Int(value)
    }
}
impl PartialEq<i64> for SymInt {
    fn eq(&self, other: &i64) -> bool {
        self.maybe_as_int() == Some(*other)
    }
}
impl std::fmt::Display for SymInt {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SymInt::Int(v) => write!(f, "{v}"),
            SymInt::Symbolic { symbol, .. } => write!(f, "{symbol}"),
        }
    }
}

/// Convert a list of possibly symbolic values to concrete ones, or `None` if any of them is symbolic.
pub(crate) fn as_concrete(values: &[SymInt]) -> Option<Vec<i64>> {
    values.iter().map(SymInt::maybe_as_int).collect()
}

/// Convert concrete values to [`SymInt`]s.
pub(crate) fn from_concrete(values: &[i64]) -> Vec<SymInt> {
    values.iter().copied().map(SymInt::Int).collect()
}
