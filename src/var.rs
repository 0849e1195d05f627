//! Variables and the marking discipline used to thread them through a
//! command's composition stages.

use std::fmt;

/// The base type of a variable's slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Type {
    Int,
    Bool,
    /// A fixed-length array of `eltType`.
    Array(Box<Type>, usize),
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Array(elt, len) => write!(f, "{}[{}]", elt, len),
        }
    }
}

/// A named slot with a base type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Variable {
            name: name.into(),
            ty,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A variable tagged by its role in a command's two-state encoding.
///
/// Every `MarkedVar` refers back to exactly one `Variable`; the marker never
/// changes the variable's name or type, only how `Display`/substitution
/// distinguish its occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MarkedVar {
    Unmarked(Variable),
    Before(Variable),
    After(Variable),
    Intermediate(u32, Variable),
    Goal(u32, Variable),
}

impl MarkedVar {
    /// The underlying `Variable`, regardless of marker.
    pub fn var(&self) -> &Variable {
        match self {
            MarkedVar::Unmarked(v)
            | MarkedVar::Before(v)
            | MarkedVar::After(v)
            | MarkedVar::Intermediate(_, v)
            | MarkedVar::Goal(_, v) => v,
        }
    }

    pub fn before(v: Variable) -> Self {
        MarkedVar::Before(v)
    }

    pub fn after(v: Variable) -> Self {
        MarkedVar::After(v)
    }

    pub fn intermediate(stage: u32, v: Variable) -> Self {
        MarkedVar::Intermediate(stage, v)
    }

    pub fn goal(n: u32, v: Variable) -> Self {
        MarkedVar::Goal(n, v)
    }
}

impl fmt::Display for MarkedVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkedVar::Unmarked(v) => write!(f, "{}", v),
            MarkedVar::Before(v) => write!(f, "{}!before", v),
            MarkedVar::After(v) => write!(f, "{}!after", v),
            MarkedVar::Intermediate(n, v) => write!(f, "{}!{}", v, n),
            MarkedVar::Goal(n, v) => write!(f, "{}!goal{}", v, n),
        }
    }
}
