//! Symbolic variables.
//!
//! A `Sym<V>` is either a regular variable or an opaque symbolic function
//! Starling cannot interpret but must still be able to substitute through,
//! the same role uninterpreted applications play in other term
//! representations.

use std::fmt;

use crate::expr::Expr;

/// Either a plain variable or a named symbolic function applied to
/// expressions over the same variable type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Sym<V> {
    Reg(V),
    Sym(String, Vec<Expr<Sym<V>>>),
}

impl<V> Sym<V> {
    pub fn reg(v: V) -> Self {
        Sym::Reg(v)
    }

    pub fn sym(name: impl Into<String>, args: Vec<Expr<Sym<V>>>) -> Self {
        Sym::Sym(name.into(), args)
    }

    /// The underlying regular variable, if this is not a symbolic function.
    pub fn as_reg(&self) -> Option<&V> {
        match self {
            Sym::Reg(v) => Some(v),
            Sym::Sym(..) => None,
        }
    }
}

impl<V: fmt::Display> fmt::Display for Sym<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sym::Reg(v) => write!(f, "{}", v),
            Sym::Sym(name, args) => {
                write!(f, "{}(", name)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
        }
    }
}
