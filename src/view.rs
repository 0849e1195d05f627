//! Guarded views.
//!
//! `GView` is modeled as a `Vec`, not a `HashSet`: duplicate instances
//! matter because views form separation-style conjunctions, and multiset
//! union must be order-independent only up to which elements and how many
//! of each are present, never silently deduplicating. A `HashSet` doesn't
//! preserve insertion order or duplicates, so we track both explicitly.

use std::fmt;

use crate::expr::{BoolExpr, Expr};
use crate::var::Type;

/// A named, ordered-parameter function (e.g. a view instantiation or a
/// primitive call).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Func<T> {
    pub name: String,
    pub params: Vec<T>,
}

impl<T> Func<T> {
    pub fn new(name: impl Into<String>, params: Vec<T>) -> Self {
        Func {
            name: name.into(),
            params,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Func<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ")")
    }
}

/// An item that holds only when `cond` is true.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Guarded<V, I> {
    pub cond: BoolExpr<V>,
    pub item: I,
}

impl<V, I> Guarded<V, I> {
    pub fn new(cond: BoolExpr<V>, item: I) -> Self {
        Guarded { cond, item }
    }

    pub fn map_item<J>(self, f: impl FnOnce(I) -> J) -> Guarded<V, J> {
        Guarded {
            cond: self.cond,
            item: f(self.item),
        }
    }
}

pub type GFunc<V> = Guarded<V, Func<Expr<V>>>;

/// A multiset of guarded view instantiations. Backed by a `Vec` so that
/// duplicate instances (the same func/guard pair appearing twice) are
/// preserved.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct GView<V>(pub Vec<GFunc<V>>);

impl<V> GView<V> {
    pub fn empty() -> Self {
        GView(Vec::new())
    }

    pub fn single(g: GFunc<V>) -> Self {
        GView(vec![g])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GFunc<V>> {
        self.0.iter()
    }

    /// Order-independent multiset union: appends `other`'s elements,
    /// preserving every duplicate.
    pub fn join(mut self, mut other: GView<V>) -> GView<V> {
        self.0.append(&mut other.0);
        self
    }

    pub fn push(&mut self, g: GFunc<V>) {
        self.0.push(g);
    }

    /// Maps every func in the view, keeping guards untouched. Used by
    /// position-aware substitution.
    pub fn map<W>(self, mut f: impl FnMut(GFunc<V>) -> GFunc<W>) -> GView<W> {
        GView(self.0.into_iter().map(&mut f).collect())
    }

    /// Drops every guarded func whose condition `simp`s to `Lit(false)`,
    /// where `V: Clone + PartialEq` so `simp` can run.
    pub fn prune(self) -> GView<V>
    where
        V: Clone + PartialEq,
    {
        GView(
            self.0
                .into_iter()
                .filter(|g| crate::expr::simp(&g.cond) != BoolExpr::Lit(false))
                .collect(),
        )
    }
}

impl<V> IntoIterator for GView<V> {
    type Item = GFunc<V>;
    type IntoIter = std::vec::IntoIter<GFunc<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<V> FromIterator<GFunc<V>> for GView<V> {
    fn from_iter<T: IntoIterator<Item = GFunc<V>>>(iter: T) -> Self {
        GView(iter.into_iter().collect())
    }
}

impl<V: fmt::Display> fmt::Display for GView<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{| ")?;
        for (i, g) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " * ")?;
            }
            write!(f, "[{}] {}", g.cond, g.item)?;
        }
        write!(f, " |}}")
    }
}

/// A named, typed view shape.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ViewProto {
    pub name: String,
    pub params: Vec<(Type, String)>,
    pub is_anonymous: bool,
    /// An iterated view's iterator-count parameter, if any.
    pub iterator: Option<String>,
}

impl ViewProto {
    pub fn new(name: impl Into<String>, params: Vec<(Type, String)>) -> Self {
        ViewProto {
            name: name.into(),
            params,
            is_anonymous: false,
            iterator: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_preserves_duplicates() {
        let f = Func::new("p", vec![]);
        let g: GFunc<String> = Guarded::new(BoolExpr::Lit(true), f.clone());
        let a = GView::single(g.clone());
        let b = GView::single(g);
        let joined = a.join(b);
        assert_eq!(joined.len(), 2);
    }

    #[test]
    fn prune_drops_unreachable_funcs() {
        let f = Func::new("p", vec![]);
        let g: GFunc<String> = Guarded::new(BoolExpr::Lit(false), f);
        let v = GView::single(g);
        assert!(v.prune().is_empty());
    }
}
