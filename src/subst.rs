//! Position-aware substitution.
//!
//! Substitutions carry a `SubCtx` recording which side of an
//! over-/under-approximation pair applies at a given point: positive
//! position uses the overapproximation, negative the underapproximation.
//! Modeled as an explicit visitor, `(ctx, node) -> node'`, rather than an
//! overloaded generic traversal.

use crate::expr::{ArrayExpr, BoolExpr, Expr, IntExpr};
use crate::view::{GView, Guarded};

/// Sign of the current position relative to the root of a Boolean formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
}

impl Sign {
    pub fn flip(self) -> Sign {
        match self {
            Sign::Positive => Sign::Negative,
            Sign::Negative => Sign::Positive,
        }
    }
}

/// A position context threaded through a substitution traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubCtx {
    pub sign: Sign,
}

impl SubCtx {
    pub fn root() -> Self {
        SubCtx {
            sign: Sign::Positive,
        }
    }

    pub fn flipped(self) -> Self {
        SubCtx {
            sign: self.sign.flip(),
        }
    }
}

/// Something that can be substituted through while tracking position.
/// Implementors decide, per node kind, whether the sign flips (negation,
/// an implication's antecedent) or holds (comparison operands, equalities,
/// an implication's consequent).
pub trait PositionAware<V> {
    /// Replace every variable occurrence using `f`, which receives the
    /// current `SubCtx` alongside the variable.
    fn substitute(&self, ctx: SubCtx, f: &mut dyn FnMut(SubCtx, &V) -> Expr<V>) -> Self;
}

impl<V: Clone> PositionAware<V> for BoolExpr<V> {
    fn substitute(&self, ctx: SubCtx, f: &mut dyn FnMut(SubCtx, &V) -> Expr<V>) -> Self {
        match self {
            BoolExpr::Var(v) => match f(ctx, v) {
                Expr::Bool(b) => b,
                other => panic!(
                    "substitution replaced a Bool variable with {:?}",
                    as_kind(&other)
                ),
            },
            BoolExpr::Lit(b) => BoolExpr::Lit(*b),
            BoolExpr::And(xs) => BoolExpr::And(xs.iter().map(|x| x.substitute(ctx, f)).collect()),
            BoolExpr::Or(xs) => BoolExpr::Or(xs.iter().map(|x| x.substitute(ctx, f)).collect()),
            BoolExpr::Not(a) => BoolExpr::Not(Box::new(a.substitute(ctx.flipped(), f))),
            BoolExpr::Implies(a, b) => BoolExpr::Implies(
                Box::new(a.substitute(ctx.flipped(), f)),
                Box::new(b.substitute(ctx, f)),
            ),
            BoolExpr::EqBool(a, b) => BoolExpr::EqBool(
                Box::new(a.substitute(ctx, f)),
                Box::new(b.substitute(ctx, f)),
            ),
            BoolExpr::EqInt(a, b) => BoolExpr::EqInt(
                Box::new(a.substitute(ctx, f)),
                Box::new(b.substitute(ctx, f)),
            ),
            BoolExpr::EqArray(a, b) => BoolExpr::EqArray(
                Box::new(a.substitute(ctx, f)),
                Box::new(b.substitute(ctx, f)),
            ),
            BoolExpr::Gt(a, b) => BoolExpr::Gt(
                Box::new(a.substitute(ctx, f)),
                Box::new(b.substitute(ctx, f)),
            ),
            BoolExpr::Ge(a, b) => BoolExpr::Ge(
                Box::new(a.substitute(ctx, f)),
                Box::new(b.substitute(ctx, f)),
            ),
            BoolExpr::Le(a, b) => BoolExpr::Le(
                Box::new(a.substitute(ctx, f)),
                Box::new(b.substitute(ctx, f)),
            ),
            BoolExpr::Lt(a, b) => BoolExpr::Lt(
                Box::new(a.substitute(ctx, f)),
                Box::new(b.substitute(ctx, f)),
            ),
            BoolExpr::Idx(arr, idx) => BoolExpr::Idx(
                Box::new(arr.substitute(ctx, f)),
                Box::new(idx.substitute(ctx, f)),
            ),
        }
    }
}

impl<V: Clone> PositionAware<V> for IntExpr<V> {
    fn substitute(&self, ctx: SubCtx, f: &mut dyn FnMut(SubCtx, &V) -> Expr<V>) -> Self {
        match self {
            IntExpr::Var(v) => match f(ctx, v) {
                Expr::Int(i) => i,
                other => panic!(
                    "substitution replaced an Int variable with {:?}",
                    as_kind(&other)
                ),
            },
            IntExpr::Lit(n) => IntExpr::Lit(*n),
            IntExpr::Add(xs) => IntExpr::Add(xs.iter().map(|x| x.substitute(ctx, f)).collect()),
            IntExpr::Mul(xs) => IntExpr::Mul(xs.iter().map(|x| x.substitute(ctx, f)).collect()),
            IntExpr::Sub(a, b) => IntExpr::Sub(
                Box::new(a.substitute(ctx, f)),
                Box::new(b.substitute(ctx, f)),
            ),
            IntExpr::Div(a, b) => IntExpr::Div(
                Box::new(a.substitute(ctx, f)),
                Box::new(b.substitute(ctx, f)),
            ),
            IntExpr::Idx(arr, idx) => IntExpr::Idx(
                Box::new(arr.substitute(ctx, f)),
                Box::new(idx.substitute(ctx, f)),
            ),
        }
    }
}

impl<V: Clone> PositionAware<V> for ArrayExpr<V> {
    fn substitute(&self, ctx: SubCtx, f: &mut dyn FnMut(SubCtx, &V) -> Expr<V>) -> Self {
        match self {
            ArrayExpr::Var(v) => match f(ctx, v) {
                Expr::Array(_, _, a) => a,
                other => panic!(
                    "substitution replaced an Array variable with {:?}",
                    as_kind(&other)
                ),
            },
            ArrayExpr::Upd(arr, idx, val) => ArrayExpr::Upd(
                Box::new(arr.substitute(ctx, f)),
                Box::new(idx.substitute(ctx, f)),
                Box::new(val.substitute(ctx, f)),
            ),
        }
    }
}

impl<V: Clone> PositionAware<V> for Expr<V> {
    fn substitute(&self, ctx: SubCtx, f: &mut dyn FnMut(SubCtx, &V) -> Expr<V>) -> Self {
        match self {
            Expr::Int(i) => Expr::Int(i.substitute(ctx, f)),
            Expr::Bool(b) => Expr::Bool(b.substitute(ctx, f)),
            Expr::Array(ty, len, a) => Expr::Array(ty.clone(), *len, a.substitute(ctx, f)),
        }
    }
}

/// Substitution on a guarded item: the guard is substituted under the
/// flipped context (a guard appears as an implicit antecedent), the item
/// under the unchanged context.
impl<V: Clone, I: PositionAware<V>> PositionAware<V> for Guarded<V, I> {
    fn substitute(&self, ctx: SubCtx, f: &mut dyn FnMut(SubCtx, &V) -> Expr<V>) -> Self {
        Guarded {
            cond: self.cond.substitute(ctx.flipped(), f),
            item: self.item.substitute(ctx, f),
        }
    }
}

impl<V: Clone> PositionAware<V> for crate::view::Func<Expr<V>> {
    fn substitute(&self, ctx: SubCtx, f: &mut dyn FnMut(SubCtx, &V) -> Expr<V>) -> Self {
        crate::view::Func {
            name: self.name.clone(),
            params: self.params.iter().map(|p| p.substitute(ctx, f)).collect(),
        }
    }
}

impl<V: Clone> PositionAware<V> for GView<V> {
    fn substitute(&self, ctx: SubCtx, f: &mut dyn FnMut(SubCtx, &V) -> Expr<V>) -> Self {
        GView(self.0.iter().map(|g| g.substitute(ctx, f)).collect())
    }
}

fn as_kind<V>(e: &Expr<V>) -> &'static str {
    match e {
        Expr::Int(_) => "Int",
        Expr::Bool(_) => "Bool",
        Expr::Array(..) => "Array",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_flips_sign() {
        let mut seen = Vec::new();
        let e: BoolExpr<String> = BoolExpr::Not(Box::new(BoolExpr::Var("x".to_string())));
        let _ = e.substitute(SubCtx::root(), &mut |ctx, v| {
            seen.push((v.clone(), ctx.sign));
            Expr::Bool(BoolExpr::Var(v.clone()))
        });
        assert_eq!(seen, vec![("x".to_string(), Sign::Negative)]);
    }

    #[test]
    fn implication_antecedent_flips_consequent_holds() {
        let mut seen = Vec::new();
        let e: BoolExpr<String> = BoolExpr::Implies(
            Box::new(BoolExpr::Var("p".to_string())),
            Box::new(BoolExpr::Var("q".to_string())),
        );
        let _ = e.substitute(SubCtx::root(), &mut |ctx, v| {
            seen.push((v.clone(), ctx.sign));
            Expr::Bool(BoolExpr::Var(v.clone()))
        });
        assert_eq!(
            seen,
            vec![
                ("p".to_string(), Sign::Negative),
                ("q".to_string(), Sign::Positive)
            ]
        );
    }
}
