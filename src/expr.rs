//! Expression algebra.
//!
//! Typed integer/Boolean/array expressions over a generic variable type `V`,
//! plus the sound-but-not-complete simplifier `simp` and a variable-collection
//! walk used by later stages to compute frames.

use std::fmt;

use crate::var::Type;

/// A tagged-union expression over variable type `V`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Expr<V> {
    Int(IntExpr<V>),
    Bool(BoolExpr<V>),
    Array(Type, usize, ArrayExpr<V>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum IntExpr<V> {
    Var(V),
    Lit(i64),
    Add(Vec<IntExpr<V>>),
    Sub(Box<IntExpr<V>>, Box<IntExpr<V>>),
    Mul(Vec<IntExpr<V>>),
    Div(Box<IntExpr<V>>, Box<IntExpr<V>>),
    Idx(Box<ArrayExpr<V>>, Box<IntExpr<V>>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BoolExpr<V> {
    Var(V),
    Lit(bool),
    And(Vec<BoolExpr<V>>),
    Or(Vec<BoolExpr<V>>),
    Not(Box<BoolExpr<V>>),
    Implies(Box<BoolExpr<V>>, Box<BoolExpr<V>>),
    /// Equality between expressions of the same subtype only.
    EqInt(Box<IntExpr<V>>, Box<IntExpr<V>>),
    EqBool(Box<BoolExpr<V>>, Box<BoolExpr<V>>),
    EqArray(Box<ArrayExpr<V>>, Box<ArrayExpr<V>>),
    Gt(Box<IntExpr<V>>, Box<IntExpr<V>>),
    Ge(Box<IntExpr<V>>, Box<IntExpr<V>>),
    Le(Box<IntExpr<V>>, Box<IntExpr<V>>),
    Lt(Box<IntExpr<V>>, Box<IntExpr<V>>),
    Idx(Box<ArrayExpr<V>>, Box<IntExpr<V>>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ArrayExpr<V> {
    Var(V),
    /// `Upd(arr, idx, val)`: functional array update.
    Upd(Box<ArrayExpr<V>>, Box<IntExpr<V>>, Box<Expr<V>>),
}

impl<V: fmt::Display> fmt::Display for Expr<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(e) => write!(f, "{}", e),
            Expr::Bool(e) => write!(f, "{}", e),
            Expr::Array(_, _, e) => write!(f, "{}", e),
        }
    }
}

impl<V: fmt::Display> fmt::Display for IntExpr<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntExpr::Var(v) => write!(f, "{}", v),
            IntExpr::Lit(n) => write!(f, "{}", n),
            IntExpr::Add(xs) => write_nary(f, "+", xs),
            IntExpr::Sub(a, b) => write!(f, "({} - {})", a, b),
            IntExpr::Mul(xs) => write_nary(f, "*", xs),
            IntExpr::Div(a, b) => write!(f, "({} / {})", a, b),
            IntExpr::Idx(arr, idx) => write!(f, "{}[{}]", arr, idx),
        }
    }
}

impl<V: fmt::Display> fmt::Display for BoolExpr<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolExpr::Var(v) => write!(f, "{}", v),
            BoolExpr::Lit(b) => write!(f, "{}", b),
            BoolExpr::And(xs) => write_nary(f, "&&", xs),
            BoolExpr::Or(xs) => write_nary(f, "||", xs),
            BoolExpr::Not(e) => write!(f, "!{}", e),
            BoolExpr::Implies(a, b) => write!(f, "({} => {})", a, b),
            BoolExpr::EqInt(a, b) => write!(f, "({} = {})", a, b),
            BoolExpr::EqBool(a, b) => write!(f, "({} = {})", a, b),
            BoolExpr::EqArray(a, b) => write!(f, "({} = {})", a, b),
            BoolExpr::Gt(a, b) => write!(f, "({} > {})", a, b),
            BoolExpr::Ge(a, b) => write!(f, "({} >= {})", a, b),
            BoolExpr::Le(a, b) => write!(f, "({} <= {})", a, b),
            BoolExpr::Lt(a, b) => write!(f, "({} < {})", a, b),
            BoolExpr::Idx(arr, idx) => write!(f, "{}[{}]", arr, idx),
        }
    }
}

impl<V: fmt::Display> fmt::Display for ArrayExpr<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayExpr::Var(v) => write!(f, "{}", v),
            ArrayExpr::Upd(arr, idx, val) => write!(f, "upd({}, {}, {})", arr, idx, val),
        }
    }
}

fn write_nary<T: fmt::Display>(f: &mut fmt::Formatter<'_>, op: &str, xs: &[T]) -> fmt::Result {
    write!(f, "(")?;
    for (i, x) in xs.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", op)?;
        }
        write!(f, "{}", x)?;
    }
    write!(f, ")")
}

/// A monotonically increasing counter used to label intermediate
/// composition stages. Deliberately tiny and not `Send`/`Sync`: the whole
/// core is single-threaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct StageCounter(u32);

impl StageCounter {
    pub fn new() -> Self {
        StageCounter(0)
    }

    /// Returns the next stage index and advances the counter.
    pub fn next(&mut self) -> u32 {
        let n = self.0;
        self.0 += 1;
        n
    }

    pub fn len(&self) -> u32 {
        self.0
    }
}

/// Collects every distinct variable occurrence in an expression, in
/// left-to-right traversal order (duplicates included, callers that need a
/// set can dedup).
pub fn collect_vars<V: Clone>(e: &Expr<V>) -> Vec<V> {
    let mut out = Vec::new();
    collect_vars_into(e, &mut out);
    out
}

fn collect_vars_into<V: Clone>(e: &Expr<V>, out: &mut Vec<V>) {
    match e {
        Expr::Int(i) => collect_int_vars(i, out),
        Expr::Bool(b) => collect_bool_vars(b, out),
        Expr::Array(_, _, a) => collect_array_vars(a, out),
    }
}

fn collect_int_vars<V: Clone>(e: &IntExpr<V>, out: &mut Vec<V>) {
    match e {
        IntExpr::Var(v) => out.push(v.clone()),
        IntExpr::Lit(_) => {}
        IntExpr::Add(xs) | IntExpr::Mul(xs) => {
            for x in xs {
                collect_int_vars(x, out);
            }
        }
        IntExpr::Sub(a, b) | IntExpr::Div(a, b) => {
            collect_int_vars(a, out);
            collect_int_vars(b, out);
        }
        IntExpr::Idx(arr, idx) => {
            collect_array_vars(arr, out);
            collect_int_vars(idx, out);
        }
    }
}

fn collect_bool_vars<V: Clone>(e: &BoolExpr<V>, out: &mut Vec<V>) {
    match e {
        BoolExpr::Var(v) => out.push(v.clone()),
        BoolExpr::Lit(_) => {}
        BoolExpr::And(xs) | BoolExpr::Or(xs) => {
            for x in xs {
                collect_bool_vars(x, out);
            }
        }
        BoolExpr::Not(a) => collect_bool_vars(a, out),
        BoolExpr::Implies(a, b) | BoolExpr::EqBool(a, b) => {
            collect_bool_vars(a, out);
            collect_bool_vars(b, out);
        }
        BoolExpr::EqInt(a, b)
        | BoolExpr::Gt(a, b)
        | BoolExpr::Ge(a, b)
        | BoolExpr::Le(a, b)
        | BoolExpr::Lt(a, b) => {
            collect_int_vars(a, out);
            collect_int_vars(b, out);
        }
        BoolExpr::EqArray(a, b) => {
            collect_array_vars(a, out);
            collect_array_vars(b, out);
        }
        BoolExpr::Idx(arr, idx) => {
            collect_array_vars(arr, out);
            collect_int_vars(idx, out);
        }
    }
}

fn collect_array_vars<V: Clone>(e: &ArrayExpr<V>, out: &mut Vec<V>) {
    match e {
        ArrayExpr::Var(v) => out.push(v.clone()),
        ArrayExpr::Upd(arr, idx, val) => {
            collect_array_vars(arr, out);
            collect_int_vars(idx, out);
            collect_vars_into(val, out);
        }
    }
}

/// Trivial-equivalence relation `≡` used by `simp`'s duplicate-removal rule:
/// structural equality extended with `a=b ≡ b=a` and `¬a ≡ ¬b` iff `a ≡ b`.
fn trivially_equiv<V: PartialEq>(a: &BoolExpr<V>, b: &BoolExpr<V>) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (BoolExpr::EqInt(a1, a2), BoolExpr::EqInt(b1, b2)) => a1 == b2 && a2 == b1,
        (BoolExpr::EqBool(a1, a2), BoolExpr::EqBool(b1, b2)) => a1 == b2 && a2 == b1,
        (BoolExpr::EqArray(a1, a2), BoolExpr::EqArray(b1, b2)) => a1 == b2 && a2 == b1,
        (BoolExpr::Not(a), BoolExpr::Not(b)) => trivially_equiv(a, b),
        _ => false,
    }
}

/// Sound (not complete) simplification of a Boolean expression. Total:
/// never fails. Children are simplified first (bottom-up), so relative
/// operand order is preserved modulo flattening of nested associative
/// operators.
pub fn simp<V: Clone + PartialEq>(e: &BoolExpr<V>) -> BoolExpr<V> {
    match e {
        BoolExpr::Var(_) | BoolExpr::Lit(_) => e.clone(),

        BoolExpr::Not(inner) => simp_not(simp(inner)),

        BoolExpr::And(xs) => simp_nary(xs, true),
        BoolExpr::Or(xs) => simp_nary(xs, false),

        BoolExpr::Implies(a, b) => simp_implies(simp(a), simp(b)),

        BoolExpr::EqBool(a, b) => simp_eq_bool(simp(a), simp(b)),

        BoolExpr::EqInt(a, b) => {
            let (a, b) = (a.clone(), b.clone());
            if a == b {
                BoolExpr::Lit(true)
            } else {
                BoolExpr::EqInt(a, b)
            }
        }
        BoolExpr::EqArray(a, b) => {
            let (a, b) = (a.clone(), b.clone());
            if a == b {
                BoolExpr::Lit(true)
            } else {
                BoolExpr::EqArray(a, b)
            }
        }
        BoolExpr::Ge(a, b) | BoolExpr::Le(a, b) if a == b => BoolExpr::Lit(true),
        BoolExpr::Gt(..) | BoolExpr::Lt(..) | BoolExpr::Ge(..) | BoolExpr::Le(..) => e.clone(),
        BoolExpr::Idx(arr, idx) => BoolExpr::Idx(arr.clone(), idx.clone()),
    }
}

/// Pushes and eliminates `Not`, including the comparison/De Morgan cases.
fn simp_not<V: Clone + PartialEq>(inner: BoolExpr<V>) -> BoolExpr<V> {
    match inner {
        BoolExpr::Lit(b) => BoolExpr::Lit(!b),
        BoolExpr::Not(x) => *x,
        BoolExpr::And(xs) => simp_nary(
            &xs.into_iter().map(|x| simp_not(x)).collect::<Vec<_>>(),
            false,
        ),
        BoolExpr::Or(xs) => simp_nary(
            &xs.into_iter().map(|x| simp_not(x)).collect::<Vec<_>>(),
            true,
        ),
        BoolExpr::Implies(p, q) => simp_nary(&[*p, simp_not(*q)], true),
        BoolExpr::Gt(a, b) => BoolExpr::Le(a, b),
        BoolExpr::Ge(a, b) => BoolExpr::Lt(a, b),
        BoolExpr::Le(a, b) => BoolExpr::Gt(a, b),
        BoolExpr::Lt(a, b) => BoolExpr::Ge(a, b),
        other => BoolExpr::Not(Box::new(other)),
    }
}

/// Implication rewriting, applied after both sides are simplified.
fn simp_implies<V: Clone + PartialEq>(a: BoolExpr<V>, b: BoolExpr<V>) -> BoolExpr<V> {
    match (a, b) {
        (BoolExpr::Lit(false), _) => BoolExpr::Lit(true),
        (_, BoolExpr::Lit(true)) => BoolExpr::Lit(true),
        (BoolExpr::Lit(true), y) => y,
        (x, BoolExpr::Lit(false)) => simp_not(x),
        (x, y) => BoolExpr::Implies(Box::new(x), Box::new(y)),
    }
}

/// Boolean equality against literals collapses by truth table.
fn simp_eq_bool<V: Clone + PartialEq>(a: BoolExpr<V>, b: BoolExpr<V>) -> BoolExpr<V> {
    match (a, b) {
        (BoolExpr::Lit(x), BoolExpr::Lit(y)) => BoolExpr::Lit(x == y),
        (x, BoolExpr::Lit(true)) | (BoolExpr::Lit(true), x) => x,
        (x, BoolExpr::Lit(false)) | (BoolExpr::Lit(false), x) => simp_not(x),
        (x, y) if x == y => BoolExpr::Lit(true),
        (x, y) => BoolExpr::EqBool(Box::new(x), Box::new(y)),
    }
}

/// Short-circuiting n-ary And/Or, with flattening and duplicate removal.
/// `is_and` selects And-semantics vs Or-semantics.
fn simp_nary<V: Clone + PartialEq>(xs: &[BoolExpr<V>], is_and: bool) -> BoolExpr<V> {
    let mut flat: Vec<BoolExpr<V>> = Vec::new();
    for x in xs {
        let x = simp(x);
        match fold_fast(&x, is_and) {
            FoldStep::ShortCircuit(v) => return BoolExpr::Lit(v),
            FoldStep::Drop => {}
            FoldStep::Flatten(mut inner) => flat.append(&mut inner),
            FoldStep::Keep(x) => flat.push(x),
        }
    }

    let mut deduped: Vec<BoolExpr<V>> = Vec::new();
    for x in flat {
        if !deduped.iter().any(|y| trivially_equiv(y, &x)) {
            deduped.push(x);
        }
    }

    match deduped.len() {
        0 => absorbing_or_identity(is_and),
        1 => deduped.into_iter().next().unwrap(),
        _ => {
            if is_and {
                BoolExpr::And(deduped)
            } else {
                BoolExpr::Or(deduped)
            }
        }
    }
}

fn absorbing_or_identity<V>(is_and: bool) -> BoolExpr<V> {
    // empty And -> T (vacuous conjunction), empty Or -> F
    BoolExpr::Lit(is_and)
}

enum FoldStep<V> {
    ShortCircuit(bool),
    Drop,
    Flatten(Vec<BoolExpr<V>>),
    Keep(BoolExpr<V>),
}

/// Decides in one step whether an already-simplified operand short-circuits
/// the whole n-ary node, should be dropped (the node's identity element),
/// should be spliced in (nested same operator), or simply kept.
fn fold_fast<V: Clone>(x: &BoolExpr<V>, is_and: bool) -> FoldStep<V> {
    match x {
        BoolExpr::Lit(b) if *b == is_and => FoldStep::Drop,
        BoolExpr::Lit(b) => FoldStep::ShortCircuit(*b),
        BoolExpr::And(inner) if is_and => FoldStep::Flatten(inner.clone()),
        BoolExpr::Or(inner) if !is_and => FoldStep::Flatten(inner.clone()),
        other => FoldStep::Keep(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(name: &str) -> BoolExpr<String> {
        BoolExpr::Var(name.to_string())
    }

    #[test]
    fn not_not_cancels() {
        let e = BoolExpr::Not(Box::new(BoolExpr::Not(Box::new(v("x")))));
        assert_eq!(simp(&e), v("x"));
    }

    #[test]
    fn not_comparison_flips_operator() {
        let a = IntExpr::Var("a".to_string());
        let b = IntExpr::Var("b".to_string());
        let e = BoolExpr::Not(Box::new(BoolExpr::Gt(
            Box::new(a.clone()),
            Box::new(b.clone()),
        )));
        assert_eq!(simp(&e), BoolExpr::Le(Box::new(a), Box::new(b)));
    }

    #[test]
    fn or_with_true_collapses() {
        let e = BoolExpr::Or(vec![v("x"), BoolExpr::Lit(true), v("y")]);
        assert_eq!(simp(&e), BoolExpr::Lit(true));
    }

    #[test]
    fn and_drops_true_and_flattens() {
        let inner = BoolExpr::And(vec![v("x"), v("y")]);
        let e = BoolExpr::And(vec![BoolExpr::Lit(true), inner, v("z")]);
        assert_eq!(simp(&e), BoolExpr::And(vec![v("x"), v("y"), v("z")]));
    }

    #[test]
    fn empty_or_is_false() {
        let e: BoolExpr<String> = BoolExpr::Or(vec![]);
        assert_eq!(simp(&e), BoolExpr::Lit(false));
    }

    #[test]
    fn singleton_and_unwraps() {
        let e = BoolExpr::And(vec![v("x")]);
        assert_eq!(simp(&e), v("x"));
    }

    #[test]
    fn duplicate_removed_via_trivial_equivalence() {
        let a = IntExpr::Var("a".to_string());
        let b = IntExpr::Var("b".to_string());
        let lhs = BoolExpr::EqInt(Box::new(a.clone()), Box::new(b.clone()));
        let rhs = BoolExpr::EqInt(Box::new(b), Box::new(a));
        let e = BoolExpr::And(vec![lhs.clone(), rhs]);
        assert_eq!(simp(&e), lhs);
    }

    #[test]
    fn reflexive_eq_is_true() {
        let a = IntExpr::Var("a".to_string());
        let e = BoolExpr::EqInt(Box::new(a.clone()), Box::new(a));
        assert_eq!(simp(&e), BoolExpr::Lit(true));
    }

    #[test]
    fn implication_false_antecedent_is_true() {
        let e = BoolExpr::Implies(Box::new(BoolExpr::Lit(false)), Box::new(v("x")));
        assert_eq!(simp(&e), BoolExpr::Lit(true));
    }

    #[test]
    fn simp_is_idempotent() {
        let e = BoolExpr::And(vec![
            BoolExpr::Not(Box::new(BoolExpr::Not(Box::new(v("x"))))),
            BoolExpr::Lit(true),
        ]);
        let once = simp(&e);
        let twice = simp(&once);
        assert_eq!(once, twice);
    }
}
