//! Microcode IR and array-subscript normalization.

use std::collections::HashMap;

use crate::error::Error;
use crate::expr::{ArrayExpr, BoolExpr, Expr, IntExpr};
use crate::var::Type;

/// An lvalue: a variable, optionally indexed by a sequence of `Idx` steps.
/// A well-formed lvalue is a variable, possibly indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LValuePath<V> {
    pub root: V,
    pub path: Vec<IntExpr<V>>,
}

impl<V> LValuePath<V> {
    pub fn var(root: V) -> Self {
        LValuePath {
            root,
            path: Vec::new(),
        }
    }

    pub fn indexed(root: V, path: Vec<IntExpr<V>>) -> Self {
        LValuePath { root, path }
    }
}

/// Assignment, assumption, or branch, parameterized over lvalue type `L`
/// and variable type `V`.
#[derive(Debug, Clone, PartialEq)]
pub enum Microcode<L, V> {
    /// `rv = None` indicates havoc (an unconstrained new value).
    Assign(L, Option<Expr<V>>),
    Assume(BoolExpr<V>),
    Branch(BoolExpr<V>, Vec<Microcode<L, V>>, Vec<Microcode<L, V>>),
}

/// Records which components of a (possibly nested-array) variable were
/// touched by a microcode sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Write<V> {
    Entire(Option<Expr<V>>),
    Indices(Vec<(IntExpr<V>, Write<V>)>),
}

/// Normalizes a list of lvalue/rvalue assignments so that every assignment
/// targets a whole variable, by folding indexed writes into `Upd` chains.
pub fn normalize_assigns<V: Clone + PartialEq>(
    assigns: &[(LValuePath<V>, Option<Expr<V>>)],
    var_types: &HashMap<String, Type>,
    name_of: impl Fn(&V) -> String,
) -> Result<Vec<(V, Option<Expr<V>>)>, Error> {
    let mut write_map: Vec<(V, Write<V>)> = Vec::new();

    for (lv, rv) in assigns {
        let name = name_of(&lv.root);
        let ty = var_types.get(&name).cloned();
        record_write(&mut write_map, lv, rv.clone(), ty, &name)?;
    }

    let mut out = Vec::with_capacity(write_map.len());
    for (var, write) in write_map {
        let name = name_of(&var);
        let root_expr: Expr<V> = root_expr_for(&var, var_types.get(&name));
        out.push((var, translate_write(write, root_expr)));
    }
    Ok(out)
}

fn root_expr_for<V: Clone>(var: &V, ty: Option<&Type>) -> Expr<V> {
    match ty {
        Some(Type::Bool) => Expr::Bool(BoolExpr::Var(var.clone())),
        Some(Type::Array(elt, len)) => {
            Expr::Array((**elt).clone(), *len, ArrayExpr::Var(var.clone()))
        }
        _ => Expr::Int(IntExpr::Var(var.clone())),
    }
}

fn record_write<V: Clone + PartialEq>(
    write_map: &mut Vec<(V, Write<V>)>,
    lv: &LValuePath<V>,
    rv: Option<Expr<V>>,
    ty: Option<Type>,
    name: &str,
) -> Result<(), Error> {
    let slot = write_map.iter_mut().find(|(v, _)| *v == lv.root);
    match slot {
        None => {
            let write = build_write(&lv.path, rv, ty, name)?;
            write_map.push((lv.root.clone(), write));
        }
        Some((_, existing)) => {
            merge_write(existing, &lv.path, rv, ty, name)?;
        }
    }
    Ok(())
}

/// Builds a fresh `Write` for a path that has no prior entry.
fn build_write<V: Clone + PartialEq>(
    path: &[IntExpr<V>],
    rv: Option<Expr<V>>,
    ty: Option<Type>,
    name: &str,
) -> Result<Write<V>, Error> {
    match path.split_first() {
        None => Ok(Write::Entire(rv)),
        Some((idx, rest)) => {
            let elt_ty = array_elt_type(ty, name)?;
            let inner = build_write(rest, rv, elt_ty, name)?;
            Ok(Write::Indices(vec![(idx.clone(), inner)]))
        }
    }
}

/// Merges a new write into an existing `Write` entry for the same root
/// variable: whole-variable writes over a prior entry, or indexed writes
/// over `Entire`, are fatal; indexed writes over `Indices` recurse into the
/// matching index.
fn merge_write<V: Clone + PartialEq>(
    existing: &mut Write<V>,
    path: &[IntExpr<V>],
    rv: Option<Expr<V>>,
    ty: Option<Type>,
    name: &str,
) -> Result<(), Error> {
    match (path.split_first(), &mut *existing) {
        (None, _) => Err(Error::BadSemantics(format!(
            "double write to whole variable '{}'",
            name
        ))),
        (Some(_), Write::Entire(_)) => Err(Error::BadSemantics(format!(
            "indexed write to '{}' after a whole-variable write",
            name
        ))),
        (Some((idx, rest)), Write::Indices(entries)) => {
            let elt_ty = array_elt_type(ty, name)?;
            match entries.iter_mut().find(|(i, _)| i == idx) {
                Some((_, inner)) => merge_write(inner, rest, rv, elt_ty, name),
                None => {
                    let inner = build_write(rest, rv, elt_ty, name)?;
                    entries.push((idx.clone(), inner));
                    Ok(())
                }
            }
        }
    }
}

fn array_elt_type(ty: Option<Type>, name: &str) -> Result<Option<Type>, Error> {
    match ty {
        None => Ok(None),
        Some(Type::Array(elt, _)) => Ok(Some(*elt)),
        Some(other) => Err(Error::BadSemantics(format!(
            "index applied to non-array variable '{}' of type {}",
            name, other
        ))),
    }
}

/// Translates a `Write` back into a single whole-variable assignment,
/// folding indexed writes into a cascade of `Upd` expressions. A havoc
/// anywhere along the path propagates havoc to the whole update.
fn translate_write<V: Clone>(write: Write<V>, root: Expr<V>) -> Option<Expr<V>> {
    match write {
        Write::Entire(v) => v,
        Write::Indices(entries) => {
            let mut acc = root;
            for (idx, sub) in entries {
                let sub_root = index_into(&acc, &idx);
                let sub_val = translate_write(sub, sub_root)?;
                acc = update_at(acc, idx, sub_val);
            }
            Some(acc)
        }
    }
}

/// Indexes into an array-typed expression, producing an `Int` or `Bool`
/// leaf per the element type (`Idx` lives in the int/Boolean grammars, not
/// as a standalone array-producing form: array element types are `Int` or
/// `Bool`).
fn index_into<V: Clone>(arr: &Expr<V>, idx: &IntExpr<V>) -> Expr<V> {
    match arr {
        Expr::Array(Type::Bool, _, a) => {
            Expr::Bool(BoolExpr::Idx(Box::new(a.clone()), Box::new(idx.clone())))
        }
        Expr::Array(_, _, a) => Expr::Int(IntExpr::Idx(Box::new(a.clone()), Box::new(idx.clone()))),
        _ => unreachable!("index_into called on a non-array expression"),
    }
}

fn update_at<V: Clone>(arr: Expr<V>, idx: IntExpr<V>, val: Expr<V>) -> Expr<V> {
    match arr {
        Expr::Array(ty, len, a) => Expr::Array(
            ty,
            len,
            ArrayExpr::Upd(Box::new(a), Box::new(idx), Box::new(val)),
        ),
        _ => unreachable!("update_at called on a non-array expression"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_ty_map(names: &[(&str, Type)]) -> HashMap<String, Type> {
        names
            .iter()
            .map(|(n, t)| (n.to_string(), t.clone()))
            .collect()
    }

    /// `a[i] := 1; a[j] := 2` normalizes to a single assignment folding
    /// both writes into a cascade of `Upd`s, in insertion order.
    #[test]
    fn array_subscript_cascade() {
        let tys = int_ty_map(&[("a", Type::Array(Box::new(Type::Int), 10))]);
        let i = IntExpr::Var("i".to_string());
        let j = IntExpr::Var("j".to_string());
        let assigns = vec![
            (
                LValuePath::indexed("a".to_string(), vec![i.clone()]),
                Some(Expr::Int(IntExpr::Lit(1))),
            ),
            (
                LValuePath::indexed("a".to_string(), vec![j.clone()]),
                Some(Expr::Int(IntExpr::Lit(2))),
            ),
        ];
        let out = normalize_assigns(&assigns, &tys, |v: &String| v.clone()).unwrap();
        assert_eq!(out.len(), 1);
        let (var, val) = &out[0];
        assert_eq!(var, "a");
        let expected = Expr::Array(
            Type::Int,
            10,
            ArrayExpr::Upd(
                Box::new(ArrayExpr::Upd(
                    Box::new(ArrayExpr::Var("a".to_string())),
                    Box::new(i),
                    Box::new(Expr::Int(IntExpr::Lit(1))),
                )),
                Box::new(j),
                Box::new(Expr::Int(IntExpr::Lit(2))),
            ),
        );
        assert_eq!(val.as_ref().unwrap(), &expected);
    }

    #[test]
    fn double_whole_variable_write_is_bad_semantics() {
        let tys = int_ty_map(&[("x", Type::Int)]);
        let assigns = vec![
            (
                LValuePath::var("x".to_string()),
                Some(Expr::Int(IntExpr::Lit(1))),
            ),
            (
                LValuePath::var("x".to_string()),
                Some(Expr::Int(IntExpr::Lit(2))),
            ),
        ];
        let err = normalize_assigns(&assigns, &tys, |v: &String| v.clone()).unwrap_err();
        assert!(matches!(err, Error::BadSemantics(_)));
    }

    #[test]
    fn index_over_non_array_is_bad_semantics() {
        let tys = int_ty_map(&[("x", Type::Int)]);
        let assigns = vec![(
            LValuePath::indexed("x".to_string(), vec![IntExpr::Lit(0)]),
            Some(Expr::Int(IntExpr::Lit(1))),
        )];
        let err = normalize_assigns(&assigns, &tys, |v: &String| v.clone()).unwrap_err();
        assert!(matches!(err, Error::BadSemantics(_)));
    }
}
