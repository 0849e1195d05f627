//! Primitive commands and semantic instantiation.

use std::collections::HashMap;

use crate::error::Error;
use crate::expr::Expr;
use crate::microcode::{LValuePath, Microcode};
use crate::var::Type;

/// A concrete call to a primitive, as it appears in a command.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimCommand {
    pub name: String,
    pub args: Vec<Expr<String>>,
    pub results: Vec<Expr<String>>,
}

/// A schema parameter: name plus declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedVar {
    pub name: String,
    pub ty: Type,
}

impl TypedVar {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        TypedVar {
            name: name.into(),
            ty,
        }
    }
}

/// The semantic schema for a primitive: its parameter/result signature and
/// a microcode body written in terms of the schema's own parameter names.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimSemantics {
    pub args: Vec<TypedVar>,
    pub results: Vec<TypedVar>,
    pub body: Vec<Microcode<LValuePath<String>, String>>,
}

pub type PrimSemanticsMap = HashMap<String, PrimSemantics>;

fn type_of(e: &Expr<String>) -> Type {
    match e {
        Expr::Int(_) => Type::Int,
        Expr::Bool(_) => Type::Bool,
        Expr::Array(elt, len, _) => Type::Array(Box::new(elt.clone()), *len),
    }
}

/// Looks up `prim`'s schema, checks argument/result counts and types, and
/// substitutes the schema's parameter names for the caller's expressions
/// throughout the schema body.
pub fn instantiate(
    prim: &PrimCommand,
    schemas: &PrimSemanticsMap,
) -> Result<Vec<Microcode<LValuePath<String>, String>>, Error> {
    instantiate_inner(prim, schemas)
        .map_err(|e| Error::Instantiate(Box::new(prim.clone()), Box::new(e)))
}

fn instantiate_inner(
    prim: &PrimCommand,
    schemas: &PrimSemanticsMap,
) -> Result<Vec<Microcode<LValuePath<String>, String>>, Error> {
    let schema = schemas
        .get(&prim.name)
        .ok_or_else(|| Error::MissingDef(prim.name.clone()))?;

    if prim.args.len() != schema.args.len() {
        return Err(Error::CountMismatch {
            expected: schema.args.len(),
            actual: prim.args.len(),
        });
    }
    if prim.results.len() != schema.results.len() {
        return Err(Error::CountMismatch {
            expected: schema.results.len(),
            actual: prim.results.len(),
        });
    }

    let mut subst: HashMap<String, Expr<String>> = HashMap::new();
    for (param, actual) in schema
        .args
        .iter()
        .chain(schema.results.iter())
        .zip(prim.args.iter().chain(prim.results.iter()))
    {
        check_type(param, actual)?;
        subst.insert(param.name.clone(), actual.clone());
    }

    schema
        .body
        .iter()
        .map(|m| substitute_microcode(m, &subst))
        .collect()
}

fn check_type(param: &TypedVar, actual: &Expr<String>) -> Result<(), Error> {
    let actual_ty = type_of(actual);
    if actual_ty == param.ty {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            param: param.name.clone(),
            actual: actual_ty.to_string(),
        })
    }
}

fn substitute_microcode(
    m: &Microcode<LValuePath<String>, String>,
    subst: &HashMap<String, Expr<String>>,
) -> Result<Microcode<LValuePath<String>, String>, Error> {
    use crate::subst::{PositionAware, SubCtx};

    let mut lookup = |_ctx: SubCtx, v: &String| -> Expr<String> {
        subst.get(v).cloned().unwrap_or_else(|| var_as_expr(v))
    };

    match m {
        Microcode::Assign(lv, rv) => {
            let new_lv = substitute_lvalue(lv, subst)?;
            let new_rv = match rv {
                None => None,
                Some(e) => {
                    require_defined_expr(e, subst)?;
                    Some(e.substitute(SubCtx::root(), &mut lookup))
                }
            };
            Ok(Microcode::Assign(new_lv, new_rv))
        }
        Microcode::Assume(cond) => {
            require_defined_bool(cond, subst)?;
            Ok(Microcode::Assume(
                cond.substitute(SubCtx::root(), &mut lookup),
            ))
        }
        Microcode::Branch(cond, then_, else_) => {
            require_defined_bool(cond, subst)?;
            let cond = cond.substitute(SubCtx::root(), &mut lookup);
            let then_: Result<Vec<_>, Error> = then_
                .iter()
                .map(|m| substitute_microcode(m, subst))
                .collect();
            let else_: Result<Vec<_>, Error> = else_
                .iter()
                .map(|m| substitute_microcode(m, subst))
                .collect();
            Ok(Microcode::Branch(cond, then_?, else_?))
        }
    }
}

/// Checks that every variable `e` refers to has a substitution entry,
/// reporting the first one found missing instead of letting the
/// substitution traversal run into an undefined variable.
fn require_defined_expr(
    e: &Expr<String>,
    subst: &HashMap<String, Expr<String>>,
) -> Result<(), Error> {
    for v in crate::expr::collect_vars(e) {
        if !subst.contains_key(&v) {
            return Err(Error::FreeVarInSub(v));
        }
    }
    Ok(())
}

fn require_defined_bool(
    e: &crate::expr::BoolExpr<String>,
    subst: &HashMap<String, Expr<String>>,
) -> Result<(), Error> {
    require_defined_expr(&Expr::Bool(e.clone()), subst)
}

/// Caller-side expressions for an lvalue are required to be plain
/// variables after the array root is substituted (the schema itself may
/// still index into a parameter, e.g. `arr[i] := v`); only the root needs
/// substitution, the index path substitutes variables in its own
/// expressions as usual.
fn substitute_lvalue(
    lv: &LValuePath<String>,
    subst: &HashMap<String, Expr<String>>,
) -> Result<LValuePath<String>, Error> {
    use crate::subst::{PositionAware, SubCtx};

    let mut lookup = |_ctx: SubCtx, v: &String| -> Expr<String> {
        subst.get(v).cloned().unwrap_or_else(|| var_as_expr(v))
    };

    let root = match subst.get(&lv.root) {
        Some(Expr::Int(crate::expr::IntExpr::Var(v))) => v.clone(),
        Some(Expr::Bool(crate::expr::BoolExpr::Var(v))) => v.clone(),
        Some(Expr::Array(_, _, crate::expr::ArrayExpr::Var(v))) => v.clone(),
        Some(_) => return Err(Error::BadSemantics(format!(
            "schema parameter '{}' used as an lvalue root but substituted with a non-variable expression",
            lv.root
        ))),
        None => {
            if lv.path.is_empty() {
                return Err(Error::FreeVarInSub(lv.root.clone()));
            }
            lv.root.clone()
        }
    };

    for idx in &lv.path {
        require_defined_expr(&Expr::Int(idx.clone()), subst)?;
    }
    let path = lv
        .path
        .iter()
        .map(|idx| idx.substitute(SubCtx::root(), &mut lookup))
        .collect();

    Ok(LValuePath { root, path })
}

/// Never reached: every call site checks `require_defined_expr`/
/// `require_defined_bool` first and returns `Error::FreeVarInSub` before
/// the substitution traversal can run into a variable missing from
/// `subst`.
fn var_as_expr(v: &str) -> Expr<String> {
    unreachable!("variable '{}' missing from substitution map after the free-variable check", v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BoolExpr, IntExpr};
    use crate::microcode::LValuePath;

    fn assign_schema() -> PrimSemanticsMap {
        let mut m = PrimSemanticsMap::new();
        m.insert(
            "assign".to_string(),
            PrimSemantics {
                args: vec![TypedVar::new("rhs", Type::Int)],
                results: vec![TypedVar::new("lhs", Type::Int)],
                body: vec![Microcode::Assign(
                    LValuePath::var("lhs".to_string()),
                    Some(Expr::Int(IntExpr::Var("rhs".to_string()))),
                )],
            },
        );
        m
    }

    #[test]
    fn instantiate_substitutes_caller_expressions() {
        let schemas = assign_schema();
        let prim = PrimCommand {
            name: "assign".to_string(),
            args: vec![Expr::Int(IntExpr::Var("ticket".to_string()))],
            results: vec![Expr::Int(IntExpr::Var("t".to_string()))],
        };
        let body = instantiate(&prim, &schemas).unwrap();
        assert_eq!(
            body,
            vec![Microcode::Assign(
                LValuePath::var("t".to_string()),
                Some(Expr::Int(IntExpr::Var("ticket".to_string())))
            )]
        );
    }

    #[test]
    fn missing_schema_is_reported() {
        let schemas = PrimSemanticsMap::new();
        let prim = PrimCommand {
            name: "nope".to_string(),
            args: vec![],
            results: vec![],
        };
        let err = instantiate(&prim, &schemas).unwrap_err();
        assert!(
            matches!(err, Error::Instantiate(_, inner) if matches!(*inner, Error::MissingDef(_)))
        );
    }

    #[test]
    fn count_mismatch_is_reported() {
        let schemas = assign_schema();
        let prim = PrimCommand {
            name: "assign".to_string(),
            args: vec![],
            results: vec![Expr::Int(IntExpr::Var("t".to_string()))],
        };
        let err = instantiate(&prim, &schemas).unwrap_err();
        assert!(
            matches!(err, Error::Instantiate(_, inner) if matches!(*inner, Error::CountMismatch { .. }))
        );
    }

    #[test]
    fn free_variable_in_rvalue_is_reported_not_panicked() {
        let mut schemas = PrimSemanticsMap::new();
        schemas.insert(
            "bad".to_string(),
            PrimSemantics {
                args: vec![],
                results: vec![TypedVar::new("lhs", Type::Int)],
                body: vec![Microcode::Assign(
                    LValuePath::var("lhs".to_string()),
                    Some(Expr::Int(IntExpr::Var("ghost".to_string()))),
                )],
            },
        );
        let prim = PrimCommand {
            name: "bad".to_string(),
            args: vec![],
            results: vec![Expr::Int(IntExpr::Var("t".to_string()))],
        };
        let err = instantiate(&prim, &schemas).unwrap_err();
        assert!(
            matches!(err, Error::Instantiate(_, inner) if matches!(*inner, Error::FreeVarInSub(ref v) if v == "ghost"))
        );
    }

    #[test]
    fn type_mismatch_is_reported() {
        let schemas = assign_schema();
        let prim = PrimCommand {
            name: "assign".to_string(),
            args: vec![Expr::Bool(BoolExpr::Var("flag".to_string()))],
            results: vec![Expr::Int(IntExpr::Var("t".to_string()))],
        };
        let err = instantiate(&prim, &schemas).unwrap_err();
        assert!(
            matches!(err, Error::Instantiate(_, inner) if matches!(*inner, Error::TypeMismatch { .. }))
        );
    }
}
