//! Term construction.
//!
//! Combines a method axiom's precondition view and command semantics with
//! a goal view into one `Term` per (axiom, goal) pair, lifting surface
//! variables into the `Sym<MarkedVar>` space the command semantics already
//! lives in, then, when the caller supplies an over-/under-approximation,
//! substituting uniformly across `cmd`, `wpre`, and `goal` under the
//! appropriate position.

use std::collections::HashMap;
use std::fmt;

use crate::error::Error;
use crate::expr::{ArrayExpr, BoolExpr, Expr, IntExpr};
use crate::subst::{PositionAware, SubCtx};
use crate::sym::Sym;
use crate::var::{MarkedVar, Variable};
use crate::view::{Func, GFunc, GView, Guarded};

/// A position-sensitive over-/under-approximation substitution, applied
/// uniformly across a term's `cmd`, `wpre`, and `goal`.
type Approximation<'a> = dyn FnMut(SubCtx, &Sym<MarkedVar>) -> Expr<Sym<MarkedVar>> + 'a;

/// A method axiom: its precondition view (over surface variable names) and
/// its already-translated two-state command semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct Axiom {
    pub wpre: GView<String>,
    pub cmd: BoolExpr<Sym<MarkedVar>>,
}

/// A verification condition `wpre ∧ cmd ⇒ goal`.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub cmd: BoolExpr<Sym<MarkedVar>>,
    pub wpre: GView<Sym<MarkedVar>>,
    pub goal: Func<Expr<Sym<MarkedVar>>>,
}

/// Builds one `Term` per (axiom, goal-view) pair. `vars` gives the declared
/// shared/thread variables the axiom's `wpre` and the goal views refer to
/// by name; `approximate`, when present, is applied position-sensitively
/// across all three parts of each term, e.g. substituting a symbolic
/// over-approximation at positive positions and an under-approximation at
/// negative ones.
pub fn produce_terms(
    axioms: &[Axiom],
    goals: &[Func<Expr<String>>],
    vars: &[Variable],
    mut approximate: Option<&mut Approximation>,
) -> Result<Vec<Term>, Error> {
    let by_name: HashMap<&str, &Variable> = vars.iter().map(|v| (v.name.as_str(), v)).collect();

    let mut terms = Vec::with_capacity(axioms.len() * goals.len());
    for axiom in axioms {
        let wpre = lift_gview(&axiom.wpre, &by_name, &MarkedVar::before)?;
        for (n, goal) in goals.iter().enumerate() {
            let goal = lift_func(goal, &by_name, &|v| MarkedVar::goal(n as u32, v))?;
            let mut term = Term {
                cmd: axiom.cmd.clone(),
                wpre: wpre.clone(),
                goal,
            };
            if let Some(f) = approximate.as_deref_mut() {
                term = apply_approximation(term, f);
            }
            terms.push(term);
        }
    }
    Ok(terms)
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} && {}) => {}", self.wpre, self.cmd, self.goal)
    }
}

fn apply_approximation(term: Term, f: &mut Approximation) -> Term {
    Term {
        cmd: term.cmd.substitute(SubCtx::root(), f),
        wpre: term.wpre.substitute(SubCtx::root(), f),
        goal: term.goal.substitute(SubCtx::root(), f),
    }
}

fn lookup<'a>(by_name: &HashMap<&str, &'a Variable>, name: &str) -> Result<&'a Variable, Error> {
    by_name.get(name).copied().ok_or_else(|| {
        Error::BadSemantics(format!(
            "undeclared variable '{}' in term construction",
            name
        ))
    })
}

fn lift_gview(
    view: &GView<String>,
    by_name: &HashMap<&str, &Variable>,
    mk: &dyn Fn(Variable) -> MarkedVar,
) -> Result<GView<Sym<MarkedVar>>, Error> {
    view.iter()
        .map(|g| lift_gfunc(g, by_name, mk))
        .collect::<Result<Vec<_>, _>>()
        .map(GView)
}

fn lift_gfunc(
    g: &GFunc<String>,
    by_name: &HashMap<&str, &Variable>,
    mk: &dyn Fn(Variable) -> MarkedVar,
) -> Result<GFunc<Sym<MarkedVar>>, Error> {
    Ok(Guarded {
        cond: lift_bool(&g.cond, by_name, mk)?,
        item: lift_func(&g.item, by_name, mk)?,
    })
}

fn lift_func(
    f: &Func<Expr<String>>,
    by_name: &HashMap<&str, &Variable>,
    mk: &dyn Fn(Variable) -> MarkedVar,
) -> Result<Func<Expr<Sym<MarkedVar>>>, Error> {
    let params = f
        .params
        .iter()
        .map(|p| lift_expr(p, by_name, mk))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Func {
        name: f.name.clone(),
        params,
    })
}

fn lift_expr(
    e: &Expr<String>,
    by_name: &HashMap<&str, &Variable>,
    mk: &dyn Fn(Variable) -> MarkedVar,
) -> Result<Expr<Sym<MarkedVar>>, Error> {
    Ok(match e {
        Expr::Int(i) => Expr::Int(lift_int(i, by_name, mk)?),
        Expr::Bool(b) => Expr::Bool(lift_bool(b, by_name, mk)?),
        Expr::Array(ty, len, a) => Expr::Array(ty.clone(), *len, lift_array(a, by_name, mk)?),
    })
}

fn lift_int(
    e: &IntExpr<String>,
    by_name: &HashMap<&str, &Variable>,
    mk: &dyn Fn(Variable) -> MarkedVar,
) -> Result<IntExpr<Sym<MarkedVar>>, Error> {
    Ok(match e {
        IntExpr::Var(name) => IntExpr::Var(Sym::reg(mk(lookup(by_name, name)?.clone()))),
        IntExpr::Lit(n) => IntExpr::Lit(*n),
        IntExpr::Add(xs) => IntExpr::Add(lift_ints(xs, by_name, mk)?),
        IntExpr::Mul(xs) => IntExpr::Mul(lift_ints(xs, by_name, mk)?),
        IntExpr::Sub(a, b) => IntExpr::Sub(
            Box::new(lift_int(a, by_name, mk)?),
            Box::new(lift_int(b, by_name, mk)?),
        ),
        IntExpr::Div(a, b) => IntExpr::Div(
            Box::new(lift_int(a, by_name, mk)?),
            Box::new(lift_int(b, by_name, mk)?),
        ),
        IntExpr::Idx(arr, idx) => IntExpr::Idx(
            Box::new(lift_array(arr, by_name, mk)?),
            Box::new(lift_int(idx, by_name, mk)?),
        ),
    })
}

fn lift_ints(
    xs: &[IntExpr<String>],
    by_name: &HashMap<&str, &Variable>,
    mk: &dyn Fn(Variable) -> MarkedVar,
) -> Result<Vec<IntExpr<Sym<MarkedVar>>>, Error> {
    xs.iter().map(|x| lift_int(x, by_name, mk)).collect()
}

fn lift_bool(
    e: &BoolExpr<String>,
    by_name: &HashMap<&str, &Variable>,
    mk: &dyn Fn(Variable) -> MarkedVar,
) -> Result<BoolExpr<Sym<MarkedVar>>, Error> {
    Ok(match e {
        BoolExpr::Var(name) => BoolExpr::Var(Sym::reg(mk(lookup(by_name, name)?.clone()))),
        BoolExpr::Lit(b) => BoolExpr::Lit(*b),
        BoolExpr::And(xs) => BoolExpr::And(lift_bools(xs, by_name, mk)?),
        BoolExpr::Or(xs) => BoolExpr::Or(lift_bools(xs, by_name, mk)?),
        BoolExpr::Not(a) => BoolExpr::Not(Box::new(lift_bool(a, by_name, mk)?)),
        BoolExpr::Implies(a, b) => BoolExpr::Implies(
            Box::new(lift_bool(a, by_name, mk)?),
            Box::new(lift_bool(b, by_name, mk)?),
        ),
        BoolExpr::EqBool(a, b) => BoolExpr::EqBool(
            Box::new(lift_bool(a, by_name, mk)?),
            Box::new(lift_bool(b, by_name, mk)?),
        ),
        BoolExpr::EqInt(a, b) => BoolExpr::EqInt(
            Box::new(lift_int(a, by_name, mk)?),
            Box::new(lift_int(b, by_name, mk)?),
        ),
        BoolExpr::EqArray(a, b) => BoolExpr::EqArray(
            Box::new(lift_array(a, by_name, mk)?),
            Box::new(lift_array(b, by_name, mk)?),
        ),
        BoolExpr::Gt(a, b) => BoolExpr::Gt(
            Box::new(lift_int(a, by_name, mk)?),
            Box::new(lift_int(b, by_name, mk)?),
        ),
        BoolExpr::Ge(a, b) => BoolExpr::Ge(
            Box::new(lift_int(a, by_name, mk)?),
            Box::new(lift_int(b, by_name, mk)?),
        ),
        BoolExpr::Le(a, b) => BoolExpr::Le(
            Box::new(lift_int(a, by_name, mk)?),
            Box::new(lift_int(b, by_name, mk)?),
        ),
        BoolExpr::Lt(a, b) => BoolExpr::Lt(
            Box::new(lift_int(a, by_name, mk)?),
            Box::new(lift_int(b, by_name, mk)?),
        ),
        BoolExpr::Idx(arr, idx) => BoolExpr::Idx(
            Box::new(lift_array(arr, by_name, mk)?),
            Box::new(lift_int(idx, by_name, mk)?),
        ),
    })
}

fn lift_bools(
    xs: &[BoolExpr<String>],
    by_name: &HashMap<&str, &Variable>,
    mk: &dyn Fn(Variable) -> MarkedVar,
) -> Result<Vec<BoolExpr<Sym<MarkedVar>>>, Error> {
    xs.iter().map(|x| lift_bool(x, by_name, mk)).collect()
}

fn lift_array(
    e: &ArrayExpr<String>,
    by_name: &HashMap<&str, &Variable>,
    mk: &dyn Fn(Variable) -> MarkedVar,
) -> Result<ArrayExpr<Sym<MarkedVar>>, Error> {
    Ok(match e {
        ArrayExpr::Var(name) => ArrayExpr::Var(Sym::reg(mk(lookup(by_name, name)?.clone()))),
        ArrayExpr::Upd(arr, idx, val) => ArrayExpr::Upd(
            Box::new(lift_array(arr, by_name, mk)?),
            Box::new(lift_int(idx, by_name, mk)?),
            Box::new(lift_expr(val, by_name, mk)?),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::Type;

    fn vars() -> Vec<Variable> {
        vec![
            Variable::new("ticket", Type::Int),
            Variable::new("t", Type::Int),
        ]
    }

    #[test]
    fn produces_one_term_per_axiom_goal_pair() {
        let axiom = Axiom {
            wpre: GView::single(Guarded::new(
                BoolExpr::Lit(true),
                Func::new("p", vec![Expr::Int(IntExpr::Var("ticket".to_string()))]),
            )),
            cmd: BoolExpr::Lit(true),
        };
        let goals = vec![
            Func::new("g1", vec![Expr::Int(IntExpr::Var("t".to_string()))]),
            Func::new("g2", vec![Expr::Int(IntExpr::Var("t".to_string()))]),
        ];
        let terms = produce_terms(&[axiom], &goals, &vars(), None).unwrap();
        assert_eq!(terms.len(), 2);
        assert_eq!(
            terms[0].goal,
            Func::new(
                "g1",
                vec![Expr::Int(IntExpr::Var(Sym::reg(MarkedVar::goal(
                    0,
                    Variable::new("t", Type::Int)
                ))))]
            )
        );
        assert_eq!(
            terms[1].goal,
            Func::new(
                "g2",
                vec![Expr::Int(IntExpr::Var(Sym::reg(MarkedVar::goal(
                    1,
                    Variable::new("t", Type::Int)
                ))))]
            )
        );
        assert_eq!(terms[0].wpre.len(), 1);
        let g = terms[0].wpre.iter().next().unwrap();
        assert_eq!(
            g.item,
            Func::new(
                "p",
                vec![Expr::Int(IntExpr::Var(Sym::reg(MarkedVar::before(
                    Variable::new("ticket", Type::Int)
                ))))]
            )
        );
    }

    #[test]
    fn undeclared_variable_is_reported() {
        let axiom = Axiom {
            wpre: GView::empty(),
            cmd: BoolExpr::Lit(true),
        };
        let goals = vec![Func::new(
            "g",
            vec![Expr::Int(IntExpr::Var("nope".to_string()))],
        )];
        let err = produce_terms(&[axiom], &goals, &vars(), None).unwrap_err();
        assert!(matches!(err, Error::BadSemantics(_)));
    }

    #[test]
    fn term_display_shows_wpre_cmd_goal() {
        let axiom = Axiom {
            wpre: GView::empty(),
            cmd: BoolExpr::Lit(true),
        };
        let goals = vec![Func::new(
            "g",
            vec![Expr::Int(IntExpr::Var("t".to_string()))],
        )];
        let terms = produce_terms(&[axiom], &goals, &vars(), None).unwrap();
        let rendered = terms[0].to_string();
        assert!(rendered.contains("=>"));
        assert!(rendered.contains("g("));
    }

    #[test]
    fn approximation_runs_at_root_position() {
        let axiom = Axiom {
            wpre: GView::empty(),
            cmd: BoolExpr::Lit(true),
        };
        let goals = vec![Func::new(
            "g",
            vec![Expr::Int(IntExpr::Var("t".to_string()))],
        )];
        let mut seen = Vec::new();
        let mut f = |ctx: SubCtx, v: &Sym<MarkedVar>| -> Expr<Sym<MarkedVar>> {
            seen.push(ctx.sign);
            Expr::Int(IntExpr::Var(v.clone()))
        };
        let terms = produce_terms(&[axiom], &goals, &vars(), Some(&mut f)).unwrap();
        assert_eq!(terms.len(), 1);
        assert!(!seen.is_empty());
    }
}
