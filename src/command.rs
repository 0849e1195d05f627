//! Routine-to-Boolean command semantics.
//!
//! A *routine* is a sequence of microcode listings ("stages"), composed
//! sequentially: each stage's lvalues take on that stage's marker, each
//! stage's rvalues read the marker last assigned to their variable (or
//! `Before` if never yet assigned). The whole routine collapses to one
//! `BoolExpr<Sym<MarkedVar>>`, closed with a frame over untouched
//! variables.

use std::collections::HashMap;

use crate::error::Error;
use crate::expr::{ArrayExpr, BoolExpr, Expr, IntExpr};
use crate::microcode::{normalize_assigns, LValuePath, Microcode};
use crate::prim::{instantiate, PrimSemanticsMap};
use crate::sym::Sym;
use crate::var::{MarkedVar, Type, Variable};
use crate::view::GView;

/// A block interleaving commands with the views that hold between them,
/// as produced by block-filling: `pre` is the view before the first
/// command, and each `(cmd, view)` pair is a command followed by the view
/// that holds after it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct FullBlock<V, C> {
    pub pre: V,
    pub cmds: Vec<(C, V)>,
}

/// A desugared, control-flow-bearing command.
#[derive(Debug, Clone, PartialEq)]
pub enum FullCommand {
    /// A straight-line atomic block: every primitive call runs as a single
    /// routine stage. A schema body with several sequential assigns is one
    /// stage, not one stage apiece.
    FPrim(Vec<crate::ast::DesugaredAtomic>),
    FIf(
        BoolExpr<String>,
        Box<FullBlock<GView<String>, FullCommand>>,
        Option<Box<FullBlock<GView<String>, FullCommand>>>,
    ),
    FWhile(BoolExpr<String>, Box<FullBlock<GView<String>, FullCommand>>),
    FDoWhile(Box<FullBlock<GView<String>, FullCommand>>, BoolExpr<String>),
    FBlocks(Vec<FullBlock<GView<String>, FullCommand>>),
}

/// The two-state Boolean semantics of a translated command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSemantics {
    pub cmd: FullCommand,
    pub semantics: BoolExpr<Sym<MarkedVar>>,
}

/// Translates a routine, a sequence of microcode listings, into its
/// two-state Boolean semantics.
pub fn translate_command(
    stages: &[Vec<Microcode<LValuePath<String>, String>>],
    vars: &[Variable],
) -> Result<BoolExpr<Sym<MarkedVar>>, Error> {
    let by_name: HashMap<String, Variable> =
        vars.iter().map(|v| (v.name.clone(), v.clone())).collect();
    let var_types: HashMap<String, Type> = vars
        .iter()
        .map(|v| (v.name.clone(), v.ty.clone()))
        .collect();

    let mut before: HashMap<String, MarkedVar> = vars
        .iter()
        .map(|v| (v.name.clone(), MarkedVar::Before(v.clone())))
        .collect();

    let last_index = stages.len().checked_sub(1);
    let mut conjuncts = Vec::with_capacity(stages.len());

    for (i, listing) in stages.iter().enumerate() {
        let marker_of = |v: &Variable| -> MarkedVar {
            if Some(i) == last_index {
                MarkedVar::After(v.clone())
            } else {
                MarkedVar::Intermediate(i as u32, v.clone())
            }
        };

        let normalized = normalize_listing(listing, &var_types)?;
        conjuncts.push(translate_listing(
            &normalized,
            &marker_of,
            &before,
            &by_name,
        )?);

        for assigned in assigned_vars(&normalized) {
            let variable = by_name.get(&assigned).ok_or_else(|| {
                Error::BadSemantics(format!("assignment to undeclared variable '{}'", assigned))
            })?;
            before.insert(assigned, marker_of(variable));
        }
    }

    // Frame: every variable whose latest marker isn't `After` gets pinned
    // to its post-state value, in declaration order.
    for v in vars {
        if let Some(marker) = before.get(&v.name) {
            if !matches!(marker, MarkedVar::After(_)) {
                let after = Sym::Reg(MarkedVar::After(v.clone()));
                let latest = Sym::Reg(marker.clone());
                conjuncts.push(frame_equality(&v.ty, after, latest));
            }
        }
    }

    Ok(crate::expr::simp(&BoolExpr::And(conjuncts)))
}

/// Walks a filled block, producing one `CommandSemantics`, paired with the
/// view that holds immediately before it runs, for every atomic (`FPrim`)
/// leaf reached. Control-flow nodes contribute no semantics of their own:
/// each atomic step between two view checkpoints is its own proof
/// obligation, so `FIf`/`FWhile`/`FDoWhile`/`FBlocks` only recurse into the
/// sub-blocks they carry.
pub fn collect_command_semantics(
    block: &FullBlock<GView<String>, FullCommand>,
    schemas: &PrimSemanticsMap,
    vars: &[Variable],
) -> Result<Vec<(GView<String>, CommandSemantics)>, Error> {
    let mut out = Vec::new();
    collect_block(block, schemas, vars, &mut out)?;
    Ok(out)
}

fn collect_block(
    block: &FullBlock<GView<String>, FullCommand>,
    schemas: &PrimSemanticsMap,
    vars: &[Variable],
    out: &mut Vec<(GView<String>, CommandSemantics)>,
) -> Result<(), Error> {
    let mut pre = block.pre.clone();
    for (cmd, post) in &block.cmds {
        collect_command(cmd, &pre, schemas, vars, out)?;
        pre = post.clone();
    }
    Ok(())
}

fn collect_command(
    cmd: &FullCommand,
    pre: &GView<String>,
    schemas: &PrimSemanticsMap,
    vars: &[Variable],
    out: &mut Vec<(GView<String>, CommandSemantics)>,
) -> Result<(), Error> {
    match cmd {
        FullCommand::FPrim(atoms) => {
            let stage = lower_atoms(atoms, schemas)?;
            let semantics = translate_command(&[stage], vars)?;
            out.push((
                pre.clone(),
                CommandSemantics {
                    cmd: cmd.clone(),
                    semantics,
                },
            ));
            Ok(())
        }
        FullCommand::FIf(_, then_block, else_block) => {
            collect_block(then_block, schemas, vars, out)?;
            if let Some(e) = else_block {
                collect_block(e, schemas, vars, out)?;
            }
            Ok(())
        }
        FullCommand::FWhile(_, body) | FullCommand::FDoWhile(body, _) => {
            collect_block(body, schemas, vars, out)
        }
        FullCommand::FBlocks(blocks) => {
            for b in blocks {
                collect_block(b, schemas, vars, out)?;
            }
            Ok(())
        }
    }
}

/// Instantiates and flattens a primitive set into one routine stage: a
/// `DAPrim` contributes its instantiated schema body directly; a `DACond`
/// becomes a single `Microcode::Branch` wrapping each arm's instantiated
/// bodies, so a flattened conditional atomic still runs as one step.
fn lower_atoms(
    atoms: &[crate::ast::DesugaredAtomic],
    schemas: &PrimSemanticsMap,
) -> Result<Vec<Microcode<LValuePath<String>, String>>, Error> {
    use crate::ast::DesugaredAtomic;

    let mut out = Vec::new();
    for atom in atoms {
        match atom {
            DesugaredAtomic::DAPrim(p) => out.extend(instantiate(p, schemas)?),
            DesugaredAtomic::DACond(cond, then_, else_) => {
                let then_body = then_
                    .iter()
                    .map(|p| instantiate(p, schemas))
                    .collect::<Result<Vec<_>, _>>()?
                    .into_iter()
                    .flatten()
                    .collect();
                let else_body = else_
                    .iter()
                    .map(|p| instantiate(p, schemas))
                    .collect::<Result<Vec<_>, _>>()?
                    .into_iter()
                    .flatten()
                    .collect();
                out.push(Microcode::Branch(cond.clone(), then_body, else_body));
            }
        }
    }
    Ok(out)
}

fn frame_equality(
    ty: &Type,
    after: Sym<MarkedVar>,
    latest: Sym<MarkedVar>,
) -> BoolExpr<Sym<MarkedVar>> {
    match ty {
        Type::Bool => BoolExpr::EqBool(
            Box::new(BoolExpr::Var(after)),
            Box::new(BoolExpr::Var(latest)),
        ),
        Type::Array(..) => BoolExpr::EqArray(
            Box::new(ArrayExpr::Var(after)),
            Box::new(ArrayExpr::Var(latest)),
        ),
        Type::Int => BoolExpr::EqInt(
            Box::new(IntExpr::Var(after)),
            Box::new(IntExpr::Var(latest)),
        ),
    }
}

/// Normalizes the assignments within one stage listing, grouping only
/// consecutive `Assign`s; an `Assume`/`Branch` boundary separates
/// independent write groups. Recurses into `Branch` arms, each of which is
/// normalized as its own listing.
fn normalize_listing(
    listing: &[Microcode<LValuePath<String>, String>],
    var_types: &HashMap<String, Type>,
) -> Result<Vec<Microcode<String, String>>, Error> {
    let mut out = Vec::new();
    let mut pending: Vec<(LValuePath<String>, Option<Expr<String>>)> = Vec::new();

    let flush = |pending: &mut Vec<(LValuePath<String>, Option<Expr<String>>)>,
                 out: &mut Vec<Microcode<String, String>>|
     -> Result<(), Error> {
        if pending.is_empty() {
            return Ok(());
        }
        let normalized = normalize_assigns(pending, var_types, |v: &String| v.clone())?;
        out.extend(
            normalized
                .into_iter()
                .map(|(v, rv)| Microcode::Assign(v, rv)),
        );
        pending.clear();
        Ok(())
    };

    for m in listing {
        match m {
            Microcode::Assign(lv, rv) => pending.push((lv.clone(), rv.clone())),
            Microcode::Assume(c) => {
                flush(&mut pending, &mut out)?;
                out.push(Microcode::Assume(c.clone()));
            }
            Microcode::Branch(c, t, e) => {
                flush(&mut pending, &mut out)?;
                let t = normalize_listing(t, var_types)?;
                let e = normalize_listing(e, var_types)?;
                out.push(Microcode::Branch(c.clone(), t, e));
            }
        }
    }
    flush(&mut pending, &mut out)?;
    Ok(out)
}

/// Every variable assigned anywhere in a normalized listing, including
/// inside nested `Branch` arms: a `Branch` stage advances the state map
/// for every variable it assigns in either arm.
fn assigned_vars(listing: &[Microcode<String, String>]) -> Vec<String> {
    let mut out = Vec::new();
    for m in listing {
        match m {
            Microcode::Assign(v, _) => out.push(v.clone()),
            Microcode::Assume(_) => {}
            Microcode::Branch(_, t, e) => {
                out.extend(assigned_vars(t));
                out.extend(assigned_vars(e));
            }
        }
    }
    out
}

fn translate_listing(
    listing: &[Microcode<String, String>],
    marker_of: &impl Fn(&Variable) -> MarkedVar,
    before: &HashMap<String, MarkedVar>,
    by_name: &HashMap<String, Variable>,
) -> Result<BoolExpr<Sym<MarkedVar>>, Error> {
    let mut conjuncts = Vec::with_capacity(listing.len());
    for m in listing {
        conjuncts.push(translate_microcode(m, marker_of, before, by_name)?);
    }
    Ok(BoolExpr::And(conjuncts))
}

fn translate_microcode(
    m: &Microcode<String, String>,
    marker_of: &impl Fn(&Variable) -> MarkedVar,
    before: &HashMap<String, MarkedVar>,
    by_name: &HashMap<String, Variable>,
) -> Result<BoolExpr<Sym<MarkedVar>>, Error> {
    match m {
        Microcode::Assign(name, None) => {
            let _ = by_name.get(name).ok_or_else(|| {
                Error::BadSemantics(format!("assignment to undeclared variable '{}'", name))
            })?;
            Ok(BoolExpr::Lit(true))
        }
        Microcode::Assign(name, Some(rv)) => {
            let variable = by_name.get(name).ok_or_else(|| {
                Error::BadSemantics(format!("assignment to undeclared variable '{}'", name))
            })?;
            let lhs_marker = marker_of(variable);
            let rhs = lift_expr(rv, before)?;
            Ok(assign_equality(lhs_marker, rhs))
        }
        Microcode::Assume(c) => lift_bool(c, before),
        Microcode::Branch(c, t, e) => {
            let cond = lift_bool(c, before)?;
            let then_conj = translate_listing(t, marker_of, before, by_name)?;
            let else_conj = translate_listing(e, marker_of, before, by_name)?;
            Ok(BoolExpr::And(vec![
                BoolExpr::Implies(Box::new(cond.clone()), Box::new(then_conj)),
                BoolExpr::Implies(Box::new(BoolExpr::Not(Box::new(cond))), Box::new(else_conj)),
            ]))
        }
    }
}

fn assign_equality(lhs: MarkedVar, rhs: Expr<Sym<MarkedVar>>) -> BoolExpr<Sym<MarkedVar>> {
    let lhs = Sym::Reg(lhs);
    match rhs {
        Expr::Int(i) => BoolExpr::EqInt(Box::new(IntExpr::Var(lhs)), Box::new(i)),
        Expr::Bool(b) => BoolExpr::EqBool(Box::new(BoolExpr::Var(lhs)), Box::new(b)),
        Expr::Array(_, _, a) => BoolExpr::EqArray(Box::new(ArrayExpr::Var(lhs)), Box::new(a)),
    }
}

fn resolve(name: &str, before: &HashMap<String, MarkedVar>) -> Result<MarkedVar, Error> {
    before
        .get(name)
        .cloned()
        .ok_or_else(|| Error::BadSemantics(format!("read of undeclared variable '{}'", name)))
}

fn lift_expr(
    e: &Expr<String>,
    before: &HashMap<String, MarkedVar>,
) -> Result<Expr<Sym<MarkedVar>>, Error> {
    Ok(match e {
        Expr::Int(i) => Expr::Int(lift_int(i, before)?),
        Expr::Bool(b) => Expr::Bool(lift_bool(b, before)?),
        Expr::Array(ty, len, a) => Expr::Array(ty.clone(), *len, lift_array(a, before)?),
    })
}

fn lift_int(
    e: &IntExpr<String>,
    before: &HashMap<String, MarkedVar>,
) -> Result<IntExpr<Sym<MarkedVar>>, Error> {
    Ok(match e {
        IntExpr::Var(v) => IntExpr::Var(Sym::Reg(resolve(v, before)?)),
        IntExpr::Lit(n) => IntExpr::Lit(*n),
        IntExpr::Add(xs) => IntExpr::Add(lift_ints(xs, before)?),
        IntExpr::Mul(xs) => IntExpr::Mul(lift_ints(xs, before)?),
        IntExpr::Sub(a, b) => IntExpr::Sub(
            Box::new(lift_int(a, before)?),
            Box::new(lift_int(b, before)?),
        ),
        IntExpr::Div(a, b) => IntExpr::Div(
            Box::new(lift_int(a, before)?),
            Box::new(lift_int(b, before)?),
        ),
        IntExpr::Idx(arr, idx) => IntExpr::Idx(
            Box::new(lift_array(arr, before)?),
            Box::new(lift_int(idx, before)?),
        ),
    })
}

fn lift_ints(
    xs: &[IntExpr<String>],
    before: &HashMap<String, MarkedVar>,
) -> Result<Vec<IntExpr<Sym<MarkedVar>>>, Error> {
    xs.iter().map(|x| lift_int(x, before)).collect()
}

fn lift_bool(
    e: &BoolExpr<String>,
    before: &HashMap<String, MarkedVar>,
) -> Result<BoolExpr<Sym<MarkedVar>>, Error> {
    Ok(match e {
        BoolExpr::Var(v) => BoolExpr::Var(Sym::Reg(resolve(v, before)?)),
        BoolExpr::Lit(b) => BoolExpr::Lit(*b),
        BoolExpr::And(xs) => BoolExpr::And(lift_bools(xs, before)?),
        BoolExpr::Or(xs) => BoolExpr::Or(lift_bools(xs, before)?),
        BoolExpr::Not(a) => BoolExpr::Not(Box::new(lift_bool(a, before)?)),
        BoolExpr::Implies(a, b) => BoolExpr::Implies(
            Box::new(lift_bool(a, before)?),
            Box::new(lift_bool(b, before)?),
        ),
        BoolExpr::EqInt(a, b) => BoolExpr::EqInt(
            Box::new(lift_int(a, before)?),
            Box::new(lift_int(b, before)?),
        ),
        BoolExpr::EqBool(a, b) => BoolExpr::EqBool(
            Box::new(lift_bool(a, before)?),
            Box::new(lift_bool(b, before)?),
        ),
        BoolExpr::EqArray(a, b) => BoolExpr::EqArray(
            Box::new(lift_array(a, before)?),
            Box::new(lift_array(b, before)?),
        ),
        BoolExpr::Gt(a, b) => BoolExpr::Gt(
            Box::new(lift_int(a, before)?),
            Box::new(lift_int(b, before)?),
        ),
        BoolExpr::Ge(a, b) => BoolExpr::Ge(
            Box::new(lift_int(a, before)?),
            Box::new(lift_int(b, before)?),
        ),
        BoolExpr::Le(a, b) => BoolExpr::Le(
            Box::new(lift_int(a, before)?),
            Box::new(lift_int(b, before)?),
        ),
        BoolExpr::Lt(a, b) => BoolExpr::Lt(
            Box::new(lift_int(a, before)?),
            Box::new(lift_int(b, before)?),
        ),
        BoolExpr::Idx(arr, idx) => BoolExpr::Idx(
            Box::new(lift_array(arr, before)?),
            Box::new(lift_int(idx, before)?),
        ),
    })
}

fn lift_bools(
    xs: &[BoolExpr<String>],
    before: &HashMap<String, MarkedVar>,
) -> Result<Vec<BoolExpr<Sym<MarkedVar>>>, Error> {
    xs.iter().map(|x| lift_bool(x, before)).collect()
}

fn lift_array(
    e: &ArrayExpr<String>,
    before: &HashMap<String, MarkedVar>,
) -> Result<ArrayExpr<Sym<MarkedVar>>, Error> {
    Ok(match e {
        ArrayExpr::Var(v) => ArrayExpr::Var(Sym::Reg(resolve(v, before)?)),
        ArrayExpr::Upd(arr, idx, val) => ArrayExpr::Upd(
            Box::new(lift_array(arr, before)?),
            Box::new(lift_int(idx, before)?),
            Box::new(lift_expr(val, before)?),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::microcode::LValuePath;

    fn var(name: &str, ty: Type) -> Variable {
        Variable::new(name, ty)
    }

    /// `t := ticket; ticket := ticket + 1` as a single stage (one
    /// primitive's schema body) simplifies to
    /// `t!after = ticket!before && ticket!after = ticket!before + 1`.
    #[test]
    fn ticket_lock_fetch_semantics() {
        let vars = vec![var("t", Type::Int), var("ticket", Type::Int)];
        let stage = vec![
            Microcode::Assign(
                LValuePath::var("t".to_string()),
                Some(Expr::Int(IntExpr::Var("ticket".to_string()))),
            ),
            Microcode::Assign(
                LValuePath::var("ticket".to_string()),
                Some(Expr::Int(IntExpr::Add(vec![
                    IntExpr::Var("ticket".to_string()),
                    IntExpr::Lit(1),
                ]))),
            ),
        ];
        let result = translate_command(&[stage], &vars).unwrap();

        let t_after = Sym::Reg(MarkedVar::after(var("t", Type::Int)));
        let ticket_before = Sym::Reg(MarkedVar::before(var("ticket", Type::Int)));
        let ticket_after = Sym::Reg(MarkedVar::after(var("ticket", Type::Int)));

        let expected = BoolExpr::And(vec![
            BoolExpr::EqInt(
                Box::new(IntExpr::Var(t_after)),
                Box::new(IntExpr::Var(ticket_before.clone())),
            ),
            BoolExpr::EqInt(
                Box::new(IntExpr::Var(ticket_after)),
                Box::new(IntExpr::Add(vec![
                    IntExpr::Var(ticket_before),
                    IntExpr::Lit(1),
                ])),
            ),
        ]);
        assert_eq!(result, expected);
    }

    #[test]
    fn untouched_variable_gets_frame_equality() {
        let vars = vec![var("x", Type::Int), var("y", Type::Int)];
        let stage = vec![Microcode::Assign(
            LValuePath::var("x".to_string()),
            Some(Expr::Int(IntExpr::Lit(0))),
        )];
        let result = translate_command(&[stage], &vars).unwrap();
        let y_after = Sym::Reg(MarkedVar::after(var("y", Type::Int)));
        let y_before = Sym::Reg(MarkedVar::before(var("y", Type::Int)));
        let frame = BoolExpr::EqInt(
            Box::new(IntExpr::Var(y_after)),
            Box::new(IntExpr::Var(y_before)),
        );
        match &result {
            BoolExpr::And(xs) => assert!(xs.contains(&frame)),
            other => panic!("expected a conjunction, got {:?}", other),
        }
    }

    #[test]
    fn branch_conjoins_both_arms_under_implication() {
        let vars = vec![var("x", Type::Int), var("c", Type::Bool)];
        let stage = vec![Microcode::Branch(
            BoolExpr::Var("c".to_string()),
            vec![Microcode::Assign(
                LValuePath::var("x".to_string()),
                Some(Expr::Int(IntExpr::Lit(1))),
            )],
            vec![Microcode::Assign(
                LValuePath::var("x".to_string()),
                Some(Expr::Int(IntExpr::Lit(2))),
            )],
        )];
        let result = translate_command(&[stage], &vars).unwrap();
        // Both branches assign x, so no frame equality for x should appear,
        // and the result conjoins two implications plus c's own frame.
        match &result {
            BoolExpr::And(xs) => assert_eq!(xs.len(), 3),
            other => panic!("expected a conjunction, got {:?}", other),
        }
    }
}
