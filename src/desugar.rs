//! View and atomic-command desugaring.

use crate::ast::{
    Atomic, DesugarOutcome, DesugaredAtomic, MarkedView, RawCommand, RawElem, SynView,
};
use crate::command::{FullBlock, FullCommand};
use crate::expr::{BoolExpr, Expr, IntExpr};
use crate::var::Type;
use crate::view::{Func, GFunc, GView, Guarded, ViewProto};

/// State threaded through desugaring.
///
/// Invariants: names in `generated_protos ∪ existing_protos` are unique;
/// `okay_bool`, when present, occurs in `shared_vars` with type `Bool`;
/// `local_lift_view`, when present, has exactly one `Bool` parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct DesugarContext {
    pub shared_vars: Vec<(Type, String)>,
    pub thread_vars: Vec<(Type, String)>,
    pub local_lift_view: Option<String>,
    pub generated_protos: Vec<ViewProto>,
    pub existing_protos: Vec<ViewProto>,
    pub okay_bool: Option<String>,
    next_fresh: u32,
}

impl DesugarContext {
    pub fn new(shared_vars: Vec<(Type, String)>, thread_vars: Vec<(Type, String)>) -> Self {
        DesugarContext {
            shared_vars,
            thread_vars,
            local_lift_view: None,
            generated_protos: Vec::new(),
            existing_protos: Vec::new(),
            okay_bool: None,
            next_fresh: 0,
        }
    }

    fn all_names(&self) -> impl Iterator<Item = &str> {
        self.generated_protos
            .iter()
            .map(|p| p.name.as_str())
            .chain(self.existing_protos.iter().map(|p| p.name.as_str()))
    }

    /// Spins the fresh-name counter until `prefix_N` names nothing already
    /// in `generated_protos ∪ existing_protos`.
    fn fresh_proto_name(&mut self, prefix: &str) -> String {
        loop {
            let candidate = format!("{}{}", prefix, self.next_fresh);
            self.next_fresh += 1;
            if !self.all_names().any(|n| n == candidate) {
                return candidate;
            }
        }
    }

    fn all_var_names(&self) -> impl Iterator<Item = &str> {
        self.shared_vars
            .iter()
            .map(|(_, n)| n.as_str())
            .chain(self.thread_vars.iter().map(|(_, n)| n.as_str()))
    }

    /// Smallest unused `__ok_N` among shared and thread variable names.
    fn fresh_ok_name(&self) -> String {
        let mut n = 0u32;
        loop {
            let candidate = format!("__ok_{}", n);
            if !self.all_var_names().any(|v| v == candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Desugars a syntactic view under guard `suffix` into a guarded-view
/// multiset.
pub fn desugar_view(
    ctx: &mut DesugarContext,
    view: &SynView,
    suffix: &BoolExpr<String>,
) -> GView<String> {
    match view {
        SynView::Unit => GView::empty(),

        SynView::Falsehood => desugar_view(ctx, &SynView::Local(BoolExpr::Lit(false)), suffix),

        SynView::Local(expr) => {
            let lift_name = ctx.local_lift_view.clone().unwrap_or_else(|| {
                let name = ctx.fresh_proto_name("__lift_");
                ctx.generated_protos.push(ViewProto::new(
                    name.clone(),
                    vec![(Type::Bool, "x".to_string())],
                ));
                ctx.local_lift_view = Some(name.clone());
                name
            });
            let func = Func::new(lift_name, vec![Expr::Bool(expr.clone())]);
            desugar_view(ctx, &SynView::Func(func), suffix)
        }

        SynView::Func(f) => GView::single(Guarded::new(suffix.clone(), f.clone())),

        SynView::Join(a, b) => {
            let left = desugar_view(ctx, a, suffix);
            let right = desugar_view(ctx, b, suffix);
            left.join(right)
        }

        SynView::If(c, t, e) => {
            let then_suffix = conjoin(suffix, c);
            let else_suffix = conjoin(suffix, &BoolExpr::Not(Box::new(c.clone())));
            let then_part = desugar_view(ctx, t, &then_suffix);
            let else_view = e.as_deref().cloned().unwrap_or(SynView::Unit);
            let else_part = desugar_view(ctx, &else_view, &else_suffix);
            then_part.join(else_part)
        }
    }
}

/// `suffix ∧ c`, but skips the conjunction when `suffix` is the literal
/// `True`.
fn conjoin(suffix: &BoolExpr<String>, c: &BoolExpr<String>) -> BoolExpr<String> {
    if *suffix == BoolExpr::Lit(true) {
        c.clone()
    } else {
        BoolExpr::And(vec![suffix.clone(), c.clone()])
    }
}

/// Desugars a marked view.
pub fn desugar_marked_view(ctx: &mut DesugarContext, view: &MarkedView) -> DesugarOutcome {
    match view {
        MarkedView::Unmarked(v) | MarkedView::Questioned(v) => {
            DesugarOutcome::Mandatory(desugar_view(ctx, v, &BoolExpr::Lit(true)))
        }
        MarkedView::Unknown => {
            let name = ctx.fresh_proto_name("__unknown_");
            let params: Vec<(Type, String)> = ctx.thread_vars.clone();
            ctx.generated_protos
                .push(ViewProto::new(name.clone(), params.clone()));
            let args: Vec<Expr<String>> = params
                .iter()
                .map(|(ty, n)| var_expr(ty, n.clone()))
                .collect();
            let func: GFunc<String> = Guarded::new(BoolExpr::Lit(true), Func::new(name, args));
            DesugarOutcome::Advisory(GView::single(func))
        }
    }
}

fn var_expr(ty: &Type, name: String) -> Expr<String> {
    match ty {
        Type::Bool => Expr::Bool(BoolExpr::Var(name)),
        Type::Array(elt, len) => {
            Expr::Array((**elt).clone(), *len, crate::expr::ArrayExpr::Var(name))
        }
        Type::Int => Expr::Int(IntExpr::Var(name)),
    }
}

/// Desugars an atomic command.
pub fn desugar_atomic(ctx: &mut DesugarContext, atomic: &Atomic) -> Vec<DesugaredAtomic> {
    match atomic {
        Atomic::AAssert(e) => vec![assert_to_prim(ctx, e.clone())],
        Atomic::AError => vec![assert_to_prim(ctx, BoolExpr::Lit(false))],
        Atomic::APrim(p) => vec![DesugaredAtomic::DAPrim(p.clone())],
        Atomic::ACond(c, t, f) => {
            let then_prims = flatten_prims(ctx, t);
            let else_prims = f
                .as_ref()
                .map(|f| flatten_prims(ctx, f))
                .unwrap_or_default();
            vec![DesugaredAtomic::DACond(c.clone(), then_prims, else_prims)]
        }
    }
}

/// Flattens a conditional branch's atomics to primitives; a nested
/// `ACond` inside a branch has no counterpart in `DesugaredAtomic` (whose
/// `DACond` branches are flat `PrimCommand` lists), so branches are
/// expected to be conditional-free at this depth.
fn flatten_prims(ctx: &mut DesugarContext, atomics: &[Atomic]) -> Vec<crate::prim::PrimCommand> {
    atomics
        .iter()
        .flat_map(|a| desugar_atomic(ctx, a))
        .map(|d| match d {
            DesugaredAtomic::DAPrim(p) => p,
            DesugaredAtomic::DACond(..) => {
                unreachable!("nested conditionals are flattened one level at a time by the caller")
            }
        })
        .collect()
}

/// `ok := e`, allocating the context's okay-Boolean on first use.
fn assert_to_prim(ctx: &mut DesugarContext, e: BoolExpr<String>) -> DesugaredAtomic {
    let ok = ctx.okay_bool.clone().unwrap_or_else(|| {
        let name = ctx.fresh_ok_name();
        ctx.shared_vars.insert(0, (Type::Bool, name.clone()));
        ctx.okay_bool = Some(name.clone());
        name
    });
    DesugaredAtomic::DAPrim(crate::prim::PrimCommand {
        name: "assign_bool".to_string(),
        args: vec![Expr::Bool(e)],
        results: vec![Expr::Bool(BoolExpr::Var(ok))],
    })
}

/// Fills a raw block with views at every gap, desugars every view position
/// left-to-right threading the context, and recurses into whatever nested
/// blocks the block's own commands carry (an `If`/`While`/`DoWhile`/`Blocks`
/// body is itself filled the same way, not left raw).
pub fn fill_block(ctx: &mut DesugarContext, block: &[RawElem]) -> FullBlock<GView<String>, FullCommand> {
    let capped = cap(block);
    let slid = slide(&capped);

    let mut slots = slid.into_iter();
    let (_, first_view) = slots
        .next()
        .expect("a capped block always starts with a view");
    let pre = desugar_marked_view(ctx, &first_view).into_gview();

    let cmds = slots
        .map(|(cmd, view)| {
            let cmd = cmd.expect("every non-initial slot carries a command, real or skip");
            let full = fill_command(ctx, &cmd);
            (full, desugar_marked_view(ctx, &view).into_gview())
        })
        .collect();

    FullBlock { pre, cmds }
}

/// Lowers one raw command to a control-flow-bearing `FullCommand`,
/// recursing into each nested block through `fill_block` so that a method's
/// whole command tree gets filled and desugared, not just its top level.
fn fill_command(ctx: &mut DesugarContext, cmd: &RawCommand) -> FullCommand {
    match cmd {
        RawCommand::Prim(atoms) => {
            let prims = atoms.iter().flat_map(|a| desugar_atomic(ctx, a)).collect();
            FullCommand::FPrim(prims)
        }
        RawCommand::If(cond, then_body, else_body) => {
            let then_block = fill_block(ctx, then_body);
            let else_block = else_body.as_ref().map(|b| Box::new(fill_block(ctx, b)));
            FullCommand::FIf(cond.clone(), Box::new(then_block), else_block)
        }
        RawCommand::While(cond, body) => {
            FullCommand::FWhile(cond.clone(), Box::new(fill_block(ctx, body)))
        }
        RawCommand::DoWhile(body, cond) => {
            FullCommand::FDoWhile(Box::new(fill_block(ctx, body)), cond.clone())
        }
        RawCommand::Blocks(blocks) => {
            FullCommand::FBlocks(blocks.iter().map(|b| fill_block(ctx, b)).collect())
        }
    }
}

/// Ensures the block starts and ends with a view.
fn cap(block: &[RawElem]) -> Vec<RawElem> {
    let mut out = Vec::with_capacity(block.len() + 2);
    if !matches!(block.first(), Some(RawElem::View(_))) {
        out.push(RawElem::View(MarkedView::Unknown));
    }
    out.extend(block.iter().cloned());
    if !matches!(block.last(), Some(RawElem::View(_))) {
        out.push(RawElem::View(MarkedView::Unknown));
    }
    out
}

/// `skip`: the zero-effect primitive inserted between two adjacent view
/// annotations.
fn skip_prim() -> RawCommand {
    RawCommand::Prim(vec![])
}

/// Pairwise slide over the capped block, producing `(Option<command>,
/// view)` pairs: the first pair's command is always `None` (it becomes
/// `pre`); every later pair carries the command that precedes its view,
/// a `skip`-prim when two views were directly adjacent, a synthesized
/// `Unknown` view when two commands were directly adjacent.
fn slide(capped: &[RawElem]) -> Vec<(Option<RawCommand>, MarkedView)> {
    let mut out = Vec::new();
    let mut i = 0;
    let mut started = false;

    while i < capped.len() {
        match &capped[i] {
            RawElem::View(v) => {
                if !started {
                    out.push((None, v.clone()));
                    started = true;
                } else {
                    out.push((Some(skip_prim()), v.clone()));
                }
                i += 1;
            }
            RawElem::Cmd(c) => {
                let mut cmd = c.clone();
                i += 1;
                while let Some(RawElem::Cmd(next)) = capped.get(i) {
                    out.push((Some(cmd), MarkedView::Unknown));
                    cmd = next.clone();
                    i += 1;
                }
                if let Some(RawElem::View(v)) = capped.get(i) {
                    out.push((Some(cmd), v.clone()));
                    i += 1;
                }
            }
        }
    }
    out
}
