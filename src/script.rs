//! End-to-end driver over a whole collated script: composes `fill_block`,
//! schema instantiation, routine translation, and term construction into a
//! single entry point per method.

use crate::ast::RawElem;
use crate::command::{collect_command_semantics, FullBlock, FullCommand};
use crate::desugar::{fill_block, DesugarContext};
use crate::error::Error;
use crate::expr::Expr;
use crate::prim::PrimSemanticsMap;
use crate::term::{produce_terms, Axiom, Term};
use crate::var::{Type, Variable};
use crate::view::{Func, GView, ViewProto};

/// The core's whole input: shared/thread variable declarations, the view
/// prototypes already in scope, every method's raw command block, the
/// primitive semantics map, and a search-depth hint. The hint is carried
/// for the benefit of whatever proof search a caller builds on top of the
/// produced terms; the core itself does not consult it.
#[derive(Debug, Clone, PartialEq)]
pub struct CollatedScript {
    pub shared_vars: Vec<(Type, String)>,
    pub thread_vars: Vec<(Type, String)>,
    pub view_protos: Vec<ViewProto>,
    pub methods: Vec<(String, Vec<RawElem>)>,
    pub prim_semantics: PrimSemanticsMap,
    pub search_depth: u32,
}

/// Runs the whole pipeline over every method in `script`, in declaration
/// order, returning each method's terms grouped by method name.
pub fn produce_script_terms(script: &CollatedScript) -> Result<Vec<(String, Vec<Term>)>, Error> {
    script
        .methods
        .iter()
        .map(|(name, block)| Ok((name.clone(), produce_method_terms(script, block)?)))
        .collect()
}

fn produce_method_terms(script: &CollatedScript, block: &[RawElem]) -> Result<Vec<Term>, Error> {
    let mut ctx = DesugarContext::new(script.shared_vars.clone(), script.thread_vars.clone());
    ctx.existing_protos = script.view_protos.clone();

    let filled = fill_block(&mut ctx, block);

    let vars: Vec<Variable> = ctx
        .shared_vars
        .iter()
        .chain(ctx.thread_vars.iter())
        .map(|(ty, name)| Variable::new(name.clone(), ty.clone()))
        .collect();

    let axioms: Vec<Axiom> = collect_command_semantics(&filled, &script.prim_semantics, &vars)?
        .into_iter()
        .map(|(wpre, semantics)| Axiom {
            wpre,
            cmd: semantics.semantics,
        })
        .collect();

    let goals = postcondition_goals(&filled);

    produce_terms(&axioms, &goals, &vars, None)
}

/// A method's goal views are the individual guarded funcs of its own final
/// postcondition (the view after its last command, or its precondition if
/// the block carries no commands): the collated script's input carries
/// shared vars, thread vars, view prototypes, methods, primitive
/// semantics, and a search-depth hint, with no separate goals list, so
/// each method proves itself against the view it ends in.
fn postcondition_goals(block: &FullBlock<GView<String>, FullCommand>) -> Vec<Func<Expr<String>>> {
    let post = block.cmds.last().map(|(_, v)| v).unwrap_or(&block.pre);
    post.iter().map(|g| g.item.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Atomic, MarkedView, RawCommand, SynView};
    use crate::builtins::builtins;
    use crate::expr::IntExpr;
    use crate::prim::PrimCommand;

    /// A single-method ticket-lock script, driven end to end through
    /// `produce_script_terms`, with a declared precondition and
    /// postcondition view around one `fetch-and-add` call.
    #[test]
    fn ticket_lock_method_produces_one_term() {
        let pre_proto = ViewProto::new("p", vec![(Type::Int, "ticket".to_string())]);
        let script = CollatedScript {
            shared_vars: vec![(Type::Int, "ticket".to_string())],
            thread_vars: vec![(Type::Int, "t".to_string())],
            view_protos: vec![pre_proto],
            methods: vec![(
                "acquire".to_string(),
                vec![
                    RawElem::View(MarkedView::Unmarked(SynView::Func(Func::new(
                        "p",
                        vec![Expr::Int(IntExpr::Var("ticket".to_string()))],
                    )))),
                    RawElem::Cmd(RawCommand::Prim(vec![Atomic::APrim(PrimCommand {
                        name: "fetch-and-add".to_string(),
                        args: vec![Expr::Int(IntExpr::Var("ticket".to_string()))],
                        results: vec![Expr::Int(IntExpr::Var("t".to_string()))],
                    })])),
                ],
            )],
            prim_semantics: builtins(),
            search_depth: 0,
        };

        let grouped = produce_script_terms(&script).unwrap();
        assert_eq!(grouped.len(), 1);
        let (name, terms) = &grouped[0];
        assert_eq!(name, "acquire");
        assert_eq!(terms.len(), 1);
        assert!(terms[0].wpre.len() >= 1);
    }

    /// A method with no view annotations at all still gets one term: `cap`
    /// synthesizes an `Unknown` postcondition, which becomes the method's
    /// sole (advisory) goal view.
    #[test]
    fn method_with_no_declared_views_gets_synthesized_goal() {
        let script = CollatedScript {
            shared_vars: vec![(Type::Int, "x".to_string())],
            thread_vars: vec![],
            view_protos: vec![],
            methods: vec![(
                "noop".to_string(),
                vec![RawElem::Cmd(RawCommand::Prim(vec![]))],
            )],
            prim_semantics: builtins(),
            search_depth: 0,
        };

        let grouped = produce_script_terms(&script).unwrap();
        assert_eq!(grouped[0].1.len(), 1);
        assert!(grouped[0].1[0].goal.name.starts_with("__unknown_"));
    }
}
