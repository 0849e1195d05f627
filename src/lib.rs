//! Reduces view-based concurrent-program verification obligations to
//! SMT-ready terms: a front-to-middle-end pipeline from an annotated
//! program (views, methods, primitive semantics) to a set of
//! `{cmd; wpre; goal}` terms over a two-state Boolean encoding.

pub mod ast;
pub mod builtins;
pub mod command;
pub mod desugar;
pub mod error;
pub mod expr;
pub mod microcode;
pub mod prim;
pub mod script;
pub mod subst;
pub mod sym;
pub mod term;
pub mod var;
pub mod view;

pub use builtins::builtins;
pub use command::{collect_command_semantics, translate_command, CommandSemantics, FullBlock, FullCommand};
pub use desugar::{desugar_atomic, desugar_marked_view, desugar_view, fill_block, DesugarContext};
pub use error::{Error, StarlingResult};
pub use expr::{simp, ArrayExpr, BoolExpr, Expr, IntExpr, StageCounter};
pub use microcode::{normalize_assigns, LValuePath, Microcode, Write};
pub use prim::{instantiate, PrimCommand, PrimSemantics, PrimSemanticsMap, TypedVar};
pub use script::{produce_script_terms, CollatedScript};
pub use subst::{PositionAware, Sign, SubCtx};
pub use sym::Sym;
pub use term::{produce_terms, Axiom, Term};
pub use var::{MarkedVar, Type, Variable};
pub use view::{Func, GFunc, GView, Guarded, ViewProto};
