//! Minimal surface-syntax types the core consumes. The lexer/parser that
//! produce these are out of scope; this module only fixes the shapes
//! desugaring consumes.
//!
//! Raw variable occurrences are plain `String`s. Marking is introduced
//! later, during routine translation, not here.

use crate::expr::{BoolExpr, Expr};
use crate::prim::PrimCommand;
use crate::view::Func;

/// The syntactic view grammar desugaring operates on.
#[derive(Debug, Clone, PartialEq)]
pub enum SynView {
    Unit,
    Falsehood,
    /// A locally-lifted Boolean expression, e.g. `{| x > 0 |}`.
    Local(BoolExpr<String>),
    Func(Func<Expr<String>>),
    Join(Box<SynView>, Box<SynView>),
    If(BoolExpr<String>, Box<SynView>, Option<Box<SynView>>),
}

/// A view annotation as written by the user, including the three markers
/// desugaring singles out for special handling.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkedView {
    Unmarked(SynView),
    /// `{| ? v |}`: a view the author is unsure about, desugars the same as
    /// `Unmarked` (an Unmarked or Questioned view desugars to
    /// `Mandatory(result)`).
    Questioned(SynView),
    /// `{| ? |}`: a gap to be filled with a fresh view prototype.
    Unknown,
}

/// Whether a desugared view was written by the user (`Mandatory`) or
/// synthesized to fill a gap (`Advisory`).
#[derive(Debug, Clone, PartialEq)]
pub enum DesugarOutcome {
    Mandatory(crate::view::GView<String>),
    Advisory(crate::view::GView<String>),
}

impl DesugarOutcome {
    pub fn into_gview(self) -> crate::view::GView<String> {
        match self {
            DesugarOutcome::Mandatory(v) | DesugarOutcome::Advisory(v) => v,
        }
    }
}

/// A source-level atomic command, before `assert`/`error` are lowered to
/// assignments.
#[derive(Debug, Clone, PartialEq)]
pub enum Atomic {
    AAssert(BoolExpr<String>),
    AError,
    APrim(PrimCommand),
    ACond(BoolExpr<String>, Vec<Atomic>, Option<Vec<Atomic>>),
}

/// A desugared atomic: `assert`/`error` have become assignments to the
/// okay-Boolean; conditionals have been pushed down onto flat primitive
/// lists.
#[derive(Debug, Clone, PartialEq)]
pub enum DesugaredAtomic {
    DAPrim(PrimCommand),
    DACond(BoolExpr<String>, Vec<PrimCommand>, Vec<PrimCommand>),
}

/// One element of a raw block: either a view annotation or a command; a
/// block is a list of commands interleaved with view expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum RawElem {
    View(MarkedView),
    Cmd(RawCommand),
}

/// A not-yet-filled command; nested blocks are themselves `Vec<RawElem>`
/// until block-filling recurses into them.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCommand {
    Prim(Vec<Atomic>),
    If(BoolExpr<String>, Vec<RawElem>, Option<Vec<RawElem>>),
    While(BoolExpr<String>, Vec<RawElem>),
    DoWhile(Vec<RawElem>, BoolExpr<String>),
    Blocks(Vec<Vec<RawElem>>),
}
