//! Seed primitive semantics. Scaffolding, not proof search: enough schemas
//! to instantiate and translate the worked examples end to end without a
//! caller hand-authoring them first.

use crate::expr::{BoolExpr, Expr, IntExpr};
use crate::microcode::{LValuePath, Microcode};
use crate::prim::{PrimSemantics, PrimSemanticsMap, TypedVar};
use crate::var::Type;

/// `assign`, `fetch-and-add`, `cas`, `assign_bool`, `skip`.
pub fn builtins() -> PrimSemanticsMap {
    let mut m = PrimSemanticsMap::new();
    m.insert("assign".to_string(), assign());
    m.insert("assign_bool".to_string(), assign_bool());
    m.insert("fetch-and-add".to_string(), fetch_and_add());
    m.insert("cas".to_string(), cas());
    m.insert("skip".to_string(), skip());
    m
}

fn assign() -> PrimSemantics {
    PrimSemantics {
        args: vec![TypedVar::new("rhs", Type::Int)],
        results: vec![TypedVar::new("lhs", Type::Int)],
        body: vec![Microcode::Assign(
            LValuePath::var("lhs".to_string()),
            Some(Expr::Int(IntExpr::Var("rhs".to_string()))),
        )],
    }
}

fn assign_bool() -> PrimSemantics {
    PrimSemantics {
        args: vec![TypedVar::new("rhs", Type::Bool)],
        results: vec![TypedVar::new("lhs", Type::Bool)],
        body: vec![Microcode::Assign(
            LValuePath::var("lhs".to_string()),
            Some(Expr::Bool(BoolExpr::Var("rhs".to_string()))),
        )],
    }
}

/// `old := target; target := target + 1`.
fn fetch_and_add() -> PrimSemantics {
    PrimSemantics {
        args: vec![TypedVar::new("target", Type::Int)],
        results: vec![TypedVar::new("old", Type::Int)],
        body: vec![
            Microcode::Assign(
                LValuePath::var("old".to_string()),
                Some(Expr::Int(IntExpr::Var("target".to_string()))),
            ),
            Microcode::Assign(
                LValuePath::var("target".to_string()),
                Some(Expr::Int(IntExpr::Add(vec![
                    IntExpr::Var("target".to_string()),
                    IntExpr::Lit(1),
                ]))),
            ),
        ],
    }
}

/// Compare-and-swap: `target` is updated to `new` and `success` set to
/// `true` only if `target = expected` at the time of the call.
fn cas() -> PrimSemantics {
    let cond = BoolExpr::EqInt(
        Box::new(IntExpr::Var("target".to_string())),
        Box::new(IntExpr::Var("expected".to_string())),
    );
    PrimSemantics {
        args: vec![
            TypedVar::new("target", Type::Int),
            TypedVar::new("expected", Type::Int),
            TypedVar::new("new", Type::Int),
        ],
        results: vec![TypedVar::new("success", Type::Bool)],
        body: vec![Microcode::Branch(
            cond,
            vec![
                Microcode::Assign(
                    LValuePath::var("target".to_string()),
                    Some(Expr::Int(IntExpr::Var("new".to_string()))),
                ),
                Microcode::Assign(
                    LValuePath::var("success".to_string()),
                    Some(Expr::Bool(BoolExpr::Lit(true))),
                ),
            ],
            vec![Microcode::Assign(
                LValuePath::var("success".to_string()),
                Some(Expr::Bool(BoolExpr::Lit(false))),
            )],
        )],
    }
}

/// The zero-effect primitive.
fn skip() -> PrimSemantics {
    PrimSemantics {
        args: vec![],
        results: vec![],
        body: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prim::{instantiate, PrimCommand};

    #[test]
    fn fetch_and_add_instantiates_ticket_lock_microcode() {
        let schemas = builtins();
        let prim = PrimCommand {
            name: "fetch-and-add".to_string(),
            args: vec![Expr::Int(IntExpr::Var("ticket".to_string()))],
            results: vec![Expr::Int(IntExpr::Var("t".to_string()))],
        };
        let body = instantiate(&prim, &schemas).unwrap();
        assert_eq!(
            body,
            vec![
                Microcode::Assign(
                    LValuePath::var("t".to_string()),
                    Some(Expr::Int(IntExpr::Var("ticket".to_string())))
                ),
                Microcode::Assign(
                    LValuePath::var("ticket".to_string()),
                    Some(Expr::Int(IntExpr::Add(vec![
                        IntExpr::Var("ticket".to_string()),
                        IntExpr::Lit(1)
                    ])))
                ),
            ]
        );
    }

    #[test]
    fn cas_instantiates_branch_on_caller_expressions() {
        let schemas = builtins();
        let prim = PrimCommand {
            name: "cas".to_string(),
            args: vec![
                Expr::Int(IntExpr::Var("lock".to_string())),
                Expr::Int(IntExpr::Lit(0)),
                Expr::Int(IntExpr::Lit(1)),
            ],
            results: vec![Expr::Bool(BoolExpr::Var("ok".to_string()))],
        };
        let body = instantiate(&prim, &schemas).unwrap();
        assert_eq!(body.len(), 1);
        match &body[0] {
            Microcode::Branch(cond, then_, else_) => {
                assert_eq!(
                    cond,
                    &BoolExpr::EqInt(
                        Box::new(IntExpr::Var("lock".to_string())),
                        Box::new(IntExpr::Lit(0))
                    )
                );
                assert_eq!(then_.len(), 2);
                assert_eq!(else_.len(), 1);
            }
            other => panic!("expected Branch, got {:?}", other),
        }
    }

    #[test]
    fn skip_instantiates_to_empty_body() {
        let schemas = builtins();
        let prim = PrimCommand {
            name: "skip".to_string(),
            args: vec![],
            results: vec![],
        };
        assert_eq!(instantiate(&prim, &schemas).unwrap(), Vec::new());
    }
}
