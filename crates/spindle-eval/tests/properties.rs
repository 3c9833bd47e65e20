//! Property tests: installing a handler that is never triggered, or one that
//! always resumes with the performed argument, does not change results.

use proptest::prelude::*;
use spindle_ast::ast::{BinOp, Expr, HandlerDef, Lit};
use spindle_ast::op::Op;
use spindle_eval::{evaluate, EvalError};

fn run(expr: &Expr) -> Result<Lit, EvalError> {
    evaluate(expr).map(|v| v.to_lit().expect("data result"))
}

/// Effect-free integer expressions.
fn pure_expr() -> impl Strategy<Value = Expr> {
    let leaf = (-10i64..10).prop_map(Expr::int);
    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Expr::binary(l, BinOp::Add, r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Expr::binary(l, BinOp::Sub, r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Expr::binary(l, BinOp::Mul, r)),
            (inner.clone(), inner.clone(), inner.clone()).prop_map(|(a, b, c)| {
                Expr::if_else(Expr::binary(a, BinOp::Lt, Expr::int(0)), b, c)
            }),
            (inner.clone(), inner).prop_map(|(v, body)| {
                Expr::let_in("t", v, Expr::binary(Expr::var("t"), BinOp::Add, body))
            }),
        ]
    })
}

/// Wrap every literal leaf in `perform ask <leaf>`.
fn ask_leaves(e: &Expr) -> Expr {
    match e {
        Expr::Lit(_) => Expr::perform(Op::Ask, e.clone()),
        Expr::Binary { lhs, op, rhs } => Expr::binary(ask_leaves(lhs), *op, ask_leaves(rhs)),
        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => Expr::if_else(
            ask_leaves(cond),
            ask_leaves(then_branch),
            ask_leaves(else_branch),
        ),
        Expr::Let { name, value, body } => {
            Expr::let_in(name, ask_leaves(value), ask_leaves(body))
        }
        other => other.clone(),
    }
}

proptest! {
    #[test]
    fn unused_handler_is_transparent(e in pure_expr()) {
        let handled = Expr::handle(
            HandlerDef::new()
                .on(Op::Ask, "k", "x", Expr::int(0))
                .returning("r", Expr::binary(Expr::var("r"), BinOp::Add, Expr::int(1))),
            e.clone(),
        );
        let expected = run(&e).map(|lit| match lit {
            Lit::Int(n) => Lit::Int(n + 1),
            other => other,
        });
        prop_assert_eq!(run(&handled), expected);
    }

    #[test]
    fn identity_resumption_preserves_result(e in pure_expr()) {
        let handled = Expr::handle(
            HandlerDef::new().on(Op::Ask, "k", "x", Expr::resume(Expr::var("k"), Expr::var("x"))),
            ask_leaves(&e),
        );
        prop_assert_eq!(run(&handled), run(&e));
    }

    #[test]
    fn aborting_handler_yields_clause_value(e in pure_expr(), marker in any::<i64>()) {
        let handled = Expr::handle(
            HandlerDef::new().on(Op::Ask, "k", "x", Expr::int(marker)),
            ask_leaves(&e),
        );
        prop_assert_eq!(run(&handled), Ok(Lit::Int(marker)));
    }
}
