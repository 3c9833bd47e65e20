//! Pending evaluation frames.
//!
//! Each frame is "an expression with a hole" waiting for the value currently
//! being computed. Handler frames double as the handler stack: scanning the
//! frame stack top-down for [`Frame::Handler`] visits installed handlers
//! innermost first.

use std::rc::Rc;

use spindle_ast::ast::{BinOp, Expr, UnOp};
use spindle_ast::op::Op;

use crate::cont::Continuation;
use crate::env::Env;
use crate::value::{Closure, HandlerRecord, Value};

/// A handler currently on the stack.
#[derive(Debug, Clone)]
pub(crate) enum Installed<'a> {
    /// Installed by a `handle` expression
    Record(Rc<HandlerRecord<'a>>),
    /// Host handler, by index into the evaluator's host list
    Host(usize),
}

#[derive(Debug)]
pub(crate) enum Frame<'a> {
    /// `[] arg`: callee being evaluated
    AppArg { arg: &'a Expr, env: Env<'a> },
    /// `f []`: argument being evaluated
    AppCall { closure: Rc<Closure<'a>> },
    /// `let name = [] in body`
    LetBody {
        name: &'a str,
        body: &'a Expr,
        env: Env<'a>,
    },
    /// `if [] then .. else ..`
    IfBranch {
        then_branch: &'a Expr,
        else_branch: &'a Expr,
        env: Env<'a>,
    },
    UnaryOp { op: UnOp },
    /// `[] op rhs`
    BinaryRhs {
        op: BinOp,
        rhs: &'a Expr,
        env: Env<'a>,
    },
    /// `lhs op []`
    BinaryApply { op: BinOp, lhs: Value<'a> },
    /// `[] && rhs` / `[] || rhs`
    ShortCircuit {
        op: BinOp,
        rhs: &'a Expr,
        env: Env<'a>,
    },
    /// right operand of `&&` / `||`, which must be Bool
    ShortCircuitRhs { op: BinOp },
    /// `perform op []`
    PerformArg { op: Op },
    /// `resume [] value`
    ResumeValue { value: &'a Expr, env: Env<'a> },
    /// `resume k []`
    ResumeApply { cont: Rc<Continuation<'a>> },
    /// `handle [] body`: handler expression being evaluated
    HandleBody { body: &'a Expr, env: Env<'a> },
    /// Active handler delimiting its body
    Handler(Installed<'a>),
    /// Operation clause running for `cont`; discards it when the clause
    /// finishes without resuming
    ClauseEnd { cont: Rc<Continuation<'a>> },
}

impl<'a> Frame<'a> {
    /// Continuation owned by a clause boundary, if this is one.
    pub(crate) fn clause_cont(&self) -> Option<&Rc<Continuation<'a>>> {
        match self {
            Frame::ClauseEnd { cont } => Some(cont),
            _ => None,
        }
    }
}
