//! Evaluator for Spindle expressions.
//!
//! Evaluation runs on an explicit stack of pending [`Frame`]s instead of
//! the Rust call stack. That makes continuation capture a matter of moving
//! frames: `perform` splits the stack at the matching handler and moves the
//! frames above it into a [`Continuation`]; `resume` pushes the handler back
//! followed by those frames and carries on returning the resumed value.

use std::fmt;
use std::rc::Rc;

use spindle_ast::ast::{BinOp, Expr, UnOp};
use spindle_ast::op::Op;
use tracing::{debug, trace};

use crate::config::EvalConfig;
use crate::cont::{Captured, ContId, Continuation};
use crate::env::Env;
use crate::error::{EvalError, Result};
use crate::frame::{Frame, Installed};
use crate::host::{HostHandler, HostReply};
use crate::value::{Closure, HandlerRecord, Value};

/// What the machine does next.
enum Step<'a> {
    /// Evaluate an expression in an environment.
    Eval(&'a Expr, Env<'a>),
    /// Deliver a value to the topmost pending frame.
    Return(Value<'a>),
}

/// Tree-walking evaluator with one-shot effect handlers.
///
/// Host handlers registered with [`with_host`](Self::with_host) form the
/// base of the handler stack for every evaluation; later registrations sit
/// closer to the program than earlier ones.
pub struct Evaluator<'h> {
    config: EvalConfig,
    hosts: Vec<Box<dyn HostHandler + 'h>>,
    next_cont: u64,
}

impl fmt::Debug for Evaluator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("config", &self.config)
            .field("hosts", &self.hosts.len())
            .field("next_cont", &self.next_cont)
            .finish()
    }
}

impl Default for Evaluator<'_> {
    fn default() -> Self {
        Self::new(EvalConfig::default())
    }
}

impl<'h> Evaluator<'h> {
    pub fn new(config: EvalConfig) -> Self {
        Self {
            config,
            hosts: Vec::new(),
            next_cont: 0,
        }
    }

    /// Install a host handler beneath everything the program installs.
    pub fn with_host(mut self, handler: impl HostHandler + 'h) -> Self {
        self.push_host(handler);
        self
    }

    pub fn push_host(&mut self, handler: impl HostHandler + 'h) {
        self.hosts.push(Box::new(handler));
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate `expr` in an empty environment.
    pub fn evaluate<'a>(&mut self, expr: &'a Expr) -> Result<Value<'a>> {
        self.evaluate_in(expr, Env::new())
    }

    /// Evaluate `expr` in `env`.
    ///
    /// On failure every continuation still owned by a running clause is
    /// discarded before the error is returned.
    pub fn evaluate_in<'a>(&mut self, expr: &'a Expr, env: Env<'a>) -> Result<Value<'a>> {
        let mut stack: Vec<Frame<'a>> = (0..self.hosts.len())
            .map(|i| Frame::Handler(Installed::Host(i)))
            .collect();
        let result = self.drive(expr, env, &mut stack);
        if let Err(e) = &result {
            debug!(error = %e, pending = stack.len(), "evaluation aborted");
            unwind(&mut stack, 0);
        }
        result
    }

    fn drive<'a>(
        &mut self,
        expr: &'a Expr,
        env: Env<'a>,
        stack: &mut Vec<Frame<'a>>,
    ) -> Result<Value<'a>> {
        let mut step = Step::Eval(expr, env);
        let mut steps: u64 = 0;
        loop {
            if let Some(limit) = self.config.max_steps {
                if steps >= limit {
                    return Err(EvalError::StepLimitExceeded(limit));
                }
            }
            steps += 1;
            if stack.len() > self.config.max_depth {
                return Err(EvalError::DepthLimitExceeded(self.config.max_depth));
            }

            step = match step {
                Step::Eval(expr, env) => self.eval(expr, env, stack)?,
                Step::Return(value) => match stack.pop() {
                    None => return Ok(value),
                    Some(frame) => self.apply(frame, value, stack)?,
                },
            };
        }
    }

    fn eval<'a>(
        &mut self,
        expr: &'a Expr,
        env: Env<'a>,
        stack: &mut Vec<Frame<'a>>,
    ) -> Result<Step<'a>> {
        match expr {
            Expr::Lit(lit) => Ok(Step::Return(Value::from(lit))),

            Expr::Var(name) => env
                .lookup(name)
                .cloned()
                .map(Step::Return)
                .ok_or_else(|| EvalError::UnboundName(name.clone())),

            Expr::Lambda { param, body } => Ok(Step::Return(Value::Closure(Rc::new(Closure {
                param,
                body,
                env,
            })))),

            Expr::App { func, arg } => {
                stack.push(Frame::AppArg {
                    arg,
                    env: env.clone(),
                });
                Ok(Step::Eval(func, env))
            }

            Expr::Let { name, value, body } => {
                stack.push(Frame::LetBody {
                    name,
                    body,
                    env: env.clone(),
                });
                Ok(Step::Eval(value, env))
            }

            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                stack.push(Frame::IfBranch {
                    then_branch,
                    else_branch,
                    env: env.clone(),
                });
                Ok(Step::Eval(cond, env))
            }

            Expr::Unary { op, expr } => {
                stack.push(Frame::UnaryOp { op: *op });
                Ok(Step::Eval(expr, env))
            }

            Expr::Binary { lhs, op, rhs } => {
                let op = *op;
                let rhs_env = env.clone();
                if matches!(op, BinOp::And | BinOp::Or) {
                    stack.push(Frame::ShortCircuit {
                        op,
                        rhs,
                        env: rhs_env,
                    });
                } else {
                    stack.push(Frame::BinaryRhs {
                        op,
                        rhs,
                        env: rhs_env,
                    });
                }
                Ok(Step::Eval(lhs, env))
            }

            Expr::Perform { op, arg } => {
                stack.push(Frame::PerformArg { op: *op });
                Ok(Step::Eval(arg, env))
            }

            Expr::Resume { cont, value } => {
                stack.push(Frame::ResumeValue {
                    value,
                    env: env.clone(),
                });
                Ok(Step::Eval(cont, env))
            }

            Expr::Handler(def) => Ok(Step::Return(Value::Handler(Rc::new(HandlerRecord::new(
                def, env,
            ))))),

            Expr::Handle { handler, body } => {
                stack.push(Frame::HandleBody {
                    body,
                    env: env.clone(),
                });
                Ok(Step::Eval(handler, env))
            }
        }
    }

    fn apply<'a>(
        &mut self,
        frame: Frame<'a>,
        value: Value<'a>,
        stack: &mut Vec<Frame<'a>>,
    ) -> Result<Step<'a>> {
        match frame {
            Frame::AppArg { arg, env } => match value {
                Value::Closure(closure) => {
                    stack.push(Frame::AppCall { closure });
                    Ok(Step::Eval(arg, env))
                }
                other => Err(EvalError::NotCallable(other.type_name().to_string())),
            },

            Frame::AppCall { closure } => {
                let env = closure.env.bind(closure.param, value);
                Ok(Step::Eval(closure.body, env))
            }

            Frame::LetBody { name, body, env } => Ok(Step::Eval(body, env.bind(name, value))),

            Frame::IfBranch {
                then_branch,
                else_branch,
                env,
            } => match value {
                Value::Bool(true) => Ok(Step::Eval(then_branch, env)),
                Value::Bool(false) => Ok(Step::Eval(else_branch, env)),
                other => Err(mismatch("if condition", "Bool", &other)),
            },

            Frame::UnaryOp { op } => eval_unary(op, value).map(Step::Return),

            Frame::BinaryRhs { op, rhs, env } => {
                stack.push(Frame::BinaryApply { op, lhs: value });
                Ok(Step::Eval(rhs, env))
            }

            Frame::BinaryApply { op, lhs } => eval_binary(op, lhs, value).map(Step::Return),

            Frame::ShortCircuit { op, rhs, env } => match (op, value) {
                (BinOp::And, Value::Bool(false)) => Ok(Step::Return(Value::Bool(false))),
                (BinOp::Or, Value::Bool(true)) => Ok(Step::Return(Value::Bool(true))),
                (_, Value::Bool(_)) => {
                    stack.push(Frame::ShortCircuitRhs { op });
                    Ok(Step::Eval(rhs, env))
                }
                (_, other) => Err(mismatch(logical_context(op), "Bool", &other)),
            },

            Frame::ShortCircuitRhs { op } => match value {
                Value::Bool(b) => Ok(Step::Return(Value::Bool(b))),
                other => Err(mismatch(logical_context(op), "Bool", &other)),
            },

            Frame::PerformArg { op } => self.perform(op, value, stack),

            Frame::ResumeValue { value: arg, env } => match value {
                Value::Continuation(cont) => {
                    stack.push(Frame::ResumeApply { cont });
                    Ok(Step::Eval(arg, env))
                }
                other => Err(mismatch("resume", "continuation", &other)),
            },

            Frame::ResumeApply { cont } => resume(&cont, value, stack),

            Frame::HandleBody { body, env } => match value {
                Value::Handler(record) => {
                    let installed = Value::Handler(Rc::clone(&record));
                    trace!(ops = %installed, "installing handler");
                    stack.push(Frame::Handler(Installed::Record(record)));
                    Ok(Step::Eval(body, env))
                }
                other => Err(mismatch("handle", "handler", &other)),
            },

            // Body finished without an escaping effect: run the return clause.
            Frame::Handler(Installed::Record(record)) => {
                let def = record.def;
                match &def.ret {
                    Some(ret) => Ok(Step::Eval(&*ret.body, record.env.bind(&ret.param, value))),
                    None => Ok(Step::Return(value)),
                }
            }

            Frame::Handler(Installed::Host(_)) => Ok(Step::Return(value)),

            Frame::ClauseEnd { cont } => {
                if cont.discard() {
                    debug!(
                        cont = %cont.id(),
                        op = %cont.op(),
                        "clause finished without resuming; continuation discarded"
                    );
                }
                Ok(Step::Return(value))
            }
        }
    }

    /// Find the innermost handler for `op` and hand it the argument.
    fn perform<'a>(
        &mut self,
        op: Op,
        arg: Value<'a>,
        stack: &mut Vec<Frame<'a>>,
    ) -> Result<Step<'a>> {
        let index = stack
            .iter()
            .rposition(|frame| match frame {
                Frame::Handler(Installed::Record(record)) => record.handles(op),
                Frame::Handler(Installed::Host(i)) => {
                    self.hosts.get(*i).is_some_and(|h| h.handles(op))
                }
                _ => false,
            })
            .ok_or(EvalError::UnhandledEffect(op))?;

        let record = match &stack[index] {
            Frame::Handler(Installed::Record(record)) => Rc::clone(record),
            Frame::Handler(Installed::Host(i)) => {
                let host = *i;
                return self.dispatch_host(host, index, op, arg, stack);
            }
            _ => return Err(EvalError::UnhandledEffect(op)),
        };
        let clause = record.clause(op).ok_or(EvalError::UnhandledEffect(op))?;

        // Everything above the handler becomes the continuation; the handler
        // itself leaves the stack so the clause cannot re-trigger it.
        let frames = stack.split_off(index + 1);
        stack.truncate(index);

        let id = self.fresh_cont_id();
        debug!(%op, cont = %id, captured = frames.len(), "effect captured by handler");
        let cont = Rc::new(Continuation::new(
            id,
            op,
            Captured {
                handler: Rc::clone(&record),
                frames,
            },
        ));

        let env = record.env.extend([
            (clause.arg.clone(), arg),
            (clause.cont.clone(), Value::Continuation(Rc::clone(&cont))),
        ]);
        stack.push(Frame::ClauseEnd { cont });
        Ok(Step::Eval(&clause.body, env))
    }

    fn dispatch_host<'a>(
        &mut self,
        host: usize,
        index: usize,
        op: Op,
        arg: Value<'a>,
        stack: &mut Vec<Frame<'a>>,
    ) -> Result<Step<'a>> {
        let lit = arg
            .to_lit()
            .ok_or_else(|| mismatch("host effect argument", "literal data", &arg))?;
        let handler = self
            .hosts
            .get_mut(host)
            .ok_or(EvalError::UnhandledEffect(op))?;

        debug!(%op, host, arg = %lit, "effect dispatched to host");
        match handler.handle(op, &lit)? {
            HostReply::Resume(v) => Ok(Step::Return(Value::from(v))),
            HostReply::Abort(v) => {
                debug!(%op, host, result = %v, "host aborted evaluation");
                unwind(stack, index);
                Ok(Step::Return(Value::from(v)))
            }
        }
    }

    fn fresh_cont_id(&mut self) -> ContId {
        self.next_cont += 1;
        ContId(self.next_cont)
    }
}

/// Evaluate `expr` with default limits and no host handlers.
pub fn evaluate(expr: &Expr) -> Result<Value<'_>> {
    Evaluator::default().evaluate(expr)
}

/// Reinstate `cont` on top of the stack and deliver `value` to it.
///
/// The serviced handler goes back first so that it delimits the resumed
/// frames again: their eventual result passes through its return clause
/// and then arrives here, as the value of the `resume` expression.
fn resume<'a>(
    cont: &Continuation<'a>,
    value: Value<'a>,
    stack: &mut Vec<Frame<'a>>,
) -> Result<Step<'a>> {
    let Captured { handler, frames } = cont.take()?;
    debug!(cont = %cont.id(), op = %cont.op(), frames = frames.len(), "resuming continuation");
    stack.push(Frame::Handler(Installed::Record(handler)));
    stack.extend(frames);
    Ok(Step::Return(value))
}

/// Pop frames down to `to`, discarding continuations of interrupted clauses.
fn unwind(stack: &mut Vec<Frame<'_>>, to: usize) {
    for frame in stack.drain(to..).rev() {
        if let Some(cont) = frame.clause_cont() {
            if cont.discard() {
                debug!(cont = %cont.id(), "continuation discarded by unwind");
            }
        }
    }
}

fn mismatch(context: &'static str, expected: &'static str, found: &Value<'_>) -> EvalError {
    EvalError::TypeMismatch {
        context,
        expected,
        found: found.type_name().to_string(),
    }
}

fn logical_context(op: BinOp) -> &'static str {
    match op {
        BinOp::Or => "`||`",
        _ => "`&&`",
    }
}

fn eval_unary(op: UnOp, v: Value<'_>) -> Result<Value<'_>> {
    match (op, v) {
        (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnOp::Neg, Value::Int(i)) => i.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
        (UnOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnOp::Not, other) => Err(mismatch("`!`", "Bool", &other)),
        (UnOp::Neg, other) => Err(mismatch("unary `-`", "Int or Float", &other)),
    }
}

fn eval_binary<'a>(op: BinOp, l: Value<'a>, r: Value<'a>) -> Result<Value<'a>> {
    use BinOp::*;

    match op {
        Add | Sub | Mul | Div => match (l, r) {
            (Value::Int(a), Value::Int(b)) => {
                let result = match op {
                    Add => a.checked_add(b),
                    Sub => a.checked_sub(b),
                    Mul => a.checked_mul(b),
                    _ if b == 0 => return Err(EvalError::DivisionByZero),
                    _ => a.checked_div(b),
                };
                result.map(Value::Int).ok_or(EvalError::Overflow)
            }
            (Value::Str(a), Value::Str(b)) if op == Add => Ok(Value::Str(a + &b)),
            (l, r) => match (as_float(&l), as_float(&r)) {
                (Some(a), Some(b)) => Ok(Value::Float(match op {
                    Add => a + b,
                    Sub => a - b,
                    Mul => a * b,
                    _ => a / b,
                })),
                (None, _) => Err(mismatch("arithmetic", "Int or Float", &l)),
                (_, None) => Err(mismatch("arithmetic", "Int or Float", &r)),
            },
        },

        Lt | Le | Gt | Ge => {
            let ordering = match (&l, &r) {
                (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
                (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
                _ => match (as_float(&l), as_float(&r)) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    (None, _) => return Err(mismatch("comparison", "Int or Float", &l)),
                    (_, None) => return Err(mismatch("comparison", "Int or Float", &r)),
                },
            };
            // NaN compares false with everything
            let result = ordering.is_some_and(|o| match op {
                Lt => o.is_lt(),
                Le => o.is_le(),
                Gt => o.is_gt(),
                _ => o.is_ge(),
            });
            Ok(Value::Bool(result))
        }

        Eq | Ne => {
            let eq = match (&l, &r) {
                (Value::Int(a), Value::Int(b)) => a == b,
                (Value::Bool(a), Value::Bool(b)) => a == b,
                (Value::Str(a), Value::Str(b)) => a == b,
                (Value::Unit, Value::Unit) => true,
                _ => match (as_float(&l), as_float(&r)) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                },
            };
            Ok(Value::Bool(if op == Eq { eq } else { !eq }))
        }

        // Short-circuit operators never reach a BinaryApply frame.
        And | Or => Err(mismatch(logical_context(op), "Bool", &l)),
    }
}

fn as_float(v: &Value<'_>) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spindle_ast::ast::{HandlerDef, Lit};

    fn eval_lit(expr: &Expr) -> Lit {
        let v = evaluate(expr).unwrap();
        v.to_lit().unwrap_or_else(|| panic!("expected data, got {v}"))
    }

    #[test]
    fn test_eval_literal_int() {
        assert_eq!(eval_lit(&Expr::int(42)), Lit::Int(42));
    }

    #[test]
    fn test_eval_literal_str() {
        assert_eq!(eval_lit(&Expr::str("page")), Lit::Str("page".into()));
    }

    #[test]
    fn test_eval_unbound_variable() {
        let err = evaluate(&Expr::var("nope")).unwrap_err();
        assert_eq!(err, EvalError::UnboundName("nope".into()));
    }

    #[test]
    fn test_eval_lambda_application() {
        // (fun x -> x + 1) 41
        let e = Expr::app(
            Expr::lambda("x", Expr::binary(Expr::var("x"), BinOp::Add, Expr::int(1))),
            Expr::int(41),
        );
        assert_eq!(eval_lit(&e), Lit::Int(42));
    }

    #[test]
    fn test_eval_closure_captures_definition_env() {
        // let y = 10 in let f = fun x -> x + y in let y = 0 in f 1
        let e = Expr::let_in(
            "y",
            Expr::int(10),
            Expr::let_in(
                "f",
                Expr::lambda("x", Expr::binary(Expr::var("x"), BinOp::Add, Expr::var("y"))),
                Expr::let_in("y", Expr::int(0), Expr::app(Expr::var("f"), Expr::int(1))),
            ),
        );
        assert_eq!(eval_lit(&e), Lit::Int(11));
    }

    #[test]
    fn test_eval_curried_application() {
        // ((fun a -> fun b -> a - b) 10) 3
        let sub = Expr::lambda(
            "a",
            Expr::lambda("b", Expr::binary(Expr::var("a"), BinOp::Sub, Expr::var("b"))),
        );
        let e = Expr::app(Expr::app(sub, Expr::int(10)), Expr::int(3));
        assert_eq!(eval_lit(&e), Lit::Int(7));
    }

    #[test]
    fn test_eval_not_callable() {
        let e = Expr::app(Expr::int(3), Expr::int(4));
        assert_eq!(evaluate(&e).unwrap_err(), EvalError::NotCallable("Int".into()));
    }

    #[test]
    fn test_eval_not_callable_checked_before_argument() {
        // the argument is never evaluated, so its unbound name is not reported
        let e = Expr::app(Expr::bool(true), Expr::var("missing"));
        assert_eq!(evaluate(&e).unwrap_err(), EvalError::NotCallable("Bool".into()));
    }

    #[test]
    fn test_eval_if_true_and_false() {
        let t = Expr::if_else(Expr::bool(true), Expr::int(1), Expr::int(2));
        let f = Expr::if_else(Expr::bool(false), Expr::int(1), Expr::int(2));
        assert_eq!(eval_lit(&t), Lit::Int(1));
        assert_eq!(eval_lit(&f), Lit::Int(2));
    }

    #[test]
    fn test_eval_if_evaluates_one_branch_only() {
        let e = Expr::if_else(Expr::bool(true), Expr::int(1), Expr::var("unbound"));
        assert_eq!(eval_lit(&e), Lit::Int(1));
    }

    #[test]
    fn test_eval_if_requires_bool() {
        let e = Expr::if_else(Expr::int(0), Expr::int(1), Expr::int(2));
        assert_eq!(
            evaluate(&e).unwrap_err(),
            EvalError::TypeMismatch {
                context: "if condition",
                expected: "Bool",
                found: "Int".into(),
            }
        );
    }

    #[test]
    fn test_eval_short_circuit_skips_rhs() {
        let and = Expr::binary(Expr::bool(false), BinOp::And, Expr::var("unbound"));
        let or = Expr::binary(Expr::bool(true), BinOp::Or, Expr::var("unbound"));
        assert_eq!(eval_lit(&and), Lit::Bool(false));
        assert_eq!(eval_lit(&or), Lit::Bool(true));
    }

    #[test]
    fn test_eval_arithmetic_mixed_promotes_to_float() {
        let e = Expr::binary(Expr::int(1), BinOp::Add, Expr::float(0.5));
        assert_eq!(eval_lit(&e), Lit::Float(1.5));
    }

    #[test]
    fn test_eval_string_concat() {
        let e = Expr::binary(Expr::str("p. "), BinOp::Add, Expr::str("12"));
        assert_eq!(eval_lit(&e), Lit::Str("p. 12".into()));
    }

    #[test]
    fn test_eval_division_by_zero() {
        let e = Expr::binary(Expr::int(1), BinOp::Div, Expr::int(0));
        assert_eq!(evaluate(&e).unwrap_err(), EvalError::DivisionByZero);
    }

    #[test]
    fn test_eval_overflow() {
        let e = Expr::binary(Expr::int(i64::MAX), BinOp::Add, Expr::int(1));
        assert_eq!(evaluate(&e).unwrap_err(), EvalError::Overflow);
        let neg = Expr::unary(UnOp::Neg, Expr::int(i64::MIN));
        assert_eq!(evaluate(&neg).unwrap_err(), EvalError::Overflow);
    }

    #[test]
    fn test_eval_comparisons() {
        let lt = Expr::binary(Expr::int(1), BinOp::Lt, Expr::int(2));
        let ne = Expr::binary(Expr::str("a"), BinOp::Ne, Expr::str("a"));
        assert_eq!(eval_lit(&lt), Lit::Bool(true));
        assert_eq!(eval_lit(&ne), Lit::Bool(false));
    }

    #[test]
    fn test_eval_handler_literal_is_a_value() {
        let def = HandlerDef::new().on(Op::Ask, "k", "x", Expr::unit());
        let e = Expr::Handler(def);
        let v = evaluate(&e).unwrap();
        assert!(matches!(v, Value::Handler(_)));
    }

    #[test]
    fn test_eval_handle_requires_handler_value() {
        let e = Expr::handle_with(Expr::int(1), Expr::unit());
        assert_eq!(
            evaluate(&e).unwrap_err(),
            EvalError::TypeMismatch {
                context: "handle",
                expected: "handler",
                found: "Int".into(),
            }
        );
    }

    #[test]
    fn test_eval_handle_runs_return_clause() {
        // handle { return r => r * 2 } 21
        let def = HandlerDef::new()
            .returning("r", Expr::binary(Expr::var("r"), BinOp::Mul, Expr::int(2)));
        let e = Expr::handle(def, Expr::int(21));
        assert_eq!(eval_lit(&e), Lit::Int(42));
    }

    #[test]
    fn test_eval_depth_limit() {
        // (fun f -> f f) (fun f -> 1 + f f): every call leaves a pending `1 + []`
        let omega = Expr::lambda(
            "f",
            Expr::binary(
                Expr::int(1),
                BinOp::Add,
                Expr::app(Expr::var("f"), Expr::var("f")),
            ),
        );
        let e = Expr::app(
            Expr::lambda("f", Expr::app(Expr::var("f"), Expr::var("f"))),
            omega,
        );
        let mut ev = Evaluator::new(EvalConfig::default().with_max_depth(64));
        assert_eq!(ev.evaluate(&e).unwrap_err(), EvalError::DepthLimitExceeded(64));
    }

    #[test]
    fn test_eval_step_limit() {
        // (fun f -> f f) (fun f -> f f) loops forever in constant space
        let w = Expr::lambda("f", Expr::app(Expr::var("f"), Expr::var("f")));
        let e = Expr::app(w.clone(), w);
        let mut ev = Evaluator::new(EvalConfig::default().with_max_steps(500));
        assert_eq!(ev.evaluate(&e).unwrap_err(), EvalError::StepLimitExceeded(500));
    }

    #[test]
    fn test_eval_in_prelude_env() {
        let env = Env::new().bind("base", Value::Int(100));
        let e = Expr::binary(Expr::var("base"), BinOp::Mul, Expr::int(2));
        let v = Evaluator::default().evaluate_in(&e, env).unwrap();
        assert!(matches!(v, Value::Int(200)));
    }
}
