//! Host handlers installed beneath the program's own handlers.

use spindle_ast::ast::{BinOp, Expr, HandlerDef, Lit};
use spindle_ast::op::Op;
use spindle_eval::{EvalError, Evaluator, HostError, HostFn, HostHandler, HostReply};

fn page_of(label: &Lit) -> Result<HostReply, HostError> {
    match label {
        Lit::Str(s) if s == "intro" => Ok(HostReply::Resume(Lit::Int(3))),
        Lit::Str(s) => Err(HostError::UnknownLabel(s.clone())),
        other => Err(HostError::TypeError(format!("expected label, got {other}"))),
    }
}

fn eval_with<'h>(ev: &mut Evaluator<'h>, e: &Expr) -> Result<Lit, EvalError> {
    ev.evaluate(e).map(|v| v.to_lit().expect("data result"))
}

#[test]
fn host_resumes_with_its_answer() {
    let mut ev = Evaluator::default().with_host(HostFn::new(Op::QueryLocation, page_of));
    let e = Expr::binary(
        Expr::perform(Op::QueryLocation, Expr::str("intro")),
        BinOp::Add,
        Expr::int(1),
    );
    assert_eq!(eval_with(&mut ev, &e), Ok(Lit::Int(4)));
}

#[test]
fn host_failure_surfaces_as_host_error() {
    let mut ev = Evaluator::default().with_host(HostFn::new(Op::QueryLocation, page_of));
    let e = Expr::perform(Op::QueryLocation, Expr::str("appendix"));
    assert_eq!(
        eval_with(&mut ev, &e),
        Err(EvalError::Host(HostError::UnknownLabel("appendix".into())))
    );
}

#[test]
fn host_abort_ends_evaluation_with_its_value() {
    let mut ev = Evaluator::default().with_host(HostFn::new(Op::Emit, |_: &Lit| {
        Ok(HostReply::Abort(Lit::Str("stopped".into())))
    }));
    // the pending `+ unbound` would fail if it ever ran
    let e = Expr::binary(
        Expr::perform(Op::Emit, Expr::unit()),
        BinOp::Add,
        Expr::var("unbound"),
    );
    assert_eq!(eval_with(&mut ev, &e), Ok(Lit::Str("stopped".into())));
}

#[test]
fn host_abort_discards_pending_clause_continuation() {
    // ask clause performs emit before resuming; the host aborts, so the
    // ask continuation never resumes and the result is the host's value
    let mut ev = Evaluator::default().with_host(HostFn::new(Op::Emit, |_: &Lit| {
        Ok(HostReply::Abort(Lit::Int(-1)))
    }));
    let clause = Expr::resume(Expr::var("k"), Expr::perform(Op::Emit, Expr::var("x")));
    let e = Expr::handle(
        HandlerDef::new().on(Op::Ask, "k", "x", clause),
        Expr::perform(Op::Ask, Expr::int(1)),
    );
    assert_eq!(eval_with(&mut ev, &e), Ok(Lit::Int(-1)));
}

#[test]
fn program_handler_shadows_host() {
    let mut ev = Evaluator::default().with_host(HostFn::new(Op::QueryLocation, page_of));
    let e = Expr::handle(
        HandlerDef::new().on(
            Op::QueryLocation,
            "k",
            "label",
            Expr::resume(Expr::var("k"), Expr::int(99)),
        ),
        Expr::perform(Op::QueryLocation, Expr::str("intro")),
    );
    assert_eq!(eval_with(&mut ev, &e), Ok(Lit::Int(99)));
}

#[test]
fn clause_can_delegate_to_host_before_resuming() {
    // ask k x => resume k (perform query-location x)
    let mut ev = Evaluator::default().with_host(HostFn::new(Op::QueryLocation, page_of));
    let clause = Expr::resume(
        Expr::var("k"),
        Expr::perform(Op::QueryLocation, Expr::var("x")),
    );
    let e = Expr::handle(
        HandlerDef::new().on(Op::Ask, "k", "x", clause),
        Expr::binary(
            Expr::perform(Op::Ask, Expr::str("intro")),
            BinOp::Mul,
            Expr::int(10),
        ),
    );
    assert_eq!(eval_with(&mut ev, &e), Ok(Lit::Int(30)));
}

#[test]
fn host_rejects_non_literal_argument() {
    let mut ev = Evaluator::default().with_host(HostFn::new(Op::Emit, |_: &Lit| {
        Ok(HostReply::Resume(Lit::Unit))
    }));
    let e = Expr::perform(Op::Emit, Expr::lambda("x", Expr::var("x")));
    assert_eq!(
        eval_with(&mut ev, &e),
        Err(EvalError::TypeMismatch {
            context: "host effect argument",
            expected: "literal data",
            found: "closure".into(),
        })
    );
}

#[test]
fn later_hosts_sit_closer_to_the_program() {
    let mut ev = Evaluator::default()
        .with_host(HostFn::new(Op::GetStyle, |_: &Lit| {
            Ok(HostReply::Resume(Lit::Str("outer".into())))
        }))
        .with_host(HostFn::new(Op::GetStyle, |_: &Lit| {
            Ok(HostReply::Resume(Lit::Str("inner".into())))
        }));
    let e = Expr::perform(Op::GetStyle, Expr::str("font"));
    assert_eq!(eval_with(&mut ev, &e), Ok(Lit::Str("inner".into())));
}

struct Recorder {
    seen: Vec<Lit>,
}

impl HostHandler for Recorder {
    fn handles(&self, op: Op) -> bool {
        op == Op::DisplayWithState
    }

    fn handle(&mut self, _op: Op, arg: &Lit) -> Result<HostReply, HostError> {
        self.seen.push(arg.clone());
        Ok(HostReply::Resume(Lit::Unit))
    }
}

#[test]
fn borrowed_host_keeps_its_state() {
    let mut rec = Recorder { seen: Vec::new() };
    let e = Expr::let_in(
        "_",
        Expr::perform(Op::DisplayWithState, Expr::int(1)),
        Expr::perform(Op::DisplayWithState, Expr::int(2)),
    );
    {
        let mut ev = Evaluator::default().with_host(&mut rec);
        assert_eq!(eval_with(&mut ev, &e), Ok(Lit::Unit));
    }
    assert_eq!(rec.seen, vec![Lit::Int(1), Lit::Int(2)]);
}
