//! One-shot continuations.
//!
//! A continuation owns the pending frames between a `perform` site and the
//! handler that serviced it, together with that handler's record so it can
//! be re-installed around the frames on `resume`. The state cell moves
//! `Fresh -> Used` or `Fresh -> Discarded`; both are terminal.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use spindle_ast::op::Op;

use crate::error::{EvalError, Result};
use crate::frame::Frame;
use crate::value::HandlerRecord;

/// Identifier of a continuation, unique within one [`crate::Evaluator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContId(pub u64);

impl fmt::Display for ContId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k{}", self.0)
    }
}

/// Observable lifecycle state of a continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContStatus {
    Fresh,
    Used,
    Discarded,
}

impl fmt::Display for ContStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContStatus::Fresh => "fresh",
            ContStatus::Used => "used",
            ContStatus::Discarded => "discarded",
        })
    }
}

/// Context captured at a `perform` site.
pub(crate) struct Captured<'a> {
    /// Handler that serviced the operation; re-pushed beneath `frames`.
    pub(crate) handler: Rc<HandlerRecord<'a>>,
    /// Pending frames, outermost first.
    pub(crate) frames: Vec<Frame<'a>>,
}

enum ContState<'a> {
    Fresh(Captured<'a>),
    Used,
    Discarded,
}

impl ContState<'_> {
    fn status(&self) -> ContStatus {
        match self {
            ContState::Fresh(_) => ContStatus::Fresh,
            ContState::Used => ContStatus::Used,
            ContState::Discarded => ContStatus::Discarded,
        }
    }
}

pub struct Continuation<'a> {
    id: ContId,
    op: Op,
    state: RefCell<ContState<'a>>,
}

impl<'a> Continuation<'a> {
    pub(crate) fn new(id: ContId, op: Op, captured: Captured<'a>) -> Self {
        Self {
            id,
            op,
            state: RefCell::new(ContState::Fresh(captured)),
        }
    }

    pub fn id(&self) -> ContId {
        self.id
    }

    /// Operation whose `perform` captured this continuation.
    pub fn op(&self) -> Op {
        self.op
    }

    pub fn status(&self) -> ContStatus {
        self.state.borrow().status()
    }

    /// Number of pending frames held, zero once used or discarded.
    pub fn captured_frames(&self) -> usize {
        match &*self.state.borrow() {
            ContState::Fresh(c) => c.frames.len(),
            ContState::Used | ContState::Discarded => 0,
        }
    }

    /// Take ownership of the captured context, marking the continuation used.
    pub(crate) fn take(&self) -> Result<Captured<'a>> {
        match self.state.replace(ContState::Used) {
            ContState::Fresh(captured) => Ok(captured),
            terminal => {
                let state = terminal.status();
                self.state.replace(terminal);
                Err(EvalError::ContinuationAlreadyUsed { id: self.id, state })
            }
        }
    }

    /// Release the captured context if still fresh. Returns whether a
    /// transition happened.
    ///
    /// Clauses suspended inside the released frames can never finish, so
    /// their continuations are discarded as well.
    pub(crate) fn discard(&self) -> bool {
        let Some(captured) = self.release() else {
            return false;
        };
        let mut pending = captured.frames;
        while let Some(frame) = pending.pop() {
            if let Some(inner) = frame.clause_cont().and_then(|k| k.release()) {
                pending.extend(inner.frames);
            }
        }
        true
    }

    /// Move `Fresh -> Discarded`, handing back the captured context.
    fn release(&self) -> Option<Captured<'a>> {
        match self.state.replace(ContState::Discarded) {
            ContState::Fresh(captured) => Some(captured),
            terminal => {
                self.state.replace(terminal);
                None
            }
        }
    }
}

impl fmt::Debug for Continuation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("id", &self.id)
            .field("op", &self.op)
            .field("status", &self.status())
            .field("captured_frames", &self.captured_frames())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Env;
    use spindle_ast::ast::{Expr, HandlerDef};

    fn fresh<'a>(def: &'a HandlerDef) -> Continuation<'a> {
        Continuation::new(
            ContId(7),
            Op::Ask,
            Captured {
                handler: Rc::new(HandlerRecord::new(def, Env::new())),
                frames: Vec::new(),
            },
        )
    }

    #[test]
    fn take_is_single_use() {
        let def = HandlerDef::new().on(Op::Ask, "k", "x", Expr::unit());
        let k = fresh(&def);
        assert!(k.take().is_ok());
        assert_eq!(k.status(), ContStatus::Used);
        let err = k.take().err().unwrap();
        assert_eq!(
            err,
            EvalError::ContinuationAlreadyUsed {
                id: ContId(7),
                state: ContStatus::Used
            }
        );
    }

    #[test]
    fn discard_blocks_later_take() {
        let def = HandlerDef::new();
        let k = fresh(&def);
        assert!(k.discard());
        assert!(!k.discard());
        assert_eq!(k.status(), ContStatus::Discarded);
        assert!(matches!(
            k.take(),
            Err(EvalError::ContinuationAlreadyUsed {
                state: ContStatus::Discarded,
                ..
            })
        ));
        // the failed take must not resurrect or overwrite the terminal state
        assert_eq!(k.status(), ContStatus::Discarded);
    }

    #[test]
    fn discard_after_use_is_noop() {
        let def = HandlerDef::new();
        let k = fresh(&def);
        let _ = k.take();
        assert!(!k.discard());
        assert_eq!(k.status(), ContStatus::Used);
    }
}
