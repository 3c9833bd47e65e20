//! The seam between the evaluator and the embedding host.
//!
//! Hosts pre-populate the base of the handler stack with handlers for the
//! operations they implement natively. A host handler sees only literal
//! data and answers in tail position: it either resumes the performing
//! computation with a value or aborts the whole evaluation with one.

use spindle_ast::ast::Lit;
use spindle_ast::op::Op;

use crate::error::HostError;

/// How a host handler answers an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum HostReply {
    /// Continue the performing computation with this value.
    Resume(Lit),
    /// Drop the performing computation; this value becomes the result.
    Abort(Lit),
}

/// A handler implemented by the host rather than by a `handle` expression.
pub trait HostHandler {
    /// Whether this handler services `op`.
    fn handles(&self, op: Op) -> bool;

    /// Service one `perform`. Only called when [`handles`](Self::handles)
    /// returned true for `op`.
    fn handle(&mut self, op: Op, arg: &Lit) -> Result<HostReply, HostError>;
}

impl<T: HostHandler + ?Sized> HostHandler for &mut T {
    fn handles(&self, op: Op) -> bool {
        (**self).handles(op)
    }

    fn handle(&mut self, op: Op, arg: &Lit) -> Result<HostReply, HostError> {
        (**self).handle(op, arg)
    }
}

impl<T: HostHandler + ?Sized> HostHandler for Box<T> {
    fn handles(&self, op: Op) -> bool {
        (**self).handles(op)
    }

    fn handle(&mut self, op: Op, arg: &Lit) -> Result<HostReply, HostError> {
        (**self).handle(op, arg)
    }
}

/// Host handler for a single operation backed by a closure.
pub struct HostFn<F> {
    op: Op,
    f: F,
}

impl<F> HostFn<F>
where
    F: FnMut(&Lit) -> Result<HostReply, HostError>,
{
    pub fn new(op: Op, f: F) -> Self {
        Self { op, f }
    }
}

impl<F> HostHandler for HostFn<F>
where
    F: FnMut(&Lit) -> Result<HostReply, HostError>,
{
    fn handles(&self, op: Op) -> bool {
        op == self.op
    }

    fn handle(&mut self, op: Op, arg: &Lit) -> Result<HostReply, HostError> {
        if op != self.op {
            return Err(HostError::Unsupported(op));
        }
        (self.f)(arg)
    }
}
