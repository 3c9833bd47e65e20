//! Failure kinds reported by evaluation and by host handlers.

use std::fmt;

use spindle_ast::op::Op;

use crate::cont::{ContId, ContStatus};

/// Errors raised by a host handler while servicing an effect.
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    /// `query-location` asked for a label the document does not define
    UnknownLabel(String),
    /// Argument had the wrong literal type for the operation
    TypeError(String),
    /// The handler was asked to service an operation it does not implement
    Unsupported(Op),
    /// Trace write failure; execution must abort
    TraceWriteError(String),
    /// Recorded trace disagreed with the running program
    Replay(String),
    /// General runtime error
    RuntimeError(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::UnknownLabel(label) => write!(f, "unknown label: {}", label),
            HostError::TypeError(msg) => write!(f, "type error: {}", msg),
            HostError::Unsupported(op) => write!(f, "host does not handle '{}'", op),
            HostError::TraceWriteError(msg) => {
                write!(f, "trace write error (execution aborted): {}", msg)
            }
            HostError::Replay(msg) => write!(f, "{}", msg),
            HostError::RuntimeError(msg) => write!(f, "runtime error: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}

/// Errors that abort an evaluation call.
///
/// None of these are recovered inside the evaluator. A host that wants to
/// retry (for example after an [`EvalError::UnhandledEffect`]) re-evaluates
/// with a different handler stack.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Variable not bound in any enclosing scope
    UnboundName(String),
    /// Application of something that is not a closure
    NotCallable(String),
    /// A built-in type contract was violated
    TypeMismatch {
        context: &'static str,
        expected: &'static str,
        found: String,
    },
    /// `perform` found no handler for the operation
    UnhandledEffect(Op),
    /// `resume` on a continuation that is no longer fresh
    ContinuationAlreadyUsed { id: ContId, state: ContStatus },
    DivisionByZero,
    /// Integer arithmetic left the `i64` range
    Overflow,
    /// Pending frame stack grew past the configured limit
    DepthLimitExceeded(usize),
    /// Step budget exhausted
    StepLimitExceeded(u64),
    /// A host handler failed while servicing an effect
    Host(HostError),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UnboundName(name) => write!(f, "unbound name `{}`", name),
            EvalError::NotCallable(found) => write!(f, "cannot call a value of type {}", found),
            EvalError::TypeMismatch {
                context,
                expected,
                found,
            } => write!(f, "{}: expected {}, found {}", context, expected, found),
            EvalError::UnhandledEffect(op) => {
                write!(f, "unhandled effect '{}': no handler installed for it", op)
            }
            EvalError::ContinuationAlreadyUsed { id, state } => {
                write!(f, "continuation {} cannot be resumed: already {}", id, state)
            }
            EvalError::DivisionByZero => write!(f, "division by zero"),
            EvalError::Overflow => write!(f, "integer overflow"),
            EvalError::DepthLimitExceeded(limit) => {
                write!(f, "maximum evaluation depth exceeded (limit: {} frames)", limit)
            }
            EvalError::StepLimitExceeded(limit) => {
                write!(f, "step budget exhausted (limit: {} steps)", limit)
            }
            EvalError::Host(e) => write!(f, "host handler failed: {}", e),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvalError::Host(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HostError> for EvalError {
    fn from(e: HostError) -> Self {
        EvalError::Host(e)
    }
}

pub type Result<T, E = EvalError> = std::result::Result<T, E>;
