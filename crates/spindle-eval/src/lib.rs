#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

//! Evaluator for Spindle: a small expression language whose effects are
//! handled with one-shot continuations.
//!
//! A continuation captured by `perform` can be resumed at most once. A
//! handler clause may also drop it, which aborts the suspended computation
//! and makes the clause's own value the result of the `handle` expression.

mod config;
mod cont;
mod env;
mod error;
mod eval;
mod frame;
mod host;
mod value;

pub use config::{EvalConfig, MAX_FRAME_DEPTH};
pub use cont::{ContId, ContStatus, Continuation};
pub use env::Env;
pub use error::{EvalError, HostError, Result};
pub use eval::{evaluate, Evaluator};
pub use host::{HostFn, HostHandler, HostReply};
pub use value::{Closure, HandlerRecord, Value};
