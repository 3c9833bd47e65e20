//! Runtime values.

use std::fmt;
use std::rc::Rc;

use spindle_ast::ast::{Expr, HandlerDef, Lit, OpClause};
use spindle_ast::op::Op;

use crate::cont::Continuation;
use crate::env::Env;

/// Runtime values in Spindle.
///
/// `'a` is the lifetime of the expression tree being evaluated: closures and
/// handler records point into it instead of copying subtrees.
#[derive(Debug, Clone)]
pub enum Value<'a> {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Unit,
    /// Function closure capturing its environment
    Closure(Rc<Closure<'a>>),
    /// Installed-or-installable handler
    Handler(Rc<HandlerRecord<'a>>),
    /// One-shot resumable context captured by `perform`
    Continuation(Rc<Continuation<'a>>),
}

#[derive(Debug)]
pub struct Closure<'a> {
    pub param: &'a str,
    pub body: &'a Expr,
    pub env: Env<'a>,
}

/// A handler literal closed over the environment it was evaluated in.
#[derive(Debug)]
pub struct HandlerRecord<'a> {
    pub def: &'a HandlerDef,
    pub env: Env<'a>,
}

impl<'a> HandlerRecord<'a> {
    pub fn new(def: &'a HandlerDef, env: Env<'a>) -> Self {
        Self { def, env }
    }

    /// Operations this handler services, in clause order.
    pub fn ops(&self) -> impl Iterator<Item = Op> + '_ {
        self.def.clauses.iter().map(|c| c.op)
    }

    pub fn handles(&self, op: Op) -> bool {
        self.def.clauses.iter().any(|c| c.op == op)
    }

    /// Clause servicing `op`. If the operation is listed twice the first
    /// clause wins; rejecting duplicates is the front end's job.
    pub fn clause(&self, op: Op) -> Option<&'a OpClause> {
        self.def.clauses.iter().find(|c| c.op == op)
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::Unit => write!(f, "()"),
            Value::Closure(c) => write!(f, "<fn({})>", c.param),
            Value::Handler(h) => {
                write!(f, "<handler {{")?;
                for (i, op) in h.ops().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", op)?;
                }
                write!(f, "}}>")
            }
            Value::Continuation(k) => write!(f, "<continuation {}:{}>", k.id(), k.status()),
        }
    }
}

impl Value<'_> {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Bool(_) => "Bool",
            Value::Str(_) => "String",
            Value::Unit => "Unit",
            Value::Closure(_) => "closure",
            Value::Handler(_) => "handler",
            Value::Continuation(_) => "continuation",
        }
    }

    /// Literal data carried by this value, if it is plain data.
    pub fn to_lit(&self) -> Option<Lit> {
        match self {
            Value::Int(n) => Some(Lit::Int(*n)),
            Value::Float(x) => Some(Lit::Float(*x)),
            Value::Bool(b) => Some(Lit::Bool(*b)),
            Value::Str(s) => Some(Lit::Str(s.clone())),
            Value::Unit => Some(Lit::Unit),
            Value::Closure(_) | Value::Handler(_) | Value::Continuation(_) => None,
        }
    }
}

impl From<Lit> for Value<'_> {
    fn from(lit: Lit) -> Self {
        match lit {
            Lit::Int(n) => Value::Int(n),
            Lit::Float(x) => Value::Float(x),
            Lit::Bool(b) => Value::Bool(b),
            Lit::Str(s) => Value::Str(s),
            Lit::Unit => Value::Unit,
        }
    }
}

impl From<&Lit> for Value<'_> {
    fn from(lit: &Lit) -> Self {
        Value::from(lit.clone())
    }
}
