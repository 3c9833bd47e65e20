#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

pub mod op {
    use serde::{Deserialize, Serialize};
    use std::fmt;

    /// Built-in effect operations.
    ///
    /// The set is closed: programs cannot declare their own effects. Hosts
    /// answer the document-facing operations; `Ask` and `Emit` exist for
    /// handlers written in the language itself.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub enum Op {
        Ask,
        Emit,
        QueryLocation,
        DisplayWithState,
        GetStyle,
    }

    /// All operations, in declaration order.
    pub const ALL_OPS: &[Op] = &[
        Op::Ask,
        Op::Emit,
        Op::QueryLocation,
        Op::DisplayWithState,
        Op::GetStyle,
    ];

    impl Op {
        /// Wire name of the operation (matches the serde encoding).
        pub fn name(self) -> &'static str {
            match self {
                Op::Ask => "ask",
                Op::Emit => "emit",
                Op::QueryLocation => "query-location",
                Op::DisplayWithState => "display-with-state",
                Op::GetStyle => "get-style",
            }
        }

        /// Parse a wire name back into an operation.
        pub fn from_name(name: &str) -> Option<Op> {
            ALL_OPS.iter().copied().find(|op| op.name() == name)
        }
    }

    impl fmt::Display for Op {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.name())
        }
    }
}

pub mod ast {
    use super::op::Op;
    use serde::{Deserialize, Serialize};
    use std::fmt;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Lit {
        Int(i64),
        Float(f64),
        Str(String),
        Bool(bool),
        Unit,
    }

    impl fmt::Display for Lit {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Lit::Int(v) => write!(f, "{v}"),
                Lit::Float(v) => write!(f, "{v}"),
                Lit::Str(s) => write!(f, "\"{s}\""),
                Lit::Bool(b) => write!(f, "{b}"),
                Lit::Unit => write!(f, "()"),
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum UnOp {
        Not,
        Neg,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum BinOp {
        // logical
        Or,
        And,
        // equality
        Eq,
        Ne,
        // relational
        Lt,
        Le,
        Gt,
        Ge,
        // arithmetic
        Add,
        Sub,
        Mul,
        Div,
    }

    /// `return r => body`
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ReturnClause {
        pub param: String,
        pub body: Box<Expr>,
    }

    /// `op k x => body`
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct OpClause {
        pub op: Op,
        pub cont: String,
        pub arg: String,
        pub body: Expr,
    }

    /// Clauses of a handler. A missing return clause behaves as `return r => r`.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct HandlerDef {
        #[serde(default)]
        pub ret: Option<ReturnClause>,
        #[serde(default)]
        pub clauses: Vec<OpClause>,
    }

    impl HandlerDef {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn returning(mut self, param: &str, body: Expr) -> Self {
            self.ret = Some(ReturnClause {
                param: param.to_string(),
                body: Box::new(body),
            });
            self
        }

        pub fn on(mut self, op: Op, cont: &str, arg: &str, body: Expr) -> Self {
            self.clauses.push(OpClause {
                op,
                cont: cont.to_string(),
                arg: arg.to_string(),
                body,
            });
            self
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Expr {
        Lit(Lit),
        Var(String),
        Lambda {
            param: String,
            body: Box<Expr>,
        },
        App {
            func: Box<Expr>,
            arg: Box<Expr>,
        },
        Let {
            name: String,
            value: Box<Expr>,
            body: Box<Expr>,
        },
        If {
            cond: Box<Expr>,
            then_branch: Box<Expr>,
            else_branch: Box<Expr>,
        },
        Unary {
            op: UnOp,
            expr: Box<Expr>,
        },
        Binary {
            lhs: Box<Expr>,
            op: BinOp,
            rhs: Box<Expr>,
        },
        Perform {
            op: Op,
            arg: Box<Expr>,
        },
        Resume {
            cont: Box<Expr>,
            value: Box<Expr>,
        },
        /// Handler literal; evaluates to a handler record.
        Handler(HandlerDef),
        /// Install `handler` (which must evaluate to a handler record) around `body`.
        Handle {
            handler: Box<Expr>,
            body: Box<Expr>,
        },
    }

    // Constructors for hosts that build trees directly instead of decoding JSON.
    impl Expr {
        pub fn int(v: i64) -> Expr {
            Expr::Lit(Lit::Int(v))
        }

        pub fn float(v: f64) -> Expr {
            Expr::Lit(Lit::Float(v))
        }

        pub fn bool(b: bool) -> Expr {
            Expr::Lit(Lit::Bool(b))
        }

        pub fn str(s: &str) -> Expr {
            Expr::Lit(Lit::Str(s.to_string()))
        }

        pub fn unit() -> Expr {
            Expr::Lit(Lit::Unit)
        }

        pub fn var(name: &str) -> Expr {
            Expr::Var(name.to_string())
        }

        pub fn lambda(param: &str, body: Expr) -> Expr {
            Expr::Lambda {
                param: param.to_string(),
                body: Box::new(body),
            }
        }

        pub fn app(func: Expr, arg: Expr) -> Expr {
            Expr::App {
                func: Box::new(func),
                arg: Box::new(arg),
            }
        }

        pub fn let_in(name: &str, value: Expr, body: Expr) -> Expr {
            Expr::Let {
                name: name.to_string(),
                value: Box::new(value),
                body: Box::new(body),
            }
        }

        pub fn if_else(cond: Expr, then_branch: Expr, else_branch: Expr) -> Expr {
            Expr::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            }
        }

        pub fn unary(op: UnOp, expr: Expr) -> Expr {
            Expr::Unary {
                op,
                expr: Box::new(expr),
            }
        }

        pub fn binary(lhs: Expr, op: BinOp, rhs: Expr) -> Expr {
            Expr::Binary {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            }
        }

        pub fn perform(op: Op, arg: Expr) -> Expr {
            Expr::Perform {
                op,
                arg: Box::new(arg),
            }
        }

        pub fn resume(cont: Expr, value: Expr) -> Expr {
            Expr::Resume {
                cont: Box::new(cont),
                value: Box::new(value),
            }
        }

        /// `handle { def } body`
        pub fn handle(def: HandlerDef, body: Expr) -> Expr {
            Expr::Handle {
                handler: Box::new(Expr::Handler(def)),
                body: Box::new(body),
            }
        }

        pub fn handle_with(handler: Expr, body: Expr) -> Expr {
            Expr::Handle {
                handler: Box::new(handler),
                body: Box::new(body),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ast::*;
    use super::op::{Op, ALL_OPS};

    #[test]
    fn op_names_round_trip() {
        for op in ALL_OPS {
            assert_eq!(Op::from_name(op.name()), Some(*op));
        }
        assert_eq!(Op::from_name("frobnicate"), None);
    }

    #[test]
    fn op_wire_name_matches_serde() {
        let json = serde_json::to_string(&Op::QueryLocation).unwrap();
        assert_eq!(json, "\"query-location\"");
    }

    #[test]
    fn handler_def_defaults_missing_clauses() {
        let def: HandlerDef = serde_json::from_str("{}").unwrap();
        assert!(def.ret.is_none());
        assert!(def.clauses.is_empty());
    }

    #[test]
    fn decode_perform_from_json() {
        let src = r#"{"Perform": {"op": "ask", "arg": {"Lit": {"Int": 10}}}}"#;
        let expr: Expr = serde_json::from_str(src).unwrap();
        assert_eq!(expr, Expr::perform(Op::Ask, Expr::int(10)));
    }

    #[test]
    fn return_clause_can_hold_a_handler() {
        let inner = HandlerDef::new().returning("r", Expr::var("r"));
        let def = HandlerDef::new().returning("r", Expr::Handler(inner.clone()));
        let json = serde_json::to_string(&Expr::Handler(def.clone())).unwrap();
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Expr::Handler(def));
        match back {
            Expr::Handler(HandlerDef { ret: Some(ret), .. }) => {
                assert_eq!(*ret.body, Expr::Handler(inner));
            }
            other => panic!("expected handler with return clause, got {other:?}"),
        }
    }

    #[test]
    fn handle_builder_wraps_handler_literal() {
        let e = Expr::handle(HandlerDef::new(), Expr::unit());
        match e {
            Expr::Handle { handler, .. } => assert!(matches!(*handler, Expr::Handler(_))),
            other => panic!("expected Handle, got {other:?}"),
        }
    }
}
