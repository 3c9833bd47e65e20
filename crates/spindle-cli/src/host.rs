//! The document host: answers the built-in document effects.
//!
//! `HostRegistry` sits at the base of the evaluator's handler stack and
//! services `query-location`, `get-style` and `display-with-state` against a
//! [`Document`]. Every dispatch can be written to a JSONL trace, and a
//! recorded trace can stand in for the document entirely.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use spindle_ast::ast::Lit;
use spindle_ast::op::Op;
use spindle_eval::{HostError, HostHandler, HostReply};
use tracing::debug;

use crate::trace::{TraceEmitter, TraceReplayer};

/// Style key whose value prefixes every displayed line.
pub const DISPLAY_STYLE_KEY: &str = "font";

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The host's view of the document being typeset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    /// Label -> page number.
    pub locations: BTreeMap<String, i64>,
    /// Style key -> style value.
    pub styles: BTreeMap<String, String>,
}

impl Document {
    /// Load a document description from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read document {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid document {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("failed to decode document JSON")
    }

    pub fn with_location(mut self, label: &str, page: i64) -> Self {
        self.locations.insert(label.to_string(), page);
        self
    }

    pub fn with_style(mut self, key: &str, value: &str) -> Self {
        self.styles.insert(key.to_string(), value.to_string());
        self
    }
}

/// Mutable host state threaded through host functions.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    pub document: Document,
    /// Lines emitted by `display-with-state`, in order.
    pub display_log: Vec<String>,
}

impl HostState {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            display_log: Vec::new(),
        }
    }

    fn display(&mut self, arg: &Lit) {
        let text = match arg {
            Lit::Str(s) => s.clone(),
            other => other.to_string(),
        };
        let line = match self.document.styles.get(DISPLAY_STYLE_KEY) {
            Some(style) if !style.is_empty() => format!("[{}] {}", style, text),
            _ => text,
        };
        self.display_log.push(line);
    }
}

// ---------------------------------------------------------------------------
// HostRegistry
// ---------------------------------------------------------------------------

/// Type alias for host function signatures.
pub type HostFnImpl = fn(&Lit, &mut HostState) -> Result<Lit, HostError>;

/// Registry mapping operations to host implementations.
pub struct HostRegistry {
    functions: BTreeMap<Op, HostFnImpl>,
    state: HostState,
    tracer: TraceEmitter,
    replayer: Option<TraceReplayer>,
}

impl std::fmt::Debug for HostRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ops: Vec<_> = self.functions.keys().map(|op| op.name()).collect();
        f.debug_struct("HostRegistry")
            .field("functions", &ops)
            .field("tracing", &self.tracer.is_enabled())
            .field("replaying", &self.replayer.is_some())
            .finish()
    }
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new(Document::default())
    }
}

impl HostRegistry {
    /// Create a registry with all built-in host functions over `document`.
    pub fn new(document: Document) -> Self {
        let mut reg = Self {
            functions: BTreeMap::new(),
            state: HostState::new(document),
            tracer: TraceEmitter::disabled(),
            replayer: None,
        };
        reg.register(Op::QueryLocation, host_query_location);
        reg.register(Op::GetStyle, host_get_style);
        reg.register(Op::DisplayWithState, host_display_with_state);
        reg
    }

    /// Register or replace the implementation of `op`.
    pub fn register(&mut self, op: Op, f: HostFnImpl) {
        self.functions.insert(op, f);
    }

    /// Record every dispatched effect to `tracer`.
    pub fn with_tracer(mut self, tracer: TraceEmitter) -> Self {
        self.tracer = tracer;
        self
    }

    /// Answer effects from a recorded trace instead of the document.
    pub fn with_replayer(mut self, replayer: TraceReplayer) -> Self {
        self.replayer = Some(replayer);
        self
    }

    pub fn state(&self) -> &HostState {
        &self.state
    }

    pub fn display_log(&self) -> &[String] {
        &self.state.display_log
    }

    pub fn take_display_log(&mut self) -> Vec<String> {
        std::mem::take(&mut self.state.display_log)
    }

    pub fn tracer_mut(&mut self) -> &mut TraceEmitter {
        &mut self.tracer
    }

    pub fn replayer(&self) -> Option<&TraceReplayer> {
        self.replayer.as_ref()
    }

    fn call(&mut self, op: Op, arg: &Lit) -> Result<Lit, HostError> {
        let f = self
            .functions
            .get(&op)
            .ok_or(HostError::Unsupported(op))?;
        f(arg, &mut self.state)
    }

    /// Dispatch one effect and emit a trace entry for it.
    ///
    /// A trace write failure aborts the dispatch even if the effect itself
    /// succeeded.
    pub fn dispatch_traced(&mut self, op: Op, arg: &Lit) -> Result<Lit, HostError> {
        let logged = self.state.display_log.len();
        let start = std::time::Instant::now();
        let result = match self.replayer.as_mut() {
            Some(replayer) => replayer
                .next(op, arg)
                .map(|replayed| {
                    // the recorded line carries the style that was active then
                    self.state.display_log.extend(replayed.display);
                    replayed.output
                })
                .map_err(HostError::from),
            None => self.call(op, arg),
        };
        let duration = start.elapsed();
        debug!(op = %op, arg = %arg, ok = result.is_ok(), "host dispatch");

        let display = self.state.display_log.get(logged).map(String::as_str);
        self.tracer.record(op, arg, &result, display, duration)?;
        result
    }
}

impl HostHandler for HostRegistry {
    fn handles(&self, op: Op) -> bool {
        self.functions.contains_key(&op)
    }

    fn handle(&mut self, op: Op, arg: &Lit) -> Result<HostReply, HostError> {
        self.dispatch_traced(op, arg).map(HostReply::Resume)
    }
}

// ---------------------------------------------------------------------------
// Built-in host functions
// ---------------------------------------------------------------------------

fn host_query_location(arg: &Lit, state: &mut HostState) -> Result<Lit, HostError> {
    let label = match arg {
        Lit::Str(s) => s,
        other => {
            return Err(HostError::TypeError(format!(
                "query-location: expected Str label, got {}",
                other
            )))
        }
    };
    state
        .document
        .locations
        .get(label)
        .map(|page| Lit::Int(*page))
        .ok_or_else(|| HostError::UnknownLabel(label.clone()))
}

fn host_get_style(arg: &Lit, state: &mut HostState) -> Result<Lit, HostError> {
    let key = match arg {
        Lit::Str(s) => s,
        other => {
            return Err(HostError::TypeError(format!(
                "get-style: expected Str key, got {}",
                other
            )))
        }
    };
    Ok(Lit::Str(
        state.document.styles.get(key).cloned().unwrap_or_default(),
    ))
}

fn host_display_with_state(arg: &Lit, state: &mut HostState) -> Result<Lit, HostError> {
    state.display(arg);
    Ok(Lit::Unit)
}
