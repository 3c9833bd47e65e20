//! Loading programs and running them under the document host.

use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use spindle_ast::ast::{Expr, Lit};
use spindle_eval::{EvalConfig, Evaluator};
use tracing::{info, warn};

use crate::host::{Document, HostRegistry};
use crate::trace::{TraceEmitter, TraceReplayer};

/// Maximum program file size in bytes (1MB)
pub const MAX_SOURCE_SIZE: usize = 1_000_000;

/// Read and decode a JSON-encoded expression tree.
pub fn load_program(path: &Path) -> Result<Expr> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read program {}", path.display()))?;
    if src.len() > MAX_SOURCE_SIZE {
        bail!(
            "program file exceeds {}MB limit ({} bytes)",
            MAX_SOURCE_SIZE / 1_000_000,
            src.len()
        );
    }
    parse_program(&src).with_context(|| format!("invalid program {}", path.display()))
}

pub fn parse_program(src: &str) -> Result<Expr> {
    serde_json::from_str(src).context("failed to decode program JSON")
}

/// Settings for one run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: EvalConfig,
    pub document: Document,
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// The final value as printed.
    pub rendered: String,
    /// The final value, when it is plain data.
    pub value: Option<Lit>,
    /// Lines emitted through `display-with-state`.
    pub display_log: Vec<String>,
}

/// Run a program against the document, without tracing.
pub fn run_program(expr: &Expr, opts: &RunOptions) -> Result<RunOutcome> {
    let mut registry = HostRegistry::new(opts.document.clone());
    evaluate_hosted(expr, opts.config, &mut registry)
}

/// Run a program and write a JSONL trace of its host effects to `writer`.
///
/// With `full_values` the trace can be replayed; otherwise values over 1KB
/// are hashed.
pub fn run_program_traced(
    expr: &Expr,
    opts: &RunOptions,
    writer: Box<dyn Write + Send>,
    full_values: bool,
) -> Result<RunOutcome> {
    let tracer = TraceEmitter::new(writer, full_values).map_err(|e| anyhow!("{}", e))?;
    let mut registry = HostRegistry::new(opts.document.clone()).with_tracer(tracer);

    let result = evaluate_hosted(expr, opts.config, &mut registry);

    // A program error takes precedence over a footer write failure.
    let status = if result.is_ok() { "success" } else { "error" };
    let finalized = registry
        .tracer_mut()
        .finalize(status)
        .map_err(|e| anyhow!("{}", e));
    let outcome = result?;
    finalized?;
    Ok(outcome)
}

/// Re-run a program with host effects answered from a full-mode trace.
pub fn run_program_replay(
    expr: &Expr,
    config: EvalConfig,
    trace_jsonl: &str,
) -> Result<RunOutcome> {
    let replayer = TraceReplayer::from_jsonl(trace_jsonl).map_err(|e| anyhow!("{}", e))?;
    run_program_with_replayer(expr, config, replayer)
}

/// Re-run a program against an already loaded trace. Every recorded effect
/// must be consumed.
pub fn run_program_with_replayer(
    expr: &Expr,
    config: EvalConfig,
    replayer: TraceReplayer,
) -> Result<RunOutcome> {
    if !replayer.is_trace_complete() {
        warn!("trace has no footer; the recorded run may have been cut short");
    }
    let mut registry = HostRegistry::default().with_replayer(replayer);

    let outcome = evaluate_hosted(expr, config, &mut registry)?;

    if let Some(replayer) = registry.replayer() {
        replayer.verify_complete().map_err(|e| anyhow!("{}", e))?;
    }
    Ok(outcome)
}

fn evaluate_hosted(
    expr: &Expr,
    config: EvalConfig,
    registry: &mut HostRegistry,
) -> Result<RunOutcome> {
    let (rendered, value) = {
        let mut evaluator = Evaluator::new(config).with_host(&mut *registry);
        let value = evaluator.evaluate(expr)?;
        (value.to_string(), value.to_lit())
    };
    info!(result = %rendered, "program finished");
    Ok(RunOutcome {
        rendered,
        value,
        display_log: registry.take_display_log(),
    })
}
