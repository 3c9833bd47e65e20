//! Structured JSONL traces of host-handled effects, and their replay.
//!
//! Every effect the host services is recorded with its operation, input,
//! output (with SHA-256 digest), and duration. A trace recorded with full
//! values can later stand in for the host: the replayer answers each effect
//! from the recording and rejects programs whose effects diverge from it.

use std::io::Write;

use serde::{Deserialize, Serialize};
use spindle_ast::ast::Lit;
use spindle_ast::op::Op;
use spindle_eval::HostError;

/// Values whose rendered form exceeds this many bytes are hashed in audit mode.
pub const AUDIT_VALUE_LIMIT: usize = 1024;

/// Current trace schema version.
pub const TRACE_SCHEMA_VERSION: &str = "0.1";

// ---------------------------------------------------------------------------
// Trace data types
// ---------------------------------------------------------------------------

/// A single trace entry recording one host-handled effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub seq: u64,
    pub timestamp: String,
    pub operation: Op,
    pub input: Lit,
    pub output: TraceOutput,
    pub duration_ms: u64,
    /// Whether all values are stored (true) or large values are hashed (false).
    #[serde(default)]
    pub full_values: bool,
    /// Line the host added to its display log while servicing the effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Output section of a trace entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceOutput {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Lit>,
    pub value_hash: String,
    pub value_size: usize,
}

/// A trace record in the JSONL stream.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "record")]
pub enum TraceRecord {
    #[serde(rename = "header")]
    Header(TraceHeader),
    #[serde(rename = "effect")]
    Effect(TraceEntry),
    #[serde(rename = "footer")]
    Footer(TraceFooter),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TraceHeader {
    pub schema_version: String,
    pub timestamp: String,
    pub full_values: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TraceFooter {
    pub timestamp: String,
    pub effect_count: u64,
    /// "complete" if finalize() was called normally.
    pub trace_status: String,
    /// "success" or "error".
    pub program_status: String,
}

// ---------------------------------------------------------------------------
// TraceEmitter
// ---------------------------------------------------------------------------

/// Emits a header, one effect record per host-handled effect, and a footer.
///
/// Call [`finalize`](Self::finalize) when the program completes; a trace
/// without a footer is treated as truncated.
pub struct TraceEmitter {
    seq: u64,
    writer: Option<Box<dyn Write + Send>>,
    full_values: bool,
}

impl std::fmt::Debug for TraceEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceEmitter")
            .field("seq", &self.seq)
            .field("enabled", &self.writer.is_some())
            .field("full_values", &self.full_values)
            .finish()
    }
}

impl Default for TraceEmitter {
    fn default() -> Self {
        Self::disabled()
    }
}

impl TraceEmitter {
    /// Create an emitter writing JSONL to `writer` and emit the header.
    ///
    /// With `full_values` every value is recorded (replay-capable). Without
    /// it, values over [`AUDIT_VALUE_LIMIT`] bytes are replaced by a digest.
    pub fn new(mut writer: Box<dyn Write + Send>, full_values: bool) -> Result<Self, HostError> {
        let header = TraceRecord::Header(TraceHeader {
            schema_version: TRACE_SCHEMA_VERSION.to_string(),
            timestamp: now_iso8601(),
            full_values,
        });
        write_record(&mut writer, &header, "header")?;
        Ok(Self {
            seq: 0,
            writer: Some(writer),
            full_values,
        })
    }

    /// Create a disabled trace emitter (no output).
    pub fn disabled() -> Self {
        Self {
            seq: 0,
            writer: None,
            full_values: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    /// Record one host-handled effect, its outcome, and the display line
    /// it produced, if any.
    pub fn record(
        &mut self,
        op: Op,
        input: &Lit,
        result: &Result<Lit, HostError>,
        display: Option<&str>,
        duration: std::time::Duration,
    ) -> Result<(), HostError> {
        if self.writer.is_none() {
            return Ok(());
        }
        let full = self.full_values;
        let output = match result {
            Ok(lit) => {
                let rendered = hash_string(lit);
                let size = rendered.len();
                TraceOutput {
                    status: "ok".to_string(),
                    value: (full || size <= AUDIT_VALUE_LIMIT).then(|| lit.clone()),
                    value_hash: sha256_hex(&rendered),
                    value_size: size,
                }
            }
            Err(e) => {
                let msg = e.to_string();
                TraceOutput {
                    status: "error".to_string(),
                    value_hash: sha256_hex(&msg),
                    value_size: msg.len(),
                    value: Some(Lit::Str(msg)),
                }
            }
        };

        let input = {
            let rendered = hash_string(input);
            if !full && rendered.len() > AUDIT_VALUE_LIMIT {
                Lit::Str(sha256_hex(&rendered))
            } else {
                input.clone()
            }
        };

        let entry = TraceEntry {
            seq: self.seq,
            timestamp: now_iso8601(),
            operation: op,
            input,
            output,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            full_values: full,
            display: display.map(|line| {
                if !full && line.len() > AUDIT_VALUE_LIMIT {
                    sha256_hex(line)
                } else {
                    line.to_string()
                }
            }),
        };
        self.seq += 1;
        if let Some(w) = self.writer.as_mut() {
            write_record(w, &TraceRecord::Effect(entry), "effect")?;
        }
        Ok(())
    }

    /// Write the footer record and flush.
    pub fn finalize(&mut self, program_status: &str) -> Result<(), HostError> {
        if let Some(w) = self.writer.as_mut() {
            let footer = TraceRecord::Footer(TraceFooter {
                timestamp: now_iso8601(),
                effect_count: self.seq,
                trace_status: "complete".to_string(),
                program_status: program_status.to_string(),
            });
            write_record(w, &footer, "footer")?;
            w.flush()
                .map_err(|e| HostError::TraceWriteError(format!("flush trace: {}", e)))?;
        }
        Ok(())
    }
}

fn write_record(
    w: &mut Box<dyn Write + Send>,
    record: &TraceRecord,
    what: &str,
) -> Result<(), HostError> {
    let json = serde_json::to_string(record)
        .map_err(|e| HostError::TraceWriteError(format!("serialize {}: {}", what, e)))?;
    writeln!(w, "{}", json)
        .map_err(|e| HostError::TraceWriteError(format!("write {}: {}", what, e)))
}

// ---------------------------------------------------------------------------
// TraceReplayer
// ---------------------------------------------------------------------------

/// Errors from trace replay.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayError {
    /// Program performed a host effect not present in the trace.
    UnexpectedEffect(Op),
    /// Effect order diverged from the trace.
    OperationMismatch { expected: Op, actual: Op, seq: u64 },
    /// Effect input diverged from the trace.
    InputMismatch {
        operation: Op,
        seq: u64,
        expected: Lit,
        actual: Lit,
    },
    /// Output was hashed, cannot replay without the full value.
    MissingValue {
        operation: Op,
        seq: u64,
        value_size: usize,
    },
    /// Trace has entries that were never replayed.
    UnreplayedEffects(usize),
    /// The trace recorded a host error; replay returns it.
    ReplayedError(String),
    UnknownStatus(String),
    /// Trace was recorded in audit mode or with another schema.
    NotReplayable { seq: u64, reason: String },
    /// JSONL parse error (line index, message).
    ParseError(usize, String),
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayError::UnexpectedEffect(op) => {
                write!(f, "replay: unexpected effect '{}' not in trace", op)
            }
            ReplayError::OperationMismatch {
                expected,
                actual,
                seq,
            } => write!(
                f,
                "replay: operation mismatch at seq {}: expected '{}', got '{}'",
                seq, expected, actual
            ),
            ReplayError::InputMismatch {
                operation,
                seq,
                expected,
                actual,
            } => write!(
                f,
                "replay: input mismatch for '{}' at seq {}: expected {}, got {}",
                operation, seq, expected, actual
            ),
            ReplayError::MissingValue {
                operation,
                seq,
                value_size,
            } => write!(
                f,
                "cannot replay: output for '{}' at seq {} was hashed ({} bytes). \
                 Re-run with --trace-full to record complete values",
                operation, seq, value_size
            ),
            ReplayError::UnreplayedEffects(n) => {
                write!(f, "replay: trace has {} unreplayed entries", n)
            }
            ReplayError::ReplayedError(msg) => write!(f, "{}", msg),
            ReplayError::UnknownStatus(s) => {
                write!(f, "replay: unknown status '{}' in trace", s)
            }
            ReplayError::NotReplayable { seq, reason } => write!(
                f,
                "replay: trace entry at seq {} is not replayable: {}",
                seq, reason
            ),
            ReplayError::ParseError(line, msg) => {
                write!(f, "replay: parse error at line {}: {}", line, msg)
            }
        }
    }
}

impl std::error::Error for ReplayError {}

impl From<ReplayError> for HostError {
    fn from(e: ReplayError) -> Self {
        HostError::Replay(e.to_string())
    }
}

/// A recorded effect handed back by [`TraceReplayer::next`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayedEffect {
    pub output: Lit,
    pub display: Option<String>,
}

/// Answers host effects from a recorded trace instead of the document.
#[derive(Debug)]
pub struct TraceReplayer {
    entries: Vec<TraceEntry>,
    cursor: usize,
    trace_complete: bool,
}

impl TraceReplayer {
    /// Load a trace from JSONL content and check it is replay-capable.
    pub fn from_jsonl(content: &str) -> Result<Self, ReplayError> {
        let mut entries = Vec::new();
        let mut saw_footer = false;

        for (i, line) in content.lines().filter(|l| !l.trim().is_empty()).enumerate() {
            let record: TraceRecord =
                serde_json::from_str(line).map_err(|e| ReplayError::ParseError(i, e.to_string()))?;
            match record {
                TraceRecord::Header(h) => {
                    if h.schema_version != TRACE_SCHEMA_VERSION {
                        return Err(ReplayError::NotReplayable {
                            seq: 0,
                            reason: format!(
                                "unsupported trace schema version '{}' (expected '{}')",
                                h.schema_version, TRACE_SCHEMA_VERSION
                            ),
                        });
                    }
                    if !h.full_values {
                        return Err(ReplayError::NotReplayable {
                            seq: 0,
                            reason: "trace was recorded with --trace (audit mode). \
                                     Re-run with --trace-full for replay-capable traces"
                                .to_string(),
                        });
                    }
                }
                TraceRecord::Effect(entry) => {
                    if !entry.full_values {
                        return Err(ReplayError::NotReplayable {
                            seq: entry.seq,
                            reason: "entry was recorded in audit mode".to_string(),
                        });
                    }
                    entries.push(entry);
                }
                TraceRecord::Footer(_) => saw_footer = true,
            }
        }

        Ok(Self {
            entries,
            cursor: 0,
            trace_complete: saw_footer,
        })
    }

    /// Replay the next effect: check it matches the recording and return
    /// the recorded output.
    pub fn next(&mut self, op: Op, input: &Lit) -> Result<ReplayedEffect, ReplayError> {
        let seq = self.cursor as u64;
        let entry = self
            .entries
            .get(self.cursor)
            .ok_or(ReplayError::UnexpectedEffect(op))?;

        if entry.operation != op {
            return Err(ReplayError::OperationMismatch {
                expected: entry.operation,
                actual: op,
                seq,
            });
        }
        if entry.input != *input {
            return Err(ReplayError::InputMismatch {
                operation: op,
                seq,
                expected: entry.input.clone(),
                actual: input.clone(),
            });
        }

        self.cursor += 1;

        match entry.output.status.as_str() {
            "ok" => {
                let output = entry
                    .output
                    .value
                    .clone()
                    .ok_or(ReplayError::MissingValue {
                        operation: op,
                        seq,
                        value_size: entry.output.value_size,
                    })?;
                Ok(ReplayedEffect {
                    output,
                    display: entry.display.clone(),
                })
            }
            "error" => {
                let msg = entry
                    .output
                    .value
                    .as_ref()
                    .map(hash_string)
                    .unwrap_or_else(|| "unknown error".to_string());
                Err(ReplayError::ReplayedError(msg))
            }
            other => Err(ReplayError::UnknownStatus(other.to_string())),
        }
    }

    /// Verify that all trace entries were replayed.
    pub fn verify_complete(&self) -> Result<(), ReplayError> {
        if self.cursor < self.entries.len() {
            Err(ReplayError::UnreplayedEffects(self.entries.len() - self.cursor))
        } else {
            Ok(())
        }
    }

    /// Whether the trace ended with a footer record.
    pub fn is_trace_complete(&self) -> bool {
        self.trace_complete
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TraceSummary
// ---------------------------------------------------------------------------

/// Every record of a trace, in order, without replay checks.
#[derive(Debug, Default)]
pub struct TraceSummary {
    pub header: Option<TraceHeader>,
    pub effects: Vec<TraceEntry>,
    pub footer: Option<TraceFooter>,
}

impl TraceSummary {
    /// Decode any trace, audit or full mode.
    pub fn from_jsonl(content: &str) -> Result<Self, ReplayError> {
        let mut summary = Self::default();
        for (i, line) in content.lines().filter(|l| !l.trim().is_empty()).enumerate() {
            let record: TraceRecord =
                serde_json::from_str(line).map_err(|e| ReplayError::ParseError(i, e.to_string()))?;
            match record {
                TraceRecord::Header(h) => summary.header = Some(h),
                TraceRecord::Effect(entry) => summary.effects.push(entry),
                TraceRecord::Footer(f) => summary.footer = Some(f),
            }
        }
        Ok(summary)
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.effects.is_empty() && self.footer.is_none()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Rendering of a literal used for hashing and size accounting.
fn hash_string(lit: &Lit) -> String {
    match lit {
        Lit::Int(n) => n.to_string(),
        Lit::Float(x) => x.to_string(),
        Lit::Str(s) => s.clone(),
        Lit::Bool(b) => b.to_string(),
        Lit::Unit => "()".to_string(),
    }
}

/// SHA-256 hex digest of a string, prefixed with "sha256:".
pub fn sha256_hex(data: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

/// ISO 8601 UTC timestamp, computed with the civil-from-days algorithm.
fn now_iso8601() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = now.as_secs();
    let millis = now.subsec_millis();

    let days = (secs / 86400) as i64;
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64; // day of era [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };

    let rem = secs % 86400;
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        y,
        m,
        d,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60,
        millis
    )
}
