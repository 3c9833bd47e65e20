use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use spindle_cli::host::Document;
use spindle_cli::run::{self, RunOptions, RunOutcome};
use spindle_cli::trace::{TraceReplayer, TraceSummary};
use spindle_eval::{EvalConfig, MAX_FRAME_DEPTH};

#[derive(Parser, Debug)]
#[command(name = "spindle")]
#[command(about = "Spindle: expressions with one-shot algebraic effects")]
struct Cli {
    /// Log evaluator and host activity to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a JSON-encoded program against a document
    Run {
        /// Path to the program (JSON expression tree)
        file: PathBuf,

        /// Document description answering host effects (JSON)
        #[arg(long)]
        document: Option<PathBuf>,

        /// Write effect trace to file (large values hashed)
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Write replay-capable trace (all values recorded)
        #[arg(long, conflicts_with = "trace")]
        trace_full: Option<PathBuf>,

        #[command(flatten)]
        limits: Limits,
    },

    /// Replay a recorded effect trace
    Replay {
        /// Path to trace JSONL file
        trace_path: PathBuf,

        /// Path to the program (omit for trace summary)
        file: Option<PathBuf>,

        #[command(flatten)]
        limits: Limits,
    },

    /// Decode a program and dump its expression tree
    Show {
        /// Path to the program (JSON expression tree)
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },
}

#[derive(clap::Args, Debug)]
struct Limits {
    /// Maximum number of pending evaluation frames
    #[arg(long, default_value_t = MAX_FRAME_DEPTH)]
    max_depth: usize,

    /// Abort after this many evaluation steps
    #[arg(long)]
    max_steps: Option<u64>,
}

impl Limits {
    fn config(&self) -> EvalConfig {
        let config = EvalConfig::default().with_max_depth(self.max_depth);
        match self.max_steps {
            Some(steps) => config.with_max_steps(steps),
            None => config,
        }
    }
}

#[derive(ValueEnum, Clone, Debug)]
enum Format {
    Pretty,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            file,
            document,
            trace,
            trace_full,
            limits,
        } => cmd_run(&file, document.as_deref(), trace, trace_full, &limits),

        Commands::Replay {
            trace_path,
            file,
            limits,
        } => cmd_replay(&trace_path, file.as_deref(), &limits),

        Commands::Show { file, format } => cmd_show(&file, format),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::new("spindle_eval=debug,spindle_cli=debug"),
        Err(_) => EnvFilter::new("warn"),
    };
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .with(filter)
        .init();
}

fn cmd_run(
    file: &Path,
    document: Option<&Path>,
    trace: Option<PathBuf>,
    trace_full: Option<PathBuf>,
    limits: &Limits,
) -> Result<()> {
    let program = run::load_program(file)?;
    let opts = RunOptions {
        config: limits.config(),
        document: match document {
            Some(path) => Document::load(path)?,
            None => Document::default(),
        },
    };

    let (trace_path, full) = match (trace, trace_full) {
        (_, Some(path)) => (Some(path), true),
        (Some(path), None) => (Some(path), false),
        (None, None) => (None, false),
    };

    match trace_path {
        Some(path) => {
            let writer: Box<dyn std::io::Write + Send> = Box::new(
                std::fs::File::create(&path)
                    .with_context(|| format!("failed to create trace {}", path.display()))?,
            );
            let outcome = run::run_program_traced(&program, &opts, writer, full)?;
            print_outcome(&outcome);
            eprintln!("Trace written to {}", path.display());
        }
        None => {
            let outcome = run::run_program(&program, &opts)?;
            print_outcome(&outcome);
        }
    }

    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    for line in &outcome.display_log {
        println!("{}", line);
    }
    println!("result = {}", outcome.rendered);
}

fn cmd_replay(trace_path: &Path, file: Option<&Path>, limits: &Limits) -> Result<()> {
    let trace_content = std::fs::read_to_string(trace_path)
        .with_context(|| format!("failed to read trace file '{}'", trace_path.display()))?;

    match file {
        Some(program_path) => {
            let program = run::load_program(program_path)?;
            let replayer = TraceReplayer::from_jsonl(&trace_content)?;
            let effect_count = replayer.len();
            let outcome = run::run_program_with_replayer(&program, limits.config(), replayer)?;
            print_outcome(&outcome);
            println!("Replay successful: {} effects replayed.", effect_count);
        }
        None => print_trace_summary(&TraceSummary::from_jsonl(&trace_content)?),
    }

    Ok(())
}

fn print_trace_summary(summary: &TraceSummary) {
    if summary.is_empty() {
        println!("Trace: empty (no effects recorded)");
        return;
    }

    if let Some(header) = &summary.header {
        let mode = if header.full_values {
            "full (replay-capable)"
        } else {
            "audit (hashed)"
        };
        println!("Trace schema: v{}, mode: {}", header.schema_version, mode);
    }

    println!("Trace summary: {} effects", summary.effects.len());
    for entry in &summary.effects {
        let shown = match (&entry.output.value, entry.output.status.as_str()) {
            (Some(value), "ok") => value.to_string(),
            (Some(value), _) => format!("error: {}", value),
            (None, _) => format!("{} ({} bytes)", entry.output.value_hash, entry.output.value_size),
        };
        println!(
            "  [{}] {} {} => {} ({}ms)",
            entry.seq, entry.operation, entry.input, shown, entry.duration_ms
        );
        if let Some(line) = &entry.display {
            println!("        display: {}", line);
        }
    }

    match &summary.footer {
        Some(footer) => println!(
            "Program: {}, Trace: {}",
            footer.program_status, footer.trace_status
        ),
        None => println!("Trace: incomplete (no footer)"),
    }
}

fn cmd_show(file: &Path, format: Format) -> Result<()> {
    let program = run::load_program(file)?;
    match format {
        Format::Pretty => println!("{:#?}", program),
        Format::Json => println!("{}", serde_json::to_string_pretty(&program)?),
    }
    Ok(())
}
