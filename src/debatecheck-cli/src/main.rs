//! Debatecheck CLI - Fact-Checking Debate Tool
//!
//! Batch fact-checking of claims through multi-agent debate against
//! OpenAI-compatible completion endpoints, with resumable checkpointing.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use debatecheck_core::{
    BatchScheduler, Checkpoint, CompletionBackend, DebateEvent, ExampleSet, MockBackend,
    OpenAiBackend, RunMode, StockCatalog, Verdict, available_formats, eval, extract_verdict,
    get_format,
};

#[derive(Parser)]
#[command(
    name = "debatecheck",
    version,
    about = "Fact-check claims by letting AI agents debate them",
    long_about = "A CLI tool for batch fact-checking: role-conditioned agents debate each \
                  claim over its retrieved evidence, a judge rules, and verdicts are \
                  extracted for evaluation."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the claims from an input file through debate sessions
    Run(RunArgs),
    /// Score a predictions file against a ground-truth file
    Eval(EvalArgs),
    /// List the available debate formats
    Formats,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Input JSON file of examples (claim + evidence_full_text per id)
    #[arg(long, value_name = "FILE")]
    input: PathBuf,

    /// Debate format, or "single" for one-shot fact checking
    #[arg(long, default_value = "pro-con", value_name = "FORMAT")]
    format: String,

    /// Run the intent-inference/reformulation stage before each debate
    #[arg(long)]
    intent: bool,

    /// Completion backend
    #[arg(long, value_enum, default_value = "openai")]
    backend: BackendKind,

    /// Model name passed to the completion endpoint
    #[arg(short, long, default_value = "gpt-4o-mini", value_name = "MODEL")]
    model: String,

    /// Claims per scheduling chunk
    #[arg(long, default_value_t = debatecheck_core::DEFAULT_CHUNK_SIZE, value_name = "N")]
    chunk_size: usize,

    /// Output file (defaults to <input stem>_answer_map_<format>.json)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Only process the first N examples
    #[arg(long, value_name = "N")]
    max_claims: Option<usize>,

    /// Print every statement as it is produced
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::Args)]
struct EvalArgs {
    /// Predictions file produced by `run`
    #[arg(long, value_name = "FILE")]
    predictions: PathBuf,

    /// Ground-truth file ({id: label} or [{example_id, veracity}])
    #[arg(long, value_name = "FILE")]
    ground_truth: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// Any OpenAI-compatible chat-completions endpoint
    Openai,
    /// Offline scripted backend (dry runs)
    Mock,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Run(args) => run(args).await,
        Command::Eval(args) => evaluate(args),
        Command::Formats => {
            list_formats();
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let examples = ExampleSet::from_path(&args.input)
        .with_context(|| format!("failed to load input file {}", args.input.display()))?;
    if examples.is_empty() {
        bail!("input file {} contains no usable examples", args.input.display());
    }

    let mode = RunMode::resolve(&args.format, args.intent)?;

    let backend: Arc<dyn CompletionBackend> = match args.backend {
        BackendKind::Openai => {
            let api_base = env::var("OPENAI_API_BASE")
                .or_else(|_| env::var("OPENAI_BASE_URL"))
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
            let api_key = env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY is not set (required for the openai backend)")?;
            Arc::new(OpenAiBackend::new(api_base, api_key, &args.model)?)
        }
        BackendKind::Mock => Arc::new(MockBackend::constant(
            "[VERDICT]: HALF-TRUE\n[REASON]: dry run.",
        )),
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, &args.format));
    let mut checkpoint = Checkpoint::load(&output)
        .with_context(|| format!("failed to load checkpoint {}", output.display()))?;

    let selected = match args.max_claims {
        Some(n) => &examples.examples()[..n.min(examples.len())],
        None => examples.examples(),
    };

    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!("  {} - {} format", "Debatecheck".bold(), args.format)
            .bright_blue()
            .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!("{} {}", "Input:".bold(), args.input.display());
    println!("{} {}", "Output:".bold(), output.display());
    println!(
        "{} {} examples ({} already checkpointed)",
        "Processing:".bold(),
        selected.len(),
        checkpoint.len()
    );
    println!();

    let mut scheduler =
        BatchScheduler::new(backend, Arc::new(StockCatalog), mode, args.chunk_size)?;
    if args.verbose {
        scheduler = scheduler.with_callback(console_callback());
    }

    let summary = scheduler.run(selected, &mut checkpoint).await?;

    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "  {} {} processed, {} resumed, {} failed",
        "Done:".bright_green().bold(),
        summary.processed,
        summary.skipped,
        summary.failed.len()
    );
    if !summary.failed.is_empty() {
        println!(
            "  {} {}",
            "Failed ids:".yellow(),
            summary.failed.join(", ")
        );
    }
    print_verdict_tally(&checkpoint);
    println!("{}", "═".repeat(70).bright_blue());
    println!();

    // per-claim failures were logged and skipped; only startup errors are
    // fatal, so a partial run still exits cleanly
    Ok(())
}

fn print_verdict_tally(checkpoint: &Checkpoint) {
    let mut tally: BTreeMap<Verdict, usize> = BTreeMap::new();
    for record in checkpoint.records().values() {
        *tally.entry(extract_verdict(record)).or_default() += 1;
    }
    if tally.is_empty() {
        return;
    }
    let line = tally
        .iter()
        .map(|(verdict, count)| format!("{verdict}: {count}"))
        .collect::<Vec<_>>()
        .join("  ");
    println!("  {} {}", "Verdicts:".bold(), line);
}

fn evaluate(args: EvalArgs) -> anyhow::Result<()> {
    let predictions = eval::load_predictions(&args.predictions)
        .with_context(|| format!("failed to load predictions {}", args.predictions.display()))?;
    let ground_truth = eval::load_ground_truth(&args.ground_truth).with_context(|| {
        format!("failed to load ground truth {}", args.ground_truth.display())
    })?;
    let report = eval::evaluate(&predictions, &ground_truth);

    println!();
    println!("{} {}", "File:".bold(), args.predictions.display());
    println!("  Total samples: {}", report.total);
    println!("  Correct predictions: {}", report.correct);
    println!("  Overall Accuracy: {:.2}%", report.accuracy * 100.0);
    println!(
        "  Unknown predictions: {}",
        if report.unknown_predictions > 0 {
            report.unknown_predictions.to_string().yellow()
        } else {
            report.unknown_predictions.to_string().normal()
        }
    );
    println!();
    println!("  {}", "Sample Distribution:".bold());
    for class in Verdict::classes() {
        println!("    {class}: {} samples", report.distribution[&class]);
    }
    println!();
    println!("  {}", "F1 Scores:".bold());
    for class in Verdict::classes() {
        let m = report.per_class[&class];
        println!(
            "    {class} - Precision: {:.2}%, Recall: {:.2}%, F1: {:.2}%",
            m.precision * 100.0,
            m.recall * 100.0,
            m.f1 * 100.0
        );
    }
    println!("  Macro-F1: {:.2}%", report.macro_f1 * 100.0);
    println!();
    Ok(())
}

fn list_formats() {
    println!();
    println!("{}", "Available formats:".bold());
    println!(
        "  {} - one fact-checker call per claim, no debate",
        "single".bright_cyan()
    );
    for name in available_formats() {
        let Some(format) = get_format(name) else {
            continue;
        };
        let roles = format
            .roles
            .iter()
            .map(|r| format!("{} ({:?})", r.id, r.stance))
            .collect::<Vec<_>>()
            .join(", ");
        let rounds = if format.closing_round {
            "opening/rebuttal/closing"
        } else {
            "opening/rebuttal"
        };
        println!("  {} - {roles}; {rounds}", name.bright_cyan());
    }
    println!();
}

/// `examples.json` run with format `people` lands in
/// `examples_answer_map_people.json` next to the input.
fn default_output_path(input: &Path, format: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results".to_string());
    let file = format!("{stem}_answer_map_{format}.json");
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(file),
        _ => PathBuf::from(file),
    }
}

/// Print session events to the console as they happen.
fn console_callback() -> debatecheck_core::DebateCallback {
    Box::new(move |event| match event {
        DebateEvent::StageStart { stage } => {
            println!();
            println!(
                "{}",
                format!("  ── {} ──", stage.label()).bright_magenta().bold()
            );
        }
        DebateEvent::TurnComplete { role, content, .. } => {
            println!("{} {}", "▶".bright_cyan(), role.bright_cyan().bold());
            for line in content.lines() {
                println!("    {line}");
            }
        }
        DebateEvent::SessionEnd => {
            println!("  {}", "session complete".dimmed());
        }
    })
}
