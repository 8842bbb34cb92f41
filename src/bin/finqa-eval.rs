use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zahlwerk::{
    dataset,
    eval::runner::{DialogueEvaluator, EvalConfig},
    prompt,
    providers::{openai::OpenAI, throttled::Throttled},
    LLMProvider,
};

#[derive(Parser)]
#[command(name = "finqa-eval")]
#[command(about = "Evaluate multi-turn financial QA dialogues against an LLM")]
struct Args {
    /// Path to the turn-level dataset JSON (ConvFinQA dev_turn format)
    #[arg(long, default_value = "data/dev_turn.json")]
    data: PathBuf,

    /// Model identifier
    #[arg(long, default_value = "gpt-4o")]
    model: String,

    #[arg(long, default_value_t = 0.1)]
    temperature: f32,

    /// Evaluate at most this many dialogues
    #[arg(long)]
    max_dialogues: Option<usize>,

    /// Delay before each provider call, per worker, in milliseconds
    #[arg(long, default_value_t = 1000)]
    sleep_ms: u64,

    /// How many dialogues to evaluate in parallel
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    #[arg(long, default_value_t = 1e-3)]
    relative_tolerance: f64,

    #[arg(long, default_value_t = 1e-4)]
    absolute_tolerance: f64,

    /// Replace the built-in system instructions with the contents of a file
    #[arg(long)]
    system_prompt: Option<PathBuf>,

    /// Output path for JSONL dialogue results
    #[arg(long)]
    out: Option<PathBuf>,
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn default_out_path() -> PathBuf {
    let ts = chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    PathBuf::from(format!("runs/{ts}.jsonl"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let dialogues = dataset::load_dialogues(&args.data)?;
    tracing::info!(count = dialogues.len(), data = %args.data.display(), "loaded dialogues");

    let system_instructions = match &args.system_prompt {
        Some(path) => prompt::load_instructions(path)?,
        None => prompt::DEFAULT_SYSTEM_INSTRUCTIONS.to_string(),
    };

    let provider: Arc<dyn LLMProvider> = {
        let openai = OpenAI::from_env()?;
        if args.sleep_ms > 0 {
            Arc::new(Throttled::new(openai, Duration::from_millis(args.sleep_ms)))
        } else {
            Arc::new(openai)
        }
    };

    let config = EvalConfig {
        model_name: args.model.clone(),
        temperature: args.temperature,
        relative_tolerance: args.relative_tolerance,
        absolute_tolerance: args.absolute_tolerance,
        max_dialogues: args.max_dialogues,
        concurrency: args.concurrency,
        system_instructions,
    };

    let evaluator = DialogueEvaluator::new(provider, config);
    let report = evaluator.evaluate_all(&dialogues).await?;

    let out_path = args.out.unwrap_or_else(default_out_path);
    ensure_parent_dir(&out_path)?;
    let file = fs::File::create(&out_path)?;
    let mut writer = BufWriter::new(file);
    for dialogue in &report.dialogues {
        serde_json::to_writer(&mut writer, dialogue)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    let aggregate = &report.aggregate;
    tracing::info!(
        model = %args.model,
        dialogues = report.dialogues.len(),
        questions = aggregate.total_questions,
        correct = aggregate.total_correct,
        errors = aggregate.total_errors,
        accuracy = aggregate.accuracy(),
        out = %out_path.display(),
        "evaluation complete"
    );

    Ok(())
}
