use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lm_cli::commands::model_ops::{self, PredictArgs, Strategy};
use lm_cli::commands::{config_ops, ModelKind};
use lm_core::Smoothing;

#[derive(Parser)]
#[command(name = "lmtool", about = "N-gram language model tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Learn a corpus (one sentence per line) into a model file
    Learn {
        /// Corpus text file
        corpus: String,
        /// Model file, extended if it exists
        model: String,
        /// Model kind
        #[arg(long, value_enum, default_value = "dynamic")]
        kind: ModelKind,
        /// N-gram order for new models
        #[arg(long, default_value_t = lm_core::settings::settings().model.order)]
        order: usize,
    },
    /// Predict completions of the last context word
    Predict {
        /// Model file
        model: String,
        /// Context words; the last one is completed, pass "" for the next word
        context: Vec<String>,
        /// Model kind (default: inferred from the file)
        #[arg(long, value_enum)]
        kind: Option<ModelKind>,
        /// Number of predictions
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Smoothing (witten-bell, abs-disc, kneser-ney)
        #[arg(long)]
        smoothing: Option<Smoothing>,
        /// Match the prefix case-insensitively
        #[arg(long)]
        case_insensitive: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show order, counts and memory use of a model
    Info {
        /// Model file
        model: String,
        #[arg(long, value_enum)]
        kind: Option<ModelKind>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop rare n-grams
    Prune {
        /// Input model file
        input: String,
        /// Output model file
        output: String,
        #[arg(long, value_enum)]
        kind: Option<ModelKind>,
        /// Per-level thresholds; n-grams with count <= threshold are dropped, -1 drops the level
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, default_value = "0")]
        counts: Vec<i64>,
    },
    /// Cross-entropy and perplexity of a text
    Entropy {
        /// Model file
        model: String,
        /// Text file (one sentence per line)
        text: String,
        #[arg(long, value_enum)]
        kind: Option<ModelKind>,
        /// Window size (default: model order)
        #[arg(long)]
        order: Option<usize>,
    },
    /// Predict with a composite of several models
    Mix {
        /// Context words; the last one is completed
        context: Vec<String>,
        /// Component model as path[:weight], repeatable
        #[arg(long = "model", required = true)]
        models: Vec<String>,
        /// Merge strategy
        #[arg(long, value_enum, default_value = "linint")]
        strategy: Strategy,
        #[arg(long, value_enum)]
        kind: Option<ModelKind>,
        #[arg(short, long, default_value = "10")]
        limit: usize,
        #[arg(long)]
        smoothing: Option<Smoothing>,
        #[arg(long)]
        case_insensitive: bool,
        #[arg(long)]
        json: bool,
    },
    /// Export default settings as TOML
    Settings,
    /// Validate a custom settings TOML file
    SettingsValidate {
        /// Path to the TOML file
        file: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lm_core=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Learn {
            corpus,
            model,
            kind,
            order,
        } => model_ops::learn(&corpus, &model, kind, order),
        Command::Predict {
            model,
            context,
            kind,
            limit,
            smoothing,
            case_insensitive,
            json,
        } => {
            let args = PredictArgs {
                limit,
                smoothing,
                case_insensitive,
                json,
                context: &context,
            };
            model_ops::predict(&model, kind, &args);
        }
        Command::Info { model, kind, json } => model_ops::info(&model, kind, json),
        Command::Prune {
            input,
            output,
            kind,
            counts,
        } => model_ops::prune(&input, &output, kind, &counts),
        Command::Entropy {
            model,
            text,
            kind,
            order,
        } => model_ops::entropy_cmd(&model, kind, &text, order),
        Command::Mix {
            context,
            models,
            strategy,
            kind,
            limit,
            smoothing,
            case_insensitive,
            json,
        } => {
            let args = PredictArgs {
                limit,
                smoothing,
                case_insensitive,
                json,
                context: &context,
            };
            model_ops::mix(&models, kind, strategy, &args);
        }
        Command::Settings => config_ops::settings_export(),
        Command::SettingsValidate { file } => config_ops::settings_validate(&file),
    }
}
