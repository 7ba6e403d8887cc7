use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process;

use clap::ValueEnum;
use serde::Serialize;
use tracing::debug;

use lm_core::eval::entropy;
use lm_core::merged::{LinintModel, LoglinintModel, OverlayModel};
use lm_core::model::LevelCounts;
use lm_core::{LanguageModel, PredictOptions, Prediction, Smoothing};

use super::{line_tokens, parse_model_arg, AnyModel, ModelKind};

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    Overlay,
    Linint,
    Loglinint,
}

pub struct PredictArgs<'a> {
    pub limit: usize,
    pub smoothing: Option<Smoothing>,
    pub case_insensitive: bool,
    pub json: bool,
    pub context: &'a [String],
}

/// Context words with the completion prefix last; an empty context asks for
/// the first word.
fn context_words(context: &[String]) -> Vec<&str> {
    let mut words: Vec<&str> = context.iter().map(String::as_str).collect();
    if words.is_empty() {
        words.push("");
    }
    words
}

fn print_predictions(results: &[Prediction], json: bool) {
    if json {
        println!("{}", die!(serde_json::to_string_pretty(results), "Error: {}"));
        return;
    }
    for (i, r) in results.iter().enumerate() {
        println!("#{:>2}: {:<24} {:.6}", i + 1, r.word, r.probability);
    }
}

pub fn learn(corpus: &str, model_file: &str, kind: ModelKind, order: usize) {
    let path = Path::new(model_file);
    let mut model = if path.exists() {
        die!(
            AnyModel::open(path, Some(kind)),
            "Error opening {model_file}: {}"
        )
    } else {
        AnyModel::new(kind, order)
    };

    let reader = BufReader::new(die!(File::open(corpus), "Error opening {corpus}: {}"));
    let mut lines = 0usize;
    for line in reader.lines() {
        let line = die!(line, "Error reading {corpus}: {}");
        die!(
            model.as_dynamic_mut().learn_tokens(&line_tokens(&line), true),
            "Error learning: {}"
        );
        lines += 1;
    }
    die!(model.as_dynamic().save(path), "Error saving {model_file}: {}");
    debug!(lines, model_file, "learned");
    println!(
        "Learned {lines} lines, {} words in vocabulary",
        model.as_dynamic().vocabulary().len()
    );
}

pub fn predict(model_file: &str, kind: Option<ModelKind>, args: &PredictArgs<'_>) {
    let mut model = die!(
        AnyModel::open(Path::new(model_file), kind),
        "Error opening {model_file}: {}"
    );
    if let Some(smoothing) = args.smoothing {
        die!(
            model.as_dynamic_mut().set_smoothing(smoothing),
            "Error: {}"
        );
    }
    let mut options = PredictOptions::NONE;
    if args.case_insensitive {
        options |= PredictOptions::CASE_INSENSITIVE;
    }
    let results =
        model
            .as_language_model()
            .predict(&context_words(args.context), Some(args.limit), options);
    print_predictions(&results, args.json);
}

#[derive(Serialize)]
struct Info<'a> {
    kind: String,
    order: usize,
    smoothing: Option<String>,
    words: usize,
    levels: &'a [LevelCounts],
    memory_bytes: usize,
}

pub fn info(model_file: &str, kind: Option<ModelKind>, json: bool) {
    let model = die!(
        AnyModel::open(Path::new(model_file), kind),
        "Error opening {model_file}: {}"
    );
    let m = model.as_dynamic();
    let counts = m.counts();
    let info = Info {
        kind: format!("{:?}", model.kind()),
        order: m.order(),
        smoothing: m.smoothing().map(|s| s.to_string()),
        words: m.vocabulary().len(),
        levels: &counts,
        memory_bytes: m.memory_size(),
    };
    if json {
        println!("{}", die!(serde_json::to_string_pretty(&info), "Error: {}"));
        return;
    }
    println!("Kind:       {}", info.kind);
    println!("Order:      {}", info.order);
    if let Some(smoothing) = &info.smoothing {
        println!("Smoothing:  {smoothing}");
    }
    println!("Vocabulary: {}", info.words);
    for (i, c) in counts.iter().enumerate() {
        println!(
            "  {}-grams: {:>10} distinct {:>12} total",
            i + 1,
            c.ngrams,
            c.occurrences
        );
    }
    println!("Memory:     {} bytes", info.memory_bytes);
}

pub fn prune(input: &str, output: &str, kind: Option<ModelKind>, counts: &[i64]) {
    let model = die!(
        AnyModel::open(Path::new(input), kind),
        "Error opening {input}: {}"
    );
    let pruned = match &model {
        AnyModel::Unigram(m) => AnyModel::Unigram(die!(m.prune(counts), "Error pruning: {}")),
        AnyModel::Dynamic(m) => AnyModel::Dynamic(die!(m.prune(counts), "Error pruning: {}")),
        AnyModel::KneserNey(m) => AnyModel::KneserNey(die!(m.prune(counts), "Error pruning: {}")),
        AnyModel::Cached(m) => AnyModel::Cached(die!(m.prune(counts), "Error pruning: {}")),
    };
    die!(
        pruned.as_dynamic().save(Path::new(output)),
        "Error saving {output}: {}"
    );
    let before: usize = model.as_dynamic().counts().iter().map(|c| c.ngrams).sum();
    let after: usize = pruned.as_dynamic().counts().iter().map(|c| c.ngrams).sum();
    println!("Pruned {before} -> {after} n-grams, order {}", pruned.as_dynamic().order());
}

pub fn entropy_cmd(model_file: &str, kind: Option<ModelKind>, text_file: &str, order: Option<usize>) {
    let model = die!(
        AnyModel::open(Path::new(model_file), kind),
        "Error opening {model_file}: {}"
    );
    let text = die!(fs::read_to_string(text_file), "Error reading {text_file}: {}");
    let tokens: Vec<&str> = text.lines().flat_map(line_tokens).collect();
    let order = order.unwrap_or_else(|| model.as_dynamic().order());
    let e = entropy(model.as_language_model(), &tokens, order);
    println!("Tokens:     {}", tokens.len());
    println!("Entropy:    {:.4} bits", e.bits);
    println!("Perplexity: {:.2}", e.perplexity);
}

pub fn mix(
    model_args: &[String],
    kind: Option<ModelKind>,
    strategy: Strategy,
    args: &PredictArgs<'_>,
) {
    let mut models = Vec::with_capacity(model_args.len());
    let mut weights = Vec::with_capacity(model_args.len());
    for arg in model_args {
        let (path, weight) = parse_model_arg(arg);
        let mut model = die!(
            AnyModel::open(Path::new(path), kind),
            "Error opening {path}: {}"
        );
        if let Some(smoothing) = args.smoothing {
            // Unigram components have no smoothing to set.
            if model.as_dynamic().smoothing().is_some() {
                die!(
                    model.as_dynamic_mut().set_smoothing(smoothing),
                    "Error: {}"
                );
            }
        }
        models.push(model);
        weights.push(weight.unwrap_or(lm_core::settings::settings().composition.default_weight));
    }
    let components: Vec<&dyn LanguageModel> = models.iter().map(AnyModel::as_language_model).collect();

    let context = context_words(args.context);
    let mut options = PredictOptions::NORMALIZE;
    if args.case_insensitive {
        options |= PredictOptions::CASE_INSENSITIVE;
    }
    let limit = Some(args.limit);
    let results = match strategy {
        Strategy::Overlay => OverlayModel::new(components).predict(&context, limit, options),
        Strategy::Linint => {
            LinintModel::with_weights(components, &weights).predict(&context, limit, options)
        }
        Strategy::Loglinint => {
            LoglinintModel::with_weights(components, &weights).predict(&context, limit, options)
        }
    };
    print_predictions(&results, args.json);
}
