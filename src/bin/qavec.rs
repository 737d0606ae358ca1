use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use qavec::config::{IngestConfig, PipelineConfig};
use qavec::corpus::load_message_table;
use qavec::normalize::TextNormalizer;
use qavec::serialization::{load_char_index, save_char_index, save_split_dataset};
use qavec::vectorize::encode_text;
use qavec::vocab::{Alphabet, PAD_ID};
use qavec::Pipeline;
use rayon::ThreadPoolBuilder;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_OUTPUT_DIR: &str = "dataset";
const CHAR_INDEX_FILE: &str = "char_index.json";
const REPORT_FILE: &str = "report.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Q/A dataset preparation toolkit", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build train/validation/test tensors from raw message tables
    Prepare(PrepareArgs),
    /// Normalize text the way the pipeline does before encoding
    Clean(CleanArgs),
    /// Project and encode text against a saved character index
    Encode(EncodeArgs),
    /// Inspect character index metadata
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct PrepareArgs {
    /// Files or directories holding message tables
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory receiving the partition files and the character index
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    out_dir: PathBuf,

    /// Fraction of exchanges cut into the validation partition
    #[arg(long, value_name = "RATIO")]
    validation_fraction: Option<f64>,

    /// Fraction of exchanges cut into the test partition
    #[arg(long, value_name = "RATIO")]
    test_fraction: Option<f64>,

    /// Seed of the shuffle applied before partitioning
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Support handle whose replies become answers
    #[arg(long, value_name = "HANDLE")]
    handle: Option<String>,

    /// ISO 639-3 code both sides of a pair must classify as
    #[arg(long, value_name = "CODE")]
    language: Option<String>,

    /// Drop pairs whose language the detector cannot decide
    #[arg(long)]
    strict_language: bool,

    /// Phrase stripped before language classification (repeat flag)
    #[arg(long = "stop-phrase", value_name = "PHRASE")]
    stop_phrases: Vec<String>,

    /// Field delimiter of the input tables
    #[arg(long, value_name = "CHAR", default_value_t = ',')]
    delimiter: char,

    /// Disable per-stage logging/progress
    #[arg(long)]
    no_progress: bool,

    /// Emit pretty JSON for the character index
    #[arg(long)]
    pretty: bool,

    /// Limit Rayon worker threads
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Disable recursive directory traversal
    #[arg(long)]
    no_recursive: bool,

    /// Follow symlinks during traversal
    #[arg(long)]
    follow_symlinks: bool,
}

#[derive(Args, Debug)]
struct CleanArgs {
    /// Text to normalize when --file is omitted
    #[arg(value_name = "TEXT", required_unless_present = "file")]
    text: Vec<String>,

    /// Read the text to normalize from a file, one record per line
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Support handle whose mentions are removed
    #[arg(long, value_name = "HANDLE")]
    handle: Option<String>,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Character index JSON to load
    #[arg(short = 'm', long = "index", value_name = "PATH")]
    index: PathBuf,

    /// Texts to normalize, project, and encode
    #[arg(value_name = "TEXT", required = true)]
    texts: Vec<String>,

    /// Projection applied before encoding
    #[arg(long, value_enum, default_value_t = Side::Question)]
    side: Side,

    /// Support handle whose mentions are removed during normalization
    #[arg(long, value_name = "HANDLE")]
    handle: Option<String>,

    /// Emit JSON lines instead of human-readable output
    #[arg(long)]
    json: bool,
}

/// Which projection a text receives before encoding.
#[derive(Copy, Clone, Debug, ValueEnum)]
enum Side {
    /// Unknown characters are replaced with the out-of-vocabulary marker.
    Question,
    /// Unknown characters are dropped.
    Answer,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Side::Question => "question",
            Side::Answer => "answer",
        };
        f.write_str(label)
    }
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Character index JSON to inspect
    #[arg(short = 'm', long = "index", value_name = "PATH")]
    index: PathBuf,

    /// Emit machine-readable JSON summary
    #[arg(long)]
    json: bool,
}

#[derive(Deserialize)]
struct IndexFile {
    format: String,
    version: u32,
    chars: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Prepare(args) => run_prepare(args),
        Commands::Clean(args) => run_clean(args),
        Commands::Encode(args) => run_encode(args),
        Commands::Info(args) => run_info(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            0 => LevelFilter::Info,
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("unable to configure Rayon thread pool")?;
    }

    let defaults = PipelineConfig::default();
    let mut cfg = PipelineConfig::builder();
    if let Some(handle) = args.handle {
        cfg = cfg.target_handle(handle);
    }
    if let Some(language) = args.language {
        cfg = cfg.target_language(language);
    }
    if args.validation_fraction.is_some() || args.test_fraction.is_some() {
        cfg = cfg.split_fractions(
            args.validation_fraction
                .unwrap_or(defaults.validation_fraction),
            args.test_fraction.unwrap_or(defaults.test_fraction),
        );
    }
    if let Some(seed) = args.seed {
        cfg = cfg.seed(seed);
    }
    if !args.stop_phrases.is_empty() {
        cfg = cfg.detector_stoplist(args.stop_phrases.clone());
    }
    cfg = cfg.fail_open_language(!args.strict_language);
    cfg = cfg.show_progress(!args.no_progress);
    let pipeline_cfg = cfg.build()?;

    let delimiter = u8::try_from(args.delimiter)
        .map_err(|_| anyhow!("delimiter must be a single-byte character"))?;
    let ingest_cfg = IngestConfig {
        recursive: !args.no_recursive,
        follow_symlinks: args.follow_symlinks,
        delimiter,
    };

    let messages = load_message_table(&args.inputs, &ingest_cfg)
        .with_context(|| "failed to load message tables")?;
    info!(
        "loaded {} rows from {} input path(s)",
        messages.len(),
        args.inputs.len()
    );

    let spinner = if args.no_progress {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} preparing dataset... {elapsed}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        Some(pb)
    };

    let pipeline = Pipeline::new(pipeline_cfg);
    let start = Instant::now();
    let artifacts = pipeline.run_from_messages(&messages)?;
    drop(messages);
    if let Some(pb) = spinner {
        pb.finish_with_message("preparation complete");
    }
    let elapsed = start.elapsed();

    let written = save_split_dataset(&artifacts.dataset, &args.out_dir)
        .with_context(|| format!("failed to write dataset to {}", args.out_dir.display()))?;
    let index_path = args.out_dir.join(CHAR_INDEX_FILE);
    save_char_index(&artifacts.char_index, &index_path, args.pretty)
        .with_context(|| format!("failed to write character index to {}", index_path.display()))?;
    let report_path = args.out_dir.join(REPORT_FILE);
    let report = serde_json::to_string_pretty(&artifacts.metrics)?;
    fs::write(&report_path, report)
        .with_context(|| format!("failed to write run report to {}", report_path.display()))?;

    let (train, validation, test) = artifacts.dataset.partition_sizes();
    let exchanges = artifacts.metrics.pairing.exchanges;
    let width = artifacts.dataset.sequence_width();
    info!("preparation complete: exchanges={exchanges} width={width} duration={elapsed:.2?}");
    println!(
        "✅ wrote {train} train / {validation} validation / {test} test exchanges to {}",
        args.out_dir.display()
    );
    println!(
        "   vocab {} chars | width {width} | {} files | index {}",
        artifacts.char_index.len(),
        written.len(),
        index_path.display()
    );

    Ok(())
}

fn run_clean(args: CleanArgs) -> Result<()> {
    let handle = args
        .handle
        .unwrap_or_else(|| PipelineConfig::default().target_handle);
    let normalizer = TextNormalizer::new(&handle);

    let text = if let Some(path) = &args.file {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    } else {
        args.text.join(" ")
    };

    for line in text.lines() {
        println!("{}", normalizer.clean(&line.to_lowercase()));
    }

    Ok(())
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    let index = load_char_index(&args.index).with_context(|| {
        format!("failed to load character index from {}", args.index.display())
    })?;
    let alphabet = Alphabet::from_chars(index.chars());
    let handle = args
        .handle
        .unwrap_or_else(|| PipelineConfig::default().target_handle);
    let normalizer = TextNormalizer::new(&handle);

    for text in &args.texts {
        let cleaned = normalizer.clean(&text.to_lowercase());
        let projected = match args.side {
            Side::Question => alphabet.project_question(&cleaned),
            Side::Answer => alphabet.project_answer(&cleaned),
        };
        let ids = encode_text(&projected, &index);
        if args.json {
            let record = json!({
                "text": text,
                "projected": projected,
                "ids": ids
            });
            println!("{}", serde_json::to_string(&record)?);
        } else {
            print!("{text}:\t");
            for (idx, id) in ids.iter().enumerate() {
                if idx > 0 {
                    print!(" ");
                }
                print!("{id}");
            }
            println!();
        }
    }

    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let data = fs::read_to_string(&args.index)
        .with_context(|| format!("failed to read {}", args.index.display()))?;
    let parsed: IndexFile = serde_json::from_str(&data).context("failed to parse character index")?;
    let index = load_char_index(&args.index)?;

    let summary = json!({
        "path": args.index.display().to_string(),
        "format": parsed.format,
        "version": parsed.version,
        "vocab_size": index.len(),
        "pad_id": PAD_ID,
        "characters": parsed.chars,
    });

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Format     : {}", parsed.format);
        println!("Version    : {}", parsed.version);
        println!("Vocab size : {}", index.len());
        println!("Id range   : 1..={} ({PAD_ID} reserved for padding)", index.len());
        println!("Characters : {:?}", parsed.chars);
    }

    Ok(())
}
