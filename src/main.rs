use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use bzip2::read::BzDecoder;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use wiktionary_extractor::parallel::{
    process_batch_parallel, process_channel_pipeline, process_sequential, Limits, ParallelConfig, Stats,
};
use wiktionary_extractor::{Edition, Extractor, TemplateStore};

const IO_BUFFER: usize = 256 * 1024;

/// Processing strategy for a dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Sequential processing (baseline)
    Sequential,
    /// Batch-parallel processing with scoped threads
    BatchParallel,
    /// Channel-based pipeline processing
    ChannelPipeline,
}

#[derive(Parser)]
#[command(name = "wiktionary-extractor")]
#[command(about = "Extract structured entries from a Wiktionary XML dump - one JSON entry per line")]
struct Args {
    /// Input XML file (.xml or .xml.bz2)
    input: PathBuf,

    /// Output JSONL file
    output: PathBuf,

    /// Built-in edition (ms, th, simple, ru)
    #[arg(short, long, default_value = "ms", conflicts_with = "edition_file")]
    edition: String,

    /// Edition configuration YAML, instead of a built-in edition
    #[arg(long)]
    edition_file: Option<PathBuf>,

    /// Template bodies YAML (name: body) used to expand templates
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Processing strategy
    #[arg(short, long, value_enum, default_value_t = Strategy::ChannelPipeline)]
    strategy: Strategy,

    /// Number of threads (4 = default, 0 = auto-detect)
    #[arg(short, long, default_value_t = 4)]
    threads: usize,

    /// Batch size for batch-parallel strategy
    #[arg(long, default_value_t = 1000)]
    batch_size: usize,

    /// Channel buffer size for channel-pipeline strategy
    #[arg(long, default_value_t = 10000)]
    channel_buffer: usize,

    /// Limit number of entries to extract (for testing)
    #[arg(long)]
    limit: Option<usize>,

    /// Limit number of pages to scan (for testing with raw dumps)
    #[arg(long)]
    page_limit: Option<usize>,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,

    /// Log every diagnostic, not just warnings and errors
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "wiktionary_extractor=debug"
    } else {
        "wiktionary_extractor=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader: Box<dyn BufRead + Send> = if path.to_string_lossy().ends_with(".bz2") {
        Box::new(BufReader::with_capacity(IO_BUFFER, BzDecoder::new(file)))
    } else {
        Box::new(BufReader::with_capacity(IO_BUFFER, file))
    };
    Ok(reader)
}

fn load_extractor(args: &Args) -> Result<Extractor> {
    let edition = match &args.edition_file {
        Some(path) => Edition::from_yaml_file(path)?,
        None => Edition::builtin(&args.edition)?,
    };
    let templates = match &args.templates {
        Some(path) => TemplateStore::from_yaml_file(path)?,
        None => TemplateStore::new(),
    };
    tracing::info!(edition = %edition.code, templates = templates.len(), "configuration loaded");
    Ok(Extractor::new(edition, templates))
}

/// Run sequential processing with a progress spinner
fn run_sequential(
    extractor: &Extractor,
    reader: impl BufRead,
    writer: &mut BufWriter<File>,
    limits: Limits,
    quiet: bool,
) -> Result<Stats> {
    let start_time = Instant::now();
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
        pb
    };

    let stats = process_sequential(extractor, reader, writer, limits, |stats| {
        if stats.pages_processed % 1000 == 0 {
            let rate = stats.pages_processed as f64 / start_time.elapsed().as_secs_f64();
            pb.set_message(format!(
                "Pages: {} | Entries: {} | Rate: {:.0} pg/s",
                stats.pages_processed, stats.entries_written, rate
            ));
            pb.tick();
        }
    })?;

    pb.finish_and_clear();
    Ok(stats)
}

fn print_stats(stats: &Stats, strategy_name: &str) {
    println!();
    println!("============================================================");
    println!("Strategy: {}", strategy_name);
    println!("Pages processed: {}", stats.pages_processed);
    println!("Pages with entries: {}", stats.pages_with_entries);
    println!("Entries written: {}", stats.entries_written);
    println!(
        "Avg entries/page: {:.2}",
        stats.entries_written as f64 / stats.pages_with_entries.max(1) as f64
    );
    println!("------------------------------------------------------------");
    println!("Redirects: {}", stats.redirects);
    println!("Non-article pages: {}", stats.non_article);
    println!("Skipped: {}", stats.skipped);
    println!("Diagnostics: {}", stats.diagnostics);
    println!("Time: {}m {}s", stats.elapsed.as_secs() / 60, stats.elapsed.as_secs() % 60);
    println!("Rate: {:.0} pages/sec", stats.rate());
    println!("============================================================");
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let extractor = Arc::new(load_extractor(&args)?);

    let mut config = ParallelConfig::default();
    if args.threads > 0 {
        config.num_threads = args.threads;
        config.num_workers = args.threads.saturating_sub(1).max(1);
    }
    config.batch_size = args.batch_size;
    config.channel_buffer = args.channel_buffer;

    let limits = Limits {
        entries: args.limit,
        pages: args.page_limit,
    };

    if !args.quiet {
        println!("Parsing: {}", args.input.display());
        println!("Output: {}", args.output.display());
        println!("Edition: {}", extractor.edition().name);
        println!("Strategy: {:?}", args.strategy);
        if args.strategy != Strategy::Sequential {
            println!("Threads: {}", config.num_threads);
        }
        if let Some(limit) = args.limit {
            println!("Limit: {} entries", limit);
        }
        if let Some(limit) = args.page_limit {
            println!("Page limit: {}", limit);
        }
        println!();
    }

    let reader = open_input(&args.input)?;
    let output = File::create(&args.output).with_context(|| format!("creating {}", args.output.display()))?;
    let mut writer = BufWriter::with_capacity(IO_BUFFER, output);

    let stats = match args.strategy {
        Strategy::Sequential => run_sequential(&extractor, reader, &mut writer, limits, args.quiet)?,
        Strategy::BatchParallel => process_batch_parallel(&extractor, reader, &mut writer, &config, limits)?,
        Strategy::ChannelPipeline => process_channel_pipeline(Arc::clone(&extractor), reader, &mut writer, &config, limits)?,
    };

    if !args.quiet {
        print_stats(&stats, &format!("{:?}", args.strategy));
    }

    Ok(())
}
