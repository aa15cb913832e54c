use anyhow::{Context, Result};
use clap::Parser;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;

use image_analyzer::analysis::AnalysisType;
use image_analyzer::config;
use image_analyzer::format::FormattedResult;
use image_analyzer::payload::ImagePayload;
use image_analyzer::pipeline::{self, AnalysisResult, Analyzer};
use image_analyzer::progress::ProgressTicker;

#[derive(Parser, Debug)]
#[command(
    name = "image-analyzer",
    version,
    about = "AI image analyzer — Instagram captions, detailed breakdowns, and Midjourney / Stable Diffusion prompts from images"
)]
struct Cli {
    /// Image files or directories to analyze
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Analysis type (default: default_type from the config file)
    #[arg(short = 't', long = "type", value_enum, value_name = "TYPE")]
    kind: Option<AnalysisType>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Read a data URL or base64 image from stdin instead of files
    #[arg(long, conflicts_with = "paths")]
    stdin: bool,

    /// Print the cleaned text without type-specific formatting
    #[arg(long)]
    raw: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// List the available analysis types and exit
    #[arg(long = "list-types")]
    list_types: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Where an image came from, for reporting.
enum Source {
    File(PathBuf),
    Stdin(ImagePayload),
}

impl Source {
    fn label(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::Stdin(_) => "<stdin>".to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --list-types
    if cli.list_types {
        for kind in AnalysisType::ALL {
            println!("{:<18} {} — {}", kind.as_str(), kind.label(), kind.description());
        }
        return Ok(());
    }

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    // Load config
    let mut config = config::Config::load(cli.config.as_deref())?;
    config.apply_env();
    let kind = cli.kind.unwrap_or(config.default_type);

    // Collect inputs
    let sources: Vec<Source> = if cli.stdin {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read image from stdin")?;
        vec![Source::Stdin(ImagePayload::from_data_url(&input)?)]
    } else {
        if cli.paths.is_empty() {
            anyhow::bail!("No input files or directories specified. Use --help for usage.");
        }
        let images = pipeline::collect_images(&cli.paths);
        if images.is_empty() {
            anyhow::bail!("No supported image files found in the specified paths.");
        }
        images.into_iter().map(Source::File).collect()
    };

    let service = pipeline::build_service(&config)?;
    let analyzer = Analyzer::new(service, config.image.clone());

    log::info!(
        "{} image(s), analysis: {} ({})",
        sources.len(),
        kind.label(),
        analyzer.service_name()
    );

    let show_progress = !cli.json && std::io::stderr().is_terminal();
    let styled = std::io::stdout().is_terminal();
    let total = sources.len();
    let mut outcomes: Vec<(String, Result<AnalysisResult, String>)> = Vec::new();

    for (i, source) in sources.iter().enumerate() {
        let label = source.label();
        if total > 1 {
            log::info!("[{}/{}] Analyzing: {label}", i + 1, total);
        }

        let progress = ProgressTicker::start("Analyzing image...", show_progress);
        let result = match source {
            Source::File(path) => analyzer.analyze_file(path, kind).await,
            Source::Stdin(payload) => analyzer.analyze(payload, kind).await,
        };
        progress.finish(result.is_ok());

        match result {
            Ok(result) => {
                if !cli.json {
                    print_result(&label, &result, total > 1, cli.raw, styled);
                }
                outcomes.push((label, Ok(result)));
            }
            Err(err) => {
                log::error!("{label}: {err}");
                outcomes.push((label, Err(err.to_string())));
            }
        }
    }

    // JSON output
    if cli.json {
        let json_results: Vec<serde_json::Value> = outcomes
            .iter()
            .map(|(source, outcome)| match outcome {
                Ok(r) => serde_json::json!({
                    "source": source,
                    "type": r.kind,
                    "text": r.text,
                    "formatted": FormattedResult::from_result(r),
                    "error": null,
                }),
                Err(e) => serde_json::json!({
                    "source": source,
                    "type": kind,
                    "text": null,
                    "formatted": null,
                    "error": e,
                }),
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&json_results)?);
    }

    // Summary
    let success = outcomes.iter().filter(|(_, o)| o.is_ok()).count();
    let failed = total - success;
    if total > 1 {
        log::info!("Done: {success} succeeded, {failed} failed out of {total} images");
    }
    if success == 0 {
        anyhow::bail!("No image could be analyzed");
    }

    Ok(())
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Wrap `text` in an ANSI style, or return it as is when output is not a terminal.
fn paint(code: &str, text: &str, styled: bool) -> String {
    if styled {
        format!("{code}{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// Print one result, with a header when several images are analyzed.
fn print_result(label: &str, result: &AnalysisResult, with_header: bool, raw: bool, styled: bool) {
    if with_header {
        println!();
        println!("{}", paint(BOLD, label, styled));
        println!("{}", paint(DIM, &"─".repeat(72), styled));
    }

    if raw {
        println!("{}", result.text);
    } else {
        print!("{}", FormattedResult::from_result(result));
    }
}
