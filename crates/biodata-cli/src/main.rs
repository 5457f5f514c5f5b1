use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use biodata_core::Config;
use biodata_ingest::DocumentRouter;
use biodata_llm::ProfileExtractor;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

mod logging;
mod output;
mod pipeline;
mod settings;

use output::ColorMode;

/// Biodata extractor - turn resumes and biodata documents into structured profiles
#[derive(Parser, Debug)]
#[command(name = "biodata", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Read settings from this TOML file instead of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract raw text from one or more documents
    Text {
        /// Documents to read (.txt, .pdf, .png, .jpg, .jpeg, .bmp, .tiff)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Print a JSON object mapping each path to its text (null on failure)
        #[arg(long)]
        json: bool,
    },

    /// Extract a structured profile from one document
    Profile {
        /// Document to read
        file: PathBuf,

        #[command(flatten)]
        llm: LlmArgs,

        /// Split multi-record documents and print every profile found
        #[arg(long)]
        all: bool,

        /// Print JSON instead of a field listing
        #[arg(long)]
        json: bool,
    },

    /// Process every supported document in a directory
    Run {
        /// Directory containing input documents
        dir: PathBuf,

        #[command(flatten)]
        llm: LlmArgs,

        /// Number of files processed concurrently
        #[arg(short, long, default_value_t = 4)]
        workers: usize,

        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write an "About Yourself" summary for every profile
        #[arg(long)]
        summary: bool,
    },
}

#[derive(clap::Args, Debug)]
struct LlmArgs {
    /// API key for the language-model provider (overrides environment and config file)
    #[arg(long)]
    api_key: Option<String>,

    /// Model name (overrides BIODATA_LLM_MODEL and config file)
    #[arg(long)]
    model: Option<String>,

    /// Provider: openai or anthropic
    #[arg(long)]
    provider: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.log_file.as_deref())?;

    let color = ColorMode(!cli.no_color && std::io::stdout().is_terminal());
    let summary_color = ColorMode(!cli.no_color && std::io::stderr().is_terminal());
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Text { paths, json } => {
            let config = settings::resolve(config_path, None)?;
            text(config, &paths, json, color).await
        }
        Command::Profile {
            file,
            llm,
            all,
            json,
        } => {
            let config = settings::resolve(config_path, llm.provider.as_deref())?;
            profile(config, &file, &llm, all, json, color).await
        }
        Command::Run {
            dir,
            llm,
            workers,
            output,
            summary,
        } => {
            let config = settings::resolve(config_path, llm.provider.as_deref())?;
            run(config, &dir, &llm, workers, output, summary, summary_color).await
        }
    }
}

/// Extraction blocks on file IO and OCR child processes.
async fn extract_blocking(router: Arc<DocumentRouter>, path: PathBuf) -> anyhow::Result<Option<String>> {
    Ok(tokio::task::spawn_blocking(move || router.extract_text(&path)).await?)
}

async fn text(config: Config, paths: &[PathBuf], json: bool, color: ColorMode) -> anyhow::Result<()> {
    let router = DocumentRouter::from_config(config);
    let paths = paths.to_vec();
    let results = tokio::task::spawn_blocking(move || router.extract_batch(&paths)).await?;

    let mut stdout = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &results)?;
        writeln!(stdout)?;
    } else {
        for (path, text) in &results {
            output::print_text_result(&mut stdout, path, text.as_deref(), color)?;
        }
    }

    let failed = results.values().filter(|t| t.is_none()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} documents could not be read", results.len());
    }
    Ok(())
}

async fn profile(
    config: Config,
    file: &Path,
    llm: &LlmArgs,
    all: bool,
    json: bool,
    color: ColorMode,
) -> anyhow::Result<()> {
    let router = Arc::new(DocumentRouter::from_config(config.clone()));
    let Some(text) = extract_blocking(router, file.to_path_buf()).await? else {
        anyhow::bail!("Text extraction failed for {}", file.display());
    };
    if text.trim().is_empty() {
        anyhow::bail!("No text extracted from {}", file.display());
    }

    let (api_key, model) = (llm.api_key.as_deref(), llm.model.as_deref());
    let records = if all {
        biodata_llm::extract_profiles(&text, api_key, model, &config).await
    } else {
        vec![biodata_llm::extract_profile(&text, api_key, model, &config).await]
    };

    let mut stdout = std::io::stdout().lock();
    if json {
        let value = if all {
            serde_json::to_value(&records)?
        } else {
            records.first().map(|r| r.to_json()).unwrap_or_default()
        };
        serde_json::to_writer_pretty(&mut stdout, &value)?;
        writeln!(stdout)?;
    } else {
        for (i, record) in records.iter().enumerate() {
            output::print_record(&mut stdout, i, records.len(), record, color)?;
        }
    }
    Ok(())
}

async fn run(
    config: Config,
    dir: &Path,
    llm: &LlmArgs,
    workers: usize,
    output: Option<PathBuf>,
    summary: bool,
    color: ColorMode,
) -> anyhow::Result<()> {
    let files = pipeline::collect_inputs(dir)?;
    if files.is_empty() {
        eprintln!("No supported documents in {}", dir.display());
        return Ok(());
    }

    let extractor = ProfileExtractor::from_config(&config, llm.api_key.as_deref(), llm.model.as_deref())?;
    tracing::info!(
        dir = %dir.display(),
        files = files.len(),
        workers,
        provider = extractor.provider_name(),
        model = extractor.model(),
        summary,
        "Starting pipeline"
    );
    let summaries = summary.then(|| extractor.summary_writer());

    let router = Arc::new(DocumentRouter::from_config(config));

    let cancel = CancellationToken::new();

    // Set up Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling: finishing files already in progress...");
            cancel_clone.cancel();
        }
    });

    let progress = if std::io::stderr().is_terminal() {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} files ({elapsed})")?
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Some(bar)
    } else {
        None
    };

    let report = pipeline::run(files, router, extractor, summaries, workers, cancel, progress).await;

    let json = serde_json::to_string_pretty(&report)?;
    match &output {
        Some(path) => std::fs::write(path, format!("{json}\n"))?,
        None => println!("{json}"),
    }

    let mut stderr = std::io::stderr().lock();
    output::print_run_summary(&mut stderr, &report, color)?;
    if let Some(path) = &output {
        writeln!(stderr, "Report written to {}", path.display())?;
    }
    Ok(())
}
