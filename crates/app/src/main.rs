use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use resolution_extract_core::{
    load_documents, render_batch, render_verification, to_json, Dataset, HttpRecognizer,
    LazyRecognizer, LopdfTextLayer, NoRecognizer, OcrEndpointConfig, ProcessingOptions,
    ProgressCallback, Recognizer, ResolutionProcessor, SourceDocument,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "resolution-extract", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// OCR service receiving `{pdf_base64, source_path, page}`.
    #[arg(long, env = "OCR_ENDPOINT")]
    ocr_endpoint: Option<String>,

    /// Bearer token for the OCR service.
    #[arg(long, env = "OCR_API_KEY", hide_env_values = true)]
    ocr_api_key: Option<String>,

    /// OCR request timeout in seconds.
    #[arg(long, default_value = "120")]
    ocr_timeout_secs: u64,

    #[command(flatten)]
    dataset: DatasetArgs,
}

#[derive(Args)]
struct DatasetArgs {
    /// Column holding the resolution number.
    #[arg(long, default_value = "Resolución")]
    key_column: String,

    /// Column receiving the beneficiary name.
    #[arg(long, default_value = "Usuario")]
    name_column: String,

    /// Column receiving the identification number.
    #[arg(long, default_value = "Identificacion")]
    id_column: String,

    /// CSV field delimiter.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// File name prefix of resolution PDFs.
    #[arg(long, default_value = "RS-")]
    prefix: String,

    /// Watermark word whose lines are dropped from page text; empty disables.
    #[arg(long, default_value = "CARDER")]
    watermark: String,
}

#[derive(Subcommand)]
enum Command {
    /// Fill empty name and id cells of a dataset from the matching PDFs.
    Process {
        /// Input CSV dataset.
        #[arg(long)]
        dataset: PathBuf,
        /// Folder searched recursively for resolution PDFs.
        #[arg(long)]
        documents: PathBuf,
        /// Where to write the updated CSV.
        #[arg(long)]
        output: PathBuf,
        /// Write the report to this file instead of stdout.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Emit the report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Compare already filled rows against what the PDFs say.
    Verify {
        #[arg(long)]
        dataset: PathBuf,
        #[arg(long)]
        documents: PathBuf,
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Locate and extract a single PDF, printing the text that was used.
    Extract {
        #[arg(long)]
        document: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Logs progress every few records.
struct LogProgress {
    total: AtomicU64,
    done: AtomicU64,
}

impl LogProgress {
    const EVERY: u64 = 10;

    fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            done: AtomicU64::new(0),
        }
    }
}

impl ProgressCallback for LogProgress {
    fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }

    fn inc(&self, delta: u64) {
        let done = self.done.fetch_add(delta, Ordering::Relaxed) + delta;
        if done % Self::EVERY == 0 {
            info!(done, total = self.total.load(Ordering::Relaxed), "progress");
        }
    }

    fn set_message(&self, _msg: String) {}

    fn finish(&self, msg: String) {
        info!(%msg, "finished");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "resolution-extract boot"
    );

    let options = processing_options(&cli.dataset);
    let delimiter = csv_delimiter(cli.dataset.delimiter)?;

    match cli.ocr_endpoint.as_deref().map(str::trim).filter(|url| !url.is_empty()) {
        Some(endpoint) => {
            let config = OcrEndpointConfig::new(endpoint, cli.ocr_api_key.as_deref())?
                .with_timeout(Duration::from_secs(cli.ocr_timeout_secs));
            info!(endpoint = %config.endpoint, "ocr enabled");
            let recognizer = LazyRecognizer::new(move || {
                let config = config.clone();
                async move { HttpRecognizer::new(config) }
            });
            run(cli.command, options, delimiter, recognizer).await
        }
        None => {
            info!("no OCR endpoint configured; using embedded text only");
            run(cli.command, options, delimiter, NoRecognizer).await
        }
    }
}

fn processing_options(args: &DatasetArgs) -> ProcessingOptions {
    let watermark = Some(args.watermark.trim().to_string()).filter(|word| !word.is_empty());
    ProcessingOptions {
        key_column: args.key_column.clone(),
        name_column: args.name_column.clone(),
        id_column: args.id_column.clone(),
        document_prefix: args.prefix.clone(),
        watermark,
        ..ProcessingOptions::default()
    }
}

fn csv_delimiter(delimiter: char) -> anyhow::Result<u8> {
    match u8::try_from(delimiter) {
        Ok(byte) if byte.is_ascii() => Ok(byte),
        _ => bail!("delimiter must be a single ASCII character, got {delimiter:?}"),
    }
}

async fn run<R>(
    command: Command,
    options: ProcessingOptions,
    delimiter: u8,
    recognizer: R,
) -> anyhow::Result<()>
where
    R: Recognizer + Send + Sync,
{
    let processor = ResolutionProcessor::new(LopdfTextLayer::new(), recognizer, options)?;
    let progress = LogProgress::new();

    match command {
        Command::Process {
            dataset,
            documents,
            output,
            report,
            json,
        } => {
            let documents = load_documents(&documents, &processor.options().document_prefix)?;
            let mut table = Dataset::read_csv(&dataset, delimiter)
                .with_context(|| format!("reading {}", dataset.display()))?;
            let mut records = table.records(processor.options())?;

            let batch = processor
                .process_batch(&mut records, &documents, &progress)
                .await;

            table.apply(&records, processor.options())?;
            table
                .write_csv(&output)
                .with_context(|| format!("writing {}", output.display()))?;

            let rendered = if json { to_json(&batch)? } else { render_batch(&batch) };
            emit(&rendered, report.as_deref()).await?;
        }
        Command::Verify {
            dataset,
            documents,
            report,
            json,
        } => {
            let documents = load_documents(&documents, &processor.options().document_prefix)?;
            let mut table = Dataset::read_csv(&dataset, delimiter)
                .with_context(|| format!("reading {}", dataset.display()))?;
            let records = table.records(processor.options())?;

            let verification = processor
                .verify_batch(&records, &documents, &progress)
                .await;

            let rendered = if json {
                to_json(&verification)?
            } else {
                render_verification(&verification)
            };
            emit(&rendered, report.as_deref()).await?;
        }
        Command::Extract { document, json } => {
            let document = SourceDocument::from_path(&document)?;
            let extraction = processor.extract_document(&document).await;

            if json {
                println!("{}", to_json(&extraction)?);
            } else {
                let result = &extraction.result;
                println!("document: {}", document.file_name);
                println!(
                    "clause: {}",
                    match extraction.location.page_index {
                        Some(page) => format!("page {}", page + 1),
                        None => "not found (first page fallback)".to_string(),
                    }
                );
                println!("status: {}", extraction.status());
                println!("name: {}", result.name.as_deref().unwrap_or("-"));
                println!("id: {}", result.id.as_deref().unwrap_or("-"));
                println!("needs review: {}", result.needs_review());
                println!("recognized pages: {}", extraction.recognitions);
                for issue in &extraction.issues {
                    println!("issue: {issue}");
                }
                println!("text:\n{}", extraction.text);
            }
        }
    }

    Ok(())
}

async fn emit(rendered: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
