//! Batch extraction command for multiple invoice images.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use pharmscan_core::{
    ExtractionPolicy, InvoiceExtractor, InvoiceRecord, PharmscanError, append_record,
    count_invoices, is_supported_image,
};

use super::load_config;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching invoice images
    #[arg(required = true)]
    input: String,

    /// Extraction policy: permissive or strict (default from config)
    #[arg(short, long)]
    policy: Option<ExtractionPolicy>,

    /// Directory for per-file JSON output
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Append successful records to this CSV file
    #[arg(long, value_name = "CSV")]
    append: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of extracting a single file.
struct ExtractResult {
    path: PathBuf,
    record: InvoiceRecord,
    error: Option<String>,
    processing_time_ms: u64,
}

pub fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;
    let policy = args.policy.unwrap_or(config.extraction.policy);

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_supported_image(p))
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    // One gateway for the whole run
    let extractor = InvoiceExtractor::from_config(&config.gateway);
    extractor.check_available()?;

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let results = extract_all(&extractor, &files, policy, &args, &overall_pb);
    overall_pb.finish_and_clear();

    if !args.continue_on_error {
        if let Some(failed) = results.iter().find(|r| r.error.is_some()) {
            let message = failed.error.as_deref().unwrap_or("unknown error");
            error!("Failed to process {}: {}", failed.path.display(), message);
            anyhow::bail!("Processing failed for {}: {}", failed.path.display(), message);
        }
    }

    let (successful, failed): (Vec<_>, Vec<_>) =
        results.iter().partition(|r| r.error.is_none());

    for result in &successful {
        if let Some(output_dir) = &args.output_dir {
            let output_path = output_dir.join(format!("{}.json", file_stem(&result.path)));
            fs::write(&output_path, serde_json::to_string_pretty(&result.record)?)?;
            debug!("Wrote output to {}", output_path.display());
        }

        // Appends happen here, on one thread, after the workers are done
        if let Some(csv_path) = &args.append {
            append_result(csv_path, result)?;
        }
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    let generated: usize = successful.iter().map(|r| r.record.generated_code_count()).sum();
    if generated > 0 {
        println!(
            "{} {} item code(s) were generated (999 prefix)",
            style("⚠").yellow(),
            generated
        );
    }

    if let Some(csv_path) = &args.append {
        println!(
            "{} Total invoices saved in {}: {}",
            style("ℹ").blue(),
            csv_path.display(),
            count_invoices(csv_path)?
        );
    }

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {} ({}ms): {}",
                result.path.display(),
                result.processing_time_ms,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Run extraction over `files` on `args.jobs` scoped worker threads.
///
/// Workers pull the next index from a shared counter. Results come back
/// in input order. Without `--continue-on-error` workers stop picking up
/// new files after the first failure.
fn extract_all(
    extractor: &InvoiceExtractor,
    files: &[PathBuf],
    policy: ExtractionPolicy,
    args: &BatchArgs,
    pb: &ProgressBar,
) -> Vec<ExtractResult> {
    let next = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let slots: Vec<Mutex<Option<ExtractResult>>> = files.iter().map(|_| Mutex::new(None)).collect();
    let workers = args.jobs.clamp(1, files.len());

    debug!("Starting {} workers", workers);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(path) = files.get(index) else {
                        break;
                    };

                    let result = extract_one(extractor, path, policy);
                    if let Some(message) = &result.error {
                        warn!("Failed to process {}: {}", path.display(), message);
                        if !args.continue_on_error {
                            stop.store(true, Ordering::SeqCst);
                        }
                    }

                    if let Ok(mut slot) = slots[index].lock() {
                        *slot = Some(result);
                    }
                    pb.inc(1);
                }
            });
        }
    });

    slots
        .into_iter()
        .filter_map(|slot| slot.into_inner().ok().flatten())
        .collect()
}

fn extract_one(extractor: &InvoiceExtractor, path: &Path, policy: ExtractionPolicy) -> ExtractResult {
    let file_start = Instant::now();
    let (record, message) = extractor.extract(path, policy);

    ExtractResult {
        path: path.to_path_buf(),
        record,
        error: (!message.is_empty()).then_some(message),
        processing_time_ms: file_start.elapsed().as_millis() as u64,
    }
}

/// Append one successful record, skipping records with nothing in them.
fn append_result(csv_path: &Path, result: &ExtractResult) -> anyhow::Result<bool> {
    match append_record(csv_path, &result.record) {
        Ok(()) => Ok(true),
        Err(PharmscanError::EmptyRecord) => {
            warn!("No data extracted from {}, not appended", result.path.display());
            eprintln!(
                "{} No data extracted from {}, skipped",
                style("⚠").yellow(),
                result.path.display()
            );
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn file_stem(path: &Path) -> &str {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("invoice")
}
