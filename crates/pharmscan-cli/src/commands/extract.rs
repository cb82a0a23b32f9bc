//! Extract command - pull structured data from a single invoice image.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{debug, info};

use pharmscan_core::{
    ExtractionPolicy, InvoiceExtractor, InvoiceRecord, LineItem, PharmscanError, SUPPORTED_EXTENSIONS,
    Section, append_record, count_invoices, is_supported_image, record_cells,
};

use super::load_config;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Invoice image (jpg, jpeg, png or webp)
    #[arg(required = true)]
    image: PathBuf,

    /// Extraction policy: permissive or strict (default from config)
    #[arg(short, long)]
    policy: Option<ExtractionPolicy>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append the record to a CSV file (default path from config)
    #[arg(long, value_name = "CSV", num_args = 0..=1, require_equals = true)]
    save: Option<Option<PathBuf>>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output (header plus one row)
    Csv,
    /// Plain text summary
    Text,
}

pub fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;
    let policy = args.policy.unwrap_or(config.extraction.policy);

    if !is_supported_image(&args.image) {
        anyhow::bail!(
            "Unsupported file format: {} (expected one of: {})",
            args.image.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        );
    }

    let extractor = InvoiceExtractor::from_config(&config.gateway);
    extractor.check_available()?;

    info!("Extracting {} ({} policy)", args.image.display(), policy);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Extracting invoice data...");

    let (record, message) = extractor.extract(&args.image, policy);
    pb.finish_and_clear();

    if !message.is_empty() {
        anyhow::bail!("{}", message);
    }

    let output = format_record(&record, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    let generated = record.generated_code_count();
    if generated > 0 && policy.allows_generated_codes() {
        eprintln!(
            "{} {} item code(s) were generated (999 prefix), none was printed on the invoice",
            style("⚠").yellow(),
            generated
        );
    } else if generated > 0 {
        eprintln!(
            "{} {} item code(s) look generated (999 prefix) although the {} policy forbids it",
            style("⚠").yellow(),
            generated,
            policy
        );
    }

    if let Some(save) = args.save {
        let csv_path = save.unwrap_or_else(|| config.output.csv_path.clone());
        save_record(&csv_path, &record)?;
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn save_record(csv_path: &Path, record: &InvoiceRecord) -> anyhow::Result<()> {
    match append_record(csv_path, record) {
        Ok(()) => {}
        Err(PharmscanError::EmptyRecord) => {
            eprintln!(
                "{} {} Nothing written to {}",
                style("⚠").yellow(),
                PharmscanError::EmptyRecord,
                csv_path.display()
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }
    eprintln!(
        "{} Saved to {}",
        style("✓").green(),
        csv_path.display()
    );
    eprintln!(
        "{} Total invoices saved: {}",
        style("ℹ").blue(),
        count_invoices(csv_path)?
    );

    Ok(())
}

pub fn format_record(record: &InvoiceRecord, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Csv => format_csv(record),
        OutputFormat::Text => Ok(format_text(record)),
    }
}

fn format_csv(record: &InvoiceRecord) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(record.keys())?;
    wtr.write_record(record_cells(record))?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(record: &InvoiceRecord) -> String {
    let mut output = String::new();

    if record.is_empty() {
        output.push_str("No data extracted.\n");
        return output;
    }

    for (key, value) in record.iter() {
        let section = Section::from_key(key);
        let title = section.map(|s| s.title()).unwrap_or(key.as_str());

        if section == Some(Section::Items) {
            match record.line_items() {
                Ok(items) if !items.is_empty() => {
                    output.push_str(&format_items(&items));
                    output.push('\n');
                    continue;
                }
                Ok(_) => continue,
                // Not a list of rows; print as-is below
                Err(_) => {}
            }
        }

        match value {
            Value::Object(fields) => {
                let filled: Vec<_> = fields.iter().filter(|(_, v)| !is_blank(v)).collect();
                if filled.is_empty() {
                    continue;
                }
                output.push_str(&format!("{}:\n", title));
                for (name, v) in filled {
                    output.push_str(&format!("  {}: {}\n", name, display_value(v)));
                }
                output.push('\n');
            }
            other if !is_blank(other) => {
                output.push_str(&format!("{}: {}\n\n", title, display_value(other)));
            }
            _ => {}
        }
    }

    output.push_str(&format!("{} fields extracted\n", count_fields(record.as_object().values())));
    output
}

fn format_items(items: &[LineItem]) -> String {
    let mut output = format!("Items ({}):\n", items.len());
    output.push_str(&format!(
        "  {:<3} {:<16} {:>8} {:>10} {:>10} {:<5} {}\n",
        "#", "SKU/NDC", "Qty", "Rate", "Amount", "UQC", "Description"
    ));

    let mut any_generated = false;
    for (i, item) in items.iter().enumerate() {
        let mut sku = item.display_sku().unwrap_or_else(|| "-".to_string());
        if item.has_generated_sku() {
            sku.push('*');
            any_generated = true;
        }

        output.push_str(&format!(
            "  {:<3} {:<16} {:>8} {:>10} {:>10} {:<5} {}\n",
            i + 1,
            sku,
            display_number(item.quantity),
            display_number(item.rate),
            display_number(item.amount),
            item.uqc.as_deref().unwrap_or("-"),
            item.display_name(),
        ));
    }

    if any_generated {
        output.push_str("  * generated code, not printed on the invoice\n");
    }
    output
}

fn display_number(value: Option<f64>) -> String {
    match value {
        Some(n) if n.fract() == 0.0 => format!("{:.0}", n),
        Some(n) => format!("{:.2}", n),
        None => "-".to_string(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Count non-blank leaf values.
fn count_fields<'a>(values: impl Iterator<Item = &'a Value>) -> usize {
    values
        .map(|value| match value {
            Value::Object(map) => count_fields(map.values()),
            Value::Array(list) => count_fields(list.iter()),
            leaf if is_blank(leaf) => 0,
            _ => 1,
        })
        .sum()
}
