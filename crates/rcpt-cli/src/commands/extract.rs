//! Extract command - pull fields out of a single receipt.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use rcpt_core::fields::normalize_date;
use rcpt_core::models::config::OutputConfig;
use rcpt_core::{ExtractionEngine, ExtractionResult, FieldKind, FieldValue};

use super::{InputReader, load_config};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file, or `-` to read stdin
    #[arg(required = true)]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Include fields that matched but could not be parsed
    #[arg(long)]
    failures: bool,

    /// Single-line JSON
    #[arg(long)]
    compact: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output (field,value)
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if args.failures {
        config.output.include_failures = true;
    }
    if args.compact {
        config.output.pretty = false;
    }

    let engine = ExtractionEngine::new(&config.extraction)?;
    let reader = InputReader::new(&config);

    info!("Extracting from {}", args.input);
    let text = reader.read(&args.input)?;
    let result = engine.extract(&text);

    let output = format_result(&result, args.format, &config.output)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Render a result in the requested format.
pub fn format_result(
    result: &ExtractionResult,
    format: OutputFormat,
    options: &OutputConfig,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => format_json(result, options),
        OutputFormat::Csv => format_csv(result, options),
        OutputFormat::Text => Ok(format_text(result, options)),
    }
}

fn format_json(result: &ExtractionResult, options: &OutputConfig) -> anyhow::Result<String> {
    let value = if options.include_failures {
        serde_json::to_value(result)?
    } else {
        result.to_json()
    };

    let json = if options.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(json)
}

fn format_csv(result: &ExtractionResult, options: &OutputConfig) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["field", "value"])?;
    for (name, value) in ordered_fields(result) {
        wtr.write_record([name, &value.display()])?;
    }

    if options.include_failures {
        for failure in &result.failures {
            wtr.write_record([failure.field.as_str(), &format!("error: {}", failure.message)])?;
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(result: &ExtractionResult, options: &OutputConfig) -> String {
    let mut output = String::new();

    if result.is_empty() {
        output.push_str("No fields found\n");
    }

    for (name, value) in ordered_fields(result) {
        let mut line = format!("{:<14} {}", format!("{}:", name), value.display());

        if options.normalize_dates && name == FieldKind::Date.as_str() {
            if let Some(date) = value.as_text().and_then(normalize_date) {
                line.push_str(&format!(" ({})", date.format("%Y-%m-%d")));
            }
        }

        output.push_str(&line);
        output.push('\n');
    }

    if options.include_failures && !result.failures.is_empty() {
        output.push_str("\nFailures:\n");
        for failure in &result.failures {
            output.push_str(&format!("  - {}: {}\n", failure.field, failure.message));
        }
    }

    output
}

/// Built-in fields in registry order, then any others by name.
fn ordered_fields(result: &ExtractionResult) -> Vec<(&str, &FieldValue)> {
    let mut fields: Vec<(&str, &FieldValue)> = FieldKind::ALL
        .iter()
        .filter_map(|kind| result.get(kind.as_str()).map(|v| (kind.as_str(), v)))
        .collect();

    fields.extend(
        result
            .fields
            .iter()
            .filter(|(name, _)| FieldKind::from_name(name).is_none())
            .map(|(name, value)| (name.as_str(), value)),
    );

    fields
}
