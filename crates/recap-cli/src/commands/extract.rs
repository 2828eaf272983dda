//! Extract command - pull receipt fields out of recognized text.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::{debug, info};

use recap_core::ExtractedFields;
use recap_core::extraction::ReceiptParser;

use super::{OutputFormat, load_config};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Text file with recognized receipt text, or "-" for stdin
    #[arg(required = true)]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Print a warning for every field that was not found
    #[arg(long)]
    show_warnings: bool,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let text = if args.input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        let path = PathBuf::from(&args.input);
        if !path.exists() {
            anyhow::bail!("Input file not found: {}", path.display());
        }
        info!("Extracting fields from {}", path.display());
        fs::read_to_string(&path)?
    };

    let parser = ReceiptParser::from_config(&config.extraction);
    let result = parser.parse(&text);
    debug!("Extraction took {}ms", result.processing_time_ms);

    let output = format_fields(&result.fields, args.format)?;

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

    if args.show_warnings {
        for warning in &result.warnings {
            eprintln!("{} {}", style("⚠").yellow(), warning);
        }
    }

    Ok(())
}

/// Render extracted fields in the requested format.
pub fn format_fields(fields: &ExtractedFields, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(fields)?),
        OutputFormat::Csv => format_fields_csv(fields),
        OutputFormat::Text => Ok(format_fields_text(fields)),
    }
}

fn format_fields_csv(fields: &ExtractedFields) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["vendor_name", "transaction_date", "total_amount", "card_last_four"])?;
    wtr.write_record([
        fields.vendor_name.clone().unwrap_or_default(),
        fields
            .transaction_date
            .map(|d| d.to_string())
            .unwrap_or_default(),
        fields
            .total_amount
            .map(|a| a.to_string())
            .unwrap_or_default(),
        fields.card_last_four.clone().unwrap_or_default(),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_fields_text(fields: &ExtractedFields) -> String {
    let missing = "-".to_string();
    let mut output = String::new();

    output.push_str(&format!(
        "Vendor: {}\n",
        fields.vendor_name.as_ref().unwrap_or(&missing)
    ));
    output.push_str(&format!(
        "Date:   {}\n",
        fields
            .transaction_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| missing.clone())
    ));
    output.push_str(&format!(
        "Total:  {}\n",
        fields
            .total_amount
            .map(|a| a.to_string())
            .unwrap_or_else(|| missing.clone())
    ));
    output.push_str(&format!(
        "Card:   {}",
        fields
            .card_last_four
            .as_ref()
            .map(|c| format!("**** {}", c))
            .unwrap_or(missing)
    ));

    output
}
