//! Scan command - capture one receipt image and save it as an expense.

use std::path::PathBuf;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use recap_core::models::config::RecapConfig;
use recap_core::{
    BookRef, CaptureState, CaptureWorkflow, CategoryRef, DraftField, FsImageStore, ImageSource,
    JsonLedger, PaymentMethodRef, PureOcrRecognizer, RecapError, ReceiptParser, ResolvedFields,
    SaveRequest, TextRecognizer, UnavailableRecognizer,
};

use super::load_config;

/// Arguments for the scan command.
#[derive(Args)]
pub struct ScanArgs {
    /// Receipt image to capture
    #[arg(required = true)]
    image: PathBuf,

    /// Expense category id
    #[arg(long)]
    category: Option<i64>,

    /// Book the receipt is filed in
    #[arg(long)]
    book: Option<i64>,

    /// Payment method id
    #[arg(long)]
    payment_method: Option<i64>,

    /// Free-form notes
    #[arg(long)]
    notes: Option<String>,

    /// Skip text recognition and enter every field by hand
    #[arg(long)]
    skip_ocr: bool,

    /// Vendor name (overrides the extracted one)
    #[arg(long)]
    vendor: Option<String>,

    /// Total amount, e.g. 45.67
    #[arg(long)]
    amount: Option<String>,

    /// Transaction date (MM/DD/YYYY, DD-MM-YYYY or YYYY-MM-DD)
    #[arg(long)]
    date: Option<String>,

    /// Last four digits of the payment card
    #[arg(long)]
    card: Option<String>,
}

pub async fn run(args: ScanArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.image.exists() {
        anyhow::bail!("Input file not found: {}", args.image.display());
    }

    let workflow = CaptureWorkflow::new(
        FsImageStore::new(config.storage.images_dir()),
        build_recognizer(&config, args.skip_ocr),
        JsonLedger::new(config.storage.ledger_path()),
    )
    .with_parser(ReceiptParser::from_config(&config.extraction));

    let run = workflow.begin_capture()?;
    let image = workflow
        .on_image_acquired(run, ImageSource::File(args.image.clone()))
        .await?;
    info!("Captured {}", image);

    if args.skip_ocr {
        workflow.skip_recognition(run)?;
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        spinner.set_message("Recognizing text...");

        let review = workflow.request_recognition(run).await?;
        spinner.finish_and_clear();

        if let Some(failure) = &review.extraction_failed {
            eprintln!(
                "{} {}. Fill in the fields manually.",
                style("⚠").yellow(),
                failure
            );
        }
    }

    let edits = [
        (DraftField::VendorName, &args.vendor),
        (DraftField::Amount, &args.amount),
        (DraftField::TransactionDate, &args.date),
        (DraftField::CardLastFour, &args.card),
    ];
    for (field, value) in edits {
        if let Some(value) = value {
            workflow.edit_field(run, field, value)?;
        }
    }

    let mut request = SaveRequest {
        category: args.category.map(CategoryRef),
        ..SaveRequest::default()
    };
    if let Some(book) = args.book {
        request = request.with_book(BookRef(book));
    }
    if let Some(method) = args.payment_method {
        request = request.with_payment_method(PaymentMethodRef(method));
    }
    if let Some(notes) = args.notes {
        request = request.with_notes(notes);
    }

    let resolved = match workflow.snapshot() {
        CaptureState::Reviewing(review) => review.draft.resolve(),
        _ => ResolvedFields::default(),
    };
    print_fields(&resolved);

    match workflow.save(run, request).await {
        Ok(receipt_id) => {
            println!();
            println!(
                "{} Saved receipt {} to {}",
                style("✓").green(),
                receipt_id,
                config.storage.ledger_path().display()
            );
            Ok(())
        }
        Err(RecapError::Validation(validation)) => {
            eprintln!();
            eprintln!("{}", style("Receipt not saved:").red());
            for issue in &validation.issues {
                eprintln!("  - {} {}", flag_for(issue.field), issue.problem);
            }
            anyhow::bail!("{} field(s) need attention", validation.issues.len())
        }
        Err(e) => Err(e.into()),
    }
}

fn build_recognizer(config: &RecapConfig, skip_ocr: bool) -> Box<dyn TextRecognizer> {
    if skip_ocr {
        return Box::new(UnavailableRecognizer::new("recognition skipped"));
    }
    if !config.ocr.models_present() {
        warn!("OCR models not found in {}", config.ocr.model_dir.display());
        return Box::new(UnavailableRecognizer::new(format!(
            "OCR models not found in {}",
            config.ocr.model_dir.display()
        )));
    }

    match PureOcrRecognizer::from_config(config.ocr.clone()) {
        Ok(engine) => Box::new(engine),
        Err(e) => {
            warn!("Could not load OCR engine: {}", e);
            Box::new(UnavailableRecognizer::new(e.to_string()))
        }
    }
}

fn flag_for(field: DraftField) -> &'static str {
    match field {
        DraftField::VendorName => "--vendor",
        DraftField::TransactionDate => "--date",
        DraftField::Amount => "--amount",
        DraftField::CardLastFour => "--card",
        DraftField::Category => "--category",
    }
}

fn print_fields(fields: &ResolvedFields) {
    let show = |value: Option<String>| match value {
        Some(v) => style(v).bold().to_string(),
        None => style("missing").dim().to_string(),
    };

    println!("Vendor: {}", show(fields.vendor_name.clone()));
    println!("Date:   {}", show(fields.transaction_date.map(|d| d.to_string())));
    println!("Total:  {}", show(fields.amount.map(|a| a.to_string())));
    println!("Card:   {}", show(fields.card_last_four.clone()));
}
