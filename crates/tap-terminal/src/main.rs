use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tap_acquirer::models::{CreatePayment, Payment};
use tap_card::kernel::{FtdcKernel, Kernel, UniversalKernel};
use tap_card::{CardReader, KernelKind, TagsDb, Terminal, Transaction, WaitOutcome};
use tap_emv::{copy_tags, encode, find_first, pretty_print, tags};

mod client;
mod config;

use client::{AcquirerClient, Receipt};
use config::TerminalConfig;

/// Tags forwarded to the acquirer as the EMV payload
const PAYMENT_TAGS: [&str; 5] = [
    tags::APPLICATION_PAN,
    tags::APPLICATION_EXPIRATION_DATE,
    tags::CARDHOLDER_NAME,
    tags::ADF_NAME,
    tags::APPLICATION_LABEL,
];

const CARD_WAIT: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "tap-terminal")]
#[command(about = "Payment terminal - tap a card, authorize through the acquirer")]
#[command(version)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Amount in minor units; overrides the configured default
    #[arg(short, long)]
    amount: Option<i64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => TerminalConfig::from_file(path)?,
        None => TerminalConfig::default(),
    };

    println!("Terminal is running...");

    let amount = resolve_amount(&args, &config)?;
    let mut reader = connect_reader(&config)?;

    let db = run_kernel(&config, amount, &mut reader)?;

    println!("\nEMV tags read from card:");
    print!("{}", pretty_print(db.tags()));

    let payment = create_payment(&config, amount, &db)?;

    println!(
        "Payment created: ID={}, Status={:?}, Authorization Code={}",
        payment.id, payment.status, payment.authorization_code
    );

    print_receipt(&config, &payment, &db);

    Ok(())
}

fn resolve_amount(args: &Args, config: &TerminalConfig) -> anyhow::Result<i64> {
    if let Some(amount) = args.amount {
        return Ok(amount);
    }

    if config.default_amount != 0 {
        println!("Using default amount: {} cents", config.default_amount);
        return Ok(config.default_amount);
    }

    println!("Please enter amount (in cents, e.g., 100 for $1.00):");
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("reading amount")?;

    let amount: i64 = line.trim().parse().context("amount must be a number")?;
    if amount <= 0 {
        bail!("amount must be greater than 0");
    }

    Ok(amount)
}

/// Pick a reader, wait for a tap, connect
fn connect_reader(config: &TerminalConfig) -> anyhow::Result<CardReader> {
    let mut reader = CardReader::new().context("establishing PC/SC context")?;

    if config.reader_index >= 0 {
        reader.select_index(config.reader_index as usize)?;
    } else {
        select_reader_interactively(&mut reader)?;
    }

    println!("Using NFC reader: {}", reader.selected().unwrap_or("?"));
    println!("Waiting for card...");

    match reader.wait_for_card(CARD_WAIT)? {
        WaitOutcome::Present => println!("Card presented."),
        _ => bail!("no card presented within {} seconds", CARD_WAIT.as_secs()),
    }

    reader.connect().context("connecting to card")?;
    println!("Card connected successfully!");

    Ok(reader)
}

fn select_reader_interactively(reader: &mut CardReader) -> anyhow::Result<()> {
    let readers = reader.readers().to_vec();
    if readers.is_empty() {
        bail!("no card readers found");
    }
    if readers.len() == 1 {
        reader.select_index(0)?;
        return Ok(());
    }

    println!("Available readers:");
    for (index, name) in readers.iter().enumerate() {
        println!("  [{index}] {name}");
    }

    loop {
        print!("\nSelect reader (0-{}): ", readers.len() - 1);
        std::io::stdout().flush().ok();

        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        let input = line.trim();

        if matches!(input, "q" | "quit" | "exit") {
            bail!("no reader selected");
        }

        if let Ok(index) = input.parse::<usize>() {
            if index < readers.len() {
                reader.select_index(index)?;
                return Ok(());
            }
        }

        println!(
            "Invalid input. Please enter a number between 0 and {}, or 'q' to quit",
            readers.len() - 1
        );
    }
}

fn run_kernel(
    config: &TerminalConfig,
    amount: i64,
    reader: &mut CardReader,
) -> anyhow::Result<TagsDb> {
    let kind = config.kernel_kind()?;

    let mut kernel: Box<dyn Kernel> = match kind {
        KernelKind::Ftdc => Box::new(FtdcKernel::new()),
        KernelKind::Universal => Box::new(UniversalKernel::new(
            Terminal::new(),
            Transaction::purchase(amount),
        )),
    };

    kernel.process(reader).context("processing card")
}

fn create_payment(
    config: &TerminalConfig,
    amount: i64,
    db: &TagsDb,
) -> anyhow::Result<Payment> {
    println!("Sending payment request to acquirer...");

    let payment_tags = copy_tags(db.tags(), &PAYMENT_TAGS);
    let payload = encode(&payment_tags).context("encoding EMV payload")?;

    let acquirer = AcquirerClient::new(&config.acquirer_url);
    acquirer.create_payment(
        &config.merchant_id,
        &CreatePayment {
            amount,
            currency: "USD".to_string(),
            emv_payload: Some(hex::encode(payload)),
            ..CreatePayment::default()
        },
    )
}

fn print_receipt(config: &TerminalConfig, payment: &Payment, db: &TagsDb) {
    if config.printer_url.is_empty() {
        println!("No printer configured, skipping receipt printing.");
        return;
    }

    let cardholder = find_first(db.tags(), tags::CARDHOLDER_NAME)
        .map(|t| t.ascii_value())
        .unwrap_or_default();

    let receipt = Receipt {
        payment_id: payment.id.clone(),
        processing_date_time: Utc::now(),
        pan: format!("{}****{}", payment.card.first6, payment.card.last4),
        cardholder,
        amount: payment.amount,
        authorization_code: payment.authorization_code.clone(),
        response_code: payment.response_code.clone(),
    };

    match client::print_receipt(&config.printer_url, &receipt) {
        Ok(job) => println!(
            "Receipt printed: number in queue={}, waiting time={}s",
            job.number_in_queue, job.waiting_time
        ),
        Err(err) => eprintln!("Printing receipt failed: {err}"),
    }
}
