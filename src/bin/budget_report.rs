use budget_report::{
    BudgetBook, BudgetReport, Delivery, ReportOptions, Selection, inspect_pdf_bytes,
};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "budget-report")]
#[command(version)]
#[command(about = "Render yearly budget accounts to a PDF report", long_about = None)]
struct Args {
    /// Account book (JSON)
    #[arg(short, long)]
    book: PathBuf,

    /// Account id, or `all` together with --year
    #[arg(short, long)]
    account: String,

    /// Budget year for `--account all`
    #[arg(short, long)]
    year: Option<String>,

    /// Output file or directory; defaults to the download name in the current directory
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Write the PDF to stdout instead of a file
    #[arg(long, conflicts_with = "out")]
    inline: bool,

    /// Report options (JSON)
    #[arg(long)]
    options: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Resolve the selection before touching the book so malformed requests fail fast.
    let selection = Selection::from_params(&args.account, args.year.as_deref())?;

    let options = match &args.options {
        Some(path) => serde_json::from_str::<ReportOptions>(&std::fs::read_to_string(path)?)?,
        None => ReportOptions::default(),
    };
    let report = BudgetReport::builder().options(options).build()?;

    let book = BudgetBook::load(&args.book)?;
    let accounts = book.select(&selection)?;

    let delivery = if args.inline {
        Delivery::Inline
    } else {
        Delivery::download_today()
    };
    let rendered = report.render(&accounts, delivery)?;
    let summary = inspect_pdf_bytes(&rendered.bytes)?;

    match rendered.filename() {
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&rendered.bytes)?;
            stdout.flush()?;
        }
        Some(filename) => {
            let path = match args.out {
                Some(out) if out.is_dir() => out.join(filename),
                Some(out) => out,
                None => PathBuf::from(filename),
            };
            std::fs::write(&path, &rendered.bytes)?;
            info!(path = %path.display(), "report written");
        }
    }
    eprintln!("{} ({})", summary.summary(), rendered.content_disposition());
    Ok(())
}
