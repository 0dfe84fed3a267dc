use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use layerdeck::output::{ArtifactLauncher, NoopLauncher, SystemLauncher};
use layerdeck::{
    ExtractionMode, ExtractionRequest, JobStatus, OutputKind, Pipeline, PdfiumLoader,
    create_pdfium, load_config,
};

/// Pull images out of a PDF, merge annotation overlays onto their artwork,
/// and save them as image files or a slide deck.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// PDF document to extract from
    document: PathBuf,

    /// Directory for the output (defaults to the document's directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// First page to process (1-based)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    start: u32,

    /// Last page to process, inclusive (defaults to the last page)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    end: Option<u32>,

    /// Save numbered image files
    #[arg(long, conflicts_with = "deck")]
    files: bool,

    /// Build a slide deck (the default)
    #[arg(long)]
    deck: bool,

    /// Also keep images that have no overlay partner
    #[arg(long)]
    include_unpaired: bool,

    /// List what would be extracted without writing anything
    #[arg(long)]
    preview: bool,

    /// Invert the colors of every output image
    #[arg(long)]
    invert: bool,

    /// Do not open the finished deck
    #[arg(long)]
    no_open: bool,

    /// Configuration file (defaults to ./layerdeck.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn to_request(&self) -> ExtractionRequest {
        let output_directory = self.output.clone().unwrap_or_else(|| {
            self.document
                .parent()
                .map(PathBuf::from)
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from("."))
        });

        let mode = if self.preview {
            ExtractionMode::Preview
        } else {
            ExtractionMode::Extract
        };
        let output_kind = if self.deck || !self.files {
            OutputKind::SlideDeck
        } else {
            OutputKind::Files
        };

        // 1-based inclusive on the command line, zero-based exclusive in the request
        let start = self.start as usize - 1;
        let end = self.end.map(|end| end as usize).unwrap_or(usize::MAX);

        ExtractionRequest::new(&self.document, output_directory)
            .with_pages(start, end)
            .with_mode(mode)
            .with_output_kind(output_kind)
            .with_unpaired(self.include_unpaired)
            .with_invert(self.invert)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "layerdeck failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    info!("Starting layerdeck v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(args.config.as_deref())?;
    if args.no_open {
        config.output.open_artifacts = false;
    }

    let launcher: Arc<dyn ArtifactLauncher> = if config.output.open_artifacts {
        Arc::new(SystemLauncher)
    } else {
        Arc::new(NoopLauncher)
    };

    let pdfium = create_pdfium()?;
    let pipeline = Arc::new(Pipeline::new(PdfiumLoader::new(pdfium), config, launcher));

    let mut job = pipeline.spawn(args.to_request());

    let cancel = job.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling extraction");
            cancel.cancel();
        }
    });

    while let Some(update) = job.progress().recv().await {
        match &update.message {
            Some(message) => eprintln!(
                "[{} {}/{}] {}",
                update.phase, update.processed, update.total, message
            ),
            None => eprintln!("[{} {}/{}]", update.phase, update.processed, update.total),
        }
    }

    let result = job.wait().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.message);
    }

    Ok(match result.status {
        JobStatus::Succeeded => ExitCode::SUCCESS,
        JobStatus::Cancelled => ExitCode::from(130),
        JobStatus::Failed => ExitCode::FAILURE,
    })
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("layerdeck=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
