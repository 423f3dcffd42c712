//! # scryfall-dl
//!
//! Command-line front end: download a set or a card list, or lay out a
//! downloaded set as an HTML binder.

use clap::{Parser, Subcommand};
use scryfall_dl::{
    BinderOptions, CardDownloader, Config, Error, Event, Mode, RunSummary, render_binder,
    run_with_shutdown,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root folder for downloaded images
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Card language to keep in set mode (e.g. en, de, ja)
    #[arg(short, long, global = true)]
    lang: Option<String>,

    /// Maximum simultaneous image downloads
    #[arg(short, long, global = true)]
    concurrency: Option<usize>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download every card image of a set from the bulk feed
    Set {
        /// Set code, e.g. ltr
        code: String,
    },
    /// Download the first search match for each line of a card list
    List {
        /// Text file, one "<name>" or "<name> <set> <number>" per line
        file: PathBuf,
    },
    /// Write a paginated HTML binder for a downloaded set folder
    Binder {
        /// Folder containing the set's images
        dir: PathBuf,

        /// Images per row
        #[arg(long, default_value_t = 3)]
        columns: usize,

        /// Rows per page
        #[arg(long, default_value_t = 3)]
        rows: usize,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scryfall_dl=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<Config, Error> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if let Some(lang) = &args.lang {
        config.language = lang.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.download.max_concurrent_downloads = concurrency;
    }
    if args.insecure {
        config.api.verify_tls = false;
    }
    Ok(config)
}

/// Print one line per task until the run reports completion
async fn print_events(mut events: broadcast::Receiver<Event>) {
    loop {
        match events.recv().await {
            Ok(Event::Started { source }) => println!("Downloading {source}"),
            Ok(Event::Saved { path, .. }) => println!("Saved {}", path.display()),
            Ok(Event::Skipped { path }) => println!("Already present {}", path.display()),
            Ok(Event::Failed { path, reason }) => {
                println!("Not saved {}: {}", path.display(), reason)
            }
            Ok(Event::Unresolved {
                name,
                collector_number,
            }) => println!("No image for {name} #{collector_number}"),
            Ok(Event::NoMatch { line }) => println!("No card found for \"{line}\""),
            Ok(Event::Finished { .. }) => break,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Console fell behind, some task lines were dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("Started at  {}", summary.started_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(finished_at) = summary.finished_at {
        println!("Finished at {}", finished_at.format("%Y-%m-%d %H:%M:%S"));
    }
    println!("{summary}");
}

async fn download(config: Config, mode: Mode) -> Result<(), Error> {
    let downloader = CardDownloader::new(config)?;
    let printer = tokio::spawn(print_events(downloader.subscribe()));

    let result = run_with_shutdown(&downloader, mode).await;
    match &result {
        Ok(Some(_)) => {
            let _ = printer.await;
        }
        _ => printer.abort(),
    }

    match result {
        Ok(Some(summary)) => {
            print_summary(&summary);
            Ok(())
        }
        Ok(None) => {
            println!("Interrupted");
            Ok(())
        }
        Err(Error::SetNotFound(code)) => {
            println!("Unable to find set {code}");
            let mut summary = RunSummary::start();
            summary.finish();
            print_summary(&summary);
            Err(Error::SetNotFound(code))
        }
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let result = match load_config(&args) {
        Ok(config) => match args.command {
            Command::Set { code } => download(config, Mode::StreamSet { set_code: code }).await,
            Command::List { file } => download(config, Mode::ListLookup { list_path: file }).await,
            Command::Binder { dir, columns, rows } => {
                render_binder(&dir, &BinderOptions { columns, rows }).map(|path| {
                    println!("Binder written to {}", path.display());
                })
            }
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !matches!(e, Error::SetNotFound(_)) {
                eprintln!("error: {e}");
            }
            tracing::debug!(error = ?e, "Exiting with error");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
