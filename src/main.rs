//! xdcc-dl - Main entry point
//!
//! Downloads one or more XDCC packs with resume, throttling, and retry.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use xdcc_downloader::{
    parse_pack_numbers, CliArgs, Config, DownloadReport, Downloader, Pack, ProgressDisplay, Server,
    TransferSnapshot,
};

/// Set up panic handler for unexpected errors
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        let backtrace = std::backtrace::Backtrace::capture();
        match panic_info.location() {
            Some(location) => error!(
                "PANIC occurred at {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            ),
            None => error!("PANIC occurred at unknown location"),
        }
        let payload = panic_info.payload();
        if let Some(s) = payload.downcast_ref::<&str>() {
            error!("Panic message: {}", s);
        } else if let Some(s) = payload.downcast_ref::<String>() {
            error!("Panic message: {}", s);
        } else {
            error!("Panic message: unknown");
        }
        error!("Backtrace:\n{:?}", backtrace);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_panic_handler();

    let args = CliArgs::parse_args();
    init_logging(&args);
    info!("xdcc-dl starting");
    debug!("CLI arguments: {:?}", args);

    let config = Config::from_args(&args).context("Invalid arguments")?;
    config.validate().context("Invalid configuration")?;

    let packs = build_packs(&args, &config).context("Invalid pack selection")?;
    info!(
        "{} pack(s) from {} into {}",
        packs.len(),
        args.server,
        config.output_dir.display()
    );

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let (progress_tx, progress_rx) = watch::channel(TransferSnapshot::default());
    let progress = ProgressDisplay::new(config.is_quiet() || config.json);
    let progress_task = tokio::spawn(render_progress(progress_rx, progress));

    let config = Arc::new(config);
    let downloader = Downloader::new(config.clone())
        .with_cancellation(cancel)
        .with_progress(progress_tx);
    let reports = downloader.download_all(packs).await;

    // Dropping the sender ends the progress task
    drop(downloader);
    if let Err(e) = progress_task.await {
        warn!("Progress display task failed: {}", e);
    }

    print_reports(&reports, &config)?;

    let failed = reports.iter().filter(|r| !r.succeeded()).count();
    if failed > 0 {
        bail!("{} of {} download(s) failed", failed, reports.len());
    }

    info!("xdcc-dl finished");
    Ok(())
}

/// Initialize logging based on verbosity settings
fn init_logging(args: &CliArgs) {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    if args.is_verbose() {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }

    debug!("Logging initialized with level {:?}", args.log_level());
}

/// Turn the positional arguments or `--message` into packs
fn build_packs(args: &CliArgs, config: &Config) -> Result<Vec<Pack>> {
    let server = Server::parse(&args.server).context("Invalid server")?;

    if let Some(message) = &args.message {
        let packs = Pack::from_xdcc_message(message, server, config.output_dir.clone())?;
        return Ok(packs);
    }

    let (Some(bot), Some(numbers)) = (&args.bot, &args.packs) else {
        bail!("BOT and PACKS are required without --message");
    };

    let numbers = parse_pack_numbers(numbers)?;
    let packs = numbers
        .into_iter()
        .map(|n| Pack::new(bot.clone(), n, server.clone(), config.output_dir.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(packs)
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, stopping downloads");
                cancel.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}

async fn render_progress(mut rx: watch::Receiver<TransferSnapshot>, mut display: ProgressDisplay) {
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        if let Err(e) = display.update(&snapshot) {
            debug!("Progress output failed: {}", e);
        }
    }
}

fn print_reports(reports: &[DownloadReport], config: &Config) -> Result<()> {
    let display = ProgressDisplay::new(config.is_quiet());
    for report in reports {
        if config.json {
            println!("{}", report.to_json()?);
        } else {
            display.print_report(report)?;
        }
    }
    Ok(())
}
