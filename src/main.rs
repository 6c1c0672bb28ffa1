//! vidfetch command line interface

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use vidfetch::{
    DownloadItem, ReqwestTransport, Settings, StorageLocator, TransferEngine, TransferOutcome,
    TransferProgress,
};

#[derive(Parser, Debug)]
#[command(name = "vidfetch", version, about = "Resumable video/audio downloader")]
struct Args {
    /// Direct video URL, or the manifest/base URL for chunked sources
    video_url: String,

    /// Separate audio stream URL for sources that split audio and video
    #[arg(long)]
    audio_url: Option<String>,

    /// Output file name without extension
    #[arg(long, default_value = "download")]
    name: String,

    /// Output file extension
    #[arg(long, default_value = "mp4")]
    ext: String,

    /// Hosting site the URL was captured from (e.g. dailymotion.com)
    #[arg(long, default_value = "")]
    site: String,

    /// Expected total size in bytes, 0 when unknown
    #[arg(long, default_value_t = 0)]
    size: u64,

    /// Treat the source as a chunk sequence
    #[arg(long)]
    chunked: bool,

    /// Override the directory holding progress counter files
    #[arg(long)]
    state_dir: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut settings = Settings::default();
    if let Some(dir) = args.state_dir {
        settings.state_dir = dir;
    }

    let item = DownloadItem {
        video_url: args.video_url,
        audio_url: args.audio_url,
        name: args.name,
        ext: args.ext,
        source_website: args.site,
        size: args.size,
        is_chunked: args.chunked,
    };

    let transport = ReqwestTransport::new().context("failed to build HTTP client")?;
    let locator = StorageLocator::new(settings.download_subfolder.clone());
    let engine = TransferEngine::new(Arc::new(transport), locator, settings);

    let cancel = engine.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after current chunk");
            cancel.cancel();
        }
    });

    let (tx, mut rx) = mpsc::channel::<TransferProgress>(16);
    let printer = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            match progress.percentage() {
                Some(pct) => println!(
                    "{} ({:.1}%)",
                    progress.downloaded_display,
                    pct * 100.0
                ),
                None => println!(
                    "{} ({} chunks)",
                    progress.downloaded_display, progress.chunks_completed
                ),
            }
        }
    });

    let result = engine.run(&item, tx).await;
    let _ = printer.await;

    match result {
        Ok(TransferOutcome::Completed) => {
            info!("Done: {}", item.filename());
            Ok(())
        }
        Ok(TransferOutcome::Cancelled) => {
            info!("Stopped; run again to resume {}", item.filename());
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e.into())
        }
    }
}
