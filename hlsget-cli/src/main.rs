use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;

use hlsget_lib::{
    download_stream, merge_audio_into_video, HttpFetcher, Mp4Codec, SelectionPolicy, MIME_MP2T,
};

const DEFAULT_MANIFEST_URL: &str = "https://video.twimg.com/ext_tw_video/2019181308287807490/pu/pl/CkeCypAx89LKucYL.m3u8?variant_version=1&tag=12&v=cfc";
const DEFAULT_OUTPUT: &str = "output.mp4";

#[derive(Parser, Debug)]
#[command(author, version, about = "Download an HLS stream to a single media file", args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    download: DownloadArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download an HLS stream (the default when no subcommand is given)
    Download(DownloadArgs),
    /// Merge the audio track of one MP4 file into another
    Merge(MergeArgs),
}

#[derive(Args, Debug, Clone)]
struct DownloadArgs {
    /// HLS manifest URL (master or media playlist)
    #[arg(default_value = DEFAULT_MANIFEST_URL)]
    manifest_url: String,

    /// Output file path
    #[arg(default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Rendition to pick from a master playlist
    #[arg(long, value_enum, default_value_t = Quality::Highest)]
    quality: Quality,

    /// Relay every request through a fetch proxy endpoint
    #[arg(long)]
    proxy: Option<Url>,
}

#[derive(Args, Debug, Clone)]
struct MergeArgs {
    /// MP4 file carrying the video track
    video: PathBuf,

    /// MP4 file carrying the audio track
    audio: PathBuf,

    /// Output file path
    #[arg(default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Quality {
    Lowest,
    Highest,
}

impl From<Quality> for SelectionPolicy {
    fn from(quality: Quality) -> Self {
        match quality {
            Quality::Lowest => SelectionPolicy::LowestBandwidth,
            Quality::Highest => SelectionPolicy::HighestBandwidth,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hlsget=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Some(Command::Download(args)) => download(args).await,
        Some(Command::Merge(args)) => merge(args).await,
        None => download(cli.download).await,
    };

    if let Err(err) = result {
        tracing::error!("{err}");
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn download(args: DownloadArgs) -> Result<(), Box<dyn std::error::Error>> {
    let manifest_url = Url::parse(&args.manifest_url)?;
    let fetcher = match args.proxy {
        Some(relay) => HttpFetcher::with_relay(relay)?,
        None => HttpFetcher::new()?,
    };

    let stream = download_stream(&fetcher, &manifest_url, args.quality.into()).await?;
    write_output(&args.output, &stream.data).await?;

    let label = if stream.content_type == MIME_MP2T {
        "TS"
    } else {
        "MP4 (fMP4)"
    };
    println!(
        "Saved {} to {} ({} bytes).",
        label,
        args.output.display(),
        stream.data.len()
    );
    Ok(())
}

async fn merge(args: MergeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let video = tokio::fs::read(&args.video).await?;
    let audio = tokio::fs::read(&args.audio).await?;

    let merged = merge_audio_into_video(Arc::new(Mp4Codec), video.into(), audio.into()).await?;
    write_output(&args.output, &merged).await?;

    println!(
        "Saved MP4 (fMP4) to {} ({} bytes).",
        args.output.display(),
        merged.len()
    );
    Ok(())
}

async fn write_output(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, data).await
}
