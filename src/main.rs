use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod bounds;
mod config;
mod loader;
mod locate;
mod map;
mod model;
mod palette;
mod timings;

#[derive(Debug, Parser)]
#[command(about = "Network path measurements plotted on a world map")]
struct Cli {
    /// TOML configuration, defaults to ./config.toml when present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Draw every CSV trajectory of a directory on one map
    Map(MapArgs),
    /// Geolocate traceroute hops into a trajectory CSV
    Locate(LocateArgs),
    /// Extract a timing series from JSON measurement samples
    Timings(TimingsArgs),
}

#[derive(Debug, Args)]
struct MapArgs {
    #[arg(long)]
    csv_dir: Option<PathBuf>,
    #[arg(long)]
    out_dir: Option<PathBuf>,
    #[arg(long)]
    html_name: Option<String>,
    #[arg(long)]
    png_name: Option<String>,
    #[arg(long)]
    geojson_name: Option<String>,
    /// PNG width in pixels
    #[arg(long)]
    width: Option<u32>,
    /// PNG height in pixels
    #[arg(long)]
    height: Option<u32>,
    /// Skip the PNG snapshot
    #[arg(long)]
    no_snapshot: bool,
}

#[derive(Debug, Args)]
struct LocateArgs {
    /// One address per line, as printed by traceroute -n
    hops: PathBuf,
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long, env = "IPINFO_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Debug, Args)]
struct TimingsArgs {
    #[arg(long)]
    json_dir: Option<PathBuf>,
    /// Numeric field to extract
    #[arg(long)]
    key: Option<String>,
    /// Hours east of UTC used for the time labels
    #[arg(long, allow_hyphen_values = true)]
    utc_offset: Option<i32>,
    /// Write the series here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Map(args) => {
            let opts = &mut config.map;
            if let Some(x) = args.csv_dir {
                opts.csv_dir = x;
            }
            if let Some(x) = args.out_dir {
                opts.out_dir = x;
            }
            if let Some(x) = args.html_name {
                opts.html_name = x;
            }
            if let Some(x) = args.png_name {
                opts.png_name = x;
            }
            if let Some(x) = args.geojson_name {
                opts.geojson_name = x;
            }
            if let Some(x) = args.width {
                opts.width = x;
            }
            if let Some(x) = args.height {
                opts.height = x;
            }
            if args.no_snapshot {
                opts.snapshot = false;
            }

            if map::run(opts)? == map::Outcome::NoInput {
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Locate(args) => {
            let opts = &mut config.locate;
            if let Some(x) = args.output {
                opts.output = x;
            }
            if let Some(x) = args.api_url {
                opts.api_url = x;
            }
            if args.token.is_some() {
                opts.token = args.token;
            }

            locate::run(&args.hops, opts).await?;
        }

        Command::Timings(args) => {
            let opts = &mut config.timings;
            if let Some(x) = args.json_dir {
                opts.json_dir = x;
            }
            if let Some(x) = args.key {
                opts.key = x;
            }
            if let Some(x) = args.utc_offset {
                opts.utc_offset_hours = x;
            }

            timings::run(opts, args.output.as_deref())?;
        }
    };

    Ok(ExitCode::SUCCESS)
}
