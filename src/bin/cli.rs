use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spotify_play_plugin as lib;
use lib::api::SpotifyApi;
use lib::config::PluginOptions;
use std::path::PathBuf;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "spotify-play-plugin", version)]
struct Cli {
    /// Path to options TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a URL would be handled by the plugin (no network)
    Validate { url: String },
    /// Fetch the metadata of a Spotify URL and print it as JSON
    Resolve { url: String },
    /// Print the search query of every track behind a Spotify URL
    Queries { url: String },
    /// Validate the options file and exit
    ConfigValidate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => PluginOptions::from_path(path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => PluginOptions::default(),
    };

    // Bridge `log` records from the API layer and dependencies into tracing.
    let _ = LogTracer::init();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (file_layer, _guard) = match &cfg.log_dir {
        Some(dir) => {
            let file_appender: RollingFileAppender = tracing_appender::rolling::daily(dir, "spotify-play-plugin.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (Some(fmt::layer().with_writer(non_blocking)), Some(guard))
        }
        None => (None, None),
    };
    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(fmt::layer().with_writer(std::io::stderr));
    tracing_subscriber_global::set_global_default(subscriber)
        .context("failed to set global tracing subscriber")?;

    match cli.command {
        Commands::Validate { url } => {
            if lib::url::is_valid(&url) {
                println!("OK");
            } else {
                println!("not a supported Spotify URL");
                std::process::exit(1);
            }
        }
        Commands::Resolve { url } => {
            let api = SpotifyApi::new(&cfg.api, &cfg.endpoints)?;
            let data = api
                .get_data(&url)
                .await
                .with_context(|| format!("resolving {}", url))?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Commands::Queries { url } => {
            let api = SpotifyApi::new(&cfg.api, &cfg.endpoints)?;
            let data = api
                .get_data(&url)
                .await
                .with_context(|| format!("resolving {}", url))?;
            for q in data.search_queries() {
                println!("{}", q);
            }
        }
        Commands::ConfigValidate => match cfg.validate() {
            Ok(()) => println!("OK"),
            Err(e) => {
                eprintln!("Config validation failed: {}", e);
                std::process::exit(2);
            }
        },
    }

    Ok(())
}
