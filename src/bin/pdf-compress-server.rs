use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use pdf_target_compressor::server::{app, ServerConfig};
use pdf_target_compressor::DEFAULT_MAX_INPUT_MB;

/// Web front-end for the PDF compressor
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Maximum accepted upload size in MB
    #[arg(long, default_value_t = DEFAULT_MAX_INPUT_MB)]
    max_input_mb: u64,

    /// Target size pre-filled in the form, in MB
    #[arg(long, default_value_t = 100)]
    default_target_mb: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = ServerConfig {
        max_input_mb: args.max_input_mb,
        default_target_mb: args.default_target_mb,
    };

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    info!("Listening on http://{}", args.bind);

    axum::serve(listener, app(config))
        .await
        .context("Server error")?;
    Ok(())
}
