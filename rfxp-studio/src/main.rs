//! rfxp-studio — entry point.
//!
//! ```text
//! rfxp-studio                    Serve with defaults
//! rfxp-studio --config <path>    Load a custom config TOML
//! rfxp-studio --listen <addr>    Override the bind address
//! rfxp-studio --gen-config       Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rfxp_studio::config::StudioConfig;
use rfxp_studio::handlers::{AppState, router};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rfxp-studio", about = "Progressive codec inspection viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "rfxp-studio.toml")]
    config: PathBuf,

    /// Bind address override, e.g. 0.0.0.0:8085.
    #[arg(long)]
    listen: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&StudioConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let config = StudioConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let addr = cli.listen.unwrap_or_else(|| config.bind_addr());

    info!("rfxp-studio v{}", env!("CARGO_PKG_VERSION"));
    info!("tile directory: {}", config.storage.tile_dir.display());
    info!("listening on {addr}");

    let state = AppState::new(config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("Ctrl-C received — shutting down");
}
