//! Portfolio turntable viewer
//!
//! Shows a catalog of models one at a time. The first model appears as soon
//! as it loads; the rest and the lighting environment follow in the
//! background.
//!
//! Controls: Left/Right to browse, 1-9 to jump, R to re-frame, drag to
//! orbit, right-drag to pan, scroll to zoom, Esc to quit.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use turntable_core::{Catalog, IdleStrategy, ViewerConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IdleArg {
    /// Wait for spare frame time, with a timeout
    Host,
    /// Fixed delays
    Timer,
}

impl From<IdleArg> for IdleStrategy {
    fn from(arg: IdleArg) -> Self {
        match arg {
            IdleArg::Host => IdleStrategy::Host,
            IdleArg::Timer => IdleStrategy::Timer,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "portfolio_viewer")]
#[command(about = "Turntable viewer for a catalog of 3D models")]
struct Cli {
    /// Catalog JSON; the built-in portfolio is used when omitted
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Viewer config JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base path or URL for relative model and environment paths.
    /// Defaults to the catalog's directory.
    #[arg(long)]
    asset_root: Option<String>,

    /// Equirectangular .hdr used for image-based lighting
    #[arg(long, conflicts_with = "no_environment")]
    environment: Option<String>,

    /// Light with ambient and key light only
    #[arg(long)]
    no_environment: bool,

    #[arg(long, value_enum)]
    idle_strategy: Option<IdleArg>,

    /// Log filter, e.g. `debug` or `turntable_viewer=trace`. Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).with_context(|| format!("invalid log filter '{}'", level))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => {
            Catalog::from_path(path).with_context(|| format!("failed to read catalog {}", path.display()))
        }
        None => Ok(Catalog::portfolio()),
    }
}

fn load_config(cli: &Cli) -> Result<ViewerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            ViewerConfig::from_path(path).with_context(|| format!("failed to read config {}", path.display()))?
        }
        None => ViewerConfig::default(),
    };
    if cli.no_environment {
        config.environment = None;
    } else if let Some(environment) = &cli.environment {
        config.environment = Some(environment.clone());
    }
    if let Some(strategy) = cli.idle_strategy {
        config.scheduling.idle_strategy = strategy.into();
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    let catalog = load_catalog(cli.catalog.as_deref())?;
    let config = load_config(&cli)?;
    let asset_root = cli.asset_root.clone().or_else(|| {
        cli.catalog
            .as_deref()
            .and_then(Path::parent)
            .map(|dir| dir.to_string_lossy().into_owned())
            .filter(|dir| !dir.is_empty())
    });

    info!(
        models = catalog.len(),
        environment = config.environment.as_deref().unwrap_or("none"),
        idle = ?config.scheduling.idle_strategy,
        "opening viewer"
    );
    turntable_viewer::show_catalog(config, catalog, asset_root)?;
    Ok(())
}
